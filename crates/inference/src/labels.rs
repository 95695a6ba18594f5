use crate::errors::InferenceError;
use rand::Rng;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub type Color = [u8; 3];

/// Fallback for class indices the label file does not cover.
const UNKNOWN_COLOR: Color = [128, 128, 128];

/// Ordered class names with one display color per class.
#[derive(Debug, Clone)]
pub struct ClassLabels {
    names: Vec<String>,
    colors: Vec<Color>,
}

impl ClassLabels {
    pub fn from_file(path: &Path) -> Result<Self, InferenceError> {
        let file = File::open(path).map_err(|source| InferenceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file), path)
    }

    /// Parse one class name per line. Interior blank lines keep their slot so
    /// indices stay aligned with the network's class outputs.
    ///
    /// `source` only labels errors.
    pub fn from_reader<R: BufRead>(reader: R, source: &Path) -> Result<Self, InferenceError> {
        let mut names = reader
            .lines()
            .map(|line| line.map(|l| l.trim().to_string()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| InferenceError::Io {
                path: source.to_path_buf(),
                source: e,
            })?;

        while names.last().is_some_and(|n| n.is_empty()) {
            names.pop();
        }

        if names.is_empty() {
            return Err(InferenceError::EmptyClassList(source.to_path_buf()));
        }

        Ok(Self::with_rng(names, &mut rand::thread_rng()))
    }

    pub fn with_rng<R: Rng + ?Sized>(names: Vec<String>, rng: &mut R) -> Self {
        let colors = names
            .iter()
            .map(|_| [rng.r#gen(), rng.r#gen(), rng.r#gen()])
            .collect();
        Self { names, colors }
    }

    /// Build labels with explicit colors. Names without a color get gray;
    /// extra colors are dropped.
    pub fn with_colors(names: Vec<String>, mut colors: Vec<Color>) -> Self {
        colors.resize(names.len(), UNKNOWN_COLOR);
        Self { names, colors }
    }

    pub fn name(&self, class_id: usize) -> String {
        self.names
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id))
    }

    pub fn color(&self, class_id: usize) -> Color {
        self.colors.get(class_id).copied().unwrap_or(UNKNOWN_COLOR)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
