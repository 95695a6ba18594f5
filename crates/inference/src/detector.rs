use crate::backend::{ExecutionTarget, InferenceBackend, InferenceOutput};
use crate::config::ModelConfig;
use crate::detection::{Detection, round_confidence};
use crate::errors::InferenceError;
use crate::labels::ClassLabels;
use crate::processing::PostProcessor;
use image::RgbImage;
use preprocess::BlobBuilder;
use std::sync::Mutex;

/// State a forward pass mutates; one request holds it at a time.
struct Engine {
    backend: Box<dyn InferenceBackend>,
    blob_builder: BlobBuilder,
}

/// Loaded network plus everything needed to turn an image into detections.
///
/// Built once at startup and shared read-only across requests.
pub struct Detector {
    engine: Mutex<Engine>,
    postprocessor: PostProcessor,
    labels: ClassLabels,
    output_names: Vec<String>,
    target: ExecutionTarget,
    backend_description: String,
}

impl Detector {
    pub fn new(backend: Box<dyn InferenceBackend>, labels: ClassLabels, config: &ModelConfig) -> Self {
        let output_names = backend.output_names().to_vec();
        let target = backend.target();
        let backend_description = backend.description();
        Self {
            engine: Mutex::new(Engine {
                backend,
                blob_builder: BlobBuilder::new(config.input_size()),
            }),
            postprocessor: PostProcessor::new(config.confidence_threshold, config.nms_threshold),
            labels,
            output_names,
            target,
            backend_description,
        }
    }

    /// Run the full pipeline on a decoded RGB image.
    ///
    /// Returns an empty list when nothing clears the confidence threshold.
    #[tracing::instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, InferenceError> {
        let (width, height) = image.dimensions();

        let InferenceOutput { layers } = {
            let mut engine = self.engine.lock().map_err(|_| InferenceError::Poisoned)?;
            let Engine {
                backend,
                blob_builder,
            } = &mut *engine;

            let blob = blob_builder
                .build(image.as_raw(), width, height)
                .map_err(|e| InferenceError::Preprocess(format!("{e:#}")))?;

            let _infer_span = common::span!("model_inference");
            backend.infer(&blob)?
        };

        let views: Vec<_> = layers.iter().map(|layer| layer.view()).collect();
        let candidates = self.postprocessor.process(&views, width, height)?;

        let detections: Vec<Detection> = candidates
            .into_iter()
            .map(|c| Detection {
                class_name: self.labels.name(c.class_id),
                class_id: c.class_id,
                confidence: round_confidence(c.confidence),
                bbox: c.bbox,
                center: c.bbox.center(),
            })
            .collect();

        tracing::debug!(count = detections.len(), "Detection complete");

        Ok(detections)
    }

    pub fn labels(&self) -> &ClassLabels {
        &self.labels
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.postprocessor.confidence_threshold
    }

    pub fn nms_threshold(&self) -> f32 {
        self.postprocessor.nms_threshold
    }

    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    pub fn target(&self) -> ExecutionTarget {
        self.target
    }

    pub fn backend_description(&self) -> &str {
        &self.backend_description
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::Rgb;
    use ndarray::{Array, IxDyn};
    use std::path::PathBuf;

    /// Replays a fixed set of output rows regardless of input.
    pub(crate) struct ReplayBackend {
        pub rows: Vec<Vec<f32>>,
        pub outputs: Vec<String>,
    }

    impl ReplayBackend {
        pub(crate) fn new(rows: Vec<Vec<f32>>) -> Self {
            Self {
                rows,
                outputs: vec!["yolo_82".to_string(), "yolo_94".to_string()],
            }
        }
    }

    impl InferenceBackend for ReplayBackend {
        fn runtime_name() -> &'static str {
            "Replay"
        }

        fn required_files(config: &ModelConfig) -> Vec<PathBuf> {
            vec![config.cfg_path(), config.classes_path()]
        }

        fn cuda_available() -> bool {
            false
        }

        fn load_model(_config: &ModelConfig, _target: ExecutionTarget) -> Result<Self, InferenceError> {
            Ok(Self::new(Vec::new()))
        }

        fn infer(&mut self, blob: &Array<f32, IxDyn>) -> Result<InferenceOutput, InferenceError> {
            assert_eq!(blob.shape()[..2], [1, 3]);
            let row_len = self.rows.first().map_or(6, Vec::len);
            let data: Vec<f32> = self.rows.iter().flatten().copied().collect();
            let layer = Array::from_shape_vec(IxDyn(&[self.rows.len(), row_len]), data)
                .map_err(|_| InferenceError::OutputShape(vec![self.rows.len(), row_len]))?;
            Ok(InferenceOutput {
                layers: vec![layer],
            })
        }

        fn output_names(&self) -> &[String] {
            &self.outputs
        }

        fn target(&self) -> ExecutionTarget {
            ExecutionTarget::Cpu
        }

        fn description(&self) -> String {
            "Replay (CPU)".to_string()
        }
    }

    fn labels() -> ClassLabels {
        ClassLabels::with_colors(
            vec!["apple".to_string(), "apple_rotten".to_string()],
            vec![[255, 0, 0], [0, 255, 0]],
        )
    }

    fn detector(rows: Vec<Vec<f32>>) -> Detector {
        Detector::new(
            Box::new(ReplayBackend::new(rows)),
            labels(),
            &ModelConfig::default(),
        )
    }

    fn image() -> RgbImage {
        RgbImage::from_pixel(200, 100, Rgb([90, 120, 30]))
    }

    #[test]
    fn test_detect_assembles_labelled_detections() {
        let detector = detector(vec![
            vec![0.5, 0.5, 0.2, 0.4, 0.9, 0.1, 0.87654],
            vec![0.1, 0.1, 0.05, 0.05, 0.9, 0.2, 0.3],
        ]);

        let detections = detector.detect(&image()).unwrap();

        assert_eq!(detections.len(), 1);
        let det = &detections[0];
        assert_eq!(det.class_name, "apple_rotten");
        assert_eq!(det.class_id, 1);
        assert_eq!(det.confidence, 0.877);
        // center (100, 50), size (40, 40)
        assert_eq!(det.bbox.x1, 80);
        assert_eq!(det.bbox.y1, 30);
        assert_eq!(det.bbox.x2, 120);
        assert_eq!(det.bbox.y2, 70);
        assert_eq!(det.center.x, 100);
        assert_eq!(det.center.y, 50);
    }

    #[test]
    fn test_no_detections_is_empty_not_error() {
        let detector = detector(vec![vec![0.5, 0.5, 0.2, 0.2, 0.9, 0.1, 0.2]]);
        assert!(detector.detect(&image()).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_class_index_gets_placeholder_name() {
        let detector = detector(vec![vec![0.5, 0.5, 0.2, 0.2, 0.9, 0.0, 0.0, 0.95]]);
        let detections = detector.detect(&image()).unwrap();
        assert_eq!(detections[0].class_name, "class_2");
    }

    #[test]
    fn test_exposes_model_metadata() {
        let detector = detector(Vec::new());
        assert_eq!(detector.confidence_threshold(), 0.5);
        assert_eq!(detector.nms_threshold(), 0.4);
        assert_eq!(detector.output_names(), &["yolo_82", "yolo_94"]);
        assert_eq!(detector.backend_description(), "Replay (CPU)");
        assert_eq!(detector.target(), ExecutionTarget::Cpu);
        assert_eq!(detector.labels().len(), 2);
    }
}
