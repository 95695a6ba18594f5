//! Grading of inspected produce from the detected class names.
//!
//! A class counts as an issue when its lower-cased name contains one of the
//! tier keywords. Tiers are checked from most to least severe and only the
//! first match is applied, once per detection.

use inference::{Detection, Point};
use serde::Serialize;

pub const MAX_SCORE: u32 = 100;
pub const APPROVAL_THRESHOLD: u32 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn penalty(&self) -> u32 {
        match self {
            Severity::High => 30,
            Severity::Medium => 20,
            Severity::Low => 10,
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Severity::High => &["damaged", "rotten", "spoiled", "bad"],
            Severity::Medium => &["defect", "bruised", "blemish"],
            Severity::Low => &["minor", "slight"],
        }
    }

    /// Most severe tier whose keyword appears in `class_name`.
    pub fn classify(class_name: &str) -> Option<Self> {
        let class_name = class_name.to_lowercase();
        [Severity::High, Severity::Medium, Severity::Low]
            .into_iter()
            .find(|tier| tier.keywords().iter().any(|kw| class_name.contains(kw)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
}

impl Grade {
    pub fn from_score(score: u32) -> Self {
        match score {
            90.. => Grade::A,
            70.. => Grade::B,
            50.. => Grade::C,
            _ => Grade::D,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityIssue {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub confidence: f32,
    pub location: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub quality_score: u32,
    pub grade: Grade,
    pub issues: Vec<QualityIssue>,
    pub status: Verdict,
}

pub fn assess(detections: &[Detection]) -> QualityReport {
    let issues: Vec<QualityIssue> = detections
        .iter()
        .filter_map(|det| {
            Severity::classify(&det.class_name).map(|severity| QualityIssue {
                kind: det.class_name.to_lowercase(),
                severity,
                confidence: det.confidence,
                location: det.center,
            })
        })
        .collect();

    let penalty: u32 = issues.iter().map(|issue| issue.severity.penalty()).sum();
    let quality_score = MAX_SCORE.saturating_sub(penalty);

    let status = if quality_score >= APPROVAL_THRESHOLD {
        Verdict::Approved
    } else {
        Verdict::Rejected
    };

    QualityReport {
        quality_score,
        grade: Grade::from_score(quality_score),
        issues,
        status,
    }
}
