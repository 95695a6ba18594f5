use crate::detection::BoundingBox;
use crate::errors::InferenceError;
use crate::processing::nms::non_max_suppression;
use ndarray::{ArrayViewD, Axis};

/// Leading values of a YOLO output row before the per-class scores:
/// center x, center y, width, height, objectness.
pub const ROW_HEADER_LEN: usize = 5;

/// A decoded row that cleared the confidence threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

pub struct PostProcessor {
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
}

impl PostProcessor {
    pub fn new(confidence_threshold: f32, nms_threshold: f32) -> Self {
        Self {
            confidence_threshold,
            nms_threshold,
        }
    }

    /// Decode every output layer, then de-duplicate with NMS.
    ///
    /// Returned candidates are ordered by descending confidence.
    #[tracing::instrument(skip(self, layers))]
    pub fn process(
        &self,
        layers: &[ArrayViewD<f32>],
        orig_width: u32,
        orig_height: u32,
    ) -> Result<Vec<Candidate>, InferenceError> {
        let mut candidates = Vec::new();
        for layer in layers {
            self.parse_layer(layer, orig_width, orig_height, &mut candidates)?;
        }

        let boxes: Vec<BoundingBox> = candidates.iter().map(|c| c.bbox).collect();
        let scores: Vec<f32> = candidates.iter().map(|c| c.confidence).collect();
        let keep = non_max_suppression(
            &boxes,
            &scores,
            self.confidence_threshold,
            self.nms_threshold,
        );

        tracing::trace!(
            candidates = candidates.len(),
            kept = keep.len(),
            "Applied non-maximum suppression"
        );

        Ok(keep.into_iter().map(|i| candidates[i].clone()).collect())
    }

    /// Decode one output layer into candidates scaled to the original image.
    ///
    /// Layers may carry leading batch dimensions; everything but the last axis
    /// is flattened into rows.
    pub fn parse_layer(
        &self,
        layer: &ArrayViewD<f32>,
        orig_width: u32,
        orig_height: u32,
        out: &mut Vec<Candidate>,
    ) -> Result<(), InferenceError> {
        let _s = common::span_debug!("parse_layer");
        let shape = layer.shape().to_vec();
        let row_len = match shape.last() {
            Some(&n) if n > ROW_HEADER_LEN => n,
            _ => return Err(InferenceError::OutputShape(shape)),
        };
        let num_rows = layer.len() / row_len;

        let standard = layer.as_standard_layout();
        let rows = standard
            .view()
            .into_shape_with_order((num_rows, row_len))
            .map_err(|_| InferenceError::OutputShape(shape.clone()))?;

        let width = orig_width as f32;
        let height = orig_height as f32;

        for row in rows.axis_iter(Axis(0)) {
            let Some((class_id, confidence)) = argmax(row.iter().skip(ROW_HEADER_LEN).copied())
            else {
                continue;
            };

            if confidence <= self.confidence_threshold {
                continue;
            }

            let center_x = (row[0] * width) as i32;
            let center_y = (row[1] * height) as i32;
            let w = (row[2] * width) as i32;
            let h = (row[3] * height) as i32;

            let x = (center_x as f32 - w as f32 / 2.0) as i32;
            let y = (center_y as f32 - h as f32 / 2.0) as i32;

            out.push(Candidate {
                class_id,
                confidence,
                bbox: BoundingBox::from_xywh(x, y, w, h),
            });
        }

        Ok(())
    }
}

/// Index and value of the first maximum.
fn argmax(scores: impl Iterator<Item = f32>) -> Option<(usize, f32)> {
    scores.enumerate().fold(None, |best, (i, score)| match best {
        Some((_, best_score)) if best_score >= score => best,
        _ => Some((i, score)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};

    fn test_postprocessor() -> PostProcessor {
        PostProcessor::new(0.5, 0.4)
    }

    /// Build a `[n, 5 + num_classes]` layer; each entry is
    /// (cx, cy, w, h, class_id, score) in normalized coordinates.
    fn create_layer(rows: &[(f32, f32, f32, f32, usize, f32)], num_classes: usize) -> Array<f32, IxDyn> {
        let row_len = ROW_HEADER_LEN + num_classes;
        let mut data = vec![0.0f32; rows.len() * row_len];
        for (i, &(cx, cy, w, h, class_id, score)) in rows.iter().enumerate() {
            let base = i * row_len;
            data[base..base + 5].copy_from_slice(&[cx, cy, w, h, score]);
            data[base + ROW_HEADER_LEN + class_id] = score;
        }
        Array::from_shape_vec(IxDyn(&[rows.len(), row_len]), data).unwrap()
    }

    #[test]
    fn test_argmax_first_maximum_wins() {
        assert_eq!(argmax([0.1, 0.7, 0.7, 0.2].into_iter()), Some((1, 0.7)));
        assert_eq!(argmax(std::iter::empty()), None);
    }

    /// Confidence is the class score; objectness is ignored
    #[test]
    fn test_confidence_uses_class_score() {
        let mut layer = create_layer(&[(0.5, 0.5, 0.2, 0.2, 1, 0.9)], 3);
        layer[[0, 4]] = 0.01;

        let mut out = Vec::new();
        test_postprocessor()
            .parse_layer(&layer.view(), 100, 100, &mut out)
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].class_id, 1);
        assert!((out[0].confidence - 0.9).abs() < 1e-6);
    }

    /// Threshold comparison is strict
    #[test]
    fn test_threshold_is_exclusive() {
        let layer = create_layer(
            &[
                (0.2, 0.2, 0.1, 0.1, 0, 0.5),
                (0.6, 0.6, 0.1, 0.1, 0, 0.51),
            ],
            2,
        );

        let mut out = Vec::new();
        test_postprocessor()
            .parse_layer(&layer.view(), 100, 100, &mut out)
            .unwrap();

        assert_eq!(out.len(), 1, "0.5 must not clear a 0.5 threshold");
        assert!((out[0].confidence - 0.51).abs() < 1e-6);
    }

    /// Coordinates are scaled to the original image and truncated
    #[test]
    fn test_coordinates_scaled_to_original_image() {
        // 640x480 image, box centered at (0.5, 0.5) sized (0.25, 0.1)
        // center = (320, 240), size = (160, 48), top-left = (240, 216)
        let layer = create_layer(&[(0.5, 0.5, 0.25, 0.1, 0, 0.9)], 1);

        let mut out = Vec::new();
        test_postprocessor()
            .parse_layer(&layer.view(), 640, 480, &mut out)
            .unwrap();

        assert_eq!(out[0].bbox, BoundingBox::from_xywh(240, 216, 160, 48));
    }

    #[test]
    fn test_odd_width_truncates_corner() {
        // center_x = 50, w = 15 -> x = trunc(42.5) = 42
        let layer = create_layer(&[(0.5, 0.5, 0.15, 0.15, 0, 0.9)], 1);

        let mut out = Vec::new();
        test_postprocessor()
            .parse_layer(&layer.view(), 100, 100, &mut out)
            .unwrap();

        assert_eq!(out[0].bbox.x1, 42);
        assert_eq!(out[0].bbox.width, 15);
        assert_eq!(out[0].bbox.x2, 57);
    }

    /// Batch dimensions in front of the rows are flattened
    #[test]
    fn test_batched_layer_is_flattened() {
        let layer = create_layer(
            &[
                (0.2, 0.2, 0.1, 0.1, 0, 0.9),
                (0.7, 0.7, 0.1, 0.1, 1, 0.8),
            ],
            2,
        )
        .into_shape_with_order(IxDyn(&[1, 2, 7]))
        .unwrap();

        let mut out = Vec::new();
        test_postprocessor()
            .parse_layer(&layer.view(), 100, 100, &mut out)
            .unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[1].class_id, 1);
    }

    #[test]
    fn test_row_without_class_scores_is_rejected() {
        let layer = Array::from_shape_vec(IxDyn(&[2, 5]), vec![0.0; 10]).unwrap();

        let mut out = Vec::new();
        let err = test_postprocessor()
            .parse_layer(&layer.view(), 100, 100, &mut out)
            .unwrap_err();

        assert!(matches!(err, InferenceError::OutputShape(_)));
    }

    #[test]
    fn test_zero_detections_when_all_below_threshold() {
        let layer = create_layer(
            &[
                (0.1, 0.1, 0.1, 0.1, 0, 0.12),
                (0.2, 0.2, 0.1, 0.1, 1, 0.27),
                (0.3, 0.3, 0.1, 0.1, 2, 0.48),
            ],
            3,
        );

        let detections = test_postprocessor()
            .process(&[layer.view()], 416, 416)
            .unwrap();

        assert!(detections.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let layer = Array::from_shape_vec(IxDyn(&[0, 85]), vec![]).unwrap();

        let detections = test_postprocessor()
            .process(&[layer.view()], 416, 416)
            .unwrap();

        assert!(detections.is_empty());
    }

    /// Duplicates across output scales collapse to the strongest box
    #[test]
    fn test_overlapping_boxes_across_layers_are_suppressed() {
        let coarse = create_layer(&[(0.5, 0.5, 0.4, 0.4, 0, 0.7)], 2);
        let fine = create_layer(
            &[
                (0.51, 0.5, 0.4, 0.4, 0, 0.95),
                (0.1, 0.1, 0.1, 0.1, 1, 0.6),
            ],
            2,
        );

        let detections = test_postprocessor()
            .process(&[coarse.view(), fine.view()], 200, 200)
            .unwrap();

        assert_eq!(detections.len(), 2);
        assert!((detections[0].confidence - 0.95).abs() < 1e-6);
        assert_eq!(detections[1].class_id, 1);
    }

    /// Runaway network outputs saturate instead of overflowing
    #[test]
    fn test_extreme_row_values_saturate() {
        let layer = Array::from_shape_vec(
            IxDyn(&[1, 6]),
            vec![1e10, 0.5, 1e10, 0.1, 0.9, 0.9],
        )
        .unwrap();

        let detections = test_postprocessor()
            .process(&[layer.view()], 416, 416)
            .unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].bbox.width, i32::MAX);
        assert_eq!(detections[0].bbox.x2, i32::MAX);
        assert_eq!(detections[0].bbox.y2 - detections[0].bbox.y1, 41);
    }

    /// Lowering the threshold never removes detections
    #[test]
    fn test_lower_threshold_is_monotonic() {
        let layer = create_layer(
            &[
                (0.50, 0.50, 0.30, 0.30, 0, 0.92),
                (0.52, 0.50, 0.30, 0.30, 0, 0.81),
                (0.20, 0.20, 0.10, 0.10, 1, 0.74),
                (0.80, 0.80, 0.20, 0.20, 2, 0.63),
                (0.81, 0.80, 0.20, 0.20, 2, 0.55),
                (0.40, 0.90, 0.10, 0.05, 1, 0.42),
                (0.10, 0.70, 0.05, 0.05, 0, 0.31),
                (0.60, 0.10, 0.15, 0.15, 2, 0.18),
            ],
            3,
        );

        let thresholds = [0.95, 0.9, 0.8, 0.7, 0.6, 0.5, 0.4, 0.3, 0.2, 0.1, 0.05];
        let mut previous = 0usize;
        for threshold in thresholds {
            let count = PostProcessor::new(threshold, 0.4)
                .process(&[layer.view()], 416, 416)
                .unwrap()
                .len();
            assert!(
                count >= previous,
                "threshold {} produced {} detections, fewer than {}",
                threshold,
                count,
                previous
            );
            previous = count;
        }
        assert!(previous > 0);
    }
}
