use crate::detection::BoundingBox;

/// Greedy non-maximum suppression.
///
/// Boxes scoring above `score_threshold` are visited by descending score
/// (stable, so the earlier box wins exact ties). A box is kept when its IoU
/// with every box kept so far is at most `nms_threshold`. Returns indices
/// into `boxes` in keep order.
pub fn non_max_suppression(
    boxes: &[BoundingBox],
    scores: &[f32],
    score_threshold: f32,
    nms_threshold: f32,
) -> Vec<usize> {
    debug_assert_eq!(boxes.len(), scores.len());

    let mut order: Vec<usize> = (0..boxes.len().min(scores.len()))
        .filter(|&i| scores[i] > score_threshold)
        .collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut keep: Vec<usize> = Vec::with_capacity(order.len());
    for idx in order {
        let suppressed = keep
            .iter()
            .any(|&kept| boxes[idx].iou(&boxes[kept]) > nms_threshold);
        if !suppressed {
            keep.push(idx);
        }
    }

    keep
}
