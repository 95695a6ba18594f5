pub mod nms;
pub mod post;

pub use nms::non_max_suppression;
pub use post::{Candidate, PostProcessor};
