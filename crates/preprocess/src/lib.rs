//! Turns decoded RGB images into network input blobs.
//!
//! A blob is the image resized to the network resolution (no crop, no
//! letterbox), scaled into `[0, 1]` and laid out as NCHW `[1, 3, H, W]`.

pub mod blob;
pub mod config;

pub use blob::BlobBuilder;
pub use config::{DEFAULT_INPUT_SIZE, PIXEL_MAX};
