use crate::config::{DEFAULT_INPUT_SIZE, PIXEL_MAX};
use common::span;
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};
use ndarray::{Array, IxDyn};

pub struct BlobBuilder {
    pub input_size: (u32, u32),
    resizer: Resizer,
}

impl BlobBuilder {
    pub fn new(input_size: (u32, u32)) -> Self {
        Self {
            input_size,
            resizer: Resizer::new(),
        }
    }

    /// Build a `[1, 3, H, W]` blob from tightly packed RGB pixels.
    pub fn build(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> anyhow::Result<Array<f32, IxDyn>> {
        let _s = span!("build_blob");

        tracing::trace!(
            width,
            height,
            pixel_bytes = pixels.len(),
            "Building blob"
        );

        if width == 0 || height == 0 {
            anyhow::bail!("Cannot build a blob from an empty {}x{} image", width, height);
        }

        let expected_size = (width as usize) * (height as usize) * 3;
        if pixels.len() != expected_size {
            anyhow::bail!(
                "Buffer size mismatch: expected {}, got {} bytes",
                expected_size,
                pixels.len()
            );
        }

        let resized = self.resize(pixels, width, height)?;

        Self::normalize(&resized)
    }

    fn resize(&mut self, pixels: &[u8], width: u32, height: u32) -> anyhow::Result<Image<'static>> {
        let _s = span!("resize");

        let (target_width, target_height) = self.input_size;
        let src = ImageRef::new(width, height, pixels, PixelType::U8x3)?;
        let mut resized = Image::new(target_width, target_height, PixelType::U8x3);

        self.resizer.resize(
            &src,
            &mut resized,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        )?;

        Ok(resized)
    }

    fn normalize(image: &Image) -> anyhow::Result<Array<f32, IxDyn>> {
        let _s = span!("normalize");

        let width = image.width() as usize;
        let height = image.height() as usize;
        let spatial = width * height;

        let mut output = vec![0.0f32; 3 * spatial];
        let buf = image.buffer();

        for (i, px) in buf.chunks_exact(3).enumerate() {
            output[i] = px[0] as f32 / PIXEL_MAX;
            output[i + spatial] = px[1] as f32 / PIXEL_MAX;
            output[i + 2 * spatial] = px[2] as f32 / PIXEL_MAX;
        }

        Ok(Array::from_shape_vec(
            IxDyn(&[1, 3, height, width]),
            output,
        )?)
    }
}

impl Default for BlobBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_SIZE)
    }
}
