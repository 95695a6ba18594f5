/// Network input resolution for the stock YOLOv3 configuration (width, height).
pub const DEFAULT_INPUT_SIZE: (u32, u32) = (416, 416);

/// Divisor mapping 8-bit pixel values into `[0, 1]`.
pub const PIXEL_MAX: f32 = 255.0;
