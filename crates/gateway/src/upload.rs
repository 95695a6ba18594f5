use crate::error::ApiError;
use axum::{
    body::Bytes,
    extract::{
        Multipart,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
};
use image::RgbImage;

/// One uploaded file from a multipart form.
#[derive(Debug)]
pub struct Upload {
    pub filename: Option<String>,
    pub bytes: Bytes,
}

pub fn accept(multipart: Result<Multipart, MultipartRejection>) -> Result<Multipart, ApiError> {
    multipart.map_err(|rejection| ApiError::InvalidUpload(rejection.body_text()))
}

/// First part named `field`; other parts are ignored.
pub async fn single_file(multipart: &mut Multipart, field: &str) -> Result<Upload, ApiError> {
    while let Some(part) = multipart.next_field().await.map_err(multipart_error)? {
        if part.name() != Some(field) {
            continue;
        }
        let filename = part.file_name().map(str::to_owned);
        let bytes = part.bytes().await.map_err(multipart_error)?;
        return Ok(Upload { filename, bytes });
    }
    Err(missing_field(field))
}

/// Every part named `field`, in the order they were sent.
pub async fn all_files(multipart: &mut Multipart, field: &str) -> Result<Vec<Upload>, ApiError> {
    let mut uploads = Vec::new();
    while let Some(part) = multipart.next_field().await.map_err(multipart_error)? {
        if part.name() != Some(field) {
            continue;
        }
        let filename = part.file_name().map(str::to_owned);
        let bytes = part.bytes().await.map_err(multipart_error)?;
        uploads.push(Upload { filename, bytes });
    }

    if uploads.is_empty() {
        return Err(missing_field(field));
    }
    Ok(uploads)
}

/// Decode any format the `image` crate recognizes into 8-bit RGB.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, ApiError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .map_err(|e| {
            tracing::debug!(error = %e, len = bytes.len(), "Undecodable upload");
            ApiError::InvalidImage
        })
}

fn multipart_error(err: MultipartError) -> ApiError {
    match err.status() {
        StatusCode::PAYLOAD_TOO_LARGE => ApiError::UploadTooLarge(err.body_text()),
        _ => ApiError::InvalidUpload(err.body_text()),
    }
}

fn missing_field(field: &str) -> ApiError {
    ApiError::InvalidUpload(format!("Missing multipart field `{}`", field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    #[test]
    fn test_decode_png_to_rgb() {
        let img = RgbImage::from_pixel(4, 3, Rgb([1, 2, 3]));
        let mut png = Cursor::new(Vec::new());
        img.write_to(&mut png, ImageFormat::Png).unwrap();

        let decoded = decode_image(png.get_ref()).unwrap();

        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.get_pixel(0, 0), &Rgb([1, 2, 3]));
    }

    #[test]
    fn test_garbage_is_invalid_image() {
        assert!(matches!(
            decode_image(b"definitely not an image"),
            Err(ApiError::InvalidImage)
        ));
        assert!(matches!(decode_image(&[]), Err(ApiError::InvalidImage)));
    }
}
