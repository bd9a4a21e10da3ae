//! Inbound image decoding and format detection.
//!
//! The format is detected from the byte stream, never from caller-supplied
//! hints, and the image header is read to make sure the bytes really are a
//! raster image before anything is sent to a provider.

use base64::Engine;
use image::{ImageFormat, ImageReader};
use std::io::Cursor;

use crate::error::InputError;

/// Formats vision providers accept as inline data URIs.
pub const SUPPORTED_FORMATS: &[&str] = &["jpeg", "png", "webp", "gif"];

/// Drop ASCII whitespace, including line breaks from wrapped encoders.
pub fn compact_base64(data: &str) -> String {
    data.chars().filter(|c| !c.is_ascii_whitespace()).collect()
}

/// Decode the base64 `image` field of a request.
///
/// Whitespace anywhere in the input is ignored; anything else that is not
/// standard padded base64 is rejected.
pub fn decode_base64(data: &str) -> Result<Vec<u8>, InputError> {
    base64::engine::general_purpose::STANDARD
        .decode(compact_base64(data))
        .map_err(|e| InputError::InvalidBase64(e.to_string()))
}

/// Determine the encoded format of `bytes` (e.g. "jpeg", "png").
pub fn detect_format(bytes: &[u8]) -> Result<&'static str, InputError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| InputError::UnsupportedImageFormat(format!("cannot read image: {e}")))?;

    let format = reader.format().ok_or_else(|| {
        InputError::UnsupportedImageFormat("unrecognized image signature".to_string())
    })?;

    let name = format_to_string(format);
    if !SUPPORTED_FORMATS.contains(&name) {
        return Err(InputError::UnsupportedImageFormat(name.to_string()));
    }

    // Header parse only; pixel data is the provider's business.
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| InputError::UnsupportedImageFormat(format!("corrupt {name} image: {e}")))?;
    tracing::debug!(format = name, width, height, "Detected image format");

    Ok(name)
}

/// MIME type for a detected format name.
pub fn media_type(format: &str) -> String {
    format!("image/{format}")
}

/// Convert an ImageFormat to a string representation.
pub fn format_to_string(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Png => "png",
        ImageFormat::WebP => "webp",
        ImageFormat::Gif => "gif",
        ImageFormat::Tiff => "tiff",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Ico => "ico",
        ImageFormat::Pnm => "pnm",
        ImageFormat::Avif => "avif",
        _ => "unknown",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    /// Encode a 1x1 image in `format`.
    pub(crate) fn tiny_image(format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, image::Rgb([200, 30, 30])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    pub(crate) fn tiny_image_base64(format: ImageFormat) -> String {
        base64::engine::general_purpose::STANDARD.encode(tiny_image(format))
    }

    #[test]
    fn test_detects_jpeg_png_webp_gif() {
        for (format, expected) in [
            (ImageFormat::Jpeg, "jpeg"),
            (ImageFormat::Png, "png"),
            (ImageFormat::WebP, "webp"),
            (ImageFormat::Gif, "gif"),
        ] {
            let bytes = tiny_image(format);
            assert_eq!(detect_format(&bytes).unwrap(), expected);
        }
    }

    #[test]
    fn test_rejects_unsupported_raster_format() {
        let bytes = tiny_image(ImageFormat::Bmp);
        let err = detect_format(&bytes).unwrap_err();
        assert_eq!(err, InputError::UnsupportedImageFormat("bmp".into()));
    }

    #[test]
    fn test_rejects_non_image_bytes() {
        let err = detect_format(b"just some text, not pixels").unwrap_err();
        assert!(matches!(err, InputError::UnsupportedImageFormat(_)));
    }

    #[test]
    fn test_rejects_truncated_png() {
        let bytes = tiny_image(ImageFormat::Png);
        let err = detect_format(&bytes[..12]).unwrap_err();
        assert!(err.to_string().contains("png"));
    }

    #[test]
    fn test_decode_base64_roundtrip_length() {
        let bytes = tiny_image(ImageFormat::Jpeg);
        let encoded = format!("  {}\n", tiny_image_base64(ImageFormat::Jpeg));
        assert_eq!(decode_base64(&encoded).unwrap().len(), bytes.len());
    }

    #[test]
    fn test_decode_base64_accepts_wrapped_lines() {
        let bytes = tiny_image(ImageFormat::Png);
        let encoded = tiny_image_base64(ImageFormat::Png);
        assert!(encoded.len() > 76);
        let wrapped = encoded
            .as_bytes()
            .chunks(76)
            .map(|line| std::str::from_utf8(line).unwrap())
            .collect::<Vec<_>>()
            .join("\n");

        let decoded = decode_base64(&wrapped).unwrap();
        assert_eq!(decoded, bytes);
        assert_eq!(detect_format(&decoded).unwrap(), "png");
        assert_eq!(compact_base64(&wrapped), encoded);
    }

    #[test]
    fn test_decode_base64_rejects_garbage() {
        let err = decode_base64("not*base64!").unwrap_err();
        assert!(matches!(err, InputError::InvalidBase64(_)));
    }

    #[test]
    fn test_media_type() {
        assert_eq!(media_type("webp"), "image/webp");
    }
}
