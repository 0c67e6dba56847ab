//! Image decode/encode plumbing around the `image` crate.
//!
//! HEIC/HEIF input goes through libheif when the `heif` cargo feature is
//! enabled. The capability is exposed as a flag so startup code and the
//! health endpoint can report it.

use std::io::Cursor;

use image::{DynamicImage, ImageOutputFormat};
use thiserror::Error;

/// Quality used for every JPEG re-encode.
pub const JPEG_QUALITY: u8 = 85;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, Copy)]
pub struct ImageCodec {
    heif: bool,
}

impl ImageCodec {
    pub fn new() -> Self {
        Self {
            heif: cfg!(feature = "heif"),
        }
    }

    /// Whether this build can decode HEIC/HEIF uploads.
    pub fn heif_supported(&self) -> bool {
        self.heif
    }

    /// Decode an uploaded byte buffer into a bitmap.
    ///
    /// Formats known to the `image` crate are tried first; `ftyp`-branded
    /// HEIC/HEIF containers fall through to libheif. Without the `heif`
    /// feature those uploads fail with a decode error.
    pub fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        match image::load_from_memory(bytes) {
            Ok(img) => Ok(img),
            Err(err) => {
                if is_heif(bytes) {
                    return self.decode_heif(bytes);
                }
                Err(CodecError::Decode(err.to_string()))
            }
        }
    }

    /// Re-encode a bitmap as JPEG at the given quality.
    ///
    /// JPEG carries no alpha channel, so RGBA, grayscale-alpha, and
    /// high-bit-depth sources are flattened to 8-bit RGB first.
    pub fn to_jpeg(&self, img: &DynamicImage, quality: u8) -> Result<Vec<u8>, CodecError> {
        let flattened;
        let source = match img {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => img,
            _ => {
                flattened = DynamicImage::ImageRgb8(img.to_rgb8());
                &flattened
            }
        };

        let mut buffer = Cursor::new(Vec::new());
        source
            .write_to(&mut buffer, ImageOutputFormat::Jpeg(quality))
            .map_err(|err| CodecError::Encode(err.to_string()))?;

        Ok(buffer.into_inner())
    }

    #[cfg(feature = "heif")]
    fn decode_heif(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

        let lib_heif = LibHeif::new();
        let ctx = HeifContext::read_from_bytes(bytes)
            .map_err(|err| CodecError::Decode(err.to_string()))?;
        let handle = ctx
            .primary_image_handle()
            .map_err(|err| CodecError::Decode(err.to_string()))?;
        let decoded = lib_heif
            .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
            .map_err(|err| CodecError::Decode(err.to_string()))?;

        let planes = decoded.planes();
        let plane = planes
            .interleaved
            .ok_or_else(|| CodecError::Decode("heif image has no interleaved plane".to_string()))?;

        // The decoded rows are stride-padded; repack them tightly.
        let width = plane.width as usize;
        let height = plane.height as usize;
        let mut pixels = Vec::with_capacity(width * height * 3);
        for row in 0..height {
            let start = row * plane.stride;
            pixels.extend_from_slice(&plane.data[start..start + width * 3]);
        }

        let buffer = image::RgbImage::from_raw(plane.width, plane.height, pixels)
            .ok_or_else(|| CodecError::Decode("heif plane size mismatch".to_string()))?;

        Ok(DynamicImage::ImageRgb8(buffer))
    }

    #[cfg(not(feature = "heif"))]
    fn decode_heif(&self, _bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        Err(CodecError::Decode(
            "HEIC/HEIF support not compiled in".to_string(),
        ))
    }
}

impl Default for ImageCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Sniff the ISO-BMFF `ftyp` box for a HEIF major brand.
fn is_heif(bytes: &[u8]) -> bool {
    const HEIF_BRANDS: [&[u8; 4]; 6] = [b"heic", b"heix", b"hevc", b"heim", b"mif1", b"msf1"];

    bytes.len() >= 12
        && &bytes[4..8] == b"ftyp"
        && HEIF_BRANDS.iter().any(|brand| &bytes[8..12] == *brand)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage, Rgba, RgbaImage};

    fn png_bytes(img: DynamicImage) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageOutputFormat::Png)
            .expect("failed to encode test PNG");
        buffer.into_inner()
    }

    #[test]
    fn jpeg_round_trip_preserves_dimensions() {
        let codec = ImageCodec::new();
        let src = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, Rgb([10, 200, 30])));

        let decoded = codec.decode(&png_bytes(src)).expect("decode failed");
        let jpeg = codec.to_jpeg(&decoded, JPEG_QUALITY).expect("encode failed");

        let reread = image::load_from_memory(&jpeg).expect("output is not valid JPEG");
        assert_eq!(reread.dimensions(), (64, 48));
        assert_eq!(
            image::guess_format(&jpeg).expect("unknown format"),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn alpha_sources_are_flattened_to_rgb() {
        let codec = ImageCodec::new();
        let src = DynamicImage::ImageRgba8(RgbaImage::from_pixel(32, 32, Rgba([255, 0, 0, 128])));

        let jpeg = codec.to_jpeg(&src, JPEG_QUALITY).expect("encode failed");
        let reread = image::load_from_memory(&jpeg).expect("output is not valid JPEG");

        assert!(!reread.color().has_alpha());
        assert_eq!(reread.dimensions(), (32, 32));
    }

    #[test]
    fn converting_a_jpeg_yields_a_jpeg_of_identical_dimensions() {
        let codec = ImageCodec::new();
        let src = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 40, Rgb([5, 5, 5])));
        let original_jpeg = codec.to_jpeg(&src, JPEG_QUALITY).expect("encode failed");

        let decoded = codec.decode(&original_jpeg).expect("decode failed");
        let reencoded = codec.to_jpeg(&decoded, JPEG_QUALITY).expect("re-encode failed");

        let reread = image::load_from_memory(&reencoded).expect("output is not valid JPEG");
        assert_eq!(reread.dimensions(), (100, 40));
    }

    #[test]
    fn undecodable_bytes_are_a_decode_error() {
        let codec = ImageCodec::new();
        let err = codec.decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn heif_sniffing_matches_ftyp_brands() {
        let mut heic = vec![0, 0, 0, 24];
        heic.extend_from_slice(b"ftypheic");
        heic.extend_from_slice(&[0; 16]);
        assert!(is_heif(&heic));

        let mut mp4 = vec![0, 0, 0, 24];
        mp4.extend_from_slice(b"ftypisom");
        mp4.extend_from_slice(&[0; 16]);
        assert!(!is_heif(&mp4));

        assert!(!is_heif(b"short"));
    }
}
