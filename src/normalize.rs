//! Image Normalizer - Deterministic Rescale + Re-encode
//!
//! Upscales toward the optimal capture dimensions and always re-encodes as
//! JPEG at a fixed quality, recording every applied operation for the audit
//! trail.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::analysis::LoadError;
use crate::compliance::{OPTIMAL_HEIGHT, OPTIMAL_WIDTH};

pub const JPEG_QUALITY: u8 = 85;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("jpeg encode failed: {0}")]
    Encode(String),

    #[error("normalization cancelled by caller")]
    Cancelled,
}

/// Normalized output: re-encoded bytes plus the human-readable list of
/// operations applied, for the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedImage {
    pub data_base64: String,
    pub format: String,
    pub source_dimensions: [u32; 2],
    pub output_dimensions: [u32; 2],
    pub operations: Vec<String>,
}

impl NormalizedImage {
    /// Decode the re-encoded JPEG bytes out of the wire representation.
    pub fn image_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &self.data_base64)
    }
}

/// Deterministically rescales and re-encodes raster images.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageNormalizer;

impl ImageNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub async fn normalize(&self, bytes: &[u8]) -> Result<NormalizedImage, NormalizeError> {
        self.normalize_with_cancel(bytes, &CancellationToken::new())
            .await
    }

    /// Cancellable variant; the in-flight resample still runs to completion
    /// on the blocking pool and its result is discarded.
    pub async fn normalize_with_cancel(
        &self,
        bytes: &[u8],
        cancel: &CancellationToken,
    ) -> Result<NormalizedImage, NormalizeError> {
        let owned = bytes.to_vec();
        let handle = tokio::task::spawn_blocking(move || normalize_sync(&owned));

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(NormalizeError::Cancelled),
            joined = handle => match joined {
                Ok(result) => result,
                Err(e) => Err(NormalizeError::Encode(format!("normalize task failed: {e}"))),
            },
        }
    }
}

fn normalize_sync(bytes: &[u8]) -> Result<NormalizedImage, NormalizeError> {
    if bytes.is_empty() {
        return Err(LoadError::EmptyInput.into());
    }

    let decoded = image::load_from_memory(bytes)
        .map_err(|e| LoadError::Decode(e.to_string()))?;
    let source = decoded.to_rgb8();
    let (width, height) = source.dimensions();

    let mut operations = vec![];

    // Upscale only: scale toward the optimal portrait target when either
    // axis falls short, preserving aspect ratio via the larger factor.
    let scale = if width < OPTIMAL_WIDTH || height < OPTIMAL_HEIGHT {
        f64::max(
            OPTIMAL_WIDTH as f64 / width as f64,
            OPTIMAL_HEIGHT as f64 / height as f64,
        )
    } else {
        1.0
    };

    let rgb = if scale > 1.0 {
        let out_w = (width as f64 * scale).round() as u32;
        let out_h = (height as f64 * scale).round() as u32;
        operations.push(format!(
            "resized {}x{} -> {}x{} (lanczos3, scale {:.4})",
            width, height, out_w, out_h, scale
        ));
        image::imageops::resize(&source, out_w, out_h, FilterType::Lanczos3)
    } else {
        source
    };
    let output_dimensions = [rgb.width(), rgb.height()];

    let mut encoded = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut encoded, JPEG_QUALITY);
    encoder
        .encode_image(&rgb)
        .map_err(|e| NormalizeError::Encode(e.to_string()))?;
    operations.push(format!("re-encoded as JPEG (quality {JPEG_QUALITY})"));

    debug!(
        source_w = width,
        source_h = height,
        out_w = output_dimensions[0],
        out_h = output_dimensions[1],
        "image normalized"
    );

    Ok(NormalizedImage {
        data_base64: base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            &encoded,
        ),
        format: "jpeg".to_string(),
        source_dimensions: [width, height],
        output_dimensions,
        operations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 64])
        });
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[tokio::test]
    async fn small_input_is_upscaled_to_target() {
        let out = ImageNormalizer::new()
            .normalize(&png_bytes(300, 400))
            .await
            .unwrap();

        // scale = max(1024/300, 1280/400) = 3.4133..
        assert_eq!(out.source_dimensions, [300, 400]);
        assert_eq!(out.output_dimensions, [1024, 1365]);
        assert_eq!(out.format, "jpeg");
        assert_eq!(out.operations.len(), 2);
    }

    #[tokio::test]
    async fn large_input_is_only_reencoded() {
        let out = ImageNormalizer::new()
            .normalize(&png_bytes(1100, 1300))
            .await
            .unwrap();

        assert_eq!(out.output_dimensions, [1100, 1300]);
        assert_eq!(out.operations.len(), 1);
        assert!(out.operations[0].contains("JPEG"));
    }

    #[tokio::test]
    async fn output_is_valid_jpeg() {
        let out = ImageNormalizer::new()
            .normalize(&png_bytes(300, 400))
            .await
            .unwrap();

        let bytes = out.image_bytes().unwrap();
        assert_eq!(
            image::guess_format(&bytes).unwrap(),
            image::ImageFormat::Jpeg
        );
        let reopened = image::load_from_memory(&bytes).unwrap();
        assert_eq!(reopened.width(), 1024);
        assert_eq!(reopened.height(), 1365);
    }

    #[tokio::test]
    async fn deterministic_for_identical_input() {
        let input = png_bytes(200, 300);
        let normalizer = ImageNormalizer::new();
        let a = normalizer.normalize(&input).await.unwrap();
        let b = normalizer.normalize(&input).await.unwrap();

        assert_eq!(a.data_base64, b.data_base64);
        assert_eq!(a.operations, b.operations);
    }

    #[tokio::test]
    async fn corrupt_input_surfaces_load_error() {
        let result = ImageNormalizer::new().normalize(b"garbage").await;
        assert!(matches!(result, Err(NormalizeError::Load(_))));
    }
}
