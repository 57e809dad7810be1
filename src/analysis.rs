//! Quality Analyzer - Pixel Statistics
//!
//! Decoding is the only operation in the engine that suspends, and the only
//! one allowed to fail with an error instead of a structured result.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Rec. 601 luma weights.
const LUMA_R: f64 = 0.299;
const LUMA_G: f64 = 0.587;
const LUMA_B: f64 = 0.114;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("input byte stream is empty")]
    EmptyInput,

    #[error("decode cancelled by caller")]
    Cancelled,
}

/// Aggregate luminance statistics over every pixel of a decoded image.
///
/// Derived once per image; `contrast` is max − min luma.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixelStatistics {
    pub mean_brightness: f64,
    pub min_brightness: f64,
    pub max_brightness: f64,
    pub contrast: f64,
}

/// Decoded dimensions plus the statistics computed in the same pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSurvey {
    pub width: u32,
    pub height: u32,
    pub statistics: PixelStatistics,
}

/// Decodes raster images and computes per-pixel luminance statistics.
#[derive(Debug, Default, Clone, Copy)]
pub struct QualityAnalyzer;

impl QualityAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Decode `bytes` and compute luminance statistics.
    pub async fn analyze(&self, bytes: &[u8]) -> Result<PixelStatistics, LoadError> {
        Ok(self.survey(bytes).await?.statistics)
    }

    /// Like [`analyze`](Self::analyze), but also returns decoded dimensions.
    pub async fn survey(&self, bytes: &[u8]) -> Result<ImageSurvey, LoadError> {
        self.survey_with_cancel(bytes, &CancellationToken::new())
            .await
    }

    /// Cancellable decode. Cancellation abandons the await; the in-flight
    /// decode still runs to completion on the blocking pool and its result
    /// is discarded.
    pub async fn survey_with_cancel(
        &self,
        bytes: &[u8],
        cancel: &CancellationToken,
    ) -> Result<ImageSurvey, LoadError> {
        let owned = bytes.to_vec();
        let handle = tokio::task::spawn_blocking(move || survey_sync(&owned));

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LoadError::Cancelled),
            joined = handle => match joined {
                Ok(result) => result,
                Err(e) => Err(LoadError::Decode(format!("decode task failed: {e}"))),
            },
        }
    }

    pub async fn analyze_with_cancel(
        &self,
        bytes: &[u8],
        cancel: &CancellationToken,
    ) -> Result<PixelStatistics, LoadError> {
        Ok(self.survey_with_cancel(bytes, cancel).await?.statistics)
    }
}

fn survey_sync(bytes: &[u8]) -> Result<ImageSurvey, LoadError> {
    if bytes.is_empty() {
        return Err(LoadError::EmptyInput);
    }

    let decoded = image::load_from_memory(bytes).map_err(|e| LoadError::Decode(e.to_string()))?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    let pixel_count = width as u64 * height as u64;
    if pixel_count == 0 {
        return Err(LoadError::Decode("image has zero pixels".to_string()));
    }

    let mut min = f64::MAX;
    let mut max = f64::MIN;
    let mut sum = 0.0_f64;

    // Single pass; no parallelism, matching the suspend-once contract.
    for pixel in rgb.pixels() {
        let luma =
            LUMA_R * pixel[0] as f64 + LUMA_G * pixel[1] as f64 + LUMA_B * pixel[2] as f64;
        sum += luma;
        if luma < min {
            min = luma;
        }
        if luma > max {
            max = luma;
        }
    }

    let statistics = PixelStatistics {
        mean_brightness: sum / pixel_count as f64,
        min_brightness: min,
        max_brightness: max,
        contrast: max - min,
    };

    debug!(
        width,
        height,
        mean = statistics.mean_brightness,
        contrast = statistics.contrast,
        "image surveyed"
    );

    Ok(ImageSurvey {
        width,
        height,
        statistics,
    })
}
