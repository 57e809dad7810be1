//! Compliance Validation - Rule/Score Separation
//!
//! Rules produce structured issues. The score is a pure function of the
//! issues plus bonus conditions. Nothing in this module panics or errors;
//! a decode failure arrives here already reduced to a single issue.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::{LoadError, PixelStatistics};
use crate::STANDARD_FAMILY;

pub const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const MIN_WIDTH: u32 = 480;
pub const MIN_HEIGHT: u32 = 640;
pub const OPTIMAL_WIDTH: u32 = 1024;
pub const OPTIMAL_HEIGHT: u32 = 1280;
pub const MIN_MEAN_BRIGHTNESS: f64 = 30.0;
pub const MAX_MEAN_BRIGHTNESS: f64 = 220.0;
pub const MIN_CONTRAST: f64 = 40.0;
pub const IDEAL_BRIGHTNESS_MIN: f64 = 80.0;
pub const IDEAL_BRIGHTNESS_MAX: f64 = 180.0;
pub const IDEAL_CONTRAST: f64 = 60.0;

const ERROR_PENALTY: i64 = 25;
const WARNING_PENALTY: i64 = 10;
const BONUS: i64 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// One rule finding. `code` is locale-neutral; `message` is the default
/// English rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub code: String,
    pub message: String,
    pub severity: IssueSeverity,
}

impl Issue {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            severity: IssueSeverity::Error,
        }
    }

    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            severity: IssueSeverity::Warning,
        }
    }
}

/// Container format as declared by the upload layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Jpeg2000,
    Unsupported(String),
}

impl ImageFormat {
    pub fn from_mime(mime: &str) -> Self {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Self::Jpeg,
            "image/png" => Self::Png,
            "image/jp2" | "image/jpeg2000" | "image/jpx" => Self::Jpeg2000,
            other => Self::Unsupported(other.to_string()),
        }
    }

    /// Sniff the container from magic bytes, independent of declaration.
    pub fn detect_from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x89, 0x50, 0x4e, 0x47]) {
            return Some(Self::Png);
        }
        if bytes.len() >= 3 && bytes.starts_with(&[0xff, 0xd8, 0xff]) {
            return Some(Self::Jpeg);
        }
        // JP2 signature box
        if bytes.len() >= 12 && bytes.starts_with(&[0x00, 0x00, 0x00, 0x0c, 0x6a, 0x50, 0x20, 0x20])
        {
            return Some(Self::Jpeg2000);
        }
        None
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Jpeg2000 => "jpeg2000",
            Self::Unsupported(mime) => mime,
        }
    }
}

/// Input for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInput {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
}

impl ImageInput {
    pub fn new(mime: &str, width: u32, height: u32, size_bytes: u64) -> Self {
        Self {
            format: ImageFormat::from_mime(mime),
            width,
            height,
            size_bytes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
    pub aspect_ratio: f64,
    pub brightness: f64,
    pub contrast: f64,
    /// Always clamped to [0, 100].
    pub quality_score: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub is_compliant: bool,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
    pub metadata: ImageMetadata,
    pub standard_id: String,
}

/// Compliance rule - produces issues.
pub trait ComplianceRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn evaluate(&self, input: &ImageInput, stats: Option<&PixelStatistics>) -> Vec<Issue>;
}

// --- Concrete Rules ---

pub struct FormatRule;

impl ComplianceRule for FormatRule {
    fn name(&self) -> &'static str {
        "format"
    }

    fn evaluate(&self, input: &ImageInput, _stats: Option<&PixelStatistics>) -> Vec<Issue> {
        if input.format.is_supported() {
            vec![]
        } else {
            vec![Issue::error(
                "INVALID_FORMAT",
                format!(
                    "format '{}' is not accepted; expected JPEG, PNG or JPEG2000",
                    input.format.as_str()
                ),
            )]
        }
    }
}

pub struct FileSizeRule;

impl ComplianceRule for FileSizeRule {
    fn name(&self) -> &'static str {
        "file_size"
    }

    fn evaluate(&self, input: &ImageInput, _stats: Option<&PixelStatistics>) -> Vec<Issue> {
        if input.size_bytes > MAX_FILE_SIZE_BYTES {
            vec![Issue::error(
                "FILE_TOO_LARGE",
                format!(
                    "file is {} bytes, limit is {} bytes",
                    input.size_bytes, MAX_FILE_SIZE_BYTES
                ),
            )]
        } else {
            vec![]
        }
    }
}

pub struct DimensionRule;

impl ComplianceRule for DimensionRule {
    fn name(&self) -> &'static str {
        "dimensions"
    }

    // Minimum and optimal checks are independent: an undersized image
    // collects both the error and the suboptimal warning for that axis.
    fn evaluate(&self, input: &ImageInput, _stats: Option<&PixelStatistics>) -> Vec<Issue> {
        let mut issues = vec![];

        if input.width < MIN_WIDTH {
            issues.push(Issue::error(
                "WIDTH_TOO_SMALL",
                format!("width {}px is below minimum {}px", input.width, MIN_WIDTH),
            ));
        }
        if input.height < MIN_HEIGHT {
            issues.push(Issue::error(
                "HEIGHT_TOO_SMALL",
                format!("height {}px is below minimum {}px", input.height, MIN_HEIGHT),
            ));
        }
        if input.width < OPTIMAL_WIDTH {
            issues.push(Issue::warning(
                "SUBOPTIMAL_WIDTH",
                format!("width {}px is below optimal {}px", input.width, OPTIMAL_WIDTH),
            ));
        }
        if input.height < OPTIMAL_HEIGHT {
            issues.push(Issue::warning(
                "SUBOPTIMAL_HEIGHT",
                format!(
                    "height {}px is below optimal {}px",
                    input.height, OPTIMAL_HEIGHT
                ),
            ));
        }

        issues
    }
}

pub struct LightingRule;

impl ComplianceRule for LightingRule {
    fn name(&self) -> &'static str {
        "lighting"
    }

    fn evaluate(&self, _input: &ImageInput, stats: Option<&PixelStatistics>) -> Vec<Issue> {
        let Some(stats) = stats else { return vec![] };

        if stats.mean_brightness < MIN_MEAN_BRIGHTNESS
            || stats.mean_brightness > MAX_MEAN_BRIGHTNESS
        {
            vec![Issue::warning(
                "POOR_LIGHTING",
                format!(
                    "mean brightness {:.1} outside acceptable range [{}, {}]",
                    stats.mean_brightness, MIN_MEAN_BRIGHTNESS, MAX_MEAN_BRIGHTNESS
                ),
            )]
        } else {
            vec![]
        }
    }
}

pub struct ContrastRule;

impl ComplianceRule for ContrastRule {
    fn name(&self) -> &'static str {
        "contrast"
    }

    fn evaluate(&self, _input: &ImageInput, stats: Option<&PixelStatistics>) -> Vec<Issue> {
        let Some(stats) = stats else { return vec![] };

        if stats.contrast < MIN_CONTRAST {
            vec![Issue::warning(
                "LOW_CONTRAST",
                format!(
                    "contrast {:.1} below minimum {}",
                    stats.contrast, MIN_CONTRAST
                ),
            )]
        } else {
            vec![]
        }
    }
}

/// Deterministic, order-independent quality score.
///
/// Starts at 100, subtracts 25 per error and 10 per warning, adds 5 for each
/// bonus condition met, clamps to [0, 100].
pub fn quality_score(
    error_count: usize,
    warning_count: usize,
    width: u32,
    height: u32,
    stats: Option<&PixelStatistics>,
) -> u8 {
    let mut score: i64 =
        100 - ERROR_PENALTY * error_count as i64 - WARNING_PENALTY * warning_count as i64;

    if width >= OPTIMAL_WIDTH {
        score += BONUS;
    }
    if height >= OPTIMAL_HEIGHT {
        score += BONUS;
    }
    if let Some(stats) = stats {
        if (IDEAL_BRIGHTNESS_MIN..=IDEAL_BRIGHTNESS_MAX).contains(&stats.mean_brightness) {
            score += BONUS;
        }
        if stats.contrast >= IDEAL_CONTRAST {
            score += BONUS;
        }
    }

    score.clamp(0, 100) as u8
}

/// Validator orchestrates the fixed rule table.
pub struct ComplianceValidator {
    rules: Vec<Box<dyn ComplianceRule>>,
}

impl ComplianceValidator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(FormatRule),
                Box::new(FileSizeRule),
                Box::new(DimensionRule),
                Box::new(LightingRule),
                Box::new(ContrastRule),
            ],
        }
    }

    /// Evaluate every rule. Never fails; lighting and contrast rules are
    /// skipped when pixel statistics are unavailable.
    pub fn validate(&self, input: &ImageInput, stats: Option<&PixelStatistics>) -> ValidationResult {
        let mut issues = vec![];
        for rule in &self.rules {
            issues.extend(rule.evaluate(input, stats));
        }
        self.finish(input, stats, issues)
    }

    /// Build the result for an image that could not be decoded: only the
    /// declaration-level rules (format, file size) run, plus one synthetic
    /// error carrying the load failure.
    pub fn validate_load_failure(
        &self,
        format: ImageFormat,
        size_bytes: u64,
        error: &LoadError,
    ) -> ValidationResult {
        let input = ImageInput {
            format,
            width: 0,
            height: 0,
            size_bytes,
        };

        let mut issues = vec![];
        issues.extend(FormatRule.evaluate(&input, None));
        issues.extend(FileSizeRule.evaluate(&input, None));
        issues.push(Issue::error("LOAD_ERROR", error.to_string()));

        self.finish(&input, None, issues)
    }

    fn finish(
        &self,
        input: &ImageInput,
        stats: Option<&PixelStatistics>,
        issues: Vec<Issue>,
    ) -> ValidationResult {
        let (errors, warnings): (Vec<_>, Vec<_>) = issues
            .into_iter()
            .partition(|i| i.severity == IssueSeverity::Error);

        let score = quality_score(errors.len(), warnings.len(), input.width, input.height, stats);

        debug!(
            errors = errors.len(),
            warnings = warnings.len(),
            score,
            "compliance evaluated"
        );

        let aspect_ratio = if input.height > 0 {
            input.width as f64 / input.height as f64
        } else {
            0.0
        };

        let is_valid = errors.is_empty();
        ValidationResult {
            is_valid,
            // Identical by design; separate field so a waiver mechanism can
            // diverge them without a wire change.
            is_compliant: is_valid,
            errors,
            warnings,
            metadata: ImageMetadata {
                format: input.format.as_str().to_string(),
                width: input.width,
                height: input.height,
                size_bytes: input.size_bytes,
                aspect_ratio,
                brightness: stats.map(|s| s.mean_brightness).unwrap_or(0.0),
                contrast: stats.map(|s| s.contrast).unwrap_or(0.0),
                quality_score: score,
            },
            standard_id: STANDARD_FAMILY.to_string(),
        }
    }
}

impl Default for ComplianceValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(mean: f64, contrast: f64) -> PixelStatistics {
        PixelStatistics {
            mean_brightness: mean,
            min_brightness: mean - contrast / 2.0,
            max_brightness: mean + contrast / 2.0,
            contrast,
        }
    }

    #[test]
    fn conforming_image_scores_full_marks() {
        let input = ImageInput::new("image/jpeg", 1200, 1600, 2 * 1024 * 1024);
        let s = stats(120.0, 90.0);
        let result = ComplianceValidator::new().validate(&input, Some(&s));

        assert!(result.is_valid);
        assert!(result.is_compliant);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
        // 100 + 4 bonuses, clamped
        assert_eq!(result.metadata.quality_score, 100);
    }

    #[test]
    fn undersized_axis_collects_error_and_warning() {
        let input = ImageInput::new("image/png", 300, 1600, 1024);
        let result = ComplianceValidator::new().validate(&input, None);

        let codes: Vec<&str> = result
            .errors
            .iter()
            .chain(result.warnings.iter())
            .map(|i| i.code.as_str())
            .collect();
        assert!(codes.contains(&"WIDTH_TOO_SMALL"));
        assert!(codes.contains(&"SUBOPTIMAL_WIDTH"));
        assert!(!codes.contains(&"HEIGHT_TOO_SMALL"));
    }

    #[test]
    fn oversize_file_is_an_error() {
        let input = ImageInput::new("image/jpeg", 1200, 1600, MAX_FILE_SIZE_BYTES + 1);
        let result = ComplianceValidator::new().validate(&input, None);

        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, "FILE_TOO_LARGE");
    }

    #[test]
    fn lighting_and_contrast_are_warnings_only() {
        let input = ImageInput::new("image/jpeg", 1200, 1600, 1024);
        let s = stats(10.0, 10.0);
        let result = ComplianceValidator::new().validate(&input, Some(&s));

        assert!(result.is_valid);
        let codes: Vec<&str> = result.warnings.iter().map(|i| i.code.as_str()).collect();
        assert!(codes.contains(&"POOR_LIGHTING"));
        assert!(codes.contains(&"LOW_CONTRAST"));
    }

    #[test]
    fn brightness_boundaries_are_inclusive() {
        let input = ImageInput::new("image/jpeg", 1200, 1600, 1024);

        let low = stats(MIN_MEAN_BRIGHTNESS, 100.0);
        let result = ComplianceValidator::new().validate(&input, Some(&low));
        assert!(result.warnings.iter().all(|i| i.code != "POOR_LIGHTING"));

        let high = stats(MAX_MEAN_BRIGHTNESS, 100.0);
        let result = ComplianceValidator::new().validate(&input, Some(&high));
        assert!(result.warnings.iter().all(|i| i.code != "POOR_LIGHTING"));
    }

    #[test]
    fn score_floor_is_zero() {
        assert_eq!(quality_score(10, 10, 0, 0, None), 0);
    }

    #[test]
    fn score_ceiling_is_one_hundred() {
        let s = stats(120.0, 90.0);
        assert_eq!(quality_score(0, 0, 4000, 4000, Some(&s)), 100);
    }

    #[test]
    fn load_failure_produces_single_synthetic_error() {
        let result = ComplianceValidator::new().validate_load_failure(
            ImageFormat::Png,
            1024,
            &LoadError::Decode("truncated stream".to_string()),
        );

        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, "LOAD_ERROR");
        assert_eq!(result.metadata.width, 0);
    }

    #[test]
    fn mime_parsing_covers_aliases() {
        assert_eq!(ImageFormat::from_mime("image/jpg"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_mime("IMAGE/PNG"), ImageFormat::Png);
        assert_eq!(ImageFormat::from_mime("image/jp2"), ImageFormat::Jpeg2000);
        assert!(!ImageFormat::from_mime("image/gif").is_supported());
    }

    #[test]
    fn magic_bytes_detection() {
        assert_eq!(
            ImageFormat::detect_from_bytes(&[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a]),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::detect_from_bytes(&[0xff, 0xd8, 0xff, 0xe0]),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(ImageFormat::detect_from_bytes(b"GIF89a"), None);
    }
}
