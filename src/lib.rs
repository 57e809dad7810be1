//! VeriFace Core - Biometric Compliance Engine
//!
//! # The Five Rules (Non-Negotiable)
//! 1. Thresholds Are Contracts
//! 2. Validators Return, Never Panic
//! 3. Scoring Is Deterministic
//! 4. Templates Carry Their Own Integrity
//! 5. Recognition Logs Are Append-Only

pub mod analysis;
pub mod cache;
pub mod compliance;
pub mod forensic;
pub mod hashing;
mod ids;
pub mod normalize;
pub mod pipeline;
pub mod security;
pub mod template;
pub mod template_validation;

pub use analysis::{ImageSurvey, LoadError, PixelStatistics, QualityAnalyzer};
pub use cache::{CacheKey, ValidationCache};
pub use compliance::{
    ComplianceValidator, ImageFormat, ImageInput, ImageMetadata, Issue, IssueSeverity,
    ValidationResult,
};
pub use forensic::{
    ComparisonMethod, MatchOutcome, OperatorIdentity, RecognitionLogEntry, RecognitionLogFactory,
    SourceReference,
};
pub use hashing::DigestScheme;
pub use normalize::{ImageNormalizer, NormalizeError, NormalizedImage};
pub use pipeline::{PipelineError, ScreeningPipeline, ScreeningReport, ScreeningRequest};
pub use security::{SecurityMetadata, SecurityMetadataFactory};
pub use template::{BiometricTemplate, FaceAlgorithm, FeatureVector, TemplateBuilder};
pub use template_validation::{ComplianceLevel, TemplateValidationResult, TemplateValidator};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Standard family tag stamped on every artifact this engine produces.
pub const STANDARD_FAMILY: &str = "ISO-IEC-19794-5";

/// Version written into newly built templates.
pub const TEMPLATE_VERSION: &str = "2.0.0";

/// Oldest template version the validator accepts without a warning.
pub const MIN_TEMPLATE_VERSION: &str = "1.0.0";
