//! Screening Pipeline - Single Entry Point
//!
//! CRITICAL: screen MUST run compliance validation internally. No bypass.
//! Decode failure is folded into the structured result; only cancellation
//! and normalization faults surface as errors.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::analysis::{LoadError, PixelStatistics, QualityAnalyzer};
use crate::cache::{CacheKey, ValidationCache};
use crate::compliance::{ComplianceValidator, ImageFormat, ImageInput, ValidationResult};
use crate::hashing::sha256_hex;
use crate::normalize::{ImageNormalizer, NormalizeError, NormalizedImage};

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static VALIDATION_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_validation_call_count() -> u32 {
    VALIDATION_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_validation_call_count() {
    VALIDATION_CALL_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("screening cancelled by caller")]
    Cancelled,

    #[error("normalization failed: {0}")]
    Normalize(#[from] NormalizeError),
}

#[derive(Debug, Clone)]
pub struct ScreeningRequest {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    /// Optional content identity for the session cache.
    pub cache_identity: Option<CacheKey>,
    /// Request deterministic rescale/re-encode of a decodable image.
    pub normalize: bool,
}

impl ScreeningRequest {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
            cache_identity: None,
            normalize: false,
        }
    }

    pub fn with_cache_identity(mut self, identity: CacheKey) -> Self {
        self.cache_identity = Some(identity);
        self
    }

    pub fn with_normalization(mut self) -> Self {
        self.normalize = true;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningReport {
    pub validation: ValidationResult,
    /// Absent when the image could not be decoded or the verdict came from
    /// the session cache.
    pub statistics: Option<PixelStatistics>,
    pub normalized: Option<NormalizedImage>,
    /// SHA-256 of the input bytes, for provenance and forensic source refs.
    pub source_digest: String,
    pub from_cache: bool,
}

/// The screening pipeline - single entry point for image intake.
pub struct ScreeningPipeline {
    analyzer: QualityAnalyzer,
    validator: ComplianceValidator,
    normalizer: ImageNormalizer,
    cache: Option<Arc<ValidationCache>>,
}

impl ScreeningPipeline {
    pub fn new() -> Self {
        Self {
            analyzer: QualityAnalyzer::new(),
            validator: ComplianceValidator::new(),
            normalizer: ImageNormalizer::new(),
            cache: None,
        }
    }

    /// Attach the session-owned validation cache.
    pub fn with_cache(mut self, cache: Arc<ValidationCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub async fn screen(&self, request: &ScreeningRequest) -> Result<ScreeningReport, PipelineError> {
        self.screen_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Screen one image: decode statistics, validate against the rule table,
    /// optionally normalize. Validation is always performed (or served from
    /// the session cache keyed by content identity); there is no bypass.
    pub async fn screen_with_cancel(
        &self,
        request: &ScreeningRequest,
        cancel: &CancellationToken,
    ) -> Result<ScreeningReport, PipelineError> {
        let source_digest = sha256_hex(&request.bytes);
        let declared = ImageFormat::from_mime(&request.mime_type);

        if let Some(sniffed) = ImageFormat::detect_from_bytes(&request.bytes) {
            if sniffed != declared {
                warn!(
                    file = %request.file_name,
                    declared = declared.as_str(),
                    sniffed = sniffed.as_str(),
                    "declared MIME type does not match container signature"
                );
            }
        }

        if let (Some(cache), Some(identity)) = (&self.cache, &request.cache_identity) {
            if let Some(validation) = cache.get(identity) {
                // A cached verdict may be non-compliant yet still decodable;
                // only a recorded load failure rules out normalization.
                let decodable = validation.errors.iter().all(|i| i.code != "LOAD_ERROR");
                let normalized = self.maybe_normalize(request, cancel, decodable).await?;
                return Ok(ScreeningReport {
                    validation,
                    statistics: None,
                    normalized,
                    source_digest,
                    from_cache: true,
                });
            }
        }

        #[cfg(feature = "test-hooks")]
        VALIDATION_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

        let (validation, statistics) = match self
            .analyzer
            .survey_with_cancel(&request.bytes, cancel)
            .await
        {
            Ok(survey) => {
                let input = ImageInput {
                    format: declared,
                    width: survey.width,
                    height: survey.height,
                    size_bytes: request.bytes.len() as u64,
                };
                (
                    self.validator.validate(&input, Some(&survey.statistics)),
                    Some(survey.statistics),
                )
            }
            Err(LoadError::Cancelled) => return Err(PipelineError::Cancelled),
            Err(load) => {
                debug!(file = %request.file_name, error = %load, "decode failed, folding into result");
                (
                    self.validator.validate_load_failure(
                        declared,
                        request.bytes.len() as u64,
                        &load,
                    ),
                    None,
                )
            }
        };

        if let (Some(cache), Some(identity)) = (&self.cache, &request.cache_identity) {
            cache.put(identity.clone(), validation.clone());
        }

        let normalized = self
            .maybe_normalize(request, cancel, statistics.is_some())
            .await?;

        Ok(ScreeningReport {
            validation,
            statistics,
            normalized,
            source_digest,
            from_cache: false,
        })
    }

    async fn maybe_normalize(
        &self,
        request: &ScreeningRequest,
        cancel: &CancellationToken,
        decodable: bool,
    ) -> Result<Option<NormalizedImage>, PipelineError> {
        if !request.normalize || !decodable {
            return Ok(None);
        }
        match self
            .normalizer
            .normalize_with_cancel(&request.bytes, cancel)
            .await
        {
            Ok(normalized) => Ok(Some(normalized)),
            Err(NormalizeError::Cancelled) => Err(PipelineError::Cancelled),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for ScreeningPipeline {
    fn default() -> Self {
        Self::new()
    }
}
