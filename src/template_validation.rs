//! Template Re-Validation
//!
//! Structural re-check of a stored template plus an integrity recompute.
//! A digest mismatch signals tampering or corruption and is the only fatal
//! finding; everything else degrades to warnings.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compliance::Issue;
use crate::hashing;
use crate::template::{BiometricTemplate, FaceAlgorithm};
use crate::MIN_TEMPLATE_VERSION;

/// Family token every template's standard tag must carry.
pub const STANDARD_TOKEN: &str = "19794-5";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceLevel {
    Full,
    Partial,
    NonCompliant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateValidationResult {
    pub is_valid: bool,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
    pub compliance_level: ComplianceLevel,
}

/// Re-checks template records read back from storage.
pub struct TemplateValidator {
    min_version: Option<semver::Version>,
}

impl TemplateValidator {
    pub fn new() -> Self {
        Self {
            min_version: semver::Version::parse(MIN_TEMPLATE_VERSION).ok(),
        }
    }

    /// Structural checks plus digest recompute. Never throws; the result
    /// carries everything the caller needs to decide.
    pub fn validate(&self, template: &BiometricTemplate) -> TemplateValidationResult {
        let mut errors = vec![];
        let mut warnings = vec![];

        if !template.standard_id.contains(STANDARD_TOKEN) {
            errors.push(Issue::error(
                "INVALID_STANDARD",
                format!(
                    "standard tag '{}' does not carry the {} family id",
                    template.standard_id, STANDARD_TOKEN
                ),
            ));
        }

        if template.feature_vector.data.is_empty() {
            errors.push(Issue::error(
                "EMPTY_FEATURE_VECTOR",
                "template carries no feature vector data",
            ));
        }

        let algorithm = template.encoding.algorithm.trim();
        if algorithm.is_empty() {
            errors.push(Issue::error(
                "MISSING_ALGORITHM",
                "encoding does not name the producing algorithm",
            ));
        } else if let Some(known) = FaceAlgorithm::from_name(algorithm) {
            if !template.feature_vector.data.is_empty()
                && template.feature_vector.data.len() != known.expected_dimension()
            {
                warnings.push(Issue::warning(
                    "DIMENSION_MISMATCH",
                    format!(
                        "vector has {} elements, {} produces {}",
                        template.feature_vector.data.len(),
                        known,
                        known.expected_dimension()
                    ),
                ));
            }
        }

        if template.feature_vector.dimension != template.feature_vector.data.len() {
            warnings.push(Issue::warning(
                "DIMENSION_FIELD_MISMATCH",
                format!(
                    "declared dimension {} but vector holds {} elements",
                    template.feature_vector.dimension,
                    template.feature_vector.data.len()
                ),
            ));
        }

        match (&self.min_version, semver::Version::parse(&template.version)) {
            (Some(min), Ok(version)) if version < *min => {
                warnings.push(Issue::warning(
                    "OUTDATED_TEMPLATE_VERSION",
                    format!("template version {version} predates supported minimum {min}"),
                ));
            }
            (_, Err(_)) => {
                warnings.push(Issue::warning(
                    "MALFORMED_VERSION",
                    format!("template version '{}' is not a semantic version", template.version),
                ));
            }
            _ => {}
        }

        // Tamper check last: recompute under the scheme the stored digest
        // declares and compare.
        if !hashing::verify_vector_digest(&template.integrity_digest, &template.feature_vector.data)
        {
            errors.push(Issue::error(
                "INTEGRITY_MISMATCH",
                "stored integrity digest does not match the feature vector",
            ));
        }

        let compliance_level = if !errors.is_empty() {
            ComplianceLevel::NonCompliant
        } else if !warnings.is_empty() {
            ComplianceLevel::Partial
        } else {
            ComplianceLevel::Full
        };

        debug!(
            template_id = %template.template_id,
            errors = errors.len(),
            warnings = warnings.len(),
            ?compliance_level,
            "template re-validated"
        );

        TemplateValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            compliance_level,
        }
    }
}

impl Default for TemplateValidator {
    fn default() -> Self {
        Self::new()
    }
}
