//! Biometric Template Records - Integrity-Checked Wrappers
//!
//! A template wraps a caller-supplied feature vector with provenance metadata
//! and a self-describing integrity digest. The builder is lenient: malformed
//! input degrades to recorded warnings, never a refusal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::hashing::{compute_vector_digest, DigestScheme};
use crate::ids;
use crate::{STANDARD_FAMILY, TEMPLATE_VERSION};

/// Tolerance for the unit-norm check.
pub const L2_TOLERANCE: f64 = 0.01;

/// Recognition models this engine knows the output dimension of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaceAlgorithm {
    #[serde(rename = "FaceNet")]
    FaceNet,
    #[serde(rename = "ResNet-50")]
    ResNet50,
    #[serde(rename = "ArcFace")]
    ArcFace,
    #[serde(rename = "DeepFace")]
    DeepFace,
    #[serde(rename = "VGGFace")]
    VggFace,
    #[serde(rename = "OpenFace")]
    OpenFace,
}

impl FaceAlgorithm {
    pub const ALL: [FaceAlgorithm; 6] = [
        Self::FaceNet,
        Self::ResNet50,
        Self::ArcFace,
        Self::DeepFace,
        Self::VggFace,
        Self::OpenFace,
    ];

    pub fn expected_dimension(self) -> usize {
        match self {
            Self::FaceNet | Self::OpenFace => 128,
            Self::ResNet50 | Self::ArcFace => 512,
            Self::DeepFace => 4096,
            Self::VggFace => 2622,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FaceNet => "FaceNet",
            Self::ResNet50 => "ResNet-50",
            Self::ArcFace => "ArcFace",
            Self::DeepFace => "DeepFace",
            Self::VggFace => "VGGFace",
            Self::OpenFace => "OpenFace",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.as_str() == name)
    }
}

impl std::fmt::Display for FaceAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureVector {
    pub data: Vec<f64>,
    pub dimension: usize,
    pub normalized: bool,
}

impl FeatureVector {
    pub fn from_data(data: Vec<f64>) -> Self {
        let normalized = (Self::l2_norm(&data) - 1.0).abs() < L2_TOLERANCE;
        Self {
            dimension: data.len(),
            normalized,
            data,
        }
    }

    pub fn l2_norm(data: &[f64]) -> f64 {
        data.iter().map(|v| v * v).sum::<f64>().sqrt()
    }
}

/// How and when the feature vector was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingInfo {
    /// Stored as the model's display name so templates from deployments with
    /// other model registries stay readable.
    pub algorithm: String,
    pub model_version: String,
    pub framework: String,
    pub encoding_date: DateTime<Utc>,
}

/// Capture context, all optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSource {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub captured_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateQuality {
    #[serde(default)]
    pub source_image_score: Option<u8>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiometricTemplate {
    pub standard_id: String,
    pub version: String,
    pub template_id: String,
    pub feature_vector: FeatureVector,
    pub encoding: EncodingInfo,
    pub quality: TemplateQuality,
    pub source: CaptureSource,
    pub created_at: DateTime<Utc>,
    pub integrity_digest: String,
}

/// Builds template records around caller-supplied feature vectors.
#[derive(Debug, Clone)]
pub struct TemplateBuilder {
    algorithm: FaceAlgorithm,
    model_version: String,
    framework: String,
    scheme: DigestScheme,
    source: CaptureSource,
    source_image_score: Option<u8>,
}

impl TemplateBuilder {
    pub fn new(algorithm: FaceAlgorithm) -> Self {
        Self {
            algorithm,
            model_version: "1.0.0".to_string(),
            framework: "onnxruntime".to_string(),
            scheme: DigestScheme::Sha256,
            source: CaptureSource::default(),
            source_image_score: None,
        }
    }

    pub fn model_version(mut self, version: impl Into<String>) -> Self {
        self.model_version = version.into();
        self
    }

    pub fn framework(mut self, framework: impl Into<String>) -> Self {
        self.framework = framework.into();
        self
    }

    /// Select the digest scheme. Legacy exists for records that must match
    /// digests written by earlier deployments.
    pub fn digest_scheme(mut self, scheme: DigestScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn capture_source(mut self, source: CaptureSource) -> Self {
        self.source = source;
        self
    }

    pub fn source_image_score(mut self, score: u8) -> Self {
        self.source_image_score = Some(score);
        self
    }

    /// Wrap `data` into a template. Lenient: a dimension mismatch or empty
    /// vector is logged and recorded as a quality warning, and the template
    /// is still returned.
    pub fn build(&self, data: Vec<f64>) -> BiometricTemplate {
        let mut warnings = vec![];

        if data.is_empty() {
            warn!(algorithm = %self.algorithm, "building template from empty feature vector");
            warnings.push("feature vector is empty".to_string());
        } else if data.len() != self.algorithm.expected_dimension() {
            warn!(
                algorithm = %self.algorithm,
                got = data.len(),
                expected = self.algorithm.expected_dimension(),
                "feature vector dimension mismatch"
            );
            warnings.push(format!(
                "dimension {} does not match {} (expected {})",
                data.len(),
                self.algorithm,
                self.algorithm.expected_dimension()
            ));
        }

        let feature_vector = FeatureVector::from_data(data);
        let integrity_digest = compute_vector_digest(self.scheme, &feature_vector.data);
        let now = Utc::now();

        BiometricTemplate {
            standard_id: STANDARD_FAMILY.to_string(),
            version: TEMPLATE_VERSION.to_string(),
            template_id: ids::template_id(now),
            feature_vector,
            encoding: EncodingInfo {
                algorithm: self.algorithm.as_str().to_string(),
                model_version: self.model_version.clone(),
                framework: self.framework.clone(),
                encoding_date: now,
            },
            quality: TemplateQuality {
                source_image_score: self.source_image_score,
                warnings,
            },
            source: self.source.clone(),
            created_at: now,
            integrity_digest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::SHA256_PREFIX;

    pub(crate) fn unit_vector(len: usize) -> Vec<f64> {
        let value = 1.0 / (len as f64).sqrt();
        vec![value; len]
    }

    #[test]
    fn expected_dimensions_match_registry() {
        assert_eq!(FaceAlgorithm::FaceNet.expected_dimension(), 128);
        assert_eq!(FaceAlgorithm::ResNet50.expected_dimension(), 512);
        assert_eq!(FaceAlgorithm::ArcFace.expected_dimension(), 512);
        assert_eq!(FaceAlgorithm::DeepFace.expected_dimension(), 4096);
        assert_eq!(FaceAlgorithm::VggFace.expected_dimension(), 2622);
        assert_eq!(FaceAlgorithm::OpenFace.expected_dimension(), 128);
    }

    #[test]
    fn algorithm_names_round_trip() {
        for algo in FaceAlgorithm::ALL {
            assert_eq!(FaceAlgorithm::from_name(algo.as_str()), Some(algo));
        }
        assert_eq!(FaceAlgorithm::from_name("GhostNet"), None);
    }

    #[test]
    fn unit_vector_is_flagged_normalized() {
        let fv = FeatureVector::from_data(unit_vector(128));
        assert!(fv.normalized);
        assert_eq!(fv.dimension, 128);
    }

    #[test]
    fn unnormalized_vector_is_flagged() {
        let fv = FeatureVector::from_data(vec![3.0; 128]);
        assert!(!fv.normalized);
    }

    #[test]
    fn build_is_lenient_on_dimension_mismatch() {
        let template = TemplateBuilder::new(FaceAlgorithm::FaceNet).build(unit_vector(64));

        assert_eq!(template.feature_vector.dimension, 64);
        assert_eq!(template.quality.warnings.len(), 1);
        assert!(template.quality.warnings[0].contains("dimension"));
    }

    #[test]
    fn default_digest_is_sha256() {
        let template = TemplateBuilder::new(FaceAlgorithm::FaceNet).build(unit_vector(128));
        assert!(template.integrity_digest.starts_with(SHA256_PREFIX));
    }

    #[test]
    fn legacy_scheme_is_selectable() {
        let template = TemplateBuilder::new(FaceAlgorithm::FaceNet)
            .digest_scheme(DigestScheme::Legacy)
            .build(unit_vector(128));
        assert_eq!(template.integrity_digest.len(), 16);
    }

    #[test]
    fn template_ids_are_unique_and_uppercase() {
        let builder = TemplateBuilder::new(FaceAlgorithm::ArcFace);
        let a = builder.build(unit_vector(512));
        let b = builder.build(unit_vector(512));

        assert_ne!(a.template_id, b.template_id);
        assert!(a.template_id.starts_with("BT-"));
        assert_eq!(a.template_id, a.template_id.to_uppercase());
    }

    #[test]
    fn wire_contract_uses_camel_case() {
        let template = TemplateBuilder::new(FaceAlgorithm::FaceNet).build(unit_vector(128));
        let json = serde_json::to_value(&template).unwrap();

        assert!(json.get("templateId").is_some());
        assert!(json.get("integrityDigest").is_some());
        assert!(json.get("featureVector").is_some());
        assert_eq!(json["encoding"]["algorithm"], "FaceNet");
    }
}
