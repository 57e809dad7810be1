//! Security Metadata
//!
//! Classification, retention and access-control annotations attached to
//! artifacts before handoff to storage. Encryption is declared here and
//! applied by the transport/storage layer downstream.

use serde::{Deserialize, Serialize};

use crate::STANDARD_FAMILY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Public,
    Internal,
    Confidential,
    Secret,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessRole {
    Viewer,
    Investigator,
    Supervisor,
    Administrator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionMetadata {
    pub algorithm: String,
    pub encrypted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessControlMetadata {
    pub requires_auth: bool,
    pub minimum_role: AccessRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditMetadata {
    pub enabled: bool,
    pub retention_period: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GdprCompliance {
    pub lawful_basis: String,
    pub data_minimization: bool,
    pub subject_rights_supported: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityMetadata {
    pub standard_id: String,
    pub classification: Classification,
    pub encryption: EncryptionMetadata,
    pub access_control: AccessControlMetadata,
    pub audit: AuditMetadata,
    pub gdpr_compliance: GdprCompliance,
}

impl Default for SecurityMetadata {
    fn default() -> Self {
        Self {
            standard_id: STANDARD_FAMILY.to_string(),
            classification: Classification::Confidential,
            encryption: EncryptionMetadata {
                algorithm: "AES-256-GCM".to_string(),
                // Applied by the storage/transport layer, never here.
                encrypted: false,
            },
            access_control: AccessControlMetadata {
                requires_auth: true,
                minimum_role: AccessRole::Investigator,
            },
            audit: AuditMetadata {
                enabled: true,
                retention_period: "10 years".to_string(),
            },
            gdpr_compliance: GdprCompliance {
                lawful_basis: "legal_obligation".to_string(),
                data_minimization: true,
                subject_rights_supported: true,
            },
        }
    }
}

/// Thin structural builder with conservative defaults.
pub struct SecurityMetadataFactory;

impl SecurityMetadataFactory {
    /// Annotation for stored biometric templates.
    pub fn for_template() -> SecurityMetadata {
        SecurityMetadata::default()
    }

    /// Annotation for stored facial photographs.
    pub fn for_photo() -> SecurityMetadata {
        SecurityMetadata::default()
    }

    /// Override the classification while keeping every other default.
    pub fn with_classification(classification: Classification) -> SecurityMetadata {
        SecurityMetadata {
            classification,
            ..SecurityMetadata::default()
        }
    }

    /// Override the audit retention, validated.
    pub fn with_retention_years(years: u8) -> Result<SecurityMetadata, &'static str> {
        if !(1..=30).contains(&years) {
            return Err("retention must be between 1 and 30 years");
        }
        let mut metadata = SecurityMetadata::default();
        metadata.audit.retention_period = format!("{years} years");
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_conservative() {
        let metadata = SecurityMetadataFactory::for_template();

        assert_eq!(metadata.classification, Classification::Confidential);
        assert!(!metadata.encryption.encrypted);
        assert!(metadata.access_control.requires_auth);
        assert_eq!(metadata.access_control.minimum_role, AccessRole::Investigator);
        assert!(metadata.audit.enabled);
        assert_eq!(metadata.audit.retention_period, "10 years");
    }

    #[test]
    fn retention_is_validated() {
        assert!(SecurityMetadataFactory::with_retention_years(0).is_err());
        assert!(SecurityMetadataFactory::with_retention_years(31).is_err());

        let metadata = SecurityMetadataFactory::with_retention_years(5).unwrap();
        assert_eq!(metadata.audit.retention_period, "5 years");
    }

    #[test]
    fn roles_are_ordered_for_gate_checks() {
        assert!(AccessRole::Viewer < AccessRole::Investigator);
        assert!(AccessRole::Investigator < AccessRole::Administrator);
    }
}
