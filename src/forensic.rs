//! Recognition Event Logging - Chain of Custody
//!
//! Every comparison/recognition event is captured as a self-contained,
//! append-only record. The factory performs no I/O; the audit store that
//! receives the entry is somebody else's problem. Entries are never reused
//! or mutated after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ids;

/// Standard tag stamped on recognition log entries.
pub const RECOGNITION_LOG_STANDARD: &str = "ISO-IEC-19794-5-AUDIT";

/// Decision threshold recorded when the caller supplies no outcome.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.6;

/// Header for the flattened CSV export consumed by the reporting layer.
pub const CSV_HEADER: &str = "logId,timestamp,operatorUserId,matchFound,confidenceScore,standardId";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogType {
    RecognitionSearch,
    VerificationCheck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonType {
    OneToOne,
    OneToMany,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    Euclidean,
    Cosine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorIdentity {
    pub user_id: String,
    pub user_name: String,
    pub role: String,
    #[serde(default)]
    pub department: Option<String>,
}

/// Where the probe image came from. `digest` is the content hash the
/// screening pipeline computed for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReference {
    pub path: String,
    pub digest: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOutcome {
    pub match_found: bool,
    #[serde(default)]
    pub matched_subject_id: Option<String>,
    #[serde(default)]
    pub matched_subject_name: Option<String>,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    pub threshold: f64,
}

impl MatchOutcome {
    pub fn no_match(threshold: f64) -> Self {
        Self {
            match_found: false,
            matched_subject_id: None,
            matched_subject_name: None,
            confidence_score: None,
            threshold,
        }
    }

    pub fn matched(subject_id: &str, subject_name: &str, confidence: f64, threshold: f64) -> Self {
        Self {
            match_found: true,
            matched_subject_id: Some(subject_id.to_string()),
            matched_subject_name: Some(subject_name.to_string()),
            confidence_score: Some(confidence),
            threshold,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonMethod {
    pub comparison_type: ComparisonType,
    pub algorithm: String,
    pub model_version: String,
    pub distance_metric: DistanceMetric,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForensicContext {
    #[serde(default)]
    pub case_id: Option<String>,
    pub evidence_id: String,
    pub chain_of_custody: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GdprMetadata {
    pub legal_basis: String,
    pub retention_period: String,
    pub processing_purpose: String,
}

impl Default for GdprMetadata {
    fn default() -> Self {
        Self {
            legal_basis: "legal_obligation".to_string(),
            retention_period: "10 years".to_string(),
            processing_purpose: "criminal_investigation".to_string(),
        }
    }
}

/// One recognition/comparison event. Append-only: never mutated after
/// creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionLogEntry {
    pub standard_id: String,
    pub log_type: LogType,
    pub log_id: String,
    pub operator: OperatorIdentity,
    pub source: SourceReference,
    pub result: MatchOutcome,
    pub method: ComparisonMethod,
    pub forensic: ForensicContext,
    pub gdpr: GdprMetadata,
    pub timestamp: DateTime<Utc>,
}

impl RecognitionLogEntry {
    /// Flatten for the CSV export named by the reporting contract.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            self.log_id,
            self.timestamp.to_rfc3339(),
            self.operator.user_id,
            self.result.match_found,
            self.result
                .confidence_score
                .map(|c| format!("{c:.4}"))
                .unwrap_or_default(),
            self.standard_id,
        )
    }
}

/// Pure builder for recognition log entries.
#[derive(Debug, Clone)]
pub struct RecognitionLogFactory {
    log_type: LogType,
    gdpr: GdprMetadata,
}

impl RecognitionLogFactory {
    pub fn new() -> Self {
        Self {
            log_type: LogType::RecognitionSearch,
            gdpr: GdprMetadata::default(),
        }
    }

    pub fn log_type(mut self, log_type: LogType) -> Self {
        self.log_type = log_type;
        self
    }

    pub fn gdpr(mut self, gdpr: GdprMetadata) -> Self {
        self.gdpr = gdpr;
        self
    }

    /// Build a fresh entry. Every call yields new `log_id` and `evidence_id`
    /// values; a missing outcome is recorded as an explicit no-match.
    pub fn create(
        &self,
        operator: OperatorIdentity,
        source: SourceReference,
        outcome: Option<MatchOutcome>,
        method: ComparisonMethod,
        case_id: Option<String>,
    ) -> RecognitionLogEntry {
        let now = Utc::now();
        let log_id = ids::recognition_log_id(now);

        debug!(%log_id, operator = %operator.user_id, "recognition event recorded");

        RecognitionLogEntry {
            standard_id: RECOGNITION_LOG_STANDARD.to_string(),
            log_type: self.log_type,
            log_id,
            operator,
            source,
            result: outcome.unwrap_or_else(|| MatchOutcome::no_match(DEFAULT_MATCH_THRESHOLD)),
            method,
            forensic: ForensicContext {
                case_id,
                evidence_id: ids::evidence_id(),
                chain_of_custody: true,
            },
            gdpr: self.gdpr.clone(),
            timestamp: now,
        }
    }
}

impl Default for RecognitionLogFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn test_operator() -> OperatorIdentity {
        OperatorIdentity {
            user_id: "u-041".to_string(),
            user_name: "M. Reyes".to_string(),
            role: "investigator".to_string(),
            department: Some("major-crimes".to_string()),
        }
    }

    pub(crate) fn test_source() -> SourceReference {
        SourceReference {
            path: "/uploads/probe-7731.jpg".to_string(),
            digest: "sha-placeholder".to_string(),
            uploaded_at: Utc::now(),
        }
    }

    pub(crate) fn test_method() -> ComparisonMethod {
        ComparisonMethod {
            comparison_type: ComparisonType::OneToMany,
            algorithm: "ArcFace".to_string(),
            model_version: "1.2.0".to_string(),
            distance_metric: DistanceMetric::Cosine,
        }
    }

    #[test]
    fn entry_is_fully_populated() {
        let entry = RecognitionLogFactory::new().create(
            test_operator(),
            test_source(),
            Some(MatchOutcome::matched("subj-9", "J. Doe", 0.91, 0.6)),
            test_method(),
            Some("case-118".to_string()),
        );

        assert_eq!(entry.standard_id, RECOGNITION_LOG_STANDARD);
        assert!(entry.log_id.starts_with("FRL-"));
        assert!(entry.forensic.evidence_id.starts_with("EVD-"));
        assert!(entry.forensic.chain_of_custody);
        assert_eq!(entry.forensic.case_id.as_deref(), Some("case-118"));
        assert!(entry.result.match_found);
    }

    #[test]
    fn missing_outcome_becomes_explicit_no_match() {
        let entry = RecognitionLogFactory::new().create(
            test_operator(),
            test_source(),
            None,
            test_method(),
            None,
        );

        assert!(!entry.result.match_found);
        assert_eq!(entry.result.threshold, DEFAULT_MATCH_THRESHOLD);
        assert!(entry.result.matched_subject_id.is_none());
    }

    #[test]
    fn csv_row_matches_header_arity() {
        let entry = RecognitionLogFactory::new().create(
            test_operator(),
            test_source(),
            Some(MatchOutcome::matched("subj-9", "J. Doe", 0.91, 0.6)),
            test_method(),
            None,
        );

        let row = entry.to_csv_row();
        assert_eq!(row.split(',').count(), CSV_HEADER.split(',').count());
        assert!(row.contains("0.9100"));
    }

    #[test]
    fn wire_contract_uses_camel_case() {
        let entry = RecognitionLogFactory::new().create(
            test_operator(),
            test_source(),
            None,
            test_method(),
            None,
        );
        let json = serde_json::to_value(&entry).unwrap();

        assert!(json.get("logId").is_some());
        assert!(json["result"].get("matchFound").is_some());
        assert!(json["forensic"].get("chainOfCustody").is_some());
        assert_eq!(json["method"]["comparisonType"], "one_to_many");
    }
}
