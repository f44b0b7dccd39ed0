//! Data models for the survey service.
//!
//! This module contains the core data structures: the raw submission
//! payload, the validated form of it, the durable survey record, and
//! the question catalog used for labeling and aggregation keys.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Validation failure for an incoming submission.
///
/// Validation runs before any filesystem mutation; a rejected payload
/// never touches the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("participantId is required")]
    MissingParticipantId,
    #[error("participantName is required")]
    MissingParticipantName,
}

/// A submission payload exactly as received on the wire.
///
/// Rating values and question keys are caller-trusted: no range check,
/// no completeness check against the catalog. A partial `responses`
/// map is legal and stored as-is.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSubmission {
    #[serde(default)]
    pub participant_id: String,
    #[serde(default)]
    pub participant_name: String,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub responses: BTreeMap<String, i64>,
}

impl RawSubmission {
    /// Check the required identifiers and produce the validated form.
    pub fn validate(self) -> Result<ValidSubmission, ValidationError> {
        let participant_id = self.participant_id.trim().to_string();
        if participant_id.is_empty() {
            return Err(ValidationError::MissingParticipantId);
        }

        let participant_name = self.participant_name.trim().to_string();
        if participant_name.is_empty() {
            return Err(ValidationError::MissingParticipantName);
        }

        Ok(ValidSubmission {
            participant_id,
            participant_name,
            condition: self.condition,
            responses: self.responses,
        })
    }
}

/// A submission that passed required-field validation.
#[derive(Debug, Clone)]
pub struct ValidSubmission {
    pub participant_id: String,
    pub participant_name: String,
    pub condition: Option<String>,
    pub responses: BTreeMap<String, i64>,
}

/// One durable survey record.
///
/// The serialized field names match the persisted JSON file format
/// exactly: `timestamp`, `ip`, `participantId`, `participantName`,
/// `condition`, `responses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyRecord {
    /// ISO-8601 instant with millisecond precision, assigned at write
    /// time. Kept as a string so stored files round-trip byte-for-byte;
    /// parsed back for ordering.
    pub timestamp: String,
    /// Best-effort network origin of the submitting client.
    pub ip: String,
    pub participant_id: String,
    pub participant_name: String,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub responses: BTreeMap<String, i64>,
}

impl SurveyRecord {
    /// Stamp a validated submission with the current time and the
    /// resolved caller origin.
    pub fn stamped(submission: ValidSubmission, origin: String) -> Self {
        Self::stamped_at(submission, origin, Utc::now())
    }

    /// Same as [`stamped`](Self::stamped) with an explicit instant.
    pub fn stamped_at(submission: ValidSubmission, origin: String, at: DateTime<Utc>) -> Self {
        Self {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            ip: origin,
            participant_id: submission.participant_id,
            participant_name: submission.participant_name,
            condition: submission.condition,
            responses: submission.responses,
        }
    }

    /// Parse the stored timestamp back into an instant, if well-formed.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// A record reconstructed from the store, annotated with its source
/// filename for traceability and stable row keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRecord {
    pub filename: String,
    #[serde(flatten)]
    pub record: SurveyRecord,
}

/// One questionnaire scale descriptor from the question catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub left_label: String,
    #[serde(default)]
    pub right_label: String,
}

/// Ordered list of question descriptors.
///
/// Supplied by configuration and consumed only for averaging keys and
/// export column labels. The service never validates submissions
/// against it and never mutates it; it is built once at startup and
/// passed explicitly to the read side.
#[derive(Debug, Clone)]
pub struct QuestionCatalog {
    questions: Vec<Question>,
}

impl QuestionCatalog {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    /// Load a catalog from a JSON file (an array of descriptors).
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read question catalog: {}", path.display()))?;
        let questions: Vec<Question> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse question catalog: {}", path.display()))?;

        Ok(Self { questions })
    }

    /// The six standard NASA-TLX workload scales, used when no catalog
    /// file is configured.
    pub fn nasa_tlx() -> Self {
        let scale = |id: &str, title: &str, description: &str, left: &str, right: &str| Question {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            left_label: left.to_string(),
            right_label: right.to_string(),
        };

        Self::new(vec![
            scale(
                "mental",
                "Mental Demand",
                "How mentally demanding was the task?",
                "Very Low",
                "Very High",
            ),
            scale(
                "physical",
                "Physical Demand",
                "How physically demanding was the task?",
                "Very Low",
                "Very High",
            ),
            scale(
                "temporal",
                "Temporal Demand",
                "How hurried or rushed was the pace of the task?",
                "Very Low",
                "Very High",
            ),
            scale(
                "performance",
                "Performance",
                "How successful were you in accomplishing what you were asked to do?",
                "Perfect",
                "Failure",
            ),
            scale(
                "effort",
                "Effort",
                "How hard did you have to work to accomplish your level of performance?",
                "Very Low",
                "Very High",
            ),
            scale(
                "frustration",
                "Frustration",
                "How insecure, discouraged, irritated, stressed, and annoyed were you?",
                "Very Low",
                "Very High",
            ),
        ])
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[allow(dead_code)] // Utility for reporting views
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[allow(dead_code)] // Utility for reporting views
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}
