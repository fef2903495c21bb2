//! Procedure records.

use chrono::{DateTime, Utc};
use vaultmd_types::RecordId;

/// The unit handed to the persistence collaborator: the original merged text and, once
/// generation has succeeded, the model's output.
///
/// The identifier and timestamp are fixed when the record is created. The original text is kept
/// exactly as given, whitespace included, and cannot change afterwards; output can only be
/// attached by consuming the record.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProcedureRecord {
    id: RecordId,
    original_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    generated_output: Option<String>,
    timestamp: DateTime<Utc>,
}

impl ProcedureRecord {
    pub fn new(original_text: impl Into<String>) -> Self {
        Self {
            id: RecordId::new(),
            original_text: original_text.into(),
            generated_output: None,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_generated_output(mut self, output: String) -> Self {
        self.generated_output = Some(output);
        self
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    pub fn generated_output(&self) -> Option<&str> {
        self.generated_output.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_has_id_and_no_output() {
        let record = ProcedureRecord::new("Appendectomy.");
        assert!(RecordId::is_canonical(&record.id().to_string()));
        assert_eq!(record.original_text(), "Appendectomy.");
        assert!(record.generated_output().is_none());
    }

    #[test]
    fn attaching_output_keeps_identity() {
        let record = ProcedureRecord::new("Appendectomy.");
        let id = record.id();
        let timestamp = record.timestamp();

        let record = record.with_generated_output("CPT Codes: 44970".into());

        assert_eq!(record.id(), id);
        assert_eq!(record.timestamp(), timestamp);
        assert_eq!(record.generated_output(), Some("CPT Codes: 44970"));
    }

    #[test]
    fn original_text_keeps_surrounding_whitespace() {
        let record = ProcedureRecord::new("  indented line\nlast line\n\n");
        assert_eq!(record.original_text(), "  indented line\nlast line\n\n");

        let yaml = serde_yaml::to_string(&record).unwrap();
        let loaded: ProcedureRecord = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(loaded.original_text(), "  indented line\nlast line\n\n");
    }

    #[test]
    fn yaml_omits_missing_output() {
        let record = ProcedureRecord::new("Appendectomy.");
        let yaml = serde_yaml::to_string(&record).unwrap();

        assert!(yaml.contains("original_text: Appendectomy."));
        assert!(!yaml.contains("generated_output"));
    }
}
