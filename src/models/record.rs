//! Per-image analysis records written to the JSONL output stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Output of the document classification stage.
///
/// All fields are best-effort text parsed from labeled model output;
/// a label the model did not emit degrades to an empty string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Narrative reasoning about document type and condition.
    #[serde(default)]
    pub reasoning: String,
    /// Whether the document carries any readable text.
    #[serde(default)]
    pub contains_text: bool,
    /// Country of issue.
    #[serde(default)]
    pub country: String,
    /// Described security features, or empty.
    #[serde(default)]
    pub security_features: String,
    /// Non-text visual elements, or empty.
    #[serde(default)]
    pub visual_elements: String,
}

/// Output of the consistency / error-check stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorCheck {
    #[serde(default)]
    pub reasoning: String,
    /// True if the model flagged missing or inconsistent information.
    #[serde(default)]
    pub has_errors: bool,
    /// Detailed feedback about what is wrong or missing.
    #[serde(default)]
    pub feedback: String,
    /// Consistency score, always clamped to [0.0, 1.0].
    /// 1.0 means fully consistent, 0.0 inconsistent or unparsable.
    #[serde(default)]
    pub score: f64,
}

/// Structured identification fields extracted from the document.
///
/// Always carries exactly these nine keys; a field the model failed
/// to produce is an empty string, never a missing key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identification {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dob: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub id_number: String,
    #[serde(default)]
    pub issuing_authority: String,
    #[serde(default)]
    pub expiration_date: String,
    #[serde(default)]
    pub photograph: String,
    #[serde(default)]
    pub physical_descriptors: String,
    #[serde(default)]
    pub signature: String,
}

impl Identification {
    /// Canonical field names, in extraction order.
    pub const FIELDS: [&'static str; 9] = [
        "name",
        "dob",
        "address",
        "id_number",
        "issuing_authority",
        "expiration_date",
        "photograph",
        "physical_descriptors",
        "signature",
    ];
}

/// Per-stage results in execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResults {
    pub classification: Classification,
    pub error_check: ErrorCheck,
    /// Display-oriented PII narrative. Empty when the stage's call failed.
    #[serde(default)]
    pub pii_narrative: String,
    /// Structured identification serialized as an embedded JSON string,
    /// so the field round-trips through the outer JSONL encoding intact.
    #[serde(default)]
    pub identification: String,
}

/// One complete, terminal analysis record for one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Identifier derived from the filename stem.
    pub id: String,
    /// Source path of the image.
    pub filename: String,
    /// Completion time of the pipeline run.
    pub timestamp: DateTime<Utc>,
    pub results: StageResults,
}

impl ImageRecord {
    /// Parse the embedded identification JSON back into its fields.
    pub fn identification(&self) -> Option<Identification> {
        serde_json::from_str(&self.results.identification).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identification_serializes_all_nine_keys() {
        let json = serde_json::to_value(Identification::default()).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), Identification::FIELDS.len());
        for field in Identification::FIELDS {
            assert!(object.contains_key(field), "missing key {field}");
        }
    }

    #[test]
    fn embedded_identification_round_trips() {
        let identification = Identification {
            name: "Jane \"JD\" Doe".to_string(),
            id_number: "D123-456".to_string(),
            ..Default::default()
        };
        let record = ImageRecord {
            id: "sample".to_string(),
            filename: "sample.png".to_string(),
            timestamp: Utc::now(),
            results: StageResults {
                classification: Classification::default(),
                error_check: ErrorCheck::default(),
                pii_narrative: String::new(),
                identification: serde_json::to_string(&identification).unwrap(),
            },
        };

        let line = serde_json::to_string(&record).unwrap();
        let parsed: ImageRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.identification().unwrap(), identification);
    }
}
