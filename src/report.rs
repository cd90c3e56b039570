//! Human-readable report rendering over the JSONL output.
//!
//! The output stream stays the machine contract; this renderer only
//! reads it back and pretty-prints each record for an operator.

use std::fmt::Write as _;

use crate::models::ImageRecord;

/// Render one record as a multi-line summary block.
pub fn render_record(record: &ImageRecord) -> String {
    let mut out = String::new();
    let results = &record.results;

    let _ = writeln!(out, "Image: {} ({})", record.id, record.filename);
    let _ = writeln!(out, "Timestamp: {}", record.timestamp.to_rfc3339());
    let _ = writeln!(out, "Document Type: {}", or_na(&results.classification.reasoning));
    let _ = writeln!(out, "Country: {}", or_na(&results.classification.country));
    let _ = writeln!(
        out,
        "Security Features: {}",
        or_na(&results.classification.security_features)
    );
    let _ = writeln!(
        out,
        "Error Check: {}",
        if results.error_check.has_errors {
            "Errors Found"
        } else {
            "No Errors"
        }
    );
    let _ = writeln!(out, "Error Feedback: {}", or_na(&results.error_check.feedback));
    let _ = writeln!(out, "Score: {}", results.error_check.score);

    let _ = writeln!(out, "PII Extraction:");
    if results.pii_narrative.is_empty() {
        let _ = writeln!(out, "  N/A");
    } else {
        for line in results.pii_narrative.lines() {
            let _ = writeln!(out, "  {line}");
        }
    }

    match record.identification() {
        Some(identification) => {
            let _ = writeln!(out, "Identification:");
            let _ = writeln!(out, "  Name: {}", or_na(&identification.name));
            let _ = writeln!(out, "  Date of Birth: {}", or_na(&identification.dob));
            let _ = writeln!(out, "  Address: {}", or_na(&identification.address));
            let _ = writeln!(out, "  ID Number: {}", or_na(&identification.id_number));
            let _ = writeln!(
                out,
                "  Issuing Authority: {}",
                or_na(&identification.issuing_authority)
            );
            let _ = writeln!(
                out,
                "  Expiration Date: {}",
                or_na(&identification.expiration_date)
            );
            let _ = writeln!(out, "  Photograph: {}", or_na(&identification.photograph));
            let _ = writeln!(
                out,
                "  Physical Descriptors: {}",
                or_na(&identification.physical_descriptors)
            );
            let _ = writeln!(out, "  Signature: {}", or_na(&identification.signature));
        }
        None => {
            let _ = writeln!(out, "Identification: N/A");
        }
    }

    out
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() {
        "N/A"
    } else {
        value
    }
}
