//! Tolerant parsing of raw model output into stage fields.
//!
//! Model output is untrusted text. Every parser here degrades instead
//! of failing: missing labels become empty strings, malformed JSON goes
//! through best-effort repair, and an unusable blob falls back to
//! defaults. Nothing in this module returns an error.

use serde_json::Value;

use crate::models::{Classification, ErrorCheck, Identification};

/// How much of a structured response survived parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Every expected field was recovered.
    Parsed,
    /// Some fields were recovered; the rest defaulted to empty.
    Partial,
    /// Nothing usable was recovered; all fields defaulted.
    Unparsed,
}

/// Split labeled model output into (label, value) sections.
///
/// A section starts at a line whose prefix (after optional bullet
/// markers) case-insensitively matches `label:` and runs until the
/// next recognized label. Returns values indexed like `labels`.
fn split_labeled(text: &str, labels: &[&str]) -> Vec<Option<String>> {
    let mut values: Vec<Option<String>> = vec![None; labels.len()];
    let mut current: Option<usize> = None;

    for line in text.lines() {
        let stripped = line
            .trim_start()
            .trim_start_matches(['-', '*', '#'])
            .trim_start();

        let mut matched = None;
        for (idx, label) in labels.iter().enumerate() {
            let Some(head) = stripped.get(..label.len()) else {
                continue;
            };
            if head.eq_ignore_ascii_case(label) {
                let rest = stripped[label.len()..].trim_start();
                if let Some(value) = rest.strip_prefix(':') {
                    matched = Some((idx, value.trim().to_string()));
                    break;
                }
            }
        }

        match matched {
            Some((idx, value)) => {
                values[idx] = Some(value);
                current = Some(idx);
            }
            None => {
                // Continuation line of the current section.
                if let Some(idx) = current {
                    if let Some(value) = values[idx].as_mut() {
                        if !line.trim().is_empty() {
                            if !value.is_empty() {
                                value.push('\n');
                            }
                            value.push_str(line.trim());
                        }
                    }
                }
            }
        }
    }

    values
}

/// Parse a loosely-phrased boolean ("true", "Yes.", "TRUE - ...").
fn parse_bool(text: &str) -> bool {
    let lower = text.trim().to_ascii_lowercase();
    lower.starts_with("true") || lower.starts_with("yes")
}

/// Parse a consistency score and clamp it into [0.0, 1.0].
///
/// Takes the first numeric token found; anything unparsable or
/// non-finite defaults to 0.0.
pub fn parse_score(text: &str) -> f64 {
    let mut token = String::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() || c == '-' || c == '+' {
            break;
        }
        chars.next();
    }
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() || c == '.' || c == '-' || c == '+' {
            token.push(c);
            chars.next();
        } else {
            break;
        }
    }

    match token.parse::<f64>() {
        Ok(score) if score.is_finite() => score.clamp(0.0, 1.0),
        _ => 0.0,
    }
}

const CLASSIFICATION_LABELS: [&str; 5] = [
    "reasoning",
    "contains text",
    "country",
    "security features",
    "visual elements",
];

/// Parse the classification stage's labeled narrative output.
///
/// Output that carries none of the expected labels is kept whole as
/// the reasoning text, so nothing the model said is dropped.
pub fn parse_classification(text: &str) -> Classification {
    let values = split_labeled(text, &CLASSIFICATION_LABELS);
    if values.iter().all(Option::is_none) {
        return Classification {
            reasoning: text.trim().to_string(),
            ..Default::default()
        };
    }

    let mut values = values.into_iter();
    let mut next = || values.next().flatten().unwrap_or_default();
    Classification {
        reasoning: next(),
        contains_text: parse_bool(&next()),
        country: next(),
        security_features: next(),
        visual_elements: next(),
    }
}

const ERROR_CHECK_LABELS: [&str; 4] = ["reasoning", "has errors", "feedback", "score"];

/// Parse the error-check stage's labeled output.
pub fn parse_error_check(text: &str) -> ErrorCheck {
    let values = split_labeled(text, &ERROR_CHECK_LABELS);
    if values.iter().all(Option::is_none) {
        return ErrorCheck {
            reasoning: text.trim().to_string(),
            ..Default::default()
        };
    }

    let mut values = values.into_iter();
    let mut next = || values.next().flatten().unwrap_or_default();
    ErrorCheck {
        reasoning: next(),
        has_errors: parse_bool(&next()),
        feedback: next(),
        score: parse_score(&next()),
    }
}

/// Strip markdown code fences so fenced JSON parses like bare JSON.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after_fence = &trimmed[start + 3..];
    // Skip a language hint like ```json
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Find every balanced top-level `{...}` substring, honoring JSON
/// string and escape rules, largest first. Used to salvage an object
/// embedded in prose.
fn balanced_objects(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut start: Option<usize> = None;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' if depth > 0 => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        spans.push((s, i + 1));
                    }
                }
            }
            _ => {}
        }
    }

    spans.sort_by_key(|(s, e)| std::cmp::Reverse(e - s));
    spans.into_iter().map(|(s, e)| &text[s..e]).collect()
}

/// Render a JSON value as a plain field string.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Look a field up in a parsed object, tolerating common alias keys.
fn field_value(object: &serde_json::Map<String, Value>, field: &str) -> Option<String> {
    if let Some(value) = object.get(field) {
        return Some(value_to_string(value));
    }
    let alias = match field {
        "dob" => "date_of_birth",
        "id_number" => "idnumber",
        _ => return None,
    };
    object.get(alias).map(value_to_string)
}

/// Parse the structured extraction stage's output into the fixed
/// nine-field identification record.
///
/// Repair policy: try the response (with code fences stripped) as-is,
/// then every balanced object substring, largest first, until one
/// parses. Fields the model omitted stay empty; total parse failure
/// yields an all-empty record, never an error.
pub fn parse_identification(text: &str) -> (Identification, ParseOutcome) {
    let stripped = strip_code_fences(text);
    let object = std::iter::once(stripped)
        .chain(balanced_objects(stripped))
        .find_map(|candidate| match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        });

    let Some(object) = object else {
        return (Identification::default(), ParseOutcome::Unparsed);
    };

    let mut found = 0usize;
    let mut take = |field: &str| match field_value(&object, field) {
        Some(value) => {
            found += 1;
            value
        }
        None => String::new(),
    };

    let identification = Identification {
        name: take("name"),
        dob: take("dob"),
        address: take("address"),
        id_number: take("id_number"),
        issuing_authority: take("issuing_authority"),
        expiration_date: take("expiration_date"),
        photograph: take("photograph"),
        physical_descriptors: take("physical_descriptors"),
        signature: take("signature"),
    };

    let outcome = match found {
        0 => ParseOutcome::Unparsed,
        n if n == Identification::FIELDS.len() => ParseOutcome::Parsed,
        _ => ParseOutcome::Partial,
    };
    (identification, outcome)
}
