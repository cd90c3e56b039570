//! Stage definitions and prompts for the per-image pipeline.
//!
//! The stage set is fixed and known at compile time: classification,
//! error check, PII narrative, and structured PII extraction, in that
//! order. Stages that need grounding receive the prior stage's raw
//! text through the completion backend's context slot.

/// The fixed analysis stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Classification,
    ErrorCheck,
    PiiNarrative,
    PiiStructured,
}

impl Stage {
    /// Stage name used in logs and failure reasons.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Classification => "classification",
            Self::ErrorCheck => "error_check",
            Self::PiiNarrative => "pii_narrative",
            Self::PiiStructured => "pii_structured",
        }
    }

    /// Whether a failed model call for this stage aborts the image.
    /// The PII narrative is display-oriented; losing it degrades the
    /// record instead of skipping the image.
    pub fn is_required(&self) -> bool {
        !matches!(self, Self::PiiNarrative)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Prompt for the document classification stage.
pub const CLASSIFICATION_PROMPT: &str = r#"You are a Know Your Customer (KYC) document verification expert. Analyze this identification document image.

Rules:
1. First identify if this is a passport or ID card
2. Locate and identify which country issued this document
3. Check document format and security features
4. Note the document's overall condition and quality
5. Document text layout and positioning
6. Note any visual elements or features
7. Look for tampering or unusual elements
8. Assess photo quality and integration

Previous feedback: N/A

Respond with exactly these labeled lines and nothing else:
Reasoning: <your analysis of the document type, condition and authenticity>
Contains text: <true or false>
Country: <country of issue>
Security features: <list of security features, or N/A>
Visual elements: <description of non-text visual elements, or N/A>"#;

/// Prompt for the consistency / error-check stage. The classification
/// stage's raw output is supplied as grounding context.
pub const ERROR_CHECK_PROMPT: &str = r#"Verify the completeness and accuracy of the prior document analysis against the document image. Check every single detail character by character. This is not meant to be an overview or summary.

Rules:
1. Compare all text fields exactly
2. Check numbers and dates carefully
3. Verify name spellings precisely
4. Look for missing or extra information
5. Note any formatting differences
6. Check for OCR errors or misreadings
7. Verify document number formats

Respond with exactly these labeled lines and nothing else:
Reasoning: <your detailed comparison>
Has errors: <true or false>
Feedback: <detailed feedback about errors or missing information, or N/A>
Score: <a number between 0.0 and 1.0, where 1.0 means fully consistent and complete>"#;

/// Prompt for the free-text PII extraction stage.
pub const PII_NARRATIVE_PROMPT: &str = r#"Extract personally identifiable information (PII) from this document image, including:
Name - The full legal name of the individual, usually written as First Middle Last.
Date of Birth - The person's date of birth, often shown as MM/DD/YYYY.
Address - The cardholder's current residential address.
ID Number - A unique identification number assigned to the individual, such as a driver's license or state ID number.
Issuing Authority - The government agency or department that issued the ID, such as the Department of Motor Vehicles.
Expiration Date - The date when the ID document will expire and need to be renewed.
Photograph - A current photo of the cardholder's face, used for identification purposes.
Physical Descriptors - Details about the person's physical characteristics, like height, weight, eye color, etc.
Signature - The cardholder's actual signature.

Respond with one bulleted line per item above. Write N/A for anything not present on the document."#;

/// Prompt for the structured PII extraction stage. The narrative
/// stage's output, when available, is supplied as grounding context.
pub const PII_STRUCTURED_PROMPT: &str = r#"Extract personally identifiable information (PII) from this document image as a single JSON object with exactly these string fields:
"name", "dob", "address", "id_number", "issuing_authority", "expiration_date", "photograph", "physical_descriptors", "signature"

Use an empty string for anything not present on the document. Respond with only the JSON object, no prose and no code fences."#;
