//! Prompt templates for each document schema.
//!
//! Every template embeds the OCR text verbatim between triple-quote delimiters and spells out the
//! JSON shape the model must return. Templates are pure string rendering; nothing here touches
//! the network or the filesystem.

use super::types::DocumentType;

impl DocumentType {
    /// Render the extraction instructions for this schema around `text`.
    pub fn render_prompt(self, text: &str) -> String {
        match self {
            Self::DrivingLicense => format!(
                r#"
Extract only this JSON format:
{{
  "document_type": "Driving License",
  "name": ...,
  "date_of_birth": ...,
  "license_number": ...,
  "issuing_state": ...,
  "expiry_date": ...
}}

Text:
"""{text}"""
Only return valid JSON. Use null if not found.
"#
            ),
            Self::ShopReceipt => format!(
                r#"
Extract only this JSON format:
{{
  "document_type": "Shop Receipt",
  "merchant_name": ...,
  "total_amount": ...,
  "date_of_purchase": ...,
  "payment_method": ...,
  "items": [{{"name": ..., "quantity": ..., "price": ...}}]
}}

Text:
"""{text}"""
Return only valid JSON. Avoid noise.
"#
            ),
            Self::Resume => format!(
                r#"
Extract only this JSON format:
{{
  "document_type": "Resume",
  "full_name": ...,
  "email": ...,
  "phone_number": ...,
  "skills": [...],
  "work_experience": [{{"company": ..., "role": ..., "dates": ...}}],
  "education": [{{"institution": ..., "degree": ..., "graduation_year": ...}}]
}}

Text:
"""{text}"""
Return only valid JSON. Do not hallucinate. Use null or [] if missing.
"#
            ),
        }
    }
}

/// Build the model prompt for a raw `doc_type` string.
///
/// Unknown document types render an empty prompt; the request still proceeds downstream.
pub fn build_prompt(doc_type: &str, text: &str) -> String {
    doc_type
        .parse::<DocumentType>()
        .map(|known| known.render_prompt(text))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "ACME MART\nMilk 2 x 1.25\nTotal: $42.50";

    #[test]
    fn known_types_embed_text_verbatim() {
        for doc_type in DocumentType::ALL {
            let prompt = build_prompt(doc_type.as_str(), SAMPLE);
            assert!(!prompt.is_empty());
            assert!(prompt.contains(&format!("\"\"\"{SAMPLE}\"\"\"")));
            assert!(prompt.contains(&format!("\"document_type\": \"{doc_type}\"")));
        }
    }

    #[test]
    fn unknown_type_yields_empty_prompt() {
        assert_eq!(build_prompt("Passport", SAMPLE), "");
        assert_eq!(build_prompt("", SAMPLE), "");
    }

    #[test]
    fn receipt_prompt_names_item_fields() {
        let prompt = build_prompt("Shop Receipt", "x");
        assert!(prompt.contains(r#""items": [{"name": ..., "quantity": ..., "price": ...}]"#));
        assert!(prompt.contains("total_amount"));
    }

    #[test]
    fn resume_prompt_forbids_fabrication() {
        let prompt = build_prompt("Resume", "Jane Doe");
        assert!(prompt.contains("Do not hallucinate"));
        assert!(prompt.contains("graduation_year"));
    }
}
