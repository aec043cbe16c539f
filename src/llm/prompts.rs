//! Extraction prompts.
//!
//! Both prompts pin the exact output schema instead of leaving it to the
//! model's discretion; the text and vision call shapes differ, so each
//! gets its own prompt.

/// Output schema shared by both prompts.
pub const OUTPUT_SCHEMA: &str = r#"{
  "vendor_name": "string or null",
  "invoice_number": "string or null",
  "amount": "number or null (invoice total)",
  "currency": "ISO 4217 code, default USD",
  "invoice_date": "YYYY-MM-DD or null",
  "due_date": "YYYY-MM-DD or null",
  "afe_number": "string or null (Authorization for Expenditure number, e.g. AFE-2024-0117)",
  "well_identifier": "string or null (UWI / API well number)",
  "field_ticket_numbers": ["string"],
  "po_number": "string or null",
  "service_period_start": "YYYY-MM-DD or null",
  "service_period_end": "YYYY-MM-DD or null",
  "line_items": [{"description": "string", "quantity": "number or null", "unit_price": "number or null", "amount": "number or null", "well_identifier": "string or null"}],
  "confidence_scores": {"field_name": "number between 0.0 and 1.0"}
}"#;

/// Prompt for plain-text invoice documents.
pub const TEXT_EXTRACTION_PROMPT: &str = r#"You are an oil & gas billing analyst. Extract structured data from the invoice text below.

Return ONLY a JSON object matching this exact schema (use null for fields you cannot read, never invent values):
{schema}

Include a confidence score between 0.0 and 1.0 for every field you populate in confidence_scores.

Invoice text:
{content}"#;

/// Prompt for scanned/image/PDF invoice documents, sent with the page
/// images attached.
pub const VISION_EXTRACTION_PROMPT: &str = r#"You are an oil & gas billing analyst. Extract structured data from the attached invoice document image.

Return ONLY a JSON object matching this exact schema (use null for fields you cannot read, never invent values):
{schema}

Include a confidence score between 0.0 and 1.0 for every field you populate in confidence_scores."#;

/// Render the text prompt with schema and document content.
pub fn text_prompt(content: &str) -> String {
    TEXT_EXTRACTION_PROMPT
        .replace("{schema}", OUTPUT_SCHEMA)
        .replace("{content}", content)
}

/// Render the vision prompt with the schema.
pub fn vision_prompt() -> String {
    VISION_EXTRACTION_PROMPT.replace("{schema}", OUTPUT_SCHEMA)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_name_required_fields() {
        let prompt = text_prompt("ACME invoice");
        for field in ["afe_number", "well_identifier", "confidence_scores", "line_items"] {
            assert!(prompt.contains(field), "text prompt missing {}", field);
        }
        assert!(prompt.contains("ACME invoice"));
        assert!(!prompt.contains("{content}"));

        let prompt = vision_prompt();
        assert!(prompt.contains("afe_number"));
        assert!(!prompt.contains("{schema}"));
    }
}
