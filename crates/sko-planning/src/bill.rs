//! Bill-scanner boundary: extract purchasable line items from a bill
//! photo via the vision model.
//!
//! The decode accepts either a bare JSON array or an object wrapping the
//! array under `items` (the model alternates between the two), validates
//! every line, and rejects anything else at this boundary.

use base64::Engine;
use serde_json::{json, Value};
use sko_schemas::BillLine;

use crate::chat::ChatClient;
use crate::PlannerError;

/// Upstream bill-scanning contract.
#[async_trait::async_trait]
pub trait BillSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Extract food line items from a JPEG/PNG bill image.
    async fn scan_bill(&self, image_bytes: &[u8]) -> Result<Vec<BillLine>, PlannerError>;
}

/// Groq vision-backed bill source.
pub struct GroqVisionSource {
    chat: ChatClient,
    model: String,
}

impl GroqVisionSource {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_base_url(api_key, model, "https://api.groq.com/openai/v1".to_string())
    }

    pub fn new_with_base_url(api_key: String, model: String, base_url: String) -> Self {
        Self {
            chat: ChatClient::new(api_key, base_url),
            model,
        }
    }
}

#[async_trait::async_trait]
impl BillSource for GroqVisionSource {
    fn name(&self) -> &'static str {
        "groq-vision"
    }

    async fn scan_bill(&self, image_bytes: &[u8]) -> Result<Vec<BillLine>, PlannerError> {
        let base64_image = base64::engine::general_purpose::STANDARD.encode(image_bytes);
        let prompt = "Analyze this bill. Extract food items. Return ONLY JSON list: \
                      [{\"item_name\": \"Milk\", \"quantity\": 2, \"unit\": \"L\"}] \
                      Ignore prices.";

        let messages: Vec<Value> = vec![json!({
            "role": "user",
            "content": [
                {"type": "text", "text": prompt},
                {"type": "image_url",
                 "image_url": {"url": format!("data:image/jpeg;base64,{base64_image}")}},
            ],
        })];

        let content = self.chat.complete(&self.model, messages).await?;
        decode_bill_lines(&content)
    }
}

/// Strict decode of the vision model's content.
pub fn decode_bill_lines(content: &str) -> Result<Vec<BillLine>, PlannerError> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| PlannerError::Decode(format!("bill response json: {e}")))?;

    let array = match &value {
        Value::Array(arr) => arr.clone(),
        Value::Object(map) => match map.get("items") {
            Some(Value::Array(arr)) => arr.clone(),
            _ => {
                return Err(PlannerError::Decode(
                    "bill response object lacks an 'items' array".to_string(),
                ))
            }
        },
        _ => {
            return Err(PlannerError::Decode(
                "bill response is neither an array nor an object".to_string(),
            ))
        }
    };

    let mut lines = Vec::with_capacity(array.len());
    for (i, entry) in array.into_iter().enumerate() {
        let line: BillLine = serde_json::from_value(entry)
            .map_err(|e| PlannerError::Decode(format!("bill line {i}: {e}")))?;
        if line.item_name.trim().is_empty() {
            return Err(PlannerError::Decode(format!(
                "bill line {i} has an empty item_name"
            )));
        }
        if !line.quantity.is_finite() || line.quantity < 0.0 {
            return Err(PlannerError::Decode(format!(
                "bill line {i} quantity must be a non-negative number, got {}",
                line.quantity
            )));
        }
        lines.push(line);
    }

    Ok(lines)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_accepts_bare_array() {
        let lines = decode_bill_lines(
            r#"[{"item_name": "Milk", "quantity": 2, "unit": "L"},
                {"item_name": "Rice", "quantity": 5.5, "unit": "kg"}]"#,
        )
        .unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].item_name, "Rice");
        assert_eq!(lines[1].quantity, 5.5);
    }

    #[test]
    fn decode_accepts_items_wrapper_object() {
        let lines = decode_bill_lines(
            r#"{"items": [{"item_name": "Butter", "quantity": 1, "unit": "pack"}]}"#,
        )
        .unwrap();
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn decode_rejects_negative_quantity() {
        let err = decode_bill_lines(
            r#"[{"item_name": "Milk", "quantity": -2, "unit": "L"}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, PlannerError::Decode(_)));
    }

    #[test]
    fn decode_rejects_missing_unit() {
        let err =
            decode_bill_lines(r#"[{"item_name": "Milk", "quantity": 2}]"#).unwrap_err();
        assert!(matches!(err, PlannerError::Decode(_)));
    }

    #[test]
    fn decode_rejects_scalar_payload() {
        assert!(decode_bill_lines(r#""just text""#).is_err());
    }

    #[test]
    fn decode_rejects_object_without_items() {
        assert!(decode_bill_lines(r#"{"food": []}"#).is_err());
    }
}
