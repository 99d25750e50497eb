//! Menu-planner boundary: suggest dishes constrained to current stock.
//!
//! The prompt includes the live inventory so the model only proposes
//! dishes the pantry can plausibly cook; the strict decode below rejects
//! any response that does not match the agreed JSON shape before it can
//! reach business logic.

use serde_json::{json, Value};
use sko_schemas::{InventoryRow, MenuPlan};

use crate::chat::ChatClient;
use crate::PlannerError;

/// Constraints for one menu request.
#[derive(Debug, Clone)]
pub struct MenuRequest {
    pub headcount: i64,
    pub prep_minutes: i64,
    /// Available chefs with their specialties; may be empty.
    pub chefs: Vec<ChefProfile>,
}

#[derive(Debug, Clone)]
pub struct ChefProfile {
    pub name: String,
    pub specialty_dish: String,
}

/// Upstream menu-planner contract. Implementations must be object-safe
/// so callers can hold a `Box<dyn MenuSource>` without knowing the
/// concrete type.
#[async_trait::async_trait]
pub trait MenuSource: Send + Sync {
    /// Human-readable name identifying this source (e.g. `"groq"`).
    fn name(&self) -> &'static str;

    async fn suggest_menu(
        &self,
        inventory: &[InventoryRow],
        req: &MenuRequest,
    ) -> Result<MenuPlan, PlannerError>;
}

/// Groq-backed menu source (OpenAI-compatible chat completions).
///
/// API key is read by the caller (CLI/daemon) from the env var named in
/// config and passed in; do not log it.
pub struct GroqMenuSource {
    chat: ChatClient,
    model: String,
}

impl GroqMenuSource {
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
impl MenuSource for GroqMenuSource {
    fn name(&self) -> &'static str {
        "groq"
    }

    async fn suggest_menu(
        &self,
        inventory: &[InventoryRow],
        req: &MenuRequest,
    ) -> Result<MenuPlan, PlannerError> {
        let inventory_str = inventory
            .iter()
            .map(|r| format!("{} ({} {})", r.name, r.display_qty(), r.unit_label))
            .collect::<Vec<_>>()
            .join(", ");
        let chefs_str = req
            .chefs
            .iter()
            .map(|c| format!("{} (Spec: {})", c.name, c.specialty_dish))
            .collect::<Vec<_>>()
            .join(", ");

        let prompt = format!(
            "You are a Head Chef AI.\n\
             Current Inventory: {inventory_str}\n\
             Available Chefs: {chefs_str}\n\
             Constraints: Must serve {} people within {} minutes.\n\
             Suggest 3 dishes. Output JSON format:\n\
             {{ \"recommendations\": [{{\"dish_name\": \"...\", \"assigned_chef\": \"...\", \
             \"estimated_time\": \"...\", \"ingredients_used\": [\"item1\"]}}] }}",
            req.headcount, req.prep_minutes
        );

        let messages: Vec<Value> = vec![json!({"role": "user", "content": prompt})];
        let content = self.chat.complete(&self.model, messages).await?;
        decode_menu_plan(&content)
    }
}

/// Strict decode of the planner's JSON content. The shape must be an
/// object with a `recommendations` array whose elements carry all four
/// fields; anything else is rejected here, not deeper in the stack.
pub fn decode_menu_plan(content: &str) -> Result<MenuPlan, PlannerError> {
    let plan: MenuPlan = serde_json::from_str(content)
        .map_err(|e| PlannerError::Decode(format!("menu plan shape: {e}")))?;

    for (i, rec) in plan.recommendations.iter().enumerate() {
        if rec.dish_name.trim().is_empty() {
            return Err(PlannerError::Decode(format!(
                "menu plan recommendation {i} has an empty dish_name"
            )));
        }
    }

    Ok(plan)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use sko_schemas::MenuRecommendation;

    /// Minimal in-process mock that satisfies the trait for use in tests.
    struct MockMenuSource {
        plan: MenuPlan,
    }

    #[async_trait::async_trait]
    impl MenuSource for MockMenuSource {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn suggest_menu(
            &self,
            _inventory: &[InventoryRow],
            _req: &MenuRequest,
        ) -> Result<MenuPlan, PlannerError> {
            Ok(self.plan.clone())
        }
    }

    fn sample_plan() -> MenuPlan {
        MenuPlan {
            recommendations: vec![MenuRecommendation {
                dish_name: "Dal Tadka".to_string(),
                assigned_chef: "Ravi".to_string(),
                estimated_time: "25 min".to_string(),
                ingredients_used: vec!["Lentils".to_string(), "Oil".to_string()],
            }],
        }
    }

    #[tokio::test]
    async fn mock_source_returns_configured_plan() {
        let source: Box<dyn MenuSource> = Box::new(MockMenuSource {
            plan: sample_plan(),
        });
        let req = MenuRequest {
            headcount: 10,
            prep_minutes: 30,
            chefs: vec![],
        };
        let plan = source.suggest_menu(&[], &req).await.unwrap();
        assert_eq!(plan.recommendations.len(), 1);
        assert_eq!(plan.recommendations[0].dish_name, "Dal Tadka");
    }

    #[test]
    fn decode_accepts_well_formed_plan() {
        let content = r#"{
            "recommendations": [
                {"dish_name": "Paneer Tikka", "assigned_chef": "Asha",
                 "estimated_time": "40 min", "ingredients_used": ["Paneer", "Yogurt"]}
            ]
        }"#;
        let plan = decode_menu_plan(content).unwrap();
        assert_eq!(plan.recommendations[0].ingredients_used.len(), 2);
    }

    #[test]
    fn decode_rejects_missing_fields() {
        // assigned_chef absent: the shape is malformed and must not pass.
        let content = r#"{"recommendations": [{"dish_name": "X", "estimated_time": "5", "ingredients_used": []}]}"#;
        let err = decode_menu_plan(content).unwrap_err();
        assert!(matches!(err, PlannerError::Decode(_)));
    }

    #[test]
    fn decode_rejects_non_object_payload() {
        let err = decode_menu_plan(r#"["not", "a", "plan"]"#).unwrap_err();
        assert!(matches!(err, PlannerError::Decode(_)));
    }

    #[test]
    fn decode_rejects_empty_dish_name() {
        let content = r#"{"recommendations": [{"dish_name": "  ", "assigned_chef": "A", "estimated_time": "5", "ingredients_used": []}]}"#;
        assert!(decode_menu_plan(content).is_err());
    }
}
