//! Page text → validated company entities.

use std::sync::Arc;

use indexmap::IndexSet;
use serde_json::Value;
use tracing::{debug, warn};

use super::client::{CompletionRequest, EntityExtractionProvider, LlmError};
use crate::config::ResourceMode;
use crate::model::{CompanyEntity, ExtractedEntities};

/// Characters of page text sent to the model in constrained mode.
const CONSTRAINED_INPUT_CHARS: usize = 4000;

pub const SYSTEM_PROMPT: &str = r#"You are a market intelligence analyst. Extract structured information about companies, products, and organizations from the provided text.

Your task:
1. Identify relevant companies, products, or organizations mentioned in the text.
2. Infer high-level categories/segments (e.g., "AI infrastructure", "dev tools", "agent frameworks", "SaaS platforms", "enterprise software").
3. Extract short, clear, factual descriptions (1-2 sentences max).
4. Capture any signals such as:
   - Funding announcements or amounts
   - Partnerships or collaborations
   - Scale indicators (user counts, revenue, growth)
   - Notable customers or clients
   - Product launches or major updates
   - Market positioning or competitive advantages

Return ONLY valid JSON in this exact format:
{
  "companies": [
    {
      "name": "Company Name",
      "description": "Brief factual description",
      "category": "Category/Segment",
      "signals": ["Signal 1", "Signal 2"]
    }
  ]
}

If no companies are found, return: {"companies": []}
Always return valid JSON, nothing else."#;

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Failed to extract entities: {0}")]
    ExtractionFailed(#[from] LlmError),
}

#[derive(Debug, Clone)]
pub struct ModelChoice {
    pub standard: String,
    pub lite: String,
}

#[derive(Clone)]
pub struct EntityExtractor {
    provider: Option<Arc<dyn EntityExtractionProvider>>,
    models: ModelChoice,
}

impl EntityExtractor {
    /// `provider` is `None` when no model credential is configured; every
    /// non-blank extraction then fails with `ApiKeyNotSet`.
    pub fn new(provider: Option<Arc<dyn EntityExtractionProvider>>, models: ModelChoice) -> Self {
        Self { provider, models }
    }

    pub async fn extract(
        &self,
        text: &str,
        mode: ResourceMode,
    ) -> Result<ExtractedEntities, ExtractionError> {
        if text.trim().is_empty() {
            return Ok(ExtractedEntities::default());
        }

        let provider = self.provider.as_deref().ok_or(LlmError::ApiKeyNotSet)?;

        let (model, input) = match mode {
            ResourceMode::Normal => (self.models.standard.as_str(), text),
            ResourceMode::Constrained => (
                self.models.lite.as_str(),
                truncate_chars(text, CONSTRAINED_INPUT_CHARS),
            ),
        };

        let request = CompletionRequest {
            model,
            system: SYSTEM_PROMPT,
            user: format!("Extract market intelligence entities from this text:\n\n{input}"),
        };

        let reply = provider.complete(&request).await?;
        let entities = parse_entities(&reply);
        debug!(model, companies = entities.companies.len(), "entities extracted");
        Ok(entities)
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Parses a model reply. Anything unusable yields no companies rather than
/// an error.
pub fn parse_entities(reply: &str) -> ExtractedEntities {
    let json_text = strip_code_fence(reply.trim());

    let value: Value = match serde_json::from_str(json_text) {
        Ok(v) => v,
        Err(e) => {
            warn!(%e, "model reply is not valid JSON");
            return ExtractedEntities::default();
        }
    };

    let Some(companies) = value.get("companies").and_then(Value::as_array) else {
        warn!("model reply has no companies array");
        return ExtractedEntities::default();
    };

    ExtractedEntities {
        companies: companies.iter().filter_map(validate_company).collect(),
    }
}

/// Returns the `{...}` inside a ```` ``` ```` or ```` ```json ```` fence,
/// or `text` unchanged when there is no such fence.
fn strip_code_fence(text: &str) -> &str {
    const FENCE: &str = "```";

    let Some(open) = text.find(FENCE) else {
        return text;
    };
    let after_open = &text[open + FENCE.len()..];
    let inner = after_open.strip_prefix("json").unwrap_or(after_open);
    let Some(close) = inner.rfind(FENCE) else {
        return text;
    };
    let body = inner[..close].trim();

    if body.starts_with('{') && body.ends_with('}') {
        body
    } else {
        text
    }
}

fn validate_company(value: &Value) -> Option<CompanyEntity> {
    let obj = value.as_object()?;
    let name = obj.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }

    let signals = match obj.get("signals") {
        Some(Value::Array(items)) => dedup_non_blank(items.iter().filter_map(coerce_text)),
        _ => Vec::new(),
    };

    Some(CompanyEntity {
        name: name.to_string(),
        description: obj.get("description").and_then(coerce_text).unwrap_or_default(),
        category: obj.get("category").and_then(coerce_text).unwrap_or_default(),
        signals,
    })
}

/// Strings are trimmed; numbers and booleans are rendered. Other shapes
/// are treated as absent.
fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn dedup_non_blank(items: impl Iterator<Item = String>) -> Vec<String> {
    items
        .filter(|s| !s.is_empty())
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeModel;

    fn models() -> ModelChoice {
        ModelChoice {
            standard: "big-model".into(),
            lite: "small-model".into(),
        }
    }

    fn extractor(model: &Arc<FakeModel>) -> EntityExtractor {
        EntityExtractor::new(Some(model.clone()), models())
    }

    #[tokio::test]
    async fn blank_text_short_circuits_without_model_call() {
        let model = Arc::new(FakeModel::replying(r#"{"companies":[{"name":"X"}]}"#));
        for text in ["", "   \n\t"] {
            let result = extractor(&model).extract(text, ResourceMode::Normal).await.unwrap();
            assert!(result.companies.is_empty());
        }
        assert_eq!(model.calls().len(), 0);
    }

    #[tokio::test]
    async fn blank_text_without_provider_is_not_an_error() {
        let extractor = EntityExtractor::new(None, models());
        let result = extractor.extract("", ResourceMode::Normal).await.unwrap();
        assert!(result.companies.is_empty());
    }

    #[tokio::test]
    async fn missing_provider_fails_for_real_text() {
        let extractor = EntityExtractor::new(None, models());
        let err = extractor.extract("Acme raised $5M", ResourceMode::Normal).await.unwrap_err();
        assert!(matches!(err, ExtractionError::ExtractionFailed(LlmError::ApiKeyNotSet)));
    }

    #[tokio::test]
    async fn normal_mode_sends_full_text_to_standard_model() {
        let model = Arc::new(FakeModel::replying(r#"{"companies":[]}"#));
        let text = "a".repeat(5000);
        extractor(&model).extract(&text, ResourceMode::Normal).await.unwrap();

        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model, "big-model");
        assert_eq!(calls[0].system, SYSTEM_PROMPT);
        assert!(calls[0].user.ends_with(&text));
    }

    #[tokio::test]
    async fn constrained_mode_truncates_and_uses_lite_model() {
        let model = Arc::new(FakeModel::replying(r#"{"companies":[]}"#));
        let text = "é".repeat(5000);
        extractor(&model).extract(&text, ResourceMode::Constrained).await.unwrap();

        let calls = model.calls();
        assert_eq!(calls[0].model, "small-model");
        let sent = calls[0]
            .user
            .strip_prefix("Extract market intelligence entities from this text:\n\n")
            .unwrap();
        assert_eq!(sent.chars().count(), CONSTRAINED_INPUT_CHARS);
    }

    #[tokio::test]
    async fn upstream_failure_propagates() {
        let model = Arc::new(FakeModel::failing());
        let err = extractor(&model)
            .extract("some text", ResourceMode::Normal)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Failed to extract entities"));
    }

    #[test]
    fn parses_plain_json() {
        let parsed = parse_entities(
            r#"{"companies":[{"name":"Acme","description":"Makes anvils.","category":"Tools","signals":["Raised $5M"]}]}"#,
        );
        assert_eq!(
            parsed.companies,
            vec![CompanyEntity {
                name: "Acme".into(),
                description: "Makes anvils.".into(),
                category: "Tools".into(),
                signals: vec!["Raised $5M".into()],
            }]
        );
    }

    #[test]
    fn strips_json_code_fence() {
        let reply = "Here you go:\n```json\n{\"companies\":[{\"name\":\"Acme\"}]}\n```";
        assert_eq!(parse_entities(reply).companies[0].name, "Acme");

        let bare = "```\n{\"companies\":[{\"name\":\"Beta\"}]}\n```";
        assert_eq!(parse_entities(bare).companies[0].name, "Beta");
    }

    #[test]
    fn unparseable_or_misshapen_reply_degrades_to_empty() {
        for reply in [
            "I could not find any companies.",
            "[1, 2, 3]",
            "\"companies\"",
            r#"{"companies": "none"}"#,
            r#"{"results": []}"#,
            "```json\nnot json\n```",
        ] {
            assert!(
                parse_entities(reply).companies.is_empty(),
                "should degrade: {reply}"
            );
        }
    }

    #[test]
    fn drops_companies_without_usable_name() {
        let parsed = parse_entities(
            r#"{"companies":[{"name":"  "},{"description":"no name"},{"name":42},"Acme",null,{"name":" Real "}]}"#,
        );
        assert_eq!(parsed.companies.len(), 1);
        assert_eq!(parsed.companies[0].name, "Real");
    }

    #[test]
    fn coerces_fields_and_cleans_signals() {
        let parsed = parse_entities(
            r#"{"companies":[{"name":"Acme","description":"  Anvils  ","category":null,"signals":[" A ","","A","B",7,null,{"x":1}]}]}"#,
        );
        let acme = &parsed.companies[0];
        assert_eq!(acme.description, "Anvils");
        assert_eq!(acme.category, "");
        assert_eq!(acme.signals, vec!["A", "B", "7"]);
    }

    #[test]
    fn repeated_signals_keep_first_seen_order() {
        let parsed = parse_entities(
            r#"{"companies":[{"name":"Acme","signals":["Hiring","Funding","Hiring","Expansion","Funding"]}]}"#,
        );
        assert_eq!(parsed.companies[0].signals, vec!["Hiring", "Funding", "Expansion"]);
    }

    #[test]
    fn non_array_signals_become_empty() {
        let parsed = parse_entities(r#"{"companies":[{"name":"Acme","signals":"funding"}]}"#);
        assert!(parsed.companies[0].signals.is_empty());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }
}
