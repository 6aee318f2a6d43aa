//! Product description agent: turns one input entry into a chat transcript
//! and asks the model for the description.
//!
//! Transcript shape:
//!   system    → composed context + guidelines
//!   user      → example input JSON      ┐ once per few-shot example
//!   assistant → example description     ┘
//!   user      → request JSON

use std::sync::Arc;

use tracing::debug;

use crate::errors::AppError;
use crate::generation::options::GenerationOptions;
use crate::llm_client::prompts::compose_system_prompt;
use crate::llm_client::{ChatMessage, ChatModel, SamplingParams, Usage};
use crate::pipeline::columns::TITLE;
use crate::pipeline::examples::ExamplePair;
use crate::pipeline::projection::{required_text, JsonRecord};

/// What the agent hands back for one product.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedDescription {
    pub title: String,
    pub text: String,
    pub usage: Usage,
}

pub struct ProductDescriptionAgent {
    model: Arc<dyn ChatModel>,
    deployment: String,
    params: SamplingParams,
    system_prompt: String,
}

impl ProductDescriptionAgent {
    pub fn new(model: Arc<dyn ChatModel>, options: &GenerationOptions) -> Self {
        Self {
            model,
            deployment: options.model.clone(),
            params: options.sampling(),
            system_prompt: compose_system_prompt(&options.system_context, &options.guidelines),
        }
    }

    pub fn deployment(&self) -> &str {
        &self.deployment
    }

    pub fn build_messages(
        &self,
        request: &JsonRecord,
        examples: &[ExamplePair],
    ) -> Result<Vec<ChatMessage>, AppError> {
        let mut messages = Vec::with_capacity(2 + examples.len() * 2);
        messages.push(ChatMessage::system(self.system_prompt.as_str()));

        for example in examples {
            messages.push(ChatMessage::user(to_json(&example.input)?));
            messages.push(ChatMessage::assistant(example.output.as_str()));
        }

        messages.push(ChatMessage::user(to_json(request)?));
        Ok(messages)
    }

    /// Generates the description for one product.
    ///
    /// The title is read before the model is called, so a record without
    /// `TITLE` fails with `MissingField` and costs nothing.
    pub async fn generate_description(
        &self,
        article_code: &str,
        request: &JsonRecord,
        examples: &[ExamplePair],
    ) -> Result<GeneratedDescription, AppError> {
        let title = required_text(request, TITLE, article_code)?;
        let messages = self.build_messages(request, examples)?;

        debug!(
            "Requesting description for article {} ({} examples)",
            article_code,
            examples.len()
        );

        let completion = self
            .model
            .complete(&self.deployment, &messages, &self.params)
            .await
            .map_err(|e| {
                AppError::Llm(format!(
                    "Description call failed for article {article_code}: {e}"
                ))
            })?;

        Ok(GeneratedDescription {
            title,
            text: completion.text,
            usage: completion.usage,
        })
    }
}

fn to_json(record: &JsonRecord) -> Result<String, AppError> {
    serde_json::to_string(record)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize record: {e}")))
}


#[cfg(test)]
mod tests {
    use super::test_support::CannedModel;
    use super::*;
    use crate::llm_client::Role;
    use crate::pipeline::errors::PipelineError;
    use serde_json::json;

    fn record(value: serde_json::Value) -> JsonRecord {
        value.as_object().cloned().unwrap()
    }

    fn agent(model: Arc<CannedModel>) -> ProductDescriptionAgent {
        ProductDescriptionAgent::new(model, &GenerationOptions::default())
    }

    #[test]
    fn test_messages_interleave_examples() {
        let agent = agent(Arc::new(CannedModel::default()));
        let request = record(json!({"ARTICLECODE": "A1", "TITLE": "Smart TV"}));
        let examples = vec![ExamplePair {
            input: record(json!({"ARTICLECODE": "E1", "TITLE": "OLED 65"})),
            output: "<b>OLED</b>".to_string(),
        }];

        let messages = agent.build_messages(&request, &examples).unwrap();
        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert!(messages[0].content.contains("consumer electronics retailer"));
        assert_eq!(messages[1].content, r#"{"ARTICLECODE":"E1","TITLE":"OLED 65"}"#);
        assert_eq!(messages[2].content, "<b>OLED</b>");
        assert_eq!(messages[3].content, r#"{"ARTICLECODE":"A1","TITLE":"Smart TV"}"#);
    }

    #[test]
    fn test_no_examples_is_system_plus_request() {
        let agent = agent(Arc::new(CannedModel::default()));
        let request = record(json!({"TITLE": "Smart TV"}));
        let messages = agent.build_messages(&request, &[]).unwrap();
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn test_generate_returns_title_and_usage() {
        let model = Arc::new(CannedModel::default());
        let agent = agent(model.clone());
        let request = record(json!({"ARTICLECODE": "A1", "TITLE": "Smart TV"}));

        let generated = agent.generate_description("A1", &request, &[]).await.unwrap();
        assert_eq!(generated.title, "Smart TV");
        assert_eq!(generated.text, "<b>Generated</b>");
        assert_eq!(generated.usage.total_tokens, 140);
        assert_eq!(model.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_title_fails_without_calling_model() {
        let model = Arc::new(CannedModel::default());
        let agent = agent(model.clone());
        let request = record(json!({"ARTICLECODE": "A1"}));

        let err = agent.generate_description("A1", &request, &[]).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Pipeline(PipelineError::MissingField { .. })
        ));
        assert!(model.calls.lock().unwrap().is_empty());
    }
}
