use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::generation::pricing::{find_model, ModelPricing, DEFAULT_MODEL, MODELS};
use crate::generation::prompts::{DEFAULT_GUIDELINES, DEFAULT_SYSTEM_CONTEXT};
use crate::llm_client::SamplingParams;

/// Per-run knobs, sent as the `options` part of the upload form.
/// Every field is optional; missing fields take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    /// Attach few-shot examples of the product's group.
    pub include_examples: bool,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub system_context: String,
    pub guidelines: String,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            include_examples: true,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.2,
            top_p: 0.3,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            system_context: DEFAULT_SYSTEM_CONTEXT.to_string(),
            guidelines: DEFAULT_GUIDELINES.to_string(),
        }
    }
}

impl GenerationOptions {
    /// Checks parameter ranges and resolves the model's pricing.
    pub fn validate(&self) -> Result<&'static ModelPricing, AppError> {
        let pricing = find_model(&self.model).ok_or_else(|| {
            AppError::Validation(format!(
                "Unknown model '{}'. Available: {}",
                self.model,
                MODELS.iter().map(|m| m.name).collect::<Vec<_>>().join(", ")
            ))
        })?;

        check_range("temperature", self.temperature, 0.0, 2.0)?;
        check_range("top_p", self.top_p, 0.0, 1.0)?;
        check_range("frequency_penalty", self.frequency_penalty, -2.0, 2.0)?;
        check_range("presence_penalty", self.presence_penalty, -2.0, 2.0)?;

        if self.system_context.trim().is_empty() {
            return Err(AppError::Validation(
                "system_context cannot be empty".to_string(),
            ));
        }

        Ok(pricing)
    }

    pub fn sampling(&self) -> SamplingParams {
        SamplingParams {
            temperature: self.temperature,
            top_p: self.top_p,
            frequency_penalty: self.frequency_penalty,
            presence_penalty: self.presence_penalty,
        }
    }
}

fn check_range(name: &str, value: f32, min: f32, max: f32) -> Result<(), AppError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{name} must be between {min} and {max}, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let options = GenerationOptions::default();
        let pricing = options.validate().unwrap();
        assert_eq!(pricing.name, "gpt-35-turbo-16k");
        assert!(options.include_examples);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let options: GenerationOptions =
            serde_json::from_str(r#"{"model": "gpt-4", "include_examples": false}"#).unwrap();
        assert_eq!(options.model, "gpt-4");
        assert!(!options.include_examples);
        assert_eq!(options.temperature, 0.2);
        assert_eq!(options.guidelines, DEFAULT_GUIDELINES);
    }

    #[test]
    fn test_unknown_model_rejected() {
        let options = GenerationOptions {
            model: "davinci".to_string(),
            ..GenerationOptions::default()
        };
        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("gpt-4"));
    }

    #[test]
    fn test_out_of_range_parameters_rejected() {
        let hot = GenerationOptions {
            temperature: 2.5,
            ..GenerationOptions::default()
        };
        assert!(hot.validate().is_err());

        let nan = GenerationOptions {
            top_p: f32::NAN,
            ..GenerationOptions::default()
        };
        assert!(nan.validate().is_err());
    }
}
