//! Model catalog and token cost accounting.

use serde::Serialize;

use crate::llm_client::Usage;

/// Currency the catalog prices are quoted in.
pub const CURRENCY: &str = "NOK";

pub const DEFAULT_MODEL: &str = "gpt-35-turbo-16k";

/// Per-token prices for one deployable model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelPricing {
    pub name: &'static str,
    pub prompt_token_cost: f64,
    pub completion_token_cost: f64,
}

pub const MODELS: &[ModelPricing] = &[
    ModelPricing {
        name: "gpt-4",
        prompt_token_cost: 0.32 / 1000.0,
        completion_token_cost: 0.639 / 1000.0,
    },
    ModelPricing {
        name: "gpt-35-turbo-16k",
        prompt_token_cost: 0.032 / 1000.0,
        completion_token_cost: 0.043 / 1000.0,
    },
];

pub fn find_model(name: &str) -> Option<&'static ModelPricing> {
    MODELS.iter().find(|m| m.name == name)
}

impl ModelPricing {
    pub fn cost(&self, tally: &TokenTally) -> f64 {
        tally.prompt_tokens as f64 * self.prompt_token_cost
            + tally.completion_tokens as f64 * self.completion_token_cost
    }
}

/// Token counts aggregated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenTally {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub calls: u32,
}

impl TokenTally {
    pub fn record(&mut self, usage: &Usage) {
        self.prompt_tokens += u64::from(usage.prompt_tokens);
        self.completion_tokens += u64::from(usage.completion_tokens);
        self.total_tokens += u64::from(usage.total_tokens);
        self.calls += 1;
    }
}
