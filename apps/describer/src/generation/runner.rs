//! Generation run: drives the agent once per assembled entry, in order.
//!
//! Flow: for each entry → skip if assembly failed → agent call → tally usage.
//! A failure for one product is recorded and the loop moves on; nothing is retried.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::agent::ProductDescriptionAgent;
use crate::generation::pricing::{ModelPricing, TokenTally, CURRENCY};
use crate::pipeline::assembler::AssembledInputs;

/// One generated description, as exported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptionResult {
    pub article_code: String,
    pub title: String,
    pub description: String,
}

/// A product that produced no description, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryFailure {
    pub article_code: String,
    pub code: String,
    pub message: String,
}

impl EntryFailure {
    pub fn new(article_code: &str, error: &AppError) -> Self {
        Self {
            article_code: article_code.to_string(),
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CostEstimate {
    pub currency: &'static str,
    pub total: f64,
    pub per_description: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub model: String,
    pub results: Vec<DescriptionResult>,
    pub failures: Vec<EntryFailure>,
    pub usage: TokenTally,
    pub cost: CostEstimate,
    pub elapsed_secs: f64,
    /// `"00h 01m 12s"`
    pub elapsed: String,
    pub avg_secs_per_description: f64,
    pub avg_per_description: String,
}

pub async fn run_generation(
    agent: &ProductDescriptionAgent,
    inputs: &AssembledInputs,
    pricing: &ModelPricing,
) -> GenerationReport {
    let run_id = Uuid::new_v4();
    let started = Instant::now();
    let total = inputs.len();

    info!(
        "Run {}: generating descriptions for {} products with {}",
        run_id,
        total,
        agent.deployment()
    );

    let mut results = Vec::with_capacity(total);
    let mut failures = Vec::new();
    let mut usage = TokenTally::default();

    for (index, (article_code, outcome)) in inputs.iter().enumerate() {
        let entry = match outcome {
            Ok(entry) => entry,
            Err(e) => {
                failures.push(EntryFailure::new(article_code, &AppError::from(e.clone())));
                continue;
            }
        };

        match agent
            .generate_description(article_code, &entry.request, &entry.examples)
            .await
        {
            Ok(generated) => {
                usage.record(&generated.usage);
                results.push(DescriptionResult {
                    article_code: article_code.to_string(),
                    title: generated.title,
                    description: generated.text,
                });
            }
            Err(e) => {
                warn!("Run {}: article {} failed: {}", run_id, article_code, e);
                failures.push(EntryFailure::new(article_code, &e));
            }
        }

        info!("Run {}: {}/{} processed", run_id, index + 1, total);
    }

    let elapsed = started.elapsed();
    let generated = results.len();
    let total_cost = pricing.cost(&usage);
    let avg_elapsed = average_duration(elapsed, generated);

    info!(
        "Run {} done in {}: {} generated, {} failed, {} tokens, est. {} {:.2}",
        run_id,
        format_hms(elapsed),
        generated,
        failures.len(),
        usage.total_tokens,
        CURRENCY,
        total_cost
    );

    GenerationReport {
        run_id,
        generated_at: Utc::now(),
        model: pricing.name.to_string(),
        results,
        failures,
        usage,
        cost: CostEstimate {
            currency: CURRENCY,
            total: total_cost,
            per_description: if generated == 0 {
                0.0
            } else {
                total_cost / generated as f64
            },
        },
        elapsed_secs: elapsed.as_secs_f64(),
        elapsed: format_hms(elapsed),
        avg_secs_per_description: avg_elapsed.as_secs_f64(),
        avg_per_description: format_hms(avg_elapsed),
    }
}

fn average_duration(total: Duration, count: usize) -> Duration {
    match u32::try_from(count) {
        Ok(0) | Err(_) => Duration::ZERO,
        Ok(n) => total / n,
    }
}

/// Formats a duration as `"HHh MMm SSs"`.
pub fn format_hms(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!(
        "{:02}h {:02}m {:02}s",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}
