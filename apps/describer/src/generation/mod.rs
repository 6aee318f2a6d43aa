// Description generation: per-run options, the few-shot agent, the sequential
// runner with usage/cost accounting, and CSV export.
// All model calls go through llm_client via the ChatModel trait.

pub mod agent;
pub mod export;
pub mod handlers;
pub mod options;
pub mod pricing;
pub mod prompts;
pub mod runner;
