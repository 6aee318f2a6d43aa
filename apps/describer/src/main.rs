mod config;
mod errors;
mod generation;
mod llm_client;
mod pipeline;
mod routes;
mod state;
mod table;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::pipeline::assembler::ExampleTables;
use crate::routes::build_router;
use crate::state::AppState;
use crate::table::loader::read_csv_file;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting describer v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(config.llm_settings())?;
    info!(
        "LLM client initialized ({:?} at {}, api-version {})",
        config.openai_api_type, config.openai_api_base, config.openai_api_version
    );

    let examples = load_examples(&config);

    let state = AppState {
        chat_model: Arc::new(llm),
        config: config.clone(),
        examples,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Loads the configured few-shot example tables. A missing or unreadable file
/// leaves the service running; runs that ask for examples must then upload them.
fn load_examples(config: &Config) -> Option<Arc<ExampleTables>> {
    let products = read_csv_file("example products", &config.example_products_csv);
    let attributes = read_csv_file("example attributes", &config.example_attributes_csv);

    match (products, attributes) {
        (Ok(products), Ok(attributes)) => {
            info!(
                "Loaded {} example products ({} attribute rows)",
                products.len(),
                attributes.len()
            );
            Some(Arc::new(ExampleTables {
                products,
                attributes,
            }))
        }
        (Err(e), _) | (_, Err(e)) => {
            warn!("Few-shot examples unavailable: {e}");
            None
        }
    }
}
