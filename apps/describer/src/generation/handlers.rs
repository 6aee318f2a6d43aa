//! Axum route handlers for the Descriptions API.

use axum::{
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::generation::agent::ProductDescriptionAgent;
use crate::generation::export::{results_to_csv, EXPORT_FILENAME};
use crate::generation::options::GenerationOptions;
use crate::generation::pricing::{ModelPricing, CURRENCY, DEFAULT_MODEL, MODELS};
use crate::generation::prompts::{DEFAULT_GUIDELINES, DEFAULT_SYSTEM_CONTEXT};
use crate::generation::runner::{run_generation, EntryFailure, GenerationReport};
use crate::pipeline::assembler::{assemble, AssembledInputs, ExampleTables, InputEntry, SourceTables};
use crate::state::AppState;
use crate::table::loader::read_csv;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// The multipart upload shared by preview and generate.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub products: Option<Bytes>,
    pub attributes: Option<Bytes>,
    pub example_products: Option<Bytes>,
    pub example_attributes: Option<Bytes>,
    pub options: GenerationOptions,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub entries: IndexMap<String, InputEntry>,
    pub failures: Vec<EntryFailure>,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub default_model: &'static str,
    pub currency: &'static str,
    pub models: &'static [ModelPricing],
}

#[derive(Debug, Serialize)]
pub struct PromptDefaultsResponse {
    pub system_context: &'static str,
    pub guidelines: &'static str,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/models
pub async fn handle_list_models() -> Json<ModelsResponse> {
    Json(ModelsResponse {
        default_model: DEFAULT_MODEL,
        currency: CURRENCY,
        models: MODELS,
    })
}

/// GET /api/v1/prompt/defaults
pub async fn handle_prompt_defaults() -> Json<PromptDefaultsResponse> {
    Json(PromptDefaultsResponse {
        system_context: DEFAULT_SYSTEM_CONTEXT,
        guidelines: DEFAULT_GUIDELINES,
    })
}

/// POST /api/v1/descriptions/preview
///
/// Assembles the model inputs for an upload without calling the model.
pub async fn handle_preview(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PreviewResponse>, AppError> {
    let form = read_upload(multipart).await?;
    let inputs = prepare_inputs(&state, &form)?;

    let entries = inputs
        .ready()
        .map(|(code, entry)| (code.to_string(), entry.clone()))
        .collect();
    let failures = inputs
        .failures()
        .map(|(code, e)| EntryFailure::new(code, &AppError::from(e.clone())))
        .collect();

    Ok(Json(PreviewResponse { entries, failures }))
}

/// POST /api/v1/descriptions/generate
///
/// Full run: upload → assemble → one model call per product → report.
pub async fn handle_generate(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<GenerationReport>, AppError> {
    let form = read_upload(multipart).await?;
    Ok(Json(generate(&state, &form).await?))
}

/// POST /api/v1/descriptions/generate/csv
///
/// Same run as `handle_generate`, returned as a CSV download.
pub async fn handle_generate_csv(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = read_upload(multipart).await?;
    let report = generate(&state, &form).await?;
    let csv = results_to_csv(&report.results)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILENAME}\""),
            ),
        ],
        csv,
    )
        .into_response())
}

// ────────────────────────────────────────────────────────────────────────────
// Shared steps
// ────────────────────────────────────────────────────────────────────────────

async fn generate(state: &AppState, form: &UploadForm) -> Result<GenerationReport, AppError> {
    let pricing = form.options.validate()?;
    let inputs = prepare_inputs(state, form)?;

    let agent = ProductDescriptionAgent::new(state.chat_model.clone(), &form.options);
    Ok(run_generation(&agent, &inputs, pricing).await)
}

/// Loads the uploaded tables and assembles the inputs.
/// Structural problems surface here, before any model call.
fn prepare_inputs(state: &AppState, form: &UploadForm) -> Result<AssembledInputs, AppError> {
    let products = read_csv(
        "products",
        require_part(&form.products, "products")?,
    )?;
    let attributes = read_csv(
        "attributes",
        require_part(&form.attributes, "attributes")?,
    )?;

    let uploaded_examples = match (&form.example_products, &form.example_attributes) {
        (Some(p), Some(a)) => Some(ExampleTables {
            products: read_csv("example products", p)?,
            attributes: read_csv("example attributes", a)?,
        }),
        (None, None) => None,
        _ => {
            return Err(AppError::Validation(
                "example_products and example_attributes must be uploaded together".to_string(),
            ))
        }
    };

    let tables = SourceTables {
        products: &products,
        attributes: &attributes,
        examples: uploaded_examples.as_ref().or(state.examples.as_deref()),
    };

    info!(
        "Preparing inputs for {} products ({} attribute rows, examples: {})",
        products.len(),
        attributes.len(),
        form.options.include_examples
    );

    Ok(assemble(
        &tables,
        form.options.include_examples,
        &state.config.join_policy,
    )?)
}

fn require_part<'a>(part: &'a Option<Bytes>, name: &str) -> Result<&'a [u8], AppError> {
    part.as_deref()
        .ok_or_else(|| AppError::Validation(format!("Missing '{name}' CSV upload")))
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read part '{name}': {e}")))?;

        match name.as_str() {
            "products" => form.products = Some(data),
            "attributes" => form.attributes = Some(data),
            "example_products" => form.example_products = Some(data),
            "example_attributes" => form.example_attributes = Some(data),
            "options" => {
                form.options = serde_json::from_slice(&data)
                    .map_err(|e| AppError::Validation(format!("Invalid options JSON: {e}")))?;
            }
            other => debug!("Ignoring unknown form part '{other}'"),
        }
    }

    Ok(form)
}
