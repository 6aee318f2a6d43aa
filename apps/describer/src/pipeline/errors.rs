use thiserror::Error;

/// Failures raised while shaping source tables into model inputs.
///
/// Structural variants (`MissingColumn`, `MissingTable`, `MalformedRow`) abort a run
/// before any product is processed. Every other variant is scoped to a single
/// article code and is recorded as that product's outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Article code '{article_code}' not found in {table} table")]
    NotFound { article_code: String, table: String },

    #[error("{table} table is missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("Record for article code '{article_code}' is missing field '{field}'")]
    MissingField { article_code: String, field: String },

    #[error("{0} table was not provided")]
    MissingTable(String),

    #[error("{table} table row {row} has {found} fields, expected {expected}")]
    MalformedRow {
        table: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Article code '{article_code}' has more than one '{attribute}' attribute")]
    AmbiguousAttribute {
        article_code: String,
        attribute: String,
    },

    #[error("Article code '{article_code}' matches {count} rows in {table} table")]
    AmbiguousProduct {
        article_code: String,
        table: String,
        count: usize,
    },

    #[error("Attribute '{column}' of article code '{article_code}' collides with a product column")]
    ColumnCollision {
        article_code: String,
        column: String,
    },
}

impl PipelineError {
    /// Stable machine-readable code used in API responses and reports.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::NotFound { .. } => "NOT_FOUND",
            PipelineError::MissingColumn { .. } => "MISSING_COLUMN",
            PipelineError::MissingField { .. } => "MISSING_FIELD",
            PipelineError::MissingTable(_) => "MISSING_TABLE",
            PipelineError::MalformedRow { .. } => "MALFORMED_ROW",
            PipelineError::AmbiguousAttribute { .. } => "AMBIGUOUS_ATTRIBUTE",
            PipelineError::AmbiguousProduct { .. } => "AMBIGUOUS_PRODUCT",
            PipelineError::ColumnCollision { .. } => "COLUMN_COLLISION",
        }
    }

    /// The offending article code, when the failure concerns one product.
    pub fn article_code(&self) -> Option<&str> {
        match self {
            PipelineError::NotFound { article_code, .. }
            | PipelineError::MissingField { article_code, .. }
            | PipelineError::AmbiguousAttribute { article_code, .. }
            | PipelineError::AmbiguousProduct { article_code, .. }
            | PipelineError::ColumnCollision { article_code, .. } => Some(article_code),
            PipelineError::MissingColumn { .. }
            | PipelineError::MissingTable(_)
            | PipelineError::MalformedRow { .. } => None,
        }
    }

    /// True for failures that invalidate the whole run rather than one product.
    pub fn is_structural(&self) -> bool {
        self.article_code().is_none()
    }
}
