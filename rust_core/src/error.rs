use thiserror::Error;

/// Errors raised at the edges of the engine.
///
/// The analytics themselves never fail; these cover ingest, strict registry
/// lookups, odds parsing, configuration and publishing.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Ingest error ({source_name}): {reason}")]
    Ingest {
        source_name: &'static str,
        reason: String,
    },

    #[error("Unknown filter field: {0}")]
    UnknownField(String),

    #[error("Operator {operator} is not valid for field {field}")]
    IncompatibleOperator { field: String, operator: String },

    #[error("Invalid American odds: {0}")]
    InvalidOdds(f64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Strategy rejected: {}", .0.join("; "))]
    PublishRejected(Vec<String>),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub fn ingest(source_name: &'static str, reason: impl Into<String>) -> Self {
        EngineError::Ingest {
            source_name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
