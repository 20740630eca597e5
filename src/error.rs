//! Error types for the agent chain

use thiserror::Error;

/// Result type alias for agent chain operations
pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {

    // =============================
    // Chain Errors
    // =============================

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid signature for agent '{agent}': {reason}")]
    InvalidSignature { agent: String, reason: String },

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Agent '{agent}' is missing input field '{field}'")]
    MissingInput { agent: String, field: String },

    #[error("Chain error: {0}")]
    ChainError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    // =============================
    // Calculator & Document Errors
    // =============================

    #[error("Invalid {kind} date '{value}'. Use dd/mm/yyyy")]
    InvalidDate { kind: &'static str, value: String },

    #[error("Trading data error: {0}")]
    TradingDataError(String),

    #[error("Document error: {0}")]
    DocumentError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Spreadsheet error: {0}")]
    SpreadsheetError(#[from] calamine::Error),

    #[error("Archive error: {0}")]
    ArchiveError(#[from] zip::result::ZipError),
}
