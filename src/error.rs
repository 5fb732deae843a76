//! Error types for the newsletter pipeline
//!
//! Provider failures are kept separate from run-level failures so tools can
//! fold them into agent observations while the runner only aborts on the
//! fatal kinds.

use std::time::Duration;
use thiserror::Error;

/// Top-level pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Data unavailable: {0}")]
    DataUnavailable(#[from] DataError),

    #[error("Model service error: {0}")]
    ModelService(String),

    #[error("Manager exceeded {max_iterations} iterations ({completed}/{total} tasks completed)")]
    ManagerIterationExceeded {
        max_iterations: usize,
        completed: usize,
        total: usize,
    },

    #[error("Invalid crew definition: {0}")]
    Build(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Fatal errors abort the run; everything else is folded into agent output.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PipelineError::DataUnavailable(_))
    }
}

/// Price and news provider errors
#[derive(Error, Debug)]
pub enum DataError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::Parse(err.to_string())
    }
}

impl From<async_openai::error::OpenAIError> for PipelineError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        PipelineError::ModelService(err.to_string())
    }
}

impl From<serde_yaml::Error> for PipelineError {
    fn from(err: serde_yaml::Error) -> Self {
        PipelineError::Config(err.to_string())
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
