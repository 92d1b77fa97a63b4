use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Retrieval Error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Invariant Violation: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error("Render Error: {0}")]
    Render(#[from] RenderError),

    #[error("Configuration Error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

impl AnalysisError {
    /// Stable numeric code reported by the HTTP layer.
    pub fn code(&self) -> u32 {
        match self {
            AnalysisError::Retrieval(_) => 1001,
            AnalysisError::Invariant(_) => 1002,
            AnalysisError::Render(_) => 1003,
            AnalysisError::Config(_) => 1004,
            AnalysisError::InvalidParameters(_) => 1005,
        }
    }
}

/// Failures talking to the measurement store. Never retried.
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("store unreachable at {url}: {message}")]
    Unreachable {
        message: String,
        url: String,
    },

    #[error("store rejected credentials (HTTP {status})")]
    Unauthorized {
        status: u16,
    },

    #[error("store rejected query: {message}")]
    MalformedQuery {
        message: String,
    },

    #[error("store answered HTTP {status}: {body}")]
    UnexpectedStatus {
        status: u16,
        body: String,
    },

    #[error("could not decode store response: {message}")]
    Decode {
        message: String,
    },

    #[error("could not read records from {path}: {message}")]
    Source {
        message: String,
        path: String,
    },
}

/// A broken structural contract between pipeline stages. Always a defect.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("series has {timestamps} timestamps but {values} values")]
    LengthMismatch {
        timestamps: usize,
        values: usize,
    },

    #[error("measurement {index} is older than its predecessor")]
    OutOfOrder {
        index: usize,
    },

    #[error("outlier index {index} is outside a series of length {len}")]
    IndexOutOfRange {
        index: usize,
        len: usize,
    },
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("drawing failed: {0}")]
    Draw(String),

    #[error("png encoding failed: {0}")]
    Encode(#[from] png::EncodingError),
}

/// The store held more matching records than the result cap allowed.
///
/// Not an error: detection still runs on the `returned` records, the
/// annotation travels with the result so callers know it may be incomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TruncatedResult {
    pub returned: usize,
    pub available: u64,
}

impl fmt::Display for TruncatedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "result truncated: {} of {} matching records returned",
            self.returned, self.available
        )
    }
}

// Error context for tracking where a pipeline stage failed
#[derive(Debug)]
pub struct ErrorContext {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub source_location: &'static str,
    pub operation: String,
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

// Logs the failed operation with context, then hands the error back untouched
#[macro_export]
macro_rules! with_context {
    ($result:expr, $operation:expr) => {
        $result.map_err(|e| {
            let context = $crate::errors::ErrorContext {
                timestamp: chrono::Utc::now(),
                source_location: std::file!(),
                operation: $operation.to_string(),
            };
            tracing::error!(
                error = %e,
                context = ?context,
                "Operation failed"
            );
            e
        })
    };
}
