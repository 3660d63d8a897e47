//! Unified error hierarchy for ReadyRS
//!
//! Missing data is never an error here: it degrades confidence or yields a
//! documented sentinel. Errors are reserved for contract violations at the
//! query boundary and for collaborator failures.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all ReadyRS operations
#[derive(Debug, Error)]
pub enum ReadyRsError {
    /// Invalid request parameters or malformed values
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Calculation errors
    #[error("Calculation error: {0}")]
    Calculation(#[from] CalculationError),

    /// Event store / factor catalog failures
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Request and event validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Value outside its allowed range
    #[error("{field} out of range: {value} (allowed {min}..={max})")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Negative value where only non-negative values make sense
    #[error("{field} must be non-negative, got {value}")]
    Negative { field: String, value: f64 },

    /// NaN or infinite value
    #[error("{field} must be a finite number")]
    NonFinite { field: String },

    /// Forecast horizon outside the supported window
    #[error("Forecast horizon must be between {min} and {max} days, got {days}")]
    InvalidHorizon { days: u32, min: u32, max: u32 },

    /// Reference to a factor the catalog does not know
    #[error("Unknown factor: {factor_id}")]
    UnknownFactor { factor_id: String },
}

/// Calculation errors
#[derive(Debug, Error)]
pub enum CalculationError {
    /// Insufficient data for calculation
    #[error("Insufficient data for {calculation}: {reason}")]
    InsufficientData { calculation: String, reason: String },

    /// Invalid parameter
    #[error("Invalid parameter for {calculation}: {parameter}={value}")]
    InvalidParameter {
        calculation: String,
        parameter: String,
        value: String,
    },

    /// Invalid date range
    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),
}

/// Collaborator errors (event store, factor catalog, parameter store)
#[derive(Debug, Error)]
pub enum StoreError {
    /// Subject has no history in the store
    #[error("Subject not found: {subject_id}")]
    SubjectNotFound { subject_id: String },

    /// Data bundle could not be read
    #[error("Failed to read data from {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    /// Data bundle could not be parsed
    #[error("Failed to parse data from {path}: {reason}")]
    ParseFailed { path: PathBuf, reason: String },

    /// Store temporarily unavailable
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Result type alias for ReadyRS operations
pub type Result<T> = std::result::Result<T, ReadyRsError>;

impl ReadyRsError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReadyRsError::Store(StoreError::Unavailable { .. }) | ReadyRsError::Io(_)
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ReadyRsError::Validation(_) => ErrorSeverity::Warning,
            ReadyRsError::Store(StoreError::SubjectNotFound { .. }) => ErrorSeverity::Warning,
            ReadyRsError::Calculation(CalculationError::InsufficientData { .. }) => {
                ErrorSeverity::Info
            }
            ReadyRsError::Store(_) => ErrorSeverity::Error,
            ReadyRsError::Internal(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            ReadyRsError::Validation(ValidationError::InvalidHorizon { min, max, .. }) => {
                format!("Please request a forecast between {} and {} days.", min, max)
            }
            ReadyRsError::Store(StoreError::SubjectNotFound { subject_id }) => {
                format!("No check-ins recorded for '{}' yet.", subject_id)
            }
            ReadyRsError::Store(StoreError::ReadFailed { path, .. }) => {
                format!("Could not read data file: {}", path.display())
            }
            ReadyRsError::Calculation(CalculationError::InsufficientData {
                calculation, ..
            }) => {
                format!(
                    "Not enough history to calculate {}. Keep logging daily check-ins.",
                    calculation
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}
