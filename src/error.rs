//! Error types for the intake pipeline.

/// Top-level error type for a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Case resolution error: {0}")]
    CaseResolution(#[from] CaseResolutionError),

    #[error("Mail service error: {0}")]
    Mail(#[from] MailError),

    #[error("Case service error: {0}")]
    CaseApi(#[from] CaseApiError),

    #[error("Work queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse process arguments: {0}")]
    Arguments(#[from] serde_json::Error),
}

/// Errors from the field-extraction step.
///
/// An extraction failure is terminal for the message it came from: the
/// message is left in the intake folder and re-listed on the next run.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Identity marker {marker:?} not found in message text")]
    MarkerNotFound { marker: &'static str },

    #[error("Expected {expected} characters after identity marker, found {found}")]
    TruncatedIdentity { expected: usize, found: usize },
}

/// Errors from the case find-or-create step.
#[derive(Debug, thiserror::Error)]
pub enum CaseResolutionError {
    #[error("No name could be resolved for identity {national_id}")]
    NameUnavailable { national_id: String },

    #[error("Case service error: {0}")]
    Api(#[from] CaseApiError),
}

/// Mail service errors.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mail service authentication failed: {reason}")]
    Auth { reason: String },

    #[error("Mail folder not found: {folder}")]
    FolderNotFound { folder: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid response from mail service: {0}")]
    InvalidResponse(String),
}

/// Case-management service errors.
#[derive(Debug, thiserror::Error)]
pub enum CaseApiError {
    #[error("Case service authentication failed: {reason}")]
    Auth { reason: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid response from case service: {0}")]
    InvalidResponse(String),
}

/// Work-queue service errors.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid response from queue service: {0}")]
    InvalidResponse(String),

    #[error("Failed to encode work item payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Status-notification errors.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Invalid mail address {address:?}: {reason}")]
    Address { address: String, reason: String },

    #[error("Failed to build status mail: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}

/// Result type alias for the pipeline.
pub type Result<T, E = Error> = std::result::Result<T, E>;
