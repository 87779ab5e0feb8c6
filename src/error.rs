//! Error types for Campaign Assist.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Campaign error: {0}")]
    Campaign(#[from] CampaignError),

    #[error("Sequence error: {0}")]
    Sequence(#[from] SequenceError),

    #[error("Voice error: {0}")]
    Voice(#[from] VoiceError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Errors raised by the campaign conversation driver.
#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    #[error("Input is empty")]
    EmptyInput,

    #[error("A request is already in flight for session {session_id}")]
    RequestInFlight { session_id: String },

    #[error("No request is outstanding for session {session_id}")]
    NoPendingRequest { session_id: String },

    #[error("Cannot transition launch status from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Unknown sender account: {0}")]
    UnknownMailbox(String),

    #[error("AI reply rejected: {0}")]
    ReplyRejected(String),

    #[error("Campaign turn task failed: {0}")]
    TurnFailed(String),
}

/// Errors raised while editing a sequence graph.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("Node '{0}' not found")]
    NodeNotFound(String),

    #[error("Edge '{0}' not found")]
    EdgeNotFound(String),

    #[error("Edge from '{source_id}' to '{target_id}' already exists")]
    DuplicateEdge { source_id: String, target_id: String },

    #[error("Node '{node_id}' cannot connect to itself")]
    SelfLoop { node_id: String },

    #[error("Handle '{handle}' on node '{node_id}' already has an outgoing edge")]
    HandleInUse { node_id: String, handle: String },

    #[error("Handle '{handle}' is not valid for node '{node_id}'")]
    InvalidHandle { node_id: String, handle: String },

    #[error("The start node cannot {0}")]
    StartNode(&'static str),
}

/// Voice I/O errors.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum VoiceError {
    #[error("Speech recognition is not supported")]
    RecognitionUnsupported,

    #[error("Speech recognition failed: {0}")]
    Recognition(#[from] crate::voice::RecognitionError),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
