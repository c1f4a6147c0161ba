//! # Qremis - Linked archival-metadata record store
//!
//! Manages a graph of PREMIS-like metadata records and the many-to-many
//! links between them, over a swappable persistence engine.
//!
//! Qremis provides:
//! - Five record kinds: object, event, agent, rights, relationship
//! - A storage contract with sorted-index (Redis / in-process) and
//!   document (SQLite) backends
//! - Bidirectional linking with stub relationship synthesis
//! - Cursor-based pagination over kind listings and link listings
//! - An HTTP API for creating, linking and reading records

pub mod kind;
pub mod pagination;
pub mod record;
pub mod storage;
pub mod linker;
pub mod config;
pub mod server;
pub mod ui;

// Re-exports for convenient access
pub use kind::RecordKind;
pub use pagination::{Cursor, Page};
pub use storage::StorageBackend;
pub use config::ServiceConfig;

/// Result type alias for Qremis operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Qremis operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid record kind: {0}")]
    InvalidKind(String),

    #[error(
        "Relationship passed as the first link operand ({kind1} -> {kind2}); \
         the relationship must be the second operand so no additional relationship is minted"
    )]
    InvalidLinkOrder { kind1: RecordKind, kind2: RecordKind },

    #[error("Identifier {0} already exists")]
    DuplicateIdentifier(String),

    #[error("Identifier {0} does not exist")]
    IdentifierNotFound(String),

    #[error("Link {from} -> {to} was written in one direction only: {source}")]
    PartialLink {
        from: String,
        to: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("The record is missing a uuid identifier")]
    MissingUuidIdentifier,

    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Key {0} holds a value of the wrong type")]
    WrongType(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable name reported to API clients alongside the message
    pub fn error_name(&self) -> &'static str {
        match self {
            Error::Config(_) | Error::Toml(_) => "ConfigError",
            Error::InvalidKind(_) => "InvalidKindError",
            Error::InvalidLinkOrder { .. } => "InvalidLinkOrderError",
            Error::DuplicateIdentifier(_) => "DuplicateIdentifierError",
            Error::IdentifierNotFound(_) => "IdentifierDoesNotExistError",
            Error::PartialLink { .. } => "PartialLinkError",
            Error::InvalidCursor(_) => "InvalidCursorError",
            Error::InvalidRecord(_) => "InvalidQremisRecordError",
            Error::MissingUuidIdentifier => "MissingQremisUUIDIdentifierError",
            Error::MissingParameter(_) => "MissingParameterError",
            Error::InvalidRequest(_) => "InvalidRequestError",
            Error::WrongType(_)
            | Error::Sqlite(_)
            | Error::Redis(_)
            | Error::Pool(_)
            | Error::Json(_)
            | Error::Io(_) => "ServerError",
        }
    }

    /// Whether the caller caused this error (as opposed to the backend)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidKind(_)
                | Error::InvalidLinkOrder { .. }
                | Error::DuplicateIdentifier(_)
                | Error::InvalidCursor(_)
                | Error::InvalidRecord(_)
                | Error::MissingUuidIdentifier
                | Error::MissingParameter(_)
                | Error::InvalidRequest(_)
        )
    }

    /// Whether this is a lookup miss
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::IdentifierNotFound(_))
    }
}
