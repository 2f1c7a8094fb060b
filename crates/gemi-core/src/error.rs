//! Error types for Gemi core operations.
//!
//! Errors are descriptive at the core level; the CLI layer maps them to
//! user-facing messages. Two broad classes matter to callers:
//!
//! - [`JournalError::is_data_loss`]: key or decryption failures. The affected
//!   content may be unrecoverable.
//! - [`JournalError::is_retryable`]: embedded-database failures that the
//!   caller may retry. The engine never retries on its own.

use thiserror::Error;

/// Result type alias for Gemi operations.
pub type Result<T> = std::result::Result<T, JournalError>;

/// Core error type for Gemi storage operations.
#[derive(Debug, Error)]
pub enum JournalError {
    /// An operation was attempted before `initialize` completed.
    #[error("Journal storage is not initialized")]
    NotInitialized,

    /// The secure credential store could not be read or written.
    #[error("Cannot access the journal encryption key: {0}")]
    KeyStore(String),

    /// Sealing content failed.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Opening a ciphertext bundle failed (tampered row or wrong key).
    #[error("Decryption error: {0}")]
    Decryption(String),

    /// Schema creation or migration failed during startup.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Preparing or running a query failed.
    #[error("SQLite statement error ({context}): {source}")]
    Statement {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// Reading a row back failed.
    #[error("SQLite read error ({context}): {source}")]
    Read {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// Writing a row failed.
    #[error("SQLite write error ({context}): {source}")]
    Write {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// Deleting rows failed.
    #[error("SQLite delete error ({context}): {source}")]
    Delete {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// A stored plaintext column could not be decoded.
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(String),

    /// Filesystem error
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// The blocking worker running an operation panicked or was cancelled.
    #[error("Storage worker failed: {0}")]
    Worker(String),
}

impl JournalError {
    pub(crate) fn statement(context: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| JournalError::Statement { context, source }
    }

    pub(crate) fn read(context: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| JournalError::Read { context, source }
    }

    pub(crate) fn write(context: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| JournalError::Write { context, source }
    }

    pub(crate) fn delete(context: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| JournalError::Delete { context, source }
    }

    /// True when the failure means stored content may be unrecoverable.
    pub fn is_data_loss(&self) -> bool {
        matches!(self, JournalError::KeyStore(_) | JournalError::Decryption(_))
    }

    /// True for transient database failures the caller may try again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            JournalError::Statement { .. }
                | JournalError::Read { .. }
                | JournalError::Write { .. }
                | JournalError::Delete { .. }
        )
    }
}

impl From<serde_json::Error> for JournalError {
    fn from(err: serde_json::Error) -> Self {
        JournalError::CorruptRow(err.to_string())
    }
}
