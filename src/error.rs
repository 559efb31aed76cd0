//! Error types for character-export
//!
//! This module provides the error taxonomy for the export pipeline:
//! - Fatal errors that abort an export run (missing character, upstream
//!   failures, archive write failures)
//! - Recoverable errors that are absorbed locally (individual attachment
//!   fetch failures)

use thiserror::Error;

/// Result type alias for character-export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for character-export
///
/// Only [`Error::AttachmentFetch`] is ever recovered from; every other
/// variant aborts the export run and is surfaced to the caller with no
/// partial archive delivered.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (e.g. an unparseable indexer base URL)
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable description of the invalid setting
        message: String,
    },

    /// The handle does not resolve to a character
    #[error("Character not found")]
    CharacterNotFound {
        /// The handle that failed to resolve
        handle: String,
    },

    /// An export was requested with an empty handle string
    #[error("handle must not be empty")]
    EmptyHandle,

    /// A list endpoint returned a non-success status
    #[error("indexer returned status {status} for {endpoint}")]
    UnexpectedStatus {
        /// The endpoint path that failed
        endpoint: String,
        /// The HTTP status code returned
        status: u16,
    },

    /// A pagination loop exceeded the defensive page bound
    ///
    /// The upstream cursor contract promises eventual exhaustion; hitting
    /// this bound means the collaborator is misbehaving.
    #[error("pagination for {entity} exceeded {max_pages} pages without cursor exhaustion")]
    PaginationOverflow {
        /// The entity being paginated (e.g. "linklists", "notes")
        entity: String,
        /// The page bound that was exceeded
        max_pages: usize,
    },

    /// An individual attachment could not be fetched
    ///
    /// Recovered locally: the attachment is omitted from the archive and its
    /// markdown reference is left un-extended.
    #[error("failed to fetch attachment {url}: {reason}")]
    AttachmentFetch {
        /// The attachment URL that failed
        url: String,
        /// The reason the fetch failed
        reason: String,
    },

    /// A folder or file could not be written into the output container
    #[error("failed to write archive entry {path}: {reason}")]
    ArchiveWrite {
        /// The archive path that failed
        path: String,
        /// The reason the write failed
        reason: String,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML frontmatter serialization error
    #[error("frontmatter error: {0}")]
    Frontmatter(#[from] serde_yaml::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
