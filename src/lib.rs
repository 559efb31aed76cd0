//! # character-export
//!
//! Library for exporting a character's decentralized social-graph data —
//! profile, link lists, links, and notes, optionally with attachments — from
//! a remote indexing API into a single downloadable zip archive.
//!
//! ## Design Philosophy
//!
//! character-export is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Best-effort** - Individual attachment failures never abort an export
//! - **Collaborator-driven** - The indexer API and media resolution are
//!   trait seams, so the embedder wires in clients (or test stubs) once and
//!   threads them through explicitly
//!
//! ## Quick Start
//!
//! ```no_run
//! use character_export::{Exporter, ExportOptions, HttpIndexer, HttpMediaFetcher};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let exporter = Exporter::new(
//!         Arc::new(HttpIndexer::new()?),
//!         Arc::new(HttpMediaFetcher::new()),
//!     );
//!
//!     let archive = exporter
//!         .export(
//!             "alice",
//!             ExportOptions {
//!                 export_notes_in_markdown: true,
//!                 on_progress: Some(Box::new(|fraction, label| {
//!                     println!("{:>5.1}% {label}", fraction * 100.0);
//!                 })),
//!             },
//!         )
//!         .await?;
//!
//!     archive.write_to(".").await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Archive building
pub mod archive;
/// Note markdown composition
pub mod compose;
/// Error types
pub mod error;
/// Export orchestration
pub mod export;
/// Attachment fetching (direct and content-addressed)
pub mod fetch;
/// Indexer API collaborator
pub mod indexer;
/// Cursor-based pagination driver
pub mod pagination;
/// Progress aggregation
pub mod progress;
/// Media link rewriting
pub mod rewrite;
/// Entity types
pub mod types;

// Re-export commonly used types
pub use archive::ArchiveBuilder;
pub use compose::{NoteComposer, NoteDocument, ResolvedAttachment};
pub use error::{Error, Result};
pub use export::{ExportArchive, ExportOptions, Exporter, DEFAULT_PAGE_LIMIT};
pub use fetch::{
    extension_from_content_type, is_content_addressed, FetchedMedia, HttpMediaFetcher,
    MediaFetcher,
};
pub use indexer::{HttpIndexer, Indexer, Page};
pub use progress::{ProgressCallback, ProgressReporter};
pub use rewrite::{MediaLink, MediaScanner, RewrittenContent};
pub use types::{Attachment, Character, Link, Linklist, Note, NoteMetadata, Stage};
