//! Export orchestration
//!
//! Sequences the pipeline phases for one export run: resolve the handle,
//! paginate linklists, links and notes, write raw records into the archive,
//! optionally render every note as markdown with localized attachments, and
//! materialize the zip for delivery.
//!
//! Collaborators are threaded in explicitly; the orchestrator owns no
//! process-wide state and a run holds its collections in memory only for its
//! own duration.

use crate::archive::ArchiveBuilder;
use crate::compose::NoteComposer;
use crate::error::{Error, Result};
use crate::fetch::MediaFetcher;
use crate::indexer::Indexer;
use crate::pagination;
use crate::progress::{
    ProgressCallback, ProgressReporter, CHARACTER_DONE, LINKLISTS_DONE, LINKS_DONE, NOTES_DONE,
};
use crate::types::{Link, Stage};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Page size requested from every list endpoint
pub const DEFAULT_PAGE_LIMIT: usize = 1000;

/// Options for one export run
#[derive(Default)]
pub struct ExportOptions {
    /// Also render every note as a markdown document with localized media
    pub export_notes_in_markdown: bool,
    /// Progress callback, invoked with non-decreasing fractions in `[0, 1]`
    pub on_progress: Option<ProgressCallback>,
}

/// The delivered artifact: a compressed hierarchical container
#[derive(Debug, Clone)]
pub struct ExportArchive {
    /// Suggested filename, `<handle>.zip`
    pub filename: String,
    /// The zip archive bytes
    pub bytes: Vec<u8>,
}

impl ExportArchive {
    /// Write the archive into `dir` under its suggested filename, returning
    /// the full path.
    pub async fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(&self.filename);
        tokio::fs::write(&path, &self.bytes).await?;
        Ok(path)
    }
}

/// Export pipeline entry point
///
/// Holds the collaborator handles for the indexer API and attachment
/// resolution. One `Exporter` can serve many sequential runs; coordinating
/// concurrent runs of the same handle is the caller's responsibility.
pub struct Exporter {
    indexer: Arc<dyn Indexer>,
    media: Arc<dyn MediaFetcher>,
    page_limit: usize,
}

impl Exporter {
    /// Create an exporter over the given collaborators
    pub fn new(indexer: Arc<dyn Indexer>, media: Arc<dyn MediaFetcher>) -> Self {
        Self {
            indexer,
            media,
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }

    /// Override the per-request page size (mainly for tests)
    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit;
        self
    }

    /// Export all data of the character behind `handle` into a zip archive.
    ///
    /// Either completes with the materialized archive or fails with a
    /// human-readable error; no partial archive is ever delivered. Only
    /// individual attachment failures are absorbed along the way.
    pub async fn export(&self, handle: &str, options: ExportOptions) -> Result<ExportArchive> {
        let mut progress = ProgressReporter::new(options.on_progress);
        match self
            .run(handle, options.export_notes_in_markdown, &mut progress)
            .await
        {
            Ok(archive) => {
                tracing::info!(handle, stage = %Stage::Done, size = archive.bytes.len(), "export complete");
                Ok(archive)
            }
            Err(e) => {
                tracing::warn!(handle, stage = %Stage::Failed, error = %e, "export failed");
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        handle: &str,
        export_notes_in_markdown: bool,
        progress: &mut ProgressReporter,
    ) -> Result<ExportArchive> {
        if handle.trim().is_empty() {
            return Err(Error::EmptyHandle);
        }

        self.enter(Stage::FetchingCharacter, handle);
        progress.emit(0.0, "Fetching character data...");
        let character = self
            .indexer
            .character_by_handle(handle)
            .await?
            .ok_or_else(|| Error::CharacterNotFound {
                handle: handle.to_string(),
            })?;
        let character_id = character.character_id;

        self.enter(Stage::FetchingLinklists, handle);
        progress.emit(CHARACTER_DONE, "Fetching character's linklists...");
        let linklists = pagination::collect_all("linklists", |cursor| {
            self.indexer
                .linklists_of_character(character_id, cursor, self.page_limit)
        })
        .await?;

        self.enter(Stage::FetchingLinks, handle);
        progress.emit(LINKLISTS_DONE, "Fetching character's links...");
        let mut links: Vec<(String, Vec<Link>)> = Vec::with_capacity(linklists.len());
        for (i, linklist) in linklists.iter().enumerate() {
            let list = pagination::collect_all("links", |cursor| {
                self.indexer.links_of_character(
                    character_id,
                    &linklist.link_type,
                    cursor,
                    self.page_limit,
                )
            })
            .await?;
            links.push((linklist.link_type.clone(), list));
            progress.emit(
                LINKLISTS_DONE + ((i + 1) as f64 / linklists.len() as f64) * 0.2,
                &format!(
                    "Fetching character's links... ({}/{})",
                    i + 1,
                    linklists.len()
                ),
            );
        }

        self.enter(Stage::FetchingNotes, handle);
        progress.emit(LINKS_DONE, "Fetching character's notes...");
        let notes = pagination::collect_all_with(
            "notes",
            |cursor| {
                self.indexer
                    .notes_of_character(character_id, cursor, self.page_limit)
            },
            |fetched, total| {
                if let Some(total) = total.filter(|t| *t > 0) {
                    progress.emit(
                        LINKS_DONE + (fetched as f64 / total as f64) * 0.2,
                        &format!("Fetching character's notes... ({fetched}/{total})"),
                    );
                }
            },
        )
        .await?;

        self.enter(Stage::Compressing, handle);
        progress.emit(NOTES_DONE, "Compressing data...");
        let mut archive = ArchiveBuilder::new();
        archive.folder("character")?;
        archive.file("character/character.json", &serde_json::to_vec(&character)?)?;
        archive.folder("linklists")?;
        archive.file("linklists/linklists.json", &serde_json::to_vec(&linklists)?)?;
        for (link_type, list) in &links {
            archive.folder(&format!("linklists/{link_type}"))?;
            archive.file(
                &format!("linklists/{link_type}/links.json"),
                &serde_json::to_vec(list)?,
            )?;
        }
        archive.folder("notes")?;
        for note in &notes {
            archive.file(
                &format!("notes/{}-{}.json", note.character_id, note.note_id),
                &serde_json::to_vec(note)?,
            )?;
        }

        if export_notes_in_markdown {
            self.enter(Stage::ExportingMarkdown, handle);
            archive.folder("notes-markdown")?;
            let composer = NoteComposer::new(self.media.as_ref());
            for (i, note) in notes.iter().enumerate() {
                let document = composer.compose(note).await?;
                let folder = format!("notes-markdown/{}", document.folder_name);
                archive.folder(&folder)?;
                archive.file(
                    &format!("{folder}/{}", document.file_name),
                    document.markdown.as_bytes(),
                )?;
                if !document.attachments.is_empty() {
                    archive.folder(&format!("{folder}/attachments"))?;
                    for attachment in &document.attachments {
                        archive.file(
                            &format!("{folder}/attachments/{}", attachment.filename),
                            &attachment.bytes,
                        )?;
                    }
                }
                progress.emit(
                    NOTES_DONE + ((i + 1) as f64 / notes.len() as f64) * 0.2,
                    &format!("Exporting notes as markdown... ({}/{})", i + 1, notes.len()),
                );
            }
        }

        self.enter(Stage::Delivering, handle);
        let bytes = archive.finish()?;
        progress.emit(1.0, "Done");

        Ok(ExportArchive {
            filename: format!("{handle}.zip"),
            bytes,
        })
    }

    fn enter(&self, stage: Stage, handle: &str) {
        tracing::debug!(handle, stage = %stage, "export stage");
    }
}
