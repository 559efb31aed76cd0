//! Archive building
//!
//! Owns the output container: a zip archive assembled in memory. Folder
//! creation is idempotent per unique path; file paths may never be reused
//! (the export layout guarantees uniqueness, so a reuse is a bug surfaced as
//! a fatal [`Error::ArchiveWrite`]).

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

/// In-memory zip archive under construction
pub struct ArchiveBuilder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    folders: HashSet<String>,
    files: HashSet<String>,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveBuilder {
    /// Create an empty archive
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            folders: HashSet::new(),
            files: HashSet::new(),
        }
    }

    /// Create a folder entry. Idempotent: creating the same folder twice is
    /// a no-op.
    pub fn folder(&mut self, path: &str) -> Result<()> {
        let normalized = path.trim_matches('/').to_string();
        if normalized.is_empty() {
            return Err(Error::ArchiveWrite {
                path: path.to_string(),
                reason: "empty folder path".to_string(),
            });
        }
        if !self.folders.insert(normalized.clone()) {
            return Ok(());
        }
        self.writer
            .add_directory(&normalized, FileOptions::default())
            .map_err(|e| Error::ArchiveWrite {
                path: normalized,
                reason: e.to_string(),
            })
    }

    /// Write a file entry at `path` with the given payload.
    pub fn file(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
        if !self.files.insert(path.to_string()) {
            return Err(Error::ArchiveWrite {
                path: path.to_string(),
                reason: "archive path already used".to_string(),
            });
        }
        self.writer
            .start_file(path, FileOptions::default())
            .map_err(|e| Error::ArchiveWrite {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        self.writer
            .write_all(bytes)
            .map_err(|e| Error::ArchiveWrite {
                path: path.to_string(),
                reason: e.to_string(),
            })
    }

    /// Materialize the archive into compressed bytes.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let cursor = self.writer.finish().map_err(|e| Error::ArchiveWrite {
            path: String::new(),
            reason: format!("failed to finalize archive: {e}"),
        })?;
        Ok(cursor.into_inner())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn entry_names(bytes: &[u8]) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn folders_and_files_round_trip() {
        let mut builder = ArchiveBuilder::new();
        builder.folder("character").unwrap();
        builder
            .file("character/character.json", br#"{"handle":"alice"}"#)
            .unwrap();
        let bytes = builder.finish().unwrap();

        let names = entry_names(&bytes);
        assert!(names.contains(&"character/".to_string()));
        assert!(names.contains(&"character/character.json".to_string()));

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut content = String::new();
        archive
            .by_name("character/character.json")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, r#"{"handle":"alice"}"#);
    }

    #[test]
    fn folder_creation_is_idempotent() {
        let mut builder = ArchiveBuilder::new();
        builder.folder("notes").unwrap();
        builder.folder("notes").unwrap();
        builder.folder("notes/").unwrap();
        let names = entry_names(&builder.finish().unwrap());
        assert_eq!(names, vec!["notes/".to_string()]);
    }

    #[test]
    fn reused_file_path_is_fatal() {
        let mut builder = ArchiveBuilder::new();
        builder.file("a.json", b"1").unwrap();
        let err = builder.file("a.json", b"2").unwrap_err();
        assert!(matches!(err, Error::ArchiveWrite { .. }));
    }

    #[test]
    fn empty_folder_path_is_fatal() {
        let mut builder = ArchiveBuilder::new();
        assert!(matches!(
            builder.folder("/"),
            Err(Error::ArchiveWrite { .. })
        ));
    }
}
