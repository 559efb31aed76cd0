//! Note markdown composition
//!
//! Builds one portable markdown document per note: YAML frontmatter, an
//! optional title heading, the raw body, and media tags for every attachment
//! declared in the note's metadata. The assembled body goes through the
//! media link rewriter, all discovered media is fetched concurrently, and
//! successful `(original, extended)` filename pairs are then substituted
//! sequentially once the parallel phase completes.

use crate::error::{Error, Result};
use crate::fetch::{extension_from_content_type, MediaFetcher};
use crate::rewrite::{MediaScanner, LOCAL_PREFIX};
use crate::types::{Attachment, Note, NoteMetadata};
use futures::future::join_all;

/// Maximum length of a folder title derived from the body's first line
const DERIVED_TITLE_MAX_CHARS: usize = 50;

/// Fallback folder title when a note has neither title nor content
const FALLBACK_TITLE: &str = "note";

/// Characters unsafe in archive folder names, replaced with underscores
const UNSAFE_CHARS: [char; 10] = ['/', '\\', '?', '%', '*', ':', '|', '"', '<', '>'];

/// A resolved attachment ready for the archive
#[derive(Debug, Clone)]
pub struct ResolvedAttachment {
    /// Final filename, extension included when one was derived
    pub filename: String,
    /// Raw attachment bytes
    pub bytes: Vec<u8>,
}

/// A fully composed markdown rendition of one note
#[derive(Debug, Clone)]
pub struct NoteDocument {
    /// Folder name: `<characterId>-<noteId> - <title>`
    pub folder_name: String,
    /// Markdown file name: `<title>.md`
    pub file_name: String,
    /// Frontmatter + rewritten body
    pub markdown: String,
    /// Successfully fetched attachments for the note's `attachments/` folder
    pub attachments: Vec<ResolvedAttachment>,
}

/// Composer turning notes into [`NoteDocument`]s
pub struct NoteComposer<'a> {
    scanner: MediaScanner,
    fetcher: &'a dyn MediaFetcher,
}

impl<'a> NoteComposer<'a> {
    /// Create a composer resolving media through `fetcher`
    pub fn new(fetcher: &'a dyn MediaFetcher) -> Self {
        Self {
            scanner: MediaScanner::new(),
            fetcher,
        }
    }

    /// Compose the markdown document for one note.
    ///
    /// Attachment fetch failures are logged and absorbed: the affected
    /// reference keeps its un-extended relative path and the attachment is
    /// omitted from the result. When two distinct URLs derive the same
    /// filename, the first fetched payload wins; later payloads for that
    /// name are dropped so the archive never holds bytes no reference
    /// points at.
    pub async fn compose(&self, note: &Note) -> Result<NoteDocument> {
        let default_meta = NoteMetadata::default();
        let meta = note.metadata.as_ref().unwrap_or(&default_meta);

        let title = folder_title(meta);
        let folder_name = format!("{}-{} - {}", note.character_id, note.note_id, title);
        let file_name = format!("{title}.md");

        let rewritten = self.scanner.rewrite(&assemble_body(meta));
        let mut markdown = rewritten.content;

        // Parallel phase: fetch every discovered media reference
        let fetches = join_all(
            rewritten
                .media
                .iter()
                .map(|link| self.fetcher.fetch(&link.url)),
        )
        .await;

        // Sequential phase: extend filenames and collect archive payloads
        let mut substitutions: Vec<(String, String)> = Vec::new();
        let mut attachments: Vec<ResolvedAttachment> = Vec::new();
        for (link, fetched) in rewritten.media.iter().zip(fetches) {
            let media = match fetched {
                Ok(media) => media,
                Err(e) => {
                    tracing::warn!(url = %link.url, error = %e, "skipping attachment");
                    continue;
                }
            };
            let extension = media
                .content_type
                .as_deref()
                .and_then(extension_from_content_type);
            let filename = match extension {
                Some(ext) => {
                    let extended = format!("{}.{}", link.filename, ext);
                    let claimed = substitutions
                        .iter()
                        .find(|(o, _)| o == &link.filename)
                        .map(|(_, e)| e.clone());
                    match claimed {
                        // A different URL already claimed this filename with
                        // another extension; every reference will point at
                        // that one, so this payload would be unreachable.
                        Some(existing) if existing != extended => {
                            tracing::warn!(
                                url = %link.url,
                                filename = %extended,
                                "duplicate filename resolves differently, dropping payload"
                            );
                            continue;
                        }
                        Some(_) => extended,
                        None => {
                            substitutions.push((link.filename.clone(), extended.clone()));
                            extended
                        }
                    }
                }
                // No derivable extension: the reference stays as-is
                None => link.filename.clone(),
            };
            if attachments.iter().any(|a| a.filename == filename) {
                tracing::debug!(filename = %filename, "duplicate attachment filename, keeping first");
                continue;
            }
            attachments.push(ResolvedAttachment {
                filename,
                bytes: media.bytes,
            });
        }
        markdown = apply_substitutions(&markdown, &substitutions);

        let frontmatter = render_frontmatter(meta)?;
        Ok(NoteDocument {
            folder_name,
            file_name,
            markdown: format!("{frontmatter}{markdown}"),
            attachments,
        })
    }
}

/// Assemble the raw body: optional heading, content, declared media tags.
fn assemble_body(meta: &NoteMetadata) -> String {
    let mut body = String::new();
    if let Some(title) = meta.title.as_deref().filter(|t| !t.is_empty()) {
        body.push_str(&format!("# {title}\n\n"));
    }
    if let Some(content) = meta.content.as_deref() {
        body.push_str(content);
    }
    for attachment in meta.attachments.iter().flatten() {
        if let Some(tag) = media_tag(attachment) {
            body.push_str("\n\n");
            body.push_str(&tag);
        }
    }
    body
}

/// Render one declared attachment as an embed, by mime-type category.
fn media_tag(attachment: &Attachment) -> Option<String> {
    let url = attachment.url()?;
    let alt = attachment.alt.as_deref().unwrap_or("");
    let mime = attachment.mime_type.as_deref().unwrap_or("");
    let tag = if mime.starts_with("image/") || mime.is_empty() {
        // Images are the overwhelmingly common case and the legacy default
        format!("![{alt}]({url})")
    } else if mime.starts_with("video/") {
        format!(r#"<video controls src="{url}"></video>"#)
    } else if mime.starts_with("audio/") {
        format!(r#"<audio controls src="{url}"></audio>"#)
    } else {
        let text = if alt.is_empty() { "attachment" } else { alt };
        format!("[{text}]({url})")
    };
    Some(tag)
}

/// Derive the filesystem-safe folder title for a note.
///
/// Explicit title first; else the first non-empty content line with leading
/// `#` markers stripped, truncated; else a literal fallback.
fn folder_title(meta: &NoteMetadata) -> String {
    if let Some(title) = meta.title.as_deref().filter(|t| !t.trim().is_empty()) {
        return sanitize_title(title.trim());
    }

    let derived = meta
        .content
        .as_deref()
        .unwrap_or("")
        .lines()
        .map(|line| line.trim_start_matches('#').trim())
        .find(|line| !line.is_empty())
        .map(|line| line.chars().take(DERIVED_TITLE_MAX_CHARS).collect::<String>());

    match derived {
        Some(title) => sanitize_title(&title),
        None => FALLBACK_TITLE.to_string(),
    }
}

/// Replace path-unsafe characters with underscores.
fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Replace un-extended local references with their extended forms in one
/// left-to-right pass. A candidate only matches when the whole reference
/// matches: the filename must be followed by a reference delimiter, so a
/// name that merely prefixes a longer (possibly unfetched) filename is
/// never rewritten mid-token. Longest original first at each position.
fn apply_substitutions(markdown: &str, pairs: &[(String, String)]) -> String {
    if pairs.is_empty() {
        return markdown.to_string();
    }
    let mut ordered: Vec<&(String, String)> = pairs.iter().collect();
    ordered.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut out = String::with_capacity(markdown.len());
    let mut rest = markdown;
    while let Some(idx) = rest.find(LOCAL_PREFIX) {
        let reference_start = idx + LOCAL_PREFIX.len();
        out.push_str(&rest[..reference_start]);
        rest = &rest[reference_start..];

        if let Some((original, extended)) = ordered.iter().find(|(original, _)| {
            rest.starts_with(original.as_str()) && ends_reference(&rest[original.len()..])
        }) {
            out.push_str(extended);
            rest = &rest[original.len()..];
        }
    }
    out.push_str(rest);
    out
}

/// Whether the text after a candidate filename is a valid end of the
/// reference: the markdown link closer, an HTML attribute quote, whitespace
/// (a markdown link title follows), or end of input.
fn ends_reference(rest: &str) -> bool {
    rest.chars()
        .next()
        .map_or(true, |c| c == ')' || c == '"' || c.is_whitespace())
}

/// Render the YAML frontmatter block: every metadata field except the body
/// content and the attachments list.
fn render_frontmatter(meta: &NoteMetadata) -> Result<String> {
    let mut fields = serde_json::Map::new();
    if let Some(title) = &meta.title {
        fields.insert("title".to_string(), serde_json::Value::String(title.clone()));
    }
    for (key, value) in &meta.extra {
        fields.insert(key.clone(), value.clone());
    }
    if fields.is_empty() {
        return Ok(String::new());
    }

    let yaml = serde_yaml::to_string(&fields).map_err(Error::Frontmatter)?;
    Ok(format!("---\n{yaml}---\n\n"))
}
