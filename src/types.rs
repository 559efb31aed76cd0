//! Entity types for the exported social graph
//!
//! All entities are read-only snapshots of indexer records. Unknown upstream
//! fields are preserved through `#[serde(flatten)]` maps so the raw JSON
//! records written into the archive are lossless.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The exported account/profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    /// Numeric character id
    pub character_id: u64,
    /// Human-readable handle resolving to this character
    pub handle: String,
    /// Arbitrary profile metadata blob
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Remaining upstream fields, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A named category of outgoing links (one per link type)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Linklist {
    /// The link type this list groups
    pub link_type: String,
    /// Owning character id
    #[serde(default)]
    pub from_character_id: u64,
    /// Remaining upstream fields, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single directed relation from the character to a target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    /// Source character id
    #[serde(default)]
    pub from_character_id: u64,
    /// Link type tag (matches the owning linklist)
    pub link_type: String,
    /// Target character id, when the target is another character
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_character_id: Option<u64>,
    /// Target URI, when the target is an external reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_uri: Option<String>,
    /// Remaining upstream fields, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A post/content item belonging to a character
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Owning character id
    pub character_id: u64,
    /// Note id, unique per character
    pub note_id: u64,
    /// Content metadata (title, body, declared attachments)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<NoteMetadata>,
    /// Remaining upstream fields, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Content metadata of a note
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteMetadata {
    /// Optional title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Raw body content (markdown)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Declared attachment references
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    /// Remaining metadata fields (tags, sources, publication date, ...)
    ///
    /// These become the frontmatter of the markdown rendition.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A reference to external media declared in a note's metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Alt text for the media
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    /// Declared mime type (e.g. "image/png")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Content-addressed locator (e.g. "ipfs://...")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Direct URL, used when no content-addressed locator exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Remaining upstream fields, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Attachment {
    /// The URL this attachment points at: the content-addressed locator when
    /// present, else the direct URL.
    pub fn url(&self) -> Option<&str> {
        self.address.as_deref().or(self.content.as_deref())
    }
}

/// Pipeline stage of one export run
///
/// `Failed` is an absorbing state reachable from any non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// No export in flight
    Idle,
    /// Resolving the handle to a character
    FetchingCharacter,
    /// Paginating the character's linklists
    FetchingLinklists,
    /// Paginating links, one link type at a time
    FetchingLinks,
    /// Paginating the character's notes
    FetchingNotes,
    /// Writing raw records into the archive
    Compressing,
    /// Rendering notes as markdown with localized attachments
    ExportingMarkdown,
    /// Materializing and handing off the archive
    Delivering,
    /// Export finished successfully
    Done,
    /// Export aborted
    Failed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Idle => "idle",
            Stage::FetchingCharacter => "fetching-character",
            Stage::FetchingLinklists => "fetching-linklists",
            Stage::FetchingLinks => "fetching-links",
            Stage::FetchingNotes => "fetching-notes",
            Stage::Compressing => "compressing",
            Stage::ExportingMarkdown => "exporting-markdown",
            Stage::Delivering => "delivering",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(s)
    }
}
