//! Media link rewriting
//!
//! Scans note content for embedded media references and rewrites remote URLs
//! to local relative paths under `./attachments/`, collecting the original
//! URLs for later resolution. Three embedding syntaxes are recognized:
//! markdown images, and HTML `<img>`/`<video>`/`<audio>` tags carrying a
//! `src` attribute.
//!
//! Each syntax has its own pattern and the scan is a single left-to-right
//! pass picking the earliest match, so alt text and titles are never touched
//! and already-rewritten content passes through unchanged.

use regex::Regex;

/// A discovered media reference, in encounter order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaLink {
    /// The original remote URL as it appeared in the content
    pub url: String,
    /// The local filename the reference was rewritten to (no extension yet)
    pub filename: String,
}

/// Result of one rewriting pass
#[derive(Debug, Clone)]
pub struct RewrittenContent {
    /// Content with every recognized remote URL replaced by
    /// `./attachments/<filename>`
    pub content: String,
    /// Original URLs needing resolution, duplicates allowed, encounter order
    pub media: Vec<MediaLink>,
}

/// Local path prefix substituted for recognized remote URLs
pub const LOCAL_PREFIX: &str = "./attachments/";

/// Remote address prefixes eligible for rewriting
const REMOTE_PREFIXES: [&str; 3] = ["https://", "http://", "ipfs://"];

/// One recognized embed within the scanned slice
struct EmbedMatch {
    /// Byte offset of the whole embed
    start: usize,
    /// Byte offset one past the whole embed
    end: usize,
    /// URL span within the slice
    url_start: usize,
    url_end: usize,
    /// Quoted title, markdown images only
    title: Option<String>,
}

/// Scanner holding the compiled per-syntax patterns
pub struct MediaScanner {
    markdown_image: Regex,
    html_image: Regex,
    html_video: Regex,
    html_audio: Regex,
}

impl Default for MediaScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaScanner {
    /// Compile the per-syntax patterns
    pub fn new() -> Self {
        // The patterns are fixed string literals; compilation cannot fail.
        #[allow(clippy::expect_used)]
        let compile = |pattern: &str| Regex::new(pattern).expect("invalid media pattern");
        Self {
            markdown_image: compile(r#"!\[[^\]\n]*\]\(\s*([^()\s]+)(?:\s+"([^"\n]*)")?\s*\)"#),
            html_image: compile(r#"<img\b[^>]*?\bsrc\s*=\s*"([^"]*)"[^>]*?/?>"#),
            html_video: compile(r#"<video\b[^>]*?\bsrc\s*=\s*"([^"]*)"[^>]*?>"#),
            html_audio: compile(r#"<audio\b[^>]*?\bsrc\s*=\s*"([^"]*)"[^>]*?>"#),
        }
    }

    /// Rewrite every recognized remote media URL in `content` and collect the
    /// originals.
    pub fn rewrite(&self, content: &str) -> RewrittenContent {
        let mut out = String::with_capacity(content.len());
        let mut media = Vec::new();
        let mut pos = 0;

        while let Some(embed) = self.earliest_match(&content[pos..]) {
            let url = &content[pos + embed.url_start..pos + embed.url_end];

            match local_filename(embed.title.as_deref(), url) {
                Some(filename) => {
                    out.push_str(&content[pos..pos + embed.url_start]);
                    out.push_str(LOCAL_PREFIX);
                    out.push_str(&filename);
                    media.push(MediaLink {
                        url: url.to_string(),
                        filename,
                    });
                }
                // Unrecognized prefix or no derivable filename segment:
                // leave the span untouched
                None => out.push_str(&content[pos..pos + embed.url_end]),
            }
            out.push_str(&content[pos + embed.url_end..pos + embed.end]);
            pos += embed.end;
        }

        out.push_str(&content[pos..]);
        RewrittenContent {
            content: out,
            media,
        }
    }

    /// Find the earliest embed of any recognized syntax in `slice`.
    fn earliest_match(&self, slice: &str) -> Option<EmbedMatch> {
        let mut best: Option<EmbedMatch> = None;

        for (pattern, titled) in [
            (&self.markdown_image, true),
            (&self.html_image, false),
            (&self.html_video, false),
            (&self.html_audio, false),
        ] {
            let Some(caps) = pattern.captures(slice) else {
                continue;
            };
            // Group 0 always exists and group 1 is the url in every pattern
            let (whole, url) = match (caps.get(0), caps.get(1)) {
                (Some(whole), Some(url)) => (whole, url),
                _ => continue,
            };
            if best.as_ref().is_some_and(|b| b.start <= whole.start()) {
                continue;
            }
            let title = if titled {
                caps.get(2)
                    .map(|m| m.as_str().to_string())
                    .filter(|t| !t.trim().is_empty())
            } else {
                None
            };
            best = Some(EmbedMatch {
                start: whole.start(),
                end: whole.end(),
                url_start: url.start(),
                url_end: url.end(),
                title,
            });
        }

        best
    }
}

/// Derive the local filename for a recognized remote URL.
///
/// The quoted title wins when present; otherwise the URL's final path
/// segment, percent-decoded. Whitespace runs become single underscores.
/// Returns `None` for unrecognized prefixes or URLs with no derivable
/// segment (malformed references are a no-op).
fn local_filename(title: Option<&str>, url: &str) -> Option<String> {
    if !REMOTE_PREFIXES.iter().any(|p| url.starts_with(p)) {
        return None;
    }

    let candidate = match title {
        Some(title) => title.to_string(),
        None => {
            let without_suffix = url
                .split(['?', '#'])
                .next()
                .unwrap_or(url);
            let segment = without_suffix.rsplit('/').next().unwrap_or("");
            match urlencoding::decode(segment) {
                Ok(decoded) => decoded.into_owned(),
                Err(_) => segment.to_string(),
            }
        }
    };

    let filename = collapse_whitespace(&candidate);
    if filename.is_empty() {
        None
    } else {
        Some(filename)
    }
}

/// Replace every run of whitespace with a single underscore.
fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_run = false;
    for c in s.trim().chars() {
        if c.is_whitespace() {
            if !in_run {
                out.push('_');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}
