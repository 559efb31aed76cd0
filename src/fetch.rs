//! Attachment fetching
//!
//! Resolves discovered media URLs into raw bytes plus a declared content
//! type. Ordinary URLs are fetched directly; content-addressed (`ipfs://`)
//! addresses resolve through an HTTPS gateway. Failures are reported as
//! [`Error::AttachmentFetch`] and absorbed by the composer, never aborting
//! the export.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Scheme prefix marking a content-addressed locator
pub const CONTENT_ADDRESSED_SCHEME: &str = "ipfs://";

/// Default gateway used to resolve content-addressed locators
pub const DEFAULT_IPFS_GATEWAY: &str = "https://ipfs.io/ipfs/";

/// Per-attachment fetch timeout
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Whether a URL uses the content-addressed scheme
pub fn is_content_addressed(url: &str) -> bool {
    url.starts_with(CONTENT_ADDRESSED_SCHEME)
}

/// Derive a file extension from a declared content type's subtype.
///
/// `image/png` → `png`, `audio/mpeg; charset=x` → `mpeg`. Returns `None`
/// when no subtype can be derived; the attachment reference then stays
/// un-extended.
pub fn extension_from_content_type(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next()?.trim();
    let subtype = essence.split('/').nth(1)?.trim();
    if subtype.is_empty() {
        None
    } else {
        Some(subtype.to_string())
    }
}

/// A successfully fetched attachment
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    /// Raw bytes of the attachment
    pub bytes: Vec<u8>,
    /// Declared content type, when the response carried one
    pub content_type: Option<String>,
}

/// Media resolution surface consumed by the note composer
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Resolve one URL (direct or content-addressed) into bytes and a
    /// content type.
    async fn fetch(&self, url: &str) -> Result<FetchedMedia>;
}

/// HTTP implementation of [`MediaFetcher`] backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpMediaFetcher {
    client: reqwest::Client,
    gateway: String,
}

impl Default for HttpMediaFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpMediaFetcher {
    /// Create a fetcher resolving content-addressed locators through the
    /// default gateway
    pub fn new() -> Self {
        Self::with_gateway(DEFAULT_IPFS_GATEWAY)
    }

    /// Create a fetcher with a custom content-addressed gateway prefix
    pub fn with_gateway(gateway: &str) -> Self {
        let mut gateway = gateway.to_string();
        if !gateway.ends_with('/') {
            gateway.push('/');
        }
        Self {
            client: reqwest::Client::new(),
            gateway,
        }
    }

    /// The HTTPS URL actually requested for `url`
    fn resolved_url(&self, url: &str) -> String {
        match url.strip_prefix(CONTENT_ADDRESSED_SCHEME) {
            Some(address) => format!("{}{}", self.gateway, address),
            None => url.to_string(),
        }
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia> {
        let target = self.resolved_url(url);
        tracing::debug!(url, target = %target, "fetching attachment");

        let response = self
            .client
            .get(&target)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::AttachmentFetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::AttachmentFetch {
                url: url.to_string(),
                reason: format!("status {status}"),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::AttachmentFetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(FetchedMedia {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn scheme_detection() {
        assert!(is_content_addressed("ipfs://bafyabc/pic.png"));
        assert!(!is_content_addressed("https://x.test/pic.png"));
        assert!(!is_content_addressed("./attachments/pic.png"));
    }

    #[test]
    fn extension_derivation() {
        assert_eq!(extension_from_content_type("image/png").as_deref(), Some("png"));
        assert_eq!(
            extension_from_content_type("audio/mpeg; charset=utf-8").as_deref(),
            Some("mpeg")
        );
        assert_eq!(extension_from_content_type("image/"), None);
        assert_eq!(extension_from_content_type("weird"), None);
    }

    #[tokio::test]
    async fn direct_fetch_returns_bytes_and_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pic.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"png-bytes".to_vec())
                    .insert_header("content-type", "image/png"),
            )
            .mount(&server)
            .await;

        let fetcher = HttpMediaFetcher::new();
        let media = fetcher
            .fetch(&format!("{}/pic.png", server.uri()))
            .await
            .unwrap();
        assert_eq!(media.bytes, b"png-bytes");
        assert_eq!(media.content_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn content_addressed_fetch_goes_through_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ipfs/bafyabc/song.mp3"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"mp3".to_vec())
                    .insert_header("content-type", "audio/mpeg"),
            )
            .mount(&server)
            .await;

        let fetcher = HttpMediaFetcher::with_gateway(&format!("{}/ipfs/", server.uri()));
        let media = fetcher.fetch("ipfs://bafyabc/song.mp3").await.unwrap();
        assert_eq!(media.bytes, b"mp3");
        assert_eq!(media.content_type.as_deref(), Some("audio/mpeg"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_attachment_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpMediaFetcher::new();
        let err = fetcher
            .fetch(&format!("{}/gone.png", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AttachmentFetch { .. }));
    }
}
