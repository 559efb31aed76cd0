//! Indexer API collaborator
//!
//! The export pipeline consumes a cursor-paginated indexer through the
//! [`Indexer`] trait. The caller constructs one client and threads it into
//! the [`Exporter`](crate::Exporter); there is no module-scope singleton, so
//! tests can substitute an in-memory implementation.

use crate::error::{Error, Result};
use crate::types::{Character, Link, Linklist, Note};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

/// Default public indexer endpoint
pub const DEFAULT_BASE_URL: &str = "https://indexer.crossbell.io/v1";

/// One page of a cursor-paginated list response
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    /// Records in this page, in API order
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
    /// Continuation cursor; absent or null when the listing is exhausted
    #[serde(default)]
    pub cursor: Option<String>,
    /// Total record count, when the endpoint reports one (notes only)
    #[serde(default)]
    pub count: Option<u64>,
}

/// Cursor-paginated indexer API surface consumed by the export pipeline
#[async_trait]
pub trait Indexer: Send + Sync {
    /// Resolve a handle to its character, or `None` if the handle is unknown
    async fn character_by_handle(&self, handle: &str) -> Result<Option<Character>>;

    /// One page of the character's linklists
    async fn linklists_of_character(
        &self,
        character_id: u64,
        cursor: Option<String>,
        limit: usize,
    ) -> Result<Page<Linklist>>;

    /// One page of the character's links of the given link type
    async fn links_of_character(
        &self,
        character_id: u64,
        link_type: &str,
        cursor: Option<String>,
        limit: usize,
    ) -> Result<Page<Link>>;

    /// One page of the character's notes (response carries a total `count`)
    async fn notes_of_character(
        &self,
        character_id: u64,
        cursor: Option<String>,
        limit: usize,
    ) -> Result<Page<Note>>;
}

/// HTTP implementation of [`Indexer`] backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpIndexer {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpIndexer {
    /// Create a client against the default public indexer
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client against a custom indexer base URL
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| Error::Config {
            message: format!("invalid indexer base URL '{base_url}': {e}"),
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }

    /// Perform one GET against the indexer and deserialize the JSON body.
    ///
    /// `query` pairs with a `None` value are omitted from the request.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, Option<String>)],
    ) -> Result<T> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| Error::Config {
                message: format!("indexer base URL cannot be a base for '{path}'"),
            })?;
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                segments.push(segment);
            }
        }
        for (key, value) in query {
            if let Some(value) = value {
                url.query_pairs_mut().append_pair(key, value);
            }
        }

        tracing::debug!(url = %url, "indexer request");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::UnexpectedStatus {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl Indexer for HttpIndexer {
    async fn character_by_handle(&self, handle: &str) -> Result<Option<Character>> {
        // The indexer answers a literal JSON null for unknown handles; some
        // deployments answer 404 instead. Both mean "no character".
        let path = format!("handles/{handle}/character");
        match self.get_json::<Option<Character>>(&path, &[]).await {
            Ok(character) => Ok(character),
            Err(Error::UnexpectedStatus { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn linklists_of_character(
        &self,
        character_id: u64,
        cursor: Option<String>,
        limit: usize,
    ) -> Result<Page<Linklist>> {
        let path = format!("characters/{character_id}/linklists");
        self.get_json(
            &path,
            &[("limit", Some(limit.to_string())), ("cursor", cursor)],
        )
        .await
    }

    async fn links_of_character(
        &self,
        character_id: u64,
        link_type: &str,
        cursor: Option<String>,
        limit: usize,
    ) -> Result<Page<Link>> {
        let path = format!("characters/{character_id}/links");
        self.get_json(
            &path,
            &[
                ("linkType", Some(link_type.to_string())),
                ("limit", Some(limit.to_string())),
                ("cursor", cursor),
            ],
        )
        .await
    }

    async fn notes_of_character(
        &self,
        character_id: u64,
        cursor: Option<String>,
        limit: usize,
    ) -> Result<Page<Note>> {
        self.get_json(
            "notes",
            &[
                ("characterId", Some(character_id.to_string())),
                ("limit", Some(limit.to_string())),
                ("cursor", cursor),
            ],
        )
        .await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn character_by_handle_resolves() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/handles/alice/character"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "characterId": 12, "handle": "alice"
            })))
            .mount(&server)
            .await;

        let indexer = HttpIndexer::with_base_url(&server.uri()).unwrap();
        let character = indexer.character_by_handle("alice").await.unwrap().unwrap();
        assert_eq!(character.character_id, 12);
        assert_eq!(character.handle, "alice");
    }

    #[tokio::test]
    async fn unknown_handle_is_none_for_null_body_and_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/handles/nobody/character"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::Value::Null))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/handles/missing/character"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let indexer = HttpIndexer::with_base_url(&server.uri()).unwrap();
        assert!(indexer.character_by_handle("nobody").await.unwrap().is_none());
        assert!(indexer.character_by_handle("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cursor_is_forwarded_only_when_present() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/characters/12/linklists"))
            .and(query_param("cursor", "abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "list": [], "cursor": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        let indexer = HttpIndexer::with_base_url(&server.uri()).unwrap();
        let page = indexer
            .linklists_of_character(12, Some("abc".to_string()), 1000)
            .await
            .unwrap();
        assert!(page.list.is_empty());
        assert!(page.cursor.is_none());
    }

    #[tokio::test]
    async fn non_success_status_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notes"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let indexer = HttpIndexer::with_base_url(&server.uri()).unwrap();
        let err = indexer
            .notes_of_character(12, None, 1000)
            .await
            .unwrap_err();
        match err {
            Error::UnexpectedStatus { status, .. } => assert_eq!(status, 500),
            other => panic!("unexpected error: {other}"),
        }
    }
}
