//! Cursor-based pagination driver
//!
//! Repeatedly calls a page-fetch operation until the returned cursor is
//! absent or empty, concatenating pages in arrival order. The upstream
//! contract makes cursor exhaustion the sole termination signal; a defensive
//! page bound turns a never-exhausting collaborator into a fatal error
//! instead of an infinite loop.

use crate::error::{Error, Result};
use crate::indexer::Page;
use std::future::Future;

/// Maximum pages fetched per entity before the collaborator is considered
/// misbehaving. At the default page size of 1000 this allows ten million
/// records per entity.
pub const MAX_PAGES: usize = 10_000;

/// Fetch every page of a cursor-paginated listing.
///
/// `fetch_page` receives the cursor from the prior page (`None` on the first
/// call) and pages are requested strictly sequentially. Returns the ordered
/// concatenation of all page lists.
pub async fn collect_all<T, F, Fut>(entity: &str, fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    collect_all_with(entity, fetch_page, |_, _| {}).await
}

/// Like [`collect_all`], invoking `on_page` after each page with the number
/// of records fetched so far and the endpoint's reported total (when it
/// reports one). Used to weight notes-fetch progress by `fetched/total`.
pub async fn collect_all_with<T, F, Fut, O>(
    entity: &str,
    mut fetch_page: F,
    mut on_page: O,
) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
    O: FnMut(usize, Option<u64>),
{
    let mut all = Vec::new();
    let mut cursor: Option<String> = None;

    for page_index in 0..MAX_PAGES {
        let page = fetch_page(cursor.take()).await?;
        all.extend(page.list);
        on_page(all.len(), page.count);

        match page.cursor {
            Some(next) if !next.is_empty() => cursor = Some(next),
            _ => {
                tracing::debug!(
                    entity,
                    pages = page_index + 1,
                    records = all.len(),
                    "pagination exhausted"
                );
                return Ok(all);
            }
        }
    }

    Err(Error::PaginationOverflow {
        entity: entity.to_string(),
        max_pages: MAX_PAGES,
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn page(list: Vec<u32>, cursor: Option<&str>, count: Option<u64>) -> Page<u32> {
        Page {
            list,
            cursor: cursor.map(str::to_string),
            count,
        }
    }

    #[tokio::test]
    async fn fetches_exactly_n_pages_and_preserves_order() {
        let calls = Cell::new(0usize);
        let pages = vec![
            page(vec![1, 2], Some("c1"), None),
            page(vec![3], Some("c2"), None),
            page(vec![4, 5], None, None),
        ];

        let all = collect_all("numbers", |cursor| {
            let i = calls.get();
            calls.set(i + 1);
            // The cursor handed back must be the one from the prior page
            match i {
                0 => assert!(cursor.is_none()),
                1 => assert_eq!(cursor.as_deref(), Some("c1")),
                2 => assert_eq!(cursor.as_deref(), Some("c2")),
                _ => panic!("fetched past exhaustion"),
            }
            let page = pages[i].clone();
            async move { Ok(page) }
        })
        .await
        .unwrap();

        assert_eq!(calls.get(), 3);
        assert_eq!(all, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn empty_cursor_string_terminates() {
        let calls = Cell::new(0usize);
        let all = collect_all("numbers", |_| {
            calls.set(calls.get() + 1);
            async { Ok(page(vec![9], Some(""), None)) }
        })
        .await
        .unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(all, vec![9]);
    }

    #[tokio::test]
    async fn observer_sees_running_total_and_count() {
        let pages = vec![
            page(vec![1, 2], Some("c1"), Some(3)),
            page(vec![3], None, Some(3)),
        ];
        let calls = Cell::new(0usize);
        let mut observed = Vec::new();

        collect_all_with(
            "numbers",
            |_| {
                let i = calls.get();
                calls.set(i + 1);
                let page = pages[i].clone();
                async move { Ok(page) }
            },
            |fetched, total| observed.push((fetched, total)),
        )
        .await
        .unwrap();

        assert_eq!(observed, vec![(2, Some(3)), (3, Some(3))]);
    }

    #[tokio::test]
    async fn never_exhausting_cursor_is_fatal() {
        let calls = Cell::new(0usize);
        let err = collect_all("numbers", |_| {
            calls.set(calls.get() + 1);
            async { Ok(page(vec![], Some("again"), None)) }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.get(), MAX_PAGES);
        match err {
            Error::PaginationOverflow { entity, max_pages } => {
                assert_eq!(entity, "numbers");
                assert_eq!(max_pages, MAX_PAGES);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn fetch_failure_propagates() {
        let err = collect_all::<u32, _, _>("numbers", |_| async {
            Err(Error::UnexpectedStatus {
                endpoint: "notes".to_string(),
                status: 502,
            })
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::UnexpectedStatus { status: 502, .. }));
    }
}
