//! The backend seam.
//!
//! Dashboard code is generic over [`Backend`] so handlers can be exercised
//! against an in-memory fake. [`paged`] turns the page-at-a-time query call
//! into a lazy row stream.

use std::collections::VecDeque;
use std::future::Future;

use futures_core::Stream;
use futures_util::stream;
use serde_json::Value;

use crate::BackendResult;

/// A window into a query result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

/// Operations the dashboard needs from the inventory backend.
pub trait Backend: Send + Sync {
    /// Version string reported by the backend, e.g. `"6.9.1"`.
    fn current_version(&self) -> impl Future<Output = BackendResult<String>> + Send;

    /// Names of the environments known to the backend.
    fn environments(&self) -> impl Future<Output = BackendResult<Vec<String>>> + Send;

    /// Run a query and return its rows.
    fn query(
        &self,
        query: &str,
        page: Option<Page>,
    ) -> impl Future<Output = BackendResult<Vec<Value>>> + Send;
}

struct Cursor<B> {
    backend: B,
    query: String,
    page_size: usize,
    offset: usize,
    buffered: VecDeque<Value>,
    exhausted: bool,
}

/// Stream the rows of `query`, fetching `page_size` rows per request.
///
/// The stream ends after the first short page. A failed fetch is yielded
/// once and ends the stream.
pub fn paged<B>(
    backend: B,
    query: impl Into<String>,
    page_size: usize,
) -> impl Stream<Item = BackendResult<Value>> + Send
where
    B: Backend + 'static,
{
    let cursor = Cursor {
        backend,
        query: query.into(),
        page_size: page_size.max(1),
        offset: 0,
        buffered: VecDeque::new(),
        exhausted: false,
    };

    stream::unfold(cursor, |mut c| async move {
        loop {
            if let Some(row) = c.buffered.pop_front() {
                return Some((Ok(row), c));
            }
            if c.exhausted {
                return None;
            }

            let page = Page {
                limit: c.page_size,
                offset: c.offset,
            };
            match c.backend.query(&c.query, Some(page)).await {
                Ok(rows) => {
                    if rows.len() < c.page_size {
                        c.exhausted = true;
                    }
                    c.offset += rows.len();
                    c.buffered.extend(rows);
                }
                Err(e) => {
                    c.exhausted = true;
                    return Some((Err(e), c));
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BackendError;
    use futures_util::StreamExt;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Serves `total` numbered rows and fails once `fail_at` is reached.
    #[derive(Clone)]
    struct Numbers {
        total: usize,
        fail_at: Option<usize>,
        pages: Arc<Mutex<Vec<Page>>>,
    }

    impl Numbers {
        fn new(total: usize) -> Self {
            Self {
                total,
                fail_at: None,
                pages: Arc::default(),
            }
        }
    }

    impl Backend for Numbers {
        async fn current_version(&self) -> BackendResult<String> {
            Ok("7.0.0".to_string())
        }

        async fn environments(&self) -> BackendResult<Vec<String>> {
            Ok(vec![])
        }

        async fn query(&self, _query: &str, page: Option<Page>) -> BackendResult<Vec<Value>> {
            let page = page.unwrap_or(Page {
                limit: self.total,
                offset: 0,
            });
            self.pages.lock().unwrap().push(page);
            if self.fail_at.is_some_and(|at| page.offset >= at) {
                return Err(BackendError::Connection("reset by peer".into()));
            }
            let end = (page.offset + page.limit).min(self.total);
            Ok((page.offset..end).map(|n| json!(n)).collect())
        }
    }

    #[tokio::test]
    async fn paged_yields_every_row_in_order() {
        let backend = Numbers::new(7);
        let rows: Vec<Value> = paged(backend.clone(), "nodes {}", 3)
            .map(|r| r.unwrap())
            .collect()
            .await;

        assert_eq!(rows, (0..7).map(|n| json!(n)).collect::<Vec<_>>());
        let pages = backend.pages.lock().unwrap().clone();
        assert_eq!(
            pages,
            vec![
                Page { limit: 3, offset: 0 },
                Page { limit: 3, offset: 3 },
                Page { limit: 3, offset: 6 },
            ]
        );
    }

    #[tokio::test]
    async fn paged_issues_a_final_empty_fetch_on_exact_multiple() {
        let backend = Numbers::new(4);
        let count = paged(backend.clone(), "nodes {}", 2).count().await;

        assert_eq!(count, 4);
        assert_eq!(backend.pages.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn paged_yields_fetch_error_once_then_ends() {
        let mut backend = Numbers::new(10);
        backend.fail_at = Some(4);
        let items: Vec<_> = paged(backend, "nodes {}", 2).collect().await;

        assert_eq!(items.len(), 5);
        assert!(items[..4].iter().all(|r| r.is_ok()));
        assert!(matches!(items[4], Err(BackendError::Connection(_))));
    }

    #[tokio::test]
    async fn zero_page_size_is_treated_as_one() {
        let rows = paged(Numbers::new(2), "nodes {}", 0).count().await;
        assert_eq!(rows, 2);
    }
}
