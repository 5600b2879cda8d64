//! Guards for lazily consumed backend results.
//!
//! Once a streaming response has started, an error can no longer change
//! its status. Connection failures, empty responses and HTTP errors from
//! the source are therefore treated as the end of the sequence. Only
//! unclassified errors are passed on, once, after which the guard ends.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use invboard_client::{BackendError, BackendResult};

/// Iterator adapter returned by [`yield_or_stop`].
pub struct YieldOrStop<I> {
    inner: I,
    done: bool,
}

/// Wrap `source` so known backend errors end iteration cleanly.
pub fn yield_or_stop<I, T>(source: I) -> YieldOrStop<I::IntoIter>
where
    I: IntoIterator<Item = BackendResult<T>>,
{
    YieldOrStop {
        inner: source.into_iter(),
        done: false,
    }
}

/// Decide what a guard emits for one source item, marking it done when
/// the sequence must end.
fn guard<T>(done: &mut bool, item: Option<BackendResult<T>>) -> Option<BackendResult<T>> {
    match item {
        Some(Ok(value)) => Some(Ok(value)),
        Some(Err(e)) => {
            *done = true;
            if e.ends_stream() { None } else { Some(Err(e)) }
        }
        None => {
            *done = true;
            None
        }
    }
}

impl<I, T> Iterator for YieldOrStop<I>
where
    I: Iterator<Item = BackendResult<T>>,
{
    type Item = Result<T, BackendError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.inner.next();
        guard(&mut self.done, item)
    }
}

impl<I, T> std::iter::FusedIterator for YieldOrStop<I> where I: Iterator<Item = BackendResult<T>> {}

/// Stream adapter returned by [`yield_or_stop_stream`].
pub struct YieldOrStopStream<S> {
    inner: S,
    done: bool,
}

/// Stream counterpart of [`yield_or_stop`].
///
/// Requires `Unpin`; pin the source with `Box::pin` if necessary.
pub fn yield_or_stop_stream<S, T>(source: S) -> YieldOrStopStream<S>
where
    S: Stream<Item = BackendResult<T>> + Unpin,
{
    YieldOrStopStream {
        inner: source,
        done: false,
    }
}

impl<S, T> Stream for YieldOrStopStream<S>
where
    S: Stream<Item = BackendResult<T>> + Unpin,
{
    type Item = Result<T, BackendError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(item) => Poll::Ready(guard(&mut this.done, item)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use futures_util::StreamExt;

    fn then_fail(err: BackendError) -> Vec<BackendResult<i32>> {
        vec![Ok(1), Ok(2), Ok(3), Err(err), Ok(4)]
    }

    fn collect_ok<I: Iterator<Item = BackendResult<i32>>>(iter: I) -> Vec<i32> {
        iter.map(|r| r.unwrap()).collect()
    }

    #[test]
    fn connection_error_ends_iteration_cleanly() {
        let values = collect_ok(yield_or_stop(then_fail(BackendError::Connection("reset".into()))));
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn empty_response_and_http_errors_end_iteration_cleanly() {
        let values = collect_ok(yield_or_stop(then_fail(BackendError::EmptyResponse("".into()))));
        assert_eq!(values, vec![1, 2, 3]);

        let http = BackendError::Http {
            status: StatusCode::SERVICE_UNAVAILABLE,
            url: "http://pdb".into(),
        };
        assert_eq!(collect_ok(yield_or_stop(then_fail(http))), vec![1, 2, 3]);
    }

    #[test]
    fn exhaustion_yields_everything() {
        let source: Vec<BackendResult<i32>> = (1..=5).map(Ok).collect();
        assert_eq!(collect_ok(yield_or_stop(source)), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn unclassified_error_surfaces_once_then_ends() {
        let mut guarded = yield_or_stop(then_fail(BackendError::Other("boom".into())));
        assert_eq!(guarded.next().unwrap().unwrap(), 1);
        assert_eq!(guarded.next().unwrap().unwrap(), 2);
        assert_eq!(guarded.next().unwrap().unwrap(), 3);
        assert!(matches!(guarded.next(), Some(Err(BackendError::Other(_)))));
        assert!(guarded.next().is_none());
        assert!(guarded.next().is_none());
    }

    #[test]
    fn guard_is_lazy() {
        let mut pulled = 0;
        let source = std::iter::from_fn(|| {
            pulled += 1;
            Some(Ok::<_, BackendError>(pulled))
        });
        let first: Vec<i32> = yield_or_stop(source).take(2).map(|r| r.unwrap()).collect();
        assert_eq!(first, vec![1, 2]);
        assert_eq!(pulled, 2);
    }

    #[tokio::test]
    async fn stream_guard_stops_on_connection_error() {
        let source = futures_util::stream::iter(then_fail(BackendError::Connection("reset".into())));
        let values: Vec<i32> = yield_or_stop_stream(source)
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn stream_guard_passes_unclassified_error() {
        let source = futures_util::stream::iter(then_fail(BackendError::Other("bad row".into())));
        let items: Vec<_> = yield_or_stop_stream(source).collect().await;
        assert_eq!(items.len(), 4);
        assert!(items[3].is_err());
    }
}
