//! Ordered source fallback.

use std::future::Future;
use std::sync::Arc;

use tracing::{instrument, warn};

use crate::error::{Error, ErrorKind, Result};
use crate::record::Record;
use crate::source::{RecordSource, SourceHandle};

/// Run `operation` against each source in order until one succeeds.
///
/// The first success wins and no further sources are contacted. Each failure
/// is logged and swallowed; only when *every* source has failed does an
/// error surface, as [`ErrorKind::AllSourcesFailed`] carrying the last
/// source's failure as its cause.
///
/// # Examples
///
/// ```no_run
/// use burrow_client::{RecordSource, SourceHandle, with_fallback};
/// # async fn example(sources: Vec<SourceHandle>) -> burrow_client::error::Result<()> {
/// let record = with_fallback(&sources, |source| async move {
///     source.get("com.example.collection", "self").await
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
#[instrument(skip_all, fields(candidates = sources.len()))]
pub async fn with_fallback<T, F, Fut>(sources: &[SourceHandle], operation: F) -> Result<T>
where
    F: Fn(SourceHandle) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_failure: Option<Error> = None;
    for source in sources {
        match operation(Arc::clone(source)).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(source = source.name(), error = %*err, "source failed, falling back");
                last_failure = Some(err);
            },
        }
    }
    match last_failure {
        Some(err) => Err(err.raise(ErrorKind::AllSourcesFailed)),
        // An empty source list fails the same way a fully-exhausted one does.
        None => Err(Error::from(ErrorKind::AllSourcesFailed)),
    }
}

/// Point-read a record with fallback, mapping "nobody has it" to absent.
///
/// A source answering [`ErrorKind::NotFound`] is an authoritative miss, not
/// a failure: if no source succeeds but at least one reported the record
/// missing, the read resolves to `Ok(None)`. Only when every source failed
/// for other reasons does [`ErrorKind::AllSourcesFailed`] surface, so
/// callers can tell "deleted" apart from "unreachable".
#[instrument(skip(sources), fields(candidates = sources.len()))]
pub async fn read_with_fallback(sources: &[SourceHandle], collection: &str, rkey: &str) -> Result<Option<Record>> {
    let mut last_failure: Option<Error> = None;
    let mut reported_missing = false;
    for source in sources {
        match source.get(collection, rkey).await {
            Ok(record) => return Ok(Some(record)),
            Err(err) if matches!(&*err, ErrorKind::NotFound) => {
                reported_missing = true;
            },
            Err(err) => {
                warn!(source = source.name(), error = %*err, "source failed, falling back");
                last_failure = Some(err);
            },
        }
    }
    match (reported_missing, last_failure) {
        (true, _) | (false, None) => Ok(None),
        (false, Some(err)) => Err(err.raise(ErrorKind::AllSourcesFailed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockSource;

    #[tokio::test]
    async fn first_success_wins_and_stops() {
        let failing = Arc::new(MockSource::named("a").failing());
        let healthy = Arc::new(MockSource::named("b").with_record("c", "self", serde_json::json!({"ok": true})));
        let unreached = Arc::new(MockSource::named("c").with_record("c", "self", serde_json::json!({"ok": false})));
        let sources: Vec<SourceHandle> = vec![failing.clone(), healthy.clone(), unreached.clone()];

        let record = with_fallback(&sources, |source| async move { source.get("c", "self").await }).await.unwrap();
        assert_eq!(record.value["ok"], true);
        assert_eq!(failing.get_calls(), 1);
        assert_eq!(healthy.get_calls(), 1);
        // Nothing past the first success is invoked.
        assert_eq!(unreached.get_calls(), 0);
    }

    #[tokio::test]
    async fn all_failures_surface_the_last_error() {
        let sources: Vec<SourceHandle> = vec![
            Arc::new(MockSource::named("a").failing()),
            Arc::new(MockSource::named("b").failing_with(ErrorKind::Status(502))),
        ];

        let err = with_fallback(&sources, |source| async move { source.get("c", "self").await }).await.unwrap_err();
        // The terminal kind, raised from the last source's failure.
        assert!(matches!(&*err, ErrorKind::AllSourcesFailed));
    }

    #[tokio::test]
    async fn empty_source_list_fails_terminally() {
        let err = with_fallback(&[], |source| async move { source.get("c", "self").await }).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::AllSourcesFailed));
    }

    #[tokio::test]
    async fn read_falls_through_a_missing_source() {
        let sources: Vec<SourceHandle> = vec![
            Arc::new(MockSource::named("aggregator")),
            Arc::new(MockSource::named("origin").with_record("c", "self", serde_json::json!({"n": 1}))),
        ];
        let record = read_with_fallback(&sources, "c", "self").await.unwrap().unwrap();
        assert_eq!(record.value["n"], 1);
    }

    #[tokio::test]
    async fn read_maps_unanimous_missing_to_absent() {
        let sources: Vec<SourceHandle> =
            vec![Arc::new(MockSource::named("aggregator")), Arc::new(MockSource::named("origin"))];
        assert!(read_with_fallback(&sources, "c", "self").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn read_missing_beats_unreachable() {
        // One source is down, the other says the record doesn't exist:
        // absent, not an error.
        let sources: Vec<SourceHandle> =
            vec![Arc::new(MockSource::named("aggregator").failing()), Arc::new(MockSource::named("origin"))];
        assert!(read_with_fallback(&sources, "c", "self").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn read_surfaces_terminal_failure_when_nobody_answered() {
        let sources: Vec<SourceHandle> = vec![
            Arc::new(MockSource::named("aggregator").failing()),
            Arc::new(MockSource::named("origin").failing_with(ErrorKind::Status(503))),
        ];
        let err = read_with_fallback(&sources, "c", "self").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::AllSourcesFailed));
    }
}
