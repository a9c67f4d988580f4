//! Cursor-pagination draining with a hard page ceiling.

use async_stream::stream;
use futures::pin_mut;
use futures::stream::{Stream, StreamExt};
use tracing::{instrument, warn};

use crate::error::Result;
use crate::record::{Page, Record};
use crate::source::RecordSource;

/// A drained listing plus how the drain ended.
///
/// `complete` distinguishes "truly everything" from "gave up early" (page
/// failure or page ceiling), so downstream feeds can tell an empty
/// collection apart from a failed fetch instead of conflating the two.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub records: Vec<Record>,
    pub complete: bool,
}

/// Lazily stream a collection's pages, one request per yielded item.
///
/// The stream follows the source's opaque cursor until the source stops
/// supplying one, or ends after yielding the first failed page. It applies
/// no page ceiling of its own — that is [`fetch_all`]'s job; dropping the
/// stream stops further requests.
pub fn page_stream<'a>(
    source: &'a dyn RecordSource,
    collection: &'a str,
    page_size: u32,
) -> impl Stream<Item = Result<Page>> + 'a {
    stream! {
        let mut cursor: Option<String> = None;
        loop {
            match source.list(collection, page_size, cursor.as_deref()).await {
                Ok(page) => {
                    let next = page.next_cursor().map(str::to_string);
                    yield Ok(page);
                    match next {
                        Some(next) => cursor = Some(next),
                        None => break,
                    }
                },
                Err(err) => {
                    yield Err(err);
                    break;
                },
            }
        }
    }
}

/// Drain a cursor-paginated listing into one ordered collection.
///
/// Stops at cursor exhaustion or after `max_pages` pages, whichever comes
/// first — the ceiling guarantees termination against a misbehaving or
/// infinite paginator. A page failure does not fail the whole operation:
/// whatever was accumulated so far is returned with `complete` unset,
/// because a partial feed beats no feed everywhere this is consumed.
#[instrument(skip(source), fields(source = source.name()))]
pub async fn fetch_all(source: &dyn RecordSource, collection: &str, page_size: u32, max_pages: u32) -> Listing {
    let mut records: Vec<Record> = Vec::new();
    let mut pages: u32 = 0;
    let pager = page_stream(source, collection, page_size);
    pin_mut!(pager);
    while let Some(result) = pager.next().await {
        match result {
            Ok(page) => {
                let exhausted = page.next_cursor().is_none();
                records.extend(page.records);
                pages += 1;
                if exhausted {
                    return Listing { records, complete: true };
                }
                if pages >= max_pages {
                    warn!(collection, pages, "page ceiling reached, returning partial listing");
                    return Listing { records, complete: false };
                }
            },
            Err(err) => {
                warn!(collection, error = %*err, fetched = records.len(), "page request failed, returning partial listing");
                return Listing { records, complete: false };
            },
        }
    }
    // Unreachable in practice: the stream only ends after an exhausted or
    // failed page, both handled above.
    Listing { records, complete: true }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::source::MockSource;
    use serde_json::json;

    #[tokio::test]
    async fn concatenates_pages_in_order() {
        let source = MockSource::named("origin")
            .with_page("posts", vec![("a", json!({"n": 1})), ("b", json!({"n": 2}))], Some("c1"))
            .with_page("posts", vec![("c", json!({"n": 3}))], None);

        let listing = fetch_all(&source, "posts", 50, 10).await;
        assert!(listing.complete);
        let keys: Vec<_> = listing.records.iter().filter_map(Record::rkey).collect();
        assert_eq!(keys, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn terminates_at_page_ceiling_against_infinite_cursor() {
        let source = MockSource::named("origin").with_endless_pages("posts", 2);

        let listing = fetch_all(&source, "posts", 50, 5).await;
        assert!(!listing.complete);
        assert_eq!(listing.records.len(), 10);
        assert_eq!(source.list_calls(), 5);
    }

    #[tokio::test]
    async fn page_failure_returns_partial_accumulation() {
        let source = MockSource::named("origin")
            .with_page("posts", vec![("a", json!({}))], Some("c1"))
            .with_page_error("posts", ErrorKind::Status(502));

        let listing = fetch_all(&source, "posts", 50, 10).await;
        assert!(!listing.complete);
        assert_eq!(listing.records.len(), 1);
    }

    #[tokio::test]
    async fn empty_collection_is_complete_not_failed() {
        let source = MockSource::named("origin");

        let listing = fetch_all(&source, "posts", 50, 10).await;
        assert!(listing.complete);
        assert!(listing.records.is_empty());
    }

    #[tokio::test]
    async fn does_not_assume_page_size_is_honored() {
        // Source hands back 3 records per page despite limit=2.
        let source = MockSource::named("origin")
            .with_page("posts", vec![("a", json!({})), ("b", json!({})), ("c", json!({}))], Some("c1"))
            .with_page("posts", vec![("d", json!({}))], None);

        let listing = fetch_all(&source, "posts", 2, 10).await;
        assert!(listing.complete);
        assert_eq!(listing.records.len(), 4);
    }
}
