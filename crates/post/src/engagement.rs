//! Engagement counters and their reconciliation.
//!
//! The aggregator's counters can under-report relative to the open network:
//! it only counts what it has indexed, while the decentralized index counts
//! distinct endorsing repos directly. Reconciliation takes the larger of the
//! two per counter — whichever side is lagging, the reader sees the better
//! number. Either side being unreachable is non-fatal.

use async_trait::async_trait;
use exn::ResultExt;
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use crate::error::{ErrorKind, Result};
use crate::model::Counts;

/// Endorsement kinds the index is consulted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endorsement {
    Like,
    Repost,
}

impl Endorsement {
    /// The collection endorsing records live in. Doubles as the cache-key
    /// discriminator for per-target counts.
    pub(crate) fn collection(self) -> &'static str {
        match self {
            Endorsement::Like => "app.bsky.feed.like",
            Endorsement::Repost => "app.bsky.feed.repost",
        }
    }
}

/// Engagement lookups for one target post.
///
/// The seam between composition and the two engagement services; tests
/// substitute scripted implementations.
#[async_trait]
pub trait Engagement: Send + Sync {
    /// The aggregator-reported counters for a post.
    async fn counters(&self, uri: &str) -> Result<Counts>;

    /// Distinct endorser count for a target from the decentralized index.
    async fn distinct_endorsers(&self, uri: &str, kind: Endorsement) -> Result<u64>;
}

/// `max(aggregator, index)` — with a missing index reading falling back to
/// the aggregator counter alone.
pub fn reconcile(origin: u64, index: Option<u64>) -> u64 {
    index.map_or(origin, |distinct| origin.max(distinct))
}

#[derive(Debug, Deserialize)]
struct PostsResponse {
    #[serde(default)]
    posts: Vec<PostCounters>,
}

#[derive(Debug, Default, Deserialize)]
struct PostCounters {
    #[serde(rename = "likeCount", default)]
    like_count: u64,
    #[serde(rename = "repostCount", default)]
    repost_count: u64,
    #[serde(rename = "replyCount", default)]
    reply_count: u64,
}

#[derive(Debug, Deserialize)]
struct EndorserPage {
    #[serde(default)]
    linking_dids: Vec<String>,
    #[serde(default)]
    cursor: Option<String>,
}

/// Live engagement lookups: aggregator post views plus the distinct-endorser
/// index, both paginated/bounded the same way as record listings.
#[derive(Debug, Clone)]
pub struct LiveEngagement {
    http: reqwest::Client,
    aggregator: Url,
    index: Url,
    max_pages: u32,
}

impl LiveEngagement {
    pub fn new(http: reqwest::Client, aggregator: Url, index: Url, max_pages: u32) -> Self {
        Self { http, aggregator, index, max_pages }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url, query: &[(&str, &str)]) -> Result<T> {
        self.http
            .get(url)
            .query(query)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .or_raise(|| ErrorKind::Engagement)?
            .json()
            .await
            .or_raise(|| ErrorKind::Engagement)
    }
}

#[async_trait]
impl Engagement for LiveEngagement {
    #[instrument(skip(self))]
    async fn counters(&self, uri: &str) -> Result<Counts> {
        let endpoint = self.aggregator.join("xrpc/app.bsky.feed.getPosts").or_raise(|| ErrorKind::Engagement)?;
        let response: PostsResponse = self.get_json(endpoint, &[("uris", uri)]).await?;
        let counters = response.posts.into_iter().next().unwrap_or_default();
        Ok(Counts {
            likes: counters.like_count,
            reposts: counters.repost_count,
            replies: counters.reply_count,
        })
    }

    /// Drains the index's paginated endorser listing, bounded by the same
    /// page ceiling as record listings. A capped drain under-counts, which
    /// is safe: reconciliation takes the max.
    #[instrument(skip(self))]
    async fn distinct_endorsers(&self, uri: &str, kind: Endorsement) -> Result<u64> {
        let endpoint = self.index.join("links/distinct-dids").or_raise(|| ErrorKind::Engagement)?;
        let mut total: u64 = 0;
        let mut cursor: Option<String> = None;
        for _ in 0..self.max_pages {
            let mut query = vec![("target", uri), ("collection", kind.collection()), ("path", ".subject.uri")];
            if let Some(cursor) = cursor.as_deref() {
                query.push(("cursor", cursor));
            }
            let page: EndorserPage = self.get_json(endpoint.clone(), &query).await?;
            total += page.linking_dids.len() as u64;
            match page.cursor.filter(|c| !c.is_empty()) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::index_ahead(5, Some(8), 8)]
    #[case::index_lagging(10, Some(3), 10)]
    #[case::index_equal(4, Some(4), 4)]
    #[case::index_unreachable(7, None, 7)]
    fn reconciliation_takes_the_max(#[case] origin: u64, #[case] index: Option<u64>, #[case] expected: u64) {
        assert_eq!(reconcile(origin, index), expected);
    }

    #[test]
    fn endorsement_collections() {
        assert_eq!(Endorsement::Like.collection(), "app.bsky.feed.like");
        assert_eq!(Endorsement::Repost.collection(), "app.bsky.feed.repost");
    }

    #[test]
    fn counters_tolerate_missing_fields() {
        let parsed: PostsResponse = serde_json::from_str(r#"{"posts": [{"likeCount": 3}]}"#).unwrap();
        let first = &parsed.posts[0];
        assert_eq!((first.like_count, first.repost_count, first.reply_count), (3, 0, 0));
    }
}
