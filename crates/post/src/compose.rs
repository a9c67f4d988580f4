//! Recursive post composition.

use std::sync::Arc;

use burrow_cache::{Cache, Category};
use burrow_client::{FetchOrder, Record, RecordSource, SourceProvider, read_with_fallback, with_fallback};
use burrow_identity::{Identity, Resolver};
use exn::ResultExt;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::engagement::{Endorsement, Engagement, reconcile};
use crate::error::{ErrorKind, Result};
use crate::model::{Author, Counts, Post, created_at};

/// Maximum nesting below a top-level post. A quote (or reply ancestor) at
/// nesting level `MAX_DEPTH` still hydrates; anything deeper resolves to
/// absent.
pub const MAX_DEPTH: u8 = 3;

/// The collection status posts live in.
pub const POST_COLLECTION: &str = "app.bsky.feed.post";

/// Resolves post URIs into fully-hydrated [`Post`] trees.
///
/// Quoted posts and reply ancestors hydrate recursively up to [`MAX_DEPTH`];
/// the independent branches of one post run concurrently. Nested failures
/// degrade to an empty branch — only the top-level post's own fetch can fail
/// the composition.
pub struct Composer {
    owner: String,
    provider: Arc<dyn SourceProvider>,
    resolver: Arc<Resolver>,
    cache: Arc<Cache>,
    engagement: Arc<dyn Engagement>,
    media_limit: usize,
    page_size: u32,
}

impl Composer {
    pub fn new(
        owner: impl Into<String>,
        provider: Arc<dyn SourceProvider>,
        resolver: Arc<Resolver>,
        cache: Arc<Cache>,
        engagement: Arc<dyn Engagement>,
    ) -> Self {
        Self {
            owner: owner.into(),
            provider,
            resolver,
            cache,
            engagement,
            media_limit: burrow_embed::DEFAULT_MEDIA_LIMIT,
            page_size: 100,
        }
    }

    /// Change the per-post media ceiling.
    pub fn with_media_limit(mut self, limit: usize) -> Self {
        self.media_limit = limit;
        self
    }

    /// Change the page size used for listing the owner's posts.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Resolve a post URI into a composed post.
    ///
    /// `Ok(None)` is a defined terminal state, not an error: the nesting cap
    /// was hit, or no source has the record. Top-level compositions are
    /// served from and written to the cache; nested ones ride on their
    /// parent's entry.
    pub fn resolve<'a>(&'a self, uri: &'a str, depth: u8) -> BoxFuture<'a, Result<Option<Post>>> {
        Box::pin(async move {
            if depth > MAX_DEPTH {
                debug!(uri, depth, "nesting cap reached");
                return Ok(None);
            }
            if depth == 0
                && let Some(post) = self.cache.get::<Post>(Category::Status, uri)
            {
                return Ok(Some(post));
            }
            let parsed: burrow_client::AtUri =
                uri.parse::<burrow_client::AtUri>().or_raise(|| ErrorKind::InvalidUri(uri.to_string()))?;
            let identity =
                self.resolver.resolve(&parsed.did).await.map_err(ErrorKind::identity)?;
            let sources = self.provider.sources(&identity, FetchOrder::AggregatorFirst);
            let Some(record) = read_with_fallback(&sources, &parsed.collection, &parsed.rkey)
                .await
                .map_err(ErrorKind::fetch)?
            else {
                return Ok(None);
            };
            let post = self.compose(uri, &record.value, &identity, depth).await;
            if depth == 0 {
                self.cache.set(Category::Status, uri, post.clone());
            }
            Ok(Some(post))
        })
    }

    /// Compose a post from an already-fetched record value.
    async fn compose(&self, uri: &str, value: &Value, identity: &Identity, depth: u8) -> Post {
        let counts = self.reconciled_counts(uri).await;

        let quoted_uri = burrow_embed::quoted_uri(value);
        let (parent_uri, mut root_uri) = reply_refs(value);
        // A root equal to the parent adds nothing; one hydration is enough.
        if root_uri == parent_uri {
            root_uri = None;
        }
        let (quoted, reply_parent, reply_root) = tokio::join!(
            self.branch(quoted_uri, depth),
            self.branch(parent_uri, depth),
            self.branch(root_uri, depth),
        );

        Post {
            uri: uri.to_string(),
            text: value.get("text").and_then(Value::as_str).unwrap_or_default().to_string(),
            created_at: created_at(value),
            author: Author::from_value(identity.did.clone(), value),
            counts,
            media: burrow_embed::extract_media(value, identity, self.media_limit),
            external: burrow_embed::external_link(value, identity),
            quoted: quoted.map(Box::new),
            reply_parent: reply_parent.map(Box::new),
            reply_root: reply_root.map(Box::new),
        }
    }

    /// Hydrate one nested branch, degrading every failure to absence.
    async fn branch(&self, uri: Option<String>, depth: u8) -> Option<Post> {
        let uri = uri?;
        match self.resolve(&uri, depth + 1).await {
            Ok(post) => post,
            Err(err) => {
                warn!(uri = %uri, error = %*err, "nested post failed to hydrate, leaving the branch empty");
                None
            },
        }
    }

    /// Aggregator counters reconciled upward against the distinct index.
    ///
    /// Both lookups are best-effort: a dead aggregator yields zeros for the
    /// index to beat, a dead index leaves the aggregator counters standing.
    #[instrument(skip(self))]
    async fn reconciled_counts(&self, uri: &str) -> Counts {
        let origin = match self.engagement.counters(uri).await {
            Ok(counts) => counts,
            Err(err) => {
                warn!(uri, error = %*err, "counter lookup failed, starting from zero");
                Counts::default()
            },
        };
        let (likes, reposts) = tokio::join!(
            self.distinct(uri, Endorsement::Like),
            self.distinct(uri, Endorsement::Repost),
        );
        Counts {
            likes: reconcile(origin.likes, likes),
            reposts: reconcile(origin.reposts, reposts),
            replies: origin.replies,
        }
    }

    async fn distinct(&self, uri: &str, kind: Endorsement) -> Option<u64> {
        let key = format!("{}:{uri}", kind.collection());
        if let Some(count) = self.cache.get::<u64>(Category::Engagement, &key) {
            return Some(count);
        }
        match self.engagement.distinct_endorsers(uri, kind).await {
            Ok(count) => {
                self.cache.set(Category::Engagement, key, count);
                Some(count)
            },
            Err(err) => {
                warn!(uri, ?kind, error = %*err, "index unreachable, keeping origin counter");
                None
            },
        }
    }

    /// The owner's newest standalone posts, composed.
    ///
    /// One page of the newest-first listing is plenty for a status feed;
    /// replies are skipped because they read as non-sequiturs outside their
    /// thread.
    #[instrument(skip(self))]
    pub async fn recent_posts(&self, limit: usize) -> Result<Vec<Post>> {
        let cache_key = format!("recent:{limit}");
        if let Some(posts) = self.cache.get::<Vec<Post>>(Category::Status, &cache_key) {
            return Ok(posts);
        }
        let identity = self.resolver.resolve(&self.owner).await.map_err(ErrorKind::identity)?;
        let sources = self.provider.sources(&identity, FetchOrder::AggregatorFirst);
        let page_size = self.page_size;
        let page = with_fallback(&sources, |source| async move {
            source.list(POST_COLLECTION, page_size, None).await
        })
        .await
        .map_err(ErrorKind::fetch)?;

        let standalone = page.records.iter().filter(|record| record.value.get("reply").is_none()).take(limit);
        let posts: Vec<Post> =
            futures::future::join_all(standalone.map(|record| self.compose_listed(record, &identity))).await;
        self.cache.set(Category::Status, cache_key, posts.clone());
        Ok(posts)
    }

    /// The single newest standalone post, if any.
    pub async fn latest(&self) -> Result<Option<Post>> {
        Ok(self.recent_posts(1).await?.into_iter().next())
    }

    /// Compose a listed record without re-fetching it, warming the per-post
    /// cache entry on the way.
    async fn compose_listed(&self, record: &Record, identity: &Identity) -> Post {
        if let Some(post) = self.cache.get::<Post>(Category::Status, &record.uri) {
            return post;
        }
        let post = self.compose(&record.uri, &record.value, identity, 0).await;
        self.cache.set(Category::Status, record.uri.clone(), post.clone());
        post
    }
}

/// The reply references on a record, as `(parent, root)` URIs.
fn reply_refs(value: &Value) -> (Option<String>, Option<String>) {
    let at = |which: &str| {
        value
            .get("reply")
            .and_then(|reply| reply.get(which))
            .and_then(|link| link.get("uri"))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    (at("parent"), at("root"))
}
