//! Multi-schema blog aggregation.
//!
//! Three unrelated publishing schemas live in the owner's repo; this crate
//! merges them into one newest-first, deduplicated feed of [`BlogPost`]s
//! with resolved canonical URLs. Schemas fail independently: the feed is the
//! union of whichever sources answered, never blanked by one broken
//! collection.

pub mod error;
mod model;
mod schema;

use std::collections::HashSet;
use std::sync::Arc;

use burrow_cache::{Cache, Category};
use burrow_client::{FetchOrder, Listing, SourceHandle, SourceProvider, fetch_all};
use burrow_identity::{Identity, Resolver};
use tracing::{instrument, warn};

use crate::error::{ErrorKind, Result};
pub use crate::model::{BlogPost, Platform, Publication};

const FEED_KEY: &str = "blog";

/// Aggregates the owner's blog-like collections into one feed.
///
/// Custom collections are not mirrored by the public aggregator, so every
/// listing here runs origin-first.
pub struct Aggregator {
    owner: String,
    provider: Arc<dyn SourceProvider>,
    resolver: Arc<Resolver>,
    cache: Arc<Cache>,
    page_size: u32,
    max_pages: u32,
}

impl Aggregator {
    pub fn new(
        owner: impl Into<String>,
        provider: Arc<dyn SourceProvider>,
        resolver: Arc<Resolver>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            owner: owner.into(),
            provider,
            resolver,
            cache,
            page_size: 100,
            max_pages: 20,
        }
    }

    /// Change the listing bounds.
    pub fn with_paging(mut self, page_size: u32, max_pages: u32) -> Self {
        self.page_size = page_size;
        self.max_pages = max_pages;
        self
    }

    /// The aggregated feed, newest first, deduplicated by canonical URL.
    #[instrument(skip(self))]
    pub async fn list_posts(&self) -> Result<Vec<BlogPost>> {
        if let Some(posts) = self.cache.get::<Vec<BlogPost>>(Category::Feed, FEED_KEY) {
            return Ok(posts);
        }
        let identity = self.resolver.resolve(&self.owner).await.map_err(ErrorKind::identity)?;
        let sources = self.provider.sources(&identity, FetchOrder::OriginFirst);

        // Independent schemas, fanned out together; a failing branch only
        // costs its own schema.
        let (whtwnd, leaflet, standard) = tokio::join!(
            self.whtwnd(&sources, &identity),
            self.leaflet(&sources, &identity),
            self.standard(&sources, &identity),
        );

        let mut posts: Vec<BlogPost> = Vec::new();
        posts.extend(whtwnd);
        posts.extend(leaflet);
        posts.extend(standard);
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        // Cross-posted documents collapse onto their first (newest) sighting.
        let mut seen = HashSet::new();
        posts.retain(|post| seen.insert(post.url.clone()));

        self.cache.set(Category::Feed, FEED_KEY, posts.clone());
        Ok(posts)
    }

    async fn whtwnd(&self, sources: &[SourceHandle], identity: &Identity) -> Vec<BlogPost> {
        let entries = self.listing(sources, schema::whtwnd::COLLECTION).await;
        schema::whtwnd::normalize(&identity.did, &entries.records)
    }

    async fn leaflet(&self, sources: &[SourceHandle], identity: &Identity) -> Vec<BlogPost> {
        let (documents, publications) = tokio::join!(
            self.listing(sources, schema::leaflet::DOCUMENT),
            self.listing(sources, schema::leaflet::PUBLICATION),
        );
        let lookup = schema::leaflet::publications(&publications.records);
        schema::leaflet::normalize(&identity.did, &documents.records, &lookup)
    }

    async fn standard(&self, sources: &[SourceHandle], identity: &Identity) -> Vec<BlogPost> {
        let (documents, publications) = tokio::join!(
            self.listing(sources, schema::standard::DOCUMENT),
            self.listing(sources, schema::standard::PUBLICATION),
        );
        let lookup = schema::standard::publications(&publications.records);
        schema::standard::normalize(&identity.did, &documents.records, &lookup)
    }

    /// Drain one collection from the first source that manages a complete
    /// listing, keeping the largest partial otherwise.
    async fn listing(&self, sources: &[SourceHandle], collection: &str) -> Listing {
        let mut best = Listing::default();
        for source in sources {
            let listing = fetch_all(source.as_ref(), collection, self.page_size, self.max_pages).await;
            if listing.complete {
                return listing;
            }
            if listing.records.len() > best.records.len() {
                best = listing;
            }
        }
        warn!(collection, records = best.records.len(), "no complete listing from any source, serving the best partial");
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use burrow_client::error::ErrorKind as ClientErrorKind;
    use burrow_client::{MockProvider, MockSource};
    use burrow_identity::directory::Directory;
    use serde_json::json;
    use url::Url;

    const OWNER: &str = "did:plc:owner";

    #[derive(Clone)]
    struct FixedDirectory(Url);

    #[async_trait]
    impl Directory for FixedDirectory {
        async fn lookup(&self, id: &str) -> burrow_identity::error::Result<Identity> {
            Ok(Identity { did: id.to_string(), pds: self.0.clone() })
        }
    }

    fn aggregator(source: MockSource) -> Aggregator {
        let directory = FixedDirectory(Url::parse("https://pds.example.com").unwrap());
        Aggregator::new(
            OWNER,
            Arc::new(MockProvider::single(Arc::new(source))),
            Arc::new(Resolver::new(directory)),
            Arc::new(Cache::new()),
        )
    }

    fn owner_source() -> MockSource {
        MockSource::named("origin").with_repo(OWNER)
    }

    #[tokio::test]
    async fn merges_all_three_schemas_newest_first() {
        let source = owner_source()
            .with_page(
                schema::whtwnd::COLLECTION,
                vec![("w1", json!({"title": "Entry", "createdAt": "2024-02-01T00:00:00Z"}))],
                None,
            )
            .with_page(
                schema::leaflet::DOCUMENT,
                vec![("l1", json!({"title": "Doc", "publishedAt": "2024-03-01T00:00:00Z"}))],
                None,
            )
            .with_page(
                schema::standard::DOCUMENT,
                vec![("s1", json!({"title": "Page", "createdAt": "2024-01-01T00:00:00Z"}))],
                None,
            );

        let posts = aggregator(source).list_posts().await.unwrap();
        let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["Doc", "Entry", "Page"]);
        assert_eq!(posts[0].platform, Platform::Leaflet);
    }

    #[tokio::test]
    async fn draft_records_never_reach_the_feed() {
        let source = owner_source()
            .with_page(
                schema::whtwnd::COLLECTION,
                vec![
                    ("w1", json!({"title": "Public", "createdAt": "2024-02-01T00:00:00Z"})),
                    ("w2", json!({"title": "Hidden", "visibility": "author"})),
                ],
                None,
            )
            .with_page(schema::standard::DOCUMENT, vec![("s1", json!({"title": "WIP", "draft": true}))], None);

        let posts = aggregator(source).list_posts().await.unwrap();
        let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["Public"]);
    }

    #[tokio::test]
    async fn one_broken_schema_does_not_blank_the_feed() {
        let source = owner_source()
            .with_page_error(schema::whtwnd::COLLECTION, ClientErrorKind::Status(500))
            .with_page(
                schema::leaflet::DOCUMENT,
                vec![("l1", json!({"title": "Still here", "publishedAt": "2024-03-01T00:00:00Z"}))],
                None,
            );

        let posts = aggregator(source).list_posts().await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Still here");
    }

    #[tokio::test]
    async fn publication_references_resolve_across_the_lookup_map() {
        let source = owner_source()
            .with_page(
                schema::leaflet::PUBLICATION,
                vec![("pub1", json!({"name": "Field Notes", "base_path": "notes.example.com"}))],
                None,
            )
            .with_page(
                schema::leaflet::DOCUMENT,
                vec![(
                    "l1",
                    json!({
                        "title": "Linked",
                        "publishedAt": "2024-03-01T00:00:00Z",
                        "publication": format!("at://{OWNER}/{}/pub1", schema::leaflet::PUBLICATION)
                    }),
                )],
                None,
            );

        let posts = aggregator(source).list_posts().await.unwrap();
        assert_eq!(posts[0].url, "https://notes.example.com/l1");
        assert_eq!(posts[0].publication.as_deref(), Some("Field Notes"));
    }

    #[tokio::test]
    async fn duplicate_canonical_urls_collapse() {
        // The same document visible through two schemas with one URL.
        let source = owner_source()
            .with_page(
                schema::leaflet::DOCUMENT,
                vec![("same", json!({"title": "Newer copy", "publishedAt": "2024-03-01T00:00:00Z"}))],
                Some("c1"),
            )
            .with_page(
                schema::leaflet::DOCUMENT,
                vec![("same", json!({"title": "Older copy", "publishedAt": "2024-01-01T00:00:00Z"}))],
                None,
            );

        // Two pages of the same collection produce two records with the same
        // rkey, hence the same canonical URL.
        let posts = aggregator(source).list_posts().await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Newer copy");
    }

    #[tokio::test]
    async fn the_feed_is_cached() {
        let mock = owner_source().with_page(
            schema::whtwnd::COLLECTION,
            vec![("w1", json!({"title": "Entry", "createdAt": "2024-02-01T00:00:00Z"}))],
            None,
        );
        let directory = FixedDirectory(Url::parse("https://pds.example.com").unwrap());
        let mock = Arc::new(mock);
        let aggregator = Aggregator::new(
            OWNER,
            Arc::new(MockProvider::single(mock.clone())),
            Arc::new(Resolver::new(directory)),
            Arc::new(Cache::new()),
        );

        aggregator.list_posts().await.unwrap();
        let listed = mock.list_calls();
        let posts = aggregator.list_posts().await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(mock.list_calls(), listed);
    }
}
