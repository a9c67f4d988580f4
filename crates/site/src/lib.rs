//! Per-process wiring for the site's read layer.
//!
//! [`Site`] is the one context object the rest of the process passes around:
//! configuration, the shared HTTP client, the identity resolver, the cache,
//! and the composed data services built on top of them. No globals; every
//! component receives what it needs at construction, which keeps test
//! doubles clean.

pub mod error;
mod profile;

use std::sync::Arc;
use std::time::Duration;

use burrow_blog::{Aggregator, BlogPost};
use burrow_cache::{Cache, Category};
use burrow_client::{FetchOrder, Network, SourceProvider, read_with_fallback};
use burrow_config::Config;
use burrow_identity::{Identity, PlcDirectory, Resolver};
use burrow_post::{Composer, Engagement, LiveEngagement, Post};
use exn::ResultExt;
use tracing::{instrument, warn};

use crate::error::{ErrorKind, Result};
pub use crate::profile::Profile;

const PROFILE_COLLECTION: &str = "app.bsky.actor.profile";
const PROFILE_RKEY: &str = "self";

/// Everything the landing page needs, each branch independently best-effort.
#[derive(Debug, Clone, Default)]
pub struct FrontPage {
    pub profile: Option<Profile>,
    pub latest: Option<Post>,
    pub blog: Vec<BlogPost>,
}

/// The per-process context object.
pub struct Site {
    config: Config,
    provider: Arc<dyn SourceProvider>,
    resolver: Arc<Resolver>,
    cache: Arc<Cache>,
    composer: Composer,
    blog: Aggregator,
}

impl Site {
    /// Assemble the live site context from configuration.
    ///
    /// One HTTP client is built here and shared by every component; the
    /// configured timeout rides on it, so no individual call can hang past
    /// single-digit seconds.
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.network.timeout_secs))
            .build()
            .or_raise(|| ErrorKind::Init)?;
        let provider = Arc::new(Network::new(http.clone(), config.network.aggregator.clone()));
        let mut resolver = Resolver::new(PlcDirectory::new(http.clone(), config.network.directory.clone()));
        if let (Some(did), Some(pds)) = (&config.owner.did, &config.owner.pds) {
            resolver = resolver.with_fallback(&config.owner.id, Identity { did: did.clone(), pds: pds.clone() });
        }
        let engagement = Arc::new(LiveEngagement::new(
            http,
            config.network.aggregator.clone(),
            config.network.index.clone(),
            config.fetch.max_pages,
        ));
        Ok(Self::with_components(config, provider, Arc::new(resolver), Arc::new(Cache::new()), engagement))
    }

    /// Assemble from explicit components.
    ///
    /// Note:
    /// - Do NOT apply `#[cfg(test)]` so that other crates can also use this
    ///   with their own doubles in their tests.
    pub fn with_components(
        config: Config,
        provider: Arc<dyn SourceProvider>,
        resolver: Arc<Resolver>,
        cache: Arc<Cache>,
        engagement: Arc<dyn Engagement>,
    ) -> Self {
        let owner = config.owner.id.clone();
        let composer = Composer::new(&owner, provider.clone(), resolver.clone(), cache.clone(), engagement)
            .with_media_limit(config.fetch.media_limit)
            .with_page_size(config.fetch.page_size);
        let blog = Aggregator::new(&owner, provider.clone(), resolver.clone(), cache.clone())
            .with_paging(config.fetch.page_size, config.fetch.max_pages);
        Self { config, provider, resolver, cache, composer, blog }
    }

    /// The post composer, for status pages and permalinks.
    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    /// The blog aggregator, for the writing index and feeds.
    pub fn blog(&self) -> &Aggregator {
        &self.blog
    }

    /// The owner's profile.
    ///
    /// Aggregator-first: the profile collection is standard and mirrored. An
    /// absent record degrades to a minimal profile; this only errors when
    /// resolution and every source failed, which is the one case the page
    /// layer turns into an error page.
    #[instrument(skip(self))]
    pub async fn profile(&self) -> Result<Profile> {
        let owner = &self.config.owner.id;
        if let Some(profile) = self.cache.get::<Profile>(Category::Profile, owner) {
            return Ok(profile);
        }
        let identity = self.resolver.resolve(owner).await.map_err(ErrorKind::profile_identity)?;
        let sources = self.provider.sources(&identity, FetchOrder::AggregatorFirst);
        let record = read_with_fallback(&sources, PROFILE_COLLECTION, PROFILE_RKEY)
            .await
            .map_err(ErrorKind::profile_fetch)?;
        let profile = match record {
            Some(record) => Profile::from_record(&identity, self.owner_handle(), &record.value),
            None => {
                warn!(owner = %owner, "no profile record on any source");
                Profile::minimal(&identity, self.owner_handle())
            },
        };
        self.cache.set(Category::Profile, owner.clone(), profile.clone());
        Ok(profile)
    }

    /// Landing-page fan-out: profile, latest status, blog feed.
    ///
    /// All-settled on purpose — a failing branch degrades to its empty
    /// placeholder and never cancels the others.
    #[instrument(skip(self))]
    pub async fn front_page(&self) -> FrontPage {
        let (profile, latest, blog) = tokio::join!(self.profile(), self.composer.latest(), self.blog.list_posts());
        FrontPage {
            profile: profile
                .map_err(|err| warn!(error = %*err, "profile branch failed, rendering placeholder"))
                .ok(),
            latest: latest
                .map_err(|err| warn!(error = %*err, "latest-post branch failed, rendering placeholder"))
                .ok()
                .flatten(),
            blog: blog
                .map_err(|err| warn!(error = %*err, "blog branch failed, rendering an empty index"))
                .unwrap_or_default(),
        }
    }

    /// The configured owner id, when it is a handle rather than a did.
    fn owner_handle(&self) -> Option<String> {
        let id = self.config.owner.id.clone();
        (!id.starts_with("did:")).then_some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use burrow_client::{MockProvider, MockSource};
    use burrow_identity::directory::Directory;
    use burrow_post::{Counts, Endorsement, POST_COLLECTION};
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

    #[derive(Clone)]
    struct FailingDirectory;

    #[async_trait]
    impl Directory for FailingDirectory {
        async fn lookup(&self, _id: &str) -> burrow_identity::error::Result<Identity> {
            exn::bail!(burrow_identity::error::ErrorKind::Network)
        }
    }

    /// Engagement double that reports nothing at all.
    struct ZeroEngagement;

    #[async_trait]
    impl Engagement for ZeroEngagement {
        async fn counters(&self, _uri: &str) -> burrow_post::error::Result<Counts> {
            Ok(Counts::default())
        }

        async fn distinct_endorsers(&self, _uri: &str, _kind: Endorsement) -> burrow_post::error::Result<u64> {
            Ok(0)
        }
    }

    fn config() -> Config {
        Config {
            owner: burrow_config::Owner { id: OWNER.to_string(), did: None, pds: None },
            ..Config::default()
        }
    }

    fn site_with(source: MockSource, directory: impl Directory + 'static) -> Site {
        Site::with_components(
            config(),
            Arc::new(MockProvider::single(Arc::new(source))),
            Arc::new(Resolver::new(directory)),
            Arc::new(Cache::new()),
            Arc::new(ZeroEngagement),
        )
    }

    fn populated_source() -> MockSource {
        MockSource::named("origin")
            .with_repo(OWNER)
            .with_record(
                PROFILE_COLLECTION,
                PROFILE_RKEY,
                json!({"displayName": "The Owner", "description": "writes things"}),
            )
            .with_page(
                POST_COLLECTION,
                vec![("1", json!({"text": "latest status", "createdAt": "2024-06-15T12:30:00Z"}))],
                None,
            )
            .with_page(
                "com.whtwnd.blog.entry",
                vec![("w1", json!({"title": "An entry", "createdAt": "2024-02-01T00:00:00Z"}))],
                None,
            )
    }

    #[tokio::test]
    async fn front_page_populates_every_branch() {
        let site = site_with(populated_source(), FixedDirectory(Url::parse("https://pds.example.com").unwrap()));
        let page = site.front_page().await;
        assert_eq!(page.profile.unwrap().display_name.as_deref(), Some("The Owner"));
        assert_eq!(page.latest.unwrap().text, "latest status");
        assert_eq!(page.blog.len(), 1);
    }

    #[tokio::test]
    async fn one_failing_branch_does_not_cancel_the_others() {
        // No profile record and no blog collections: those branches degrade
        // while the latest post still loads.
        let incomplete = MockSource::named("origin").with_repo(OWNER).with_page(
            POST_COLLECTION,
            vec![("1", json!({"text": "latest status", "createdAt": "2024-06-15T12:30:00Z"}))],
            None,
        );
        let site = site_with(incomplete, FixedDirectory(Url::parse("https://pds.example.com").unwrap()));
        let page = site.front_page().await;
        // Absent profile record is a placeholder profile, not a failure.
        assert_eq!(page.profile.unwrap().display_name, None);
        assert_eq!(page.latest.unwrap().text, "latest status");
        assert!(page.blog.is_empty());
    }

    #[tokio::test]
    async fn unresolvable_identity_degrades_the_whole_page_gracefully() {
        let site = site_with(populated_source(), FailingDirectory);
        let page = site.front_page().await;
        assert!(page.profile.is_none());
        assert!(page.latest.is_none());
        assert!(page.blog.is_empty());
    }

    #[tokio::test]
    async fn profile_is_cached_after_first_fetch() {
        let mock = Arc::new(populated_source());
        let site = Site::with_components(
            config(),
            Arc::new(MockProvider::single(mock.clone())),
            Arc::new(Resolver::new(FixedDirectory(Url::parse("https://pds.example.com").unwrap()))),
            Arc::new(Cache::new()),
            Arc::new(ZeroEngagement),
        );
        site.profile().await.unwrap();
        let fetched = mock.get_calls();
        site.profile().await.unwrap();
        assert_eq!(mock.get_calls(), fetched);
    }
}
