//! Record source trait and implementations.
//!
//! This module defines the `RecordSource` trait, a unified read interface
//! over the endpoints that can serve a repo's records (the identity's own
//! data host, or a public aggregator that mirrors standard collections).

#[cfg(any(test, feature = "mock"))]
mod mock;
mod xrpc;

use std::sync::Arc;

use async_trait::async_trait;
use burrow_identity::Identity;
use url::Url;

#[cfg(any(test, feature = "mock"))]
pub use self::mock::{MockProvider, MockSource};
pub use self::xrpc::XrpcSource;
use crate::error::Result;
use crate::record::{Page, Record};

/// Shared handle to a record source.
pub type SourceHandle = Arc<dyn RecordSource>;

/// Unified read interface over record-serving endpoints.
///
/// Read-only on purpose: this layer never writes to the network. All
/// operations are asynchronous and carry the transport timeout configured
/// on the underlying HTTP client.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Name of the source, for logging only.
    fn name(&self) -> &str;

    /// Fetch one page of a collection listing.
    ///
    /// `limit` is a request, not a promise — sources may return fewer (or,
    /// on bad days, more) records per page than asked for.
    async fn list(&self, collection: &str, limit: u32, cursor: Option<&str>) -> Result<Page>;

    /// Point-read a single record by collection and record key.
    async fn get(&self, collection: &str, rkey: &str) -> Result<Record>;
}

/// Which end of the network to ask first.
///
/// This ordering is a design decision, not an incidental default: public
/// aggregators mirror standard collections but 404 on custom ones, so asking
/// them first for custom data adds a wasted round-trip to every cold
/// request. See [`SourceProvider::sources`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrder {
    /// Aggregator first: for standard, publicly mirrored collections
    /// (profiles, posts). The aggregator is faster and already sized.
    AggregatorFirst,
    /// Origin first: for custom collections only the identity's own host
    /// carries (blog schemas).
    OriginFirst,
}

/// Builds ordered source chains for an identity.
///
/// The seam between composition logic and the live network; tests substitute
/// [`MockProvider`].
pub trait SourceProvider: Send + Sync {
    fn sources(&self, identity: &Identity, order: FetchOrder) -> Vec<SourceHandle>;
}

/// Live source factory: one shared HTTP client, one aggregator base.
#[derive(Debug, Clone)]
pub struct Network {
    http: reqwest::Client,
    aggregator: Url,
}

impl Network {
    pub fn new(http: reqwest::Client, aggregator: Url) -> Self {
        Self { http, aggregator }
    }

    /// The identity's own data host.
    pub fn origin(&self, identity: &Identity) -> SourceHandle {
        Arc::new(XrpcSource::new("origin", self.http.clone(), identity.pds.clone(), &identity.did))
    }

    /// The public aggregator, scoped to the identity's repo.
    pub fn aggregator(&self, identity: &Identity) -> SourceHandle {
        Arc::new(XrpcSource::new("aggregator", self.http.clone(), self.aggregator.clone(), &identity.did))
    }
}

impl SourceProvider for Network {
    fn sources(&self, identity: &Identity, order: FetchOrder) -> Vec<SourceHandle> {
        match order {
            FetchOrder::AggregatorFirst => vec![self.aggregator(identity), self.origin(identity)],
            FetchOrder::OriginFirst => vec![self.origin(identity), self.aggregator(identity)],
        }
    }
}
