//! Identity-to-host resolution.
//!
//! An [`Identity`] binds a stable identifier to the network location that
//! currently hosts its data. Bindings are durable, so successful resolutions
//! are memoized for the lifetime of the process; no TTL applies here.
//!
//! Resolution failure is recoverable when a static fallback binding has been
//! configured for the identifier (the site owner's last known host); it is
//! fatal otherwise.

pub mod directory;
pub mod error;

use std::collections::HashMap;
use std::sync::RwLock;

pub use crate::directory::{Directory, PlcDirectory};
use crate::error::{ErrorKind, Result};
use tracing::{debug, instrument, warn};
use url::Url;

/// A user identifier and the data-hosting endpoint for it.
///
/// Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Canonical identifier, stable across host migrations.
    pub did: String,
    /// Endpoint currently hosting this identity's records and blobs.
    pub pds: Url,
}

/// Resolves identifiers to [`Identity`] values, memoizing process-wide.
///
/// Both the requested identifier and the canonical id it resolved to are
/// memo keys, so a handle lookup warms the did-keyed entry and vice versa.
pub struct Resolver {
    directory: Box<dyn Directory>,
    memo: RwLock<HashMap<String, Identity>>,
    fallbacks: HashMap<String, Identity>,
}

impl Resolver {
    pub fn new(directory: impl Directory + 'static) -> Self {
        Self {
            directory: Box::new(directory),
            memo: RwLock::new(HashMap::new()),
            fallbacks: HashMap::new(),
        }
    }

    /// Register a static fallback binding for an identifier.
    ///
    /// Used for the site owner: a configured last-known identity keeps the
    /// site serving when the directory is unreachable on a cold start.
    pub fn with_fallback(mut self, id: impl Into<String>, identity: Identity) -> Self {
        let id = id.into();
        self.fallbacks.insert(identity.did.clone(), identity.clone());
        self.fallbacks.insert(id, identity);
        self
    }

    /// Resolve an identifier to its current identity.
    ///
    /// Memo hit → returned as-is for the rest of the process lifetime.
    /// Memo miss → directory lookup; on lookup failure the configured
    /// fallback is returned (recovered silently, logged) when one exists for
    /// this identifier, otherwise [`ErrorKind::Resolution`] propagates.
    #[instrument(skip(self))]
    pub async fn resolve(&self, id: &str) -> Result<Identity> {
        if let Some(identity) = self.memoized(id) {
            return Ok(identity);
        }
        match self.directory.lookup(id).await {
            Ok(identity) => {
                debug!(did = %identity.did, pds = %identity.pds, "resolved identity");
                self.memoize(id, &identity);
                Ok(identity)
            },
            Err(err) => match self.fallbacks.get(id) {
                // Deliberately not memoized: the next cold call retries the
                // directory instead of pinning the stale binding forever.
                Some(fallback) => {
                    warn!(id, error = %*err, "identity resolution failed, using configured fallback");
                    Ok(fallback.clone())
                },
                None => Err(err.raise(ErrorKind::Resolution(id.to_string()))),
            },
        }
    }

    fn memoized(&self, id: &str) -> Option<Identity> {
        self.memo.read().unwrap_or_else(|e| e.into_inner()).get(id).cloned()
    }

    fn memoize(&self, id: &str, identity: &Identity) {
        let mut memo = self.memo.write().unwrap_or_else(|e| e.into_inner());
        memo.insert(identity.did.clone(), identity.clone());
        if id != identity.did {
            memo.insert(id.to_string(), identity.clone());
        }
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let memoized = self.memo.read().unwrap_or_else(|e| e.into_inner()).len();
        f.debug_struct("Resolver").field("memoized", &memoized).finish()
    }
}
