//! Configuration loading and validation for burrow.
//!
//! Layered via [figment]: baked-in defaults, then an optional TOML file, then
//! `BURROW_`-prefixed environment variables (double underscore as the section
//! separator, e.g. `BURROW_NETWORK__TIMEOUT_SECS=3`). Every layer is optional;
//! a missing config file falls back to defaults that point at the public
//! network endpoints.

pub mod error;

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use crate::error::{ErrorKind, Result};

/// Name of the config file looked up inside the platform config directory.
const CONFIG_FILE: &str = "burrow.toml";

/// Top-level configuration object.
///
/// Construct via [`Config::load`] (layered sources) or [`Config::default`]
/// (public-network defaults, used directly by most tests).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub owner: Owner,
    pub network: Network,
    pub fetch: Fetch,
}

/// The identity whose repo this site fronts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Owner {
    /// Handle or DID used to resolve the owner's repo location.
    pub id: String,
    /// Static fallback when live resolution fails: the last known DID.
    pub did: Option<String>,
    /// Static fallback when live resolution fails: the last known data host.
    pub pds: Option<Url>,
}

/// Network endpoints and transport limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Network {
    /// Public aggregator that mirrors standard collections.
    pub aggregator: Url,
    /// Identity directory used to resolve DIDs to data hosts.
    pub directory: Url,
    /// Decentralized engagement index (distinct endorsers per target).
    pub index: Url,
    /// Per-request timeout. Must stay in single digits; a slow source is a
    /// failed source as far as fallback ordering is concerned.
    pub timeout_secs: u64,
}

/// Bounds applied to listing and media extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Fetch {
    /// Requested page size for record listings. Sources may return fewer.
    pub page_size: u32,
    /// Hard ceiling on pages drained from a single cursor chain.
    pub max_pages: u32,
    /// Maximum media items attached to a single post.
    pub media_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            owner: Owner::default(),
            network: Network::default(),
            fetch: Fetch::default(),
        }
    }
}
impl Default for Owner {
    fn default() -> Self {
        Self { id: String::new(), did: None, pds: None }
    }
}
impl Default for Network {
    fn default() -> Self {
        Self {
            // Infallible: literal, well-formed URLs.
            aggregator: Url::parse("https://public.api.bsky.app").unwrap(),
            directory: Url::parse("https://plc.directory").unwrap(),
            index: Url::parse("https://constellation.microcosm.blue").unwrap(),
            timeout_secs: 5,
        }
    }
}
impl Default for Fetch {
    fn default() -> Self {
        Self { page_size: 100, max_pages: 20, media_limit: 4 }
    }
}

impl Config {
    /// Load configuration from the default file location plus environment.
    ///
    /// The default location is the platform config directory (e.g.
    /// `~/.config/burrow/burrow.toml` on Linux). A missing file is fine;
    /// defaults plus environment variables still apply.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path()?)
    }

    /// Load configuration from an explicit file path plus environment.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("BURROW_").split("__"))
            .extract()
            .or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    /// Platform-specific default config file path.
    fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "burrow").ok_or_else(|| exn::Exn::from(ErrorKind::NoConfigDir))?;
        Ok(dirs.config_dir().join(CONFIG_FILE))
    }

    /// Reject values the rest of the workspace is not prepared to honor.
    fn validate(&self) -> Result<()> {
        if self.owner.id.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("owner.id must be set"));
        }
        if !(1..=9).contains(&self.network.timeout_secs) {
            exn::bail!(ErrorKind::Invalid("network.timeout_secs must be 1-9"));
        }
        if !(1..=100).contains(&self.fetch.page_size) {
            exn::bail!(ErrorKind::Invalid("fetch.page_size must be 1-100"));
        }
        if self.fetch.max_pages == 0 {
            exn::bail!(ErrorKind::Invalid("fetch.max_pages must be at least 1"));
        }
        if self.fetch.media_limit == 0 {
            exn::bail!(ErrorKind::Invalid("fetch.media_limit must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::{Format, Serialized, Toml};
    use rstest::rstest;

    fn from_toml(toml: &str) -> Result<Config> {
        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::string(toml))
            .extract()
            .or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn defaults_point_at_public_endpoints() {
        let config = Config::default();
        assert_eq!(config.network.aggregator.as_str(), "https://public.api.bsky.app/");
        assert_eq!(config.network.timeout_secs, 5);
        assert_eq!(config.fetch.media_limit, 4);
    }

    #[test]
    fn file_overrides_defaults() {
        let config = from_toml(
            r#"
                [owner]
                id = "example.com"

                [network]
                timeout_secs = 3

                [fetch]
                page_size = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.owner.id, "example.com");
        assert_eq!(config.network.timeout_secs, 3);
        assert_eq!(config.fetch.page_size, 50);
        // Untouched sections keep their defaults.
        assert_eq!(config.fetch.max_pages, 20);
    }

    #[test]
    fn owner_fallback_identity_is_optional() {
        let config = from_toml(
            r#"
                [owner]
                id = "example.com"
                did = "did:plc:abc123"
                pds = "https://pds.example.com"
            "#,
        )
        .unwrap();
        assert_eq!(config.owner.did.as_deref(), Some("did:plc:abc123"));
        assert_eq!(config.owner.pds.as_ref().map(Url::as_str), Some("https://pds.example.com/"));
    }

    #[rstest]
    #[case::missing_owner("")]
    #[case::zero_timeout("[owner]\nid = \"x\"\n[network]\ntimeout_secs = 0")]
    #[case::double_digit_timeout("[owner]\nid = \"x\"\n[network]\ntimeout_secs = 30")]
    #[case::oversized_page("[owner]\nid = \"x\"\n[fetch]\npage_size = 500")]
    #[case::zero_pages("[owner]\nid = \"x\"\n[fetch]\nmax_pages = 0")]
    #[case::zero_media("[owner]\nid = \"x\"\n[fetch]\nmedia_limit = 0")]
    fn rejects_out_of_range_values(#[case] toml: &str) {
        let err = from_toml(toml).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = from_toml("[owner]\nid = \"x\"\ntypo = true").unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load));
    }
}
