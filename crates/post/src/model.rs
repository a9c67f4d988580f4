//! Composed post model.

use burrow_embed::{ExternalLink, Media};
use serde_json::Value;
use time::UtcDateTime;
use time::format_description::well_known::Rfc3339;

/// The author of a post.
///
/// The canonical id always exists (it is part of the record URI); the human
/// bits are only present when an aggregator view happened to carry them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub did: String,
    pub handle: Option<String>,
    pub display_name: Option<String>,
}

impl Author {
    /// Build from a view's `author` object when present, else from the did
    /// alone.
    pub(crate) fn from_value(did: impl Into<String>, value: &Value) -> Self {
        let author = value.get("author");
        let field = |name: &str| {
            author
                .and_then(|a| a.get(name))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            did: did.into(),
            handle: field("handle"),
            display_name: field("displayName"),
        }
    }
}

/// Engagement counters, post-reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub likes: u64,
    pub reposts: u64,
    pub replies: u64,
}

/// A fully-hydrated post.
///
/// `quoted`, `reply_parent` and `reply_root` are themselves composed posts,
/// so the whole thing is a depth-bounded tree — the composer caps nesting,
/// the type does not.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub uri: String,
    pub text: String,
    pub created_at: Option<UtcDateTime>,
    pub author: Author,
    pub counts: Counts,
    pub media: Vec<Media>,
    pub external: Option<ExternalLink>,
    pub quoted: Option<Box<Post>>,
    pub reply_parent: Option<Box<Post>>,
    pub reply_root: Option<Box<Post>>,
}

/// Parse a record's `createdAt`, tolerating absence and bad formats.
pub(crate) fn created_at(value: &Value) -> Option<UtcDateTime> {
    let raw = value.get("createdAt").and_then(Value::as_str)?;
    time::OffsetDateTime::parse(raw, &Rfc3339).ok().map(time::OffsetDateTime::to_utc)
}
