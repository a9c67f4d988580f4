//! Embedded-media normalization.
//!
//! Records arrive from independently-operated hosts and half a dozen
//! producing applications, so the "attached media" fact has no single wire
//! shape. This crate turns whatever arrived into a short, ordered list of
//! canonical URLs, and it never fails: a malformed embed yields whatever was
//! recovered up to that point, because one bad attachment must not abort
//! rendering of an otherwise-good post.
//!
//! Extraction preference, in order:
//!
//! 1. pre-rendered aggregator URLs (reachable and already sized);
//! 2. URLs synthesized from the author's data host plus a content id;
//! 3. one level of recursion into quoted records and quote-with-media
//!    composites (including the older `embeds` array convention);
//! 4. a budgeted structural walk of the raw value, for shapes nobody has
//!    enumerated yet.

pub mod shape;
mod walk;

use burrow_identity::Identity;
use serde_json::Value;
use tracing::instrument;

pub use crate::shape::{Blob, Embed, ExternalItem, ImageItem, QuoteRef, VideoItem};

/// Default ceiling on media items attached to one post.
pub const DEFAULT_MEDIA_LIMIT: usize = 4;

/// One resolved media attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub url: String,
    pub alt: Option<String>,
}

/// A resolved external-link preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalLink {
    pub uri: String,
    pub title: String,
    pub description: Option<String>,
    pub thumb: Option<String>,
}

/// Extract up to `limit` media URLs from a post value, videos first.
///
/// `author` is the identity whose repo the value came from; its data host
/// is the base for synthesized blob URLs. Quoted content only gets blob
/// synthesis when the quoted record belongs to the same author — a foreign
/// blob behind our host's URL would be a guaranteed 404.
#[instrument(skip(value, author), fields(did = %author.did))]
pub fn extract_media(value: &Value, author: &Identity, limit: usize) -> Vec<Media> {
    if limit == 0 {
        return Vec::new();
    }
    let mut videos: Vec<Media> = Vec::new();
    let mut images: Vec<Media> = Vec::new();
    collect(value, author, true, limit, &mut videos, &mut images, 0);
    let mut media = videos;
    media.extend(images);
    media.truncate(limit);
    if media.is_empty() {
        walk::scavenge(value, limit, &mut media);
    }
    media
}

/// Pull the external-link preview off a post value, if it carries one.
pub fn external_link(value: &Value, author: &Identity) -> Option<ExternalLink> {
    let item = match Embed::from_value(value.get("embed")?) {
        Embed::External(item) => item,
        Embed::QuoteWithMedia { media, .. } => match *media {
            Embed::External(item) => item,
            _ => return None,
        },
        _ => return None,
    };
    let thumb = match item.thumb {
        Some(Value::String(url)) => Some(url),
        Some(blob) => serde_json::from_value::<Blob>(blob).ok().and_then(|blob| blob_url(author, blob.cid())),
        None => None,
    };
    Some(ExternalLink {
        uri: item.uri,
        title: item.title,
        description: item.description.filter(|d| !d.is_empty()),
        thumb,
    })
}

/// The URI of the record this post quotes, if any.
pub fn quoted_uri(value: &Value) -> Option<String> {
    match Embed::from_value(value.get("embed")?) {
        Embed::Quote(quote) | Embed::QuoteWithMedia { quote, .. } => quote.uri,
        _ => None,
    }
}

/// Synthesize the content-addressed blob URL for an identity's blob.
///
/// The template is fixed: `{pds}/xrpc/com.atproto.sync.getBlob?did=&cid=`.
pub fn blob_url(identity: &Identity, cid: &str) -> Option<String> {
    let mut url = identity.pds.join("xrpc/com.atproto.sync.getBlob").ok()?;
    url.query_pairs_mut().append_pair("did", &identity.did).append_pair("cid", cid);
    Some(url.to_string())
}

/// Resolve an image through its pre-rendered URLs only.
pub(crate) fn resolve_image(item: &ImageItem) -> Option<Media> {
    let url = item.fullsize.clone().or_else(|| item.thumb.clone())?;
    Some(Media { url, alt: clean_alt(item.alt.as_deref()) })
}

fn synthesized_image(item: &ImageItem, author: &Identity) -> Option<Media> {
    let blob = item.image.as_ref()?;
    Some(Media {
        url: blob_url(author, blob.cid())?,
        alt: clean_alt(item.alt.as_deref()),
    })
}

fn clean_alt(alt: Option<&str>) -> Option<String> {
    alt.map(str::trim).filter(|alt| !alt.is_empty()).map(str::to_string)
}

/// Everywhere a value might carry embeds: the `embed` field, the older
/// `embeds` array, and (for aggregator view records) a nested `value.embed`.
fn embed_values(value: &Value) -> Vec<&Value> {
    let mut found = Vec::new();
    if let Some(embed) = value.get("embed") {
        found.push(embed);
    }
    if let Some(embeds) = value.get("embeds").and_then(Value::as_array) {
        found.extend(embeds.iter());
    }
    if let Some(embed) = value.get("value").and_then(|inner| inner.get("embed")) {
        found.push(embed);
    }
    found
}

fn full(videos: &[Media], images: &[Media], limit: usize) -> bool {
    videos.len() + images.len() >= limit
}

fn collect(
    value: &Value,
    author: &Identity,
    synthesize: bool,
    limit: usize,
    videos: &mut Vec<Media>,
    images: &mut Vec<Media>,
    depth: u8,
) {
    for embed_value in embed_values(value) {
        if full(videos, images, limit) {
            return;
        }
        collect_embed(&Embed::from_value(embed_value), author, synthesize, limit, videos, images, depth);
    }
}

fn collect_embed(
    embed: &Embed,
    author: &Identity,
    synthesize: bool,
    limit: usize,
    videos: &mut Vec<Media>,
    images: &mut Vec<Media>,
    depth: u8,
) {
    if full(videos, images, limit) {
        return;
    }
    match embed {
        Embed::Images(items) => {
            for item in items {
                if full(videos, images, limit) {
                    return;
                }
                let media = resolve_image(item)
                    .or_else(|| synthesize.then(|| synthesized_image(item, author)).flatten());
                if let Some(media) = media {
                    images.push(media);
                }
            }
        },
        Embed::Video(item) => {
            let url = item
                .playlist
                .clone()
                .or_else(|| item.thumbnail.clone())
                .or_else(|| {
                    synthesize
                        .then(|| item.video.as_ref().and_then(|blob| blob_url(author, blob.cid())))
                        .flatten()
                });
            if let Some(url) = url {
                videos.push(Media { url, alt: clean_alt(item.alt.as_deref()) });
            }
        },
        // Link previews are not media; see `external_link`.
        Embed::External(_) => {},
        Embed::Quote(quote) => {
            if depth == 0 {
                let own = uri_did(quote.uri.as_deref()) == Some(author.did.as_str());
                collect(&quote.raw, author, synthesize && own, limit, videos, images, 1);
            }
        },
        Embed::QuoteWithMedia { media, quote } => {
            collect_embed(media, author, synthesize, limit, videos, images, depth);
            if depth == 0 {
                let own = uri_did(quote.uri.as_deref()) == Some(author.did.as_str());
                collect(&quote.raw, author, synthesize && own, limit, videos, images, 1);
            }
        },
        Embed::Unknown(_) => {},
    }
}

fn uri_did(uri: Option<&str>) -> Option<&str> {
    uri?.strip_prefix("at://")?.split('/').next()
}
