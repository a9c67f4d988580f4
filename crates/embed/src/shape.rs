//! Known embed shapes as an explicit tagged representation.
//!
//! The same conceptual "this post has one photo" fact arrives in several
//! wire shapes depending on which producing application wrote the record and
//! whether an aggregator view or the raw record is being read. Everything
//! recognizable is normalized into [`Embed`]; everything else lands in
//! [`Embed::Unknown`] carrying the raw object, so dispatch stays exhaustive
//! without pretending unknown shapes don't happen.

use serde::Deserialize;
use serde_json::Value;

const TYPE_IMAGES: &str = "app.bsky.embed.images";
const TYPE_VIDEO: &str = "app.bsky.embed.video";
const TYPE_EXTERNAL: &str = "app.bsky.embed.external";
const TYPE_RECORD: &str = "app.bsky.embed.record";
const TYPE_RECORD_WITH_MEDIA: &str = "app.bsky.embed.recordWithMedia";

/// One embed, normalized from any of the known wire shapes.
#[derive(Debug, Clone)]
pub enum Embed {
    Images(Vec<ImageItem>),
    Video(VideoItem),
    External(ExternalItem),
    /// A quoted record, possibly carrying its own embeds.
    Quote(QuoteRef),
    /// A quoted record plus attached media of its own.
    QuoteWithMedia { media: Box<Embed>, quote: QuoteRef },
    /// Anything this enumeration does not recognize, kept raw.
    Unknown(Value),
}

impl Embed {
    /// Normalize the value of a record's `embed` field.
    ///
    /// Dispatches on the `$type` discriminator; the `#view` suffix is
    /// ignored so aggregator views and raw records take the same path. A
    /// recognized discriminator whose payload doesn't parse degrades to
    /// [`Embed::Unknown`] rather than failing.
    pub fn from_value(value: &Value) -> Self {
        let Some(tag) = value.get("$type").and_then(Value::as_str) else {
            return Self::Unknown(value.clone());
        };
        match tag.strip_suffix("#view").unwrap_or(tag) {
            TYPE_IMAGES => Self::images(value),
            TYPE_VIDEO => Self::video(value),
            TYPE_EXTERNAL => Self::external(value),
            TYPE_RECORD => Self::quote(value),
            TYPE_RECORD_WITH_MEDIA => Self::quote_with_media(value),
            _ => Self::Unknown(value.clone()),
        }
    }

    fn images(value: &Value) -> Self {
        match value.get("images").map(ImageItem::from_array) {
            Some(items) if !items.is_empty() => Self::Images(items),
            _ => Self::Unknown(value.clone()),
        }
    }

    fn video(value: &Value) -> Self {
        match serde_json::from_value(value.clone()) {
            Ok(item) => Self::Video(item),
            Err(_) => Self::Unknown(value.clone()),
        }
    }

    fn external(value: &Value) -> Self {
        match value.get("external").cloned().map(serde_json::from_value) {
            Some(Ok(item)) => Self::External(item),
            _ => Self::Unknown(value.clone()),
        }
    }

    fn quote(value: &Value) -> Self {
        match value.get("record").map(QuoteRef::from_record) {
            Some(quote) => Self::Quote(quote),
            None => Self::Unknown(value.clone()),
        }
    }

    fn quote_with_media(value: &Value) -> Self {
        let media = value.get("media").map(Self::from_value);
        let quote = value.get("record").map(QuoteRef::from_record);
        match (media, quote) {
            (Some(media), Some(quote)) => Self::QuoteWithMedia { media: Box::new(media), quote },
            _ => Self::Unknown(value.clone()),
        }
    }
}

/// One image, in either the aggregator-view shape (pre-rendered URLs) or
/// the raw-record shape (a content-addressed blob).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageItem {
    #[serde(default)]
    pub fullsize: Option<String>,
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub image: Option<Blob>,
}

impl ImageItem {
    /// Parse an `images`-style array leniently: unparseable entries are
    /// dropped, parseable ones survive.
    pub fn from_array(value: &Value) -> Vec<Self> {
        value
            .as_array()
            .map(|items| {
                items.iter().filter_map(|item| serde_json::from_value(item.clone()).ok()).collect()
            })
            .unwrap_or_default()
    }
}

/// A video, view shape (`playlist`/`thumbnail`) or raw blob.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoItem {
    #[serde(default)]
    pub playlist: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub video: Option<Blob>,
}

/// An external link preview.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalItem {
    pub uri: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// URL string in views, blob object in raw records.
    #[serde(default)]
    pub thumb: Option<Value>,
}

/// A quoted record reference, with whatever payload came along.
#[derive(Debug, Clone)]
pub struct QuoteRef {
    /// URI of the quoted record, when present.
    pub uri: Option<String>,
    /// The raw quoted-record object, for one-level media recursion.
    pub raw: Value,
}

impl QuoteRef {
    /// Plain record embeds carry `uri` directly; `recordWithMedia` nests the
    /// actual reference one level deeper (`record.record.uri`). Either way,
    /// `raw` ends up as the object that carries the `uri`.
    fn from_record(record: &Value) -> Self {
        let inner = match record.get("record") {
            Some(nested) if nested.get("uri").is_some() => nested,
            _ => record,
        };
        let uri = inner.get("uri").and_then(Value::as_str).map(str::to_string);
        Self { uri, raw: inner.clone() }
    }
}

/// A content-addressed blob reference.
///
/// Two generations of the same idea: the typed `ref.$link` form, and the
/// legacy bare-`cid` form still present in old records.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Blob {
    Linked {
        #[serde(rename = "ref")]
        link: CidLink,
    },
    Legacy {
        cid: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct CidLink {
    #[serde(rename = "$link")]
    pub link: String,
}

impl Blob {
    /// The content identifier, whichever generation wrote it.
    pub fn cid(&self) -> &str {
        match self {
            Blob::Linked { link } => &link.link,
            Blob::Legacy { cid } => cid,
        }
    }
}
