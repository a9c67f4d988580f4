//! The flat blog-entry schema.
//!
//! Entries are self-contained: no publication records, no per-document
//! paths. Visibility is an enum on the entry itself, and anything that is
//! not plainly public stays out of the feed.

use burrow_client::Record;
use serde_json::Value;

use crate::model::{BlogPost, Platform, parse_timestamp, text_field};

pub(crate) const COLLECTION: &str = "com.whtwnd.blog.entry";

pub(crate) fn normalize(owner_did: &str, records: &[Record]) -> Vec<BlogPost> {
    records.iter().filter_map(|record| entry(owner_did, record)).collect()
}

fn entry(owner_did: &str, record: &Record) -> Option<BlogPost> {
    let value = &record.value;
    if value.get("isDraft").and_then(Value::as_bool).unwrap_or(false) {
        return None;
    }
    // Missing visibility predates the field and means public.
    if let Some(visibility) = text_field(value, "visibility")
        && visibility != "public"
    {
        return None;
    }
    let rkey = record.rkey()?;
    Some(BlogPost {
        title: text_field(value, "title").unwrap_or_else(|| "Untitled".to_string()),
        url: format!("https://whtwnd.com/{owner_did}/{rkey}"),
        created_at: parse_timestamp(value, &["createdAt"]),
        platform: Platform::Whtwnd,
        description: None,
        publication: None,
    })
}
