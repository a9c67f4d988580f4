//! The standard-site document schema.
//!
//! Same document-plus-publication idea as the leaflet schema, different
//! field convention: the publication reference is called `site`, the base
//! lives under `url`, and drafts are an explicit boolean.

use std::collections::HashMap;

use burrow_client::Record;
use serde_json::Value;

use crate::model::{BlogPost, Platform, Publication, canonical_url, parse_timestamp, text_field};

pub(crate) const DOCUMENT: &str = "site.standard.document";
pub(crate) const PUBLICATION: &str = "site.standard.publication";

/// Lookup map from publication URI to its resolved data.
pub(crate) fn publications(records: &[Record]) -> HashMap<String, Publication> {
    records
        .iter()
        .map(|record| {
            let publication = Publication {
                name: text_field(&record.value, "name"),
                base_url: text_field(&record.value, "url"),
                icon: text_field(&record.value, "icon"),
            };
            (record.uri.clone(), publication)
        })
        .collect()
}

pub(crate) fn normalize(
    owner_did: &str,
    records: &[Record],
    publications: &HashMap<String, Publication>,
) -> Vec<BlogPost> {
    records.iter().filter_map(|record| document(owner_did, record, publications)).collect()
}

fn document(owner_did: &str, record: &Record, publications: &HashMap<String, Publication>) -> Option<BlogPost> {
    let value = &record.value;
    if value.get("draft").and_then(Value::as_bool).unwrap_or(false) {
        return None;
    }
    let rkey = record.rkey()?;
    let publication = text_field(value, "site").and_then(|uri| publications.get(&uri));
    let url = canonical_url(
        publication.and_then(|p| p.base_url.as_deref()),
        text_field(value, "path").as_deref(),
        &rkey,
        || format!("https://standard.site/{owner_did}/{rkey}"),
    );
    Some(BlogPost {
        title: text_field(value, "title").unwrap_or_else(|| "Untitled".to_string()),
        url,
        created_at: parse_timestamp(value, &["publishedAt", "createdAt"]),
        platform: Platform::StandardSite,
        description: text_field(value, "description"),
        publication: publication.and_then(|p| p.name.clone()),
    })
}
