//! Raw record and `at://` URI types.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, ErrorKind};

/// One stored item of a given collection, as returned by listing and read
/// endpoints.
///
/// `value` is an opaque schema object whose shape depends on the collection;
/// it is not validated beyond presence checks. Normalization happens
/// downstream.
#[derive(Debug, Clone, Deserialize)]
pub struct Record {
    pub uri: String,
    #[serde(default)]
    pub cid: Option<String>,
    pub value: Value,
}

impl Record {
    /// The parsed `at://` URI of this record.
    pub fn at_uri(&self) -> Option<AtUri> {
        self.uri.parse().ok()
    }

    /// The record key segment of the URI, if the URI is well-formed.
    pub fn rkey(&self) -> Option<String> {
        self.at_uri().map(|uri| uri.rkey)
    }
}

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default)]
    pub cursor: Option<String>,
}

impl Page {
    /// The cursor to request the next page with, treating an empty string
    /// the same as no cursor at all (sources disagree on how to spell
    /// "done").
    pub fn next_cursor(&self) -> Option<&str> {
        self.cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// A parsed `at://{did}/{collection}/{rkey}` record URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AtUri {
    pub did: String,
    pub collection: String,
    pub rkey: String,
}

impl FromStr for AtUri {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let rest = s.strip_prefix("at://").ok_or_else(|| exn::Exn::from(ErrorKind::InvalidUri(s.to_string())))?;
        let mut segments = rest.splitn(3, '/');
        match (segments.next(), segments.next(), segments.next()) {
            (Some(did), Some(collection), Some(rkey))
                if !did.is_empty() && !collection.is_empty() && !rkey.is_empty() && !rkey.contains('/') =>
            {
                Ok(Self {
                    did: did.to_string(),
                    collection: collection.to_string(),
                    rkey: rkey.to_string(),
                })
            },
            _ => exn::bail!(ErrorKind::InvalidUri(s.to_string())),
        }
    }
}

impl Display for AtUri {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "at://{}/{}/{}", self.did, self.collection, self.rkey)
    }
}
