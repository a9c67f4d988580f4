//! Live record source over the XRPC repo endpoints.

use async_trait::async_trait;
use exn::ResultExt;
use tracing::instrument;
use url::Url;

use super::RecordSource;
use crate::error::{Error, ErrorKind, Result};
use crate::record::{Page, Record};

const LIST_RECORDS: &str = "xrpc/com.atproto.repo.listRecords";
const GET_RECORD: &str = "xrpc/com.atproto.repo.getRecord";

/// A record source speaking the XRPC repo read API against one base URL.
///
/// The same implementation serves both the origin (an identity's own data
/// host) and the public aggregator — only the base URL differs.
#[derive(Debug, Clone)]
pub struct XrpcSource {
    name: String,
    http: reqwest::Client,
    base: Url,
    repo: String,
}

impl XrpcSource {
    /// The shared HTTP client is expected to carry the configured timeout;
    /// this type adds no timeout of its own.
    pub fn new(name: impl Into<String>, http: reqwest::Client, base: Url, repo: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            http,
            base,
            repo: repo.into(),
        }
    }

    fn endpoint(&self, method: &str) -> Result<Url> {
        // Bases are bare hosts; a relative join lands on /xrpc/….
        self.base.join(method).or_raise(|| ErrorKind::Malformed)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url, query: &[(&str, &str)]) -> Result<T> {
        let response = self.http.get(url).query(query).send().await.or_raise(|| ErrorKind::Network)?;
        match response.status() {
            status if status.is_success() => response.json().await.or_raise(|| ErrorKind::Malformed),
            reqwest::StatusCode::NOT_FOUND => Err(Error::from(ErrorKind::NotFound)),
            status => Err(Error::from(ErrorKind::Status(status.as_u16()))),
        }
    }
}

#[async_trait]
impl RecordSource for XrpcSource {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(source = %self.name, repo = %self.repo))]
    async fn list(&self, collection: &str, limit: u32, cursor: Option<&str>) -> Result<Page> {
        let limit = limit.to_string();
        let mut query = vec![("repo", self.repo.as_str()), ("collection", collection), ("limit", limit.as_str())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }
        self.get_json(self.endpoint(LIST_RECORDS)?, &query).await
    }

    #[instrument(skip(self), fields(source = %self.name, repo = %self.repo))]
    async fn get(&self, collection: &str, rkey: &str) -> Result<Record> {
        let query = [("repo", self.repo.as_str()), ("collection", collection), ("rkey", rkey)];
        self.get_json(self.endpoint(GET_RECORD)?, &query).await
    }
}
