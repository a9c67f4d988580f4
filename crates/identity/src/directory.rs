//! Directory lookup: one HTTP GET by identifier, returning a DID document.

use async_trait::async_trait;
use exn::ResultExt;
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use crate::Identity;
use crate::error::{ErrorKind, Result};

/// Service type that marks the entry hosting a repo's data.
const PDS_SERVICE_TYPE: &str = "AtprotoPersonalDataServer";

/// A directory that maps identifiers to identities.
///
/// The seam between the resolver and the network: the live implementation
/// is [`PlcDirectory`]; tests substitute their own.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Look an identifier up, returning its canonical id and data host.
    async fn lookup(&self, id: &str) -> Result<Identity>;
}

/// Subset of a DID document this crate cares about.
#[derive(Debug, Deserialize)]
struct DidDocument {
    id: Option<String>,
    #[serde(default)]
    service: Vec<ServiceEntry>,
}

#[derive(Debug, Deserialize)]
struct ServiceEntry {
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default)]
    service_type: String,
    #[serde(rename = "serviceEndpoint")]
    endpoint: Option<Url>,
}

impl DidDocument {
    /// First service entry that looks like a data host.
    ///
    /// Matched by service type, falling back to the conventional `#atproto_pds`
    /// fragment id because some producing applications omit the type.
    fn pds(&self) -> Option<Url> {
        self.service
            .iter()
            .find(|s| s.service_type == PDS_SERVICE_TYPE || s.id.ends_with("atproto_pds"))
            .and_then(|s| s.endpoint.clone())
    }
}

/// Live directory client over HTTP.
#[derive(Debug, Clone)]
pub struct PlcDirectory {
    http: reqwest::Client,
    base: Url,
}

impl PlcDirectory {
    /// The shared HTTP client is expected to carry the configured timeout.
    pub fn new(http: reqwest::Client, base: Url) -> Self {
        Self { http, base }
    }
}

#[async_trait]
impl Directory for PlcDirectory {
    #[instrument(skip(self))]
    async fn lookup(&self, id: &str) -> Result<Identity> {
        let url = self.base.join(id).or_raise(|| ErrorKind::Incomplete)?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .or_raise(|| ErrorKind::Network)?;
        let document: DidDocument = response.json().await.or_raise(|| ErrorKind::Incomplete)?;
        let pds = document.pds();
        match (document.id, pds) {
            (Some(did), Some(pds)) => Ok(Identity { did, pds }),
            _ => exn::bail!(ErrorKind::Incomplete),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: &str) -> DidDocument {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn pds_matched_by_service_type() {
        let document = doc(
            r##"{
                "id": "did:plc:abc",
                "service": [
                    {"id": "#other", "type": "SomethingElse", "serviceEndpoint": "https://other.example"},
                    {"id": "#pds", "type": "AtprotoPersonalDataServer", "serviceEndpoint": "https://host.example"}
                ]
            }"##,
        );
        assert_eq!(document.pds().unwrap().as_str(), "https://host.example/");
    }

    #[test]
    fn pds_matched_by_fragment_id_when_type_missing() {
        let document = doc(
            r##"{
                "id": "did:plc:abc",
                "service": [{"id": "#atproto_pds", "serviceEndpoint": "https://host.example"}]
            }"##,
        );
        assert_eq!(document.pds().unwrap().as_str(), "https://host.example/");
    }

    #[test]
    fn document_without_services_has_no_pds() {
        assert!(doc(r#"{"id": "did:plc:abc"}"#).pds().is_none());
    }
}
