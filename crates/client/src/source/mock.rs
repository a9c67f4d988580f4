//! Scripted in-memory record source for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use burrow_identity::Identity;
use serde_json::Value;

use super::{FetchOrder, RecordSource, SourceHandle, SourceProvider};
use crate::error::{Error, ErrorKind, Result};
use crate::record::{AtUri, Page, Record};

enum Scripted {
    Page(Page),
    Failure(ErrorKind),
}

/// Scripted record source for unit tests.
///
/// Pages are consumed front-to-back per collection, so a cursor sequence is
/// scripted as consecutive `with_page` calls (the mock does not interpret
/// the cursors it hands out). Point-reads are keyed by `(collection, rkey)`.
/// Call counters make fallback short-circuiting observable.
///
/// # Examples
///
/// ```
/// use burrow_client::{MockSource, RecordSource};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let source = MockSource::named("origin")
///     .with_page("posts", vec![("a", json!({"text": "hi"}))], None);
/// let page = source.list("posts", 50, None).await.unwrap();
/// assert_eq!(page.records.len(), 1);
/// # }
/// ```
pub struct MockSource {
    name: String,
    repo: String,
    fail: Option<ErrorKind>,
    pages: Mutex<HashMap<String, VecDeque<Scripted>>>,
    endless: HashMap<String, usize>,
    records: Mutex<HashMap<(String, String), Record>>,
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
}

impl MockSource {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repo: "did:plc:mock".to_string(),
            fail: None,
            pages: Mutex::new(HashMap::new()),
            endless: HashMap::new(),
            records: Mutex::new(HashMap::new()),
            list_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
        }
    }

    /// Change the repo id used when synthesizing record URIs.
    pub fn with_repo(mut self, did: impl Into<String>) -> Self {
        self.repo = did.into();
        self
    }

    /// Script the next page for a collection, in listing order.
    pub fn with_page(
        self,
        collection: impl Into<String>,
        items: impl IntoIterator<Item = (impl Into<String>, Value)>,
        cursor: Option<&str>,
    ) -> Self {
        let collection = collection.into();
        let records = items
            .into_iter()
            .map(|(rkey, value)| {
                let rkey: String = rkey.into();
                self.synthesize(&collection, &rkey, value)
            })
            .collect();
        let page = Page { records, cursor: cursor.map(str::to_string) };
        self.push(collection, Scripted::Page(page));
        self
    }

    /// Script a failed page request for a collection.
    pub fn with_page_error(self, collection: impl Into<String>, kind: ErrorKind) -> Self {
        self.push(collection.into(), Scripted::Failure(kind));
        self
    }

    /// Every listing of this collection returns `per_page` records and a
    /// fresh cursor, forever. For exercising page ceilings.
    pub fn with_endless_pages(mut self, collection: impl Into<String>, per_page: usize) -> Self {
        self.endless.insert(collection.into(), per_page);
        self
    }

    /// Script a point-readable record.
    pub fn with_record(self, collection: impl Into<String>, rkey: impl Into<String>, value: Value) -> Self {
        let (collection, rkey) = (collection.into(), rkey.into());
        let record = self.synthesize(&collection, &rkey, value);
        self.records.lock().unwrap_or_else(|e| e.into_inner()).insert((collection, rkey), record);
        self
    }

    /// Script a point-readable record under an explicit `at://` URI.
    ///
    /// Panics on a malformed URI; broken test setup should not pass.
    pub fn with_record_uri(self, uri: &str, value: Value) -> Self {
        let parsed: AtUri = uri.parse().unwrap_or_else(|_| panic!("MockSource::with_record_uri: invalid uri {uri}"));
        let record = Record { uri: uri.to_string(), cid: None, value };
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((parsed.collection, parsed.rkey), record);
        self
    }

    /// Every operation fails with a network error.
    pub fn failing(self) -> Self {
        self.failing_with(ErrorKind::Network)
    }

    /// Every operation fails with the given kind.
    pub fn failing_with(mut self, kind: ErrorKind) -> Self {
        self.fail = Some(kind);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    fn synthesize(&self, collection: &str, rkey: &str, value: Value) -> Record {
        Record {
            uri: format!("at://{}/{}/{}", self.repo, collection, rkey),
            cid: None,
            value,
        }
    }

    fn push(&self, collection: String, scripted: Scripted) {
        self.pages.lock().unwrap_or_else(|e| e.into_inner()).entry(collection).or_default().push_back(scripted);
    }
}

#[async_trait]
impl RecordSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list(&self, collection: &str, _limit: u32, _cursor: Option<&str>) -> Result<Page> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(kind) = &self.fail {
            return Err(Error::from(kind.clone()));
        }
        if let Some(per_page) = self.endless.get(collection) {
            let records = (0..*per_page).map(|i| self.synthesize(collection, &format!("r{i}"), Value::Null)).collect();
            return Ok(Page { records, cursor: Some("more".to_string()) });
        }
        let scripted = self.pages.lock().unwrap_or_else(|e| e.into_inner()).get_mut(collection).and_then(VecDeque::pop_front);
        match scripted {
            Some(Scripted::Page(page)) => Ok(page),
            Some(Scripted::Failure(kind)) => Err(Error::from(kind)),
            None => Ok(Page::default()),
        }
    }

    async fn get(&self, collection: &str, rkey: &str) -> Result<Record> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(kind) = &self.fail {
            return Err(Error::from(kind.clone()));
        }
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(collection.to_string(), rkey.to_string()))
            .cloned()
            .ok_or_else(|| Error::from(ErrorKind::NotFound))
    }
}

/// Scripted [`SourceProvider`]: fixed source chains, optionally per repo.
#[derive(Default)]
pub struct MockProvider {
    default_chain: Vec<SourceHandle>,
    by_repo: HashMap<String, Vec<SourceHandle>>,
}

impl MockProvider {
    /// One source serving every identity.
    pub fn single(source: Arc<MockSource>) -> Self {
        Self { default_chain: vec![source], by_repo: HashMap::new() }
    }

    pub fn new(chain: Vec<SourceHandle>) -> Self {
        Self { default_chain: chain, by_repo: HashMap::new() }
    }

    /// Use a dedicated chain for one repo.
    pub fn with_repo(mut self, did: impl Into<String>, chain: Vec<SourceHandle>) -> Self {
        self.by_repo.insert(did.into(), chain);
        self
    }
}

impl SourceProvider for MockProvider {
    fn sources(&self, identity: &Identity, _order: FetchOrder) -> Vec<SourceHandle> {
        self.by_repo.get(&identity.did).cloned().unwrap_or_else(|| self.default_chain.clone())
    }
}
