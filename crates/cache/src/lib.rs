//! Process-local TTL cache for resolved network data.
//!
//! One in-memory store per process, keyed by `(Category, subject)`. The TTL
//! is a fixed function of the category, never of the value: a profile and a
//! status update rot at different speeds regardless of what they contain.
//! Expired entries are evicted lazily on the read path; there is no
//! background sweep. Nothing is persisted — a restart starts cold, which is
//! the intended behavior for a best-effort read layer.
//!
//! Writes are idempotent re-fetches of the same external truth, so
//! write-write races need no special resolution (last write wins).

use std::any::Any;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tracing::trace;

/// Data category, which fully determines an entry's time-to-live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Actor profile data. Changes rarely.
    Profile,
    /// Composed status posts. The engagement numbers drift, so keep it short.
    Status,
    /// The aggregated blog feed.
    Feed,
    /// Distinct-endorser counts from the engagement index.
    Engagement,
}

impl Category {
    /// Fixed TTL table. A pure function of the category.
    pub fn ttl(self) -> Duration {
        match self {
            Category::Profile => Duration::from_secs(60 * 60),
            Category::Status => Duration::from_secs(15 * 60),
            Category::Feed => Duration::from_secs(30 * 60),
            Category::Engagement => Duration::from_secs(10 * 60),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Category::Profile => "profile",
            Category::Status => "status",
            Category::Feed => "feed",
            Category::Engagement => "engagement",
        }
    }
}

struct Entry {
    value: Box<dyn Any + Send + Sync>,
    stored_at: Instant,
}

/// Category-keyed, timestamped in-memory store.
///
/// Values are type-erased on insert and recovered by typed clone on read;
/// a `get` with the wrong type parameter behaves like a miss. All methods
/// take `&self`; the interior lock is never held across an await point.
#[derive(Default)]
pub struct Cache {
    entries: RwLock<HashMap<(Category, String), Entry>>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a value, evicting it first if its category TTL has elapsed.
    ///
    /// Returns `None` for missing entries, expired entries, and entries
    /// stored under a different type.
    pub fn get<T>(&self, category: Category, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.get_at(category, key, Instant::now())
    }

    /// Store a value under `(category, key)`, stamped with the current time.
    pub fn set<T>(&self, category: Category, key: impl Into<String>, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.set_at(category, key, value, Instant::now());
    }

    fn get_at<T>(&self, category: Category, key: &str, now: Instant) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let composite = (category, key.to_string());
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            let entry = entries.get(&composite)?;
            if now.saturating_duration_since(entry.stored_at) <= category.ttl() {
                return entry.value.downcast_ref::<T>().cloned();
            }
        }
        // Stale: logically absent. Evict now rather than waiting for a sweep
        // that doesn't exist. Re-check the timestamp under the write lock in
        // case a fresher value landed between the two lock acquisitions.
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = entries.get(&composite)
            && now.saturating_duration_since(entry.stored_at) > category.ttl()
        {
            trace!(category = category.label(), key, "evicting expired cache entry");
            entries.remove(&composite);
        }
        None
    }

    fn set_at<T>(&self, category: Category, key: impl Into<String>, value: T, now: Instant)
    where
        T: Send + Sync + 'static,
    {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert((category, key.into()), Entry { value: Box::new(value), stored_at: now });
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.entries.read().unwrap_or_else(|e| e.into_inner()).len();
        f.debug_struct("Cache").field("entries", &len).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn get_after_set_returns_value() {
        let cache = Cache::new();
        cache.set(Category::Profile, "did:plc:abc", "hello".to_string());
        assert_eq!(cache.get::<String>(Category::Profile, "did:plc:abc"), Some("hello".to_string()));
    }

    #[test]
    fn missing_key_is_absent() {
        let cache = Cache::new();
        assert_eq!(cache.get::<String>(Category::Profile, "nope"), None);
    }

    #[rstest]
    #[case::profile(Category::Profile)]
    #[case::status(Category::Status)]
    #[case::feed(Category::Feed)]
    #[case::engagement(Category::Engagement)]
    fn value_visible_until_ttl_elapses(#[case] category: Category) {
        let cache = Cache::new();
        let stored = Instant::now();
        cache.set_at(category, "key", 42u64, stored);

        // Just inside the window.
        let just_inside = stored + category.ttl();
        assert_eq!(cache.get_at::<u64>(category, "key", just_inside), Some(42));

        // Just past the window: absent, and evicted.
        let just_past = stored + category.ttl() + Duration::from_secs(1);
        assert_eq!(cache.get_at::<u64>(category, "key", just_past), None);
        assert!(!cache.entries.read().unwrap().contains_key(&(category, "key".to_string())));
    }

    #[test]
    fn categories_do_not_collide() {
        let cache = Cache::new();
        cache.set(Category::Profile, "key", 1u8);
        cache.set(Category::Status, "key", 2u8);
        assert_eq!(cache.get::<u8>(Category::Profile, "key"), Some(1));
        assert_eq!(cache.get::<u8>(Category::Status, "key"), Some(2));
    }

    #[test]
    fn last_write_wins() {
        let cache = Cache::new();
        cache.set(Category::Status, "key", 1u8);
        cache.set(Category::Status, "key", 2u8);
        assert_eq!(cache.get::<u8>(Category::Status, "key"), Some(2));
    }

    #[test]
    fn wrong_type_behaves_like_a_miss() {
        let cache = Cache::new();
        cache.set(Category::Status, "key", 7u32);
        assert_eq!(cache.get::<String>(Category::Status, "key"), None);
        // The original entry is untouched.
        assert_eq!(cache.get::<u32>(Category::Status, "key"), Some(7));
    }

    #[test]
    fn expired_entry_can_be_replaced() {
        let cache = Cache::new();
        let stored = Instant::now();
        let later = stored + Category::Status.ttl() + Duration::from_secs(1);
        cache.set_at(Category::Status, "key", 1u8, stored);
        assert_eq!(cache.get_at::<u8>(Category::Status, "key", later), None);
        cache.set_at(Category::Status, "key", 2u8, later);
        assert_eq!(cache.get_at::<u8>(Category::Status, "key", later), Some(2));
    }
}
