//! Per-session cookie store shared by every in-flight request of one client.
//!
//! Entries are keyed by [`SessionKey`], so each (connection, replica) pair owns
//! exactly one [`CookieSet`]. All operations are atomic per key; there are no
//! multi-key transactions and no eviction beyond explicit [`CookieStore::remove`].
//!
//! Two concurrent logins against the same key may both write their cookie set;
//! the last writer wins.

use std::collections::BTreeMap;
use std::fmt;

use dashmap::DashMap;
use tracing::debug;

use crate::connection::SessionKey;

/// Cookie name to cookie value for one session key.
///
/// Values are redacted in Debug output; cookie values are session credentials.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CookieSet {
    cookies: BTreeMap<String, String>,
}

impl CookieSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    pub fn extend<I, K, V>(&mut self, cookies: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in cookies {
            self.insert(name, value);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Iterates cookies in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cookies
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Renders the set as a `Cookie` request header value (`a=1; b=2`).
    #[must_use]
    pub fn header_value(&self) -> String {
        self.iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Debug for CookieSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.cookies.keys().map(|name| (name, "[REDACTED]")))
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CookieSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

/// Concurrent map from session key to cookie set.
///
/// Reads return snapshots so no shard lock is ever held across an `.await`.
#[derive(Debug, Default)]
pub struct CookieStore {
    sessions: DashMap<SessionKey, CookieSet>,
}

impl CookieStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the cookie set for `key`, if one exists.
    #[must_use]
    pub fn get(&self, key: &SessionKey) -> Option<CookieSet> {
        self.sessions.get(key).map(|entry| entry.value().clone())
    }

    /// Snapshot of the cookie set for `key`, creating an empty one on first access.
    pub fn get_or_create(&self, key: &SessionKey) -> CookieSet {
        self.sessions.entry(key.clone()).or_default().value().clone()
    }

    /// Empties the set for `key`, creating it if absent.
    pub fn reset(&self, key: &SessionKey) {
        self.sessions.insert(key.clone(), CookieSet::new());
    }

    /// Merges `cookies` into the set for `key`, creating it if absent.
    pub fn put_all(&self, key: &SessionKey, cookies: &CookieSet) {
        self.sessions
            .entry(key.clone())
            .or_default()
            .extend(cookies.iter());
    }

    /// Sets one cookie only if a set for `key` still exists.
    ///
    /// Returns `false` when the set was dropped concurrently.
    pub fn update_existing(&self, key: &SessionKey, name: &str, value: &str) -> bool {
        match self.sessions.get_mut(key) {
            Some(mut entry) => {
                entry.insert(name, value);
                true
            }
            None => false,
        }
    }

    /// Drops the set for `key`, forcing a fresh login on the next request.
    pub fn remove(&self, key: &SessionKey) -> Option<CookieSet> {
        let removed = self.sessions.remove(key).map(|(_, set)| set);
        if removed.is_some() {
            debug!(session_key = %key, "dropped session cookies");
        }
        removed
    }

    /// Number of session keys currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::connection::{ConnectionSettings, ReplicaContext};

    fn key(replica: Option<&str>) -> SessionKey {
        let settings = ConnectionSettings::new("https://h/hac", "admin", "nimda").with_id("c1");
        let replica = replica.map(|id| ReplicaContext::new(id, "ROUTE"));
        SessionKey::new(&settings, replica.as_ref())
    }

    #[test]
    fn test_cookie_set_header_value_joins_pairs() {
        let set: CookieSet = [("JSESSIONID", "abc"), ("ROUTE", ".n1")].into_iter().collect();
        assert_eq!(set.header_value(), "JSESSIONID=abc; ROUTE=.n1");
        assert_eq!(CookieSet::new().header_value(), "");
    }

    #[test]
    fn test_cookie_set_debug_redacts_values() {
        let set: CookieSet = [("JSESSIONID", "topsecret")].into_iter().collect();
        let debug = format!("{set:?}");
        assert!(debug.contains("JSESSIONID"));
        assert!(!debug.contains("topsecret"));
    }

    #[test]
    fn test_store_get_or_create_creates_empty_set() {
        let store = CookieStore::new();
        assert!(store.get(&key(None)).is_none());
        assert!(store.get_or_create(&key(None)).is_empty());
        assert!(store.get(&key(None)).is_some());
    }

    #[test]
    fn test_store_reset_clears_existing_cookies() {
        let store = CookieStore::new();
        let k = key(None);
        store.put_all(&k, &[("JSESSIONID", "old")].into_iter().collect());
        store.reset(&k);
        assert_eq!(store.get(&k), Some(CookieSet::new()));
    }

    #[test]
    fn test_store_update_existing_ignores_missing_key() {
        let store = CookieStore::new();
        let k = key(None);
        assert!(!store.update_existing(&k, "JSESSIONID", "v"));
        assert!(store.get(&k).is_none());

        store.reset(&k);
        assert!(store.update_existing(&k, "JSESSIONID", "v"));
        assert_eq!(store.get(&k).unwrap().get("JSESSIONID"), Some("v"));
    }

    #[test]
    fn test_store_partitions_by_replica() {
        let store = CookieStore::new();
        store.put_all(&key(Some("a")), &[("JSESSIONID", "sa")].into_iter().collect());
        store.put_all(&key(Some("b")), &[("JSESSIONID", "sb")].into_iter().collect());

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&key(Some("a"))).unwrap().get("JSESSIONID"), Some("sa"));
        assert_eq!(store.get(&key(Some("b"))).unwrap().get("JSESSIONID"), Some("sb"));
        assert!(store.get(&key(None)).is_none());
    }

    #[test]
    fn test_store_remove_drops_whole_set() {
        let store = CookieStore::new();
        let k = key(None);
        store.put_all(&k, &[("JSESSIONID", "x"), ("ROUTE", "y")].into_iter().collect());
        assert_eq!(store.remove(&k).map(|set| set.len()), Some(2));
        assert!(store.get(&k).is_none());
        assert!(store.remove(&k).is_none());
    }

    #[test]
    fn test_store_concurrent_writers_keep_one_entry_per_key() {
        let store = Arc::new(CookieStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let k = key(Some(if i % 2 == 0 { "a" } else { "b" }));
                    store.reset(&k);
                    store.put_all(&k, &[("JSESSIONID", format!("s{i}"))].into_iter().collect());
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 2);
        assert!(store.get(&key(Some("a"))).unwrap().contains("JSESSIONID"));
    }
}
