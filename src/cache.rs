//! Exact-text memoization of finished audio.

use bytes::Bytes;
use indexmap::IndexMap;
use parking_lot::Mutex;

/// Process-lifetime store of compressed audio keyed by the literal input text.
///
/// Keys are compared byte for byte: no trimming, case folding or Unicode
/// normalization. There is no eviction; entries leave only through
/// [`ResultCache::clear`].
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: Mutex<IndexMap<String, Bytes>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, text: &str) -> Option<Bytes> {
        self.entries.lock().get(text).cloned()
    }

    /// Store `audio` for `text`. An existing key keeps its insertion position.
    pub fn put(&self, text: impl Into<String>, audio: Bytes) {
        self.entries.lock().insert(text.into(), audio);
    }

    /// Remove every entry, returning how many there were.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let removed = entries.len();
        entries.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// The last `n` inserted keys, oldest first.
    pub fn recent_keys(&self, n: usize) -> Vec<String> {
        let entries = self.entries.lock();
        let skip = entries.len().saturating_sub(n);
        entries.keys().skip(skip).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::ResultCache;
    use bytes::Bytes;

    #[test]
    fn keys_are_exact() {
        let cache = ResultCache::new();
        cache.put("שלום", Bytes::from_static(b"a"));

        assert_eq!(cache.get("שלום"), Some(Bytes::from_static(b"a")));
        assert_eq!(cache.get(" שלום"), None);
        assert_eq!(cache.get("שלום "), None);
    }

    #[test]
    fn case_sensitive() {
        let cache = ResultCache::new();
        cache.put("Hello", Bytes::from_static(b"a"));
        assert!(cache.get("hello").is_none());
    }

    #[test]
    fn clear_reports_removed_and_is_idempotent() {
        let cache = ResultCache::new();
        cache.put("a", Bytes::new());
        cache.put("b", Bytes::new());

        assert_eq!(cache.clear(), 2);
        assert!(cache.is_empty());
        assert_eq!(cache.clear(), 0);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn recent_keys_window() {
        let cache = ResultCache::new();
        for key in ["a", "b", "c", "d", "e", "f", "g"] {
            cache.put(key, Bytes::new());
        }

        assert_eq!(cache.recent_keys(5), vec!["c", "d", "e", "f", "g"]);
        assert_eq!(cache.recent_keys(2), vec!["f", "g"]);
        assert_eq!(cache.recent_keys(50).len(), 7);
        assert!(ResultCache::new().recent_keys(5).is_empty());
    }

    #[test]
    fn overwrite_keeps_position() {
        let cache = ResultCache::new();
        cache.put("a", Bytes::from_static(b"1"));
        cache.put("b", Bytes::from_static(b"2"));
        cache.put("a", Bytes::from_static(b"3"));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(Bytes::from_static(b"3")));
        assert_eq!(cache.recent_keys(5), vec!["a", "b"]);
    }
}
