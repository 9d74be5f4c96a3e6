use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;

pub const TTL_PAKET_LIST_SECS: u64 = 1800;
pub const TTL_STATS_SECS: u64 = 3600;

pub const KEY_PAKET_LIST: &str = "paket:list";
pub const KEY_STATS: &str = "stats:all";

#[derive(Debug, Clone)]
struct Entry {
    body: Value,
    expires_at: Instant,
}

/// In-memory TTL cache for JSON response bodies.
#[derive(Debug, Default)]
pub(crate) struct ResponseCache {
    entries: HashMap<String, Entry>,
}

#[derive(Debug, Clone)]
pub(crate) struct CachedBody {
    pub body: Value,
    pub remaining: Duration,
}

impl ResponseCache {
    pub(crate) fn get(&mut self, key: &str, now: Instant) -> Option<CachedBody> {
        let entry = self.entries.get(key)?;
        if now >= entry.expires_at {
            self.entries.remove(key);
            return None;
        }
        Some(CachedBody {
            body: entry.body.clone(),
            remaining: entry.expires_at.saturating_duration_since(now),
        })
    }

    pub(crate) fn set(&mut self, key: String, body: Value, ttl: Duration, now: Instant) {
        self.entries.insert(
            key,
            Entry {
                body,
                expires_at: now + ttl,
            },
        );
    }

    /// Drops every key containing `pattern`. Returns the number of removed keys.
    pub(crate) fn delete_pattern(&mut self, pattern: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| !k.contains(pattern));
        before - self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entry_expires_after_ttl() {
        let mut cache = ResponseCache::default();
        let t0 = Instant::now();
        cache.set(
            "k".to_string(),
            json!({"a": 1}),
            Duration::from_secs(10),
            t0,
        );

        let hit = cache.get("k", t0 + Duration::from_secs(4));
        assert!(hit.is_some_and(|h| h.remaining == Duration::from_secs(6)));
        assert!(cache.get("k", t0 + Duration::from_secs(10)).is_none());
        assert!(cache.get("k", t0).is_none());
    }

    #[test]
    fn delete_pattern_only_touches_matching_keys() {
        let mut cache = ResponseCache::default();
        let now = Instant::now();
        let ttl = Duration::from_secs(60);
        cache.set("paket:list::1:10".to_string(), json!(1), ttl, now);
        cache.set("paket:list:laptop:1:10".to_string(), json!(2), ttl, now);
        cache.set(KEY_STATS.to_string(), json!(3), ttl, now);

        assert_eq!(cache.delete_pattern(KEY_PAKET_LIST), 2);
        assert!(cache.get(KEY_STATS, now).is_some());
    }
}
