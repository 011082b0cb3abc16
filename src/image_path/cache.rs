//! Resolution Cache - bounded memo of resolved image URLs
//!
//! ## Responsibilities
//!
//! - Memoize [`PathResolver`] output keyed by `(raw_path, cache_token)`
//! - Keep at most `capacity` entries over a long running session
//! - Evict the oldest fraction of entries (insertion order) on overflow
//!
//! Entries are immutable once inserted; the only removal path is eviction.

use super::resolver::PathResolver;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Cache key: raw path plus optional cache-busting token
type CacheKey = (String, Option<String>);

/// ResolutionCache configuration
#[derive(Debug, Clone)]
pub struct ResolutionCacheConfig {
    /// Maximum number of distinct keys
    pub capacity: usize,
    /// Share of entries dropped per eviction pass, in percent
    pub evict_percent: usize,
}

impl Default for ResolutionCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            evict_percent: 20,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionCacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    /// Each miss is exactly one resolver invocation
    pub misses: u64,
    pub evicted: u64,
}

pub struct ResolutionCache {
    resolver: PathResolver,
    config: ResolutionCacheConfig,
    entries: HashMap<CacheKey, String>,
    /// Insertion order, oldest first
    order: VecDeque<CacheKey>,
    hits: u64,
    misses: u64,
    evicted: u64,
}

impl ResolutionCache {
    pub fn new(resolver: PathResolver, config: ResolutionCacheConfig) -> Self {
        let config = ResolutionCacheConfig {
            capacity: config.capacity.max(1),
            evict_percent: config.evict_percent.clamp(1, 100),
        };
        Self {
            resolver,
            entries: HashMap::with_capacity(config.capacity),
            order: VecDeque::with_capacity(config.capacity),
            config,
            hits: 0,
            misses: 0,
            evicted: 0,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(PathResolver::default(), ResolutionCacheConfig::default())
    }

    /// Resolved URL for `raw_path`; empty paths are never cached
    pub fn get(&mut self, raw_path: &str, token: Option<&str>) -> String {
        if raw_path.trim().is_empty() {
            return String::new();
        }

        let key: CacheKey = (raw_path.to_string(), token.map(str::to_string));
        if let Some(url) = self.entries.get(&key) {
            self.hits += 1;
            return url.clone();
        }

        self.misses += 1;
        let url = self.resolver.resolve(raw_path, token);

        if self.entries.len() >= self.config.capacity {
            self.evict_oldest();
        }

        self.entries.insert(key.clone(), url.clone());
        self.order.push_back(key);

        url
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> ResolutionCacheStats {
        ResolutionCacheStats {
            entries: self.entries.len(),
            capacity: self.config.capacity,
            hits: self.hits,
            misses: self.misses,
            evicted: self.evicted,
        }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Drop the oldest `evict_percent` of entries (at least one)
    fn evict_oldest(&mut self) {
        let count = (self.entries.len() * self.config.evict_percent / 100).max(1);
        let mut removed = 0;

        while removed < count {
            let Some(key) = self.order.pop_front() else {
                break;
            };
            if self.entries.remove(&key).is_some() {
                removed += 1;
            }
        }

        self.evicted += removed as u64;

        tracing::debug!(
            evicted = removed,
            remaining = self.entries.len(),
            "Evicted oldest resolved image paths"
        );
    }
}

/// Mutex-guarded cache for use from concurrent handlers
pub struct SharedResolutionCache {
    inner: Mutex<ResolutionCache>,
}

impl SharedResolutionCache {
    pub fn new(cache: ResolutionCache) -> Self {
        Self {
            inner: Mutex::new(cache),
        }
    }

    /// Check, resolve, insert and evict under one lock
    pub fn get(&self, raw_path: &str, token: Option<&str>) -> String {
        let mut cache = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        cache.get(raw_path, token)
    }

    pub fn stats(&self) -> ResolutionCacheStats {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_idempotent_single_resolution() {
        let mut cache = ResolutionCache::with_defaults();
        let a = cache.get(r"D:\cap\20240101_1200\img.bmp", Some("17"));
        let b = cache.get(r"D:\cap\20240101_1200\img.bmp", Some("17"));
        assert_eq!(a, b);
        assert_eq!(
            a,
            "/api/files?path=data/images/inspection/20240101_1200/img.bmp&convert=jpg&t=17"
        );

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_token_is_part_of_key() {
        let mut cache = ResolutionCache::with_defaults();
        let a = cache.get("inspection/a.bmp", Some("1"));
        let b = cache.get("inspection/a.bmp", Some("2"));
        let c = cache.get("inspection/a.bmp", None);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_empty_path_not_cached() {
        let mut cache = ResolutionCache::with_defaults();
        assert_eq!(cache.get("", Some("5")), "");
        assert!(cache.is_empty());
        assert_eq!(cache.stats().misses, 0);
    }

    #[test]
    fn test_overflow_evicts_oldest_fifth() {
        let mut cache = ResolutionCache::with_defaults();
        for i in 0..1000 {
            cache.get(&format!("inspection/{}.bmp", i), None);
        }
        assert_eq!(cache.len(), 1000);

        cache.get("inspection/1000.bmp", None);
        let stats = cache.stats();
        assert_eq!(stats.entries, 801);
        assert_eq!(stats.evicted, 200);

        // oldest are gone, newer survive
        let misses = cache.stats().misses;
        cache.get("inspection/199.bmp", None);
        assert_eq!(cache.stats().misses, misses + 1);
        cache.get("inspection/200.bmp", None);
        assert_eq!(cache.stats().misses, misses + 1);
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut cache = ResolutionCache::new(
            PathResolver::default(),
            ResolutionCacheConfig {
                capacity: 10,
                evict_percent: 20,
            },
        );
        for i in 0..500 {
            cache.get(&format!("p/{}.png", i), Some("t"));
            assert!(cache.len() <= 10);
        }
    }

    #[test]
    fn test_small_capacity_evicts_at_least_one() {
        let mut cache = ResolutionCache::new(
            PathResolver::default(),
            ResolutionCacheConfig {
                capacity: 2,
                evict_percent: 20,
            },
        );
        cache.get("a.png", None);
        cache.get("b.png", None);
        cache.get("c.png", None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evicted, 1);
    }

    #[test]
    fn test_shared_cache_across_threads() {
        let shared = Arc::new(SharedResolutionCache::new(ResolutionCache::new(
            PathResolver::default(),
            ResolutionCacheConfig {
                capacity: 50,
                evict_percent: 20,
            },
        )));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        shared.get(&format!("inspection/{}/{}.bmp", t, i), None);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let stats = shared.stats();
        assert!(stats.entries <= 50);
        assert_eq!(stats.misses, 400);
    }
}
