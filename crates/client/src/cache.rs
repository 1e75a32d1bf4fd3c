//! In-memory query cache keyed by path-like strings.
//!
//! Keys are `/`-separated (`posts/0/20`, `post/17`, `currentUserProfile`).
//! Invalidating a prefix drops the key itself and everything below it, so
//! `posts` clears every cached feed page without touching `post/17`.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use mediashare_uploader::CacheInvalidator;

#[derive(Debug, Default)]
pub struct QueryCache {
    entries: Mutex<BTreeMap<String, serde_json::Value>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `key`, if present and still decodable.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let value = entries.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(v) => {
                trace!(key, "cache hit");
                Some(v)
            }
            Err(e) => {
                debug!(key, error = %e, "cached value has unexpected shape");
                None
            }
        }
    }

    pub fn insert<T: Serialize>(&self, key: impl Into<String>, value: &T) {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(v) => {
                self.entries
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(key, v);
            }
            Err(e) => debug!(key, error = %e, "value not cacheable"),
        }
    }

    /// Drops every entry at or below `prefix`. Returns how many were removed.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|key, _| !key_matches(key, prefix));
        let removed = before - entries.len();
        debug!(prefix, removed, "cache invalidated");
        removed
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl CacheInvalidator for QueryCache {
    fn invalidate(&self, prefix: &str) {
        self.invalidate_prefix(prefix);
    }
}

fn key_matches(key: &str, prefix: &str) -> bool {
    match key.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Key for one feed page.
pub fn posts_page_key(start: u64, count: u64) -> String {
    format!("{}/{start}/{count}", mediashare_protocol::constants::CACHE_KEY_POSTS)
}

/// Key for a single post.
pub fn post_key(post_id: mediashare_protocol::PostId) -> String {
    format!("{}/{post_id}", mediashare_protocol::constants::CACHE_KEY_POST)
}
