// SPDX-License-Identifier: Apache-2.0

//! The list-page cache for the global index. One entry per index page
//! number; entries expire after the TTL or on an explicit flush. Writes do
//! not invalidate: staleness up to the TTL is the accepted tradeoff for the
//! highest-traffic page.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPage {
    pub body: String,
    pub etag: String,
    stored_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ListPageCache {
    ttl: Duration,
    entries: HashMap<String, CachedPage>,
}

impl ListPageCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Returns the stored rendering if it is still within the TTL as of
    /// `now`. Expired entries are dropped on the way.
    pub fn get(&mut self, key: &str, now: DateTime<Utc>) -> Option<CachedPage> {
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| now - entry.stored_at <= ttl);
        self.entries.get(key).cloned()
    }

    /// Stores a freshly rendered page. Concurrent racers may both compute on
    /// a miss; the last writer wins.
    pub fn put(&mut self, key: String, body: String, now: DateTime<Utc>) -> CachedPage {
        let entry = CachedPage {
            etag: format!("\"{}\"", sha256_hex(body.as_bytes())),
            body,
            stored_at: now,
        };
        self.entries.insert(key, entry.clone());
        entry
    }

    pub fn flush(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
