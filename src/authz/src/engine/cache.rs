//! Decision cache with TTL expiry and bounded size
//!
//! Entries hold the allow flag, reasons and obligations only; metadata is
//! always rebuilt on read. Each entry is tagged with the policy generation it
//! was computed under and is never served once another generation is live.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;

use acx_core::{AuthorizationInput, Clock, Obligation, Reason};

use crate::compiler::hash::digest_value;

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Maximum number of entries held at once
    pub capacity: usize,

    /// Time-to-live for cached decisions
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 500,
            ttl: Duration::from_millis(2000),
        }
    }
}

impl CacheConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Cache key type (BLAKE3 digest)
pub type CacheKey = [u8; 32];

/// Cacheable part of a decision
#[derive(Debug, Clone, PartialEq)]
pub struct CachedDecision {
    pub allow: bool,
    pub reasons: Vec<Reason>,
    pub obligations: Vec<Obligation>,
}

#[derive(Debug, Clone)]
struct CachedEntry {
    decision: CachedDecision,
    generation: u64,
    expires_at: DateTime<Utc>,
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub evictions: u64,
    pub entries: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Bounded LRU decision cache
///
/// Reads promote entries, so the entry evicted on overflow is the one least
/// recently inserted or read.
pub struct DecisionCache {
    entries: Mutex<LruCache<CacheKey, CachedEntry>>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    evictions: AtomicU64,
}

impl DecisionCache {
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);

        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            config,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Fresh copy of a live entry computed under `generation`
    pub fn get(&self, key: &CacheKey, generation: u64) -> Option<CachedDecision> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let (expired, stale) = match entries.get(key) {
            Some(entry) => (now > entry.expires_at, entry.generation != generation),
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if expired || stale {
            entries.pop(key);
            if expired {
                self.expirations.fetch_add(1, Ordering::Relaxed);
            }
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        entries.peek(key).map(|entry| entry.decision.clone())
    }

    pub fn put(&self, key: CacheKey, generation: u64, decision: CachedDecision) {
        let now = self.clock.now();
        let expires_at = chrono::Duration::from_std(self.config.ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let entry = CachedEntry {
            decision,
            generation,
            expires_at,
        };

        let mut entries = self.entries.lock();
        if let Some((evicted, _)) = entries.push(key, entry) {
            if evicted != key {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.len(),
            capacity: self.config.capacity,
        }
    }

    /// Key over everything that can influence a decision
    ///
    /// Principal roles are hashed as assigned; expansion depends only on the
    /// installed policy, which is covered by the generation tag.
    pub fn compute_key(
        input: &AuthorizationInput,
        tenant_id: Option<&str>,
        fields: &[String],
    ) -> CacheKey {
        let principal = &input.principal;
        let principal_hash = hex::encode(digest_value(&json!({
            "type": principal.principal_type,
            "roles": principal.roles,
            "groups": principal.groups,
            "attrs": principal.attrs,
        })));
        let resource_hash = hex::encode(digest_value(&json!({
            "attrs": input.resource.attrs,
            "parent": input.resource.parent,
        })));
        let context_hash = hex::encode(digest_value(&json!(input.context)));
        let fields_hash = hex::encode(digest_value(&json!(fields)));

        digest_value(&json!({
            "tenantId": tenant_id.unwrap_or_default(),
            "principalId": principal.id,
            "actionName": input.action.name,
            "resourceType": input.resource.resource_type,
            "resourceId": input.resource.id.as_deref().unwrap_or_default(),
            "fieldsHash": fields_hash,
            "contextHash": context_hash,
            "principalHash": principal_hash,
            "resourceHash": resource_hash,
        }))
    }
}
