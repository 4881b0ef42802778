//! Result cache in front of the execution strategy.
//!
//! Avoids re-evaluating identical content within the freshness window.
//!
//! ## Key
//!
//! The key hashes only the first `key_prefix_chars` characters of content
//! (100 by default) plus the options. Two documents that share that prefix
//! share a cache entry. Set `key_prefix_chars: None` to hash the full text.
//!
//! ## Freshness
//!
//! An entry is served only while `now - stored_at < cache_timeout`. Stale
//! entries found on read are dropped; [`ResultCache::purge_expired`] (run
//! periodically by [`ResultCache::spawn_sweeper`]) removes the rest.
//! The timeout is read at call time, so reconfiguring applies to the next
//! lookup.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cfm_core::{ValidationOptions, ValidationResult};
use moka::future::Cache;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::ComplianceSettings;
use crate::runner::EvaluationRunner;
use crate::RuntimeError;

/// Cache key for validation results.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    content_hash: u64,
    options_hash: u64,
}

impl CacheKey {
    pub fn new(content: &str, options: &ValidationOptions, prefix_chars: Option<usize>) -> Self {
        Self {
            content_hash: hash_content(content, prefix_chars),
            options_hash: hash_options(options),
        }
    }
}

#[derive(Clone, Debug)]
struct CacheEntry {
    result: ValidationResult,
    options: ValidationOptions,
    stored_at: Instant,
}

impl CacheEntry {
    fn new(result: ValidationResult, options: ValidationOptions) -> Self {
        Self {
            result,
            options,
            stored_at: Instant::now(),
        }
    }

    fn is_fresh(&self, timeout: Duration) -> bool {
        self.stored_at.elapsed() < timeout
    }
}

/// Tunables read on every lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub timeout: Duration,
    pub key_prefix_chars: Option<usize>,
    pub dedupe_in_flight: bool,
}

impl From<&ComplianceSettings> for CacheConfig {
    fn from(settings: &ComplianceSettings) -> Self {
        Self {
            timeout: settings.cache_timeout,
            key_prefix_chars: settings.key_prefix_chars,
            dedupe_in_flight: settings.dedupe_in_flight,
        }
    }
}

/// Counters since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,

    /// Runner invocations made by the cache
    pub evaluations: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evaluations: AtomicU64,
}

/// Time-bound memoization of validation results.
pub struct ResultCache {
    entries: Cache<CacheKey, CacheEntry>,
    config: RwLock<CacheConfig>,
    counters: Counters,
}

impl ResultCache {
    pub fn new(max_entries: u64, config: CacheConfig) -> Self {
        Self {
            entries: Cache::builder().max_capacity(max_entries).build(),
            config: RwLock::new(config),
            counters: Counters::default(),
        }
    }

    pub fn from_settings(settings: &ComplianceSettings) -> Self {
        Self::new(settings.cache_max_entries, CacheConfig::from(settings))
    }

    pub fn config(&self) -> CacheConfig {
        *self.config.read()
    }

    /// Replace tunables. Capacity is fixed at construction.
    pub fn reconfigure(&self, config: CacheConfig) {
        *self.config.write() = config;
    }

    /// Return a fresh cached result or evaluate through `runner` and store it.
    ///
    /// Runner errors are returned and nothing is cached.
    pub async fn get_or_evaluate(
        &self,
        content: &str,
        options: &ValidationOptions,
        runner: &dyn EvaluationRunner,
    ) -> Result<ValidationResult, RuntimeError> {
        let config = self.config();
        let key = CacheKey::new(content, options, config.key_prefix_chars);

        if let Some(entry) = self.entries.get(&key).await {
            // An entry stored under different options is a hash collision; treat as a miss.
            if entry.is_fresh(config.timeout) && entry.options == *options {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(score = entry.result.score, "Cache hit");
                return Ok(entry.result);
            }
            self.entries.invalidate(&key).await;
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(runner = runner.name(), "Cache miss");

        if config.dedupe_in_flight {
            let entry = self
                .entries
                .try_get_with(key, self.evaluate_entry(content, options, runner))
                .await
                .map_err(|e| e.as_ref().clone())?;
            return Ok(entry.result);
        }

        let entry = self.evaluate_entry(content, options, runner).await?;
        let result = entry.result.clone();
        self.entries.insert(key, entry).await;
        Ok(result)
    }

    async fn evaluate_entry(
        &self,
        content: &str,
        options: &ValidationOptions,
        runner: &dyn EvaluationRunner,
    ) -> Result<CacheEntry, RuntimeError> {
        self.counters.evaluations.fetch_add(1, Ordering::Relaxed);
        let result = runner.run(content, options).await?;
        Ok(CacheEntry::new(result, options.clone()))
    }

    /// Remove entries older than the timeout. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let timeout = self.config().timeout;
        let stale: Vec<Arc<CacheKey>> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_fresh(timeout))
            .map(|(key, _)| key)
            .collect();

        for key in &stale {
            self.entries.invalidate(key.as_ref()).await;
        }
        self.entries.run_pending_tasks().await;
        stale.len()
    }

    /// Purge expired entries every `timeout` until the cache is dropped.
    ///
    /// The period is re-read after each sweep, so a reconfigured timeout
    /// applies from the next one.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                let period = match cache.upgrade() {
                    Some(cache) => cache.config().timeout,
                    None => break,
                };
                tokio::time::sleep(period).await;

                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let purged = cache.purge_expired().await;
                tracing::debug!(purged, period = ?period, "Cache sweep");
            }
        })
    }

    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }

    /// Number of live entries, after applying pending evictions.
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evaluations: self.counters.evaluations.load(Ordering::Relaxed),
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::from_settings(&ComplianceSettings::default())
    }
}

// Hash helpers

fn hash_content(content: &str, prefix_chars: Option<usize>) -> u64 {
    let hashed = match prefix_chars {
        Some(n) => match content.char_indices().nth(n) {
            Some((end, _)) => &content[..end],
            None => content,
        },
        None => content,
    };
    let mut hasher = DefaultHasher::new();
    hashed.hash(&mut hasher);
    hasher.finish()
}

fn hash_options(options: &ValidationOptions) -> u64 {
    let mut hasher = DefaultHasher::new();
    options.hash(&mut hasher);
    hasher.finish()
}
