//! Question Caches
//!
//! Bounded key→value stores keyed by the normalized question text. When a
//! new key arrives at capacity, the oldest half of the entries (by creation
//! time) is evicted first. Mutation is last-writer-wins; entries are
//! re-derivable, so no stronger guarantee is needed.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use hr_copilot_core::{normalize_question, Classification};

use crate::models::settings::CacheSettings;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::ensure_parent;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: DateTime<Utc>,
    /// Insertion sequence, breaks ties between equal timestamps.
    #[serde(default)]
    pub seq: u64,
}

/// Size-bounded cache with oldest-half eviction.
pub struct BoundedCache<V> {
    capacity: usize,
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    next_seq: AtomicU64,
}

impl<V: Clone> BoundedCache<V> {
    /// Capacity is clamped to at least 2 so that eviction always leaves room.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(2),
            entries: Mutex::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.lock().get(key).map(|e| e.value.clone())
    }

    /// Insert or overwrite `key`. A new key at capacity first evicts the
    /// oldest half of the entries.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.lock();
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let evicted = evict_oldest_half(&mut entries);
            tracing::debug!(evicted, capacity = self.capacity, "cache evicted oldest half");
        }
        entries.insert(
            key,
            CacheEntry {
                value,
                created_at: Utc::now(),
                seq,
            },
        );
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        self.lock().remove(key).map(|e| e.value)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn insert_entry(&self, key: String, entry: CacheEntry<V>) {
        self.next_seq.fetch_max(entry.seq + 1, Ordering::Relaxed);
        let mut entries = self.lock();
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            evict_oldest_half(&mut entries);
        }
        entries.insert(key, entry);
    }
}

fn evict_oldest_half<V>(entries: &mut HashMap<String, CacheEntry<V>>) -> usize {
    let mut by_age: Vec<(DateTime<Utc>, u64, String)> = entries
        .iter()
        .map(|(k, e)| (e.created_at, e.seq, k.clone()))
        .collect();
    by_age.sort();
    let count = (entries.len() / 2).max(1);
    for (_, _, key) in by_age.into_iter().take(count) {
        entries.remove(&key);
    }
    count
}

impl<V: Clone + Serialize + DeserializeOwned> BoundedCache<V> {
    /// Write all entries to `path` as JSON.
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        ensure_parent(path)?;
        let content = serde_json::to_string_pretty(&*self.lock())?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Load entries from `path`, oldest first, so the capacity bound holds.
    /// Returns the number of entries kept.
    pub fn load_from(&self, path: &Path) -> AppResult<usize> {
        let content = fs::read_to_string(path)?;
        let loaded: HashMap<String, CacheEntry<V>> = serde_json::from_str(&content)?;
        let mut ordered: Vec<(String, CacheEntry<V>)> = loaded.into_iter().collect();
        ordered.sort_by(|(_, a), (_, b)| (a.created_at, a.seq).cmp(&(b.created_at, b.seq)));
        for (key, entry) in ordered {
            self.insert_entry(key, entry);
        }
        Ok(self.len())
    }
}

// ============================================================================
// Classification cache
// ============================================================================

/// Normalized question → classification.
pub struct ClassificationCache {
    inner: BoundedCache<Classification>,
}

impl ClassificationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: BoundedCache::new(capacity),
        }
    }

    pub fn get(&self, question: &str) -> Option<Classification> {
        self.inner.get(&normalize_question(question))
    }

    pub fn insert(&self, question: &str, classification: Classification) {
        let key = normalize_question(question);
        if !key.is_empty() {
            self.inner.insert(key, classification);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        self.inner.save_to(path)
    }

    pub fn load_from(&self, path: &Path) -> AppResult<usize> {
        self.inner.load_from(path)
    }
}

impl Default for ClassificationCache {
    fn default() -> Self {
        Self::new(CacheSettings::default().classification_capacity)
    }
}

// ============================================================================
// Answer cache
// ============================================================================

/// Normalized question → final answer text, for questions whose answer
/// does not depend on who is asking about whom or when.
pub struct AnswerCache {
    inner: BoundedCache<String>,
    enabled: bool,
    patterns: Vec<Regex>,
    relative_time_words: Vec<String>,
}

impl AnswerCache {
    pub fn from_settings(settings: &CacheSettings) -> AppResult<Self> {
        let patterns = settings
            .non_cacheable_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| AppError::config(format!("non-cacheable pattern {}: {}", p, e)))
            })
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Self {
            inner: BoundedCache::new(settings.answer_capacity),
            enabled: settings.answer_cache_enabled,
            patterns,
            relative_time_words: settings.relative_time_words.clone(),
        })
    }

    /// Whether answers to `question` may be stored and served.
    pub fn is_cacheable(&self, question: &str) -> bool {
        self.enabled
            && !normalize_question(question).is_empty()
            && !self.patterns.iter().any(|re| re.is_match(question))
            && !self
                .relative_time_words
                .iter()
                .any(|w| question.contains(w.as_str()))
    }

    pub fn get(&self, question: &str) -> Option<String> {
        if !self.is_cacheable(question) {
            return None;
        }
        self.inner.get(&normalize_question(question))
    }

    /// Store an answer. Returns whether it was stored.
    pub fn insert(&self, question: &str, answer: &str) -> bool {
        if !self.is_cacheable(question) || answer.trim().is_empty() {
            return false;
        }
        self.inner.insert(normalize_question(question), answer.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        self.inner.save_to(path)
    }

    pub fn load_from(&self, path: &Path) -> AppResult<usize> {
        self.inner.load_from(path)
    }
}

impl Default for AnswerCache {
    fn default() -> Self {
        let settings = CacheSettings::default();
        Self {
            inner: BoundedCache::new(settings.answer_capacity),
            enabled: true,
            patterns: settings
                .non_cacheable_patterns
                .iter()
                .filter_map(|p| Regex::new(p).ok())
                .collect(),
            relative_time_words: settings.relative_time_words,
        }
    }
}
