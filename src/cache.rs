use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("Cache lock error: {0}")]
    LockError(String),
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),
}

/// Trims and lowercases a lookup key, so " Pikachu" and "pikachu" share an entry.
pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

// Entries never expire: the upstream data set is read-only.
pub trait CacheTrait<T>: Send + Sync
where
    T: Clone + Send + Sync,
{
    fn get(&self, key: &str) -> Option<T>;
    fn insert(&self, key: &str, value: T) -> Result<(), CacheError>;
    fn remove(&self, key: &str) -> Option<T>;
    fn clear(&self);
    fn size(&self) -> usize;
    fn hit_rate(&self) -> f64;
}

// Statistics for cache monitoring
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub removes: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

/// Process-lifetime memoization table keyed by normalized strings.
pub struct InmemoryCache<T>
where
    T: Clone + Send + Sync,
{
    name: &'static str,
    store: Arc<Mutex<HashMap<String, T>>>,
    stats: Arc<Mutex<CacheStats>>,
}

impl<T> InmemoryCache<T>
where
    T: Clone + Send + Sync,
{
    pub fn new(name: &'static str) -> Self {
        tracing::debug!("Initializing in-memory cache: {}", name);

        Self {
            name,
            store: Arc::new(Mutex::new(HashMap::new())),
            stats: Arc::new(Mutex::new(CacheStats::default())),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn stats(&self) -> Option<CacheStats> {
        self.stats.lock().ok().map(|stats| stats.clone())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        let key = normalize_key(key);
        if let Ok(store) = self.store.lock() {
            store.contains_key(&key)
        } else {
            false
        }
    }

    pub fn keys(&self) -> Vec<String> {
        if let Ok(store) = self.store.lock() {
            let mut keys: Vec<String> = store.keys().cloned().collect();
            keys.sort();
            keys
        } else {
            Vec::new()
        }
    }

    fn record(&self, update: impl FnOnce(&mut CacheStats)) {
        if let Ok(mut stats) = self.stats.lock() {
            update(&mut stats);
        }
    }
}

impl<T> CacheTrait<T> for InmemoryCache<T>
where
    T: Clone + Send + Sync,
{
    fn get(&self, key: &str) -> Option<T> {
        let key = normalize_key(key);
        if key.is_empty() {
            tracing::warn!("Attempted to get {} cache entry with empty key", self.name);
            return None;
        }

        match self.store.lock() {
            Ok(store) => {
                if let Some(value) = store.get(&key) {
                    tracing::debug!("Cache hit in {} for key: {}", self.name, key);
                    self.record(|stats| stats.hits += 1);
                    Some(value.clone())
                } else {
                    tracing::debug!("Cache miss in {} for key: {}", self.name, key);
                    self.record(|stats| stats.misses += 1);
                    None
                }
            }
            Err(e) => {
                tracing::error!("Failed to acquire cache read lock for key {}: {}", key, e);
                None
            }
        }
    }

    fn insert(&self, key: &str, value: T) -> Result<(), CacheError> {
        let key = normalize_key(key);
        if key.is_empty() {
            return Err(CacheError::InvalidKey("Key cannot be empty".to_string()));
        }

        match self.store.lock() {
            Ok(mut store) => {
                let was_present = store.insert(key.clone(), value).is_some();

                if was_present {
                    tracing::debug!("Updated existing entry in {}: {}", self.name, key);
                } else {
                    tracing::debug!("Inserted new entry into {}: {}", self.name, key);
                }

                self.record(|stats| stats.inserts += 1);
                Ok(())
            }
            Err(e) => {
                let error_msg = format!("Failed to acquire cache write lock: {}", e);
                tracing::error!("{}", error_msg);
                Err(CacheError::LockError(error_msg))
            }
        }
    }

    fn remove(&self, key: &str) -> Option<T> {
        let key = normalize_key(key);
        if key.is_empty() {
            tracing::warn!("Attempted to remove {} cache entry with empty key", self.name);
            return None;
        }

        match self.store.lock() {
            Ok(mut store) => {
                let removed = store.remove(&key);
                if removed.is_some() {
                    tracing::debug!("Removed entry from {}: {}", self.name, key);
                    self.record(|stats| stats.removes += 1);
                }
                removed
            }
            Err(e) => {
                tracing::error!(
                    "Failed to acquire cache write lock for removal of key {}: {}",
                    key,
                    e
                );
                None
            }
        }
    }

    fn clear(&self) {
        match self.store.lock() {
            Ok(mut store) => {
                let size = store.len();
                store.clear();
                tracing::info!("Cleared {} cache ({} entries)", self.name, size);
                self.record(|stats| *stats = CacheStats::default());
            }
            Err(e) => {
                tracing::error!("Failed to acquire cache write lock for clearing: {}", e);
            }
        }
    }

    fn size(&self) -> usize {
        match self.store.lock() {
            Ok(store) => store.len(),
            Err(_) => 0,
        }
    }

    fn hit_rate(&self) -> f64 {
        match self.stats.lock() {
            Ok(stats) => stats.hit_rate(),
            Err(_) => 0.0,
        }
    }
}
