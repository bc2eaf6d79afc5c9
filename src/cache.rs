//! Process-lifetime memo of query results.
//!
//! Entries are never evicted; the cache lives as long as its owner. Each key has its own
//! slot, and a miss is loaded while holding that slot's lock, so concurrent requests for
//! the same query wait for the first load instead of repeating it. Requests for other keys
//! proceed independently.

use crate::error::Error;
use crate::models::{Query, Table};
use ahash::AHashMap;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

/// Whatever turns a query into a table on a miss: in practice [`crate::Client`].
pub trait Loader {
    fn load(&self, query: &Query) -> Result<Table, Error>;
}

impl<L: Loader + ?Sized> Loader for &L {
    fn load(&self, query: &Query) -> Result<Table, Error> {
        (**self).load(query)
    }
}

/// A stored result and when it was fetched.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub table: Arc<Table>,
    pub created_at: DateTime<Utc>,
}

type Slot = Arc<Mutex<Option<CacheEntry>>>;

pub struct QueryCache<L> {
    loader: L,
    slots: Mutex<AHashMap<String, Slot>>,
}

impl<L: Loader> QueryCache<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            slots: Mutex::new(AHashMap::new()),
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Stored table for `query`, loading it on first use.
    ///
    /// A failed load stores nothing, so the next call tries again. Tables handed out are
    /// shared read-only snapshots.
    pub fn get_or_fetch(&self, query: &Query) -> Result<Arc<Table>, Error> {
        query.validate()?;
        let key = query.cache_key();
        let slot = self.slot(&key);

        let mut guard = slot.lock();
        if let Some(entry) = guard.as_ref() {
            log::debug!("cache hit: {key}");
            return Ok(Arc::clone(&entry.table));
        }

        log::debug!("cache miss: {key}");
        let table = Arc::new(self.loader.load(query)?);
        *guard = Some(CacheEntry {
            table: Arc::clone(&table),
            created_at: Utc::now(),
        });
        Ok(table)
    }

    /// Stored entry for `query`, without loading. Blocks while that key is being loaded.
    pub fn entry(&self, query: &Query) -> Option<CacheEntry> {
        let slot = self.slots.lock().get(&query.cache_key()).cloned()?;
        let guard = slot.lock();
        guard.clone()
    }

    pub fn peek(&self, query: &Query) -> Option<Arc<Table>> {
        self.entry(query).map(|e| e.table)
    }

    /// Number of stored results.
    pub fn len(&self) -> usize {
        let slots: Vec<Slot> = self.slots.lock().values().cloned().collect();
        slots.iter().filter(|s| s.lock().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: &str) -> Slot {
        let mut slots = self.slots.lock();
        Arc::clone(slots.entry(key.to_string()).or_default())
    }
}
