//! Relation query results, remembered per chain tip.
//!
//! Blocks never change once written, so a result computed by replay from a
//! given tip stays correct for as long as that block is the tip. The cache
//! holds entries for one tip at a time and drops them all when the tip moves.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use medchain_core::{BlockId, TxType};

use crate::relation::{QueryMode, RelationQuery, RelationView};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    identifier: String,
    id_field: String,
    relation: TxType,
    mode: QueryMode,
}

impl From<&RelationQuery<'_>> for CacheKey {
    fn from(query: &RelationQuery<'_>) -> Self {
        Self {
            identifier: query.identifier.to_string(),
            id_field: query.id_field.to_string(),
            relation: query.relation,
            mode: query.mode,
        }
    }
}

#[derive(Debug, Default)]
struct CacheInner {
    tip: Option<BlockId>,
    entries: HashMap<CacheKey, RelationView>,
}

#[derive(Debug, Default)]
pub struct RelationCache {
    inner: Mutex<CacheInner>,
}

impl RelationCache {
    pub fn new() -> Self {
        Self::default()
    }

    // Entries are plain values, so a poisoned lock still holds usable data.
    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, tip: &BlockId, query: &RelationQuery<'_>) -> Option<RelationView> {
        let inner = self.lock();
        if inner.tip.as_ref() != Some(tip) {
            return None;
        }
        inner.entries.get(&CacheKey::from(query)).cloned()
    }

    pub fn insert(&self, tip: BlockId, query: &RelationQuery<'_>, view: RelationView) {
        let mut inner = self.lock();
        if inner.tip != Some(tip) {
            inner.entries.clear();
            inner.tip = Some(tip);
        }
        inner.entries.insert(CacheKey::from(query), view);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().entries.len()
    }
}
