use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::DraftStore;
use super::types::{Draft, DraftKey};

/// Process-lifetime draft map. Applies no normalization of its own.
#[derive(Debug, Default)]
pub struct InMemoryDraftStore {
    drafts: Mutex<HashMap<DraftKey, Draft>>,
}

impl InMemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn drafts(&self) -> MutexGuard<'_, HashMap<DraftKey, Draft>> {
        // A panicking writer leaves the map itself consistent, so keep serving it.
        self.drafts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DraftStore for InMemoryDraftStore {
    fn get(&self, key: &DraftKey) -> Option<Draft> {
        self.drafts().get(key).cloned()
    }

    fn set(&self, key: DraftKey, draft: Draft) {
        self.drafts().insert(key, draft);
    }

    fn remove(&self, key: &DraftKey) -> Option<Draft> {
        self.drafts().remove(key)
    }

    fn keys(&self) -> Vec<DraftKey> {
        self.drafts().keys().copied().collect()
    }

    fn len(&self) -> usize {
        self.drafts().len()
    }
}
