pub mod error;
pub mod ids;
pub mod memory;
pub mod types;

pub use error::{DraftError, DraftResult};
pub use ids::{KEY_ID_LEN, NoteId, PubkeyId};
pub use memory::InMemoryDraftStore;
pub use types::{Draft, DraftKey, LinkSpan};

/// Keyed draft storage shared by every compose session.
///
/// Keeping the map free of blank entries is the caller's job; stores only hold what they are given.
pub trait DraftStore: Send + Sync {
    fn get(&self, key: &DraftKey) -> Option<Draft>;
    fn set(&self, key: DraftKey, draft: Draft);
    fn remove(&self, key: &DraftKey) -> Option<Draft>;
    fn keys(&self) -> Vec<DraftKey>;

    fn len(&self) -> usize {
        self.keys().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
