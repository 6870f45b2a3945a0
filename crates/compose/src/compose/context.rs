use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use notecraft_drafts::{DraftStore, InMemoryDraftStore, PubkeyId};

use super::focus::{DEFAULT_FOCUS_DELAY, InputFocus, NoInputFocus};
use super::guard::PrivateKeyGuard;
use crate::bus::EventBus;
use crate::settings::ComposeSettings;

/// Receives the partial mention after every edit; `None` hides the search UI.
pub trait MentionSearch: Send + Sync {
    fn update(&self, token: Option<&str>);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoMentionSearch;

impl MentionSearch for NoMentionSearch {
    fn update(&self, _token: Option<&str>) {}
}

/// Resolves display data for a public key.
pub trait ProfileLookup {
    fn display_name(&self, pubkey: &PubkeyId) -> Option<String>;
}

/// Shared collaborators every compose session is opened with.
#[derive(Clone)]
pub struct ComposeContext {
    pub bus: EventBus,
    pub drafts: Arc<dyn DraftStore>,
    pub guard: PrivateKeyGuard,
    pub mention_search: Arc<dyn MentionSearch>,
    pub focus: Arc<dyn InputFocus>,
    pub focus_delay: Duration,
}

impl ComposeContext {
    pub fn new(bus: EventBus, drafts: Arc<dyn DraftStore>) -> Self {
        Self {
            bus,
            drafts,
            guard: PrivateKeyGuard::default(),
            mention_search: Arc::new(NoMentionSearch),
            focus: Arc::new(NoInputFocus),
            focus_delay: DEFAULT_FOCUS_DELAY,
        }
    }

    /// Fresh bus and in-memory draft store.
    pub fn in_memory() -> Self {
        Self::new(EventBus::new(), Arc::new(InMemoryDraftStore::new()))
    }

    /// In-memory context with the bus depth, guard and focus delay taken from `settings`.
    pub fn from_settings(settings: &ComposeSettings) -> Self {
        Self::new(
            EventBus::with_max_depth(settings.max_dispatch_depth),
            Arc::new(InMemoryDraftStore::new()),
        )
        .with_settings(settings)
    }

    pub fn with_settings(mut self, settings: &ComposeSettings) -> Self {
        self.guard = PrivateKeyGuard::from_settings(&settings.secret_guard);
        self.focus_delay = settings.focus_delay();
        self
    }

    pub fn with_guard(mut self, guard: PrivateKeyGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_mention_search(mut self, mention_search: Arc<dyn MentionSearch>) -> Self {
        self.mention_search = mention_search;
        self
    }

    pub fn with_focus(mut self, focus: Arc<dyn InputFocus>) -> Self {
        self.focus = focus;
        self
    }
}

impl fmt::Debug for ComposeContext {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ComposeContext")
            .field("bus", &self.bus)
            .field("draft_count", &self.drafts.len())
            .field("focus_delay", &self.focus_delay)
            .finish_non_exhaustive()
    }
}
