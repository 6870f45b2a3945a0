use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use notecraft_drafts::{Draft, DraftKey, DraftStore, PubkeyId};
use snafu::ResultExt;
use uuid::Uuid;

use super::context::{ComposeContext, MentionSearch, ProfileLookup};
use super::error::{DraftSnafu, RejectedSnafu, SessionResult};
use super::events::{ComposeRequest, ComposeResult, NewPost, NoteKind, ReferencedId, ReplyTarget};
use super::focus::FocusTimer;
use super::guard::PrivateKeyGuard;
use super::mention::{MENTION_PREFIX, extract_mention_token, mention_token_range};
use super::state::{ComposeState, ComposeTransition};
use crate::bus::{EventBus, Post};

/// Correlates the log lines of one compose session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComposeSessionId(pub Uuid);

impl ComposeSessionId {
    pub fn new_v7() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for ComposeSessionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Answer to the "post anyway?" prompt raised for suspected secret keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Confirmation {
    PostAnyway,
    KeepEditing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Buffer is blank; nothing happened.
    Unavailable,
    /// Content looks like it carries a secret key; waiting on [`Confirmation`].
    AwaitingConfirmation,
    KeptEditing,
    Submitted(NewPost),
}

/// One compose interaction, from open to close.
pub struct ComposeSession {
    id: ComposeSessionId,
    key: DraftKey,
    target: Option<ReplyTarget>,
    references: Vec<ReferencedId>,
    buffer: Draft,
    state: ComposeState,
    mention_token: Option<String>,
    bus: EventBus,
    drafts: Arc<dyn DraftStore>,
    guard: PrivateKeyGuard,
    mention_search: Arc<dyn MentionSearch>,
    focus_timer: Option<FocusTimer>,
}

impl ComposeSession {
    /// Opens a session, restoring the stored draft for the request's target.
    ///
    /// Must run inside a tokio runtime, which hosts the deferred focus action.
    pub fn open(context: &ComposeContext, request: ComposeRequest) -> SessionResult<Self> {
        let id = ComposeSessionId::new_v7();
        let key = request.draft_key();
        let stored = context.drafts.get(&key);

        if stored.is_none()
            && !key.is_root()
            && context
                .drafts
                .get(&DraftKey::Root)
                .is_some_and(|root| !root.is_blank())
        {
            // Root and reply drafts are independent; the pending root draft stays as is.
            tracing::debug!(
                session_id = %id,
                draft_key = %key,
                "opening reply while a root draft is pending"
            );
        }

        let restored = stored.is_some();
        let mut buffer = stored.unwrap_or_default();
        buffer.normalize_links();
        let focus_timer = FocusTimer::schedule(context.focus_delay, context.focus.clone())?;

        let mut session = Self {
            id,
            key,
            target: request.target,
            references: request.references,
            buffer,
            state: ComposeState::Opening,
            mention_token: None,
            bus: context.bus.clone(),
            drafts: context.drafts.clone(),
            guard: context.guard.clone(),
            mention_search: context.mention_search.clone(),
            focus_timer: Some(focus_timer),
        };
        session.transition(ComposeTransition::Opened, "open")?;
        session.refresh_mention();

        tracing::debug!(
            session_id = %session.id,
            draft_key = %session.key,
            restored,
            "compose session opened"
        );
        Ok(session)
    }

    pub fn id(&self) -> ComposeSessionId {
        self.id
    }

    pub fn draft_key(&self) -> DraftKey {
        self.key
    }

    pub fn target(&self) -> Option<&ReplyTarget> {
        self.target.as_ref()
    }

    pub fn references(&self) -> &[ReferencedId] {
        &self.references
    }

    pub fn state(&self) -> ComposeState {
        self.state
    }

    pub fn buffer(&self) -> &Draft {
        &self.buffer
    }

    pub fn text(&self) -> &str {
        self.buffer.text()
    }

    /// Partial handle currently offered to user search.
    pub fn mention_token(&self) -> Option<&str> {
        self.mention_token.as_deref()
    }

    pub fn can_submit(&self) -> bool {
        self.state.accepts_edits() && !self.buffer.is_blank()
    }

    pub fn shows_placeholder(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn focus_pending(&self) -> bool {
        self.focus_timer
            .as_ref()
            .is_some_and(FocusTimer::is_pending)
    }

    /// Replaces the buffer with `draft`, normalizing links and writing it through to the store.
    pub fn edit(&mut self, mut draft: Draft) -> SessionResult<()> {
        self.transition(ComposeTransition::Edit, "edit")?;

        let normalized = draft.normalize_links();
        if normalized > 0 {
            tracing::trace!(
                session_id = %self.id,
                normalized,
                "link spans rewritten to literal urls"
            );
        }

        self.drafts.set(self.key, draft.clone());
        self.buffer = draft;
        self.refresh_mention();
        Ok(())
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> SessionResult<()> {
        self.edit(Draft::plain(text))
    }

    pub fn replace_range(&mut self, range: Range<usize>, replacement: &str) -> SessionResult<()> {
        self.edit_buffer("replace-range", |draft| draft.replace_range(range, replacement))
    }

    pub fn insert_text(&mut self, at: usize, text: &str) -> SessionResult<()> {
        self.edit_buffer("insert-text", |draft| draft.insert_text(at, text))
    }

    pub fn insert_link(&mut self, at: usize, label: &str, url: &str) -> SessionResult<()> {
        self.edit_buffer("insert-link", |draft| draft.insert_link(at, label, url))
    }

    /// Swaps the `@handle` being typed for a link to `pubkey`.
    ///
    /// Returns false when the buffer has no mention in progress.
    pub fn complete_mention(
        &mut self,
        pubkey: &PubkeyId,
        profiles: &dyn ProfileLookup,
    ) -> SessionResult<bool> {
        self.check(ComposeTransition::Edit, "complete-mention")?;
        let Some(range) = mention_token_range(self.buffer.text()) else {
            return Ok(false);
        };

        let name = profiles
            .display_name(pubkey)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| abbreviate_pubkey(pubkey));
        let label = format!("{MENTION_PREFIX}{name}");
        let url = format!("{MENTION_PREFIX}{pubkey}");

        let start = range.start;
        self.edit_buffer("complete-mention", |draft| {
            draft.replace_range(range, "")?;
            draft.insert_link(start, &label, url)?;
            draft.insert_text(start + label.len(), " ")
        })?;
        Ok(true)
    }

    /// User pressed "post".
    pub fn request_submit(&mut self) -> SessionResult<SubmitOutcome> {
        self.transition(ComposeTransition::RequestSubmit, "request-submit")?;

        if self.buffer.is_blank() {
            tracing::debug!(session_id = %self.id, "submit unavailable for blank draft");
            return Ok(SubmitOutcome::Unavailable);
        }

        if self.guard.contains_leaked_secret(self.buffer.trimmed()) {
            self.transition(ComposeTransition::FlagSecret, "request-submit")?;
            tracing::info!(
                session_id = %self.id,
                "submission paused: content appears to contain a secret key"
            );
            return Ok(SubmitOutcome::AwaitingConfirmation);
        }

        self.finalize(ComposeTransition::Finalize, "request-submit")
            .map(SubmitOutcome::Submitted)
    }

    /// Resolves the secret-key prompt.
    pub fn confirm(&mut self, confirmation: Confirmation) -> SessionResult<SubmitOutcome> {
        match confirmation {
            Confirmation::KeepEditing => {
                self.transition(ComposeTransition::KeepEditing, "confirm")?;
                Ok(SubmitOutcome::KeptEditing)
            }
            Confirmation::PostAnyway => {
                tracing::warn!(
                    session_id = %self.id,
                    "posting content that appears to contain a secret key"
                );
                self.finalize(ComposeTransition::PostAnyway, "confirm")
                    .map(SubmitOutcome::Submitted)
            }
        }
    }

    /// Explicit cancel. Publishes `Cancelled`; a non-blank draft is kept for next time.
    pub fn cancel(&mut self) -> SessionResult<()> {
        self.transition(ComposeTransition::Cancel, "cancel")?;
        self.publish(ComposeResult::Cancelled);
        tracing::info!(session_id = %self.id, draft_key = %self.key, "compose cancelled");
        self.shutdown();
        Ok(())
    }

    /// Dismisses the session. Safe to call any number of times.
    pub fn close(&mut self) {
        // `Close` is accepted from every state.
        let _ = self.transition(ComposeTransition::Close, "close");
        self.shutdown();
    }

    fn finalize(
        &mut self,
        transition: ComposeTransition,
        stage: &'static str,
    ) -> SessionResult<NewPost> {
        self.transition(transition, stage)?;

        let kind = self
            .target
            .as_ref()
            .map_or(NoteKind::Text, ReplyTarget::reply_kind);
        let post = NewPost {
            content: self.buffer.trimmed().to_string(),
            references: self.references.clone(),
            kind,
        };
        self.publish(ComposeResult::Submitted(post.clone()));

        match self.key {
            // Reset, not removed: an empty root entry marks "just submitted".
            DraftKey::Root => self.drafts.set(DraftKey::Root, Draft::new()),
            DraftKey::Reply(_) => {
                self.drafts.remove(&self.key);
            }
        }

        tracing::info!(
            session_id = %self.id,
            draft_key = %self.key,
            kind = kind.as_u32(),
            reference_count = post.references.len(),
            "post submitted"
        );
        self.close();
        Ok(post)
    }

    fn publish(&self, result: ComposeResult) {
        if let Err(error) = self.bus.publish::<Post>(&result) {
            tracing::warn!(
                session_id = %self.id,
                error = %error,
                "compose result was not delivered"
            );
        }
    }

    fn shutdown(&mut self) {
        if let Some(mut timer) = self.focus_timer.take()
            && timer.cancel()
        {
            tracing::debug!(session_id = %self.id, "pending focus cancelled by close");
        }
        close_cleanup(self.drafts.as_ref(), self.key);
    }

    fn edit_buffer<F>(&mut self, stage: &'static str, apply: F) -> SessionResult<()>
    where
        F: FnOnce(&mut Draft) -> notecraft_drafts::DraftResult<()>,
    {
        self.check(ComposeTransition::Edit, stage)?;
        let mut draft = self.buffer.clone();
        apply(&mut draft).context(DraftSnafu { stage })?;
        self.edit(draft)
    }

    fn refresh_mention(&mut self) {
        let token = extract_mention_token(self.buffer.text()).map(str::to_owned);
        if token != self.mention_token {
            tracing::trace!(session_id = %self.id, token = ?token, "mention token changed");
        }
        self.mention_search.update(token.as_deref());
        self.mention_token = token;
    }

    fn check(&self, transition: ComposeTransition, stage: &'static str) -> SessionResult<()> {
        self.state
            .apply(transition)
            .context(RejectedSnafu { stage })?;
        Ok(())
    }

    fn transition(
        &mut self,
        transition: ComposeTransition,
        stage: &'static str,
    ) -> SessionResult<ComposeState> {
        let next = match self.state.apply(transition) {
            Ok(next) => next,
            Err(rejection) => {
                tracing::debug!(
                    session_id = %self.id,
                    state = %self.state,
                    rejection = %rejection,
                    "compose transition rejected"
                );
                return Err(rejection).context(RejectedSnafu { stage });
            }
        };

        if next != self.state {
            tracing::debug!(
                session_id = %self.id,
                from = %self.state,
                to = %next,
                transition = %transition,
                "compose state changed"
            );
        }
        self.state = next;
        Ok(next)
    }
}

impl Drop for ComposeSession {
    fn drop(&mut self) {
        if !self.state.is_closed() {
            tracing::debug!(session_id = %self.id, "compose session dismissed");
            self.close();
        }
    }
}

impl fmt::Debug for ComposeSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ComposeSession")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("state", &self.state)
            .field("buffer", &self.buffer)
            .field("mention_token", &self.mention_token)
            .finish_non_exhaustive()
    }
}

/// Drops the blank draft a closing session leaves behind.
///
/// Reply drafts are removed; the root draft is reset to empty. Running it
/// again changes nothing.
pub fn close_cleanup(drafts: &dyn DraftStore, key: DraftKey) {
    let Some(draft) = drafts.get(&key) else {
        return;
    };
    if !draft.is_blank() {
        return;
    }

    match key {
        DraftKey::Root => {
            if !draft.is_empty() {
                drafts.set(DraftKey::Root, Draft::new());
            }
        }
        DraftKey::Reply(_) => {
            drafts.remove(&key);
        }
    }
}

fn abbreviate_pubkey(pubkey: &PubkeyId) -> String {
    let hex = pubkey.to_hex();
    format!("{}:{}", &hex[..8], &hex[hex.len() - 8..])
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use notecraft_drafts::{InMemoryDraftStore, LinkSpan, NoteId};

    use super::*;
    use crate::compose::{ComposeError, ComposeTransitionRejection, InputFocus};

    const VALID_NSEC: &str = "nsec1vl029mgpspedva04g90vltkh6fvh240zqtv9k0t9af8935ke9laqsnlfe5";

    #[derive(Default)]
    struct RecordingSearch {
        tokens: Mutex<Vec<Option<String>>>,
    }

    impl MentionSearch for RecordingSearch {
        fn update(&self, token: Option<&str>) {
            if let Ok(mut tokens) = self.tokens.lock() {
                tokens.push(token.map(str::to_owned));
            }
        }
    }

    #[derive(Default)]
    struct CountingFocus {
        calls: AtomicUsize,
    }

    impl InputFocus for CountingFocus {
        fn focus(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Profiles;

    impl ProfileLookup for Profiles {
        fn display_name(&self, pubkey: &PubkeyId) -> Option<String> {
            (pubkey.as_bytes()[0] == 0xaa).then(|| "alice".to_string())
        }
    }

    struct Harness {
        context: ComposeContext,
        drafts: Arc<InMemoryDraftStore>,
        posts: Rc<RefCell<Vec<ComposeResult>>>,
    }

    impl Harness {
        fn new() -> Self {
            let drafts = Arc::new(InMemoryDraftStore::new());
            let context = ComposeContext::new(EventBus::new(), drafts.clone());
            let posts = Rc::new(RefCell::new(Vec::new()));
            let sink = posts.clone();
            context
                .bus
                .subscribe::<Post, _>(move |result| sink.borrow_mut().push(result.clone()))
                .expect("subscribe to post");

            Self {
                context,
                drafts,
                posts,
            }
        }

        fn open(&self, request: ComposeRequest) -> ComposeSession {
            ComposeSession::open(&self.context, request).expect("open session")
        }

        fn posts(&self) -> Vec<ComposeResult> {
            self.posts.borrow().clone()
        }
    }

    fn reply_target(byte: u8, known_kind: Option<NoteKind>) -> ReplyTarget {
        ReplyTarget::new(NoteId::new([byte; 32]), known_kind)
    }

    #[tokio::test]
    async fn reopening_restores_the_stored_reply_draft() {
        let harness = Harness::new();
        let target = reply_target(1, None);

        let mut first = harness.open(ComposeRequest::reply(target, Vec::new()));
        first.set_text("half written").expect("edit");
        first.close();

        let second = harness.open(ComposeRequest::reply(target, Vec::new()));
        assert_eq!(second.text(), "half written");
        assert_eq!(second.state(), ComposeState::Editing);
        assert!(!second.shows_placeholder());
    }

    #[tokio::test]
    async fn opening_a_reply_leaves_the_root_draft_alone() {
        let harness = Harness::new();
        harness
            .drafts
            .set(DraftKey::Root, Draft::plain("root thoughts"));

        let session = harness.open(ComposeRequest::reply(reply_target(2, None), Vec::new()));

        assert!(session.shows_placeholder());
        assert_eq!(
            harness.drafts.get(&DraftKey::Root),
            Some(Draft::plain("root thoughts"))
        );
    }

    #[tokio::test]
    async fn every_edit_is_normalized_and_written_through() {
        let harness = Harness::new();
        let mut session = harness.open(ComposeRequest::default());

        let draft = Draft::with_links(
            "read this now",
            vec![LinkSpan::new(5..9, "https://example.com/post")],
        )
        .expect("valid span");
        session.edit(draft).expect("edit");

        let expected = Draft::plain("read https://example.com/post now");
        assert_eq!(session.buffer(), &expected);
        assert_eq!(harness.drafts.get(&DraftKey::Root), Some(expected));

        session.insert_text(0, "pls ").expect("insert");
        assert_eq!(
            harness.drafts.get(&DraftKey::Root).map(|draft| draft.text().to_string()),
            Some("pls read https://example.com/post now".to_string())
        );
    }

    #[tokio::test]
    async fn mention_token_follows_each_edit() {
        let search = Arc::new(RecordingSearch::default());
        let mut harness = Harness::new();
        harness.context = harness.context.clone().with_mention_search(search.clone());
        let mut session = harness.open(ComposeRequest::default());

        session.set_text("hi @al").expect("edit");
        assert_eq!(session.mention_token(), Some("al"));
        session.set_text("hi @al ok").expect("edit");
        assert_eq!(session.mention_token(), Some("al"));
        session.set_text("hi").expect("edit");
        assert_eq!(session.mention_token(), None);

        let tokens = search.tokens.lock().expect("tokens").clone();
        assert_eq!(
            tokens,
            vec![
                None,
                Some("al".to_string()),
                Some("al".to_string()),
                None
            ]
        );
    }

    #[tokio::test]
    async fn blank_buffer_cannot_be_submitted() {
        let harness = Harness::new();
        let mut session = harness.open(ComposeRequest::default());
        session.set_text(" \n\t").expect("edit");

        assert!(!session.can_submit());
        assert_eq!(
            session.request_submit().expect("request"),
            SubmitOutcome::Unavailable
        );
        assert_eq!(session.state(), ComposeState::Editing);
        assert!(harness.posts().is_empty());
    }

    #[tokio::test]
    async fn submitting_a_reply_publishes_and_removes_its_draft() {
        let harness = Harness::new();
        let target = reply_target(3, Some(NoteKind::Chat));
        let references = vec![ReferencedId::new("e", "abc"), ReferencedId::new("p", "def")];
        let mut session = harness.open(ComposeRequest::reply(target, references.clone()));

        session.set_text("  see you there \n").expect("edit");
        let outcome = session.request_submit().expect("submit");

        let expected = NewPost {
            content: "see you there".to_string(),
            references,
            kind: NoteKind::Chat,
        };
        assert_eq!(outcome, SubmitOutcome::Submitted(expected.clone()));
        assert_eq!(harness.posts(), vec![ComposeResult::Submitted(expected)]);
        assert_eq!(harness.drafts.get(&DraftKey::Reply(target.id)), None);
        assert_eq!(session.state(), ComposeState::Closed);
    }

    #[tokio::test]
    async fn submitting_the_root_draft_resets_it_to_empty() {
        let harness = Harness::new();
        let mut session = harness.open(ComposeRequest::default());
        session.set_text("gm").expect("edit");

        let outcome = session.request_submit().expect("submit");

        assert!(matches!(
            outcome,
            SubmitOutcome::Submitted(NewPost {
                kind: NoteKind::Text,
                ..
            })
        ));
        assert_eq!(harness.drafts.get(&DraftKey::Root), Some(Draft::new()));
    }

    #[tokio::test]
    async fn suspected_secret_waits_for_explicit_confirmation() {
        let harness = Harness::new();
        let mut session = harness.open(ComposeRequest::default());
        session
            .set_text(format!("backup: {VALID_NSEC}"))
            .expect("edit");

        assert_eq!(
            session.request_submit().expect("submit"),
            SubmitOutcome::AwaitingConfirmation
        );
        assert_eq!(session.state(), ComposeState::AwaitingConfirmation);
        assert!(harness.posts().is_empty());

        // Edits are locked while the prompt is up.
        assert!(matches!(
            session.set_text("changed"),
            Err(ComposeError::Rejected {
                source: ComposeTransitionRejection::InvalidTransition { .. },
                ..
            })
        ));

        assert_eq!(
            session.confirm(Confirmation::KeepEditing).expect("keep editing"),
            SubmitOutcome::KeptEditing
        );
        assert_eq!(session.state(), ComposeState::Editing);
        assert!(harness.posts().is_empty());

        assert_eq!(
            session.request_submit().expect("submit again"),
            SubmitOutcome::AwaitingConfirmation
        );
        let outcome = session
            .confirm(Confirmation::PostAnyway)
            .expect("post anyway");

        assert!(matches!(outcome, SubmitOutcome::Submitted(_)));
        assert_eq!(harness.posts().len(), 1);
    }

    #[tokio::test]
    async fn confirmation_without_a_prompt_is_rejected() {
        let harness = Harness::new();
        let mut session = harness.open(ComposeRequest::default());
        session.set_text("hello").expect("edit");

        assert!(session.confirm(Confirmation::PostAnyway).is_err());
        assert!(harness.posts().is_empty());
    }

    #[tokio::test]
    async fn cancel_publishes_and_keeps_non_blank_drafts() {
        let harness = Harness::new();
        let target = reply_target(4, None);
        let mut session = harness.open(ComposeRequest::reply(target, Vec::new()));

        session.set_text("note one @xy").expect("edit");
        assert_eq!(session.mention_token(), Some("xy"));
        session.cancel().expect("cancel");

        assert_eq!(harness.posts(), vec![ComposeResult::Cancelled]);
        assert_eq!(
            harness.drafts.get(&DraftKey::Reply(target.id)),
            Some(Draft::plain("note one @xy"))
        );
        assert!(session.cancel().is_err());
    }

    #[tokio::test]
    async fn cancelling_a_whitespace_draft_removes_it() {
        let harness = Harness::new();
        let target = reply_target(5, None);
        let mut session = harness.open(ComposeRequest::reply(target, Vec::new()));

        session.set_text("   ").expect("edit");
        assert!(harness.drafts.get(&DraftKey::Reply(target.id)).is_some());
        session.cancel().expect("cancel");

        assert_eq!(harness.posts(), vec![ComposeResult::Cancelled]);
        assert_eq!(harness.drafts.get(&DraftKey::Reply(target.id)), None);
    }

    #[tokio::test]
    async fn dropping_an_open_session_runs_close_cleanup() {
        let harness = Harness::new();
        let target = reply_target(6, None);
        {
            let mut session = harness.open(ComposeRequest::reply(target, Vec::new()));
            session.set_text("\n").expect("edit");
        }

        assert_eq!(harness.drafts.get(&DraftKey::Reply(target.id)), None);
        assert!(harness.posts().is_empty());
    }

    #[tokio::test]
    async fn closed_sessions_reject_further_edits() {
        let harness = Harness::new();
        let mut session = harness.open(ComposeRequest::default());
        session.close();
        session.close();

        assert!(matches!(
            session.set_text("late"),
            Err(ComposeError::Rejected {
                source: ComposeTransitionRejection::SessionClosed { .. },
                ..
            })
        ));
        assert_eq!(harness.drafts.get(&DraftKey::Root), None);
    }

    #[test]
    fn close_cleanup_is_idempotent() {
        let drafts = InMemoryDraftStore::new();
        let reply = DraftKey::Reply(NoteId::new([7; 32]));
        drafts.set(reply, Draft::plain("  "));
        drafts.set(DraftKey::Root, Draft::plain(" \n"));

        for _ in 0..2 {
            close_cleanup(&drafts, reply);
            close_cleanup(&drafts, DraftKey::Root);
            assert_eq!(drafts.get(&reply), None);
            assert_eq!(drafts.get(&DraftKey::Root), Some(Draft::new()));
        }

        drafts.set(reply, Draft::plain("keep me"));
        close_cleanup(&drafts, reply);
        assert_eq!(drafts.get(&reply), Some(Draft::plain("keep me")));
    }

    #[tokio::test(start_paused = true)]
    async fn focus_is_deferred_and_cancelled_by_early_close() {
        let focus = Arc::new(CountingFocus::default());
        let mut harness = Harness::new();
        harness.context = harness.context.clone().with_focus(focus.clone());
        harness.context.focus_delay = Duration::from_millis(500);

        let opened = harness.open(ComposeRequest::default());
        assert!(opened.focus_pending());
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(focus.calls.load(Ordering::SeqCst), 1);

        let mut closed_early = harness.open(ComposeRequest::default());
        closed_early.close();
        assert!(!closed_early.focus_pending());
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(focus.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn picked_user_replaces_the_partial_mention() {
        let harness = Harness::new();
        let mut session = harness.open(ComposeRequest::default());
        session.set_text("thanks @al").expect("edit");

        let alice = PubkeyId::new([0xaa; 32]);
        assert!(
            session
                .complete_mention(&alice, &Profiles)
                .expect("complete mention")
        );

        assert_eq!(session.text(), format!("thanks @{alice} "));
        assert_eq!(session.mention_token(), None);
        assert!(session.buffer().links().is_empty());

        session.set_text("no mention").expect("edit");
        assert!(
            !session
                .complete_mention(&alice, &Profiles)
                .expect("nothing to complete")
        );
    }

    #[test]
    fn opening_outside_a_runtime_fails() {
        let context = ComposeContext::in_memory();
        assert!(matches!(
            ComposeSession::open(&context, ComposeRequest::default()),
            Err(ComposeError::NoRuntime { .. })
        ));
    }
}
