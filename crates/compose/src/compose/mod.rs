//! Compose sessions: draft restore, mention tracking, the secret-key gate and
//! the final `send post` publish.

pub mod context;
pub mod error;
pub mod events;
pub mod focus;
pub mod guard;
pub mod launcher;
pub mod mention;
pub mod session;
pub mod state;

pub use context::{ComposeContext, MentionSearch, NoMentionSearch, ProfileLookup};
pub use error::{ComposeError, SessionResult};
pub use events::{
    ComposeRequest, ComposeResult, NewPost, NoteKind, ReferencedId, ReplyRequest, ReplyTarget,
};
pub use focus::{DEFAULT_FOCUS_DELAY, FocusTimer, InputFocus, NoInputFocus};
pub use guard::{
    Nip19SecretRecognizer, PrivateKeyGuard, SecretRecognizer, contains_leaked_secret,
};
pub use launcher::ComposeLauncher;
pub use mention::{extract_mention_token, mention_token_range};
pub use session::{ComposeSession, ComposeSessionId, Confirmation, SubmitOutcome, close_cleanup};
pub use state::{ComposeState, ComposeTransition, ComposeTransitionRejection};
