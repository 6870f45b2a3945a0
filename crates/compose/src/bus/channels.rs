use notecraft_drafts::{NoteId, PubkeyId};

use crate::compose::{ComposeResult, ReplyRequest};

/// A named bus channel and the payload type it carries.
///
/// Names are process-wide and must never collide; the bus rejects two
/// declarations that share a name but disagree on the payload.
pub trait Channel: 'static {
    const NAME: &'static str;
    type Payload: 'static;
}

macro_rules! declare_channel {
    ($(#[$meta:meta])* $name:ident, $wire_name:literal, $payload:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {}

        impl Channel for $name {
            const NAME: &'static str = $wire_name;
            type Payload = $payload;
        }
    };
}

declare_channel!(
    /// Outcome of a compose session, submitted or cancelled.
    Post,
    "send post",
    ComposeResult
);
declare_channel!(
    /// Request to open a reply compose session.
    Reply,
    "reply",
    ReplyRequest
);
declare_channel!(SelectEvent, "select_event", NoteId);
declare_channel!(SelectQuote, "select quote", NoteId);
declare_channel!(OpenThread, "open thread", NoteId);
declare_channel!(ThreadFocus, "thread focus", NoteId);
declare_channel!(BroadcastEvent, "broadcast event", NoteId);
declare_channel!(Boost, "boost post", NoteId);
declare_channel!(ClickProfilePic, "click_profile_pic", PubkeyId);
declare_channel!(
    /// Payload is the name of the timeline switched to.
    SwitchedTimeline,
    "switched_timeline",
    String
);
// The wire name is an opaque identifier; it is kept exactly as hosts already use it.
declare_channel!(ScrollToTop, "scroll_to_to", ());

pub const ALL_CHANNEL_NAMES: [&str; 11] = [
    Post::NAME,
    Reply::NAME,
    SelectEvent::NAME,
    SelectQuote::NAME,
    OpenThread::NAME,
    ThreadFocus::NAME,
    BroadcastEvent::NAME,
    Boost::NAME,
    ClickProfilePic::NAME,
    SwitchedTimeline::NAME,
    ScrollToTop::NAME,
];
