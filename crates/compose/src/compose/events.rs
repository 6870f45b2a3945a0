use notecraft_drafts::{DraftKey, NoteId};
use serde::{Deserialize, Serialize};

/// Protocol kind of a published note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum NoteKind {
    #[default]
    Text,
    Chat,
}

impl NoteKind {
    pub const fn as_u32(self) -> u32 {
        match self {
            Self::Text => 1,
            Self::Chat => 42,
        }
    }
}

impl From<NoteKind> for u32 {
    fn from(value: NoteKind) -> Self {
        value.as_u32()
    }
}

impl TryFrom<u32> for NoteKind {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Text),
            42 => Ok(Self::Chat),
            other => Err(format!("unsupported note kind {other}")),
        }
    }
}

/// Reference attached to a post by the caller. Never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferencedId {
    pub ref_id: String,
    #[serde(default)]
    pub relay_id: Option<String>,
    pub key: String,
}

impl ReferencedId {
    pub fn new(key: impl Into<String>, ref_id: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
            relay_id: None,
            key: key.into(),
        }
    }

    pub fn with_relay(mut self, relay_id: impl Into<String>) -> Self {
        self.relay_id = Some(relay_id.into());
        self
    }
}

/// Post handed to the networking layer once a session submits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub content: String,
    pub references: Vec<ReferencedId>,
    pub kind: NoteKind,
}

/// Payload of the `post` channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "post", rename_all = "snake_case")]
pub enum ComposeResult {
    Submitted(NewPost),
    Cancelled,
}

/// Metadata about the note being replied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplyTarget {
    pub id: NoteId,
    /// `None` when the target's kind is not one this core knows.
    pub known_kind: Option<NoteKind>,
}

impl ReplyTarget {
    pub const fn new(id: NoteId, known_kind: Option<NoteKind>) -> Self {
        Self { id, known_kind }
    }

    /// Kind a reply to this target is published with.
    pub fn reply_kind(&self) -> NoteKind {
        match self.known_kind {
            Some(NoteKind::Chat) => NoteKind::Chat,
            Some(NoteKind::Text) | None => NoteKind::Text,
        }
    }
}

/// Payload of the `reply` channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRequest {
    pub target: ReplyTarget,
    pub references: Vec<ReferencedId>,
}

/// What a compose session is opened for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComposeRequest {
    pub target: Option<ReplyTarget>,
    pub references: Vec<ReferencedId>,
}

impl ComposeRequest {
    pub fn new_post(references: Vec<ReferencedId>) -> Self {
        Self {
            target: None,
            references,
        }
    }

    pub fn reply(target: ReplyTarget, references: Vec<ReferencedId>) -> Self {
        Self {
            target: Some(target),
            references,
        }
    }

    pub fn draft_key(&self) -> DraftKey {
        DraftKey::from(self.target.map(|target| target.id))
    }
}

impl From<ReplyRequest> for ComposeRequest {
    fn from(value: ReplyRequest) -> Self {
        Self::reply(value.target, value.references)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_chat_targets_produce_chat_replies() {
        let id = NoteId::new([3; 32]);
        assert_eq!(
            ReplyTarget::new(id, Some(NoteKind::Chat)).reply_kind(),
            NoteKind::Chat
        );
        assert_eq!(
            ReplyTarget::new(id, Some(NoteKind::Text)).reply_kind(),
            NoteKind::Text
        );
        assert_eq!(ReplyTarget::new(id, None).reply_kind(), NoteKind::Text);
    }

    #[test]
    fn submitted_post_serializes_with_protocol_kind_numbers() {
        let result = ComposeResult::Submitted(NewPost {
            content: "gm".to_string(),
            references: vec![ReferencedId::new("e", "abc").with_relay("wss://relay.example")],
            kind: NoteKind::Chat,
        });

        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["type"], "submitted");
        assert_eq!(json["post"]["kind"], 42);
        assert_eq!(json["post"]["references"][0]["relay_id"], "wss://relay.example");
        assert_eq!(
            serde_json::to_value(ComposeResult::Cancelled).expect("serialize")["type"],
            "cancelled"
        );
    }

    #[test]
    fn reply_request_opens_the_reply_draft() {
        let target = ReplyTarget::new(NoteId::new([9; 32]), None);
        let request = ComposeRequest::from(ReplyRequest {
            target,
            references: Vec::new(),
        });
        assert_eq!(request.draft_key(), DraftKey::Reply(target.id));
        assert_eq!(ComposeRequest::default().draft_key(), DraftKey::Root);
    }
}
