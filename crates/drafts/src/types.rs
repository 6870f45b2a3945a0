use std::fmt;
use std::ops::Range;

use snafu::ensure;

use super::error::{
    DraftResult, EmptySpanSnafu, OverlappingSpanSnafu, SpanNotOnCharBoundarySnafu,
    SpanOutOfBoundsSnafu,
};
use super::ids::NoteId;

/// Identity a draft is stored under.
///
/// `Root` is the fresh-post draft; every reply target gets its own entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DraftKey {
    #[default]
    Root,
    Reply(NoteId),
}

impl DraftKey {
    pub fn reply_target(&self) -> Option<NoteId> {
        match self {
            Self::Root => None,
            Self::Reply(id) => Some(*id),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Self::Root)
    }
}

impl From<Option<NoteId>> for DraftKey {
    fn from(value: Option<NoteId>) -> Self {
        value.map_or(Self::Root, Self::Reply)
    }
}

impl fmt::Display for DraftKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => write!(formatter, "root"),
            Self::Reply(id) => write!(formatter, "reply:{id}"),
        }
    }
}

/// Byte range of a draft rendered as a link to `url`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkSpan {
    pub range: Range<usize>,
    pub url: String,
}

impl LinkSpan {
    pub fn new(range: Range<usize>, url: impl Into<String>) -> Self {
        Self {
            range,
            url: url.into(),
        }
    }

    fn intersects(&self, range: &Range<usize>) -> bool {
        self.range.start < range.end && range.start < self.range.end
    }
}

/// Editable message buffer: plain text plus disjoint link spans ordered by start.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Draft {
    text: String,
    links: Vec<LinkSpan>,
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            links: Vec::new(),
        }
    }

    /// Builds a draft from text and spans, rejecting spans that break the layout invariant.
    pub fn with_links(text: impl Into<String>, links: Vec<LinkSpan>) -> DraftResult<Self> {
        let mut draft = Self::plain(text);
        for link in links {
            draft.add_link(link.range, link.url)?;
        }
        Ok(draft)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn links(&self) -> &[LinkSpan] {
        &self.links
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// True when the text holds nothing but whitespace (or nothing at all).
    pub fn is_blank(&self) -> bool {
        self.text.chars().all(char::is_whitespace)
    }

    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }

    pub fn add_link(&mut self, range: Range<usize>, url: impl Into<String>) -> DraftResult<()> {
        self.check_range(&range, "add-link")?;
        ensure!(
            range.start < range.end,
            EmptySpanSnafu {
                stage: "add-link",
                start: range.start,
                end: range.end,
            }
        );
        if let Some(existing) = self.links.iter().find(|link| link.intersects(&range)) {
            return OverlappingSpanSnafu {
                stage: "add-link",
                start: range.start,
                end: range.end,
                existing_start: existing.range.start,
                existing_end: existing.range.end,
            }
            .fail();
        }

        let position = self
            .links
            .partition_point(|link| link.range.start < range.start);
        self.links.insert(position, LinkSpan::new(range, url));
        Ok(())
    }

    /// Replaces `range` with `replacement`.
    ///
    /// Spans touched by the edit lose their link; spans after it shift with the text.
    pub fn replace_range(&mut self, range: Range<usize>, replacement: &str) -> DraftResult<()> {
        self.check_range(&range, "replace-range")?;

        let removed = range.end - range.start;
        self.links.retain(|link| !link.intersects(&range));
        for link in &mut self.links {
            if link.range.start >= range.end {
                link.range.start = link.range.start - removed + replacement.len();
                link.range.end = link.range.end - removed + replacement.len();
            }
        }
        self.text.replace_range(range, replacement);
        Ok(())
    }

    pub fn insert_text(&mut self, at: usize, text: &str) -> DraftResult<()> {
        self.replace_range(at..at, text)
    }

    /// Inserts `label` at `at` and links it to `url`.
    pub fn insert_link(&mut self, at: usize, label: &str, url: impl Into<String>) -> DraftResult<()> {
        self.replace_range(at..at, label)?;
        if label.is_empty() {
            return Ok(());
        }
        self.add_link(at..at + label.len(), url)
    }

    /// Rewrites every link span into its literal URL text. Returns how many spans were rewritten.
    pub fn normalize_links(&mut self) -> usize {
        let links = std::mem::take(&mut self.links);
        // Back to front so earlier offsets stay valid while text length changes.
        for link in links.iter().rev() {
            self.text.replace_range(link.range.clone(), &link.url);
        }
        links.len()
    }

    pub fn normalized(mut self) -> Self {
        self.normalize_links();
        self
    }

    fn check_range(&self, range: &Range<usize>, stage: &'static str) -> DraftResult<()> {
        ensure!(
            range.start <= range.end && range.end <= self.text.len(),
            SpanOutOfBoundsSnafu {
                stage,
                start: range.start,
                end: range.end,
                len: self.text.len(),
            }
        );
        ensure!(
            self.text.is_char_boundary(range.start) && self.text.is_char_boundary(range.end),
            SpanNotOnCharBoundarySnafu {
                stage,
                start: range.start,
                end: range.end,
            }
        );
        Ok(())
    }
}
