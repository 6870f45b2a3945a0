use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DraftError {
    #[snafu(display("draft id '{raw}' is invalid for {id_type}"))]
    InvalidId {
        stage: &'static str,
        id_type: &'static str,
        raw: String,
        source: hex::FromHexError,
    },
    #[snafu(display("link span {start}..{end} is empty"))]
    EmptySpan {
        stage: &'static str,
        start: usize,
        end: usize,
    },
    #[snafu(display("range {start}..{end} exceeds draft length {len}"))]
    SpanOutOfBounds {
        stage: &'static str,
        start: usize,
        end: usize,
        len: usize,
    },
    #[snafu(display("range {start}..{end} does not fall on character boundaries"))]
    SpanNotOnCharBoundary {
        stage: &'static str,
        start: usize,
        end: usize,
    },
    #[snafu(display(
        "link span {start}..{end} overlaps existing span {existing_start}..{existing_end}"
    ))]
    OverlappingSpan {
        stage: &'static str,
        start: usize,
        end: usize,
        existing_start: usize,
        existing_end: usize,
    },
}

pub type DraftResult<T> = Result<T, DraftError>;
