use notecraft_drafts::DraftError;
use snafu::Snafu;

use super::state::ComposeTransitionRejection;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ComposeError {
    #[snafu(display("no tokio runtime available on `{stage}`: {source}"))]
    NoRuntime {
        stage: &'static str,
        source: tokio::runtime::TryCurrentError,
    },
    #[snafu(display("draft edit failed on `{stage}`: {source}"))]
    Draft {
        stage: &'static str,
        source: DraftError,
    },
    #[snafu(display("compose transition rejected on `{stage}`: {source}"))]
    Rejected {
        stage: &'static str,
        source: ComposeTransitionRejection,
    },
}

pub type SessionResult<T> = Result<T, ComposeError>;
