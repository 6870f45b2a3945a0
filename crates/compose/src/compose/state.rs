use std::fmt;

use snafu::Snafu;

/// Lifecycle of one compose session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComposeState {
    #[default]
    Opening,
    Editing,
    AwaitingConfirmation,
    Finalizing,
    Closed,
}

/// State transition input for the compose lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComposeTransition {
    Opened,
    Edit,
    RequestSubmit,
    FlagSecret,
    KeepEditing,
    PostAnyway,
    Finalize,
    Cancel,
    Close,
}

/// Rejection reason for illegal compose transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Snafu)]
pub enum ComposeTransitionRejection {
    #[snafu(display("session is closed; {attempted} is not allowed"))]
    SessionClosed { attempted: ComposeTransition },
    #[snafu(display("{attempted} is not allowed while {from}"))]
    InvalidTransition {
        from: ComposeState,
        attempted: ComposeTransition,
    },
}

pub type ComposeTransitionResult = Result<ComposeState, ComposeTransitionRejection>;

impl ComposeState {
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }

    pub fn accepts_edits(self) -> bool {
        matches!(self, Self::Editing)
    }

    /// Applies one transition deterministically.
    ///
    /// `Close` is accepted from every state, including `Closed` itself, so
    /// dismissal can run any number of times.
    pub fn apply(self, transition: ComposeTransition) -> ComposeTransitionResult {
        use ComposeState as S;
        use ComposeTransition as T;

        match (self, transition) {
            (_, T::Close) => Ok(S::Closed),
            (S::Closed, attempted) => SessionClosedSnafu { attempted }.fail(),
            (S::Opening, T::Opened) => Ok(S::Editing),
            (S::Editing, T::Edit | T::RequestSubmit) => Ok(S::Editing),
            (S::Editing, T::FlagSecret) => Ok(S::AwaitingConfirmation),
            (S::AwaitingConfirmation, T::KeepEditing) => Ok(S::Editing),
            (S::AwaitingConfirmation, T::PostAnyway) => Ok(S::Finalizing),
            (S::Editing, T::Finalize) => Ok(S::Finalizing),
            (S::Editing, T::Cancel) => Ok(S::Closed),
            (from, attempted) => InvalidTransitionSnafu { from, attempted }.fail(),
        }
    }
}

impl fmt::Display for ComposeState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Opening => "opening",
            Self::Editing => "editing",
            Self::AwaitingConfirmation => "awaiting-confirmation",
            Self::Finalizing => "finalizing",
            Self::Closed => "closed",
        };
        formatter.write_str(name)
    }
}

impl fmt::Display for ComposeTransition {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Opened => "opened",
            Self::Edit => "edit",
            Self::RequestSubmit => "request-submit",
            Self::FlagSecret => "flag-secret",
            Self::KeepEditing => "keep-editing",
            Self::PostAnyway => "post-anyway",
            Self::Finalize => "finalize",
            Self::Cancel => "cancel",
            Self::Close => "close",
        };
        formatter.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_reaches_closed() {
        let state = ComposeState::Opening
            .apply(ComposeTransition::Opened)
            .and_then(|state| state.apply(ComposeTransition::Edit))
            .and_then(|state| state.apply(ComposeTransition::RequestSubmit))
            .and_then(|state| state.apply(ComposeTransition::FlagSecret))
            .and_then(|state| state.apply(ComposeTransition::KeepEditing))
            .and_then(|state| state.apply(ComposeTransition::FlagSecret))
            .and_then(|state| state.apply(ComposeTransition::PostAnyway))
            .and_then(|state| state.apply(ComposeTransition::Close));

        assert_eq!(state, Ok(ComposeState::Closed));
    }

    #[test]
    fn confirmation_blocks_edits_and_cancel() {
        let waiting = ComposeState::AwaitingConfirmation;
        for attempted in [
            ComposeTransition::Edit,
            ComposeTransition::Cancel,
            ComposeTransition::RequestSubmit,
            ComposeTransition::Finalize,
        ] {
            assert_eq!(
                waiting.apply(attempted),
                Err(ComposeTransitionRejection::InvalidTransition {
                    from: waiting,
                    attempted,
                })
            );
        }
        assert_eq!(
            waiting.apply(ComposeTransition::PostAnyway),
            Ok(ComposeState::Finalizing)
        );
        assert!(
            ComposeState::Editing
                .apply(ComposeTransition::PostAnyway)
                .is_err()
        );
    }

    #[test]
    fn closed_session_only_accepts_close() {
        let closed = ComposeState::Closed;
        assert_eq!(closed.apply(ComposeTransition::Close), Ok(closed));
        assert_eq!(
            closed.apply(ComposeTransition::Edit),
            Err(ComposeTransitionRejection::SessionClosed {
                attempted: ComposeTransition::Edit,
            })
        );
    }

    #[test]
    fn cancel_is_only_an_editing_action() {
        assert_eq!(
            ComposeState::Editing.apply(ComposeTransition::Cancel),
            Ok(ComposeState::Closed)
        );
        assert!(
            ComposeState::Finalizing
                .apply(ComposeTransition::Cancel)
                .is_err()
        );
    }
}
