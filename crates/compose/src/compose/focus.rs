use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use snafu::ResultExt;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::error::{NoRuntimeSnafu, SessionResult};

/// Delay before a freshly opened session grabs input focus.
pub const DEFAULT_FOCUS_DELAY: Duration = Duration::from_millis(500);

const TIMER_PENDING: u8 = 0;
const TIMER_CANCELLED: u8 = 1;
const TIMER_FIRED: u8 = 2;

/// Moves keyboard focus into the compose input.
pub trait InputFocus: Send + Sync {
    fn focus(&self);
}

/// Focus target for hosts without a focusable input.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInputFocus;

impl InputFocus for NoInputFocus {
    fn focus(&self) {}
}

/// One-shot deferred focus action. Cancelled explicitly or when dropped.
///
/// The task and [`FocusTimer::cancel`] race on one atomic state, so exactly one
/// of them wins: either focus runs or the cancel reports it was prevented.
#[derive(Debug)]
pub struct FocusTimer {
    state: Arc<AtomicU8>,
    cancel_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl FocusTimer {
    /// Schedules `target.focus()` after `delay` on the current tokio runtime.
    pub fn schedule(delay: Duration, target: Arc<dyn InputFocus>) -> SessionResult<Self> {
        let runtime = Handle::try_current().context(NoRuntimeSnafu {
            stage: "schedule-focus-timer",
        })?;
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let state = Arc::new(AtomicU8::new(TIMER_PENDING));
        let task_state = state.clone();

        let task = runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = cancel_rx => {
                    tracing::debug!("focus timer cancelled before firing");
                }
                () = tokio::time::sleep(delay) => {
                    let claimed = task_state
                        .compare_exchange(
                            TIMER_PENDING,
                            TIMER_FIRED,
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        )
                        .is_ok();
                    if claimed {
                        target.focus();
                        tracing::debug!(delay_ms = delay.as_millis() as u64, "focus timer fired");
                    } else {
                        tracing::debug!("focus timer elapsed after cancel");
                    }
                }
            }
        });

        Ok(Self {
            state,
            cancel_tx: Some(cancel_tx),
            task,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.state.load(Ordering::Acquire) == TIMER_PENDING
    }

    /// Cancels the action if it has not fired yet. Returns true when this call prevented it.
    pub fn cancel(&mut self) -> bool {
        let prevented = self
            .state
            .compare_exchange(
                TIMER_PENDING,
                TIMER_CANCELLED,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if let Some(cancel_tx) = self.cancel_tx.take() {
            // A send error only means the task is already done.
            let _ = cancel_tx.send(());
        }
        prevented
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for FocusTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
