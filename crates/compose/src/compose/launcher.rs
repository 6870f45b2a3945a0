use crate::bus::{BusResult, Reply, SubscriptionHandle};

use super::context::ComposeContext;
use super::events::ComposeRequest;
use super::session::ComposeSession;

/// Opens a compose session for every request published on the `reply` channel.
///
/// The subscription lives as long as the launcher.
pub struct ComposeLauncher {
    context: ComposeContext,
    subscription: SubscriptionHandle,
}

impl ComposeLauncher {
    /// Subscribes to `reply`; `on_open` receives each session it opens.
    pub fn subscribe<F>(context: ComposeContext, on_open: F) -> BusResult<Self>
    where
        F: Fn(ComposeSession) + 'static,
    {
        let opener = context.clone();
        let subscription = context.bus.subscribe::<Reply, _>(move |request| {
            let request = ComposeRequest::from(request.clone());
            match ComposeSession::open(&opener, request) {
                Ok(session) => on_open(session),
                Err(error) => {
                    tracing::warn!(error = %error, "failed to open compose session for reply");
                }
            }
        })?;

        tracing::debug!(subscription = ?subscription, "compose launcher listening");
        Ok(Self {
            context,
            subscription,
        })
    }

    pub fn context(&self) -> &ComposeContext {
        &self.context
    }
}

impl Drop for ComposeLauncher {
    fn drop(&mut self) {
        self.context.bus.unsubscribe(self.subscription);
    }
}
