//! Named-channel publish/subscribe shared by every compose component.
//!
//! The bus lives on the UI loop: it is `Rc`-based, dispatches synchronously and
//! never queues. A publish with nobody listening is simply lost.

use std::any::{Any, TypeId, type_name};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use snafu::{Snafu, ensure};

pub mod channels;

pub use channels::{
    ALL_CHANNEL_NAMES, Boost, BroadcastEvent, Channel, ClickProfilePic, OpenThread, Post, Reply,
    ScrollToTop, SelectEvent, SelectQuote, SwitchedTimeline, ThreadFocus,
};

/// Nested publishes allowed before dispatch refuses to recurse further.
pub const DEFAULT_MAX_DISPATCH_DEPTH: usize = 8;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BusError {
    #[snafu(display(
        "channel '{channel}' carries {expected} payloads, not {attempted} (on `{stage}`)"
    ))]
    PayloadTypeMismatch {
        stage: &'static str,
        channel: &'static str,
        expected: &'static str,
        attempted: &'static str,
    },
    #[snafu(display("publish on '{channel}' exceeded dispatch depth {max_depth}"))]
    DispatchDepthExceeded {
        stage: &'static str,
        channel: &'static str,
        max_depth: usize,
    },
}

pub type BusResult<T> = Result<T, BusError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Identifies exactly one registration made through [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    pub channel: &'static str,
    pub id: SubscriptionId,
}

type Handler<P> = Rc<dyn Fn(&P)>;

struct Subscriber {
    id: SubscriptionId,
    // Always a `Handler<C::Payload>` for the channel the entry belongs to.
    handler: Box<dyn Any>,
}

struct ChannelEntry {
    payload_type: TypeId,
    payload_type_name: &'static str,
    subscribers: Vec<Subscriber>,
}

impl ChannelEntry {
    fn for_channel<C: Channel>() -> Self {
        Self {
            payload_type: TypeId::of::<C::Payload>(),
            payload_type_name: type_name::<C::Payload>(),
            subscribers: Vec::new(),
        }
    }

    fn check_payload<C: Channel>(&self, stage: &'static str) -> BusResult<()> {
        ensure!(
            self.payload_type == TypeId::of::<C::Payload>(),
            PayloadTypeMismatchSnafu {
                stage,
                channel: C::NAME,
                expected: self.payload_type_name,
                attempted: type_name::<C::Payload>(),
            }
        );
        Ok(())
    }
}

#[derive(Default)]
struct Registry {
    channels: HashMap<&'static str, ChannelEntry>,
    next_subscription_id: u64,
}

struct BusInner {
    registry: RefCell<Registry>,
    depth: Cell<usize>,
    max_depth: usize,
}

/// Restores the dispatch depth even if a handler panics.
struct DepthGuard<'a> {
    depth: &'a Cell<usize>,
}

impl<'a> DepthGuard<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self { depth }
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

/// Process-wide event bus. Cloning hands out another handle to the same registry.
#[derive(Clone)]
pub struct EventBus {
    inner: Rc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DISPATCH_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            inner: Rc::new(BusInner {
                registry: RefCell::new(Registry::default()),
                depth: Cell::new(0),
                max_depth: max_depth.max(1),
            }),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.inner.max_depth
    }

    /// Registers `handler` on channel `C`.
    ///
    /// The first registration fixes the payload type for the channel name; a
    /// later channel declaration reusing the name with another payload is rejected.
    pub fn subscribe<C, F>(&self, handler: F) -> BusResult<SubscriptionHandle>
    where
        C: Channel,
        F: Fn(&C::Payload) + 'static,
    {
        let mut registry = self.inner.registry.borrow_mut();
        registry.next_subscription_id += 1;
        let id = SubscriptionId(registry.next_subscription_id);

        let entry = registry
            .channels
            .entry(C::NAME)
            .or_insert_with(ChannelEntry::for_channel::<C>);
        if let Err(error) = entry.check_payload::<C>("subscribe") {
            tracing::warn!(channel = C::NAME, error = %error, "rejected subscription");
            return Err(error);
        }

        let handler: Handler<C::Payload> = Rc::new(handler);
        entry.subscribers.push(Subscriber {
            id,
            handler: Box::new(handler),
        });
        tracing::debug!(
            channel = C::NAME,
            subscription_id = id.0,
            subscriber_count = entry.subscribers.len(),
            "subscribed"
        );

        Ok(SubscriptionHandle {
            channel: C::NAME,
            id,
        })
    }

    /// Removes exactly the registration behind `handle`. Returns false if it was already gone.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut registry = self.inner.registry.borrow_mut();
        let Some(entry) = registry.channels.get_mut(handle.channel) else {
            return false;
        };

        let before = entry.subscribers.len();
        entry
            .subscribers
            .retain(|subscriber| subscriber.id != handle.id);
        let removed = entry.subscribers.len() != before;
        if removed {
            tracing::debug!(
                channel = handle.channel,
                subscription_id = handle.id.0,
                "unsubscribed"
            );
        }
        removed
    }

    /// Delivers `payload` to every current subscriber of `C`, in registration order.
    ///
    /// Returns how many handlers ran. Subscriptions added or removed by a
    /// handler take effect from the next publish.
    pub fn publish<C: Channel>(&self, payload: &C::Payload) -> BusResult<usize> {
        let handlers = {
            let registry = self.inner.registry.borrow();
            let Some(entry) = registry.channels.get(C::NAME) else {
                tracing::trace!(channel = C::NAME, "publish without subscribers");
                return Ok(0);
            };
            if let Err(error) = entry.check_payload::<C>("publish") {
                tracing::warn!(channel = C::NAME, error = %error, "rejected publish");
                return Err(error);
            }

            entry
                .subscribers
                .iter()
                .filter_map(|subscriber| {
                    subscriber
                        .handler
                        .downcast_ref::<Handler<C::Payload>>()
                        .cloned()
                })
                .collect::<Vec<_>>()
        };

        let depth = self.inner.depth.get();
        if depth >= self.inner.max_depth {
            tracing::warn!(
                channel = C::NAME,
                depth,
                max_depth = self.inner.max_depth,
                "dropping re-entrant publish"
            );
            return DispatchDepthExceededSnafu {
                stage: "publish",
                channel: C::NAME,
                max_depth: self.inner.max_depth,
            }
            .fail();
        }

        let _depth = DepthGuard::enter(&self.inner.depth);
        tracing::debug!(
            channel = C::NAME,
            handler_count = handlers.len(),
            depth = depth + 1,
            "publishing"
        );
        for handler in &handlers {
            handler(payload);
        }
        Ok(handlers.len())
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.inner
            .registry
            .borrow()
            .channels
            .get(channel)
            .map_or(0, |entry| entry.subscribers.len())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry.borrow();
        let mut channels = registry
            .channels
            .iter()
            .map(|(name, entry)| (*name, entry.subscribers.len()))
            .collect::<Vec<_>>();
        channels.sort_unstable();

        formatter
            .debug_struct("EventBus")
            .field("channels", &channels)
            .field("max_depth", &self.inner.max_depth)
            .finish()
    }
}
