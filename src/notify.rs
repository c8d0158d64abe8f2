//! Connection-state relay
//!
//! The device reports connection changes through a [`StateListener`]; the
//! relay copies each change verbatim into every subscriber's channel.

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use critical_section::Mutex;
use heapless::Vec;
use log::trace;

use crate::bus::{ConnectionState, StateListener};
use crate::channel::{Channel, TryReceiveError};

/// Maximum number of concurrent subscribers
pub const MAX_SUBSCRIBERS: usize = 8;

/// Notifications buffered per subscriber
pub const STATE_QUEUE_SIZE: usize = 16;

type StateChannel = Channel<ConnectionState, STATE_QUEUE_SIZE>;

/// Identifier returned by `subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u32);

/// Receiving end of a connection-state subscription
pub struct StateSubscription {
    id: SubscriptionId,
    channel: Arc<StateChannel>,
}

impl StateSubscription {
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next pending notification, oldest first
    pub fn try_receive(&self) -> Result<ConnectionState, TryReceiveError> {
        self.channel.try_receive()
    }

    /// Drain every pending notification
    pub fn drain(&self) -> impl Iterator<Item = ConnectionState> + '_ {
        core::iter::from_fn(|| self.channel.try_receive().ok())
    }
}

/// Fan-out of device connection changes
pub struct StateRelay {
    subscribers: Mutex<RefCell<Vec<(SubscriptionId, Arc<StateChannel>), MAX_SUBSCRIBERS>>>,
    next_id: AtomicU32,
}

impl StateRelay {
    pub const fn new() -> Self {
        Self {
            subscribers: Mutex::new(RefCell::new(Vec::new())),
            next_id: AtomicU32::new(1),
        }
    }

    /// Register a subscriber; `None` when all slots are taken
    pub fn subscribe(&self) -> Option<StateSubscription> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let channel = Arc::new(StateChannel::new());
        critical_section::with(|cs| {
            self.subscribers
                .borrow(cs)
                .borrow_mut()
                .push((id, channel.clone()))
                .ok()
        })?;
        Some(StateSubscription { id, channel })
    }

    /// Drop a subscriber; returns `false` if it was unknown
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        critical_section::with(|cs| {
            let mut subscribers = self.subscribers.borrow(cs).borrow_mut();
            let before = subscribers.len();
            subscribers.retain(|(known, _)| *known != id);
            subscribers.len() != before
        })
    }

    pub fn subscriber_count(&self) -> usize {
        critical_section::with(|cs| self.subscribers.borrow(cs).borrow().len())
    }

    /// Forward one state change to every subscriber
    pub fn publish(&self, state: ConnectionState) {
        let targets = critical_section::with(|cs| self.subscribers.borrow(cs).borrow().clone());
        trace!("relaying {state:?} to {} subscriber(s)", targets.len());
        for (_, channel) in &targets {
            channel.force_send(state);
        }
    }

    /// Listener to install on the device
    pub fn listener(self: &Arc<Self>) -> StateListener {
        let relay = Arc::clone(self);
        Arc::new(move |state: ConnectionState| relay.publish(state))
    }
}

impl Default for StateRelay {
    fn default() -> Self {
        Self::new()
    }
}
