pub mod bus;
pub mod channel;
pub mod config;
pub mod easing;
pub mod effect;
pub mod error;
pub mod math8;
pub mod notify;
pub mod registry;
pub mod scheduler;
pub mod tick;

pub use bus::{
    BUS_LENGTH, BusBuffer, BusLimits, ChannelRange, ConnectionState, MemoryBus, QueueId,
    StateListener, Target,
};
pub use config::{SchedulerConfig, StartCapture};
pub use easing::{Easing, EasingExtents, EasingType, evaluate};
pub use effect::{Effect, EffectHandle, EffectKind, EffectParams, PulseMode};
pub use error::{BusError, Error};
pub use notify::{StateSubscription, SubscriptionId};
pub use registry::{EffectRegistry, QueueSet};
pub use scheduler::Scheduler;
pub use tick::{TickReport, TickResult, TickScheduler};

pub use embassy_time::{Duration, Instant};

/// Bus device adapter
///
/// Implement this trait to drive a real interface. The device owns frame
/// encoding, transport and the arbitration between queues writing the same
/// channel. All methods take `&self`: the tick thread and lifecycle calls
/// share the device.
pub trait BusDevice: Send + Sync {
    /// Write a resolved value for `queue`
    fn set_value(&self, channel: u16, value: u8, queue: QueueId, priority: i32)
    -> Result<(), BusError>;

    /// Current arbitrated value of a channel
    fn value(&self, channel: u16) -> Result<u8, BusError>;

    /// Create a queue; creating an existing queue is not an error
    fn create_queue(&self, queue: QueueId, priority: i32) -> Result<(), BusError>;

    fn delete_queue(&self, queue: QueueId) -> Result<(), BusError>;

    /// Every queue the device currently knows
    fn queue_ids(&self) -> Result<Vec<QueueId>, BusError>;

    fn current_buffer(&self) -> Result<BusBuffer, BusError>;

    fn start(&self) -> Result<bool, BusError>;

    fn stop(&self) -> Result<(), BusError>;

    fn is_connected(&self) -> bool;

    fn set_limits(&self, limits: &BusLimits) -> Result<(), BusError>;

    fn dispose(&self) -> Result<(), BusError>;

    /// Install the callback invoked on every connection change
    fn set_state_listener(&self, listener: StateListener);
}
