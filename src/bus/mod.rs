//! Bus device boundary types
//!
//! The scheduler never encodes bus frames itself. It hands resolved
//! `(channel, value, queue, priority)` tuples to a [`BusDevice`](crate::BusDevice)
//! and lets the device arbitrate between queues.

mod memory;

use core::fmt;
use std::sync::Arc;

pub use memory::MemoryBus;

use crate::error::Error;

/// Number of addressable channels on the bus
pub const BUS_LENGTH: usize = 512;

/// Snapshot of every channel on the bus (`None` = never written)
pub type BusBuffer = [Option<u8>; BUS_LENGTH];

/// Opaque identifier of an effect queue (a layer sharing one priority)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct QueueId(u128);

impl QueueId {
    /// The always-live queue, never garbage collected
    pub const SENTINEL: Self = Self(0);

    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> u128 {
        self.0
    }

    pub const fn is_sentinel(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Addressing triple shared by every effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub queue: QueueId,
    pub channel: u16,
    /// Passed through to the device, never interpreted here
    pub priority: i32,
}

impl Target {
    pub const fn new(queue: QueueId, channel: u16, priority: i32) -> Self {
        Self {
            queue,
            channel,
            priority,
        }
    }
}

/// Reject channels outside the bus
pub(crate) fn check_channel(channel: u16) -> Result<(), Error> {
    if usize::from(channel) < BUS_LENGTH {
        Ok(())
    } else {
        Err(Error::InvalidChannel(channel))
    }
}

/// Connection state reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Callback a device invokes whenever its connection state changes
pub type StateListener = Arc<dyn Fn(ConnectionState) + Send + Sync>;

/// Allowed output range of a single channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelRange {
    pub min: u8,
    pub max: u8,
}

impl ChannelRange {
    pub const FULL: Self = Self { min: 0, max: 255 };

    /// Clamp a value into the range
    pub const fn clamp(self, value: u8) -> u8 {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }
}

impl Default for ChannelRange {
    fn default() -> Self {
        Self::FULL
    }
}

/// Per-channel output limits enforced by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusLimits {
    ranges: [ChannelRange; BUS_LENGTH],
}

impl BusLimits {
    /// Limits that let every value through
    pub const fn unrestricted() -> Self {
        Self {
            ranges: [ChannelRange::FULL; BUS_LENGTH],
        }
    }

    /// Restrict one channel
    pub fn with_range(mut self, channel: u16, range: ChannelRange) -> Result<Self, Error> {
        check_channel(channel)?;
        self.ranges[usize::from(channel)] = range;
        Ok(self)
    }

    /// Range of a channel (full range for out-of-bus channels)
    pub fn range(&self, channel: u16) -> ChannelRange {
        self.ranges
            .get(usize::from(channel))
            .copied()
            .unwrap_or(ChannelRange::FULL)
    }
}

impl Default for BusLimits {
    fn default() -> Self {
        Self::unrestricted()
    }
}
