//! Error types

use embassy_time::Duration;
use thiserror::Error;

use crate::bus::QueueId;

/// Errors reported by a bus device adapter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("Bus device disconnected")]
    Disconnected,

    #[error("Unknown queue: {0}")]
    UnknownQueue(QueueId),

    #[error("Bus device disposed")]
    Disposed,

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Errors returned by the scheduling API
#[derive(Error, Debug)]
pub enum Error {
    #[error("Channel {0} is outside the bus (0..512)")]
    InvalidChannel(u16),

    #[error("Effect window starts after it ends")]
    InvalidTimeRange,

    #[error("Effect registry is full ({0} effects)")]
    RegistryFull(usize),

    #[error("Too many connection-state subscribers")]
    SubscribersFull,

    #[error("Scheduler has been disposed")]
    Disposed,

    #[error("Tick loop did not stop within {}ms", .0.as_millis())]
    ShutdownTimeout(Duration),

    #[error("Device error: {0}")]
    Device(#[from] BusError),

    #[error("Failed to spawn tick thread: {0}")]
    Spawn(#[from] std::io::Error),
}
