//! In-process bus device
//!
//! Keeps one 512-slot buffer per queue and resolves reads by priority.
//! Useful for tests and for exercising the scheduler without hardware.

use core::cell::RefCell;

use critical_section::Mutex;
use log::debug;

use super::{BUS_LENGTH, BusBuffer, BusLimits, ConnectionState, QueueId, StateListener};
use crate::BusDevice;
use crate::error::BusError;

#[derive(Debug)]
struct QueueLayer {
    id: QueueId,
    priority: i32,
    values: BusBuffer,
}

struct MemoryState {
    layers: Vec<QueueLayer>,
    limits: BusLimits,
    listener: Option<StateListener>,
    connected: bool,
    started: bool,
    disposed: bool,
    fail_writes: bool,
    writes: usize,
    deleted: Vec<QueueId>,
}

/// Memory-backed [`BusDevice`]
pub struct MemoryBus {
    state: Mutex<RefCell<MemoryState>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(MemoryState {
                layers: Vec::new(),
                limits: BusLimits::unrestricted(),
                listener: None,
                connected: false,
                started: false,
                disposed: false,
                fail_writes: false,
                writes: 0,
                deleted: Vec::new(),
            })),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
        critical_section::with(|cs| f(&mut self.state.borrow(cs).borrow_mut()))
    }

    /// Make every `set_value` fail with [`BusError::Disconnected`]
    pub fn fail_writes(&self, fail: bool) {
        self.with_state(|state| state.fail_writes = fail);
    }

    /// Simulate a connection change and notify the listener
    pub fn set_connected(&self, connected: bool) {
        let listener = self.with_state(|state| {
            if state.connected == connected {
                return None;
            }
            state.connected = connected;
            state.listener.clone()
        });
        if let Some(listener) = listener {
            listener(if connected {
                ConnectionState::Connected
            } else {
                ConnectionState::Disconnected
            });
        }
    }

    /// Number of successful `set_value` calls
    pub fn write_count(&self) -> usize {
        self.with_state(|state| state.writes)
    }

    /// Value a single queue holds for a channel
    pub fn queue_value(&self, queue: QueueId, channel: u16) -> Option<u8> {
        self.with_state(|state| {
            state
                .layers
                .iter()
                .find(|layer| layer.id == queue)
                .and_then(|layer| layer.values.get(usize::from(channel)).copied().flatten())
        })
    }

    /// Priority a queue was created with
    pub fn queue_priority(&self, queue: QueueId) -> Option<i32> {
        self.with_state(|state| {
            state
                .layers
                .iter()
                .find(|layer| layer.id == queue)
                .map(|layer| layer.priority)
        })
    }

    pub fn has_queue(&self, queue: QueueId) -> bool {
        self.queue_priority(queue).is_some()
    }

    /// Every queue deleted so far, in deletion order
    pub fn deleted_queues(&self) -> Vec<QueueId> {
        self.with_state(|state| state.deleted.clone())
    }

    pub fn is_started(&self) -> bool {
        self.with_state(|state| state.started)
    }

    pub fn is_disposed(&self) -> bool {
        self.with_state(|state| state.disposed)
    }

    pub fn limits(&self) -> BusLimits {
        self.with_state(|state| state.limits.clone())
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryState {
    fn ensure_alive(&self) -> Result<(), BusError> {
        if self.disposed {
            Err(BusError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Highest priority wins; on equal priority the newest queue wins
    fn resolve(&self, channel: usize) -> Option<u8> {
        let mut best: Option<(i32, u8)> = None;
        for layer in &self.layers {
            let Some(value) = layer.values[channel] else {
                continue;
            };
            match best {
                Some((priority, _)) if priority > layer.priority => {}
                _ => best = Some((layer.priority, value)),
            }
        }
        best.map(|(_, value)| value)
    }
}

impl BusDevice for MemoryBus {
    fn set_value(
        &self,
        channel: u16,
        value: u8,
        queue: QueueId,
        priority: i32,
    ) -> Result<(), BusError> {
        self.with_state(|state| {
            state.ensure_alive()?;
            if state.fail_writes {
                return Err(BusError::Disconnected);
            }
            let slot = usize::from(channel);
            if slot >= BUS_LENGTH {
                return Err(BusError::Transport(format!("channel {channel} out of range")));
            }
            let value = state.limits.range(channel).clamp(value);
            let index = match state.layers.iter().position(|layer| layer.id == queue) {
                Some(index) => index,
                None if queue.is_sentinel() => {
                    state.layers.push(QueueLayer {
                        id: queue,
                        priority,
                        values: [None; BUS_LENGTH],
                    });
                    state.layers.len() - 1
                }
                None => return Err(BusError::UnknownQueue(queue)),
            };
            state.layers[index].values[slot] = Some(value);
            state.writes += 1;
            Ok(())
        })
    }

    fn value(&self, channel: u16) -> Result<u8, BusError> {
        self.with_state(|state| {
            state.ensure_alive()?;
            let slot = usize::from(channel);
            if slot >= BUS_LENGTH {
                return Err(BusError::Transport(format!("channel {channel} out of range")));
            }
            Ok(state.resolve(slot).unwrap_or(0))
        })
    }

    fn create_queue(&self, queue: QueueId, priority: i32) -> Result<(), BusError> {
        self.with_state(|state| {
            state.ensure_alive()?;
            if !state.layers.iter().any(|layer| layer.id == queue) {
                debug!("memory bus: creating queue {queue} (priority {priority})");
                state.layers.push(QueueLayer {
                    id: queue,
                    priority,
                    values: [None; BUS_LENGTH],
                });
            }
            Ok(())
        })
    }

    fn delete_queue(&self, queue: QueueId) -> Result<(), BusError> {
        self.with_state(|state| {
            state.ensure_alive()?;
            let before = state.layers.len();
            state.layers.retain(|layer| layer.id != queue);
            if state.layers.len() == before {
                return Err(BusError::UnknownQueue(queue));
            }
            state.deleted.push(queue);
            Ok(())
        })
    }

    fn queue_ids(&self) -> Result<Vec<QueueId>, BusError> {
        self.with_state(|state| {
            state.ensure_alive()?;
            Ok(state.layers.iter().map(|layer| layer.id).collect())
        })
    }

    fn current_buffer(&self) -> Result<BusBuffer, BusError> {
        self.with_state(|state| {
            state.ensure_alive()?;
            let mut buffer = [None; BUS_LENGTH];
            for (channel, slot) in buffer.iter_mut().enumerate() {
                *slot = state.resolve(channel);
            }
            Ok(buffer)
        })
    }

    fn start(&self) -> Result<bool, BusError> {
        self.with_state(|state| {
            state.ensure_alive()?;
            state.started = true;
            Ok(())
        })?;
        self.set_connected(true);
        Ok(true)
    }

    fn stop(&self) -> Result<(), BusError> {
        self.with_state(|state| {
            state.ensure_alive()?;
            state.started = false;
            Ok(())
        })?;
        self.set_connected(false);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.with_state(|state| state.connected)
    }

    fn set_limits(&self, limits: &BusLimits) -> Result<(), BusError> {
        self.with_state(|state| {
            state.ensure_alive()?;
            state.limits = limits.clone();
            Ok(())
        })
    }

    fn dispose(&self) -> Result<(), BusError> {
        self.with_state(|state| {
            state.ensure_alive()?;
            state.disposed = true;
            state.started = false;
            state.connected = false;
            state.listener = None;
            Ok(())
        })
    }

    fn set_state_listener(&self, listener: StateListener) {
        self.with_state(|state| state.listener = Some(listener));
    }
}
