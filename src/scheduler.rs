//! Scheduler facade
//!
//! Owns the bus device, the effect registry and the tick thread. Every
//! scheduling call only touches the registry (plus queue creation on the
//! device); evaluation happens on the tick thread alone.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use critical_section::Mutex;
use embassy_time::{Duration, Instant};
use log::{debug, error, info, warn};

use crate::BusDevice;
use crate::bus::{BUS_LENGTH, BusBuffer, BusLimits, QueueId, Target, check_channel};
use crate::config::{SchedulerConfig, StartCapture};
use crate::effect::{Effect, EffectHandle, EffectParams};
use crate::error::Error;
use crate::notify::{StateRelay, StateSubscription, SubscriptionId};
use crate::registry::{DEFAULT_EFFECT_CAPACITY, EffectRegistry};
use crate::tick::{LoopHealth, TickScheduler};

/// Effect scheduler driving one bus device
pub struct Scheduler<D: BusDevice + 'static, const N: usize = DEFAULT_EFFECT_CAPACITY> {
    device: Arc<D>,
    effects: Arc<EffectRegistry<N>>,
    relay: Arc<StateRelay>,
    health: Arc<LoopHealth>,
    config: SchedulerConfig,
    shutdown: Arc<AtomicBool>,
    disposed: AtomicBool,
    worker: Mutex<RefCell<Option<JoinHandle<()>>>>,
}

impl<D: BusDevice + 'static, const N: usize> Scheduler<D, N> {
    /// Take ownership of `device`, zero the bus and start the tick thread
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(device: D, config: SchedulerConfig) -> Result<Self, Error> {
        let device = Arc::new(device);
        let relay = Arc::new(StateRelay::new());
        device.set_state_listener(relay.listener());

        device.create_queue(QueueId::SENTINEL, config.baseline_priority)?;
        for channel in 0..BUS_LENGTH as u16 {
            device.set_value(channel, 0, QueueId::SENTINEL, config.baseline_priority)?;
        }

        let effects = Arc::new(EffectRegistry::new());
        let tick = TickScheduler::new(Arc::clone(&device), Arc::clone(&effects), &config);
        let health = Arc::clone(tick.health());
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker = {
            let shutdown = Arc::clone(&shutdown);
            thread::Builder::new()
                .name("dmx-tick".into())
                .spawn(move || tick.run(&shutdown))?
        };
        info!("scheduler ready (capacity {N} effects)");

        Ok(Self {
            device,
            effects,
            relay,
            health,
            config,
            shutdown,
            disposed: AtomicBool::new(false),
            worker: Mutex::new(RefCell::new(Some(worker))),
        })
    }

    fn ensure_live(&self) -> Result<(), Error> {
        if self.disposed.load(Ordering::Acquire) {
            Err(Error::Disposed)
        } else {
            Ok(())
        }
    }

    /// Register an already built effect and make sure its queue exists
    pub fn queue_effect(&self, effect: Effect) -> Result<EffectHandle, Error> {
        let effect = Arc::new(effect);
        self.admit(core::slice::from_ref(&effect))?;
        Ok(EffectHandle::new(effect))
    }

    /// Register a batch of effects as one unit
    ///
    /// Either every effect ends up registered and armed, or none of them
    /// stays in the registry.
    fn admit(&self, batch: &[Arc<Effect>]) -> Result<(), Error> {
        self.ensure_live()?;
        for effect in batch {
            if self.config.start_capture == StartCapture::OnQueue
                && effect.duration().as_ticks() > 0
            {
                effect.resolve_start(|| self.device.value(effect.channel()))?;
            }
            // Stays invisible to the tick loop until its queue exists
            effect.set_armed(false);
        }

        if !self.effects.insert_all(batch) {
            return Err(Error::RegistryFull(N));
        }
        for effect in batch {
            if let Err(err) = self.device.create_queue(effect.queue(), effect.priority()) {
                self.effects.remove_all(batch);
                return Err(err.into());
            }
        }

        for effect in batch {
            effect.set_armed(true);
            debug!(
                "queued {:?} on ch {} (queue {}, priority {})",
                effect.kind(),
                effect.channel(),
                effect.queue(),
                effect.priority()
            );
        }
        Ok(())
    }

    /// Transition a channel, now or at `at`
    ///
    /// Without `params.start` the start value is captured from the device.
    pub fn ease_to(&self, params: EffectParams, at: Option<Instant>) -> Result<EffectHandle, Error> {
        let mut effect = Effect::transition(params)?;
        effect.start_at(at.unwrap_or_else(Instant::now));
        self.queue_effect(effect)
    }

    /// Pulse a channel until the returned handle is stopped
    pub fn pulse(&self, params: EffectParams) -> Result<EffectHandle, Error> {
        let mut effect = Effect::pulse(params, self.config.pulse_mode)?;
        effect.start(Instant::now());
        self.queue_effect(effect)
    }

    /// Set a channel instantly, now or at `at`
    ///
    /// With `revert_after`, a second set back to zero is scheduled that long
    /// after the first one lands. Both are registered together or not at all.
    pub fn set(
        &self,
        target: Target,
        value: u8,
        at: Option<Instant>,
        revert_after: Option<Duration>,
    ) -> Result<EffectHandle, Error> {
        let at = at.unwrap_or_else(Instant::now);
        let mut effect = Effect::set(target, value)?;
        effect.start_at(at);
        let effect = Arc::new(effect);

        match revert_after.filter(|delay| delay.as_ticks() > 0) {
            Some(delay) => {
                let mut revert = Effect::set(target, 0)?;
                revert.start_at(at.checked_add(delay).unwrap_or(Instant::MAX));
                self.admit(&[Arc::clone(&effect), Arc::new(revert)])?;
            }
            None => self.admit(core::slice::from_ref(&effect))?,
        }
        Ok(EffectHandle::new(effect))
    }

    /// Current value of a channel as the device resolves it
    pub fn value(&self, channel: u16) -> Result<u8, Error> {
        self.ensure_live()?;
        check_channel(channel)?;
        Ok(self.device.value(channel)?)
    }

    /// Every channel of the bus
    pub fn current_buffer(&self) -> Result<BusBuffer, Error> {
        self.ensure_live()?;
        Ok(self.device.current_buffer()?)
    }

    /// Start the device
    pub fn start(&self) -> Result<bool, Error> {
        self.ensure_live()?;
        let started = self.device.start()?;
        info!("bus device started: {started}");
        Ok(started)
    }

    /// Stop every effect, then the device
    pub fn stop(&self) -> Result<(), Error> {
        self.ensure_live()?;
        let effects = self.effects.snapshot();
        for effect in &effects {
            effect.stop();
        }
        self.device.stop()?;
        info!("stopped {} effect(s) and the bus device", effects.len());
        Ok(())
    }

    /// Stop the tick thread and dispose the device
    ///
    /// Waits up to `shutdown_timeout` for the thread. If it does not exit in
    /// time the device is left alone and [`Error::ShutdownTimeout`] is returned.
    pub fn dispose(&self) -> Result<(), Error> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Err(Error::Disposed);
        }
        self.shutdown.store(true, Ordering::Release);

        let worker = critical_section::with(|cs| self.worker.borrow(cs).borrow_mut().take());
        if let Some(worker) = worker {
            let timeout = self.config.shutdown_timeout;
            let deadline = Instant::now().checked_add(timeout).unwrap_or(Instant::MAX);
            while !worker.is_finished() {
                if Instant::now() >= deadline {
                    error!("tick thread did not stop within {}ms", timeout.as_millis());
                    return Err(Error::ShutdownTimeout(timeout));
                }
                thread::sleep(core::time::Duration::from_millis(1));
            }
            if worker.join().is_err() {
                error!("tick thread panicked");
            }
        }

        self.device.dispose()?;
        info!("scheduler disposed");
        Ok(())
    }

    pub fn connected(&self) -> bool {
        !self.disposed.load(Ordering::Acquire) && self.device.is_connected()
    }

    /// Hand new limits to the device
    pub fn set_limits(&self, limits: &BusLimits) -> Result<(), Error> {
        self.ensure_live()?;
        Ok(self.device.set_limits(limits)?)
    }

    /// Receive every connection change the device reports
    pub fn subscribe(&self) -> Result<StateSubscription, Error> {
        self.ensure_live()?;
        self.relay.subscribe().ok_or(Error::SubscribersFull)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.relay.unsubscribe(id)
    }

    /// Effects currently held by the registry
    pub fn active_effects(&self) -> usize {
        self.effects.len()
    }

    /// Length of the current streak of ticks with device errors
    pub fn consecutive_failures(&self) -> u32 {
        self.health.consecutive_failures()
    }

    /// Ticks completed so far
    pub fn ticks(&self) -> u64 {
        self.health.ticks()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }
}

impl<D: BusDevice + 'static, const N: usize> Drop for Scheduler<D, N> {
    fn drop(&mut self) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        if let Err(err) = self.dispose() {
            warn!("dispose on drop failed: {err}");
        }
    }
}
