//! Tick loop
//!
//! Each tick evaluates every due effect, writes the result to the device,
//! retires expired effects in one batch after the pass and deletes device
//! queues no live effect references anymore.
//!
//! [`TickScheduler::tick`] takes the current instant as an argument so the
//! loop can be driven by hand; [`TickScheduler::run`] is the thread body.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use embassy_time::{Duration, Instant};
use heapless::Vec;
use log::{debug, error, info, trace, warn};

use crate::BusDevice;
use crate::config::SchedulerConfig;
use crate::effect::Effect;
use crate::error::BusError;
use crate::registry::EffectRegistry;

/// What a single tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Values handed to the device
    pub written: usize,
    /// Effects removed from the registry
    pub retired: usize,
    /// Queues deleted on the device
    pub deleted_queues: usize,
    /// Failed device calls
    pub device_errors: usize,
}

/// Outcome of one tick
#[derive(Debug, Clone, Copy)]
pub struct TickResult {
    /// Deadline of the next tick
    pub next_deadline: Instant,
    /// Wait until the next tick, zero when behind schedule
    pub sleep_duration: Duration,
    pub report: TickReport,
}

/// Counters shared between the tick thread and the scheduler facade
#[derive(Debug, Default)]
pub struct LoopHealth {
    ticks: AtomicU64,
    failed_ticks: AtomicU32,
}

impl LoopHealth {
    /// Ticks completed so far
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Length of the current streak of ticks with device errors
    pub fn consecutive_failures(&self) -> u32 {
        self.failed_ticks.load(Ordering::Relaxed)
    }
}

/// Fixed-cadence effect evaluator
pub struct TickScheduler<D: BusDevice, const N: usize> {
    device: Arc<D>,
    effects: Arc<EffectRegistry<N>>,
    health: Arc<LoopHealth>,
    next_tick: Instant,
    tick_period: Duration,
    fault_threshold: u32,
}

impl<D: BusDevice, const N: usize> TickScheduler<D, N> {
    pub fn new(device: Arc<D>, effects: Arc<EffectRegistry<N>>, config: &SchedulerConfig) -> Self {
        Self {
            device,
            effects,
            health: Arc::new(LoopHealth::default()),
            next_tick: Instant::MIN,
            tick_period: config.tick_period,
            fault_threshold: config.fault_threshold.max(1),
        }
    }

    pub fn health(&self) -> &Arc<LoopHealth> {
        &self.health
    }

    /// Process one tick and compute the pacing
    ///
    /// If the loop has fallen more than two periods behind, the cadence is
    /// reset to `now` instead of bursting to catch up.
    pub fn tick(&mut self, now: Instant) -> TickResult {
        let max_drift = self.tick_period * 2;
        if now > self.next_tick.checked_add(max_drift).unwrap_or(Instant::MAX) {
            self.next_tick = now;
        }

        let (report, first_error) = self.process(now);
        self.record(&report, first_error);

        self.next_tick = self
            .next_tick
            .checked_add(self.tick_period)
            .unwrap_or(Instant::MAX);

        TickResult {
            next_deadline: self.next_tick,
            sleep_duration: self.next_tick.saturating_duration_since(now),
            report,
        }
    }

    /// Run ticks until `shutdown` is raised
    pub fn run(mut self, shutdown: &AtomicBool) {
        info!(
            "tick loop started ({}us period)",
            self.tick_period.as_micros()
        );
        while !shutdown.load(Ordering::Acquire) {
            let result = self.tick(Instant::now());
            let sleep = result.sleep_duration.as_micros();
            if sleep > 0 {
                std::thread::sleep(core::time::Duration::from_micros(sleep));
            }
        }
        info!("tick loop stopped after {} ticks", self.health.ticks());
    }

    fn process(&self, now: Instant) -> (TickReport, Option<BusError>) {
        let mut report = TickReport::default();
        let mut first_error = None;
        let snapshot = self.effects.snapshot();
        let mut retired: Vec<Arc<Effect>, N> = Vec::new();

        for effect in &snapshot {
            // Queue not created on the device yet
            if !effect.is_armed() {
                continue;
            }
            // No upper-bound check: an expired effect still gets its final write
            if effect.from_timestamp() <= now {
                match self.write(effect, now) {
                    Ok(()) => report.written += 1,
                    Err(err) => {
                        report.device_errors += 1;
                        first_error.get_or_insert(err);
                    }
                }
            }
            if effect.is_expired(now) {
                // Cannot overflow: the snapshot holds at most N effects
                let _ = retired.push(effect.clone());
            }
        }

        report.retired = self.effects.remove_all(&retired);
        if report.retired > 0 {
            debug!("retired {} effect(s)", report.retired);
        }

        if let Some(err) = self.reconcile_queues(&mut report) {
            first_error.get_or_insert(err);
        }

        (report, first_error)
    }

    fn write(&self, effect: &Effect, now: Instant) -> Result<(), BusError> {
        let value = if effect.duration().as_ticks() == 0 {
            effect.end_value()
        } else {
            let start = effect.resolve_start(|| self.device.value(effect.channel()))?;
            effect.value_from(start, now)
        };
        trace!(
            "ch {} <- {} (queue {}, priority {})",
            effect.channel(),
            value,
            effect.queue(),
            effect.priority()
        );
        match self
            .device
            .set_value(effect.channel(), value, effect.queue(), effect.priority())
        {
            // Reconciled away while the producer was re-creating it
            Err(BusError::UnknownQueue(queue)) => {
                debug!("re-creating queue {queue} for a live effect");
                self.device.create_queue(queue, effect.priority())?;
                self.device
                    .set_value(effect.channel(), value, queue, effect.priority())
            }
            result => result,
        }
    }

    /// Delete device queues that no registered effect references
    ///
    /// The device set is read before the registry set and producers insert
    /// their effect before creating its queue, so a concurrently created
    /// queue is either missing from `known` or already backed by a live effect.
    fn reconcile_queues(&self, report: &mut TickReport) -> Option<BusError> {
        let known = match self.device.queue_ids() {
            Ok(known) => known,
            Err(err) => {
                report.device_errors += 1;
                return Some(err);
            }
        };
        let live = self.effects.queue_ids();
        let mut first_error = None;

        for queue in known {
            if queue.is_sentinel() || live.contains(queue) {
                continue;
            }
            match self.device.delete_queue(queue) {
                Ok(()) => {
                    report.deleted_queues += 1;
                    debug!("deleted idle queue {queue}");
                }
                Err(err) => {
                    report.device_errors += 1;
                    first_error.get_or_insert(err);
                }
            }
        }

        first_error
    }

    fn record(&self, report: &TickReport, first_error: Option<BusError>) {
        self.health.ticks.fetch_add(1, Ordering::Relaxed);

        let Some(err) = first_error else {
            let streak = self.health.failed_ticks.swap(0, Ordering::Relaxed);
            if streak > 0 {
                info!("bus device recovered after {streak} failing tick(s)");
            }
            return;
        };

        let streak = self.health.failed_ticks.fetch_add(1, Ordering::Relaxed) + 1;
        if streak == 1 {
            warn!(
                "bus device error ({} failed call(s)): {err}; retrying next tick",
                report.device_errors
            );
        } else if streak == self.fault_threshold {
            error!("bus device failing for {streak} consecutive ticks: {err}");
        } else {
            trace!("bus device still failing ({streak} ticks): {err}");
        }
    }
}
