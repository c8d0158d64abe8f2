//! Timed effects
//!
//! An effect produces a value for one channel over a time window. It is built
//! and armed by the producer, then shared with the registry; after that only
//! the stop flag and the lazily captured start value ever change.

mod pulse;

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use embassy_time::{Duration, Instant};

pub use pulse::PulseMode;

use crate::bus::{QueueId, Target, check_channel};
use crate::easing::{Easing, evaluate};
use crate::error::Error;
use crate::math8::progress;

/// Effect variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    /// Instant, unanimated set
    Set,
    /// One-shot eased transition
    Transition,
    /// Transition that keeps repeating until stopped
    Pulse(PulseMode),
}

/// Parameters of an animated effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectParams {
    pub target: Target,
    /// Captured from the device when `None`
    pub start: Option<u8>,
    pub end: u8,
    pub duration: Duration,
    pub easing: Easing,
}

impl EffectParams {
    /// Linear transition from the current device value
    pub const fn new(target: Target, end: u8, duration: Duration) -> Self {
        Self {
            target,
            start: None,
            end,
            duration,
            easing: Easing::LINEAR,
        }
    }

    pub const fn with_start(mut self, start: u8) -> Self {
        self.start = Some(start);
        self
    }

    pub const fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
}

/// A timed value-producing rule for one channel
#[derive(Debug)]
pub struct Effect {
    kind: EffectKind,
    target: Target,
    start: Option<u8>,
    end: u8,
    duration: Duration,
    easing: Easing,
    from: Instant,
    to: Instant,
    resolved_start: OnceLock<u8>,
    armed: AtomicBool,
    stopped: AtomicBool,
}

impl Effect {
    fn build(kind: EffectKind, params: EffectParams) -> Result<Self, Error> {
        check_channel(params.target.channel)?;
        let resolved_start = OnceLock::new();
        if let Some(start) = params.start {
            let _ = resolved_start.set(start);
        }
        let duration = match kind {
            EffectKind::Set => Duration::from_ticks(0),
            EffectKind::Transition | EffectKind::Pulse(_) => params.duration,
        };

        let mut effect = Self {
            kind,
            target: params.target,
            start: params.start,
            end: params.end,
            duration,
            easing: params.easing,
            from: Instant::MIN,
            to: Instant::MIN,
            resolved_start,
            armed: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
        };
        effect.start_at(Instant::MIN);
        Ok(effect)
    }

    /// Instant set of `value`
    pub fn set(target: Target, value: u8) -> Result<Self, Error> {
        Self::build(
            EffectKind::Set,
            EffectParams::new(target, value, Duration::from_ticks(0)),
        )
    }

    /// One-shot transition towards `params.end`
    pub fn transition(params: EffectParams) -> Result<Self, Error> {
        Self::build(EffectKind::Transition, params)
    }

    /// Repeating transition between start and end
    pub fn pulse(params: EffectParams, mode: PulseMode) -> Result<Self, Error> {
        Self::build(EffectKind::Pulse(mode), params)
    }

    /// Begin now
    pub fn start(&mut self, now: Instant) {
        self.start_at(now);
    }

    /// Begin `delay_ms` after `now`
    ///
    /// Negative delays place the start in the past (saturating at the clock
    /// origin), so the effect is immediately active.
    pub fn start_in(&mut self, now: Instant, delay_ms: i64) {
        let offset = Duration::from_millis(delay_ms.unsigned_abs());
        let from = if delay_ms >= 0 {
            now.checked_add(offset).unwrap_or(Instant::MAX)
        } else {
            now.checked_sub(offset).unwrap_or(Instant::MIN)
        };
        self.start_at(from);
    }

    /// Begin at an absolute instant
    pub fn start_at(&mut self, at: Instant) {
        self.from = at;
        self.to = match self.kind {
            EffectKind::Pulse(_) => Instant::MAX,
            EffectKind::Set | EffectKind::Transition => {
                at.checked_add(self.duration).unwrap_or(Instant::MAX)
            }
        };
    }

    /// Run over an explicit window
    ///
    /// Transitions take the window length as their duration, sets hold
    /// their value for the whole window and pulses stop at `to`.
    pub fn with_window(mut self, from: Instant, to: Instant) -> Result<Self, Error> {
        if from > to {
            return Err(Error::InvalidTimeRange);
        }
        if self.kind == EffectKind::Transition {
            self.duration = to.saturating_duration_since(from);
        }
        self.from = from;
        self.to = to;
        Ok(self)
    }

    pub const fn kind(&self) -> EffectKind {
        self.kind
    }

    pub const fn target(&self) -> Target {
        self.target
    }

    pub const fn queue(&self) -> QueueId {
        self.target.queue
    }

    pub const fn channel(&self) -> u16 {
        self.target.channel
    }

    pub const fn priority(&self) -> i32 {
        self.target.priority
    }

    /// Start value as given by the producer
    pub const fn start_value(&self) -> Option<u8> {
        self.start
    }

    /// Start value actually used for evaluation, once known
    pub fn resolved_start(&self) -> Option<u8> {
        self.resolved_start.get().copied()
    }

    pub const fn end_value(&self) -> u8 {
        self.end
    }

    pub const fn duration(&self) -> Duration {
        self.duration
    }

    pub const fn easing(&self) -> Easing {
        self.easing
    }

    pub const fn from_timestamp(&self) -> Instant {
        self.from
    }

    pub const fn to_timestamp(&self) -> Instant {
        self.to
    }

    pub fn is_pending(&self, now: Instant) -> bool {
        now < self.from
    }

    pub fn is_active(&self, now: Instant) -> bool {
        !self.is_pending(now) && !self.is_expired(now)
    }

    /// Past the window, or stopped
    pub fn is_expired(&self, now: Instant) -> bool {
        self.is_stopped() || now > self.to
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Force expiry; the tick loop retires the effect on its next pass
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    pub(crate) fn set_armed(&self, armed: bool) {
        self.armed.store(armed, Ordering::Release);
    }

    /// Resolve the start value, sampling it at most once
    pub(crate) fn resolve_start<E>(&self, sample: impl FnOnce() -> Result<u8, E>) -> Result<u8, E> {
        if let Some(start) = self.resolved_start.get() {
            return Ok(*start);
        }
        let sampled = sample()?;
        Ok(*self.resolved_start.get_or_init(|| sampled))
    }

    /// Value at `now`
    ///
    /// Only meaningful once the effect is no longer pending. Returns `None`
    /// while the start value has not been captured yet.
    pub fn current_value(&self, now: Instant) -> Option<u8> {
        if self.duration.as_ticks() == 0 {
            return Some(self.end);
        }
        let start = self.resolved_start()?;
        Some(self.value_from(start, now))
    }

    pub(crate) fn value_from(&self, start: u8, now: Instant) -> u8 {
        if self.duration.as_ticks() == 0 {
            return self.end;
        }
        let elapsed = now.saturating_duration_since(self.from);
        match self.kind {
            EffectKind::Pulse(mode) => {
                let fraction = mode.fraction(elapsed, self.duration);
                evaluate(fraction, start, self.end, &self.easing)
            }
            EffectKind::Set | EffectKind::Transition => evaluate(
                progress(elapsed, self.duration),
                start,
                self.end,
                &self.easing,
            ),
        }
    }
}

/// Producer-side handle to a queued effect
///
/// Holding a handle does not keep the effect alive in the registry; it only
/// allows cancelling it.
#[derive(Debug, Clone)]
pub struct EffectHandle {
    effect: Arc<Effect>,
}

impl EffectHandle {
    pub(crate) fn new(effect: Arc<Effect>) -> Self {
        Self { effect }
    }

    /// Cooperative cancellation, takes effect on the next tick
    pub fn stop(&self) {
        self.effect.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.effect.is_stopped()
    }

    pub fn effect(&self) -> &Effect {
        &self.effect
    }
}
