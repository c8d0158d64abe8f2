use embassy_time::Duration;

use crate::effect::PulseMode;

/// Default tick period of the scheduler loop
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(5);

/// How long `dispose` waits for the tick thread
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

/// Consecutive failing ticks before a device fault is escalated
pub const DEFAULT_FAULT_THRESHOLD: u32 = 200;

/// When an effect without an explicit start value samples the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartCapture {
    /// When the effect is queued
    #[default]
    OnQueue,
    /// On the first tick where the effect is due
    OnActivation,
}

/// Configuration for the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub tick_period: Duration,
    pub shutdown_timeout: Duration,
    pub start_capture: StartCapture,
    /// Mode used by `Scheduler::pulse`
    pub pulse_mode: PulseMode,
    pub fault_threshold: u32,
    /// Priority of the sentinel queue the bus is zeroed on
    pub baseline_priority: i32,
}

impl SchedulerConfig {
    pub const DEFAULT: Self = Self {
        tick_period: DEFAULT_TICK_PERIOD,
        shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        start_capture: StartCapture::OnQueue,
        pulse_mode: PulseMode::Reflect,
        fault_threshold: DEFAULT_FAULT_THRESHOLD,
        baseline_priority: 1,
    };

    pub const fn with_tick_period(mut self, tick_period: Duration) -> Self {
        self.tick_period = tick_period;
        self
    }

    pub const fn with_shutdown_timeout(mut self, shutdown_timeout: Duration) -> Self {
        self.shutdown_timeout = shutdown_timeout;
        self
    }

    pub const fn with_start_capture(mut self, start_capture: StartCapture) -> Self {
        self.start_capture = start_capture;
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
