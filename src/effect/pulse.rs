use embassy_time::Duration;

use crate::math8::progress;

/// What a pulse does when it reaches its end value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PulseMode {
    /// Ping-pong: start -> end -> start, one full period is two passes
    #[default]
    Reflect,
    /// Saw: jump back to start after every pass
    Restart,
}

impl PulseMode {
    /// Position inside the current pass, `0.0..=1.0`
    pub fn fraction(self, elapsed: Duration, pass: Duration) -> f32 {
        let pass_ticks = pass.as_ticks();
        if pass_ticks == 0 {
            return 1.0;
        }
        let elapsed_ticks = elapsed.as_ticks();

        match self {
            Self::Reflect => {
                let phase = elapsed_ticks % pass_ticks.saturating_mul(2);
                if phase <= pass_ticks {
                    progress(Duration::from_ticks(phase), pass)
                } else {
                    progress(Duration::from_ticks(2 * pass_ticks - phase), pass)
                }
            }
            Self::Restart => progress(Duration::from_ticks(elapsed_ticks % pass_ticks), pass),
        }
    }
}
