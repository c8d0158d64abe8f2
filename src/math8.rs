use embassy_time::Duration;

/// Full scale of a 16-bit blend amount
pub const AMOUNT_MAX: u16 = u16::MAX;

/// Blend two 8-bit values by a 16-bit amount (0 = `a`, `AMOUNT_MAX` = `b`)
///
/// Rounds half away from zero, so both endpoints are exact and the result
/// is monotonic in `amount`.
#[inline]
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub const fn blend8(a: u8, b: u8, amount_of_b: u16) -> u8 {
    let delta = b as i32 - a as i32;
    let scaled = delta * amount_of_b as i32;
    let half = if delta >= 0 {
        AMOUNT_MAX as i32 / 2
    } else {
        -(AMOUNT_MAX as i32 / 2)
    };

    (a as i32 + (scaled + half) / AMOUNT_MAX as i32) as u8
}

/// Convert a unit fraction to a 16-bit blend amount
#[inline]
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub fn amount16(fraction: f32) -> u16 {
    if fraction.is_nan() || fraction <= 0.0 {
        return 0;
    }
    if fraction >= 1.0 {
        return AMOUNT_MAX;
    }
    libm::roundf(fraction * f32::from(AMOUNT_MAX)) as u16
}

/// Elapsed share of a duration, clamped to `0.0..=1.0`
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn progress(elapsed: Duration, duration: Duration) -> f32 {
    if duration.as_ticks() == 0 || elapsed >= duration {
        return 1.0;
    }

    (elapsed.as_ticks() as f64 / duration.as_ticks() as f64) as f32
}
