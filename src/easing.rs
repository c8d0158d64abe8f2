//! Easing curves
//!
//! A transition is split in two halves. [`EasingExtents`] decides which
//! halves are shaped by a curve; the others interpolate linearly. Both halves
//! meet at `(0.5, 0.5)`, so every combination stays continuous and monotonic.

use core::f32::consts::FRAC_PI_2;

use crate::math8::{amount16, blend8};

/// Curve shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EasingType {
    #[default]
    Linear,
    Sine,
    Quadratic,
    Cubic,
    Quartic,
    Quintic,
    Exponential,
    Circular,
}

/// Portions of the transition that receive the curve shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EasingExtents {
    /// Linear throughout
    #[default]
    None,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl EasingType {
    /// Ease-in shape: `f(0) = 0`, `f(1) = 1`, monotonic
    pub fn ease_in(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        let y = match self {
            Self::Linear => t,
            Self::Sine => 1.0 - libm::cosf(t * FRAC_PI_2),
            Self::Quadratic => t * t,
            Self::Cubic => t * t * t,
            Self::Quartic => libm::powf(t, 4.0),
            Self::Quintic => libm::powf(t, 5.0),
            Self::Exponential => (libm::exp2f(10.0 * t) - 1.0) / 1023.0,
            Self::Circular => 1.0 - libm::sqrtf(1.0 - t * t),
        };
        y.clamp(0.0, 1.0)
    }

    /// Mirror image of [`EasingType::ease_in`]
    pub fn ease_out(self, t: f32) -> f32 {
        1.0 - self.ease_in(1.0 - t.clamp(0.0, 1.0))
    }
}

/// Full easing description of a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Easing {
    pub curve_in: EasingType,
    pub curve_out: EasingType,
    pub extents: EasingExtents,
}

impl Easing {
    pub const LINEAR: Self = Self {
        curve_in: EasingType::Linear,
        curve_out: EasingType::Linear,
        extents: EasingExtents::None,
    };

    pub const fn new(curve_in: EasingType, curve_out: EasingType, extents: EasingExtents) -> Self {
        Self {
            curve_in,
            curve_out,
            extents,
        }
    }

    /// Same curve on both ends
    pub const fn symmetric(curve: EasingType, extents: EasingExtents) -> Self {
        Self::new(curve, curve, extents)
    }

    /// Map a linear fraction to an eased fraction
    pub fn shape(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        let shape_in = matches!(self.extents, EasingExtents::EaseIn | EasingExtents::EaseInOut);
        let shape_out = matches!(self.extents, EasingExtents::EaseOut | EasingExtents::EaseInOut);

        if t < 0.5 {
            if shape_in {
                0.5 * self.curve_in.ease_in(t * 2.0)
            } else {
                t
            }
        } else if shape_out {
            0.5 + 0.5 * self.curve_out.ease_out(t * 2.0 - 1.0)
        } else {
            t
        }
    }
}

/// Resolve the byte value at `fraction` of the way from `start` to `end`
///
/// Endpoints are exact for every curve and extent.
pub fn evaluate(fraction: f32, start: u8, end: u8, easing: &Easing) -> u8 {
    if fraction.is_nan() || fraction <= 0.0 {
        return start;
    }
    if fraction >= 1.0 {
        return end;
    }

    blend8(start, end, amount16(easing.shape(fraction)))
}
