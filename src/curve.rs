//! Logistic response curve mapping raw sensor readings to control values.
//!
//! ```text
//! A     = (reading / half_value) ^ steepness
//! value = A / (1 + A) * max_value
//! ```
//!
//! The output is `max_value / 2` at `reading == half_value`, rises towards
//! `max_value` for positive steepness and falls for negative steepness.

use crate::config::{DEFAULT_HALF_VALUE, DEFAULT_MAX_VALUE, DEFAULT_STEEPNESS};
use crate::error::{Error, Result};

/// Sensor response curve parameters.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct SensorCurve {
    half_value: f32,
    max_value: f32,
    steepness: f32,
}

impl SensorCurve {
    /// Create a curve.
    ///
    /// `half_value` must be finite and positive, `max_value` and `steepness`
    /// finite. Anything else is [`Error::InvalidCurve`].
    pub fn new(
        half_value: f32,
        max_value: f32,
        steepness: f32,
    ) -> Result<Self> {
        if !half_value.is_finite() || half_value <= 0.0 {
            return Err(Error::InvalidCurve(format!("half_value must be positive, got {half_value}")));
        }
        if !max_value.is_finite() {
            return Err(Error::InvalidCurve(format!("max_value must be finite, got {max_value}")));
        }
        if !steepness.is_finite() {
            return Err(Error::InvalidCurve(format!("steepness must be finite, got {steepness}")));
        }
        Ok(Self {
            half_value,
            max_value,
            steepness,
        })
    }

    #[inline]
    pub const fn half_value(&self) -> f32 { self.half_value }

    #[inline]
    pub const fn max_value(&self) -> f32 { self.max_value }

    #[inline]
    pub const fn steepness(&self) -> f32 { self.steepness }

    /// Map a reading through the curve.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidReading`] for a non-finite reading, a negative reading
    /// combined with a non-integer steepness, or a negative reading that an odd
    /// steepness turns into a negative `A` (the result would leave `[0, max_value)`).
    pub fn evaluate(
        &self,
        reading: f32,
    ) -> Result<f32> {
        if !reading.is_finite() || (reading < 0.0 && self.steepness.fract() != 0.0) {
            return Err(Error::InvalidReading {
                reading,
                steepness: self.steepness,
            });
        }

        let a = (reading / self.half_value).powf(self.steepness);
        if a.is_nan() || a < 0.0 {
            return Err(Error::InvalidReading {
                reading,
                steepness: self.steepness,
            });
        }
        if a.is_infinite() {
            return Ok(self.max_value);
        }
        Ok(a / (1.0 + a) * self.max_value)
    }
}

impl Default for SensorCurve {
    fn default() -> Self {
        Self {
            half_value: DEFAULT_HALF_VALUE,
            max_value: DEFAULT_MAX_VALUE,
            steepness: DEFAULT_STEEPNESS,
        }
    }
}

/// Evaluate the curve for one reading without building a [`SensorCurve`].
pub fn evaluate(
    reading: f32,
    half_value: f32,
    max_value: f32,
    steepness: f32,
) -> Result<f32> {
    SensorCurve::new(half_value, max_value, steepness)?.evaluate(reading)
}

// =============================================================================
// Unit Tests
// =============================================================================
