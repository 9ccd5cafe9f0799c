//! Sensors and their bindings to control-loop parameters.
//!
//! - [`Sensor`]: anything that produces a scalar reading
//! - [`SensorBinding`]: a sensor, a [`SensorCurve`] and the [`ControlTarget`] it drives
//! - [`UltrasonicRange`]: HC-SR04 style range finder over `embedded-hal` pins
//! - [`Button`]: debounced push button over an `embedded-hal` input pin
//!
//! # Timeouts
//!
//! A sensor that cannot produce a value returns [`TIMEOUT_READING`]. The loop
//! skips such readings and the bound parameter keeps its previous value.

mod button;
mod ultrasonic;

use core::fmt;
use core::str::FromStr;
use std::time::Duration;

pub use button::{Button, ButtonState};
pub use ultrasonic::UltrasonicRange;

use crate::curve::SensorCurve;
use crate::error::{Error, Result};

/// Reading returned when a sensor timed out.
pub const TIMEOUT_READING: f32 = -1.0;

/// Whether `reading` means "no value" (the timeout sentinel or NaN).
#[inline]
pub fn is_timeout(reading: f32) -> bool {
    reading == TIMEOUT_READING || reading.is_nan()
}

// =============================================================================
// Sensor Trait
// =============================================================================

/// Source of scalar readings.
pub trait Sensor {
    /// Take one reading. Returns [`TIMEOUT_READING`] when no value is available.
    fn read(&mut self) -> f32;
}

impl<F> Sensor for F
where
    F: FnMut() -> f32,
{
    fn read(&mut self) -> f32 { self() }
}

// =============================================================================
// Control Targets
// =============================================================================

/// Numeric loop parameter a sensor can drive.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ControlParam {
    /// Time between loop polls (seconds).
    SamplingRate,
    /// Minimum time between generator iterations (seconds).
    IterationInterval,
    /// Iterations before a new generator is chosen.
    NumIterations,
}

/// One-shot loop request a sensor can raise.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ControlFlag {
    /// Select a new generator and reset the iteration counter.
    NewGenerator,
    /// Select a new plot style.
    NewPlot,
}

/// Anything a [`SensorBinding`] can write to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ControlTarget {
    Param(ControlParam),
    Flag(ControlFlag),
}

impl ControlTarget {
    /// Name used when parsing a target.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Param(ControlParam::SamplingRate) => "sampling_rate",
            Self::Param(ControlParam::IterationInterval) => "iteration_interval",
            Self::Param(ControlParam::NumIterations) => "num_iterations",
            Self::Flag(ControlFlag::NewGenerator) => "choose_new_generator",
            Self::Flag(ControlFlag::NewPlot) => "choose_new_plot",
        }
    }
}

impl From<ControlParam> for ControlTarget {
    fn from(param: ControlParam) -> Self { Self::Param(param) }
}

impl From<ControlFlag> for ControlTarget {
    fn from(flag: ControlFlag) -> Self { Self::Flag(flag) }
}

impl FromStr for ControlTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sampling_rate" => Ok(ControlParam::SamplingRate.into()),
            "iteration_interval" => Ok(ControlParam::IterationInterval.into()),
            "num_iterations" => Ok(ControlParam::NumIterations.into()),
            "choose_new_generator" => Ok(ControlFlag::NewGenerator.into()),
            "choose_new_plot" => Ok(ControlFlag::NewPlot.into()),
            other => Err(Error::UnknownTarget(other.to_string())),
        }
    }
}

impl fmt::Display for ControlTarget {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Convert a curve value in seconds to a duration, clamping negatives to zero.
pub(crate) fn seconds(value: f32) -> Duration {
    Duration::try_from_secs_f32(value.max(0.0)).unwrap_or(Duration::MAX)
}

/// Convert a curve value to an iteration count, clamping negatives to zero.
pub(crate) fn count(value: f32) -> u32 {
    value.max(0.0).round() as u32
}

// =============================================================================
// Sensor Binding
// =============================================================================

/// A sensor, the curve applied to its readings and the target it drives.
pub struct SensorBinding {
    sensor: Box<dyn Sensor + Send>,
    target: ControlTarget,
    curve: SensorCurve,
}

impl SensorBinding {
    pub fn new<S>(
        sensor: S,
        target: impl Into<ControlTarget>,
        curve: SensorCurve,
    ) -> Self
    where
        S: Sensor + Send + 'static,
    {
        Self {
            sensor: Box::new(sensor),
            target: target.into(),
            curve,
        }
    }

    /// Bind to a target given by name. Unknown names fail with [`Error::UnknownTarget`].
    pub fn named<S>(
        sensor: S,
        target: &str,
        curve: SensorCurve,
    ) -> Result<Self>
    where
        S: Sensor + Send + 'static,
    {
        Ok(Self::new(sensor, target.parse::<ControlTarget>()?, curve))
    }

    #[inline]
    pub const fn target(&self) -> ControlTarget { self.target }

    #[inline]
    pub const fn curve(&self) -> &SensorCurve { &self.curve }

    /// Read the sensor and map the reading through the curve.
    ///
    /// Returns `Ok(None)` when the sensor timed out.
    pub fn poll(&mut self) -> Result<Option<f32>> {
        let reading = self.sensor.read();
        if is_timeout(reading) {
            return Ok(None);
        }
        self.curve.evaluate(reading).map(Some)
    }
}

impl fmt::Debug for SensorBinding {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("SensorBinding")
            .field("target", &self.target)
            .field("curve", &self.curve)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_names_round_trip() {
        for name in [
            "sampling_rate",
            "iteration_interval",
            "num_iterations",
            "choose_new_generator",
            "choose_new_plot",
        ] {
            let target: ControlTarget = name.parse().unwrap();
            assert_eq!(target.to_string(), name);
        }
    }

    #[test]
    fn test_unknown_target() {
        assert!(matches!("brightness".parse::<ControlTarget>(), Err(Error::UnknownTarget(ref n)) if n == "brightness"));
        assert!(SensorBinding::named(|| 1.0, "_generator", SensorCurve::default()).is_err());
    }

    #[test]
    fn test_timeout_sentinel() {
        assert!(is_timeout(TIMEOUT_READING));
        assert!(is_timeout(f32::NAN));
        assert!(!is_timeout(-0.5));
        assert!(!is_timeout(0.0));
    }

    #[test]
    fn test_poll_applies_curve() {
        let mut binding = SensorBinding::named(|| 1.0, "iteration_interval", SensorCurve::default()).unwrap();
        assert_eq!(binding.target(), ControlTarget::Param(ControlParam::IterationInterval));
        let value = binding.poll().unwrap().unwrap();
        assert!((value - 150.0).abs() < 1e-3);
    }

    #[test]
    fn test_poll_skips_timeout() {
        let mut binding = SensorBinding::new(|| TIMEOUT_READING, ControlParam::SamplingRate, SensorCurve::default());
        assert!(binding.poll().unwrap().is_none());

        let mut binding = SensorBinding::new(|| f32::NAN, ControlParam::SamplingRate, SensorCurve::default());
        assert!(binding.poll().unwrap().is_none());
    }

    #[test]
    fn test_poll_invalid_reading() {
        let curve = SensorCurve::new(1.0, 10.0, 0.5).unwrap();
        let mut binding = SensorBinding::new(|| -2.0, ControlFlag::NewPlot, curve);
        assert!(matches!(binding.poll(), Err(Error::InvalidReading { .. })));
    }

    #[test]
    fn test_stateful_sensor_closure() {
        let mut n = 0.0;
        let mut binding = SensorBinding::new(
            move || {
                n += 1.0;
                n
            },
            ControlParam::NumIterations,
            SensorCurve::new(2.0, 100.0, 1.0).unwrap(),
        );
        let first = binding.poll().unwrap().unwrap();
        let second = binding.poll().unwrap().unwrap();
        assert!((second - 50.0).abs() < 1e-3);
        assert!(second > first);
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(seconds(1.5), Duration::from_millis(1500));
        assert_eq!(seconds(-3.0), Duration::ZERO);
        assert_eq!(seconds(f32::MAX), Duration::MAX);
        assert_eq!(count(299.6), 300);
        assert_eq!(count(-4.0), 0);
    }
}
