//! Ultrasonic range finder (HC-SR04 and compatibles).
//!
//! # Measurement
//!
//! 1. Pulse the trigger pin high for [`ULTRASONIC_TRIGGER_US`]
//! 2. Poll the echo pin until it goes high (echo start)
//! 3. Poll the echo pin until it goes low (echo end)
//! 4. Distance in meters = echo duration * [`HALF_SPEED_OF_SOUND`]
//!
//! Each wait is bounded by a poll count. A wait that runs out, or a pin error,
//! yields [`TIMEOUT_READING`].

use std::time::Instant;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use tracing::{trace, warn};

use super::{Sensor, TIMEOUT_READING};
use crate::config::{HALF_SPEED_OF_SOUND, ULTRASONIC_SETTLE_MS, ULTRASONIC_TIMEOUT_POLLS, ULTRASONIC_TRIGGER_US};

/// Range finder on a trigger output and an echo input.
pub struct UltrasonicRange<T, E, D> {
    trigger: T,
    echo: E,
    delay: D,
    timeout_polls: u32,
}

impl<T, E, D> UltrasonicRange<T, E, D>
where
    T: OutputPin,
    E: InputPin,
    D: DelayNs,
{
    /// Set up the module: trigger low, then wait for it to settle.
    pub fn new(
        mut trigger: T,
        echo: E,
        mut delay: D,
    ) -> Self {
        if let Err(e) = trigger.set_low() {
            warn!(error = ?e, "ultrasonic trigger reset failed");
        }
        delay.delay_ms(ULTRASONIC_SETTLE_MS);

        Self {
            trigger,
            echo,
            delay,
            timeout_polls: ULTRASONIC_TIMEOUT_POLLS,
        }
    }

    /// Set the number of echo polls before a read times out.
    #[must_use]
    pub fn with_timeout(
        mut self,
        polls: u32,
    ) -> Self {
        self.timeout_polls = polls;
        self
    }

    #[inline]
    pub const fn timeout_polls(&self) -> u32 { self.timeout_polls }

    /// Release the pins and the delay provider.
    pub fn release(self) -> (T, E, D) { (self.trigger, self.echo, self.delay) }

    fn pulse_trigger(&mut self) -> bool {
        if let Err(e) = self.trigger.set_high() {
            warn!(error = ?e, "ultrasonic trigger failed");
            return false;
        }
        self.delay.delay_us(ULTRASONIC_TRIGGER_US);
        if let Err(e) = self.trigger.set_low() {
            warn!(error = ?e, "ultrasonic trigger failed");
            return false;
        }
        true
    }

    /// Poll until the echo pin reads `level`.
    ///
    /// Returns the time of the last poll that did not match.
    fn wait_for(
        &mut self,
        level: bool,
    ) -> Option<Instant> {
        let mut at = Instant::now();
        for _ in 0..self.timeout_polls {
            match self.echo.is_high() {
                Ok(high) if high == level => return Some(at),
                Ok(_) => at = Instant::now(),
                Err(e) => {
                    warn!(error = ?e, "ultrasonic echo read failed");
                    return None;
                }
            }
        }
        None
    }
}

impl<T, E, D> Sensor for UltrasonicRange<T, E, D>
where
    T: OutputPin,
    E: InputPin,
    D: DelayNs,
{
    fn read(&mut self) -> f32 {
        if !self.pulse_trigger() {
            return TIMEOUT_READING;
        }

        let Some(start) = self.wait_for(true) else {
            trace!("ultrasonic echo never started");
            return TIMEOUT_READING;
        };
        let Some(stop) = self.wait_for(false) else {
            trace!("ultrasonic echo never ended");
            return TIMEOUT_READING;
        };

        stop.saturating_duration_since(start).as_secs_f32() * HALF_SPEED_OF_SOUND
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use core::convert::Infallible;
    use std::collections::VecDeque;

    use embedded_hal::digital::{ErrorKind, ErrorType};

    use super::*;

    #[derive(Default)]
    struct RecordingPin {
        levels: Vec<bool>,
    }

    impl ErrorType for RecordingPin {
        type Error = Infallible;
    }

    impl OutputPin for RecordingPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.levels.push(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.levels.push(true);
            Ok(())
        }
    }

    /// Echo pin replaying scripted levels, then staying at `rest`.
    struct EchoPin {
        levels: VecDeque<bool>,
        rest: bool,
    }

    impl EchoPin {
        fn new(
            levels: &[bool],
            rest: bool,
        ) -> Self {
            Self {
                levels: levels.iter().copied().collect(),
                rest,
            }
        }
    }

    impl ErrorType for EchoPin {
        type Error = Infallible;
    }

    impl InputPin for EchoPin {
        fn is_high(&mut self) -> Result<bool, Self::Error> { Ok(self.levels.pop_front().unwrap_or(self.rest)) }

        fn is_low(&mut self) -> Result<bool, Self::Error> { self.is_high().map(|h| !h) }
    }

    #[derive(Debug)]
    struct PinFault;

    impl embedded_hal::digital::Error for PinFault {
        fn kind(&self) -> ErrorKind { ErrorKind::Other }
    }

    struct FaultyEcho;

    impl ErrorType for FaultyEcho {
        type Error = PinFault;
    }

    impl InputPin for FaultyEcho {
        fn is_high(&mut self) -> Result<bool, Self::Error> { Err(PinFault) }

        fn is_low(&mut self) -> Result<bool, Self::Error> { Err(PinFault) }
    }

    /// Delay that only records how long it was asked to wait.
    #[derive(Default)]
    struct FakeDelay {
        total_ns: u64,
    }

    impl DelayNs for FakeDelay {
        fn delay_ns(
            &mut self,
            ns: u32,
        ) {
            self.total_ns += u64::from(ns);
        }
    }

    #[test]
    fn test_setup_settles() {
        let sensor = UltrasonicRange::new(RecordingPin::default(), EchoPin::new(&[], false), FakeDelay::default());
        assert_eq!(sensor.timeout_polls(), ULTRASONIC_TIMEOUT_POLLS);
        let (trigger, _, delay) = sensor.release();
        assert_eq!(trigger.levels, vec![false]);
        assert_eq!(delay.total_ns, u64::from(ULTRASONIC_SETTLE_MS) * 1_000_000);
    }

    #[test]
    fn test_echo_measured() {
        let echo = EchoPin::new(&[false, false, true, true, true, false], false);
        let mut sensor = UltrasonicRange::new(RecordingPin::default(), echo, FakeDelay::default());
        let distance = sensor.read();
        assert!(distance >= 0.0);
        assert!(distance < 1.0);

        let (trigger, _, delay) = sensor.release();
        assert_eq!(trigger.levels, vec![false, true, false]);
        assert_eq!(
            delay.total_ns,
            u64::from(ULTRASONIC_SETTLE_MS) * 1_000_000 + u64::from(ULTRASONIC_TRIGGER_US) * 1_000
        );
    }

    #[test]
    fn test_no_echo_times_out() {
        let mut sensor =
            UltrasonicRange::new(RecordingPin::default(), EchoPin::new(&[], false), FakeDelay::default());
        assert_eq!(sensor.read(), TIMEOUT_READING);
    }

    #[test]
    fn test_stuck_echo_times_out() {
        let mut sensor =
            UltrasonicRange::new(RecordingPin::default(), EchoPin::new(&[], true), FakeDelay::default()).with_timeout(5);
        assert_eq!(sensor.read(), TIMEOUT_READING);
    }

    #[test]
    fn test_echo_after_timeout_is_missed() {
        let mut levels = vec![false; 10];
        levels.push(true);
        let echo = EchoPin::new(&levels, false);
        let mut sensor = UltrasonicRange::new(RecordingPin::default(), echo, FakeDelay::default()).with_timeout(10);
        assert_eq!(sensor.read(), TIMEOUT_READING);
    }

    #[test]
    fn test_pin_error_times_out() {
        let mut sensor = UltrasonicRange::new(RecordingPin::default(), FaultyEcho, FakeDelay::default());
        assert_eq!(sensor.read(), TIMEOUT_READING);
    }
}
