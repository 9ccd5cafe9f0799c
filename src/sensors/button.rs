//! Debounced push button.
//!
//! A press is reported once, on the edge. Level changes that follow an
//! accepted change within [`DEBOUNCE_MS`] are treated as contact bounce.

use std::time::{Duration, Instant};

use embedded_hal::digital::InputPin;
use tracing::warn;

use super::Sensor;
use crate::config::DEBOUNCE_MS;

/// Button debounce state with time-based edge detection.
#[derive(Clone, Copy, Debug)]
pub struct ButtonState {
    was_pressed: bool,
    last_change: Option<Instant>,
}

impl ButtonState {
    /// Create a new button state (not pressed).
    pub const fn new() -> Self {
        Self {
            was_pressed: false,
            last_change: None,
        }
    }

    /// Returns true only on the press edge.
    ///
    /// Changes closer than [`DEBOUNCE_MS`] to the previous accepted change are ignored.
    pub fn just_pressed(
        &mut self,
        pressed: bool,
        now: Instant,
    ) -> bool {
        if pressed != self.was_pressed {
            if let Some(last) = self.last_change
                && now.saturating_duration_since(last) < Duration::from_millis(DEBOUNCE_MS)
            {
                return false;
            }

            self.was_pressed = pressed;
            self.last_change = Some(now);

            return pressed;
        }

        false
    }
}

impl Default for ButtonState {
    fn default() -> Self { Self::new() }
}

/// Push button sensor. Reads `1.0` once per press, `0.0` otherwise.
pub struct Button<P> {
    pin: P,
    active_low: bool,
    state: ButtonState,
}

impl<P: InputPin> Button<P> {
    /// Active-low button (pressed pulls the pin low, internal pull-up).
    pub const fn new(pin: P) -> Self {
        Self {
            pin,
            active_low: true,
            state: ButtonState::new(),
        }
    }

    /// Button that drives the pin high when pressed.
    pub const fn active_high(pin: P) -> Self {
        Self {
            pin,
            active_low: false,
            state: ButtonState::new(),
        }
    }

    /// Release the pin.
    pub fn release(self) -> P { self.pin }
}

impl<P: InputPin> Sensor for Button<P> {
    fn read(&mut self) -> f32 {
        let pressed = match self.pin.is_low() {
            Ok(low) => low == self.active_low,
            Err(e) => {
                warn!(error = ?e, "button pin read failed");
                false
            }
        };

        if self.state.just_pressed(pressed, Instant::now()) { 1.0 } else { 0.0 }
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

    /// Input pin replaying a fixed sequence of low/high levels.
    struct ScriptedPin {
        lows: VecDeque<bool>,
    }

    impl ScriptedPin {
        fn new(lows: &[bool]) -> Self {
            Self {
                lows: lows.iter().copied().collect(),
            }
        }
    }

    impl ErrorType for ScriptedPin {
        type Error = Infallible;
    }

    impl InputPin for ScriptedPin {
        fn is_high(&mut self) -> Result<bool, Self::Error> { self.is_low().map(|low| !low) }

        fn is_low(&mut self) -> Result<bool, Self::Error> { Ok(self.lows.pop_front().unwrap_or(false)) }
    }

    #[derive(Debug)]
    struct PinFault;

    impl embedded_hal::digital::Error for PinFault {
        fn kind(&self) -> ErrorKind { ErrorKind::Other }
    }

    struct FaultyPin;

    impl ErrorType for FaultyPin {
        type Error = PinFault;
    }

    impl InputPin for FaultyPin {
        fn is_high(&mut self) -> Result<bool, Self::Error> { Err(PinFault) }

        fn is_low(&mut self) -> Result<bool, Self::Error> { Err(PinFault) }
    }

    #[test]
    fn test_press_edge_only() {
        let t0 = Instant::now();
        let mut state = ButtonState::new();
        assert!(!state.just_pressed(false, t0));
        assert!(state.just_pressed(true, t0));
        // Held: no repeat
        assert!(!state.just_pressed(true, t0 + Duration::from_millis(200)));
        // Release edge is not a press
        assert!(!state.just_pressed(false, t0 + Duration::from_millis(300)));
        assert!(state.just_pressed(true, t0 + Duration::from_millis(400)));
    }

    #[test]
    fn test_bounce_ignored() {
        let t0 = Instant::now();
        let mut state = ButtonState::new();
        assert!(state.just_pressed(true, t0));
        // Contact bounce within the debounce window
        assert!(!state.just_pressed(false, t0 + Duration::from_millis(5)));
        assert!(!state.just_pressed(true, t0 + Duration::from_millis(10)));
        assert!(!state.just_pressed(false, t0 + Duration::from_millis(20)));
        // Still considered pressed, so no new edge
        assert!(!state.just_pressed(true, t0 + Duration::from_millis(100)));
    }

    #[test]
    fn test_button_reads_one_on_press() {
        // Active-low: low means pressed
        let mut button = Button::new(ScriptedPin::new(&[false, true, true]));
        assert_eq!(button.read(), 0.0);
        assert_eq!(button.read(), 1.0);
        assert_eq!(button.read(), 0.0);
    }

    #[test]
    fn test_active_high_button() {
        let mut button = Button::active_high(ScriptedPin::new(&[true, false]));
        // Pin low: not pressed
        assert_eq!(button.read(), 0.0);
        assert_eq!(button.read(), 1.0);
        let _pin: ScriptedPin = button.release();
    }

    #[test]
    fn test_pin_error_reads_released() {
        let mut button = Button::new(FaultyPin);
        assert_eq!(button.read(), 0.0);
        assert_eq!(button.read(), 0.0);
    }
}
