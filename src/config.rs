//! Installation configuration: default constants and the typed loop configuration.
//!
//! There is no file format. Callers build an [`InstallationConfig`] in code, starting
//! from [`InstallationConfig::default`] and overriding fields with the `with_*` setters.

use std::time::Duration;

use crate::installation::Generator;

// =============================================================================
// Control Loop Defaults
// =============================================================================

/// Time between polls of the main loop (sensor reads, render checks).
pub const DEFAULT_SAMPLING_RATE: Duration = Duration::from_millis(100);

/// Minimum time between two generator iterations.
pub const DEFAULT_ITERATION_INTERVAL: Duration = Duration::from_secs(1);

/// Iterations shown before a new generator and plot style are chosen.
pub const DEFAULT_NUM_ITERATIONS: u32 = 1000;

/// Generator steps executed before a freshly selected generator is first displayed.
pub const DEFAULT_BURN_IN: u32 = 0;

/// Longest uninterrupted sleep of a running loop. Bounds how late a stop request is seen.
pub const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Upper bound on the pause between two ticks, whatever `sampling_rate` says.
pub const MAX_TICK_PAUSE: Duration = Duration::from_secs(3600);

// =============================================================================
// Panel Defaults
// =============================================================================

/// Edge length of the common 32x32 HUB75 panel.
pub const DEFAULT_PANEL_SIZE: usize = 32;

// =============================================================================
// Sensor Defaults
// =============================================================================

/// Reading at which a curve outputs half of its maximum.
pub const DEFAULT_HALF_VALUE: f32 = 1.0;

/// Upper bound of a curve's output.
pub const DEFAULT_MAX_VALUE: f32 = 300.0;

/// Curve steepness (< 1 shallow, > 1 steep, negative inverts the response).
pub const DEFAULT_STEEPNESS: f32 = 4.0;

/// Echo-pin polls before an ultrasonic read gives up and reports a timeout.
pub const ULTRASONIC_TIMEOUT_POLLS: u32 = 100;

/// Length of the ultrasonic trigger pulse in microseconds.
pub const ULTRASONIC_TRIGGER_US: u32 = 10;

/// Settle time after the ultrasonic module is set up, in milliseconds.
pub const ULTRASONIC_SETTLE_MS: u32 = 500;

/// Half the speed of sound in m/s (the ping travels there and back).
pub const HALF_SPEED_OF_SOUND: f32 = 170.0;

/// Button debounce duration in milliseconds.
pub const DEBOUNCE_MS: u64 = 50;

// =============================================================================
// Event Log Configuration
// =============================================================================

/// Number of loop events kept in the ring buffer.
pub const EVENT_LOG_SIZE: usize = 16;

// =============================================================================
// Installation Configuration
// =============================================================================

/// Configuration of an [`ArtInstallation`](crate::ArtInstallation).
///
/// `generator_configs` and `plot_configs` are the candidate parameter sets the
/// loop chooses from uniformly at random. An empty list means "use the default".
pub struct InstallationConfig<G: Generator> {
    /// Candidate generator parameter sets.
    pub generator_configs: Vec<G::Config>,
    /// Candidate plot style parameter sets.
    pub plot_configs: Vec<G::Style>,
    /// Time between loop polls.
    pub sampling_rate: Duration,
    /// Minimum time between generator iterations.
    pub iteration_interval: Duration,
    /// Iterations before a new generator is chosen.
    pub num_iterations: u32,
    /// Steps run on a new generator before it is displayed.
    pub burn_in: u32,
}

impl<G: Generator> InstallationConfig<G> {
    /// Set the candidate generator parameter sets.
    pub fn with_generator_configs(
        mut self,
        configs: Vec<G::Config>,
    ) -> Self {
        self.generator_configs = configs;
        self
    }

    /// Set the candidate plot styles.
    pub fn with_plot_configs(
        mut self,
        configs: Vec<G::Style>,
    ) -> Self {
        self.plot_configs = configs;
        self
    }

    /// Set the loop polling period.
    pub fn with_sampling_rate(
        mut self,
        sampling_rate: Duration,
    ) -> Self {
        self.sampling_rate = sampling_rate;
        self
    }

    /// Set the minimum time between iterations.
    pub fn with_iteration_interval(
        mut self,
        iteration_interval: Duration,
    ) -> Self {
        self.iteration_interval = iteration_interval;
        self
    }

    /// Set the number of iterations per generator.
    pub fn with_num_iterations(
        mut self,
        num_iterations: u32,
    ) -> Self {
        self.num_iterations = num_iterations;
        self
    }

    /// Set the number of burn-in steps.
    pub fn with_burn_in(
        mut self,
        burn_in: u32,
    ) -> Self {
        self.burn_in = burn_in;
        self
    }
}

impl<G: Generator> Default for InstallationConfig<G> {
    fn default() -> Self {
        Self {
            generator_configs: Vec::new(),
            plot_configs: Vec::new(),
            sampling_rate: DEFAULT_SAMPLING_RATE,
            iteration_interval: DEFAULT_ITERATION_INTERVAL,
            num_iterations: DEFAULT_NUM_ITERATIONS,
            burn_in: DEFAULT_BURN_IN,
        }
    }
}

impl<G: Generator> Clone for InstallationConfig<G> {
    fn clone(&self) -> Self {
        Self {
            generator_configs: self.generator_configs.clone(),
            plot_configs: self.plot_configs.clone(),
            sampling_rate: self.sampling_rate,
            iteration_interval: self.iteration_interval,
            num_iterations: self.num_iterations,
            burn_in: self.burn_in,
        }
    }
}
