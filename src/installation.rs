//! The art installation control loop.
//!
//! An [`ArtInstallation`] owns a [`Generator`], a [`Display`] and a list of
//! [`SensorBinding`]s and runs one cooperative polling loop:
//!
//! ```text
//!   every sampling_rate:
//!     iteration_interval elapsed? -> iterate, render, draw, counter += 1
//!     counter > num_iterations?   -> new generator + plot style, counter = 0
//!     poll sensors                -> curve -> parameter / flag
//!     flags raised?               -> new generator and/or plot style
//! ```
//!
//! # States
//!
//! `Idle` after construction, `Running` inside [`ArtInstallation::run`],
//! `Stopped` once the loop has observed a stop request or hit an error.
//!
//! # Threads
//!
//! The loop itself is single-threaded. Other threads talk to it through an
//! [`InstallationHandle`], which only toggles atomic flags.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace, warn};

use crate::backend::Backend;
use crate::config::{InstallationConfig, MAX_TICK_PAUSE, STOP_POLL_INTERVAL};
use crate::display::{Display, Frame};
use crate::error::Result;
use crate::metrics::{EventLog, LoopEventKind, LoopMetrics};
use crate::sensors::{self, ControlFlag, ControlParam, ControlTarget, SensorBinding};

// =============================================================================
// Generator Contract
// =============================================================================

/// Source of the images shown by an installation.
pub trait Generator {
    /// Parameters used to create a generator instance.
    type Config: Clone + Default;
    /// Parameters used to turn the generator state into pixels.
    type Style: Clone + Default;

    fn new(config: &Self::Config) -> Self;

    /// Advance the generator by one step.
    fn iterate(&mut self);

    /// Render the current state. The frame must match the display's total size.
    fn render(
        &self,
        style: &Self::Style,
    ) -> Frame;
}

// =============================================================================
// Controls and Flags
// =============================================================================

/// Loop parameters that sensors may change while running.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Controls {
    pub sampling_rate: Duration,
    pub iteration_interval: Duration,
    pub num_iterations: u32,
}

impl Controls {
    /// Write a curve value to `param`. Returns whether the parameter changed.
    ///
    /// Durations are interpreted as seconds, iteration counts are rounded.
    /// Negative values clamp to zero.
    pub fn apply(
        &mut self,
        param: ControlParam,
        value: f32,
    ) -> bool {
        match param {
            ControlParam::SamplingRate => replace(&mut self.sampling_rate, sensors::seconds(value)),
            ControlParam::IterationInterval => replace(&mut self.iteration_interval, sensors::seconds(value)),
            ControlParam::NumIterations => replace(&mut self.num_iterations, sensors::count(value)),
        }
    }
}

fn replace<T: PartialEq>(
    slot: &mut T,
    value: T,
) -> bool {
    let changed = *slot != value;
    *slot = value;
    changed
}

/// Cross-thread requests to a running loop.
#[derive(Debug, Default)]
pub struct ControlFlags {
    stop: AtomicBool,
    new_generator: AtomicBool,
    new_plot: AtomicBool,
}

impl ControlFlags {
    const fn flag(
        &self,
        flag: ControlFlag,
    ) -> &AtomicBool {
        match flag {
            ControlFlag::NewGenerator => &self.new_generator,
            ControlFlag::NewPlot => &self.new_plot,
        }
    }

    pub fn raise(
        &self,
        flag: ControlFlag,
    ) {
        self.flag(flag).store(true, Ordering::Relaxed);
    }

    pub fn is_raised(
        &self,
        flag: ControlFlag,
    ) -> bool {
        self.flag(flag).load(Ordering::Relaxed)
    }

    /// Clear `flag` and return whether it was set.
    pub fn take(
        &self,
        flag: ControlFlag,
    ) -> bool {
        self.flag(flag).swap(false, Ordering::Relaxed)
    }

    pub fn request_stop(&self) { self.stop.store(true, Ordering::Relaxed); }

    pub fn is_stop_requested(&self) -> bool { self.stop.load(Ordering::Relaxed) }

    fn take_stop(&self) -> bool { self.stop.swap(false, Ordering::Relaxed) }
}

/// Cloneable handle for controlling an installation from other threads.
#[derive(Clone, Debug)]
pub struct InstallationHandle {
    flags: Arc<ControlFlags>,
}

impl InstallationHandle {
    /// Ask the loop to stop after its current tick.
    pub fn stop(&self) { self.flags.request_stop(); }

    /// Ask for a new generator (and reset of the iteration counter).
    pub fn request_new_generator(&self) { self.flags.raise(ControlFlag::NewGenerator); }

    /// Ask for a new plot style.
    pub fn request_new_plot(&self) { self.flags.raise(ControlFlag::NewPlot); }

    pub fn is_stop_requested(&self) -> bool { self.flags.is_stop_requested() }
}

// =============================================================================
// Loop State
// =============================================================================

/// Lifecycle of an installation.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub enum LoopState {
    #[default]
    Idle,
    Running,
    Stopped,
}

/// What one [`ArtInstallation::tick`] did.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct TickReport {
    /// A frame was iterated, rendered and drawn.
    pub rendered: bool,
    /// A new generator was selected.
    pub generator_changed: bool,
    /// A new plot style was selected.
    pub plot_changed: bool,
    /// Sensor readings applied to their target.
    pub sensor_updates: u32,
    /// Sensor readings skipped because of a timeout.
    pub sensor_timeouts: u32,
}

// =============================================================================
// Art Installation
// =============================================================================

/// Generator, display and sensors driven by one polling loop.
pub struct ArtInstallation<G: Generator, B: Backend, R: Rng = StdRng> {
    display: Display<B>,
    generator_configs: Vec<G::Config>,
    plot_configs: Vec<G::Style>,
    burn_in: u32,

    generator: G,
    style: G::Style,
    controls: Controls,
    iteration_counter: u32,
    last_switch: Option<Instant>,

    bindings: Vec<SensorBinding>,
    flags: Arc<ControlFlags>,
    state: LoopState,
    rng: R,

    metrics: LoopMetrics,
    events: EventLog,
}

impl<G: Generator, B: Backend> ArtInstallation<G, B> {
    /// Create an installation with an entropy-seeded random source.
    pub fn new(
        display: Display<B>,
        config: InstallationConfig<G>,
    ) -> Self {
        Self::with_rng(display, config, StdRng::from_entropy())
    }
}

impl<G: Generator, B: Backend, R: Rng> ArtInstallation<G, B, R> {
    /// Create an installation drawing random choices from `rng`.
    ///
    /// The first generator (with burn-in) and plot style are selected here.
    pub fn with_rng(
        display: Display<B>,
        config: InstallationConfig<G>,
        mut rng: R,
    ) -> Self {
        let InstallationConfig {
            generator_configs,
            plot_configs,
            sampling_rate,
            iteration_interval,
            num_iterations,
            burn_in,
        } = config;

        let (generator, generator_index) = create_generator::<G>(&generator_configs, burn_in, &mut rng);
        let (style, plot_index) = pick(&plot_configs, &mut rng);

        let mut metrics = LoopMetrics::new();
        metrics.generator_selections = 1;
        metrics.plot_selections = 1;
        let mut events = EventLog::new();
        events.push(0, LoopEventKind::GeneratorSelected { index: generator_index });
        events.push(0, LoopEventKind::PlotSelected { index: plot_index });
        debug!(?generator_index, ?plot_index, burn_in, "installation created");

        Self {
            display,
            generator_configs,
            plot_configs,
            burn_in,
            generator,
            style,
            controls: Controls {
                sampling_rate,
                iteration_interval,
                num_iterations,
            },
            iteration_counter: 0,
            last_switch: None,
            bindings: Vec::new(),
            flags: Arc::new(ControlFlags::default()),
            state: LoopState::Idle,
            rng,
            metrics,
            events,
        }
    }

    /// Attach a sensor. Bindings are applied in the order they were added.
    pub fn add_sensor(
        &mut self,
        binding: SensorBinding,
    ) {
        debug!(control = %binding.target(), "sensor added");
        self.bindings.push(binding);
    }

    /// Handle for stopping the loop and raising flags from other threads.
    pub fn handle(&self) -> InstallationHandle {
        InstallationHandle {
            flags: Arc::clone(&self.flags),
        }
    }

    /// Ask the loop to stop. Takes effect before the next tick.
    pub fn stop(&self) { self.flags.request_stop(); }

    /// Replace the generator with a fresh one from a random config and reset
    /// the iteration counter.
    pub fn choose_new_generator(&mut self) {
        self.select_generator();
        self.iteration_counter = 0;
    }

    /// Pick a new random plot style.
    pub fn choose_new_plot(&mut self) { self.select_plot(); }

    /// Run one loop step at time `now`.
    ///
    /// # Errors
    ///
    /// Drawing errors (frame shape, backend) and invalid sensor readings.
    pub fn tick(
        &mut self,
        now: Instant,
    ) -> Result<TickReport> {
        self.metrics.ticks += 1;
        let tick = self.metrics.ticks;
        let mut report = TickReport::default();

        // Render if the iteration interval has elapsed
        let due = self
            .last_switch
            .is_none_or(|last| now.saturating_duration_since(last) >= self.controls.iteration_interval);
        if due {
            let render_start = Instant::now();
            self.generator.iterate();
            let frame = self.generator.render(&self.style);
            self.display.draw(&frame)?;
            self.metrics.record_render(render_start.elapsed());

            self.last_switch = Some(now);
            self.iteration_counter += 1;
            report.rendered = true;
            trace!(tick, counter = self.iteration_counter, "frame drawn");
        }

        // Switch generator after enough iterations
        if self.iteration_counter > self.controls.num_iterations {
            self.select_generator();
            self.select_plot();
            self.iteration_counter = 0;
            report.generator_changed = true;
            report.plot_changed = true;
        }

        // Sensors
        for binding in &mut self.bindings {
            let Some(value) = binding.poll()? else {
                report.sensor_timeouts += 1;
                self.metrics.sensor_timeouts += 1;
                continue;
            };
            report.sensor_updates += 1;
            self.metrics.sensor_updates += 1;

            let target = binding.target();
            let changed = match target {
                ControlTarget::Param(param) => self.controls.apply(param, value),
                ControlTarget::Flag(flag) if value > 0.0 => {
                    self.flags.raise(flag);
                    true
                }
                ControlTarget::Flag(_) => false,
            };
            if changed {
                self.events.push(tick, LoopEventKind::ParamUpdated { target, value });
                debug!(control = %target, value, "control updated by sensor");
            }
        }

        // One-shot requests
        if self.flags.take(ControlFlag::NewGenerator) {
            self.choose_new_generator();
            report.generator_changed = true;
        }
        if self.flags.take(ControlFlag::NewPlot) {
            self.select_plot();
            report.plot_changed = true;
        }

        Ok(report)
    }

    /// Run the loop on the calling thread until a stop request or an error.
    ///
    /// Sleeps for `sampling_rate` minus the tick duration between ticks.
    /// Any error from [`tick`](Self::tick) stops the loop and is returned.
    pub fn run(&mut self) -> Result<()> {
        self.state = LoopState::Running;
        self.events.push(self.metrics.ticks, LoopEventKind::Started);
        info!(
            sampling_rate_ms = self.controls.sampling_rate.as_millis() as u64,
            iteration_interval_ms = self.controls.iteration_interval.as_millis() as u64,
            num_iterations = self.controls.num_iterations,
            sensors = self.bindings.len(),
            "installation running"
        );

        let result = loop {
            if self.flags.take_stop() {
                break Ok(());
            }

            let tick_start = Instant::now();
            if let Err(e) = self.tick(tick_start) {
                break Err(e);
            }

            self.sleep_until(tick_start + self.controls.sampling_rate.min(MAX_TICK_PAUSE));
        };

        self.state = LoopState::Stopped;
        self.events.push(self.metrics.ticks, LoopEventKind::Stopped);
        match &result {
            Ok(()) => info!(ticks = self.metrics.ticks, renders = self.metrics.renders, "installation stopped"),
            Err(e) => warn!(error = %e, "installation stopped on error"),
        }
        result
    }

    /// Sleep until `deadline`, waking early when a stop is requested.
    fn sleep_until(
        &self,
        deadline: Instant,
    ) {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || self.flags.is_stop_requested() {
                return;
            }
            thread::sleep(remaining.min(STOP_POLL_INTERVAL));
        }
    }

    fn select_generator(&mut self) {
        let (generator, index) = create_generator::<G>(&self.generator_configs, self.burn_in, &mut self.rng);
        self.generator = generator;
        self.metrics.generator_selections += 1;
        self.events.push(self.metrics.ticks, LoopEventKind::GeneratorSelected { index });
        info!(?index, "new generator selected");
    }

    fn select_plot(&mut self) {
        let (style, index) = pick(&self.plot_configs, &mut self.rng);
        self.style = style;
        self.metrics.plot_selections += 1;
        self.events.push(self.metrics.ticks, LoopEventKind::PlotSelected { index });
        info!(?index, "new plot style selected");
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[inline]
    pub const fn state(&self) -> LoopState { self.state }

    #[inline]
    pub const fn controls(&self) -> &Controls { &self.controls }

    #[inline]
    pub const fn controls_mut(&mut self) -> &mut Controls { &mut self.controls }

    /// Iterations shown since the current generator was selected.
    #[inline]
    pub const fn iteration_counter(&self) -> u32 { self.iteration_counter }

    #[inline]
    pub const fn generator(&self) -> &G { &self.generator }

    #[inline]
    pub const fn style(&self) -> &G::Style { &self.style }

    #[inline]
    pub const fn display(&self) -> &Display<B> { &self.display }

    #[inline]
    pub const fn display_mut(&mut self) -> &mut Display<B> { &mut self.display }

    #[inline]
    pub fn sensors(&self) -> &[SensorBinding] { &self.bindings }

    #[inline]
    pub const fn metrics(&self) -> &LoopMetrics { &self.metrics }

    #[inline]
    pub const fn events(&self) -> &EventLog { &self.events }
}

impl<G, B, R> ArtInstallation<G, B, R>
where
    G: Generator + Send + 'static,
    G::Config: Send + 'static,
    G::Style: Send + 'static,
    B: Backend + Send + 'static,
    R: Rng + Send + 'static,
{
    /// Run the loop on a background thread.
    ///
    /// Stop it through a [`handle`](Self::handle) taken before spawning. The
    /// thread hands the installation back together with the loop result.
    pub fn spawn(mut self) -> JoinHandle<(Self, Result<()>)> {
        thread::spawn(move || {
            let result = self.run();
            (self, result)
        })
    }
}

/// Pick a random element, or the default when `items` is empty.
fn pick<T: Clone + Default>(
    items: &[T],
    rng: &mut impl Rng,
) -> (T, Option<usize>) {
    if items.is_empty() {
        return (T::default(), None);
    }
    let index = rng.gen_range(0..items.len());
    (items[index].clone(), Some(index))
}

fn create_generator<G: Generator>(
    configs: &[G::Config],
    burn_in: u32,
    rng: &mut impl Rng,
) -> (G, Option<usize>) {
    let (config, index) = pick(configs, rng);
    let mut generator = G::new(&config);
    for _ in 0..burn_in {
        generator.iterate();
    }
    (generator, index)
}

// =============================================================================
// Unit Tests
// =============================================================================
