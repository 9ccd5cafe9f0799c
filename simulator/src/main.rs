//! LED art installation simulator for desktop.
//!
//! Builds the four-panel installation (2x2 layout of 32x32 panels wired
//! A, B, D, C with the bottom row mounted upside down) and shows the
//! chain-order buffer the LED driver would receive, using the
//! embedded-graphics-simulator crate.
//!
//! # Keys
//!
//! - `G`: new generator
//! - `P`: new plot style (through a simulated button sensor)
//! - `Up` / `Down`: move the simulated range finder target (drives the iteration interval)
//! - `Esc`: stop
//!
//! # Logging
//!
//! `RUST_LOG` overrides the default filter `info,ledsart=debug`.

// Crate-level lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

mod life;
mod status;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::sdl2::Keycode;
use embedded_graphics_simulator::{OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window};
use ledsart::config::DEFAULT_PANEL_SIZE;
use ledsart::{
    ArtInstallation,
    CanvasBackend,
    Display,
    InstallationConfig,
    OutputOptions,
    Panel,
    PanelSet,
    SensorBinding,
    SensorCurve,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::life::Life;
use crate::status::{STATUS_HEIGHT, Status, draw_status};

/// Window pixels per LED.
const SCALE: u32 = 4;

/// Simulated range finder step per key press, in meters.
const DISTANCE_STEP: f32 = 0.1;

/// Range finder limits, in meters.
const DISTANCE_RANGE: (f32, f32) = (0.0, 4.0);

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,ledsart=debug")))
        .init();

    // -------------- Panels --------------
    let panel = DEFAULT_PANEL_SIZE;
    let mut panels = PanelSet::new();
    let a = panels.add(Panel::new(panel, panel));
    let b = panels.add(Panel::new(panel, panel));
    let c = panels.add(Panel::new(panel, panel));
    let d = panels.add(Panel::new(panel, panel));

    let chain = vec![a, b, d, c];
    let canvas = SimulatorDisplay::<Rgb888>::new(Size::new(
        (chain.len() * panel) as u32,
        panel as u32 + STATUS_HEIGHT,
    ));
    let backend = CanvasBackend::with_options(canvas, OutputOptions::new(100, 11, false)?)?;
    let display = Display::new(panels, vec![vec![a, b], vec![c, d]], chain, &[0, 0, 180, 180], backend)
        .context("invalid panel geometry")?;
    let (width, height) = display.total_size();

    // -------------- Installation --------------
    let config = InstallationConfig::<Life>::default()
        .with_generator_configs(life::configs(width, height))
        .with_plot_configs(life::palettes())
        .with_sampling_rate(Duration::from_millis(10))
        .with_iteration_interval(Duration::from_millis(100))
        .with_num_iterations(100)
        .with_burn_in(10);
    let mut art = ArtInstallation::new(display, config);

    // Range finder: 1 m gives half of the 0.5 s maximum interval
    let distance = Arc::new(AtomicU32::new(1.0f32.to_bits()));
    let reading = Arc::clone(&distance);
    art.add_sensor(SensorBinding::named(
        move || f32::from_bits(reading.load(Ordering::Relaxed)),
        "iteration_interval",
        SensorCurve::new(1.0, 0.5, 4.0)?,
    )?);

    // Button: one reading of 1.0 per press
    let plot_button = Arc::new(AtomicBool::new(false));
    let pressed = Arc::clone(&plot_button);
    art.add_sensor(SensorBinding::named(
        move || if pressed.swap(false, Ordering::Relaxed) { 1.0 } else { 0.0 },
        "choose_new_plot",
        SensorCurve::default(),
    )?);

    let output_settings = OutputSettingsBuilder::new().scale(SCALE).build();
    let mut window = Window::new("ledsart simulator", &output_settings);
    window.update(art.display().backend().target());

    let handle = art.handle();
    info!(width, height, "simulator started");

    // -------------- Main loop --------------
    'running: loop {
        let tick_start = Instant::now();

        for event in window.events() {
            match event {
                SimulatorEvent::Quit => break 'running,
                SimulatorEvent::KeyDown { keycode, repeat, .. } => match keycode {
                    Keycode::G if !repeat => handle.request_new_generator(),
                    Keycode::P if !repeat => plot_button.store(true, Ordering::Relaxed),
                    Keycode::Up => nudge(&distance, DISTANCE_STEP),
                    Keycode::Down => nudge(&distance, -DISTANCE_STEP),
                    Keycode::Escape => handle.stop(),
                    _ => {}
                },
                _ => {}
            }
        }
        if handle.is_stop_requested() {
            break;
        }

        art.tick(tick_start)?;

        let controls = *art.controls();
        let iteration = art.iteration_counter();
        let events = art.events().clone();
        let status = Status {
            controls: &controls,
            iteration,
            distance: f32::from_bits(distance.load(Ordering::Relaxed)),
            events: &events,
        };
        let canvas = art.display_mut().backend_mut().target_mut();
        draw_status(canvas, panel as i32, &status);
        window.update(art.display().backend().target());

        let elapsed = tick_start.elapsed();
        if let Some(rest) = controls.sampling_rate.checked_sub(elapsed) {
            thread::sleep(rest);
        }
    }

    let metrics = art.metrics();
    info!(
        ticks = metrics.ticks,
        renders = metrics.renders,
        generators = metrics.generator_selections,
        uptime = %metrics.uptime_string(),
        "simulator stopped"
    );
    Ok(())
}

fn nudge(
    distance: &AtomicU32,
    step: f32,
) {
    let current = f32::from_bits(distance.load(Ordering::Relaxed));
    let next = (current + step).clamp(DISTANCE_RANGE.0, DISTANCE_RANGE.1);
    distance.store(next.to_bits(), Ordering::Relaxed);
}
