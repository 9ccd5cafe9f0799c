//! Loop metrics and the recent-event ring buffer.
//!
//! Provides tick/render counters, render timing statistics and a ring
//! buffer of structured loop events for on-screen status display.
//!
//! # Usage
//!
//! ```ignore
//! let mut metrics = LoopMetrics::new();
//! let mut events = EventLog::new();
//!
//! // In the loop:
//! let render_start = Instant::now();
//! // ... iterate + draw ...
//! metrics.record_render(render_start.elapsed());
//!
//! events.push(tick, LoopEventKind::PlotSelected { index: Some(2) });
//! ```

use core::fmt::{self, Write};
use std::time::{Duration, Instant};

use heapless::{Deque, String};

use crate::config::EVENT_LOG_SIZE;
use crate::sensors::ControlTarget;

// =============================================================================
// Loop Metrics
// =============================================================================

/// Counters and render timing of one control loop.
#[derive(Clone, Debug)]
pub struct LoopMetrics {
    // Counters
    /// Ticks executed
    pub ticks: u64,
    /// Frames iterated, rendered and drawn
    pub renders: u64,
    /// Generators created (including the initial one)
    pub generator_selections: u32,
    /// Plot styles chosen (including the initial one)
    pub plot_selections: u32,
    /// Sensor readings applied to a target
    pub sensor_updates: u64,
    /// Sensor readings skipped because the sensor timed out
    pub sensor_timeouts: u64,

    // Render timing (microseconds)
    /// Duration of the last render
    pub render_time_us: u32,
    /// Shortest render observed
    pub render_time_min_us: u32,
    /// Longest render observed
    pub render_time_max_us: u32,
    render_time_avg_us: f32,

    start_time: Instant,
}

impl LoopMetrics {
    /// Exponential moving average alpha (0.1 for smooth updates).
    const EMA_ALPHA: f32 = 0.1;

    /// Create zeroed metrics, starting the uptime timer.
    pub fn new() -> Self {
        Self {
            ticks: 0,
            renders: 0,
            generator_selections: 0,
            plot_selections: 0,
            sensor_updates: 0,
            sensor_timeouts: 0,
            render_time_us: 0,
            render_time_min_us: u32::MAX,
            render_time_max_us: 0,
            render_time_avg_us: 0.0,
            start_time: Instant::now(),
        }
    }

    /// Record the duration of one render (iterate + draw).
    pub fn record_render(
        &mut self,
        render_time: Duration,
    ) {
        let us = u32::try_from(render_time.as_micros()).unwrap_or(u32::MAX);
        self.render_time_us = us;
        self.render_time_min_us = self.render_time_min_us.min(us);
        self.render_time_max_us = self.render_time_max_us.max(us);

        if self.renders == 0 {
            self.render_time_avg_us = us as f32;
        } else {
            self.render_time_avg_us =
                Self::EMA_ALPHA.mul_add(us as f32, (1.0 - Self::EMA_ALPHA) * self.render_time_avg_us);
        }

        self.renders += 1;
    }

    /// Average render time in microseconds.
    #[inline]
    pub const fn render_time_avg_us(&self) -> u32 { self.render_time_avg_us as u32 }

    /// Time since the metrics were created.
    #[inline]
    pub fn uptime(&self) -> Duration { self.start_time.elapsed() }

    /// Uptime as `HH:MM:SS`.
    pub fn uptime_string(&self) -> String<12> { format_hms(self.uptime()) }
}

impl Default for LoopMetrics {
    fn default() -> Self { Self::new() }
}

fn format_hms(duration: Duration) -> String<12> {
    let secs = duration.as_secs();
    let mut s = String::new();
    write!(s, "{:02}:{:02}:{:02}", (secs / 3600).min(99), (secs % 3600) / 60, secs % 60).ok();
    s
}

// =============================================================================
// Event Log
// =============================================================================

/// What happened in a [`LoopEvent`].
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum LoopEventKind {
    /// `run` entered the running state.
    Started,
    /// The loop left the running state.
    Stopped,
    /// A generator was created from the config at `index` (`None` = default config).
    GeneratorSelected { index: Option<usize> },
    /// A plot style was chosen (`None` = default style).
    PlotSelected { index: Option<usize> },
    /// A sensor wrote `value` to `target`.
    ParamUpdated { target: ControlTarget, value: f32 },
}

impl fmt::Display for LoopEventKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Started => f.write_str("started"),
            Self::Stopped => f.write_str("stopped"),
            Self::GeneratorSelected { index: Some(i) } => write!(f, "generator #{i}"),
            Self::GeneratorSelected { index: None } => f.write_str("generator default"),
            Self::PlotSelected { index: Some(i) } => write!(f, "plot #{i}"),
            Self::PlotSelected { index: None } => f.write_str("plot default"),
            Self::ParamUpdated { target, value } => write!(f, "{target}={value:.2}"),
        }
    }
}

/// One structured loop event, stamped with the tick it happened in.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct LoopEvent {
    pub tick: u64,
    pub kind: LoopEventKind,
}

/// Ring buffer of the last [`EVENT_LOG_SIZE`] loop events.
///
/// Old events are dropped when the buffer is full.
#[derive(Clone, Debug)]
pub struct EventLog {
    buffer: Deque<LoopEvent, EVENT_LOG_SIZE>,
}

impl EventLog {
    pub const fn new() -> Self { Self { buffer: Deque::new() } }

    /// Record an event. If the buffer is full the oldest event is dropped.
    pub fn push(
        &mut self,
        tick: u64,
        kind: LoopEventKind,
    ) {
        if self.buffer.is_full() {
            self.buffer.pop_front();
        }
        self.buffer.push_back(LoopEvent { tick, kind }).ok();
    }

    /// Iterate over events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LoopEvent> { self.buffer.iter() }

    /// Most recent event.
    pub fn last(&self) -> Option<&LoopEvent> { self.buffer.back() }

    #[inline]
    pub fn len(&self) -> usize { self.buffer.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.buffer.is_empty() }

    pub fn clear(&mut self) { self.buffer.clear(); }
}

impl Default for EventLog {
    fn default() -> Self { Self::new() }
}

// =============================================================================
// Tests
// =============================================================================
