//! LED art installation library - panel-chain geometry and the sensor-driven control loop.
//!
//! This library contains everything that can be tested on the host machine.
//! Hardware access goes through `embedded-hal` traits and the [`Backend`] sink,
//! so the same code drives a physical LED matrix chain or the desktop simulator.
//!
//! - [`panel`]: Panels, panel identities and rotations
//! - [`display`]: Layout/chain validation and the chain-order pixel mapper
//! - [`backend`]: Pixel sinks and output processing (brightness, luminance)
//! - [`curve`]: Logistic sensor response curve
//! - [`sensors`]: Sensor trait, bindings and `embedded-hal` sensor drivers
//! - [`installation`]: Generator contract and the polling control loop
//! - [`metrics`]: Loop counters, render timing and the event ring buffer
//! - [`config`]: Default constants and installation configuration
//!
//! # Testing
//!
//! ```bash
//! cargo test -p ledsart
//! ```

// Crate-level lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

pub mod backend;
pub mod config;
pub mod curve;
pub mod display;
pub mod error;
pub mod installation;
pub mod metrics;
pub mod panel;
pub mod sensors;

// Re-export commonly used items
pub use backend::{Backend, CanvasBackend, NullBackend, OutputOptions, OutputProcessor};
pub use config::InstallationConfig;
pub use curve::SensorCurve;
pub use display::{Display, Frame};
pub use error::{Error, Result};
pub use installation::{ArtInstallation, ControlFlags, Controls, Generator, InstallationHandle, LoopState, TickReport};
pub use metrics::{EventLog, LoopEvent, LoopEventKind, LoopMetrics};
pub use panel::{Panel, PanelId, PanelSet, PixelBuffer, Rotation};
pub use sensors::{Button, ControlFlag, ControlParam, ControlTarget, Sensor, SensorBinding, TIMEOUT_READING, UltrasonicRange};
