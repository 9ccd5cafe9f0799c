//! Error types for panel geometry, frame mapping and sensor processing.

use thiserror::Error;

/// Result type alias for installation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the display mapper, sensor curve and control loop.
///
/// Geometry errors are raised while a [`Display`](crate::Display) is built and
/// are final for that configuration. Sensor timeouts are not errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed single-entity input (rotation angle, layout shape, rotation count).
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Layout and chain disagree, or panels do not share one shape.
    #[error("geometry mismatch: {0}")]
    GeometryMismatch(String),

    /// Frame dimensions do not match the computed canvas.
    #[error(
        "frame is {width}x{height} with {channels} channels, display expects \
         {expected_width}x{expected_height} with at least 3 channels"
    )]
    FrameShapeMismatch {
        /// Canvas width computed from the layout.
        expected_width: usize,
        /// Canvas height computed from the layout.
        expected_height: usize,
        /// Width of the offending frame.
        width: usize,
        /// Height of the offending frame.
        height: usize,
        /// Channel count of the offending frame.
        channels: usize,
    },

    /// Sensor curve evaluated at a point where it is undefined.
    #[error("reading {reading} is undefined for steepness {steepness}")]
    InvalidReading {
        /// Raw sensor reading.
        reading: f32,
        /// Curve steepness.
        steepness: f32,
    },

    /// Sensor curve parameters outside their domain.
    #[error("invalid sensor curve: {0}")]
    InvalidCurve(String),

    /// Backend output options outside their supported range.
    #[error("invalid output options: {0}")]
    InvalidOptions(String),

    /// Control target name that maps to no parameter or flag.
    #[error("unknown control target: {0}")]
    UnknownTarget(String),

    /// Pixel sink failed to render the chain buffer.
    #[error("backend failure: {0}")]
    Backend(String),
}
