//! Pixel sinks for the chain-order buffer.
//!
//! - [`Backend`]: the trait a [`Display`](crate::Display) draws through
//! - [`NullBackend`]: discards every buffer (headless runs, tests)
//! - [`CanvasBackend`]: writes into any `embedded-graphics` [`DrawTarget`]
//! - [`OutputOptions`] / [`OutputProcessor`]: brightness, PWM depth and
//!   luminance correction applied before pixels reach the target
//!
//! # Processing Order
//!
//! 1. Luminance correction (CIE 1931 lightness to linear intensity)
//! 2. Brightness scaling (0-100%)
//! 3. PWM quantization (drop low bits below 8-bit depth)
//!
//! All three steps are folded into one 256-entry lookup table per channel value.

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use crate::error::{Error, Result};
use crate::panel::PixelBuffer;

/// Default brightness in percent.
pub const DEFAULT_BRIGHTNESS: u8 = 40;

/// Default PWM bit depth of the LED driver.
pub const DEFAULT_PWM_BITS: u8 = 11;

/// Highest PWM bit depth supported by HUB75 drivers.
pub const MAX_PWM_BITS: u8 = 11;

// =============================================================================
// Backend Trait
// =============================================================================

/// Sink that renders a chain-order pixel buffer.
pub trait Backend {
    /// Render one chain buffer. The buffer is only borrowed for the call.
    fn draw(
        &mut self,
        buffer: &PixelBuffer,
    ) -> Result<()>;
}

impl<B: Backend + ?Sized> Backend for &mut B {
    fn draw(
        &mut self,
        buffer: &PixelBuffer,
    ) -> Result<()> {
        (**self).draw(buffer)
    }
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn draw(
        &mut self,
        buffer: &PixelBuffer,
    ) -> Result<()> {
        (**self).draw(buffer)
    }
}

/// Backend that accepts and drops every buffer.
#[derive(Clone, Copy, Default, Debug)]
pub struct NullBackend;

impl Backend for NullBackend {
    fn draw(
        &mut self,
        _buffer: &PixelBuffer,
    ) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// Output Options
// =============================================================================

/// LED driver output settings.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct OutputOptions {
    /// Global brightness in percent (0-100).
    pub brightness: u8,
    /// PWM bit depth (1-11). Depths below 8 drop the low bits of each channel.
    pub pwm_bits: u8,
    /// Map channel values through the CIE 1931 lightness curve.
    pub luminance_correction: bool,
}

impl OutputOptions {
    /// Create validated output options.
    pub fn new(
        brightness: u8,
        pwm_bits: u8,
        luminance_correction: bool,
    ) -> Result<Self> {
        let options = Self {
            brightness,
            pwm_bits,
            luminance_correction,
        };
        options.validate()?;
        Ok(options)
    }

    /// Check that every field is inside its supported range.
    pub fn validate(&self) -> Result<()> {
        if self.brightness > 100 {
            return Err(Error::InvalidOptions(format!(
                "brightness must be between 0 and 100, got {}",
                self.brightness
            )));
        }
        if self.pwm_bits == 0 || self.pwm_bits > MAX_PWM_BITS {
            return Err(Error::InvalidOptions(format!(
                "pwm_bits must be between 1 and {MAX_PWM_BITS}, got {}",
                self.pwm_bits
            )));
        }
        Ok(())
    }

    /// Full brightness, full depth, no correction. Pixels pass through unchanged.
    pub const fn passthrough() -> Self {
        Self {
            brightness: 100,
            pwm_bits: 8,
            luminance_correction: false,
        }
    }
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            brightness: DEFAULT_BRIGHTNESS,
            pwm_bits: DEFAULT_PWM_BITS,
            luminance_correction: true,
        }
    }
}

// =============================================================================
// Output Processor
// =============================================================================

/// Per-channel lookup table built from [`OutputOptions`].
#[derive(Clone, Debug)]
pub struct OutputProcessor {
    options: OutputOptions,
    lut: [u8; 256],
}

impl OutputProcessor {
    /// Build the lookup table for validated options.
    pub fn new(options: OutputOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            lut: build_lut(&options),
        })
    }

    #[inline]
    pub const fn options(&self) -> OutputOptions { self.options }

    /// Replace the options and rebuild the table.
    pub fn set_options(
        &mut self,
        options: OutputOptions,
    ) -> Result<()> {
        options.validate()?;
        self.options = options;
        self.lut = build_lut(&options);
        Ok(())
    }

    /// Map one channel value.
    #[inline]
    pub fn channel(
        &self,
        value: u8,
    ) -> u8 {
        self.lut[usize::from(value)]
    }

    /// Map one pixel.
    #[inline]
    pub fn apply(
        &self,
        color: Rgb888,
    ) -> Rgb888 {
        Rgb888::new(self.channel(color.r()), self.channel(color.g()), self.channel(color.b()))
    }
}

impl Default for OutputProcessor {
    fn default() -> Self {
        let options = OutputOptions::default();
        Self {
            options,
            lut: build_lut(&options),
        }
    }
}

fn build_lut(options: &OutputOptions) -> [u8; 256] {
    let mut lut = [0u8; 256];
    let drop_bits = 8u8.saturating_sub(options.pwm_bits);
    let mask = 0xFFu8 << drop_bits;

    for (value, out) in lut.iter_mut().enumerate() {
        let mut level = value as f32 / 255.0;
        if options.luminance_correction {
            level = cie1931(level);
        }
        level *= f32::from(options.brightness) / 100.0;
        *out = ((level * 255.0).round() as u8) & mask;
    }
    lut
}

/// CIE 1931 lightness (0.0-1.0) to relative luminance (0.0-1.0).
fn cie1931(lightness: f32) -> f32 {
    let l = lightness * 100.0;
    if l <= 8.0 { l / 902.3 } else { ((l + 16.0) / 116.0).powi(3) }
}

// =============================================================================
// Canvas Backend
// =============================================================================

/// Backend drawing into an `embedded-graphics` [`DrawTarget`].
///
/// The chain buffer is written as one contiguous rectangle at `origin`.
pub struct CanvasBackend<D> {
    target: D,
    origin: Point,
    processor: OutputProcessor,
}

impl<D> CanvasBackend<D>
where
    D: DrawTarget<Color = Rgb888>,
{
    /// Draw at the target origin with unmodified pixels.
    pub fn new(target: D) -> Self {
        Self {
            target,
            origin: Point::zero(),
            processor: OutputProcessor {
                options: OutputOptions::passthrough(),
                lut: build_lut(&OutputOptions::passthrough()),
            },
        }
    }

    /// Draw with the given output options.
    pub fn with_options(
        target: D,
        options: OutputOptions,
    ) -> Result<Self> {
        Ok(Self {
            target,
            origin: Point::zero(),
            processor: OutputProcessor::new(options)?,
        })
    }

    /// Move the top-left corner of the drawn buffer.
    #[must_use]
    pub fn at(
        mut self,
        origin: Point,
    ) -> Self {
        self.origin = origin;
        self
    }

    #[inline]
    pub const fn target(&self) -> &D { &self.target }

    #[inline]
    pub const fn target_mut(&mut self) -> &mut D { &mut self.target }

    #[inline]
    pub const fn processor(&self) -> &OutputProcessor { &self.processor }

    #[inline]
    pub const fn processor_mut(&mut self) -> &mut OutputProcessor { &mut self.processor }

    /// Release the draw target.
    pub fn into_inner(self) -> D { self.target }
}

impl<D> Backend for CanvasBackend<D>
where
    D: DrawTarget<Color = Rgb888>,
    D::Error: core::fmt::Debug,
{
    fn draw(
        &mut self,
        buffer: &PixelBuffer,
    ) -> Result<()> {
        let area = Rectangle::new(self.origin, Size::new(buffer.width() as u32, buffer.height() as u32));
        let processor = &self.processor;
        self.target
            .fill_contiguous(&area, buffer.pixels().iter().map(|&p| processor.apply(p)))
            .map_err(|e| Error::Backend(format!("{e:?}")))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
