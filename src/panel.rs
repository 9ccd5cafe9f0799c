//! LED panels, panel identities and rotation transforms.
//!
//! - [`Panel`]: one rectangular tile with its global offset, chain offset and rotation
//! - [`PanelSet`] / [`PanelId`]: arena of panels referenced by layouts and chains
//! - [`Rotation`]: mounting rotation of a panel (0, 90, 180, 270 degrees)
//! - [`PixelBuffer`]: owned RGB pixel grid used for transforms and the chain buffer
//!
//! # Rotation Convention
//!
//! Coordinates are `(x, y)` with `x` to the right and `y` down. A 90 degree
//! rotation turns the image counter-clockwise, 270 turns it clockwise.
//! [`Rotation::source_coords`] is the single mapping used both by
//! [`Panel::transform`] and by the display mapper.

use std::sync::atomic::{AtomicU32, Ordering};

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

use crate::error::{Error, Result};

// =============================================================================
// Rotation
// =============================================================================

/// Mounting rotation of a panel.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub enum Rotation {
    /// No rotation (identity transform).
    #[default]
    Deg0,
    /// Quarter turn counter-clockwise.
    Deg90,
    /// Half turn.
    Deg180,
    /// Quarter turn clockwise.
    Deg270,
}

impl Rotation {
    /// Rotation angle in degrees.
    pub const fn degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Whether this rotation swaps width and height.
    #[inline]
    pub const fn swaps_axes(self) -> bool { matches!(self, Self::Deg90 | Self::Deg270) }

    /// Size of a `width` x `height` buffer after rotation.
    #[inline]
    pub const fn rotated_size(
        self,
        width: usize,
        height: usize,
    ) -> (usize, usize) {
        if self.swaps_axes() { (height, width) } else { (width, height) }
    }

    /// Map a destination pixel back to the source pixel it comes from.
    ///
    /// `(x, y)` is a coordinate in the rotated buffer, `src_width` x `src_height`
    /// is the size of the unrotated source.
    #[inline]
    pub const fn source_coords(
        self,
        x: usize,
        y: usize,
        src_width: usize,
        src_height: usize,
    ) -> (usize, usize) {
        match self {
            Self::Deg0 => (x, y),
            Self::Deg90 => (src_width - 1 - y, x),
            Self::Deg180 => (src_width - 1 - x, src_height - 1 - y),
            Self::Deg270 => (y, src_height - 1 - x),
        }
    }
}

impl TryFrom<u16> for Rotation {
    type Error = Error;

    fn try_from(degrees: u16) -> Result<Self> {
        match degrees {
            0 => Ok(Self::Deg0),
            90 => Ok(Self::Deg90),
            180 => Ok(Self::Deg180),
            270 => Ok(Self::Deg270),
            other => Err(Error::InvalidGeometry(format!(
                "rotation must be 0, 90, 180 or 270 degrees, got {other}"
            ))),
        }
    }
}

// =============================================================================
// Pixel Buffer
// =============================================================================

/// Row-major grid of RGB pixels.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    pixels: Vec<Rgb888>,
}

impl PixelBuffer {
    /// Create a black buffer.
    pub fn new(
        width: usize,
        height: usize,
    ) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgb888::BLACK; width * height],
        }
    }

    /// Create a buffer where every pixel is computed by `f(x, y)`.
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> Rgb888,
    ) -> Self {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self { width, height, pixels }
    }

    #[inline]
    pub const fn width(&self) -> usize { self.width }

    #[inline]
    pub const fn height(&self) -> usize { self.height }

    /// Size as `(width, height)`.
    #[inline]
    pub const fn size(&self) -> (usize, usize) { (self.width, self.height) }

    /// Pixels in row-major order.
    #[inline]
    pub fn pixels(&self) -> &[Rgb888] { &self.pixels }

    /// Pixel at `(x, y)`, or `None` outside the buffer.
    pub fn get(
        &self,
        x: usize,
        y: usize,
    ) -> Option<Rgb888> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    /// Set the pixel at `(x, y)`. Writes outside the buffer are ignored.
    #[inline]
    pub fn set(
        &mut self,
        x: usize,
        y: usize,
        color: Rgb888,
    ) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = color;
        }
    }

    /// Fill the whole buffer with one color.
    pub fn fill(
        &mut self,
        color: Rgb888,
    ) {
        self.pixels.fill(color);
    }
}

// =============================================================================
// Panel
// =============================================================================

/// One addressable LED tile.
///
/// `offset` and `chain_offset` are assigned by [`Display`](crate::Display) while it
/// is built and never change afterwards.
#[derive(Clone, Debug)]
pub struct Panel {
    shape: (usize, usize),
    offset: (usize, usize),
    chain_offset: usize,
    rotation: Rotation,
}

impl Panel {
    /// Create a panel of `width` x `height` pixels.
    pub const fn new(
        width: usize,
        height: usize,
    ) -> Self {
        Self {
            shape: (width, height),
            offset: (0, 0),
            chain_offset: 0,
            rotation: Rotation::Deg0,
        }
    }

    /// Panel dimensions as `(width, height)`.
    #[inline]
    pub const fn shape(&self) -> (usize, usize) { self.shape }

    /// Top-left corner of the panel in the global canvas.
    #[inline]
    pub const fn offset(&self) -> (usize, usize) { self.offset }

    /// First column of the panel in the chain-order buffer.
    #[inline]
    pub const fn chain_offset(&self) -> usize { self.chain_offset }

    #[inline]
    pub const fn rotation(&self) -> Rotation { self.rotation }

    /// Set the mounting rotation from an angle in degrees.
    ///
    /// Only 0, 90, 180 and 270 are accepted.
    pub fn set_rotation(
        &mut self,
        degrees: u16,
    ) -> Result<()> {
        self.rotation = Rotation::try_from(degrees)?;
        Ok(())
    }

    /// Return a rotated copy of `buffer`. Width and height swap for 90 and 270.
    pub fn transform(
        &self,
        buffer: &PixelBuffer,
    ) -> PixelBuffer {
        if self.rotation == Rotation::Deg0 {
            return buffer.clone();
        }

        let (src_width, src_height) = buffer.size();
        let (width, height) = self.rotation.rotated_size(src_width, src_height);
        PixelBuffer::from_fn(width, height, |x, y| {
            let (sx, sy) = self.rotation.source_coords(x, y, src_width, src_height);
            buffer.pixels[sy * src_width + sx]
        })
    }

    pub(crate) const fn set_offset(
        &mut self,
        offset: (usize, usize),
    ) {
        self.offset = offset;
    }

    pub(crate) const fn set_chain_offset(
        &mut self,
        chain_offset: usize,
    ) {
        self.chain_offset = chain_offset;
    }

    pub(crate) const fn set_rotation_value(
        &mut self,
        rotation: Rotation,
    ) {
        self.rotation = rotation;
    }
}

// =============================================================================
// Panel Set
// =============================================================================

/// Source of [`PanelSet`] tags. Each new set gets its own.
static NEXT_SET_TAG: AtomicU32 = AtomicU32::new(0);

/// Identity of a panel inside a [`PanelSet`].
///
/// Ids carry the tag of the set that issued them, so an id from another set
/// is never mistaken for a member.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct PanelId {
    set: u32,
    index: usize,
}

impl PanelId {
    /// Position of the panel in its set.
    #[inline]
    pub const fn index(self) -> usize { self.index }
}

/// Arena owning the panels of one display.
///
/// A clone keeps the tag, so ids stay valid for the copy.
#[derive(Clone, Debug)]
pub struct PanelSet {
    tag: u32,
    panels: Vec<Panel>,
}

impl PanelSet {
    pub fn new() -> Self {
        Self {
            tag: NEXT_SET_TAG.fetch_add(1, Ordering::Relaxed),
            panels: Vec::new(),
        }
    }

    /// Add a panel and return its identity.
    pub fn add(
        &mut self,
        panel: Panel,
    ) -> PanelId {
        self.panels.push(panel);
        self.id(self.panels.len() - 1)
    }

    const fn id(
        &self,
        index: usize,
    ) -> PanelId {
        PanelId { set: self.tag, index }
    }

    pub fn get(
        &self,
        id: PanelId,
    ) -> Option<&Panel> {
        if id.set != self.tag {
            return None;
        }
        self.panels.get(id.index)
    }

    pub(crate) fn get_mut(
        &mut self,
        id: PanelId,
    ) -> Option<&mut Panel> {
        if id.set != self.tag {
            return None;
        }
        self.panels.get_mut(id.index)
    }

    /// Whether `id` was handed out by this set.
    #[inline]
    pub fn contains(
        &self,
        id: PanelId,
    ) -> bool {
        id.set == self.tag && id.index < self.panels.len()
    }

    #[inline]
    pub fn len(&self) -> usize { self.panels.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.panels.is_empty() }

    /// Iterate over `(id, panel)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (PanelId, &Panel)> {
        self.panels.iter().enumerate().map(|(i, p)| (self.id(i), p))
    }
}

impl Default for PanelSet {
    fn default() -> Self { Self::new() }
}

// =============================================================================
// Unit Tests
// =============================================================================
