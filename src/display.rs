//! Panel layout/chain mapping.
//!
//! A [`Display`] is a set of panels arranged in space by a 2-D *layout* and
//! wired electrically by a 1-D *chain*. Drawing a [`Frame`] slices it into
//! per-panel regions, rotates each region for its panel, and writes it into a
//! chain-order buffer that is handed to the [`Backend`].
//!
//! ```text
//!   layout (space)        chain (wiring)          chain buffer
//!   +---+---+             A -> B -> D -> C        +---+---+---+---+
//!   | A | B |                                     | A | B | D'| C'|
//!   +---+---+                                     +---+---+---+---+
//!   | C | D |             rotation 0,0,180,180    ' = rotated 180
//!   +---+---+
//! ```
//!
//! # Buffer Reuse
//!
//! The chain buffer is allocated once when the display is built. Every
//! [`Display::draw`] call overwrites every panel slot, so no pixels carry over
//! between frames.

use std::collections::HashSet;

use embedded_graphics::pixelcolor::Rgb888;
use tracing::{debug, trace};

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::panel::{Panel, PanelId, PanelSet, PixelBuffer, Rotation};

// =============================================================================
// Frame
// =============================================================================

/// Pixel data produced by a generator: `width` x `height` pixels with
/// `channels` bytes each (3 for RGB, 4 for RGBA). Extra channels are ignored.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Frame {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<u8>,
}

impl Frame {
    /// Create an all-zero frame.
    pub fn new(
        width: usize,
        height: usize,
        channels: usize,
    ) -> Self {
        Self {
            width,
            height,
            channels,
            data: vec![0; width * height * channels],
        }
    }

    /// Wrap raw row-major pixel bytes.
    ///
    /// Fails with [`Error::FrameShapeMismatch`] when `data` does not hold exactly
    /// `width * height * channels` bytes.
    pub fn from_raw(
        width: usize,
        height: usize,
        channels: usize,
        data: Vec<u8>,
    ) -> Result<Self> {
        if data.len() != width * height * channels {
            return Err(Error::FrameShapeMismatch {
                expected_width: width,
                expected_height: height,
                width: data.len() / (height * channels).max(1),
                height,
                channels,
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    #[inline]
    pub const fn width(&self) -> usize { self.width }

    #[inline]
    pub const fn height(&self) -> usize { self.height }

    #[inline]
    pub const fn channels(&self) -> usize { self.channels }

    /// Raw row-major bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] { &self.data }

    /// RGB part of the pixel at `(x, y)`, or `None` outside the frame or for
    /// frames with fewer than 3 channels.
    #[inline]
    pub fn rgb(
        &self,
        x: usize,
        y: usize,
    ) -> Option<Rgb888> {
        if x >= self.width || y >= self.height || self.channels < 3 {
            return None;
        }
        let i = (y * self.width + x) * self.channels;
        Some(Rgb888::new(self.data[i], self.data[i + 1], self.data[i + 2]))
    }

    /// Write the pixel at `(x, y)`. Bytes beyond the channel count are dropped,
    /// missing channels are left untouched.
    pub fn set_pixel(
        &mut self,
        x: usize,
        y: usize,
        value: &[u8],
    ) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y * self.width + x) * self.channels;
        let n = value.len().min(self.channels);
        self.data[i..i + n].copy_from_slice(&value[..n]);
    }
}

// =============================================================================
// Display
// =============================================================================

/// Panels arranged by a layout and a chain, drawing through a backend.
pub struct Display<B: Backend> {
    panels: PanelSet,
    layout: Vec<Vec<PanelId>>,
    chain: Vec<PanelId>,
    panel_shape: (usize, usize),
    total_size: (usize, usize),
    chain_buffer: PixelBuffer,
    backend: B,
}

impl<B: Backend> Display<B> {
    /// Build a display from a panel set, a `rows x columns` layout, a wiring
    /// chain and an optional per-chain-position rotation list (degrees).
    ///
    /// An empty `rotation` list leaves every panel unrotated.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidGeometry`] for a non-rectangular or empty layout, an empty
    ///   chain, a rotation list of the wrong length, an unknown angle, zero-sized
    ///   panels or a quarter-turn on non-square panels.
    /// - [`Error::GeometryMismatch`] when layout and chain do not hold the same set
    ///   of panels exactly once, or when panel shapes differ.
    pub fn new(
        mut panels: PanelSet,
        layout: Vec<Vec<PanelId>>,
        chain: Vec<PanelId>,
        rotation: &[u16],
        backend: B,
    ) -> Result<Self> {
        // -------------- Sanity checks --------------
        let columns = layout.first().map_or(0, Vec::len);
        if columns == 0 {
            return Err(Error::InvalidGeometry("layout must be a non-empty 2-D grid".into()));
        }
        if layout.iter().any(|row| row.len() != columns) {
            return Err(Error::InvalidGeometry(
                "layout rows must all have the same number of panels".into(),
            ));
        }

        if chain.is_empty() {
            return Err(Error::InvalidGeometry("chain must be a non-empty 1-D sequence".into()));
        }

        let mut chain_set = HashSet::with_capacity(chain.len());
        for &id in &chain {
            if !panels.contains(id) {
                return Err(Error::GeometryMismatch(format!("chain references unknown panel {}", id.index())));
            }
            if !chain_set.insert(id) {
                return Err(Error::GeometryMismatch(format!("panel {} appears twice in the chain", id.index())));
            }
        }

        let mut layout_set = HashSet::with_capacity(chain.len());
        for &id in layout.iter().flatten() {
            if !panels.contains(id) {
                return Err(Error::GeometryMismatch(format!("layout references unknown panel {}", id.index())));
            }
            if !layout_set.insert(id) {
                return Err(Error::GeometryMismatch(format!("panel {} appears twice in the layout", id.index())));
            }
            if !chain_set.contains(&id) {
                return Err(Error::GeometryMismatch(format!(
                    "chain must contain every layout panel, missing {}",
                    id.index()
                )));
            }
        }
        if let Some(extra) = chain.iter().find(|id| !layout_set.contains(id)) {
            return Err(Error::GeometryMismatch(format!(
                "layout must contain every chain panel, missing {}",
                extra.index()
            )));
        }
        if panels.len() != chain.len() {
            return Err(Error::GeometryMismatch(
                "panel set holds panels that are neither in the layout nor in the chain".into(),
            ));
        }

        if !rotation.is_empty() && rotation.len() != chain.len() {
            return Err(Error::InvalidGeometry(format!(
                "rotations must be given for no panels or all {} panels, got {}",
                chain.len(),
                rotation.len()
            )));
        }
        let rotations = rotation
            .iter()
            .map(|&degrees| Rotation::try_from(degrees))
            .collect::<Result<Vec<_>>>()?;

        let panel_shape = panels.iter().next().map_or((0, 0), |(_, p)| p.shape());
        if panels.iter().any(|(_, p)| p.shape() != panel_shape) {
            return Err(Error::GeometryMismatch("panels must all have the same dimensions".into()));
        }
        let (panel_width, panel_height) = panel_shape;
        if panel_width == 0 || panel_height == 0 {
            return Err(Error::InvalidGeometry("panels must be at least 1x1 pixel".into()));
        }
        if panel_width != panel_height && rotations.iter().any(|r| r.swaps_axes()) {
            return Err(Error::InvalidGeometry(
                "90 and 270 degree rotations require square panels".into(),
            ));
        }
        // -------------- End sanity checks --------------

        let rows = layout.len();
        let total_size = (columns * panel_width, rows * panel_height);

        // Global offsets, top-left origin
        let mut y_offset = 0;
        for row in &layout {
            let mut x_offset = 0;
            for &id in row {
                set_panel(&mut panels, id, |p| p.set_offset((x_offset, y_offset)));
                x_offset += panel_width;
            }
            y_offset += panel_height;
        }

        // Chain offsets and rotations
        let mut chain_offset = 0;
        for (i, &id) in chain.iter().enumerate() {
            let rotation = rotations.get(i).copied().unwrap_or_default();
            set_panel(&mut panels, id, |p| {
                p.set_chain_offset(chain_offset);
                p.set_rotation_value(rotation);
            });
            chain_offset += panel_width;
        }

        debug!(
            rows,
            columns,
            chain_len = chain.len(),
            width = total_size.0,
            height = total_size.1,
            "display geometry validated"
        );

        Ok(Self {
            panels,
            layout,
            chain,
            panel_shape,
            total_size,
            chain_buffer: PixelBuffer::new(chain_offset, panel_height),
            backend,
        })
    }

    /// Map `frame` onto the chain and hand the chain buffer to the backend.
    ///
    /// # Errors
    ///
    /// [`Error::FrameShapeMismatch`] when the frame is not `total_size()` or has
    /// fewer than 3 channels; any error returned by the backend.
    pub fn draw(
        &mut self,
        frame: &Frame,
    ) -> Result<()> {
        let (total_width, total_height) = self.total_size;
        if frame.width() != total_width || frame.height() != total_height || frame.channels() < 3 {
            return Err(Error::FrameShapeMismatch {
                expected_width: total_width,
                expected_height: total_height,
                width: frame.width(),
                height: frame.height(),
                channels: frame.channels(),
            });
        }

        let (panel_width, panel_height) = self.panel_shape;
        for &id in &self.chain {
            let Some(panel) = self.panels.get(id) else { continue };
            let (ox, oy) = panel.offset();
            let slot = panel.chain_offset();
            let rotation = panel.rotation();
            let (slot_width, slot_height) = rotation.rotated_size(panel_width, panel_height);

            for y in 0..slot_height {
                for x in 0..slot_width {
                    let (sx, sy) = rotation.source_coords(x, y, panel_width, panel_height);
                    if let Some(color) = frame.rgb(ox + sx, oy + sy) {
                        self.chain_buffer.set(slot + x, y, color);
                    }
                }
            }
        }

        trace!(panels = self.chain.len(), "frame mapped to chain");
        self.backend.draw(&self.chain_buffer)
    }

    /// Canvas size `(width, height)` a frame must have.
    #[inline]
    pub const fn total_size(&self) -> (usize, usize) { self.total_size }

    /// Shared panel size `(width, height)`.
    #[inline]
    pub const fn panel_shape(&self) -> (usize, usize) { self.panel_shape }

    #[inline]
    pub fn chain_len(&self) -> usize { self.chain.len() }

    pub fn panel(
        &self,
        id: PanelId,
    ) -> Option<&Panel> {
        self.panels.get(id)
    }

    #[inline]
    pub fn layout(&self) -> &[Vec<PanelId>] { &self.layout }

    #[inline]
    pub fn chain(&self) -> &[PanelId] { &self.chain }

    /// Chain-order buffer from the last draw.
    #[inline]
    pub const fn chain_buffer(&self) -> &PixelBuffer { &self.chain_buffer }

    #[inline]
    pub const fn backend(&self) -> &B { &self.backend }

    #[inline]
    pub const fn backend_mut(&mut self) -> &mut B { &mut self.backend }
}

fn set_panel(
    panels: &mut PanelSet,
    id: PanelId,
    f: impl FnOnce(&mut Panel),
) {
    if let Some(panel) = panels.get_mut(id) {
        f(panel);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use embedded_graphics::pixelcolor::RgbColor;

    use super::*;
    use crate::backend::NullBackend;

    /// Backend that keeps a copy of every buffer it receives.
    #[derive(Default)]
    struct RecordingBackend {
        frames: Vec<PixelBuffer>,
    }

    impl Backend for RecordingBackend {
        fn draw(
            &mut self,
            buffer: &PixelBuffer,
        ) -> Result<()> {
            self.frames.push(buffer.clone());
            Ok(())
        }
    }

    struct Grid {
        panels: PanelSet,
        a: PanelId,
        b: PanelId,
        c: PanelId,
        d: PanelId,
    }

    fn grid(size: usize) -> Grid {
        let mut panels = PanelSet::new();
        let a = panels.add(Panel::new(size, size));
        let b = panels.add(Panel::new(size, size));
        let c = panels.add(Panel::new(size, size));
        let d = panels.add(Panel::new(size, size));
        Grid { panels, a, b, c, d }
    }

    fn installation_display() -> (Display<RecordingBackend>, Grid) {
        let g = grid(32);
        let display = Display::new(
            g.panels.clone(),
            vec![vec![g.a, g.b], vec![g.c, g.d]],
            vec![g.a, g.b, g.d, g.c],
            &[0, 0, 180, 180],
            RecordingBackend::default(),
        )
        .unwrap();
        (display, g)
    }

    /// Frame where each pixel encodes its own coordinates.
    fn coordinate_frame(
        width: usize,
        height: usize,
    ) -> Frame {
        let mut frame = Frame::new(width, height, 4);
        for y in 0..height {
            for x in 0..width {
                frame.set_pixel(x, y, &[x as u8, y as u8, 7, 255]);
            }
        }
        frame
    }

    #[test]
    fn test_total_size_and_offsets() {
        let (display, g) = installation_display();
        assert_eq!(display.total_size(), (64, 64));
        assert_eq!(display.panel_shape(), (32, 32));
        assert_eq!(display.chain_len(), 4);
        assert_eq!(display.panel(g.a).unwrap().offset(), (0, 0));
        assert_eq!(display.panel(g.b).unwrap().offset(), (32, 0));
        assert_eq!(display.panel(g.c).unwrap().offset(), (0, 32));
        assert_eq!(display.panel(g.d).unwrap().offset(), (32, 32));
    }

    #[test]
    fn test_chain_offsets_and_rotations() {
        let (display, g) = installation_display();
        assert_eq!(display.panel(g.a).unwrap().chain_offset(), 0);
        assert_eq!(display.panel(g.b).unwrap().chain_offset(), 32);
        assert_eq!(display.panel(g.d).unwrap().chain_offset(), 64);
        assert_eq!(display.panel(g.c).unwrap().chain_offset(), 96);
        assert_eq!(display.panel(g.a).unwrap().rotation(), Rotation::Deg0);
        assert_eq!(display.panel(g.d).unwrap().rotation(), Rotation::Deg180);
        assert_eq!(display.chain_buffer().size(), (128, 32));
    }

    #[test]
    fn test_rectangular_layouts_sum_extents() {
        let mut panels = PanelSet::new();
        let ids: Vec<_> = (0..6).map(|_| panels.add(Panel::new(16, 8))).collect();
        let layout = vec![ids[0..3].to_vec(), ids[3..6].to_vec()];
        let display = Display::new(panels, layout, ids.clone(), &[], NullBackend).unwrap();
        assert_eq!(display.total_size(), (48, 16));
        assert_eq!(display.chain_buffer().size(), (96, 8));
        assert_eq!(display.panel(ids[4]).unwrap().offset(), (16, 8));
    }

    #[test]
    fn test_red_pixel_lands_at_chain_origin() {
        let (mut display, _) = installation_display();
        let mut frame = Frame::new(64, 64, 3);
        frame.set_pixel(0, 0, &[255, 0, 0]);
        display.draw(&frame).unwrap();

        let buffer = display.chain_buffer();
        assert_eq!(buffer.get(0, 0), Some(Rgb888::RED));
        let red_count = buffer.pixels().iter().filter(|p| **p == Rgb888::RED).count();
        assert_eq!(red_count, 1);
        assert_eq!(display.backend().frames.len(), 1);
        assert_eq!(display.backend().frames[0], *buffer);
    }

    #[test]
    fn test_quadrants_map_with_rotation() {
        let (mut display, _) = installation_display();
        let frame = coordinate_frame(64, 64);
        display.draw(&frame).unwrap();
        let buffer = display.chain_buffer();

        for y in 0..32 {
            for x in 0..32 {
                // A: top-left, unrotated
                assert_eq!(buffer.get(x, y), frame.rgb(x, y));
                // B: top-right, unrotated
                assert_eq!(buffer.get(32 + x, y), frame.rgb(32 + x, y));
                // D: bottom-right, rotated 180
                assert_eq!(buffer.get(64 + x, y), frame.rgb(32 + 31 - x, 32 + 31 - y));
                // C: bottom-left, rotated 180
                assert_eq!(buffer.get(96 + x, y), frame.rgb(31 - x, 32 + 31 - y));
            }
        }
    }

    #[test]
    fn test_quarter_turn_mapping_matches_transform() {
        let mut panels = PanelSet::new();
        let a = panels.add(Panel::new(4, 4));
        let b = panels.add(Panel::new(4, 4));
        let mut display = Display::new(panels, vec![vec![a, b]], vec![b, a], &[90, 270], NullBackend).unwrap();
        let frame = coordinate_frame(8, 4);
        display.draw(&frame).unwrap();

        let region_b = PixelBuffer::from_fn(4, 4, |x, y| frame.rgb(4 + x, y).unwrap());
        let expected = display.panel(b).unwrap().transform(&region_b);
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(display.chain_buffer().get(x, y), expected.get(x, y));
            }
        }
    }

    #[test]
    fn test_draw_overwrites_previous_frame() {
        let (mut display, _) = installation_display();
        let mut frame = Frame::new(64, 64, 3);
        frame.set_pixel(10, 10, &[0, 255, 0]);
        display.draw(&frame).unwrap();

        display.draw(&Frame::new(64, 64, 3)).unwrap();
        assert!(display.chain_buffer().pixels().iter().all(|p| *p == Rgb888::BLACK));
        assert_eq!(display.backend().frames.len(), 2);
    }

    #[test]
    fn test_frame_shape_mismatch() {
        let (mut display, _) = installation_display();
        assert!(matches!(
            display.draw(&Frame::new(32, 64, 3)),
            Err(Error::FrameShapeMismatch { width: 32, .. })
        ));
        assert!(matches!(
            display.draw(&Frame::new(64, 64, 2)),
            Err(Error::FrameShapeMismatch { channels: 2, .. })
        ));
        assert!(display.backend().frames.is_empty());
    }

    #[test]
    fn test_layout_must_be_two_dimensional() {
        let g = grid(8);
        let result = Display::new(g.panels.clone(), vec![], vec![g.a], &[], NullBackend);
        assert!(matches!(result, Err(Error::InvalidGeometry(_))));

        let result = Display::new(
            g.panels.clone(),
            vec![vec![g.a, g.b], vec![g.c]],
            vec![g.a, g.b, g.c],
            &[],
            NullBackend,
        );
        assert!(matches!(result, Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn test_empty_chain_rejected() {
        let g = grid(8);
        let result = Display::new(g.panels, vec![vec![g.a]], vec![], &[], NullBackend);
        assert!(matches!(result, Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn test_duplicate_chain_entry_rejected() {
        let g = grid(8);
        let result = Display::new(
            g.panels,
            vec![vec![g.a, g.b], vec![g.c, g.d]],
            vec![g.a, g.b, g.d, g.d],
            &[],
            NullBackend,
        );
        assert!(matches!(result, Err(Error::GeometryMismatch(_))));
    }

    #[test]
    fn test_chain_missing_layout_panel() {
        let g = grid(8);
        let result = Display::new(
            g.panels,
            vec![vec![g.a, g.b], vec![g.c, g.d]],
            vec![g.a, g.b, g.d],
            &[],
            NullBackend,
        );
        assert!(matches!(result, Err(Error::GeometryMismatch(_))));
    }

    #[test]
    fn test_chain_with_panel_outside_layout() {
        let g = grid(8);
        let result = Display::new(
            g.panels,
            vec![vec![g.a, g.b], vec![g.c, g.c]],
            vec![g.a, g.b, g.c, g.d],
            &[],
            NullBackend,
        );
        assert!(matches!(result, Err(Error::GeometryMismatch(_))));

        let g = grid(8);
        let result = Display::new(g.panels, vec![vec![g.a, g.b]], vec![g.a, g.b, g.c], &[], NullBackend);
        assert!(matches!(result, Err(Error::GeometryMismatch(_))));
    }

    #[test]
    fn test_unknown_panel_rejected() {
        let g = grid(8);
        let mut other = PanelSet::new();
        for _ in 0..5 {
            other.add(Panel::new(8, 8));
        }
        let foreign = other.iter().last().map(|(id, _)| id).unwrap();
        let result = Display::new(g.panels, vec![vec![g.a]], vec![foreign], &[], NullBackend);
        assert!(matches!(result, Err(Error::GeometryMismatch(_))));
    }

    #[test]
    fn test_in_range_id_from_other_set_rejected() {
        let g = grid(8);
        let other = grid(8);
        // Same index as g.a, issued by another set
        assert_eq!(other.a.index(), g.a.index());
        let result = Display::new(
            g.panels,
            vec![vec![other.a, g.b], vec![g.c, g.d]],
            vec![other.a, g.b, g.d, g.c],
            &[],
            NullBackend,
        );
        assert!(matches!(result, Err(Error::GeometryMismatch(_))));
    }

    #[test]
    fn test_rotation_list_length() {
        let g = grid(8);
        let result = Display::new(
            g.panels,
            vec![vec![g.a, g.b], vec![g.c, g.d]],
            vec![g.a, g.b, g.d, g.c],
            &[0, 180],
            NullBackend,
        );
        assert!(matches!(result, Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn test_rotation_value_rejected() {
        let mut panels = PanelSet::new();
        let a = panels.add(Panel::new(8, 8));
        let b = panels.add(Panel::new(8, 8));
        let result = Display::new(panels, vec![vec![a, b]], vec![a, b], &[0, 45], NullBackend);
        assert!(matches!(result, Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn test_mixed_panel_shapes_rejected() {
        let mut panels = PanelSet::new();
        let a = panels.add(Panel::new(32, 32));
        let b = panels.add(Panel::new(32, 16));
        let result = Display::new(panels, vec![vec![a, b]], vec![a, b], &[], NullBackend);
        assert!(matches!(result, Err(Error::GeometryMismatch(_))));
    }

    #[test]
    fn test_quarter_turn_requires_square_panels() {
        let mut panels = PanelSet::new();
        let a = panels.add(Panel::new(32, 16));
        let result = Display::new(panels.clone(), vec![vec![a]], vec![a], &[90], NullBackend);
        assert!(matches!(result, Err(Error::InvalidGeometry(_))));

        assert!(Display::new(panels, vec![vec![a]], vec![a], &[180], NullBackend).is_ok());
    }

    #[test]
    fn test_zero_sized_panel_rejected() {
        let mut panels = PanelSet::new();
        let a = panels.add(Panel::new(0, 32));
        let result = Display::new(panels, vec![vec![a]], vec![a], &[], NullBackend);
        assert!(matches!(result, Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn test_frame_from_raw() {
        assert!(Frame::from_raw(2, 2, 3, vec![0; 12]).is_ok());
        assert!(matches!(
            Frame::from_raw(2, 2, 3, vec![0; 11]),
            Err(Error::FrameShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_frame_rgba_ignores_alpha() {
        let mut frame = Frame::new(1, 1, 4);
        frame.set_pixel(0, 0, &[1, 2, 3, 4]);
        assert_eq!(frame.rgb(0, 0), Some(Rgb888::new(1, 2, 3)));
        assert_eq!(frame.as_bytes(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_frame_rgb_out_of_bounds() {
        let frame = Frame::new(2, 3, 3);
        assert_eq!(frame.rgb(1, 2), Some(Rgb888::BLACK));
        assert_eq!(frame.rgb(2, 0), None);
        assert_eq!(frame.rgb(0, 3), None);
        assert_eq!(Frame::new(2, 2, 1).rgb(0, 0), None);
    }
}
