//! Status strip drawn under the simulated panel chain.

use core::fmt::Write;

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::Text;
use embedded_graphics_simulator::SimulatorDisplay;
use heapless::String;
use ledsart::installation::Controls;
use ledsart::metrics::EventLog;
use profont::PROFONT_7_POINT;

/// Height of the strip in pixels.
pub const STATUS_HEIGHT: u32 = 22;

const LINE_HEIGHT: i32 = 10;
const MARGIN_X: i32 = 2;

const STATUS_BG: Rgb888 = Rgb888::new(16, 16, 16);
const VALUE_COLOR: Rgb888 = Rgb888::new(230, 230, 230);
const EVENT_COLOR: Rgb888 = Rgb888::new(255, 160, 40);

/// Values shown in the strip.
pub struct Status<'a> {
    pub controls: &'a Controls,
    pub iteration: u32,
    pub distance: f32,
    pub events: &'a EventLog,
}

/// Redraw the strip whose top edge is at `top`.
pub fn draw_status(
    display: &mut SimulatorDisplay<Rgb888>,
    top: i32,
    status: &Status<'_>,
) {
    let width = display.size().width;
    Rectangle::new(Point::new(0, top), Size::new(width, STATUS_HEIGHT))
        .into_styled(PrimitiveStyle::with_fill(STATUS_BG))
        .draw(display)
        .ok();

    let mut line: String<48> = String::new();
    let _ = write!(
        line,
        "it {}/{}  {:.2}s  d {:.2}m",
        status.iteration,
        status.controls.num_iterations,
        status.controls.iteration_interval.as_secs_f32(),
        status.distance
    );
    Text::new(
        &line,
        Point::new(MARGIN_X, top + LINE_HEIGHT - 2),
        MonoTextStyle::new(&PROFONT_7_POINT, VALUE_COLOR),
    )
    .draw(display)
    .ok();

    if let Some(event) = status.events.last() {
        line.clear();
        let _ = write!(line, "#{} {}", event.tick, event.kind);
        Text::new(
            &line,
            Point::new(MARGIN_X, top + 2 * LINE_HEIGHT - 2),
            MonoTextStyle::new(&PROFONT_7_POINT, EVENT_COLOR),
        )
        .draw(display)
        .ok();
    }
}
