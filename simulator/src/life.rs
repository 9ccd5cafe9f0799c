//! Conway's game of life as a demo generator.
//!
//! Each cell remembers how many steps ago it was last alive. The [`Palette`]
//! fades dead cells out over `history_length` steps, so recent activity leaves
//! a trail.

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use ledsart::{Frame, Generator};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Parameters for a fresh board.
#[derive(Clone, Debug)]
pub struct LifeConfig {
    pub width: usize,
    pub height: usize,
    /// Fraction of cells alive at the start (0.0-1.0).
    pub density: f32,
    /// Fixed seed for a reproducible board.
    pub seed: Option<u64>,
}

impl Default for LifeConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            density: 0.4,
            seed: None,
        }
    }
}

/// Two-color gradient plus trail settings.
#[derive(Clone, Debug)]
pub struct Palette {
    pub low: Rgb888,
    pub high: Rgb888,
    /// Steps a dead cell takes to fade out completely.
    pub history_length: u16,
    /// Swap the ends of the gradient.
    pub flip: bool,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            low: Rgb888::BLACK,
            high: Rgb888::new(40, 200, 60),
            history_length: 50,
            flip: false,
        }
    }
}

/// Board configurations the installation picks from.
pub fn configs(
    width: usize,
    height: usize,
) -> Vec<LifeConfig> {
    [0.4, 0.5, 0.6]
        .into_iter()
        .map(|density| LifeConfig {
            width,
            height,
            density,
            seed: None,
        })
        .collect()
}

/// Plot styles the installation picks from.
pub fn palettes() -> Vec<Palette> {
    let greens = Palette::default();
    vec![
        Palette { flip: true, ..greens.clone() },
        Palette {
            high: Rgb888::new(255, 140, 20),
            flip: true,
            ..greens.clone()
        },
        Palette {
            low: Rgb888::new(10, 20, 60),
            high: Rgb888::new(120, 220, 255),
            ..greens.clone()
        },
        Palette {
            high: Rgb888::new(220, 60, 200),
            history_length: 5,
            ..greens.clone()
        },
        Palette {
            high: Rgb888::WHITE,
            history_length: 1,
            ..greens
        },
    ]
}

pub struct Life {
    width: usize,
    height: usize,
    alive: Vec<bool>,
    next: Vec<bool>,
    /// Steps since each cell was last alive (0 = alive now).
    age: Vec<u16>,
}

impl Life {
    fn index(
        &self,
        x: usize,
        y: usize,
    ) -> usize {
        y * self.width + x
    }

    fn neighbours(
        &self,
        x: usize,
        y: usize,
    ) -> u8 {
        let mut count = 0;
        for dy in [self.height - 1, 0, 1] {
            for dx in [self.width - 1, 0, 1] {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = (x + dx) % self.width;
                let ny = (y + dy) % self.height;
                count += u8::from(self.alive[self.index(nx, ny)]);
            }
        }
        count
    }

    pub fn population(&self) -> usize { self.alive.iter().filter(|a| **a).count() }
}

impl Generator for Life {
    type Config = LifeConfig;
    type Style = Palette;

    fn new(config: &LifeConfig) -> Self {
        let mut rng = config.seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let width = config.width.max(1);
        let height = config.height.max(1);
        let density = f64::from(config.density.clamp(0.0, 1.0));

        let alive: Vec<bool> = (0..width * height).map(|_| rng.gen_bool(density)).collect();
        let age = alive.iter().map(|&a| if a { 0 } else { u16::MAX }).collect();
        Self {
            width,
            height,
            next: alive.clone(),
            alive,
            age,
        }
    }

    fn iterate(&mut self) {
        for y in 0..self.height {
            for x in 0..self.width {
                let i = self.index(x, y);
                self.next[i] = matches!((self.alive[i], self.neighbours(x, y)), (true, 2 | 3) | (false, 3));
            }
        }
        core::mem::swap(&mut self.alive, &mut self.next);
        for (age, &alive) in self.age.iter_mut().zip(&self.alive) {
            *age = if alive { 0 } else { age.saturating_add(1) };
        }
    }

    fn render(
        &self,
        palette: &Palette,
    ) -> Frame {
        let mut frame = Frame::new(self.width, self.height, 3);
        let history = f32::from(palette.history_length.max(1));

        for y in 0..self.height {
            for x in 0..self.width {
                let age = f32::from(self.age[self.index(x, y)]);
                let mut level = if age < history { 1.0 - age / history } else { 0.0 };
                if palette.flip {
                    level = 1.0 - level;
                }
                let color = lerp(palette.low, palette.high, level);
                frame.set_pixel(x, y, &[color.r(), color.g(), color.b()]);
            }
        }
        frame
    }
}

fn lerp(
    a: Rgb888,
    b: Rgb888,
    t: f32,
) -> Rgb888 {
    let mix = |from: u8, to: u8| (f32::from(to) - f32::from(from)).mul_add(t, f32::from(from)).round() as u8;
    Rgb888::new(mix(a.r(), b.r()), mix(a.g(), b.g()), mix(a.b(), b.b()))
}
