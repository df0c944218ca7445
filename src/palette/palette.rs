use crate::palette::color::{Color, Hsl};

/// Hue offsets (degrees) of the harmonic base set, relative to the seed hue.
const HARMONIC_OFFSETS: [f64; 6] = [0.0, 120.0, 240.0, 180.0, 60.0, 300.0];

/// Saturation factor used for desaturated derivatives.
pub const DESATURATE_FACTOR: f64 = 0.35;

/// Number of generated colors: one base, one darker, one lighter, one desaturated per hue.
pub const PALETTE_LEN: usize = HARMONIC_OFFSETS.len() * 4;

/// Depth-indexed palette generated from one seed color.
///
/// The generated list starts with the seed itself, so depth 0 (the root) always maps to the seed.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorPalette {
    seed: Color,
    colors: Vec<Color>,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::new(Color::rgb(0.85, 0.33, 0.24))
    }
}

impl ColorPalette {
    /// Palette generated from `seed`.
    pub fn new(seed: Color) -> Self {
        Self {
            seed,
            colors: generate(seed),
        }
    }

    /// Replace the seed and regenerate.
    pub fn set_base_color(&mut self, seed: Color) {
        self.seed = seed;
        self.colors = generate(seed);
    }

    /// Current seed color.
    pub fn base_color(&self) -> Color {
        self.seed
    }

    /// Color for a compositing depth; cycles through the generated set.
    pub fn color_for_depth(&self, depth: u8) -> Color {
        self.colors[usize::from(depth) % self.colors.len()]
    }

    /// Desaturated variant of [`Self::color_for_depth`].
    pub fn desaturated_for_depth(&self, depth: u8) -> Color {
        self.color_for_depth(depth).desaturated(DESATURATE_FACTOR)
    }
}

fn generate(seed: Color) -> Vec<Color> {
    let base = seed.to_hsl();
    let mut out = Vec::with_capacity(PALETTE_LEN);
    for offset in HARMONIC_OFFSETS {
        let hue = Hsl {
            h: (base.h + offset) % 360.0,
            ..base
        };
        // The seed itself is emitted unchanged so depth 0 reproduces it exactly.
        out.push(if offset == 0.0 {
            Color { a: 1.0, ..seed }
        } else {
            Color::from_hsl(hue)
        });
    }
    for offset in HARMONIC_OFFSETS {
        let h = (base.h + offset) % 360.0;
        out.push(Color::from_hsl(Hsl {
            h,
            l: base.l * 0.65,
            ..base
        }));
        out.push(Color::from_hsl(Hsl {
            h,
            l: base.l + (1.0 - base.l) * 0.45,
            ..base
        }));
        out.push(Color::from_hsl(Hsl {
            h,
            s: base.s * DESATURATE_FACTOR,
            ..base
        }));
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/palette/palette.rs"]
mod tests;
