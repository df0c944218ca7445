use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::foundation::core::Rgba8Premul;
use crate::foundation::math::unit_to_u8;

/// Straight-alpha color with channels in `[0, 1]`.
///
/// Deserializes from `"#RRGGBB"`/`"#RRGGBBAA"`, `{r,g,b[,a]}`, `{h,s,l[,a]}` or `[r,g,b[,a]]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr")]
pub struct Color {
    /// Red.
    pub r: f64,
    /// Green.
    pub g: f64,
    /// Blue.
    pub b: f64,
    /// Alpha.
    pub a: f64,
}

/// Hue in degrees `[0, 360)`, saturation and lightness in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    /// Hue in degrees.
    pub h: f64,
    /// Saturation.
    pub s: f64,
    /// Lightness.
    pub l: f64,
}

impl Color {
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);

    /// Build from straight-alpha channels.
    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color.
    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    /// Opaque gray of the given level.
    pub fn gray(v: f64) -> Self {
        Self::rgb(v, v, v)
    }

    /// Same channels with alpha replaced.
    pub const fn with_alpha(self, a: f64) -> Self {
        Self { a, ..self }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA`; the `#` is optional.
    pub fn from_hex(s: &str) -> Result<Self, String> {
        s.parse()
    }

    /// Opaque color from HSL, by chroma and the hue sextant.
    pub fn from_hsl(hsl: Hsl) -> Self {
        let h = hsl.h.rem_euclid(360.0) / 60.0;
        let s = hsl.s.clamp(0.0, 1.0);
        let l = hsl.l.clamp(0.0, 1.0);
        let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u8 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };
        let m = l - chroma / 2.0;
        Self::rgb(r + m, g + m, b + m)
    }

    /// HSL coordinates of the color channels (alpha dropped). Inverse of [`Self::from_hsl`].
    pub fn to_hsl(self) -> Hsl {
        let r = self.r.clamp(0.0, 1.0);
        let g = self.g.clamp(0.0, 1.0);
        let b = self.b.clamp(0.0, 1.0);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let chroma = max - min;
        let l = (max + min) / 2.0;
        if chroma <= f64::EPSILON {
            return Hsl { h: 0.0, s: 0.0, l };
        }
        let s = chroma / (1.0 - (2.0 * l - 1.0).abs());
        let sextant = if max == r {
            ((g - b) / chroma).rem_euclid(6.0)
        } else if max == g {
            (b - r) / chroma + 2.0
        } else {
            (r - g) / chroma + 4.0
        };
        Hsl {
            h: sextant * 60.0,
            s,
            l,
        }
    }

    /// Same hue and lightness with saturation scaled by `factor`.
    pub fn desaturated(self, factor: f64) -> Self {
        let hsl = self.to_hsl();
        Self::from_hsl(Hsl {
            s: (hsl.s * factor).clamp(0.0, 1.0),
            ..hsl
        })
        .with_alpha(self.a)
    }

    /// Premultiplied RGBA8 with an extra coverage factor applied to alpha.
    pub fn to_rgba8_premul(self, coverage: f32) -> Rgba8Premul {
        let a = (self.a.clamp(0.0, 1.0) * f64::from(coverage.clamp(0.0, 1.0))) as f32;
        let px = |c: f64| unit_to_u8((c.clamp(0.0, 1.0) as f32) * a);
        Rgba8Premul {
            r: px(self.r),
            g: px(self.g),
            b: px(self.b),
            a: unit_to_u8(a),
        }
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim();
        let digits = digits.strip_prefix('#').unwrap_or(digits);
        if !matches!(digits.len(), 6 | 8) || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!(
                "invalid hex color \"{s}\": expected #RRGGBB or #RRGGBBAA"
            ));
        }
        let value = u32::from_str_radix(digits, 16).map_err(|e| e.to_string())?;
        // Six digits carry no alpha: shift in an opaque byte.
        let value = if digits.len() == 6 {
            (value << 8) | 0xff
        } else {
            value
        };
        let [r, g, b, a] = value.to_be_bytes().map(|c| f64::from(c) / 255.0);
        Ok(Self::rgba(r, g, b, a))
    }
}

/// Accepted serialized forms of [`Color`].
#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Hex(String),
    Rgb {
        r: f64,
        g: f64,
        b: f64,
        #[serde(default = "opaque")]
        a: f64,
    },
    Hsl {
        h: f64,
        s: f64,
        l: f64,
        #[serde(default = "opaque")]
        a: f64,
    },
    Channels(Vec<f64>),
}

fn opaque() -> f64 {
    1.0
}

impl TryFrom<ColorRepr> for Color {
    type Error = String;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        match repr {
            ColorRepr::Hex(s) => s.parse(),
            ColorRepr::Rgb { r, g, b, a } => Ok(Self::rgba(r, g, b, a)),
            ColorRepr::Hsl { h, s, l, a } => Ok(Self::from_hsl(Hsl { h, s, l }).with_alpha(a)),
            ColorRepr::Channels(v) => match *v.as_slice() {
                [r, g, b] => Ok(Self::rgb(r, g, b)),
                [r, g, b, a] => Ok(Self::rgba(r, g, b, a)),
                _ => Err(format!(
                    "color array needs 3 or 4 channels, got {}",
                    v.len()
                )),
            },
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/palette/color.rs"]
mod tests;
