use crate::foundation::error::{FlipError, FlipResult};

pub use kurbo::{Affine, Point, Rect, Vec2};

/// A monochrome sample: `color` 0 is black, 1 is white; `alpha` is straight (not premultiplied).
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PixelSample {
    /// Color value in `[0, 1]`.
    pub color: f32,
    /// Coverage in `[0, 1]`.
    pub alpha: f32,
}

impl PixelSample {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self {
        color: 0.0,
        alpha: 0.0,
    };

    /// Build a sample, clamping both channels into `[0, 1]`.
    pub fn new(color: f32, alpha: f32) -> Self {
        Self {
            color: color.clamp(0.0, 1.0),
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    /// Color inversion (`1 - color`), alpha unchanged.
    pub fn inverted(self) -> Self {
        Self {
            color: 1.0 - self.color,
            alpha: self.alpha,
        }
    }

    /// `true` when the sample contributes nothing.
    pub fn is_transparent(self) -> bool {
        self.alpha <= 0.0
    }
}

/// Maps raster pixels to world coordinates.
///
/// World y grows downward (screen convention). The shorter raster side spans
/// `[-extent, extent]` world units, centered on the origin.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    /// Raster width in pixels.
    pub width: u32,
    /// Raster height in pixels.
    pub height: u32,
    /// Half-size of the shorter raster side in world units.
    pub extent: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            extent: 1.25,
        }
    }
}

impl Viewport {
    /// Build a viewport, rejecting empty rasters and non-positive extents.
    pub fn new(width: u32, height: u32, extent: f64) -> FlipResult<Self> {
        let v = Self {
            width,
            height,
            extent,
        };
        v.validate()?;
        Ok(v)
    }

    /// Check raster dimensions and extent.
    pub fn validate(&self) -> FlipResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FlipError::validation("viewport width/height must be > 0"));
        }
        if !self.extent.is_finite() || self.extent <= 0.0 {
            return Err(FlipError::validation(
                "viewport extent must be finite and > 0",
            ));
        }
        Ok(())
    }

    /// Number of pixels in the raster.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// World size of one pixel edge.
    pub fn pixel_world_size(&self) -> f64 {
        let short = self.width.min(self.height).max(1);
        2.0 * self.extent / f64::from(short)
    }

    /// World position of a raster location given in (fractional) pixel units.
    ///
    /// Pixel centers sit at `x + 0.5`, `y + 0.5`.
    pub fn raster_to_world(&self, x: f64, y: f64) -> Point {
        let s = self.pixel_world_size();
        Point::new(
            (x - f64::from(self.width) * 0.5) * s,
            (y - f64::from(self.height) * 0.5) * s,
        )
    }

    /// Inverse of [`Viewport::raster_to_world`].
    pub fn world_to_raster(&self, p: Point) -> Point {
        let s = self.pixel_world_size();
        Point::new(
            p.x / s + f64::from(self.width) * 0.5,
            p.y / s + f64::from(self.height) * 0.5,
        )
    }

    /// World position of the center of pixel `(x, y)`.
    pub fn pixel_center(&self, x: u32, y: u32) -> Point {
        self.raster_to_world(f64::from(x) + 0.5, f64::from(y) + 0.5)
    }

    /// World rectangle covered by the raster.
    pub fn world_rect(&self) -> Rect {
        Rect::from_points(
            self.raster_to_world(0.0, 0.0),
            self.raster_to_world(f64::from(self.width), f64::from(self.height)),
        )
    }

    /// Window of the raster itself.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            x: 0,
            y: 0,
            width: self.width,
            height: self.height,
        }
    }

    /// Smallest window of this raster's pixel lattice that covers `rect`.
    pub fn canvas_covering(&self, rect: Rect) -> Canvas {
        if rect.is_zero_area() || !rect.is_finite() {
            return Canvas::EMPTY;
        }
        let lo = self.world_to_raster(Point::new(rect.x0, rect.y0));
        let hi = self.world_to_raster(Point::new(rect.x1, rect.y1));
        let (x, y) = (lo.x.floor() as i64, lo.y.floor() as i64);
        let width = (hi.x.ceil() as i64 - x).clamp(0, i64::from(u32::MAX)) as u32;
        let height = (hi.y.ceil() as i64 - y).clamp(0, i64::from(u32::MAX)) as u32;
        Canvas {
            x,
            y,
            width,
            height,
        }
    }
}

/// A window of a [`Viewport`]'s pixel lattice.
///
/// `x`/`y` locate the window's top-left pixel in raster coordinates and may be negative: a canvas
/// can extend past the raster on any side while its pixels stay aligned with the raster's.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Canvas {
    /// Left edge in raster pixels.
    pub x: i64,
    /// Top edge in raster pixels.
    pub y: i64,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Window with no pixels.
    pub const EMPTY: Self = Self {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    /// Number of pixels in the window.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// `true` when the window holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// `true` if every pixel of `other` lies inside `self`. An empty window fits anywhere.
    pub fn contains(&self, other: &Canvas) -> bool {
        other.is_empty()
            || (other.x >= self.x
                && other.y >= self.y
                && other.x + i64::from(other.width) <= self.x + i64::from(self.width)
                && other.y + i64::from(other.height) <= self.y + i64::from(self.height))
    }

    /// Row-major index of raster pixel `(x, y)`, if the window holds it.
    pub fn index(&self, x: i64, y: i64) -> Option<usize> {
        let (lx, ly) = (x - self.x, y - self.y);
        (lx >= 0 && ly >= 0 && lx < i64::from(self.width) && ly < i64::from(self.height))
            .then(|| ly as usize * self.width as usize + lx as usize)
    }

    /// World position of the center of window pixel `(x, y)`.
    pub fn pixel_center(&self, viewport: &Viewport, x: u32, y: u32) -> Point {
        viewport.raster_to_world(
            (self.x + i64::from(x)) as f64 + 0.5,
            (self.y + i64::from(y)) as f64 + 0.5,
        )
    }

    /// World rectangle covered by the window.
    pub fn world_rect(&self, viewport: &Viewport) -> Rect {
        if self.is_empty() {
            return Rect::ZERO;
        }
        Rect::from_points(
            viewport.raster_to_world(self.x as f64, self.y as f64),
            viewport.raster_to_world(
                (self.x + i64::from(self.width)) as f64,
                (self.y + i64::from(self.height)) as f64,
            ),
        )
    }
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Rgba8Premul {
    /// Fully transparent pixel.
    pub fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    /// Channels as `[r, g, b, a]`.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
