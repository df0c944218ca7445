use crate::{
    eval::composite::over,
    foundation::core::{Canvas, PixelSample, Viewport},
    identity::allocator::{Reassignment, RegionId},
};

/// Alpha at or above which a layer owns a pixel's identity outright.
pub(crate) const IDENTITY_ALPHA: f32 = 0.5;

/// One pixel of a layer: its sample plus identity and depth metadata.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerPixel {
    /// Color and coverage.
    pub sample: PixelSample,
    /// Region identity, [`RegionId::SENTINEL`] where nothing is covered.
    pub id: RegionId,
    /// Compositing levels traversed to reach this pixel.
    pub depth: u8,
}

impl LayerPixel {
    /// Uncovered pixel.
    pub const EMPTY: Self = Self {
        sample: PixelSample::TRANSPARENT,
        id: RegionId::SENTINEL,
        depth: 0,
    };
}

impl Default for LayerPixel {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// A pixel buffer over one [`Canvas`], with per-pixel identity and depth.
///
/// Every layer of a node shares that node's canvas. Layers are immutable once built; the evaluator
/// cache shares them between children.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    canvas: Canvas,
    depth: u8,
    pixels: Vec<LayerPixel>,
}

impl Layer {
    pub(crate) fn new(canvas: Canvas, depth: u8, pixels: Vec<LayerPixel>) -> Self {
        debug_assert_eq!(pixels.len(), canvas.pixel_count());
        Self {
            canvas,
            depth,
            pixels,
        }
    }

    /// Window of the raster lattice the pixels cover.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Compositing depth the layer was produced at. Flattened layers report their deepest pixel.
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Pixels in row-major order.
    pub fn pixels(&self) -> &[LayerPixel] {
        &self.pixels
    }

    /// `true` when no pixel has coverage.
    pub fn is_empty(&self) -> bool {
        self.pixels.iter().all(|p| p.sample.is_transparent())
    }

    /// Non-sentinel identities in pixel order, repeats included.
    pub fn covered_ids(&self) -> impl Iterator<Item = RegionId> + '_ {
        self.pixels
            .iter()
            .map(|p| p.id)
            .filter(|id| !id.is_sentinel())
    }

    /// Pixel at raster position `(x, y)`; empty outside the canvas.
    pub fn pixel_at(&self, x: i64, y: i64) -> LayerPixel {
        self.canvas
            .index(x, y)
            .and_then(|i| self.pixels.get(i).copied())
            .unwrap_or(LayerPixel::EMPTY)
    }

    /// Copy of this layer moved onto `canvas`, identities rewritten through `map`.
    pub(crate) fn reframed(&self, canvas: Canvas, map: &Reassignment) -> Self {
        let mut pixels = Vec::with_capacity(canvas.pixel_count());
        for y in 0..i64::from(canvas.height) {
            for x in 0..i64::from(canvas.width) {
                let p = self.pixel_at(canvas.x + x, canvas.y + y);
                pixels.push(LayerPixel {
                    id: map.get(p.id),
                    ..p
                });
            }
        }
        Self {
            canvas,
            depth: self.depth,
            pixels,
        }
    }

    /// Rewrite identities through `map` in place.
    pub(crate) fn remap(&mut self, map: &Reassignment) {
        for p in &mut self.pixels {
            p.id = map.get(p.id);
        }
    }

    /// Approximate heap footprint.
    pub fn estimated_bytes(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<LayerPixel>() + std::mem::size_of::<Self>()
    }
}

/// Composite `layers` (all on one canvas) bottom-to-top at pixel index `i`.
///
/// Identity and depth come from the topmost layer with alpha ≥ 0.5, else the topmost with any
/// coverage.
pub(crate) fn flatten_pixel(layers: &[Layer], i: usize) -> LayerPixel {
    let mut sample = PixelSample::TRANSPARENT;
    let mut strong: Option<LayerPixel> = None;
    let mut weak: Option<LayerPixel> = None;
    for layer in layers {
        let Some(p) = layer.pixels.get(i) else {
            continue;
        };
        if p.sample.is_transparent() {
            continue;
        }
        sample = over(sample, p.sample);
        if p.sample.alpha >= IDENTITY_ALPHA {
            strong = Some(*p);
        }
        weak = Some(*p);
    }
    match strong.or(weak) {
        Some(owner) => LayerPixel {
            sample,
            id: owner.id,
            depth: owner.depth,
        },
        None => LayerPixel::EMPTY,
    }
}

/// Collapse a layer list sharing `canvas` into a single layer.
pub(crate) fn flatten(layers: &[Layer], canvas: Canvas) -> Layer {
    let pixels: Vec<LayerPixel> = (0..canvas.pixel_count())
        .map(|i| flatten_pixel(layers, i))
        .collect();
    let depth = pixels.iter().map(|p| p.depth).max().unwrap_or(0);
    Layer {
        canvas,
        depth,
        pixels,
    }
}

/// Flattened output of one node: samples plus identity and depth matrices.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositedFrame {
    /// Raster mapping the matrices are laid out on.
    pub viewport: Viewport,
    /// Row-major color/alpha.
    pub samples: Vec<PixelSample>,
    /// Row-major identities.
    pub identities: Vec<RegionId>,
    /// Row-major depths.
    pub depths: Vec<u8>,
}

impl CompositedFrame {
    /// Crop `layers`, which share `canvas`, to the raster of `viewport` and flatten them.
    pub(crate) fn from_layers(viewport: Viewport, canvas: Canvas, layers: &[Layer]) -> Self {
        let n = viewport.pixel_count();
        let mut samples = Vec::with_capacity(n);
        let mut identities = Vec::with_capacity(n);
        let mut depths = Vec::with_capacity(n);
        for y in 0..i64::from(viewport.height) {
            for x in 0..i64::from(viewport.width) {
                let p = canvas
                    .index(x, y)
                    .map_or(LayerPixel::EMPTY, |i| flatten_pixel(layers, i));
                samples.push(p.sample);
                identities.push(p.id);
                depths.push(p.depth);
            }
        }
        Self {
            viewport,
            samples,
            identities,
            depths,
        }
    }

    /// Sample at pixel `(x, y)`, if inside the raster.
    pub fn sample(&self, x: u32, y: u32) -> Option<PixelSample> {
        self.index(x, y).map(|i| self.samples[i])
    }

    /// Identity at pixel `(x, y)`, if inside the raster.
    pub fn identity(&self, x: u32, y: u32) -> Option<RegionId> {
        self.index(x, y).map(|i| self.identities[i])
    }

    /// Depth at pixel `(x, y)`, if inside the raster.
    pub fn depth(&self, x: u32, y: u32) -> Option<u8> {
        self.index(x, y).map(|i| self.depths[i])
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.viewport.width && y < self.viewport.height)
            .then(|| y as usize * self.viewport.width as usize + x as usize)
    }
}

/// Cache occupancy reported by the compositional evaluator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    /// Cached nodes.
    pub nodes: usize,
    /// Layers across all cached nodes.
    pub layers: usize,
    /// Approximate memory held by cached layers.
    pub estimated_bytes: usize,
}

#[cfg(test)]
#[path = "../../tests/unit/eval/layer.rs"]
mod tests;
