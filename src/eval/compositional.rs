//! Memoized layer renderer.
//!
//! Each node renders to an ordered list of [`Layer`]s: its base parent's layers (identities
//! reassigned, parity kept) followed by its transform parent's layers resampled through every
//! radial copy (color inverted, depth + 1, identities reassigned with parity flipped). Results are
//! cached per node id and shared by every child.
//!
//! Layers live on per-node [`Canvas`]es aligned with the output raster. Before rendering, the
//! world region each ancestor must cover is propagated back from the target through every inverse
//! copy transform, so content a child pulls in from outside the raster is still there to sample.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::{
    eval::{
        coloring::{ColorModes, colorize},
        layer::{CacheStats, CompositedFrame, Layer, LayerPixel, flatten},
    },
    foundation::{
        core::{Affine, Canvas, PixelSample, Rect, Viewport},
        error::{FlipError, FlipResult},
        math::coverage,
    },
    graph::model::{Graph, Node, NodeId},
    identity::allocator::{IdentityAllocator, Parity},
    palette::palette::ColorPalette,
    render::{
        backend::{FrameRGBA, RenderBackend},
        raster::{build_thread_pool, map_rows},
        settings::RenderSettings,
    },
    transform::pipeline::NodeTransform,
};

/// Default cap on layers kept per node before they are flattened.
pub const DEFAULT_MAX_LAYERS_PER_NODE: usize = 64;

/// Bilinear weight sum below which a resampled pixel is treated as uncovered.
const MIN_RESAMPLED_ALPHA: f64 = 1e-6;

/// Canvases never extend past this multiple of the raster's world rectangle (about the origin).
pub const CANVAS_REACH: f64 = 3.0;

/// Layers of one node and the canvas they were rendered on.
struct CachedNode {
    canvas: Canvas,
    layers: Arc<[Layer]>,
}

/// Recursive "render then composite" evaluator with a per-node layer cache.
///
/// The evaluator owns its identity allocator; ids are only comparable within one cache
/// generation (between two invalidations).
pub struct CompositionalEvaluator {
    viewport: Viewport,
    graph: Option<Arc<Graph>>,
    fingerprint: Option<u64>,
    palette: ColorPalette,
    modes: ColorModes,
    max_layers_per_node: usize,
    pool: Option<Arc<rayon::ThreadPool>>,
    allocator: IdentityAllocator,
    cache: HashMap<NodeId, CachedNode>,
}

impl CompositionalEvaluator {
    /// Evaluator for `viewport` with default palette and monochrome color modes.
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            graph: None,
            fingerprint: None,
            palette: ColorPalette::default(),
            modes: ColorModes::default(),
            max_layers_per_node: DEFAULT_MAX_LAYERS_PER_NODE,
            pool: None,
            allocator: IdentityAllocator::new(),
            cache: HashMap::new(),
        }
    }

    /// Evaluator configured from render settings, with its own rayon pool when parallel.
    pub fn from_settings(settings: &RenderSettings) -> FlipResult<Self> {
        settings.validate()?;
        let mut eval = Self::new(settings.viewport());
        eval.palette = ColorPalette::new(settings.palette_seed);
        eval.modes = settings.color_modes;
        eval.max_layers_per_node = settings.max_layers_per_node;
        if settings.threading.parallel {
            eval.pool = Some(Arc::new(build_thread_pool(settings.threading.threads)?));
        }
        Ok(eval)
    }

    /// Run pixel loops on `pool`.
    pub fn with_thread_pool(mut self, pool: Arc<rayon::ThreadPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Flatten any node whose layer list grows beyond `max` (minimum 1).
    pub fn with_max_layers_per_node(mut self, max: usize) -> Self {
        self.max_layers_per_node = max.max(1);
        self.clear_cache();
        self
    }

    /// Raster mapping.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Change the raster mapping; cached layers are dropped when it differs.
    pub fn set_viewport(&mut self, viewport: Viewport) -> FlipResult<()> {
        viewport.validate()?;
        if viewport != self.viewport {
            self.viewport = viewport;
            self.clear_cache();
        }
        Ok(())
    }

    /// Bound graph, if any.
    pub fn graph(&self) -> Option<&Arc<Graph>> {
        self.graph.as_ref()
    }

    /// Bind a graph. The cache survives only if the graph's fingerprint is unchanged.
    pub fn set_graph(&mut self, graph: Arc<Graph>) {
        let fingerprint = graph.fingerprint();
        if self.fingerprint != Some(fingerprint) {
            self.clear_cache();
        }
        self.fingerprint = Some(fingerprint);
        self.graph = Some(graph);
    }

    /// Current palette.
    pub fn palette(&self) -> &ColorPalette {
        &self.palette
    }

    /// Replace the palette; invalidates the cache.
    pub fn set_palette(&mut self, palette: ColorPalette) {
        self.palette = palette;
        self.clear_cache();
    }

    /// Current color modes.
    pub fn color_modes(&self) -> ColorModes {
        self.modes
    }

    /// Replace the color modes; invalidates the cache.
    pub fn set_color_modes(&mut self, modes: ColorModes) {
        self.modes = modes;
        self.clear_cache();
    }

    /// Drop every cached layer list and restart identity allocation.
    pub fn clear_cache(&mut self) {
        if !self.cache.is_empty() {
            tracing::debug!(nodes = self.cache.len(), "layer cache cleared");
        }
        self.cache.clear();
        self.allocator.reset();
    }

    /// Cache occupancy.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.values().fold(CacheStats::default(), |mut s, entry| {
            s.nodes += 1;
            s.layers += entry.layers.len();
            s.estimated_bytes += entry.layers.iter().map(Layer::estimated_bytes).sum::<usize>();
            s
        })
    }

    /// Layers of `node`, rendering any uncached ancestors first (base before transform).
    ///
    /// A cached node is reused when its canvas already covers what is needed of it; otherwise it is
    /// rendered again on a larger canvas.
    #[tracing::instrument(skip(self))]
    pub fn render_node(&mut self, node: NodeId) -> FlipResult<Arc<[Layer]>> {
        self.render_cached(node).map(|(_, layers)| layers)
    }

    /// Flattened samples plus identity and depth matrices of `node`.
    pub fn render_frame(&mut self, node: NodeId) -> FlipResult<CompositedFrame> {
        let (canvas, layers) = self.render_cached(node)?;
        Ok(CompositedFrame::from_layers(self.viewport, canvas, &layers))
    }

    /// `node` after the final coloring pass.
    pub fn render_rgba(&mut self, node: NodeId) -> FlipResult<FrameRGBA> {
        let frame = self.render_frame(node)?;
        Ok(colorize(&frame, &self.palette, &self.modes))
    }

    fn render_cached(&mut self, node: NodeId) -> FlipResult<(Canvas, Arc<[Layer]>)> {
        let graph = self
            .graph
            .clone()
            .ok_or_else(|| FlipError::evaluation("no graph bound to the evaluator"))?;
        if !graph.contains(node) {
            return Err(FlipError::evaluation(format!(
                "node {node} is not in the graph"
            )));
        }

        let plan = self.plan(&graph, node)?;
        if plan.is_empty() {
            tracing::debug!(%node, "layer cache hit");
        }
        // The plan lists children before parents.
        for (id, canvas) in plan.into_iter().rev() {
            let current = lookup(&graph, id)?;
            let layers = if canvas.is_empty() {
                Vec::new()
            } else if current.is_root() {
                vec![self.rasterize_root(canvas)?]
            } else {
                self.build_composite(current, canvas)?
            };
            tracing::debug!(
                node = %id,
                layers = layers.len(),
                width = canvas.width,
                height = canvas.height,
                "node rendered"
            );
            self.cache.insert(
                id,
                CachedNode {
                    canvas,
                    layers: layers.into(),
                },
            );
        }

        let entry = self.cached(node)?;
        Ok((entry.canvas, entry.layers.clone()))
    }

    /// Nodes that must be (re)rendered for `target`, children first, each with its canvas.
    ///
    /// A node's canvas is the region its children sample, clipped to where the node has content
    /// and to [`CANVAS_REACH`]. Cached nodes whose canvas already covers that stop the walk.
    fn plan(&self, graph: &Graph, target: NodeId) -> FlipResult<Vec<(NodeId, Canvas)>> {
        let order = ancestors(graph, target)?;
        let viewport = self.viewport;
        let px = viewport.pixel_world_size();
        let reach = viewport.world_rect().scale_from_origin(CANVAS_REACH);

        let mut bounds: HashMap<NodeId, Option<Rect>> = HashMap::with_capacity(order.len());
        for &id in &order {
            let node = lookup(graph, id)?;
            let content = if node.is_root() {
                Some(Rect::new(-1.0, -1.0, 1.0, 1.0).inflate(px, px))
            } else {
                let mut content = node.base_parent.and_then(|p| bounds.get(&p).copied().flatten());
                let source = node
                    .transform_parent
                    .and_then(|p| bounds.get(&p).copied().flatten());
                if let Some(source) = source {
                    for copy in NodeTransform::new(node.params).copies() {
                        if copy.inverse.is_none() {
                            continue;
                        }
                        let moved = copy.forward.transform_rect_bbox(source).inflate(px, px);
                        content = Some(content.map_or(moved, |c| c.union(moved)));
                    }
                }
                content
            };
            bounds.insert(id, content);
        }

        let mut need: HashMap<NodeId, Rect> = HashMap::new();
        need.insert(target, viewport.world_rect());
        let mut plan = Vec::new();
        for &id in order.iter().rev() {
            let Some(required) = need.get(&id).copied() else {
                continue;
            };
            let canvas = match bounds.get(&id).copied().flatten() {
                Some(content) => {
                    viewport.canvas_covering(required.intersect(content).intersect(reach))
                }
                None => Canvas::EMPTY,
            };
            if self
                .cache
                .get(&id)
                .is_some_and(|entry| entry.canvas.contains(&canvas))
            {
                continue;
            }
            plan.push((id, canvas));
            if canvas.is_empty() {
                continue;
            }

            let area = canvas.world_rect(&viewport);
            let node = lookup(graph, id)?;
            if let Some(base) = node.base_parent {
                widen(&mut need, base, area);
            }
            if let Some(transform) = node.transform_parent {
                for copy in NodeTransform::new(node.params).copies() {
                    if let Some(inverse) = copy.inverse {
                        // One source pixel of slack for the bilinear taps.
                        let sampled = inverse.transform_rect_bbox(area).inflate(px, px);
                        widen(&mut need, transform, sampled);
                    }
                }
            }
        }
        Ok(plan)
    }

    fn cached(&self, id: NodeId) -> FlipResult<&CachedNode> {
        self.cache
            .get(&id)
            .ok_or_else(|| FlipError::evaluation(format!("node {id} has not been rendered")))
    }

    fn rasterize_root(&mut self, canvas: Canvas) -> FlipResult<Layer> {
        let id = self.allocator.allocate(Parity::Even)?;
        let viewport = self.viewport;
        let aa = viewport.pixel_world_size();
        let mut pixels = vec![LayerPixel::EMPTY; canvas.pixel_count()];
        map_rows(
            &mut pixels,
            canvas.width as usize,
            self.pool.as_deref(),
            |y, row| {
                for (x, px) in row.iter_mut().enumerate() {
                    let p = canvas.pixel_center(&viewport, x as u32, y as u32);
                    let alpha = coverage(p.to_vec2().hypot() - 1.0, aa);
                    if alpha > 0.0 {
                        *px = LayerPixel {
                            sample: PixelSample::new(0.0, alpha),
                            id,
                            depth: 0,
                        };
                    }
                }
                Ok(())
            },
        )?;
        Ok(Layer::new(canvas, 0, pixels))
    }

    fn build_composite(&mut self, node: &Node, canvas: Canvas) -> FlipResult<Vec<Layer>> {
        let mut layers = Vec::new();

        if let Some(base) = node.base_parent {
            let parent = self.cached(base)?.layers.clone();
            let map = self
                .allocator
                .reassign(parent.iter().flat_map(Layer::covered_ids), false)?;
            tracing::trace!(node = %node.id, regions = map.len(), "base identities reassigned");
            layers.extend(parent.iter().map(|layer| layer.reframed(canvas, &map)));
        }

        if let Some(transform) = node.transform_parent {
            let parent = self.cached(transform)?.layers.clone();
            let mut transformed = Vec::new();
            // Copy-major order: every parent layer of copy 0, then copy 1, ...
            for copy in NodeTransform::new(node.params).copies() {
                let Some(inverse) = copy.inverse else {
                    continue;
                };
                for layer in parent.iter() {
                    let out = self.resample(layer, inverse, canvas)?;
                    if !out.is_empty() {
                        transformed.push(out);
                    }
                }
            }
            let map = self
                .allocator
                .reassign(transformed.iter().flat_map(Layer::covered_ids), true)?;
            tracing::trace!(node = %node.id, regions = map.len(), "transformed identities reassigned");
            for layer in &mut transformed {
                layer.remap(&map);
            }
            layers.extend(transformed);
        }

        if layers.len() > self.max_layers_per_node {
            tracing::debug!(node = %node.id, layers = layers.len(), "flattening layers");
            layers = vec![flatten(&layers, canvas)];
        }
        Ok(layers)
    }

    /// Resample `source` onto `canvas` through `inverse` (destination world → source world),
    /// inverting color.
    ///
    /// Color and alpha use premultiplied bilinear filtering; identity and depth come from the
    /// neighbor contributing the most coverage.
    fn resample(&self, source: &Layer, inverse: Affine, canvas: Canvas) -> FlipResult<Layer> {
        let viewport = self.viewport;
        let from = source.canvas();
        let (w, h) = (i64::from(from.width), i64::from(from.height));
        let src = source.pixels();
        let mut pixels = vec![LayerPixel::EMPTY; canvas.pixel_count()];

        map_rows(
            &mut pixels,
            canvas.width as usize,
            self.pool.as_deref(),
            |y, row| {
                for (x, px) in row.iter_mut().enumerate() {
                    let dst = canvas.pixel_center(&viewport, x as u32, y as u32);
                    let r = viewport.world_to_raster(inverse * dst);
                    let (fx, fy) = (r.x - 0.5 - from.x as f64, r.y - 0.5 - from.y as f64);
                    let (x0, y0) = (fx.floor(), fy.floor());
                    let (tx, ty) = (fx - x0, fy - y0);
                    let (x0, y0) = (x0 as i64, y0 as i64);

                    let mut sum_a = 0.0f64;
                    let mut sum_ca = 0.0f64;
                    let mut owner: Option<(f64, LayerPixel)> = None;
                    for (dx, dy, weight) in [
                        (0, 0, (1.0 - tx) * (1.0 - ty)),
                        (1, 0, tx * (1.0 - ty)),
                        (0, 1, (1.0 - tx) * ty),
                        (1, 1, tx * ty),
                    ] {
                        let (sx, sy) = (x0 + dx, y0 + dy);
                        if sx < 0 || sy < 0 || sx >= w || sy >= h {
                            continue;
                        }
                        let p = src[(sy * w + sx) as usize];
                        let contribution = weight * f64::from(p.sample.alpha);
                        if contribution <= 0.0 {
                            continue;
                        }
                        sum_a += contribution;
                        sum_ca += contribution * f64::from(p.sample.color);
                        if owner.is_none_or(|(best, _)| contribution > best) {
                            owner = Some((contribution, p));
                        }
                    }

                    let Some((_, owner)) = owner else {
                        continue;
                    };
                    if sum_a < MIN_RESAMPLED_ALPHA {
                        continue;
                    }
                    *px = LayerPixel {
                        sample: PixelSample::new((sum_ca / sum_a) as f32, sum_a as f32).inverted(),
                        id: owner.id,
                        depth: owner.depth.saturating_add(1),
                    };
                }
                Ok(())
            },
        )?;
        Ok(Layer::new(canvas, source.depth().saturating_add(1), pixels))
    }
}

/// `target` and all its ancestors, parents before children, base edges before transform edges.
fn ancestors(graph: &Graph, target: NodeId) -> FlipResult<Vec<NodeId>> {
    let mut order = Vec::new();
    let mut seen: HashSet<NodeId> = HashSet::new();
    // (node, parents already scheduled)
    let mut stack: Vec<(NodeId, bool)> = vec![(target, false)];
    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            order.push(id);
            continue;
        }
        if !seen.insert(id) {
            continue;
        }
        let node = lookup(graph, id)?;
        stack.push((id, true));
        for parent in [node.transform_parent, node.base_parent]
            .into_iter()
            .flatten()
        {
            if !seen.contains(&parent) {
                stack.push((parent, false));
            }
        }
    }
    Ok(order)
}

fn lookup(graph: &Graph, id: NodeId) -> FlipResult<&Node> {
    graph
        .node(id)
        .ok_or_else(|| FlipError::evaluation(format!("parent {id} is not in the graph")))
}

fn widen(need: &mut HashMap<NodeId, Rect>, id: NodeId, rect: Rect) {
    need.entry(id)
        .and_modify(|r| *r = r.union(rect))
        .or_insert(rect);
}

impl RenderBackend for CompositionalEvaluator {
    fn render(&mut self, node: NodeId) -> FlipResult<FrameRGBA> {
        self.render_rgba(node)
    }

    fn cache_stats(&self) -> Option<CacheStats> {
        Some(CompositionalEvaluator::cache_stats(self))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/eval/compositional.rs"]
mod tests;
