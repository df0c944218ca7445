use std::sync::Arc;

use crate::{
    eval::{
        compositional::CompositionalEvaluator,
        pointwise::{PointwiseEvaluator, PointwiseStats},
    },
    foundation::{
        core::Rgba8Premul,
        error::{FlipError, FlipResult},
    },
    graph::model::{Graph, NodeId},
    palette::color::Color,
    render::{
        backend::{FrameRGBA, RenderBackend},
        raster::{build_thread_pool, map_rows},
        settings::{OnExhausted, RenderSettings},
    },
};

/// Marker painted over pixels that ran out of point-wise budget under [`OnExhausted::Diagnostic`].
pub const DIAGNOSTIC_COLOR: Color = Color::rgb(1.0, 0.0, 1.0);

/// Render one node with the compositional evaluator and the configured coloring pass.
#[tracing::instrument(skip(graph, settings), fields(width = settings.width, height = settings.height))]
pub fn render_compositional(
    graph: Arc<Graph>,
    node: NodeId,
    settings: &RenderSettings,
) -> FlipResult<FrameRGBA> {
    let mut eval = CompositionalEvaluator::from_settings(settings)?;
    eval.set_graph(graph);
    eval.render_rgba(node)
}

/// Render one node with the point-wise evaluator as grayscale RGBA.
#[tracing::instrument(skip(graph, settings), fields(width = settings.width, height = settings.height))]
pub fn render_pointwise(
    graph: &Graph,
    node: NodeId,
    settings: &RenderSettings,
) -> FlipResult<(FrameRGBA, PointwiseStats)> {
    settings.validate()?;
    let pool = thread_pool(settings)?;
    let eval = PointwiseEvaluator::new(graph)
        .with_overlap(settings.overlap)
        .with_limits(settings.limits);
    raster_pointwise(&eval, node, settings, pool.as_ref())
}

fn thread_pool(settings: &RenderSettings) -> FlipResult<Option<rayon::ThreadPool>> {
    settings
        .threading
        .parallel
        .then(|| build_thread_pool(settings.threading.threads))
        .transpose()
}

fn raster_pointwise(
    eval: &PointwiseEvaluator,
    node: NodeId,
    settings: &RenderSettings,
    pool: Option<&rayon::ThreadPool>,
) -> FlipResult<(FrameRGBA, PointwiseStats)> {
    if !eval.contains(node) {
        return Err(FlipError::evaluation(format!(
            "node {node} is not in the graph"
        )));
    }
    let cost = match settings.on_exhausted {
        OnExhausted::Fail => eval.ensure_supported(node)?,
        OnExhausted::Diagnostic => eval.sample_cost(node)?,
    };
    tracing::debug!(%node, steps = cost.steps, depth = cost.depth, "pointwise sample cost");
    let viewport = settings.viewport();
    let grid = u64::from(settings.supersample) * u64::from(settings.supersample);
    let mut pixels = vec![Rgba8Premul::transparent(); viewport.pixel_count()];

    let rows = map_rows(
        &mut pixels,
        viewport.width as usize,
        pool,
        |y, row| {
            let mut stats = PointwiseStats::default();
            for (x, px) in row.iter_mut().enumerate() {
                stats.pixels += 1;
                match eval.sample_pixel(node, &viewport, x as u32, y as u32, settings.supersample) {
                    Ok(trace) => {
                        stats.samples += grid;
                        stats.steps += u64::from(trace.steps);
                        stats.peak_stack_depth = stats.peak_stack_depth.max(trace.peak_depth);
                        *px = Color::gray(f64::from(trace.sample.color))
                            .to_rgba8_premul(trace.sample.alpha);
                    }
                    Err(FlipError::Exhausted { .. })
                        if settings.on_exhausted == OnExhausted::Diagnostic =>
                    {
                        stats.exhausted_pixels += 1;
                        *px = DIAGNOSTIC_COLOR.to_rgba8_premul(1.0);
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(stats)
        },
    )?;

    let stats = rows.iter().fold(PointwiseStats::default(), |mut acc, row| {
        acc.merge(row);
        acc
    });
    if stats.exhausted_pixels > 0 {
        tracing::warn!(
            pixels = stats.exhausted_pixels,
            "pointwise budget exhausted; diagnostic pixels painted"
        );
    }
    tracing::debug!(steps = stats.steps, peak = stats.peak_stack_depth, "pointwise raster done");

    let frame = FrameRGBA {
        width: viewport.width,
        height: viewport.height,
        data: pixels.iter().flat_map(|p| p.to_array()).collect(),
        premultiplied: true,
    };
    Ok((frame, stats))
}

/// [`RenderBackend`] over a compiled [`PointwiseEvaluator`].
pub struct PointwiseBackend {
    eval: PointwiseEvaluator,
    settings: RenderSettings,
    pool: Option<rayon::ThreadPool>,
    last_stats: Option<PointwiseStats>,
}

impl PointwiseBackend {
    /// Compile `graph` for repeated point-wise renders with `settings`.
    pub fn new(graph: Arc<Graph>, settings: &RenderSettings) -> FlipResult<Self> {
        settings.validate()?;
        Ok(Self {
            eval: PointwiseEvaluator::new(&graph)
                .with_overlap(settings.overlap)
                .with_limits(settings.limits),
            settings: settings.clone(),
            pool: thread_pool(settings)?,
            last_stats: None,
        })
    }
}

impl RenderBackend for PointwiseBackend {
    fn render(&mut self, node: NodeId) -> FlipResult<FrameRGBA> {
        let (frame, stats) = raster_pointwise(&self.eval, node, &self.settings, self.pool.as_ref())?;
        self.last_stats = Some(stats);
        Ok(frame)
    }

    fn pointwise_stats(&self) -> Option<PointwiseStats> {
        self.last_stats
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
