use std::sync::Arc;

use crate::{
    eval::{compositional::CompositionalEvaluator, layer::CacheStats, pointwise::PointwiseStats},
    foundation::error::FlipResult,
    graph::model::{Graph, NodeId},
    render::settings::RenderSettings,
};

/// A rendered frame as RGBA8 pixels.
///
/// Frames are **premultiplied alpha**. The `premultiplied` flag is included to make this explicit
/// at API boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// RGBA8 of pixel `(x, y)`, if inside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Straight-alpha copy of the pixel data, as image encoders expect.
    pub fn to_straight_rgba(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        if !self.premultiplied {
            return out;
        }
        for px in out.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            if a == 0 {
                px[..3].fill(0);
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        out
    }
}

/// A renderer that turns one graph node into a [`FrameRGBA`].
pub trait RenderBackend {
    /// Render `node` of the bound graph.
    fn render(&mut self, node: NodeId) -> FlipResult<FrameRGBA>;

    /// Cache occupancy, for backends that cache.
    fn cache_stats(&self) -> Option<CacheStats> {
        None
    }

    /// Counters from the most recent point-wise render, for backends that trace pixels.
    fn pointwise_stats(&self) -> Option<PointwiseStats> {
        None
    }
}

/// Available evaluator kinds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Memoized layer renderer with identity tracking and palette coloring.
    #[default]
    Compositional,
    /// Per-pixel backward tracer (grayscale output).
    Pointwise,
}

/// Create a rendering backend bound to `graph`.
pub fn create_backend(
    kind: BackendKind,
    graph: Arc<Graph>,
    settings: &RenderSettings,
) -> FlipResult<Box<dyn RenderBackend>> {
    settings.validate()?;
    match kind {
        BackendKind::Compositional => {
            let mut eval = CompositionalEvaluator::from_settings(settings)?;
            eval.set_graph(graph);
            Ok(Box::new(eval))
        }
        BackendKind::Pointwise => Ok(Box::new(crate::render::pipeline::PointwiseBackend::new(
            graph, settings,
        )?)),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/backend.rs"]
mod tests;
