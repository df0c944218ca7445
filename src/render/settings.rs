use crate::{
    eval::{coloring::ColorModes, composite::OverlapRule},
    foundation::{
        core::Viewport,
        error::{FlipError, FlipResult},
    },
    palette::color::Color,
};

/// Largest accepted supersampling grid edge.
pub const MAX_SUPERSAMPLE: u32 = 16;

/// Stack and step caps for the point-wise evaluator.
///
/// A node is supported by the point-wise form when one sample of it fits both caps, as reported by
/// [`PointwiseEvaluator::sample_cost`]. The cost is exact and position independent, so a supported
/// node never runs out of budget and an unsupported one is rejected before any pixel work.
///
/// With the defaults that admits a transform-only chain of 48 nodes, or a chain of 17 nodes that
/// each take their predecessor as both parents (work doubles per level: `6 * 2^n - 6` steps). The
/// compositional form has no such limit.
///
/// [`PointwiseEvaluator::sample_cost`]: crate::eval::pointwise::PointwiseEvaluator::sample_cost
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PointwiseLimits {
    /// Maximum number of simultaneously open frames.
    pub max_stack_depth: usize,
    /// Maximum state-machine steps for one sample.
    pub max_steps: u32,
}

impl Default for PointwiseLimits {
    fn default() -> Self {
        Self {
            max_stack_depth: 48,
            max_steps: 1 << 20,
        }
    }
}

/// What a raster render does with a pixel whose evaluation ran out of budget.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnExhausted {
    /// Abort the render with [`FlipError::Exhausted`].
    #[default]
    Fail,
    /// Paint the pixel magenta and count it in the stats.
    Diagnostic,
}

/// Pixel-loop parallelism.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderThreading {
    /// Run row loops on a rayon pool.
    pub parallel: bool,
    /// Worker count; `None` uses rayon's default.
    pub threads: Option<usize>,
}

/// Everything a render needs besides the graph.
///
/// Deserializes from a partial JSON object; absent fields take their defaults.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Raster width in pixels.
    pub width: u32,
    /// Raster height in pixels.
    pub height: u32,
    /// Half-size of the shorter raster side in world units.
    pub extent: f64,
    /// Edge of the point-wise N×N sub-sample grid.
    pub supersample: u32,
    /// Radial-copy overlap rule (point-wise form).
    pub overlap: OverlapRule,
    /// Point-wise budget.
    pub limits: PointwiseLimits,
    /// Point-wise exhaustion policy.
    pub on_exhausted: OnExhausted,
    /// Layer count above which a node's layers are flattened into one.
    pub max_layers_per_node: usize,
    /// Pixel-loop parallelism.
    pub threading: RenderThreading,
    /// Seed color of the depth palette.
    pub palette_seed: Color,
    /// Final coloring pass configuration.
    pub color_modes: ColorModes,
}

impl Default for RenderSettings {
    fn default() -> Self {
        let viewport = Viewport::default();
        Self {
            width: viewport.width,
            height: viewport.height,
            extent: viewport.extent,
            supersample: 2,
            overlap: OverlapRule::default(),
            limits: PointwiseLimits::default(),
            on_exhausted: OnExhausted::default(),
            max_layers_per_node: 64,
            threading: RenderThreading::default(),
            palette_seed: crate::palette::palette::ColorPalette::default().base_color(),
            color_modes: ColorModes::default(),
        }
    }
}

impl RenderSettings {
    /// Parse settings from JSON text.
    pub fn from_json_str(s: &str) -> FlipResult<Self> {
        let settings: Self =
            serde_json::from_str(s).map_err(|e| FlipError::serde(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Raster mapping described by these settings.
    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.width,
            height: self.height,
            extent: self.extent,
        }
    }

    /// Reject settings no renderer can honor.
    pub fn validate(&self) -> FlipResult<()> {
        self.viewport().validate()?;
        if !(1..=MAX_SUPERSAMPLE).contains(&self.supersample) {
            return Err(FlipError::validation(format!(
                "supersample must be in 1..={MAX_SUPERSAMPLE}, got {}",
                self.supersample
            )));
        }
        if self.limits.max_stack_depth == 0 || self.limits.max_steps == 0 {
            return Err(FlipError::validation(
                "pointwise limits must allow at least one frame and one step",
            ));
        }
        if self.max_layers_per_node == 0 {
            return Err(FlipError::validation("max_layers_per_node must be >= 1"));
        }
        if self.threading.threads == Some(0) {
            return Err(FlipError::validation(
                "render threading 'threads' must be >= 1 when set",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/settings.rs"]
mod tests;
