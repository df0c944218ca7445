//! flipgraph renders images from a DAG of inverting transform nodes.
//!
//! Every node layers a transformed, color-inverted copy of its transform parent over its base
//! parent; the single parentless root is a black unit disc. Two equivalent evaluators are
//! provided:
//!
//! - [`CompositionalEvaluator`]: renders whole layers per node, memoized by node id, tracking
//!   region identities and depth so a final coloring pass can apply a [`ColorPalette`]
//! - [`PointwiseEvaluator`]: traces one pixel backward through inverse transforms with an explicit,
//!   bounded frame stack
//!
//! Load a [`Graph`] from its JSON document, then render with [`render_compositional`],
//! [`render_pointwise`] or a [`RenderBackend`] from [`create_backend`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod eval;
pub(crate) mod graph;
pub(crate) mod identity;
pub(crate) mod palette;
pub(crate) mod render;
pub(crate) mod transform;

pub use crate::foundation::core::{
    Affine, Canvas, PixelSample, Point, Rect, Rgba8Premul, Vec2, Viewport,
};
pub use crate::foundation::error::{FlipError, FlipResult, GraphError};

pub use crate::eval::coloring::{ColorMode, ColorModes, colorize, sequential_indices};
pub use crate::eval::composite::{OverlapRule, accumulate_copy, composite_pixel, over};
pub use crate::eval::compositional::{
    CANVAS_REACH, CompositionalEvaluator, DEFAULT_MAX_LAYERS_PER_NODE,
};
pub use crate::eval::layer::{CacheStats, CompositedFrame, Layer, LayerPixel};
pub use crate::eval::pointwise::{PointwiseEvaluator, PointwiseStats, SampleCost, Trace};
pub use crate::graph::document::{GraphDocument, NodeDef};
pub use crate::graph::model::{Graph, Node, NodeId, NodeParams};
pub use crate::identity::allocator::{IdentityAllocator, Parity, Reassignment, RegionId};
pub use crate::palette::color::{Color, Hsl};
pub use crate::palette::palette::{ColorPalette, DESATURATE_FACTOR, PALETTE_LEN};
pub use crate::render::backend::{BackendKind, FrameRGBA, RenderBackend, create_backend};
pub use crate::render::pipeline::{
    DIAGNOSTIC_COLOR, PointwiseBackend, render_compositional, render_pointwise,
};
pub use crate::render::settings::{
    MAX_SUPERSAMPLE, OnExhausted, PointwiseLimits, RenderSettings, RenderThreading,
};
pub use crate::transform::pipeline::{CopyTransform, NodeTransform};
