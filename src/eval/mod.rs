//! The two evaluator forms and their shared compositing and coloring rules.

pub(crate) mod coloring;
pub(crate) mod composite;
pub(crate) mod compositional;
pub(crate) mod layer;
pub(crate) mod pointwise;
