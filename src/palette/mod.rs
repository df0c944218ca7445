//! Seed-derived palettes for the final coloring pass.

pub(crate) mod color;
pub(crate) mod palette;
