//! Per-node geometric transform pipeline.

pub(crate) mod pipeline;
