//! Per-pixel backward tracer.
//!
//! Evaluates one node at one world position without call recursion: an explicit frame stack walks
//! the graph, each frame moving through `NeedBase → HaveBase → HaveBoth`. Stack depth and total
//! steps are capped, so every evaluation terminates within a fixed budget.
//!
//! The walk visits the same frames wherever it starts, so its cost per sample is a property of
//! the node alone. [`PointwiseEvaluator::sample_cost`] reports it before any pixel is evaluated.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::{
    eval::composite::{OverlapRule, accumulate_copy, average, composite_pixel},
    foundation::{
        core::{PixelSample, Point, Viewport},
        error::{FlipError, FlipResult},
        math::coverage,
    },
    graph::model::{Graph, NodeId},
    render::settings::PointwiseLimits,
    transform::pipeline::{CopyTransform, NodeTransform},
};

#[derive(Clone, Debug)]
struct CompiledNode {
    base: Option<usize>,
    transform: Option<usize>,
    copies: SmallVec<[CopyTransform; 8]>,
    scale: f64,
}

impl CompiledNode {
    fn is_root(&self) -> bool {
        self.base.is_none() && self.transform.is_none()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    NeedBase,
    HaveBase,
    HaveBoth,
}

#[derive(Clone, Copy, Debug)]
struct Frame {
    node: usize,
    pos: Point,
    footprint: f64,
    phase: Phase,
    copy: usize,
    base: PixelSample,
    acc: PixelSample,
}

enum Entry {
    Resolved(PixelSample),
    Open(Frame),
}

/// Exact work of evaluating one sample of a node.
///
/// The frame walk does not depend on the sample position, so every [`Trace`] of the node reports
/// these same numbers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct SampleCost {
    /// State-machine steps.
    pub steps: u64,
    /// Deepest frame stack.
    pub depth: usize,
}

impl SampleCost {
    /// `true` if an evaluation with this cost stays inside `limits`.
    pub fn fits(&self, limits: &PointwiseLimits) -> bool {
        self.steps <= u64::from(limits.max_steps) && self.depth <= limits.max_stack_depth
    }
}

/// Result of one traced evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trace {
    /// Evaluated sample.
    pub sample: PixelSample,
    /// State-machine steps spent.
    pub steps: u32,
    /// Deepest frame stack reached.
    pub peak_depth: usize,
}

/// Counters accumulated over a point-wise raster render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct PointwiseStats {
    /// Output pixels produced.
    pub pixels: u64,
    /// Sub-pixel evaluations.
    pub samples: u64,
    /// Total state-machine steps.
    pub steps: u64,
    /// Deepest frame stack seen in any evaluation.
    pub peak_stack_depth: usize,
    /// Pixels painted with the diagnostic marker after running out of budget.
    pub exhausted_pixels: u64,
}

impl PointwiseStats {
    /// Fold `other` into `self`.
    pub fn merge(&mut self, other: &Self) {
        self.pixels += other.pixels;
        self.samples += other.samples;
        self.steps += other.steps;
        self.peak_stack_depth = self.peak_stack_depth.max(other.peak_stack_depth);
        self.exhausted_pixels += other.exhausted_pixels;
    }
}

/// Non-recursive evaluator over a graph compiled into a dense arena.
///
/// Holds no mutable state, so one instance can be shared by every worker of a parallel render.
#[derive(Clone, Debug)]
pub struct PointwiseEvaluator {
    nodes: Vec<CompiledNode>,
    /// Cost of each node when opened as a frame; root entries are zero (resolved inline).
    costs: Vec<SampleCost>,
    index: HashMap<NodeId, usize>,
    overlap: OverlapRule,
    limits: PointwiseLimits,
}

impl PointwiseEvaluator {
    /// Compile `graph` with the default overlap rule and limits.
    pub fn new(graph: &Graph) -> Self {
        let index: HashMap<NodeId, usize> = graph
            .nodes()
            .enumerate()
            .map(|(i, node)| (node.id, i))
            .collect();
        let nodes: Vec<CompiledNode> = graph
            .nodes()
            .map(|node| {
                let transform = NodeTransform::new(node.params);
                CompiledNode {
                    base: node.base_parent.and_then(|p| index.get(&p).copied()),
                    transform: node.transform_parent.and_then(|p| index.get(&p).copied()),
                    copies: transform.copies(),
                    scale: node.params.scale,
                }
            })
            .collect();
        let costs = frame_costs(&nodes);
        Self {
            nodes,
            costs,
            index,
            overlap: OverlapRule::default(),
            limits: PointwiseLimits::default(),
        }
    }

    /// Use `rule` for overlapping radial copies.
    pub fn with_overlap(mut self, rule: OverlapRule) -> Self {
        self.overlap = rule;
        self
    }

    /// Replace the stack/step budget.
    pub fn with_limits(mut self, limits: PointwiseLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Overlap rule in use.
    pub fn overlap(&self) -> OverlapRule {
        self.overlap
    }

    /// Budget in use.
    pub fn limits(&self) -> PointwiseLimits {
        self.limits
    }

    /// `true` if `node` was part of the compiled graph.
    pub fn contains(&self, node: NodeId) -> bool {
        self.index.contains_key(&node)
    }

    /// Steps and stack depth one sample of `node` takes.
    pub fn sample_cost(&self, node: NodeId) -> FlipResult<SampleCost> {
        let idx = self.lookup(node)?;
        if self.nodes[idx].is_root() {
            return Ok(SampleCost { steps: 1, depth: 0 });
        }
        Ok(self.costs[idx])
    }

    /// [`Self::sample_cost`], rejected with [`FlipError::Exhausted`] when it does not fit the limits.
    pub fn ensure_supported(&self, node: NodeId) -> FlipResult<SampleCost> {
        let cost = self.sample_cost(node)?;
        if !cost.fits(&self.limits) {
            return Err(FlipError::Exhausted {
                node,
                steps: u32::try_from(cost.steps).unwrap_or(u32::MAX),
                depth: cost.depth,
            });
        }
        Ok(cost)
    }

    /// Sample of `node` at world position `pos`; `footprint` is the antialiasing width there.
    pub fn evaluate(&self, node: NodeId, pos: Point, footprint: f64) -> FlipResult<PixelSample> {
        self.trace(node, pos, footprint).map(|t| t.sample)
    }

    /// Like [`Self::evaluate`], also reporting steps and stack depth.
    pub fn trace(&self, node: NodeId, pos: Point, footprint: f64) -> FlipResult<Trace> {
        let start = self.lookup(node)?;
        let mut stack: SmallVec<[Frame; 16]> = SmallVec::new();
        match self.open(start, pos, footprint) {
            Entry::Resolved(sample) => {
                return Ok(Trace {
                    sample,
                    steps: 1,
                    peak_depth: 0,
                });
            }
            Entry::Open(frame) => stack.push(frame),
        }

        let mut delivered: Option<PixelSample> = None;
        let mut steps: u32 = 0;
        let mut peak = stack.len();
        loop {
            steps += 1;
            if steps > self.limits.max_steps {
                return Err(FlipError::Exhausted {
                    node,
                    steps,
                    depth: stack.len(),
                });
            }

            let Some(frame) = stack.last_mut() else {
                return Err(FlipError::evaluation("pointwise frame stack underflow"));
            };
            let compiled = &self.nodes[frame.node];
            let mut child: Option<(usize, Point, f64)> = None;

            match frame.phase {
                Phase::NeedBase => match (delivered.take(), compiled.base) {
                    (Some(sample), _) => {
                        frame.base = sample;
                        frame.phase = Phase::HaveBase;
                    }
                    (None, None) => frame.phase = Phase::HaveBase,
                    (None, Some(base)) => child = Some((base, frame.pos, frame.footprint)),
                },
                Phase::HaveBase => {
                    if let Some(sample) = delivered.take() {
                        frame.acc = accumulate_copy(frame.acc, sample, self.overlap);
                        frame.copy += 1;
                    } else {
                        let next = compiled
                            .transform
                            .and_then(|t| compiled.copies.get(frame.copy).map(|c| (t, c)));
                        match next {
                            None => frame.phase = Phase::HaveBoth,
                            // Collapsed hop: this copy covers nothing.
                            Some((_, CopyTransform { inverse: None, .. })) => frame.copy += 1,
                            Some((t, CopyTransform {
                                inverse: Some(inverse),
                                ..
                            })) => {
                                let footprint = frame.footprint / compiled.scale;
                                child = Some((t, *inverse * frame.pos, footprint));
                            }
                        }
                    }
                }
                Phase::HaveBoth => {
                    let out = composite_pixel(frame.base, frame.acc);
                    stack.pop();
                    if stack.is_empty() {
                        return Ok(Trace {
                            sample: out,
                            steps,
                            peak_depth: peak,
                        });
                    }
                    delivered = Some(out);
                }
            }

            if let Some((idx, pos, footprint)) = child {
                match self.open(idx, pos, footprint) {
                    Entry::Resolved(sample) => delivered = Some(sample),
                    Entry::Open(frame) => {
                        if stack.len() >= self.limits.max_stack_depth {
                            return Err(FlipError::Exhausted {
                                node,
                                steps,
                                depth: stack.len() + 1,
                            });
                        }
                        stack.push(frame);
                        peak = peak.max(stack.len());
                    }
                }
            }
        }
    }

    /// Average of an N×N grid of evaluations over pixel `(x, y)` of `viewport`.
    pub fn sample_pixel(
        &self,
        node: NodeId,
        viewport: &Viewport,
        x: u32,
        y: u32,
        supersample: u32,
    ) -> FlipResult<Trace> {
        let n = supersample.max(1);
        let footprint = viewport.pixel_world_size() / f64::from(n);
        let mut samples: SmallVec<[PixelSample; 16]> = SmallVec::new();
        let mut steps: u32 = 0;
        let mut peak = 0usize;
        for j in 0..n {
            for i in 0..n {
                let pos = viewport.raster_to_world(
                    f64::from(x) + (f64::from(i) + 0.5) / f64::from(n),
                    f64::from(y) + (f64::from(j) + 0.5) / f64::from(n),
                );
                let t = self.trace(node, pos, footprint)?;
                steps = steps.saturating_add(t.steps);
                peak = peak.max(t.peak_depth);
                samples.push(t.sample);
            }
        }
        Ok(Trace {
            sample: average(samples),
            steps,
            peak_depth: peak,
        })
    }

    fn lookup(&self, node: NodeId) -> FlipResult<usize> {
        self.index
            .get(&node)
            .copied()
            .ok_or_else(|| FlipError::evaluation(format!("node {node} is not in the graph")))
    }

    /// Root frames resolve on the spot; everything else gets a fresh frame.
    fn open(&self, idx: usize, pos: Point, footprint: f64) -> Entry {
        if self.nodes[idx].is_root() {
            return Entry::Resolved(root_sample(pos, footprint));
        }
        Entry::Open(Frame {
            node: idx,
            pos,
            footprint,
            phase: Phase::NeedBase,
            copy: 0,
            base: PixelSample::TRANSPARENT,
            acc: PixelSample::TRANSPARENT,
        })
    }
}

/// Per-node frame cost, computed parents first with an explicit stack.
///
/// Mirrors the loop in [`PointwiseEvaluator::trace`]: a root parent resolves in the step that
/// opens it and costs one more step to take; any other parent adds its own frame's cost.
fn frame_costs(nodes: &[CompiledNode]) -> Vec<SampleCost> {
    let mut costs: Vec<Option<SampleCost>> = vec![None; nodes.len()];
    for start in 0..nodes.len() {
        let mut stack = vec![start];
        while let Some(&idx) = stack.last() {
            if costs[idx].is_some() {
                stack.pop();
                continue;
            }
            let node = &nodes[idx];
            let pending: SmallVec<[usize; 2]> = node
                .base
                .into_iter()
                .chain(node.transform)
                .filter(|&p| costs[p].is_none())
                .collect();
            if !pending.is_empty() {
                stack.extend(pending);
                continue;
            }
            costs[idx] = Some(if node.is_root() {
                SampleCost::default()
            } else {
                frame_cost(node, &costs)
            });
            stack.pop();
        }
    }
    costs.into_iter().map(Option::unwrap_or_default).collect()
}

fn frame_cost(node: &CompiledNode, costs: &[Option<SampleCost>]) -> SampleCost {
    let parent = |idx: usize| costs[idx].unwrap_or_default();
    let mut steps: u64 = 0;
    let mut depth = 0usize;

    steps += match node.base {
        None => 1,
        Some(base) => {
            depth = depth.max(parent(base).depth);
            2u64.saturating_add(parent(base).steps)
        }
    };
    if let Some(transform) = node.transform {
        let t = parent(transform);
        for copy in &node.copies {
            steps = steps.saturating_add(if copy.inverse.is_some() {
                depth = depth.max(t.depth);
                2u64.saturating_add(t.steps)
            } else {
                1
            });
        }
    }
    // Leaving the copy loop, then compositing.
    steps = steps.saturating_add(2);
    SampleCost {
        steps,
        depth: depth + 1,
    }
}

/// Black unit disc at the origin, antialiased over `footprint`.
fn root_sample(pos: Point, footprint: f64) -> PixelSample {
    PixelSample::new(0.0, coverage(pos.to_vec2().hypot() - 1.0, footprint))
}

#[cfg(test)]
#[path = "../../tests/unit/eval/pointwise.rs"]
mod tests;
