use super::*;
use crate::graph::model::{Node, NodeParams};

fn params(scale: f64, radial_radius: f64, radial_count: u32, rotation: f64) -> NodeParams {
    NodeParams {
        scale,
        radial_radius,
        radial_count,
        rotation,
    }
}

fn graph(children: &[(u32, NodeParams)]) -> Graph {
    let mut nodes = vec![Node::root(NodeId(0))];
    for (i, (parent, p)) in children.iter().enumerate() {
        let parent = NodeId(*parent);
        nodes.push(Node::composite(NodeId(i as u32 + 1), parent, parent, *p));
    }
    Graph::from_nodes(nodes).unwrap()
}

/// `len` nodes, each holding only a transform parent: one frame per level, no branching.
fn transform_chain(len: u32) -> Graph {
    let mut nodes = vec![Node::root(NodeId(0))];
    for i in 1..=len {
        nodes.push(Node {
            id: NodeId(i),
            base_parent: None,
            transform_parent: Some(NodeId(i - 1)),
            params: params(1.0, 0.0, 0, 0.0),
            comment: None,
        });
    }
    Graph::from_nodes(nodes).unwrap()
}

fn eval_at(e: &PointwiseEvaluator, node: u32, x: f64, y: f64) -> PixelSample {
    e.evaluate(NodeId(node), Point::new(x, y), 0.01).unwrap()
}

fn assert_color(sample: PixelSample, color: f32) {
    assert!((sample.alpha - 1.0).abs() < 1e-6, "alpha {}", sample.alpha);
    assert!((sample.color - color).abs() < 1e-6, "color {}", sample.color);
}

#[test]
fn root_is_an_antialiased_disc() {
    let e = PointwiseEvaluator::new(&graph(&[]));
    assert_color(eval_at(&e, 0, 0.0, 0.0), 0.0);
    assert!(eval_at(&e, 0, 2.0, 0.0).is_transparent());
    let rim = e.evaluate(NodeId(0), Point::new(1.0, 0.0), 0.1).unwrap();
    assert!((rim.alpha - 0.5).abs() < 1e-6);
}

#[test]
fn scale_and_rotate_scenario() {
    let e = PointwiseEvaluator::new(&graph(&[(0, params(0.5, 0.0, 0, 45.0))]));
    assert_color(eval_at(&e, 1, 0.0, 0.0), 1.0);
    assert_color(eval_at(&e, 1, 0.3, 0.3), 1.0);
    assert_color(eval_at(&e, 1, 0.75, 0.0), 0.0);
    assert!(eval_at(&e, 1, 1.1, 0.0).is_transparent());
}

#[test]
fn radial_repeat_scenario() {
    let e = PointwiseEvaluator::new(&graph(&[(0, params(0.3, 0.6, 4, 0.0))]));
    for (x, y) in [(0.0, -0.6), (0.6, 0.0), (0.0, 0.6), (-0.6, 0.0)] {
        assert_color(eval_at(&e, 1, x, y), 1.0);
    }
    assert_color(eval_at(&e, 1, 0.0, 0.0), 0.0);
    assert_color(eval_at(&e, 1, 0.45, -0.45), 0.0);
}

#[test]
fn two_hops_invert_twice() {
    let e = PointwiseEvaluator::new(&graph(&[
        (0, params(0.5, 0.0, 0, 0.0)),
        (1, params(0.5, 0.0, 0, 0.0)),
    ]));
    assert_color(eval_at(&e, 2, 0.0, 0.0), 0.0);
    assert_color(eval_at(&e, 2, 0.375, 0.0), 1.0);
    assert_color(eval_at(&e, 2, 0.75, 0.0), 0.0);
    let t = e.trace(NodeId(2), Point::ORIGIN, 0.01).unwrap();
    assert_eq!(t.peak_depth, 2);
    assert!(t.steps > 0);
}

#[test]
fn overlap_rules_agree_on_opaque_interiors() {
    let g = graph(&[(0, params(0.5, 0.1, 2, 0.0))]);
    let draw = PointwiseEvaluator::new(&g);
    let max = PointwiseEvaluator::new(&g).with_overlap(OverlapRule::MaxAlpha);
    assert_eq!(max.overlap(), OverlapRule::MaxAlpha);
    for (x, y) in [(0.0, 0.0), (0.0, -0.3), (0.05, 0.2), (0.8, 0.0)] {
        assert_eq!(eval_at(&draw, 1, x, y), eval_at(&max, 1, x, y));
    }
}

#[test]
fn single_parent_nodes_evaluate() {
    let e = PointwiseEvaluator::new(&transform_chain(1));
    // Transparent base: only the inverted copy remains.
    assert_color(eval_at(&e, 1, 0.0, 0.0), 1.0);
    assert!(eval_at(&e, 1, 1.5, 0.0).is_transparent());
}

#[test]
fn deep_stack_is_exhausted() {
    let e = PointwiseEvaluator::new(&transform_chain(60)).with_limits(PointwiseLimits {
        max_stack_depth: 48,
        max_steps: u32::MAX,
    });
    match e.evaluate(NodeId(60), Point::ORIGIN, 0.01) {
        Err(FlipError::Exhausted { node, depth, .. }) => {
            assert_eq!(node, NodeId(60));
            assert_eq!(depth, 49);
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
    // The same chain fits once the cap allows it.
    let roomy = e.clone().with_limits(PointwiseLimits {
        max_stack_depth: 64,
        max_steps: u32::MAX,
    });
    assert_color(eval_at(&roomy, 60, 0.0, 0.0), 0.0);
}

#[test]
fn step_budget_is_exhausted() {
    let children: Vec<_> = (0..12).map(|i| (i, params(0.9, 0.0, 0, 0.0))).collect();
    let e = PointwiseEvaluator::new(&graph(&children)).with_limits(PointwiseLimits {
        max_stack_depth: 48,
        max_steps: 100,
    });
    assert!(matches!(
        e.evaluate(NodeId(12), Point::ORIGIN, 0.01),
        Err(FlipError::Exhausted { steps: 101, .. })
    ));
}

#[test]
fn zero_scale_copy_contributes_nothing() {
    let mut g = graph(&[(0, params(0.5, 0.0, 0, 0.0))]);
    g.set_params(NodeId(1), params(0.0, 0.0, 0, 0.0)).unwrap();
    let e = PointwiseEvaluator::new(&g);
    assert_color(eval_at(&e, 1, 0.0, 0.0), 0.0);
}

#[test]
fn unknown_node_is_an_evaluation_error() {
    let e = PointwiseEvaluator::new(&graph(&[]));
    assert!(!e.contains(NodeId(3)));
    assert!(matches!(
        e.evaluate(NodeId(3), Point::ORIGIN, 0.01),
        Err(FlipError::Evaluation(_))
    ));
}

#[test]
fn supersampled_pixel_averages_the_grid() {
    let e = PointwiseEvaluator::new(&graph(&[]));
    let viewport = Viewport {
        width: 8,
        height: 8,
        extent: 1.0,
    };
    let inside = e.sample_pixel(NodeId(0), &viewport, 4, 4, 3).unwrap();
    assert_color(inside.sample, 0.0);
    assert_eq!(inside.steps, 9);
    let corner = e.sample_pixel(NodeId(0), &viewport, 0, 0, 3).unwrap();
    assert!(corner.sample.is_transparent());
    // Pixel straddling the rim gets partial coverage.
    let rim = e.sample_pixel(NodeId(0), &viewport, 7, 4, 4).unwrap();
    assert!(rim.sample.alpha > 0.0 && rim.sample.alpha < 1.0);
}

#[test]
fn stats_merge_sums_and_keeps_peak() {
    let mut a = PointwiseStats {
        pixels: 1,
        samples: 4,
        steps: 10,
        peak_stack_depth: 2,
        exhausted_pixels: 0,
    };
    a.merge(&PointwiseStats {
        pixels: 2,
        samples: 8,
        steps: 5,
        peak_stack_depth: 1,
        exhausted_pixels: 1,
    });
    assert_eq!(
        a,
        PointwiseStats {
            pixels: 3,
            samples: 12,
            steps: 15,
            peak_stack_depth: 2,
            exhausted_pixels: 1,
        }
    );
}

/// `len` nodes, each taking its predecessor as both parents.
fn diamond_chain(len: u32) -> Graph {
    let children: Vec<_> = (0..len).map(|i| (i, params(0.9, 0.0, 0, 0.0))).collect();
    graph(&children)
}

#[test]
fn sample_cost_matches_every_trace() {
    let mut zero = graph(&[(0, params(0.5, 0.3, 3, 0.0)), (1, params(0.5, 0.0, 0, 0.0))]);
    zero.set_params(NodeId(2), params(0.0, 0.0, 0, 0.0)).unwrap();
    let cases = [
        (graph(&[]), 0),
        (graph(&[(0, params(0.5, 0.0, 0, 45.0))]), 1),
        (graph(&[(0, params(0.3, 0.6, 4, 0.0)), (1, params(0.5, 0.2, 3, 20.0))]), 2),
        (transform_chain(5), 5),
        (diamond_chain(6), 6),
        (zero, 2),
    ];
    for (g, node) in cases {
        let e = PointwiseEvaluator::new(&g);
        let cost = e.sample_cost(NodeId(node)).unwrap();
        for (x, y) in [(0.0, 0.0), (0.4, -0.2), (1.5, 1.5)] {
            let t = e.trace(NodeId(node), Point::new(x, y), 0.01).unwrap();
            assert_eq!(u64::from(t.steps), cost.steps, "node {node} at ({x},{y})");
            assert_eq!(t.peak_depth, cost.depth, "node {node} at ({x},{y})");
        }
    }
}

#[test]
fn doubling_chain_cost_grows_exponentially() {
    let e = PointwiseEvaluator::new(&diamond_chain(20));
    for n in [1u32, 2, 10, 17, 18, 20] {
        let cost = e.sample_cost(NodeId(n)).unwrap();
        assert_eq!(cost.steps, 6 * (1u64 << n) - 6, "node {n}");
        assert_eq!(cost.depth, n as usize);
    }
    assert_eq!(
        e.sample_cost(NodeId(0)).unwrap(),
        SampleCost { steps: 1, depth: 0 }
    );
}

#[test]
fn default_limits_support_seventeen_doubling_levels() {
    let e = PointwiseEvaluator::new(&diamond_chain(18));
    assert!(e.ensure_supported(NodeId(17)).is_ok());
    match e.ensure_supported(NodeId(18)) {
        Err(FlipError::Exhausted { node, steps, depth }) => {
            assert_eq!(node, NodeId(18));
            assert_eq!(steps, 1_572_858);
            assert_eq!(depth, 18);
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }

    let chain = PointwiseEvaluator::new(&transform_chain(49));
    assert!(chain.ensure_supported(NodeId(48)).is_ok());
    assert!(chain.ensure_supported(NodeId(49)).is_err());
}
