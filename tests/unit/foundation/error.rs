use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        FlipError::evaluation("x")
            .to_string()
            .contains("evaluation error:")
    );
    assert!(
        FlipError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        FlipError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
    assert!(
        FlipError::from(GraphError::Schema("missing nodes".to_string()))
            .to_string()
            .contains("schema error:")
    );
}

#[test]
fn cycle_error_lists_path() {
    let err = GraphError::Cycle {
        path: vec![NodeId(0), NodeId(1), NodeId(0)],
    };
    assert_eq!(err.to_string(), "cycle through parent edges: 0 -> 1 -> 0");
}

#[test]
fn as_graph_only_matches_graph_errors() {
    let err = FlipError::from(GraphError::SelfReference { node: NodeId(3) });
    assert_eq!(
        err.as_graph(),
        Some(&GraphError::SelfReference { node: NodeId(3) })
    );
    assert!(FlipError::evaluation("x").as_graph().is_none());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = FlipError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
