use super::*;
use serde_json::json;

#[test]
fn root_only_document_loads() {
    let g = Graph::from_json_str(r#"{"nodes":[{"id":0}]}"#).unwrap();
    assert_eq!(g.len(), 1);
    assert_eq!(g.root_id(), NodeId(0));
}

#[test]
fn defaults_are_applied_and_zero_scale_normalizes() {
    let doc = GraphDocument::from_value(json!({
        "nodes": [
            {"id": 0},
            {"id": 1, "base_parent": 0, "transform_parent": 0, "scale": 0}
        ]
    }))
    .unwrap();
    let g = Graph::from_document(&doc).unwrap();
    let n = g.node(NodeId(1)).unwrap();
    assert_eq!(n.params.scale, 1.0);
    assert_eq!(n.params.radial_count, 0);
    assert_eq!(n.params.radial_radius, 0.0);
    assert_eq!(n.params.rotation, 0.0);
}

#[test]
fn missing_nodes_or_id_is_a_schema_error() {
    let err = Graph::from_json_str(r#"{"things":[]}"#).unwrap_err();
    assert!(matches!(err.as_graph(), Some(GraphError::Schema(_))));

    let err = Graph::from_json_str(r#"{"nodes":[{"base_parent":1}]}"#).unwrap_err();
    assert!(matches!(err.as_graph(), Some(GraphError::Schema(_))));

    let err = Graph::from_json_str(r#"{"nodes":[{"id":0,"radial_count":-2}]}"#).unwrap_err();
    assert!(matches!(err.as_graph(), Some(GraphError::Schema(_))));
}

#[test]
fn malformed_json_is_a_serde_error() {
    let err = Graph::from_json_str(r#"{"nodes": ["#).unwrap_err();
    assert!(matches!(err, FlipError::Serde(_)));
}

#[test]
fn negative_scale_is_rejected() {
    let err = Graph::from_json_str(
        r#"{"nodes":[{"id":0},{"id":1,"base_parent":0,"transform_parent":0,"scale":-1}]}"#,
    )
    .unwrap_err();
    assert!(matches!(
        err.as_graph(),
        Some(GraphError::NegativeParameter { field: "scale", .. })
    ));
}

#[test]
fn export_shape_root_omits_transform_fields() {
    let g = Graph::from_json_str(
        r#"{"nodes":[
            {"id":0,"comment":"seed"},
            {"id":1,"base_parent":0,"transform_parent":0,"scale":0.3,"radial_radius":0.6,"radial_count":4}
        ]}"#,
    )
    .unwrap();
    let v = g.to_document().to_value().unwrap();
    assert_eq!(
        v,
        json!({
            "nodes": [
                {"id": 0, "comment": "seed"},
                {"id": 1, "base_parent": 0, "transform_parent": 0, "scale": 0.3,
                 "radial_radius": 0.6, "radial_count": 4, "rotation": 0.0}
            ]
        })
    );
}

#[test]
fn single_parent_export_writes_null_parent() {
    let g = Graph::from_json_str(r#"{"nodes":[{"id":0},{"id":1,"transform_parent":0}]}"#)
        .unwrap();
    let v = g.to_document().to_value().unwrap();
    assert_eq!(v["nodes"][1]["base_parent"], serde_json::Value::Null);
    assert_eq!(v["nodes"][1]["transform_parent"], json!(0));
    let back = Graph::from_document(&GraphDocument::from_value(v).unwrap()).unwrap();
    assert_eq!(back, g);
}

#[test]
fn runtime_zero_scale_exports_as_zero_and_reloads_as_one() {
    let mut g = Graph::from_json_str(
        r#"{"nodes":[{"id":0},{"id":1,"base_parent":0,"transform_parent":0,"scale":0.5}]}"#,
    )
    .unwrap();
    g.set_params(
        NodeId(1),
        NodeParams {
            scale: 0.0,
            ..NodeParams::default()
        },
    )
    .unwrap();

    let v = g.to_document().to_value().unwrap();
    assert_eq!(v["nodes"][1]["scale"], json!(0.0));
    let back = Graph::from_document(&GraphDocument::from_value(v).unwrap()).unwrap();
    assert_eq!(back.node(NodeId(1)).unwrap().params.scale, 1.0);
    assert_ne!(back.fingerprint(), g.fingerprint());
}
