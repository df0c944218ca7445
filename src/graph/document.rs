//! Flat, versionless JSON document for graphs.
//!
//! ```json
//! { "nodes": [
//!     { "id": 0 },
//!     { "id": 1, "base_parent": 0, "transform_parent": 0, "scale": 0.5,
//!       "radial_radius": 0, "radial_count": 0, "rotation": 45 }
//! ] }
//! ```

use std::path::Path;

use serde::ser::SerializeMap;

use crate::{
    foundation::error::{FlipError, FlipResult, GraphError},
    graph::model::{Graph, Node, NodeId, NodeParams},
};

/// Top-level document: an object holding the `nodes` array.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GraphDocument {
    /// Node entries, in any order.
    pub nodes: Vec<NodeDef>,
}

/// One entry of the `nodes` array as written in the document.
///
/// Optional fields keep their absence so that defaults are applied in exactly one place
/// ([`NodeDef::to_node`]).
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
pub struct NodeDef {
    /// Required node id.
    pub id: NodeId,
    /// Base parent; absent or `null` means none.
    #[serde(default)]
    pub base_parent: Option<NodeId>,
    /// Transform parent; absent or `null` means none.
    #[serde(default)]
    pub transform_parent: Option<NodeId>,
    /// Scale; absent or `0` loads as `1.0`.
    #[serde(default)]
    pub scale: Option<f64>,
    /// Radial copy distance; default `0`.
    #[serde(default)]
    pub radial_radius: Option<f64>,
    /// Radial copy count; default `0`.
    #[serde(default)]
    pub radial_count: Option<u32>,
    /// Final rotation in degrees; default `0`.
    #[serde(default)]
    pub rotation: Option<f64>,
    /// Free-text annotation.
    #[serde(default)]
    pub comment: Option<String>,
}

impl NodeDef {
    fn is_root(&self) -> bool {
        self.base_parent.is_none() && self.transform_parent.is_none()
    }

    /// Apply document defaults. A document-level `scale` of `0` becomes `1.0`.
    pub fn to_node(&self) -> Node {
        let defaults = NodeParams::default();
        let scale = match self.scale {
            None => defaults.scale,
            Some(s) if s == 0.0 => 1.0,
            Some(s) => s,
        };
        Node {
            id: self.id,
            base_parent: self.base_parent,
            transform_parent: self.transform_parent,
            params: NodeParams {
                scale,
                radial_radius: self.radial_radius.unwrap_or(defaults.radial_radius),
                radial_count: self.radial_count.unwrap_or(defaults.radial_count),
                rotation: self.rotation.unwrap_or(defaults.rotation),
            },
            comment: self.comment.clone(),
        }
    }

    /// Export form of a node: the root keeps only `id` (and `comment`), every other node carries
    /// all six transform fields.
    pub fn from_node(node: &Node) -> Self {
        if node.is_root() {
            return Self {
                id: node.id,
                comment: node.comment.clone(),
                ..Self::default()
            };
        }
        Self {
            id: node.id,
            base_parent: node.base_parent,
            transform_parent: node.transform_parent,
            scale: Some(node.params.scale),
            radial_radius: Some(node.params.radial_radius),
            radial_count: Some(node.params.radial_count),
            rotation: Some(node.params.rotation),
            comment: node.comment.clone(),
        }
    }
}

impl serde::Serialize for NodeDef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;
        if !self.is_root() {
            // Parents are written even when null so non-root entries always carry six fields.
            map.serialize_entry("base_parent", &self.base_parent)?;
            map.serialize_entry("transform_parent", &self.transform_parent)?;
            let defaults = NodeParams::default();
            map.serialize_entry("scale", &self.scale.unwrap_or(defaults.scale))?;
            map.serialize_entry(
                "radial_radius",
                &self.radial_radius.unwrap_or(defaults.radial_radius),
            )?;
            map.serialize_entry(
                "radial_count",
                &self.radial_count.unwrap_or(defaults.radial_count),
            )?;
            map.serialize_entry("rotation", &self.rotation.unwrap_or(defaults.rotation))?;
        }
        if let Some(comment) = &self.comment {
            map.serialize_entry("comment", comment)?;
        }
        map.end()
    }
}

impl GraphDocument {
    /// Parse a document from JSON text.
    ///
    /// Shape problems (missing `nodes`, missing `id`, wrong types) are [`GraphError::Schema`];
    /// malformed JSON is [`FlipError::Serde`].
    pub fn from_json_str(s: &str) -> FlipResult<Self> {
        serde_json::from_str(s).map_err(classify_json_error)
    }

    /// Parse a document from an already-decoded JSON value.
    pub fn from_value(v: serde_json::Value) -> FlipResult<Self> {
        serde_json::from_value(v).map_err(classify_json_error)
    }

    /// Read and parse a document file.
    pub fn from_path(path: impl AsRef<Path>) -> FlipResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("read graph document '{}': {e}", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_string_pretty(&self) -> FlipResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| FlipError::serde(e.to_string()))
    }

    /// Serialize to a JSON value.
    pub fn to_value(&self) -> FlipResult<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| FlipError::serde(e.to_string()))
    }
}

fn classify_json_error(e: serde_json::Error) -> FlipError {
    match e.classify() {
        serde_json::error::Category::Data => GraphError::Schema(e.to_string()).into(),
        _ => FlipError::serde(e.to_string()),
    }
}

impl Graph {
    /// Build and validate a graph from a parsed document.
    #[tracing::instrument(skip(doc), fields(nodes = doc.nodes.len()))]
    pub fn from_document(doc: &GraphDocument) -> FlipResult<Self> {
        Self::from_nodes(doc.nodes.iter().map(NodeDef::to_node))
    }

    /// Parse and validate a graph from JSON text.
    pub fn from_json_str(s: &str) -> FlipResult<Self> {
        Self::from_document(&GraphDocument::from_json_str(s)?)
    }

    /// Export the graph in canonical document form (ascending id order).
    ///
    /// A runtime `scale` of `0` is written as `0`, which loads back as `1.0`: the document format
    /// has no way to express a collapsed hop, so that one edit does not survive a round trip.
    pub fn to_document(&self) -> GraphDocument {
        GraphDocument {
            nodes: self.nodes().map(NodeDef::from_node).collect(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/document.rs"]
mod tests;
