use std::collections::BTreeMap;
use std::fmt;

use crate::{
    foundation::error::{FlipResult, GraphError},
    foundation::math::StableHasher,
    graph::validate::validate_nodes,
};

/// Stable node identifier.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Geometric parameters of a node's transform hop.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeParams {
    /// Uniform scale about the origin. Runtime `0` is allowed and makes the hop non-invertible.
    pub scale: f64,
    /// Distance of each radial copy from the origin.
    pub radial_radius: f64,
    /// Number of radial copies; `0` disables radial repeat.
    pub radial_count: u32,
    /// Final rotation in degrees.
    pub rotation: f64,
}

impl Default for NodeParams {
    fn default() -> Self {
        Self {
            scale: 1.0,
            radial_radius: 0.0,
            radial_count: 0,
            rotation: 0.0,
        }
    }
}

/// One graph node.
///
/// A node with neither parent is the root. A node with only one parent is valid: a missing base
/// parent contributes a transparent base and a missing transform parent contributes nothing on top.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// Stable identifier.
    pub id: NodeId,
    /// Parent supplying the unmodified underlying image.
    pub base_parent: Option<NodeId>,
    /// Parent whose image is transformed and color-inverted over the base.
    pub transform_parent: Option<NodeId>,
    /// Transform parameters.
    pub params: NodeParams,
    /// Free-text annotation, round-tripped but unused by rendering.
    pub comment: Option<String>,
}

impl Node {
    /// The parentless root node.
    pub fn root(id: NodeId) -> Self {
        Self {
            id,
            base_parent: None,
            transform_parent: None,
            params: NodeParams::default(),
            comment: None,
        }
    }

    /// A node with both parents set and the given parameters.
    pub fn composite(id: NodeId, base: NodeId, transform: NodeId, params: NodeParams) -> Self {
        Self {
            id,
            base_parent: Some(base),
            transform_parent: Some(transform),
            params,
            comment: None,
        }
    }

    /// `true` iff both parent fields are unset.
    pub fn is_root(&self) -> bool {
        self.base_parent.is_none() && self.transform_parent.is_none()
    }

    /// Set parents in `[base, transform]` order.
    pub fn parents(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.base_parent.into_iter().chain(self.transform_parent)
    }
}

/// A validated DAG of nodes with exactly one root.
///
/// Nodes live in an id-keyed arena; iteration order is ascending id, so it is stable across calls.
/// Every edit re-validates the whole graph and leaves it untouched on failure.
#[derive(Clone, Debug, PartialEq)]
pub struct Graph {
    nodes: BTreeMap<NodeId, Node>,
    root: NodeId,
}

impl Graph {
    /// Build a graph from a node list, running full validation.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> FlipResult<Self> {
        let mut map = BTreeMap::new();
        for node in nodes {
            let id = node.id;
            if map.insert(id, node).is_some() {
                return Err(GraphError::DuplicateId { node: id }.into());
            }
        }
        let root = validate_nodes(&map)?;
        Ok(Self { nodes: map, root })
    }

    /// A graph holding only a root node.
    pub fn with_root(id: NodeId) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(id, Node::root(id));
        Self { nodes, root: id }
    }

    /// Id of the unique root.
    pub fn root_id(&self) -> NodeId {
        self.root
    }

    /// The unique root node.
    pub fn root(&self) -> &Node {
        &self.nodes[&self.root]
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// `true` if `id` is present.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// All nodes in ascending id order.
    pub fn nodes(&self) -> impl ExactSizeIterator<Item = &Node> + '_ {
        self.nodes.values()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false` for a valid graph; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// One past the largest id in use.
    pub fn next_id(&self) -> NodeId {
        NodeId(
            self.nodes
                .keys()
                .next_back()
                .map(|id| id.0.saturating_add(1))
                .unwrap_or(0),
        )
    }

    /// Nodes that reference `id` through either parent edge, ascending.
    pub fn dependents(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.parents().any(|p| p == id))
            .map(|n| n.id)
            .collect()
    }

    /// Add a node. Rejected (graph unchanged) if the result is invalid or the id is taken.
    pub fn add_node(&mut self, node: Node) -> FlipResult<()> {
        let id = node.id;
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateId { node: id }.into());
        }
        self.edit(|nodes| {
            nodes.insert(id, node);
            Ok(())
        })?;
        tracing::debug!(node = %id, "node added");
        Ok(())
    }

    /// Remove a node. Rejected with [`GraphError::DanglingReference`] if another node depends on it.
    pub fn remove_node(&mut self, id: NodeId) -> FlipResult<Node> {
        if !self.nodes.contains_key(&id) {
            return Err(GraphError::UnknownNode { node: id }.into());
        }
        if let Some(&dependent) = self.dependents(id).first() {
            return Err(GraphError::DanglingReference {
                node: dependent,
                parent: id,
            }
            .into());
        }
        let mut removed = None;
        self.edit(|nodes| {
            removed = nodes.remove(&id);
            Ok(())
        })?;
        tracing::debug!(node = %id, "node removed");
        removed.ok_or_else(|| GraphError::UnknownNode { node: id }.into())
    }

    /// Replace a node's transform parameters.
    pub fn set_params(&mut self, id: NodeId, params: NodeParams) -> FlipResult<()> {
        self.edit(|nodes| {
            let node = nodes
                .get_mut(&id)
                .ok_or(GraphError::UnknownNode { node: id })?;
            node.params = params;
            Ok(())
        })
    }

    /// Rewire a node's parents.
    pub fn set_parents(
        &mut self,
        id: NodeId,
        base_parent: Option<NodeId>,
        transform_parent: Option<NodeId>,
    ) -> FlipResult<()> {
        self.edit(|nodes| {
            let node = nodes
                .get_mut(&id)
                .ok_or(GraphError::UnknownNode { node: id })?;
            node.base_parent = base_parent;
            node.transform_parent = transform_parent;
            Ok(())
        })
    }

    /// Replace a node's annotation. Never affects validity.
    pub fn set_comment(&mut self, id: NodeId, comment: Option<String>) -> FlipResult<()> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(GraphError::UnknownNode { node: id })?;
        node.comment = comment;
        Ok(())
    }

    /// Stable 64-bit hash of everything that affects rendering (comments excluded).
    pub fn fingerprint(&self) -> u64 {
        let mut h = StableHasher::new();
        h.write_u32(self.root.0);
        for node in self.nodes.values() {
            h.write_u32(node.id.0);
            h.write_opt_u32(node.base_parent.map(|p| p.0));
            h.write_opt_u32(node.transform_parent.map(|p| p.0));
            h.write_f64(node.params.scale);
            h.write_f64(node.params.radial_radius);
            h.write_u32(node.params.radial_count);
            h.write_f64(node.params.rotation);
        }
        h.finish()
    }

    /// Apply `f` to a scratch copy, validate, and commit only on success.
    fn edit(
        &mut self,
        f: impl FnOnce(&mut BTreeMap<NodeId, Node>) -> Result<(), GraphError>,
    ) -> FlipResult<()> {
        let mut scratch = self.nodes.clone();
        f(&mut scratch)?;
        let root = validate_nodes(&scratch)?;
        self.nodes = scratch;
        self.root = root;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/model.rs"]
mod tests;
