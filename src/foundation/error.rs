use crate::graph::model::NodeId;

/// Convenience result type used across flipgraph.
pub type FlipResult<T> = Result<T, FlipError>;

/// Structural validation failures raised while loading or editing a [`crate::Graph`].
///
/// Every variant is raised synchronously by the operation that attempted the change; the graph
/// keeps its prior valid state.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// The document does not have the expected shape (missing `nodes`, missing `id`, bad types).
    #[error("schema error: {0}")]
    Schema(String),

    /// Zero or more than one node has both parent fields unset.
    #[error("graph must have exactly one root, found {found} ({roots:?})")]
    RootCount {
        /// Number of parentless nodes.
        found: usize,
        /// Ids of the parentless nodes (sorted).
        roots: Vec<NodeId>,
    },

    /// A parent reference names a node that is not in the graph.
    #[error("node {node} references missing parent {parent}")]
    DanglingReference {
        /// Node holding the reference.
        node: NodeId,
        /// Missing parent id.
        parent: NodeId,
    },

    /// A node lists itself as one of its parents.
    #[error("node {node} references itself as a parent")]
    SelfReference {
        /// Offending node.
        node: NodeId,
    },

    /// A cycle exists through base and/or transform parent edges.
    #[error("cycle through parent edges: {}", format_path(.path))]
    Cycle {
        /// Nodes on the cycle, first node repeated at the end.
        path: Vec<NodeId>,
    },

    /// A node cannot reach the root through any chain of parent edges.
    #[error("node {node} cannot reach the root")]
    DisconnectedNode {
        /// Unreachable node.
        node: NodeId,
    },

    /// `scale` or `radial_radius` is negative (or not finite).
    #[error("node {node}: {field} must be finite and >= 0, got {value}")]
    NegativeParameter {
        /// Offending node.
        node: NodeId,
        /// Parameter name as spelled in the document.
        field: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// Two document entries share one id.
    #[error("duplicate node id {node}")]
    DuplicateId {
        /// Repeated id.
        node: NodeId,
    },

    /// An edit names a node that does not exist.
    #[error("unknown node {node}")]
    UnknownNode {
        /// Requested id.
        node: NodeId,
    },
}

fn format_path(path: &[NodeId]) -> String {
    path.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum FlipError {
    /// Graph structure or document validation failed.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The point-wise evaluator exceeded its stack or step budget.
    #[error("evaluation exhausted at node {node}: {steps} steps, stack depth {depth}")]
    Exhausted {
        /// Node whose evaluation was requested.
        node: NodeId,
        /// Steps spent when the budget ran out.
        steps: u32,
        /// Stack depth when the budget ran out.
        depth: usize,
    },

    /// Caller contract violations during evaluation (no graph bound, missing parent).
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Invalid render settings.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors when serializing or deserializing documents.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FlipError {
    /// Build a [`FlipError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`FlipError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FlipError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// The structural validation failure, if this is one.
    pub fn as_graph(&self) -> Option<&GraphError> {
        match self {
            Self::Graph(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
