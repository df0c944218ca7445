//! Structural validation of a node set.
//!
//! Checks run in a fixed order so that each malformed document reports the most specific error:
//! parameters, self references, dangling references, cycles, root count, connectivity.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{
    foundation::error::GraphError,
    graph::model::{Node, NodeId},
};

/// Validate `nodes` and return the id of the unique root.
pub(crate) fn validate_nodes(nodes: &BTreeMap<NodeId, Node>) -> Result<NodeId, GraphError> {
    for node in nodes.values() {
        validate_params(node)?;
    }
    for node in nodes.values() {
        if node.parents().any(|p| p == node.id) {
            return Err(GraphError::SelfReference { node: node.id });
        }
    }
    for node in nodes.values() {
        for parent in node.parents() {
            if !nodes.contains_key(&parent) {
                return Err(GraphError::DanglingReference {
                    node: node.id,
                    parent,
                });
            }
        }
    }
    if let Some(path) = find_cycle(nodes) {
        return Err(GraphError::Cycle { path });
    }

    let roots: Vec<NodeId> = nodes
        .values()
        .filter(|n| n.is_root())
        .map(|n| n.id)
        .collect();
    let root = match roots.as_slice() {
        [only] => *only,
        _ => {
            return Err(GraphError::RootCount {
                found: roots.len(),
                roots,
            });
        }
    };

    check_connectivity(nodes, root)?;
    Ok(root)
}

fn validate_params(node: &Node) -> Result<(), GraphError> {
    for (field, value) in [
        ("scale", node.params.scale),
        ("radial_radius", node.params.radial_radius),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(GraphError::NegativeParameter {
                node: node.id,
                field,
                value,
            });
        }
    }
    if !node.params.rotation.is_finite() {
        return Err(GraphError::Schema(format!(
            "node {}: rotation must be finite",
            node.id
        )));
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnStack,
    Done,
}

/// Depth-first search over the union of both parent edges.
///
/// Iterative so deep chains cannot overflow the call stack. Returns the cycle as a path that
/// starts and ends at the same node.
fn find_cycle(nodes: &BTreeMap<NodeId, Node>) -> Option<Vec<NodeId>> {
    let mut marks: HashMap<NodeId, Mark> = HashMap::with_capacity(nodes.len());

    for &start in nodes.keys() {
        if marks.contains_key(&start) {
            continue;
        }
        // (node, index of next parent to visit)
        let mut stack: Vec<(NodeId, usize)> = vec![(start, 0)];
        marks.insert(start, Mark::OnStack);

        while let Some(top) = stack.last_mut() {
            let (id, cursor) = *top;
            top.1 += 1;
            let Some(parent) = nodes.get(&id).and_then(|n| n.parents().nth(cursor)) else {
                marks.insert(id, Mark::Done);
                stack.pop();
                continue;
            };

            match marks.get(&parent) {
                Some(Mark::OnStack) => {
                    let from = stack.iter().position(|(n, _)| *n == parent).unwrap_or(0);
                    let mut path: Vec<NodeId> = stack[from..].iter().map(|(n, _)| *n).collect();
                    path.push(parent);
                    return Some(path);
                }
                Some(Mark::Done) => {}
                None => {
                    marks.insert(parent, Mark::OnStack);
                    stack.push((parent, 0));
                }
            }
        }
    }
    None
}

/// Every node must reach `root` through at least one chain of parent edges.
fn check_connectivity(nodes: &BTreeMap<NodeId, Node>, root: NodeId) -> Result<(), GraphError> {
    let mut reaches: HashSet<NodeId> = HashSet::with_capacity(nodes.len());
    reaches.insert(root);

    for &id in nodes.keys() {
        if reaches.contains(&id) {
            continue;
        }
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut frontier = vec![id];
        let mut found = false;
        while let Some(cur) = frontier.pop() {
            if reaches.contains(&cur) {
                found = true;
                break;
            }
            if !visited.insert(cur) {
                continue;
            }
            if let Some(node) = nodes.get(&cur) {
                frontier.extend(node.parents());
            }
        }
        if !found {
            return Err(GraphError::DisconnectedNode { node: id });
        }
        reaches.insert(id);
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/graph/validate.rs"]
mod tests;
