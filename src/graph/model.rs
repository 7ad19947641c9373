//! Authored graph model: unit nodes, data links, control edges, variables.
//!
//! The graph is the only persisted artifact. Nodes live in a push-only arena
//! addressed by [`NodeId`]; links and control edges hold ids, never
//! references, so removal cascades and serialization stay simple.

use crate::{
    foundation::error::{RigError, RigResult},
    value::{PinType, Value},
};

/// Stable identifier of a node inside one [`Graph`].
///
/// Ids are arena indices; they are never reused after removal, and arena
/// order doubles as insertion order for deterministic compilation.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct NodeId(pub u32);

/// A specific pin on a specific node.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PinRef {
    /// Owning node.
    pub node: NodeId,
    /// Pin name, unique within the node's schema.
    pub pin: String,
}

impl PinRef {
    /// Build from a node id and pin name.
    pub fn new(node: NodeId, pin: &str) -> Self {
        Self {
            node,
            pin: pin.to_string(),
        }
    }
}

/// One authored unit node instance.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UnitNode {
    /// Unit-kind tag selecting the `Execute` implementation (e.g. `math.add`).
    pub kind: String,
    /// Kind-specific constant configuration (bone names, axis flags, ...).
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub config: serde_json::Value,
}

/// A data dependency edge from an output pin to an input pin.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Link {
    /// Source output pin.
    pub from: PinRef,
    /// Destination input pin. At most one link may target a given input.
    pub to: PinRef,
}

/// An execution-order edge leaving a control slot of a flow-capable node.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ControlEdge {
    /// Source node.
    pub from: NodeId,
    /// Control slot name on the source (`next`, `then`, `else`, `body`, ...).
    pub slot: String,
    /// Node whose execution chain the slot triggers.
    pub to: NodeId,
}

/// A graph-level variable: a named, typed register with a stable slot.
///
/// Variables are how values cross control-flow region boundaries (branch arms
/// converge by writing the same variable) and how the host binds external
/// inputs and outputs.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VariableDef {
    /// Variable name, unique within the graph.
    pub name: String,
    /// Value type.
    pub ty: PinType,
    /// Initial value, applied when a program is instantiated.
    pub default: Value,
    /// Host-bound input: written from external values before each run.
    #[serde(default)]
    pub input: bool,
    /// Host-bound output: read back after each successful run.
    #[serde(default)]
    pub output: bool,
}

/// Ordered bone names of the rig this graph drives.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Skeleton {
    /// Bone names in pose-array order.
    pub bones: Vec<String>,
}

impl Skeleton {
    /// Index of `name` in pose-array order.
    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b == name)
    }
}

/// The authored node graph.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Graph {
    nodes: Vec<Option<UnitNode>>,
    links: Vec<Link>,
    control_edges: Vec<ControlEdge>,
    entry: Option<NodeId>,
    variables: Vec<VariableDef>,
    skeleton: Skeleton,
}

impl Graph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize to the persisted JSON form.
    pub fn to_json(&self) -> RigResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| RigError::serde(e.to_string()))
    }

    /// Deserialize a graph from its persisted JSON form.
    pub fn from_json(text: &str) -> RigResult<Self> {
        serde_json::from_str(text).map_err(|e| RigError::serde(e.to_string()))
    }

    /// Add a node of `kind` with a kind-specific config blob.
    pub fn add_node(&mut self, kind: &str, config: serde_json::Value) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(UnitNode {
            kind: kind.to_string(),
            config,
        }));
        id
    }

    /// Look up a live node.
    pub fn node(&self, id: NodeId) -> Option<&UnitNode> {
        self.nodes.get(id.0 as usize)?.as_ref()
    }

    /// Iterate live nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &UnitNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| Some((NodeId(i as u32), n.as_ref()?)))
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Add a data link. Both endpoints must be live nodes; full pin/type
    /// checking happens in [`Graph::validate`].
    pub fn add_link(&mut self, from: PinRef, to: PinRef) -> RigResult<()> {
        self.require_node(from.node)?;
        self.require_node(to.node)?;
        self.links.push(Link { from, to });
        Ok(())
    }

    /// Add a control edge from a control slot to a target node.
    pub fn add_control_edge(&mut self, from: NodeId, slot: &str, to: NodeId) -> RigResult<()> {
        self.require_node(from)?;
        self.require_node(to)?;
        self.control_edges.push(ControlEdge {
            from,
            slot: slot.to_string(),
            to,
        });
        Ok(())
    }

    /// Designate the execution entry node.
    pub fn set_entry(&mut self, id: NodeId) -> RigResult<()> {
        self.require_node(id)?;
        self.entry = Some(id);
        Ok(())
    }

    /// The designated entry node, if set.
    pub fn entry(&self) -> Option<NodeId> {
        self.entry
    }

    /// Remove a node, cascading removal of every link and control edge that
    /// references it. Clears the entry designation when it pointed here.
    pub fn remove_node(&mut self, id: NodeId) -> RigResult<()> {
        self.require_node(id)?;
        self.nodes[id.0 as usize] = None;
        self.links
            .retain(|l| l.from.node != id && l.to.node != id);
        self.control_edges
            .retain(|e| e.from != id && e.to != id);
        if self.entry == Some(id) {
            self.entry = None;
        }
        Ok(())
    }

    /// Declare a graph variable. Names must be unique.
    pub fn declare_variable(&mut self, var: VariableDef) -> RigResult<()> {
        if self.variables.iter().any(|v| v.name == var.name) {
            return Err(RigError::binding(format!(
                "variable '{}' is already declared",
                var.name
            )));
        }
        self.variables.push(var);
        Ok(())
    }

    /// Declared variables in declaration order.
    pub fn variables(&self) -> &[VariableDef] {
        &self.variables
    }

    /// Data links in insertion order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Control edges in insertion order.
    pub fn control_edges(&self) -> &[ControlEdge] {
        &self.control_edges
    }

    /// The rig skeleton this graph drives.
    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    /// Replace the skeleton description.
    pub fn set_skeleton(&mut self, skeleton: Skeleton) {
        self.skeleton = skeleton;
    }

    /// The single link feeding `pin`, if any.
    pub fn link_into(&self, pin: &PinRef) -> Option<&Link> {
        self.links.iter().find(|l| &l.to == pin)
    }

    /// Control edges leaving `node` through `slot`, in insertion order.
    pub fn control_edges_from(&self, node: NodeId, slot: &str) -> impl Iterator<Item = &ControlEdge> {
        self.control_edges
            .iter()
            .filter(move |e| e.from == node && e.slot == slot)
    }

    fn require_node(&self, id: NodeId) -> RigResult<()> {
        if self.node(id).is_none() {
            return Err(RigError::binding(format!("node {} does not exist", id.0)));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/model.rs"]
mod tests;
