//! # Host Graph
//!
//! The compiler never owns the graph it writes into. [`HostGraph`] is the
//! narrow surface it needs from the host: spawn nodes, manage the entry and
//! exit tunnel pins, wire pins together and clear out a previous compile.
//!
//! [`ExpressionGraph`] is a self-contained in-memory host. It backs the tests
//! and any embedder that just wants the generated network as data.

use crate::metadata::{FunctionMetadata, PinType};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GraphNodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PinId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PinDirection {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A member variable visible to the expression
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableInfo {
    pub name: String,
    /// `None` when the variable's type has no pin representation
    pub pin_type: Option<PinType>,
    pub accessible: bool,
}

/// What to spawn for an AST node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTemplate {
    /// Reads a member variable through an output pin named after it
    VariableGet { variable: String, pin_type: PinType },
    /// Calls a library function: one input pin per parameter, output `ReturnValue`
    CallFunction { function: FunctionMetadata },
}

pub const RETURN_VALUE_PIN: &str = "ReturnValue";

/// Graph operations the code generator depends on
pub trait HostGraph {
    fn find_variable(&self, name: &str) -> Option<VariableInfo>;

    fn spawn_node(&mut self, template: &NodeTemplate, position: Position) -> GraphNodeId;

    /// Data input pins of a node, in parameter order
    fn input_pins(&self, node: GraphNodeId) -> Vec<PinId>;

    fn find_output_pin(&self, node: GraphNodeId, name: &str) -> Option<PinId>;

    fn find_entry_pin(&self, name: &str) -> Option<PinId>;

    fn create_entry_pin(&mut self, name: &str, pin_type: PinType) -> PinId;

    fn find_exit_pin(&self, name: &str) -> Option<PinId>;

    fn create_exit_pin(&mut self, name: &str, pin_type: PinType) -> PinId;

    fn remove_exit_pins(&mut self);

    fn break_pin_links(&mut self, pin: PinId);

    fn pin_type(&self, pin: PinId) -> Option<PinType>;

    fn pin_name(&self, pin: PinId) -> Option<String>;

    /// Connect an output pin to an input pin, returning whether the link was made.
    /// Hosts are expected to widen byte and int values into wider numeric pins.
    fn try_create_connection(&mut self, output: PinId, input: PinId) -> bool;

    fn set_pin_default_value(&mut self, pin: PinId, value: &str);

    /// Remove every node except the entry and exit tunnels
    fn remove_generated_nodes(&mut self);

    fn position_tunnels(&mut self, entry: Position, exit: Position);

    /// Called once a compile has rewritten the graph
    fn mark_structurally_modified(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Entry,
    Exit,
    Generated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: GraphNodeId,
    pub role: NodeRole,
    /// Function name for calls, `get_<name>` for variable reads
    pub node_type: String,
    pub position: Position,
    pub pins: Vec<PinId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphPin {
    pub id: PinId,
    pub owner: GraphNodeId,
    pub name: String,
    pub direction: PinDirection,
    pub pin_type: PinType,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Link {
    pub output: PinId,
    pub input: PinId,
}

/// In-memory host graph with an entry and an exit tunnel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpressionGraph {
    pub name: String,
    nodes: Vec<GraphNode>,
    pins: Vec<GraphPin>,
    links: Vec<Link>,
    variables: Vec<VariableInfo>,
    entry: GraphNodeId,
    exit: GraphNodeId,
    next_node: usize,
    next_pin: usize,
    #[serde(skip)]
    modification_count: usize,
}

impl ExpressionGraph {
    pub fn new(name: impl Into<String>) -> Self {
        let mut graph = Self {
            name: name.into(),
            nodes: Vec::new(),
            pins: Vec::new(),
            links: Vec::new(),
            variables: Vec::new(),
            entry: GraphNodeId(0),
            exit: GraphNodeId(0),
            next_node: 0,
            next_pin: 0,
            modification_count: 0,
        };
        graph.entry = graph.add_node(NodeRole::Entry, "Entry".to_string(), Position::default());
        graph.exit = graph.add_node(NodeRole::Exit, "Exit".to_string(), Position::default());
        graph
    }

    /// Declare a member variable the expression may reference
    pub fn add_variable(&mut self, name: impl Into<String>, pin_type: Option<PinType>, accessible: bool) {
        self.variables.push(VariableInfo {
            name: name.into(),
            pin_type,
            accessible,
        });
    }

    pub fn with_variable(mut self, name: impl Into<String>, pin_type: PinType) -> Self {
        self.add_variable(name, Some(pin_type), true);
        self
    }

    pub fn entry_node(&self) -> Option<&GraphNode> {
        self.node(self.entry)
    }

    pub fn exit_node(&self) -> Option<&GraphNode> {
        self.node(self.exit)
    }

    pub fn node(&self, id: GraphNodeId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn pin(&self, id: PinId) -> Option<&GraphPin> {
        self.pins.iter().find(|p| p.id == id)
    }

    pub fn generated_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(|n| n.role == NodeRole::Generated)
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Output pins linked into `input`
    pub fn links_into(&self, input: PinId) -> Vec<PinId> {
        self.links
            .iter()
            .filter(|l| l.input == input)
            .map(|l| l.output)
            .collect()
    }

    pub fn modification_count(&self) -> usize {
        self.modification_count
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn node_mut(&mut self, id: GraphNodeId) -> Option<&mut GraphNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    fn add_node(&mut self, role: NodeRole, node_type: String, position: Position) -> GraphNodeId {
        let id = GraphNodeId(self.next_node);
        self.next_node += 1;
        self.nodes.push(GraphNode {
            id,
            role,
            node_type,
            position,
            pins: Vec::new(),
        });
        id
    }

    fn add_pin(&mut self, owner: GraphNodeId, name: &str, direction: PinDirection, pin_type: PinType) -> PinId {
        let id = PinId(self.next_pin);
        self.next_pin += 1;
        self.pins.push(GraphPin {
            id,
            owner,
            name: name.to_string(),
            direction,
            pin_type,
            default_value: None,
        });
        if let Some(node) = self.node_mut(owner) {
            node.pins.push(id);
        }
        id
    }

    fn find_pin_on(&self, node: GraphNodeId, name: &str, direction: PinDirection) -> Option<PinId> {
        self.pins
            .iter()
            .find(|p| p.owner == node && p.direction == direction && p.name == name)
            .map(|p| p.id)
    }

    fn remove_pins_where(&mut self, doomed: impl Fn(&GraphPin) -> bool) {
        let removed: Vec<PinId> = self.pins.iter().filter(|p| doomed(p)).map(|p| p.id).collect();
        self.pins.retain(|p| !removed.contains(&p.id));
        self.links
            .retain(|l| !removed.contains(&l.output) && !removed.contains(&l.input));
        for node in &mut self.nodes {
            node.pins.retain(|p| !removed.contains(p));
        }
    }
}

impl HostGraph for ExpressionGraph {
    fn find_variable(&self, name: &str) -> Option<VariableInfo> {
        self.variables.iter().find(|v| v.name == name).cloned()
    }

    fn spawn_node(&mut self, template: &NodeTemplate, position: Position) -> GraphNodeId {
        match template {
            NodeTemplate::VariableGet { variable, pin_type } => {
                let id = self.add_node(NodeRole::Generated, format!("get_{}", variable), position);
                self.add_pin(id, variable, PinDirection::Output, *pin_type);
                id
            }
            NodeTemplate::CallFunction { function } => {
                let id = self.add_node(NodeRole::Generated, function.name.to_string(), position);
                for param in function.params {
                    self.add_pin(id, param.name, PinDirection::Input, param.pin_type);
                }
                if let Some(return_type) = function.return_type {
                    self.add_pin(id, RETURN_VALUE_PIN, PinDirection::Output, return_type);
                }
                id
            }
        }
    }

    fn input_pins(&self, node: GraphNodeId) -> Vec<PinId> {
        self.pins
            .iter()
            .filter(|p| p.owner == node && p.direction == PinDirection::Input)
            .map(|p| p.id)
            .collect()
    }

    fn find_output_pin(&self, node: GraphNodeId, name: &str) -> Option<PinId> {
        self.find_pin_on(node, name, PinDirection::Output)
    }

    fn find_entry_pin(&self, name: &str) -> Option<PinId> {
        self.find_pin_on(self.entry, name, PinDirection::Output)
    }

    fn create_entry_pin(&mut self, name: &str, pin_type: PinType) -> PinId {
        self.add_pin(self.entry, name, PinDirection::Output, pin_type)
    }

    fn find_exit_pin(&self, name: &str) -> Option<PinId> {
        self.find_pin_on(self.exit, name, PinDirection::Input)
    }

    fn create_exit_pin(&mut self, name: &str, pin_type: PinType) -> PinId {
        self.add_pin(self.exit, name, PinDirection::Input, pin_type)
    }

    fn remove_exit_pins(&mut self) {
        let exit = self.exit;
        self.remove_pins_where(|p| p.owner == exit);
    }

    fn break_pin_links(&mut self, pin: PinId) {
        self.links.retain(|l| l.output != pin && l.input != pin);
    }

    fn pin_type(&self, pin: PinId) -> Option<PinType> {
        self.pin(pin).map(|p| p.pin_type)
    }

    fn pin_name(&self, pin: PinId) -> Option<String> {
        self.pin(pin).map(|p| p.name.clone())
    }

    fn try_create_connection(&mut self, output: PinId, input: PinId) -> bool {
        let (Some(from), Some(to)) = (self.pin(output), self.pin(input)) else {
            return false;
        };
        if from.direction != PinDirection::Output
            || to.direction != PinDirection::Input
            || !from.pin_type.is_convertible_to(to.pin_type)
        {
            return false;
        }

        // A data input takes a single link
        self.links.retain(|l| l.input != input);
        self.links.push(Link { output, input });
        true
    }

    fn set_pin_default_value(&mut self, pin: PinId, value: &str) {
        if let Some(pin) = self.pins.iter_mut().find(|p| p.id == pin) {
            pin.default_value = Some(value.to_string());
        }
    }

    fn remove_generated_nodes(&mut self) {
        let generated: Vec<GraphNodeId> = self.generated_nodes().map(|n| n.id).collect();
        self.remove_pins_where(|p| generated.contains(&p.owner));
        self.nodes.retain(|n| n.role != NodeRole::Generated);
    }

    fn position_tunnels(&mut self, entry: Position, exit: Position) {
        let (entry_id, exit_id) = (self.entry, self.exit);
        if let Some(node) = self.node_mut(entry_id) {
            node.position = entry;
        }
        if let Some(node) = self.node_mut(exit_id) {
            node.position = exit;
        }
    }

    fn mark_structurally_modified(&mut self) {
        self.modification_count += 1;
    }
}
