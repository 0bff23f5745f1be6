//! # Graph Code Generator
//!
//! Expands a parsed expression into host graph nodes.
//!
//! Layout is prepared first from the depth chart, then a post-order walk
//! emits one [`CompiledArtifact`] per AST node and wires each operand into the
//! node that consumes it. Failures are recorded and the walk carries on, so a
//! broken expression still leaves a best-effort partial graph.

use super::artifact::{ArtifactSource, CompiledArtifact};
use super::depth::{DepthChart, DepthLabeler};
use super::operator_table::{find_matching_function, OperatorTable};
use crate::config::CompilerOptions;
use crate::error::GenerationError;
use crate::host::{HostGraph, NodeTemplate, Position};
use crate::metadata::PinType;
use crate::parser::{ConstantValue, Expr, ExprId, ExprKind, ExpressionVisitor, Token, TokenKind, VisitPhase};
use std::collections::HashMap;

/// Operator tag of the library's selection functions
pub const CONDITIONAL_OPERATOR: &str = "?:";

/// State of one compile pass
#[derive(Debug, Default)]
pub struct CompileSession {
    pub operators: OperatorTable,
    pub depths: DepthChart,
    pub artifacts: HashMap<ExprId, CompiledArtifact>,
    /// Only the most recently recorded error is kept
    pub last_error: Option<String>,
    pub had_errors: bool,
}

impl CompileSession {
    pub fn new(operators: OperatorTable) -> Self {
        Self {
            operators,
            ..Self::default()
        }
    }

    pub fn artifact(&self, id: ExprId) -> Option<&CompiledArtifact> {
        self.artifacts.get(&id)
    }
}

pub struct GraphCodeGenerator<'a> {
    host: &'a mut dyn HostGraph,
    options: &'a CompilerOptions,
    session: CompileSession,
}

impl<'a> GraphCodeGenerator<'a> {
    pub fn new(host: &'a mut dyn HostGraph, options: &'a CompilerOptions, operators: OperatorTable) -> Self {
        Self {
            host,
            options,
            session: CompileSession::new(operators),
        }
    }

    /// Generate the node network for `root` and wire it to the exit tunnel
    pub fn generate(mut self, root: &Expr) -> CompileSession {
        tracing::info!("[PMEC] Labelling depths...");
        self.session.depths = DepthLabeler::label(root);
        tracing::info!(
            "[PMEC]   - {} nodes, maximum depth {}",
            self.session.depths.len(),
            self.session.depths.maximum_depth()
        );

        tracing::info!("[PMEC] Generating nodes...");
        root.accept(&mut self);

        tracing::info!("[PMEC] Wiring result...");
        self.wire_root(root);

        // Both tunnels sit alone in their column, centred on the root row
        let entry = self.cell_position(0, 0, 1);
        let exit = self.cell_position(self.session.depths.maximum_depth() + 1, 0, 1);
        self.host.position_tunnels(entry, exit);

        self.session
    }

    fn error(&mut self, node: &Expr, err: GenerationError) {
        tracing::warn!("[PMEC] {} at node {}: {}", node, node.id.0, err);
        self.session.had_errors = true;
        self.session.last_error = Some(err.to_string());
    }

    /// Grid cell at `column`, `row` of a column holding `population` nodes
    fn cell_position(&self, column: usize, row: usize, population: usize) -> Position {
        let layout = &self.options.layout;
        let middle = population.max(1) as f32 * 0.5;
        Position::new(
            column as f32 * layout.depth_spacing,
            (row as f32 - middle + 0.5) * layout.height_spacing,
        )
    }

    /// Deepest nodes go in the leftmost column, the root in the rightmost
    fn node_position(&self, id: ExprId) -> Position {
        let depths = &self.session.depths;
        let depth = depths.depth_of(id);
        self.cell_position(depths.maximum_depth() - depth, depths.row_of(id), depths.height_at(depth))
    }

    fn emit(&mut self, node: &Expr, artifact: CompiledArtifact) {
        tracing::debug!("[PMEC] {} -> {:?} ({})", node, artifact.source, artifact.pin_type);
        self.session.artifacts.insert(node.id, artifact);
    }

    fn visit_leaf(&mut self, node: &Expr, token: &Token) {
        match &token.kind {
            TokenKind::Identifier => self.visit_identifier(node, &token.text),
            TokenKind::Constant(value) => {
                let (pin_type, default_value) = match value {
                    ConstantValue::Boolean(b) => (PinType::Boolean, b.to_string()),
                    ConstantValue::Float(f) => (PinType::Float, f.to_string()),
                    ConstantValue::Integer(i) => (PinType::Int, i.to_string()),
                    ConstantValue::String(s) => (PinType::String, s.clone()),
                };
                self.emit(node, CompiledArtifact::new(ArtifactSource::Literal { default_value }, pin_type));
            }
            TokenKind::Symbol => self.error(node, GenerationError::Unsupported("symbol operands")),
        }
    }

    /// Member variable, then existing input, then a newly declared input
    fn visit_identifier(&mut self, node: &Expr, name: &str) {
        if let Some(variable) = self.host.find_variable(name) {
            if !variable.accessible {
                return self.error(node, GenerationError::InaccessibleVariable(name.to_string()));
            }
            let Some(pin_type) = variable.pin_type else {
                return self.error(node, GenerationError::BadVariableType(name.to_string()));
            };

            let template = NodeTemplate::VariableGet {
                variable: name.to_string(),
                pin_type,
            };
            let position = self.node_position(node.id);
            let graph_node = self.host.spawn_node(&template, position);
            let source = ArtifactSource::VariableGet {
                node: graph_node,
                variable: name.to_string(),
            };
            return self.emit(node, CompiledArtifact::new(source, pin_type));
        }

        let pin = match self.host.find_entry_pin(name) {
            Some(pin) => pin,
            None => {
                tracing::debug!("[PMEC] Declaring input '{}'", name);
                self.host.create_entry_pin(name, self.options.default_input_type)
            }
        };
        let pin_type = self.host.pin_type(pin).unwrap_or(self.options.default_input_type);
        self.emit(node, CompiledArtifact::new(ArtifactSource::InputPin { pin }, pin_type));
    }

    /// Resolve `operator` over the operands' types and spawn the matching call
    fn visit_operator(&mut self, node: &Expr, operator: &str, operands: &[&Expr]) {
        if !self.session.operators.contains(operator) {
            return self.error(node, GenerationError::UnknownOperator(operator.to_string()));
        }

        let mut arg_types = Vec::with_capacity(operands.len());
        for operand in operands {
            let operand_type = self
                .session
                .artifact(operand.id)
                .filter(|artifact| artifact.succeeded)
                .map(|artifact| artifact.pin_type);
            match operand_type {
                Some(pin_type) => arg_types.push(pin_type),
                None => return self.error(node, GenerationError::OperandFailed(operator.to_string())),
            }
        }

        let resolved = self
            .session
            .operators
            .get(operator)
            .and_then(|candidates| find_matching_function(candidates, &arg_types))
            .copied();
        let Some(function) = resolved else {
            return self.error(
                node,
                GenerationError::NoMatchingOverload {
                    operator: operator.to_string(),
                    arg_types,
                },
            );
        };
        let Some(return_type) = function.return_type else {
            return self.error(node, GenerationError::MissingReturnValue(function.name.to_string()));
        };
        tracing::debug!("[PMEC] '{}' resolved to {}", operator, function.name);

        let position = self.node_position(node.id);
        let call = self.host.spawn_node(&NodeTemplate::CallFunction { function }, position);

        let mut failures = Vec::new();
        for (index, input) in self.host.input_pins(call).into_iter().enumerate() {
            let Some(operand) = operands.get(index) else {
                failures.push(GenerationError::TooManyPins(function.name.to_string()));
                continue;
            };
            if let Some(artifact) = self.session.artifacts.get_mut(&operand.id) {
                if let Err(err) = artifact.connect_to(&mut *self.host, input) {
                    failures.push(err);
                }
            }
        }
        for err in failures {
            self.error(node, err);
        }

        let source = ArtifactSource::FunctionCall {
            node: call,
            function: function.name,
        };
        self.emit(node, CompiledArtifact::new(source, return_type));
    }

    /// Connect the root artifact to the exit tunnel's return pin
    ///
    /// The return pin never keeps a link from an earlier compile: it is
    /// either recreated, or cleared before the new root is connected.
    fn wire_root(&mut self, root: &Expr) {
        let pin_name = self.options.return_pin_name.as_str();
        let old_pin = self.host.find_exit_pin(pin_name);
        if let Some(pin) = old_pin {
            self.host.break_pin_links(pin);
        }

        let Some(root_type) = self.session.artifact(root.id).map(|a| a.pin_type) else {
            tracing::info!("[PMEC] No result to wire");
            return;
        };

        let return_pin = match old_pin {
            Some(pin) if self.host.pin_type(pin) == Some(root_type) => pin,
            Some(_) => {
                self.host.remove_exit_pins();
                self.host.create_exit_pin(pin_name, root_type)
            }
            None => self.host.create_exit_pin(pin_name, root_type),
        };

        let result = match self.session.artifacts.get_mut(&root.id) {
            Some(artifact) => artifact.connect_to(&mut *self.host, return_pin),
            None => Ok(()),
        };
        if let Err(err) = result {
            self.error(root, err);
        }
    }
}

impl ExpressionVisitor for GraphCodeGenerator<'_> {
    fn visit(&mut self, node: &Expr, phase: VisitPhase) {
        if phase == VisitPhase::Pre {
            return;
        }

        match &node.kind {
            ExprKind::Leaf(token) => self.visit_leaf(node, token),
            ExprKind::Binary { operator, lhs, rhs } => self.visit_operator(node, operator, &[&**lhs, &**rhs]),
            ExprKind::Unary { operator, operand } if operator == "+" => {
                // Identity: the operand's value is the result
                match self.session.artifact(operand.id).cloned() {
                    Some(artifact) => self.emit(node, artifact),
                    None => self.error(node, GenerationError::OperandFailed(operator.clone())),
                }
            }
            ExprKind::Unary { operator, operand } => self.visit_operator(node, operator, &[&**operand]),
            ExprKind::Conditional {
                condition,
                true_part,
                false_part,
            } => self.visit_operator(node, CONDITIONAL_OPERATOR, &[&**condition, &**true_part, &**false_part]),
            ExprKind::Cast { .. } => self.error(node, GenerationError::Unsupported("casts")),
            ExprKind::List(_) => self.error(node, GenerationError::Unsupported("expression lists")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ExpressionGraph, NodeRole};
    use crate::metadata::MathLibraryMetadataProvider;
    use crate::parser::parse_expression;

    fn generate(source: &str, graph: &mut ExpressionGraph) -> (Expr, CompileSession) {
        let options = CompilerOptions::default();
        let expr = parse_expression(source).unwrap();
        let operators = OperatorTable::build(&MathLibraryMetadataProvider::new());
        let session = GraphCodeGenerator::new(graph, &options, operators).generate(&expr);
        (expr, session)
    }

    fn node_types(graph: &ExpressionGraph) -> Vec<String> {
        let mut types: Vec<_> = graph.generated_nodes().map(|n| n.node_type.clone()).collect();
        types.sort();
        types
    }

    #[test]
    fn literal_operands_become_pin_defaults() {
        let mut graph = ExpressionGraph::new("test");
        let (expr, session) = generate("1 + 2", &mut graph);

        assert!(!session.had_errors, "{:?}", session.last_error);
        assert_eq!(node_types(&graph), vec!["Add_IntInt"]);
        let root = session.artifact(expr.id).unwrap();
        assert_eq!(root.pin_type, PinType::Int);

        let call = root.graph_node().unwrap();
        let defaults: Vec<_> = graph
            .node(call)
            .unwrap()
            .pins
            .iter()
            .filter_map(|p| graph.pin(*p).unwrap().default_value.clone())
            .collect();
        assert_eq!(defaults, vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn variables_are_read_through_getter_nodes() {
        let mut graph = ExpressionGraph::new("test").with_variable("Speed", PinType::Float);
        let (_, session) = generate("Speed * 2.5", &mut graph);

        assert!(!session.had_errors, "{:?}", session.last_error);
        assert_eq!(node_types(&graph), vec!["Multiply_FloatFloat", "get_Speed"]);
        assert!(graph.find_entry_pin("Speed").is_none());
    }

    #[test]
    fn inaccessible_and_untyped_variables_are_errors() {
        let mut graph = ExpressionGraph::new("test");
        graph.add_variable("Secret", Some(PinType::Int), false);
        graph.add_variable("Mesh", None, true);

        let (_, session) = generate("Secret", &mut graph);
        assert_eq!(session.last_error.as_deref(), Some("inaccessible variable 'Secret'"));

        let (_, session) = generate("Mesh", &mut graph);
        assert!(session.had_errors);
        assert!(session.last_error.unwrap().contains("Mesh"));
    }

    #[test]
    fn unknown_identifiers_declare_float_inputs_once() {
        let mut graph = ExpressionGraph::new("test");
        let (_, session) = generate("x * x + y", &mut graph);

        assert!(!session.had_errors, "{:?}", session.last_error);
        let entry = graph.entry_node().unwrap();
        assert_eq!(entry.pins.len(), 2);
        assert_eq!(graph.pin_type(graph.find_entry_pin("x").unwrap()), Some(PinType::Float));
    }

    #[test]
    fn existing_input_keeps_its_type() {
        let mut graph = ExpressionGraph::new("test");
        graph.create_entry_pin("n", PinType::Int);
        let (expr, session) = generate("n << 2", &mut graph);

        assert!(!session.had_errors, "{:?}", session.last_error);
        assert_eq!(session.artifact(expr.id).unwrap().pin_type, PinType::Int);
        assert_eq!(node_types(&graph), vec!["LeftShift_IntInt"]);
    }

    #[test]
    fn mixed_operands_are_promoted() {
        let mut graph = ExpressionGraph::new("test");
        graph.create_entry_pin("n", PinType::Int);
        let (expr, session) = generate("n + 0.5", &mut graph);

        assert!(!session.had_errors, "{:?}", session.last_error);
        assert_eq!(node_types(&graph), vec!["Add_FloatFloat"]);
        assert_eq!(session.artifact(expr.id).unwrap().pin_type, PinType::Float);
    }

    #[test]
    fn unary_and_conditional_operators() {
        let mut graph = ExpressionGraph::new("test");
        let (expr, session) = generate("c > 0 ? -a : +b", &mut graph);

        assert!(!session.had_errors, "{:?}", session.last_error);
        assert_eq!(
            node_types(&graph),
            vec!["Greater_FloatFloat", "Negate_Float", "SelectFloat"]
        );
        assert_eq!(session.artifact(expr.id).unwrap().pin_type, PinType::Float);
    }

    #[test]
    fn failed_operand_fails_its_parent() {
        let mut graph = ExpressionGraph::new("test");
        let (expr, session) = generate("(true + 1) * 2", &mut graph);

        assert!(session.had_errors);
        assert!(session.artifact(expr.id).is_none());
        assert_eq!(session.last_error.as_deref(), Some("an operand of '*' had an error"));
        assert!(graph.find_exit_pin("ReturnValue").is_none());
    }

    #[test]
    fn root_is_wired_to_return_pin() {
        let mut graph = ExpressionGraph::new("test");
        let (expr, session) = generate("a < b", &mut graph);

        let return_pin = graph.find_exit_pin("ReturnValue").unwrap();
        assert_eq!(graph.pin_type(return_pin), Some(PinType::Boolean));
        let call = session.artifact(expr.id).unwrap().graph_node().unwrap();
        let output = graph.find_output_pin(call, "ReturnValue").unwrap();
        assert_eq!(graph.links_into(return_pin), vec![output]);
    }

    #[test]
    fn layout_places_root_right_of_operands() {
        let mut graph = ExpressionGraph::new("test");
        let (_, _) = generate("(a + b) * (c - d)", &mut graph);

        let position_of = |node_type: &str| {
            graph
                .generated_nodes()
                .find(|n| n.node_type == node_type)
                .map(|n| n.position)
                .unwrap()
        };
        let root = position_of("Multiply_FloatFloat");
        let add = position_of("Add_FloatFloat");
        let sub = position_of("Subtract_FloatFloat");

        assert_eq!(root, Position::new(480.0, 0.0));
        assert_eq!(add, Position::new(240.0, -70.0));
        assert_eq!(sub, Position::new(240.0, 70.0));

        let exit = graph.exit_node().unwrap();
        assert_eq!(exit.role, NodeRole::Exit);
        assert_eq!(exit.position, Position::new(720.0, 0.0));
    }
}
