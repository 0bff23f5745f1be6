//! # Expression Compiler
//!
//! Main entry points for compiling expression text into a host graph, and
//! [`MathExpressionNode`], the graph node that owns an expression and
//! rebuilds its network whenever the text changes.

use crate::codegen::{CompileSession, CompiledArtifact, GraphCodeGenerator, OperatorTable};
use crate::config::CompilerOptions;
use crate::error::Result;
use crate::host::HostGraph;
use crate::metadata::{MathLibraryMetadataProvider, PinType};
use crate::parser::{Expr, ExprId, ExpressionParser};
use std::cell::{Cell, RefCell};

/// Outcome of a compile that got past parsing
#[derive(Debug)]
pub struct CompileReport {
    /// Fully parenthesized rendering of the parsed expression
    pub diagnostic: String,
    pub root: Expr,
    pub session: CompileSession,
}

impl CompileReport {
    pub fn had_errors(&self) -> bool {
        self.session.had_errors
    }

    /// The most recently recorded generation error
    pub fn last_error(&self) -> Option<&str> {
        self.session.last_error.as_deref()
    }

    /// Result type of the whole expression, if its root compiled
    pub fn root_type(&self) -> Option<PinType> {
        self.artifact(self.root.id).map(|artifact| artifact.pin_type)
    }

    pub fn artifact(&self, id: ExprId) -> Option<&CompiledArtifact> {
        self.session.artifact(id)
    }
}

/// Compile an expression into `host` using the default options
///
/// # Arguments
///
/// * `text` - The expression source, e.g. `"a + b * 2"`
/// * `host` - The graph that receives the generated nodes
///
/// # Returns
///
/// * `Ok(CompileReport)` - The diagnostic string and generation outcome
/// * `Err(CompileError)` - A lex or parse error; `host` is left untouched
///
/// # Examples
///
/// ```rust
/// use pmec::{compile_expression, ExpressionGraph, PinType};
///
/// let mut graph = ExpressionGraph::new("example");
/// let report = compile_expression("a + b * c", &mut graph)?;
/// assert_eq!(report.diagnostic, "(a + (b * c))");
/// assert_eq!(report.root_type(), Some(PinType::Float));
/// # Ok::<(), pmec::CompileError>(())
/// ```
pub fn compile_expression(text: &str, host: &mut dyn HostGraph) -> Result<CompileReport> {
    compile_expression_with_options(text, host, &CompilerOptions::default())
}

/// Compile an expression with explicit [`CompilerOptions`]
///
/// Previously generated nodes are removed before the new network is built,
/// so compiling the same text twice leaves a graph of the same shape.
///
/// # Arguments
///
/// * `text` - The expression source
/// * `host` - The graph that receives the generated nodes
/// * `options` - Tokenizer limits, layout spacing and pin defaults
///
/// # Returns
///
/// * `Ok(CompileReport)` - Generation ran; check `had_errors()` for node-level failures
/// * `Err(CompileError)` - A lex or parse error; `host` is left untouched
pub fn compile_expression_with_options(
    text: &str,
    host: &mut dyn HostGraph,
    options: &CompilerOptions,
) -> Result<CompileReport> {
    tracing::info!("[PMEC] Starting expression compilation");

    tracing::info!("[PMEC] Phase 1: Parsing...");
    let root = ExpressionParser::new(text, options.limits).parse()?;
    let diagnostic = root.to_string();
    tracing::info!("[PMEC]   - {} ({} nodes)", diagnostic, root.node_count());

    tracing::info!("[PMEC] Phase 2: Removing previously generated nodes...");
    host.remove_generated_nodes();

    tracing::info!("[PMEC] Phase 3: Building operator table...");
    let operators = OperatorTable::build(&MathLibraryMetadataProvider::new());
    tracing::info!("[PMEC]   - {} operators", operators.len());

    tracing::info!("[PMEC] Phase 4: Generating graph...");
    let session = GraphCodeGenerator::new(host, options, operators).generate(&root);
    host.mark_structurally_modified();

    if session.had_errors {
        tracing::warn!(
            "[PMEC] Compilation finished with errors: {}",
            session.last_error.as_deref().unwrap_or_default()
        );
    } else {
        tracing::info!("[PMEC] Compilation successful!");
    }

    Ok(CompileReport {
        diagnostic,
        root,
        session,
    })
}

/// What the node shows the user after its last rebuild
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeDiagnostics {
    pub error_message: Option<String>,
    pub has_compiler_message: bool,
    /// Diagnostic string of the last successful parse
    pub parse_results: String,
}

/// A graph node whose body is generated from an expression
///
/// All methods take `&self` so a host may call back into the node while a
/// rebuild is mutating the graph. Such nested rebuilds are skipped.
#[derive(Debug)]
pub struct MathExpressionNode {
    expression: RefCell<String>,
    options: CompilerOptions,
    compiling: Cell<bool>,
    diagnostics: RefCell<NodeDiagnostics>,
}

/// Holds the in-progress flag for the duration of one rebuild
struct CompileGuard<'a>(&'a Cell<bool>);

impl<'a> CompileGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for CompileGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl MathExpressionNode {
    pub fn new(expression: impl Into<String>) -> Self {
        Self::with_options(expression, CompilerOptions::default())
    }

    pub fn with_options(expression: impl Into<String>, options: CompilerOptions) -> Self {
        Self {
            expression: RefCell::new(expression.into()),
            options,
            compiling: Cell::new(false),
            diagnostics: RefCell::new(NodeDiagnostics::default()),
        }
    }

    pub fn expression(&self) -> String {
        self.expression.borrow().clone()
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn diagnostics(&self) -> NodeDiagnostics {
        self.diagnostics.borrow().clone()
    }

    pub fn is_compiling(&self) -> bool {
        self.compiling.get()
    }

    /// Replace the expression text and rebuild the graph from it
    pub fn set_expression(&self, text: impl Into<String>, host: &mut dyn HostGraph) -> Result<Option<CompileReport>> {
        *self.expression.borrow_mut() = text.into();
        self.rebuild_expression(host)
    }

    /// Regenerate the node network for the current expression
    ///
    /// # Returns
    ///
    /// * `Ok(Some(report))` - The graph was rebuilt
    /// * `Ok(None)` - The expression is empty, or a rebuild is already running
    /// * `Err(CompileError)` - The text failed to lex or parse; the graph is unchanged
    pub fn rebuild_expression(&self, host: &mut dyn HostGraph) -> Result<Option<CompileReport>> {
        let Some(_guard) = CompileGuard::enter(&self.compiling) else {
            tracing::debug!("[PMEC] Rebuild already in progress, ignoring nested request");
            return Ok(None);
        };

        let expression = self.expression();
        if expression.is_empty() {
            return Ok(None);
        }

        match compile_expression_with_options(&expression, host, &self.options) {
            Ok(report) => {
                *self.diagnostics.borrow_mut() = NodeDiagnostics {
                    error_message: report.last_error().map(str::to_string),
                    has_compiler_message: report.had_errors(),
                    parse_results: report.diagnostic.clone(),
                };
                Ok(Some(report))
            }
            Err(err) => {
                tracing::warn!("[PMEC] Failed to parse '{}': {}", expression, err);
                let mut diagnostics = self.diagnostics.borrow_mut();
                diagnostics.error_message = Some(err.to_string());
                diagnostics.has_compiler_message = true;
                Err(err)
            }
        }
    }
}
