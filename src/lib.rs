//! # Pulsar Math Expression Compiler (PMEC)
//!
//! Compiles a short C-like expression such as `(a + b) * 0.5 > c ? x : y`
//! into a wired network of typed math nodes inside a host graph, so a
//! formula can be typed instead of assembled node by node.
//!
//! ## Quick Start
//!
//! ```rust
//! use pmec::{compile_expression, ExpressionGraph, PinType};
//!
//! let mut graph = ExpressionGraph::new("my_expression").with_variable("Speed", PinType::Float);
//! let report = compile_expression("Speed * 2 + offset", &mut graph)?;
//!
//! assert_eq!(report.diagnostic, "((Speed * 2) + offset)");
//! assert!(!report.had_errors());
//! println!("{}", graph.to_json()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! PMEC runs a compile in phases:
//!
//! 1. **Parsing** - Tokenize and parse the text into an AST (fatal on error)
//! 2. **Clearing** - Remove nodes generated by the previous compile
//! 3. **Operator Table** - Index the math library by operator symbol
//! 4. **Layout** - Label AST depths to place nodes on a grid
//! 5. **Generation** - Post-order walk spawning and wiring nodes, then
//!    connecting the root to the exit tunnel
//!
//! Node-level failures (unknown operators, type mismatches) never abort a
//! compile. The walk completes and the most recent error is reported.

pub mod codegen;
pub mod compiler;
pub mod config;
pub mod error;
pub mod host;
pub mod metadata;
pub mod parser;

// Re-export the main compilation API
pub use compiler::{compile_expression, compile_expression_with_options, CompileReport, MathExpressionNode, NodeDiagnostics};

pub use config::{CompilerOptions, LayoutOptions, TokenizerLimits};
pub use error::{CompileError, GenerationError, LexError, LexErrorKind, ParseError, Result};
pub use host::{ExpressionGraph, GraphNodeId, HostGraph, NodeTemplate, PinId, Position, VariableInfo};
pub use metadata::{FunctionMetadata, FunctionMetadataProvider, MathLibraryMetadataProvider, PinType};
pub use parser::{parse_expression, Expr, ExprKind};
