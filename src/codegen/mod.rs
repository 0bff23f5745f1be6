//! # Graph Code Generation
//!
//! Turns a parsed expression into host graph nodes: operator resolution,
//! depth-based layout and the generating walk itself.

mod artifact;
mod depth;
mod graph_codegen;
mod operator_table;

pub use artifact::{ArtifactSource, CompiledArtifact};
pub use depth::{DepthChart, DepthLabeler};
pub use graph_codegen::{CompileSession, GraphCodeGenerator, CONDITIONAL_OPERATOR};
pub use operator_table::{
    find_matching_function, promote_byte_to_int, promote_int_to_float, OperatorCandidates, OperatorTable,
    TypePromotion, TYPE_PROMOTION_ORDER,
};
