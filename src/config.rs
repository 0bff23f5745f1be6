//! # Compiler Options
//!
//! Tunables for a compile session. Every field has a default, so a JSON
//! override only needs to name what it changes:
//!
//! ```rust
//! use pmec::CompilerOptions;
//!
//! let options = CompilerOptions::from_json(r#"{ "layout": { "depth_spacing": 300.0 } }"#)?;
//! assert_eq!(options.layout.depth_spacing, 300.0);
//! assert_eq!(options.layout.height_spacing, 140.0);
//! # Ok::<(), serde_json::Error>(())
//! ```

use crate::metadata::PinType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    pub limits: TokenizerLimits,
    pub layout: LayoutOptions,
    /// Type given to input pins declared for unknown identifiers
    pub default_input_type: PinType,
    /// Name of the exit pin the root of the expression is wired to
    pub return_pin_name: String,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            limits: TokenizerLimits::default(),
            layout: LayoutOptions::default(),
            default_input_type: PinType::Float,
            return_pin_name: "ReturnValue".to_string(),
        }
    }
}

impl CompilerOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Buffer sizes; a token reaching the limit is a lex error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerLimits {
    pub max_name_length: usize,
    pub max_string_length: usize,
    /// Deepest run of nested groups, prefix operators or `?:` branches the
    /// parser accepts before failing with a parse error
    pub max_nesting_depth: usize,
}

impl Default for TokenizerLimits {
    fn default() -> Self {
        Self {
            max_name_length: 1024,
            max_string_length: 1024,
            max_nesting_depth: 128,
        }
    }
}

/// Grid spacing for generated nodes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub depth_spacing: f32,
    pub height_spacing: f32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            depth_spacing: 240.0,
            height_spacing: 140.0,
        }
    }
}
