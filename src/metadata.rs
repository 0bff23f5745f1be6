//! # Math Library Metadata
//!
//! Statically declared descriptions of the pure math functions an expression
//! can compile to. Each entry carries the flags the operator table filters on
//! (pure, has a compact operator title, has a return value) plus its ordered
//! parameter and return pin types.
//!
//! Declaration order is the overload tie-break order, so resolution is
//! deterministic.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of a value flowing along a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinType {
    Boolean,
    Byte,
    Int,
    Float,
    String,
    Vector,
}

impl PinType {
    /// Whether a value of this type can feed an input pin of type `input`
    pub fn is_compatible_with(self, input: PinType) -> bool {
        self == input
    }

    /// Whether the host can wire this type into `input`, widening numbers if needed
    pub fn is_convertible_to(self, input: PinType) -> bool {
        self == input
            || matches!(
                (self, input),
                (PinType::Byte, PinType::Int) | (PinType::Byte, PinType::Float) | (PinType::Int, PinType::Float)
            )
    }
}

impl fmt::Display for PinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PinType::Boolean => "bool",
            PinType::Byte => "byte",
            PinType::Int => "int",
            PinType::Float => "float",
            PinType::String => "string",
            PinType::Vector => "vector",
        };
        f.write_str(name)
    }
}

/// A single named parameter of a library function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamMetadata {
    pub name: &'static str,
    pub pin_type: PinType,
}

/// Description of one callable library function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionMetadata {
    pub name: &'static str,
    /// Short node title; for operator functions this is the operator symbol
    pub compact_title: Option<&'static str>,
    pub pure: bool,
    pub params: &'static [ParamMetadata],
    pub return_type: Option<PinType>,
}

impl FunctionMetadata {
    pub fn param_types(&self) -> impl Iterator<Item = PinType> + '_ {
        self.params.iter().map(|p| p.pin_type)
    }
}

/// Source of callable function descriptions
pub trait FunctionMetadataProvider {
    /// All known functions, in declaration order
    fn functions(&self) -> &[FunctionMetadata];

    fn get_function(&self, name: &str) -> Option<&FunctionMetadata> {
        self.functions().iter().find(|f| f.name == name)
    }
}

/// Provider backed by the built-in math library
#[derive(Debug, Clone, Copy, Default)]
pub struct MathLibraryMetadataProvider;

impl MathLibraryMetadataProvider {
    pub fn new() -> Self {
        Self
    }
}

impl FunctionMetadataProvider for MathLibraryMetadataProvider {
    fn functions(&self) -> &[FunctionMetadata] {
        MATH_LIBRARY
    }
}

/// Get the built-in math library
pub fn get_function_metadata() -> &'static [FunctionMetadata] {
    MATH_LIBRARY
}

macro_rules! params {
    ($($name:literal : $ty:ident),* $(,)?) => {
        &[$(ParamMetadata { name: $name, pin_type: PinType::$ty }),*]
    };
}

macro_rules! operator {
    ($name:literal, $title:literal, ($($pname:literal : $pty:ident),*) -> $ret:ident) => {
        FunctionMetadata {
            name: $name,
            compact_title: Some($title),
            pure: true,
            params: params!($($pname: $pty),*),
            return_type: Some(PinType::$ret),
        }
    };
}

static MATH_LIBRARY: &[FunctionMetadata] = &[
    // Boolean
    operator!("BooleanAND", "AND", ("A": Boolean, "B": Boolean) -> Boolean),
    operator!("BooleanOR", "OR", ("A": Boolean, "B": Boolean) -> Boolean),
    operator!("BooleanXOR", "XOR", ("A": Boolean, "B": Boolean) -> Boolean),
    operator!("Not_PreBool", "NOT", ("A": Boolean) -> Boolean),
    operator!("EqualEqual_BoolBool", "==", ("A": Boolean, "B": Boolean) -> Boolean),
    operator!("NotEqual_BoolBool", "!=", ("A": Boolean, "B": Boolean) -> Boolean),
    // Byte
    operator!("Add_ByteByte", "+", ("A": Byte, "B": Byte) -> Byte),
    operator!("Subtract_ByteByte", "-", ("A": Byte, "B": Byte) -> Byte),
    operator!("Multiply_ByteByte", "*", ("A": Byte, "B": Byte) -> Byte),
    operator!("Divide_ByteByte", "/", ("A": Byte, "B": Byte) -> Byte),
    operator!("Percent_ByteByte", "%", ("A": Byte, "B": Byte) -> Byte),
    operator!("Less_ByteByte", "<", ("A": Byte, "B": Byte) -> Boolean),
    operator!("Greater_ByteByte", ">", ("A": Byte, "B": Byte) -> Boolean),
    operator!("LessEqual_ByteByte", "<=", ("A": Byte, "B": Byte) -> Boolean),
    operator!("GreaterEqual_ByteByte", ">=", ("A": Byte, "B": Byte) -> Boolean),
    operator!("EqualEqual_ByteByte", "==", ("A": Byte, "B": Byte) -> Boolean),
    operator!("NotEqual_ByteByte", "!=", ("A": Byte, "B": Byte) -> Boolean),
    // Integer
    operator!("Add_IntInt", "+", ("A": Int, "B": Int) -> Int),
    operator!("Subtract_IntInt", "-", ("A": Int, "B": Int) -> Int),
    operator!("Multiply_IntInt", "*", ("A": Int, "B": Int) -> Int),
    operator!("Divide_IntInt", "/", ("A": Int, "B": Int) -> Int),
    operator!("Percent_IntInt", "%", ("A": Int, "B": Int) -> Int),
    operator!("Negate_Int", "-", ("A": Int) -> Int),
    operator!("Less_IntInt", "<", ("A": Int, "B": Int) -> Boolean),
    operator!("Greater_IntInt", ">", ("A": Int, "B": Int) -> Boolean),
    operator!("LessEqual_IntInt", "<=", ("A": Int, "B": Int) -> Boolean),
    operator!("GreaterEqual_IntInt", ">=", ("A": Int, "B": Int) -> Boolean),
    operator!("EqualEqual_IntInt", "==", ("A": Int, "B": Int) -> Boolean),
    operator!("NotEqual_IntInt", "!=", ("A": Int, "B": Int) -> Boolean),
    operator!("And_IntInt", "&", ("A": Int, "B": Int) -> Int),
    operator!("Or_IntInt", "|", ("A": Int, "B": Int) -> Int),
    operator!("Xor_IntInt", "^", ("A": Int, "B": Int) -> Int),
    operator!("Not_Int", "~", ("A": Int) -> Int),
    operator!("LeftShift_IntInt", "<<", ("A": Int, "B": Int) -> Int),
    operator!("RightShift_IntInt", ">>", ("A": Int, "B": Int) -> Int),
    // Float
    operator!("Add_FloatFloat", "+", ("A": Float, "B": Float) -> Float),
    operator!("Subtract_FloatFloat", "-", ("A": Float, "B": Float) -> Float),
    operator!("Multiply_FloatFloat", "*", ("A": Float, "B": Float) -> Float),
    operator!("Divide_FloatFloat", "/", ("A": Float, "B": Float) -> Float),
    operator!("Percent_FloatFloat", "%", ("A": Float, "B": Float) -> Float),
    operator!("Negate_Float", "-", ("A": Float) -> Float),
    operator!("Less_FloatFloat", "<", ("A": Float, "B": Float) -> Boolean),
    operator!("Greater_FloatFloat", ">", ("A": Float, "B": Float) -> Boolean),
    operator!("LessEqual_FloatFloat", "<=", ("A": Float, "B": Float) -> Boolean),
    operator!("GreaterEqual_FloatFloat", ">=", ("A": Float, "B": Float) -> Boolean),
    operator!("EqualEqual_FloatFloat", "==", ("A": Float, "B": Float) -> Boolean),
    operator!("NotEqual_FloatFloat", "!=", ("A": Float, "B": Float) -> Boolean),
    // Vector
    operator!("Add_VectorVector", "+", ("A": Vector, "B": Vector) -> Vector),
    operator!("Add_VectorFloat", "+", ("A": Vector, "B": Float) -> Vector),
    operator!("Subtract_VectorVector", "-", ("A": Vector, "B": Vector) -> Vector),
    operator!("Multiply_VectorVector", "*", ("A": Vector, "B": Vector) -> Vector),
    operator!("Multiply_VectorFloat", "*", ("A": Vector, "B": Float) -> Vector),
    operator!("Divide_VectorFloat", "/", ("A": Vector, "B": Float) -> Vector),
    operator!("EqualEqual_VectorVector", "==", ("A": Vector, "B": Vector) -> Boolean),
    operator!("NotEqual_VectorVector", "!=", ("A": Vector, "B": Vector) -> Boolean),
    // String
    operator!("EqualEqual_StrStr", "==", ("A": String, "B": String) -> Boolean),
    operator!("NotEqual_StrStr", "!=", ("A": String, "B": String) -> Boolean),
    // Selection
    operator!("SelectFloat", "?:", ("bPickA": Boolean, "A": Float, "B": Float) -> Float),
    operator!("SelectInt", "?:", ("bPickA": Boolean, "A": Int, "B": Int) -> Int),
    operator!("SelectString", "?:", ("bPickA": Boolean, "A": String, "B": String) -> String),
    operator!("SelectVector", "?:", ("bPickA": Boolean, "A": Vector, "B": Vector) -> Vector),
    // Not operator-tagged; never reachable from an expression
    FunctionMetadata {
        name: "Sqrt",
        compact_title: None,
        pure: true,
        params: params!("A": Float),
        return_type: Some(PinType::Float),
    },
    FunctionMetadata {
        name: "RandomFloat",
        compact_title: Some("RAND"),
        pure: false,
        params: params!(),
        return_type: Some(PinType::Float),
    },
    FunctionMetadata {
        name: "SeedRandomStream",
        compact_title: Some("SEED"),
        pure: true,
        params: params!("Seed": Int),
        return_type: None,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_names_are_unique() {
        let mut names: Vec<_> = get_function_metadata().iter().map(|f| f.name).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(before, names.len());
    }

    #[test]
    fn provider_finds_function_by_name() {
        let provider = MathLibraryMetadataProvider::new();
        let add = provider.get_function("Add_IntInt").expect("Add_IntInt is declared");
        assert_eq!(add.compact_title, Some("+"));
        assert_eq!(add.param_types().collect::<Vec<_>>(), vec![PinType::Int, PinType::Int]);
        assert_eq!(add.return_type, Some(PinType::Int));
    }

    #[test]
    fn pin_types_round_trip_through_json() {
        let json = serde_json::to_string(&PinType::Float).unwrap();
        assert_eq!(json, "\"float\"");
        let back: PinType = serde_json::from_str("\"vector\"").unwrap();
        assert_eq!(back, PinType::Vector);
    }

    #[test]
    fn only_numbers_widen() {
        assert!(PinType::Byte.is_convertible_to(PinType::Float));
        assert!(PinType::Int.is_convertible_to(PinType::Float));
        assert!(!PinType::Float.is_convertible_to(PinType::Int));
        assert!(!PinType::Boolean.is_convertible_to(PinType::Int));
        assert!(!PinType::Int.is_compatible_with(PinType::Float));
    }
}
