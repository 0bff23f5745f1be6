//! # Operator Resolution
//!
//! Maps an operator symbol plus operand types to a concrete library function.
//!
//! Candidates keep their declaration order and the first structural match
//! wins. When nothing matches, operand types are widened by each promotion
//! rule in turn (byte to int, then int to float) and the lookup is retried.

use crate::metadata::{FunctionMetadata, FunctionMetadataProvider, PinType};
use std::collections::HashMap;

/// Registry names whose operator is not their compact title
const OPERATOR_FIXUPS: &[(&str, &str)] = &[
    ("BooleanAND", "&&"),
    ("BooleanOR", "||"),
    ("BooleanXOR", "^"),
    ("Not_PreBool", "!"),
];

/// A widening conversion; `None` when the rule does not apply
pub type TypePromotion = fn(PinType) -> Option<PinType>;

pub fn promote_byte_to_int(pin_type: PinType) -> Option<PinType> {
    (pin_type == PinType::Byte).then_some(PinType::Int)
}

pub fn promote_int_to_float(pin_type: PinType) -> Option<PinType> {
    (pin_type == PinType::Int).then_some(PinType::Float)
}

/// Promotion passes, tried in order
pub const TYPE_PROMOTION_ORDER: &[TypePromotion] = &[promote_byte_to_int, promote_int_to_float];

/// Overloads registered under one operator symbol
#[derive(Debug, Clone, Default)]
pub struct OperatorCandidates {
    functions: Vec<FunctionMetadata>,
}

impl OperatorCandidates {
    pub fn functions(&self) -> &[FunctionMetadata] {
        &self.functions
    }

    /// First candidate whose parameters accept `arg_types` exactly, in order
    pub fn find_function(&self, arg_types: &[PinType]) -> Option<&FunctionMetadata> {
        self.functions.iter().find(|function| {
            function.params.len() == arg_types.len()
                && arg_types
                    .iter()
                    .zip(function.param_types())
                    .all(|(arg, param)| arg.is_compatible_with(param))
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct OperatorTable {
    operators: HashMap<String, OperatorCandidates>,
}

impl OperatorTable {
    /// Collect every pure, operator-tagged function that returns a value
    pub fn build(provider: &dyn FunctionMetadataProvider) -> Self {
        let mut table = Self::default();

        for function in provider.functions() {
            let Some(title) = function.compact_title else {
                continue;
            };
            if !function.pure || function.return_type.is_none() {
                continue;
            }

            let operator = OPERATOR_FIXUPS
                .iter()
                .find(|(name, _)| *name == function.name)
                .map(|(_, operator)| *operator)
                .unwrap_or(title);
            table.insert(operator, *function);
        }

        tracing::debug!("[PMEC] Operator table holds {} operators", table.operators.len());
        table
    }

    /// Register one more overload after the existing ones
    pub fn insert(&mut self, operator: &str, function: FunctionMetadata) {
        self.operators
            .entry(operator.to_string())
            .or_default()
            .functions
            .push(function);
    }

    pub fn get(&self, operator: &str) -> Option<&OperatorCandidates> {
        self.operators.get(operator)
    }

    pub fn contains(&self, operator: &str) -> bool {
        self.operators.contains_key(operator)
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

/// Resolve against `candidates`, widening operand types when no exact match exists
pub fn find_matching_function<'t>(
    candidates: &'t OperatorCandidates,
    source_types: &[PinType],
) -> Option<&'t FunctionMetadata> {
    if let Some(function) = candidates.find_function(source_types) {
        return Some(function);
    }

    let mut types = source_types.to_vec();
    for promote in TYPE_PROMOTION_ORDER {
        let mut changed = false;
        for slot in types.iter_mut() {
            if let Some(promoted) = promote(*slot) {
                *slot = promoted;
                changed = true;
            }
        }

        if changed {
            if let Some(function) = candidates.find_function(&types) {
                return Some(function);
            }
        }
    }

    None
}
