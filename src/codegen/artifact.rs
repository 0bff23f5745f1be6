//! # Compiled Artifacts
//!
//! What code generation produced for one AST node, and how to feed that
//! value into an input pin of whichever node consumes it.

use crate::error::GenerationError;
use crate::host::{GraphNodeId, HostGraph, PinId, RETURN_VALUE_PIN};
use crate::metadata::PinType;

#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactSource {
    /// A spawned variable read node
    VariableGet { node: GraphNodeId, variable: String },
    /// A spawned function call node
    FunctionCall { node: GraphNodeId, function: &'static str },
    /// A constant written straight into the consumer's pin default
    Literal { default_value: String },
    /// An entry tunnel pin
    InputPin { pin: PinId },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledArtifact {
    pub source: ArtifactSource,
    pub pin_type: PinType,
    /// Cleared once feeding a consumer has failed
    pub succeeded: bool,
    /// Most recent connection failure
    pub error_message: Option<String>,
}

impl CompiledArtifact {
    pub fn new(source: ArtifactSource, pin_type: PinType) -> Self {
        Self {
            source,
            pin_type,
            succeeded: true,
            error_message: None,
        }
    }

    /// Host node spawned for this artifact, if any
    pub fn graph_node(&self) -> Option<GraphNodeId> {
        match &self.source {
            ArtifactSource::VariableGet { node, .. } | ArtifactSource::FunctionCall { node, .. } => Some(*node),
            ArtifactSource::Literal { .. } | ArtifactSource::InputPin { .. } => None,
        }
    }

    /// Feed this artifact's value into `input`
    pub fn connect_to(&mut self, host: &mut dyn HostGraph, input: PinId) -> Result<(), GenerationError> {
        let result = match &self.source {
            ArtifactSource::VariableGet { node, variable } => match host.find_output_pin(*node, variable) {
                Some(output) => self.safe_connect(host, output, input),
                None => Err(GenerationError::MissingOutputPin(variable.clone())),
            },
            ArtifactSource::FunctionCall { node, .. } => match host.find_output_pin(*node, RETURN_VALUE_PIN) {
                Some(output) => self.safe_connect(host, output, input),
                None => Err(GenerationError::MissingOutputPin(RETURN_VALUE_PIN.to_string())),
            },
            ArtifactSource::Literal { default_value } => match host.pin_type(input) {
                Some(pin_type) if self.pin_type.is_convertible_to(pin_type) => {
                    host.set_pin_default_value(input, default_value);
                    Ok(())
                }
                _ => Err(self.incompatible(host, input)),
            },
            ArtifactSource::InputPin { pin } => self.safe_connect(host, *pin, input),
        };

        if let Err(err) = &result {
            self.succeeded = false;
            self.error_message = Some(err.to_string());
        }
        result
    }

    fn safe_connect(&self, host: &mut dyn HostGraph, output: PinId, input: PinId) -> Result<(), GenerationError> {
        if host.try_create_connection(output, input) {
            Ok(())
        } else {
            Err(self.incompatible(host, input))
        }
    }

    fn incompatible(&self, host: &dyn HostGraph, input: PinId) -> GenerationError {
        GenerationError::IncompatibleConnection {
            source_type: self.pin_type,
            pin: host.pin_name(input).unwrap_or_default(),
            pin_type: host.pin_type(input).unwrap_or(self.pin_type),
        }
    }
}
