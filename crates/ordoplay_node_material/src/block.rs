// SPDX-License-Identifier: MIT OR Apache-2.0
//! Blocks: named units of computation with ordered input and output ports.

use crate::blocks::BlockKind;
use crate::build_state::NodeMaterialBuildState;
use crate::error::{BuildError, GraphError};
use crate::port::{ConnectionPoint, PortRegistrar};
use crate::types::{BlockTarget, ConnectionPointType, Stage};
use crate::value::ShaderValue;
use serde::{Deserialize, Serialize};

/// Arena handle of a block inside a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u32);

/// Behaviour shared by every concrete block
pub trait ShaderBlock {
    /// Stage(s) the block may run in
    fn target(&self) -> BlockTarget {
        BlockTarget::Neutral
    }

    /// Whether the block writes a stage output (terminal block)
    fn is_final_merger(&self) -> bool {
        false
    }

    /// Declare ports, type links and exclusions
    fn register_ports(&self, ports: &mut PortRegistrar);

    /// Emit the block's code into the build state.
    ///
    /// Every block feeding this one has already been built in the current
    /// stage when this is called.
    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError>;
}

/// A block instance in a material
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    id: BlockId,
    /// Block name, used to derive GLSL identifiers
    pub name: String,
    /// Optional comment written above the block's code
    pub comments: Option<String>,
    kind: BlockKind,
    inputs: Vec<ConnectionPoint>,
    outputs: Vec<ConnectionPoint>,
}

impl Block {
    /// Create a block and register its ports
    pub(crate) fn new(id: BlockId, name: impl Into<String>, kind: BlockKind) -> Self {
        let mut registrar = PortRegistrar::new();
        kind.shader_block().register_ports(&mut registrar);
        let (inputs, outputs) = registrar.finish();
        Self {
            id,
            name: name.into(),
            comments: None,
            kind,
            inputs,
            outputs,
        }
    }

    /// Arena handle
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Concrete block data
    pub fn kind(&self) -> &BlockKind {
        &self.kind
    }

    /// Mutable block data.
    ///
    /// Ports are laid out when the block is created; only literal
    /// properties (clamp bounds, wave kind, ...) should be changed here.
    pub fn kind_mut(&mut self) -> &mut BlockKind {
        &mut self.kind
    }

    /// Serialization key
    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    /// Stage(s) the block may run in
    pub fn target(&self) -> BlockTarget {
        self.kind.shader_block().target()
    }

    /// Whether the block writes a stage output
    pub fn is_final_merger(&self) -> bool {
        self.kind.shader_block().is_final_merger()
    }

    /// Input ports in declaration order
    pub fn inputs(&self) -> &[ConnectionPoint] {
        &self.inputs
    }

    /// Output ports in declaration order
    pub fn outputs(&self) -> &[ConnectionPoint] {
        &self.outputs
    }

    /// Index of an input by name
    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|p| p.name == name)
    }

    /// Index of an output by name
    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|p| p.name == name)
    }

    /// Input port by name
    pub fn input(&self, name: &str) -> Option<&ConnectionPoint> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Output port by name
    pub fn output(&self, name: &str) -> Option<&ConnectionPoint> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Set or clear the literal used when an input is unconnected
    pub fn set_input_default(
        &mut self,
        input: &str,
        value: Option<ShaderValue>,
    ) -> Result<(), GraphError> {
        let block = self.name.clone();
        let port = self
            .inputs
            .iter_mut()
            .find(|p| p.name == input)
            .ok_or_else(|| GraphError::PortNotFound {
                block,
                port: input.to_string(),
            })?;
        port.set_default_value(value);
        Ok(())
    }

    pub(crate) fn input_mut(&mut self, index: usize) -> Option<&mut ConnectionPoint> {
        self.inputs.get_mut(index)
    }

    pub(crate) fn output_mut(&mut self, index: usize) -> Option<&mut ConnectionPoint> {
        self.outputs.get_mut(index)
    }

    pub(crate) fn clear_links(&mut self) {
        for port in self.inputs.iter_mut().chain(self.outputs.iter_mut()) {
            port.clear_links();
        }
    }
}

/// Value read by an input during a build
#[derive(Debug, Clone, PartialEq)]
pub struct InputBinding {
    /// GLSL expression (variable, varying or literal)
    pub expr: String,
    /// Resolved type
    pub ty: ConnectionPointType,
    /// Whether the value comes from a connection rather than a default
    pub connected: bool,
}

/// Variable written by an output during a build
#[derive(Debug, Clone, PartialEq)]
pub struct OutputBinding {
    /// GLSL identifier
    pub name: String,
    /// Resolved type
    pub ty: ConnectionPointType,
    /// Whether anything consumes the output
    pub has_endpoints: bool,
}

/// What a block sees of the graph while it builds
#[derive(Debug)]
pub struct BlockBuildContext<'a> {
    block: &'a Block,
    stage: Stage,
    inputs: Vec<Option<InputBinding>>,
    outputs: Vec<OutputBinding>,
}

impl<'a> BlockBuildContext<'a> {
    /// Create a context; bindings follow the block's port order
    pub fn new(
        block: &'a Block,
        stage: Stage,
        inputs: Vec<Option<InputBinding>>,
        outputs: Vec<OutputBinding>,
    ) -> Self {
        Self {
            block,
            stage,
            inputs,
            outputs,
        }
    }

    /// The block being built
    pub fn block(&self) -> &Block {
        self.block
    }

    /// Name of the block being built
    pub fn name(&self) -> &str {
        &self.block.name
    }

    /// Stage being built
    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn input_binding(&self, name: &str) -> Result<Option<&InputBinding>, BuildError> {
        let index = self
            .block
            .input_index(name)
            .ok_or_else(|| self.unknown_port(name))?;
        Ok(self.inputs.get(index).and_then(Option::as_ref))
    }

    fn output_binding(&self, name: &str) -> Result<&OutputBinding, BuildError> {
        self.block
            .output_index(name)
            .and_then(|index| self.outputs.get(index))
            .ok_or_else(|| self.unknown_port(name))
    }

    fn unknown_port(&self, name: &str) -> BuildError {
        BuildError::UnknownPort {
            block: self.block.name.clone(),
            port: name.to_string(),
        }
    }

    /// Expression for a required input
    pub fn input(&self, name: &str) -> Result<&str, BuildError> {
        self.input_binding(name)?
            .map(|b| b.expr.as_str())
            .ok_or_else(|| BuildError::VariableNotBuilt {
                block: self.block.name.clone(),
                port: name.to_string(),
            })
    }

    /// Expression for an optional input, `None` when it has no value
    pub fn try_input(&self, name: &str) -> Option<&str> {
        self.input_binding(name)
            .ok()
            .flatten()
            .map(|b| b.expr.as_str())
    }

    /// Resolved type of an input that has a value
    pub fn input_type(&self, name: &str) -> Option<ConnectionPointType> {
        self.input_binding(name).ok().flatten().map(|b| b.ty)
    }

    /// Whether an input is fed by a connection
    pub fn is_connected(&self, name: &str) -> bool {
        self.input_binding(name)
            .ok()
            .flatten()
            .is_some_and(|b| b.connected)
    }

    /// Variable name of an output
    pub fn output(&self, name: &str) -> Result<&str, BuildError> {
        Ok(self.output_binding(name)?.name.as_str())
    }

    /// Resolved type of an output
    pub fn output_type(&self, name: &str) -> Result<ConnectionPointType, BuildError> {
        Ok(self.output_binding(name)?.ty)
    }

    /// Whether anything consumes an output
    pub fn has_endpoints(&self, name: &str) -> bool {
        self.output_binding(name).is_ok_and(|b| b.has_endpoints)
    }

    /// Declaration text for an output, see
    /// [`NodeMaterialBuildState::declare_output`]
    pub fn declare_output(
        &self,
        name: &str,
        state: &mut NodeMaterialBuildState,
    ) -> Result<String, BuildError> {
        let binding = self.output_binding(name)?;
        let gl_type = binding
            .ty
            .gl_type()
            .ok_or_else(|| BuildError::UnresolvedType {
                block: self.block.name.clone(),
                port: name.to_string(),
            })?;
        Ok(state.declare_output(&binding.name, gl_type))
    }

    /// Error for an input type combination the block cannot emit
    pub fn unsupported(&self, detail: impl Into<String>) -> BuildError {
        BuildError::UnsupportedTypes {
            block: self.block.name.clone(),
            detail: detail.into(),
        }
    }

    /// Error for an invalid input wiring
    pub fn invalid_inputs(&self, detail: impl Into<String>) -> BuildError {
        BuildError::InvalidBlockInputs {
            block: self.block.name.clone(),
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{AddBlock, ClampBlock};

    #[test]
    fn test_block_ports() {
        let block = Block::new(BlockId(0), "add", AddBlock {}.into());
        assert_eq!(block.class_name(), "AddBlock");
        assert_eq!(block.inputs().len(), 2);
        assert_eq!(block.outputs().len(), 1);
        assert_eq!(block.input_index("right"), Some(1));
        assert!(block.output("output").is_some());
        assert_eq!(block.target(), BlockTarget::Neutral);
    }

    #[test]
    fn test_set_input_default() {
        let mut block = Block::new(BlockId(0), "add", AddBlock {}.into());
        block
            .set_input_default("left", Some(ShaderValue::Float(2.0)))
            .unwrap();
        assert_eq!(
            block.input("left").unwrap().default_value(),
            Some(&ShaderValue::Float(2.0))
        );
        assert!(block.set_input_default("nope", None).is_err());
    }

    #[test]
    fn test_context_lookups() {
        let block = Block::new(BlockId(1), "clamp", ClampBlock::default().into());
        let ctx = BlockBuildContext::new(
            &block,
            Stage::Fragment,
            vec![Some(InputBinding {
                expr: "x".into(),
                ty: ConnectionPointType::Float,
                connected: true,
            })],
            vec![OutputBinding {
                name: "clamp".into(),
                ty: ConnectionPointType::Float,
                has_endpoints: true,
            }],
        );

        assert_eq!(ctx.input("value").unwrap(), "x");
        assert!(ctx.is_connected("value"));
        assert_eq!(ctx.output("output").unwrap(), "clamp");
        assert!(matches!(
            ctx.input("missing"),
            Err(BuildError::UnknownPort { .. })
        ));
    }
}
