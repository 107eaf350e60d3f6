// SPDX-License-Identifier: MIT OR Apache-2.0
//! Input block: uniforms, inlined constants, vertex attributes and system values.

use crate::block::{BlockBuildContext, ShaderBlock};
use crate::build_state::{NodeMaterialBuildState, SharedBuildData};
use crate::error::BuildError;
use crate::port::PortRegistrar;
use crate::types::{BlockTarget, ConnectionPointType};
use crate::value::ShaderValue;
use serde::{Deserialize, Serialize};

/// Values the renderer provides for every draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemValue {
    /// Model matrix
    World,
    /// Camera view matrix
    View,
    /// Projection matrix
    Projection,
    /// View × projection
    ViewProjection,
    /// World × view
    WorldView,
    /// World × view × projection
    WorldViewProjection,
    /// Camera position in world space
    CameraPosition,
    /// Scene fog color
    FogColor,
}

impl SystemValue {
    /// Type of the value
    pub fn connection_type(self) -> ConnectionPointType {
        match self {
            Self::CameraPosition => ConnectionPointType::Vector3,
            Self::FogColor => ConnectionPointType::Color3,
            _ => ConnectionPointType::Matrix,
        }
    }

    /// Stem of the uniform name
    pub fn name(self) -> &'static str {
        match self {
            Self::World => "world",
            Self::View => "view",
            Self::Projection => "projection",
            Self::ViewProjection => "viewProjection",
            Self::WorldView => "worldView",
            Self::WorldViewProjection => "worldViewProjection",
            Self::CameraPosition => "cameraPosition",
            Self::FogColor => "fogColor",
        }
    }
}

/// Where an input block's value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputMode {
    /// Uniform set by the renderer, named `u_<block name>`
    Uniform,
    /// Literal inlined into every consumer
    Constant,
    /// Per-vertex attribute named after the block
    Attribute,
    /// Renderer-provided uniform
    System(SystemValue),
}

/// Feeds a value into the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputBlock {
    #[serde(rename = "type")]
    ty: ConnectionPointType,
    mode: InputMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<ShaderValue>,
}

impl InputBlock {
    /// Uniform with an initial value
    pub fn uniform(value: ShaderValue) -> Self {
        Self {
            ty: value.connection_type(),
            mode: InputMode::Uniform,
            value: Some(value),
        }
    }

    /// Uniform of a type, without an initial value
    pub fn uniform_of_type(ty: ConnectionPointType) -> Self {
        Self {
            ty,
            mode: InputMode::Uniform,
            value: None,
        }
    }

    /// Literal inlined into the generated source
    pub fn constant(value: ShaderValue) -> Self {
        Self {
            ty: value.connection_type(),
            mode: InputMode::Constant,
            value: Some(value),
        }
    }

    /// Vertex attribute
    pub fn attribute(ty: ConnectionPointType) -> Self {
        Self {
            ty,
            mode: InputMode::Attribute,
            value: None,
        }
    }

    /// Renderer-provided value
    pub fn system_value(value: SystemValue) -> Self {
        Self {
            ty: value.connection_type(),
            mode: InputMode::System(value),
            value: None,
        }
    }

    /// Output type
    pub fn ty(&self) -> ConnectionPointType {
        self.ty
    }

    /// Value source
    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Current value, for uniforms and constants
    pub fn value(&self) -> Option<&ShaderValue> {
        self.value.as_ref()
    }

    /// Replace the value; refused when the type differs from the block's
    pub fn set_value(&mut self, value: ShaderValue) -> bool {
        if value.connection_type() != self.ty {
            return false;
        }
        self.value = Some(value);
        true
    }

    /// Whether the block reads a vertex attribute
    pub fn is_attribute(&self) -> bool {
        self.mode == InputMode::Attribute
    }

    /// Identifier (or literal, for constants) consumers read
    pub(crate) fn variable_name(
        &self,
        block_name: &str,
        shared: &mut SharedBuildData,
    ) -> Result<String, BuildError> {
        match self.mode {
            InputMode::Uniform => Ok(shared.free_variable_name(&format!("u_{block_name}"))),
            InputMode::System(value) => {
                let name = format!("u_{}", value.name());
                shared
                    .reserve_variable_name(&name)
                    .ok_or_else(|| BuildError::ReservedName {
                        block: block_name.to_string(),
                        name,
                    })
            }
            InputMode::Attribute => {
                shared
                    .reserve_variable_name(block_name)
                    .ok_or_else(|| BuildError::ReservedName {
                        block: block_name.to_string(),
                        name: block_name.to_string(),
                    })
            }
            InputMode::Constant => self
                .value
                .as_ref()
                .map(ShaderValue::to_glsl)
                .ok_or_else(|| BuildError::MissingValue(block_name.to_string())),
        }
    }
}

impl ShaderBlock for InputBlock {
    fn target(&self) -> BlockTarget {
        if self.is_attribute() {
            BlockTarget::Vertex
        } else {
            BlockTarget::VertexAndFragment
        }
    }

    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_output("output", self.ty);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        if self.mode == InputMode::Constant {
            return Ok(());
        }

        let name = ctx.output("output")?;
        let gl_type = self.ty.gl_type().ok_or_else(|| BuildError::UnresolvedType {
            block: ctx.name().to_string(),
            port: "output".to_string(),
        })?;

        match self.mode {
            InputMode::Uniform => state.emit_uniform(name, gl_type),
            InputMode::Attribute => state.emit_attribute(name, gl_type)?,
            InputMode::System(value) => {
                state.emit_uniform(name, gl_type);
                match value {
                    SystemValue::WorldView => state.shared.hints.needs_world_view_matrix = true,
                    SystemValue::WorldViewProjection => {
                        state.shared.hints.needs_world_view_projection_matrix = true;
                    }
                    _ => {}
                }
            }
            InputMode::Constant => {}
        }
        Ok(())
    }
}
