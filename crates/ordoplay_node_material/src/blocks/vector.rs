// SPDX-License-Identifier: MIT OR Apache-2.0
//! Geometric vector blocks.

use crate::block::{BlockBuildContext, ShaderBlock};
use crate::build_state::NodeMaterialBuildState;
use crate::error::BuildError;
use crate::port::PortRegistrar;
use crate::types::ConnectionPointType::{
    AutoDetect, BasedOnInput, Color3, Color4, Float, Int, Matrix, Vector2, Vector3,
    Vector3OrVector4, Vector4,
};
use crate::value::write_float;
use serde::{Deserialize, Serialize};

fn register_linked_vectors(ports: &mut PortRegistrar, output: crate::types::ConnectionPointType) {
    ports.register_input("left", AutoDetect, false).exclude(&[Matrix]);
    ports.register_input("right", AutoDetect, false).exclude(&[Matrix]);
    ports.register_output("output", output);
    ports.link_connection_types("left", "right");
}

/// `dot(left, right)`, always a float
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DotBlock {}

impl ShaderBlock for DotBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        register_linked_vectors(ports, Float);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        let output = ctx.declare_output("output", state)?;
        let left = ctx.input("left")?;
        let right = ctx.input("right")?;
        state.emit_line(format!("{output} = dot({left}, {right});"));
        Ok(())
    }
}

/// `cross(left, right)`; both operands must be 3 component vectors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossBlock {}

impl ShaderBlock for CrossBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("left", AutoDetect, false).exclude(&[Float, Int, Matrix]);
        ports.register_input("right", AutoDetect, false).exclude(&[Float, Int, Matrix]);
        ports.register_output("output", Vector3);
        ports.link_connection_types("left", "right");
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        for operand in ["left", "right"] {
            match ctx.input_type(operand) {
                Some(Vector3 | Color3) => {}
                Some(other) => {
                    return Err(ctx.unsupported(format!("{other} as the {operand} cross operand")))
                }
                None => {}
            }
        }
        let output = ctx.declare_output("output", state)?;
        let left = ctx.input("left")?;
        let right = ctx.input("right")?;
        state.emit_line(format!("{output} = cross({left}, {right});"));
        Ok(())
    }
}

/// `length(left - right)`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistanceBlock {}

impl ShaderBlock for DistanceBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        register_linked_vectors(ports, Float);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        let output = ctx.declare_output("output", state)?;
        let left = ctx.input("left")?;
        let right = ctx.input("right")?;
        state.emit_line(format!("{output} = length({left} - {right});"));
        Ok(())
    }
}

/// `length(value)`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LengthBlock {}

impl ShaderBlock for LengthBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("value", AutoDetect, false).exclude(&[Matrix]);
        ports.register_output("output", Float);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        let output = ctx.declare_output("output", state)?;
        let value = ctx.input("value")?;
        state.emit_line(format!("{output} = length({value});"));
        Ok(())
    }
}

/// `normalize(input)`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizeBlock {}

impl ShaderBlock for NormalizeBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("input", AutoDetect, false).exclude(&[Float, Int, Matrix]);
        ports.register_output("output", BasedOnInput);
        ports.set_type_connection_source("output", "input");
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        let output = ctx.declare_output("output", state)?;
        let input = ctx.input("input")?;
        state.emit_line(format!("{output} = normalize({input});"));
        Ok(())
    }
}

/// Reflects the incident vector around the normal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReflectBlock {}

impl ShaderBlock for ReflectBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("incident", Vector3OrVector4, false);
        ports.register_input("normal", Vector3OrVector4, false);
        ports.register_output("output", Vector3);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        let output = ctx.declare_output("output", state)?;
        let incident = ctx.input("incident")?;
        let normal = ctx.input("normal")?;
        state.emit_line(format!(
            "{output} = reflect({incident}.xyz, {normal}.xyz);"
        ));
        Ok(())
    }
}

/// Refracts the incident vector through a surface with index ratio `ior`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefractBlock {}

impl ShaderBlock for RefractBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("incident", Vector3OrVector4, false);
        ports.register_input("normal", Vector3OrVector4, false);
        ports.register_input("ior", Float, false);
        ports.register_output("output", Vector3);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        let output = ctx.declare_output("output", state)?;
        let incident = ctx.input("incident")?;
        let normal = ctx.input("normal")?;
        let ior = ctx.input("ior")?;
        state.emit_line(format!(
            "{output} = refract({incident}.xyz, {normal}.xyz, {ior});"
        ));
        Ok(())
    }
}

/// Rotates a 2D vector by an angle in radians
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotate2dBlock {}

impl ShaderBlock for Rotate2dBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("input", Vector2, false);
        ports.register_input("angle", Float, false);
        ports.register_output("output", Vector2);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        let input = ctx.input("input")?;
        let angle = ctx.input("angle")?;
        let cos_angle = state.shared.free_variable_name("cosAngle");
        let sin_angle = state.shared.free_variable_name("sinAngle");
        state.emit_line(format!("float {cos_angle} = cos({angle});"));
        state.emit_line(format!("float {sin_angle} = sin({angle});"));

        let output = ctx.declare_output("output", state)?;
        state.emit_line(format!(
            "{output} = vec2({cos_angle} * {input}.x + {sin_angle} * {input}.y, \
             -{sin_angle} * {input}.x + {cos_angle} * {input}.y);"
        ));
        Ok(())
    }
}

/// Multiplies a vector by a matrix, completing it to 4 components first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformBlock {
    /// `w` used when the vector has fewer than 4 components
    #[serde(serialize_with = "crate::value::serialize_finite")]
    pub complement_w: f32,
    /// `z` used when the vector has 2 components
    #[serde(serialize_with = "crate::value::serialize_finite")]
    pub complement_z: f32,
}

impl Default for TransformBlock {
    fn default() -> Self {
        Self {
            complement_w: 1.0,
            complement_z: 0.0,
        }
    }
}

impl ShaderBlock for TransformBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("vector", AutoDetect, false).exclude(&[Float, Int, Matrix]);
        ports.register_input("transform", Matrix, false);
        ports.register_output("output", Vector4);
        ports.register_output("xyz", Vector3);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        let vector = ctx.input("vector")?;
        let transform = ctx.input("transform")?;
        let w = write_float(self.complement_w);
        let z = write_float(self.complement_z);
        let expression = match ctx.input_type("vector") {
            Some(Vector2) => format!("{transform} * vec4({vector}, {z}, {w})"),
            Some(Vector3 | Color3) => format!("{transform} * vec4({vector}, {w})"),
            Some(Vector4 | Color4) => format!("{transform} * {vector}"),
            Some(other) => return Err(ctx.unsupported(format!("transforming a {other}"))),
            None => return Err(ctx.unsupported("an untyped vector")),
        };

        let output = ctx.declare_output("output", state)?;
        state.emit_line(format!("{output} = {expression};"));

        if ctx.has_endpoints("xyz") {
            let name = ctx.output("output")?;
            let xyz = ctx.declare_output("xyz", state)?;
            state.emit_line(format!("{xyz} = {name}.xyz;"));
        }
        Ok(())
    }
}

/// Normalized direction from a world position towards the camera
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewDirectionBlock {}

impl ShaderBlock for ViewDirectionBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("worldPosition", Vector4, false);
        ports.register_input("cameraPosition", Vector3, false);
        ports.register_output("output", Vector3);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        let output = ctx.declare_output("output", state)?;
        let world = ctx.input("worldPosition")?;
        let camera = ctx.input("cameraPosition")?;
        state.emit_line(format!("{output} = normalize({camera} - {world}.xyz);"));
        Ok(())
    }
}
