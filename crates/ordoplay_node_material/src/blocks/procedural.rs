// SPDX-License-Identifier: MIT OR Apache-2.0
//! Procedural blocks backed by shared helper functions.

use crate::block::{BlockBuildContext, ShaderBlock};
use crate::build_state::NodeMaterialBuildState;
use crate::error::BuildError;
use crate::includes::EmitFunctionFromIncludeOptions;
use crate::port::PortRegistrar;
use crate::types::ConnectionPointType::{Color3, Color4, Float, Vector2, Vector3, Vector4};
use crate::value::ShaderValue;
use serde::{Deserialize, Serialize};

/// Pseudo random number in `[0, 1)` from a seed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RandomNumberBlock {}

impl ShaderBlock for RandomNumberBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports
            .register_input("seed", Vector2, false)
            .accept(&[Vector3, Vector4, Color3, Color4]);
        ports.register_output("output", Float);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        state.emit_function_from_include(
            "helperFunctions",
            "Random",
            &EmitFunctionFromIncludeOptions::default(),
        )?;
        let output = ctx.declare_output("output", state)?;
        let seed = ctx.input("seed")?;
        state.emit_line(format!("{output} = getRand({seed}.xy);"));
        Ok(())
    }
}

/// Fresnel term from a normal and a view direction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FresnelBlock {}

impl ShaderBlock for FresnelBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("worldNormal", Vector4, false);
        ports.register_input("viewDirection", Vector3, false);
        ports
            .register_input("bias", Float, false)
            .with_default(ShaderValue::Float(0.0));
        ports
            .register_input("power", Float, false)
            .with_default(ShaderValue::Float(1.0));
        ports.register_output("fresnel", Float);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        state.emit_function_from_include(
            "fresnelFunction",
            "Fresnel",
            &EmitFunctionFromIncludeOptions {
                remove_if_def: true,
                ..Default::default()
            },
        )?;
        let output = ctx.declare_output("fresnel", state)?;
        let normal = ctx.input("worldNormal")?;
        let view = ctx.input("viewDirection")?;
        let bias = ctx.input("bias")?;
        let power = ctx.input("power")?;
        state.emit_line(format!(
            "{output} = computeFresnelTerm({view}.xyz, {normal}.xyz, {bias}, {power});"
        ));
        Ok(())
    }
}
