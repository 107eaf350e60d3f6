// SPDX-License-Identifier: MIT OR Apache-2.0
//! Blending, clamping, remapping and wave blocks.

use crate::block::{BlockBuildContext, ShaderBlock};
use crate::build_state::NodeMaterialBuildState;
use crate::error::BuildError;
use crate::port::PortRegistrar;
use crate::types::ConnectionPointType::{AutoDetect, BasedOnInput, Float, Matrix};
use crate::value::write_float;
use serde::{Deserialize, Serialize};

fn register_mix(ports: &mut PortRegistrar) {
    ports.register_input("left", AutoDetect, false).exclude(&[Matrix]);
    ports.register_input("right", AutoDetect, false).exclude(&[Matrix]);
    ports.register_input("gradient", AutoDetect, false).exclude(&[Matrix]);
    ports.register_output("output", BasedOnInput);
    ports.link_connection_types("left", "right");
    ports.set_type_connection_source("output", "left");
}

fn mix_expression(ctx: &BlockBuildContext<'_>) -> Result<String, BuildError> {
    let left = ctx.input("left")?;
    let right = ctx.input("right")?;
    let gradient = ctx.input("gradient")?;
    Ok(format!("mix({left}, {right}, {gradient})"))
}

/// `mix(left, right, gradient)`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LerpBlock {}

impl ShaderBlock for LerpBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        register_mix(ports);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        let output = ctx.declare_output("output", state)?;
        let mix = mix_expression(ctx)?;
        state.emit_line(format!("{output} = {mix};"));
        Ok(())
    }
}

/// `normalize(mix(left, right, gradient))`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NLerpBlock {}

impl ShaderBlock for NLerpBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        register_mix(ports);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        let output = ctx.declare_output("output", state)?;
        let mix = mix_expression(ctx)?;
        state.emit_line(format!("{output} = normalize({mix});"));
        Ok(())
    }
}

/// `smoothstep(edge0, edge1, value)`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmoothStepBlock {}

impl ShaderBlock for SmoothStepBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("value", AutoDetect, false).exclude(&[Matrix]);
        ports.register_input("edge0", Float, false);
        ports.register_input("edge1", Float, false);
        ports.register_output("output", BasedOnInput);
        ports.set_type_connection_source("output", "value");
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        let output = ctx.declare_output("output", state)?;
        let value = ctx.input("value")?;
        let edge0 = ctx.input("edge0")?;
        let edge1 = ctx.input("edge1")?;
        state.emit_line(format!("{output} = smoothstep({edge0}, {edge1}, {value});"));
        Ok(())
    }
}

/// Clamps a value between two literals baked into the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClampBlock {
    /// Lower bound
    #[serde(serialize_with = "crate::value::serialize_finite")]
    pub minimum: f32,
    /// Upper bound
    #[serde(serialize_with = "crate::value::serialize_finite")]
    pub maximum: f32,
}

impl Default for ClampBlock {
    fn default() -> Self {
        Self {
            minimum: 0.0,
            maximum: 1.0,
        }
    }
}

impl ShaderBlock for ClampBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("value", AutoDetect, false).exclude(&[Matrix]);
        ports.register_output("output", BasedOnInput);
        ports.set_type_connection_source("output", "value");
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        let output = ctx.declare_output("output", state)?;
        let value = ctx.input("value")?;
        state.emit_line(format!(
            "{output} = clamp({value}, {}, {});",
            write_float(self.minimum),
            write_float(self.maximum)
        ));
        Ok(())
    }
}

/// Quantizes a value into `steps` levels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PosterizeBlock {}

impl ShaderBlock for PosterizeBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("value", AutoDetect, false).exclude(&[Matrix]);
        ports.register_input("steps", AutoDetect, false).exclude(&[Matrix]);
        ports.register_output("output", BasedOnInput);
        ports.link_connection_types("value", "steps");
        ports.set_type_connection_source("output", "value");
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        let output = ctx.declare_output("output", state)?;
        let value = ctx.input("value")?;
        let steps = ctx.input("steps")?;
        state.emit_line(format!(
            "{output} = floor({value} / (1.0 / {steps})) * (1.0 / {steps});"
        ));
        Ok(())
    }
}

/// Maps a value from a source range to a target range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemapBlock {
    /// Source range `[min, max]`
    #[serde(serialize_with = "crate::value::serialize_finite")]
    pub source_range: [f32; 2],
    /// Target range `[min, max]`
    #[serde(serialize_with = "crate::value::serialize_finite")]
    pub target_range: [f32; 2],
}

impl Default for RemapBlock {
    fn default() -> Self {
        Self {
            source_range: [-1.0, 1.0],
            target_range: [0.0, 1.0],
        }
    }
}

impl ShaderBlock for RemapBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("input", AutoDetect, false).exclude(&[Matrix]);
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
        let [source_min, source_max] = self.source_range.map(write_float);
        let [target_min, target_max] = self.target_range.map(write_float);
        state.emit_line(format!(
            "{output} = {target_min} + ({input} - {source_min}) * ({target_max} - {target_min}) / ({source_max} - {source_min});"
        ));
        Ok(())
    }
}

/// Swaps a color for a replacement when it is close to a reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplaceColorBlock {}

impl ShaderBlock for ReplaceColorBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("value", AutoDetect, false).exclude(&[Matrix]);
        ports.register_input("reference", AutoDetect, false).exclude(&[Matrix]);
        ports.register_input("distance", Float, false);
        ports.register_input("replacement", AutoDetect, false).exclude(&[Matrix]);
        ports.register_output("output", BasedOnInput);
        ports.link_connection_types("value", "reference");
        ports.follow_connection_type("replacement", "value");
        ports.set_type_connection_source("output", "value");
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        let name = ctx.output("output")?;
        let output = ctx.declare_output("output", state)?;
        let value = ctx.input("value")?;
        let reference = ctx.input("reference")?;
        let distance = ctx.input("distance")?;
        let replacement = ctx.input("replacement")?;
        state.emit_line(format!("{output} = {value};"));
        state.emit_line(format!(
            "if (length({value} - {reference}) < {distance}) {{"
        ));
        state.emit_line(format!("    {name} = {replacement};"));
        state.emit_line("}");
        Ok(())
    }
}

/// Periodic waveform generated by a [`WaveBlock`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveKind {
    /// Ramp from -0.5 to 0.5
    #[default]
    SawTooth,
    /// Alternates between -1 and 1
    Square,
    /// Linear up and down between -1 and 1
    Triangle,
}

/// Periodic wave of its input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveBlock {
    /// Waveform
    pub kind: WaveKind,
}

impl ShaderBlock for WaveBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("input", AutoDetect, false).exclude(&[Matrix]);
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
        let expression = match self.kind {
            WaveKind::SawTooth => format!("{input} - floor(0.5 + {input})"),
            WaveKind::Square => format!("1.0 - 2.0 * floor(fract({input}) + 0.5)"),
            WaveKind::Triangle => format!("2.0 * abs(2.0 * ({input} - floor(0.5 + {input}))) - 1.0"),
        };
        state.emit_line(format!("{output} = {expression};"));
        Ok(())
    }
}

/// Pass-through used to route connections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElbowBlock {}

impl ShaderBlock for ElbowBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("input", AutoDetect, false);
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
        state.emit_line(format!("{output} = {input};"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::test_support::emit;
    use crate::types::ConnectionPointType::*;
    use crate::types::Stage;

    #[test]
    fn test_clamp_literals() {
        let state = emit("c", ClampBlock::default(), Stage::Fragment, &[("value", "x", Float)]).unwrap();
        assert_eq!(state.compilation_string, "float c = clamp(x, 0.0, 1.0);\n");

        let block = ClampBlock {
            minimum: -0.5,
            maximum: 2.0,
        };
        let state = emit("c", block, Stage::Fragment, &[("value", "x", Vector3)]).unwrap();
        assert_eq!(state.compilation_string, "vec3 c = clamp(x, -0.5, 2.0);\n");
    }

    #[test]
    fn test_posterize() {
        let state = emit(
            "p",
            PosterizeBlock {},
            Stage::Fragment,
            &[("value", "c", Color3), ("steps", "s", Color3)],
        )
        .unwrap();
        assert_eq!(
            state.compilation_string,
            "vec3 p = floor(c / (1.0 / s)) * (1.0 / s);\n"
        );
    }

    #[test]
    fn test_lerp_and_nlerp() {
        let inputs = [
            ("left", "a", Vector3),
            ("right", "b", Vector3),
            ("gradient", "g", Float),
        ];
        let state = emit("l", LerpBlock {}, Stage::Fragment, &inputs).unwrap();
        assert_eq!(state.compilation_string, "vec3 l = mix(a, b, g);\n");
        let state = emit("n", NLerpBlock {}, Stage::Fragment, &inputs).unwrap();
        assert_eq!(state.compilation_string, "vec3 n = normalize(mix(a, b, g));\n");
    }

    #[test]
    fn test_remap() {
        let state = emit("r", RemapBlock::default(), Stage::Fragment, &[("input", "x", Float)]).unwrap();
        assert_eq!(
            state.compilation_string,
            "float r = 0.0 + (x - -1.0) * (1.0 - 0.0) / (1.0 - -1.0);\n"
        );
    }

    #[test]
    fn test_replace_color() {
        let state = emit(
            "rc",
            ReplaceColorBlock {},
            Stage::Fragment,
            &[
                ("value", "c", Color3),
                ("reference", "r", Color3),
                ("distance", "0.1", Float),
                ("replacement", "k", Color3),
            ],
        )
        .unwrap();
        assert_eq!(
            state.compilation_string,
            "vec3 rc = c;\nif (length(c - r) < 0.1) {\n    rc = k;\n}\n"
        );
    }

    #[test]
    fn test_wave_kinds() {
        let state = emit(
            "w",
            WaveBlock {
                kind: WaveKind::Square,
            },
            Stage::Fragment,
            &[("input", "t", Float)],
        )
        .unwrap();
        assert_eq!(state.compilation_string, "float w = 1.0 - 2.0 * floor(fract(t) + 0.5);\n");
    }
}
