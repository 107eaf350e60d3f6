// SPDX-License-Identifier: MIT OR Apache-2.0
//! Stage output blocks and fragment-only helpers.

use crate::block::{BlockBuildContext, ShaderBlock};
use crate::build_state::NodeMaterialBuildState;
use crate::error::BuildError;
use crate::includes::EmitFunctionFromIncludeOptions;
use crate::port::PortRegistrar;
use crate::types::BlockTarget;
use crate::types::ConnectionPointType::{
    AutoDetect, BasedOnInput, Color3, Color4, Float, Matrix, Vector4,
};
use serde::{Deserialize, Serialize};

const DERIVATIVES_EXTENSION: &str = "#extension GL_OES_standard_derivatives : enable";

/// Writes `gl_Position`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VertexOutputBlock {}

impl ShaderBlock for VertexOutputBlock {
    fn target(&self) -> BlockTarget {
        BlockTarget::Vertex
    }

    fn is_final_merger(&self) -> bool {
        true
    }

    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("vector", Vector4, false);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        let vector = ctx.input("vector")?;
        state.emit_line(format!("gl_Position = {vector};"));
        state.shared.checks.emit_vertex = true;
        Ok(())
    }
}

/// Writes `gl_FragColor` from either `rgba` or `rgb` plus `a`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FragmentOutputBlock {
    /// Convert the final color from linear to gamma space
    pub convert_to_gamma_space: bool,
}

impl ShaderBlock for FragmentOutputBlock {
    fn target(&self) -> BlockTarget {
        BlockTarget::Fragment
    }

    fn is_final_merger(&self) -> bool {
        true
    }

    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("rgba", Color4, true);
        ports.register_input("rgb", Color3, true).accept(&[Float]);
        ports.register_input("a", Float, true);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        let rgba = ctx.try_input("rgba");
        let rgb = ctx.try_input("rgb");
        let alpha = ctx.try_input("a");

        let color = match (rgba, rgb) {
            (Some(_), Some(_)) => {
                return Err(ctx.invalid_inputs("connect either rgba or rgb, not both"))
            }
            (Some(_), None) if alpha.is_some() => {
                return Err(ctx.invalid_inputs("a can only be combined with rgb"))
            }
            (Some(rgba), None) => rgba.to_string(),
            (None, Some(rgb)) => {
                let alpha = alpha.unwrap_or("1.0");
                if ctx.input_type("rgb") == Some(Float) {
                    format!("vec4({rgb}, {rgb}, {rgb}, {alpha})")
                } else {
                    format!("vec4({rgb}, {alpha})")
                }
            }
            (None, None) => return Err(ctx.invalid_inputs("either rgba or rgb must be connected")),
        };

        state.emit_line(format!("gl_FragColor = {color};"));
        if self.convert_to_gamma_space {
            state.emit_function_from_include(
                "helperFunctions",
                "Color space conversions",
                &EmitFunctionFromIncludeOptions::default(),
            )?;
            state.emit_line("gl_FragColor = toGammaSpace(gl_FragColor);");
        }

        state.shared.hints.needs_alpha_blending |= rgba.is_some() || alpha.is_some();
        state.shared.checks.emit_fragment = true;
        Ok(())
    }
}

/// Discards fragments whose value is below a cutoff
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscardBlock {}

impl ShaderBlock for DiscardBlock {
    fn target(&self) -> BlockTarget {
        BlockTarget::Fragment
    }

    fn is_final_merger(&self) -> bool {
        true
    }

    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("value", Float, false);
        ports.register_input("cutoff", Float, false);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        let value = ctx.input("value")?;
        let cutoff = ctx.input("cutoff")?;
        state.emit_line(format!("if ({value} < {cutoff}) discard;"));
        state.shared.hints.needs_alpha_testing = true;
        state.shared.checks.emit_fragment = true;
        Ok(())
    }
}

/// Screen space derivatives of its input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivativeBlock {}

impl ShaderBlock for DerivativeBlock {
    fn target(&self) -> BlockTarget {
        BlockTarget::Fragment
    }

    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("input", AutoDetect, false).exclude(&[Matrix]);
        ports.register_output("dx", BasedOnInput);
        ports.register_output("dy", BasedOnInput);
        ports.set_type_connection_source("dx", "input");
        ports.set_type_connection_source("dy", "input");
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        state.emit_extension("derivatives", DERIVATIVES_EXTENSION);
        state.shared.hints.needs_derivatives = true;

        let input = ctx.input("input")?;
        for (port, function) in [("dx", "dFdx"), ("dy", "dFdy")] {
            if ctx.has_endpoints(port) {
                let output = ctx.declare_output(port, state)?;
                state.emit_line(format!("{output} = {function}({input});"));
            }
        }
        Ok(())
    }
}

/// 1.0 for front facing fragments, 0.0 otherwise
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrontFacingBlock {}

impl ShaderBlock for FrontFacingBlock {
    fn target(&self) -> BlockTarget {
        BlockTarget::Fragment
    }

    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_output("output", Float);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        let output = ctx.declare_output("output", state)?;
        state.emit_line(format!("{output} = gl_FrontFacing ? 1.0 : 0.0;"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::test_support::emit;
    use crate::types::ConnectionPointType::Vector3;
    use crate::types::Stage;

    #[test]
    fn test_fragment_output_broadcast() {
        let state = emit(
            "out",
            FragmentOutputBlock::default(),
            Stage::Fragment,
            &[("rgb", "add", Float), ("a", "1.0", Float)],
        )
        .unwrap();
        assert_eq!(
            state.compilation_string,
            "gl_FragColor = vec4(add, add, add, 1.0);\n"
        );
        assert!(state.shared.checks.emit_fragment);
    }

    #[test]
    fn test_fragment_output_rgb_without_alpha() {
        let state = emit(
            "out",
            FragmentOutputBlock::default(),
            Stage::Fragment,
            &[("rgb", "color", Color3)],
        )
        .unwrap();
        assert_eq!(state.compilation_string, "gl_FragColor = vec4(color, 1.0);\n");
        assert!(!state.shared.hints.needs_alpha_blending);
    }

    #[test]
    fn test_fragment_output_groups() {
        let both = emit(
            "out",
            FragmentOutputBlock::default(),
            Stage::Fragment,
            &[("rgba", "c", Color4), ("rgb", "d", Color3)],
        );
        assert!(matches!(both, Err(BuildError::InvalidBlockInputs { .. })));

        let none = emit("out", FragmentOutputBlock::default(), Stage::Fragment, &[]);
        assert!(matches!(none, Err(BuildError::InvalidBlockInputs { .. })));
    }

    #[test]
    fn test_gamma_conversion() {
        let block = FragmentOutputBlock {
            convert_to_gamma_space: true,
        };
        let state = emit("out", block, Stage::Fragment, &[("rgba", "c", Color4)]).unwrap();
        assert!(state
            .compilation_string
            .ends_with("gl_FragColor = toGammaSpace(gl_FragColor);\n"));
        assert!(state.has_function("helperFunctions"));
    }

    #[test]
    fn test_discard() {
        let state = emit(
            "discard",
            DiscardBlock {},
            Stage::Fragment,
            &[("value", "alpha", Float), ("cutoff", "0.5", Float)],
        )
        .unwrap();
        assert_eq!(state.compilation_string, "if (alpha < 0.5) discard;\n");
        assert!(state.shared.hints.needs_alpha_testing);
    }

    #[test]
    fn test_derivative() {
        let state = emit("d", DerivativeBlock {}, Stage::Fragment, &[("input", "p", Vector3)]).unwrap();
        assert_eq!(
            state.compilation_string,
            "vec3 d_dx = dFdx(p);\nvec3 d_dy = dFdy(p);\n"
        );
        assert!(state.finalize().starts_with(DERIVATIVES_EXTENSION));
    }

    #[test]
    fn test_vertex_output() {
        let state = emit("vo", VertexOutputBlock {}, Stage::Vertex, &[("vector", "pos", Vector4)]).unwrap();
        assert_eq!(state.compilation_string, "gl_Position = pos;\n");
        assert!(state.shared.checks.emit_vertex);
    }
}
