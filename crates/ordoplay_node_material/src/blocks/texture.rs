// SPDX-License-Identifier: MIT OR Apache-2.0
//! 2D texture sampling.

use crate::block::{BlockBuildContext, ShaderBlock};
use crate::build_state::NodeMaterialBuildState;
use crate::error::BuildError;
use crate::includes::EmitFunctionFromIncludeOptions;
use crate::port::PortRegistrar;
use crate::types::BlockTarget;
use crate::types::ConnectionPointType::{Color3, Color4, Float, Vector2};
use serde::{Deserialize, Serialize};

/// Samples a 2D texture at a UV coordinate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureBlock {
    /// Texture asset bound to the sampler by the renderer
    pub texture: Option<String>,
    /// Convert sampled colors from gamma to linear space
    pub convert_to_linear_space: bool,
}

impl ShaderBlock for TextureBlock {
    fn target(&self) -> BlockTarget {
        BlockTarget::Fragment
    }

    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("uv", Vector2, false);
        ports.register_output("rgba", Color4);
        ports.register_output("rgb", Color3);
        for name in ["r", "g", "b", "a"] {
            ports.register_output(name, Float);
        }
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        let sampler = state
            .shared
            .free_variable_name(&format!("{}Sampler", ctx.name()));
        state.emit_sampler(&sampler);

        let uv = ctx.input("uv")?;
        let mut read = format!("texture2D({sampler}, {uv})");
        if self.convert_to_linear_space {
            state.emit_function_from_include(
                "helperFunctions",
                "Color space conversions",
                &EmitFunctionFromIncludeOptions::default(),
            )?;
            read = format!("toLinearSpace({read})");
        }

        let rgba_name = ctx.output("rgba")?;
        let rgba = ctx.declare_output("rgba", state)?;
        state.emit_line(format!("{rgba} = {read};"));

        for port in ["rgb", "r", "g", "b", "a"] {
            if ctx.has_endpoints(port) {
                let output = ctx.declare_output(port, state)?;
                state.emit_line(format!("{output} = {rgba_name}.{port};"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::test_support::emit;
    use crate::types::Stage;

    #[test]
    fn test_texture_read() {
        let state = emit("diffuse", TextureBlock::default(), Stage::Fragment, &[("uv", "v_uv", Vector2)]).unwrap();
        assert!(state
            .compilation_string
            .starts_with("vec4 diffuse_rgba = texture2D(diffuseSampler, v_uv);\n"));
        assert!(state
            .compilation_string
            .contains("float diffuse_a = diffuse_rgba.a;\n"));
        assert_eq!(state.samplers(), &["diffuseSampler".to_string()]);
    }

    #[test]
    fn test_linear_space() {
        let block = TextureBlock {
            texture: None,
            convert_to_linear_space: true,
        };
        let state = emit("t", block, Stage::Fragment, &[("uv", "uv", Vector2)]).unwrap();
        assert!(state
            .compilation_string
            .contains("toLinearSpace(texture2D(tSampler, uv))"));
    }
}
