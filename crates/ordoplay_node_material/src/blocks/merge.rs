// SPDX-License-Identifier: MIT OR Apache-2.0
//! Blocks that assemble or split vectors and colors.

use crate::block::{BlockBuildContext, ShaderBlock};
use crate::build_state::NodeMaterialBuildState;
use crate::error::BuildError;
use crate::port::PortRegistrar;
use crate::types::ConnectionPointType::{Color3, Color4, Float, Vector2, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// Emit `output = constructor(components)` for every consumed output.
///
/// Each entry is `(output port, GLSL constructor, component inputs)`;
/// unconnected components read `0.0`.
fn emit_mergers(
    ctx: &BlockBuildContext<'_>,
    state: &mut NodeMaterialBuildState,
    outputs: &[(&str, &str, &[&str])],
) -> Result<(), BuildError> {
    for (port, constructor, components) in outputs {
        if !ctx.has_endpoints(port) {
            continue;
        }
        let args: Vec<&str> = components
            .iter()
            .map(|c| ctx.try_input(c).unwrap_or("0.0"))
            .collect();
        let output = ctx.declare_output(port, state)?;
        state.emit_line(format!("{output} = {constructor}({});", args.join(", ")));
    }
    Ok(())
}

/// Emit `output = source.swizzle` for every consumed output.
///
/// The source is the first connected input in `sources`.
fn emit_splitters(
    ctx: &BlockBuildContext<'_>,
    state: &mut NodeMaterialBuildState,
    sources: &[&str],
    outputs: &[(&str, &str)],
) -> Result<(), BuildError> {
    let Some(source) = sources.iter().copied().find(|s| ctx.is_connected(s)) else {
        return Err(ctx.invalid_inputs(format!("one of {} must be connected", sources.join(", "))));
    };
    let expr = ctx.input(source)?;
    let available = ctx
        .input_type(source)
        .and_then(|t| t.component_count())
        .unwrap_or(0);

    for (port, swizzle) in outputs {
        if !ctx.has_endpoints(port) {
            continue;
        }
        let needed = swizzle_width(swizzle);
        if needed > available {
            return Err(ctx.unsupported(format!(
                "reading .{swizzle} from the {available} component input '{source}'"
            )));
        }
        let output = ctx.declare_output(port, state)?;
        state.emit_line(format!("{output} = {expr}.{swizzle};"));
    }
    Ok(())
}

/// Highest component index a swizzle reads, plus one
fn swizzle_width(swizzle: &str) -> usize {
    swizzle
        .chars()
        .map(|c| match c {
            'x' | 'r' => 1,
            'y' | 'g' => 2,
            'z' | 'b' => 3,
            _ => 4,
        })
        .max()
        .unwrap_or(0)
}

/// Builds vectors from scalar components
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorMergerBlock {}

impl ShaderBlock for VectorMergerBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        for name in ["x", "y", "z", "w"] {
            ports.register_input(name, Float, true);
        }
        ports.register_output("xyzw", Vector4);
        ports.register_output("xyz", Vector3);
        ports.register_output("xy", Vector2);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        emit_mergers(
            ctx,
            state,
            &[
                ("xyzw", "vec4", &["x", "y", "z", "w"][..]),
                ("xyz", "vec3", &["x", "y", "z"][..]),
                ("xy", "vec2", &["x", "y"][..]),
            ],
        )
    }
}

/// Splits a vector into components
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorSplitterBlock {}

impl ShaderBlock for VectorSplitterBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("xyzw", Vector4, true);
        ports.register_input("xyz", Vector3, true);
        ports.register_input("xy", Vector2, true);
        ports.register_output("xyz", Vector3);
        ports.register_output("xy", Vector2);
        for name in ["x", "y", "z", "w"] {
            ports.register_output(name, Float);
        }
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        emit_splitters(
            ctx,
            state,
            &["xyzw", "xyz", "xy"],
            &[
                ("xyz", "xyz"),
                ("xy", "xy"),
                ("x", "x"),
                ("y", "y"),
                ("z", "z"),
                ("w", "w"),
            ],
        )
    }
}

/// Builds colors from channels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorMergerBlock {}

impl ShaderBlock for ColorMergerBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        for name in ["r", "g", "b", "a"] {
            ports.register_input(name, Float, true);
        }
        ports.register_output("rgba", Color4);
        ports.register_output("rgb", Color3);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        emit_mergers(
            ctx,
            state,
            &[
                ("rgba", "vec4", &["r", "g", "b", "a"][..]),
                ("rgb", "vec3", &["r", "g", "b"][..]),
            ],
        )
    }
}

/// Splits a color into channels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorSplitterBlock {}

impl ShaderBlock for ColorSplitterBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("rgba", Color4, true);
        ports.register_input("rgb", Color3, true);
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
        emit_splitters(
            ctx,
            state,
            &["rgba", "rgb"],
            &[
                ("rgb", "rgb"),
                ("r", "r"),
                ("g", "g"),
                ("b", "b"),
                ("a", "a"),
            ],
        )
    }
}
