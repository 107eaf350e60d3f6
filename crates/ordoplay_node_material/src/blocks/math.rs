// SPDX-License-Identifier: MIT OR Apache-2.0
//! Arithmetic and scalar function blocks.

use crate::block::{BlockBuildContext, ShaderBlock};
use crate::build_state::NodeMaterialBuildState;
use crate::error::BuildError;
use crate::port::PortRegistrar;
use crate::types::ConnectionPointType::{self, AutoDetect, BasedOnInput, Float, Matrix};
use serde::{Deserialize, Serialize};

/// Two linked `AutoDetect` operands and a `BasedOnInput` output
fn register_linked_operands(ports: &mut PortRegistrar, excluded: &[ConnectionPointType]) {
    ports.register_input("left", AutoDetect, false).exclude(excluded);
    ports.register_input("right", AutoDetect, false).exclude(excluded);
    ports.register_output("output", BasedOnInput);
    ports.link_connection_types("left", "right");
    ports.set_type_connection_source("output", "left");
}

/// One `AutoDetect` input named `input_name` and a matching output
fn register_unary(ports: &mut PortRegistrar, input_name: &str, excluded: &[ConnectionPointType]) {
    ports.register_input(input_name, AutoDetect, false).exclude(excluded);
    ports.register_output("output", BasedOnInput);
    ports.set_type_connection_source("output", input_name);
}

fn emit_operator(
    ctx: &BlockBuildContext<'_>,
    state: &mut NodeMaterialBuildState,
    operator: &str,
) -> Result<(), BuildError> {
    let output = ctx.declare_output("output", state)?;
    let left = ctx.input("left")?;
    let right = ctx.input("right")?;
    state.emit_line(format!("{output} = {left} {operator} {right};"));
    Ok(())
}

fn emit_call(
    ctx: &BlockBuildContext<'_>,
    state: &mut NodeMaterialBuildState,
    function: &str,
    args: &[&str],
) -> Result<(), BuildError> {
    let output = ctx.declare_output("output", state)?;
    let values = args
        .iter()
        .map(|name| ctx.input(name))
        .collect::<Result<Vec<_>, _>>()?;
    state.emit_line(format!("{output} = {function}({});", values.join(", ")));
    Ok(())
}

macro_rules! operator_block {
    ($(#[$doc:meta])* $name:ident, $op:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct $name {}

        impl ShaderBlock for $name {
            fn register_ports(&self, ports: &mut PortRegistrar) {
                register_linked_operands(ports, &[]);
            }

            fn build(
                &self,
                ctx: &BlockBuildContext<'_>,
                state: &mut NodeMaterialBuildState,
            ) -> Result<(), BuildError> {
                emit_operator(ctx, state, $op)
            }
        }
    };
}

macro_rules! function_block {
    ($(#[$doc:meta])* $name:ident, $function:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct $name {}

        impl ShaderBlock for $name {
            fn register_ports(&self, ports: &mut PortRegistrar) {
                register_linked_operands(ports, &[Matrix]);
            }

            fn build(
                &self,
                ctx: &BlockBuildContext<'_>,
                state: &mut NodeMaterialBuildState,
            ) -> Result<(), BuildError> {
                emit_call(ctx, state, $function, &["left", "right"])
            }
        }
    };
}

operator_block!(
    /// `left + right`
    AddBlock, "+"
);
operator_block!(
    /// `left - right`
    SubtractBlock, "-"
);
operator_block!(
    /// `left * right`
    MultiplyBlock, "*"
);
operator_block!(
    /// `left / right`
    DivideBlock, "/"
);
function_block!(
    /// `mod(left, right)`
    ModBlock, "mod"
);
function_block!(
    /// `min(left, right)`
    MinBlock, "min"
);
function_block!(
    /// `max(left, right)`
    MaxBlock, "max"
);

/// `pow(value, power)`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowBlock {}

impl ShaderBlock for PowBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("value", AutoDetect, false).exclude(&[Matrix]);
        ports.register_input("power", AutoDetect, false).exclude(&[Matrix]);
        ports.register_output("output", BasedOnInput);
        ports.link_connection_types("value", "power");
        ports.set_type_connection_source("output", "value");
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        emit_call(ctx, state, "pow", &["value", "power"])
    }
}

/// `input * factor` with a scalar factor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaleBlock {}

impl ShaderBlock for ScaleBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        register_unary(ports, "input", &[]);
        ports.register_input("factor", Float, false);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        let output = ctx.declare_output("output", state)?;
        let input = ctx.input("input")?;
        let factor = ctx.input("factor")?;
        state.emit_line(format!("{output} = {input} * {factor};"));
        Ok(())
    }
}

/// `-1.0 * value`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NegateBlock {}

impl ShaderBlock for NegateBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        register_unary(ports, "value", &[]);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        let output = ctx.declare_output("output", state)?;
        let value = ctx.input("value")?;
        state.emit_line(format!("{output} = -1.0 * {value};"));
        Ok(())
    }
}

/// `1.0 - input`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OneMinusBlock {}

impl ShaderBlock for OneMinusBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        register_unary(ports, "input", &[Matrix]);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        let output = ctx.declare_output("output", state)?;
        let input = ctx.input("input")?;
        state.emit_line(format!("{output} = 1.0 - {input};"));
        Ok(())
    }
}

/// `1.0 / input`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReciprocalBlock {}

impl ShaderBlock for ReciprocalBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        register_unary(ports, "input", &[Matrix]);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        let output = ctx.declare_output("output", state)?;
        let input = ctx.input("input")?;
        state.emit_line(format!("{output} = 1.0 / {input};"));
        Ok(())
    }
}

/// Function applied by a [`TrigonometryBlock`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum TrigonometryOperation {
    #[default]
    Cos,
    Sin,
    Abs,
    Exp,
    Exp2,
    Round,
    Floor,
    Ceiling,
    Sqrt,
    Log,
    Tan,
    ArcTan,
    ArcCos,
    ArcSin,
    Fract,
    Sign,
    Radians,
    Degrees,
}

impl TrigonometryOperation {
    /// GLSL function name.
    ///
    /// `round` is missing from GLSL ES 1.0, so [`Self::Round`] is emitted as
    /// `floor(x + 0.5)` by the block instead.
    pub fn function(self) -> &'static str {
        match self {
            Self::Cos => "cos",
            Self::Sin => "sin",
            Self::Abs => "abs",
            Self::Exp => "exp",
            Self::Exp2 => "exp2",
            Self::Round => "round",
            Self::Floor => "floor",
            Self::Ceiling => "ceil",
            Self::Sqrt => "sqrt",
            Self::Log => "log",
            Self::Tan => "tan",
            Self::ArcTan => "atan",
            Self::ArcCos => "acos",
            Self::ArcSin => "asin",
            Self::Fract => "fract",
            Self::Sign => "sign",
            Self::Radians => "radians",
            Self::Degrees => "degrees",
        }
    }
}

/// Component-wise scalar function of its input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrigonometryBlock {
    /// Function to apply
    pub operation: TrigonometryOperation,
}

impl ShaderBlock for TrigonometryBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        register_unary(ports, "input", &[Matrix]);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        if self.operation == TrigonometryOperation::Round {
            let output = ctx.declare_output("output", state)?;
            let input = ctx.input("input")?;
            state.emit_line(format!("{output} = floor({input} + 0.5);"));
            return Ok(());
        }
        emit_call(ctx, state, self.operation.function(), &["input"])
    }
}

/// `atan(x, y)`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArcTan2Block {}

impl ShaderBlock for ArcTan2Block {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("x", Float, false);
        ports.register_input("y", Float, false);
        ports.register_output("output", Float);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        emit_call(ctx, state, "atan", &["x", "y"])
    }
}

/// `step(edge, value)`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepBlock {}

impl ShaderBlock for StepBlock {
    fn register_ports(&self, ports: &mut PortRegistrar) {
        ports.register_input("value", Float, false);
        ports.register_input("edge", Float, false);
        ports.register_output("output", Float);
    }

    fn build(
        &self,
        ctx: &BlockBuildContext<'_>,
        state: &mut NodeMaterialBuildState,
    ) -> Result<(), BuildError> {
        emit_call(ctx, state, "step", &["edge", "value"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::test_support::emit;
    use crate::types::ConnectionPointType::*;
    use crate::types::Stage;

    #[test]
    fn test_add() {
        let state = emit(
            "add",
            AddBlock {},
            Stage::Fragment,
            &[("left", "u_a", Float), ("right", "u_b", Float)],
        )
        .unwrap();
        assert_eq!(state.compilation_string, "float add = u_a + u_b;\n");
    }

    #[test]
    fn test_output_follows_left_type() {
        let state = emit(
            "sub",
            SubtractBlock {},
            Stage::Fragment,
            &[("left", "a", Vector3), ("right", "b", Vector3)],
        )
        .unwrap();
        assert_eq!(state.compilation_string, "vec3 sub = a - b;\n");
    }

    #[test]
    fn test_mod_call() {
        let state = emit(
            "m",
            ModBlock {},
            Stage::Vertex,
            &[("left", "a", Float), ("right", "2.0", Float)],
        )
        .unwrap();
        assert_eq!(state.compilation_string, "float m = mod(a, 2.0);\n");
    }

    #[test]
    fn test_negate_and_one_minus() {
        let state = emit("n", NegateBlock {}, Stage::Fragment, &[("value", "x", Vector2)]).unwrap();
        assert_eq!(state.compilation_string, "vec2 n = -1.0 * x;\n");

        let state = emit("o", OneMinusBlock {}, Stage::Fragment, &[("input", "x", Float)]).unwrap();
        assert_eq!(state.compilation_string, "float o = 1.0 - x;\n");
    }

    #[test]
    fn test_trigonometry() {
        let block = TrigonometryBlock {
            operation: TrigonometryOperation::Fract,
        };
        let state = emit("t", block, Stage::Fragment, &[("input", "x", Vector3)]).unwrap();
        assert_eq!(state.compilation_string, "vec3 t = fract(x);\n");

        let block = TrigonometryBlock {
            operation: TrigonometryOperation::Round,
        };
        let state = emit("r", block, Stage::Fragment, &[("input", "x", Vector2)]).unwrap();
        assert_eq!(state.compilation_string, "vec2 r = floor(x + 0.5);\n");
    }

    #[test]
    fn test_step_argument_order() {
        let state = emit(
            "s",
            StepBlock {},
            Stage::Fragment,
            &[("value", "v", Float), ("edge", "e", Float)],
        )
        .unwrap();
        assert_eq!(state.compilation_string, "float s = step(e, v);\n");
    }

    #[test]
    fn test_missing_operand() {
        let err = emit("add", AddBlock {}, Stage::Fragment, &[("left", "a", Float)]).unwrap_err();
        assert!(matches!(err, BuildError::VariableNotBuilt { port, .. } if port == "right"));
    }
}
