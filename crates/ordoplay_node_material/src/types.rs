// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection point types, block targets and shader stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Data type that can flow through a connection point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionPointType {
    /// Scalar float
    Float,
    /// Scalar integer
    Int,
    /// 2D vector
    Vector2,
    /// 3D vector
    Vector3,
    /// 4D vector
    Vector4,
    /// RGB color
    Color3,
    /// RGBA color
    Color4,
    /// 4x4 matrix
    Matrix,
    /// Constraint placeholder: accepts any 3 or 4 component vector
    Vector3OrVector4,
    /// Constraint placeholder: accepts any 3 or 4 component color
    Color3OrColor4,
    /// Placeholder resolved from whatever connects to the input
    AutoDetect,
    /// Placeholder resolved from a designated input of the same block
    BasedOnInput,
    /// Opaque object (samplers, structures)
    Object,
}

impl ConnectionPointType {
    /// Whether this type still needs resolution before code generation
    pub fn is_placeholder(self) -> bool {
        matches!(
            self,
            Self::AutoDetect | Self::BasedOnInput | Self::Vector3OrVector4 | Self::Color3OrColor4
        )
    }

    /// Whether two types share the same GLSL representation
    pub fn is_equivalent(self, other: Self) -> bool {
        if self == other {
            return true;
        }
        matches!(
            (self, other),
            (Self::Vector3, Self::Color3)
                | (Self::Color3, Self::Vector3)
                | (Self::Vector4, Self::Color4)
                | (Self::Color4, Self::Vector4)
        )
    }

    /// Number of scalar components, if the type is a scalar or vector
    pub fn component_count(self) -> Option<usize> {
        match self {
            Self::Float | Self::Int => Some(1),
            Self::Vector2 => Some(2),
            Self::Vector3 | Self::Color3 => Some(3),
            Self::Vector4 | Self::Color4 => Some(4),
            _ => None,
        }
    }

    /// Whether this is one of the 3 or 4 component vector/color types
    pub fn is_vector3_or_4(self) -> bool {
        matches!(
            self,
            Self::Vector3 | Self::Vector4 | Self::Color3 | Self::Color4
        )
    }

    /// GLSL type name, or `None` for placeholder and object types
    pub fn gl_type(self) -> Option<&'static str> {
        match self {
            Self::Float => Some("float"),
            Self::Int => Some("int"),
            Self::Vector2 => Some("vec2"),
            Self::Vector3 | Self::Color3 => Some("vec3"),
            Self::Vector4 | Self::Color4 => Some("vec4"),
            Self::Matrix => Some("mat4"),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionPointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Direction of a connection point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

/// Shader stage a build pass is producing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Vertex shader
    Vertex,
    /// Fragment shader
    Fragment,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
        }
    }
}

/// Stage(s) a block is allowed to run in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockTarget {
    /// Vertex stage only; fragment consumers read its outputs through varyings
    Vertex,
    /// Fragment stage only
    Fragment,
    /// Usable in either stage
    VertexAndFragment,
    /// No stage of its own; built in whichever stage consumes it
    Neutral,
}

impl BlockTarget {
    /// Whether a block with this target can be built in `stage`
    pub fn allows(self, stage: Stage) -> bool {
        match self {
            Self::Vertex => stage == Stage::Vertex,
            Self::Fragment => stage == Stage::Fragment,
            Self::VertexAndFragment | Self::Neutral => true,
        }
    }
}

/// Outcome of checking whether an output may feed an input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompatibilityState {
    /// The connection is legal
    Compatible,
    /// The types cannot be reconciled
    TypeIncompatible,
    /// A fragment-only value would feed the vertex stage
    TargetIncompatible,
}

impl fmt::Display for CompatibilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compatible => f.write_str("compatible"),
            Self::TypeIncompatible => f.write_str("incompatible types"),
            Self::TargetIncompatible => f.write_str("incompatible targets"),
        }
    }
}
