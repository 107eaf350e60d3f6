// SPDX-License-Identifier: MIT OR Apache-2.0
//! Literal values carried by input blocks and port defaults.

use crate::types::ConnectionPointType;
use serde::{ser, Deserialize, Serialize, Serializer};
use std::fmt::Debug;

/// A literal value that can be baked into generated source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShaderValue {
    /// Float
    Float(#[serde(serialize_with = "serialize_finite")] f32),
    /// Integer
    Int(i32),
    /// 2D vector
    Vector2(#[serde(serialize_with = "serialize_finite")] [f32; 2]),
    /// 3D vector
    Vector3(#[serde(serialize_with = "serialize_finite")] [f32; 3]),
    /// 4D vector
    Vector4(#[serde(serialize_with = "serialize_finite")] [f32; 4]),
    /// RGB color
    Color3(#[serde(serialize_with = "serialize_finite")] [f32; 3]),
    /// RGBA color
    Color4(#[serde(serialize_with = "serialize_finite")] [f32; 4]),
    /// 4x4 matrix, column major
    Matrix(#[serde(serialize_with = "serialize_finite")] [f32; 16]),
}

impl ShaderValue {
    /// The connection point type this value resolves to
    pub fn connection_type(&self) -> ConnectionPointType {
        match self {
            Self::Float(_) => ConnectionPointType::Float,
            Self::Int(_) => ConnectionPointType::Int,
            Self::Vector2(_) => ConnectionPointType::Vector2,
            Self::Vector3(_) => ConnectionPointType::Vector3,
            Self::Vector4(_) => ConnectionPointType::Vector4,
            Self::Color3(_) => ConnectionPointType::Color3,
            Self::Color4(_) => ConnectionPointType::Color4,
            Self::Matrix(_) => ConnectionPointType::Matrix,
        }
    }

    /// The 4x4 identity matrix
    pub fn identity() -> Self {
        let mut m = [0.0; 16];
        for i in 0..4 {
            m[i * 5] = 1.0;
        }
        Self::Matrix(m)
    }

    /// GLSL literal expression for this value
    pub fn to_glsl(&self) -> String {
        match self {
            Self::Float(v) => write_float(*v),
            Self::Int(v) => v.to_string(),
            Self::Vector2(v) => constructor("vec2", v),
            Self::Vector3(v) | Self::Color3(v) => constructor("vec3", v),
            Self::Vector4(v) | Self::Color4(v) => constructor("vec4", v),
            Self::Matrix(v) => constructor("mat4", v),
        }
    }
}

fn constructor(name: &str, components: &[f32]) -> String {
    let args: Vec<String> = components.iter().map(|c| write_float(*c)).collect();
    format!("{name}({})", args.join(", "))
}

/// Format a float as a GLSL literal.
///
/// The output is locale independent and always carries a decimal point,
/// so `1.0` is written as `1.0` and never as `1`. Non-finite values have no
/// literal form and are written as constant expressions.
pub fn write_float(value: f32) -> String {
    if value.is_nan() {
        return "(0.0 / 0.0)".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 {
            "(1.0 / 0.0)".to_string()
        } else {
            "(-1.0 / 0.0)".to_string()
        };
    }

    let mut text = value.to_string();
    if !text.contains('.') {
        text.push_str(".0");
    }
    text
}

/// Float data that can be checked for NaN and infinities
pub trait FloatComponents {
    /// Every component is finite
    fn all_finite(&self) -> bool;
}

impl FloatComponents for f32 {
    fn all_finite(&self) -> bool {
        self.is_finite()
    }
}

impl<const N: usize> FloatComponents for [f32; N] {
    fn all_finite(&self) -> bool {
        self.iter().all(|c| c.is_finite())
    }
}

/// Serialize float data, refusing NaN and infinities.
///
/// JSON has no literal for non-finite numbers and would store them as
/// `null`, which cannot be read back as a float.
pub(crate) fn serialize_finite<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: FloatComponents + Serialize + Debug,
    S: Serializer,
{
    if !value.all_finite() {
        return Err(<S::Error as ser::Error>::custom(format!(
            "non-finite float {value:?} cannot be stored"
        )));
    }
    value.serialize(serializer)
}
