// SPDX-License-Identifier: MIT OR Apache-2.0
//! Concrete block implementations.
//!
//! Blocks are grouped by what they compute:
//! - `input`: uniforms, constants, attributes and system values
//! - `math`: arithmetic and scalar functions
//! - `vector`: geometric operations
//! - `interpolation`: blending, clamping and remapping
//! - `merge`: building and splitting vectors and colors
//! - `output`: stage outputs and fragment-only helpers
//! - `procedural`: noise and fresnel
//! - `texture`: sampler reads

mod input;
mod interpolation;
mod math;
mod merge;
mod output;
mod procedural;
mod texture;
mod vector;

pub use input::{InputBlock, InputMode, SystemValue};
pub use interpolation::{
    ClampBlock, ElbowBlock, LerpBlock, NLerpBlock, PosterizeBlock, RemapBlock, ReplaceColorBlock,
    SmoothStepBlock, WaveBlock, WaveKind,
};
pub use math::{
    AddBlock, ArcTan2Block, DivideBlock, MaxBlock, MinBlock, ModBlock, MultiplyBlock, NegateBlock,
    OneMinusBlock, PowBlock, ReciprocalBlock, ScaleBlock, StepBlock, SubtractBlock,
    TrigonometryBlock, TrigonometryOperation,
};
pub use merge::{ColorMergerBlock, ColorSplitterBlock, VectorMergerBlock, VectorSplitterBlock};
pub use output::{
    DerivativeBlock, DiscardBlock, FragmentOutputBlock, FrontFacingBlock, VertexOutputBlock,
};
pub use procedural::{FresnelBlock, RandomNumberBlock};
pub use texture::TextureBlock;
pub use vector::{
    CrossBlock, DistanceBlock, DotBlock, LengthBlock, NormalizeBlock, ReflectBlock, RefractBlock,
    Rotate2dBlock, TransformBlock, ViewDirectionBlock,
};

use crate::block::ShaderBlock;
use serde::{Deserialize, Serialize};

macro_rules! block_kinds {
    ($($variant:ident($ty:ty) => $class:literal,)*) => {
        /// Every block the compiler knows, tagged by class name when serialized
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "className")]
        pub enum BlockKind {
            $(
                #[allow(missing_docs)]
                #[serde(rename = $class)]
                $variant($ty),
            )*
        }

        impl BlockKind {
            /// Stable identifier used for serialization
            pub fn class_name(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => $class,)*
                }
            }

            /// The block's shared behaviour
            pub fn shader_block(&self) -> &dyn ShaderBlock {
                match self {
                    $(Self::$variant(block) => block as &dyn ShaderBlock,)*
                }
            }

            /// All known class names
            pub fn class_names() -> &'static [&'static str] {
                &[$($class,)*]
            }
        }

        $(
            impl From<$ty> for BlockKind {
                fn from(block: $ty) -> Self {
                    Self::$variant(block)
                }
            }
        )*
    };
}

block_kinds! {
    Input(InputBlock) => "InputBlock",
    Add(AddBlock) => "AddBlock",
    Subtract(SubtractBlock) => "SubtractBlock",
    Multiply(MultiplyBlock) => "MultiplyBlock",
    Divide(DivideBlock) => "DivideBlock",
    Mod(ModBlock) => "ModBlock",
    Min(MinBlock) => "MinBlock",
    Max(MaxBlock) => "MaxBlock",
    Pow(PowBlock) => "PowBlock",
    Scale(ScaleBlock) => "ScaleBlock",
    Negate(NegateBlock) => "NegateBlock",
    OneMinus(OneMinusBlock) => "OneMinusBlock",
    Reciprocal(ReciprocalBlock) => "ReciprocalBlock",
    Trigonometry(TrigonometryBlock) => "TrigonometryBlock",
    ArcTan2(ArcTan2Block) => "ArcTan2Block",
    Step(StepBlock) => "StepBlock",
    Dot(DotBlock) => "DotBlock",
    Cross(CrossBlock) => "CrossBlock",
    Distance(DistanceBlock) => "DistanceBlock",
    Length(LengthBlock) => "LengthBlock",
    Normalize(NormalizeBlock) => "NormalizeBlock",
    Reflect(ReflectBlock) => "ReflectBlock",
    Refract(RefractBlock) => "RefractBlock",
    Rotate2d(Rotate2dBlock) => "Rotate2dBlock",
    Transform(TransformBlock) => "TransformBlock",
    ViewDirection(ViewDirectionBlock) => "ViewDirectionBlock",
    Lerp(LerpBlock) => "LerpBlock",
    NLerp(NLerpBlock) => "NLerpBlock",
    SmoothStep(SmoothStepBlock) => "SmoothStepBlock",
    Clamp(ClampBlock) => "ClampBlock",
    Posterize(PosterizeBlock) => "PosterizeBlock",
    Remap(RemapBlock) => "RemapBlock",
    ReplaceColor(ReplaceColorBlock) => "ReplaceColorBlock",
    Wave(WaveBlock) => "WaveBlock",
    Elbow(ElbowBlock) => "ElbowBlock",
    VectorMerger(VectorMergerBlock) => "VectorMergerBlock",
    VectorSplitter(VectorSplitterBlock) => "VectorSplitterBlock",
    ColorMerger(ColorMergerBlock) => "ColorMergerBlock",
    ColorSplitter(ColorSplitterBlock) => "ColorSplitterBlock",
    VertexOutput(VertexOutputBlock) => "VertexOutputBlock",
    FragmentOutput(FragmentOutputBlock) => "FragmentOutputBlock",
    Discard(DiscardBlock) => "DiscardBlock",
    Derivative(DerivativeBlock) => "DerivativeBlock",
    FrontFacing(FrontFacingBlock) => "FrontFacingBlock",
    RandomNumber(RandomNumberBlock) => "RandomNumberBlock",
    Fresnel(FresnelBlock) => "FresnelBlock",
    Texture(TextureBlock) => "TextureBlock",
}
