// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node material compiler for `OrdoPlay`.
//!
//! This crate turns a graph of typed shader blocks into a GLSL vertex and
//! fragment shader pair:
//! - Block catalogue (math, vectors, colors, textures, outputs)
//! - Connection validation with placeholder types
//! - Deterministic two-stage code generation
//! - JSON document format for materials
//!
//! ## Architecture
//!
//! A [`NodeMaterial`] owns an arena of [`Block`]s addressed by [`BlockId`].
//! Ports refer to each other through [`PortRef`] handles. Compiling a
//! material resolves placeholder types, then builds each stage into a
//! [`NodeMaterialBuildState`] that blocks append code to.

pub mod types;
pub mod value;
pub mod port;
pub mod error;
pub mod block;
pub mod blocks;
pub mod build_state;
pub mod includes;
pub mod options;
pub mod resolve;
pub mod connection;
pub mod material;
pub mod compiler;
pub mod serialization;

pub use block::{Block, BlockBuildContext, BlockId, ShaderBlock};
pub use blocks::BlockKind;
pub use build_state::{BuildHints, NodeMaterialBuildState, SharedBuildData};
pub use compiler::{BuildPhase, CompiledShaders};
pub use connection::Connection;
pub use error::{BuildError, GraphError, UnconnectedInput};
pub use material::{MaterialId, NodeMaterial};
pub use options::{FloatPrecision, NodeMaterialOptions, OptionsError};
pub use port::{ConnectionPoint, PortRef};
pub use serialization::{SerializationError, SerializedMaterial};
pub use types::{BlockTarget, CompatibilityState, ConnectionPointType, PortDirection, Stage};
pub use value::{write_float, ShaderValue};
