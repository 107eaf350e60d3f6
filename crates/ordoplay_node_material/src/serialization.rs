// SPDX-License-Identifier: MIT OR Apache-2.0
//! JSON document format for node materials.

use crate::block::{Block, BlockId};
use crate::blocks::BlockKind;
use crate::connection::Connection;
use crate::error::GraphError;
use crate::material::{MaterialId, NodeMaterial};
use crate::options::NodeMaterialOptions;
use crate::value::ShaderValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Current document format version
pub const MATERIAL_FORMAT_VERSION: u32 = 1;

fn default_version() -> u32 {
    MATERIAL_FORMAT_VERSION
}

/// Serialized form of a [`NodeMaterial`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedMaterial {
    /// Format version
    #[serde(default = "default_version")]
    pub version: u32,
    /// Material ID
    pub id: MaterialId,
    /// Material name
    pub name: String,
    /// Code generation options
    #[serde(default)]
    pub options: NodeMaterialOptions,
    /// Blocks in insertion order
    pub blocks: Vec<SerializedBlock>,
    /// Connections by port name
    #[serde(default)]
    pub connections: Vec<Connection>,
    /// Registered vertex output nodes
    #[serde(default)]
    pub vertex_output_nodes: Vec<BlockId>,
    /// Registered fragment output nodes
    #[serde(default)]
    pub fragment_output_nodes: Vec<BlockId>,
}

/// Serialized block: identity plus the block's own properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedBlock {
    /// Block ID
    pub id: BlockId,
    /// Block name
    pub name: String,
    /// Comment written above the block's code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    /// Input defaults that differ from the block's registered ones
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub input_defaults: IndexMap<String, Option<ShaderValue>>,
    /// Class name and properties
    #[serde(flatten)]
    pub kind: BlockKind,
}

impl SerializedBlock {
    fn from_block(block: &Block) -> Self {
        let pristine = Block::new(block.id(), block.name.clone(), block.kind().clone());
        let input_defaults = block
            .inputs()
            .iter()
            .zip(pristine.inputs())
            .filter(|(current, registered)| current.default_value() != registered.default_value())
            .map(|(current, _)| (current.name.clone(), current.default_value().cloned()))
            .collect();

        Self {
            id: block.id(),
            name: block.name.clone(),
            comments: block.comments.clone(),
            input_defaults,
            kind: block.kind().clone(),
        }
    }
}

/// Error when reading or restoring a material document
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    /// Malformed JSON or unknown block class
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Document written by a newer version
    #[error("Material version {0} is newer than supported version {MATERIAL_FORMAT_VERSION}")]
    UnsupportedVersion(u32),

    /// Two blocks share an ID
    #[error("Duplicate block id {0:?}")]
    DuplicateBlock(BlockId),

    /// A block ID outside the usable range
    #[error("Block id {0:?} is out of range")]
    InvalidBlockId(BlockId),

    /// A connection or output node names a missing block
    #[error("Unknown block id {0:?}")]
    UnknownBlock(BlockId),

    /// A connection names a missing port
    #[error("Unknown port '{port}' on block '{block}'")]
    UnknownPort {
        /// Block name
        block: String,
        /// Port name
        port: String,
    },

    /// The restored graph was rejected
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// File could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SerializedMaterial {
    /// Capture a material
    pub fn from_material(material: &NodeMaterial) -> Self {
        Self {
            version: MATERIAL_FORMAT_VERSION,
            id: material.id(),
            name: material.name.clone(),
            options: material.options.clone(),
            blocks: material.blocks().map(SerializedBlock::from_block).collect(),
            connections: material.connections(),
            vertex_output_nodes: material.vertex_output_nodes().to_vec(),
            fragment_output_nodes: material.fragment_output_nodes().to_vec(),
        }
    }

    /// Rebuild the material, keeping block IDs and order
    pub fn into_material(self) -> Result<NodeMaterial, SerializationError> {
        if self.version > MATERIAL_FORMAT_VERSION {
            return Err(SerializationError::UnsupportedVersion(self.version));
        }

        let mut material = NodeMaterial::with_id(self.id, self.name);
        material.options = self.options;

        let mut seen = HashSet::new();
        for block in self.blocks {
            if !seen.insert(block.id) {
                return Err(SerializationError::DuplicateBlock(block.id));
            }
            material
                .insert_block(block.id, block.name, block.kind)
                .ok_or(SerializationError::InvalidBlockId(block.id))?;
            let restored = material
                .block_mut(block.id)
                .ok_or(SerializationError::UnknownBlock(block.id))?;
            restored.comments = block.comments;
            for (input, value) in block.input_defaults {
                restored.set_input_default(&input, value)?;
            }
        }

        for connection in &self.connections {
            let from = lookup(&material, connection.from_block, &connection.from_port, true)?;
            let to = lookup(&material, connection.to_block, &connection.to_port, false)?;
            material.connect_unchecked(from, to)?;
        }

        for id in self
            .vertex_output_nodes
            .iter()
            .chain(&self.fragment_output_nodes)
        {
            if material.block(*id).is_none() {
                return Err(SerializationError::UnknownBlock(*id));
            }
            material.add_output_node(*id)?;
        }

        tracing::debug!(
            "Restored material '{}' with {} blocks",
            material.name,
            material.block_count()
        );
        Ok(material)
    }
}

fn lookup(
    material: &NodeMaterial,
    block: BlockId,
    port: &str,
    output: bool,
) -> Result<crate::port::PortRef, SerializationError> {
    let b = material
        .block(block)
        .ok_or(SerializationError::UnknownBlock(block))?;
    let found = if output {
        material.output(block, port)
    } else {
        material.input(block, port)
    };
    found.map_err(|_| SerializationError::UnknownPort {
        block: b.name.clone(),
        port: port.to_string(),
    })
}

impl NodeMaterial {
    /// Serialize to a pretty-printed JSON document
    pub fn to_json(&self) -> Result<String, SerializationError> {
        Ok(serde_json::to_string_pretty(
            &SerializedMaterial::from_material(self),
        )?)
    }

    /// Deserialize from a JSON document
    pub fn from_json(s: &str) -> Result<Self, SerializationError> {
        let document: SerializedMaterial = serde_json::from_str(s)?;
        document.into_material()
    }

    /// Save the material to a JSON file
    pub fn save(&self, path: &Path) -> Result<(), SerializationError> {
        std::fs::write(path, self.to_json()?)?;
        tracing::info!("Saved material '{}' to {}", self.name, path.display());
        Ok(())
    }

    /// Load a material from a JSON file
    pub fn load(path: &Path) -> Result<Self, SerializationError> {
        let content = std::fs::read_to_string(path)?;
        let material = Self::from_json(&content)?;
        tracing::info!("Loaded material '{}' from {}", material.name, path.display());
        Ok(material)
    }
}
