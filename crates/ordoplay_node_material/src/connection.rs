// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) view of a material graph.

use crate::block::BlockId;
use serde::{Deserialize, Serialize};

/// A link from a block output to a block input, by port name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Source block
    pub from_block: BlockId,
    /// Source output name
    pub from_port: String,
    /// Target block
    pub to_block: BlockId,
    /// Target input name
    pub to_port: String,
}

impl Connection {
    /// Create a new connection
    pub fn new(
        from_block: BlockId,
        from_port: impl Into<String>,
        to_block: BlockId,
        to_port: impl Into<String>,
    ) -> Self {
        Self {
            from_block,
            from_port: from_port.into(),
            to_block,
            to_port: to_port.into(),
        }
    }

    /// Check if this connection involves a specific block
    pub fn involves_block(&self, block: BlockId) -> bool {
        self.from_block == block || self.to_block == block
    }
}
