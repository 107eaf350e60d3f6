// SPDX-License-Identifier: MIT OR Apache-2.0
//! Errors raised while editing or compiling a node material.

use crate::block::BlockId;
use crate::types::{CompatibilityState, ConnectionPointType, Stage};
use std::fmt;

/// Error when editing the graph
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// Block not found
    #[error("Block not found: {0:?}")]
    BlockNotFound(BlockId),

    /// Port not found on a block
    #[error("Port '{port}' not found on block '{block}'")]
    PortNotFound {
        /// Block name
        block: String,
        /// Port name or index
        port: String,
    },

    /// Connection must go from an output to an input
    #[error("Connections must go from an output to an input")]
    InvalidDirection,

    /// Port types or targets cannot be reconciled
    #[error("Cannot connect {from_block}.{from_port} to {to_block}.{to_port}: {state}")]
    Incompatible {
        /// Source block name
        from_block: String,
        /// Source port name
        from_port: String,
        /// Target block name
        to_block: String,
        /// Target port name
        to_port: String,
        /// Why the connection was refused
        state: CompatibilityState,
    },

    /// Only final mergers can be output nodes
    #[error("Block '{0}' is not a vertex or fragment output block")]
    NotAnOutputNode(String),

    /// No output of one block fits a free input of the other
    #[error("No compatible ports between '{from}' and '{to}'")]
    NoCompatiblePorts {
        /// Source block name
        from: String,
        /// Target block name
        to: String,
    },
}

/// A required input left unconnected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnconnectedInput {
    /// Block name
    pub block: String,
    /// Port name
    pub port: String,
}

impl fmt::Display for UnconnectedInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.block, self.port)
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Error when compiling a node material
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    /// A stage has no output node to start from
    #[error("No {0} output node registered")]
    MissingOutputNode(Stage),

    /// A terminal block is not reachable from the output nodes
    #[error("Output block '{0}' is not registered as an output node")]
    UnreachableTerminal(String),

    /// A stage finished without writing its output
    #[error("The {0} stage did not emit a final output")]
    NoFinalOutput(Stage),

    /// Data dependencies form a cycle
    #[error("Cycle detected between blocks: {}", .blocks.join(" -> "))]
    Cycle {
        /// Blocks on the cycle, in dependency order
        blocks: Vec<String>,
    },

    /// Required inputs have no connection and no default
    #[error("Unconnected required inputs: {}", join(.0))]
    MissingInputs(Vec<UnconnectedInput>),

    /// A placeholder type survived resolution
    #[error("Cannot resolve type of {block}.{port}")]
    UnresolvedType {
        /// Block name
        block: String,
        /// Port name
        port: String,
    },

    /// Two linked inputs resolved to different types
    #[error("Linked inputs {block}.{left} ({left_type}) and {block}.{right} ({right_type}) disagree")]
    LinkedTypeConflict {
        /// Block name
        block: String,
        /// First input
        left: String,
        /// Type of the first input
        left_type: ConnectionPointType,
        /// Second input
        right: String,
        /// Type of the second input
        right_type: ConnectionPointType,
    },

    /// A connection is illegal once types are resolved
    #[error("{from_block}.{from_port} ({from_type}) cannot feed {to_block}.{to_port} ({to_type})")]
    IncompatibleTypes {
        /// Source block name
        from_block: String,
        /// Source port name
        from_port: String,
        /// Resolved source type
        from_type: ConnectionPointType,
        /// Target block name
        to_block: String,
        /// Target port name
        to_port: String,
        /// Resolved or declared target type
        to_type: ConnectionPointType,
    },

    /// A block cannot emit code for this combination of input types
    #[error("Block '{block}' does not support {detail}")]
    UnsupportedTypes {
        /// Block name
        block: String,
        /// What was rejected
        detail: String,
    },

    /// A block's inputs are connected in an invalid pattern
    #[error("Block '{block}': {detail}")]
    InvalidBlockInputs {
        /// Block name
        block: String,
        /// What is wrong
        detail: String,
    },

    /// A block was scheduled in a stage its target does not allow
    #[error("Block '{block}' cannot run in the {stage} stage")]
    StageMismatch {
        /// Block name
        block: String,
        /// Offending stage
        stage: Stage,
    },

    /// A fixed identifier collides with a GLSL keyword or builtin
    #[error("Block '{block}' uses the reserved identifier '{name}'")]
    ReservedName {
        /// Block name
        block: String,
        /// Rejected identifier
        name: String,
    },

    /// One attribute name was declared with two types
    #[error("Attribute '{name}' declared as {declared} and {requested}")]
    AttributeTypeConflict {
        /// Attribute name
        name: String,
        /// Type of the first declaration
        declared: String,
        /// Type of the conflicting declaration
        requested: String,
    },

    /// A shared snippet does not exist
    #[error("Unknown include: {0}")]
    UnknownInclude(String),

    /// An input block has no value to inline
    #[error("Block '{0}' has no value")]
    MissingValue(String),

    /// A port's variable was read before its block was built
    #[error("Variable for {block}.{port} read before the block was built")]
    VariableNotBuilt {
        /// Block name
        block: String,
        /// Port name
        port: String,
    },

    /// A block asked for a port it does not declare
    #[error("Block '{block}' has no port '{port}'")]
    UnknownPort {
        /// Block name
        block: String,
        /// Port name
        port: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_inputs_message() {
        let err = BuildError::MissingInputs(vec![
            UnconnectedInput {
                block: "add".into(),
                port: "left".into(),
            },
            UnconnectedInput {
                block: "add".into(),
                port: "right".into(),
            },
        ]);
        assert_eq!(
            err.to_string(),
            "Unconnected required inputs: add.left, add.right"
        );
    }

    #[test]
    fn test_cycle_message() {
        let err = BuildError::Cycle {
            blocks: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "Cycle detected between blocks: a -> b");
    }
}
