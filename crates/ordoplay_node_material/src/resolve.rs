// SPDX-License-Identifier: MIT OR Apache-2.0
//! Type resolution for placeholder ports.
//!
//! Resolution is a single global fixed point over every port of the
//! material. Each pass visits blocks in insertion order and applies:
//!
//! - An `AutoDetect` (or `Vector3OrVector4` / `Color3OrColor4`) input takes,
//!   in order of precedence, the type of its connected source, the type of
//!   its default literal, or the "own" type of its linked partner. A
//!   partner's own type comes from the partner's connection or default
//!   only, never from the partner's partner.
//! - A concrete input keeps its declared type unless its source type is in
//!   its accepted list, in which case it takes the source type.
//! - A `BasedOnInput` output copies its source input once that is concrete.
//!
//! Passes repeat until nothing changes. Ports that stay placeholders are
//! reported by [`verify_types`] only if they take part in the build.

use crate::block::{Block, BlockId};
use crate::error::BuildError;
use crate::port::{ConnectionPoint, PortRef};
use crate::types::ConnectionPointType;
use indexmap::IndexMap;
use std::collections::HashMap;

/// Resolved type of every port
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    types: HashMap<PortRef, ConnectionPointType>,
}

impl TypeTable {
    /// Resolved type of a port
    pub fn get(&self, port: PortRef) -> Option<ConnectionPointType> {
        self.types.get(&port).copied()
    }

    fn set(&mut self, port: PortRef, ty: ConnectionPointType) -> bool {
        self.types.insert(port, ty) != Some(ty)
    }

    fn concrete(&self, port: PortRef) -> Option<ConnectionPointType> {
        self.get(port).filter(|t| !t.is_placeholder())
    }
}

/// Whether a value of type `source` may feed `input`.
///
/// `source` must be concrete; placeholder inputs are judged by their
/// declared constraint.
pub fn is_type_compatible(source: ConnectionPointType, input: &ConnectionPoint) -> bool {
    if input.excluded_types().contains(&source) {
        return false;
    }
    if input.accepted_types().contains(&source) {
        return true;
    }
    match input.inner_type() {
        ConnectionPointType::AutoDetect | ConnectionPointType::BasedOnInput => true,
        ConnectionPointType::Vector3OrVector4 | ConnectionPointType::Color3OrColor4 => {
            source.is_vector3_or_4()
        }
        declared => declared.is_equivalent(source),
    }
}

/// Type an input carries by itself: from its connection, else its default
fn own_type(table: &TypeTable, input: &ConnectionPoint) -> Option<ConnectionPointType> {
    match input.connected_point() {
        Some(source) => table.concrete(source),
        None => input.default_value().map(|v| v.connection_type()),
    }
}

fn resolve_input(table: &TypeTable, block: &Block, index: usize) -> Option<ConnectionPointType> {
    let input = &block.inputs()[index];
    let declared = input.inner_type();

    if !declared.is_placeholder() {
        let widened = input
            .connected_point()
            .and_then(|source| table.concrete(source))
            .filter(|t| input.accepted_types().contains(t));
        return Some(widened.unwrap_or(declared));
    }

    own_type(table, input).or_else(|| {
        input
            .linked_connection_source()
            .and_then(|partner| block.inputs().get(partner))
            .and_then(|partner| own_type(table, partner))
    })
}

/// Resolve every port of `blocks`
pub fn resolve_types(blocks: &IndexMap<BlockId, Block>) -> TypeTable {
    let mut table = TypeTable::default();
    let mut port_count = 0;
    for (id, block) in blocks {
        for (i, port) in block.inputs().iter().enumerate() {
            table.set(PortRef::input(*id, i), port.inner_type());
        }
        for (i, port) in block.outputs().iter().enumerate() {
            table.set(PortRef::output(*id, i), port.inner_type());
        }
        port_count += block.inputs().len() + block.outputs().len();
    }

    // Each pass settles at least one more port, so this bound is never hit
    // by a converging graph.
    for pass in 0..=port_count {
        let mut changed = false;
        for (id, block) in blocks {
            for i in 0..block.inputs().len() {
                if let Some(ty) = resolve_input(&table, block, i) {
                    changed |= table.set(PortRef::input(*id, i), ty);
                }
            }
            for (i, output) in block.outputs().iter().enumerate() {
                if output.inner_type() != ConnectionPointType::BasedOnInput {
                    continue;
                }
                let source = output
                    .type_connection_source()
                    .and_then(|s| table.concrete(PortRef::input(*id, s)));
                if let Some(ty) = source {
                    changed |= table.set(PortRef::output(*id, i), ty);
                }
            }
        }
        if !changed {
            tracing::trace!("Type resolution settled after {} passes", pass + 1);
            break;
        }
    }
    table
}

fn port_name(blocks: &IndexMap<BlockId, Block>, port: PortRef) -> (String, String) {
    let Some(block) = blocks.get(&port.block) else {
        return (format!("{:?}", port.block), port.index.to_string());
    };
    let list = match port.direction {
        crate::types::PortDirection::Input => block.inputs(),
        crate::types::PortDirection::Output => block.outputs(),
    };
    let name = list
        .get(port.index)
        .map_or_else(|| port.index.to_string(), |p| p.name.clone());
    (block.name.clone(), name)
}

/// Check that the ports of `active` blocks are fully and consistently typed
pub fn verify_types(
    blocks: &IndexMap<BlockId, Block>,
    active: &[BlockId],
    table: &TypeTable,
) -> Result<(), BuildError> {
    let unresolved = |port: PortRef| {
        let (block, port) = port_name(blocks, port);
        BuildError::UnresolvedType { block, port }
    };

    for id in active {
        let Some(block) = blocks.get(id) else {
            continue;
        };

        for (i, input) in block.inputs().iter().enumerate() {
            if !input.is_connected() && input.default_value().is_none() {
                continue;
            }
            let port = PortRef::input(*id, i);
            let ty = table.concrete(port).ok_or_else(|| unresolved(port))?;

            if let Some(source) = input.connected_point() {
                let source_ty = table.concrete(source).ok_or_else(|| unresolved(source))?;
                if !is_type_compatible(source_ty, input) {
                    let (from_block, from_port) = port_name(blocks, source);
                    return Err(BuildError::IncompatibleTypes {
                        from_block,
                        from_port,
                        from_type: source_ty,
                        to_block: block.name.clone(),
                        to_port: input.name.clone(),
                        to_type: input.inner_type(),
                    });
                }
            }

            if let Some(partner_index) = input.linked_connection_source() {
                let partner = &block.inputs()[partner_index];
                if !partner.is_connected() && partner.default_value().is_none() {
                    continue;
                }
                let partner_ty = table
                    .concrete(PortRef::input(*id, partner_index))
                    .ok_or_else(|| unresolved(PortRef::input(*id, partner_index)))?;
                if !ty.is_equivalent(partner_ty) {
                    return Err(BuildError::LinkedTypeConflict {
                        block: block.name.clone(),
                        left: input.name.clone(),
                        left_type: ty,
                        right: partner.name.clone(),
                        right_type: partner_ty,
                    });
                }
            }
        }

        for i in 0..block.outputs().len() {
            let port = PortRef::output(*id, i);
            table.concrete(port).ok_or_else(|| unresolved(port))?;
        }
    }
    Ok(())
}
