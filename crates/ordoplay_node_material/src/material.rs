// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node material: an arena of blocks, their connections and output nodes.

use crate::block::{Block, BlockId};
use crate::blocks::{
    BlockKind, FragmentOutputBlock, InputBlock, SystemValue, TransformBlock, VertexOutputBlock,
};
use crate::compiler::{self, BuildPhase, CompiledShaders};
use crate::connection::Connection;
use crate::error::{BuildError, GraphError};
use crate::options::NodeMaterialOptions;
use crate::port::{ConnectionPoint, PortRef};
use crate::resolve::{is_type_compatible, resolve_types};
use crate::types::{BlockTarget, CompatibilityState, ConnectionPointType, PortDirection};
use crate::value::ShaderValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Unique identifier for a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialId(pub Uuid);

impl MaterialId {
    /// Create a new random material ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MaterialId {
    fn default() -> Self {
        Self::new()
    }
}

/// A shader graph that compiles to a vertex and a fragment shader
#[derive(Debug, Clone)]
pub struct NodeMaterial {
    id: MaterialId,
    /// Material name
    pub name: String,
    /// Code generation options
    pub options: NodeMaterialOptions,
    blocks: IndexMap<BlockId, Block>,
    next_block_id: u32,
    vertex_output_nodes: Vec<BlockId>,
    fragment_output_nodes: Vec<BlockId>,
    build_phase: BuildPhase,
    compiled: Option<CompiledShaders>,
}

impl NodeMaterial {
    /// Create a new empty material
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(MaterialId::new(), name)
    }

    /// Create an empty material with a known ID
    pub fn with_id(id: MaterialId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            options: NodeMaterialOptions::default(),
            blocks: IndexMap::new(),
            next_block_id: 0,
            vertex_output_nodes: Vec::new(),
            fragment_output_nodes: Vec::new(),
            build_phase: BuildPhase::Uninitialized,
            compiled: None,
        }
    }

    /// Create a material holding the default graph
    pub fn create_default(name: impl Into<String>) -> Self {
        let mut material = Self::new(name);
        material.set_to_default();
        material
    }

    /// Material ID
    pub fn id(&self) -> MaterialId {
        self.id
    }

    // ---- Blocks ----

    /// Add a block to the material
    pub fn add_block(&mut self, name: impl Into<String>, kind: impl Into<BlockKind>) -> BlockId {
        let id = self.free_block_id();
        let inserted = self.insert_block(id, name, kind.into());
        debug_assert!(inserted.is_some());
        id
    }

    /// Next unused ID; the lowest free one once the counter is exhausted
    fn free_block_id(&self) -> BlockId {
        if self.next_block_id < u32::MAX {
            return BlockId(self.next_block_id);
        }
        (0..u32::MAX)
            .map(BlockId)
            .find(|id| !self.blocks.contains_key(id))
            .unwrap_or(BlockId(0))
    }

    /// Insert a block under a caller-chosen ID, replacing any block with that ID.
    ///
    /// Returns `None` for `u32::MAX`, which would leave no ID for the next
    /// [`Self::add_block`].
    pub(crate) fn insert_block(
        &mut self,
        id: BlockId,
        name: impl Into<String>,
        kind: BlockKind,
    ) -> Option<()> {
        let next = id.0.checked_add(1)?;
        let block = Block::new(id, name, kind);
        tracing::trace!("Adding block '{}' ({})", block.name, block.class_name());
        self.blocks.insert(id, block);
        self.next_block_id = self.next_block_id.max(next);
        self.invalidate();
        Some(())
    }

    /// Remove a block, its connections and its output node registration
    pub fn remove_block(&mut self, id: BlockId) -> Option<Block> {
        let block = self.blocks.get(&id)?;

        let sources: Vec<(PortRef, PortRef)> = block
            .inputs()
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.connected_point().map(|s| (s, PortRef::input(id, i))))
            .collect();
        let targets: Vec<PortRef> = block
            .outputs()
            .iter()
            .flat_map(|p| p.endpoints().iter().copied())
            .collect();

        for (source, input) in sources {
            if let Some(port) = self.port_mut(source) {
                port.remove_endpoint(input);
            }
        }
        for target in targets {
            if let Some(port) = self.port_mut(target) {
                port.set_connected_point(None);
            }
        }

        self.vertex_output_nodes.retain(|b| *b != id);
        self.fragment_output_nodes.retain(|b| *b != id);
        self.invalidate();

        let mut block = self.blocks.shift_remove(&id)?;
        block.clear_links();
        Some(block)
    }

    /// Get a block by ID
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    /// Get a mutable block by ID
    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.invalidate();
        self.blocks.get_mut(&id)
    }

    /// Blocks in insertion order
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    /// Get the number of blocks
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub(crate) fn block_map(&self) -> &IndexMap<BlockId, Block> {
        &self.blocks
    }

    /// First block with the given name
    pub fn get_block_by_name(&self, name: &str) -> Option<&Block> {
        self.blocks.values().find(|b| b.name == name)
    }

    /// All input blocks
    pub fn input_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks
            .values()
            .filter(|b| matches!(b.kind(), BlockKind::Input(_)))
    }

    /// Set or clear the literal an unconnected input falls back to
    pub fn set_input_default(
        &mut self,
        block: BlockId,
        input: &str,
        value: Option<ShaderValue>,
    ) -> Result<(), GraphError> {
        self.invalidate();
        self.blocks
            .get_mut(&block)
            .ok_or(GraphError::BlockNotFound(block))?
            .set_input_default(input, value)
    }

    // ---- Ports ----

    /// Reference to a named input
    pub fn input(&self, block: BlockId, name: &str) -> Result<PortRef, GraphError> {
        let b = self.blocks.get(&block).ok_or(GraphError::BlockNotFound(block))?;
        let index = b.input_index(name).ok_or_else(|| GraphError::PortNotFound {
            block: b.name.clone(),
            port: name.to_string(),
        })?;
        Ok(PortRef::input(block, index))
    }

    /// Reference to a named output
    pub fn output(&self, block: BlockId, name: &str) -> Result<PortRef, GraphError> {
        let b = self.blocks.get(&block).ok_or(GraphError::BlockNotFound(block))?;
        let index = b.output_index(name).ok_or_else(|| GraphError::PortNotFound {
            block: b.name.clone(),
            port: name.to_string(),
        })?;
        Ok(PortRef::output(block, index))
    }

    /// Port behind a reference
    pub fn port(&self, port: PortRef) -> Option<&ConnectionPoint> {
        let block = self.blocks.get(&port.block)?;
        match port.direction {
            PortDirection::Input => block.inputs().get(port.index),
            PortDirection::Output => block.outputs().get(port.index),
        }
    }

    fn port_mut(&mut self, port: PortRef) -> Option<&mut ConnectionPoint> {
        let block = self.blocks.get_mut(&port.block)?;
        match port.direction {
            PortDirection::Input => block.input_mut(port.index),
            PortDirection::Output => block.output_mut(port.index),
        }
    }

    /// Current type of a port, with placeholders resolved where possible
    pub fn port_type(&self, port: PortRef) -> Option<ConnectionPointType> {
        self.port(port)?;
        resolve_types(&self.blocks).get(port)
    }

    fn port_label(&self, port: PortRef) -> (String, String) {
        let block = self
            .blocks
            .get(&port.block)
            .map_or_else(|| format!("{:?}", port.block), |b| b.name.clone());
        let name = self
            .port(port)
            .map_or_else(|| port.index.to_string(), |p| p.name.clone());
        (block, name)
    }

    fn validate_link(&self, from: PortRef, to: PortRef) -> Result<(), GraphError> {
        if from.direction != PortDirection::Output || to.direction != PortDirection::Input {
            return Err(GraphError::InvalidDirection);
        }
        for port in [from, to] {
            if !self.blocks.contains_key(&port.block) {
                return Err(GraphError::BlockNotFound(port.block));
            }
            if self.port(port).is_none() {
                let (block, port) = self.port_label(port);
                return Err(GraphError::PortNotFound { block, port });
            }
        }
        Ok(())
    }

    // ---- Connections ----

    /// Whether `from` may feed `to`, without connecting them.
    ///
    /// Outputs whose type is still a placeholder are accepted; they are
    /// checked again with resolved types when the material compiles.
    pub fn can_connect(&self, from: PortRef, to: PortRef) -> Result<CompatibilityState, GraphError> {
        self.validate_link(from, to)?;
        let (Some(source), Some(target), Some(input)) = (
            self.blocks.get(&from.block),
            self.blocks.get(&to.block),
            self.port(to),
        ) else {
            return Err(GraphError::BlockNotFound(from.block));
        };

        if source.target() == BlockTarget::Fragment
            && (target.target() == BlockTarget::Vertex || self.feeds_vertex(to.block))
        {
            return Ok(CompatibilityState::TargetIncompatible);
        }

        let source_type = match resolve_types(&self.blocks).get(from) {
            Some(ty) if !ty.is_placeholder() => ty,
            _ => return Ok(CompatibilityState::Compatible),
        };
        if is_type_compatible(source_type, input) {
            Ok(CompatibilityState::Compatible)
        } else {
            Ok(CompatibilityState::TypeIncompatible)
        }
    }

    /// Whether a block's value reaches a vertex-only block or a vertex output
    fn feeds_vertex(&self, start: BlockId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(block) = self.blocks.get(&id) else {
                continue;
            };
            if block.target() == BlockTarget::Vertex || self.vertex_output_nodes.contains(&id) {
                return true;
            }
            for output in block.outputs() {
                stack.extend(output.endpoints().iter().map(|p| p.block));
            }
        }
        false
    }

    /// Connect an output to an input, replacing the input's previous source
    pub fn connect(&mut self, from: PortRef, to: PortRef) -> Result<(), GraphError> {
        let state = self.can_connect(from, to)?;
        if state != CompatibilityState::Compatible {
            let (from_block, from_port) = self.port_label(from);
            let (to_block, to_port) = self.port_label(to);
            tracing::debug!(
                "Refusing connection {}.{} -> {}.{}: {}",
                from_block,
                from_port,
                to_block,
                to_port,
                state
            );
            return Err(GraphError::Incompatible {
                from_block,
                from_port,
                to_block,
                to_port,
                state,
            });
        }
        self.link(from, to);
        Ok(())
    }

    /// Connect without compatibility checks; types are still verified at compile time
    pub fn connect_unchecked(&mut self, from: PortRef, to: PortRef) -> Result<(), GraphError> {
        self.validate_link(from, to)?;
        self.link(from, to);
        Ok(())
    }

    /// Connect by block and port names
    pub fn connect_by_name(
        &mut self,
        from_block: BlockId,
        from_port: &str,
        to_block: BlockId,
        to_port: &str,
    ) -> Result<(), GraphError> {
        let from = self.output(from_block, from_port)?;
        let to = self.input(to_block, to_port)?;
        self.connect(from, to)
    }

    fn link(&mut self, from: PortRef, to: PortRef) {
        self.disconnect(to);
        if let Some(input) = self.port_mut(to) {
            input.set_connected_point(Some(from));
        }
        if let Some(output) = self.port_mut(from) {
            output.add_endpoint(to);
        }
        self.invalidate();
    }

    /// Disconnect an input, returning its previous source
    pub fn disconnect(&mut self, input: PortRef) -> Option<PortRef> {
        if input.direction != PortDirection::Input {
            return None;
        }
        let source = self.port(input)?.connected_point()?;
        if let Some(port) = self.port_mut(input) {
            port.set_connected_point(None);
        }
        if let Some(port) = self.port_mut(source) {
            port.remove_endpoint(input);
        }
        self.invalidate();
        Some(source)
    }

    /// Connect the first output of `from` to the first free compatible input of `to`
    pub fn connect_blocks(
        &mut self,
        from: BlockId,
        to: BlockId,
    ) -> Result<(PortRef, PortRef), GraphError> {
        let source = self.blocks.get(&from).ok_or(GraphError::BlockNotFound(from))?;
        let target = self.blocks.get(&to).ok_or(GraphError::BlockNotFound(to))?;
        let no_match = || GraphError::NoCompatiblePorts {
            from: source.name.clone(),
            to: target.name.clone(),
        };
        if source.outputs().is_empty() {
            return Err(no_match());
        }

        let output = PortRef::output(from, 0);
        let free = target
            .inputs()
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_connected())
            .map(|(i, _)| PortRef::input(to, i))
            .find(|input| {
                matches!(self.can_connect(output, *input), Ok(CompatibilityState::Compatible))
            });

        let input = free.ok_or_else(no_match)?;
        self.link(output, input);
        Ok((output, input))
    }

    /// All connections, in block then input order
    pub fn connections(&self) -> Vec<Connection> {
        let mut connections = Vec::new();
        for (id, block) in &self.blocks {
            for input in block.inputs() {
                let Some(source) = input.connected_point() else {
                    continue;
                };
                let (_, from_port) = self.port_label(source);
                connections.push(Connection::new(source.block, from_port, *id, input.name.clone()));
            }
        }
        connections
    }

    // ---- Output nodes ----

    /// Register a final merger as a vertex or fragment output node
    pub fn add_output_node(&mut self, id: BlockId) -> Result<(), GraphError> {
        let block = self.blocks.get(&id).ok_or(GraphError::BlockNotFound(id))?;
        if !block.is_final_merger() {
            return Err(GraphError::NotAnOutputNode(block.name.clone()));
        }
        let list = match block.target() {
            BlockTarget::Vertex => &mut self.vertex_output_nodes,
            _ => &mut self.fragment_output_nodes,
        };
        if !list.contains(&id) {
            list.push(id);
        }
        self.invalidate();
        Ok(())
    }

    /// Unregister an output node
    pub fn remove_output_node(&mut self, id: BlockId) -> bool {
        let before = self.vertex_output_nodes.len() + self.fragment_output_nodes.len();
        self.vertex_output_nodes.retain(|b| *b != id);
        self.fragment_output_nodes.retain(|b| *b != id);
        let removed = before != self.vertex_output_nodes.len() + self.fragment_output_nodes.len();
        if removed {
            self.invalidate();
        }
        removed
    }

    /// Registered vertex output nodes
    pub fn vertex_output_nodes(&self) -> &[BlockId] {
        &self.vertex_output_nodes
    }

    /// Registered fragment output nodes
    pub fn fragment_output_nodes(&self) -> &[BlockId] {
        &self.fragment_output_nodes
    }

    // ---- Lifecycle ----

    /// Remove every block and output node
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.vertex_output_nodes.clear();
        self.fragment_output_nodes.clear();
        self.next_block_id = 0;
        self.compiled = None;
        self.build_phase = BuildPhase::Uninitialized;
    }

    /// Replace the graph with the default material: a transformed position
    /// and a uniform color
    pub fn set_to_default(&mut self) {
        self.clear();
        if let Err(err) = self.populate_default() {
            tracing::error!("Failed to create default material graph: {}", err);
            self.clear();
        }
    }

    fn populate_default(&mut self) -> Result<(), GraphError> {
        let position = self.add_block("position", InputBlock::attribute(ConnectionPointType::Vector3));
        let world = self.add_block("world", InputBlock::system_value(SystemValue::World));
        let world_pos = self.add_block("worldPos", TransformBlock::default());
        self.connect_by_name(position, "output", world_pos, "vector")?;
        self.connect_by_name(world, "output", world_pos, "transform")?;

        let view_projection = self.add_block(
            "viewProjection",
            InputBlock::system_value(SystemValue::ViewProjection),
        );
        let clip_pos = self.add_block("worldPos * viewProjectionTransform", TransformBlock::default());
        self.connect_by_name(world_pos, "output", clip_pos, "vector")?;
        self.connect_by_name(view_projection, "output", clip_pos, "transform")?;

        let vertex_output = self.add_block("vertexOutput", VertexOutputBlock {});
        self.connect_by_name(clip_pos, "output", vertex_output, "vector")?;

        let color = self.add_block(
            "color",
            InputBlock::uniform(ShaderValue::Color4([0.8, 0.8, 0.8, 1.0])),
        );
        let fragment_output = self.add_block("fragmentOutput", FragmentOutputBlock::default());
        self.connect_by_name(color, "output", fragment_output, "rgba")?;

        self.add_output_node(vertex_output)?;
        self.add_output_node(fragment_output)?;
        Ok(())
    }

    // ---- Compilation ----

    /// Compile both stages without touching the material's build state
    pub fn compile(&self) -> Result<CompiledShaders, BuildError> {
        compiler::compile(self).map_err(|(_, err)| err)
    }

    /// Compile and store the result.
    ///
    /// On failure the previously compiled shaders are kept and the phase is
    /// set to [`BuildPhase::Error`].
    pub fn build(&mut self) -> Result<&CompiledShaders, BuildError> {
        match compiler::compile(self) {
            Ok(shaders) => {
                tracing::info!("Built material '{}'", self.name);
                self.build_phase = BuildPhase::Finalized;
                let shaders = self.compiled.insert(shaders);
                Ok(&*shaders)
            }
            Err((phase, err)) => {
                tracing::warn!("Material '{}' failed to build after {:?}: {}", self.name, phase, err);
                self.build_phase = BuildPhase::Error;
                Err(err)
            }
        }
    }

    /// Last successfully compiled shaders
    pub fn compiled(&self) -> Option<&CompiledShaders> {
        self.compiled.as_ref()
    }

    /// Phase reached by the last build
    pub fn build_phase(&self) -> BuildPhase {
        self.build_phase
    }

    /// Whether the last build succeeded and the graph is unchanged since
    pub fn build_was_successful(&self) -> bool {
        self.build_phase == BuildPhase::Finalized
    }

    fn invalidate(&mut self) {
        self.build_phase = BuildPhase::Uninitialized;
    }
}

impl Default for NodeMaterial {
    fn default() -> Self {
        Self::new("Untitled")
    }
}
