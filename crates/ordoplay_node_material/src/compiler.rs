// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compile driver: validates a material and builds both shader stages.
//!
//! A compile walks through these phases:
//!
//! 1. **`PortsLinked`**: output nodes are present and every final merger is
//!    registered as one.
//! 2. **`TypesResolved`**: the blocks reachable from the output nodes are
//!    acyclic, their required inputs are fed and every port has a concrete
//!    type.
//! 3. **`VertexBuilt`** / **`FragmentBuilt`**: blocks are built depth first,
//!    dependencies before consumers, once per stage. Values produced by
//!    vertex-only blocks reach the fragment stage through varyings.
//! 4. **`Finalized`**: both stages wrote their output and the sources are
//!    assembled.
//!
//! Compiles are all-or-nothing: the first error aborts and no source is
//! returned.

use crate::block::{Block, BlockBuildContext, BlockId, InputBinding, OutputBinding};
use crate::blocks::BlockKind;
use crate::build_state::{BuildHints, NodeMaterialBuildState, SharedBuildData};
use crate::error::{BuildError, UnconnectedInput};
use crate::material::NodeMaterial;
use crate::port::PortRef;
use crate::resolve::{resolve_types, verify_types, TypeTable};
use crate::types::{BlockTarget, ConnectionPointType, Stage};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Progress of a material build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum BuildPhase {
    /// Not built, or modified since the last build
    #[default]
    Uninitialized,
    /// Output nodes checked
    PortsLinked,
    /// Graph validated and every port typed
    TypesResolved,
    /// Vertex stage emitted
    VertexBuilt,
    /// Fragment stage emitted
    FragmentBuilt,
    /// Both sources assembled
    Finalized,
    /// The last build failed
    Error,
}

/// Output of a successful compile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledShaders {
    /// Vertex shader source
    pub vertex: String,
    /// Fragment shader source
    pub fragment: String,
    /// Vertex attributes, in declaration order
    pub attributes: Vec<String>,
    /// Uniforms of both stages, vertex first, without duplicates
    pub uniforms: Vec<String>,
    /// Samplers of both stages, without duplicates
    pub samplers: Vec<String>,
    /// Render state the material needs
    pub hints: BuildHints,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Compile `material`, reporting the phase reached on failure
pub(crate) fn compile(
    material: &NodeMaterial,
) -> Result<CompiledShaders, (BuildPhase, BuildError)> {
    let mut compiler = Compiler::new(material);
    compiler.run().map_err(|err| (compiler.phase, err))
}

struct Compiler<'a> {
    material: &'a NodeMaterial,
    blocks: &'a IndexMap<BlockId, Block>,
    phase: BuildPhase,
    types: TypeTable,
    names: HashMap<PortRef, String>,
}

impl<'a> Compiler<'a> {
    fn new(material: &'a NodeMaterial) -> Self {
        Self {
            material,
            blocks: material.block_map(),
            phase: BuildPhase::Uninitialized,
            types: TypeTable::default(),
            names: HashMap::new(),
        }
    }

    fn advance(&mut self, phase: BuildPhase) {
        tracing::debug!(
            "Material '{}': {:?} -> {:?}",
            self.material.name,
            self.phase,
            phase
        );
        self.phase = phase;
    }

    fn block(&self, id: BlockId) -> Result<&'a Block, BuildError> {
        let blocks: &'a IndexMap<BlockId, Block> = self.blocks;
        blocks
            .get(&id)
            .ok_or_else(|| BuildError::UnreachableTerminal(format!("{id:?}")))
    }

    fn run(&mut self) -> Result<CompiledShaders, BuildError> {
        self.check_output_nodes()?;
        self.advance(BuildPhase::PortsLinked);

        let roots: Vec<BlockId> = self
            .material
            .vertex_output_nodes()
            .iter()
            .chain(self.material.fragment_output_nodes())
            .copied()
            .collect();
        let order = self.dependency_order(&roots)?;
        self.check_required_inputs(&order)?;

        self.types = resolve_types(self.blocks);
        verify_types(self.blocks, &order, &self.types)?;
        self.advance(BuildPhase::TypesResolved);

        let mut shared = SharedBuildData::new(&self.material.options);
        self.allocate_names(&order, &mut shared)?;

        let mut vertex = NodeMaterialBuildState::new(Stage::Vertex, shared);
        let mut built = HashSet::new();
        for root in self.vertex_roots()? {
            self.build_block(root, &mut vertex, &mut built)?;
        }
        self.advance(BuildPhase::VertexBuilt);

        let mut fragment =
            NodeMaterialBuildState::new(Stage::Fragment, std::mem::take(&mut vertex.shared));
        let mut built = HashSet::new();
        for root in self.material.fragment_output_nodes() {
            self.build_block(*root, &mut fragment, &mut built)?;
        }
        self.advance(BuildPhase::FragmentBuilt);

        let checks = fragment.shared.checks;
        if !checks.emit_vertex {
            return Err(BuildError::NoFinalOutput(Stage::Vertex));
        }
        if !checks.emit_fragment {
            return Err(BuildError::NoFinalOutput(Stage::Fragment));
        }

        let fragment_source = fragment.finalize();
        vertex.shared = std::mem::take(&mut fragment.shared);
        let vertex_source = vertex.finalize();

        let mut uniforms = vertex.uniforms().to_vec();
        for name in fragment.uniforms() {
            if !uniforms.contains(name) {
                uniforms.push(name.clone());
            }
        }
        let mut samplers = vertex.samplers().to_vec();
        for name in fragment.samplers() {
            if !samplers.contains(name) {
                samplers.push(name.clone());
            }
        }

        self.advance(BuildPhase::Finalized);
        tracing::debug!(
            "Material '{}' compiled: {} uniforms, {} varyings",
            self.material.name,
            uniforms.len(),
            vertex.shared.varying_count()
        );

        Ok(CompiledShaders {
            vertex: vertex_source,
            fragment: fragment_source,
            attributes: vertex.attributes(),
            uniforms,
            samplers,
            hints: vertex.shared.hints,
        })
    }

    fn check_output_nodes(&self) -> Result<(), BuildError> {
        if self.material.vertex_output_nodes().is_empty() {
            return Err(BuildError::MissingOutputNode(Stage::Vertex));
        }
        if self.material.fragment_output_nodes().is_empty() {
            return Err(BuildError::MissingOutputNode(Stage::Fragment));
        }
        let registered = |id: &BlockId| {
            self.material.vertex_output_nodes().contains(id)
                || self.material.fragment_output_nodes().contains(id)
        };
        for (id, block) in self.blocks {
            if block.is_final_merger() && !registered(id) {
                return Err(BuildError::UnreachableTerminal(block.name.clone()));
            }
        }
        Ok(())
    }

    /// Blocks reachable from `roots`, dependencies first
    fn dependency_order(&self, roots: &[BlockId]) -> Result<Vec<BlockId>, BuildError> {
        let mut marks = HashMap::new();
        let mut path = Vec::new();
        let mut order = Vec::new();
        for root in roots {
            self.visit(*root, &mut marks, &mut path, &mut order)?;
        }
        Ok(order)
    }

    fn visit(
        &self,
        id: BlockId,
        marks: &mut HashMap<BlockId, Mark>,
        path: &mut Vec<BlockId>,
        order: &mut Vec<BlockId>,
    ) -> Result<(), BuildError> {
        match marks.get(&id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = path.iter().position(|b| *b == id).unwrap_or(0);
                let blocks = path[start..]
                    .iter()
                    .chain(std::iter::once(&id))
                    .map(|b| self.blocks.get(b).map_or_else(|| format!("{b:?}"), |b| b.name.clone()))
                    .collect();
                return Err(BuildError::Cycle { blocks });
            }
            None => {}
        }

        let block = self.block(id)?;
        marks.insert(id, Mark::Visiting);
        path.push(id);
        for input in block.inputs() {
            if let Some(source) = input.connected_point() {
                self.visit(source.block, marks, path, order)?;
            }
        }
        path.pop();
        marks.insert(id, Mark::Done);
        order.push(id);
        Ok(())
    }

    fn check_required_inputs(&self, order: &[BlockId]) -> Result<(), BuildError> {
        let mut missing = Vec::new();
        for id in order {
            let block = self.block(*id)?;
            for input in block.inputs() {
                if !input.is_optional() && !input.is_connected() && input.default_value().is_none()
                {
                    missing.push(UnconnectedInput {
                        block: block.name.clone(),
                        port: input.name.clone(),
                    });
                }
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(BuildError::MissingInputs(missing))
        }
    }

    /// Give every output of the active blocks its GLSL identifier.
    ///
    /// Fixed names (attributes and system values) are claimed first so
    /// that generated names never shadow them.
    fn allocate_names(
        &mut self,
        order: &[BlockId],
        shared: &mut SharedBuildData,
    ) -> Result<(), BuildError> {
        for id in order {
            let block = self.block(*id)?;
            if let BlockKind::Input(input) = block.kind() {
                if !matches!(
                    input.mode(),
                    crate::blocks::InputMode::Uniform | crate::blocks::InputMode::Constant
                ) {
                    let name = input.variable_name(&block.name, shared)?;
                    self.names.insert(PortRef::output(*id, 0), name);
                }
            }
        }

        for id in order {
            let block = self.block(*id)?;
            if let BlockKind::Input(input) = block.kind() {
                let port = PortRef::output(*id, 0);
                if !self.names.contains_key(&port) {
                    let name = input.variable_name(&block.name, shared)?;
                    self.names.insert(port, name);
                }
                continue;
            }

            let single = block.outputs().len() == 1;
            for (i, output) in block.outputs().iter().enumerate() {
                let prefix = if single {
                    block.name.clone()
                } else {
                    format!("{}_{}", block.name, output.name)
                };
                let name = shared.free_variable_name(&prefix);
                self.names.insert(PortRef::output(*id, i), name);
            }
        }
        Ok(())
    }

    /// Vertex output nodes, then vertex-only blocks the fragment stage reads
    fn vertex_roots(&self) -> Result<Vec<BlockId>, BuildError> {
        let mut roots = self.material.vertex_output_nodes().to_vec();
        let mut visited = HashSet::new();
        let mut stack: Vec<BlockId> = self
            .material
            .fragment_output_nodes()
            .iter()
            .rev()
            .copied()
            .collect();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let block = self.block(id)?;
            if block.target() == BlockTarget::Vertex {
                if !roots.contains(&id) {
                    roots.push(id);
                }
                continue;
            }
            for input in block.inputs().iter().rev() {
                if let Some(source) = input.connected_point() {
                    stack.push(source.block);
                }
            }
        }
        Ok(roots)
    }

    /// Whether a fragment-stage read of `source` crosses from the vertex stage
    fn crosses_stage(&self, stage: Stage, source: BlockId) -> Result<bool, BuildError> {
        Ok(stage == Stage::Fragment && self.block(source)?.target() == BlockTarget::Vertex)
    }

    fn build_block(
        &self,
        id: BlockId,
        state: &mut NodeMaterialBuildState,
        built: &mut HashSet<BlockId>,
    ) -> Result<(), BuildError> {
        if !built.insert(id) {
            return Ok(());
        }
        let block = self.block(id)?;
        let stage = state.target;
        if !block.target().allows(stage) {
            return Err(BuildError::StageMismatch {
                block: block.name.clone(),
                stage,
            });
        }

        for input in block.inputs() {
            if let Some(source) = input.connected_point() {
                if !self.crosses_stage(stage, source.block)? {
                    self.build_block(source.block, state, built)?;
                }
            }
        }

        if state.shared.emit_comments {
            state.emit_line(format!("//{}", block.name));
            if let Some(comments) = &block.comments {
                state.emit_line(format!("//{comments}"));
            }
        }

        let ctx = self.context(block, state)?;
        tracing::trace!("Building {} '{}' ({})", stage, block.name, block.class_name());
        block.kind().shader_block().build(&ctx, state)
    }

    fn resolved_type(
        &self,
        port: PortRef,
        block: &Block,
        name: &str,
    ) -> Result<ConnectionPointType, BuildError> {
        self.types
            .get(port)
            .filter(|t| !t.is_placeholder())
            .ok_or_else(|| BuildError::UnresolvedType {
                block: block.name.clone(),
                port: name.to_string(),
            })
    }

    /// GLSL identifier of an output, once its block has been named
    fn associated_variable_name(&self, port: PortRef) -> Result<&str, BuildError> {
        self.names.get(&port).map(String::as_str).ok_or_else(|| {
            let block = self.blocks.get(&port.block);
            BuildError::VariableNotBuilt {
                block: block.map_or_else(|| format!("{:?}", port.block), |b| b.name.clone()),
                port: block
                    .and_then(|b| b.outputs().get(port.index))
                    .map_or_else(|| port.index.to_string(), |p| p.name.clone()),
            }
        })
    }

    fn context<'b>(
        &self,
        block: &'b Block,
        state: &mut NodeMaterialBuildState,
    ) -> Result<BlockBuildContext<'b>, BuildError> {
        let id = block.id();
        let stage = state.target;

        let mut inputs = Vec::with_capacity(block.inputs().len());
        for (i, input) in block.inputs().iter().enumerate() {
            let binding = if let Some(source) = input.connected_point() {
                let ty = self.resolved_type(PortRef::input(id, i), block, &input.name)?;
                let name = self.associated_variable_name(source)?;
                let expr = if self.crosses_stage(stage, source.block)? {
                    let source_block = self.block(source.block)?;
                    let source_ty = self.resolved_type(source, source_block, &input.name)?;
                    let gl_type = source_ty.gl_type().ok_or_else(|| BuildError::UnresolvedType {
                        block: source_block.name.clone(),
                        port: input.name.clone(),
                    })?;
                    state.shared.emit_varying(name, gl_type)
                } else {
                    name.to_string()
                };
                Some(InputBinding {
                    expr,
                    ty,
                    connected: true,
                })
            } else {
                input.default_value().map(|value| InputBinding {
                    expr: value.to_glsl(),
                    ty: value.connection_type(),
                    connected: false,
                })
            };
            inputs.push(binding);
        }

        let mut outputs = Vec::with_capacity(block.outputs().len());
        for (i, output) in block.outputs().iter().enumerate() {
            let port = PortRef::output(id, i);
            outputs.push(OutputBinding {
                name: self.associated_variable_name(port)?.to_string(),
                ty: self.resolved_type(port, block, &output.name)?,
                has_endpoints: output.has_endpoints(),
            });
        }

        Ok(BlockBuildContext::new(block, stage, inputs, outputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{
        AddBlock, ClampBlock, FragmentOutputBlock, InputBlock, SystemValue, TransformBlock,
        VertexOutputBlock,
    };
    use crate::value::ShaderValue;

    /// Vertex side only: a position transformed by `worldViewProjection`
    fn with_vertex_side(material: &mut NodeMaterial) {
        let position = material.add_block(
            "position",
            InputBlock::attribute(ConnectionPointType::Vector3),
        );
        let wvp = material.add_block(
            "wvp",
            InputBlock::system_value(SystemValue::WorldViewProjection),
        );
        let transform = material.add_block("transform", TransformBlock::default());
        let out = material.add_block("vertexOutput", VertexOutputBlock {});
        material.connect_by_name(position, "output", transform, "vector").unwrap();
        material.connect_by_name(wvp, "output", transform, "transform").unwrap();
        material.connect_by_name(transform, "output", out, "vector").unwrap();
        material.add_output_node(out).unwrap();
    }

    #[test]
    fn test_default_material_compiles() {
        let material = NodeMaterial::create_default("default");
        let shaders = material.compile().unwrap();

        assert!(shaders.vertex.contains("attribute vec3 position;\n"));
        assert!(shaders.vertex.contains("uniform mat4 u_world;\n"));
        assert!(shaders
            .vertex
            .contains("vec4 worldPos_output = u_world * vec4(position, 1.0);\n"));
        assert!(shaders.vertex.contains("gl_Position = "));
        assert!(shaders.fragment.starts_with("precision highp float;\n"));
        assert!(shaders.fragment.contains("uniform vec4 u_color;\n"));
        assert!(shaders.fragment.contains("gl_FragColor = u_color;\n"));
        assert_eq!(shaders.attributes, vec!["position".to_string()]);
        assert_eq!(
            shaders.uniforms,
            vec![
                "u_world".to_string(),
                "u_viewProjection".to_string(),
                "u_color".to_string()
            ]
        );
        assert!(shaders.hints.needs_alpha_blending);
    }

    #[test]
    fn test_missing_output_nodes() {
        let material = NodeMaterial::new("empty");
        assert_eq!(
            material.compile(),
            Err(BuildError::MissingOutputNode(Stage::Vertex))
        );

        let mut material = NodeMaterial::new("vertex only");
        with_vertex_side(&mut material);
        assert_eq!(
            material.compile(),
            Err(BuildError::MissingOutputNode(Stage::Fragment))
        );
    }

    #[test]
    fn test_unregistered_terminal() {
        let mut material = NodeMaterial::create_default("default");
        material.add_block("stray", FragmentOutputBlock::default());
        assert_eq!(
            material.compile(),
            Err(BuildError::UnreachableTerminal("stray".to_string()))
        );
    }

    #[test]
    fn test_cycle_names_blocks() {
        let mut material = NodeMaterial::new("cycle");
        with_vertex_side(&mut material);
        let a = material.add_block("a", AddBlock {});
        let b = material.add_block("b", AddBlock {});
        let out = material.add_block("out", FragmentOutputBlock::default());
        material.set_input_default(a, "right", Some(ShaderValue::Float(1.0))).unwrap();
        material.set_input_default(b, "right", Some(ShaderValue::Float(1.0))).unwrap();
        material.connect_by_name(a, "output", b, "left").unwrap();
        material.connect_by_name(b, "output", a, "left").unwrap();
        material.connect_by_name(a, "output", out, "rgb").unwrap();
        material.add_output_node(out).unwrap();

        assert_eq!(
            material.compile(),
            Err(BuildError::Cycle {
                blocks: vec!["a".to_string(), "b".to_string(), "a".to_string()]
            })
        );
    }

    #[test]
    fn test_missing_inputs_are_all_reported() {
        let mut material = NodeMaterial::new("missing");
        with_vertex_side(&mut material);
        let add = material.add_block("add", AddBlock {});
        let out = material.add_block("out", FragmentOutputBlock::default());
        let from = material.output(add, "output").unwrap();
        let to = material.input(out, "rgb").unwrap();
        material.connect_unchecked(from, to).unwrap();
        material.add_output_node(out).unwrap();

        let err = material.compile().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unconnected required inputs: add.left, add.right"
        );
    }

    #[test]
    fn test_neutral_block_in_both_stages() {
        let mut material = NodeMaterial::new("shared");
        with_vertex_side(&mut material);
        let value = material.add_block("value", InputBlock::uniform(ShaderValue::Float(2.0)));
        let clamp = material.add_block("clamp", ClampBlock::default());
        let out = material.add_block("out", FragmentOutputBlock::default());
        material.connect_by_name(value, "output", clamp, "value").unwrap();
        material.connect_by_name(clamp, "output", out, "rgb").unwrap();
        material.add_output_node(out).unwrap();

        // `clamp` is a GLSL builtin, so the variable gets a suffix
        let shaders = material.compile().unwrap();
        assert!(shaders
            .fragment
            .contains("float clamp0 = clamp(u_value, 0.0, 1.0);\n"));
        assert!(!shaders.vertex.contains("clamp("));
        assert!(shaders
            .fragment
            .contains("gl_FragColor = vec4(clamp0, clamp0, clamp0, 1.0);\n"));
    }

    #[test]
    fn test_phase_reported_on_failure() {
        let mut material = NodeMaterial::new("missing");
        with_vertex_side(&mut material);
        let add = material.add_block("add", AddBlock {});
        let out = material.add_block("out", FragmentOutputBlock::default());
        material.connect_by_name(add, "output", out, "rgb").unwrap();
        material.add_output_node(out).unwrap();

        let (phase, _) = compile(&material).unwrap_err();
        assert_eq!(phase, BuildPhase::PortsLinked);
    }
}
