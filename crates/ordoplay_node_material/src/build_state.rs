// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-stage build state and the data shared between stages.

use crate::error::BuildError;
use crate::includes::{include_source, EmitFunctionFromIncludeOptions};
use crate::options::{FloatPrecision, NodeMaterialOptions};
use crate::types::Stage;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// GLSL keywords and builtins that cannot be used as variable names
const RESERVED_NAMES: &[&str] = &[
    "attribute", "const", "uniform", "varying", "break", "continue", "do", "for", "while",
    "if", "else", "in", "out", "inout", "float", "int", "void", "bool", "true", "false",
    "lowp", "mediump", "highp", "precision", "invariant", "discard", "return", "struct",
    "mat2", "mat3", "mat4", "vec2", "vec3", "vec4", "ivec2", "ivec3", "ivec4", "bvec2",
    "bvec3", "bvec4", "sampler2D", "samplerCube", "main", "input", "output", "texture",
    "abs", "acos", "asin", "atan", "ceil", "clamp", "cos", "cross", "degrees", "distance",
    "dot", "exp", "exp2", "floor", "fract", "length", "log", "log2", "max", "min", "mix",
    "mod", "normalize", "pow", "radians", "reflect", "refract", "round", "sign", "sin",
    "smoothstep", "sqrt", "step", "tan", "texture2D", "dFdx", "dFdy", "getRand",
    "toLinearSpace", "toGammaSpace", "getLuminance", "LinearEncodePowerApprox",
    "GammaEncodePowerApprox", "LuminanceEncodeApprox", "computeFresnelTerm", "PI",
];

fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// Turn an arbitrary block name into a legal GLSL identifier stem
fn sanitize(prefix: &str) -> String {
    let mut name = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        let c = if c.is_ascii_alphanumeric() { c } else { '_' };
        if c == '_' && name.ends_with('_') {
            continue;
        }
        name.push(c);
    }

    let name = name.trim_start_matches(|c: char| c.is_ascii_digit());
    let name = match name.strip_prefix("gl_") {
        Some(rest) => format!("gl{rest}"),
        None => name.to_string(),
    };
    if name.is_empty() || name == "_" {
        "tmp".to_string()
    } else {
        name
    }
}

/// Flags a renderer needs to set up the compiled program
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildHints {
    /// Output writes a meaningful alpha
    pub needs_alpha_blending: bool,
    /// Fragments may be discarded
    pub needs_alpha_testing: bool,
    /// A world-view matrix uniform is read
    pub needs_world_view_matrix: bool,
    /// A world-view-projection matrix uniform is read
    pub needs_world_view_projection_matrix: bool,
    /// Screen space derivatives are used
    pub needs_derivatives: bool,
}

/// Records which stage outputs were written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildChecks {
    /// `gl_Position` was written
    pub emit_vertex: bool,
    /// `gl_FragColor` was written or fragments discarded
    pub emit_fragment: bool,
}

/// State shared by the vertex and fragment passes of one compile
#[derive(Debug, Default)]
pub struct SharedBuildData {
    /// Write comments into the generated source
    pub emit_comments: bool,
    /// Fragment shader float precision
    pub fragment_precision: FloatPrecision,
    variable_names: HashMap<String, u32>,
    used_names: HashSet<String>,
    varyings: IndexMap<String, String>,
    /// `varying` declarations written into both stages
    pub varying_declaration: String,
    /// Varying assignments appended to the vertex `main`
    pub vertex_transfer: String,
    /// Renderer hints
    pub hints: BuildHints,
    /// Stage output checks
    pub checks: BuildChecks,
}

impl SharedBuildData {
    /// Create shared data for a compile
    pub fn new(options: &NodeMaterialOptions) -> Self {
        Self {
            emit_comments: options.emit_comments,
            fragment_precision: options.fragment_precision,
            ..Self::default()
        }
    }

    /// Allocate an identifier no other variable of this compile uses.
    ///
    /// The prefix is sanitized; reserved words and taken names get a
    /// numeric suffix (`output` becomes `output0`).
    pub fn free_variable_name(&mut self, prefix: &str) -> String {
        let base = sanitize(prefix);
        let name = if !is_reserved(&base) && !self.used_names.contains(&base) {
            base
        } else {
            let start = u32::from(!is_reserved(&base));
            loop {
                let counter = self.variable_names.entry(base.clone()).or_insert(start);
                let candidate = format!("{base}{counter}");
                *counter += 1;
                if !self.used_names.contains(&candidate) && !is_reserved(&candidate) {
                    break candidate;
                }
            }
        };
        self.used_names.insert(name.clone());
        name
    }

    /// Claim a fixed identifier shared by every block that asks for it
    /// (attributes, system uniforms).
    ///
    /// Fixed names cannot take a suffix, so a reserved word is refused.
    pub fn reserve_variable_name(&mut self, name: &str) -> Option<String> {
        let name = sanitize(name);
        if is_reserved(&name) {
            return None;
        }
        self.used_names.insert(name.clone());
        Some(name)
    }

    /// Varying carrying a vertex value to the fragment stage.
    ///
    /// The varying is declared and assigned in the vertex `main` the first
    /// time a value is requested; later requests return the same name.
    pub fn emit_varying(&mut self, value: &str, gl_type: &str) -> String {
        if let Some(name) = self.varyings.get(value) {
            return name.clone();
        }
        let name = self.free_variable_name(&format!("v_{value}"));
        self.varying_declaration
            .push_str(&format!("varying {gl_type} {name};\n"));
        self.vertex_transfer.push_str(&format!("{name} = {value};\n"));
        self.varyings.insert(value.to_string(), name.clone());
        name
    }

    /// Number of varyings declared so far
    pub fn varying_count(&self) -> usize {
        self.varyings.len()
    }
}

/// Mutable context threaded through the blocks of one stage
#[derive(Debug)]
pub struct NodeMaterialBuildState {
    /// Stage being built
    pub target: Stage,
    /// Body of `main`, append only
    pub compilation_string: String,
    /// Data shared with the other stage
    pub shared: SharedBuildData,
    uniforms: Vec<String>,
    attributes: IndexMap<String, String>,
    samplers: Vec<String>,
    uniform_declaration: String,
    attribute_declaration: String,
    sampler_declaration: String,
    declared_outputs: IndexSet<String>,
    functions: IndexMap<String, String>,
    extensions: IndexMap<String, String>,
}

impl NodeMaterialBuildState {
    /// Create the state for one stage
    pub fn new(target: Stage, shared: SharedBuildData) -> Self {
        Self {
            target,
            compilation_string: String::new(),
            shared,
            uniforms: Vec::new(),
            attributes: IndexMap::new(),
            samplers: Vec::new(),
            uniform_declaration: String::new(),
            attribute_declaration: String::new(),
            sampler_declaration: String::new(),
            declared_outputs: IndexSet::new(),
            functions: IndexMap::new(),
            extensions: IndexMap::new(),
        }
    }

    /// Append one line to the body
    pub fn emit_line(&mut self, line: impl AsRef<str>) {
        self.compilation_string.push_str(line.as_ref());
        self.compilation_string.push('\n');
    }

    /// Declaration text for an output variable.
    ///
    /// Returns `"<type> <name>"` the first time a name is declared in this
    /// stage and just `"<name>"` afterwards.
    pub fn declare_output(&mut self, name: &str, gl_type: &str) -> String {
        if self.declared_outputs.contains(name) {
            return name.to_string();
        }
        self.declared_outputs.insert(name.to_string());
        format!("{gl_type} {name}")
    }

    /// Declare a uniform once
    pub fn emit_uniform(&mut self, name: &str, gl_type: &str) {
        if self.uniforms.iter().any(|u| u == name) {
            return;
        }
        self.uniforms.push(name.to_string());
        self.uniform_declaration
            .push_str(&format!("uniform {gl_type} {name};\n"));
    }

    /// Declare a vertex attribute once.
    ///
    /// Fails when the attribute was already declared with another type.
    pub fn emit_attribute(&mut self, name: &str, gl_type: &str) -> Result<(), BuildError> {
        if let Some(declared) = self.attributes.get(name) {
            if declared != gl_type {
                return Err(BuildError::AttributeTypeConflict {
                    name: name.to_string(),
                    declared: declared.clone(),
                    requested: gl_type.to_string(),
                });
            }
            return Ok(());
        }
        self.attributes.insert(name.to_string(), gl_type.to_string());
        self.attribute_declaration
            .push_str(&format!("attribute {gl_type} {name};\n"));
        Ok(())
    }

    /// Declare a 2D sampler once
    pub fn emit_sampler(&mut self, name: &str) {
        if self.samplers.iter().any(|s| s == name) {
            return;
        }
        self.samplers.push(name.to_string());
        self.sampler_declaration
            .push_str(&format!("uniform sampler2D {name};\n"));
    }

    /// Register a `#extension` line once per stage
    pub fn emit_extension(&mut self, name: &str, extension: &str) {
        if self.extensions.contains_key(name) {
            return;
        }
        self.extensions.insert(name.to_string(), extension.to_string());
    }

    /// Register a helper function once per stage
    pub fn emit_function(&mut self, name: &str, code: &str, comments: &str) {
        if self.functions.contains_key(name) {
            return;
        }
        let mut entry = String::new();
        if self.shared.emit_comments && !comments.is_empty() {
            entry.push_str(&format!("//{comments}\n"));
        }
        entry.push_str(code);
        self.functions.insert(name.to_string(), entry);
    }

    /// Inline a named include once per stage
    pub fn emit_function_from_include(
        &mut self,
        include: &str,
        comments: &str,
        options: &EmitFunctionFromIncludeOptions,
    ) -> Result<(), BuildError> {
        let key = match &options.repeat_key {
            Some(repeat) => format!("{include}_{repeat}"),
            None => include.to_string(),
        };
        if self.functions.contains_key(&key) {
            return Ok(());
        }
        let source =
            include_source(include).ok_or_else(|| BuildError::UnknownInclude(include.into()))?;
        let code = options.apply(source);
        self.emit_function(&key, &code, comments);
        Ok(())
    }

    /// Uniforms declared in this stage
    pub fn uniforms(&self) -> &[String] {
        &self.uniforms
    }

    /// Attributes declared in this stage, in declaration order
    pub fn attributes(&self) -> Vec<String> {
        self.attributes.keys().cloned().collect()
    }

    /// Samplers declared in this stage
    pub fn samplers(&self) -> &[String] {
        &self.samplers
    }

    /// Whether a function or include key was registered
    pub fn has_function(&self, key: &str) -> bool {
        self.functions.contains_key(key)
    }

    /// Assemble the complete stage source
    pub fn finalize(&self) -> String {
        let comments = self.shared.emit_comments;
        let mut out = String::new();
        let section = |out: &mut String, title: &str, body: &str| {
            if body.is_empty() {
                return;
            }
            if comments {
                out.push_str(&format!("\n//{title}\n"));
            }
            out.push_str(body);
        };

        let extensions: String = self
            .extensions
            .values()
            .map(|e| format!("{e}\n"))
            .collect();
        section(&mut out, "Extensions", &extensions);

        if self.target == Stage::Fragment {
            let precision = format!(
                "precision {} float;\n",
                self.shared.fragment_precision.qualifier()
            );
            section(&mut out, "Precision", &precision);
        }

        if self.target == Stage::Vertex {
            section(&mut out, "Attributes", &self.attribute_declaration);
        }
        section(&mut out, "Uniforms", &self.uniform_declaration);
        section(&mut out, "Samplers", &self.sampler_declaration);
        section(&mut out, "Varyings", &self.shared.varying_declaration);

        let functions: String = self
            .functions
            .values()
            .map(|f| format!("{f}\n"))
            .collect();
        section(&mut out, "Functions", &functions);

        if comments {
            out.push_str("\n//Main\n");
        }
        out.push_str("void main(void) {\n");
        out.push_str(&self.compilation_string);
        if self.target == Stage::Vertex {
            out.push_str(&self.shared.vertex_transfer);
        }
        out.push_str("}\n");
        out
    }
}
