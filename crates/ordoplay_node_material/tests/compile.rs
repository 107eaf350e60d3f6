// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end compiles of small materials.

use ordoplay_node_material::blocks::{
    AddBlock, ClampBlock, DerivativeBlock, ElbowBlock, FragmentOutputBlock, InputBlock,
    LengthBlock, NormalizeBlock, RandomNumberBlock, SystemValue, TextureBlock, TransformBlock,
    VertexOutputBlock,
};
use ordoplay_node_material::{
    BlockId, BlockKind, BuildError, ConnectionPointType, NodeMaterial, ShaderValue, Stage,
};

/// Material with a transformed position as vertex output and an
/// unconnected fragment output
fn material_with_outputs() -> (NodeMaterial, BlockId) {
    let mut material = NodeMaterial::new("test");
    let position = material.add_block(
        "position",
        InputBlock::attribute(ConnectionPointType::Vector3),
    );
    let wvp = material.add_block(
        "wvp",
        InputBlock::system_value(SystemValue::WorldViewProjection),
    );
    let transform = material.add_block("transform", TransformBlock::default());
    let vertex_output = material.add_block("vertexOutput", VertexOutputBlock {});
    material
        .connect_by_name(position, "output", transform, "vector")
        .unwrap();
    material
        .connect_by_name(wvp, "output", transform, "transform")
        .unwrap();
    material
        .connect_by_name(transform, "output", vertex_output, "vector")
        .unwrap();
    material.add_output_node(vertex_output).unwrap();

    let fragment_output = material.add_block("fragmentOutput", FragmentOutputBlock::default());
    material.add_output_node(fragment_output).unwrap();
    (material, fragment_output)
}

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

#[test]
fn add_two_uniforms() {
    let (mut material, out) = material_with_outputs();
    let a = material.add_block("a", InputBlock::uniform(ShaderValue::Float(3.0)));
    let b = material.add_block("b", InputBlock::uniform(ShaderValue::Float(4.0)));
    let alpha = material.add_block("alpha", InputBlock::constant(ShaderValue::Float(1.0)));
    let add = material.add_block("add", AddBlock {});
    material.connect_by_name(a, "output", add, "left").unwrap();
    material.connect_by_name(b, "output", add, "right").unwrap();
    material.connect_by_name(add, "output", out, "rgb").unwrap();
    material.connect_by_name(alpha, "output", out, "a").unwrap();

    let shaders = material.compile().unwrap();
    assert!(shaders.fragment.contains("uniform float u_a;\n"));
    assert!(shaders.fragment.contains("uniform float u_b;\n"));
    assert!(shaders.fragment.contains(
        "float add = u_a + u_b;\ngl_FragColor = vec4(add, add, add, 1.0);\n"
    ));
    assert!(!shaders.uniforms.iter().any(|u| u.contains("alpha")));
    assert!(shaders.hints.needs_alpha_blending);
}

#[test]
fn default_alpha_is_opaque() {
    let (mut material, out) = material_with_outputs();
    let a = material.add_block("a", InputBlock::uniform(ShaderValue::Float(3.0)));
    material.connect_by_name(a, "output", out, "rgb").unwrap();

    let shaders = material.compile().unwrap();
    assert!(shaders
        .fragment
        .contains("gl_FragColor = vec4(u_a, u_a, u_a, 1.0);\n"));
    assert!(!shaders.hints.needs_alpha_blending);
}

#[test]
fn constant_is_inlined() {
    let (mut material, out) = material_with_outputs();
    let one = material.add_block("one", InputBlock::constant(ShaderValue::Float(1.0)));
    let b = material.add_block("b", InputBlock::uniform(ShaderValue::Float(4.0)));
    let add = material.add_block("add", AddBlock {});
    material.connect_by_name(one, "output", add, "left").unwrap();
    material.connect_by_name(b, "output", add, "right").unwrap();
    material.connect_by_name(add, "output", out, "rgb").unwrap();

    let shaders = material.compile().unwrap();
    assert!(shaders.fragment.contains("float add = 1.0 + u_b;\n"));
    assert!(!shaders.uniforms.iter().any(|u| u.contains("one")));
}

#[test]
fn unconnected_add_reports_both_inputs() {
    let (mut material, out) = material_with_outputs();
    let add = material.add_block("add", AddBlock {});
    material.connect_by_name(add, "output", out, "rgb").unwrap();

    match material.compile() {
        Err(BuildError::MissingInputs(missing)) => {
            let names: Vec<String> = missing.iter().map(ToString::to_string).collect();
            assert_eq!(names, vec!["add.left", "add.right"]);
        }
        other => panic!("expected missing inputs, got {other:?}"),
    }
}

#[test]
fn clamp_bounds_are_float_literals() {
    let (mut material, out) = material_with_outputs();
    let value = material.add_block("value", InputBlock::uniform(ShaderValue::Float(0.5)));
    let clamped = material.add_block("clamped", ClampBlock::default());
    material
        .connect_by_name(value, "output", clamped, "value")
        .unwrap();
    material
        .connect_by_name(clamped, "output", out, "rgb")
        .unwrap();

    let shaders = material.compile().unwrap();
    assert!(shaders
        .fragment
        .contains("float clamped = clamp(u_value, 0.0, 1.0);\n"));

    if let BlockKind::Clamp(clamp) = material.block_mut(clamped).unwrap().kind_mut() {
        clamp.minimum = 0.25;
        clamp.maximum = 2.0;
    }
    let shaders = material.compile().unwrap();
    assert!(shaders
        .fragment
        .contains("float clamped = clamp(u_value, 0.25, 2.0);\n"));
}

#[test]
fn auto_detect_follows_source_type() {
    let (mut material, out) = material_with_outputs();
    let dir = material.add_block(
        "dir",
        InputBlock::uniform(ShaderValue::Vector3([0.0, 1.0, 0.0])),
    );
    let n = material.add_block("n", NormalizeBlock {});
    material.connect_by_name(dir, "output", n, "input").unwrap();
    material.connect_by_name(n, "output", out, "rgb").unwrap();

    let output = material.output(n, "output").unwrap();
    assert_eq!(material.port_type(output), Some(ConnectionPointType::Vector3));

    let shaders = material.compile().unwrap();
    assert!(shaders.fragment.contains("vec3 n = normalize(u_dir);\n"));
    assert!(shaders.fragment.contains("gl_FragColor = vec4(n, 1.0);\n"));
}

#[test]
fn auto_detect_takes_every_source_type() {
    for ty in [
        ConnectionPointType::Float,
        ConnectionPointType::Int,
        ConnectionPointType::Vector2,
        ConnectionPointType::Vector3,
        ConnectionPointType::Vector4,
        ConnectionPointType::Color3,
        ConnectionPointType::Color4,
        ConnectionPointType::Matrix,
    ] {
        let mut material = NodeMaterial::new("auto");
        let source = material.add_block("source", InputBlock::uniform_of_type(ty));
        let elbow = material.add_block("elbow", ElbowBlock {});
        material
            .connect_by_name(source, "output", elbow, "input")
            .unwrap();

        let input = material.input(elbow, "input").unwrap();
        let output = material.output(elbow, "output").unwrap();
        assert_eq!(material.port_type(input), Some(ty), "{ty:?}");
        assert_eq!(material.port_type(output), Some(ty), "{ty:?}");
    }
}

#[test]
fn auto_detect_compiles_float_and_color() {
    let (mut material, out) = material_with_outputs();
    let f = material.add_block("f", InputBlock::uniform(ShaderValue::Float(0.5)));
    let elbow = material.add_block("elbow", ElbowBlock {});
    material.connect_by_name(f, "output", elbow, "input").unwrap();
    material.connect_by_name(elbow, "output", out, "rgb").unwrap();
    let shaders = material.compile().unwrap();
    assert!(shaders.fragment.contains("float elbow = u_f;\n"));

    let (mut material, out) = material_with_outputs();
    let c = material.add_block(
        "c",
        InputBlock::uniform(ShaderValue::Color4([1.0, 0.0, 0.0, 1.0])),
    );
    let elbow = material.add_block("elbow", ElbowBlock {});
    material.connect_by_name(c, "output", elbow, "input").unwrap();
    material.connect_by_name(elbow, "output", out, "rgba").unwrap();
    let shaders = material.compile().unwrap();
    assert!(shaders.fragment.contains("vec4 elbow = u_c;\n"));
    assert!(shaders.fragment.contains("gl_FragColor = elbow;\n"));
}

#[test]
fn attribute_reaches_fragment_through_varying() {
    let (mut material, out) = material_with_outputs();
    let uv = material.add_block("uv", InputBlock::attribute(ConnectionPointType::Vector2));
    let tex = material.add_block("tex", TextureBlock::default());
    material.connect_by_name(uv, "output", tex, "uv").unwrap();
    material.connect_by_name(tex, "rgba", out, "rgba").unwrap();

    let shaders = material.compile().unwrap();
    assert!(shaders.vertex.contains("attribute vec2 uv;\n"));
    assert!(shaders.vertex.contains("varying vec2 v_uv;\n"));
    assert!(shaders.vertex.contains("v_uv = uv;\n}\n"));
    assert!(shaders.fragment.contains("varying vec2 v_uv;\n"));
    assert!(shaders
        .fragment
        .contains("vec4 tex_rgba = texture2D(texSampler, v_uv);\n"));
    assert!(!shaders.fragment.contains("attribute"));
    assert_eq!(shaders.samplers, vec!["texSampler".to_string()]);
    assert_eq!(
        shaders.attributes,
        vec!["position".to_string(), "uv".to_string()]
    );
}

#[test]
fn derivative_extension_emitted_once() {
    let (mut material, out) = material_with_outputs();
    let f = material.add_block("f", InputBlock::uniform(ShaderValue::Float(1.0)));
    let d1 = material.add_block("d1", DerivativeBlock {});
    let d2 = material.add_block("d2", DerivativeBlock {});
    let add = material.add_block("add", AddBlock {});
    material.connect_by_name(f, "output", d1, "input").unwrap();
    material.connect_by_name(f, "output", d2, "input").unwrap();
    material.connect_by_name(d1, "dx", add, "left").unwrap();
    material.connect_by_name(d2, "dy", add, "right").unwrap();
    material.connect_by_name(add, "output", out, "rgb").unwrap();

    let shaders = material.compile().unwrap();
    assert_eq!(
        count(
            &shaders.fragment,
            "#extension GL_OES_standard_derivatives : enable"
        ),
        1
    );
    assert!(shaders
        .fragment
        .starts_with("#extension GL_OES_standard_derivatives : enable\n"));
    assert!(shaders.fragment.contains("float d1_dx = dFdx(u_f);\n"));
    assert!(!shaders.fragment.contains("d1_dy ="));
    assert!(shaders.hints.needs_derivatives);
}

#[test]
fn helper_functions_inlined_once() {
    let (mut material, out) = material_with_outputs();
    let seed = material.add_block(
        "seed",
        InputBlock::uniform(ShaderValue::Vector2([0.5, 0.5])),
    );
    let r1 = material.add_block("r1", RandomNumberBlock {});
    let r2 = material.add_block("r2", RandomNumberBlock {});
    let add = material.add_block("add", AddBlock {});
    material.connect_by_name(seed, "output", r1, "seed").unwrap();
    material.connect_by_name(seed, "output", r2, "seed").unwrap();
    material.connect_by_name(r1, "output", add, "left").unwrap();
    material.connect_by_name(r2, "output", add, "right").unwrap();
    material.connect_by_name(add, "output", out, "rgb").unwrap();

    let shaders = material.compile().unwrap();
    assert_eq!(count(&shaders.fragment, "float getRand(vec2 seed)"), 1);
    assert!(shaders.fragment.contains("float r1 = getRand(u_seed.xy);\n"));
    assert!(shaders.fragment.contains("float r2 = getRand(u_seed.xy);\n"));
}

#[test]
fn linked_inputs_must_agree() {
    let (mut material, out) = material_with_outputs();
    let f = material.add_block("f", InputBlock::uniform(ShaderValue::Float(1.0)));
    let v = material.add_block("v", InputBlock::uniform(ShaderValue::Vector3([0.0; 3])));
    let add = material.add_block("add", AddBlock {});
    material.connect_by_name(f, "output", add, "left").unwrap();
    let from = material.output(v, "output").unwrap();
    let to = material.input(add, "right").unwrap();
    material.connect_unchecked(from, to).unwrap();
    material.connect_by_name(add, "output", out, "rgb").unwrap();

    assert!(matches!(
        material.compile(),
        Err(BuildError::LinkedTypeConflict { .. })
    ));
}

#[test]
fn fragment_output_requires_one_group() {
    let (mut material, _) = material_with_outputs();
    assert!(matches!(
        material.compile(),
        Err(BuildError::InvalidBlockInputs { .. })
    ));
    assert!(material.build().is_err());
    assert!(!material.build_was_successful());
}

#[test]
fn disconnected_vertex_output_is_reported() {
    let mut material = NodeMaterial::create_default("default");
    let vertex_output = material.vertex_output_nodes()[0];
    let vector = material.input(vertex_output, "vector").unwrap();
    material.disconnect(vector);

    match material.compile() {
        Err(BuildError::MissingInputs(missing)) => {
            assert_eq!(missing[0].to_string(), "vertexOutput.vector");
        }
        other => panic!("expected missing inputs, got {other:?}"),
    }
    assert_eq!(Stage::Vertex.to_string(), "vertex");
}

fn textured_graph() -> NodeMaterial {
    let (mut material, out) = material_with_outputs();
    let uv = material.add_block("uv", InputBlock::attribute(ConnectionPointType::Vector2));
    let tex = material.add_block("tex", TextureBlock::default());
    material.connect_by_name(uv, "output", tex, "uv").unwrap();
    material.connect_by_name(tex, "rgb", out, "rgb").unwrap();
    material.connect_by_name(tex, "a", out, "a").unwrap();
    material
}

#[test]
fn compiles_are_deterministic() {
    let mut material = textured_graph();
    let first = material.compile().unwrap();
    assert_eq!(material.compile().unwrap(), first);
    assert_eq!(textured_graph().compile().unwrap(), first);
    assert!(first
        .fragment
        .contains("gl_FragColor = vec4(tex_rgb, tex_a);\n"));

    material.build().unwrap();
    let restored = NodeMaterial::from_json(&material.to_json().unwrap()).unwrap();
    let reloaded = restored.compile().unwrap();
    assert_eq!(reloaded.vertex, first.vertex);
    assert_eq!(reloaded.fragment, first.fragment);
}

#[test]
fn attribute_named_after_keyword_is_rejected() {
    let (mut material, out) = material_with_outputs();
    let uv = material.add_block("main", InputBlock::attribute(ConnectionPointType::Vector2));
    let tex = material.add_block("tex", TextureBlock::default());
    material.connect_by_name(uv, "output", tex, "uv").unwrap();
    material.connect_by_name(tex, "rgba", out, "rgba").unwrap();

    assert_eq!(
        material.compile(),
        Err(BuildError::ReservedName {
            block: "main".to_string(),
            name: "main".to_string(),
        })
    );
}

#[test]
fn attribute_declared_with_two_types() {
    let (mut material, out) = material_with_outputs();
    let uv2 = material.add_block("uv", InputBlock::attribute(ConnectionPointType::Vector2));
    let uv3 = material.add_block("uv", InputBlock::attribute(ConnectionPointType::Vector3));
    let tex = material.add_block("tex", TextureBlock::default());
    let length = material.add_block("length", LengthBlock {});
    material.connect_by_name(uv2, "output", tex, "uv").unwrap();
    material.connect_by_name(uv3, "output", length, "value").unwrap();
    material.connect_by_name(tex, "rgb", out, "rgb").unwrap();
    material.connect_by_name(length, "output", out, "a").unwrap();

    match material.compile() {
        Err(BuildError::AttributeTypeConflict { name, .. }) => assert_eq!(name, "uv"),
        other => panic!("expected attribute conflict, got {other:?}"),
    }
}

#[test]
fn helper_names_are_not_shadowed() {
    let (mut material, out) = material_with_outputs();
    let seed = material.add_block(
        "seed",
        InputBlock::uniform(ShaderValue::Vector2([0.5, 0.5])),
    );
    let rand = material.add_block("getRand", RandomNumberBlock {});
    material.connect_by_name(seed, "output", rand, "seed").unwrap();
    material.connect_by_name(rand, "output", out, "rgb").unwrap();

    let shaders = material.compile().unwrap();
    assert!(shaders
        .fragment
        .contains("float getRand0 = getRand(u_seed.xy);\n"));
}

#[test]
fn emit_comments_names_blocks() {
    let mut material = NodeMaterial::create_default("default");
    material.options.emit_comments = true;
    let shaders = material.compile().unwrap();
    assert!(shaders.fragment.contains("//fragmentOutput\n"));
    assert!(shaders.vertex.contains("//vertexOutput\n"));
    assert!(shaders.vertex.contains("\n//Main\nvoid main(void) {\n"));
}
