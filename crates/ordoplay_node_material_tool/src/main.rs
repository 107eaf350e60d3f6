// SPDX-License-Identifier: MIT OR Apache-2.0
//! `ordoplay_nmc` - compile node material documents to GLSL.
//!
//! ```text
//! ordoplay_nmc compile --in material.json [--options opts.ron] [--out-dir out]
//! ordoplay_nmc check --in material.json
//! ordoplay_nmc default [--name Default] [--out material.json]
//! ```

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use ordoplay_node_material::{NodeMaterial, NodeMaterialOptions};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "ordoplay_nmc", version, about = "OrdoPlay node material compiler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a material to vertex and fragment GLSL
    Compile {
        /// Material document (JSON)
        #[arg(long = "in")]
        in_path: PathBuf,
        /// Options file (RON) overriding the document's options
        #[arg(long)]
        options: Option<PathBuf>,
        /// Directory for `.vert`, `.frag` and `.json` outputs; prints to stdout when omitted
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Validate a material without writing anything
    Check {
        /// Material document (JSON)
        #[arg(long = "in")]
        in_path: PathBuf,
    },
    /// Write the default material document
    Default {
        /// Material name
        #[arg(long, default_value = "Default")]
        name: String,
        /// Output file; prints to stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("ordoplay_nmc=info".parse()?)
        .add_directive("ordoplay_node_material=info".parse()?);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("ordoplay_nmc v{}", env!("CARGO_PKG_VERSION"));

    match Cli::parse().command {
        Command::Compile {
            in_path,
            options,
            out_dir,
        } => compile(&in_path, options.as_deref(), out_dir.as_deref()),
        Command::Check { in_path } => check(&in_path),
        Command::Default { name, out } => write_default(&name, out.as_deref()),
    }
}

fn load_material(path: &Path) -> anyhow::Result<NodeMaterial> {
    NodeMaterial::load(path).with_context(|| format!("load material '{}'", path.display()))
}

fn compile(in_path: &Path, options: Option<&Path>, out_dir: Option<&Path>) -> anyhow::Result<()> {
    let mut material = load_material(in_path)?;
    if let Some(path) = options {
        material.options = NodeMaterialOptions::load(path)
            .with_context(|| format!("load options '{}'", path.display()))?;
    }

    let shaders = material
        .compile()
        .with_context(|| format!("compile material '{}'", material.name))?;

    let Some(out_dir) = out_dir else {
        println!("// ---- vertex ----\n{}", shaders.vertex);
        println!("// ---- fragment ----\n{}", shaders.fragment);
        return Ok(());
    };

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create output directory '{}'", out_dir.display()))?;
    let stem = in_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("material");

    let outputs = [
        (format!("{stem}.vert"), shaders.vertex.clone()),
        (format!("{stem}.frag"), shaders.fragment.clone()),
        (
            format!("{stem}.json"),
            serde_json::to_string_pretty(&shaders).context("serialize shader report")?,
        ),
    ];
    for (file_name, content) in outputs {
        let path = out_dir.join(file_name);
        std::fs::write(&path, content).with_context(|| format!("write '{}'", path.display()))?;
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn check(in_path: &Path) -> anyhow::Result<()> {
    let material = load_material(in_path)?;
    let shaders = material
        .compile()
        .with_context(|| format!("compile material '{}'", material.name))?;
    eprintln!(
        "ok: '{}' ({} blocks, {} uniforms, {} samplers)",
        material.name,
        material.block_count(),
        shaders.uniforms.len(),
        shaders.samplers.len()
    );
    Ok(())
}

fn write_default(name: &str, out: Option<&Path>) -> anyhow::Result<()> {
    let material = NodeMaterial::create_default(name);
    match out {
        Some(path) => {
            material
                .save(path)
                .with_context(|| format!("write material '{}'", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{}", material.to_json().context("serialize material")?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(test: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ordoplay_nmc_{}_{test}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_parse_compile_command() {
        let cli = Cli::try_parse_from([
            "ordoplay_nmc",
            "compile",
            "--in",
            "material.json",
            "--out-dir",
            "out",
        ])
        .unwrap();
        match cli.command {
            Command::Compile {
                in_path,
                options,
                out_dir,
            } => {
                assert_eq!(in_path, PathBuf::from("material.json"));
                assert!(options.is_none());
                assert_eq!(out_dir, Some(PathBuf::from("out")));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Cli::try_parse_from(["ordoplay_nmc", "check"]).is_err());
    }

    #[test]
    fn test_check_missing_file() {
        let dir = scratch_dir("missing");
        let err = check(&dir.join("nope.json")).unwrap_err();
        assert!(err.to_string().starts_with("load material '"));
        assert!(format!("{err:#}").contains("I/O error"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_check_invalid_document() {
        let dir = scratch_dir("invalid");
        let path = dir.join("broken.json");
        std::fs::write(&path, "{ \"name\": ").unwrap();
        let err = check(&path).unwrap_err();
        assert!(err.to_string().starts_with("load material '"));
        assert!(format!("{err:#}").contains("JSON error"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_check_reports_build_error() {
        let dir = scratch_dir("no_outputs");
        let path = dir.join("empty.json");
        NodeMaterial::new("empty").save(&path).unwrap();
        let err = check(&path).unwrap_err();
        assert_eq!(err.to_string(), "compile material 'empty'");
        assert!(format!("{err:#}").contains("No vertex output node registered"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_compile_bad_options() {
        let dir = scratch_dir("bad_options");
        let material = dir.join("default.json");
        write_default("Default", Some(&material)).unwrap();
        let options = dir.join("options.ron");
        std::fs::write(&options, "(fragment_precision: Extreme)").unwrap();

        let err = compile(&material, Some(&options), None).unwrap_err();
        assert!(err.to_string().starts_with("load options '"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_compile_writes_outputs() {
        let dir = scratch_dir("outputs");
        let material = dir.join("default.json");
        write_default("Default", Some(&material)).unwrap();
        check(&material).unwrap();

        let out_dir = dir.join("out");
        compile(&material, None, Some(&out_dir)).unwrap();
        let fragment = std::fs::read_to_string(out_dir.join("default.frag")).unwrap();
        assert!(fragment.contains("gl_FragColor = u_color;"));
        assert!(out_dir.join("default.vert").exists());
        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out_dir.join("default.json")).unwrap())
                .unwrap();
        assert_eq!(report["uniforms"][2], "u_color");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
