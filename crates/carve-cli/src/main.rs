//! Carve CLI - compile and inspect SDF scene files

mod config;

use anyhow::{Context, Result};
use carve_core::prelude::*;
use clap::{Parser, Subcommand};
use config::CapacityArgs;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "carve")]
#[command(about = "CSG scene compiler for SDF ray marching", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a scene file and print the shader tables
    Compile {
        /// Scene file (.json)
        scene: PathBuf,

        #[command(flatten)]
        capacity: CapacityArgs,

        /// Print the tables as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the world-space bounds of every node
    Bounds {
        /// Scene file (.json)
        scene: PathBuf,
    },

    /// Resolve refs and write the scene back in canonical form
    Normalize {
        /// Scene file (.json)
        scene: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write a generated example scene
    Demo {
        /// Output file
        #[arg(short, long, default_value = "demo.json")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            scene,
            capacity,
            json,
        } => {
            run_compile(&scene, &capacity, json)?;
        }
        Commands::Bounds { scene } => {
            run_bounds(&scene)?;
        }
        Commands::Normalize { scene, output } => {
            run_normalize(&scene, &output)?;
        }
        Commands::Demo { output } => {
            generate_demo(&output)?;
        }
    }

    Ok(())
}

fn load(scene: &Path) -> Result<SceneTree> {
    carve_scene::load_file(scene)
        .with_context(|| format!("Failed to load scene: {}", scene.display()))
}

fn run_compile(scene: &Path, capacity: &CapacityArgs, as_json: bool) -> Result<()> {
    let config = capacity.resolve()?;
    let tree = load(scene)?;
    let compiled = SceneCompiler::new(config)
        .compile(&tree)
        .with_context(|| format!("Failed to compile {}", scene.display()))?;

    if let Err(index) = compiled.verify_ordering() {
        anyhow::bail!("Operation {index} references a later result");
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&tables_json(&compiled))?);
        return Ok(());
    }

    println!("Primitives ({}):", compiled.primitives.len());
    for (k, p) in compiled.primitives.iter().enumerate() {
        println!(
            "  [{k}] {:?} params={:?} material={}",
            p.primitive_kind(),
            p.params,
            p.material
        );
    }
    println!("Transforms ({}):", compiled.transforms.len());
    for (k, t) in compiled.transforms.iter().enumerate() {
        let world = Mat4::from_cols_array_2d(&t.inverse).inverse();
        let (scale, _, translation) = world.to_scale_rotation_translation();
        println!(
            "  [{k}] translation={translation} scale={scale} min_scale={}",
            t.min_scale
        );
    }
    println!("Operations ({}):", compiled.operations.len());
    for (k, op) in compiled.operations.iter().enumerate() {
        println!("  [{k}] {}", describe(op));
    }

    match SceneUniforms::from_compiled(&Camera::default(), &compiled) {
        Ok(uniforms) => println!("Uniform block: {} bytes", uniforms.as_bytes().len()),
        Err(e) => println!("Uniform block: {e}"),
    }
    Ok(())
}

fn describe(op: &Operation) -> String {
    match op.op_kind() {
        Some(OpKind::Transform) => format!("Transform t{}", op.i),
        Some(OpKind::Identity) => format!("Identity p{} @{}", op.i, op.j),
        Some(OpKind::Render) => format!("Render {}", op.i),
        Some(kind) => format!("{kind:?} {} {}", op.i, op.j),
        None => format!("<unknown {}>", op.kind),
    }
}

fn tables_json(compiled: &CompiledScene) -> serde_json::Value {
    let primitives: Vec<_> = compiled
        .primitives
        .iter()
        .map(|p| {
            json!({
                "kind": p.kind,
                "material": p.material,
                "params": p.params,
            })
        })
        .collect();
    let transforms: Vec<_> = compiled
        .transforms
        .iter()
        .map(|t| json!({ "inverse": t.inverse, "minScale": t.min_scale }))
        .collect();
    let operations: Vec<_> = compiled
        .operations
        .iter()
        .map(|op| json!({ "kind": op.kind, "i": op.i, "j": op.j }))
        .collect();
    json!({
        "primitives": primitives,
        "transforms": transforms,
        "operations": operations,
    })
}

fn run_bounds(scene: &Path) -> Result<()> {
    let tree = load(scene)?;
    for id in tree.descendants(tree.root()) {
        let node = tree.node(id)?;
        let mut depth = 0;
        let mut cursor = tree.parent(id);
        while let Some(parent) = cursor {
            depth += 1;
            cursor = tree.parent(parent);
        }
        let label = if node.name.is_empty() {
            node.kind().label().to_string()
        } else {
            format!("{} ({})", node.name, node.kind().label())
        };

        let aabb = if id == tree.root() {
            tree.scene_aabb()
        } else {
            tree.generate_aabb(id)
        };
        if aabb.is_empty() {
            println!("{:indent$}{label}: empty", "", indent = depth * 2);
        } else {
            println!(
                "{:indent$}{label}: {} .. {}",
                "",
                aabb.min,
                aabb.max,
                indent = depth * 2
            );
        }
    }
    Ok(())
}

fn run_normalize(scene: &Path, output: &Path) -> Result<()> {
    let tree = load(scene)?;
    carve_scene::save_file(&tree, output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Saved to: {}", output.display());
    Ok(())
}

/// A table with a drilled top, four legs and a ring resting on it
fn demo_scene() -> Result<SceneTree> {
    let mut tree = SceneTree::new();
    let root = tree.root();
    let table = tree.add_child(root, Node::union().named("table"))?;

    let top = tree.add_child(table, Node::difference().named("top"))?;
    tree.add_child(
        top,
        Node::cuboid(Vec3::new(2.0, 0.1, 1.0))
            .translated(Vec3::Y)
            .with_material(1),
    )?;
    let hole = tree.add_child(
        top,
        Node::cylinder(0.2).translated(Vec3::new(1.5, 0.0, 0.0)),
    )?;
    tree.set_subtract(hole, true)?;

    let legs = tree.add_child(table, Node::union().named("legs"))?;
    for (x, z) in [(-1.8, -0.8), (1.8, -0.8), (-1.8, 0.8), (1.8, 0.8)] {
        tree.add_child(
            legs,
            Node::line(0.9, 0.08)
                .translated(Vec3::new(x, 0.5, z))
                .with_material(2),
        )?;
    }

    tree.add_child(
        root,
        Node::torus(0.4, 0.1)
            .named("ring")
            .translated(Vec3::new(-0.5, 1.2, 0.0))
            .rotated(20.0, Vec3::X)
            .with_material(3),
    )?;
    Ok(tree)
}

fn generate_demo(output: &Path) -> Result<()> {
    println!("Generating demo scene...");
    let tree = demo_scene()?;
    let compiled = SceneCompiler::default().compile(&tree)?;
    println!(
        "  {} primitives, {} transforms, {} operations",
        compiled.primitives.len(),
        compiled.transforms.len(),
        compiled.operations.len()
    );
    carve_scene::save_file(&tree, output)?;
    println!("Saved to: {}", output.display());
    Ok(())
}
