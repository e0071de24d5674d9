use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use tfgraph::ops::{
    matrix_band_part, matrix_determinant, matrix_inverse, matrix_solve, placeholder, read_file,
    scalar_i64, scalar_str, write_file, MatrixInverseAttrs, MatrixSolveAttrs, PlaceholderAttrs,
};
use tfgraph::{DType, Graph, GraphDef, OpRegistry, Scope, Shape};

#[derive(Parser)]
#[command(
    name = "tfgraph",
    about = "Build, list and inspect operation graphs",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every registered op with its signature
    Ops,
    /// Print one op's signature and attribute defaults
    Describe {
        /// Op type name, e.g. MatrixSolve
        op: String,
    },
    /// Build a sample graph and print or save it
    Demo {
        /// Write the graph definition here instead of printing it
        #[arg(long)]
        out: Option<PathBuf>,
        /// Encoding used with --out
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// Load a saved graph, re-validate it and print it
    Inspect {
        /// Graph file (.json, anything else is read as bincode)
        path: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Bincode,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Ops => cmd_ops(),
        Commands::Describe { op } => cmd_describe(&op),
        Commands::Demo { out, format } => cmd_demo(out.as_deref(), format),
        Commands::Inspect { path } => cmd_inspect(&path),
    }
}

fn cmd_ops() -> Result<()> {
    let registry = OpRegistry::global();
    for def in registry.defs() {
        println!("{:<24} {}", def.name, def.summary);
    }
    println!("\n{} ops", registry.len());
    Ok(())
}

fn cmd_describe(op: &str) -> Result<()> {
    let registry = OpRegistry::global();
    let Some(def) = registry.get(op) else {
        bail!("unknown op '{op}' (run `tfgraph ops` for the catalogue)");
    };
    println!("{def}");
    if !def.summary.is_empty() {
        println!("\n{}", def.summary);
    }
    Ok(())
}

fn build_demo() -> Result<Arc<Graph>> {
    let root = Scope::new();

    let linalg = root.sub_scope("linalg");
    let a = placeholder(
        &linalg,
        DType::Double,
        PlaceholderAttrs::default().shape(Shape::from_dims(&[4, 4])),
    )?;
    let b = placeholder(
        &linalg,
        DType::Double,
        PlaceholderAttrs::default().shape(Shape::from_dims(&[4, 2])),
    )?;
    matrix_solve(&linalg, a, b, MatrixSolveAttrs::default())?;
    matrix_inverse(&linalg, a, MatrixInverseAttrs::default().adjoint(true))?;
    matrix_determinant(&linalg, a)?;
    let num_lower = scalar_i64(&linalg, 1)?;
    let num_upper = scalar_i64(&linalg, -1)?;
    matrix_band_part(&linalg, a, num_lower, num_upper)?;

    let io = root.sub_scope("io");
    let source = scalar_str(&io, "input.txt")?;
    let contents = read_file(&io, source)?;
    let target = scalar_str(&io, "copy.txt")?;
    write_file(&io, target, contents)?;

    Ok(root.finalize()?)
}

fn cmd_demo(out: Option<&Path>, format: Format) -> Result<()> {
    let graph = build_demo().context("failed to build demo graph")?;
    let def = graph.to_graph_def();
    match out {
        None => print!("{def}"),
        Some(path) => {
            let written = match format {
                Format::Json => def.save_json(path),
                Format::Bincode => def.save_bincode(path),
            };
            written.with_context(|| format!("failed to write graph to {}", path.display()))?;
            println!(
                "wrote {} operations to {}",
                def.nodes.len(),
                path.display()
            );
        }
    }
    Ok(())
}

fn cmd_inspect(path: &Path) -> Result<()> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let def = if is_json {
        GraphDef::load_json(path)
    } else {
        GraphDef::load_bincode(path)
    }
    .with_context(|| format!("failed to load graph from {}", path.display()))?;

    let graph = Graph::from_graph_def(&def)
        .with_context(|| format!("graph in {} does not validate", path.display()))?;
    tracing::info!(operations = graph.num_operations(), "graph validated");
    print!("{}", graph.to_graph_def());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_graph_builds_and_reimports() {
        let graph = build_demo().expect("demo graph");
        let def = graph.to_graph_def();
        assert!(def.node_by_name("linalg/MatrixSolve").is_some());
        assert!(def.node_by_name("io/WriteFile").is_some());
        let copy = Graph::from_graph_def(&def).expect("demo graph re-validates");
        assert_eq!(copy.num_operations(), def.nodes.len());
    }

    fn saved_demo_inspects(file: &str, format: Format) {
        let path = std::env::temp_dir().join(format!("tfgraph-cli-{}-{file}", std::process::id()));
        cmd_demo(Some(&path), format).expect("demo writes the graph");
        let inspected = cmd_inspect(&path);
        std::fs::remove_file(&path).expect("remove saved graph");
        inspected.expect("saved graph loads and validates");
    }

    #[test]
    fn saved_bincode_demo_inspects() {
        saved_demo_inspects("demo.bin", Format::Bincode);
    }

    #[test]
    fn saved_json_demo_inspects() {
        saved_demo_inspects("demo.json", Format::Json);
    }

    #[test]
    fn cli_arguments_parse() {
        let cli = Cli::try_parse_from(["tfgraph", "demo", "--format", "bincode"]).expect("parse");
        assert!(matches!(
            cli.command,
            Commands::Demo {
                out: None,
                format: Format::Bincode
            }
        ));
    }
}
