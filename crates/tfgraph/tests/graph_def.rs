use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tfgraph::graph::{Endpoint, GraphSerdeError, NodeDef, NodeId, GRAPH_DEF_VERSION};
use tfgraph::ops::{
    matrix_solve, placeholder, read_file, scalar_f64, scalar_str, write_file, MatrixSolveAttrs,
    PlaceholderAttrs,
};
use tfgraph::{DType, Graph, GraphDef, GraphError, Scope, Shape, TensorLiteral};

fn sample_graph() -> Arc<Graph> {
    let root = Scope::new();

    let linalg = root.sub_scope("linalg");
    let a = placeholder(
        &linalg,
        DType::Double,
        PlaceholderAttrs::default().shape(Shape::from_dims(&[3, 3])),
    )
    .expect("a");
    let b = placeholder(
        &linalg,
        DType::Double,
        PlaceholderAttrs::default().shape(Shape::from_dims(&[3, 2])),
    )
    .expect("b");
    matrix_solve(&linalg, a, b, MatrixSolveAttrs::default().adjoint(true)).expect("solve");

    let io = root.sub_scope("io");
    let name = scalar_str(&io, "x.txt").expect("name");
    let contents = scalar_str(&io, "payload").expect("contents");
    let write = write_file(&io, name, contents).expect("write");
    let after = io
        .with_control_dependencies(&[write])
        .with_device("/device:CPU:0");
    read_file(&after, name).expect("read");

    root.finalize().expect("sample graph builds")
}

fn temp_path(file: &str) -> PathBuf {
    std::env::temp_dir().join(format!("tfgraph-{}-{file}", std::process::id()))
}

#[test]
fn json_file_round_trip() -> Result<()> {
    let def = sample_graph().to_graph_def();
    let path = temp_path("round_trip.json");
    def.save_json(&path)?;
    let loaded = GraphDef::load_json(&path)?;
    std::fs::remove_file(&path)?;

    assert_eq!(loaded, def);
    assert_eq!(loaded.version, GRAPH_DEF_VERSION);
    Ok(())
}

#[test]
fn bincode_file_round_trip() -> Result<()> {
    let def = sample_graph().to_graph_def();
    let path = temp_path("round_trip.bin");
    def.save_bincode(&path)?;
    let loaded = GraphDef::load_bincode(&path)?;
    std::fs::remove_file(&path)?;

    assert_eq!(loaded, def);
    Ok(())
}

#[test]
fn version_mismatch_is_rejected() {
    let mut def = sample_graph().to_graph_def();
    def.version = "tfgraph.v0".to_string();
    let json = def.to_json_string().expect("serialize");
    let err = GraphDef::from_json_str(&json).expect_err("older format");
    assert!(
        matches!(err, GraphSerdeError::VersionMismatch { ref found, .. } if found == "tfgraph.v0"),
        "{err}"
    );

    let bytes = def.to_bincode_bytes().expect("serialize");
    assert!(GraphDef::from_bincode_slice(&bytes).is_err());
}

#[test]
fn text_dump_names_inputs_and_placement() {
    let text = sample_graph().to_graph_def().to_string();
    assert!(text.starts_with("graph (version = tfgraph.v1) {\n"), "{text}");
    assert!(
        text.contains(
            "linalg/MatrixSolve = MatrixSolve(linalg/Placeholder:0, linalg/Placeholder_1:0) \
             {T = double, adjoint = true} -> (double[3, 2])"
        ),
        "{text}"
    );
    assert!(
        text.contains("io/ReadFile = ReadFile(io/Const:0) [^io/WriteFile]"),
        "{text}"
    );
    assert!(text.contains("@/device:CPU:0 -> (string[])"), "{text}");
    assert!(text.trim_end().ends_with('}'));
}

#[test]
fn import_reproduces_the_graph() -> Result<()> {
    let def = sample_graph().to_graph_def();
    let graph = Graph::from_graph_def(&def)?;
    assert_eq!(graph.num_operations(), def.nodes.len());
    assert_eq!(graph.to_graph_def(), def);

    let read = graph
        .operation_by_name("io/ReadFile")
        .expect("read imported");
    let write = graph
        .operation_by_name("io/WriteFile")
        .expect("write imported");
    assert_eq!(read.control_inputs(), &[write.id()]);
    assert_eq!(read.device(), Some("/device:CPU:0"));
    Ok(())
}

#[test]
fn prefixed_import_remaps_ids() -> Result<()> {
    let def = sample_graph().to_graph_def();
    let scope = Scope::new();
    placeholder(&scope, DType::Float, PlaceholderAttrs::default())?;
    let graph = scope.graph();

    let imported = graph.import_graph_def(&def, Some("copy"))?;
    assert_eq!(imported.len(), def.nodes.len());
    assert_eq!(graph.num_operations(), def.nodes.len() + 1);
    assert!(imported.iter().all(|op| op.name().starts_with("copy/")));

    let solve = graph
        .operation_by_name("copy/linalg/MatrixSolve")
        .expect("solve imported");
    let a = graph
        .operation_by_name("copy/linalg/Placeholder")
        .expect("placeholder imported");
    assert_eq!(a.id(), NodeId(1));
    assert_eq!(solve.inputs()[0], a.output(0)?);
    assert_eq!(graph.consumers(a.output(0)?).len(), 1);

    // Building continues after an import without name clashes.
    let next = placeholder(&scope, DType::Float, PlaceholderAttrs::default())?;
    let next = graph.operation(next.node()).expect("recorded");
    assert_eq!(next.name(), "Placeholder_1");
    Ok(())
}

#[test]
fn failed_import_rolls_back() {
    let mut def = sample_graph().to_graph_def();
    let broken = NodeDef {
        id: NodeId(100),
        name: "broken".to_string(),
        op_type: "ReadFile".to_string(),
        inputs: vec![Endpoint {
            node: NodeId(99),
            index: 0,
        }],
        control_inputs: Vec::new(),
        device: None,
        attrs: Default::default(),
        outputs: Vec::new(),
    };
    def.nodes.push(broken);

    let graph = Graph::new();
    let version = graph.version();
    let err = graph
        .import_graph_def(&def, Some("copy"))
        .expect_err("dangling input");
    assert!(matches!(err, GraphError::DanglingInput { ref op, .. } if op == "broken"), "{err}");
    assert_eq!(graph.num_operations(), 0);
    assert!(graph.operation_by_name("copy/linalg/MatrixSolve").is_none());
    assert!(graph.version() > version);
}

#[test]
fn importing_twice_without_prefix_collides() -> Result<()> {
    let def = sample_graph().to_graph_def();
    let graph = Graph::from_graph_def(&def)?;
    let err = graph
        .import_graph_def(&def, None)
        .expect_err("names already taken");
    assert_eq!(
        err,
        GraphError::DuplicateName("linalg/Placeholder".to_string())
    );
    assert_eq!(graph.num_operations(), def.nodes.len());
    Ok(())
}

#[test]
fn version_counts_insertions() {
    let scope = Scope::new();
    let start = scope.graph().version();
    placeholder(&scope, DType::Float, PlaceholderAttrs::default()).expect("first");
    placeholder(&scope, DType::Float, PlaceholderAttrs::default()).expect("second");
    assert_eq!(scope.graph().version(), start + 2);
}

#[test]
fn non_finite_literals_are_rejected() {
    let scope = Scope::new();
    let err = scalar_f64(&scope, f64::NAN).expect_err("NaN constant");
    assert!(matches!(err, GraphError::Literal(_)), "{err}");
    assert_eq!(scope.err(), Some(err));
    assert_eq!(scope.graph().num_operations(), 0);

    let err = TensorLiteral::floats(DType::Float, vec![2], vec![1.0, f64::INFINITY])
        .expect_err("infinite element");
    assert!(matches!(err, GraphError::Literal(_)), "{err}");
}

#[test]
fn float_constants_survive_json() -> Result<()> {
    let scope = Scope::new();
    scalar_f64(&scope, -0.25)?;
    let def = scope.finalize()?.to_graph_def();

    let json = def.to_json_string()?;
    let loaded = GraphDef::from_json_str(&json)?;
    assert_eq!(loaded, def);
    Graph::from_graph_def(&loaded)?;
    Ok(())
}
