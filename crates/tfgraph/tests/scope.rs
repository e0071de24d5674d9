use std::collections::HashSet;
use std::sync::Arc;

use tfgraph::graph::GraphOptions;
use tfgraph::ops::{
    matrix_determinant, matrix_inverse, matrix_solve, placeholder, read_file, scalar_str,
    write_file, MatrixInverseAttrs, MatrixSolveAttrs, PlaceholderAttrs,
};
use tfgraph::{DType, Graph, GraphError, OpSpec, Scope, Shape};

fn square(scope: &Scope, dtype: DType, order: usize) -> tfgraph::Output {
    placeholder(
        scope,
        dtype,
        PlaceholderAttrs::default().shape(Shape::from_dims(&[order, order])),
    )
    .expect("placeholder")
}

#[test]
fn generated_names_are_suffixed_on_collision() {
    let scope = Scope::new();
    let a = square(&scope, DType::Float, 3);
    let first = matrix_determinant(&scope, a).expect("first determinant");
    let second = matrix_determinant(&scope, a).expect("second determinant");

    let graph = scope.graph();
    let names = [first, second]
        .iter()
        .map(|out| {
            graph
                .operation(out.node())
                .expect("recorded op")
                .name()
                .to_string()
        })
        .collect::<Vec<_>>();
    assert_eq!(names, ["MatrixDeterminant", "MatrixDeterminant_1"]);
    assert!(graph.operation_by_name("Placeholder").is_some());
}

#[test]
fn sub_scopes_nest_and_are_uniquified() {
    let root = Scope::new();
    let inner = root.sub_scope("outer").sub_scope("inner");
    assert_eq!(inner.namespace(), Some("outer/inner"));
    square(&inner, DType::Double, 2);
    assert!(root
        .graph()
        .operation_by_name("outer/inner/Placeholder")
        .is_some());

    let first = root.sub_scope("layer");
    let second = root.sub_scope("layer");
    assert_eq!(first.namespace(), Some("layer"));
    assert_eq!(second.namespace(), Some("layer_1"));
}

#[test]
fn explicit_names_are_namespaced_and_suffixed() {
    let root = Scope::new();
    let scope = root.sub_scope("net");
    let spec = OpSpec::new("Placeholder")
        .named("x")
        .attr("dtype", DType::Float);
    let first = scope.add_operation(spec.clone()).expect("first x");
    let second = scope.add_operation(spec).expect("second x");
    assert_eq!(first.name(), "net/x");
    assert_eq!(second.name(), "net/x_1");

    // A generated name skips the suffix an explicit name already claimed.
    let explicit = root
        .add_operation(
            OpSpec::new("Placeholder")
                .named("Placeholder_1")
                .attr("dtype", DType::Float),
        )
        .expect("explicit Placeholder_1");
    assert_eq!(explicit.name(), "Placeholder_1");
    let generated = square(&root, DType::Float, 2);
    let generated_again = square(&root, DType::Float, 2);
    let graph = root.graph();
    assert_eq!(
        graph
            .operation(generated.node())
            .expect("op")
            .name(),
        "Placeholder"
    );
    assert_eq!(
        graph
            .operation(generated_again.node())
            .expect("op")
            .name(),
        "Placeholder_2"
    );
}

#[test]
fn strict_names_reject_explicit_collisions() {
    let graph = Arc::new(Graph::new().with_options(GraphOptions {
        shape_inference: true,
        strict_names: true,
    }));
    let scope = Scope::with_graph(graph);
    let spec = OpSpec::new("Placeholder")
        .named("x")
        .attr("dtype", DType::Float);
    scope.add_operation(spec.clone()).expect("first x");

    let err = scope.add_operation(spec).expect_err("second x must collide");
    assert_eq!(err, GraphError::DuplicateName("x".to_string()));
    assert_eq!(scope.err(), Some(err));
}

#[test]
fn first_error_is_sticky_across_derived_scopes() {
    let root = Scope::new();
    let child = root.sub_scope("child");
    let ints = square(&child, DType::Int32, 2);

    let err = matrix_inverse(&child, ints, MatrixInverseAttrs::default())
        .expect_err("int32 is not a linalg type");
    assert!(matches!(err, GraphError::DisallowedType { .. }), "{err}");

    let before = root.graph().num_operations();
    let later = placeholder(&root, DType::Float, PlaceholderAttrs::default())
        .expect_err("root shares the child's error");
    assert_eq!(later, GraphError::Upstream(Box::new(err.clone())));
    let sibling = root.sub_scope("sibling");
    assert!(placeholder(&sibling, DType::Float, PlaceholderAttrs::default()).is_err());
    assert_eq!(root.graph().num_operations(), before);

    // Only the first error is kept.
    root.update_err("Other", GraphError::UnknownOp("Other".to_string()));
    assert_eq!(root.err(), Some(err.clone()));
    assert_eq!(root.finalize().expect_err("scope failed"), err);
}

#[test]
fn control_dependencies_and_device_are_attached() {
    let scope = Scope::new();
    let name = scalar_str(&scope, "out.txt").expect("name");
    let contents = scalar_str(&scope, "payload").expect("contents");
    let write = write_file(&scope, name, contents).expect("write");

    let gated = scope
        .with_control_dependencies(&[write.clone(), write.clone()])
        .with_device("/device:CPU:0");
    let read = read_file(&gated, name).expect("read");

    let op = scope.graph().operation(read.node()).expect("read op");
    assert_eq!(op.control_inputs(), &[write.id()]);
    assert_eq!(op.device(), Some("/device:CPU:0"));

    let plain = read_file(&scope, name).expect("plain read");
    let plain = scope.graph().operation(plain.node()).expect("plain op");
    assert!(plain.control_inputs().is_empty());
    assert_eq!(plain.device(), None);
}

#[test]
fn inputs_from_another_graph_are_rejected() {
    let first = Scope::new();
    let second = Scope::new();
    let a = square(&first, DType::Double, 2);
    let b = square(&second, DType::Double, 2);

    let err = matrix_solve(&second, a, b, MatrixSolveAttrs::default())
        .expect_err("a belongs to the first graph");
    assert!(matches!(err, GraphError::ForeignInput { index: 0, .. }), "{err}");
    assert!(first.is_ok());
}

#[test]
fn concurrent_builders_get_unique_names() {
    let scope = Scope::new();
    std::thread::scope(|threads| {
        for _ in 0..4 {
            let scope = scope.clone();
            threads.spawn(move || {
                for _ in 0..10 {
                    placeholder(&scope, DType::Float, PlaceholderAttrs::default())
                        .expect("placeholder");
                }
            });
        }
    });

    let graph = scope.finalize().expect("no errors");
    let ops = graph.operations();
    assert_eq!(ops.len(), 40);
    let names = ops
        .iter()
        .map(|op| op.name().to_string())
        .collect::<HashSet<_>>();
    assert_eq!(names.len(), 40);
    for (index, op) in ops.iter().enumerate() {
        assert_eq!(op.id().0 as usize, index);
    }
}

#[test]
fn root_scopes_over_one_graph_share_names() {
    let graph = Arc::new(Graph::new());
    let first = Scope::with_graph(Arc::clone(&graph));
    let second = Scope::with_graph(Arc::clone(&graph));

    let a = placeholder(&first, DType::Float, PlaceholderAttrs::default()).expect("first root");
    let b = placeholder(&second, DType::Float, PlaceholderAttrs::default()).expect("second root");
    assert_eq!(graph.operation(a.node()).expect("op").name(), "Placeholder");
    assert_eq!(graph.operation(b.node()).expect("op").name(), "Placeholder_1");

    assert_eq!(first.sub_scope("layer").namespace(), Some("layer"));
    assert_eq!(second.sub_scope("layer").namespace(), Some("layer_1"));
}

#[test]
fn concurrent_root_scopes_get_unique_names() {
    let graph = Arc::new(Graph::new());
    std::thread::scope(|threads| {
        for _ in 0..2 {
            let scope = Scope::with_graph(Arc::clone(&graph));
            threads.spawn(move || {
                for _ in 0..10 {
                    placeholder(&scope, DType::Float, PlaceholderAttrs::default())
                        .expect("placeholder");
                }
                assert!(scope.is_ok());
            });
        }
    });

    let names = graph
        .operations()
        .iter()
        .map(|op| op.name().to_string())
        .collect::<HashSet<_>>();
    assert_eq!(names.len(), 20);
    assert_eq!(graph.num_operations(), 20);
}
