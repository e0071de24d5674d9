use tfgraph::graph::{AttrValue, Dimension, TensorSpec};
use tfgraph::ops::{
    matching_files, placeholder, read_file, scalar_i32, scalar_i64, scalar_str, sharded_filename,
    sharded_filespec, whole_file_reader_v2, write_file, PlaceholderAttrs, WholeFileReaderV2Attrs,
};
use tfgraph::{DType, GraphError, Output, Scope, Shape};

fn spec_of(scope: &Scope, output: Output) -> TensorSpec {
    scope
        .graph()
        .operation(output.node())
        .and_then(|op| op.output_spec(output.index()).cloned())
        .expect("output slot exists")
}

#[test]
fn read_file_yields_scalar_string() {
    let scope = Scope::new();
    let filename = scalar_str(&scope, "/tmp/data.txt").expect("filename");
    let contents = read_file(&scope, filename).expect("read");
    assert_eq!(
        spec_of(&scope, contents),
        TensorSpec::new(DType::String, Shape::scalar())
    );

    let op = scope.graph().operation(contents.node()).expect("read op");
    assert_eq!(op.op_type(), "ReadFile");
    assert!(op.attrs().is_empty());
}

#[test]
fn read_file_rejects_non_string_filename() {
    let scope = Scope::new();
    let number = scalar_i32(&scope, 7).expect("number");
    let err = read_file(&scope, number).expect_err("filename must be a string");
    assert_eq!(
        err,
        GraphError::TypeMismatch {
            op: "ReadFile".to_string(),
            arg: "filename".to_string(),
            expected: DType::String,
            found: DType::Int32,
        }
    );
}

#[test]
fn write_file_returns_operation_without_outputs() {
    let scope = Scope::new();
    let filename = scalar_str(&scope, "out.txt").expect("filename");
    let contents = scalar_str(&scope, "hello").expect("contents");
    let write = write_file(&scope, filename, contents).expect("write");

    assert_eq!(write.op_type(), "WriteFile");
    assert_eq!(write.num_outputs(), 0);
    assert!(write.outputs().is_empty());
    let err = write.output(0).expect_err("no output slots");
    assert!(matches!(err, GraphError::OutputIndex { index: 0, count: 0, .. }), "{err}");

    let consumers = scope.graph().consumers(contents);
    assert_eq!(consumers.len(), 1);
    assert_eq!(consumers[0].0, write);
    assert_eq!(consumers[0].1, 1);
}

#[test]
fn write_file_requires_scalar_contents() {
    let scope = Scope::new();
    let filename = scalar_str(&scope, "out.txt").expect("filename");
    let lines = placeholder(
        &scope,
        DType::String,
        PlaceholderAttrs::default().shape(Shape::from_dims(&[3])),
    )
    .expect("lines");
    let err = write_file(&scope, filename, lines).expect_err("contents must be scalar");
    assert!(matches!(err, GraphError::Shape { .. }), "{err}");
}

#[test]
fn matching_files_accepts_scalar_or_vector_patterns() {
    let scope = Scope::new();
    let pattern = scalar_str(&scope, "/data/*.csv").expect("pattern");
    let files = matching_files(&scope, pattern).expect("glob");
    assert_eq!(
        spec_of(&scope, files).shape,
        Shape::vector(Dimension::Unknown)
    );

    let patterns = placeholder(
        &scope,
        DType::String,
        PlaceholderAttrs::default().shape(Shape::from_dims(&[2])),
    )
    .expect("patterns");
    matching_files(&scope, patterns).expect("vector of patterns");

    let grid = placeholder(
        &scope,
        DType::String,
        PlaceholderAttrs::default().shape(Shape::from_dims(&[2, 2])),
    )
    .expect("grid");
    let err = matching_files(&scope, grid).expect_err("matrix of patterns");
    assert!(matches!(err, GraphError::Shape { .. }), "{err}");
}

#[test]
fn sharded_names_take_int32_scalars() {
    let scope = Scope::new();
    let basename = scalar_str(&scope, "ckpt/model").expect("basename");
    let shard = scalar_i32(&scope, 3).expect("shard");
    let num_shards = scalar_i32(&scope, 8).expect("num_shards");

    let filename = sharded_filename(&scope, basename, shard, num_shards).expect("filename");
    assert_eq!(
        spec_of(&scope, filename),
        TensorSpec::new(DType::String, Shape::scalar())
    );
    let filespec = sharded_filespec(&scope, basename, num_shards).expect("filespec");
    assert_eq!(
        spec_of(&scope, filespec),
        TensorSpec::new(DType::String, Shape::scalar())
    );

    let wide = scalar_i64(&scope, 3).expect("int64 shard");
    let err = sharded_filename(&scope, basename, wide, num_shards).expect_err("int64 shard");
    assert!(
        matches!(err, GraphError::TypeMismatch { ref arg, .. } if arg == "shard"),
        "{err}"
    );
}

#[test]
fn whole_file_reader_defaults_to_unshared() {
    let scope = Scope::new();
    let reader = whole_file_reader_v2(&scope, WholeFileReaderV2Attrs::default()).expect("reader");
    let op = scope.graph().operation(reader.node()).expect("reader op");
    assert_eq!(op.attr("container"), Some(&AttrValue::String(String::new())));
    assert_eq!(op.attr("shared_name"), Some(&AttrValue::String(String::new())));
    assert_eq!(
        spec_of(&scope, reader),
        TensorSpec::new(DType::Resource, Shape::scalar())
    );

    let shared = whole_file_reader_v2(
        &scope,
        WholeFileReaderV2Attrs::default()
            .container("readers")
            .shared_name("train_files"),
    )
    .expect("shared reader");
    let op = scope.graph().operation(shared.node()).expect("shared op");
    assert_eq!(op.name(), "WholeFileReaderV2_1");
    assert_eq!(op.attr("container").and_then(AttrValue::as_str), Some("readers"));
    assert_eq!(
        op.attr("shared_name").and_then(AttrValue::as_str),
        Some("train_files")
    );
}

#[test]
fn optional_attrs_only_carry_explicit_fields() {
    let attrs = WholeFileReaderV2Attrs::default().container("c");
    assert_eq!(attrs.container.as_deref(), Some("c"));
    assert_eq!(attrs.shared_name, None);
}
