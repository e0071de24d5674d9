//! File I/O ops. The graph only records them; reading, writing and globbing happen in the
//! execution engine.

use crate::graph::{GraphResult, OpSpec, Operation, Output};
use crate::Scope;

use super::single_output;

optional_attrs! {
    /// Optional attributes of [`whole_file_reader_v2`].
    pub struct WholeFileReaderV2Attrs {
        /// Container the reader is placed in. Defaults to `""`.
        container: String,
        /// Name under which the reader is shared across sessions. Defaults to `""`.
        shared_name: String,
    }
}

/// Reads the whole file named by the scalar string `filename`.
pub fn read_file(scope: &Scope, filename: Output) -> GraphResult<Output> {
    single_output(scope, OpSpec::new("ReadFile").input(filename))
}

/// Writes `contents` to `filename`, creating the file when missing.
///
/// The op has no outputs, so the operation itself is returned for use as a control dependency.
pub fn write_file(scope: &Scope, filename: Output, contents: Output) -> GraphResult<Operation> {
    scope.add_operation(OpSpec::new("WriteFile").input(filename).input(contents))
}

/// Files matching one or more glob patterns, as a string vector.
pub fn matching_files(scope: &Scope, pattern: Output) -> GraphResult<Output> {
    single_output(scope, OpSpec::new("MatchingFiles").input(pattern))
}

/// `basename-{shard:05}-of-{num_shards:05}`.
pub fn sharded_filename(
    scope: &Scope,
    basename: Output,
    shard: Output,
    num_shards: Output,
) -> GraphResult<Output> {
    single_output(
        scope,
        OpSpec::new("ShardedFilename")
            .input(basename)
            .input(shard)
            .input(num_shards),
    )
}

/// Glob pattern matching every shard written by [`sharded_filename`].
pub fn sharded_filespec(
    scope: &Scope,
    basename: Output,
    num_shards: Output,
) -> GraphResult<Output> {
    single_output(
        scope,
        OpSpec::new("ShardedFilespec")
            .input(basename)
            .input(num_shards),
    )
}

/// Resource handle of a reader that yields each queued file as one record.
pub fn whole_file_reader_v2(scope: &Scope, attrs: WholeFileReaderV2Attrs) -> GraphResult<Output> {
    single_output(
        scope,
        OpSpec::new("WholeFileReaderV2").attrs(attrs.into_attrs()),
    )
}
