use std::{collections::BTreeMap, fmt, fs, io, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Frozen graph definition format version enforced by this crate.
pub const GRAPH_DEF_VERSION: &str = "tfgraph.v1";

fn default_graph_def_version() -> String {
    GRAPH_DEF_VERSION.to_string()
}

/// Element types understood by the execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DType {
    Float,
    Double,
    Half,
    BFloat16,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    Bool,
    String,
    Complex64,
    Complex128,
    Resource,
}

impl DType {
    pub const ALL: [DType; 15] = [
        DType::Float,
        DType::Double,
        DType::Half,
        DType::BFloat16,
        DType::Int8,
        DType::Int16,
        DType::Int32,
        DType::Int64,
        DType::UInt8,
        DType::UInt16,
        DType::Bool,
        DType::String,
        DType::Complex64,
        DType::Complex128,
        DType::Resource,
    ];

    /// Returns `true` for real floating-point types.
    pub fn is_float(self) -> bool {
        matches!(
            self,
            DType::Float | DType::Double | DType::Half | DType::BFloat16
        )
    }

    pub fn is_complex(self) -> bool {
        matches!(self, DType::Complex64 | DType::Complex128)
    }

    /// Returns `true` for signed and unsigned integer types.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            DType::Int8
                | DType::Int16
                | DType::Int32
                | DType::Int64
                | DType::UInt8
                | DType::UInt16
        )
    }

    /// Engine spelling of the type, e.g. `float` or `complex64`.
    pub fn name(self) -> &'static str {
        match self {
            DType::Float => "float",
            DType::Double => "double",
            DType::Half => "half",
            DType::BFloat16 => "bfloat16",
            DType::Int8 => "int8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::UInt8 => "uint8",
            DType::UInt16 => "uint16",
            DType::Bool => "bool",
            DType::String => "string",
            DType::Complex64 => "complex64",
            DType::Complex128 => "complex128",
            DType::Resource => "resource",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        DType::ALL.into_iter().find(|dtype| dtype.name() == name)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single axis extent; `Unknown` when the size is only known at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Known(usize),
    Unknown,
}

impl Dimension {
    pub fn value(self) -> Option<usize> {
        match self {
            Dimension::Known(value) => Some(value),
            Dimension::Unknown => None,
        }
    }

    /// Combines two extents describing the same axis.
    ///
    /// Returns `None` when both are known and differ.
    pub fn merge(self, other: Dimension) -> Option<Dimension> {
        match (self, other) {
            (Dimension::Known(a), Dimension::Known(b)) if a != b => None,
            (Dimension::Known(a), _) | (_, Dimension::Known(a)) => Some(Dimension::Known(a)),
            (Dimension::Unknown, Dimension::Unknown) => Some(Dimension::Unknown),
        }
    }
}

impl From<usize> for Dimension {
    fn from(value: usize) -> Self {
        Dimension::Known(value)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Known(value) => write!(f, "{value}"),
            Dimension::Unknown => f.write_str("?"),
        }
    }
}

/// Static tensor shape. `dims == None` means even the rank is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    dims: Option<Vec<Dimension>>,
}

impl Shape {
    pub fn new(dims: impl Into<Vec<Dimension>>) -> Self {
        Self {
            dims: Some(dims.into()),
        }
    }

    /// Fully known shape from plain extents.
    pub fn from_dims(dims: &[usize]) -> Self {
        Self::new(dims.iter().copied().map(Dimension::Known).collect::<Vec<_>>())
    }

    pub fn scalar() -> Self {
        Self::new(Vec::new())
    }

    pub fn vector(len: Dimension) -> Self {
        Self::new(vec![len])
    }

    pub fn unknown_rank() -> Self {
        Self { dims: None }
    }

    /// Same as [`Shape::unknown_rank`]; nothing is known about the tensor.
    pub fn unknown() -> Self {
        Self::unknown_rank()
    }

    /// Shape of known rank whose extents are all unknown.
    pub fn unknown_dims(rank: usize) -> Self {
        Self::new(vec![Dimension::Unknown; rank])
    }

    pub fn rank(&self) -> Option<usize> {
        self.dims.as_ref().map(Vec::len)
    }

    pub fn dims(&self) -> Option<&[Dimension]> {
        self.dims.as_deref()
    }

    pub fn is_fully_defined(&self) -> bool {
        self.static_dims().is_some()
    }

    /// Returns plain extents when rank and every dimension are known.
    pub fn static_dims(&self) -> Option<Vec<usize>> {
        self.dims
            .as_ref()?
            .iter()
            .map(|dim| dim.value())
            .collect::<Option<Vec<_>>>()
    }

    /// Number of elements when the shape is fully defined.
    pub fn num_elements(&self) -> Option<usize> {
        self.static_dims().map(|dims| dims.iter().product())
    }

    /// Combines two descriptions of the same tensor, refining unknowns.
    /// Returns `None` when the shapes contradict each other.
    pub fn merge(&self, other: &Shape) -> Option<Shape> {
        match (&self.dims, &other.dims) {
            (None, _) => Some(other.clone()),
            (_, None) => Some(self.clone()),
            (Some(lhs), Some(rhs)) => {
                if lhs.len() != rhs.len() {
                    return None;
                }
                lhs.iter()
                    .zip(rhs.iter())
                    .map(|(a, b)| a.merge(*b))
                    .collect::<Option<Vec<_>>>()
                    .map(Shape::new)
            }
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dims {
            None => f.write_str("[..]"),
            Some(dims) => {
                let parts = dims.iter().map(ToString::to_string).collect::<Vec<_>>();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

/// Static type of one output slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorSpec {
    pub dtype: DType,
    pub shape: Shape,
}

impl TensorSpec {
    pub fn new(dtype: DType, shape: Shape) -> Self {
        Self { dtype, shape }
    }
}

impl fmt::Display for TensorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.dtype, self.shape)
    }
}

/// Flat element storage of a [`TensorLiteral`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValues {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    Float(Vec<f64>),
    Str(Vec<String>),
    Complex(Vec<(f64, f64)>),
}

impl LiteralValues {
    pub fn len(&self) -> usize {
        match self {
            LiteralValues::Bool(values) => values.len(),
            LiteralValues::Int(values) => values.len(),
            LiteralValues::Float(values) => values.len(),
            LiteralValues::Str(values) => values.len(),
            LiteralValues::Complex(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn kind_name(&self) -> &'static str {
        match self {
            LiteralValues::Bool(_) => "bool",
            LiteralValues::Int(_) => "integer",
            LiteralValues::Float(_) => "floating-point",
            LiteralValues::Str(_) => "string",
            LiteralValues::Complex(_) => "complex",
        }
    }

    /// Whether any floating-point component is NaN or infinite.
    fn has_non_finite(&self) -> bool {
        match self {
            LiteralValues::Float(values) => values.iter().any(|value| !value.is_finite()),
            LiteralValues::Complex(values) => values
                .iter()
                .any(|(re, im)| !re.is_finite() || !im.is_finite()),
            _ => false,
        }
    }

    fn accepts(&self, dtype: DType) -> bool {
        match self {
            LiteralValues::Bool(_) => dtype == DType::Bool,
            LiteralValues::Int(_) => dtype.is_integer(),
            LiteralValues::Float(_) => dtype.is_float(),
            LiteralValues::Str(_) => dtype == DType::String,
            LiteralValues::Complex(_) => dtype.is_complex(),
        }
    }
}

/// Dense host value embedded in a `Const` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorLiteral {
    dtype: DType,
    dims: Vec<usize>,
    values: LiteralValues,
}

impl TensorLiteral {
    /// Builds a literal, checking that the storage kind fits `dtype` and that the element count
    /// matches `dims`.
    pub fn new(dtype: DType, dims: Vec<usize>, values: LiteralValues) -> GraphResult<Self> {
        let literal = Self {
            dtype,
            dims,
            values,
        };
        literal.validate()?;
        Ok(literal)
    }

    /// Re-checks the invariants of [`TensorLiteral::new`], for literals that were deserialized.
    pub fn validate(&self) -> GraphResult<()> {
        let dtype = self.dtype;
        if !self.values.accepts(dtype) {
            return Err(GraphError::Literal(format!(
                "{dtype} literal cannot hold {} values",
                self.values.kind_name()
            )));
        }
        if self.values.has_non_finite() {
            return Err(GraphError::Literal(format!(
                "{dtype} literal holds NaN or infinite values"
            )));
        }
        let expected: usize = self.dims.iter().product();
        if self.values.len() != expected {
            return Err(GraphError::Literal(format!(
                "shape {:?} needs {expected} elements, got {}",
                self.dims,
                self.values.len()
            )));
        }
        Ok(())
    }

    pub fn scalar_str(value: impl Into<String>) -> Self {
        Self {
            dtype: DType::String,
            dims: Vec::new(),
            values: LiteralValues::Str(vec![value.into()]),
        }
    }

    pub fn scalar_i32(value: i32) -> Self {
        Self {
            dtype: DType::Int32,
            dims: Vec::new(),
            values: LiteralValues::Int(vec![i64::from(value)]),
        }
    }

    pub fn scalar_i64(value: i64) -> Self {
        Self {
            dtype: DType::Int64,
            dims: Vec::new(),
            values: LiteralValues::Int(vec![value]),
        }
    }

    /// Double scalar; NaN and infinities are rejected.
    pub fn scalar_f64(value: f64) -> GraphResult<Self> {
        Self::new(DType::Double, Vec::new(), LiteralValues::Float(vec![value]))
    }

    pub fn scalar_bool(value: bool) -> Self {
        Self {
            dtype: DType::Bool,
            dims: Vec::new(),
            values: LiteralValues::Bool(vec![value]),
        }
    }

    /// Real floating-point tensor of the given float dtype.
    pub fn floats(dtype: DType, dims: Vec<usize>, values: Vec<f64>) -> GraphResult<Self> {
        Self::new(dtype, dims, LiteralValues::Float(values))
    }

    pub fn strings<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        let values = values.into_iter().map(Into::into).collect::<Vec<_>>();
        Self {
            dtype: DType::String,
            dims: vec![values.len()],
            values: LiteralValues::Str(values),
        }
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn values(&self) -> &LiteralValues {
        &self.values
    }

    pub fn shape(&self) -> Shape {
        Shape::from_dims(&self.dims)
    }

    pub fn spec(&self) -> TensorSpec {
        TensorSpec::new(self.dtype, self.shape())
    }
}

/// Kind tag of an [`AttrValue`], used for attribute declarations and type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttrKind {
    Bool,
    Int,
    Float,
    String,
    Type,
    Shape,
    Tensor,
    IntList,
    TypeList,
    StringList,
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttrKind::Bool => "bool",
            AttrKind::Int => "int",
            AttrKind::Float => "float",
            AttrKind::String => "string",
            AttrKind::Type => "type",
            AttrKind::Shape => "shape",
            AttrKind::Tensor => "tensor",
            AttrKind::IntList => "list(int)",
            AttrKind::TypeList => "list(type)",
            AttrKind::StringList => "list(string)",
        };
        f.write_str(name)
    }
}

/// Typed attribute value attached to an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Type(DType),
    Shape(Shape),
    Tensor(TensorLiteral),
    IntList(Vec<i64>),
    TypeList(Vec<DType>),
    StringList(Vec<String>),
}

impl AttrValue {
    pub fn kind(&self) -> AttrKind {
        match self {
            AttrValue::Bool(_) => AttrKind::Bool,
            AttrValue::Int(_) => AttrKind::Int,
            AttrValue::Float(_) => AttrKind::Float,
            AttrValue::String(_) => AttrKind::String,
            AttrValue::Type(_) => AttrKind::Type,
            AttrValue::Shape(_) => AttrKind::Shape,
            AttrValue::Tensor(_) => AttrKind::Tensor,
            AttrValue::IntList(_) => AttrKind::IntList,
            AttrValue::TypeList(_) => AttrKind::TypeList,
            AttrValue::StringList(_) => AttrKind::StringList,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<DType> {
        match self {
            AttrValue::Type(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_shape(&self) -> Option<&Shape> {
        match self {
            AttrValue::Shape(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_tensor(&self) -> Option<&TensorLiteral> {
        match self {
            AttrValue::Tensor(value) => Some(value),
            _ => None,
        }
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::String(value)
    }
}

impl From<DType> for AttrValue {
    fn from(value: DType) -> Self {
        AttrValue::Type(value)
    }
}

impl From<Shape> for AttrValue {
    fn from(value: Shape) -> Self {
        AttrValue::Shape(value)
    }
}

impl From<TensorLiteral> for AttrValue {
    fn from(value: TensorLiteral) -> Self {
        AttrValue::Tensor(value)
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(value) => write!(f, "{value}"),
            AttrValue::Int(value) => write!(f, "{value}"),
            AttrValue::Float(value) => write!(f, "{value}"),
            AttrValue::String(value) => write!(f, "{value:?}"),
            AttrValue::Type(value) => write!(f, "{value}"),
            AttrValue::Shape(value) => write!(f, "{value}"),
            AttrValue::Tensor(value) => write!(f, "tensor<{}>", value.spec()),
            AttrValue::IntList(values) => write!(f, "{values:?}"),
            AttrValue::TypeList(values) => {
                let names = values.iter().map(|dtype| dtype.name()).collect::<Vec<_>>();
                write!(f, "[{}]", names.join(", "))
            }
            AttrValue::StringList(values) => write!(f, "{values:?}"),
        }
    }
}

/// Ordered attribute map carried by descriptors and frozen nodes.
pub type AttrMap = BTreeMap<String, AttrValue>;

/// Process-unique identity of a [`Graph`](super::Graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphId(pub(crate) usize);

/// Position of a node inside its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Graph-independent reference to one output slot, as stored in a [`NodeDef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub node: NodeId,
    pub index: usize,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node, self.index)
    }
}

/// Symbolic output handle: an unevaluated reference to one output slot of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Output {
    pub(crate) graph: GraphId,
    pub(crate) endpoint: Endpoint,
}

impl Output {
    pub fn node(&self) -> NodeId {
        self.endpoint.node
    }

    pub fn index(&self) -> usize {
        self.endpoint.index
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.endpoint)
    }
}

/// Operation descriptor: the (type name, ordered inputs, optional attribute map) triple handed to
/// the graph builder. Only attributes set explicitly appear in `attrs`; the registry fills in
/// documented defaults when the node is created.
#[derive(Debug, Clone, PartialEq)]
pub struct OpSpec {
    pub op_type: String,
    pub name: Option<String>,
    pub inputs: Vec<Output>,
    pub attrs: AttrMap,
}

impl OpSpec {
    pub fn new(op_type: impl Into<String>) -> Self {
        Self {
            op_type: op_type.into(),
            name: None,
            inputs: Vec::new(),
            attrs: AttrMap::new(),
        }
    }

    /// Requests a node name; the scope still namespaces and uniquifies it.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn input(mut self, output: Output) -> Self {
        self.inputs.push(output);
        self
    }

    pub fn inputs(mut self, outputs: impl IntoIterator<Item = Output>) -> Self {
        self.inputs.extend(outputs);
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn attrs(mut self, attrs: AttrMap) -> Self {
        self.attrs.extend(attrs);
        self
    }
}

/// Frozen node as recorded by the graph and written to a [`GraphDef`].
///
/// `attrs` holds the fully resolved attribute set: explicit values, registry defaults and type
/// attributes inferred from input dtypes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
    pub id: NodeId,
    pub name: String,
    pub op_type: String,
    pub inputs: Vec<Endpoint>,
    #[serde(default)]
    pub control_inputs: Vec<NodeId>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub attrs: AttrMap,
    pub outputs: Vec<TensorSpec>,
}

/// Serializable snapshot of a whole graph, nodes in insertion (topological) order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDef {
    #[serde(default = "default_graph_def_version")]
    pub version: String,
    pub nodes: Vec<NodeDef>,
}

impl Default for GraphDef {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Errors raised while building or validating a graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("unknown op type '{0}'")]
    UnknownOp(String),
    #[error("op '{op}' expects {expected} inputs, got {found}")]
    InputCount {
        op: String,
        expected: usize,
        found: usize,
    },
    #[error("op '{op}' has no attribute '{attr}'")]
    UnknownAttr { op: String, attr: String },
    #[error("attribute '{attr}' of op '{op}' expects {expected}, got {found}")]
    AttrType {
        op: String,
        attr: String,
        expected: AttrKind,
        found: AttrKind,
    },
    #[error("attribute '{attr}' of op '{op}' is invalid: {message}")]
    InvalidAttr {
        op: String,
        attr: String,
        message: String,
    },
    #[error("op '{op}' is missing required attribute '{attr}'")]
    MissingAttr { op: String, attr: String },
    #[error("type mismatch in op '{op}' for '{arg}': expected {expected}, got {found}")]
    TypeMismatch {
        op: String,
        arg: String,
        expected: DType,
        found: DType,
    },
    #[error("op '{op}' does not accept {dtype} for attribute '{attr}'")]
    DisallowedType {
        op: String,
        attr: String,
        dtype: DType,
    },
    #[error("shape error in op '{op}': {message}")]
    Shape { op: String, message: String },
    #[error("input {index} of op '{op}' references missing output {endpoint}")]
    DanglingInput {
        op: String,
        index: usize,
        endpoint: Endpoint,
    },
    #[error("input {index} of op '{op}' belongs to a different graph")]
    ForeignInput { op: String, index: usize },
    #[error("control input of op '{op}' references missing node {node}")]
    DanglingControl { op: String, node: NodeId },
    #[error("operation name '{0}' already exists in the graph")]
    DuplicateName(String),
    #[error("output index {index} out of range for op '{op}' with {count} outputs")]
    OutputIndex {
        op: String,
        index: usize,
        count: usize,
    },
    #[error("op definition '{0}' is already registered")]
    DuplicateOpDef(String),
    #[error("invalid literal: {0}")]
    Literal(String),
    #[error("graph state poisoned")]
    Poisoned,
    #[error("scope already failed: {0}")]
    Upstream(Box<GraphError>),
}

/// Convenience alias for graph-construction results.
pub type GraphResult<T> = Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphSerdeError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("graph def version '{found}' does not match expected '{expected}'")]
    VersionMismatch {
        found: String,
        expected: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum GraphIoError {
    #[error(transparent)]
    Serialization(#[from] GraphSerdeError),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl GraphDef {
    pub fn new(nodes: Vec<NodeDef>) -> Self {
        Self {
            version: GRAPH_DEF_VERSION.to_string(),
            nodes,
        }
    }

    pub fn node_by_name(&self, name: &str) -> Option<&NodeDef> {
        self.nodes.iter().find(|node| node.name == name)
    }

    pub fn to_json_string(&self) -> Result<String, GraphSerdeError> {
        serde_json::to_string_pretty(self).map_err(GraphSerdeError::from)
    }

    pub fn from_json_str(src: &str) -> Result<Self, GraphSerdeError> {
        let mut def: GraphDef = serde_json::from_str(src).map_err(GraphSerdeError::from)?;
        def.version = normalize_version(def.version)?;
        Ok(def)
    }

    pub fn to_bincode_bytes(&self) -> Result<Vec<u8>, GraphSerdeError> {
        bincode::serialize(self).map_err(GraphSerdeError::from)
    }

    pub fn from_bincode_slice(bytes: &[u8]) -> Result<Self, GraphSerdeError> {
        let mut def: GraphDef = bincode::deserialize(bytes).map_err(GraphSerdeError::from)?;
        def.version = normalize_version(def.version)?;
        Ok(def)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), GraphIoError> {
        let contents = self.to_json_string()?;
        fs::write(path, contents).map_err(GraphIoError::from)
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, GraphIoError> {
        let contents = fs::read_to_string(path).map_err(GraphIoError::from)?;
        GraphDef::from_json_str(&contents).map_err(GraphIoError::from)
    }

    pub fn save_bincode<P: AsRef<Path>>(&self, path: P) -> Result<(), GraphIoError> {
        let bytes = self.to_bincode_bytes()?;
        fs::write(path, bytes).map_err(GraphIoError::from)
    }

    pub fn load_bincode<P: AsRef<Path>>(path: P) -> Result<Self, GraphIoError> {
        let bytes = fs::read(path).map_err(GraphIoError::from)?;
        GraphDef::from_bincode_slice(&bytes).map_err(GraphIoError::from)
    }

    pub fn to_text(&self) -> String {
        format!("{self}")
    }
}

fn normalize_version(version: String) -> Result<String, GraphSerdeError> {
    if version.is_empty() {
        return Ok(GRAPH_DEF_VERSION.to_string());
    }
    if version == GRAPH_DEF_VERSION {
        Ok(version)
    } else {
        Err(GraphSerdeError::VersionMismatch {
            found: version,
            expected: GRAPH_DEF_VERSION,
        })
    }
}

impl fmt::Display for GraphDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_line(f, 0, &format!("graph (version = {}) {{", self.version))?;
        let names: BTreeMap<NodeId, &str> = self
            .nodes
            .iter()
            .map(|node| (node.id, node.name.as_str()))
            .collect();
        for node in &self.nodes {
            fmt_node(node, &names, 1, f)?;
        }
        write_line(f, 0, "}")
    }
}

fn fmt_node(
    node: &NodeDef,
    names: &BTreeMap<NodeId, &str>,
    indent: usize,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    let endpoint_name = |endpoint: &Endpoint| match names.get(&endpoint.node) {
        Some(name) => format!("{name}:{}", endpoint.index),
        None => endpoint.to_string(),
    };
    let inputs = node.inputs.iter().map(endpoint_name).collect::<Vec<_>>();
    let mut line = format!(
        "{} {} = {}({})",
        node.id,
        node.name,
        node.op_type,
        inputs.join(", ")
    );
    if !node.control_inputs.is_empty() {
        let controls = node
            .control_inputs
            .iter()
            .map(|id| format!("^{}", names.get(id).copied().unwrap_or("<missing>")))
            .collect::<Vec<_>>();
        line.push_str(&format!(" [{}]", controls.join(", ")));
    }
    if !node.attrs.is_empty() {
        let attrs = node
            .attrs
            .iter()
            .map(|(key, value)| format!("{key} = {value}"))
            .collect::<Vec<_>>();
        line.push_str(&format!(" {{{}}}", attrs.join(", ")));
    }
    if let Some(device) = &node.device {
        line.push_str(&format!(" @{device}"));
    }
    let outputs = node
        .outputs
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    line.push_str(&format!(" -> ({})", outputs.join(", ")));
    write_line(f, indent, &line)
}

fn write_line(f: &mut fmt::Formatter<'_>, indent: usize, line: &str) -> fmt::Result {
    for _ in 0..indent {
        f.write_str("  ")?;
    }
    f.write_str(line)?;
    f.write_str("\n")
}
