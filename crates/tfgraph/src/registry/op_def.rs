//! Declarative op signatures and descriptor resolution.

use std::fmt;

use crate::graph::{
    AttrKind, AttrMap, AttrValue, DType, Dimension, GraphError, GraphResult, OpSpec, Shape,
    TensorSpec,
};

/// Computes the static output shapes of an op from its resolved inputs and attributes.
pub type ShapeFn = fn(&InferenceContext<'_>) -> GraphResult<Vec<Shape>>;

/// Checks a resolved node beyond what the signature expresses. Runs whether or not shapes are
/// inferred.
pub type ValidateFn = fn(&InferenceContext<'_>) -> GraphResult<()>;

/// Element type of an input or output argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgType {
    /// Always this dtype.
    Fixed(DType),
    /// Whatever the named type attribute resolves to.
    Attr(String),
}

impl ArgType {
    pub fn attr(name: impl Into<String>) -> Self {
        ArgType::Attr(name.into())
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgType::Fixed(dtype) => write!(f, "{dtype}"),
            ArgType::Attr(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgDef {
    pub name: String,
    pub ty: ArgType,
}

/// Attribute declaration: kind, optional default and, for type attributes, the allowed dtypes.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrDef {
    pub name: String,
    pub kind: AttrKind,
    pub default: Option<AttrValue>,
    pub allowed: Option<Vec<DType>>,
}

impl AttrDef {
    pub fn new(name: impl Into<String>, kind: AttrKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            allowed: None,
        }
    }

    pub fn type_attr(name: impl Into<String>) -> Self {
        Self::new(name, AttrKind::Type)
    }

    pub fn default(mut self, value: impl Into<AttrValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn allowed(mut self, dtypes: &[DType]) -> Self {
        self.allowed = Some(dtypes.to_vec());
        self
    }
}

impl fmt::Display for AttrDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.kind)?;
        if let Some(allowed) = &self.allowed {
            let names = allowed.iter().map(|dtype| dtype.name()).collect::<Vec<_>>();
            write!(f, " in {{{}}}", names.join(", "))?;
        }
        if let Some(default) = &self.default {
            write!(f, " = {default}")?;
        }
        Ok(())
    }
}

/// Registered signature of one engine op.
#[derive(Clone)]
pub struct OpDef {
    pub name: String,
    pub summary: String,
    pub inputs: Vec<ArgDef>,
    pub outputs: Vec<ArgDef>,
    pub attrs: Vec<AttrDef>,
    pub stateful: bool,
    pub shape_fn: Option<ShapeFn>,
    pub validate_fn: Option<ValidateFn>,
}

impl fmt::Debug for OpDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpDef")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("attrs", &self.attrs)
            .field("stateful", &self.stateful)
            .field("has_shape_fn", &self.shape_fn.is_some())
            .field("has_validate_fn", &self.validate_fn.is_some())
            .finish()
    }
}

impl OpDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            summary: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            attrs: Vec::new(),
            stateful: false,
            shape_fn: None,
            validate_fn: None,
        }
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn input(mut self, name: impl Into<String>, ty: ArgType) -> Self {
        self.inputs.push(ArgDef {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn output(mut self, name: impl Into<String>, ty: ArgType) -> Self {
        self.outputs.push(ArgDef {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn attr(mut self, attr: AttrDef) -> Self {
        self.attrs.push(attr);
        self
    }

    pub fn stateful(mut self) -> Self {
        self.stateful = true;
        self
    }

    pub fn shape_fn(mut self, shape_fn: ShapeFn) -> Self {
        self.shape_fn = Some(shape_fn);
        self
    }

    pub fn validate_fn(mut self, validate_fn: ValidateFn) -> Self {
        self.validate_fn = Some(validate_fn);
        self
    }

    pub fn attr_def(&self, name: &str) -> Option<&AttrDef> {
        self.attrs.iter().find(|attr| attr.name == name)
    }

    /// Resolves the attribute set of a descriptor against this signature.
    ///
    /// Explicit attributes are kind-checked, type attributes are inferred from the dtypes of the
    /// inputs that reference them, and remaining attributes fall back to their defaults.
    pub fn resolve(&self, spec: &OpSpec, inputs: &[TensorSpec]) -> GraphResult<AttrMap> {
        if inputs.len() != self.inputs.len() {
            return Err(GraphError::InputCount {
                op: self.name.clone(),
                expected: self.inputs.len(),
                found: inputs.len(),
            });
        }

        let mut attrs = AttrMap::new();
        for (name, value) in &spec.attrs {
            let def = self.attr_def(name).ok_or_else(|| GraphError::UnknownAttr {
                op: self.name.clone(),
                attr: name.clone(),
            })?;
            if value.kind() != def.kind {
                return Err(GraphError::AttrType {
                    op: self.name.clone(),
                    attr: name.clone(),
                    expected: def.kind,
                    found: value.kind(),
                });
            }
            if let AttrValue::Float(value) = value {
                if !value.is_finite() {
                    return Err(GraphError::InvalidAttr {
                        op: self.name.clone(),
                        attr: name.clone(),
                        message: format!("{value} is not a finite number"),
                    });
                }
            }
            attrs.insert(name.clone(), value.clone());
        }

        for (arg, input) in self.inputs.iter().zip(inputs) {
            match &arg.ty {
                ArgType::Fixed(expected) => {
                    if input.dtype != *expected {
                        return Err(self.type_mismatch(&arg.name, *expected, input.dtype));
                    }
                }
                ArgType::Attr(type_attr) => match attrs.get(type_attr).and_then(AttrValue::as_type)
                {
                    Some(bound) if bound != input.dtype => {
                        return Err(self.type_mismatch(&arg.name, bound, input.dtype));
                    }
                    Some(_) => {}
                    None => {
                        tracing::trace!(
                            op = %self.name,
                            attr = %type_attr,
                            dtype = %input.dtype,
                            "inferred type attribute from input '{}'",
                            arg.name
                        );
                        attrs.insert(type_attr.clone(), AttrValue::Type(input.dtype));
                    }
                },
            }
        }

        for def in &self.attrs {
            if !attrs.contains_key(&def.name) {
                let default = def.default.clone().ok_or_else(|| GraphError::MissingAttr {
                    op: self.name.clone(),
                    attr: def.name.clone(),
                })?;
                attrs.insert(def.name.clone(), default);
            }
            if let (Some(allowed), Some(dtype)) = (
                &def.allowed,
                attrs.get(&def.name).and_then(AttrValue::as_type),
            ) {
                if !allowed.contains(&dtype) {
                    return Err(GraphError::DisallowedType {
                        op: self.name.clone(),
                        attr: def.name.clone(),
                        dtype,
                    });
                }
            }
        }

        Ok(attrs)
    }

    /// Derives output types for resolved attributes, running the shape function when enabled.
    pub fn output_specs(
        &self,
        inputs: &[TensorSpec],
        attrs: &AttrMap,
        infer_shapes: bool,
    ) -> GraphResult<Vec<TensorSpec>> {
        let dtypes = self
            .outputs
            .iter()
            .map(|arg| match &arg.ty {
                ArgType::Fixed(dtype) => Ok(*dtype),
                ArgType::Attr(type_attr) => attrs
                    .get(type_attr)
                    .and_then(AttrValue::as_type)
                    .ok_or_else(|| GraphError::MissingAttr {
                        op: self.name.clone(),
                        attr: type_attr.clone(),
                    }),
            })
            .collect::<GraphResult<Vec<_>>>()?;

        let ctx = InferenceContext {
            def: self,
            inputs,
            attrs,
        };
        if let Some(validate_fn) = self.validate_fn {
            validate_fn(&ctx)?;
        }

        let shapes = match self.shape_fn {
            Some(shape_fn) if infer_shapes => {
                let shapes = shape_fn(&ctx)?;
                if shapes.len() != dtypes.len() {
                    return Err(ctx.error(format!(
                        "shape function produced {} shapes for {} outputs",
                        shapes.len(),
                        dtypes.len()
                    )));
                }
                shapes
            }
            _ => vec![Shape::unknown_rank(); dtypes.len()],
        };

        Ok(dtypes
            .into_iter()
            .zip(shapes)
            .map(|(dtype, shape)| TensorSpec::new(dtype, shape))
            .collect())
    }

    fn type_mismatch(&self, arg: &str, expected: DType, found: DType) -> GraphError {
        GraphError::TypeMismatch {
            op: self.name.clone(),
            arg: arg.to_string(),
            expected,
            found,
        }
    }
}

impl fmt::Display for OpDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = |defs: &[ArgDef]| {
            defs.iter()
                .map(|arg| format!("{}: {}", arg.name, arg.ty))
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(
            f,
            "{}({}) -> ({})",
            self.name,
            args(&self.inputs),
            args(&self.outputs)
        )?;
        if self.stateful {
            f.write_str(" [stateful]")?;
        }
        for attr in &self.attrs {
            write!(f, "\n    attr {attr}")?;
        }
        Ok(())
    }
}

/// Read-only view handed to shape functions.
pub struct InferenceContext<'a> {
    def: &'a OpDef,
    inputs: &'a [TensorSpec],
    attrs: &'a AttrMap,
}

impl<'a> InferenceContext<'a> {
    pub fn op(&self) -> &str {
        &self.def.name
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn input(&self, index: usize) -> &'a TensorSpec {
        &self.inputs[index]
    }

    pub fn attr(&self, name: &str) -> Option<&'a AttrValue> {
        self.attrs.get(name)
    }

    pub fn error(&self, message: impl Into<String>) -> GraphError {
        GraphError::Shape {
            op: self.def.name.clone(),
            message: message.into(),
        }
    }

    fn input_name(&self, index: usize) -> &str {
        self.def
            .inputs
            .get(index)
            .map(|arg| arg.name.as_str())
            .unwrap_or("<input>")
    }

    /// Dimensions of input `index`, or `None` for unknown rank. Errors when the known rank
    /// differs from `rank`.
    pub fn with_rank(&self, index: usize, rank: usize) -> GraphResult<Option<&'a [Dimension]>> {
        let dims = self.inputs[index].shape.dims();
        match dims {
            Some(dims) if dims.len() != rank => Err(self.error(format!(
                "input '{}' must be rank {rank}, got rank {}",
                self.input_name(index),
                dims.len()
            ))),
            _ => Ok(dims),
        }
    }

    pub fn with_rank_at_least(
        &self,
        index: usize,
        rank: usize,
    ) -> GraphResult<Option<&'a [Dimension]>> {
        let dims = self.inputs[index].shape.dims();
        match dims {
            Some(dims) if dims.len() < rank => Err(self.error(format!(
                "input '{}' must be at least rank {rank}, got rank {}",
                self.input_name(index),
                dims.len()
            ))),
            _ => Ok(dims),
        }
    }

    pub fn with_rank_at_most(
        &self,
        index: usize,
        rank: usize,
    ) -> GraphResult<Option<&'a [Dimension]>> {
        let dims = self.inputs[index].shape.dims();
        match dims {
            Some(dims) if dims.len() > rank => Err(self.error(format!(
                "input '{}' must be at most rank {rank}, got rank {}",
                self.input_name(index),
                dims.len()
            ))),
            _ => Ok(dims),
        }
    }

    /// Merges two extents that must agree, naming `what` in the error.
    pub fn merge_dim(&self, a: Dimension, b: Dimension, what: &str) -> GraphResult<Dimension> {
        a.merge(b)
            .ok_or_else(|| self.error(format!("{what}: dimensions {a} and {b} are incompatible")))
    }

    /// Merges two batch prefixes element-wise; both must have the same length.
    pub fn merge_batch(
        &self,
        lhs: &[Dimension],
        rhs: &[Dimension],
        what: &str,
    ) -> GraphResult<Vec<Dimension>> {
        if lhs.len() != rhs.len() {
            return Err(self.error(format!(
                "{what}: batch ranks {} and {} differ",
                lhs.len(),
                rhs.len()
            )));
        }
        lhs.iter()
            .zip(rhs)
            .map(|(a, b)| self.merge_dim(*a, *b, what))
            .collect()
    }
}
