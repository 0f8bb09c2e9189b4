//! Type relations.
//!
//! A [`TypeRelation`] is the typing rule of one operator occurrence: a
//! resolution function applied to the operator's argument types (inputs
//! first, then outputs), its attributes and its source location.
//!
//! ## Resolution function contract
//!
//! ```text
//! fn(args, num_inputs, attrs, reporter) -> bool
//! ```
//!
//! - `args[..num_inputs]` are the inputs, `args[num_inputs..]` the outputs,
//!   with everything known so far substituted in.
//! - Returning `true` retires the relation; it is never called again.
//! - Returning `false` defers it until one of its arguments changes.
//! - The function must be referentially transparent: the same arguments
//!   always produce the same reports and result.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tyrel_diagnostics::Span;
use tyrel_types::Ty;

use crate::attrs::Attrs;
use crate::reporter::TypeReporter;

/// Signature of a resolution function.
pub type RelationFn = dyn Fn(&[Ty], usize, &Attrs, &mut dyn TypeReporter) -> bool + Send + Sync;

/// A named resolution function.
#[derive(Clone)]
pub struct TypeRelationFn {
    name: Arc<str>,
    func: Arc<RelationFn>,
}

impl TypeRelationFn {
    /// Wraps a closure under `name`.
    pub fn new<F>(name: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(&[Ty], usize, &Attrs, &mut dyn TypeReporter) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// The function's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the function.
    pub fn call(
        &self,
        args: &[Ty],
        num_inputs: usize,
        attrs: &Attrs,
        reporter: &mut dyn TypeReporter,
    ) -> bool {
        (self.func)(args, num_inputs, attrs, reporter)
    }
}

impl fmt::Debug for TypeRelationFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeRelationFn").field(&self.name).finish()
    }
}

/// Errors from building relations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RelationError {
    /// More inputs declared than there are arguments.
    #[error("relation `{name}` declares {num_inputs} inputs but has only {num_args} arguments")]
    TooManyInputs {
        /// Relation function name.
        name: String,
        /// Declared input count.
        num_inputs: usize,
        /// Actual argument count.
        num_args: usize,
    },

    /// No relation function is registered under this name.
    #[error("unknown relation `{0}`")]
    UnknownRelation(String),
}

/// The typing rule of one operator occurrence.
#[derive(Clone, Debug)]
pub struct TypeRelation {
    func: TypeRelationFn,
    args: Vec<Ty>,
    num_inputs: usize,
    attrs: Attrs,
    span: Span,
}

impl TypeRelation {
    /// Creates a relation.
    ///
    /// # Errors
    ///
    /// Returns [`RelationError::TooManyInputs`] if `num_inputs > args.len()`.
    pub fn new(
        func: TypeRelationFn,
        args: Vec<Ty>,
        num_inputs: usize,
        attrs: Attrs,
        span: Span,
    ) -> Result<Self, RelationError> {
        if num_inputs > args.len() {
            return Err(RelationError::TooManyInputs {
                name: func.name().to_string(),
                num_inputs,
                num_args: args.len(),
            });
        }
        Ok(Self {
            func,
            args,
            num_inputs,
            attrs,
            span,
        })
    }

    /// The resolution function.
    #[must_use]
    pub fn func(&self) -> &TypeRelationFn {
        &self.func
    }

    /// All arguments, inputs first.
    #[must_use]
    pub fn args(&self) -> &[Ty] {
        &self.args
    }

    /// Number of inputs.
    #[must_use]
    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    /// The input arguments.
    #[must_use]
    pub fn inputs(&self) -> &[Ty] {
        &self.args[..self.num_inputs]
    }

    /// The output arguments.
    #[must_use]
    pub fn outputs(&self) -> &[Ty] {
        &self.args[self.num_inputs..]
    }

    /// The operator attributes.
    #[must_use]
    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// Location of the operator call.
    #[must_use]
    pub fn span(&self) -> Span {
        self.span
    }
}

impl fmt::Display for TypeRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.func.name())?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}
