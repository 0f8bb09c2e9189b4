//! Lookup of resolution functions by operator name.

use rustc_hash::FxHashMap;
use tyrel_diagnostics::Span;
use tyrel_types::Ty;

use crate::attrs::Attrs;
use crate::relation::{RelationError, TypeRelation, TypeRelationFn};
use crate::relations;

/// A table of named resolution functions.
#[derive(Clone, Debug, Default)]
pub struct RelationRegistry {
    fns: FxHashMap<String, TypeRelationFn>,
}

impl RelationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in relation.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for func in [
            relations::identity(),
            relations::elemwise(),
            relations::broadcast(),
            relations::matmul(),
            relations::reshape(),
            relations::tuple_get(),
            relations::make_tuple(),
            relations::ref_new(),
            relations::ref_read(),
            relations::adt_call(),
            relations::call_global(),
        ] {
            registry.register(func);
        }
        registry
    }

    /// Registers `func` under its own name, returning any function it replaces.
    pub fn register(&mut self, func: TypeRelationFn) -> Option<TypeRelationFn> {
        self.fns.insert(func.name().to_string(), func)
    }

    /// Looks up a function by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypeRelationFn> {
        self.fns.get(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fns.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Builds a relation for the operator `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RelationError::UnknownRelation`] if nothing is registered
    /// under `name`, or any error from [`TypeRelation::new`].
    pub fn make_relation(
        &self,
        name: &str,
        args: Vec<Ty>,
        num_inputs: usize,
        attrs: Attrs,
        span: Span,
    ) -> Result<TypeRelation, RelationError> {
        let func = self
            .get(name)
            .cloned()
            .ok_or_else(|| RelationError::UnknownRelation(name.to_string()))?;
        TypeRelation::new(func, args, num_inputs, attrs, span)
    }
}
