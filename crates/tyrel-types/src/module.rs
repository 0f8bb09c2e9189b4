//! Read-only view of the enclosing program.
//!
//! Relations consult the [`Module`] to look up algebraic data types (for
//! instance to check the arity of a [`TypeCall`](crate::TypeCall)) and the
//! signatures of global functions. The solver never mutates it.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::ty::{FuncType, GlobalTypeVar, Ty, TypeVar};

/// One constructor of an algebraic data type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constructor {
    /// Constructor name.
    pub name: Arc<str>,
    /// Field types, which may mention the data type's parameters.
    pub fields: Vec<Ty>,
    /// Position within the data type.
    pub tag: u32,
}

/// An algebraic data type definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeData {
    /// Name of the type.
    pub header: GlobalTypeVar,
    /// Type parameters.
    pub type_vars: Vec<TypeVar>,
    /// Constructors in declaration order.
    pub constructors: Vec<Constructor>,
}

impl TypeData {
    /// Number of type parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.type_vars.len()
    }

    /// Finds a constructor by name.
    #[must_use]
    pub fn constructor(&self, name: &str) -> Option<&Constructor> {
        self.constructors.iter().find(|c| &*c.name == name)
    }
}

/// Type definitions and function signatures of a program.
#[derive(Clone, Debug, Default)]
pub struct Module {
    type_defs: FxHashMap<Arc<str>, TypeData>,
    functions: FxHashMap<Arc<str>, FuncType>,
}

impl Module {
    /// Creates an empty module.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a data type definition, returning any previous one of the same name.
    pub fn add_type_def(&mut self, data: TypeData) -> Option<TypeData> {
        self.type_defs.insert(data.header.name.clone(), data)
    }

    /// Looks up a data type by name.
    #[must_use]
    pub fn lookup_type_def(&self, name: &str) -> Option<&TypeData> {
        self.type_defs.get(name)
    }

    /// Looks up the data type a global type variable names.
    #[must_use]
    pub fn lookup_global(&self, var: &GlobalTypeVar) -> Option<&TypeData> {
        self.lookup_type_def(&var.name)
    }

    /// Adds a function signature, returning any previous one of the same name.
    pub fn add_function(&mut self, name: impl Into<Arc<str>>, sig: FuncType) -> Option<FuncType> {
        self.functions.insert(name.into(), sig)
    }

    /// Looks up a function signature by name.
    #[must_use]
    pub fn lookup_function(&self, name: &str) -> Option<&FuncType> {
        self.functions.get(name)
    }

    /// Names of all data types, sorted.
    #[must_use]
    pub fn type_names(&self) -> Vec<Arc<str>> {
        let mut names: Vec<_> = self.type_defs.keys().cloned().collect();
        names.sort();
        names
    }
}
