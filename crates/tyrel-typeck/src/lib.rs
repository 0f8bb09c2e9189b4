//! # Type Relations and the Relation Solver
//!
//! Operators in a tensor program declare their typing rules as
//! [`TypeRelation`]s: a resolution function over the operator's argument
//! types that reports what it learns through a [`TypeReporter`]. A
//! [`TypeSolver`] runs all relations of a program unit to a fixpoint.
//!
//! ## Example
//!
//! ```
//! use tyrel_diagnostics::Span;
//! use tyrel_typeck::{Attrs, RelationRegistry, TypeSolver};
//! use tyrel_types::{DataType, Kind, Module, TensorType, Ty};
//!
//! let module = Module::new();
//! let registry = RelationRegistry::with_builtins();
//! let mut solver = TypeSolver::new(&module);
//!
//! let x = Ty::tensor(TensorType::from_dims(&[4, 1], DataType::FLOAT32));
//! let y = Ty::tensor(TensorType::from_dims(&[3], DataType::FLOAT32));
//! let out = solver.fresh_var(Kind::Type);
//! let rel = registry
//!     .make_relation("broadcast", vec![x, y, out.clone()], 2, Attrs::new(), Span::DUMMY)
//!     .unwrap();
//! solver.add_relation(rel);
//!
//! let solution = solver.solve().unwrap();
//! assert_eq!(solution.apply(&out).to_string(), "Tensor[(4, 3), float32]");
//! ```
//!
//! ## Errors
//!
//! A failed session returns [`TypeError`]s; [`diagnostics::to_diagnostic`]
//! turns them into coded, labelled diagnostics.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod attrs;
mod config;
pub mod diagnostics;
mod error;
mod registry;
mod relation;
pub mod relations;
mod reporter;
mod solver;
mod union_find;
mod unify;

pub use attrs::{AttrValue, Attrs};
pub use config::{ConfigError, SolverConfig};
pub use error::TypeError;
pub use registry::RelationRegistry;
pub use relation::{RelationError, RelationFn, TypeRelation, TypeRelationFn};
pub use reporter::TypeReporter;
pub use solver::{Solution, TypeSolver};
