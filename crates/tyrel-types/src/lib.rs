//! # Tensor Program Types
//!
//! The type language of tyrel programs.
//!
//! ## Core Types
//!
//! - [`Ty`]: a shared, immutable type node ([`TyKind`])
//! - [`TensorType`]: shape plus element [`DataType`]
//! - [`IncompleteType`]: an inference placeholder the solver resolves
//! - [`Kind`]: what a variable may stand for
//! - [`Module`]: read-only data type and function definitions
//!
//! ## Example
//!
//! ```
//! use tyrel_types::{DataType, TensorType, Ty};
//!
//! let t = Ty::tensor(TensorType::from_dims(&[4, 4], DataType::INT32));
//! assert_eq!(t.to_string(), "Tensor[(4, 4), int32]");
//! assert!(t.is_complete());
//! ```
//!
//! Constructors validate nothing beyond their own fields and perform no
//! inference; shapes and arities are the business of type relations.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod dtype;
mod kind;
mod module;
mod tensor;
mod ty;

pub use dtype::{DataType, DataTypeParseError, TypeCode};
pub use kind::Kind;
pub use module::{Constructor, Module, TypeData};
pub use tensor::{Shape, TensorType};
pub use ty::{
    FuncType, GlobalTypeVar, IncompleteType, RefType, TupleType, Ty, TyKind, TypeCall, TypeVar,
};
