//! Kinds classify the things a type variable may stand for.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of a type or type variable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Kind {
    /// An ordinary value type.
    #[default]
    Type,
    /// A shape-dimension variable.
    ShapeVar,
    /// Reserved: a generic element type.
    BaseType,
    /// Reserved: a generic shape.
    Shape,
    /// A constraint.
    Constraint,
    /// A handle to an algebraic data type.
    AdtHandle,
    /// The definition of an algebraic data type.
    TypeData,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Type => "Type",
            Self::ShapeVar => "ShapeVar",
            Self::BaseType => "BaseType",
            Self::Shape => "Shape",
            Self::Constraint => "Constraint",
            Self::AdtHandle => "AdtHandle",
            Self::TypeData => "TypeData",
        };
        write!(f, "{name}")
    }
}
