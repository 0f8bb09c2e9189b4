//! Tensor types.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tyrel_arith::IndexExpr;

use crate::dtype::DataType;

/// The dimensions of a tensor; most tensors have rank 4 or less.
pub type Shape = SmallVec<[IndexExpr; 4]>;

/// A tensor of a given shape and element type.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TensorType {
    /// Dimensions, outermost first.
    pub shape: Shape,
    /// Element type.
    pub dtype: DataType,
}

impl TensorType {
    /// Creates a tensor type.
    #[must_use]
    pub fn new(shape: impl IntoIterator<Item = IndexExpr>, dtype: DataType) -> Self {
        Self {
            shape: shape.into_iter().collect(),
            dtype,
        }
    }

    /// Creates a rank-0 tensor type.
    #[must_use]
    pub fn scalar(dtype: DataType) -> Self {
        Self {
            shape: Shape::new(),
            dtype,
        }
    }

    /// Creates a tensor type with literal dimensions.
    #[must_use]
    pub fn from_dims(dims: &[i64], dtype: DataType) -> Self {
        Self::new(dims.iter().copied().map(IndexExpr::lit), dtype)
    }

    /// Number of dimensions.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Returns true for rank 0.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    /// Number of elements: the product of the dimensions, `1` for rank 0.
    ///
    /// Built with the folding constructors, so a literal shape has a literal
    /// size.
    #[must_use]
    pub fn size(&self) -> IndexExpr {
        IndexExpr::product(&self.shape)
    }

    /// Returns true if every dimension is a literal.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.shape.iter().all(IndexExpr::is_const)
    }
}

impl fmt::Display for TensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor[(")?;
        for (i, dim) in self.shape.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{dim}")?;
        }
        write!(f, "), {}]", self.dtype)
    }
}
