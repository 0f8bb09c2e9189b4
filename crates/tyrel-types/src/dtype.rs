//! Tensor element types.
//!
//! A [`DataType`] is a type code, a bit width and a lane count, written in
//! the conventional textual form:
//!
//! ```text
//! float32    int8    uint16    bool    bfloat16    float16x4    handle
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The category of an element type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TypeCode {
    /// Signed integer.
    Int,
    /// Unsigned integer (`uint1` is `bool`).
    UInt,
    /// IEEE 754 float.
    Float,
    /// Brain float.
    BFloat,
    /// Opaque handle.
    Handle,
}

impl TypeCode {
    /// The textual prefix of this code.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Float => "float",
            Self::BFloat => "bfloat",
            Self::Handle => "handle",
        }
    }
}

/// A tensor element type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DataType {
    /// The type code.
    pub code: TypeCode,
    /// Width of one lane in bits.
    pub bits: u8,
    /// Number of lanes; `1` for scalars.
    pub lanes: u16,
}

impl DataType {
    /// Creates a data type from its parts.
    #[must_use]
    pub const fn new(code: TypeCode, bits: u8, lanes: u16) -> Self {
        Self { code, bits, lanes }
    }

    /// A signed integer type.
    #[must_use]
    pub const fn int(bits: u8) -> Self {
        Self::new(TypeCode::Int, bits, 1)
    }

    /// An unsigned integer type.
    #[must_use]
    pub const fn uint(bits: u8) -> Self {
        Self::new(TypeCode::UInt, bits, 1)
    }

    /// A float type.
    #[must_use]
    pub const fn float(bits: u8) -> Self {
        Self::new(TypeCode::Float, bits, 1)
    }

    /// The boolean type, `uint1`.
    #[must_use]
    pub const fn bool() -> Self {
        Self::uint(1)
    }

    /// The opaque handle type.
    #[must_use]
    pub const fn handle() -> Self {
        Self::new(TypeCode::Handle, 64, 1)
    }

    /// `int32`.
    pub const INT32: Self = Self::int(32);
    /// `int64`.
    pub const INT64: Self = Self::int(64);
    /// `float32`.
    pub const FLOAT32: Self = Self::float(32);
    /// `float16`.
    pub const FLOAT16: Self = Self::float(16);
    /// `bool`.
    pub const BOOL: Self = Self::bool();

    /// The same type with a different lane count.
    #[must_use]
    pub const fn with_lanes(self, lanes: u16) -> Self {
        Self::new(self.code, self.bits, lanes)
    }

    /// Returns true if this is `bool`.
    #[must_use]
    pub fn is_bool(self) -> bool {
        self.code == TypeCode::UInt && self.bits == 1
    }

    /// Returns true if this is a scalar (single lane) type.
    #[must_use]
    pub const fn is_scalar(self) -> bool {
        self.lanes == 1
    }

    /// Returns true for float and bfloat types.
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self.code, TypeCode::Float | TypeCode::BFloat)
    }

    /// Size of one element in bytes, rounded up.
    #[must_use]
    pub const fn bytes(self) -> usize {
        (self.bits as usize * self.lanes as usize).div_ceil(8)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bool() {
            write!(f, "bool")?;
        } else if self.code == TypeCode::Handle {
            write!(f, "handle")?;
        } else {
            write!(f, "{}{}", self.code.name(), self.bits)?;
        }
        if self.lanes != 1 {
            write!(f, "x{}", self.lanes)?;
        }
        Ok(())
    }
}

/// Errors from parsing a [`DataType`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DataTypeParseError {
    /// The input was empty.
    #[error("empty data type")]
    Empty,
    /// The prefix is not a known type code.
    #[error("unknown data type `{0}`")]
    UnknownCode(String),
    /// The bit width is not a valid number.
    #[error("invalid bit width in `{0}`")]
    InvalidBits(String),
    /// The lane count is not a valid positive number.
    #[error("invalid lane count in `{0}`")]
    InvalidLanes(String),
}

impl FromStr for DataType {
    type Err = DataTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DataTypeParseError::Empty);
        }

        let (base, lanes) = match s.split_once('x') {
            Some((base, lanes)) => {
                let lanes: u16 = lanes
                    .parse()
                    .ok()
                    .filter(|&l| l > 0)
                    .ok_or_else(|| DataTypeParseError::InvalidLanes(s.to_string()))?;
                (base, lanes)
            }
            None => (s, 1),
        };

        if base == "bool" {
            return Ok(Self::bool().with_lanes(lanes));
        }
        if base == "handle" {
            return Ok(Self::handle().with_lanes(lanes));
        }

        // Longest prefix first: "uint" before "int", "bfloat" before "float".
        let codes = [TypeCode::UInt, TypeCode::Int, TypeCode::BFloat, TypeCode::Float];
        let (code, digits) = codes
            .iter()
            .find_map(|&code| base.strip_prefix(code.name()).map(|rest| (code, rest)))
            .ok_or_else(|| DataTypeParseError::UnknownCode(s.to_string()))?;

        let bits = if digits.is_empty() {
            match code {
                TypeCode::BFloat => 16,
                _ => 32,
            }
        } else {
            digits
                .parse::<u8>()
                .ok()
                .filter(|&b| b > 0)
                .ok_or_else(|| DataTypeParseError::InvalidBits(s.to_string()))?
        };

        Ok(Self::new(code, bits, lanes))
    }
}
