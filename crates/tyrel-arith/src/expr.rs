//! Shape-dimension expressions.
//!
//! A tensor dimension is an [`IndexExpr`]: a constant, a symbolic size
//! variable, the dynamic dimension `?`, or integer arithmetic over those.
//!
//! ## Smart constructors
//!
//! The constructors on [`IndexExpr`] (`add`, `mul`, `floor_div`, ...) fold
//! constants and apply the unit/zero identities eagerly, so that a shape made
//! of literals always has literal arithmetic results:
//!
//! ```text
//! add(2, 3)      = 5
//! mul(n, 1)      = n
//! sub(n, n)      = 0
//! max(?, n)      = ?
//! ```
//!
//! Constant folding never panics: an overflowing or undefined result
//! (division by zero) keeps the node symbolic.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A symbolic size variable, e.g. a batch dimension `n`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SizeVar {
    /// Unique identifier of the variable.
    pub id: u32,
    /// Name used when printing.
    pub name: Arc<str>,
}

impl SizeVar {
    /// Creates a new size variable.
    #[must_use]
    pub fn new(id: u32, name: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for SizeVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A shape-dimension expression (symbolic integer).
///
/// The derived ordering is a total order over expressions; downstream
/// passes rely on it to keep expression-keyed maps deterministic.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndexExpr {
    /// A constant dimension.
    Const(i64),
    /// A symbolic size variable.
    Var(SizeVar),
    /// A dimension only known at run time.
    Any,
    /// `a + b`.
    Add(Box<IndexExpr>, Box<IndexExpr>),
    /// `a - b`.
    Sub(Box<IndexExpr>, Box<IndexExpr>),
    /// `a * b`.
    Mul(Box<IndexExpr>, Box<IndexExpr>),
    /// Floor division `a // b`.
    FloorDiv(Box<IndexExpr>, Box<IndexExpr>),
    /// Floor modulo `a % b` (result has the sign of `b`).
    FloorMod(Box<IndexExpr>, Box<IndexExpr>),
    /// `min(a, b)`.
    Min(Box<IndexExpr>, Box<IndexExpr>),
    /// `max(a, b)`.
    Max(Box<IndexExpr>, Box<IndexExpr>),
}

impl IndexExpr {
    /// Creates a constant dimension.
    #[must_use]
    pub fn lit(value: i64) -> Self {
        Self::Const(value)
    }

    /// Creates a variable dimension.
    #[must_use]
    pub fn var(var: SizeVar) -> Self {
        Self::Var(var)
    }

    /// Returns the constant value if this is a literal.
    #[must_use]
    pub fn as_const(&self) -> Option<i64> {
        match self {
            Self::Const(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns true if this is a literal.
    #[must_use]
    pub fn is_const(&self) -> bool {
        matches!(self, Self::Const(_))
    }

    /// Returns true if this is the literal `value`.
    #[must_use]
    pub fn is_const_value(&self, value: i64) -> bool {
        self.as_const() == Some(value)
    }

    /// Returns true if the dynamic dimension `?` occurs anywhere in this expression.
    #[must_use]
    pub fn contains_any(&self) -> bool {
        match self {
            Self::Any => true,
            Self::Const(_) | Self::Var(_) => false,
            Self::Add(a, b)
            | Self::Sub(a, b)
            | Self::Mul(a, b)
            | Self::FloorDiv(a, b)
            | Self::FloorMod(a, b)
            | Self::Min(a, b)
            | Self::Max(a, b) => a.contains_any() || b.contains_any(),
        }
    }

    /// Returns the size variables in this expression, in order of first occurrence.
    #[must_use]
    pub fn free_vars(&self) -> Vec<SizeVar> {
        let mut vars = Vec::new();
        self.collect_vars(&mut vars);
        vars
    }

    fn collect_vars(&self, vars: &mut Vec<SizeVar>) {
        match self {
            Self::Var(v) => {
                if !vars.contains(v) {
                    vars.push(v.clone());
                }
            }
            Self::Const(_) | Self::Any => {}
            Self::Add(a, b)
            | Self::Sub(a, b)
            | Self::Mul(a, b)
            | Self::FloorDiv(a, b)
            | Self::FloorMod(a, b)
            | Self::Min(a, b)
            | Self::Max(a, b) => {
                a.collect_vars(vars);
                b.collect_vars(vars);
            }
        }
    }

    /// Replaces size variables using `f`, rebuilding through the smart constructors.
    #[must_use]
    pub fn substitute(&self, f: &impl Fn(&SizeVar) -> Option<IndexExpr>) -> IndexExpr {
        match self {
            Self::Var(v) => f(v).unwrap_or_else(|| self.clone()),
            Self::Const(_) | Self::Any => self.clone(),
            Self::Add(a, b) => Self::add(a.substitute(f), b.substitute(f)),
            Self::Sub(a, b) => Self::sub(a.substitute(f), b.substitute(f)),
            Self::Mul(a, b) => Self::mul(a.substitute(f), b.substitute(f)),
            Self::FloorDiv(a, b) => Self::floor_div(a.substitute(f), b.substitute(f)),
            Self::FloorMod(a, b) => Self::floor_mod(a.substitute(f), b.substitute(f)),
            Self::Min(a, b) => Self::min(a.substitute(f), b.substitute(f)),
            Self::Max(a, b) => Self::max(a.substitute(f), b.substitute(f)),
        }
    }

    /// `a + b`, folding constants.
    #[must_use]
    pub fn add(a: IndexExpr, b: IndexExpr) -> Self {
        match (&a, &b) {
            (Self::Any, _) | (_, Self::Any) => Self::Any,
            (Self::Const(x), Self::Const(y)) => match x.checked_add(*y) {
                Some(n) => Self::Const(n),
                None => Self::Add(Box::new(a), Box::new(b)),
            },
            (Self::Const(0), _) => b,
            (_, Self::Const(0)) => a,
            _ => Self::Add(Box::new(a), Box::new(b)),
        }
    }

    /// `a - b`, folding constants.
    #[must_use]
    pub fn sub(a: IndexExpr, b: IndexExpr) -> Self {
        match (&a, &b) {
            (Self::Any, _) | (_, Self::Any) => Self::Any,
            (Self::Const(x), Self::Const(y)) => match x.checked_sub(*y) {
                Some(n) => Self::Const(n),
                None => Self::Sub(Box::new(a), Box::new(b)),
            },
            (_, Self::Const(0)) => a,
            _ if a == b => Self::Const(0),
            _ => Self::Sub(Box::new(a), Box::new(b)),
        }
    }

    /// `a * b`, folding constants.
    #[must_use]
    pub fn mul(a: IndexExpr, b: IndexExpr) -> Self {
        match (&a, &b) {
            (Self::Any, _) | (_, Self::Any) => Self::Any,
            (Self::Const(x), Self::Const(y)) => match x.checked_mul(*y) {
                Some(n) => Self::Const(n),
                None => Self::Mul(Box::new(a), Box::new(b)),
            },
            (Self::Const(0), _) | (_, Self::Const(0)) => Self::Const(0),
            (Self::Const(1), _) => b,
            (_, Self::Const(1)) => a,
            _ => Self::Mul(Box::new(a), Box::new(b)),
        }
    }

    /// Floor division `a // b`, folding constants.
    #[must_use]
    pub fn floor_div(a: IndexExpr, b: IndexExpr) -> Self {
        match (&a, &b) {
            (Self::Any, _) | (_, Self::Any) => Self::Any,
            (Self::Const(x), Self::Const(y)) => match checked_floor_div(*x, *y) {
                Some(n) => Self::Const(n),
                None => Self::FloorDiv(Box::new(a), Box::new(b)),
            },
            (_, Self::Const(1)) => a,
            _ => Self::FloorDiv(Box::new(a), Box::new(b)),
        }
    }

    /// Floor modulo `a % b`, folding constants.
    #[must_use]
    pub fn floor_mod(a: IndexExpr, b: IndexExpr) -> Self {
        match (&a, &b) {
            (Self::Any, _) | (_, Self::Any) => Self::Any,
            (Self::Const(x), Self::Const(y)) => match checked_floor_mod(*x, *y) {
                Some(n) => Self::Const(n),
                None => Self::FloorMod(Box::new(a), Box::new(b)),
            },
            (_, Self::Const(1)) => Self::Const(0),
            _ => Self::FloorMod(Box::new(a), Box::new(b)),
        }
    }

    /// `min(a, b)`, folding constants.
    #[must_use]
    pub fn min(a: IndexExpr, b: IndexExpr) -> Self {
        match (&a, &b) {
            (Self::Any, _) | (_, Self::Any) => Self::Any,
            (Self::Const(x), Self::Const(y)) => Self::Const(*x.min(y)),
            _ if a == b => a,
            _ => Self::Min(Box::new(a), Box::new(b)),
        }
    }

    /// `max(a, b)`, folding constants.
    #[must_use]
    pub fn max(a: IndexExpr, b: IndexExpr) -> Self {
        match (&a, &b) {
            (Self::Any, _) | (_, Self::Any) => Self::Any,
            (Self::Const(x), Self::Const(y)) => Self::Const(*x.max(y)),
            _ if a == b => a,
            _ => Self::Max(Box::new(a), Box::new(b)),
        }
    }

    /// Product of a sequence of dimensions; `1` for an empty sequence.
    #[must_use]
    pub fn product<'a>(dims: impl IntoIterator<Item = &'a IndexExpr>) -> Self {
        dims.into_iter()
            .fold(Self::Const(1), |acc, d| Self::mul(acc, d.clone()))
    }
}

impl From<i64> for IndexExpr {
    fn from(value: i64) -> Self {
        Self::Const(value)
    }
}

impl From<SizeVar> for IndexExpr {
    fn from(var: SizeVar) -> Self {
        Self::Var(var)
    }
}

impl fmt::Display for IndexExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const(n) => write!(f, "{n}"),
            Self::Var(v) => write!(f, "{v}"),
            Self::Any => write!(f, "?"),
            Self::Add(a, b) => write!(f, "({a} + {b})"),
            Self::Sub(a, b) => write!(f, "({a} - {b})"),
            Self::Mul(a, b) => write!(f, "({a} * {b})"),
            Self::FloorDiv(a, b) => write!(f, "({a} // {b})"),
            Self::FloorMod(a, b) => write!(f, "({a} % {b})"),
            Self::Min(a, b) => write!(f, "min({a}, {b})"),
            Self::Max(a, b) => write!(f, "max({a}, {b})"),
        }
    }
}

/// Floor division on literals; `None` on division by zero or overflow.
pub(crate) fn checked_floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

/// Floor modulo on literals; `None` on division by zero or overflow.
pub(crate) fn checked_floor_mod(a: i64, b: i64) -> Option<i64> {
    let q = checked_floor_div(a, b)?;
    a.checked_sub(q.checked_mul(b)?)
}
