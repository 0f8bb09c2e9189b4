//! Boolean conditions over dimension expressions.
//!
//! Relations state shape obligations as [`Cond`]s, e.g. "the inner
//! dimensions of a matmul agree" is `Cond::equal(k1, k2)`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::expr::IndexExpr;

/// A comparison operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CmpOp {
    /// The textual operator.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// The operator that holds with the operands exchanged: `a < b` iff `b > a`.
    #[must_use]
    pub const fn swap(self) -> Self {
        match self {
            Self::Eq | Self::Ne => self,
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            Self::Gt => Self::Lt,
            Self::Ge => Self::Le,
        }
    }

    /// Evaluates `lhs op rhs` on literals.
    #[must_use]
    pub fn eval(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
        }
    }
}

/// A boolean shape condition.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Cond {
    /// A literal truth value.
    Bool(bool),
    /// `lhs op rhs`.
    Cmp(CmpOp, IndexExpr, IndexExpr),
    /// Conjunction.
    And(Box<Cond>, Box<Cond>),
    /// Disjunction.
    Or(Box<Cond>, Box<Cond>),
    /// Negation.
    Not(Box<Cond>),
}

impl Cond {
    /// `lhs op rhs`.
    #[must_use]
    pub fn compare(op: CmpOp, lhs: impl Into<IndexExpr>, rhs: impl Into<IndexExpr>) -> Self {
        Self::Cmp(op, lhs.into(), rhs.into())
    }

    /// `lhs == rhs`.
    #[must_use]
    pub fn equal(lhs: impl Into<IndexExpr>, rhs: impl Into<IndexExpr>) -> Self {
        Self::compare(CmpOp::Eq, lhs, rhs)
    }

    /// `lhs < rhs`.
    #[must_use]
    pub fn less(lhs: impl Into<IndexExpr>, rhs: impl Into<IndexExpr>) -> Self {
        Self::compare(CmpOp::Lt, lhs, rhs)
    }

    /// `lhs <= rhs`.
    #[must_use]
    pub fn less_eq(lhs: impl Into<IndexExpr>, rhs: impl Into<IndexExpr>) -> Self {
        Self::compare(CmpOp::Le, lhs, rhs)
    }

    /// `a && b`.
    #[must_use]
    pub fn and(a: Cond, b: Cond) -> Self {
        Self::And(Box::new(a), Box::new(b))
    }

    /// `a || b`.
    #[must_use]
    pub fn or(a: Cond, b: Cond) -> Self {
        Self::Or(Box::new(a), Box::new(b))
    }

    /// `!a`.
    #[must_use]
    pub fn negate(a: Cond) -> Self {
        Self::Not(Box::new(a))
    }
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Cmp(op, lhs, rhs) => write!(f, "{lhs} {} {rhs}", op.symbol()),
            Self::And(a, b) => write!(f, "({a} && {b})"),
            Self::Or(a, b) => write!(f, "({a} || {b})"),
            Self::Not(a) => write!(f, "!{a}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cond_display() {
        let c = Cond::and(
            Cond::equal(IndexExpr::lit(3), IndexExpr::lit(4)),
            Cond::negate(Cond::less(IndexExpr::lit(1), IndexExpr::lit(2))),
        );
        assert_eq!(c.to_string(), "(3 == 4 && !1 < 2)");
    }

    #[test]
    fn test_cmp_eval() {
        assert!(CmpOp::Le.eval(2, 2));
        assert!(!CmpOp::Gt.eval(2, 2));
        assert!(CmpOp::Ne.eval(1, 2));
    }

    #[test]
    fn test_swap() {
        for op in [CmpOp::Eq, CmpOp::Ne, CmpOp::Lt, CmpOp::Le, CmpOp::Gt, CmpOp::Ge] {
            for (a, b) in [(1, 2), (2, 2), (3, 2)] {
                assert_eq!(op.eval(a, b), op.swap().eval(b, a), "{op:?}");
            }
        }
    }
}
