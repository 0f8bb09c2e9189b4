//! Conservative decision procedure for shape conditions.
//!
//! The [`Analyzer`] answers "is `lhs op rhs` true?" with a three-valued
//! [`Verdict`]. It never claims more than it can show:
//!
//! 1. Both sides are normalised (see `canonical`) and subtracted. If the
//!    difference is a constant, the comparison is decided outright.
//! 2. Otherwise the difference is evaluated over intervals, using whatever
//!    ranges were registered with [`Analyzer::bind_range`]. An interval that
//!    lies entirely on one side of zero decides the comparison.
//! 3. Anything else is [`Verdict::Unknown`].
//!
//! The dynamic dimension `?` is `Unknown` against everything, itself included.
//!
//! [`Analyzer::deduce_bound`] runs the same interval evaluation the other
//! way: it solves a linear comparison for one variable.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::canonical::{Atom, Polynomial};
use crate::cond::{CmpOp, Cond};
use crate::expr::{IndexExpr, SizeVar};

/// Three-valued truth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Provably true.
    True,
    /// Provably false.
    False,
    /// Neither could be shown.
    Unknown,
}

impl Verdict {
    /// Returns true if the condition was proven.
    #[must_use]
    pub fn is_true(self) -> bool {
        self == Self::True
    }

    /// Returns true if the condition was refuted.
    #[must_use]
    pub fn is_false(self) -> bool {
        self == Self::False
    }

    /// Kleene conjunction.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::False, _) | (_, Self::False) => Self::False,
            (Self::True, Self::True) => Self::True,
            _ => Self::Unknown,
        }
    }

    /// Kleene disjunction.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::True, _) | (_, Self::True) => Self::True,
            (Self::False, Self::False) => Self::False,
            _ => Self::Unknown,
        }
    }

    /// Kleene negation.
    #[must_use]
    pub fn negate(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Unknown => Self::Unknown,
        }
    }
}

impl From<bool> for Verdict {
    fn from(b: bool) -> Self {
        if b {
            Self::True
        } else {
            Self::False
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// An inclusive integer interval; `None` bounds are infinite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Interval {
    lo: Option<i128>,
    hi: Option<i128>,
}

impl Interval {
    const UNBOUNDED: Self = Self { lo: None, hi: None };

    fn point(value: i128) -> Self {
        Self {
            lo: Some(value),
            hi: Some(value),
        }
    }

    fn as_point(self) -> Option<i128> {
        match (self.lo, self.hi) {
            (Some(lo), Some(hi)) if lo == hi => Some(lo),
            _ => None,
        }
    }

    fn add(self, other: Self) -> Self {
        Self {
            lo: self.lo.zip(other.lo).and_then(|(a, b)| a.checked_add(b)),
            hi: self.hi.zip(other.hi).and_then(|(a, b)| a.checked_add(b)),
        }
    }

    fn neg(self) -> Self {
        Self {
            lo: self.hi.and_then(i128::checked_neg),
            hi: self.lo.and_then(i128::checked_neg),
        }
    }

    fn scale(self, k: i128) -> Self {
        let lo = self.lo.and_then(|v| v.checked_mul(k));
        let hi = self.hi.and_then(|v| v.checked_mul(k));
        match k.cmp(&0) {
            std::cmp::Ordering::Greater => Self { lo, hi },
            std::cmp::Ordering::Less => Self { lo: hi, hi: lo },
            std::cmp::Ordering::Equal => Self::point(0),
        }
    }

    fn mul(self, other: Self) -> Self {
        if let Some(k) = other.as_point() {
            return self.scale(k);
        }
        if let Some(k) = self.as_point() {
            return other.scale(k);
        }
        match (self.lo, self.hi, other.lo, other.hi) {
            (Some(a), Some(b), Some(c), Some(d)) => {
                let products = [
                    a.checked_mul(c),
                    a.checked_mul(d),
                    b.checked_mul(c),
                    b.checked_mul(d),
                ];
                if products.iter().any(Option::is_none) {
                    return Self::UNBOUNDED;
                }
                let values = products.iter().flatten();
                Self {
                    lo: values.clone().min().copied(),
                    hi: values.max().copied(),
                }
            }
            // Both factors non-negative: the product is at least lo*lo.
            (Some(a), _, Some(c), _) if a >= 0 && c >= 0 => Self {
                lo: a.checked_mul(c),
                hi: None,
            },
            _ => Self::UNBOUNDED,
        }
    }

    fn min(self, other: Self) -> Self {
        Self {
            lo: self.lo.zip(other.lo).map(|(a, b)| a.min(b)),
            hi: match (self.hi, other.hi) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (Some(a), None) | (None, Some(a)) => Some(a),
                (None, None) => None,
            },
        }
    }

    fn max(self, other: Self) -> Self {
        self.neg().min(other.neg()).neg()
    }
}

/// Decides shape conditions, optionally using known variable ranges.
#[derive(Clone, Debug, Default)]
pub struct Analyzer {
    ranges: FxHashMap<SizeVar, (i64, i64)>,
}

impl Analyzer {
    /// Creates an analyzer with no range information.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `var` lies in the inclusive range `[min, max]`.
    ///
    /// A later call for the same variable intersects with the earlier range.
    pub fn bind_range(&mut self, var: SizeVar, min: i64, max: i64) {
        let range = match self.ranges.get(&var) {
            Some(&(lo, hi)) => (lo.max(min), hi.min(max)),
            None => (min, max),
        };
        self.ranges.insert(var, range);
    }

    /// Returns the range registered for `var`, if any.
    #[must_use]
    pub fn range_of(&self, var: &SizeVar) -> Option<(i64, i64)> {
        self.ranges.get(var).copied()
    }

    /// Rewrites `expr` into its normal form.
    ///
    /// Expressions that cannot be normalised are returned unchanged.
    #[must_use]
    pub fn simplify(&self, expr: &IndexExpr) -> IndexExpr {
        let Some(poly) = Polynomial::from_expr(expr) else {
            return expr.clone();
        };
        if let Some(value) = self
            .interval_of_poly(&poly)
            .as_point()
            .and_then(|v| i64::try_from(v).ok())
        {
            return IndexExpr::Const(value);
        }
        poly.to_expr()
    }

    /// Decides `lhs == rhs`.
    #[must_use]
    pub fn compare_eq(&self, lhs: &IndexExpr, rhs: &IndexExpr) -> Verdict {
        self.compare(CmpOp::Eq, lhs, rhs)
    }

    /// Decides `lhs op rhs`.
    #[must_use]
    pub fn compare(&self, op: CmpOp, lhs: &IndexExpr, rhs: &IndexExpr) -> Verdict {
        if lhs.contains_any() || rhs.contains_any() {
            return Verdict::Unknown;
        }
        let diff = match (Polynomial::from_expr(lhs), Polynomial::from_expr(rhs)) {
            (Some(a), Some(b)) => a.checked_sub(&b),
            _ => None,
        };
        let Some(diff) = diff else {
            return Verdict::Unknown;
        };
        if let Some(d) = diff.as_const() {
            return op.eval(d, 0).into();
        }
        decide(op, self.interval_of_poly(&diff))
    }

    /// Decides a condition with Kleene logic over its connectives.
    #[must_use]
    pub fn prove(&self, cond: &Cond) -> Verdict {
        match cond {
            Cond::Bool(b) => (*b).into(),
            Cond::Cmp(op, lhs, rhs) => self.compare(*op, lhs, rhs),
            Cond::And(a, b) => {
                let left = self.prove(a);
                if left.is_false() {
                    return Verdict::False;
                }
                left.and(self.prove(b))
            }
            Cond::Or(a, b) => {
                let left = self.prove(a);
                if left.is_true() {
                    return Verdict::True;
                }
                left.or(self.prove(b))
            }
            Cond::Not(a) => self.prove(a).negate(),
        }
    }

    /// Solves a comparison for `var`, returning the `(lower, upper)` bounds
    /// it places on `var`. A `None` bound is unbounded.
    ///
    /// `var` must occur only as `c·var` for a constant `c`. The other terms
    /// are evaluated over the registered ranges, and the bound returned is
    /// the one that makes `cond` hold for every value in those ranges:
    /// `2·x + 3 < n` with `n` in `[0, 10]` gives `x <= -2`. An equality
    /// needs the other side to be a single value divisible by `c`.
    ///
    /// Returns `None` when `var` cannot be isolated, does not occur, the
    /// comparison is `!=`, or the needed side of the range is unbounded.
    #[must_use]
    pub fn deduce_bound(&self, var: &SizeVar, cond: &Cond) -> Option<(Option<i64>, Option<i64>)> {
        let Cond::Cmp(op, lhs, rhs) = cond else {
            return None;
        };
        if lhs.contains_any() || rhs.contains_any() {
            return None;
        }
        let diff = Polynomial::from_expr(lhs)?.checked_sub(&Polynomial::from_expr(rhs)?)?;
        let (coeff, rest) = diff.split_linear(var)?;

        // coeff·var + rest op 0, rewritten as coeff·var op bound with coeff > 0.
        let (coeff, op, bound) = match coeff.cmp(&0) {
            std::cmp::Ordering::Greater => (coeff, *op, rest.checked_neg()?),
            std::cmp::Ordering::Less => (coeff.checked_neg()?, op.swap(), rest),
            std::cmp::Ordering::Equal => return None,
        };
        let coeff = i128::from(coeff);
        let bound = self.interval_of_poly(&bound);
        let to_i64 = |v: i128| i64::try_from(v).ok();

        match op {
            CmpOp::Eq => {
                let value = bound.as_point()?;
                if value % coeff != 0 {
                    return None;
                }
                let exact = to_i64(value / coeff)?;
                Some((Some(exact), Some(exact)))
            }
            CmpOp::Ne => None,
            CmpOp::Lt | CmpOp::Le => {
                let mut hi = bound.lo?;
                if op == CmpOp::Lt {
                    hi = hi.checked_sub(1)?;
                }
                Some((None, Some(to_i64(hi.div_euclid(coeff))?)))
            }
            CmpOp::Gt | CmpOp::Ge => {
                let mut lo = bound.hi?;
                if op == CmpOp::Gt {
                    lo = lo.checked_add(1)?;
                }
                let ceil = lo.checked_neg()?.div_euclid(coeff).checked_neg()?;
                Some((Some(to_i64(ceil)?), None))
            }
        }
    }

    fn interval_of_poly(&self, poly: &Polynomial) -> Interval {
        let mut total = Interval::point(0);
        for (monomial, coeff) in poly.terms() {
            let term = monomial
                .iter()
                .fold(Interval::point(1), |acc, atom| acc.mul(self.interval_of_atom(atom)));
            total = total.add(term.scale(i128::from(coeff)));
        }
        total
    }

    fn interval_of_atom(&self, atom: &Atom) -> Interval {
        match atom {
            Atom::Var(v) => self.interval_of_var(v),
            Atom::Opaque(e) => self.interval_of_expr(e),
        }
    }

    fn interval_of_var(&self, var: &SizeVar) -> Interval {
        match self.ranges.get(var) {
            Some(&(lo, hi)) => Interval {
                lo: Some(i128::from(lo)),
                hi: Some(i128::from(hi)),
            },
            None => Interval::UNBOUNDED,
        }
    }

    fn interval_of_expr(&self, expr: &IndexExpr) -> Interval {
        match expr {
            IndexExpr::Const(n) => Interval::point(i128::from(*n)),
            IndexExpr::Var(v) => self.interval_of_var(v),
            IndexExpr::Any => Interval::UNBOUNDED,
            IndexExpr::Add(a, b) => self.interval_of_expr(a).add(self.interval_of_expr(b)),
            IndexExpr::Sub(a, b) => self.interval_of_expr(a).add(self.interval_of_expr(b).neg()),
            IndexExpr::Mul(a, b) => self.interval_of_expr(a).mul(self.interval_of_expr(b)),
            IndexExpr::Min(a, b) => self.interval_of_expr(a).min(self.interval_of_expr(b)),
            IndexExpr::Max(a, b) => self.interval_of_expr(a).max(self.interval_of_expr(b)),
            IndexExpr::FloorDiv(a, b) => match b.as_const() {
                Some(d) if d > 0 => {
                    let d = i128::from(d);
                    let a = self.interval_of_expr(a);
                    Interval {
                        lo: a.lo.map(|v| v.div_euclid(d)),
                        hi: a.hi.map(|v| v.div_euclid(d)),
                    }
                }
                _ => Interval::UNBOUNDED,
            },
            IndexExpr::FloorMod(_, b) => match b.as_const() {
                Some(d) if d > 0 => Interval {
                    lo: Some(0),
                    hi: Some(i128::from(d) - 1),
                },
                _ => Interval::UNBOUNDED,
            },
        }
    }
}

/// Decides `diff op 0` from an interval enclosing `diff`.
fn decide(op: CmpOp, diff: Interval) -> Verdict {
    let below = |k: i128| diff.hi.is_some_and(|hi| hi < k);
    let above = |k: i128| diff.lo.is_some_and(|lo| lo > k);
    match op {
        CmpOp::Eq => {
            if diff.as_point() == Some(0) {
                Verdict::True
            } else if below(0) || above(0) {
                Verdict::False
            } else {
                Verdict::Unknown
            }
        }
        CmpOp::Ne => decide(CmpOp::Eq, diff).negate(),
        CmpOp::Lt => {
            if below(0) {
                Verdict::True
            } else if above(-1) {
                Verdict::False
            } else {
                Verdict::Unknown
            }
        }
        CmpOp::Le => {
            if below(1) {
                Verdict::True
            } else if above(0) {
                Verdict::False
            } else {
                Verdict::Unknown
            }
        }
        CmpOp::Gt => decide(CmpOp::Le, diff).negate(),
        CmpOp::Ge => decide(CmpOp::Lt, diff).negate(),
    }
}
