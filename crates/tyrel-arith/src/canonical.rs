//! Polynomial normal form for dimension expressions.
//!
//! Two dimension expressions are compared by normalising their difference.
//! The normal form is a sum of integer-weighted monomials, where each
//! monomial is a sorted product of atoms:
//!
//! ```text
//! (n + 1) * 2 - n      =>   1·n + 2
//! (4 * n) // 4         =>   1·n
//! max(n, n + 1)        =>   1·n + 1
//! ```
//!
//! Atoms are size variables or *opaque* nodes: a `//`, `%`, `min` or `max`
//! that could not be eliminated, stored with simplified operands so that
//! syntactically different but equal operands still meet.
//!
//! Normalisation is partial. It returns `None` when the dynamic dimension
//! `?` occurs, or when a coefficient would overflow; callers treat that as
//! "unknown".

use std::collections::BTreeMap;

use crate::expr::{checked_floor_div, checked_floor_mod, IndexExpr, SizeVar};

/// An indivisible factor of a monomial.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Atom {
    Var(SizeVar),
    Opaque(IndexExpr),
}

impl Atom {
    fn to_expr(&self) -> IndexExpr {
        match self {
            Self::Var(v) => IndexExpr::Var(v.clone()),
            Self::Opaque(e) => e.clone(),
        }
    }

    fn mentions(&self, var: &SizeVar) -> bool {
        match self {
            Self::Var(v) => v == var,
            Self::Opaque(e) => e.free_vars().contains(var),
        }
    }
}

/// A sorted product of atoms; the empty monomial is the constant `1`.
pub(crate) type Monomial = Vec<Atom>;

/// Sum of `coefficient · monomial` terms with no zero coefficients.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Polynomial {
    terms: BTreeMap<Monomial, i64>,
}

impl Polynomial {
    pub(crate) fn constant(value: i64) -> Self {
        let mut terms = BTreeMap::new();
        if value != 0 {
            terms.insert(Vec::new(), value);
        }
        Self { terms }
    }

    fn atom(atom: Atom) -> Self {
        let mut terms = BTreeMap::new();
        terms.insert(vec![atom], 1);
        Self { terms }
    }

    /// The constant value, if the polynomial has no symbolic terms.
    pub(crate) fn as_const(&self) -> Option<i64> {
        match self.terms.len() {
            0 => Some(0),
            1 => self.terms.get(&Vec::new()).copied(),
            _ => None,
        }
    }

    pub(crate) fn terms(&self) -> impl Iterator<Item = (&Monomial, i64)> {
        self.terms.iter().map(|(m, c)| (m, *c))
    }

    fn insert_term(&mut self, monomial: Monomial, coeff: i64) -> Option<()> {
        let entry = self.terms.entry(monomial).or_insert(0);
        *entry = entry.checked_add(coeff)?;
        self.terms.retain(|_, c| *c != 0);
        Some(())
    }

    pub(crate) fn checked_add(&self, other: &Self) -> Option<Self> {
        let mut result = self.clone();
        for (m, c) in &other.terms {
            result.insert_term(m.clone(), *c)?;
        }
        Some(result)
    }

    pub(crate) fn checked_neg(&self) -> Option<Self> {
        let mut terms = BTreeMap::new();
        for (m, c) in &self.terms {
            terms.insert(m.clone(), c.checked_neg()?);
        }
        Some(Self { terms })
    }

    pub(crate) fn checked_sub(&self, other: &Self) -> Option<Self> {
        self.checked_add(&other.checked_neg()?)
    }

    pub(crate) fn checked_mul(&self, other: &Self) -> Option<Self> {
        let mut result = Self::default();
        for (m1, c1) in &self.terms {
            for (m2, c2) in &other.terms {
                let mut monomial: Monomial = m1.iter().chain(m2.iter()).cloned().collect();
                monomial.sort();
                result.insert_term(monomial, c1.checked_mul(*c2)?)?;
            }
        }
        Some(result)
    }

    /// Splits the polynomial into `coeff·var + rest`, with `var` absent from `rest`.
    ///
    /// Returns `None` if `var` occurs in any term that is not `c·var`.
    pub(crate) fn split_linear(&self, var: &SizeVar) -> Option<(i64, Self)> {
        let mut coeff = 0;
        let mut rest = Self::default();
        for (monomial, c) in &self.terms {
            if !monomial.iter().any(|atom| atom.mentions(var)) {
                rest.terms.insert(monomial.clone(), *c);
            } else if matches!(monomial.as_slice(), [Atom::Var(v)] if v == var) {
                coeff = *c;
            } else {
                return None;
            }
        }
        Some((coeff, rest))
    }

    /// Divides every coefficient by `divisor` if all of them are multiples of it.
    fn exact_div(&self, divisor: i64) -> Option<Self> {
        if divisor == 0 {
            return None;
        }
        let mut terms = BTreeMap::new();
        for (m, c) in &self.terms {
            if c % divisor != 0 {
                return None;
            }
            terms.insert(m.clone(), c / divisor);
        }
        Some(Self { terms })
    }

    /// Converts a dimension expression into normal form.
    pub(crate) fn from_expr(expr: &IndexExpr) -> Option<Self> {
        match expr {
            IndexExpr::Const(n) => Some(Self::constant(*n)),
            IndexExpr::Var(v) => Some(Self::atom(Atom::Var(v.clone()))),
            IndexExpr::Any => None,
            IndexExpr::Add(a, b) => Self::from_expr(a)?.checked_add(&Self::from_expr(b)?),
            IndexExpr::Sub(a, b) => Self::from_expr(a)?.checked_sub(&Self::from_expr(b)?),
            IndexExpr::Mul(a, b) => Self::from_expr(a)?.checked_mul(&Self::from_expr(b)?),
            IndexExpr::FloorDiv(a, b) => {
                let (pa, pb) = (Self::from_expr(a)?, Self::from_expr(b)?);
                match (pa.as_const(), pb.as_const()) {
                    (Some(x), Some(y)) => {
                        if let Some(q) = checked_floor_div(x, y) {
                            return Some(Self::constant(q));
                        }
                    }
                    (_, Some(y)) if y > 0 => {
                        if let Some(q) = pa.exact_div(y) {
                            return Some(q);
                        }
                    }
                    _ => {}
                }
                Some(Self::opaque(IndexExpr::floor_div(pa.to_expr(), pb.to_expr())))
            }
            IndexExpr::FloorMod(a, b) => {
                let (pa, pb) = (Self::from_expr(a)?, Self::from_expr(b)?);
                match (pa.as_const(), pb.as_const()) {
                    (Some(x), Some(y)) => {
                        if let Some(r) = checked_floor_mod(x, y) {
                            return Some(Self::constant(r));
                        }
                    }
                    (_, Some(y)) if y > 0 && pa.exact_div(y).is_some() => {
                        return Some(Self::constant(0));
                    }
                    _ => {}
                }
                Some(Self::opaque(IndexExpr::floor_mod(pa.to_expr(), pb.to_expr())))
            }
            IndexExpr::Min(a, b) | IndexExpr::Max(a, b) => {
                let (pa, pb) = (Self::from_expr(a)?, Self::from_expr(b)?);
                let is_min = matches!(expr, IndexExpr::Min(_, _));
                // A constant difference decides which operand wins.
                if let Some(d) = pa.checked_sub(&pb).and_then(|d| d.as_const()) {
                    let pick_a = if is_min { d <= 0 } else { d >= 0 };
                    return Some(if pick_a { pa } else { pb });
                }
                let (ea, eb) = (pa.to_expr(), pb.to_expr());
                let (lo, hi) = if ea <= eb { (ea, eb) } else { (eb, ea) };
                let node = if is_min {
                    IndexExpr::min(lo, hi)
                } else {
                    IndexExpr::max(lo, hi)
                };
                Some(Self::opaque(node))
            }
        }
    }

    fn opaque(expr: IndexExpr) -> Self {
        match expr {
            IndexExpr::Const(n) => Self::constant(n),
            IndexExpr::Var(v) => Self::atom(Atom::Var(v)),
            other => Self::atom(Atom::Opaque(other)),
        }
    }

    /// Rebuilds a deterministic expression from the normal form.
    pub(crate) fn to_expr(&self) -> IndexExpr {
        let mut result: Option<IndexExpr> = None;
        let mut constant = 0;
        for (monomial, coeff) in &self.terms {
            if monomial.is_empty() {
                constant = *coeff;
                continue;
            }
            let product = monomial
                .iter()
                .map(Atom::to_expr)
                .reduce(IndexExpr::mul)
                .unwrap_or(IndexExpr::Const(1));
            let magnitude = coeff.unsigned_abs();
            let term = match i64::try_from(magnitude) {
                Ok(1) => product,
                Ok(m) => IndexExpr::mul(product, IndexExpr::Const(m)),
                Err(_) => IndexExpr::mul(product, IndexExpr::Const(*coeff)),
            };
            result = Some(match (result, *coeff < 0 && magnitude <= i64::MAX as u64) {
                (None, false) => term,
                (None, true) => IndexExpr::sub(IndexExpr::Const(0), term),
                (Some(acc), false) => IndexExpr::add(acc, term),
                (Some(acc), true) => IndexExpr::sub(acc, term),
            });
        }
        match result {
            None => IndexExpr::Const(constant),
            Some(acc) if constant < 0 => match constant.checked_neg() {
                Some(c) => IndexExpr::sub(acc, IndexExpr::Const(c)),
                None => IndexExpr::add(acc, IndexExpr::Const(constant)),
            },
            Some(acc) => IndexExpr::add(acc, IndexExpr::Const(constant)),
        }
    }
}
