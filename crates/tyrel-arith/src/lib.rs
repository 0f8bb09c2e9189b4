//! # Shape Algebra
//!
//! Symbolic integer arithmetic over tensor dimensions, used by the type
//! solver to decide whether two shapes agree.
//!
//! ## Overview
//!
//! - [`IndexExpr`]: a dimension expression (constant, size variable, `?`,
//!   or arithmetic over those)
//! - [`SizeVar`]: a named symbolic dimension
//! - [`Cond`]: a boolean condition over dimensions
//! - [`Analyzer`]: decides conditions, answering with a [`Verdict`]
//!
//! ## Conservative comparison
//!
//! Shape checking must never reject a program that could be correct, so the
//! analyzer only answers [`Verdict::False`] when it can prove the comparison
//! fails:
//!
//! ```
//! use tyrel_arith::{Analyzer, IndexExpr, SizeVar, Verdict};
//!
//! let n = IndexExpr::var(SizeVar::new(0, "n"));
//! let analyzer = Analyzer::new();
//!
//! assert_eq!(analyzer.compare_eq(&n, &n), Verdict::True);
//! assert_eq!(analyzer.compare_eq(&IndexExpr::lit(2), &IndexExpr::lit(3)), Verdict::False);
//! assert_eq!(analyzer.compare_eq(&n, &IndexExpr::lit(3)), Verdict::Unknown);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod analyzer;
mod canonical;
mod cond;
mod expr;

pub use analyzer::{Analyzer, Verdict};
pub use cond::{CmpOp, Cond};
pub use expr::{IndexExpr, SizeVar};
