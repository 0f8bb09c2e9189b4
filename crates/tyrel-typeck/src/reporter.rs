//! The channel through which relations talk to the solver.

use tyrel_arith::{Cond, IndexExpr};
use tyrel_diagnostics::Span;
use tyrel_types::{Module, Ty};

/// Handed to a relation's resolution function for the duration of one call.
///
/// A reporter is tied to one solver session; it cannot be stored or sent
/// elsewhere.
pub trait TypeReporter {
    /// Declares `dst` and `src` equal. `dst` is usually the type being
    /// resolved, but unification is symmetric.
    ///
    /// A failure is recorded by the solver and ends the session once the
    /// current resolution function returns.
    fn assign(&mut self, dst: &Ty, src: &Ty);

    /// Checks a shape condition.
    ///
    /// Returns `false` only if the condition is provably false. A condition
    /// that cannot be decided is kept as an obligation and `true` is returned.
    fn assert(&mut self, cond: &Cond) -> bool;

    /// Checks `lhs == rhs`; see [`TypeReporter::assert`].
    fn assert_eq(&mut self, lhs: &IndexExpr, rhs: &IndexExpr) -> bool {
        self.assert(&Cond::equal(lhs.clone(), rhs.clone()))
    }

    /// Sets the location attached to subsequent failures.
    fn set_location(&mut self, span: Span);

    /// The enclosing module.
    fn module(&self) -> &Module;
}
