//! The relation solver.
//!
//! A [`TypeSolver`] is one typing session over one program unit. Relations
//! and variables are added, then [`TypeSolver::solve`] runs every relation to
//! a fixpoint and returns either a [`Solution`] or the errors that stopped it.
//!
//! ## Algorithm
//!
//! 1. Every relation goes on a FIFO worklist, in insertion order.
//! 2. A relation is popped, its arguments are resolved under the current
//!    substitution, and its resolution function runs with a reporter bound
//!    to this session.
//! 3. `assign` unifies immediately. Whenever a variable class is bound or
//!    merged, every unresolved relation that mentions the class is queued
//!    again (at most once).
//! 4. A relation that returns `true` is retired. One that returns `false`
//!    waits until one of its variables changes.
//! 5. The first failing `assign` or `assert` ends the session.
//!
//! When the worklist is empty, leftover relations are stuck and leftover
//! variables are unresolved; both are errors.
//!
//! ## Termination
//!
//! A relation that keeps changing its own arguments could loop forever, so
//! the number of invocations is capped at
//! `max_invocations_factor * (relations + 1)`.

use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::{debug, instrument, trace, warn};
use tyrel_arith::{Analyzer, Cond, Verdict};
use tyrel_diagnostics::Span;
use tyrel_types::{IncompleteType, Kind, Module, Ty};

use crate::config::SolverConfig;
use crate::error::TypeError;
use crate::relation::TypeRelation;
use crate::reporter::TypeReporter;
use crate::union_find::VarClasses;
use crate::unify;

/// The result of a successful session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Solution {
    bindings: IndexMap<u32, Ty>,
    deferred: Vec<Cond>,
}

impl Solution {
    /// The type a variable resolved to.
    #[must_use]
    pub fn get(&self, id: u32) -> Option<&Ty> {
        self.bindings.get(&id)
    }

    /// Substitutes every resolved variable in `ty`.
    #[must_use]
    pub fn apply(&self, ty: &Ty) -> Ty {
        ty.replace_incomplete(&mut |v: IncompleteType| self.bindings.get(&v.id).cloned())
    }

    /// All bindings, ordered by variable id.
    #[must_use]
    pub fn bindings(&self) -> &IndexMap<u32, Ty> {
        &self.bindings
    }

    /// Shape conditions that could be neither proven nor refuted, sorted.
    ///
    /// They hold if the program is well typed; checking them is left to
    /// whoever knows the runtime shapes.
    #[must_use]
    pub fn deferred(&self) -> &[Cond] {
        &self.deferred
    }
}

#[derive(Clone, Debug)]
struct Entry {
    relation: TypeRelation,
    resolved: bool,
    queued: bool,
}

/// One typing session.
pub struct TypeSolver<'m> {
    module: &'m Module,
    config: SolverConfig,
    pub(crate) analyzer: Analyzer,
    pub(crate) classes: VarClasses,
    entries: Vec<Entry>,
    queue: VecDeque<usize>,
    next_var: u32,
    pub(crate) deferred: IndexSet<Cond>,
    pub(crate) location: Span,
    failure: Option<TypeError>,
}

impl<'m> TypeSolver<'m> {
    /// Creates a session with the default configuration.
    #[must_use]
    pub fn new(module: &'m Module) -> Self {
        Self::with_config(module, SolverConfig::default())
    }

    /// Creates a session with `config`.
    ///
    /// A configuration that fails [`SolverConfig::validate`] is not rejected:
    /// a zero invocation factor is raised to 1 so the session can still run.
    #[must_use]
    pub fn with_config(module: &'m Module, mut config: SolverConfig) -> Self {
        if let Err(err) = config.validate() {
            warn!(error = %err, "invalid solver configuration, using an invocation factor of 1");
            config.max_invocations_factor = 1;
        }
        Self {
            module,
            config,
            analyzer: Analyzer::new(),
            classes: VarClasses::new(),
            entries: Vec::new(),
            queue: VecDeque::new(),
            next_var: 0,
            deferred: IndexSet::new(),
            location: Span::DUMMY,
            failure: None,
        }
    }

    /// The session's configuration.
    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// The shape analyzer, e.g. to register variable ranges before solving.
    pub fn analyzer_mut(&mut self) -> &mut Analyzer {
        &mut self.analyzer
    }

    /// Mints a fresh variable that does not clash with any seen so far.
    pub fn fresh_var(&mut self, kind: Kind) -> Ty {
        let var = IncompleteType {
            id: self.next_var,
            kind,
        };
        self.register(var);
        Ty::incomplete(var.id, kind)
    }

    fn register(&mut self, var: IncompleteType) -> usize {
        self.next_var = self.next_var.max(var.id.saturating_add(1));
        self.classes.ensure(var)
    }

    /// Adds a relation; it is scheduled after every relation added before it.
    pub fn add_relation(&mut self, relation: TypeRelation) {
        let idx = self.entries.len();
        for arg in relation.args() {
            for var in arg.incomplete_vars() {
                let slot = self.register(var);
                let root = self.classes.find(slot);
                self.classes.add_user(root, idx);
            }
        }
        trace!(relation = %relation, "added relation");
        self.entries.push(Entry {
            relation,
            resolved: false,
            queued: true,
        });
        self.queue.push_back(idx);
    }

    /// Number of relations added.
    #[must_use]
    pub fn num_relations(&self) -> usize {
        self.entries.len()
    }

    /// Substitutes everything known so far into `ty`.
    ///
    /// Unbound variables are replaced by their class representative, so two
    /// unified variables resolve to the same type.
    pub fn resolve(&mut self, ty: &Ty) -> Ty {
        ty.replace_incomplete(&mut |v: IncompleteType| {
            let slot = self.classes.slot_of(v.id)?;
            let root = self.classes.find(slot);
            match self.classes.binding(root).cloned() {
                Some(bound) => Some(self.resolve(&bound)),
                None => {
                    let rep = self.classes.representative(root);
                    (rep.id != v.id).then(|| Ty::incomplete(rep.id, rep.kind))
                }
            }
        })
    }

    /// Runs every relation to a fixpoint.
    ///
    /// # Errors
    ///
    /// Returns the first assertion or unification failure on its own, one
    /// [`TypeError::StuckRelation`] per relation left unresolved, or a
    /// single [`TypeError::Unresolved`] naming every variable left without
    /// a type.
    #[instrument(skip_all, fields(relations = self.entries.len(), vars = self.classes.len()))]
    pub fn solve(mut self) -> Result<Solution, Vec<TypeError>> {
        let budget = self.config.invocation_budget(self.entries.len());
        let mut invocations = 0usize;

        while let Some(idx) = self.queue.pop_front() {
            self.entries[idx].queued = false;
            if self.entries[idx].resolved {
                continue;
            }
            if invocations >= budget {
                warn!(budget, "relation solving did not converge");
                return Err(self.stuck_errors(true));
            }
            invocations += 1;

            let relation = self.entries[idx].relation.clone();
            let args: Vec<Ty> = relation.args().iter().map(|a| self.resolve(a)).collect();
            self.location = relation.span();

            let resolved = relation.func().call(
                &args,
                relation.num_inputs(),
                relation.attrs(),
                &mut SolverReporter { solver: &mut self },
            );

            if let Some(err) = self.failure.take() {
                debug!(relation = relation.func().name(), error = %err, "relation failed");
                return Err(vec![err]);
            }
            debug!(relation = relation.func().name(), resolved, "invoked relation");
            if resolved {
                self.entries[idx].resolved = true;
            }
        }

        let stuck = self.stuck_errors(false);
        if !stuck.is_empty() {
            return Err(stuck);
        }
        self.finish()
    }

    fn stuck_errors(&mut self, diverged: bool) -> Vec<TypeError> {
        let pending: Vec<TypeRelation> = self
            .entries
            .iter()
            .filter(|e| !e.resolved)
            .map(|e| e.relation.clone())
            .collect();
        pending
            .into_iter()
            .map(|relation| TypeError::StuckRelation {
                name: relation.func().name().to_string(),
                args: relation.args().iter().map(|a| self.resolve(a)).collect(),
                diverged,
                span: relation.span(),
            })
            .collect()
    }

    fn finish(mut self) -> Result<Solution, Vec<TypeError>> {
        let mut vars: Vec<IncompleteType> = self.classes.vars().collect();
        vars.sort_by_key(|v| v.id);

        let mut bindings = IndexMap::new();
        let mut unresolved: Vec<IncompleteType> = Vec::new();
        for var in vars {
            let ty = self.resolve(&Ty::incomplete(var.id, var.kind));
            for leftover in ty.incomplete_vars() {
                if !unresolved.iter().any(|u| u.id == leftover.id) {
                    unresolved.push(leftover);
                }
            }
            if ty.is_complete() {
                bindings.insert(var.id, ty);
            }
        }

        if !unresolved.is_empty() {
            unresolved.sort_by_key(|v| v.id);
            return Err(vec![TypeError::Unresolved { vars: unresolved }]);
        }

        let mut deferred: Vec<Cond> = self.deferred.into_iter().collect();
        deferred.sort();
        debug!(
            bindings = bindings.len(),
            deferred = deferred.len(),
            "solved all relations"
        );
        Ok(Solution { bindings, deferred })
    }

    /// Queues every unresolved relation that mentions the class at `root`.
    pub(crate) fn wake(&mut self, root: usize) {
        for &user in self.classes.users(root) {
            let entry = &mut self.entries[user];
            if !entry.resolved && !entry.queued {
                entry.queued = true;
                self.queue.push_back(user);
            }
        }
    }

    pub(crate) fn strict_shapes(&self) -> bool {
        self.config.strict_shapes
    }

    fn fail(&mut self, err: TypeError) {
        if self.failure.is_none() {
            self.failure = Some(err);
        }
    }
}

/// The reporter handed to resolution functions.
struct SolverReporter<'a, 'm> {
    solver: &'a mut TypeSolver<'m>,
}

impl TypeReporter for SolverReporter<'_, '_> {
    fn assign(&mut self, dst: &Ty, src: &Ty) {
        if self.solver.failure.is_some() {
            return;
        }
        if let Err(err) = unify::unify(self.solver, dst, src) {
            self.solver.fail(err);
        }
    }

    fn assert(&mut self, cond: &Cond) -> bool {
        if self.solver.failure.is_some() {
            return false;
        }
        match self.solver.analyzer.prove(cond) {
            Verdict::True => true,
            Verdict::Unknown => {
                trace!(cond = %cond, "deferred shape obligation");
                self.solver.deferred.insert(cond.clone());
                true
            }
            Verdict::False => {
                let span = self.solver.location;
                self.solver.fail(TypeError::AssertionFailed {
                    cond: cond.clone(),
                    span,
                });
                false
            }
        }
    }

    fn set_location(&mut self, span: Span) {
        self.solver.location = span;
    }

    fn module(&self) -> &Module {
        self.solver.module
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::Attrs;
    use crate::relation::TypeRelationFn;
    use tyrel_arith::IndexExpr;
    use tyrel_types::{DataType, TensorType};

    fn relation(func: TypeRelationFn, args: Vec<Ty>, num_inputs: usize) -> TypeRelation {
        TypeRelation::new(func, args, num_inputs, Attrs::new(), Span::from_raw(1, 2)).unwrap()
    }

    fn copy() -> TypeRelationFn {
        TypeRelationFn::new("copy", |args, _, _, reporter| {
            reporter.assign(&args[1], &args[0]);
            true
        })
    }

    #[test]
    fn test_fresh_vars_skip_foreign_ids() {
        let module = Module::new();
        let mut solver = TypeSolver::new(&module);
        solver.add_relation(relation(
            copy(),
            vec![Ty::incomplete(10, Kind::Type), Ty::unit()],
            1,
        ));
        let v = solver.fresh_var(Kind::Type);
        assert_eq!(v.as_incomplete().map(|v| v.id), Some(11));
    }

    #[test]
    fn test_chain_resolves_through_queue() {
        let module = Module::new();
        let mut solver = TypeSolver::new(&module);
        let a = solver.fresh_var(Kind::Type);
        let b = solver.fresh_var(Kind::Type);
        let t = Ty::tensor(TensorType::from_dims(&[3], DataType::FLOAT32));

        // b := a is added before a := t, so it runs while a is unknown.
        solver.add_relation(relation(copy(), vec![a.clone(), b.clone()], 1));
        solver.add_relation(relation(copy(), vec![t.clone(), a.clone()], 1));

        let solution = solver.solve().unwrap();
        assert_eq!(solution.apply(&b), t);
        assert_eq!(solution.apply(&a), t);
    }

    #[test]
    fn test_deferred_relation_waits_for_input() {
        let module = Module::new();
        let mut solver = TypeSolver::new(&module);
        let a = solver.fresh_var(Kind::Type);
        let b = solver.fresh_var(Kind::Type);

        let wait = TypeRelationFn::new("wait", |args, _, _, reporter| {
            if args[0].is_incomplete() {
                return false;
            }
            reporter.assign(&args[1], &args[0]);
            true
        });
        solver.add_relation(relation(wait, vec![a.clone(), b.clone()], 1));
        solver.add_relation(relation(copy(), vec![Ty::unit(), a], 1));

        let solution = solver.solve().unwrap();
        assert_eq!(solution.get(1), Some(&Ty::unit()));
    }

    #[test]
    fn test_unknown_assert_is_deferred() {
        let module = Module::new();
        let mut solver = TypeSolver::new(&module);
        let n = IndexExpr::var(tyrel_arith::SizeVar::new(0, "n"));
        let check = TypeRelationFn::new("check", move |_, _, _, reporter| {
            reporter.assert_eq(&n, &IndexExpr::lit(3))
        });
        solver.add_relation(relation(check, vec![Ty::unit()], 1));

        let solution = solver.solve().unwrap();
        assert_eq!(solution.deferred().len(), 1);
        assert_eq!(solution.deferred()[0].to_string(), "n == 3");
    }

    #[test]
    fn test_zero_factor_is_raised() {
        let module = Module::new();
        let config = SolverConfig {
            max_invocations_factor: 0,
            ..SolverConfig::default()
        };
        let mut solver = TypeSolver::with_config(&module, config);
        assert_eq!(solver.config().max_invocations_factor, 1);

        let a = solver.fresh_var(Kind::Type);
        let t = Ty::tensor(TensorType::from_dims(&[2], DataType::INT32));
        solver.add_relation(relation(copy(), vec![t.clone(), a.clone()], 1));

        let solution = solver.solve().unwrap();
        assert_eq!(solution.apply(&a), t);
    }

    #[test]
    fn test_divergence_guard() {
        let module = Module::new();
        let config = SolverConfig {
            max_invocations_factor: 4,
            ..SolverConfig::default()
        };
        let mut solver = TypeSolver::with_config(&module, config);
        let a = solver.fresh_var(Kind::Type);

        // Nests its argument one tuple deeper on every call.
        let grow = TypeRelationFn::new("grow", |args, _, _, reporter| {
            if let Some(leaf) = args[0].incomplete_vars().first() {
                let deeper = Ty::tuple(vec![Ty::incomplete(leaf.id + 1, Kind::Type)]);
                reporter.assign(&Ty::incomplete(leaf.id, leaf.kind), &deeper);
            }
            false
        });
        solver.add_relation(relation(grow, vec![a], 1));

        let errors = solver.solve().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            TypeError::StuckRelation { diverged: true, .. }
        ));
    }
}
