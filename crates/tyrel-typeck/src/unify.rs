//! Structural unification with occurs and kind checks.
//!
//! ## Algorithm
//!
//! 1. Resolve both types under the current substitution
//! 2. Two variables: merge their classes (kinds must agree)
//! 3. One variable: bind its class (occurs check first)
//! 4. Same constructor: unify the components pairwise
//! 5. Otherwise: mismatch
//!
//! Tensor dimensions are compared with the shape analyzer rather than
//! syntactically. A dimension pair that can be neither proven equal nor
//! unequal becomes a deferred obligation, or a mismatch in strict mode.
//! The dynamic dimension `?` matches any dimension.

use tracing::trace;
use tyrel_arith::{Cond, IndexExpr, Verdict};
use tyrel_types::{IncompleteType, TensorType, Ty, TyKind};

use crate::error::TypeError;
use crate::solver::TypeSolver;

/// Unifies two types, updating the solver's substitution.
pub(crate) fn unify(solver: &mut TypeSolver<'_>, t1: &Ty, t2: &Ty) -> Result<(), TypeError> {
    let t1 = solver.resolve(t1);
    let t2 = solver.resolve(t2);
    unify_inner(solver, &t1, &t2)
}

fn unify_inner(solver: &mut TypeSolver<'_>, t1: &Ty, t2: &Ty) -> Result<(), TypeError> {
    if t1.ptr_eq(t2) {
        return Ok(());
    }
    match (t1.kind(), t2.kind()) {
        (TyKind::Incomplete(a), TyKind::Incomplete(b)) => union_vars(solver, *a, *b),

        (TyKind::Incomplete(v), _) => bind_var(solver, *v, t2),
        (_, TyKind::Incomplete(v)) => bind_var(solver, *v, t1),

        (TyKind::Tensor(a), TyKind::Tensor(b)) => unify_tensor(solver, t1, t2, a, b),

        (TyKind::Tuple(a), TyKind::Tuple(b)) => {
            if a.fields.len() != b.fields.len() {
                return Err(mismatch(
                    solver,
                    t1,
                    t2,
                    format!("tuple arity {} vs {}", a.fields.len(), b.fields.len()),
                ));
            }
            unify_all(solver, &a.fields, &b.fields)
        }

        (TyKind::Ref(a), TyKind::Ref(b)) => unify(solver, &a.value, &b.value),

        (TyKind::Call(a), TyKind::Call(b)) => {
            if a.args.len() != b.args.len() {
                return Err(mismatch(
                    solver,
                    t1,
                    t2,
                    format!("{} vs {} type arguments", a.args.len(), b.args.len()),
                ));
            }
            unify(solver, &a.func, &b.func)?;
            unify_all(solver, &a.args, &b.args)
        }

        (TyKind::Func(a), TyKind::Func(b)) => {
            if a.arg_types.len() != b.arg_types.len() {
                return Err(mismatch(
                    solver,
                    t1,
                    t2,
                    format!("{} vs {} parameters", a.arg_types.len(), b.arg_types.len()),
                ));
            }
            if a.type_params != b.type_params {
                return Err(mismatch(solver, t1, t2, "type parameters differ".to_string()));
            }
            unify_all(solver, &a.arg_types, &b.arg_types)?;
            unify(solver, &a.ret_type, &b.ret_type)
        }

        (TyKind::Var(a), TyKind::Var(b)) if a.id == b.id => Ok(()),

        (TyKind::GlobalVar(a), TyKind::GlobalVar(b)) if a == b => Ok(()),

        _ => Err(TypeError::Mismatch {
            expected: t1.clone(),
            found: t2.clone(),
            detail: None,
            span: solver.location,
        }),
    }
}

/// Unifies pairwise, re-resolving each pair since earlier pairs may bind.
fn unify_all(solver: &mut TypeSolver<'_>, xs: &[Ty], ys: &[Ty]) -> Result<(), TypeError> {
    for (x, y) in xs.iter().zip(ys) {
        unify(solver, x, y)?;
    }
    Ok(())
}

fn mismatch(solver: &TypeSolver<'_>, t1: &Ty, t2: &Ty, detail: String) -> TypeError {
    TypeError::Mismatch {
        expected: t1.clone(),
        found: t2.clone(),
        detail: Some(detail),
        span: solver.location,
    }
}

fn union_vars(
    solver: &mut TypeSolver<'_>,
    a: IncompleteType,
    b: IncompleteType,
) -> Result<(), TypeError> {
    let sa = solver.classes.ensure(a);
    let sb = solver.classes.ensure(b);
    let (ra, rb) = (solver.classes.find(sa), solver.classes.find(sb));
    if ra == rb {
        return Ok(());
    }
    let (ka, kb) = (solver.classes.kind(ra), solver.classes.kind(rb));
    if ka != kb {
        return Err(TypeError::KindMismatch {
            expected: ka,
            found: kb,
            span: solver.location,
        });
    }
    let root = solver.classes.union(ra, rb);
    trace!(a = a.id, b = b.id, "merged variables");
    solver.wake(root);
    Ok(())
}

fn bind_var(solver: &mut TypeSolver<'_>, var: IncompleteType, ty: &Ty) -> Result<(), TypeError> {
    let slot = solver.classes.ensure(var);
    let root = solver.classes.find(slot);

    let inner = ty.incomplete_vars();
    let mut inner_roots = Vec::with_capacity(inner.len());
    for v in inner {
        let s = solver.classes.ensure(v);
        let r = solver.classes.find(s);
        if r == root {
            return Err(TypeError::OccursCheck {
                var,
                ty: ty.clone(),
                span: solver.location,
            });
        }
        inner_roots.push(r);
    }

    // Relations waiting on `var` now also wait on the variables inside `ty`.
    let users = solver.classes.users(root).to_vec();
    for r in inner_roots {
        for &user in &users {
            solver.classes.add_user(r, user);
        }
    }

    trace!(var = var.id, ty = %ty, "bound variable");
    solver.classes.bind(root, ty.clone());
    solver.wake(root);
    Ok(())
}

fn unify_tensor(
    solver: &mut TypeSolver<'_>,
    t1: &Ty,
    t2: &Ty,
    a: &TensorType,
    b: &TensorType,
) -> Result<(), TypeError> {
    if a.dtype != b.dtype {
        return Err(mismatch(
            solver,
            t1,
            t2,
            format!("element type `{}` vs `{}`", a.dtype, b.dtype),
        ));
    }
    if a.rank() != b.rank() {
        return Err(mismatch(
            solver,
            t1,
            t2,
            format!("rank {} vs {}", a.rank(), b.rank()),
        ));
    }
    for (axis, (d1, d2)) in a.shape.iter().zip(&b.shape).enumerate() {
        if matches!(d1, IndexExpr::Any) || matches!(d2, IndexExpr::Any) {
            continue;
        }
        match solver.analyzer.compare_eq(d1, d2) {
            Verdict::True => {}
            Verdict::Unknown if !solver.strict_shapes() => {
                trace!(axis, lhs = %d1, rhs = %d2, "deferred dimension equality");
                solver.deferred.insert(Cond::equal(d1.clone(), d2.clone()));
            }
            Verdict::Unknown | Verdict::False => {
                return Err(TypeError::DimensionMismatch {
                    axis,
                    expected: d1.clone(),
                    found: d2.clone(),
                    span: solver.location,
                });
            }
        }
    }
    Ok(())
}
