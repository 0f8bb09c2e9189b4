//! Built-in type relations.
//!
//! Each function here returns a [`TypeRelationFn`] for a family of
//! operators. All of them follow the same conventions:
//!
//! - an input that is still a placeholder defers the relation (`false`);
//! - an input of the wrong sort (a tuple where a tensor is expected, a
//!   missing attribute) also defers, so the operator ends up reported as a
//!   stuck relation rather than crashing the session;
//! - shape facts are checked with `assert`/`assert_eq`, element types and
//!   ranks by assigning, which reports a structural mismatch.

use tyrel_arith::{Cond, IndexExpr};
use tyrel_types::{TensorType, Ty, TyKind};

use crate::relation::TypeRelationFn;
use crate::reporter::TypeReporter;

fn lit(n: usize) -> IndexExpr {
    IndexExpr::lit(i64::try_from(n).unwrap_or(i64::MAX))
}

/// All `tys` as tensors, or `None` if any of them is something else.
fn as_tensors(tys: &[Ty]) -> Option<Vec<&TensorType>> {
    tys.iter().map(Ty::as_tensor).collect()
}

/// Reports that `ty` (a tensor) should have element type `expected.dtype`.
fn report_dtype(reporter: &mut dyn TypeReporter, ty: &Ty, shape_of: &TensorType, expected: &TensorType) {
    let want = Ty::tensor(TensorType {
        shape: shape_of.shape.clone(),
        dtype: expected.dtype,
    });
    reporter.assign(&want, ty);
}

/// `out = in`.
#[must_use]
pub fn identity() -> TypeRelationFn {
    TypeRelationFn::new("identity", |args, num_inputs, _, reporter| {
        if num_inputs != 1 || args.len() != 2 {
            return false;
        }
        reporter.assign(&args[1], &args[0]);
        true
    })
}

/// Elementwise operators: every input has the type of the first, and so does
/// the output.
///
/// Dimensions are compared with `assert_eq`, so `[3]` against `[4]` is an
/// assertion failure while `[n]` against `[3]` is a deferred obligation.
#[must_use]
pub fn elemwise() -> TypeRelationFn {
    TypeRelationFn::new("elemwise", |args, num_inputs, _, reporter| {
        if num_inputs == 0 || args.len() != num_inputs + 1 {
            return false;
        }
        let inputs = &args[..num_inputs];
        let Some(tensors) = as_tensors(inputs) else {
            return false;
        };
        let first = tensors[0];
        for (ty, t) in inputs.iter().zip(&tensors).skip(1) {
            if t.dtype != first.dtype || t.rank() != first.rank() {
                reporter.assign(&inputs[0], ty);
                return false;
            }
            for (d0, d) in first.shape.iter().zip(&t.shape) {
                if !reporter.assert_eq(d0, d) {
                    return false;
                }
            }
        }
        reporter.assign(&args[num_inputs], &inputs[0]);
        true
    })
}

/// Numpy-style broadcasting of two tensors.
///
/// Shapes are aligned on the right and padded with `1`. A `1` on either
/// side takes the other side's dimension, `?` takes the other side's
/// dimension, anything else must be equal.
#[must_use]
pub fn broadcast() -> TypeRelationFn {
    TypeRelationFn::new("broadcast", |args, num_inputs, _, reporter| {
        if num_inputs != 2 || args.len() != 3 {
            return false;
        }
        let Some(tensors) = as_tensors(&args[..2]) else {
            return false;
        };
        let (t0, t1) = (tensors[0], tensors[1]);
        if t0.dtype != t1.dtype {
            report_dtype(reporter, &args[1], t1, t0);
            return false;
        }

        let rank = t0.rank().max(t1.rank());
        let one = IndexExpr::lit(1);
        let dim = |t: &TensorType, i: usize| -> IndexExpr {
            let pad = rank - t.rank();
            if i < pad {
                IndexExpr::lit(1)
            } else {
                t.shape[i - pad].clone()
            }
        };

        let mut shape = Vec::with_capacity(rank);
        for i in 0..rank {
            let (d0, d1) = (dim(t0, i), dim(t1, i));
            let out = if d0 == one || matches!(d0, IndexExpr::Any) {
                d1
            } else if d1 == one || matches!(d1, IndexExpr::Any) {
                d0
            } else if reporter.assert_eq(&d0, &d1) {
                d0
            } else {
                return false;
            };
            shape.push(out);
        }
        reporter.assign(&args[2], &Ty::tensor(TensorType::new(shape, t0.dtype)));
        true
    })
}

/// Matrix product of `[m, k]` and `[k, n]` into `[m, n]`.
#[must_use]
pub fn matmul() -> TypeRelationFn {
    TypeRelationFn::new("matmul", |args, num_inputs, _, reporter| {
        if num_inputs != 2 || args.len() != 3 {
            return false;
        }
        let Some(tensors) = as_tensors(&args[..2]) else {
            return false;
        };
        let (a, b) = (tensors[0], tensors[1]);
        for t in [a, b] {
            if !reporter.assert(&Cond::equal(lit(t.rank()), IndexExpr::lit(2))) || t.rank() != 2 {
                return false;
            }
        }
        if a.dtype != b.dtype {
            report_dtype(reporter, &args[1], b, a);
            return false;
        }
        if !reporter.assert_eq(&a.shape[1], &b.shape[0]) {
            return false;
        }
        let out = TensorType::new([a.shape[0].clone(), b.shape[1].clone()], a.dtype);
        reporter.assign(&args[2], &Ty::tensor(out));
        true
    })
}

/// Reshape to the `newshape` attribute.
///
/// One entry of `newshape` may be `-1`, meaning "whatever is left"; every
/// other entry must be non-negative. The element count must be preserved,
/// so with a `-1` the product of the other entries must be positive and
/// divide the input's element count.
#[must_use]
pub fn reshape() -> TypeRelationFn {
    TypeRelationFn::new("reshape", |args, num_inputs, attrs, reporter| {
        if num_inputs != 1 || args.len() != 2 {
            return false;
        }
        let Some(input) = args[0].as_tensor() else {
            return false;
        };
        let Some(newshape) = attrs.get_exprs("newshape") else {
            return false;
        };

        let inferred: Vec<usize> = newshape
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_const_value(-1))
            .map(|(i, _)| i)
            .collect();
        if !reporter.assert(&Cond::less_eq(lit(inferred.len()), IndexExpr::lit(1))) {
            return false;
        }

        let mut shape = newshape;
        for dim in shape.iter().filter(|d| !d.is_const_value(-1)) {
            if !reporter.assert(&Cond::less_eq(IndexExpr::lit(0), dim.clone())) {
                return false;
            }
        }

        let size = input.size();
        if let Some(&pos) = inferred.first() {
            let known = IndexExpr::product(shape.iter().filter(|d| !d.is_const_value(-1)));
            if !reporter.assert(&Cond::less(IndexExpr::lit(0), known.clone())) {
                return false;
            }
            let remainder = IndexExpr::floor_mod(size.clone(), known.clone());
            if !reporter.assert_eq(&remainder, &IndexExpr::lit(0)) {
                return false;
            }
            shape[pos] = IndexExpr::floor_div(size, known);
        } else if !reporter.assert_eq(&size, &IndexExpr::product(&shape)) {
            return false;
        }

        reporter.assign(&args[1], &Ty::tensor(TensorType::new(shape, input.dtype)));
        true
    })
}

/// Projects field `index` out of a tuple.
#[must_use]
pub fn tuple_get() -> TypeRelationFn {
    TypeRelationFn::new("tuple_get", |args, num_inputs, attrs, reporter| {
        if num_inputs != 1 || args.len() != 2 {
            return false;
        }
        let Some(tuple) = args[0].as_tuple() else {
            return false;
        };
        let Some(index) = attrs.get_int("index") else {
            return false;
        };
        let in_range = Cond::and(
            Cond::less_eq(IndexExpr::lit(0), IndexExpr::lit(index)),
            Cond::less(IndexExpr::lit(index), lit(tuple.fields.len())),
        );
        if !reporter.assert(&in_range) {
            return false;
        }
        let Some(field) = usize::try_from(index).ok().and_then(|i| tuple.fields.get(i)) else {
            return false;
        };
        reporter.assign(&args[1], field);
        true
    })
}

/// Packs the inputs into a tuple. Inputs need not be known.
#[must_use]
pub fn make_tuple() -> TypeRelationFn {
    TypeRelationFn::new("make_tuple", |args, num_inputs, _, reporter| {
        if args.len() != num_inputs + 1 {
            return false;
        }
        let fields = args[..num_inputs].to_vec();
        reporter.assign(&args[num_inputs], &Ty::tuple(fields));
        true
    })
}

/// Allocates a reference cell: `out = ref(in)`.
#[must_use]
pub fn ref_new() -> TypeRelationFn {
    TypeRelationFn::new("ref_new", |args, num_inputs, _, reporter| {
        if num_inputs != 1 || args.len() != 2 {
            return false;
        }
        reporter.assign(&args[1], &Ty::reference(args[0].clone()));
        true
    })
}

/// Reads a reference cell. Works in both directions: an unknown reference
/// is inferred from the type read out of it.
#[must_use]
pub fn ref_read() -> TypeRelationFn {
    TypeRelationFn::new("ref_read", |args, num_inputs, _, reporter| {
        if num_inputs != 1 || args.len() != 2 {
            return false;
        }
        match args[0].kind() {
            TyKind::Ref(r) => {
                reporter.assign(&args[1], &r.value);
                true
            }
            TyKind::Incomplete(_) => {
                reporter.assign(&args[0], &Ty::reference(args[1].clone()));
                true
            }
            _ => false,
        }
    })
}

/// Checks a type-level application against the data type definition in the
/// module: the number of type arguments must match the parameters.
///
/// An application of an unknown global is left unresolved.
#[must_use]
pub fn adt_call() -> TypeRelationFn {
    TypeRelationFn::new("adt_call", |args, _, _, reporter| {
        let Some(TyKind::Call(call)) = args.first().map(Ty::kind) else {
            return false;
        };
        let TyKind::GlobalVar(global) = call.func.kind() else {
            return false;
        };
        let Some(arity) = reporter.module().lookup_global(global).map(|d| d.arity()) else {
            return false;
        };
        reporter.assert_eq(&lit(call.args.len()), &lit(arity))
    })
}

/// Calls a global function named by the `callee` attribute.
///
/// Inputs are unified with the parameter types and the single output with
/// the result type. Only monomorphic signatures are handled; a polymorphic
/// or unknown callee leaves the relation unresolved.
#[must_use]
pub fn call_global() -> TypeRelationFn {
    TypeRelationFn::new("call_global", |args, num_inputs, attrs, reporter| {
        if args.len() != num_inputs + 1 {
            return false;
        }
        let Some(name) = attrs.get_str("callee") else {
            return false;
        };
        let Some(sig) = reporter.module().lookup_function(name).cloned() else {
            return false;
        };
        if !sig.type_params.is_empty() {
            return false;
        }
        if !reporter.assert_eq(&lit(num_inputs), &lit(sig.arg_types.len())) {
            return false;
        }
        for (arg, param) in args.iter().zip(&sig.arg_types) {
            reporter.assign(param, arg);
        }
        reporter.assign(&args[num_inputs], &sig.ret_type);
        true
    })
}
