//! Property-based tests for the relation solver.

use proptest::prelude::*;
use tyrel_diagnostics::Span;
use tyrel_typeck::{Attrs, RelationRegistry, Solution, TypeError, TypeSolver};
use tyrel_types::{DataType, Kind, Module, TensorType, Ty};

fn static_tensor(dims: &[i64]) -> Ty {
    Ty::tensor(TensorType::from_dims(dims, DataType::FLOAT32))
}

/// Builds a chain `v0 = x; v1 = v0; ...` with relations added in `order`.
fn solve_chain(dims: &[i64], order: &[usize]) -> Result<Solution, Vec<TypeError>> {
    let module = Module::new();
    let registry = RelationRegistry::with_builtins();
    let mut solver = TypeSolver::new(&module);

    let vars: Vec<Ty> = order.iter().map(|_| solver.fresh_var(Kind::Type)).collect();
    let source = static_tensor(dims);
    for &i in order {
        let input = if i == 0 { source.clone() } else { vars[i - 1].clone() };
        let relation = registry
            .make_relation("identity", vec![input, vars[i].clone()], 1, Attrs::new(), Span::DUMMY)
            .unwrap();
        solver.add_relation(relation);
    }
    solver.solve()
}

proptest! {
    #[test]
    fn chain_result_independent_of_order(
        dims in prop::collection::vec(1i64..8, 0..4),
        order in Just((0..6usize).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let sorted: Vec<usize> = (0..6).collect();
        let expected = solve_chain(&dims, &sorted).unwrap();
        let shuffled = solve_chain(&dims, &order).unwrap();
        prop_assert_eq!(&expected, &shuffled);
        prop_assert_eq!(expected.bindings().len(), 6);
        for ty in expected.bindings().values() {
            prop_assert_eq!(ty, &static_tensor(&dims));
        }
    }

    #[test]
    fn elemwise_constant_dims_decided(a in 1i64..10, b in 1i64..10) {
        let module = Module::new();
        let registry = RelationRegistry::with_builtins();
        let mut solver = TypeSolver::new(&module);
        let out = solver.fresh_var(Kind::Type);
        let relation = registry
            .make_relation(
                "elemwise",
                vec![static_tensor(&[a]), static_tensor(&[b]), out.clone()],
                2,
                Attrs::new(),
                Span::DUMMY,
            )
            .unwrap();
        solver.add_relation(relation);

        match solver.solve() {
            Ok(solution) => {
                prop_assert_eq!(a, b);
                prop_assert_eq!(solution.apply(&out), static_tensor(&[a]));
                prop_assert!(solution.deferred().is_empty());
            }
            Err(errors) => {
                prop_assert_ne!(a, b);
                prop_assert_eq!(errors.len(), 1);
                prop_assert_eq!(errors[0].code(), "T0004");
            }
        }
    }

    #[test]
    fn broadcast_against_ones_is_identity(dims in prop::collection::vec(1i64..6, 1..4)) {
        let module = Module::new();
        let registry = RelationRegistry::with_builtins();
        let mut solver = TypeSolver::new(&module);
        let ones = vec![1i64; dims.len()];
        let out = solver.fresh_var(Kind::Type);
        let relation = registry
            .make_relation(
                "broadcast",
                vec![static_tensor(&dims), static_tensor(&ones), out.clone()],
                2,
                Attrs::new(),
                Span::DUMMY,
            )
            .unwrap();
        solver.add_relation(relation);

        let solution = solver.solve().unwrap();
        prop_assert_eq!(solution.apply(&out), static_tensor(&dims));
    }
}
