//! Integration tests for the relation solver.
//!
//! These build relation sets the way a typing pass would and check the
//! solved types or the reported errors.

use tyrel_arith::{IndexExpr, SizeVar};
use tyrel_diagnostics::{DiagnosticHandler, FileId, Span};
use tyrel_typeck::{
    diagnostics, AttrValue, Attrs, RelationRegistry, SolverConfig, TypeError, TypeRelation,
    TypeRelationFn, TypeSolver,
};
use tyrel_types::{
    Constructor, DataType, FuncType, GlobalTypeVar, Kind, Module, TensorType, Ty, TypeData,
    TypeVar,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn n() -> IndexExpr {
    IndexExpr::var(SizeVar::new(0, "n"))
}

fn tensor(shape: Vec<IndexExpr>, dtype: DataType) -> Ty {
    Ty::tensor(TensorType::new(shape, dtype))
}

fn rel(name: &str, args: Vec<Ty>, num_inputs: usize, attrs: Attrs, span: Span) -> TypeRelation {
    RelationRegistry::with_builtins()
        .make_relation(name, args, num_inputs, attrs, span)
        .unwrap()
}

// ============================================================
// Scenarios
// ============================================================

#[test]
fn test_elemwise_symbolic_shape_resolves() {
    init_tracing();
    let module = Module::new();
    let mut solver = TypeSolver::new(&module);
    let x = tensor(vec![n()], DataType::FLOAT32);
    let out = solver.fresh_var(Kind::Type);
    solver.add_relation(rel(
        "elemwise",
        vec![x.clone(), x.clone(), out.clone()],
        2,
        Attrs::new(),
        Span::DUMMY,
    ));

    let solution = solver.solve().unwrap();
    assert_eq!(solution.apply(&out), x);
    assert_eq!(solution.apply(&out).to_string(), "Tensor[(n), float32]");
    assert!(solution.deferred().is_empty());
}

#[test]
fn test_input_inferred_from_known_output() {
    let module = Module::new();
    let mut solver = TypeSolver::new(&module);
    let input = solver.fresh_var(Kind::Type);
    let output = Ty::tensor(TensorType::from_dims(&[4, 4], DataType::INT32));

    let back = TypeRelationFn::new("backward", |args, _, _, reporter| {
        reporter.assign(&args[0], &args[1]);
        true
    });
    let relation = TypeRelation::new(back, vec![input.clone(), output.clone()], 1, Attrs::new(), Span::DUMMY).unwrap();
    solver.add_relation(relation);

    let solution = solver.solve().unwrap();
    assert_eq!(solution.apply(&input), output);
    assert_eq!(solution.get(0).map(ToString::to_string).as_deref(), Some("Tensor[(4, 4), int32]"));
}

#[test]
fn test_unequal_constant_shapes_fail_at_location() {
    let module = Module::new();
    let mut solver = TypeSolver::new(&module);
    let span = Span::from_raw(40, 52);
    let a = Ty::tensor(TensorType::from_dims(&[3], DataType::FLOAT32));
    let b = Ty::tensor(TensorType::from_dims(&[4], DataType::FLOAT32));
    let out = solver.fresh_var(Kind::Type);
    solver.add_relation(rel("elemwise", vec![a, b, out], 2, Attrs::new(), span));

    let errors = solver.solve().unwrap_err();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        TypeError::AssertionFailed { cond, span: at } => {
            assert_eq!(cond.to_string(), "3 == 4");
            assert_eq!(*at, span);
        }
        other => panic!("expected assertion failure, got {other:?}"),
    }
}

#[test]
fn test_unassigned_variable_is_reported() {
    let module = Module::new();
    let mut solver = TypeSolver::new(&module);
    let lonely = solver.fresh_var(Kind::Type);
    let out = solver.fresh_var(Kind::Type);
    solver.add_relation(rel(
        "make_tuple",
        vec![Ty::unit(), out],
        1,
        Attrs::new(),
        Span::DUMMY,
    ));

    let errors = solver.solve().unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code(), "T0005");
    assert_eq!(errors[0].to_string(), format!("cannot infer types for `{lonely}`"));
}

// ============================================================
// Solver Behaviour
// ============================================================

#[test]
fn test_set_location_is_used_for_failures() {
    let module = Module::new();
    let mut solver = TypeSolver::new(&module);
    let inner = Span::from_raw(7, 9);
    let check = TypeRelationFn::new("check", move |_, _, _, reporter| {
        reporter.set_location(inner);
        reporter.assert_eq(&IndexExpr::lit(2), &IndexExpr::lit(3))
    });
    let relation = TypeRelation::new(check, vec![Ty::unit()], 1, Attrs::new(), Span::from_raw(0, 20)).unwrap();
    solver.add_relation(relation);

    let errors = solver.solve().unwrap_err();
    assert_eq!(errors[0].span(), Some(inner));
}

#[test]
fn test_symbolic_assert_is_deferred_not_rejected() {
    let module = Module::new();
    let mut solver = TypeSolver::new(&module);
    let a = tensor(vec![n()], DataType::FLOAT32);
    let b = Ty::tensor(TensorType::from_dims(&[3], DataType::FLOAT32));
    let out = solver.fresh_var(Kind::Type);
    solver.add_relation(rel("elemwise", vec![a.clone(), b, out.clone()], 2, Attrs::new(), Span::DUMMY));

    let solution = solver.solve().unwrap();
    assert_eq!(solution.apply(&out), a);
    let deferred: Vec<String> = solution.deferred().iter().map(ToString::to_string).collect();
    assert_eq!(deferred, vec!["n == 3"]);

    let mut handler = DiagnosticHandler::new();
    diagnostics::emit_deferred(&mut handler, &solution);
    assert!(!handler.has_errors());
    assert_eq!(handler.warning_count(), 1);
    assert_eq!(handler.diagnostics()[0].code.as_deref(), Some(diagnostics::DEFERRED_CODE));
    assert!(handler.diagnostics()[0].message.contains("n == 3"));
}

#[test]
fn test_stuck_relation_names_operator() {
    let module = Module::new();
    let mut solver = TypeSolver::new(&module);
    let a = solver.fresh_var(Kind::Type);
    let out = solver.fresh_var(Kind::Type);
    let span = Span::from_raw(5, 15);
    solver.add_relation(rel("broadcast", vec![a.clone(), a, out], 2, Attrs::new(), span));

    let errors = solver.solve().unwrap_err();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        TypeError::StuckRelation { name, args, diverged, span: at } => {
            assert_eq!(name, "broadcast");
            assert_eq!(args.len(), 3);
            assert!(!diverged);
            assert_eq!(*at, span);
        }
        other => panic!("expected stuck relation, got {other:?}"),
    }
}

#[test]
fn test_occurs_check() {
    let module = Module::new();
    let mut solver = TypeSolver::new(&module);
    let a = solver.fresh_var(Kind::Type);
    solver.add_relation(rel(
        "make_tuple",
        vec![a.clone(), a],
        1,
        Attrs::new(),
        Span::DUMMY,
    ));

    let errors = solver.solve().unwrap_err();
    assert!(matches!(errors[0], TypeError::OccursCheck { .. }));
}

#[test]
fn test_kind_mismatch() {
    let module = Module::new();
    let mut solver = TypeSolver::new(&module);
    let a = solver.fresh_var(Kind::Type);
    let b = solver.fresh_var(Kind::ShapeVar);
    solver.add_relation(rel("identity", vec![a, b], 1, Attrs::new(), Span::DUMMY));

    let errors = solver.solve().unwrap_err();
    assert!(matches!(
        errors[0],
        TypeError::KindMismatch {
            expected: Kind::ShapeVar,
            found: Kind::Type,
            ..
        }
    ));
}

#[test]
fn test_dtype_mismatch_is_structural() {
    let module = Module::new();
    let mut solver = TypeSolver::new(&module);
    let a = Ty::tensor(TensorType::from_dims(&[2], DataType::FLOAT32));
    let b = Ty::tensor(TensorType::from_dims(&[2], DataType::INT32));
    let out = solver.fresh_var(Kind::Type);
    solver.add_relation(rel("broadcast", vec![a, b, out], 2, Attrs::new(), Span::DUMMY));

    let errors = solver.solve().unwrap_err();
    assert_eq!(errors[0].code(), "T0001");
    let diag = diagnostics::to_diagnostic(&errors[0], FileId::new(1));
    assert!(diag.notes[0].contains("element type"));
}

#[test]
fn test_monotonic_binding() {
    // Once bound to [2], a variable cannot become [3].
    let module = Module::new();
    let mut solver = TypeSolver::new(&module);
    let v = solver.fresh_var(Kind::Type);
    let two = Ty::tensor(TensorType::from_dims(&[2], DataType::FLOAT32));
    let three = Ty::tensor(TensorType::from_dims(&[3], DataType::FLOAT32));
    solver.add_relation(rel("identity", vec![two, v.clone()], 1, Attrs::new(), Span::DUMMY));
    solver.add_relation(rel("identity", vec![three, v], 1, Attrs::new(), Span::DUMMY));

    let errors = solver.solve().unwrap_err();
    assert!(matches!(
        errors[0],
        TypeError::DimensionMismatch { axis: 0, .. }
    ));
}

#[test]
fn test_strict_shapes_rejects_unknown_dimensions() {
    let module = Module::new();
    let config = SolverConfig::from_toml_str("strict_shapes = true").unwrap();
    let mut solver = TypeSolver::with_config(&module, config);
    let v = solver.fresh_var(Kind::Type);
    let symbolic = tensor(vec![n()], DataType::FLOAT32);
    let fixed = Ty::tensor(TensorType::from_dims(&[3], DataType::FLOAT32));
    solver.add_relation(rel("identity", vec![symbolic, v.clone()], 1, Attrs::new(), Span::DUMMY));
    solver.add_relation(rel("identity", vec![fixed, v], 1, Attrs::new(), Span::DUMMY));

    let errors = solver.solve().unwrap_err();
    assert_eq!(errors[0].code(), "T0007");
}

#[test]
fn test_bound_ranges_refute_dimensions() {
    let module = Module::new();
    let mut solver = TypeSolver::new(&module);
    solver.analyzer_mut().bind_range(SizeVar::new(0, "n"), 8, 16);
    let a = tensor(vec![n()], DataType::FLOAT32);
    let b = Ty::tensor(TensorType::from_dims(&[3], DataType::FLOAT32));
    let out = solver.fresh_var(Kind::Type);
    solver.add_relation(rel("elemwise", vec![a, b, out], 2, Attrs::new(), Span::DUMMY));

    let errors = solver.solve().unwrap_err();
    assert_eq!(errors[0].code(), "T0004");
}

#[test]
fn test_pipeline_of_builtins() {
    // y = reshape(x, [-1]); z = (y, y); w = z.1
    let module = Module::new();
    let mut solver = TypeSolver::new(&module);
    let x = Ty::tensor(TensorType::from_dims(&[2, 3], DataType::FLOAT16));
    let y = solver.fresh_var(Kind::Type);
    let z = solver.fresh_var(Kind::Type);
    let w = solver.fresh_var(Kind::Type);

    // Added last-to-first so that the worklist has to revisit relations.
    let index = Attrs::new().with("index", AttrValue::Int(1));
    solver.add_relation(rel("tuple_get", vec![z.clone(), w.clone()], 1, index, Span::DUMMY));
    solver.add_relation(rel("make_tuple", vec![y.clone(), y.clone(), z], 2, Attrs::new(), Span::DUMMY));
    let newshape = Attrs::new().with("newshape", AttrValue::Ints(vec![-1]));
    solver.add_relation(rel("reshape", vec![x, y], 1, newshape, Span::DUMMY));

    let solution = solver.solve().unwrap();
    let flat = Ty::tensor(TensorType::from_dims(&[6], DataType::FLOAT16));
    assert_eq!(solution.apply(&w), flat);
    assert_eq!(solution.bindings().len(), 3);
}

#[test]
fn test_reshape_rejects_impossible_shapes() {
    for newshape in [vec![3, -1], vec![0, -1], vec![-4, -4]] {
        let module = Module::new();
        let mut solver = TypeSolver::new(&module);
        let x = Ty::tensor(TensorType::from_dims(&[2, 8], DataType::FLOAT32));
        let y = solver.fresh_var(Kind::Type);
        let attrs = Attrs::new().with("newshape", AttrValue::Ints(newshape.clone()));
        solver.add_relation(rel("reshape", vec![x, y], 1, attrs, Span::from_raw(4, 9)));

        let errors = solver.solve().unwrap_err();
        assert_eq!(errors[0].code(), "T0004", "newshape {newshape:?}");
    }
}

#[test]
fn test_module_lookups() {
    let mut module = Module::new();
    let header = GlobalTypeVar::new("Box", Kind::AdtHandle);
    let t = TypeVar::new(0, "T", Kind::Type);
    module.add_type_def(TypeData {
        header: header.clone(),
        type_vars: vec![t.clone()],
        constructors: vec![Constructor {
            name: "Box".into(),
            fields: vec![Ty::var(t)],
            tag: 0,
        }],
    });
    let scalar = Ty::scalar(DataType::FLOAT32);
    module.add_function(
        "square",
        FuncType {
            arg_types: vec![scalar.clone()],
            ret_type: scalar.clone(),
            type_params: Vec::new(),
        },
    );

    let mut solver = TypeSolver::new(&module);
    let boxed = Ty::call(Ty::global(header.clone()), vec![scalar.clone()]);
    solver.add_relation(rel("adt_call", vec![boxed], 1, Attrs::new(), Span::DUMMY));
    let arg = solver.fresh_var(Kind::Type);
    let out = solver.fresh_var(Kind::Type);
    let callee = Attrs::new().with("callee", AttrValue::Str("square".to_string()));
    solver.add_relation(rel("call_global", vec![arg.clone(), out.clone()], 1, callee, Span::DUMMY));

    let solution = solver.solve().unwrap();
    assert_eq!(solution.apply(&arg), scalar);
    assert_eq!(solution.apply(&out), scalar);

    let mut solver = TypeSolver::new(&module);
    let bad = Ty::call(Ty::global(header), vec![scalar.clone(), scalar]);
    solver.add_relation(rel("adt_call", vec![bad], 1, Attrs::new(), Span::DUMMY));
    let errors = solver.solve().unwrap_err();
    assert_eq!(errors[0].code(), "T0004");
}

#[test]
fn test_solution_is_deterministic() {
    let build = || {
        let module = Module::new();
        let mut solver = TypeSolver::new(&module);
        let a = Ty::tensor(TensorType::from_dims(&[4, 1], DataType::FLOAT32));
        let b = Ty::tensor(TensorType::from_dims(&[5], DataType::FLOAT32));
        let out = solver.fresh_var(Kind::Type);
        solver.add_relation(rel("broadcast", vec![a, b, out], 2, Attrs::new(), Span::DUMMY));
        solver.solve().unwrap()
    };
    assert_eq!(build(), build());
}

#[test]
fn test_independent_sessions_in_parallel() {
    let module = Module::new();
    let registry = RelationRegistry::with_builtins();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (1..=4i64)
            .map(|k| {
                let module = &module;
                let registry = &registry;
                scope.spawn(move || {
                    let mut solver = TypeSolver::new(module);
                    let x = Ty::tensor(TensorType::from_dims(&[k, k], DataType::FLOAT32));
                    let out = solver.fresh_var(Kind::Type);
                    let relation = registry
                        .make_relation("elemwise", vec![x.clone(), x.clone(), out.clone()], 2, Attrs::new(), Span::DUMMY)
                        .unwrap();
                    solver.add_relation(relation);
                    (solver.solve().unwrap().apply(&out), x)
                })
            })
            .collect();
        for handle in handles {
            let (got, want) = handle.join().unwrap();
            assert_eq!(got, want);
        }
    });
}
