//! End-to-end scenarios: compile a raw query, run it on JSON data.

use std::thread;

use rhyme::ast::{apply, array, call, count, get, group, ident, lit, object, path, plus, sum, times};
use rhyme::diagnostic::Severity;
use rhyme::ir::Node;
use rhyme::{compile, compile_with_options, CompileError, CompileOptions, OutputDims, Udfs};
use serde_json::{json, Value};

fn sales() -> Value {
    json!({"data": [
        {"key": "A", "value": 10},
        {"key": "B", "value": 20},
        {"key": "A", "value": 30},
    ]})
}

#[test]
fn test_group_sums_per_key() {
    let query = compile(&group(path("data.*.key"), sum(path("data.*.value")))).unwrap();
    assert_eq!(query.run(&sales()), json!({"A": 40, "B": 20}));
}

#[test]
fn test_average_of_two_totals() {
    let avg = call(
        "fdiv",
        vec![sum(path("data.*.value")), count(path("data.*.value"))],
    );
    let query = compile(&avg).unwrap();
    assert_eq!(query.run(&sales()), json!(20));
}

#[test]
fn test_per_pair_records() {
    let record = object(vec![
        (lit("a"), path("data1.*i")),
        (lit("b"), path("data2.*j")),
        (lit("sum"), plus(path("data1.*i"), path("data2.*j"))),
        (lit("product"), times(path("data1.*i"), path("data2.*j"))),
    ]);
    let query = compile(&array(vec![record])).unwrap();
    let out = query.run(&json!({"data1": [10, 20], "data2": [10, 20]}));
    assert_eq!(
        out,
        json!([
            {"a": 10, "b": 10, "sum": 20, "product": 100},
            {"a": 10, "b": 20, "sum": 30, "product": 200},
            {"a": 20, "b": 10, "sum": 30, "product": 200},
            {"a": 20, "b": 20, "sum": 40, "product": 400},
        ])
    );
}

#[test]
fn test_uncorrelated_total_is_shared_across_groups() {
    let query = object(vec![
        (lit("total"), sum(path("data.*A.value"))),
        (
            path("data.*.key"),
            object(vec![
                (lit("my_total"), sum(path("data.*.value"))),
                (lit("full_total"), sum(path("data.*B.value"))),
            ]),
        ),
    ]);
    let query = compile(&query).unwrap();
    assert_eq!(
        query.run(&sales()),
        json!({
            "total": 60,
            "A": {"my_total": 40, "full_total": 60},
            "B": {"my_total": 20, "full_total": 60},
        })
    );
    // the grand total under *B has no free variables: one slot, no key
    assert!(query
        .explain()
        .code
        .contains("[] = sum(data[*B][value])"));
}

#[test]
fn test_group_collects_arrays() {
    let query = compile(&object(vec![(
        path("data.*.key"),
        array(vec![path("data.*.value")]),
    )]))
    .unwrap();
    assert_eq!(query.run(&sales()), json!({"A": [10, 30], "B": [20]}));
}

#[test]
fn test_comparison_filters_inputs() {
    let big = call(
        "and",
        vec![
            call("greaterThan", vec![path("data.*.value"), lit(15)]),
            path("data.*.value"),
        ],
    );
    let query = compile(&sum(big)).unwrap();
    assert_eq!(query.run(&sales()), json!(50));
}

#[test]
fn test_prefix_and_nullable_reducers() {
    let running = compile(&call("prefix_sum", vec![path("data.*.value")])).unwrap();
    assert_eq!(running.run(&sales()), json!([10, 30, 60]));

    let empty = json!({"data": []});
    let strict = compile(&sum(path("data.*.value"))).unwrap();
    let nullable = compile(&call("sum?", vec![path("data.*.value")])).unwrap();
    assert_eq!(strict.run(&empty), json!(0));
    assert_eq!(nullable.run(&empty), Value::Null);
}

#[test]
fn test_user_defined_function() {
    let doubled = apply(path("udf.double"), vec![path("data.*.value")]);
    let query = compile(&sum(doubled)).unwrap();
    let udfs = Udfs::new().with("double", |args| {
        let x = args.first()?.as_ref()?.as_i64()?;
        Some(json!(x * 2))
    });
    let mut input = sales();
    input["udf"] = json!({"double": "double"});
    assert_eq!(query.run_with(&input, &udfs), json!(120));
    // unknown functions make every element undefined
    assert_eq!(query.run(&input), json!(0));
}

#[test]
fn test_repeated_compilation_is_identical() {
    let raw = object(vec![
        (lit("total"), sum(path("data.*A.value"))),
        (path("data.*.key"), sum(path("data.*.value"))),
    ]);
    let first = compile(&raw).unwrap();
    let second = compile(&raw).unwrap();
    assert_eq!(first.explain().code, second.explain().code);
    assert_eq!(first.explain().pseudo, second.explain().pseudo);
    assert_eq!(first.explain().filters, second.explain().filters);
    assert_eq!(first.explain().vars, second.explain().vars);
}

#[test]
fn test_filters_are_deduplicated() {
    let raw = plus(sum(path("data.*.value")), sum(path("data.*.other")));
    let query = compile(&raw).unwrap();
    let explain = query.explain();
    assert_eq!(explain.filters.len(), 1);
    assert_eq!(explain.vars, ["D0"]);
}

fn check_tree(node: &Node) {
    node.walk_post(&mut |n| {
        let ann = &n.ann;
        assert!(ann.mind.is_subset(&ann.dims), "mind ⊄ dims");
        assert!(ann.dims.is_subset(&ann.vars), "dims ⊄ vars");
        assert!(ann.fre.is_disjoint(&ann.bnd), "fre ∩ bnd ≠ ∅");
        assert!(ann.fre.is_disjoint(&ann.all_bnd), "fre ∩ allBnd ≠ ∅");
    });
}

#[test]
fn test_invariants_hold_on_every_node() {
    let queries = [
        sum(path("data.*.value")),
        group(path("data.*.key"), sum(path("data.*.value"))),
        object(vec![(lit("a"), path("data.*A.value"))]),
        object(vec![
            (lit("total"), sum(path("data.*A.value"))),
            (
                path("data.*.key"),
                object(vec![(lit("full_total"), sum(path("data.*B.value")))]),
            ),
        ]),
    ];
    for raw in &queries {
        for output in [OutputDims::Minimal, OutputDims::Desired] {
            let options = CompileOptions::default().with_output(output);
            let query = compile_with_options(raw, &options).unwrap();
            check_tree(&query.explain().tree);
        }
    }
}

#[test]
fn test_unknown_operator_fails() {
    let err = compile(&call("median", vec![path("data.*.value")])).unwrap_err();
    assert!(matches!(err, CompileError::UnknownOperator { .. }));
    let diagnostic = err.to_diagnostic(err.subterm());
    assert!(diagnostic.is_error());
}

#[test]
fn test_cyclic_filters_are_reported() {
    let cycle = plus(
        get(ident("*B"), ident("*A")),
        get(ident("*A"), ident("*B")),
    );
    let options = CompileOptions::default().with_output(OutputDims::Desired);
    let query = compile_with_options(&cycle, &options).unwrap();
    let diagnostics = query.diagnostics();
    assert!(diagnostics
        .iter()
        .any(|d| d.severity == Severity::Warning && d.message.contains("unsolved filter")));
    assert!(diagnostics
        .iter()
        .any(|d| d.severity == Severity::Error && d.message.contains("not defined")));
    assert!(query.explain().has_errors());
}

fn tree() -> Value {
    json!({
        "data": {"A": 7, "B": 8, "foo1": {"A": 17, "B": 18, "foo2": {"A": 27, "B": 28}}},
        "other": {"C": 9, "foo1": {"B": 12, "foo2": {"A": 13, "C": 15}}},
    })
}

#[test]
fn test_deep_var_collects_every_path() {
    let paths = array(vec![call("and", vec![path("data.**A"), ident("**A")])]);
    let query = compile(&paths).unwrap();
    assert_eq!(
        query.run(&tree()),
        json!([
            [],
            ["A"], ["B"], ["foo1"],
            ["foo1", "A"], ["foo1", "B"], ["foo1", "foo2"],
            ["foo1", "foo2", "A"], ["foo1", "foo2", "B"],
        ])
    );
}

#[test]
fn test_deep_var_joins_two_trees() {
    let shared = call(
        "and",
        vec![call("and", vec![path("data.**A"), path("other.**A")]), ident("**A")],
    );
    let query = compile(&array(vec![shared])).unwrap();
    assert_eq!(
        query.run(&tree()),
        json!([[], ["foo1"], ["foo1", "B"], ["foo1", "foo2"], ["foo1", "foo2", "A"]])
    );
}

#[test]
fn test_deep_var_finds_keys_at_any_depth() {
    let query = compile(&array(vec![path("data.**A.B")])).unwrap();
    assert_eq!(query.run(&tree()), json!([8, 18, 28]));
}

#[test]
fn test_deep_var_arithmetic_follows_shape() {
    let query = compile(&plus(path("A.**I"), path("B.**I"))).unwrap();
    assert_eq!(query.run(&json!({"A": 7, "B": 8})), json!(15));
    assert_eq!(
        query.run(&json!({"A": [1, 2, 3], "B": [10, 20, 30]})),
        json!({"0": 11, "1": 22, "2": 33})
    );
    assert_eq!(
        query.run(&json!({"A": [[1, 2], [3, 4]], "B": [[10, 20], [30, 40]]})),
        json!({"0": {"0": 11, "1": 22}, "1": {"0": 33, "1": 44}})
    );
}

#[test]
fn test_anonymous_deep_var_is_malformed() {
    let err = compile(&array(vec![path("data.**")])).unwrap_err();
    assert!(matches!(err, CompileError::Malformed { .. }));
}

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_compile_and_run_across_threads() {
    assert_send_sync::<rhyme::Query>();
    assert_send_sync::<Udfs>();
    assert_send_sync::<CompileOptions>();

    let raw = group(path("data.*.key"), sum(path("data.*.value")));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let raw = raw.clone();
            thread::spawn(move || {
                let query = compile(&raw).unwrap();
                (query.run(&sales()), query.explain().code.clone())
            })
        })
        .collect();
    let results: Vec<(Value, String)> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for (out, code) in &results {
        assert_eq!(out, &json!({"A": 40, "B": 20}));
        assert_eq!(code, &results[0].1);
    }

    // one compiled query shared by several readers
    let query = compile(&raw).unwrap();
    thread::scope(|scope| {
        for _ in 0..2 {
            scope.spawn(|| assert_eq!(query.run(&sales()), json!({"A": 40, "B": 20})));
        }
    });
}
