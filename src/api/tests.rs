use serde_json::json;

use super::*;
use crate::ast::{call, group, lit, object, path, sum};

fn sample() -> Value {
    json!({"data": [
        {"key": "A", "value": 10},
        {"key": "B", "value": 20},
        {"key": "A", "value": 30},
    ]})
}

#[test]
fn test_default_options() {
    let options = CompileOptions::default();
    assert_eq!(options.output, OutputDims::Minimal);
    assert!(options.check_invariants);
    assert!(options.emit_comments);
    let options = options
        .with_output(OutputDims::Desired)
        .with_check_invariants(false)
        .with_comments(false);
    assert_eq!(options.output, OutputDims::Desired);
    assert!(!options.check_invariants);
    assert!(!options.emit_comments);
}

#[test]
fn test_compile_and_run_total() {
    let query = compile(&sum(path("data.*.value"))).unwrap();
    assert_eq!(query.run(&sample()), json!(60));
    assert!(query.diagnostics().is_empty());
}

#[test]
fn test_undefined_result_is_null() {
    let query = compile(&call("max", vec![path("data.*.value")])).unwrap();
    assert_eq!(query.run(&json!({"data": []})), Value::Null);
}

#[test]
fn test_explain_bundle() {
    let query = compile(&group(path("data.*.key"), sum(path("data.*.value")))).unwrap();
    let explain = query.explain();
    assert_eq!(explain.source, "group(data[*][key], sum(data[*][value]))");
    assert_eq!(explain.vars, ["D0", "K1"]);
    assert_eq!(explain.filters.len(), 2);
    assert!(explain.pseudo.contains("gen0[] = data[D0]"));
    assert!(explain.pseudo.contains("K1 -> D0"));
    assert!(explain.code.starts_with("inp => {"));
    assert!(!explain.has_errors());

    let value = explain.to_json();
    assert_eq!(value["vars"], json!(["D0", "K1"]));
    assert_eq!(value["tree"]["kind"], json!("update"));
}

#[test]
fn test_desired_output_groups_by_free_dims() {
    let raw = object(vec![(lit("total"), path("data.*A.value"))]);
    let minimal = compile(&raw).unwrap();
    let desired =
        compile_with_options(&raw, &CompileOptions::default().with_output(OutputDims::Desired))
            .unwrap();
    assert_eq!(minimal.run(&sample()), json!({"total": 30}));
    assert_eq!(
        desired.run(&sample()),
        json!({
            "0": {"total": 10},
            "1": {"total": 20},
            "2": {"total": 30},
        })
    );
}

#[test]
fn test_unknown_operator_is_fatal() {
    let err = compile(&call("median", vec![path("data.*.value")])).unwrap_err();
    assert!(matches!(err, CompileError::UnknownOperator { ref op, .. } if op == "median"));
}

#[test]
fn test_comments_flag_reaches_code() {
    let raw = sum(path("data.*.value"));
    let with = compile(&raw).unwrap();
    let without = compile_with_options(&raw, &CompileOptions::default().with_comments(false)).unwrap();
    assert!(with.explain().code.contains("// tmp0"));
    assert!(!without.explain().code.contains("//"));
    assert_eq!(with.run(&sample()), without.run(&sample()));
}
