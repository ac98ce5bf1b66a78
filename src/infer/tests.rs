use super::*;
use crate::ast::{self, group, lit, object, path, sum, RawExpr};
use crate::extract::extract;
use crate::ir::{Mode, Reducer, ReducerOp, Var};
use crate::preprocess::preprocess;

fn annotate(raw: &RawExpr, desired: bool) -> (Context, Node) {
    let term = preprocess(raw).unwrap();
    let mut ctx = Context::new(term.to_string());
    let node = extract(&mut ctx, &term).unwrap();
    let node = dims::infer_dims(&ctx, node).unwrap();
    deps::compute(&mut ctx, &node);
    let out = if desired {
        node.ann.dims.clone()
    } else {
        node.ann.mind.clone()
    };
    let node = infer_top_down(&ctx, node, &out).unwrap();
    (ctx, node)
}

fn names(ctx: &Context, set: &VarSet) -> String {
    set.display(&ctx.vars).to_string()
}

/// `(rendered, fre)` of every reduction, children first.
fn reductions(ctx: &Context, root: &Node) -> Vec<(String, String)> {
    let mut out = Vec::new();
    root.walk_post(&mut |node| {
        if let NodeKind::Stateful { .. } = node.kind {
            out.push((ctx.render(node), names(ctx, &node.ann.fre)));
        }
    });
    out
}

fn set(vars: &[u32]) -> VarSet {
    vars.iter().map(|&v| Var(v)).collect()
}

#[test]
fn test_group_dims_project_out_key() {
    let (ctx, root) = annotate(&group(path("data.*.key"), sum(path("data.*.value"))), false);
    assert_eq!(names(&ctx, &root.ann.vars), "D0,K1");
    assert!(root.ann.mind.is_empty());
    assert!(root.ann.dims.is_empty());
}

#[test]
fn test_reluctant_value_keeps_dims() {
    let (ctx, root) = annotate(&object(vec![(lit("a"), path("data.*A"))]), true);
    // desired output keeps *A, so the root is wrapped in a grouping by it
    let NodeKind::Update { key, value, .. } = &root.kind else {
        panic!("expected wrapping update");
    };
    assert_eq!(ctx.render(key), "vars(*A)");
    assert_eq!(names(&ctx, &value.ann.dims), "*A");
    assert!(value.ann.mind.is_empty());
    assert_eq!(names(&ctx, &root.ann.bnd), "*A");
    assert!(root.ann.fre.is_empty());
}

#[test]
fn test_closure_is_reflexive_transitive() {
    let direct = vec![set(&[]), set(&[0]), set(&[1])];
    let closed = deps::close(&direct);
    assert_eq!(closed, vec![set(&[0]), set(&[0, 1]), set(&[0, 1, 2])]);
}

#[test]
fn test_closure_is_idempotent() {
    let direct = vec![set(&[2]), set(&[0]), set(&[]), set(&[1, 3])];
    let once = deps::close(&direct);
    let twice = deps::close(&once);
    assert_eq!(once, twice);
}

#[test]
fn test_closure_handles_cycles() {
    let closed = deps::close(&[set(&[1]), set(&[0])]);
    assert_eq!(closed, vec![set(&[0, 1]), set(&[0, 1])]);
}

#[test]
fn test_mkset_key_depends_on_collection() {
    let (ctx, _) = annotate(&group(path("data.*.key"), sum(path("data.*.value"))), false);
    let k1 = ctx.vars.lookup("K1").unwrap();
    let d0 = ctx.vars.lookup("D0").unwrap();
    assert_eq!(names(&ctx, &ctx.deps.of(k1)), "D0,K1");
    assert_eq!(names(&ctx, &ctx.deps.of(d0)), "D0");
    assert_eq!(ctx.deps.listing(&ctx.vars), "D0 -> \nK1 -> D0\n");
}

#[test]
fn test_group_bound_and_free() {
    let (ctx, root) = annotate(&group(path("data.*.key"), sum(path("data.*.value"))), false);
    assert_eq!(names(&ctx, &root.ann.bnd), "K1");
    assert!(root.ann.fre.is_empty());
    let NodeKind::Update { value, .. } = &root.kind else {
        panic!("expected update");
    };
    // the sum loops over D0 per group K1
    assert_eq!(names(&ctx, &value.ann.bnd), "D0");
    assert_eq!(names(&ctx, &value.ann.fre), "K1");
    assert_eq!(names(&ctx, &root.ann.all_bnd), "D0,K1");
}

#[test]
fn test_uncorrelated_sibling_sum_is_free_of_group_key() {
    let raw = object(vec![
        (lit("total"), sum(path("data.*A.value"))),
        (
            path("data.*.key"),
            object(vec![
                (lit("my_total"), sum(path("data.*.value"))),
                (lit("full_total"), sum(path("data.*B.value"))),
            ]),
        ),
    ]);
    let (ctx, root) = annotate(&raw, false);
    assert_eq!(
        reductions(&ctx, &root),
        vec![
            ("sum(data[*A][value])".to_string(), String::new()),
            ("sum(data[D1][value])".to_string(), "K4".to_string()),
            ("sum(data[*B][value])".to_string(), String::new()),
        ]
    );
}

#[test]
fn test_minimal_output_does_not_wrap_reductions() {
    let (_, root) = annotate(&sum(path("data.*.value")), false);
    assert!(matches!(root.kind, NodeKind::Stateful { .. }));
    assert!(root.ann.fre.is_empty());
}

#[test]
fn test_plain_path_wraps_in_grouping() {
    let (ctx, root) = annotate(&path("data.*A.value"), false);
    assert_eq!(ctx.render(&root), "{}{ vars(*A): data[*A][value] }");
    assert_eq!(names(&ctx, &root.ann.bnd), "*A");
    let NodeKind::Update { value, .. } = &root.kind else {
        panic!("expected wrapping update");
    };
    assert_eq!(names(&ctx, &value.ann.fre), "*A");
}

#[test]
fn test_every_node_satisfies_invariants() {
    let raw = ast::array(vec![object(vec![
        (lit("a"), ast::ident("*i")),
        (lit("b"), ast::ident("*j")),
        (
            lit("sum"),
            ast::plus(path("data1.*i"), path("data2.*j")),
        ),
    ])]);
    let (ctx, root) = annotate(&raw, false);
    verify(&ctx, &root).unwrap();
}

#[test]
fn test_check_dims_reports_violation() {
    let ctx = Context::new(String::new());
    let mut node = Node::stateful(Reducer::new(ReducerOp::Sum), Mode::Eager, Node::input());
    node.ann.mind = set(&[0]);
    let err = check_dims(&ctx, &node, "dims").unwrap_err();
    assert!(matches!(
        err,
        CompileError::InvariantViolation { pass: "dims", .. }
    ));
}

#[test]
fn test_check_scopes_reports_violation() {
    let ctx = Context::new(String::new());
    let mut node = Node::input();
    node.ann.fre = set(&[0]);
    node.ann.all_bnd = set(&[0, 1]);
    let err = check_scopes(&ctx, &node, "free").unwrap_err();
    assert!(err.to_string().contains("allBnd"));
}
