//! End-to-end tests: parse models and templates, build a context, render.

use yamja_render::{
    parse, parse_document, render, render_document, render_str, to_json, to_yaml, Context,
    ErrorKind, Location, Node, Path, RenderError,
};

fn context(models: &[&str]) -> Context {
    Context::build(models.iter().map(|m| parse(m).unwrap()), Vec::<(String, String)>::new())
        .unwrap()
}

// ============================================================================
// Idempotence and determinism
// ============================================================================

#[test]
fn template_without_expressions_renders_unchanged() {
    let template = parse(
        "name: web\nreplicas: 3\nratio: 0.5\nenabled: true\nnothing: null\n\
         tags: [a, b]\nnested:\n  deep:\n    - {k: v}\n",
    )
    .unwrap();

    let out = render(&template, &context(&["unused: 1\n"])).unwrap();
    assert_eq!(out, template);
}

#[test]
fn rendering_twice_gives_equal_trees() {
    let ctx = context(&["a: 1\nb: {c: [x, y]}\n"]);
    let template = "one: ${a}\ntwo: ${b}\nthree: pre-${b.c.0}\n";

    let first = render_str(template, &ctx).unwrap();
    let second = render_str(template, &ctx).unwrap();
    assert_eq!(first, second);
    assert_eq!(to_yaml(&first).unwrap(), to_yaml(&second).unwrap());
}

// ============================================================================
// Precedence
// ============================================================================

#[test]
fn earlier_model_wins() {
    let ctx = context(&["x: from-a\n", "x: from-b\ny: only-b\n"]);
    let out = render_str("x: ${x}\ny: ${y}\n", &ctx).unwrap();

    assert_eq!(out.get("x"), Some(&Node::from("from-a")));
    assert_eq!(out.get("y"), Some(&Node::from("only-b")));
}

#[test]
fn env_override_beats_every_model() {
    let ctx = Context::build(
        vec![parse("x: 1\n").unwrap(), parse("x: 2\n").unwrap()],
        vec![("X", "9")],
    )
    .unwrap();

    let out = render_str("x: ${x}\n", &ctx).unwrap();
    assert_eq!(out.get("x"), Some(&Node::from("9")));
}

#[test]
fn nested_mappings_merge_across_models() {
    let ctx = context(&[
        "db:\n  host: primary\n",
        "db:\n  host: fallback\n  port: 5432\n",
    ]);
    let out = render_str("db: ${db}\n", &ctx).unwrap();

    assert_eq!(
        out,
        parse("db:\n  host: primary\n  port: 5432\n").unwrap()
    );
}

#[test]
fn sequences_are_replaced_not_concatenated() {
    let ctx = context(&["ports: [1]\n", "ports: [2, 3]\n"]);
    let out = render_str("ports: ${ports}\n", &ctx).unwrap();
    assert_eq!(out, parse("ports: [1]\n").unwrap());
}

// ============================================================================
// Defaults
// ============================================================================

#[test]
fn default_used_only_when_absent() {
    let template = "v: ${missing.path | default(5)}\n";

    let out = render_str(template, &context(&["other: 1\n"])).unwrap();
    assert_eq!(out.get("v"), Some(&Node::from(5i64)));

    let out = render_str(template, &context(&["missing:\n  path: real\n"])).unwrap();
    assert_eq!(out.get("v"), Some(&Node::from("real")));
}

#[test]
fn quoted_default_stays_string() {
    let out = render_str("v: \"${port | default('80')}\"\n", &Context::empty()).unwrap();
    assert_eq!(out.get("v"), Some(&Node::from("80")));
}

// ============================================================================
// Splicing and typing
// ============================================================================

#[test]
fn whole_value_splices_mapping() {
    let ctx = context(&["models:\n  cluster:\n    size: 3\n"]);
    let out = render_str("cluster: ${models.cluster}\n", &ctx).unwrap();

    let cluster = out.get("cluster").unwrap();
    assert!(cluster.as_mapping().is_some());
    assert_eq!(cluster.get("size"), Some(&Node::from(3i64)));
}

#[test]
fn whole_value_keeps_number_and_partial_makes_string() {
    let ctx = context(&["port: 8080\n"]);
    let out = render_str("a: ${port}\nb: p${port}\n", &ctx).unwrap();

    assert_eq!(out.get("a"), Some(&Node::from(8080i64)));
    assert_eq!(out.get("b"), Some(&Node::from("p8080")));
}

#[test]
fn splice_into_sequence_item_nests() {
    let ctx = context(&["extra: [b, c]\n"]);
    let out = render_str("items:\n  - a\n  - ${extra}\n", &ctx).unwrap();
    assert_eq!(out, parse("items: [a, [b, c]]\n").unwrap());
}

#[test]
fn str_tagged_model_value_stays_string() {
    let ctx = context(&["port: !!str 8080\nversion: !!str 1.10\n"]);
    let out = render_str("port: ${port}\nversion: ${version}\n", &ctx).unwrap();

    assert_eq!(out.get("port"), Some(&Node::from("8080")));
    assert_eq!(out.get("version"), Some(&Node::from("1.10")));
    assert_eq!(parse(&to_yaml(&out).unwrap()).unwrap(), out);
}

#[test]
fn large_float_interpolates_in_exponent_form() {
    let ctx = context(&["f: 1.0e300\n"]);
    let out = render_str("x: x${f}\n", &ctx).unwrap();
    assert_eq!(out.get("x"), Some(&Node::from("x1e300")));
}

#[test]
fn root_scalar_template() {
    let ctx = context(&["cfg: {a: 1}\n"]);
    let out = render_str("${cfg}\n", &ctx).unwrap();
    assert_eq!(out, parse("a: 1\n").unwrap());
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn unresolved_names_exact_path_and_location() {
    let ctx = context(&["db: {host: h}\n"]);
    let err = render_str("ok: ${db.host}\nbad: ${db.port}\n", &ctx).unwrap_err();

    match &err {
        RenderError::UnresolvedVariable { path, location } => {
            assert_eq!(path, &Path::parse("db.port").unwrap());
            assert_eq!(*location, Some(Location::new(2, 6)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn merge_conflict_names_path() {
    let err = Context::builder()
        .model(parse("a: {b: 1}\n").unwrap())
        .model(parse("a: 5\n").unwrap())
        .build()
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MergeConflict);
    match err {
        RenderError::MergeConflict { path, .. } => {
            assert_eq!(path, Path::parse("a").unwrap());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn malformed_template_yaml_is_parse_error() {
    let err = render_str("a: [1, 2\n", &Context::empty()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(err.location().is_some());
}

#[test]
fn unknown_tag_in_template_is_parse_error() {
    let err = render_str("a: !secret ${token}\n", &Context::empty()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[test]
fn nested_alias_expansion_in_model_is_parse_error() {
    let mut text = String::from("l0: &l0 [a, b]\n");
    for level in 1..30 {
        text.push_str(&format!("l{level}: &l{level} [*l{}, *l{}]\n", level - 1, level - 1));
    }
    let err = parse(&text).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(err.to_string().contains("alias expansion exceeds"), "{err}");
}

#[test]
fn deep_template_trips_depth_guard() {
    let mut text = String::new();
    for level in 0..200 {
        text.push_str(&"  ".repeat(level));
        text.push_str("k:\n");
    }
    let document = parse_document(&text).unwrap();
    let err = render_document(&document, &Context::empty()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TemplateTooDeep);
}

// ============================================================================
// Output
// ============================================================================

#[test]
fn rendered_yaml_reads_back_equal() {
    let ctx = Context::build(
        vec![parse("port: 8080\nflag: true\n").unwrap()],
        vec![("VERSION", "1.10")],
    )
    .unwrap();
    let out = render_str(
        "port: ${port}\nport_text: '${port}x'\nflag: ${flag}\nversion: ${version}\n",
        &ctx,
    )
    .unwrap();

    let text = to_yaml(&out).unwrap();
    assert_eq!(parse(&text).unwrap(), out);
    assert_eq!(out.get("version"), Some(&Node::from("1.10")));
}

#[test]
fn json_output_keeps_template_key_order() {
    let ctx = context(&["a: 1\n"]);
    let out = render_str("z: ${a}\nm: two\n", &ctx).unwrap();
    assert_eq!(
        to_json(&out).unwrap(),
        "{\n  \"z\": 1,\n  \"m\": \"two\"\n}\n"
    );
}
