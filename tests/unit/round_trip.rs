//! Round-trip property (spec §8): `parseTemplate(serialize(ast)) == ast`
//! for every AST the template engine can produce.

use garden_core::template::parser::parse_template;
use garden_core::template::serialize;

fn assert_round_trips(source: &str) {
    let ast = parse_template(source).unwrap();
    let rendered = serialize(&ast);
    let reparsed = parse_template(&rendered).unwrap();
    assert_eq!(reparsed, ast, "round trip failed for {source:?}, rendered as {rendered:?}");
}

#[test]
fn plain_literal_text_round_trips() {
    assert_round_trips("just some plain text, no interpolation");
}

#[test]
fn empty_template_round_trips() {
    assert_round_trips("");
}

#[test]
fn single_interpolation_preserves_native_type() {
    assert_round_trips("${var.x}");
    assert_round_trips("${42}");
    assert_round_trips("${true}");
    assert_round_trips("${null}");
}

#[test]
fn literal_and_interpolation_concatenation_round_trips() {
    assert_round_trips("${environment.name}-${var.x * 2}");
    assert_round_trips("prefix-${a.b}-suffix");
}

#[test]
fn arithmetic_and_comparison_operators_round_trip() {
    assert_round_trips("${var.x * 2 + 1}");
    assert_round_trips("${(var.x + var.y) * var.z}");
    assert_round_trips("${var.count >= 1 && var.count <= 10}");
    assert_round_trips("${var.a == var.b || var.c != var.d}");
}

#[test]
fn ternary_and_coalesce_round_trip() {
    assert_round_trips("${var.flag ? \"yes\" : \"no\"}");
    assert_round_trips("${var.a ?? var.b}");
    assert_round_trips("${var.a ?? var.b ?? \"fallback\"}");
}

#[test]
fn unary_negation_round_trips() {
    assert_round_trips("${!var.flag}");
}

#[test]
fn array_and_object_literals_round_trip() {
    assert_round_trips(r#"${[1, 2, "three"]}"#);
    assert_round_trips(r#"${{a: 1, b: "two", c: [true, null]}}"#);
}

#[test]
fn indexing_and_quoted_segments_round_trip() {
    assert_round_trips("${a.b[0]}");
    assert_round_trips(r#"${a["my-key"]}"#);
    assert_round_trips(r#"${a["my-key"]["nested-key"]}"#);
}

#[test]
fn function_calls_round_trip() {
    assert_round_trips(r#"${join(var.list, ",")}"#);
    assert_round_trips(r#"${kebabCase(var.name)}"#);
    assert_round_trips("${isEmpty(var.list)}");
}

#[test]
fn action_output_references_round_trip() {
    assert_round_trips("${actions.build.api.outputs.imageId}");
    assert_round_trips("${actions.run.seed.outputs.url}");
    assert_round_trips("${actions.build.api.version}");
}

#[test]
fn strings_with_escapes_round_trip() {
    assert_round_trips(r#"${"line\nbreak"}"#);
    assert_round_trips(r#"${"a \"quoted\" word"}"#);
}
