use super::{render_err, render_ok};
use crate::runtime::{error::RuntimeError, value::Value, Context, RenderError};
use pretty_assertions::assert_eq;

fn ten() -> &'static str {
    "[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]"
}

#[test]
fn statement_loop_discards_returned_values() {
    let out = render_ok(
        r#"<% for (i,v) in ["a", "b", "c"] {return v} %>"#,
        &Context::new(),
    );
    assert_eq!(out, "");
}

#[test]
fn statement_loop_discards_text() {
    let out = render_ok(
        "a<% for (v) in [1, 2] { %>x<%= v %><% } %>b",
        &Context::new(),
    );
    assert_eq!(out, "ab");
}

#[test]
fn expression_loop_concatenates_returned_values() {
    let out = render_ok(
        r#"<%= for (i,v) in ["a", "b", "c"] {return v} %>"#,
        &Context::new(),
    );
    assert_eq!(out, "abc");
}

#[test]
fn mapping_pairs_are_key_and_value() {
    let context = Context::new();
    context.set("myMap", Value::map([("a", "A"), ("b", "B")]));
    let out = render_ok(
        r#"<%= for (k,v) in myMap { %><%= k + ":" + v%><% } %>"#,
        &context,
    );
    assert!(out.contains("a:A"), "{out}");
    assert!(out.contains("b:B"), "{out}");
}

#[test]
fn nested_loops_with_same_names_see_their_own_bindings() {
    let context = Context::new();
    context.set("myMap", Value::map([("a", "A")]));
    context.set("myMap2", Value::map([("b", "B")]));
    let out = render_ok(
        r#"<%= for (k,v) in myMap { %><%=  for (k,v) in myMap2 { %><%= k + ":" + v%><% } %>%><%}%>"#,
        &context,
    );
    assert!(out.contains("b:B"), "{out}");
    assert!(!out.contains("a:A"), "{out}");
}

#[test]
fn nested_loop_restores_outer_bindings() {
    let out = render_ok(
        "<%= for (v) in [1, 2] { %><%= for (v) in [7] { return v } %><%= v %>;<% } %>",
        &Context::new(),
    );
    assert_eq!(out, "71;72;");
}

#[test]
fn continue_keeps_fragments_written_before_it() {
    let source = format!(
        "<%= for (i,v) in {} {{
        %>Start<%
        if (v == 1 || v ==3 || v == 5 || v == 7 || v == 9) {{
            %>Odd<%
            continue
        }}
        return v
        }} %>",
        ten()
    );
    assert_eq!(
        render_ok(&source, &Context::new()),
        "StartOddStart2StartOddStart4StartOddStart6StartOddStart8StartOddStart10"
    );
}

#[test]
fn continue_on_every_iteration_outputs_nothing() {
    let source = format!(
        "<%= for (i,v) in {} {{
        if (v >= 1) {{
            continue
        }}
        return v
        }} %>",
        ten()
    );
    assert_eq!(render_ok(&source, &Context::new()), "");
}

#[test]
fn empty_conditional_body_falls_through() {
    let source = format!(
        "<%= for (i,v) in {} {{
        if (v == 1 || v ==3 || v == 5 || v == 7 || v == 9) {{
        }}
        return v
        }} %>",
        ten()
    );
    assert_eq!(render_ok(&source, &Context::new()), "12345678910");
}

#[test]
fn unconditional_continue_skips_the_rest_of_the_body() {
    let source = format!("<%= for (i,v) in {} {{\n continue\n return v\n }} %>", ten());
    assert_eq!(render_ok(&source, &Context::new()), "");
}

#[test]
fn break_keeps_fragments_of_the_breaking_iteration() {
    let source = format!(
        "<%= for (i,v) in {} {{
        %>Start<%
        if (v == 5) {{
            %>Odd<%
            break
        }}
        return v
        }} %>",
        ten()
    );
    assert_eq!(
        render_ok(&source, &Context::new()),
        "Start1Start2Start3Start4StartOdd"
    );
}

#[test]
fn break_on_first_value_outputs_nothing() {
    let source = format!(
        "<%= for (i,v) in {} {{
        if (v == 1 || v ==3) {{
            break
        }}
        return v
        }} %>",
        ten()
    );
    assert_eq!(render_ok(&source, &Context::new()), "");
}

#[test]
fn output_before_break_survives() {
    let source = format!(
        "<%= for (i,v) in {} {{
        if (v == 1 || v ==3) {{
            %><%=v%><%
            break
        }}
        return v
        }} %>",
        ten()
    );
    assert_eq!(render_ok(&source, &Context::new()), "1");
}

#[test]
fn unconditional_break_stops_immediately() {
    let source = format!("<%= for (i,v) in {} {{\n break\n return v\n }} %>", ten());
    assert_eq!(render_ok(&source, &Context::new()), "");
}

#[test]
fn single_binding_takes_the_value() {
    let out = render_ok(
        r#"<%= for (v) in ["a", "b", "c"] {%><%=v%><%} %>"#,
        &Context::new(),
    );
    assert_eq!(out, "abc");
}

#[test]
fn two_bindings_take_position_and_value() {
    let out = render_ok(
        r#"<%= for (i,v) in ["a", "b", "c"] {%><%=i%><%=v%><%} %>"#,
        &Context::new(),
    );
    assert_eq!(out, "0a1b2c");
}

#[test]
fn range_helpers_drive_loops() {
    let context = Context::new();
    assert_eq!(
        render_ok("<%= for (v) in range(3,5) { %><%=v%><% } %>", &context),
        "345"
    );
    assert_eq!(
        render_ok("<%= for (v) in between(3,6) { %><%=v%><% } %>", &context),
        "45"
    );
    assert_eq!(
        render_ok("<%= for (v) in until(3) { %><%=v%><% } %>", &context),
        "012"
    );
}

#[test]
fn generator_key_is_the_ordinal() {
    let out = render_ok(
        "<%= for (k, v) in range(5, 7) { %><%= k %>=<%= v %> <% } %>",
        &Context::new(),
    );
    assert_eq!(out, "0=5 1=6 2=7 ");
}

#[test]
fn even_numbers_via_continue() {
    let out = render_ok(
        "<%= for (v) in range(1,10) { if (v % 2 == 1) { continue }; return v } %>",
        &Context::new(),
    );
    assert_eq!(out, "246810");
}

#[test]
fn numbers_until_break() {
    let out = render_ok(
        "<%= for (v) in range(1,10) { if (v == 5) { break }; return v } %>",
        &Context::new(),
    );
    assert_eq!(out, "1234");
}

#[test]
fn body_result_is_its_last_value() {
    let out = render_ok(
        r#"<%= for (v) in [1, 2] { v * 10 } %>"#,
        &Context::new(),
    );
    assert_eq!(out, "1020");
}

#[test]
fn empty_mapping_iterates_zero_times() {
    let out = render_ok("<%= for (k,v) in {} { return k } %>", &Context::new());
    assert_eq!(out, "");
}

#[test]
fn empty_collection_from_index_renders_nothing() {
    let context = Context::new();
    context.set(
        "flash",
        Value::map([("errors", Value::array(Vec::<Value>::new()))]),
    );
    let source = r#"
	<%= for (k, v) in flash["errors"] { %>
		Flash:
			<%= k %>:<%= v %>
	<% } %>
"#;
    assert_eq!(render_ok(source, &context).trim(), "");
}

#[test]
fn missing_key_in_empty_mapping_is_not_iterable() {
    let context = Context::new();
    context.set("flash", Value::map(Vec::<(String, Value)>::new()));
    let source = r#"
	<%= for (k, v) in flash["errors"] { %>
		Flash:
			<%= k %>:<%= v %>
	<% } %>
"#;
    let err = render_err(source, &context);
    assert_eq!(err.partial_output().trim(), "");
    assert!(matches!(
        err,
        RenderError::Runtime {
            error: RuntimeError::NotIterable {
                type_name: "nil",
                line: 2,
                ..
            },
            ..
        }
    ));
}

#[test]
fn wide_range_loop_stops_at_break() {
    let out = render_ok(
        "<%= for (v) in range(-5000000000000000000, 5000000000000000000) { if v >= -4999999999999999998 { break }; return v } %>",
        &Context::new(),
    );
    assert_eq!(out, "-5000000000000000000-4999999999999999999");
}

#[test]
fn nil_source_is_not_iterable() {
    let context = Context::new();
    context.set("nilValue", Value::Nil);
    let err = render_err("<% for (i,v) in nilValue {return v} %>", &context);
    assert_eq!(err.partial_output(), "");
    assert!(matches!(
        err,
        RenderError::Runtime {
            error: RuntimeError::NotIterable {
                type_name: "nil",
                line: 1,
                ..
            },
            ..
        }
    ));
}

#[test]
fn out_of_bounds_index_in_source_fails() {
    let context = Context::new();
    context.set(
        "product_listing",
        Value::map([("Products", Value::array(Vec::<Value>::new()))]),
    );
    let err = render_err(
        "<%= for (i, names) in product_listing.Products[0].Name { %>
				<%= splt %>
			<% } %>",
        &context,
    );
    assert!(matches!(
        err,
        RenderError::Runtime {
            error: RuntimeError::IndexOutOfBounds { index: 0, len: 0, .. },
            ..
        }
    ));
}

#[test]
fn repeated_binding_name_is_malformed() {
    let err = render_err("<%= for (v, v) in [1] { return v } %>", &Context::new());
    assert!(matches!(
        err,
        RenderError::Runtime {
            error: RuntimeError::MalformedBinding { .. },
            ..
        }
    ));
}

#[test]
fn loop_inside_if_returns_through_the_loop_only() {
    let out = render_ok(
        "<%= for (v) in [1, 2, 3] { if (v > 1) { return v * 2 }; return 0 } %>",
        &Context::new(),
    );
    assert_eq!(out, "046");
}
