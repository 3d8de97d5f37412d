use super::{render_err, render_ok};
use crate::config::RenderOptions;
use crate::runtime::{error::RuntimeError, value::Value, Context, RenderError};
use pretty_assertions::assert_eq;

fn runtime_error(err: RenderError) -> RuntimeError {
    match err {
        RenderError::Runtime { error, .. } => error,
        RenderError::Syntax(errors) => panic!("expected runtime error, got {errors}"),
    }
}

#[test]
fn top_level_return_stops_the_render() {
    let out = render_ok("a<% return %>b", &Context::new());
    assert_eq!(out, "a");
}

#[test]
fn top_level_break_is_stray() {
    let err = runtime_error(render_err("x<% break %>", &Context::new()));
    assert!(matches!(
        err,
        RuntimeError::StrayControl {
            keyword: "break",
            ..
        }
    ));
}

#[test]
fn continue_inside_if_without_loop_is_stray() {
    let err = runtime_error(render_err(
        "<% if true { continue } %>",
        &Context::new(),
    ));
    assert_eq!(err.to_string(), "line 1: `continue` outside of a loop");
}

#[test]
fn nesting_beyond_max_depth_fails() {
    let context = Context::with_options(RenderOptions { max_depth: 2 });
    assert_eq!(
        render_ok("<%= for (a) in [1] { for (b) in [2] { } return a } %>", &context),
        "1"
    );
    let err = runtime_error(render_err(
        "<% for (a) in [1] { for (b) in [2] { if true { } } } %>",
        &context,
    ));
    assert!(matches!(err, RuntimeError::DepthLimit { limit: 2, .. }));
}

#[test]
fn division_by_zero() {
    let err = runtime_error(render_err("<%= 1 / 0 %>", &Context::new()));
    assert!(matches!(err, RuntimeError::DivisionByZero { line: 1, .. }));
    let err = runtime_error(render_err("<%= 1.5 % 0 %>", &Context::new()));
    assert!(matches!(err, RuntimeError::DivisionByZero { .. }));
}

#[test]
fn arithmetic_and_concatenation() {
    let context = Context::new();
    assert_eq!(render_ok("<%= 1 + 2 * 3 %>", &context), "7");
    assert_eq!(render_ok("<%= (1 + 2) * 3 %>", &context), "9");
    assert_eq!(render_ok("<%= 7 % 3 %>", &context), "1");
    assert_eq!(render_ok("<%= 1 + 0.5 %>", &context), "1.5");
    assert_eq!(render_ok(r#"<%= "n" + 1 %>"#, &context), "n1");
    assert_eq!(render_ok("<%= -2 + 1 %>", &context), "-1");
    assert_eq!(render_ok("<%= !nil && 1 < 2 %>", &context), "true");
}

#[test]
fn mismatched_operands_are_rejected() {
    let err = runtime_error(render_err("<%= [1] - 1 %>", &Context::new()));
    assert_eq!(
        err.to_string(),
        "line 1: type mismatch: cannot apply `-` to array and int"
    );
    let err = runtime_error(render_err(r#"<%= "a" < 1 %>"#, &Context::new()));
    assert!(matches!(err, RuntimeError::TypeMismatch { .. }));
}

#[test]
fn or_short_circuits() {
    let out = render_ok("<%= true || missing %>", &Context::new());
    assert_eq!(out, "true");
}

#[test]
fn field_and_index_access() {
    let context = Context::new();
    context.set("user", Value::map([("name", "Ada")]));
    assert_eq!(render_ok("<%= user.name %>", &context), "Ada");
    assert_eq!(render_ok(r#"<%= user["name"] %>"#, &context), "Ada");
    assert_eq!(render_ok(r#"<%= user["age"] %>"#, &context), "");
    let err = runtime_error(render_err("<%= user.age %>", &context));
    assert_eq!(err.to_string(), "line 1: map has no field `age`");
}

#[test]
fn host_helpers_are_callable() {
    let context = Context::new();
    context.set_helper("shout", |args| match args {
        [Value::String(s)] => Ok(Value::String(s.to_uppercase())),
        _ => Err("expects one string".to_string()),
    });
    assert_eq!(render_ok(r#"<%= shout("hi") %>"#, &context), "HI");
    let err = runtime_error(render_err("<%= shout(1) %>", &context));
    assert_eq!(err.to_string(), "line 1: shout: expects one string");
}

#[test]
fn calling_a_non_helper_fails() {
    let context = Context::new();
    context.set("name", "x");
    let err = runtime_error(render_err("<%= name() %>", &context));
    assert!(matches!(err, RuntimeError::NotCallable { .. }));
}

#[test]
fn len_helper() {
    let context = Context::new();
    context.set("items", Value::array([1, 2, 3]));
    assert_eq!(render_ok("<%= len(items) %>", &context), "3");
}

#[test]
fn else_if_chains() {
    let source = "<% for (v) in [1, 2, 3] { %><% if v == 1 { %>one<% } else if v == 2 { %>two<% } else { %>many<% } %><% } %>";
    assert_eq!(render_ok(source, &Context::new()), "");
    let source = "<%= for (v) in [1, 2, 3] { %><% if v == 1 { %>one<% } else if v == 2 { %>two<% } else { %>many<% } %> <% } %>";
    assert_eq!(render_ok(source, &Context::new()), "one two many ");
}

#[test]
fn comments_render_nothing() {
    assert_eq!(render_ok("a<%# hidden %>b", &Context::new()), "ab");
}

#[test]
fn syntax_errors_are_collected() {
    let err = render_err("<% let = 1 %> ok <% for (a, b, c) in x { } %>", &Context::new());
    let RenderError::Syntax(errors) = err else {
        panic!("expected syntax errors");
    };
    assert_eq!(errors.errors.len(), 2);
    assert_eq!(errors.errors[1].message, "A for loop binds one or two names");
}

#[test]
fn unclosed_block_is_a_syntax_error() {
    let err = render_err("<% for (v) in [1] { %>text", &Context::new());
    assert!(matches!(err, RenderError::Syntax(_)));
    assert_eq!(err.partial_output(), "");
}

#[test]
fn deeply_nested_template_is_rejected_not_overflowed() {
    let source = format!("<%= {}1{} %>", "(".repeat(10_000), ")".repeat(10_000));
    let err = render_err(&source, &Context::new());
    let RenderError::Syntax(errors) = err else {
        panic!("expected syntax errors");
    };
    assert_eq!(errors.errors[0].message, "Template nested too deeply");
}

#[test]
fn output_tag_rejects_statements() {
    let err = render_err("<%= if true { return 1 } %>", &Context::new());
    assert!(matches!(err, RenderError::Syntax(_)));
}

#[test]
fn ranges_print_inclusive_bounds() {
    let context = Context::new();
    assert_eq!(render_ok("<%= range(3,5) %>", &context), "3..=5");
    assert_eq!(render_ok("<%= until(0) %>", &context), "0..0");
}

#[test]
fn length_of_range_wider_than_int_is_a_helper_error() {
    let err = runtime_error(render_err(
        "<%= len(range(-5000000000000000000, 5000000000000000000)) %>",
        &Context::new(),
    ));
    assert_eq!(
        err.to_string(),
        "line 1: len: length does not fit in an int"
    );
}
