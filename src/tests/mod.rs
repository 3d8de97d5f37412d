mod errors;
mod loops;

use crate::runtime::{render, Context, RenderError};

fn render_ok(source: &str, context: &Context) -> String {
    render(source, context).unwrap_or_else(|err| panic!("render failed: {err}"))
}

fn render_err(source: &str, context: &Context) -> RenderError {
    match render(source, context) {
        Ok(output) => panic!("expected render error, got output {output:?}"),
        Err(err) => err,
    }
}
