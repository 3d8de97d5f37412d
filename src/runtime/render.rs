use crate::language::{ast::Template, errors::SyntaxErrors, parser::parse_template};
use crate::runtime::{
    error::RuntimeError, interpreter::Interpreter, output::OutputSink, Context,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Syntax(#[from] SyntaxErrors),
    /// Evaluation failed; `output` holds what was rendered before the failure.
    #[error("{error}")]
    Runtime {
        #[source]
        error: RuntimeError,
        output: String,
    },
}

impl RenderError {
    pub fn partial_output(&self) -> &str {
        match self {
            RenderError::Syntax(_) => "",
            RenderError::Runtime { output, .. } => output,
        }
    }
}

pub fn render(source: &str, context: &Context) -> Result<String, RenderError> {
    let template = parse_template(source)?;
    render_template(source, &template, context)
}

/// Evaluates an already parsed template. `source` must be the text it was
/// parsed from; it is only used to map spans to line numbers.
pub fn render_template(
    source: &str,
    template: &Template,
    context: &Context,
) -> Result<String, RenderError> {
    let mut interpreter = Interpreter::new(source, context.options().clone());
    let scope = context.scope().child();
    let mut sink = OutputSink::new();
    match interpreter.render_template(template, &scope, &mut sink) {
        Ok(()) => Ok(sink.into_string()),
        Err(error) => {
            tracing::debug!(%error, "render failed");
            Err(RenderError::Runtime {
                error,
                output: sink.into_string(),
            })
        }
    }
}
