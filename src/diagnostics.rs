use crate::{
    config::ConfigError,
    language::errors::{SyntaxError, SyntaxErrors},
    runtime::{error::RuntimeError, RenderError},
};
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(plume::syntax))]
pub struct SyntaxDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("here")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
}

impl SyntaxDiagnostic {
    pub fn from_error(src: NamedSource<String>, err: &SyntaxError) -> Self {
        Self {
            src,
            span: err.to_source_span(),
            help: err.help.clone(),
            message: err.message.clone(),
        }
    }
}

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(plume::render))]
pub struct RenderDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("{label}")]
    span: SourceSpan,
    message: String,
    label: String,
}

impl RenderDiagnostic {
    pub fn from_error(src: NamedSource<String>, err: &RuntimeError) -> Self {
        Self {
            src,
            span: err.span().into(),
            message: err.to_string(),
            label: err.label().to_string(),
        }
    }
}

pub fn emit_syntax_errors(path: &Path, source: &str, errors: &SyntaxErrors) {
    let src = NamedSource::new(path.display().to_string(), source.to_string());
    for err in &errors.errors {
        let diagnostic = SyntaxDiagnostic::from_error(src.clone(), err);
        eprintln!("{:?}", Report::new(diagnostic));
    }
}

pub fn report_runtime_error(path: &Path, source: &str, error: &RuntimeError) {
    let src = NamedSource::new(path.display().to_string(), source.to_string());
    eprintln!("{:?}", Report::new(RenderDiagnostic::from_error(src, error)));
}

pub fn report_render_error(path: &Path, source: &str, error: &RenderError) {
    match error {
        RenderError::Syntax(errors) => emit_syntax_errors(path, source, errors),
        RenderError::Runtime { error, .. } => report_runtime_error(path, source, error),
    }
}

pub fn report_config_error(error: &ConfigError) {
    eprintln!("{:?}", Report::msg(error.to_string()));
}

pub fn report_io_error(path: &Path, error: &std::io::Error) {
    eprintln!("Failed to access {}: {}", path.display(), error);
}
