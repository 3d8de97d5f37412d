use crate::language::span::Span;
use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Render-time failures. Every variant carries the 1-based line and the byte
/// span of the construct that failed.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuntimeError {
    #[error("line {line}: \"{name}\": unknown identifier")]
    UnknownIdentifier {
        name: String,
        line: usize,
        span: Span,
    },
    #[error("line {line}: cannot iterate over {type_name}")]
    NotIterable {
        type_name: &'static str,
        line: usize,
        span: Span,
    },
    #[error("line {line}: loop binds `{name}` twice")]
    MalformedBinding {
        name: String,
        line: usize,
        span: Span,
    },
    #[error("line {line}: index {index} out of range for length {len}")]
    IndexOutOfBounds {
        index: i64,
        len: usize,
        line: usize,
        span: Span,
    },
    #[error("line {line}: {type_name} has no field `{field}`")]
    UnknownField {
        field: String,
        type_name: &'static str,
        line: usize,
        span: Span,
    },
    #[error("line {line}: type mismatch: {message}")]
    TypeMismatch {
        message: String,
        line: usize,
        span: Span,
    },
    #[error("line {line}: division by zero")]
    DivisionByZero { line: usize, span: Span },
    #[error("line {line}: `{name}` is not a helper")]
    NotCallable {
        name: String,
        line: usize,
        span: Span,
    },
    #[error("line {line}: {name}: {message}")]
    Helper {
        name: String,
        message: String,
        line: usize,
        span: Span,
    },
    #[error("line {line}: `{keyword}` outside of a loop")]
    StrayControl {
        keyword: &'static str,
        line: usize,
        span: Span,
    },
    #[error("line {line}: blocks nested deeper than {limit}")]
    DepthLimit {
        limit: usize,
        line: usize,
        span: Span,
    },
}

impl RuntimeError {
    pub fn line(&self) -> usize {
        match self {
            RuntimeError::UnknownIdentifier { line, .. }
            | RuntimeError::NotIterable { line, .. }
            | RuntimeError::MalformedBinding { line, .. }
            | RuntimeError::IndexOutOfBounds { line, .. }
            | RuntimeError::UnknownField { line, .. }
            | RuntimeError::TypeMismatch { line, .. }
            | RuntimeError::DivisionByZero { line, .. }
            | RuntimeError::NotCallable { line, .. }
            | RuntimeError::Helper { line, .. }
            | RuntimeError::StrayControl { line, .. }
            | RuntimeError::DepthLimit { line, .. } => *line,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            RuntimeError::UnknownIdentifier { span, .. }
            | RuntimeError::NotIterable { span, .. }
            | RuntimeError::MalformedBinding { span, .. }
            | RuntimeError::IndexOutOfBounds { span, .. }
            | RuntimeError::UnknownField { span, .. }
            | RuntimeError::TypeMismatch { span, .. }
            | RuntimeError::DivisionByZero { span, .. }
            | RuntimeError::NotCallable { span, .. }
            | RuntimeError::Helper { span, .. }
            | RuntimeError::StrayControl { span, .. }
            | RuntimeError::DepthLimit { span, .. } => *span,
        }
    }

    /// Short label shown under the failing source in diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            RuntimeError::UnknownIdentifier { .. } => "not declared in any enclosing scope",
            RuntimeError::NotIterable { .. } => "loop source",
            RuntimeError::MalformedBinding { .. } => "loop bindings",
            RuntimeError::IndexOutOfBounds { .. } => "index",
            RuntimeError::UnknownField { .. } => "field access",
            RuntimeError::TypeMismatch { .. } => "operands",
            RuntimeError::DivisionByZero { .. } => "divisor is zero",
            RuntimeError::NotCallable { .. } => "callee",
            RuntimeError::Helper { .. } => "helper call",
            RuntimeError::StrayControl { .. } => "no enclosing loop",
            RuntimeError::DepthLimit { .. } => "nesting limit reached here",
        }
    }
}
