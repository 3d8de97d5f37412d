pub mod config;
pub mod diagnostics;
pub mod language;
pub mod runtime;

pub use config::{ContextFile, RenderOptions};
pub use runtime::{render, value::Value, Context, RenderError};

#[cfg(test)]
mod tests;
