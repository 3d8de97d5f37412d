pub mod context;
pub mod environment;
pub mod error;
pub mod helpers;
pub mod interpreter;
pub mod iterable;
pub mod loops;
pub mod output;
pub mod render;
pub mod value;

pub use context::Context;
pub use interpreter::Interpreter;
pub use render::{render, render_template, RenderError};
