use crate::language::ast::OutputContext;

/// The render buffer plus the stack of output regions currently open.
///
/// Text is appended only while every open region is
/// [`OutputContext::Expression`]; once any statement-context region is open,
/// writes are dropped until it closes.
#[derive(Debug, Default)]
pub struct OutputSink {
    buffer: String,
    regions: Vec<OutputContext>,
    suppressed: usize,
}

impl OutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_capturing(&self) -> bool {
        self.suppressed == 0
    }

    pub fn write(&mut self, text: &str) {
        if self.is_capturing() {
            self.buffer.push_str(text);
        }
    }

    pub fn enter(&mut self, context: OutputContext) {
        if context == OutputContext::Statement {
            self.suppressed += 1;
        }
        self.regions.push(context);
    }

    pub fn leave(&mut self) {
        if self.regions.pop() == Some(OutputContext::Statement) {
            self.suppressed -= 1;
        }
    }

    /// Runs `f` inside a region of the given context and closes it afterwards,
    /// whatever `f` returns.
    pub fn within<T>(&mut self, context: OutputContext, f: impl FnOnce(&mut Self) -> T) -> T {
        self.enter(context);
        let result = f(self);
        self.leave();
        result
    }

    pub fn depth(&self) -> usize {
        self.regions.len()
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn into_string(self) -> String {
        self.buffer
    }
}
