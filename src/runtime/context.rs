use crate::config::RenderOptions;
use crate::runtime::{
    environment::Scope,
    helpers,
    value::{Helper, Value},
};

/// Host-side handle on the root scope of future renders.
///
/// Renders run in a child of the root scope, so `let` bindings made by a
/// template never leak back into the context.
pub struct Context {
    globals: Scope,
    options: RenderOptions,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self::with_options(RenderOptions::default())
    }

    pub fn with_options(options: RenderOptions) -> Self {
        let globals = Scope::root();
        helpers::register_builtins(&globals);
        Self { globals, options }
    }

    pub fn set(&self, name: &str, value: impl Into<Value>) {
        self.globals.declare(name, value.into());
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.globals.lookup(name)
    }

    pub fn set_helper(
        &self,
        name: &str,
        func: impl Fn(&[Value]) -> Result<Value, String> + 'static,
    ) {
        self.set(name, Value::Helper(Helper::new(name, func)));
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub(crate) fn scope(&self) -> &Scope {
        &self.globals
    }
}
