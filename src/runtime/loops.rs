//! The `for` loop engine.
//!
//! A loop normalizes its source into a pair stream, runs the body once per
//! pair in a fresh child scope, and folds each iteration's result into the
//! output according to the loop's [`OutputContext`].

use crate::language::ast::{ForStmt, LoopBindings, OutputContext};
use crate::runtime::{
    environment::Scope,
    error::{RuntimeError, RuntimeResult},
    interpreter::{BlockEval, FlowSignal, Interpreter},
    iterable::{normalize, NotIterable, Pair, PairStream},
    output::OutputSink,
    value::Value,
};

impl Interpreter {
    /// Runs `stmt` against `scope`, the scope active where the loop appears.
    ///
    /// Bindings made by an iteration live in that iteration's own scope and
    /// are gone when it ends; assignments to names declared outside the loop
    /// go through to the outer binding.
    pub fn evaluate_for(
        &mut self,
        stmt: &ForStmt,
        scope: &Scope,
        sink: &mut OutputSink,
    ) -> RuntimeResult<()> {
        let line = self.line_of(stmt.span);
        let _span = tracing::debug_span!("for", line, context = ?stmt.context).entered();

        if let LoopBindings::KeyValue(key, value) = &stmt.bindings {
            if key.name == value.name {
                return Err(RuntimeError::MalformedBinding {
                    name: value.name.clone(),
                    line: self.line_of(value.span),
                    span: value.span,
                });
            }
        }

        let source = self.eval_expression(&stmt.source, scope)?;
        let source_span = stmt.source.span();
        let pairs = normalize(source).map_err(|NotIterable(type_name)| {
            RuntimeError::NotIterable {
                type_name,
                line: self.line_of(source_span),
                span: source_span,
            }
        })?;

        tracing::debug!(expected = pairs.size_hint().0, "loop started");
        let iterations = sink.within(stmt.context, |sink| {
            self.run_iterations(stmt, pairs, scope, sink)
        })?;
        tracing::debug!(iterations, "loop finished");
        Ok(())
    }

    fn run_iterations(
        &mut self,
        stmt: &ForStmt,
        pairs: PairStream,
        scope: &Scope,
        sink: &mut OutputSink,
    ) -> RuntimeResult<usize> {
        let mut iterations = 0;
        for pair in pairs {
            iterations += 1;
            let iteration = scope.child();
            bind(&stmt.bindings, pair, &iteration);

            match self.eval_block(&stmt.body, &iteration, sink)? {
                BlockEval::Value(value) => contribute(stmt.context, &value, sink),
                BlockEval::Flow(FlowSignal::Return(value)) => {
                    tracing::trace!(iteration = iterations, "return");
                    contribute(stmt.context, &value, sink);
                }
                BlockEval::Flow(FlowSignal::Continue(_)) => {
                    tracing::trace!(iteration = iterations, "continue");
                }
                BlockEval::Flow(FlowSignal::Break(_)) => {
                    tracing::trace!(iteration = iterations, "break");
                    break;
                }
            }
        }
        Ok(iterations)
    }
}

fn bind(bindings: &LoopBindings, pair: Pair, iteration: &Scope) {
    match bindings {
        LoopBindings::Value(value) => iteration.declare(&value.name, pair.value),
        LoopBindings::KeyValue(key, value) => {
            iteration.declare(&key.name, pair.key);
            iteration.declare(&value.name, pair.value);
        }
    }
}

/// Appends an iteration's result when the loop itself is being output.
fn contribute(context: OutputContext, value: &Value, sink: &mut OutputSink) {
    if context == OutputContext::Expression {
        sink.write(&value.to_string());
    }
}
