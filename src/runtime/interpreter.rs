use crate::config::RenderOptions;
use crate::language::{
    ast::*,
    parser::MAX_NESTING,
    span::{LineIndex, Span},
};
use crate::runtime::{
    environment::{NotFound, Scope},
    error::{RuntimeError, RuntimeResult},
    output::OutputSink,
    value::Value,
};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Out-of-band result of a statement: why a block stopped early.
#[derive(Clone, Debug, PartialEq)]
pub enum FlowSignal {
    Break(Span),
    Continue(Span),
    Return(Value),
}

/// Outcome of evaluating a block: its last value, or the signal that cut it
/// short.
#[derive(Clone, Debug, PartialEq)]
pub enum BlockEval {
    Value(Value),
    Flow(FlowSignal),
}

/// Tree-walking evaluator for one render of one template.
pub struct Interpreter {
    lines: LineIndex,
    options: RenderOptions,
    depth: usize,
    expr_depth: usize,
}

impl Interpreter {
    pub fn new(source: &str, options: RenderOptions) -> Self {
        Self {
            lines: LineIndex::new(source),
            options,
            depth: 0,
            expr_depth: 0,
        }
    }

    /// Evaluates every top-level statement of `template` in `scope`.
    ///
    /// A top-level `return` ends the render early, keeping what was written
    /// so far; `break` and `continue` outside any loop are errors.
    pub fn render_template(
        &mut self,
        template: &Template,
        scope: &Scope,
        sink: &mut OutputSink,
    ) -> RuntimeResult<()> {
        tracing::debug!(statements = template.statements.len(), "rendering template");
        match self.eval_statements(&template.statements, scope, sink)? {
            BlockEval::Value(_) => Ok(()),
            BlockEval::Flow(FlowSignal::Return(_)) => {
                tracing::debug!("top-level return, stopping render");
                Ok(())
            }
            BlockEval::Flow(FlowSignal::Break(span)) => Err(self.stray_control("break", span)),
            BlockEval::Flow(FlowSignal::Continue(span)) => {
                Err(self.stray_control("continue", span))
            }
        }
    }

    /// Runs `block` directly in `scope`; callers create the child scope.
    pub fn eval_block(
        &mut self,
        block: &Block,
        scope: &Scope,
        sink: &mut OutputSink,
    ) -> RuntimeResult<BlockEval> {
        if self.depth >= self.options.max_depth {
            return Err(RuntimeError::DepthLimit {
                limit: self.options.max_depth,
                line: self.line_of(block.span),
                span: block.span,
            });
        }
        self.depth += 1;
        let result = self.eval_statements(&block.statements, scope, sink);
        self.depth -= 1;
        result
    }

    fn eval_statements(
        &mut self,
        statements: &[Statement],
        scope: &Scope,
        sink: &mut OutputSink,
    ) -> RuntimeResult<BlockEval> {
        let mut last = Value::Nil;
        for statement in statements {
            match self.eval_statement(statement, scope, sink)? {
                BlockEval::Value(value) => last = value,
                flow @ BlockEval::Flow(_) => return Ok(flow),
            }
        }
        Ok(BlockEval::Value(last))
    }

    fn eval_statement(
        &mut self,
        statement: &Statement,
        scope: &Scope,
        sink: &mut OutputSink,
    ) -> RuntimeResult<BlockEval> {
        match statement {
            Statement::Text(stmt) => {
                sink.write(&stmt.text);
                Ok(BlockEval::Value(Value::Nil))
            }
            Statement::Output(stmt) => {
                let value = self.eval_expression(&stmt.expr, scope)?;
                sink.within(OutputContext::Expression, |sink| {
                    sink.write(&value.to_string())
                });
                Ok(BlockEval::Value(Value::Nil))
            }
            Statement::Let(stmt) => {
                let value = self.eval_expression(&stmt.value, scope)?;
                scope.declare(&stmt.name, value);
                Ok(BlockEval::Value(Value::Nil))
            }
            Statement::Assign(stmt) => {
                let value = self.eval_expression(&stmt.value, scope)?;
                scope
                    .assign(&stmt.name.name, value)
                    .map_err(|NotFound| self.unknown_identifier(&stmt.name))?;
                Ok(BlockEval::Value(Value::Nil))
            }
            Statement::Expr(stmt) => Ok(BlockEval::Value(self.eval_expression(&stmt.expr, scope)?)),
            Statement::Return(stmt) => {
                let value = match &stmt.value {
                    Some(expr) => self.eval_expression(expr, scope)?,
                    None => Value::Nil,
                };
                Ok(BlockEval::Flow(FlowSignal::Return(value)))
            }
            Statement::Break(span) => Ok(BlockEval::Flow(FlowSignal::Break(*span))),
            Statement::Continue(span) => Ok(BlockEval::Flow(FlowSignal::Continue(*span))),
            Statement::If(stmt) => self.eval_if(stmt, scope, sink),
            Statement::For(stmt) => {
                self.evaluate_for(stmt, scope, sink)?;
                Ok(BlockEval::Value(Value::Nil))
            }
        }
    }

    /// Conditional bodies run in their own child scope and forward any
    /// control signal untouched.
    fn eval_if(
        &mut self,
        stmt: &IfStmt,
        scope: &Scope,
        sink: &mut OutputSink,
    ) -> RuntimeResult<BlockEval> {
        if self.eval_expression(&stmt.condition, scope)?.as_bool() {
            return self.eval_block(&stmt.then_block, &scope.child(), sink);
        }
        match &stmt.else_branch {
            Some(ElseBranch::Block(block)) => self.eval_block(block, &scope.child(), sink),
            Some(ElseBranch::If(nested)) => self.eval_if(nested, scope, sink),
            None => Ok(BlockEval::Value(Value::Nil)),
        }
    }

    /// Expressions nest at most [`MAX_NESTING`] levels, whatever built the
    /// tree.
    pub fn eval_expression(&mut self, expr: &Expr, scope: &Scope) -> RuntimeResult<Value> {
        if self.expr_depth >= MAX_NESTING {
            let span = expr.span();
            return Err(RuntimeError::DepthLimit {
                limit: MAX_NESTING,
                line: self.line_of(span),
                span,
            });
        }
        self.expr_depth += 1;
        let result = self.eval_expression_inner(expr, scope);
        self.expr_depth -= 1;
        result
    }

    fn eval_expression_inner(&mut self, expr: &Expr, scope: &Scope) -> RuntimeResult<Value> {
        match expr {
            Expr::Identifier(ident) => scope
                .lookup(&ident.name)
                .ok_or_else(|| self.unknown_identifier(ident)),
            Expr::Literal(literal) => Ok(match literal {
                Literal::Nil(_) => Value::Nil,
                Literal::Bool(value, _) => Value::Bool(*value),
                Literal::Int(value, _) => Value::Int(*value),
                Literal::Float(value, _) => Value::Float(*value),
                Literal::String(value, _) => Value::String(value.clone()),
            }),
            Expr::Array(items, _) => {
                let values = items
                    .iter()
                    .map(|item| self.eval_expression(item, scope))
                    .collect::<RuntimeResult<Vec<_>>>()?;
                Ok(Value::Array(Rc::new(values)))
            }
            Expr::Map(entries, _) => {
                let mut map = BTreeMap::new();
                for (key, value) in entries {
                    map.insert(key.clone(), self.eval_expression(value, scope)?);
                }
                Ok(Value::Map(Rc::new(map)))
            }
            Expr::Unary { op, expr, span } => {
                let value = self.eval_expression(expr, scope)?;
                match (op, value) {
                    (UnaryOp::Not, value) => Ok(Value::Bool(!value.as_bool())),
                    (UnaryOp::Neg, Value::Int(v)) => Ok(Value::Int(v.wrapping_neg())),
                    (UnaryOp::Neg, Value::Float(v)) => Ok(Value::Float(-v)),
                    (UnaryOp::Neg, other) => Err(self.type_mismatch(
                        format!("cannot negate {}", other.type_name()),
                        *span,
                    )),
                }
            }
            Expr::Binary {
                op,
                left,
                right,
                span,
            } => {
                let left = self.eval_expression(left, scope)?;
                // `&&` and `||` skip the right operand once the left decides.
                let right = match op {
                    BinaryOp::And if !left.as_bool() => return Ok(Value::Bool(false)),
                    BinaryOp::Or if left.as_bool() => return Ok(Value::Bool(true)),
                    _ => self.eval_expression(right, scope)?,
                };
                self.eval_binary(*op, left, right, *span)
            }
            Expr::Call { callee, args, span } => {
                let target = scope
                    .lookup(&callee.name)
                    .ok_or_else(|| self.unknown_identifier(callee))?;
                let Value::Helper(helper) = target else {
                    return Err(RuntimeError::NotCallable {
                        name: callee.name.clone(),
                        line: self.line_of(*span),
                        span: *span,
                    });
                };
                let args = args
                    .iter()
                    .map(|arg| self.eval_expression(arg, scope))
                    .collect::<RuntimeResult<Vec<_>>>()?;
                helper.call(&args).map_err(|message| RuntimeError::Helper {
                    name: helper.name.clone(),
                    message,
                    line: self.line_of(*span),
                    span: *span,
                })
            }
            Expr::FieldAccess { base, field, span } => {
                let base = self.eval_expression(base, scope)?;
                let found = match &base {
                    Value::Map(entries) => entries.get(field).cloned(),
                    _ => None,
                };
                found.ok_or_else(|| RuntimeError::UnknownField {
                    field: field.clone(),
                    type_name: base.type_name(),
                    line: self.line_of(*span),
                    span: *span,
                })
            }
            Expr::Index { base, index, span } => {
                let base = self.eval_expression(base, scope)?;
                let index = self.eval_expression(index, scope)?;
                self.eval_index(base, index, *span)
            }
        }
    }

    fn eval_index(&self, base: Value, index: Value, span: Span) -> RuntimeResult<Value> {
        match (&base, &index) {
            (Value::Array(items), Value::Int(position)) => usize::try_from(*position)
                .ok()
                .and_then(|idx| items.get(idx))
                .cloned()
                .ok_or_else(|| RuntimeError::IndexOutOfBounds {
                    index: *position,
                    len: items.len(),
                    line: self.line_of(span),
                    span,
                }),
            (Value::Map(entries), Value::String(key)) => {
                Ok(entries.get(key).cloned().unwrap_or(Value::Nil))
            }
            _ => Err(self.type_mismatch(
                format!(
                    "cannot index {} with {}",
                    base.type_name(),
                    index.type_name()
                ),
                span,
            )),
        }
    }

    fn eval_binary(
        &self,
        op: BinaryOp,
        left: Value,
        right: Value,
        span: Span,
    ) -> RuntimeResult<Value> {
        match op {
            BinaryOp::Add
                if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) =>
            {
                Ok(Value::String(format!("{left}{right}")))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                self.eval_numeric(op, left, right, span)
            }
            BinaryOp::Eq => Ok(Value::Bool(left == right)),
            BinaryOp::NotEq => Ok(Value::Bool(left != right)),
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                self.eval_compare(op, left, right, span)
            }
            // The left operand did not decide the result, so the right one does.
            BinaryOp::And | BinaryOp::Or => Ok(Value::Bool(right.as_bool())),
        }
    }

    fn eval_numeric(
        &self,
        op: BinaryOp,
        left: Value,
        right: Value,
        span: Span,
    ) -> RuntimeResult<Value> {
        match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => {
                let (a, b) = (*a, *b);
                if matches!(op, BinaryOp::Div | BinaryOp::Rem) && b == 0 {
                    return Err(RuntimeError::DivisionByZero {
                        line: self.line_of(span),
                        span,
                    });
                }
                let result = match op {
                    BinaryOp::Add => a.checked_add(b),
                    BinaryOp::Sub => a.checked_sub(b),
                    BinaryOp::Mul => a.checked_mul(b),
                    BinaryOp::Div => a.checked_div(b),
                    _ => a.checked_rem(b),
                };
                result.map(Value::Int).ok_or_else(|| {
                    self.type_mismatch(format!("integer overflow in `{}`", op.symbol()), span)
                })
            }
            _ => {
                let (Some(a), Some(b)) = (as_f64(&left), as_f64(&right)) else {
                    return Err(self.type_mismatch(
                        format!(
                            "cannot apply `{}` to {} and {}",
                            op.symbol(),
                            left.type_name(),
                            right.type_name()
                        ),
                        span,
                    ));
                };
                if matches!(op, BinaryOp::Div | BinaryOp::Rem) && b == 0.0 {
                    return Err(RuntimeError::DivisionByZero {
                        line: self.line_of(span),
                        span,
                    });
                }
                Ok(Value::Float(match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    _ => a % b,
                }))
            }
        }
    }

    fn eval_compare(
        &self,
        op: BinaryOp,
        left: Value,
        right: Value,
        span: Span,
    ) -> RuntimeResult<Value> {
        let ordering = match (&left, &right) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => match (as_f64(&left), as_f64(&right)) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        };
        let Some(ordering) = ordering else {
            return Err(self.type_mismatch(
                format!(
                    "cannot compare {} with {}",
                    left.type_name(),
                    right.type_name()
                ),
                span,
            ));
        };
        Ok(Value::Bool(match op {
            BinaryOp::Lt => ordering.is_lt(),
            BinaryOp::LtEq => ordering.is_le(),
            BinaryOp::Gt => ordering.is_gt(),
            _ => ordering.is_ge(),
        }))
    }

    pub(crate) fn line_of(&self, span: Span) -> usize {
        self.lines.line(span.start)
    }

    fn unknown_identifier(&self, ident: &Identifier) -> RuntimeError {
        RuntimeError::UnknownIdentifier {
            name: ident.name.clone(),
            line: self.line_of(ident.span),
            span: ident.span,
        }
    }

    fn type_mismatch(&self, message: String, span: Span) -> RuntimeError {
        RuntimeError::TypeMismatch {
            message,
            line: self.line_of(span),
            span,
        }
    }

    fn stray_control(&self, keyword: &'static str, span: Span) -> RuntimeError {
        RuntimeError::StrayControl {
            keyword,
            line: self.line_of(span),
            span,
        }
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int(v) => Some(*v as f64),
        Value::Float(v) => Some(*v),
        _ => None,
    }
}
