use crate::language::span::Span;

#[derive(Clone, Debug)]
pub struct Template {
    pub statements: Vec<Statement>,
}

/// Whether a construct's output reaches the enclosing buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputContext {
    /// Evaluated for side effects only; everything it writes is dropped.
    Statement,
    /// Preceded by `<%=`; written output lands in the enclosing buffer.
    Expression,
}

#[derive(Clone, Debug)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum Statement {
    Text(TextStmt),
    Output(OutputStmt),
    Let(LetStmt),
    Assign(AssignStmt),
    Expr(ExprStmt),
    Return(ReturnStmt),
    Break(Span),
    Continue(Span),
    If(IfStmt),
    For(ForStmt),
}

#[derive(Clone, Debug)]
pub struct TextStmt {
    pub text: String,
    pub span: Span,
}

/// `<%= expr %>`
#[derive(Clone, Debug)]
pub struct OutputStmt {
    pub expr: Expr,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct LetStmt {
    pub name: String,
    pub value: Expr,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct AssignStmt {
    pub name: Identifier,
    pub value: Expr,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_block: Block,
    pub else_branch: Option<ElseBranch>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum ElseBranch {
    Block(Block),
    If(Box<IfStmt>),
}

/// `for (key, value) in source { body }`
#[derive(Clone, Debug)]
pub struct ForStmt {
    pub bindings: LoopBindings,
    pub source: Expr,
    pub body: Block,
    pub context: OutputContext,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum LoopBindings {
    /// `(v)`: bound to each pair's value.
    Value(Identifier),
    /// `(k, v)`: bound to each pair's key and value.
    KeyValue(Identifier, Identifier),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum Literal {
    Nil(Span),
    Bool(bool, Span),
    Int(i64, Span),
    Float(f64, Span),
    String(String, Span),
}

#[derive(Clone, Debug)]
pub enum Expr {
    Identifier(Identifier),
    Literal(Literal),
    Array(Vec<Expr>, Span),
    Map(Vec<(String, Expr)>, Span),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Call {
        callee: Identifier,
        args: Vec<Expr>,
        span: Span,
    },
    FieldAccess {
        base: Box<Expr>,
        field: String,
        span: Span,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Identifier(ident) => ident.span,
            Expr::Literal(Literal::Nil(span))
            | Expr::Literal(Literal::Bool(_, span))
            | Expr::Literal(Literal::Int(_, span))
            | Expr::Literal(Literal::Float(_, span))
            | Expr::Literal(Literal::String(_, span)) => *span,
            Expr::Array(_, span) | Expr::Map(_, span) => *span,
            Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Call { span, .. }
            | Expr::FieldAccess { span, .. }
            | Expr::Index { span, .. } => *span,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
        }
    }
}
