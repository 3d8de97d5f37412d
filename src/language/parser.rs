use crate::language::{
    ast::*,
    errors::{SyntaxError, SyntaxErrors},
    lexer::lex,
    span::Span,
    token::{Token, TokenKind},
};

/// Deepest nesting of blocks and expressions a template may use.
pub const MAX_NESTING: usize = 128;

pub fn parse_template(source: &str) -> Result<Template, SyntaxErrors> {
    let tokens = match lex(source) {
        Ok(tokens) => tokens,
        Err(errors) => {
            let errs = errors
                .into_iter()
                .map(|err| SyntaxError::new(err.message, err.span))
                .collect();
            return Err(SyntaxErrors::new(errs));
        }
    };
    Parser::new(tokens).parse()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    errors: Vec<SyntaxError>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            errors: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Template, SyntaxErrors> {
        let mut statements = Vec::new();

        while !self.is_eof() {
            if self.skip_separator() {
                continue;
            }
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.report(err);
                    self.synchronize_tag();
                }
            }
        }

        if self.errors.is_empty() {
            Ok(Template { statements })
        } else {
            Err(SyntaxErrors::new(self.errors))
        }
    }

    fn parse_block(&mut self) -> Result<Block, SyntaxError> {
        self.nested(Self::parse_block_body)
    }

    fn parse_block_body(&mut self) -> Result<Block, SyntaxError> {
        let start = self.expect(TokenKind::LBrace)?.span.start;
        let mut statements = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            if self.skip_separator() {
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        if self.is_eof() {
            return Err(self
                .error_here("Unclosed block")
                .with_help("every `{` needs a matching `}`, possibly in a later tag"));
        }
        let end = self.expect(TokenKind::RBrace)?.span.end;
        Ok(Block {
            statements,
            span: Span::new(start, end),
        })
    }

    fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Text(text)) => {
                let span = self.advance().span;
                return Ok(Statement::Text(TextStmt { text, span }));
            }
            Some(TokenKind::OpenOutput) => {
                let start = self.advance().span.start;
                return self.parse_output(start);
            }
            _ => {}
        }

        if self.matches(TokenKind::Let) {
            let start = self.previous_start();
            let name = self.expect_identifier("Expected binding name after 'let'")?;
            self.expect(TokenKind::Eq)?;
            let value = self.parse_expression()?;
            let span = Span::new(start, value.span().end);
            return Ok(Statement::Let(LetStmt {
                name: name.name,
                value,
                span,
            }));
        }
        if self.matches(TokenKind::If) {
            let start = self.previous_start();
            return self.parse_if(start).map(Statement::If);
        }
        if self.matches(TokenKind::For) {
            return self
                .parse_for(OutputContext::Statement)
                .map(Statement::For);
        }
        if self.matches(TokenKind::Return) {
            return self.parse_return().map(Statement::Return);
        }
        if self.matches(TokenKind::Break) {
            let span = self.previous_span();
            return Ok(Statement::Break(span));
        }
        if self.matches(TokenKind::Continue) {
            let span = self.previous_span();
            return Ok(Statement::Continue(span));
        }
        if self.starts_assignment() {
            let name = self.expect_identifier("Expected assignment target")?;
            self.expect(TokenKind::Eq)?;
            let value = self.parse_expression()?;
            let span = name.span.union(value.span());
            return Ok(Statement::Assign(AssignStmt { name, value, span }));
        }

        let expr = self.parse_expression()?;
        let span = expr.span();
        Ok(Statement::Expr(ExprStmt { expr, span }))
    }

    /// Body of a `<%= … %>` tag.
    fn parse_output(&mut self, start: usize) -> Result<Statement, SyntaxError> {
        if self.matches(TokenKind::For) {
            return self
                .parse_for(OutputContext::Expression)
                .map(Statement::For);
        }
        let is_statement = matches!(
            self.peek_kind(),
            Some(
                TokenKind::Let
                    | TokenKind::If
                    | TokenKind::Return
                    | TokenKind::Break
                    | TokenKind::Continue
            )
        );
        if is_statement || self.starts_assignment() {
            return Err(self
                .error_here("Only expressions and `for` loops can be output")
                .with_help("use `<% … %>` for statements"));
        }
        let expr = self.parse_expression()?;
        let span = Span::new(start, expr.span().end);
        Ok(Statement::Output(OutputStmt { expr, span }))
    }

    fn parse_if(&mut self, start: usize) -> Result<IfStmt, SyntaxError> {
        let condition = self.parse_expression()?;
        let then_block = self.parse_block()?;
        let mut end = then_block.span.end;

        let else_branch = if self.peek_past_separators() == Some(TokenKind::Else) {
            while self.skip_separator() {}
            self.expect(TokenKind::Else)?;
            if self.matches(TokenKind::If) {
                let nested_start = self.previous_start();
                let nested = self.nested(|parser| parser.parse_if(nested_start))?;
                end = nested.span.end;
                Some(ElseBranch::If(Box::new(nested)))
            } else {
                let block = self.parse_block()?;
                end = block.span.end;
                Some(ElseBranch::Block(block))
            }
        } else {
            None
        };

        Ok(IfStmt {
            condition,
            then_block,
            else_branch,
            span: Span::new(start, end),
        })
    }

    fn parse_for(&mut self, context: OutputContext) -> Result<ForStmt, SyntaxError> {
        let start = self.previous_start();
        self.expect(TokenKind::LParen)?;
        let first = self.expect_identifier("Expected loop binding name")?;
        let bindings = if self.matches(TokenKind::Comma) {
            let second = self.expect_identifier("Expected loop value name after ','")?;
            LoopBindings::KeyValue(first, second)
        } else {
            LoopBindings::Value(first)
        };
        if self.check(TokenKind::Comma) {
            return Err(self
                .error_here("A for loop binds one or two names")
                .with_help("use `(value)` or `(key, value)`"));
        }
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::In)?;
        let source = self.parse_expression()?;
        let body = self.parse_block()?;
        let span = Span::new(start, body.span.end);
        Ok(ForStmt {
            bindings,
            source,
            body,
            context,
            span,
        })
    }

    fn parse_return(&mut self) -> Result<ReturnStmt, SyntaxError> {
        let keyword = self.previous_span();
        let ends_here = match self.peek_kind() {
            None => true,
            Some(kind) => {
                kind.is_separator()
                    || matches!(
                        kind,
                        TokenKind::RBrace
                            | TokenKind::Text(_)
                            | TokenKind::OpenOutput
                            | TokenKind::Eof
                    )
            }
        };
        if ends_here {
            return Ok(ReturnStmt {
                value: None,
                span: keyword,
            });
        }
        let value = self.parse_expression()?;
        let span = keyword.union(value.span());
        Ok(ReturnStmt {
            value: Some(value),
            span,
        })
    }

    fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_unary()?;
        let mut chain = 0;

        loop {
            let (op, prec) = match self.current_binary_op() {
                Some(info) => info,
                None => break,
            };
            if prec < min_prec {
                break;
            }
            chain += 1;
            self.check_nesting(chain)?;
            self.advance();
            let right = self.parse_binary(prec + 1)?;
            let span = left.span().union(right.span());
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = if self.matches(TokenKind::Minus) {
            UnaryOp::Neg
        } else if self.matches(TokenKind::Bang) {
            UnaryOp::Not
        } else {
            return self.parse_postfix();
        };
        let start = self.previous_start();
        let expr = self.nested(Self::parse_unary)?;
        let span = Span::new(start, expr.span().end);
        Ok(Expr::Unary {
            op,
            expr: Box::new(expr),
            span,
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_primary()?;
        let mut chain = 0;
        loop {
            if matches!(
                self.peek_kind(),
                Some(TokenKind::LParen | TokenKind::Dot | TokenKind::LBracket)
            ) {
                chain += 1;
                self.check_nesting(chain)?;
            }
            if self.check(TokenKind::LParen) {
                let Expr::Identifier(callee) = expr else {
                    return Err(self.error_here("Only named helpers can be called"));
                };
                self.advance();
                let mut args = Vec::new();
                if !self.check(TokenKind::RParen) {
                    loop {
                        args.push(self.nested(Self::parse_expression)?);
                        if self.matches(TokenKind::Comma) {
                            continue;
                        }
                        break;
                    }
                }
                let end = self.expect(TokenKind::RParen)?.span.end;
                let span = Span::new(callee.span.start, end);
                expr = Expr::Call { callee, args, span };
                continue;
            }
            if self.matches(TokenKind::Dot) {
                let field = self.expect_identifier("Expected field name after '.'")?;
                let span = expr.span().union(field.span);
                expr = Expr::FieldAccess {
                    base: Box::new(expr),
                    field: field.name,
                    span,
                };
                continue;
            }
            if self.matches(TokenKind::LBracket) {
                let index = self.nested(Self::parse_expression)?;
                let end = self.expect(TokenKind::RBracket)?.span.end;
                let span = Span::new(expr.span().start, end);
                expr = Expr::Index {
                    base: Box::new(expr),
                    index: Box::new(index),
                    span,
                };
                continue;
            }
            break;
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Identifier(_)) => {
                let ident = self.expect_identifier("Expected identifier")?;
                Ok(Expr::Identifier(ident))
            }
            Some(TokenKind::Integer(value)) => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::Int(value, span)))
            }
            Some(TokenKind::Float(value)) => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::Float(value, span)))
            }
            Some(TokenKind::String(value)) => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::String(value, span)))
            }
            Some(TokenKind::True) => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::Bool(true, span)))
            }
            Some(TokenKind::False) => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::Bool(false, span)))
            }
            Some(TokenKind::Nil) => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::Nil(span)))
            }
            Some(TokenKind::LParen) => {
                self.advance();
                let expr = self.nested(Self::parse_expression)?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            Some(TokenKind::LBracket) => self.nested(Self::parse_array_literal),
            Some(TokenKind::LBrace) => self.nested(Self::parse_map_literal),
            _ => Err(self.error_here("Unexpected token in expression")),
        }
    }

    fn parse_array_literal(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.expect(TokenKind::LBracket)?.span.start;
        let mut items = Vec::new();
        while !self.check(TokenKind::RBracket) {
            items.push(self.parse_expression()?);
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(TokenKind::RBracket)?.span.end;
        Ok(Expr::Array(items, Span::new(start, end)))
    }

    fn parse_map_literal(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.expect(TokenKind::LBrace)?.span.start;
        let mut entries = Vec::new();
        while !self.check(TokenKind::RBrace) {
            let key = match self.peek_kind() {
                Some(TokenKind::Identifier(name)) | Some(TokenKind::String(name)) => {
                    self.advance();
                    name
                }
                _ => return Err(self.error_here("Expected map key")),
            };
            self.expect(TokenKind::Colon)?;
            let value = self.parse_expression()?;
            entries.push((key, value));
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(TokenKind::RBrace)?.span.end;
        Ok(Expr::Map(entries, Span::new(start, end)))
    }

    fn current_binary_op(&self) -> Option<(BinaryOp, u8)> {
        match self.peek_kind() {
            Some(TokenKind::Plus) => Some((BinaryOp::Add, 10)),
            Some(TokenKind::Minus) => Some((BinaryOp::Sub, 10)),
            Some(TokenKind::Star) => Some((BinaryOp::Mul, 20)),
            Some(TokenKind::Slash) => Some((BinaryOp::Div, 20)),
            Some(TokenKind::Percent) => Some((BinaryOp::Rem, 20)),
            Some(TokenKind::AmpersandAmpersand) => Some((BinaryOp::And, 4)),
            Some(TokenKind::PipePipe) => Some((BinaryOp::Or, 3)),
            Some(TokenKind::EqEq) => Some((BinaryOp::Eq, 5)),
            Some(TokenKind::BangEq) => Some((BinaryOp::NotEq, 5)),
            Some(TokenKind::Lt) => Some((BinaryOp::Lt, 9)),
            Some(TokenKind::LtEq) => Some((BinaryOp::LtEq, 9)),
            Some(TokenKind::Gt) => Some((BinaryOp::Gt, 9)),
            Some(TokenKind::GtEq) => Some((BinaryOp::GtEq, 9)),
            _ => None,
        }
    }

    /// Runs `parse` one nesting level deeper, failing once the template
    /// exceeds [`MAX_NESTING`].
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        self.check_nesting(1)?;
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Operator and postfix chains deepen the tree without recursing, so
    /// they report their length as `extra`.
    fn check_nesting(&self, extra: usize) -> Result<(), SyntaxError> {
        if self.depth + extra > MAX_NESTING {
            return Err(self
                .error_here("Template nested too deeply")
                .with_help(format!(
                    "blocks and expressions may nest at most {MAX_NESTING} levels"
                )));
        }
        Ok(())
    }

    fn starts_assignment(&self) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Identifier(_)))
            && self.peek_kind_n(1) == Some(TokenKind::Eq)
    }

    fn expect_identifier(&mut self, msg: &str) -> Result<Identifier, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Identifier(name)) => {
                let span = self.advance().span;
                Ok(Identifier { name, span })
            }
            _ => Err(self.error_here(msg)),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token, SyntaxError> {
        if self.check(kind.clone()) {
            Ok(self.advance())
        } else {
            Err(self.error_here(&format!("Expected {:?}", kind)))
        }
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        matches!(self.peek_kind(), Some(tk) if tk == kind)
    }

    fn skip_separator(&mut self) -> bool {
        match self.peek_kind() {
            Some(kind) if kind.is_separator() => {
                self.advance();
                true
            }
            _ => false,
        }
    }

    fn peek_past_separators(&self) -> Option<TokenKind> {
        self.tokens[self.pos.min(self.tokens.len())..]
            .iter()
            .map(|token| &token.kind)
            .find(|kind| !kind.is_separator())
            .cloned()
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|t| t.kind.clone())
    }

    fn peek_kind_n(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + n).map(|t| t.kind.clone())
    }

    fn advance(&mut self) -> &Token {
        let index = self.pos.min(self.tokens.len().saturating_sub(1));
        self.pos = (self.pos + 1).min(self.tokens.len());
        &self.tokens[index]
    }

    fn is_eof(&self) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Eof) | None)
    }

    fn previous_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|idx| self.tokens.get(idx))
            .map(|t| t.span)
            .unwrap_or_default()
    }

    fn previous_start(&self) -> usize {
        self.previous_span().start
    }

    fn error_here(&self, message: &str) -> SyntaxError {
        let span = self
            .tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.span)
            .unwrap_or_default();
        SyntaxError::new(message.to_string(), span)
    }

    fn report(&mut self, err: SyntaxError) {
        self.errors.push(err);
    }

    /// Skips to just past the next `%>` so parsing resumes at a tag boundary.
    fn synchronize_tag(&mut self) {
        while !self.is_eof() {
            if self.advance().kind == TokenKind::Close {
                return;
            }
        }
    }
}
