//! Recursive-descent parser for math expressions.
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | primary
//! primary := NUMBER | STRING | IDENT | IDENT '(' expr ')'
//!          | '(' expr ')' | '{' [expr (',' expr)*] '}'
//! ```

use reasoner_core::{Error, Result};

use super::lexer::{tokenize, Token, TokenKind};

/// Deepest expression tree the parser will build. Evaluation recurses over
/// the tree, so this also bounds the evaluator's stack use.
pub const MAX_DEPTH: usize = 128;

/// Aggregate and element-wise functions understood by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Count,
    Sum,
    Average,
    Max,
    Min,
    Abs,
}

impl Function {
    /// Case-insensitive lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Some(Self::Count),
            "sum" => Some(Self::Sum),
            "average" => Some(Self::Average),
            "max" => Some(Self::Max),
            "min" => Some(Self::Min),
            "abs" => Some(Self::Abs),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Average => "average",
            Self::Max => "max",
            Self::Min => "min",
            Self::Abs => "abs",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(String),
    Var(String),
    Call(Function, Box<Expr>),
    Negate(Box<Expr>),
    /// Unary plus. Still requires a numeric operand.
    Positive(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Set(Vec<Expr>),
}

impl Expr {
    /// Distinct variable names, in order of first appearance.
    pub fn variables(&self) -> Vec<&str> {
        fn walk<'a>(expr: &'a Expr, out: &mut Vec<&'a str>) {
            match expr {
                Expr::Var(name) => {
                    if !out.contains(&name.as_str()) {
                        out.push(name);
                    }
                }
                Expr::Call(_, inner) | Expr::Negate(inner) | Expr::Positive(inner) => walk(inner, out),
                Expr::Binary(_, lhs, rhs) => {
                    walk(lhs, out);
                    walk(rhs, out);
                }
                Expr::Set(elements) => elements.iter().for_each(|e| walk(e, out)),
                Expr::Number(_) | Expr::Str(_) => {}
            }
        }

        let mut out = Vec::new();
        walk(self, &mut out);
        out
    }
}

/// Parse a complete expression.
pub fn parse(source: &str) -> Result<Expr> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;
    let trailing = parser.peek();
    if trailing.kind != TokenKind::Eof {
        return Err(Error::syntax(
            trailing.position,
            format!("unexpected {}", trailing.kind.describe()),
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // The token stream always ends with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    /// Identifier at the cursor followed by `(`.
    fn is_call(&self) -> bool {
        self.tokens
            .get(self.pos + 1)
            .is_some_and(|t| t.kind == TokenKind::LParen)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        let token = self.advance();
        if token.kind == kind {
            Ok(token)
        } else {
            Err(Error::syntax(
                token.position,
                format!("expected {}, found {}", kind.describe(), token.kind.describe()),
            ))
        }
    }

    /// One level deeper, or a syntax error at `position` past [`MAX_DEPTH`].
    fn descend(&mut self, position: usize) -> Result<()> {
        if self.depth >= MAX_DEPTH {
            return Err(Error::syntax(position, "expression nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }

    /// Run `f` one level deeper, restoring the depth afterwards.
    fn nested<T>(&mut self, position: usize, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let base = self.depth;
        let result = self.descend(position).and_then(|()| f(self));
        self.depth = base;
        result
    }

    fn expr(&mut self) -> Result<Expr> {
        let base = self.depth;
        let result = self.additive();
        self.depth = base;
        result
    }

    // Binary chains build left-deep trees, so every operator counts as a level.
    fn additive(&mut self) -> Result<Expr> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            let token = self.advance();
            self.descend(token.position)?;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Expr> {
        let base = self.depth;
        let result = self.multiplicative();
        self.depth = base;
        result
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            let token = self.advance();
            self.descend(token.position)?;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        let position = self.peek().position;
        match self.peek().kind {
            TokenKind::Minus => {
                self.advance();
                let inner = self.nested(position, Self::unary)?;
                Ok(Expr::Negate(Box::new(inner)))
            }
            TokenKind::Plus => {
                self.advance();
                let inner = self.nested(position, Self::unary)?;
                Ok(Expr::Positive(Box::new(inner)))
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        let position = self.peek().position;
        match self.peek().kind {
            TokenKind::LParen | TokenKind::LBrace => self.nested(position, Self::group),
            TokenKind::Ident(_) if self.is_call() => self.nested(position, Self::atom),
            _ => self.atom(),
        }
    }

    /// Parenthesised expression or set literal.
    fn group(&mut self) -> Result<Expr> {
        let token = self.advance();
        if token.kind == TokenKind::LBrace {
            return self.set_literal();
        }
        let inner = self.expr()?;
        self.expect(TokenKind::RParen)?;
        Ok(inner)
    }

    fn atom(&mut self) -> Result<Expr> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::Str(s) => Ok(Expr::Str(s)),
            TokenKind::Ident(name) => {
                if self.peek().kind == TokenKind::LParen {
                    self.call(name, token.position)
                } else {
                    Ok(Expr::Var(name))
                }
            }
            other => Err(Error::syntax(
                token.position,
                format!("unexpected {}", other.describe()),
            )),
        }
    }

    fn call(&mut self, name: String, position: usize) -> Result<Expr> {
        let function = Function::from_name(&name).ok_or(Error::UnsupportedFunction(name))?;
        self.expect(TokenKind::LParen)?;

        if self.peek().kind == TokenKind::RParen {
            return Err(Error::syntax(
                position,
                format!("{}() takes exactly one argument", function.name()),
            ));
        }
        let argument = self.expr()?;

        let close = self.advance();
        match close.kind {
            TokenKind::RParen => Ok(Expr::Call(function, Box::new(argument))),
            TokenKind::Comma => Err(Error::syntax(
                close.position,
                format!("{}() takes exactly one argument", function.name()),
            )),
            other => Err(Error::syntax(
                close.position,
                format!("expected ')', found {}", other.describe()),
            )),
        }
    }

    fn set_literal(&mut self) -> Result<Expr> {
        let mut elements = Vec::new();
        if self.peek().kind == TokenKind::RBrace {
            self.advance();
            return Ok(Expr::Set(elements));
        }
        loop {
            elements.push(self.expr()?);
            let token = self.advance();
            match token.kind {
                TokenKind::Comma => continue,
                TokenKind::RBrace => return Ok(Expr::Set(elements)),
                other => {
                    return Err(Error::syntax(
                        token.position,
                        format!("expected ',' or '}}', found {}", other.describe()),
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let expr = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Add,
                Box::new(Expr::Number(1.0)),
                Box::new(Expr::Binary(
                    BinaryOp::Mul,
                    Box::new(Expr::Number(2.0)),
                    Box::new(Expr::Number(3.0)),
                )),
            )
        );
    }

    #[test]
    fn test_function_names_case_insensitive() {
        assert_eq!(
            parse("COUNT(A)").unwrap(),
            Expr::Call(Function::Count, Box::new(Expr::Var("A".into())))
        );
    }

    #[test]
    fn test_unknown_function_rejected_at_parse() {
        assert!(matches!(
            parse("unknownfn(A)"),
            Err(Error::UnsupportedFunction(name)) if name == "unknownfn"
        ));
    }

    #[test]
    fn test_arity_and_structure_errors() {
        assert!(matches!(parse("sum()"), Err(Error::ExpressionSyntax { .. })));
        assert!(matches!(
            parse("sum(A, B)"),
            Err(Error::ExpressionSyntax { position: 5, .. })
        ));
        assert!(matches!(
            parse("(1 + 2"),
            Err(Error::ExpressionSyntax { position: 6, .. })
        ));
        assert!(matches!(
            parse("1 2"),
            Err(Error::ExpressionSyntax { position: 2, .. })
        ));
        assert!(matches!(parse("{1, 2"), Err(Error::ExpressionSyntax { .. })));
        assert!(matches!(parse(""), Err(Error::ExpressionSyntax { position: 0, .. })));
    }

    #[test]
    fn test_nesting_depth_is_bounded() {
        let deep = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
        assert!(matches!(
            parse(&deep),
            Err(Error::ExpressionSyntax { position, message })
                if position == MAX_DEPTH && message.contains("nested too deeply")
        ));

        let negations = format!("{}1", "-".repeat(10_000));
        assert!(matches!(parse(&negations), Err(Error::ExpressionSyntax { .. })));

        let chain = format!("1{}", " + 1".repeat(10_000));
        assert!(matches!(parse(&chain), Err(Error::ExpressionSyntax { .. })));

        let sets = format!("{}1{}", "{".repeat(10_000), "}".repeat(10_000));
        assert!(matches!(parse(&sets), Err(Error::ExpressionSyntax { .. })));

        let calls = format!("{}X{}", "abs(".repeat(10_000), ")".repeat(10_000));
        assert!(matches!(parse(&calls), Err(Error::ExpressionSyntax { .. })));
    }

    #[test]
    fn test_moderate_nesting_still_parses() {
        let nested = format!("{}1{}", "(".repeat(40), ")".repeat(40));
        assert_eq!(parse(&nested).unwrap(), Expr::Number(1.0));
        assert!(parse(&format!("1{}", " + 1".repeat(60))).is_ok());
        assert!(parse("-(-(abs({1, -2, {3}})))").is_ok());
    }

    #[test]
    fn test_set_literal() {
        assert_eq!(parse("{}").unwrap(), Expr::Set(vec![]));
        assert_eq!(
            parse("{'a', 2}").unwrap(),
            Expr::Set(vec![Expr::Str("a".into()), Expr::Number(2.0)])
        );
    }
}
