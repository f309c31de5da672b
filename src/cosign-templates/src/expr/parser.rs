use super::{
    builtins,
    lexer::{tokenize, Spanned, Token},
    value::Value,
    MAX_DEPTH,
};
use crate::errors::EvalError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Value),
    Ident(String),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

pub fn parse(src: &str) -> Result<Expr, EvalError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        at: 0,
        depth: 0,
    };
    let expr = parser.conditional()?;
    match parser.peek() {
        Token::Eof => Ok(expr),
        other => Err(parser.error(format!("unexpected {other:?} after expression"))),
    }
}

const BINARY_LEVELS: usize = 6;

fn binary_op(level: usize, token: &Token) -> Option<BinaryOp> {
    let op = match (level, token) {
        (0, Token::OrOr) => BinaryOp::Or,
        (1, Token::AndAnd) => BinaryOp::And,
        (2, Token::EqEq) => BinaryOp::Eq,
        (2, Token::NotEq) => BinaryOp::Ne,
        (3, Token::Lt) => BinaryOp::Lt,
        (3, Token::Le) => BinaryOp::Le,
        (3, Token::Gt) => BinaryOp::Gt,
        (3, Token::Ge) => BinaryOp::Ge,
        (4, Token::Plus) => BinaryOp::Add,
        (4, Token::Minus) => BinaryOp::Sub,
        (5, Token::Star) => BinaryOp::Mul,
        (5, Token::Slash) => BinaryOp::Div,
        (5, Token::Percent) => BinaryOp::Rem,
        _ => return None,
    };
    Some(op)
}

struct Parser {
    tokens: Vec<Spanned>,
    at: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.tokens
            .get(self.at)
            .map(|s| &s.token)
            .unwrap_or(&Token::Eof)
    }

    fn pos(&self) -> usize {
        self.tokens.get(self.at).map(|s| s.pos).unwrap_or(0)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.at < self.tokens.len() {
            self.at += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.at += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), EvalError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.error(format!("expected {token:?}, found {:?}", self.peek())))
        }
    }

    fn error(&self, message: String) -> EvalError {
        EvalError::Syntax {
            position: self.pos(),
            message,
        }
    }

    fn enter(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvalError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn conditional(&mut self) -> Result<Expr, EvalError> {
        self.enter()?;
        let cond = self.binary(0)?;
        let expr = if self.eat(&Token::Question) {
            let then = self.conditional()?;
            self.expect(Token::Colon)?;
            let otherwise = self.conditional()?;
            Expr::Conditional(Box::new(cond), Box::new(then), Box::new(otherwise))
        } else {
            cond
        };
        self.depth -= 1;
        Ok(expr)
    }

    /// Precedence climbing over the binary operators, loosest first.
    fn binary(&mut self, level: usize) -> Result<Expr, EvalError> {
        if level == BINARY_LEVELS {
            return self.unary();
        }
        let mut lhs = self.binary(level + 1)?;
        while let Some(op) = binary_op(level, self.peek()) {
            self.advance();
            let rhs = self.binary(level + 1)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        let op = match self.peek() {
            Token::Bang => UnaryOp::Not,
            Token::Minus => UnaryOp::Neg,
            _ => return self.postfix(),
        };
        self.advance();
        self.enter()?;
        let operand = self.unary()?;
        self.depth -= 1;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    match self.advance() {
                        Token::Ident(name) => expr = Expr::Member(Box::new(expr), name),
                        other => return Err(self.error(format!("expected member name, found {other:?}"))),
                    }
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.conditional()?;
                    self.expect(Token::RBracket)?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                _ => return Ok(expr),
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        let pos = self.pos();
        match self.advance() {
            Token::Number(n) => Ok(Expr::Literal(Value::Number(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::LParen => {
                let inner = self.conditional()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" | "undefined" => Ok(Expr::Literal(Value::Null)),
                _ if self.peek() == &Token::LParen => {
                    if !builtins::is_builtin(&name) {
                        return Err(EvalError::UnknownFunction(name));
                    }
                    self.advance();
                    let mut args = Vec::new();
                    if !self.eat(&Token::RParen) {
                        loop {
                            args.push(self.conditional()?);
                            if self.eat(&Token::RParen) {
                                break;
                            }
                            self.expect(Token::Comma)?;
                        }
                    }
                    Ok(Expr::Call(name, args))
                }
                _ => Ok(Expr::Ident(name)),
            },
            other => Err(EvalError::Syntax {
                position: pos,
                message: format!("unexpected {other:?}"),
            }),
        }
    }
}

impl Expr {
    /// Every `root.member` path the expression reads, for load-time reference checks.
    pub fn paths(&self) -> Vec<(String, Option<String>)> {
        let mut out = Vec::new();
        self.collect_paths(&mut out);
        out
    }

    fn collect_paths(&self, out: &mut Vec<(String, Option<String>)>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Ident(root) => out.push((root.clone(), None)),
            Expr::Member(base, name) => match base.as_ref() {
                Expr::Ident(root) => out.push((root.clone(), Some(name.clone()))),
                other => other.collect_paths(out),
            },
            Expr::Index(base, index) => {
                base.collect_paths(out);
                index.collect_paths(out);
            }
            Expr::Call(_, args) => args.iter().for_each(|a| a.collect_paths(out)),
            Expr::Unary(_, operand) => operand.collect_paths(out),
            Expr::Binary(_, lhs, rhs) => {
                lhs.collect_paths(out);
                rhs.collect_paths(out);
            }
            Expr::Conditional(cond, then, otherwise) => {
                cond.collect_paths(out);
                then.collect_paths(out);
                otherwise.collect_paths(out);
            }
        }
    }
}
