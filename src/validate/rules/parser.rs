#![deny(missing_docs)]

//! # Rule Expression Parser
//!
//! Recursive-descent parser over the lexer's token stream. Precedence,
//! loosest first: ternary, `||`, `&&`, comparison/`in`, additive,
//! multiplicative, unary, postfix (member, call, index), primary.
//!
//! A method call whose name is `all`, `exists`, `exists_one`, `filter`,
//! or `map` and whose first argument is a bare identifier parses as a
//! comprehension macro binding that identifier per element.

use crate::validate::rules::ast::{BinOp, Expr, MacroKind, UnaryOp};
use crate::validate::rules::lexer::{lex, Token};

/// Parses rule source into an expression.
pub fn parse(source: &str) -> Result<Expr, String> {
    let tokens = lex(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.ternary()?;
    if parser.pos != parser.tokens.len() {
        return Err(format!(
            "unexpected trailing token '{}'",
            parser.tokens[parser.pos]
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), String> {
        if self.eat(expected) {
            Ok(())
        } else {
            match self.peek() {
                Some(found) => Err(format!("expected {:?}, found '{}'", expected, found)),
                None => Err(format!("expected {:?}, found end of rule", expected)),
            }
        }
    }

    fn ternary(&mut self) -> Result<Expr, String> {
        let condition = self.or()?;
        if self.eat(&Token::Question) {
            let then = self.ternary()?;
            self.expect(&Token::Colon)?;
            let otherwise = self.ternary()?;
            return Ok(Expr::Ternary(
                Box::new(condition),
                Box::new(then),
                Box::new(otherwise),
            ));
        }
        Ok(condition)
    }

    fn or(&mut self) -> Result<Expr, String> {
        let mut left = self.and()?;
        while self.eat(&Token::OrOr) {
            let right = self.and()?;
            left = Expr::Binary(BinOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, String> {
        let mut left = self.relational()?;
        while self.eat(&Token::AndAnd) {
            let right = self.relational()?;
            left = Expr::Binary(BinOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn relational(&mut self) -> Result<Expr, String> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinOp::Eq,
                Some(Token::NotEq) => BinOp::Ne,
                Some(Token::Lt) => BinOp::Lt,
                Some(Token::Le) => BinOp::Le,
                Some(Token::Gt) => BinOp::Gt,
                Some(Token::Ge) => BinOp::Ge,
                Some(Token::In) => BinOp::In,
                _ => break,
            };
            self.pos += 1;
            let right = self.additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, String> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr, String> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.eat(&Token::Bang) {
            let inner = self.unary()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)));
        }
        if self.eat(&Token::Minus) {
            let inner = self.unary()?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(inner)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, String> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::Dot) {
                let name = match self.advance() {
                    Some(Token::Ident(name)) => name,
                    Some(other) => {
                        return Err(format!("expected member name after '.', found '{}'", other))
                    }
                    None => return Err("expected member name after '.'".to_string()),
                };
                if self.eat(&Token::LParen) {
                    let args = self.arguments()?;
                    expr = self.method_or_macro(expr, name, args)?;
                } else {
                    expr = Expr::Member(Box::new(expr), name);
                }
            } else if self.eat(&Token::LBracket) {
                let index = self.ternary()?;
                self.expect(&Token::RBracket)?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn method_or_macro(
        &mut self,
        target: Expr,
        name: String,
        args: Vec<Expr>,
    ) -> Result<Expr, String> {
        let kind = match name.as_str() {
            "all" => Some(MacroKind::All),
            "exists" => Some(MacroKind::Exists),
            "exists_one" => Some(MacroKind::ExistsOne),
            "filter" => Some(MacroKind::Filter),
            "map" => Some(MacroKind::Map),
            _ => None,
        };
        if let Some(kind) = kind {
            if args.len() != 2 {
                return Err(format!("{}() takes a variable and a body", name));
            }
            let mut args = args.into_iter();
            let var = match args.next() {
                Some(Expr::Ident(var)) => var,
                _ => return Err(format!("{}() first argument must be an identifier", name)),
            };
            let body = args.next().unwrap_or(Expr::Null);
            return Ok(Expr::Macro {
                target: Box::new(target),
                kind,
                var,
                body: Box::new(body),
            });
        }
        Ok(Expr::Call {
            target: Some(Box::new(target)),
            name,
            args,
        })
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, String> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.ternary()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RParen)?;
            break;
        }
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.advance() {
            Some(Token::Int(value)) => Ok(Expr::Int(value)),
            Some(Token::Float(value)) => Ok(Expr::Float(value)),
            Some(Token::Str(value)) => Ok(Expr::Str(value)),
            Some(Token::True) => Ok(Expr::Bool(true)),
            Some(Token::False) => Ok(Expr::Bool(false)),
            Some(Token::Null) => Ok(Expr::Null),
            Some(Token::LParen) => {
                let inner = self.ternary()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                if self.eat(&Token::RBracket) {
                    return Ok(Expr::List(items));
                }
                loop {
                    items.push(self.ternary()?);
                    if self.eat(&Token::Comma) {
                        continue;
                    }
                    self.expect(&Token::RBracket)?;
                    break;
                }
                Ok(Expr::List(items))
            }
            Some(Token::Ident(name)) => {
                if self.eat(&Token::LParen) {
                    let args = self.arguments()?;
                    return Ok(Expr::Call {
                        target: None,
                        name,
                        args,
                    });
                }
                Ok(Expr::Ident(name))
            }
            Some(other) => Err(format!("unexpected token '{}'", other)),
            None => Err("empty rule".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_macro() {
        let expr = parse("self.all(e, e.val > 0)").unwrap();
        match expr {
            Expr::Macro {
                kind: MacroKind::All,
                var,
                ..
            } => assert_eq!(var, "e"),
            other => panic!("expected macro, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_precedence() {
        let expr = parse("1 + 2 * 3 == 7").unwrap();
        match expr {
            Expr::Binary(BinOp::Eq, left, right) => {
                assert!(matches!(*left, Expr::Binary(BinOp::Add, _, _)));
                assert_eq!(*right, Expr::Int(7));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_ternary_and_in() {
        let expr = parse("self.kind in ['a', 'b'] ? true : false").unwrap();
        assert!(matches!(expr, Expr::Ternary(_, _, _)));
    }

    #[test]
    fn test_parse_has_global() {
        let expr = parse("has(self.replicas)").unwrap();
        match expr {
            Expr::Call { target: None, name, args } => {
                assert_eq!(name, "has");
                assert_eq!(args.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_method_call() {
        let expr = parse("self.name.startsWith('kube-')").unwrap();
        match expr {
            Expr::Call {
                target: Some(_),
                name,
                args,
            } => {
                assert_eq!(name, "startsWith");
                assert_eq!(args.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_reports_trailing_tokens() {
        assert!(parse("1 + 2 extra").is_err());
        assert!(parse("").is_err());
        assert!(parse("self.all(1, true)").is_err());
    }
}
