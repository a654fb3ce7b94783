//=============================================
// nekoscript/parser/expressions.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Expression grammar for NekoScript
// Objective: Precedence climbing over symbolic and French word operators,
//            postfix member/call/index chains and literal primaries
//=============================================

use super::{MAX_EXPRESSION_DEPTH, ParseError, Parser};
use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::tokenizer::{Keyword, Position, TokenKind};
use std::rc::Rc;

//=============================================
//            Section 1: Word Operators
//=============================================

/// Accent-folded phrases recognised as infix operators. Longer phrases come
/// first so `est supérieur ou égal à` wins over `est supérieur à`.
const WORD_OPERATORS: &[(&[&str], BinaryOp)] = &[
    (&["est", "superieur", "ou", "egal", "a"], BinaryOp::GreaterEqual),
    (&["est", "inferieur", "ou", "egal", "a"], BinaryOp::LessEqual),
    (&["est", "plus", "grand", "que"], BinaryOp::Greater),
    (&["est", "plus", "petit", "que"], BinaryOp::Less),
    (&["est", "superieur", "a"], BinaryOp::Greater),
    (&["est", "inferieur", "a"], BinaryOp::Less),
    (&["est", "different", "de"], BinaryOp::NotEqual),
    (&["est", "egal", "a"], BinaryOp::Equal),
    (&["commence", "par"], BinaryOp::StartsWith),
    (&["finit", "par"], BinaryOp::EndsWith),
    (&["termine", "par"], BinaryOp::EndsWith),
    (&["vaut"], BinaryOp::Equal),
    (&["contient"], BinaryOp::Contains),
];

/// Lowercase `word` and strip French diacritics.
pub fn fold_word(word: &str) -> String {
    word.chars()
        .flat_map(char::to_lowercase)
        .map(|ch| match ch {
            'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

fn is_equality(op: BinaryOp) -> bool {
    matches!(op, BinaryOp::Equal | BinaryOp::NotEqual)
}

impl Parser {
    /// Longest word-operator phrase starting at the current token, with the
    /// number of tokens it spans.
    fn peek_word_operator(&self) -> Option<(BinaryOp, usize)> {
        WORD_OPERATORS.iter().find_map(|(words, op)| {
            let matches = words.iter().enumerate().all(|(offset, word)| {
                let token = self.peek_at(offset);
                matches!(token.kind, TokenKind::Identifier | TokenKind::Keyword(_))
                    && fold_word(&token.text) == *word
            });
            matches.then_some((*op, words.len()))
        })
    }

    fn consume_tokens(&mut self, count: usize) {
        for _ in 0..count {
            self.advance();
        }
    }

    //=============================================
    //            Section 2: Precedence Levels
    //=============================================

    fn enter_expression(&mut self) -> Result<(), ParseError> {
        if self.expr_depth >= MAX_EXPRESSION_DEPTH {
            return Err(ParseError::InvalidSyntax {
                message: format!("expression trop imbriquée (limite {MAX_EXPRESSION_DEPTH})"),
                position: self.peek().position,
            });
        }
        self.expr_depth += 1;
        Ok(())
    }

    fn exit_expression(&mut self) {
        self.expr_depth = self.expr_depth.saturating_sub(1);
    }

    /// Parse expression with precedence climbing
    pub(super) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.enter_expression()?;
        let result = self.parse_logical_or();
        self.exit_expression();
        result
    }

    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_logical_and()?;
        while self.check_operator("||") || self.peek().is_keyword(Keyword::Or) {
            let position = self.advance().position;
            let right = self.parse_logical_and()?;
            expr = binary(expr, BinaryOp::Or, right, position);
        }
        Ok(expr)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_equality()?;
        while self.check_operator("&&") || self.peek().is_keyword(Keyword::And) {
            let position = self.advance().position;
            let right = self.parse_equality()?;
            expr = binary(expr, BinaryOp::And, right, position);
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_comparison()?;
        loop {
            let position = self.peek().position;
            let operator = if self.match_operator("==") {
                BinaryOp::Equal
            } else if self.match_operator("!=") {
                BinaryOp::NotEqual
            } else if let Some((op, len)) = self.peek_word_operator().filter(|(op, _)| is_equality(*op)) {
                self.consume_tokens(len);
                op
            } else {
                break;
            };
            let right = self.parse_comparison()?;
            expr = binary(expr, operator, right, position);
        }
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_additive()?;
        loop {
            let position = self.peek().position;
            let symbolic = [
                ("<=", BinaryOp::LessEqual),
                (">=", BinaryOp::GreaterEqual),
                ("<", BinaryOp::Less),
                (">", BinaryOp::Greater),
            ]
            .into_iter()
            .find(|(text, _)| self.check_operator(text));

            let operator = if let Some((_, op)) = symbolic {
                self.advance();
                op
            } else if let Some((op, len)) = self.peek_word_operator().filter(|(op, _)| !is_equality(*op)) {
                self.consume_tokens(len);
                op
            } else {
                break;
            };
            let right = self.parse_additive()?;
            expr = binary(expr, operator, right, position);
        }
        Ok(expr)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_multiplicative()?;
        loop {
            let operator = if self.check_operator("+") {
                BinaryOp::Add
            } else if self.check_operator("-") {
                BinaryOp::Subtract
            } else {
                break;
            };
            let position = self.advance().position;
            let right = self.parse_multiplicative()?;
            expr = binary(expr, operator, right, position);
        }
        Ok(expr)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_unary()?;
        loop {
            let operator = if self.check_operator("*") {
                BinaryOp::Multiply
            } else if self.check_operator("/") {
                BinaryOp::Divide
            } else if self.check_operator("%") {
                BinaryOp::Modulo
            } else {
                break;
            };
            let position = self.advance().position;
            let right = self.parse_unary()?;
            expr = binary(expr, operator, right, position);
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let operator = if self.check_operator("!") || self.peek().is_keyword(Keyword::Not) {
            Some(UnaryOp::Not)
        } else if self.check_operator("-") {
            Some(UnaryOp::Minus)
        } else {
            None
        };

        match operator {
            Some(operator) => {
                let position = self.advance().position;
                self.enter_expression()?;
                let operand = self.parse_unary();
                self.exit_expression();
                Ok(Expr::Unary {
                    operator,
                    operand: Box::new(operand?),
                    position,
                })
            }
            None => self.parse_postfix(),
        }
    }

    //=============================================
    //            Section 3: Postfix & Primary
    //=============================================

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            let position = self.peek().position;
            if self.match_operator("(") {
                let args = self.parse_arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                    position,
                };
            } else if self.check_operator(".") && self.peek_at(1).kind == TokenKind::Identifier {
                self.advance();
                let path = self.advance().text;
                expr = member_chain(expr, &path, position);
            } else if self.match_operator("[") {
                let index = self.parse_expression()?;
                self.consume_operator("]", "']' après l'index")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                    position,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if !self.check_operator(")") {
            loop {
                args.push(self.parse_expression()?);
                if !self.match_operator(",") {
                    break;
                }
            }
        }
        self.consume_operator(")", "')' après les arguments")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek().clone();
        let position = token.position;

        match token.kind {
            TokenKind::String => {
                self.advance();
                Ok(Expr::StringLiteral {
                    value: token.text,
                    position,
                })
            }
            TokenKind::Number => {
                self.advance();
                let value = token
                    .text
                    .parse::<f64>()
                    .map_err(|_| ParseError::InvalidSyntax {
                        message: format!("nombre invalide `{}`", token.text),
                        position,
                    })?;
                Ok(Expr::NumberLiteral { value, position })
            }
            TokenKind::Keyword(Keyword::True) | TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr::BooleanLiteral {
                    value: token.kind == TokenKind::Keyword(Keyword::True),
                    position,
                })
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expr::NullLiteral { position })
            }
            TokenKind::Keyword(Keyword::Function) => {
                self.advance();
                let name = if self.peek().kind == TokenKind::Identifier {
                    Some(self.advance().text)
                } else {
                    None
                };
                let decl = self.parse_function_rest(name, position)?;
                Ok(Expr::Function {
                    decl: Rc::new(decl),
                })
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(identifier_path(&token.text, position))
            }
            TokenKind::Operator if token.text == "(" => {
                self.advance();
                let expr = self.parse_expression()?;
                self.consume_operator(")", "')' après l'expression")?;
                Ok(expr)
            }
            TokenKind::Operator if token.text == "[" => {
                self.advance();
                self.parse_list_literal(position)
            }
            TokenKind::Operator if token.text == "{" => {
                self.advance();
                self.parse_map_literal(position)
            }
            _ => Err(self.unexpected("une expression")),
        }
    }

    fn parse_list_literal(&mut self, position: Position) -> Result<Expr, ParseError> {
        let mut items = Vec::new();
        while !self.check_operator("]") {
            items.push(self.parse_expression()?);
            if !self.match_operator(",") {
                break;
            }
        }
        self.consume_operator("]", "']' à la fin de la liste")?;
        Ok(Expr::List { items, position })
    }

    fn parse_map_literal(&mut self, position: Position) -> Result<Expr, ParseError> {
        let mut entries = Vec::new();
        while !self.check_operator("}") {
            let key = self.peek().clone();
            let accepted = matches!(
                key.kind,
                TokenKind::Identifier | TokenKind::String | TokenKind::Keyword(_) | TokenKind::Number
            );
            if !accepted {
                return Err(self.unexpected("une clé de dictionnaire"));
            }
            self.advance();
            self.consume_operator(":", "':' après la clé")?;
            let value = self.parse_expression()?;
            entries.push((key.text, value));
            if !self.match_operator(",") {
                break;
            }
        }
        self.consume_operator("}", "'}' à la fin du dictionnaire")?;
        Ok(Expr::Map { entries, position })
    }

    /// Whether the current token may begin an expression.
    pub(super) fn can_start_expression(&self) -> bool {
        let token = self.peek();
        match token.kind {
            TokenKind::String | TokenKind::Number | TokenKind::Identifier => true,
            TokenKind::Keyword(keyword) => matches!(
                keyword,
                Keyword::True | Keyword::False | Keyword::Null | Keyword::Not | Keyword::Function
            ),
            TokenKind::Operator => matches!(token.text.as_str(), "(" | "[" | "-" | "!"),
            TokenKind::Eof => false,
        }
    }
}

fn binary(left: Expr, operator: BinaryOp, right: Expr, position: Position) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        operator,
        right: Box::new(right),
        position,
    }
}

/// Split a dotted identifier token (`bot.surMessage`) into a member chain.
fn identifier_path(text: &str, position: Position) -> Expr {
    let mut segments = text.split('.').filter(|segment| !segment.is_empty());
    let root = segments.next().unwrap_or(text).to_string();
    segments.fold(Expr::Identifier { name: root, position }, |object, property| {
        Expr::Member {
            object: Box::new(object),
            property: property.to_string(),
            position,
        }
    })
}

fn member_chain(object: Expr, path: &str, position: Position) -> Expr {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .fold(object, |object, property| Expr::Member {
            object: Box::new(object),
            property: property.to_string(),
            position,
        })
}
