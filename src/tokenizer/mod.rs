//=====================================================
// File: tokenizer/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: NekoScript lexical analysis
// Objective: Turn NekoScript source text into a flat token stream with
//            French/English keyword classification and lenient recovery
//=====================================================

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

//=====================================================
// Section 1.0 - Positions & Modes
//=====================================================

/// Represents the position of a token in the source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ligne {}, colonne {}", self.line, self.column)
    }
}

/// Error tolerance shared by the tokenizer and the parser.
///
/// `Lenient` drops what it cannot understand and keeps going; `Strict` turns
/// every recovery point into a hard error, which is what tooling wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyntaxMode {
    #[default]
    Lenient,
    Strict,
}

//=====================================================
// Section 2.0 - Tokens & Keywords
//=====================================================

/// Reserved words. Every role accepts the French spelling, the `nek` prefixed
/// spelling and the legacy English spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Variable,
    Function,
    If,
    Else,
    Return,
    While,
    Module,
    Import,
    ExternalImport,
    From,
    True,
    False,
    Null,
    And,
    Or,
    Not,
}

static KEYWORDS: Lazy<HashMap<&'static str, Keyword>> = Lazy::new(|| {
    let table: &[(&str, Keyword)] = &[
        ("nekVariable", Keyword::Variable),
        ("nekVar", Keyword::Variable),
        ("variable", Keyword::Variable),
        ("var", Keyword::Variable),
        ("let", Keyword::Variable),
        ("nekFonction", Keyword::Function),
        ("fonction", Keyword::Function),
        ("function", Keyword::Function),
        ("nekSi", Keyword::If),
        ("si", Keyword::If),
        ("if", Keyword::If),
        ("nekSinon", Keyword::Else),
        ("sinon", Keyword::Else),
        ("else", Keyword::Else),
        ("nekRetourner", Keyword::Return),
        ("nekRetour", Keyword::Return),
        ("retourner", Keyword::Return),
        ("return", Keyword::Return),
        ("nekTantQue", Keyword::While),
        ("tantque", Keyword::While),
        ("while", Keyword::While),
        ("nekModule", Keyword::Module),
        ("module", Keyword::Module),
        ("importer", Keyword::Import),
        ("import", Keyword::Import),
        ("nekImporter", Keyword::ExternalImport),
        ("depuis", Keyword::From),
        ("from", Keyword::From),
        ("vrai", Keyword::True),
        ("true", Keyword::True),
        ("faux", Keyword::False),
        ("false", Keyword::False),
        ("nul", Keyword::Null),
        ("null", Keyword::Null),
        ("et", Keyword::And),
        ("and", Keyword::And),
        ("ou", Keyword::Or),
        ("or", Keyword::Or),
        ("non", Keyword::Not),
        ("not", Keyword::Not),
    ];
    table.iter().copied().collect()
});

impl Keyword {
    pub fn lookup(text: &str) -> Option<Keyword> {
        KEYWORDS.get(text).copied()
    }

    /// Whether the word can never be used as a binding name.
    pub fn is_reserved(text: &str) -> bool {
        KEYWORDS.contains_key(text)
    }
}

/// All possible token types in NekoScript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword(Keyword),
    Identifier,
    Number,
    String,
    Operator,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Keyword(_) => f.write_str("mot-clé"),
            TokenKind::Identifier => f.write_str("identifiant"),
            TokenKind::Number => f.write_str("nombre"),
            TokenKind::String => f.write_str("texte"),
            TokenKind::Operator => f.write_str("opérateur"),
            TokenKind::Eof => f.write_str("fin de fichier"),
        }
    }
}

/// A token with its kind, raw text and position information
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }

    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TokenizeError {
    #[error("caractère inattendu '{character}' à la {position}")]
    UnexpectedCharacter { character: char, position: Position },
    #[error("texte non terminé commençant à la {position}")]
    UnterminatedString { position: Position },
}

//=====================================================
// Section 3.0 - Tokenizer
//=====================================================

const SINGLE_CHAR_OPERATORS: &str = "=+-*/%<>!&|^~?:.,;(){}[]";
const DOUBLE_CHAR_OPERATORS: [&str; 6] = ["==", "!=", "<=", ">=", "&&", "||"];

/// Tokenizer for NekoScript
pub struct Tokenizer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    mode: SyntaxMode,
    tokens: Vec<Token>,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            mode: SyntaxMode::Lenient,
            tokens: Vec::new(),
        }
    }

    pub fn with_mode(mut self, mode: SyntaxMode) -> Self {
        self.mode = mode;
        self
    }

    /// Produce the full token stream, always terminated by an `Eof` token.
    ///
    /// In lenient mode this never fails: unknown characters are dropped.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, TokenizeError> {
        while !self.is_at_end() {
            let ch = self.current_char();

            if ch.is_whitespace() {
                self.advance();
                continue;
            }

            if ch == '/' && self.peek_char() == Some('/') {
                self.skip_comment();
                continue;
            }

            if ch == '"' || ch == '\'' {
                self.handle_string(ch)?;
                continue;
            }

            if ch.is_ascii_digit() {
                self.handle_number();
                continue;
            }

            if is_identifier_start(ch) {
                self.handle_identifier();
                continue;
            }

            if SINGLE_CHAR_OPERATORS.contains(ch) {
                self.handle_operator();
                continue;
            }

            if self.mode == SyntaxMode::Strict {
                return Err(TokenizeError::UnexpectedCharacter {
                    character: ch,
                    position: self.current_position(),
                });
            }
            tracing::trace!(character = %ch, line = self.line, "dropping unknown character");
            self.advance();
        }

        let eof = Token::new(TokenKind::Eof, "", self.current_position());
        self.tokens.push(eof);
        Ok(std::mem::take(&mut self.tokens))
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input.get(self.position).copied().unwrap_or('\0')
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.current_char();
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }

    fn current_position(&self) -> Position {
        Position::new(self.line, self.column, self.position)
    }

    fn skip_comment(&mut self) {
        while !self.is_at_end() && self.current_char() != '\n' {
            self.advance();
        }
    }

    fn handle_string(&mut self, delimiter: char) -> Result<(), TokenizeError> {
        let start = self.current_position();
        self.advance();

        let mut value = String::new();
        while !self.is_at_end() && self.current_char() != delimiter {
            value.push(self.advance());
        }

        if self.is_at_end() {
            if self.mode == SyntaxMode::Strict {
                return Err(TokenizeError::UnterminatedString { position: start });
            }
        } else {
            self.advance();
        }

        self.tokens.push(Token::new(TokenKind::String, value, start));
        Ok(())
    }

    fn handle_number(&mut self) {
        let start = self.current_position();
        let mut text = String::new();
        while self.current_char().is_ascii_digit() {
            text.push(self.advance());
        }
        // A fractional part needs at least one digit after the dot.
        if self.current_char() == '.' && self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            text.push(self.advance());
            while self.current_char().is_ascii_digit() {
                text.push(self.advance());
            }
        }
        self.tokens.push(Token::new(TokenKind::Number, text, start));
    }

    fn handle_identifier(&mut self) {
        let start = self.current_position();
        let mut text = String::new();
        while !self.is_at_end() && is_identifier_continue(self.current_char()) {
            text.push(self.advance());
        }

        let kind = match Keyword::lookup(&text) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier,
        };
        self.tokens.push(Token::new(kind, text, start));
    }

    fn handle_operator(&mut self) {
        let start = self.current_position();
        let first = self.advance();
        if let Some(second) = self.peek_pair(first) {
            self.advance();
            let text: String = [first, second].iter().collect();
            self.tokens.push(Token::new(TokenKind::Operator, text, start));
            return;
        }
        self.tokens
            .push(Token::new(TokenKind::Operator, first.to_string(), start));
    }

    fn peek_pair(&self, first: char) -> Option<char> {
        let second = self.current_char();
        DOUBLE_CHAR_OPERATORS
            .iter()
            .any(|op| op.starts_with(first) && op.ends_with(second))
            .then_some(second)
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || (!ch.is_ascii() && ch.is_alphabetic())
}

fn is_identifier_continue(ch: char) -> bool {
    is_identifier_start(ch) || ch.is_ascii_digit() || ch == '.'
}

/// Convenience wrapper used by the engine and tooling.
pub fn tokenize(source: &str, mode: SyntaxMode) -> Result<Vec<Token>, TokenizeError> {
    Tokenizer::new(source).with_mode(mode).tokenize()
}

//=====================================================
// Section 4.0 - Tests
//=====================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<(TokenKind, String)> {
        Tokenizer::new(source)
            .tokenize()
            .expect("lenient tokenize")
            .into_iter()
            .map(|token| (token.kind, token.text))
            .collect()
    }

    #[test]
    fn classifies_keywords_in_both_languages() {
        let tokens = kinds("nekSi sinon else retourner");
        assert_eq!(tokens[0].0, TokenKind::Keyword(Keyword::If));
        assert_eq!(tokens[1].0, TokenKind::Keyword(Keyword::Else));
        assert_eq!(tokens[2].0, TokenKind::Keyword(Keyword::Else));
        assert_eq!(tokens[3].0, TokenKind::Keyword(Keyword::Return));
        assert_eq!(tokens[4].0, TokenKind::Eof);
    }

    #[test]
    fn dotted_path_is_one_identifier() {
        let tokens = kinds("bot.surMessage(x)");
        assert_eq!(tokens[0], (TokenKind::Identifier, "bot.surMessage".to_string()));
        assert_eq!(tokens[1], (TokenKind::Operator, "(".to_string()));
    }

    #[test]
    fn combines_two_character_operators() {
        let tokens = kinds("a >= b == c && !d");
        let ops: Vec<_> = tokens
            .iter()
            .filter(|(kind, _)| *kind == TokenKind::Operator)
            .map(|(_, text)| text.as_str())
            .collect();
        assert_eq!(ops, vec![">=", "==", "&&", "!"]);
    }

    #[test]
    fn strings_strip_delimiters_without_escapes() {
        let tokens = kinds(r#""bonjour\n" 'monde'"#);
        assert_eq!(tokens[0], (TokenKind::String, "bonjour\\n".to_string()));
        assert_eq!(tokens[1], (TokenKind::String, "monde".to_string()));
    }

    #[test]
    fn numbers_keep_fraction_only_with_digits() {
        let tokens = kinds("3.14 42.");
        assert_eq!(tokens[0], (TokenKind::Number, "3.14".to_string()));
        assert_eq!(tokens[1], (TokenKind::Number, "42".to_string()));
        assert_eq!(tokens[2], (TokenKind::Operator, ".".to_string()));
    }

    #[test]
    fn comments_and_unknown_characters_are_skipped() {
        let tokens = kinds("x @ # y // commentaire\nz");
        let texts: Vec<_> = tokens.iter().map(|(_, text)| text.as_str()).collect();
        assert_eq!(texts, vec!["x", "y", "z", ""]);
    }

    #[test]
    fn accented_words_form_identifiers() {
        let tokens = kinds("x est égal à 3");
        assert_eq!(tokens[2], (TokenKind::Identifier, "égal".to_string()));
        assert_eq!(tokens[3], (TokenKind::Identifier, "à".to_string()));
    }

    #[test]
    fn strict_mode_rejects_unknown_characters() {
        let err = Tokenizer::new("x @ y")
            .with_mode(SyntaxMode::Strict)
            .tokenize()
            .expect_err("strict tokenizer should fail");
        assert!(matches!(
            err,
            TokenizeError::UnexpectedCharacter { character: '@', .. }
        ));
    }

    #[test]
    fn strict_mode_rejects_unterminated_strings() {
        let err = tokenize("nekAfficher(\"oups", SyntaxMode::Strict).expect_err("unterminated");
        assert!(matches!(err, TokenizeError::UnterminatedString { .. }));
    }

    #[test]
    fn positions_track_lines() {
        let tokens = Tokenizer::new("a\n  b").tokenize().expect("tokenize");
        assert_eq!(tokens[1].position.line, 2);
        assert_eq!(tokens[1].position.column, 3);
    }
}
