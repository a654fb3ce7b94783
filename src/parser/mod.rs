//=============================================
// nekoscript/parser/mod.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: NekoScript recursive descent parser implementation
// Objective: Transform token streams into AST nodes consumed by the interpreter,
//            recovering from malformed input when running in lenient mode
//=============================================

//=============================================
//            Section 1: Crate Attributes & Imports
//=============================================

mod expressions;

use crate::ast::{
    Expr, FunctionDecl, ImportDecl, ImportKind, ModuleDecl, PLACEHOLDER_MODULE_NAME, Program,
    Stmt, VariableDecl,
};
use crate::tokenizer::{Keyword, Position, SyntaxMode, Token, TokenKind, TokenizeError, Tokenizer};
use std::rc::Rc;
use thiserror::Error;

pub use expressions::fold_word;

//=============================================
//            Section 2: Parse Errors
//=============================================

/// Parser error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("attendu {expected}, trouvé `{found}` à la {position}")]
    UnexpectedToken {
        expected: String,
        found: String,
        position: Position,
    },
    #[error("fin de fichier inattendue, attendu {expected} à la {position}")]
    UnexpectedEndOfInput { expected: String, position: Position },
    #[error("syntaxe invalide : {message} à la {position}")]
    InvalidSyntax { message: String, position: Position },
}

/// Either stage of turning text into a [`Program`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

//=============================================
//            Section 3: Parser State
//=============================================

/// Recursive descent parser for NekoScript
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    mode: SyntaxMode,
    expr_depth: usize,
    stmt_depth: usize,
}

const MAX_EXPRESSION_DEPTH: usize = 128;
const MAX_STATEMENT_DEPTH: usize = 64;

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !tokens.last().is_some_and(Token::is_eof) {
            let position = tokens.last().map(|t| t.position).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, "", position));
        }
        Self {
            tokens,
            current: 0,
            mode: SyntaxMode::Lenient,
            expr_depth: 0,
            stmt_depth: 0,
        }
    }

    pub fn with_mode(mut self, mode: SyntaxMode) -> Self {
        self.mode = mode;
        self
    }

    /// Parse a complete NekoScript program.
    ///
    /// Lenient mode stops at the first malformed top-level statement and
    /// returns the statements parsed so far, recording the error in
    /// `Program::diagnostics`. Strict mode returns the error.
    pub fn parse(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::default();

        while !self.is_at_end() {
            if self.match_operator(";") {
                continue;
            }
            match self.parse_statement() {
                Ok(stmt) => program.statements.push(stmt),
                Err(error) if self.mode == SyntaxMode::Lenient => {
                    tracing::warn!(%error, "parse stopped at malformed top-level statement");
                    program.diagnostics.push(error.to_string());
                    break;
                }
                Err(error) => return Err(error),
            }
        }

        Ok(program)
    }

    //=============================================
    //            Section 4: Statements
    //=============================================

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        if self.stmt_depth >= MAX_STATEMENT_DEPTH {
            return Err(ParseError::InvalidSyntax {
                message: format!("instructions trop imbriquées (limite {MAX_STATEMENT_DEPTH})"),
                position: self.peek().position,
            });
        }
        self.stmt_depth += 1;
        let result = self.parse_statement_kind();
        self.stmt_depth -= 1;
        result
    }

    fn parse_statement_kind(&mut self) -> Result<Stmt, ParseError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Keyword(Keyword::Variable) => self.parse_variable_declaration(),
            TokenKind::Keyword(Keyword::Function)
                if self.peek_at(1).kind == TokenKind::Identifier =>
            {
                self.parse_function_declaration()
            }
            TokenKind::Keyword(Keyword::If) => self.parse_if_statement(),
            TokenKind::Keyword(Keyword::While) => self.parse_while_statement(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return_statement(),
            TokenKind::Keyword(Keyword::Module) => self.parse_module_declaration(),
            TokenKind::Keyword(Keyword::Import) => self.parse_import(ImportKind::Local),
            TokenKind::Keyword(Keyword::ExternalImport) => self.parse_import(ImportKind::External),
            TokenKind::Operator if token.text == "{" => {
                self.advance();
                let statements = self.parse_block_body()?;
                Ok(Stmt::Block {
                    statements,
                    position: token.position,
                })
            }
            TokenKind::Operator if token.text == ";" => {
                self.advance();
                Ok(Stmt::Block {
                    statements: Vec::new(),
                    position: token.position,
                })
            }
            TokenKind::Identifier
                if self.peek_at(1).is_operator("=") && !token.text.contains('.') =>
            {
                self.parse_assignment()
            }
            _ if self.can_start_expression() => self.parse_expression_statement(),
            _ => self.unknown_statement(),
        }
    }

    fn unknown_statement(&mut self) -> Result<Stmt, ParseError> {
        let token = self.peek().clone();
        if self.mode == SyntaxMode::Strict || token.is_eof() {
            return Err(self.unexpected("une instruction"));
        }
        self.advance();
        tracing::debug!(text = %token.text, "recovered unknown statement token");
        Ok(Stmt::Unknown {
            text: token.text,
            position: token.position,
        })
    }

    /// Parse variable declaration: `nekVariable nom [= valeur];`
    fn parse_variable_declaration(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().position;
        let name = self.consume_binding_name("un nom de variable")?;

        let initializer = if self.match_operator("=") {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.consume_terminator();

        Ok(Stmt::VariableDecl {
            decl: VariableDecl {
                name,
                initializer,
                position: start,
            },
        })
    }

    /// Parse function declaration: `nekFonction nom(a, b) { corps }`
    fn parse_function_declaration(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().position;
        let name = self.consume_binding_name("un nom de fonction")?;
        let decl = self.parse_function_rest(Some(name), start)?;
        Ok(Stmt::FunctionDecl {
            decl: Rc::new(decl),
        })
    }

    /// Parameters and body shared by declarations and anonymous functions.
    fn parse_function_rest(
        &mut self,
        name: Option<String>,
        start: Position,
    ) -> Result<FunctionDecl, ParseError> {
        self.consume_operator("(", "'(' après le nom de la fonction")?;
        let mut params = Vec::new();
        if !self.check_operator(")") {
            loop {
                params.push(self.consume_binding_name("un nom de paramètre")?);
                if !self.match_operator(",") {
                    break;
                }
            }
        }
        self.consume_operator(")", "')' après les paramètres")?;
        self.consume_operator("{", "'{' avant le corps de la fonction")?;
        let body = self.parse_block_body()?;

        Ok(FunctionDecl {
            name,
            params,
            body,
            position: start,
        })
    }

    /// Parse `nekSi condition corps [nekSinon corps]`.
    fn parse_if_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().position;
        let condition = self.parse_expression()?;
        let then_branch = Box::new(self.parse_body()?);

        while self.check_operator(";") && self.peek_at(1).is_keyword(Keyword::Else) {
            self.advance();
        }
        let else_branch = if self.peek().is_keyword(Keyword::Else) {
            self.advance();
            Some(Box::new(self.parse_body()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
            position: start,
        })
    }

    fn parse_while_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().position;
        let condition = self.parse_expression()?;
        let body = Box::new(self.parse_body()?);
        Ok(Stmt::While {
            condition,
            body,
            position: start,
        })
    }

    fn parse_return_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().position;
        let value = if self.can_start_expression() {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.consume_terminator();
        Ok(Stmt::Return {
            value,
            position: start,
        })
    }

    /// Parse `nekModule Nom { ... }`. Statements that fail to parse are
    /// skipped one token at a time in lenient mode.
    fn parse_module_declaration(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().position;
        let name = if self.peek().kind == TokenKind::Identifier {
            self.advance().text
        } else if self.mode == SyntaxMode::Strict {
            return Err(self.unexpected("un nom de module"));
        } else {
            tracing::warn!(line = start.line, "module declared without a name");
            PLACEHOLDER_MODULE_NAME.to_string()
        };

        self.consume_operator("{", "'{' avant le corps du module")?;
        let mut body = Vec::new();
        loop {
            if self.match_operator(";") {
                continue;
            }
            if self.match_operator("}") {
                break;
            }
            if self.is_at_end() {
                if self.mode == SyntaxMode::Strict {
                    return Err(self.unexpected("'}' à la fin du module"));
                }
                break;
            }
            let checkpoint = self.current;
            match self.parse_statement() {
                Ok(stmt) => body.push(stmt),
                Err(error) if self.mode == SyntaxMode::Lenient => {
                    tracing::warn!(module = %name, %error, "skipping malformed module statement");
                    self.current = checkpoint;
                    self.advance();
                }
                Err(error) => return Err(error),
            }
        }

        Ok(Stmt::ModuleDecl {
            decl: ModuleDecl {
                name,
                body,
                position: start,
            },
        })
    }

    /// Parse `importer Nom` and `nekImporter Nom depuis "source"`.
    fn parse_import(&mut self, kind: ImportKind) -> Result<Stmt, ParseError> {
        let start = self.advance().position;
        let name = self.consume_binding_name("un nom de module")?;

        let source = if self.peek().is_keyword(Keyword::From) {
            self.advance();
            let token = self.peek().clone();
            if token.kind != TokenKind::String {
                return Err(self.unexpected("une source entre guillemets après 'depuis'"));
            }
            self.advance();
            Some(token.text)
        } else if kind == ImportKind::External && self.mode == SyntaxMode::Strict {
            return Err(self.unexpected("'depuis' après le nom du module"));
        } else {
            None
        };
        self.consume_terminator();

        Ok(Stmt::Import {
            decl: ImportDecl {
                name,
                source,
                kind,
                position: start,
            },
        })
    }

    fn parse_assignment(&mut self) -> Result<Stmt, ParseError> {
        let target = self.advance();
        self.advance();
        let value = self.parse_expression()?;
        self.consume_terminator();
        Ok(Stmt::Assign {
            name: target.text,
            value,
            position: target.position,
        })
    }

    fn parse_expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.peek().position;
        let expr = self.parse_expression()?;
        self.consume_terminator();
        Ok(Stmt::Expression { expr, position })
    }

    /// Body of `si`/`sinon`/`tantque`: a braced block or a single statement.
    fn parse_body(&mut self) -> Result<Stmt, ParseError> {
        let position = self.peek().position;
        if self.match_operator("{") {
            let statements = self.parse_block_body()?;
            return Ok(Stmt::Block {
                statements,
                position,
            });
        }
        self.parse_statement()
    }

    /// Statements up to the closing brace. The brace is optional at end of
    /// input in lenient mode.
    fn parse_block_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();
        loop {
            if self.match_operator(";") {
                continue;
            }
            if self.match_operator("}") {
                return Ok(statements);
            }
            if self.is_at_end() {
                if self.mode == SyntaxMode::Strict {
                    return Err(self.unexpected("'}'"));
                }
                return Ok(statements);
            }
            statements.push(self.parse_statement()?);
        }
    }

    //=============================================
    //            Section 5: Token Navigation
    //=============================================

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let index = (self.current + offset).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    fn is_at_end(&self) -> bool {
        self.peek().is_eof()
    }

    fn check_operator(&self, op: &str) -> bool {
        self.peek().is_operator(op)
    }

    fn match_operator(&mut self, op: &str) -> bool {
        if self.check_operator(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume_operator(&mut self, op: &str, expected: &str) -> Result<Token, ParseError> {
        if self.check_operator(op) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn consume_binding_name(&mut self, expected: &str) -> Result<String, ParseError> {
        let token = self.peek().clone();
        if token.kind == TokenKind::Identifier && !token.text.contains('.') {
            self.advance();
            Ok(token.text)
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn consume_terminator(&mut self) {
        self.match_operator(";");
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        if token.is_eof() {
            ParseError::UnexpectedEndOfInput {
                expected: expected.to_string(),
                position: token.position,
            }
        } else {
            ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: token.text.clone(),
                position: token.position,
            }
        }
    }
}

//=============================================
//            Section 6: Entry Points
//=============================================

/// Tokenize and parse `source` in one step.
pub fn parse_program(source: &str, mode: SyntaxMode) -> Result<Program, SyntaxError> {
    let tokens = Tokenizer::new(source).with_mode(mode).tokenize()?;
    let program = Parser::new(tokens).with_mode(mode).parse()?;
    Ok(program)
}

/// Parse a single expression, used by tooling and tests.
pub fn parse_expression_source(source: &str) -> Result<Expr, SyntaxError> {
    let tokens = Tokenizer::new(source).tokenize()?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expression()?;
    Ok(expr)
}

//=============================================
//            Section 7: Tests
//=============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;

    fn parse(source: &str) -> Program {
        parse_program(source, SyntaxMode::Lenient).expect("lenient parse")
    }

    #[test]
    fn parses_variable_and_call() {
        let program = parse("nekVariable x = \"v\"; nekAfficher(x);");
        assert_eq!(program.statements.len(), 2);
        match &program.statements[1] {
            Stmt::Expression {
                expr: Expr::Call { callee, args, .. },
                ..
            } => {
                assert_eq!(callee.path().as_deref(), Some("nekAfficher"));
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected call statement, found {other:?}"),
        }
    }

    #[test]
    fn if_accepts_bare_condition_and_single_statement_bodies() {
        let program = parse("nekSi x > 1 nekAfficher(\"a\") sinon nekAfficher(\"b\")");
        match &program.statements[0] {
            Stmt::If {
                condition,
                else_branch,
                ..
            } => {
                assert!(matches!(
                    condition,
                    Expr::Binary {
                        operator: BinaryOp::Greater,
                        ..
                    }
                ));
                assert!(else_branch.is_some());
            }
            other => panic!("expected if statement, found {other:?}"),
        }
    }

    #[test]
    fn missing_closing_brace_is_tolerated() {
        let program = parse("nekFonction f(a) { nekRetourner a");
        match &program.statements[0] {
            Stmt::FunctionDecl { decl } => {
                assert_eq!(decl.params, vec!["a".to_string()]);
                assert_eq!(decl.body.len(), 1);
            }
            other => panic!("expected function, found {other:?}"),
        }
        assert!(program.diagnostics.is_empty());
    }

    #[test]
    fn strict_mode_requires_closing_brace() {
        let err = parse_program("nekFonction f(a) { nekRetourner a", SyntaxMode::Strict)
            .expect_err("strict parse should fail");
        assert!(matches!(
            err,
            SyntaxError::Parse(ParseError::UnexpectedEndOfInput { .. })
        ));
    }

    #[test]
    fn top_level_error_keeps_partial_program() {
        let program = parse("nekVariable a = 1; nekFonction (; nekVariable b = 2;");
        assert_eq!(program.statements.len(), 1);
        assert_eq!(program.diagnostics.len(), 1);
    }

    #[test]
    fn deep_statement_nesting_is_a_syntax_error() {
        let source = "si vrai { ".repeat(5000);
        let diagnostics = parse_program(&source, SyntaxMode::Lenient)
            .expect("lenient parse records the error")
            .diagnostics;
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].contains("trop imbriquées"), "{diagnostics:?}");

        let nested = format!("{}nekAfficher(1){}", "si vrai { ".repeat(10), " }".repeat(10));
        assert!(parse_program(&nested, SyntaxMode::Strict).is_ok());
    }

    #[test]
    fn deep_expression_nesting_is_a_syntax_error() {
        let source = format!("nekAfficher({}1{})", "(".repeat(5000), ")".repeat(5000));
        assert!(parse_program(&source, SyntaxMode::Strict).is_err());
    }

    #[test]
    fn module_without_name_gets_placeholder() {
        let program = parse("nekModule { nekVariable x = 1 }");
        match &program.statements[0] {
            Stmt::ModuleDecl { decl } => {
                assert_eq!(decl.name, PLACEHOLDER_MODULE_NAME);
                assert_eq!(decl.body.len(), 1);
            }
            other => panic!("expected module, found {other:?}"),
        }
    }

    #[test]
    fn module_body_skips_broken_statements() {
        let program = parse("nekModule Outils { nekVariable = ; nekVariable ok = 1 }");
        match &program.statements[0] {
            Stmt::ModuleDecl { decl } => {
                assert!(decl.body.iter().any(|stmt| matches!(
                    stmt,
                    Stmt::VariableDecl { decl } if decl.name == "ok"
                )));
            }
            other => panic!("expected module, found {other:?}"),
        }
    }

    #[test]
    fn both_import_forms() {
        let program = parse("importer Math; nekImporter Discord depuis \"discord\";");
        let imports = program.find_imports();
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].kind, ImportKind::Local);
        assert_eq!(imports[0].module_key(), "Math");
        assert_eq!(imports[1].kind, ImportKind::External);
        assert_eq!(imports[1].name, "Discord");
        assert_eq!(imports[1].module_key(), "discord");
    }

    #[test]
    fn stray_tokens_become_unknown_statements() {
        let program = parse(") nekAfficher(1)");
        assert!(matches!(program.statements[0], Stmt::Unknown { .. }));
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn else_after_semicolon_still_binds() {
        let program = parse("si vrai { a = 1 }; sinon { a = 2 }");
        assert_eq!(program.statements.len(), 1);
    }
}
