//=============================================
// nekoscript/interpreter/errors.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Runtime error taxonomy
// Objective: RuntimeError variants raised while evaluating, plus the coded
//            ScriptError surfaced to embedders and the CLI
//=============================================

use super::Value;
use crate::modules::{ModuleError, PackageError};
use crate::parser::{ParseError, SyntaxError};
use crate::tokenizer::TokenizeError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    #[error("variable '{0}' non définie")]
    VariableNotFound(String),
    #[error("fonction '{0}' non définie")]
    FunctionNotDefined(String),
    #[error("méthode '{0}' non définie")]
    MethodNotDefined(String),
    #[error("propriété '{0}' introuvable")]
    PropertyNotFound(String),
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error("erreur de type : {0}")]
    TypeError(String),
    #[error("erreur d'argument : {0}")]
    ArgumentError(String),
    #[error("erreur d'index : {0}")]
    IndexError(String),
    #[error("division par zéro")]
    DivisionByZero,
    #[error("profondeur d'appel maximale dépassée ({0})")]
    StackOverflow(usize),
    #[error("erreur d'entrée/sortie : {0}")]
    Io(String),
    #[error("erreur réseau : {0}")]
    Network(String),
    #[error("erreur de l'hôte : {0}")]
    Host(String),
    #[error("{0}")]
    User(String),
    /// The process was asked to stop while the program was still running.
    #[error("exécution interrompue")]
    Interrupted,
    /// Carries a `retourner` value up to the enclosing call.
    #[error("'retourner' utilisé hors d'une fonction")]
    Return(Value),
}

impl From<std::io::Error> for RuntimeError {
    fn from(value: std::io::Error) -> Self {
        RuntimeError::Io(value.to_string())
    }
}

impl From<ureq::Error> for RuntimeError {
    fn from(value: ureq::Error) -> Self {
        RuntimeError::Network(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Syntax,
    Resolution,
    TypeMismatch,
    InvalidOperation,
    Host,
    User,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Syntax => "E001",
            ErrorCode::Resolution => "E002",
            ErrorCode::TypeMismatch => "E003",
            ErrorCode::InvalidOperation => "E004",
            ErrorCode::Host => "E005",
            ErrorCode::User => "E006",
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("[{}] {message}", code.as_str())]
pub struct ScriptError {
    pub code: ErrorCode,
    pub message: String,
}

impl ScriptError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl From<TokenizeError> for ScriptError {
    fn from(value: TokenizeError) -> Self {
        ScriptError::new(ErrorCode::Syntax, value.to_string())
    }
}

impl From<ParseError> for ScriptError {
    fn from(value: ParseError) -> Self {
        ScriptError::new(ErrorCode::Syntax, value.to_string())
    }
}

impl From<SyntaxError> for ScriptError {
    fn from(value: SyntaxError) -> Self {
        ScriptError::new(ErrorCode::Syntax, value.to_string())
    }
}

impl From<ModuleError> for ScriptError {
    fn from(value: ModuleError) -> Self {
        ScriptError::new(module_error_code(&value), value.to_string())
    }
}

impl From<PackageError> for ScriptError {
    fn from(value: PackageError) -> Self {
        let code = match value {
            PackageError::Io(_) | PackageError::Remote(_) | PackageError::Serialization(_) => {
                ErrorCode::Host
            }
            _ => ErrorCode::Resolution,
        };
        ScriptError::new(code, value.to_string())
    }
}

impl From<RuntimeError> for ScriptError {
    fn from(value: RuntimeError) -> Self {
        ScriptError::new(runtime_error_code(&value), value.to_string())
    }
}

fn module_error_code(error: &ModuleError) -> ErrorCode {
    match error {
        ModuleError::Syntax { .. } => ErrorCode::Syntax,
        ModuleError::Evaluation { .. } | ModuleError::Package(PackageError::Remote(_)) => {
            ErrorCode::Host
        }
        _ => ErrorCode::Resolution,
    }
}

pub fn runtime_error_code(error: &RuntimeError) -> ErrorCode {
    match error {
        RuntimeError::VariableNotFound(_)
        | RuntimeError::FunctionNotDefined(_)
        | RuntimeError::MethodNotDefined(_)
        | RuntimeError::PropertyNotFound(_) => ErrorCode::Resolution,
        RuntimeError::Module(module) => module_error_code(module),
        RuntimeError::TypeError(_) => ErrorCode::TypeMismatch,
        RuntimeError::ArgumentError(_)
        | RuntimeError::IndexError(_)
        | RuntimeError::DivisionByZero
        | RuntimeError::Return(_) => ErrorCode::InvalidOperation,
        RuntimeError::StackOverflow(_)
        | RuntimeError::Io(_)
        | RuntimeError::Network(_)
        | RuntimeError::Host(_)
        | RuntimeError::Interrupted => ErrorCode::Host,
        RuntimeError::User(_) => ErrorCode::User,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_errors_map_to_codes() {
        let cases = [
            (RuntimeError::FunctionNotDefined("f".into()), "E002"),
            (RuntimeError::TypeError("x".into()), "E003"),
            (RuntimeError::DivisionByZero, "E004"),
            (RuntimeError::Network("hors ligne".into()), "E005"),
            (RuntimeError::User("stop".into()), "E006"),
        ];
        for (error, code) in cases {
            assert_eq!(ScriptError::from(error).code_str(), code);
        }
    }

    #[test]
    fn script_error_display_includes_code() {
        let error = ScriptError::new(ErrorCode::Syntax, "attendu ')'");
        assert_eq!(error.to_string(), "[E001] attendu ')'");
    }
}
