//=====================================================
// File: ast/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: NekoScript Abstract Syntax Tree definitions
// Objective: Define AST node types for programs, statements and expressions
//            produced by the parser and walked by the interpreter
//=====================================================

use crate::tokenizer::Position;
use std::fmt;
use std::rc::Rc;

/// Binary operators. Word operators (`contient`, `commence par`, ...) map onto
/// the same tags as their symbolic counterparts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    And,
    Or,
    Contains,
    StartsWith,
    EndsWith,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "et",
            BinaryOp::Or => "ou",
            BinaryOp::Contains => "contient",
            BinaryOp::StartsWith => "commence par",
            BinaryOp::EndsWith => "finit par",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Minus,
}

/// Expressions in NekoScript
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    StringLiteral {
        value: String,
        position: Position,
    },
    NumberLiteral {
        value: f64,
        position: Position,
    },
    BooleanLiteral {
        value: bool,
        position: Position,
    },
    NullLiteral {
        position: Position,
    },
    Identifier {
        name: String,
        position: Position,
    },
    Member {
        object: Box<Expr>,
        property: String,
        position: Position,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        position: Position,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        position: Position,
    },
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
        position: Position,
    },
    Unary {
        operator: UnaryOp,
        operand: Box<Expr>,
        position: Position,
    },
    List {
        items: Vec<Expr>,
        position: Position,
    },
    Map {
        entries: Vec<(String, Expr)>,
        position: Position,
    },
    Function {
        decl: Rc<FunctionDecl>,
    },
    Unknown {
        text: String,
        position: Position,
    },
}

impl Expr {
    pub fn position(&self) -> Position {
        match self {
            Expr::StringLiteral { position, .. }
            | Expr::NumberLiteral { position, .. }
            | Expr::BooleanLiteral { position, .. }
            | Expr::NullLiteral { position }
            | Expr::Identifier { position, .. }
            | Expr::Member { position, .. }
            | Expr::Index { position, .. }
            | Expr::Call { position, .. }
            | Expr::Binary { position, .. }
            | Expr::Unary { position, .. }
            | Expr::List { position, .. }
            | Expr::Map { position, .. }
            | Expr::Unknown { position, .. } => *position,
            Expr::Function { decl } => decl.position,
        }
    }

    /// Dotted name of an identifier/member chain (`bot.surMessage`), used for
    /// diagnostics and static analysis.
    pub fn path(&self) -> Option<String> {
        match self {
            Expr::Identifier { name, .. } => Some(name.clone()),
            Expr::Member {
                object, property, ..
            } => object.path().map(|base| format!("{base}.{property}")),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub name: String,
    pub initializer: Option<Expr>,
    pub position: Position,
}

/// Function declarations are shared between the AST and the closures built
/// from them, hence the `Rc` at use sites.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub position: Position,
}

impl FunctionDecl {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonyme>")
    }
}

pub const PLACEHOLDER_MODULE_NAME: &str = "ModuleSansNom";

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDecl {
    pub name: String,
    pub body: Vec<Stmt>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// `importer Nom`
    Local,
    /// `nekImporter Nom depuis "source"`
    External,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub name: String,
    pub source: Option<String>,
    pub kind: ImportKind,
    pub position: Position,
}

impl ImportDecl {
    /// Name used to resolve the module: the `depuis` source when present.
    pub fn module_key(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.name)
    }
}

/// Statements in NekoScript
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VariableDecl {
        decl: VariableDecl,
    },
    FunctionDecl {
        decl: Rc<FunctionDecl>,
    },
    ModuleDecl {
        decl: ModuleDecl,
    },
    Import {
        decl: ImportDecl,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        position: Position,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
        position: Position,
    },
    Return {
        value: Option<Expr>,
        position: Position,
    },
    Assign {
        name: String,
        value: Expr,
        position: Position,
    },
    Block {
        statements: Vec<Stmt>,
        position: Position,
    },
    Expression {
        expr: Expr,
        position: Position,
    },
    Unknown {
        text: String,
        position: Position,
    },
}

impl Stmt {
    pub fn position(&self) -> Position {
        match self {
            Stmt::VariableDecl { decl } => decl.position,
            Stmt::FunctionDecl { decl } => decl.position,
            Stmt::ModuleDecl { decl } => decl.position,
            Stmt::Import { decl } => decl.position,
            Stmt::If { position, .. }
            | Stmt::While { position, .. }
            | Stmt::Return { position, .. }
            | Stmt::Assign { position, .. }
            | Stmt::Block { position, .. }
            | Stmt::Expression { position, .. }
            | Stmt::Unknown { position, .. } => *position,
        }
    }

    /// Short label for logs and listings.
    pub fn describe(&self) -> String {
        match self {
            Stmt::VariableDecl { decl } => format!("variable {}", decl.name),
            Stmt::FunctionDecl { decl } => format!("fonction {}(..)", decl.display_name()),
            Stmt::ModuleDecl { decl } => format!("module {}", decl.name),
            Stmt::Import { decl } => format!("importer {}", decl.module_key()),
            Stmt::If { .. } => "si".into(),
            Stmt::While { .. } => "tantque".into(),
            Stmt::Return { .. } => "retourner".into(),
            Stmt::Assign { name, .. } => format!("{name} = .."),
            Stmt::Block { .. } => "bloc".into(),
            Stmt::Expression { .. } => "expression".into(),
            Stmt::Unknown { text, .. } => format!("inconnu `{text}`"),
        }
    }
}

/// Root of a parsed NekoScript file. Parse errors recovered in lenient mode
/// are kept in `diagnostics` so callers can surface them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
    pub diagnostics: Vec<String>,
}

impl Program {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self {
            statements,
            diagnostics: Vec::new(),
        }
    }

    pub fn find_imports(&self) -> Vec<&ImportDecl> {
        let mut imports = Vec::new();
        collect_imports(&self.statements, &mut imports);
        imports
    }
}

fn collect_imports<'a>(statements: &'a [Stmt], out: &mut Vec<&'a ImportDecl>) {
    for stmt in statements {
        match stmt {
            Stmt::Import { decl } => out.push(decl),
            Stmt::ModuleDecl { decl } => collect_imports(&decl.body, out),
            Stmt::Block { statements, .. } => collect_imports(statements, out),
            _ => {}
        }
    }
}
