//=====================================================
// File: devtools/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: NekoScript developer tooling
// Objective: Static checks behind `neko tester`: strict parsing, import
//            resolution and name/flow warnings without running the program
//=====================================================

use crate::ast::{Expr, Program, Stmt};
use crate::interpreter::{GLOBAL_BUILTINS, Interpreter};
use crate::modules::PackageStore;
use crate::parser::parse_program;
use crate::stdlib_registry::BuiltinModule;
use crate::stdx;
use crate::tokenizer::{Position, SyntaxMode};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub position: Option<Position>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "erreur",
            Severity::Warning => "avertissement",
        };
        match self.position {
            Some(position) => write!(f, "{label} ({position}) : {}", self.message),
            None => write!(f, "{label} : {}", self.message),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl CheckReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning)
    }

    /// Text block printed by the CLI.
    pub fn render(&self) -> String {
        if self.diagnostics.is_empty() {
            return "Aucun problème détecté.".to_string();
        }
        let mut lines: Vec<String> = self.diagnostics.iter().map(ToString::to_string).collect();
        lines.push(format!(
            "{} erreur(s), {} avertissement(s)",
            self.errors().count(),
            self.warnings().count()
        ));
        lines.join("\n")
    }
}

/// Analyze `source` against the built-in modules and the published packages.
pub fn check_source(source: &str, packages: &PackageStore) -> CheckReport {
    let program = match parse_program(source, SyntaxMode::Strict) {
        Ok(program) => program,
        Err(error) => {
            return CheckReport {
                diagnostics: vec![Diagnostic {
                    severity: Severity::Error,
                    message: error.to_string(),
                    position: None,
                }],
            };
        }
    };
    Checker::new(packages).run(&program)
}

//=====================================================
// Section 1 - Checker
//=====================================================

struct Checker<'a> {
    packages: &'a PackageStore,
    known: BTreeSet<String>,
    local_modules: BTreeSet<String>,
    /// Host packages export names only known at run time.
    opaque_imports: bool,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Checker<'a> {
    fn new(packages: &'a PackageStore) -> Self {
        Self {
            packages,
            known: GLOBAL_BUILTINS.iter().map(|name| name.to_string()).collect(),
            local_modules: BTreeSet::new(),
            opaque_imports: false,
            diagnostics: Vec::new(),
        }
    }

    fn run(mut self, program: &Program) -> CheckReport {
        collect_declarations(&program.statements, &mut self.known, &mut self.local_modules);
        self.check_imports(program);
        self.check_statements(&program.statements, false);
        tracing::debug!(diagnostics = self.diagnostics.len(), "static check finished");
        CheckReport {
            diagnostics: self.diagnostics,
        }
    }

    fn report(&mut self, severity: Severity, message: String, position: Position) {
        self.diagnostics.push(Diagnostic {
            severity,
            message,
            position: Some(position),
        });
    }

    fn check_imports(&mut self, program: &Program) {
        let mut scratch = Interpreter::new();
        for decl in program.find_imports() {
            let key = decl.module_key();
            self.known.insert(decl.name.clone());

            if let Some(module) = BuiltinModule::lookup(key) {
                let exports = stdx::create_module(module, &mut scratch)
                    .unwrap_or_else(|_| stdx::fallback_module(module));
                self.known.extend(exports.into_keys());
            } else if let Some(package) = self.packages.get(key) {
                if package.is_host_code {
                    self.opaque_imports = true;
                } else {
                    match parse_program(&package.source_code, SyntaxMode::Lenient) {
                        Ok(parsed) => {
                            let mut ignored = BTreeSet::new();
                            collect_declarations(&parsed.statements, &mut self.known, &mut ignored);
                        }
                        Err(_) => self.opaque_imports = true,
                    }
                }
            } else if !self.local_modules.contains(key) {
                self.report(
                    Severity::Error,
                    format!("module '{key}' introuvable"),
                    decl.position,
                );
            }
        }
    }

    fn check_statements(&mut self, statements: &[Stmt], in_function: bool) {
        for stmt in statements {
            self.check_statement(stmt, in_function);
        }
    }

    fn check_statement(&mut self, stmt: &Stmt, in_function: bool) {
        match stmt {
            Stmt::VariableDecl { decl } => {
                if let Some(init) = &decl.initializer {
                    self.check_expr(init);
                }
            }
            Stmt::FunctionDecl { decl } => self.check_statements(&decl.body, true),
            Stmt::ModuleDecl { decl } => {
                if decl.body.is_empty() {
                    self.report(
                        Severity::Warning,
                        format!("le module '{}' est vide", decl.name),
                        decl.position,
                    );
                }
                self.check_statements(&decl.body, in_function);
            }
            Stmt::Import { .. } => {}
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.check_expr(condition);
                self.check_statement(then_branch, in_function);
                if let Some(else_branch) = else_branch {
                    self.check_statement(else_branch, in_function);
                }
            }
            Stmt::While { condition, body, .. } => {
                self.check_expr(condition);
                self.check_statement(body, in_function);
            }
            Stmt::Return { value, position } => {
                if !in_function {
                    self.report(
                        Severity::Warning,
                        "'retourner' utilisé hors d'une fonction".to_string(),
                        *position,
                    );
                }
                if let Some(value) = value {
                    self.check_expr(value);
                }
            }
            Stmt::Assign { value, .. } => self.check_expr(value),
            Stmt::Block { statements, .. } => self.check_statements(statements, in_function),
            Stmt::Expression { expr, .. } => self.check_expr(expr),
            Stmt::Unknown { text, position } => {
                self.report(
                    Severity::Warning,
                    format!("instruction non reconnue : {text}"),
                    *position,
                );
            }
        }
    }

    fn check_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Call {
                callee,
                args,
                position,
            } => {
                let undeclared = root_identifier(callee)
                    .filter(|root| !self.known.contains(*root) && !self.opaque_imports);
                if let Some(root) = undeclared {
                    self.report(
                        Severity::Warning,
                        format!("appel à '{root}' qui n'est jamais déclaré ni importé"),
                        *position,
                    );
                }
                self.check_expr(callee);
                for arg in args {
                    self.check_expr(arg);
                }
            }
            Expr::Member { object, .. } => self.check_expr(object),
            Expr::Index { object, index, .. } => {
                self.check_expr(object);
                self.check_expr(index);
            }
            Expr::Binary { left, right, .. } => {
                self.check_expr(left);
                self.check_expr(right);
            }
            Expr::Unary { operand, .. } => self.check_expr(operand),
            Expr::List { items, .. } => {
                for item in items {
                    self.check_expr(item);
                }
            }
            Expr::Map { entries, .. } => {
                for (_, value) in entries {
                    self.check_expr(value);
                }
            }
            Expr::Function { decl } => self.check_statements(&decl.body, true),
            Expr::Unknown { text, position } => {
                self.report(
                    Severity::Warning,
                    format!("expression non reconnue : {text}"),
                    *position,
                );
            }
            Expr::StringLiteral { .. }
            | Expr::NumberLiteral { .. }
            | Expr::BooleanLiteral { .. }
            | Expr::NullLiteral { .. }
            | Expr::Identifier { .. } => {}
        }
    }
}

fn root_identifier(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Identifier { name, .. } => Some(name),
        Expr::Member { object, .. } => root_identifier(object),
        _ => None,
    }
}

/// Flow-insensitive: every name bound anywhere in the file counts as declared.
fn collect_declarations(
    statements: &[Stmt],
    names: &mut BTreeSet<String>,
    modules: &mut BTreeSet<String>,
) {
    for stmt in statements {
        match stmt {
            Stmt::VariableDecl { decl } => {
                names.insert(decl.name.clone());
                if let Some(init) = &decl.initializer {
                    collect_from_expr(init, names, modules);
                }
            }
            Stmt::FunctionDecl { decl } => {
                if let Some(name) = &decl.name {
                    names.insert(name.clone());
                }
                names.extend(decl.params.iter().cloned());
                collect_declarations(&decl.body, names, modules);
            }
            Stmt::ModuleDecl { decl } => {
                names.insert(decl.name.clone());
                modules.insert(decl.name.clone());
                collect_declarations(&decl.body, names, modules);
            }
            Stmt::Import { decl } => {
                names.insert(decl.name.clone());
            }
            Stmt::Assign { name, value, .. } => {
                names.insert(name.clone());
                collect_from_expr(value, names, modules);
            }
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                collect_declarations(std::slice::from_ref(then_branch.as_ref()), names, modules);
                if let Some(else_branch) = else_branch {
                    collect_declarations(std::slice::from_ref(else_branch.as_ref()), names, modules);
                }
            }
            Stmt::While { body, .. } => {
                collect_declarations(std::slice::from_ref(body.as_ref()), names, modules);
            }
            Stmt::Block { statements, .. } => collect_declarations(statements, names, modules),
            Stmt::Expression { expr, .. } => collect_from_expr(expr, names, modules),
            Stmt::Return { .. } | Stmt::Unknown { .. } => {}
        }
    }
}

/// Anonymous function literals bind their parameters.
fn collect_from_expr(expr: &Expr, names: &mut BTreeSet<String>, modules: &mut BTreeSet<String>) {
    match expr {
        Expr::Function { decl } => {
            names.extend(decl.params.iter().cloned());
            collect_declarations(&decl.body, names, modules);
        }
        Expr::Call { callee, args, .. } => {
            collect_from_expr(callee, names, modules);
            for arg in args {
                collect_from_expr(arg, names, modules);
            }
        }
        Expr::List { items, .. } => {
            for item in items {
                collect_from_expr(item, names, modules);
            }
        }
        Expr::Map { entries, .. } => {
            for (_, value) in entries {
                collect_from_expr(value, names, modules);
            }
        }
        Expr::Binary { left, right, .. } => {
            collect_from_expr(left, names, modules);
            collect_from_expr(right, names, modules);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(source: &str) -> CheckReport {
        check_source(source, &PackageStore::new())
    }

    #[test]
    fn clean_program_has_no_diagnostics() {
        let report = check(
            "importer Math\nfonction carre(x) { retourner x * x }\nnekAfficher(carre(racine(16)))",
        );
        assert!(report.diagnostics.is_empty(), "{}", report.render());
        assert_eq!(report.render(), "Aucun problème détecté.");
    }

    #[test]
    fn syntax_errors_are_fatal() {
        let report = check("fonction f(a) { retourner a");
        assert!(report.has_errors());
        assert_eq!(report.diagnostics.len(), 1);
    }

    #[test]
    fn unknown_import_is_an_error() {
        let report = check("importer Fantome");
        assert!(report.has_errors());
        assert!(report.render().contains("Fantome"));
    }

    #[test]
    fn locally_declared_module_import_resolves() {
        let report = check("nekModule outils { fonction f() { retourner 1 } }\nimporter outils\nf()");
        assert!(!report.has_errors(), "{}", report.render());
    }

    #[test]
    fn undeclared_call_and_stray_return_warn() {
        let report = check("inconnu(1)\nretourner 2");
        assert!(!report.has_errors());
        let warnings: Vec<String> = report.warnings().map(ToString::to_string).collect();
        assert_eq!(warnings.len(), 2, "{warnings:?}");
        assert!(warnings[0].contains("inconnu"));
        assert!(warnings[1].contains("retourner"));
    }

    #[test]
    fn empty_module_warns() {
        let report = check("nekModule vide { }");
        assert_eq!(report.warnings().count(), 1);
    }

    #[test]
    fn package_exports_count_as_declared() {
        let mut store = PackageStore::new();
        store
            .publish("outils", "fonction aide() { retourner 1 }", false)
            .expect("publish");
        let report = check_source("importer outils\naide()", &store);
        assert!(report.diagnostics.is_empty(), "{}", report.render());
    }
}
