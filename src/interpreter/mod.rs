//=============================================
// nekoscript/interpreter/mod.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: NekoScript tree-walking interpreter
// Objective: Evaluate parsed programs against a scope chain, resolving imports
//            through the module registry and invoking capability modules
//=============================================

//=============================================
//            Section 1: Crate Attributes & Imports
//=============================================

pub mod errors;
pub mod host;
mod methods;
pub mod scope;
pub mod value;

pub use errors::{ErrorCode, RuntimeError, ScriptError, runtime_error_code};
pub use host::{ExecutionMode, HostTask, TaskStatus};
pub use methods::{join_values, split_text};
pub use scope::Scope;
pub use value::{
    Bindings, Closure, NativeArity, NativeFunction, Value, arg, expect_callable, expect_list,
    expect_map, expect_number, expect_text, format_number, json_to_value, value_to_json,
};

use crate::ast::{BinaryOp, Expr, ImportDecl, Program, Stmt, UnaryOp};
use crate::config::EngineConfig;
use crate::modules::{ModuleRegistry, SharedHostModules, SharedPackageStore};
use crate::runtime::StopSignal;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::rc::Rc;
use std::sync::Arc;

//=============================================
//            Section 2: Interpreter State
//=============================================

/// Lines printed by `nekAfficher`, shareable with a supervisor.
pub type OutputBuffer = Arc<Mutex<Vec<String>>>;

/// State shared by every interpreter an engine creates. All members are
/// thread-safe so supervised processes can build their own interpreter.
#[derive(Clone, Default)]
pub struct RuntimeContext {
    pub config: EngineConfig,
    pub packages: SharedPackageStore,
    pub host_modules: SharedHostModules,
}

pub struct Interpreter {
    globals: Rc<Scope>,
    config: EngineConfig,
    mode: ExecutionMode,
    output: OutputBuffer,
    input: VecDeque<String>,
    pub(crate) modules: ModuleRegistry,
    pub(crate) packages: SharedPackageStore,
    pub(crate) host_modules: SharedHostModules,
    tasks: Vec<Box<dyn HostTask>>,
    stop: StopSignal,
    call_depth: usize,
}

/// Names pre-seeded in every global scope.
pub const GLOBAL_BUILTINS: [&str; 7] = [
    "nekAfficher",
    "nekDemander",
    "nekTexte",
    "nekNombre",
    "nekType",
    "nekLongueur",
    "nekAttendre",
];

impl Interpreter {
    pub fn new() -> Self {
        Self::with_context(RuntimeContext::default(), ExecutionMode::Immediate)
    }

    pub fn with_context(context: RuntimeContext, mode: ExecutionMode) -> Self {
        let mut interpreter = Self {
            globals: Scope::global(),
            config: context.config,
            mode,
            output: OutputBuffer::default(),
            input: VecDeque::new(),
            modules: ModuleRegistry::new(),
            packages: context.packages,
            host_modules: context.host_modules,
            tasks: Vec::new(),
            stop: StopSignal::never(),
            call_depth: 0,
        };
        interpreter.init_builtins();
        interpreter
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn is_persistent(&self) -> bool {
        self.mode == ExecutionMode::Persistent
    }

    pub fn globals(&self) -> Rc<Scope> {
        Rc::clone(&self.globals)
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    /// Fresh global scope; the module registry is kept.
    pub fn reset_globals(&mut self) {
        self.globals = Scope::global();
        self.init_builtins();
    }

    //=============================================
    //            Section 3: Output & Input
    //=============================================

    pub fn print_line(&mut self, line: impl Into<String>) {
        let line = line.into();
        if self.config.engine.echo_output {
            println!("{line}");
        }
        self.output.lock().push(line);
    }

    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut *self.output.lock())
    }

    pub fn output_handle(&self) -> OutputBuffer {
        Arc::clone(&self.output)
    }

    /// Print into `buffer` from now on (a supervisor reads it live).
    pub fn share_output(&mut self, buffer: OutputBuffer) {
        self.output = buffer;
    }

    /// Queue a line for `nekDemander`/`lireEntree` instead of reading stdin.
    pub fn push_input(&mut self, line: impl Into<String>) {
        self.input.push_back(line.into());
    }

    pub fn read_line(&mut self, prompt: Option<&str>) -> Result<String, RuntimeError> {
        if let Some(line) = self.input.pop_front() {
            return Ok(line);
        }
        if let Some(prompt) = prompt {
            print!("{prompt}");
            io::stdout().flush()?;
        }
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    //=============================================
    //            Section 4: Builtin Registration
    //=============================================

    fn init_builtins(&mut self) {
        self.register_builtin("nekAfficher", NativeArity::ANY, Interpreter::builtin_afficher);
        self.register_builtin(
            "nekDemander",
            NativeArity::between(0, 1),
            Interpreter::builtin_demander,
        );
        self.register_builtin("nekTexte", NativeArity::Exact(1), Interpreter::builtin_texte);
        self.register_builtin("nekNombre", NativeArity::Exact(1), Interpreter::builtin_nombre);
        self.register_builtin("nekType", NativeArity::Exact(1), Interpreter::builtin_type);
        self.register_builtin(
            "nekLongueur",
            NativeArity::Exact(1),
            Interpreter::builtin_longueur,
        );
        self.register_builtin(
            "nekAttendre",
            NativeArity::between(1, 2),
            Interpreter::builtin_attendre,
        );
    }

    fn register_builtin(
        &mut self,
        name: &str,
        arity: NativeArity,
        func: fn(&mut Interpreter, &[Value]) -> Result<Value, RuntimeError>,
    ) {
        self.globals.define(name, Value::native(name, arity, func));
    }

    fn builtin_afficher(&mut self, args: &[Value]) -> Result<Value, RuntimeError> {
        let line = args
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        self.print_line(line);
        Ok(Value::Null)
    }

    fn builtin_demander(&mut self, args: &[Value]) -> Result<Value, RuntimeError> {
        let prompt = args.first().map(Value::to_string);
        self.read_line(prompt.as_deref()).map(Value::Str)
    }

    fn builtin_texte(&mut self, args: &[Value]) -> Result<Value, RuntimeError> {
        Ok(Value::text(arg(args, 0).to_string()))
    }

    fn builtin_nombre(&mut self, args: &[Value]) -> Result<Value, RuntimeError> {
        Ok(arg(args, 0)
            .to_number()
            .map(Value::Number)
            .unwrap_or(Value::Null))
    }

    fn builtin_type(&mut self, args: &[Value]) -> Result<Value, RuntimeError> {
        Ok(Value::text(arg(args, 0).type_name()))
    }

    fn builtin_longueur(&mut self, args: &[Value]) -> Result<Value, RuntimeError> {
        length_of(&arg(args, 0)).map(|len| Value::Number(len as f64))
    }

    fn builtin_attendre(&mut self, args: &[Value]) -> Result<Value, RuntimeError> {
        self.sleep_builtin(args, "nekAttendre")
    }

    //=============================================
    //            Section 5: Statement Evaluation
    //=============================================

    /// Run every top-level statement of `program` in the global scope. A
    /// top-level `retourner` ends the program early.
    pub fn execute(&mut self, program: &Program) -> Result<(), RuntimeError> {
        let globals = self.globals();
        for stmt in &program.statements {
            match self.exec_stmt(stmt, &globals) {
                Ok(()) => {}
                Err(RuntimeError::Return(_)) => break,
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }

    /// Evaluate `statements` in `scope`, propagating `Return`.
    pub fn exec_block(&mut self, statements: &[Stmt], scope: &Rc<Scope>) -> Result<(), RuntimeError> {
        for stmt in statements {
            self.exec_stmt(stmt, scope)?;
        }
        Ok(())
    }

    fn exec_stmt(&mut self, stmt: &Stmt, scope: &Rc<Scope>) -> Result<(), RuntimeError> {
        match stmt {
            Stmt::VariableDecl { decl } => {
                let value = match &decl.initializer {
                    Some(expr) => self.eval_expr(expr, scope)?,
                    None => Value::Null,
                };
                scope.define(decl.name.clone(), value);
                Ok(())
            }

            Stmt::FunctionDecl { decl } => {
                let closure = Closure {
                    decl: Rc::clone(decl),
                    scope: Rc::clone(scope),
                };
                scope.define(decl.display_name(), Value::Function(Rc::new(closure)));
                Ok(())
            }

            Stmt::ModuleDecl { decl } => {
                let module_scope = Scope::child(scope);
                match self.exec_block(&decl.body, &module_scope) {
                    Ok(()) | Err(RuntimeError::Return(_)) => {}
                    Err(error) => return Err(error),
                }
                let exports = module_scope.local_bindings();
                tracing::debug!(module = %decl.name, exports = exports.len(), "module declared");
                self.modules.register(decl.name.clone(), exports);
                Ok(())
            }

            Stmt::Import { decl } => self.exec_import(decl, scope),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.eval_expr(condition, scope)?.is_truthy() {
                    self.exec_stmt(then_branch, scope)
                } else if let Some(else_branch) = else_branch {
                    self.exec_stmt(else_branch, scope)
                } else {
                    Ok(())
                }
            }

            Stmt::While {
                condition, body, ..
            } => {
                while self.eval_expr(condition, scope)?.is_truthy() {
                    self.check_interrupt()?;
                    self.exec_stmt(body, scope)?;
                }
                Ok(())
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr, scope)?,
                    None => Value::Null,
                };
                Err(RuntimeError::Return(value))
            }

            Stmt::Assign { name, value, .. } => {
                let value = self.eval_expr(value, scope)?;
                if scope.assign(name, value) {
                    Ok(())
                } else {
                    Err(RuntimeError::VariableNotFound(name.clone()))
                }
            }

            Stmt::Block { statements, .. } => {
                let block_scope = Scope::child(scope);
                self.exec_block(statements, &block_scope)
            }

            Stmt::Expression { expr, .. } => {
                self.eval_expr(expr, scope)?;
                Ok(())
            }

            Stmt::Unknown { text, .. } => {
                self.print_line(format!("[instruction non reconnue : {text}]"));
                Ok(())
            }
        }
    }

    /// Merge the module's bindings and bind the module map under its name.
    fn exec_import(&mut self, decl: &ImportDecl, scope: &Rc<Scope>) -> Result<(), RuntimeError> {
        let bindings = self.import_module(decl.module_key())?;
        scope.merge(&bindings);
        scope.define(decl.name.clone(), Value::Map(bindings));
        Ok(())
    }

    //=============================================
    //            Section 6: Expression Evaluation
    //=============================================

    pub fn eval_expr(&mut self, expr: &Expr, scope: &Rc<Scope>) -> Result<Value, RuntimeError> {
        match expr {
            Expr::StringLiteral { value, .. } => Ok(Value::Str(value.clone())),
            Expr::NumberLiteral { value, .. } => Ok(Value::Number(*value)),
            Expr::BooleanLiteral { value, .. } => Ok(Value::Bool(*value)),
            Expr::NullLiteral { .. } => Ok(Value::Null),

            Expr::Identifier { name, .. } => scope
                .get(name)
                .ok_or_else(|| RuntimeError::VariableNotFound(name.clone())),

            Expr::Member {
                object, property, ..
            } => {
                let receiver = self.eval_expr(object, scope)?;
                member_of(&receiver, property).ok_or_else(|| {
                    RuntimeError::PropertyNotFound(
                        expr.path().unwrap_or_else(|| property.clone()),
                    )
                })
            }

            Expr::Index { object, index, .. } => {
                let object = self.eval_expr(object, scope)?;
                let index = self.eval_expr(index, scope)?;
                index_value(object, index)
            }

            Expr::Call { callee, args, .. } => self.eval_call(callee, args, scope),

            Expr::Binary {
                left,
                operator,
                right,
                ..
            } => match operator {
                BinaryOp::And => {
                    let left = self.eval_expr(left, scope)?;
                    if !left.is_truthy() {
                        return Ok(Value::Bool(false));
                    }
                    Ok(Value::Bool(self.eval_expr(right, scope)?.is_truthy()))
                }
                BinaryOp::Or => {
                    let left = self.eval_expr(left, scope)?;
                    if left.is_truthy() {
                        return Ok(Value::Bool(true));
                    }
                    Ok(Value::Bool(self.eval_expr(right, scope)?.is_truthy()))
                }
                _ => {
                    let left = self.eval_expr(left, scope)?;
                    let right = self.eval_expr(right, scope)?;
                    eval_binary_op(*operator, left, right)
                }
            },

            Expr::Unary {
                operator, operand, ..
            } => {
                let operand = self.eval_expr(operand, scope)?;
                eval_unary_op(*operator, operand)
            }

            Expr::List { items, .. } => {
                let values = items
                    .iter()
                    .map(|item| self.eval_expr(item, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(values))
            }

            Expr::Map { entries, .. } => {
                let mut map = Bindings::new();
                for (key, value) in entries {
                    let value = self.eval_expr(value, scope)?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::Map(map))
            }

            Expr::Function { decl } => Ok(Value::Function(Rc::new(Closure {
                decl: Rc::clone(decl),
                scope: Rc::clone(scope),
            }))),

            Expr::Unknown { text, .. } => Ok(Value::text(format!("[expression non reconnue : {text}]"))),
        }
    }

    fn eval_args(&mut self, args: &[Expr], scope: &Rc<Scope>) -> Result<Vec<Value>, RuntimeError> {
        args.iter().map(|arg| self.eval_expr(arg, scope)).collect()
    }

    fn eval_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        scope: &Rc<Scope>,
    ) -> Result<Value, RuntimeError> {
        match callee {
            Expr::Identifier { name, .. } => {
                let func = scope
                    .get(name)
                    .filter(Value::is_callable)
                    .ok_or_else(|| RuntimeError::FunctionNotDefined(name.clone()))?;
                let args = self.eval_args(args, scope)?;
                self.call_value(&func, args)
            }

            Expr::Member {
                object, property, ..
            } => {
                let receiver = self.eval_expr(object, scope)?;
                let args = self.eval_args(args, scope)?;
                let path = || callee.path().unwrap_or_else(|| property.clone());

                match &receiver {
                    Value::Map(map) => match map.get(property) {
                        Some(func) if func.is_callable() => {
                            let func = func.clone();
                            self.call_with_receiver(&func, args, Some(receiver.clone()))
                        }
                        _ => Err(RuntimeError::MethodNotDefined(path())),
                    },
                    Value::Str(text) => methods::text_method(text, property, &args)
                        .unwrap_or_else(|| Err(RuntimeError::MethodNotDefined(path()))),
                    Value::List(items) => methods::list_method(items, property, &args)
                        .unwrap_or_else(|| Err(RuntimeError::MethodNotDefined(path()))),
                    _ => Err(RuntimeError::MethodNotDefined(path())),
                }
            }

            other => {
                let func = self.eval_expr(other, scope)?;
                if !func.is_callable() {
                    return Err(RuntimeError::TypeError(format!(
                        "une valeur de type '{}' n'est pas appelable",
                        func.type_name()
                    )));
                }
                let args = self.eval_args(args, scope)?;
                self.call_value(&func, args)
            }
        }
    }

    //=============================================
    //            Section 7: Function Calls
    //=============================================

    /// Invoke a callable value. Used by the evaluator and by capability
    /// modules dispatching script callbacks.
    pub fn call_value(&mut self, func: &Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        self.call_with_receiver(func, args, None)
    }

    /// Invoke `func`; user functions called through a map see the map as
    /// `ceci`. Missing parameters are bound to `nul`, extra arguments ignored.
    pub fn call_with_receiver(
        &mut self,
        func: &Value,
        args: Vec<Value>,
        receiver: Option<Value>,
    ) -> Result<Value, RuntimeError> {
        let max_depth = self.config.engine.max_call_depth;
        if self.call_depth >= max_depth {
            return Err(RuntimeError::StackOverflow(max_depth));
        }

        match func {
            Value::Native(native) => {
                self.call_depth += 1;
                let result = native.call(self, &args);
                self.call_depth -= 1;
                result
            }

            Value::Function(closure) => {
                let call_scope = Scope::child(&closure.scope);
                let mut args = args.into_iter();
                for param in &closure.decl.params {
                    call_scope.define(param.clone(), args.next().unwrap_or_default());
                }
                if let Some(receiver) = receiver {
                    call_scope.define("ceci", receiver);
                }

                self.call_depth += 1;
                let result = self.exec_block(&closure.decl.body, &call_scope);
                self.call_depth -= 1;

                match result {
                    Ok(()) => Ok(Value::Null),
                    Err(RuntimeError::Return(value)) => Ok(value),
                    Err(error) => Err(error),
                }
            }

            other => Err(RuntimeError::TypeError(format!(
                "une valeur de type '{}' n'est pas appelable",
                other.type_name()
            ))),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

//=============================================
//            Section 8: Operators
//=============================================

fn numeric_operands(
    op: BinaryOp,
    left: &Value,
    right: &Value,
) -> Result<(f64, f64), RuntimeError> {
    match (left.to_number(), right.to_number()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(RuntimeError::TypeError(format!(
            "'{op}' non supporté entre {} et {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

/// `+` adds two numbers and otherwise concatenates text.
pub fn eval_binary_op(op: BinaryOp, left: Value, right: Value) -> Result<Value, RuntimeError> {
    use BinaryOp::*;

    match op {
        Add => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::List(a), Value::List(b)) => {
                Ok(Value::List(a.iter().chain(b.iter()).cloned().collect()))
            }
            _ => Ok(Value::Str(format!("{left}{right}"))),
        },
        Subtract => numeric_operands(op, &left, &right).map(|(a, b)| Value::Number(a - b)),
        Multiply => numeric_operands(op, &left, &right).map(|(a, b)| Value::Number(a * b)),
        Divide => {
            let (a, b) = numeric_operands(op, &left, &right)?;
            if b == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(Value::Number(a / b))
        }
        Modulo => {
            let (a, b) = numeric_operands(op, &left, &right)?;
            if b == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(Value::Number(a % b))
        }
        Equal => Ok(Value::Bool(left.loose_eq(&right))),
        NotEqual => Ok(Value::Bool(!left.loose_eq(&right))),
        Less | Greater | LessEqual | GreaterEqual => {
            let ordering = match (&left, &right) {
                (Value::Str(a), Value::Str(b))
                    if left.to_number().is_none() || right.to_number().is_none() =>
                {
                    a.partial_cmp(b)
                }
                _ => {
                    let (a, b) = numeric_operands(op, &left, &right)?;
                    a.partial_cmp(&b)
                }
            };
            let Some(ordering) = ordering else {
                return Ok(Value::Bool(false));
            };
            Ok(Value::Bool(match op {
                Less => ordering.is_lt(),
                Greater => ordering.is_gt(),
                LessEqual => ordering.is_le(),
                _ => ordering.is_ge(),
            }))
        }
        Contains => match &left {
            Value::Str(text) => Ok(Value::Bool(text.contains(&right.to_string()))),
            Value::List(items) => Ok(Value::Bool(items.iter().any(|item| item.loose_eq(&right)))),
            Value::Map(map) => Ok(Value::Bool(map.contains_key(&right.to_string()))),
            other => Err(RuntimeError::TypeError(format!(
                "'contient' non supporté pour {}",
                other.type_name()
            ))),
        },
        StartsWith => Ok(Value::Bool(left.to_string().starts_with(&right.to_string()))),
        EndsWith => Ok(Value::Bool(left.to_string().ends_with(&right.to_string()))),
        And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
        Or => Ok(Value::Bool(left.is_truthy() || right.is_truthy())),
    }
}

fn eval_unary_op(op: UnaryOp, operand: Value) -> Result<Value, RuntimeError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
        UnaryOp::Minus => operand.to_number().map(|n| Value::Number(-n)).ok_or_else(|| {
            RuntimeError::TypeError(format!(
                "'-' unaire non supporté pour {}",
                operand.type_name()
            ))
        }),
    }
}

/// Non-call member access: map keys plus `longueur` on text and lists.
fn member_of(receiver: &Value, property: &str) -> Option<Value> {
    match receiver {
        Value::Map(map) => map.get(property).cloned(),
        Value::Str(_) | Value::List(_) if matches!(property, "longueur" | "length") => {
            length_of(receiver).ok().map(|len| Value::Number(len as f64))
        }
        _ => None,
    }
}

pub fn length_of(value: &Value) -> Result<usize, RuntimeError> {
    match value {
        Value::Str(text) => Ok(text.chars().count()),
        Value::List(items) => Ok(items.len()),
        Value::Map(map) => Ok(map.len()),
        Value::Null => Ok(0),
        other => Err(RuntimeError::TypeError(format!(
            "impossible de mesurer la longueur d'une valeur de type {}",
            other.type_name()
        ))),
    }
}

fn index_value(object: Value, index: Value) -> Result<Value, RuntimeError> {
    match (&object, &index) {
        (Value::List(items), Value::Number(n)) => {
            resolve_index(*n, items.len()).map(|i| items[i].clone())
        }
        (Value::Str(text), Value::Number(n)) => {
            let chars: Vec<char> = text.chars().collect();
            resolve_index(*n, chars.len()).map(|i| Value::text(chars[i].to_string()))
        }
        (Value::Map(map), key) => Ok(map.get(&key.to_string()).cloned().unwrap_or_default()),
        _ => Err(RuntimeError::TypeError(format!(
            "impossible d'indexer {} avec {}",
            object.type_name(),
            index.type_name()
        ))),
    }
}

/// Negative indices count from the end.
fn resolve_index(index: f64, len: usize) -> Result<usize, RuntimeError> {
    let raw = index.trunc() as i64;
    let resolved = if raw < 0 { len as i64 + raw } else { raw };
    if resolved < 0 || resolved >= len as i64 {
        return Err(RuntimeError::IndexError(format!(
            "index {raw} hors limites (longueur {len})"
        )));
    }
    Ok(resolved as usize)
}

//=============================================
//            Section 9: Tests
//=============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;
    use crate::tokenizer::SyntaxMode;

    fn run(source: &str) -> Result<Vec<String>, RuntimeError> {
        let program = parse_program(source, SyntaxMode::Lenient).expect("parse");
        let mut interpreter = Interpreter::new();
        interpreter.execute(&program)?;
        Ok(interpreter.take_output())
    }

    #[test]
    fn prints_variable() {
        assert_eq!(run("nekVariable x = \"v\"; nekAfficher(x);").expect("run"), vec!["v"]);
    }

    #[test]
    fn plus_adds_numbers_and_concatenates_text() {
        let output = run("nekAfficher(2 + 3); nekAfficher(\"2\" + \"3\"); nekAfficher(\"n\" + 1)")
            .expect("run");
        assert_eq!(output, vec!["5", "23", "n1"]);
    }

    #[test]
    fn exactly_one_branch_runs() {
        let output = run("si 1 > 2 { nekAfficher(\"a\") } sinon { nekAfficher(\"b\") }").expect("run");
        assert_eq!(output, vec!["b"]);
    }

    #[test]
    fn recursion_uses_independent_frames() {
        let output = run(
            "fonction fact(n) { si n <= 1 { retourner 1 } retourner n * fact(n - 1) }\nnekAfficher(fact(10))",
        )
        .expect("run");
        assert_eq!(output, vec!["3628800"]);
    }

    #[test]
    fn closures_capture_defining_scope() {
        let output = run(
            "fonction compteur() { nekVariable n = 0; retourner fonction() { n = n + 1; retourner n } }\n\
             nekVariable c = compteur(); c(); nekAfficher(c())",
        )
        .expect("run");
        assert_eq!(output, vec!["2"]);
    }

    #[test]
    fn while_loop_and_assignment() {
        let output = run("nekVariable i = 0; tantque i < 3 { i = i + 1 } nekAfficher(i)").expect("run");
        assert_eq!(output, vec!["3"]);
    }

    #[test]
    fn calling_unknown_function_is_resolution_error() {
        let err = run("inconnue()").expect_err("should fail");
        assert!(matches!(err, RuntimeError::FunctionNotDefined(ref name) if name == "inconnue"));
    }

    #[test]
    fn map_methods_receive_ceci() {
        let output = run(
            "nekVariable chat = { nom: \"Neko\", parler: fonction() { retourner ceci.nom + \" miaule\" } }\n\
             nekAfficher(chat.parler())",
        )
        .expect("run");
        assert_eq!(output, vec!["Neko miaule"]);
    }

    #[test]
    fn missing_map_method_is_reported() {
        let err = run("nekVariable m = { a: 1 }; m.b()").expect_err("should fail");
        assert!(matches!(err, RuntimeError::MethodNotDefined(ref path) if path == "m.b"));
    }

    #[test]
    fn call_depth_is_bounded() {
        let program = parse_program("fonction boucle() { retourner boucle() } boucle()", SyntaxMode::Lenient)
            .expect("parse");
        let mut context = RuntimeContext::default();
        context.config.engine.max_call_depth = 16;
        let mut interpreter = Interpreter::with_context(context, ExecutionMode::Immediate);
        let err = interpreter.execute(&program).expect_err("overflow");
        assert!(matches!(err, RuntimeError::StackOverflow(16)));
    }

    #[test]
    fn word_operators_evaluate() {
        let output = run(
            "nekVariable nom = \"neko\"\n\
             si nom commence par \"ne\" et nom est différent de \"chat\" { nekAfficher(\"ok\") }",
        )
        .expect("run");
        assert_eq!(output, vec!["ok"]);
    }

    #[test]
    fn unknown_statement_prints_diagnostic() {
        let output = run(") nekAfficher(1)").expect("run");
        assert_eq!(output, vec!["[instruction non reconnue : )]", "1"]);
    }

    #[test]
    fn queued_input_feeds_demander() {
        let program = parse_program("nekAfficher(\"bonjour \" + nekDemander())", SyntaxMode::Lenient)
            .expect("parse");
        let mut interpreter = Interpreter::new();
        interpreter.push_input("Mina");
        interpreter.execute(&program).expect("run");
        assert_eq!(interpreter.take_output(), vec!["bonjour Mina"]);
    }
}
