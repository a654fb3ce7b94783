//=============================================
// nekoscript/interpreter/value.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: NekoScript runtime values
// Objective: Value enum, native function wrappers, arity checks, coercions
//            and JSON bridging shared by the interpreter and capability modules
//=============================================

use super::{Interpreter, RuntimeError, Scope};
use crate::ast::FunctionDecl;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Binding map exported by modules and stored in map values.
pub type Bindings = BTreeMap<String, Value>;

//=============================================
//            Section 1: Native Function Arity
//=============================================

/// Supported arity constraints for native (built-in) functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeArity {
    /// The function expects exactly this many arguments.
    Exact(usize),
    /// Inclusive minimum and optional maximum. `None` means no upper bound.
    Range { min: usize, max: Option<usize> },
}

impl NativeArity {
    pub const ANY: NativeArity = NativeArity::Range { min: 0, max: None };

    pub fn between(min: usize, max: usize) -> Self {
        NativeArity::Range {
            min,
            max: Some(max),
        }
    }

    pub fn at_least(min: usize) -> Self {
        NativeArity::Range { min, max: None }
    }

    pub fn accepts(&self, count: usize) -> bool {
        match self {
            NativeArity::Exact(n) => *n == count,
            NativeArity::Range { min, max } => {
                count >= *min && max.is_none_or(|max| count <= max)
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            NativeArity::Exact(1) => "1 argument".to_string(),
            NativeArity::Exact(n) => format!("{n} arguments"),
            NativeArity::Range { min, max } => match max {
                Some(max) if min == max => format!("{min} arguments"),
                Some(max) => format!("entre {min} et {max} arguments"),
                None if *min == 0 => "un nombre quelconque d'arguments".to_string(),
                None => format!("au moins {min} arguments"),
            },
        }
    }
}

//=============================================
//            Section 2: Callables
//=============================================

pub type NativeFn = dyn Fn(&mut Interpreter, &[Value]) -> Result<Value, RuntimeError>;

/// Host function exposed to scripts. Closures may capture per-instance
/// state (`Rc<RefCell<..>>`) so capability objects stay independent.
pub struct NativeFunction {
    pub name: String,
    pub arity: NativeArity,
    func: Rc<NativeFn>,
}

impl NativeFunction {
    pub fn call(&self, interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
        if !self.arity.accepts(args.len()) {
            return Err(RuntimeError::ArgumentError(format!(
                "la fonction '{}' attend {}, reçu {}",
                self.name,
                self.arity.describe(),
                args.len()
            )));
        }
        (self.func)(interpreter, args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// User function plus the scope it was declared in.
pub struct Closure {
    pub decl: Rc<FunctionDecl>,
    pub scope: Rc<Scope>,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.decl.display_name())
            .field("params", &self.decl.params)
            .finish()
    }
}

//=============================================
//            Section 3: Runtime Values
//=============================================

/// NekoScript runtime value types
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    List(Vec<Value>),
    Map(Bindings),
    Function(Rc<Closure>),
    Native(Rc<NativeFunction>),
}

impl Value {
    pub fn native<F>(name: impl Into<String>, arity: NativeArity, func: F) -> Self
    where
        F: Fn(&mut Interpreter, &[Value]) -> Result<Value, RuntimeError> + 'static,
    {
        Value::Native(Rc::new(NativeFunction {
            name: name.into(),
            arity,
            func: Rc::new(func),
        }))
    }

    pub fn text(value: impl Into<String>) -> Self {
        Value::Str(value.into())
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Function(_) | Value::Native(_) => true,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Native(_))
    }

    /// Type name as reported by `nekType` / `typeDe`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "nul",
            Value::Bool(_) => "booleen",
            Value::Number(_) => "nombre",
            Value::Str(_) => "texte",
            Value::List(_) => "liste",
            Value::Map(_) => "dictionnaire",
            Value::Function(_) | Value::Native(_) => "fonction",
        }
    }

    /// Numeric coercion: numbers, booleans and numeric-looking text.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(true) => Some(1.0),
            Value::Bool(false) => Some(0.0),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Bindings> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Equality used by `==`, `contient` and list searches: numbers compare
    /// with numeric-looking text, everything else structurally.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Str(_)) => other.to_number() == Some(*a),
            (Value::Str(_), Value::Number(b)) => self.to_number() == Some(*b),
            _ => self == other,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("nul"),
            Value::Bool(true) => f.write_str("vrai"),
            Value::Bool(false) => f.write_str("faux"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (key, val)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {val}")?;
                }
                f.write_str("}")
            }
            Value::Function(closure) => write!(f, "<fonction {}>", closure.decl.display_name()),
            Value::Native(native) => write!(f, "<fonction native {}>", native.name),
        }
    }
}

/// Integral numbers print without a fractional part.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

//=============================================
//            Section 4: Argument Helpers
//=============================================

/// Argument at `index`, or `Null` when absent.
pub fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

pub fn expect_number(value: &Value, context: &str) -> Result<f64, RuntimeError> {
    value.to_number().ok_or_else(|| {
        RuntimeError::TypeError(format!(
            "{context} attend un nombre, reçu {}",
            value.type_name()
        ))
    })
}

pub fn expect_text(value: &Value, context: &str) -> Result<String, RuntimeError> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        Value::Number(_) | Value::Bool(_) => Ok(value.to_string()),
        other => Err(RuntimeError::TypeError(format!(
            "{context} attend un texte, reçu {}",
            other.type_name()
        ))),
    }
}

pub fn expect_list(value: &Value, context: &str) -> Result<Vec<Value>, RuntimeError> {
    match value {
        Value::List(items) => Ok(items.clone()),
        other => Err(RuntimeError::TypeError(format!(
            "{context} attend une liste, reçu {}",
            other.type_name()
        ))),
    }
}

pub fn expect_map(value: &Value, context: &str) -> Result<Bindings, RuntimeError> {
    match value {
        Value::Map(map) => Ok(map.clone()),
        other => Err(RuntimeError::TypeError(format!(
            "{context} attend un dictionnaire, reçu {}",
            other.type_name()
        ))),
    }
}

pub fn expect_callable(value: &Value, context: &str) -> Result<Value, RuntimeError> {
    if value.is_callable() {
        Ok(value.clone())
    } else {
        Err(RuntimeError::TypeError(format!(
            "{context} attend une fonction, reçu {}",
            value.type_name()
        )))
    }
}

//=============================================
//            Section 5: JSON Bridging
//=============================================

pub fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Number(n) if n.fract() == 0.0 && n.abs() < 9e15 => JsonValue::from(*n as i64),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::Str(s) => JsonValue::String(s.clone()),
        Value::List(items) => JsonValue::Array(items.iter().map(value_to_json).collect()),
        Value::Map(map) => JsonValue::Object(
            map.iter()
                .filter(|(_, val)| !val.is_callable())
                .map(|(key, val)| (key.clone(), value_to_json(val)))
                .collect(),
        ),
        Value::Function(_) | Value::Native(_) => JsonValue::String(value.to_string()),
    }
}

pub fn json_to_value(json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(num) => Value::Number(num.as_f64().unwrap_or_default()),
        JsonValue::String(s) => Value::Str(s.clone()),
        JsonValue::Array(items) => Value::List(items.iter().map(json_to_value).collect()),
        JsonValue::Object(map) => Value::Map(
            map.iter()
                .map(|(key, val)| (key.clone(), json_to_value(val)))
                .collect(),
        ),
    }
}
