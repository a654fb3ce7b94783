//=============================================
// nekoscript/stdx/mod.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Built-in capability modules
// Objective: Build the binding maps behind `importer Base/Math/Web/...` and
//            the stand-ins used when a capability cannot be constructed
//=============================================

pub mod base;
pub mod game;
pub mod math;
pub mod messaging;
pub mod web;

use crate::interpreter::{Bindings, Interpreter, NativeArity, RuntimeError, Value};
use crate::stdlib_registry::BuiltinModule;

/// Build a fresh instance of `module`. Every call yields independent state.
pub fn create_module(
    module: BuiltinModule,
    interpreter: &mut Interpreter,
) -> Result<Bindings, RuntimeError> {
    match module {
        BuiltinModule::Base => Ok(base::create_module()),
        BuiltinModule::Math => Ok(math::create_module()),
        BuiltinModule::Web => web::create_module(interpreter),
        BuiltinModule::Messaging => messaging::create_module(interpreter),
        BuiltinModule::Game => game::create_module(interpreter),
    }
}

/// Minimal hand-built bindings kept available when a factory fails.
pub fn fallback_module(module: BuiltinModule) -> Bindings {
    let mut builder = ModuleBuilder::new(module.canonical_name());
    match module {
        BuiltinModule::Base => {
            builder.function("afficher", NativeArity::ANY, base::afficher);
        }
        BuiltinModule::Math => {
            builder
                .constant("PI", Value::Number(std::f64::consts::PI))
                .constant("E", Value::Number(std::f64::consts::E))
                .function("racine", NativeArity::Exact(1), |_, args| {
                    math::unary(args, "racine", f64::sqrt)
                })
                .function("abs", NativeArity::Exact(1), |_, args| {
                    math::unary(args, "abs", f64::abs)
                });
        }
        BuiltinModule::Web => {
            builder.unavailable("creerServeur");
        }
        BuiltinModule::Messaging => {
            builder.unavailable("creerBot");
        }
        BuiltinModule::Game => {
            builder.unavailable("creerJeu");
        }
    }
    builder.build()
}

//=============================================
//            Section 1: Module Builder
//=============================================

/// Collects the bindings of one capability module.
pub(crate) struct ModuleBuilder {
    module: &'static str,
    bindings: Bindings,
}

impl ModuleBuilder {
    pub(crate) fn new(module: &'static str) -> Self {
        Self {
            module,
            bindings: Bindings::new(),
        }
    }

    pub(crate) fn function<F>(&mut self, name: &str, arity: NativeArity, func: F) -> &mut Self
    where
        F: Fn(&mut Interpreter, &[Value]) -> Result<Value, RuntimeError> + 'static,
    {
        self.bindings
            .insert(name.to_string(), Value::native(name, arity, func));
        self
    }

    pub(crate) fn constant(&mut self, name: &str, value: Value) -> &mut Self {
        self.bindings.insert(name.to_string(), value);
        self
    }

    /// A function that always reports the capability as unavailable.
    pub(crate) fn unavailable(&mut self, name: &str) -> &mut Self {
        let message = format!("{}.{name} est indisponible sur cet hôte", self.module);
        self.function(name, NativeArity::ANY, move |_, _| {
            Err(RuntimeError::Host(message.clone()))
        })
    }

    pub(crate) fn build(&mut self) -> Bindings {
        std::mem::take(&mut self.bindings)
    }
}

/// Build a map value from `(key, value)` pairs.
pub(crate) fn map_of<I, K>(entries: I) -> Value
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    Value::Map(
        entries
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect(),
    )
}
