//=============================================
// nekoscript/modules/resolver.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Import resolution
// Objective: Resolve an import name to a binding map: registry cache, then
//            built-in capability modules, then published packages
//=============================================

use super::{ModuleError, Package};
use crate::interpreter::{Bindings, Interpreter, RuntimeError, Scope};
use crate::parser::parse_program;
use crate::stdlib_registry::BuiltinModule;
use crate::stdx;

impl Interpreter {
    /// Exports of the module `name`, loading and caching it on first use.
    pub fn import_module(&mut self, name: &str) -> Result<Bindings, RuntimeError> {
        if let Some(exports) = self.modules.get(name) {
            return Ok(exports);
        }

        if let Some(builtin) = BuiltinModule::lookup(name) {
            return Ok(self.load_builtin(builtin));
        }

        let package = self.packages.read().get(name).cloned();
        if let Some(package) = package {
            return self.load_package(package);
        }

        Err(ModuleError::NotFound {
            module: name.to_string(),
        }
        .into())
    }

    fn load_builtin(&mut self, builtin: BuiltinModule) -> Bindings {
        let key = builtin.canonical_name();
        if let Some(exports) = self.modules.get(key) {
            return exports;
        }

        let exports = match stdx::create_module(builtin, self) {
            Ok(exports) => exports,
            Err(error) => {
                tracing::warn!(module = key, %error, "built-in module failed, using stand-in");
                stdx::fallback_module(builtin)
            }
        };
        tracing::debug!(module = key, bindings = exports.len(), "built-in module loaded");
        self.modules.register(key, exports.clone());
        exports
    }

    fn load_package(&mut self, package: Package) -> Result<Bindings, RuntimeError> {
        self.modules.begin_loading(&package.name)?;
        let result = if package.is_host_code {
            self.load_host_package(&package)
        } else {
            self.load_source_package(&package)
        };

        match result {
            Ok(exports) => {
                tracing::debug!(package = %package.name, bindings = exports.len(), "package loaded");
                self.modules.register(package.name.clone(), exports.clone());
                Ok(exports)
            }
            Err(error) => {
                self.modules.abandon(&package.name);
                Err(error)
            }
        }
    }

    /// Host packages name a factory registered on the engine.
    fn load_host_package(&mut self, package: &Package) -> Result<Bindings, RuntimeError> {
        let factory_name = package.source_code.trim();
        let factory = self.host_modules.read().get(factory_name).cloned();
        let factory = factory.ok_or_else(|| ModuleError::UnknownHostFactory {
            module: package.name.clone(),
            factory: factory_name.to_string(),
        })?;
        factory(self)
    }

    /// Source packages run in their own scope. A module declared under the
    /// package name wins over the package's top-level bindings.
    fn load_source_package(&mut self, package: &Package) -> Result<Bindings, RuntimeError> {
        let program = parse_program(&package.source_code, self.config().engine.parse_mode)
            .map_err(|error| ModuleError::Syntax {
                module: package.name.clone(),
                message: error.to_string(),
            })?;

        let scope = Scope::child(&self.globals());
        match self.exec_block(&program.statements, &scope) {
            Ok(()) | Err(RuntimeError::Return(_)) => {}
            Err(RuntimeError::Module(error)) => return Err(error.into()),
            Err(error) => {
                return Err(ModuleError::Evaluation {
                    module: package.name.clone(),
                    message: error.to_string(),
                }
                .into());
            }
        }

        Ok(self
            .modules
            .get(&package.name)
            .unwrap_or_else(|| scope.local_bindings()))
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::{ExecutionMode, Interpreter, RuntimeContext, RuntimeError, Value};
    use crate::modules::{ModuleError, PackageStore};
    use crate::parser::parse_program;
    use crate::tokenizer::SyntaxMode;
    use std::sync::Arc;

    fn interpreter_with(packages: &[(&str, &str, bool)]) -> Interpreter {
        let mut store = PackageStore::new();
        for (name, code, host) in packages {
            store.publish(name, code, *host).expect("publish");
        }
        let context = RuntimeContext {
            packages: store.shared(),
            ..RuntimeContext::default()
        };
        Interpreter::with_context(context, ExecutionMode::Immediate)
    }

    fn run(interpreter: &mut Interpreter, source: &str) -> Result<Vec<String>, RuntimeError> {
        let program = parse_program(source, SyntaxMode::Lenient).expect("parse");
        interpreter.execute(&program)?;
        Ok(interpreter.take_output())
    }

    #[test]
    fn declared_module_is_importable() {
        let mut interpreter = Interpreter::new();
        let output = run(
            &mut interpreter,
            "nekModule salut { fonction bonjour(n) { retourner \"bonjour \" + n } }\n\
             importer salut\nnekAfficher(bonjour(\"Mina\"))\nnekAfficher(salut.bonjour(\"Léo\"))",
        )
        .expect("run");
        assert_eq!(output, vec!["bonjour Mina", "bonjour Léo"]);
    }

    #[test]
    fn unknown_module_is_not_found() {
        let mut interpreter = Interpreter::new();
        let err = run(&mut interpreter, "nekImporter Ghost").expect_err("missing");
        assert!(matches!(
            err,
            RuntimeError::Module(ModuleError::NotFound { ref module }) if module == "Ghost"
        ));
    }

    #[test]
    fn source_package_prefers_declared_module() {
        let mut interpreter = interpreter_with(&[(
            "outils",
            "nekVariable interne = 1\nnekModule outils { fonction double(x) { retourner x * 2 } }",
            false,
        )]);
        let output = run(&mut interpreter, "importer outils\nnekAfficher(double(21))").expect("run");
        assert_eq!(output, vec!["42"]);
        let exports = interpreter.modules().get("outils").expect("cached");
        assert!(exports.contains_key("double"));
        assert!(!exports.contains_key("interne"));
    }

    #[test]
    fn source_package_without_module_exports_top_level() {
        let mut interpreter = interpreter_with(&[("couleurs", "nekVariable rouge = \"#f00\"", false)]);
        let output = run(&mut interpreter, "importer couleurs\nnekAfficher(couleurs.rouge)").expect("run");
        assert_eq!(output, vec!["#f00"]);
    }

    #[test]
    fn cyclic_packages_are_rejected() {
        let mut interpreter = interpreter_with(&[
            ("a", "importer b\nnekVariable x = 1", false),
            ("b", "importer a\nnekVariable y = 2", false),
        ]);
        let err = run(&mut interpreter, "importer a").expect_err("cycle");
        assert!(matches!(
            err,
            RuntimeError::Module(ModuleError::Cyclic { ref module }) if module == "a"
        ));
        assert!(!interpreter.modules().contains("a"));
    }

    #[test]
    fn host_package_calls_registered_factory() {
        let mut store = PackageStore::new();
        store.publish("horloge", "horloge", true).expect("publish");
        let context = RuntimeContext {
            packages: store.shared(),
            ..RuntimeContext::default()
        };
        context.host_modules.write().insert(
            "horloge".into(),
            Arc::new(|_: &mut Interpreter| {
                let mut exports = crate::interpreter::Bindings::new();
                exports.insert("heure".into(), Value::text("midi"));
                Ok::<_, RuntimeError>(exports)
            }),
        );
        let mut interpreter = Interpreter::with_context(context, ExecutionMode::Immediate);
        let output = run(&mut interpreter, "importer horloge\nnekAfficher(heure)").expect("run");
        assert_eq!(output, vec!["midi"]);
    }

    #[test]
    fn host_package_without_factory_fails() {
        let mut interpreter = interpreter_with(&[("fantome", "inexistant", true)]);
        let err = run(&mut interpreter, "importer fantome").expect_err("no factory");
        assert!(matches!(
            err,
            RuntimeError::Module(ModuleError::UnknownHostFactory { .. })
        ));
    }

    #[test]
    fn builtin_import_is_cached_under_canonical_name() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "importer maths\nimporter Math").expect("run");
        assert!(interpreter.modules().contains("Math"));
        assert_eq!(interpreter.modules().names(), vec!["Math".to_string()]);
    }
}
