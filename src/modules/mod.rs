//=============================================
// nekoscript/modules/mod.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Module registry and loader state
// Objective: Cache evaluated module binding maps by name, detect cyclic
//            imports, and hold the shared package store and host factories
//=============================================

pub mod package;
mod resolver;

pub use package::{Package, PackageError, PackageStore, PackageSummary, SharedPackageStore, fetch_remote};

use crate::interpreter::{Bindings, Interpreter, RuntimeError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Rust function building the exports of a host-code package.
pub type HostModuleFactory =
    Arc<dyn Fn(&mut Interpreter) -> Result<Bindings, RuntimeError> + Send + Sync>;

/// Host module factories registered on an engine, keyed by factory name.
pub type SharedHostModules = Arc<RwLock<HashMap<String, HostModuleFactory>>>;

#[derive(Debug, Clone, Error)]
pub enum ModuleError {
    #[error("module '{module}' introuvable. Installez-le avec : neko telecharger {module}")]
    NotFound { module: String },
    #[error("erreur de syntaxe dans le module '{module}' : {message}")]
    Syntax { module: String, message: String },
    #[error("échec du chargement du module '{module}' : {message}")]
    Evaluation { module: String, message: String },
    #[error("import cyclique détecté pour le module '{module}'")]
    Cyclic { module: String },
    #[error("le paquet '{module}' référence le module hôte inconnu '{factory}'")]
    UnknownHostFactory { module: String, factory: String },
    #[error(transparent)]
    Package(#[from] PackageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModuleStatus {
    Initializing,
    Ready,
}

#[derive(Debug)]
struct ModuleCacheEntry {
    exports: Bindings,
    status: ModuleStatus,
}

/// Evaluated modules of one interpreter. Survives `reset_globals`.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    cache: HashMap<String, ModuleCacheEntry>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `exports` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, exports: Bindings) {
        self.cache.insert(
            name.into(),
            ModuleCacheEntry {
                exports,
                status: ModuleStatus::Ready,
            },
        );
    }

    /// Exports of a fully loaded module.
    pub fn get(&self, name: &str) -> Option<Bindings> {
        self.cache
            .get(name)
            .filter(|entry| entry.status == ModuleStatus::Ready)
            .map(|entry| entry.exports.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .cache
            .iter()
            .filter(|(_, entry)| entry.status == ModuleStatus::Ready)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Mark `name` as being evaluated. Re-entering a module still being
    /// evaluated is a cycle.
    pub(crate) fn begin_loading(&mut self, name: &str) -> Result<(), ModuleError> {
        if let Some(entry) = self.cache.get(name) {
            if entry.status == ModuleStatus::Initializing {
                return Err(ModuleError::Cyclic {
                    module: name.to_string(),
                });
            }
        }
        self.cache.insert(
            name.to_string(),
            ModuleCacheEntry {
                exports: Bindings::new(),
                status: ModuleStatus::Initializing,
            },
        );
        Ok(())
    }

    /// Drop a module whose evaluation failed.
    pub(crate) fn abandon(&mut self, name: &str) {
        if self
            .cache
            .get(name)
            .is_some_and(|entry| entry.status == ModuleStatus::Initializing)
        {
            self.cache.remove(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Value;

    #[test]
    fn loading_module_is_not_visible_until_registered() {
        let mut registry = ModuleRegistry::new();
        registry.begin_loading("outils").expect("begin");
        assert!(registry.get("outils").is_none());

        let mut exports = Bindings::new();
        exports.insert("version".into(), Value::Number(2.0));
        registry.register("outils", exports);
        assert_eq!(
            registry.get("outils").and_then(|m| m.get("version").cloned()),
            Some(Value::Number(2.0))
        );
    }

    #[test]
    fn reentering_a_loading_module_is_cyclic() {
        let mut registry = ModuleRegistry::new();
        registry.begin_loading("a").expect("begin");
        let err = registry.begin_loading("a").expect_err("cycle");
        assert!(matches!(err, ModuleError::Cyclic { ref module } if module == "a"));
    }

    #[test]
    fn abandon_clears_failed_load() {
        let mut registry = ModuleRegistry::new();
        registry.begin_loading("cassé").expect("begin");
        registry.abandon("cassé");
        assert!(registry.begin_loading("cassé").is_ok());
        assert!(registry.names().is_empty());
    }

    #[test]
    fn not_found_suggests_install_command() {
        let message = ModuleError::NotFound {
            module: "Ghost".into(),
        }
        .to_string();
        assert!(message.contains("introuvable"));
        assert!(message.contains("neko telecharger Ghost"));
    }
}
