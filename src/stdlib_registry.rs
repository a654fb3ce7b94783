//==================================================
// File: stdlib_registry.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Track NekoScript built-in capability modules
// Objective: Resolve import names and their aliases to a BuiltinModule
//==================================================

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

//==================================================
// Section 1.0 - Registry Types
//==================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinModule {
    Base,
    Math,
    Web,
    Messaging,
    Game,
}

impl BuiltinModule {
    pub const ALL: [BuiltinModule; 5] = [
        BuiltinModule::Base,
        BuiltinModule::Math,
        BuiltinModule::Web,
        BuiltinModule::Messaging,
        BuiltinModule::Game,
    ];

    /// Name the module is cached under in the module registry.
    pub fn canonical_name(self) -> &'static str {
        match self {
            BuiltinModule::Base => "Base",
            BuiltinModule::Math => "Math",
            BuiltinModule::Web => "Web",
            BuiltinModule::Messaging => "Messaging",
            BuiltinModule::Game => "Game",
        }
    }

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            BuiltinModule::Base => &["base"],
            BuiltinModule::Math => &["math", "maths"],
            BuiltinModule::Web => &["web"],
            BuiltinModule::Messaging => &["discord", "messagerie", "messaging", "bot"],
            BuiltinModule::Game => &["jeu", "game", "canvas"],
        }
    }

    /// Case-insensitive lookup through the default registry.
    pub fn lookup(name: &str) -> Option<BuiltinModule> {
        DEFAULT_REGISTRY.resolve(name)
    }
}

impl fmt::Display for BuiltinModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

#[derive(Debug, Clone)]
pub struct StdlibRegistry {
    modules: HashMap<String, BuiltinModule>,
}

impl StdlibRegistry {
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            modules: HashMap::new(),
        };
        for module in BuiltinModule::ALL {
            for alias in module.aliases() {
                registry.register(alias, module);
            }
        }
        registry
    }

    pub fn module_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn register(&mut self, name: &str, module: BuiltinModule) {
        self.modules.insert(name.to_lowercase(), module);
    }

    pub fn resolve(&self, name: &str) -> Option<BuiltinModule> {
        self.modules.get(&name.to_lowercase()).copied()
    }
}

static DEFAULT_REGISTRY: Lazy<StdlibRegistry> = Lazy::new(StdlibRegistry::with_defaults);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_case_insensitively() {
        assert_eq!(BuiltinModule::lookup("Math"), Some(BuiltinModule::Math));
        assert_eq!(BuiltinModule::lookup("MATHS"), Some(BuiltinModule::Math));
        assert_eq!(BuiltinModule::lookup("Discord"), Some(BuiltinModule::Messaging));
        assert_eq!(BuiltinModule::lookup("canvas"), Some(BuiltinModule::Game));
        assert_eq!(BuiltinModule::lookup("Ghost"), None);
    }

    #[test]
    fn every_alias_is_listed() {
        let names = StdlibRegistry::with_defaults().module_names();
        assert!(names.contains(&"messagerie".to_string()));
        assert_eq!(names.len(), 11);
    }
}
