//=====================================================
// File: lib.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: NekoScript library main interface
// Objective: Export the language pipeline (tokenizer, parser, interpreter),
//            capability modules, package/module layer, process supervisor
//            and the Engine facade used by the `neko` CLI
//=====================================================

pub mod ast;
pub mod config;
pub mod devtools;
pub mod engine;
pub mod interpreter;
pub mod logging;
pub mod modules;
pub mod parser;
pub mod runtime;
pub mod stdlib_registry;
pub mod stdx;
pub mod tokenizer;

pub use config::{EngineConfig, ProjectManifest};
pub use engine::{Engine, SUCCESS_MESSAGE};
pub use interpreter::{ErrorCode, Interpreter, RuntimeError, ScriptError, Value};
pub use stdlib_registry::{BuiltinModule, StdlibRegistry};

//=====================================================
// End of file
//=====================================================
