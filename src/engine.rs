//=============================================
// nekoscript/engine.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Embedding facade for the NekoScript engine
// Objective: One object exposing execute / packages / processes / check so
//            the CLI and host applications never touch the layers directly
//=============================================

use crate::config::EngineConfig;
use crate::devtools::{self, CheckReport};
use crate::interpreter::{
    Bindings, ExecutionMode, Interpreter, RuntimeContext, RuntimeError, ScriptError,
};
use crate::modules::{PackageError, PackageStore, PackageSummary, SharedPackageStore};
use crate::parser::parse_program;
use crate::runtime::{
    INTERPRETER_STACK_SIZE, ProcessId, ProcessInfo, ProcessSupervisor, SupervisorError,
};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

pub const SUCCESS_MESSAGE: &str = "Programme exécuté avec succès.";

/// Output lines of a run, or the lines printed before the error plus the error.
pub type RunOutcome = Result<Vec<String>, (Vec<String>, ScriptError)>;

/// Owns one long-lived interpreter (its module registry survives across
/// `execute` calls) plus the shared package store and process supervisor.
///
/// The interpreter lives on a dedicated worker thread with
/// [`INTERPRETER_STACK_SIZE`] of stack, so an engine behaves the same
/// whichever thread calls it.
pub struct Engine {
    context: RuntimeContext,
    worker: Worker,
    supervisor: ProcessSupervisor,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_packages(config, PackageStore::new())
    }

    /// Start from an existing package snapshot (the CLI restores one from disk).
    pub fn with_packages(config: EngineConfig, packages: PackageStore) -> Self {
        let context = RuntimeContext {
            config,
            packages: packages.shared(),
            host_modules: Default::default(),
        };
        Self {
            worker: Worker::spawn(context.clone()),
            supervisor: ProcessSupervisor::new(context.clone()),
            context,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.context.config
    }

    pub fn packages(&self) -> SharedPackageStore {
        Arc::clone(&self.context.packages)
    }

    /// Feed lines to `nekDemander` / `lireEntree` before the next `execute`.
    pub fn push_input(&mut self, line: impl Into<String>) {
        self.worker.send(Request::PushInput(line.into()));
    }

    //=============================================
    //            Section 1: Execution
    //=============================================

    /// Run `source` and describe the outcome as text. Never fails: errors are
    /// embedded in the returned string.
    pub fn execute(&mut self, source: &str) -> String {
        match self.try_execute(source) {
            Ok(lines) if lines.is_empty() => SUCCESS_MESSAGE.to_string(),
            Ok(lines) => lines.join("\n"),
            Err((lines, error)) => {
                let mut out = lines;
                out.push(format!("Erreur d'exécution : {}", error.message));
                out.join("\n")
            }
        }
    }

    /// Output lines of a run, or the lines printed before the error plus the
    /// coded error itself.
    pub fn try_execute(&mut self, source: &str) -> RunOutcome {
        let source = source.to_string();
        match self.worker.ask(|reply| Request::Execute { source, reply }) {
            Some(outcome) => outcome,
            None => {
                let error = self.restart_worker();
                Err((Vec::new(), error))
            }
        }
    }

    /// Static analysis only; nothing is evaluated.
    pub fn check(&self, source: &str) -> CheckReport {
        let text = source.to_string();
        self.worker
            .ask(|reply| Request::Check { source: text, reply })
            .unwrap_or_else(|| devtools::check_source(source, &self.context.packages.read()))
    }

    /// A worker that stopped answering lost its interpreter; start a fresh one.
    fn restart_worker(&mut self) -> ScriptError {
        tracing::warn!("engine worker stopped, starting a new interpreter");
        self.worker = Worker::spawn(self.context.clone());
        RuntimeError::Host("l'interpréteur s'est arrêté ; il a été redémarré".to_string()).into()
    }

    //=============================================
    //            Section 2: Packages
    //=============================================

    /// Publish `code` under `name`. Host packages must name a factory
    /// registered with [`Engine::register_host_module`].
    pub fn publish_package(
        &mut self,
        code: &str,
        name: &str,
        is_host_code: bool,
    ) -> Result<String, ScriptError> {
        if is_host_code && !self.context.host_modules.read().contains_key(code.trim()) {
            return Err(PackageError::UnknownHostFactory(code.trim().to_string()).into());
        }
        let code = if is_host_code { code.trim() } else { code };
        let mut store = self.context.packages.write();
        let package = store.publish(name, code, is_host_code)?;
        Ok(format!(
            "Paquet '{}' publié (version {})",
            package.name, package.version
        ))
    }

    /// Resolve `name` now so its exports land in the module registry.
    pub fn download_package(&mut self, name: &str) -> Result<String, ScriptError> {
        if !self.context.packages.read().contains(name) {
            return Err(PackageError::NotFound(name.to_string()).into());
        }
        let module = name.to_string();
        let names = match self.worker.ask(|reply| Request::Import { name: module, reply }) {
            Some(result) => result?,
            None => return Err(self.restart_worker()),
        };
        tracing::info!(package = name, exports = names.len(), "package installed");
        Ok(format!(
            "Paquet '{name}' installé ({} export(s) : {})",
            names.len(),
            names.join(", ")
        ))
    }

    /// Insert an already fetched package (remote registry) into the store.
    pub fn install_package(&mut self, package: crate::modules::Package) -> Result<(), ScriptError> {
        self.context.packages.write().insert(package)?;
        Ok(())
    }

    pub fn list_packages(&self) -> Vec<PackageSummary> {
        self.context.packages.read().list()
    }

    pub fn registered_modules(&self) -> Vec<String> {
        self.worker
            .ask(|reply| Request::ModuleNames { reply })
            .unwrap_or_default()
    }

    /// Expose a Rust factory that host-code packages can refer to by `name`.
    pub fn register_host_module<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&mut Interpreter) -> Result<Bindings, RuntimeError> + Send + Sync + 'static,
    {
        tracing::debug!(factory = name, "host module factory registered");
        self.context
            .host_modules
            .write()
            .insert(name.to_string(), Arc::new(factory));
    }

    //=============================================
    //            Section 3: Processes
    //=============================================

    pub fn start_process(&self, name: &str, code: &str) -> Result<ProcessId, SupervisorError> {
        self.supervisor.start(name, code)
    }

    /// Stop a process and return the lines it printed.
    pub fn stop_process(&self, id: ProcessId) -> Result<Vec<String>, SupervisorError> {
        self.supervisor.stop(id)
    }

    pub fn list_processes(&self) -> Vec<ProcessInfo> {
        self.supervisor.list()
    }

    pub fn process_output(&self, id: ProcessId) -> Result<Vec<String>, SupervisorError> {
        self.supervisor.output(id)
    }

    pub fn stop_all_processes(&self) {
        self.supervisor.stop_all();
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if !self.supervisor.is_empty() {
            self.supervisor.stop_all();
        }
    }
}

//=============================================
//            Section 4: Interpreter Worker
//=============================================

enum Request {
    Execute {
        source: String,
        reply: Sender<RunOutcome>,
    },
    Check {
        source: String,
        reply: Sender<CheckReport>,
    },
    Import {
        name: String,
        reply: Sender<Result<Vec<String>, ScriptError>>,
    },
    ModuleNames {
        reply: Sender<Vec<String>>,
    },
    PushInput(String),
}

/// Thread owning the engine's interpreter. Dropping it closes the request
/// channel and joins the thread.
struct Worker {
    requests: Option<Sender<Request>>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn(context: RuntimeContext) -> Self {
        let (requests, inbox) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("neko-moteur".to_string())
            .stack_size(INTERPRETER_STACK_SIZE)
            .spawn(move || serve(context, inbox));
        match spawned {
            Ok(thread) => Self {
                requests: Some(requests),
                thread: Some(thread),
            },
            Err(error) => {
                tracing::warn!(%error, "engine worker thread could not start");
                Self {
                    requests: None,
                    thread: None,
                }
            }
        }
    }

    fn send(&self, request: Request) -> bool {
        self.requests
            .as_ref()
            .is_some_and(|requests| requests.send(request).is_ok())
    }

    /// Send a request and wait for its answer. `None` when the worker is gone.
    fn ask<T>(&self, build: impl FnOnce(Sender<T>) -> Request) -> Option<T> {
        let (reply, answer) = mpsc::channel();
        if !self.send(build(reply)) {
            return None;
        }
        answer.recv().ok()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.requests = None;
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("engine worker thread panicked");
            }
        }
    }
}

fn serve(context: RuntimeContext, inbox: Receiver<Request>) {
    let mut interpreter = Interpreter::with_context(context.clone(), ExecutionMode::Immediate);
    for request in inbox {
        match request {
            Request::Execute { source, reply } => {
                let _ = reply.send(run_source(&mut interpreter, &context, &source));
            }
            Request::Check { source, reply } => {
                let report = devtools::check_source(&source, &context.packages.read());
                let _ = reply.send(report);
            }
            Request::Import { name, reply } => {
                let names = interpreter
                    .import_module(&name)
                    .map(|exports| exports.into_keys().collect())
                    .map_err(ScriptError::from);
                let _ = reply.send(names);
            }
            Request::ModuleNames { reply } => {
                let _ = reply.send(interpreter.modules().names());
            }
            Request::PushInput(line) => interpreter.push_input(line),
        }
    }
    interpreter.shutdown_tasks();
}

fn run_source(interpreter: &mut Interpreter, context: &RuntimeContext, source: &str) -> RunOutcome {
    interpreter.reset_globals();
    interpreter.take_output();

    let program = match parse_program(source, context.config.engine.parse_mode) {
        Ok(program) => program,
        Err(error) => return Err((Vec::new(), ScriptError::from(error))),
    };
    tracing::debug!(statements = program.statements.len(), "program parsed");

    let result = interpreter.execute(&program);
    // Immediate runs never keep capability tasks alive.
    interpreter.shutdown_tasks();

    let mut lines: Vec<String> = interpreter
        .take_output()
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();
    lines.extend(
        program
            .diagnostics
            .iter()
            .map(|diagnostic| format!("[erreur de syntaxe : {diagnostic}]")),
    );

    match result {
        Ok(()) => Ok(lines),
        Err(error) => {
            tracing::debug!(%error, "program failed");
            Err((lines, ScriptError::from(error)))
        }
    }
}
