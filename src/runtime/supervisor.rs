//=============================================
// nekoscript/runtime/supervisor.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Process supervisor for persistent programs
// Objective: Run bots, servers and games on their own interpreter thread,
//            tracked by id, each with a one-shot stop signal
//=============================================

use super::signal::{StopHandle, StopSignal};
use crate::interpreter::{ExecutionMode, Interpreter, OutputBuffer, RuntimeContext, ScriptError};
use crate::parser::parse_program;
use crate::stdlib_registry::BuiltinModule;
use crate::tokenizer::SyntaxMode;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

pub type ProcessId = u64;

/// Stack reserved for every interpreter thread. Deeply nested blocks and
/// `engine.max_call_depth` recursion need more than a default thread gets.
pub const INTERPRETER_STACK_SIZE: usize = 32 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("aucun processus avec l'identifiant {0}")]
    UnknownProcess(ProcessId),
    #[error("impossible de lancer le processus '{name}' : {message}")]
    Spawn { name: String, message: String },
    #[error(transparent)]
    Script(#[from] ScriptError),
}

//=============================================
//            Section 1: Process Kinds
//=============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessKind {
    MessagingBot,
    WebApp,
    Game,
    Script,
    Unknown,
}

impl ProcessKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessKind::MessagingBot => "messaging-bot",
            ProcessKind::WebApp => "web-app",
            ProcessKind::Game => "game",
            ProcessKind::Script => "script",
            ProcessKind::Unknown => "unknown",
        }
    }

    /// Classify a program by the capability modules it imports. Falls back
    /// to scanning the raw text when the source does not parse.
    pub fn infer(source: &str) -> Self {
        if source.trim().is_empty() {
            return ProcessKind::Unknown;
        }

        if let Ok(program) = parse_program(source, SyntaxMode::Lenient) {
            let imported: Vec<BuiltinModule> = program
                .find_imports()
                .into_iter()
                .filter_map(|import| BuiltinModule::lookup(import.module_key()))
                .collect();
            for (module, kind) in [
                (BuiltinModule::Messaging, ProcessKind::MessagingBot),
                (BuiltinModule::Web, ProcessKind::WebApp),
                (BuiltinModule::Game, ProcessKind::Game),
            ] {
                if imported.contains(&module) {
                    return kind;
                }
            }
        }

        let lowered = source.to_lowercase();
        if ["creerbot(", "importer discord", "importer messagerie", "importer bot"]
            .iter()
            .any(|pattern| lowered.contains(pattern))
        {
            ProcessKind::MessagingBot
        } else if ["creerserveur(", "importer web"]
            .iter()
            .any(|pattern| lowered.contains(pattern))
        {
            ProcessKind::WebApp
        } else if ["creerjeu(", "importer jeu", "importer game"]
            .iter()
            .any(|pattern| lowered.contains(pattern))
        {
            ProcessKind::Game
        } else {
            ProcessKind::Script
        }
    }
}

impl fmt::Display for ProcessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

//=============================================
//            Section 2: Supervisor State
//=============================================

#[derive(Debug, Clone)]
pub struct ProcessInfo {
    pub id: ProcessId,
    pub name: String,
    pub kind: ProcessKind,
    pub started_at: DateTime<Utc>,
    pub uptime: chrono::Duration,
    pub finished: bool,
}

struct ProcessRecord {
    name: String,
    kind: ProcessKind,
    started_at: DateTime<Utc>,
    stop: Option<StopHandle>,
    thread: Option<JoinHandle<()>>,
    output: OutputBuffer,
    finished: Arc<AtomicBool>,
}

#[derive(Default)]
struct SupervisorState {
    next_id: ProcessId,
    processes: BTreeMap<ProcessId, ProcessRecord>,
}

impl SupervisorState {
    fn allocate_id(&mut self) -> ProcessId {
        self.next_id += 1;
        self.next_id
    }
}

/// Message sent by a process thread once its program body has run.
type ReadyMessage = Result<(), ScriptError>;

#[derive(Clone)]
pub struct ProcessSupervisor {
    state: Arc<Mutex<SupervisorState>>,
    context: RuntimeContext,
}

impl ProcessSupervisor {
    pub fn new(context: RuntimeContext) -> Self {
        Self {
            state: Arc::new(Mutex::new(SupervisorState::default())),
            context,
        }
    }

    //=============================================
    //            Section 3: Lifecycle
    //=============================================

    /// Start `code` as a persistent process. Waits up to
    /// `engine.startup_grace_ms` for the program body: a body failing in that
    /// window removes the record and returns the error; a body still running
    /// keeps going and the id is returned.
    pub fn start(&self, name: &str, code: &str) -> Result<ProcessId, SupervisorError> {
        let kind = ProcessKind::infer(code);
        let (handle, signal) = StopSignal::channel();
        let finished = Arc::new(AtomicBool::new(false));
        let output = OutputBuffer::default();

        let id = {
            let mut state = self.state.lock();
            let id = state.allocate_id();
            state.processes.insert(
                id,
                ProcessRecord {
                    name: name.to_string(),
                    kind,
                    started_at: Utc::now(),
                    stop: Some(handle),
                    thread: None,
                    output: Arc::clone(&output),
                    finished: Arc::clone(&finished),
                },
            );
            id
        };

        let (ready_tx, ready_rx) = mpsc::channel::<ReadyMessage>();
        let launch = Launch {
            id,
            context: self.context.clone(),
            source: code.to_string(),
            output,
            signal,
            finished,
        };
        let spawned = thread::Builder::new()
            .name(format!("neko-processus-{id}"))
            .stack_size(INTERPRETER_STACK_SIZE)
            .spawn(move || run_process(launch, ready_tx));

        let thread = match spawned {
            Ok(thread) => thread,
            Err(error) => {
                self.state.lock().processes.remove(&id);
                return Err(SupervisorError::Spawn {
                    name: name.to_string(),
                    message: error.to_string(),
                });
            }
        };

        let grace = Duration::from_millis(self.context.config.engine.startup_grace_ms);
        match ready_rx.recv_timeout(grace) {
            Ok(Ok(())) | Err(RecvTimeoutError::Timeout) => {
                if let Some(record) = self.state.lock().processes.get_mut(&id) {
                    record.thread = Some(thread);
                }
                tracing::info!(id, name, kind = %kind, "process started");
                Ok(id)
            }
            Ok(Err(error)) => {
                self.state.lock().processes.remove(&id);
                let _ = thread.join();
                tracing::warn!(id, name, %error, "process failed during startup");
                Err(error.into())
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.state.lock().processes.remove(&id);
                let _ = thread.join();
                Err(SupervisorError::Spawn {
                    name: name.to_string(),
                    message: "le fil d'exécution s'est arrêté avant d'être prêt".to_string(),
                })
            }
        }
    }

    /// Signal the process, wait for it to release its resources and drop
    /// its record.
    pub fn stop(&self, id: ProcessId) -> Result<Vec<String>, SupervisorError> {
        let record = self
            .state
            .lock()
            .processes
            .remove(&id)
            .ok_or(SupervisorError::UnknownProcess(id))?;

        if let Some(handle) = record.stop {
            handle.stop();
        }
        if let Some(thread) = record.thread {
            if thread.join().is_err() {
                tracing::warn!(id, "process thread panicked");
            }
        }
        tracing::info!(id, name = %record.name, "process stopped");
        let output = record.output.lock().clone();
        Ok(output)
    }

    pub fn stop_all(&self) {
        let ids: Vec<ProcessId> = self.state.lock().processes.keys().copied().collect();
        for id in ids {
            let _ = self.stop(id);
        }
    }

    pub fn list(&self) -> Vec<ProcessInfo> {
        let now = Utc::now();
        self.state
            .lock()
            .processes
            .iter()
            .map(|(id, record)| ProcessInfo {
                id: *id,
                name: record.name.clone(),
                kind: record.kind,
                started_at: record.started_at,
                uptime: now - record.started_at,
                finished: record.finished.load(Ordering::Acquire),
            })
            .collect()
    }

    /// Lines printed so far by process `id`.
    pub fn output(&self, id: ProcessId) -> Result<Vec<String>, SupervisorError> {
        let state = self.state.lock();
        let record = state
            .processes
            .get(&id)
            .ok_or(SupervisorError::UnknownProcess(id))?;
        let lines = record.output.lock().clone();
        Ok(lines)
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().processes.is_empty()
    }
}

/// Everything a process thread needs, moved in at spawn time.
struct Launch {
    id: ProcessId,
    context: RuntimeContext,
    source: String,
    output: OutputBuffer,
    signal: StopSignal,
    finished: Arc<AtomicBool>,
}

fn run_process(launch: Launch, ready: mpsc::Sender<ReadyMessage>) {
    let Launch {
        id,
        context,
        source,
        output,
        signal,
        finished,
    } = launch;
    let parse_mode = context.config.engine.parse_mode;
    let mut interpreter = Interpreter::with_context(context, ExecutionMode::Persistent);
    interpreter.share_output(output);
    interpreter.attach_stop_signal(signal);

    let outcome = parse_program(&source, parse_mode)
        .map_err(ScriptError::from)
        .and_then(|program| {
            interpreter.execute(&program).map_err(|error| {
                interpreter.shutdown_tasks();
                ScriptError::from(error)
            })
        });

    match outcome {
        Ok(()) => {
            let _ = ready.send(Ok(()));
            if let Err(error) = interpreter.run_host_loop() {
                interpreter.print_line(format!("Erreur d'exécution : {error}"));
            }
        }
        Err(error) => {
            // Also kept in the output: `start` may have returned already.
            if !interpreter.stop_requested() {
                interpreter.print_line(format!("Erreur d'exécution : {}", error.message));
            }
            let _ = ready.send(Err(error));
        }
    }
    finished.store(true, Ordering::Release);
    tracing::debug!(id, "process host loop ended");
}

/// `1j 02:03:04` style uptime.
pub fn format_uptime(uptime: chrono::Duration) -> String {
    let total = uptime.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    if days > 0 {
        format!("{days}j {hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_imports() {
        assert_eq!(
            ProcessKind::infer("importer discord\nnekVariable b = creerBot(\"x\")"),
            ProcessKind::MessagingBot
        );
        assert_eq!(ProcessKind::infer("importer Web"), ProcessKind::WebApp);
        assert_eq!(ProcessKind::infer("nekImporter canvas"), ProcessKind::Game);
        assert_eq!(ProcessKind::infer("nekAfficher(1)"), ProcessKind::Script);
        assert_eq!(ProcessKind::infer("   "), ProcessKind::Unknown);
    }

    #[test]
    fn start_list_stop() {
        let supervisor = ProcessSupervisor::new(RuntimeContext::default());
        let id = supervisor.start("bonjour", "nekAfficher(\"salut\")").expect("start");
        let listed = supervisor.list();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
        assert_eq!(listed[0].kind, ProcessKind::Script);

        let output = supervisor.stop(id).expect("stop");
        assert_eq!(output, vec!["salut"]);
        assert!(supervisor.list().is_empty());
        assert!(matches!(
            supervisor.stop(id),
            Err(SupervisorError::UnknownProcess(stopped)) if stopped == id
        ));
    }

    #[test]
    fn ids_are_never_reused() {
        let supervisor = ProcessSupervisor::new(RuntimeContext::default());
        let first = supervisor.start("a", "nekVariable x = 1").expect("start");
        supervisor.stop(first).expect("stop");
        let second = supervisor.start("b", "nekVariable x = 2").expect("start");
        assert!(second > first);
        supervisor.stop_all();
    }

    #[test]
    fn failing_program_leaves_no_record() {
        let supervisor = ProcessSupervisor::new(RuntimeContext::default());
        let err = supervisor.start("cassé", "inconnue()").expect_err("fails");
        assert!(matches!(err, SupervisorError::Script(ref script) if script.code_str() == "E002"));
        assert!(supervisor.is_empty());
    }

    #[test]
    fn endless_body_is_listed_and_stoppable() {
        let mut context = RuntimeContext::default();
        context.config.engine.startup_grace_ms = 50;
        let supervisor = ProcessSupervisor::new(context);
        let id = supervisor.start("boucle", "tantque vrai { }").expect("start");
        assert!(supervisor.list().iter().any(|info| info.id == id && !info.finished));
        supervisor.stop(id).expect("stop");
        assert!(supervisor.is_empty());
    }

    #[test]
    fn uptime_formatting() {
        assert_eq!(format_uptime(chrono::Duration::seconds(3_725)), "01:02:05");
        assert_eq!(format_uptime(chrono::Duration::seconds(90_061)), "1j 01:01:01");
    }
}
