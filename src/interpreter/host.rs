//=============================================
// nekoscript/interpreter/host.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Cooperative host task loop
// Objective: Let capability handles (servers, bots, game loops) keep running
//            after the program body finishes, polled on the interpreter thread
//=============================================

use super::{Interpreter, RuntimeError, Value, arg, expect_number};
use crate::ast::Program;
use crate::runtime::StopSignal;
use std::time::{Duration, Instant};

/// How the interpreter treats long-running capability handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// One-shot `execute`: handles report readiness and never block.
    #[default]
    Immediate,
    /// Supervised process: handles register tasks polled until stopped.
    Persistent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Done,
}

/// A long-running capability handle driven by [`Interpreter::run_host_loop`].
pub trait HostTask {
    fn name(&self) -> &str;

    /// Make progress without blocking. Script callbacks run here.
    fn poll(&mut self, interpreter: &mut Interpreter) -> Result<TaskStatus, RuntimeError>;

    /// Release sockets/connections. Called once when the loop ends.
    fn shutdown(&mut self, interpreter: &mut Interpreter);
}

const IDLE_DELAY: Duration = Duration::from_millis(5);

impl Interpreter {
    pub fn register_task(&mut self, task: Box<dyn HostTask>) {
        tracing::debug!(task = task.name(), "host task registered");
        self.tasks.push(task);
    }

    pub fn has_pending_tasks(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Route a supervisor stop signal to this interpreter. Loops and pauses
    /// check it so a stop request also ends a program body still running.
    pub fn attach_stop_signal(&mut self, signal: StopSignal) {
        self.stop = signal;
    }

    pub fn stop_requested(&mut self) -> bool {
        self.stop.is_stopped()
    }

    pub(crate) fn check_interrupt(&mut self) -> Result<(), RuntimeError> {
        if self.stop.is_stopped() {
            return Err(RuntimeError::Interrupted);
        }
        Ok(())
    }

    /// Evaluate `program`, then keep its host tasks running until they
    /// finish or the stop signal fires.
    pub fn run_persistent(&mut self, program: &Program) -> Result<(), RuntimeError> {
        if let Err(error) = self.execute(program) {
            self.shutdown_tasks();
            return Err(error);
        }
        self.run_host_loop()
    }

    /// Poll registered tasks until all finish or the stop signal fires, then
    /// shut every remaining task down. A task error ends the loop.
    pub fn run_host_loop(&mut self) -> Result<(), RuntimeError> {
        let mut outcome = Ok(());

        while !self.tasks.is_empty() {
            if self.stop.is_stopped() {
                tracing::info!("stop signal received, shutting host tasks down");
                break;
            }
            if let Err(error) = self.poll_tasks_once() {
                outcome = Err(error);
                break;
            }
            std::thread::sleep(IDLE_DELAY);
        }

        self.shutdown_tasks();
        outcome
    }

    /// One polling round. The task being polled is taken out of the list so
    /// a callback that pauses can keep the other tasks moving.
    fn poll_tasks_once(&mut self) -> Result<(), RuntimeError> {
        let mut index = 0;
        while index < self.tasks.len() {
            let mut task = self.tasks.remove(index);
            let status = task.poll(self);
            let slot = index.min(self.tasks.len());
            match status {
                Ok(TaskStatus::Pending) => {
                    self.tasks.insert(slot, task);
                    index = slot + 1;
                }
                Ok(TaskStatus::Done) => {
                    tracing::debug!(task = task.name(), "host task finished");
                    task.shutdown(self);
                    index = slot;
                }
                Err(error) => {
                    tracing::warn!(task = task.name(), %error, "host task failed");
                    self.tasks.insert(slot, task);
                    return Err(error);
                }
            }
        }
        Ok(())
    }

    pub fn shutdown_tasks(&mut self) {
        let tasks = std::mem::take(&mut self.tasks);
        for mut task in tasks {
            task.shutdown(self);
        }
    }

    //=============================================
    //            Timers
    //=============================================

    /// Wait for `duration` (capped by `engine.max_sleep_ms`) without starving
    /// host tasks. Returns `Interrupted` as soon as a stop is requested.
    pub fn pause(&mut self, duration: Duration) -> Result<(), RuntimeError> {
        let limit = Duration::from_millis(self.config().engine.max_sleep_ms);
        if duration > limit {
            tracing::warn!(
                requested_ms = duration.as_millis() as u64,
                limit_ms = limit.as_millis() as u64,
                "pause capped"
            );
        }
        let deadline = deadline_after(duration.min(limit));
        loop {
            self.check_interrupt()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            if !self.tasks.is_empty() {
                self.poll_tasks_once()?;
            }
            std::thread::sleep((deadline - now).min(IDLE_DELAY));
        }
    }

    /// `attendre(ms[, valeur])`. A callable `valeur` is deferred: persistent
    /// programs get a timer task and the call returns at once, immediate runs
    /// pause then call it. Any other `valeur` is returned after the pause.
    pub(crate) fn sleep_builtin(&mut self, args: &[Value], name: &str) -> Result<Value, RuntimeError> {
        let millis = expect_number(&arg(args, 0), name)?;
        let delay = if millis.is_finite() && millis > 0.0 {
            Duration::from_millis(millis as u64)
        } else if millis == f64::INFINITY {
            Duration::MAX
        } else {
            Duration::ZERO
        };

        let value = arg(args, 1);
        if value.is_callable() {
            if self.is_persistent() {
                let limit = Duration::from_millis(self.config().engine.max_sleep_ms);
                self.register_task(Box::new(TimerTask {
                    deadline: deadline_after(delay.min(limit)),
                    callback: Some(value),
                }));
                return Ok(Value::Null);
            }
            self.pause(delay)?;
            return self.call_value(&value, Vec::new());
        }
        self.pause(delay)?;
        Ok(value)
    }
}

fn deadline_after(delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay)
        .unwrap_or_else(|| now + Duration::from_secs(365 * 24 * 3600))
}

/// Deferred `attendre` callback, fired once by the host loop.
struct TimerTask {
    deadline: Instant,
    callback: Option<Value>,
}

impl HostTask for TimerTask {
    fn name(&self) -> &str {
        "minuterie"
    }

    fn poll(&mut self, interpreter: &mut Interpreter) -> Result<TaskStatus, RuntimeError> {
        if Instant::now() < self.deadline {
            return Ok(TaskStatus::Pending);
        }
        if let Some(callback) = self.callback.take() {
            interpreter.call_value(&callback, Vec::new())?;
        }
        Ok(TaskStatus::Done)
    }

    fn shutdown(&mut self, _: &mut Interpreter) {
        self.callback = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::{ExecutionMode, RuntimeContext};
    use crate::runtime::StopSignal;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Countdown {
        remaining: u32,
        shut: Rc<Cell<bool>>,
    }

    impl HostTask for Countdown {
        fn name(&self) -> &str {
            "compte-a-rebours"
        }

        fn poll(&mut self, _: &mut Interpreter) -> Result<TaskStatus, RuntimeError> {
            if self.remaining == 0 {
                return Ok(TaskStatus::Done);
            }
            self.remaining -= 1;
            Ok(TaskStatus::Pending)
        }

        fn shutdown(&mut self, _: &mut Interpreter) {
            self.shut.set(true);
        }
    }

    #[test]
    fn loop_runs_until_tasks_finish() {
        let mut interpreter = Interpreter::new();
        let shut = Rc::new(Cell::new(false));
        interpreter.register_task(Box::new(Countdown {
            remaining: 3,
            shut: Rc::clone(&shut),
        }));
        let (_handle, signal) = StopSignal::channel();
        interpreter.attach_stop_signal(signal);
        interpreter.run_host_loop().expect("loop");
        assert!(shut.get());
        assert!(!interpreter.has_pending_tasks());
    }

    #[test]
    fn stop_signal_ends_loop_and_shuts_down() {
        let mut interpreter = Interpreter::new();
        let shut = Rc::new(Cell::new(false));
        interpreter.register_task(Box::new(Countdown {
            remaining: u32::MAX,
            shut: Rc::clone(&shut),
        }));
        let (handle, signal) = StopSignal::channel();
        interpreter.attach_stop_signal(signal);
        handle.stop();
        interpreter.run_host_loop().expect("loop");
        assert!(shut.get());
    }

    #[test]
    fn pause_is_capped_by_config() {
        let mut context = RuntimeContext::default();
        context.config.engine.max_sleep_ms = 20;
        let mut interpreter = Interpreter::with_context(context, ExecutionMode::Immediate);
        let started = Instant::now();
        interpreter.pause(Duration::from_secs(3600)).expect("pause");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn pause_ends_on_stop_request() {
        let mut interpreter = Interpreter::new();
        let (handle, signal) = StopSignal::channel();
        interpreter.attach_stop_signal(signal);
        handle.stop();
        assert!(matches!(
            interpreter.pause(Duration::from_secs(30)),
            Err(RuntimeError::Interrupted)
        ));
    }

    #[test]
    fn paused_callbacks_keep_other_tasks_moving() {
        let mut interpreter = Interpreter::with_context(RuntimeContext::default(), ExecutionMode::Persistent);
        let shut = Rc::new(Cell::new(false));
        interpreter.register_task(Box::new(Countdown {
            remaining: 2,
            shut: Rc::clone(&shut),
        }));
        interpreter.pause(Duration::from_millis(50)).expect("pause");
        assert!(shut.get());
        assert!(!interpreter.has_pending_tasks());
    }

    #[test]
    fn deferred_callbacks_run_from_the_host_loop() {
        let mut interpreter = Interpreter::with_context(RuntimeContext::default(), ExecutionMode::Persistent);
        let program = crate::parser::parse_program(
            "importer Base\nattendre(10, fonction() { nekAfficher(\"plus tard\") })\nnekAfficher(\"tout de suite\")",
            crate::tokenizer::SyntaxMode::Lenient,
        )
        .expect("parse");
        interpreter.run_persistent(&program).expect("run");
        assert_eq!(interpreter.take_output(), vec!["tout de suite", "plus tard"]);
    }
}
