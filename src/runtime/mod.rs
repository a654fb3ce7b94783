//==============================================
// File: runtime/mod.rs
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Persistent program runtime
// Objective: Expose the process supervisor and the per-process stop signal
//==============================================

pub mod signal;
pub mod supervisor;

pub use signal::{StopHandle, StopSignal};
pub use supervisor::{
    INTERPRETER_STACK_SIZE, ProcessId, ProcessInfo, ProcessKind, ProcessSupervisor,
    SupervisorError, format_uptime,
};

//==============================================
// End of file
//==============================================
