//=============================================
// nekoscript/runtime/signal.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: One-shot stop signal per supervised process
// Objective: Let the supervisor ask a process thread to stop; the process
//            polls the signal cooperatively from its host loop
//=============================================

use tokio::sync::oneshot::{self, error::TryRecvError};

/// Sending half, kept by the supervisor. Consumed by `stop`.
#[derive(Debug)]
pub struct StopHandle {
    sender: oneshot::Sender<()>,
}

impl StopHandle {
    /// Fire the signal. `false` when the process already ended.
    pub fn stop(self) -> bool {
        self.sender.send(()).is_ok()
    }
}

/// Receiving half, owned by the process thread. A dropped handle counts
/// as a stop request.
#[derive(Debug)]
pub struct StopSignal {
    receiver: Option<oneshot::Receiver<()>>,
    stopped: bool,
}

impl StopSignal {
    pub fn channel() -> (StopHandle, StopSignal) {
        let (sender, receiver) = oneshot::channel();
        (
            StopHandle { sender },
            StopSignal {
                receiver: Some(receiver),
                stopped: false,
            },
        )
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        Self {
            receiver: None,
            stopped: false,
        }
    }

    pub fn is_stopped(&mut self) -> bool {
        if self.stopped {
            return true;
        }
        if let Some(receiver) = self.receiver.as_mut() {
            match receiver.try_recv() {
                Ok(()) | Err(TryRecvError::Closed) => self.stopped = true,
                Err(TryRecvError::Empty) => {}
            }
        }
        self.stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_fires_once_stopped() {
        let (handle, mut signal) = StopSignal::channel();
        assert!(!signal.is_stopped());
        assert!(handle.stop());
        assert!(signal.is_stopped());
        assert!(signal.is_stopped());
    }

    #[test]
    fn dropped_handle_stops() {
        let (handle, mut signal) = StopSignal::channel();
        drop(handle);
        assert!(signal.is_stopped());
    }

    #[test]
    fn stopping_after_receiver_dropped_reports_false() {
        let (handle, signal) = StopSignal::channel();
        drop(signal);
        assert!(!handle.stop());
    }

    #[test]
    fn never_signal_stays_quiet() {
        assert!(!StopSignal::never().is_stopped());
    }
}
