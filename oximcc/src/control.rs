use std::fmt;
use std::sync::{Condvar, Mutex};

/// Execution state of an evolutionary algorithm or of
/// the MCC container as a whole.
///
/// Transitions: `Ready → Running → {Paused, Terminated}`,
/// with `Paused → Running` on resume. Pause and terminate
/// requests are honored only between generations; an
/// in-flight batch of evaluations always completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Ready,
    Running,
    Paused,
    Terminated,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunState::Ready => "ready",
            RunState::Running => "running",
            RunState::Paused => "paused",
            RunState::Terminated => "terminated",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Request {
    Run,
    Pause,
    Terminate,
}

/// Cooperative run control shared between a driver and
/// the generation loops it supervises.
///
/// Loops call [`wait_while_paused`] at each generation
/// boundary; the call blocks on a condition variable while
/// a pause is in force (no polling) and reports whether
/// the loop should keep running.
///
/// [`wait_while_paused`]: RunControl::wait_while_paused
///
/// # Examples
/// ```
/// use oximcc::RunControl;
///
/// let control = RunControl::new();
/// assert!(control.wait_while_paused());
/// control.terminate();
/// assert!(!control.wait_while_paused());
/// ```
#[derive(Debug)]
pub struct RunControl {
    request: Mutex<Request>,
    changed: Condvar,
}

impl Default for RunControl {
    fn default() -> RunControl {
        RunControl::new()
    }
}

impl RunControl {
    pub fn new() -> RunControl {
        RunControl {
            request: Mutex::new(Request::Run),
            changed: Condvar::new(),
        }
    }

    /// Requests a pause at the next generation boundary.
    pub fn request_pause(&self) {
        let mut request = self.request.lock().unwrap_or_else(|e| e.into_inner());
        if *request == Request::Run {
            *request = Request::Pause;
            self.changed.notify_all();
        }
    }

    /// Resumes paused generation loops.
    pub fn resume(&self) {
        let mut request = self.request.lock().unwrap_or_else(|e| e.into_inner());
        if *request == Request::Pause {
            *request = Request::Run;
            self.changed.notify_all();
        }
    }

    /// Requests termination at the next generation
    /// boundary. Termination is final; it supersedes any
    /// pause in force.
    pub fn terminate(&self) {
        let mut request = self.request.lock().unwrap_or_else(|e| e.into_inner());
        *request = Request::Terminate;
        self.changed.notify_all();
    }

    /// Returns whether a pause is currently requested.
    /// Non-blocking; generation loops use this to report
    /// a `Paused` state before blocking.
    pub fn pause_requested(&self) -> bool {
        *self.request.lock().unwrap_or_else(|e| e.into_inner()) == Request::Pause
    }

    /// Blocks while a pause is in force. Returns `true`
    /// if the loop should continue with the next
    /// generation, `false` if termination was requested.
    pub fn wait_while_paused(&self) -> bool {
        let mut request = self.request.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            match *request {
                Request::Run => return true,
                Request::Terminate => return false,
                Request::Pause => {
                    request = self
                        .changed
                        .wait(request)
                        .unwrap_or_else(|e| e.into_inner());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn terminate_supersedes_pause() {
        let control = RunControl::new();
        control.request_pause();
        control.terminate();
        control.resume();
        assert!(!control.wait_while_paused());
    }

    #[test]
    fn paused_loop_resumes() {
        let control = Arc::new(RunControl::new());
        control.request_pause();
        assert!(control.pause_requested());

        let waiter = Arc::clone(&control);
        let handle = std::thread::spawn(move || waiter.wait_while_paused());
        control.resume();
        assert!(handle.join().unwrap());
    }
}
