#![forbid(unsafe_code)]

//! UI-context task dispatch.
//!
//! The publisher never touches the rendering surface from its worker thread;
//! it hands closed-over publish steps to a [`UiDispatcher`], and the host
//! runs them wherever its UI context lives. [`ChannelDispatcher`] is the
//! provided implementation: an mpsc sender whose paired [`UiTaskPump`] is
//! polled by the host loop (or driven directly in tests).

use std::sync::mpsc;
use std::time::Duration;

/// A deferred unit of work to run in the host's UI context.
pub type UiTask = Box<dyn FnOnce() + Send>;

/// Posts tasks into the host's UI context. `post` must not run the task
/// inline and must preserve post order.
pub trait UiDispatcher: Send + Sync {
    fn post(&self, task: UiTask);
}

/// Channel-backed dispatcher half; tasks run when the paired pump drains.
pub struct ChannelDispatcher {
    tx: mpsc::Sender<UiTask>,
}

impl ChannelDispatcher {
    /// Create a dispatcher and the pump that executes its tasks.
    pub fn new() -> (Self, UiTaskPump) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, UiTaskPump { rx })
    }
}

impl UiDispatcher for ChannelDispatcher {
    fn post(&self, task: UiTask) {
        if self.tx.send(task).is_err() {
            tracing::debug!("ui task dropped; pump receiver is gone");
        }
    }
}

/// Receiving half of a [`ChannelDispatcher`]; owned by the host loop.
pub struct UiTaskPump {
    rx: mpsc::Receiver<UiTask>,
}

impl UiTaskPump {
    /// Run every task already queued; returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Block up to `timeout` for one task and run it. `false` on timeout or
    /// when every dispatcher handle has been dropped.
    pub fn run_next(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(task) => {
                task();
                true
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn run_pending_drains_in_post_order() {
        let (dispatcher, pump) = ChannelDispatcher::new();
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        for n in 0..4 {
            let log = Arc::clone(&log);
            dispatcher.post(Box::new(move || log.lock().unwrap().push(n)));
        }
        assert_eq!(pump.run_pending(), 4);
        assert_eq!(*log.lock().unwrap(), [0, 1, 2, 3]);
        assert_eq!(pump.run_pending(), 0, "queue already drained");
    }

    #[test]
    fn run_next_times_out_when_idle() {
        let (_dispatcher, pump) = ChannelDispatcher::new();
        assert!(!pump.run_next(Duration::from_millis(10)));
    }

    #[test]
    fn run_next_executes_a_posted_task() {
        let (dispatcher, pump) = ChannelDispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        dispatcher.post(Box::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(pump.run_next(Duration::from_secs(1)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn post_after_pump_dropped_is_silently_discarded() {
        let (dispatcher, pump) = ChannelDispatcher::new();
        drop(pump);
        dispatcher.post(Box::new(|| panic!("must never run")));
    }
}
