use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Token for cooperative cancellation of a dispatch cycle.
///
/// Clone is cheap and shares state.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Run/suspend/cancel signals shared by every worker of a source.
///
/// A new context is stopped; call [`DispatchContext::start`] before running cycles.
#[derive(Debug, Default)]
pub struct DispatchContext {
    running: AtomicBool,
    suspended: AtomicBool,
    token: Mutex<CancellationToken>,
}

impl DispatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark running and re-arm the cancellation signal if a stop fired it.
    pub fn start(&self) {
        let mut token = self.token.lock().unwrap_or_else(|e| e.into_inner());
        if token.is_cancelled() {
            *token = CancellationToken::new();
        }
        self.running.store(true, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.token().cancel();
        tracing::debug!("Dispatch stopped");
    }

    pub fn suspend(&self) {
        self.suspended.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.suspended.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }

    /// The signal of the current run.
    pub fn token(&self) -> CancellationToken {
        self.token.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token().is_cancelled()
    }

    /// Checked before pulling a batch.
    pub fn can_pull(&self) -> bool {
        self.is_running() && !self.is_suspended() && !self.is_cancelled()
    }

    /// Checked before each item of a sequential batch.
    pub fn can_continue(&self) -> bool {
        self.is_running() && !self.is_suspended()
    }
}
