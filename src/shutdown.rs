// src/shutdown.rs
// Interrupt handling: the first signal cancels the run, the second exits

use futures_util::StreamExt;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::{Handle, Signals};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Shared cancellation flag. Clones observe the same state.
#[derive(Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once `cancel` has been called on any clone.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                // Sender gone: cancellation can no longer happen
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ShutdownManager {
    signal_handle: Option<Handle>,
    task: Option<JoinHandle<()>>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self {
            signal_handle: None,
            task: None,
        }
    }

    /// Listen for SIGINT/SIGTERM and route the first one into `cancel`.
    pub fn install(&mut self, cancel: CancelToken) -> Result<(), Box<dyn std::error::Error>> {
        let signals = Signals::new([SIGINT, SIGTERM])?;
        self.signal_handle = Some(signals.handle());

        let logger = crate::logger::get_logger();

        self.task = Some(tokio::spawn(async move {
            let mut signals = signals;

            while let Some(signal) = signals.next().await {
                if !matches!(signal, SIGINT | SIGTERM) {
                    continue;
                }

                if cancel.is_cancelled() {
                    logger.force_exit_message();
                    std::process::exit(130);
                }

                logger.cancel_message();
                cancel.cancel();
            }
        }));

        Ok(())
    }

    /// Stop listening. Safe to call when `install` was never called.
    pub fn close(&mut self) {
        if let Some(handle) = self.signal_handle.take() {
            handle.close();
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ShutdownManager {
    fn drop(&mut self) {
        self.close();
    }
}
