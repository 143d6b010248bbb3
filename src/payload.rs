//! Payload contract between the host application and the runner
//!
//! The payload is whatever the managed service actually does once
//! started. It runs on the calling thread and is expected to block
//! until the shutdown signal fires or it fails.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::PayloadError;

/// Application logic run by the service.
///
/// `run` blocks for the life of the service and must return promptly
/// once `shutdown` fires. A supervised instance that ignores the signal
/// will be killed by the native supervisor after its stop timeout.
pub trait Payload: Send {
    fn run(&mut self, shutdown: ShutdownSignal) -> Result<(), PayloadError>;
}

impl<F> Payload for F
where
    F: FnMut(ShutdownSignal) -> Result<(), PayloadError> + Send,
{
    fn run(&mut self, shutdown: ShutdownSignal) -> Result<(), PayloadError> {
        self(shutdown)
    }
}

/// Receiving side of the stop request, handed to the payload.
#[derive(Clone)]
pub struct ShutdownSignal {
    stopped: Arc<AtomicBool>,
    rx: Receiver<()>,
}

impl ShutdownSignal {
    /// Create a connected handle/signal pair
    pub fn channel() -> (ShutdownHandle, ShutdownSignal) {
        let stopped = Arc::new(AtomicBool::new(false));
        let (tx, rx) = bounded(1);
        (
            ShutdownHandle {
                stopped: stopped.clone(),
                tx,
            },
            ShutdownSignal { stopped, rx },
        )
    }

    /// Non-blocking check for a pending stop request
    pub fn is_shutdown(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Block until a stop is requested
    pub fn wait(&self) {
        // The single channel message may go to another clone of this
        // signal; the flag is the source of truth.
        while !self.is_shutdown() {
            match self.rx.recv_timeout(Duration::from_millis(100)) {
                Ok(()) => return,
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return,
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            }
        }
    }

    /// Block until a stop is requested or `timeout` elapses.
    /// Returns true if a stop was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_shutdown() {
            return true;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(()) => true,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => true,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => self.is_shutdown(),
        }
    }
}

/// Sending side of the stop request, kept by the runner.
#[derive(Clone)]
pub struct ShutdownHandle {
    stopped: Arc<AtomicBool>,
    tx: Sender<()>,
}

impl ShutdownHandle {
    /// Request a stop. Idempotent; later calls are no-ops.
    pub fn shutdown(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let _ = self.tx.try_send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_fires_after_shutdown() {
        let (handle, signal) = ShutdownSignal::channel();
        assert!(!signal.is_shutdown());
        handle.shutdown();
        assert!(signal.is_shutdown());
        // Polling stays true once stopped
        assert!(signal.is_shutdown());
    }

    #[test]
    fn shutdown_is_idempotent() {
        let (handle, signal) = ShutdownSignal::channel();
        handle.shutdown();
        handle.shutdown();
        handle.shutdown();
        assert!(signal.is_shutdown());
        assert!(signal.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn wait_timeout_expires_without_signal() {
        let (_handle, signal) = ShutdownSignal::channel();
        assert!(!signal.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn wait_unblocks_from_another_thread() {
        let (handle, signal) = ShutdownSignal::channel();
        let waiter = std::thread::spawn(move || signal.wait());
        handle.shutdown();
        waiter.join().unwrap();
    }

    #[test]
    fn closures_are_payloads() {
        let mut payload = |signal: ShutdownSignal| -> Result<(), PayloadError> {
            assert!(!signal.is_shutdown());
            Ok(())
        };
        let (_handle, signal) = ShutdownSignal::channel();
        Payload::run(&mut payload, signal).unwrap();
    }
}
