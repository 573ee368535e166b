//! Cooperative shutdown signal
//!
//! Every long-running loop holds a [`Shutdown`] and selects on
//! [`Shutdown::recv`]. Dropping the [`ShutdownTrigger`] counts as a trigger,
//! so a loop can never outlive the owner of its trigger.

use tokio::sync::watch;

/// Sending side, owned by whoever decides when to stop
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

/// Receiving side, cloned into every task that must stop
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Create a connected trigger and signal
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn subscribe(&self) -> Shutdown {
        Shutdown {
            rx: self.tx.subscribe(),
        }
    }
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolve once shutdown has been triggered
    ///
    /// Cancel safe, so it can sit in a `select!` loop.
    pub async fn recv(&mut self) {
        // Err means the trigger was dropped
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }
}
