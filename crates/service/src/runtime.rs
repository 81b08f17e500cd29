//! Process lifecycle helpers shared by background tasks.
//!
//! A single [`ShutdownTrigger`] fans out to any number of [`ShutdownSignal`]s;
//! the sweeper and the notification worker both select on one.

use tokio::sync::watch;

pub struct ShutdownTrigger(watch::Sender<bool>);

#[derive(Clone)]
pub struct ShutdownSignal(watch::Receiver<bool>);

pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger(tx), ShutdownSignal(rx))
}

impl ShutdownTrigger {
    /// Idempotent; later calls are no-ops.
    pub fn trigger(&self) {
        self.0.send_replace(true);
    }
}

impl ShutdownSignal {
    /// Resolves once shutdown is triggered or the trigger is dropped.
    pub async fn wait(&mut self) {
        while !*self.0.borrow_and_update() {
            if self.0.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn all_signals_observe_trigger() {
        let (trigger, signal) = shutdown_channel();
        let mut a = signal.clone();
        let mut b = signal;
        assert!(tokio::time::timeout(Duration::from_millis(20), a.wait()).await.is_err());
        trigger.trigger();
        tokio::time::timeout(Duration::from_secs(1), a.wait()).await.expect("a");
        tokio::time::timeout(Duration::from_secs(1), b.wait()).await.expect("b");
    }

    #[tokio::test]
    async fn dropped_trigger_releases_waiters() {
        let (trigger, mut signal) = shutdown_channel();
        drop(trigger);
        tokio::time::timeout(Duration::from_secs(1), signal.wait()).await.expect("released");
    }
}
