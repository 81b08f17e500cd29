use std::sync::Arc;

use common::types::SmsMessage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::errors::NotifyError;
use super::sender::SmsSender;
use crate::runtime::ShutdownSignal;

/// Producer side of the SMS queue. Cheap to clone; shared by every handler.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<SmsMessage>,
}

impl Notifier {
    /// Bounded queue of `capacity` messages.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SmsMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Waits for room when the queue is full.
    pub async fn enqueue(&self, msg: SmsMessage) -> Result<(), NotifyError> {
        if self.tx.capacity() == 0 {
            warn!(to = %msg.to, "sms queue full; waiting for capacity");
        }
        self.tx.send(msg).await.map_err(|_| NotifyError::QueueClosed)
    }
}

/// Deliver queued messages one at a time until the queue closes or shutdown fires.
///
/// Shutdown stops intake but not delivery: everything already queued is sent
/// before the worker returns.
pub async fn run_worker(mut rx: mpsc::Receiver<SmsMessage>, sender: Arc<dyn SmsSender>, mut shutdown: ShutdownSignal) {
    info!(provider = sender.name(), "sms worker started");
    loop {
        let msg = tokio::select! {
            biased;
            next = rx.recv() => match next {
                Some(msg) => msg,
                None => break,
            },
            _ = shutdown.wait() => break,
        };
        deliver(sender.as_ref(), &msg).await;
    }

    rx.close();
    let mut drained = 0usize;
    while let Some(msg) = rx.recv().await {
        deliver(sender.as_ref(), &msg).await;
        drained += 1;
    }
    info!(drained, "sms worker stopped");
}

async fn deliver(sender: &dyn SmsSender, msg: &SmsMessage) {
    match sender.send(msg).await {
        Ok(()) => debug!(to = %msg.to, provider = sender.name(), "sms delivered"),
        Err(e) => error!(to = %msg.to, provider = sender.name(), error = %e, "sms delivery failed"),
    }
}

pub fn spawn_worker(rx: mpsc::Receiver<SmsMessage>, sender: Arc<dyn SmsSender>, shutdown: ShutdownSignal) -> JoinHandle<()> {
    tokio::spawn(run_worker(rx, sender, shutdown))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::sender::mock::RecordingSender;
    use crate::runtime::shutdown_channel;
    use std::time::Duration;

    #[tokio::test]
    async fn worker_delivers_in_enqueue_order() {
        let (notifier, rx) = Notifier::channel(8);
        let sender = Arc::new(RecordingSender::default());
        let (trigger, signal) = shutdown_channel();
        let handle = spawn_worker(rx, sender.clone(), signal);

        for i in 0..3 {
            notifier.enqueue(SmsMessage::new("5550100", format!("msg {i}"))).await.unwrap();
        }
        let sent = sender.wait_for(3, Duration::from_secs(2)).await;
        let bodies: Vec<_> = sent.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(bodies, ["msg 0", "msg 1", "msg 2"]);

        trigger.trigger();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn provider_errors_do_not_stop_worker() {
        let (notifier, rx) = Notifier::channel(4);
        let sender = Arc::new(RecordingSender::failing_first(1));
        let (trigger, signal) = shutdown_channel();
        let handle = spawn_worker(rx, sender.clone(), signal);

        notifier.enqueue(SmsMessage::new("1", "a")).await.unwrap();
        notifier.enqueue(SmsMessage::new("2", "b")).await.unwrap();
        let sent = sender.wait_for(1, Duration::from_secs(2)).await;
        assert_eq!(sent[0].to, "2");

        trigger.trigger();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_delivers_everything_already_queued() {
        let (notifier, rx) = Notifier::channel(8);
        let sender = Arc::new(RecordingSender::default());
        let (trigger, signal) = shutdown_channel();

        for i in 0..5 {
            notifier.enqueue(SmsMessage::new("5550100", format!("msg {i}"))).await.unwrap();
        }
        trigger.trigger();
        tokio::time::timeout(Duration::from_secs(2), run_worker(rx, sender.clone(), signal))
            .await
            .expect("worker returns after draining");

        let bodies: Vec<_> = sender.sent().into_iter().map(|m| m.message).collect();
        assert_eq!(bodies, ["msg 0", "msg 1", "msg 2", "msg 3", "msg 4"]);
        let err = notifier.enqueue(SmsMessage::new("1", "late")).await.unwrap_err();
        assert!(matches!(err, NotifyError::QueueClosed));
    }

    #[tokio::test]
    async fn full_queue_applies_backpressure() {
        let (notifier, mut rx) = Notifier::channel(1);
        notifier.enqueue(SmsMessage::new("1", "a")).await.unwrap();
        let blocked = tokio::time::timeout(Duration::from_millis(50), notifier.enqueue(SmsMessage::new("2", "b"))).await;
        assert!(blocked.is_err());
        assert_eq!(rx.recv().await.unwrap().to, "1");
    }

    #[tokio::test]
    async fn enqueue_after_worker_gone_reports_closed() {
        let (notifier, rx) = Notifier::channel(1);
        drop(rx);
        let err = notifier.enqueue(SmsMessage::new("1", "a")).await.unwrap_err();
        assert!(matches!(err, NotifyError::QueueClosed));
    }
}
