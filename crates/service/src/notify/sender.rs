use std::time::Duration;

use async_trait::async_trait;
use common::types::SmsMessage;
use configs::NotifyConfig;
use tracing::info;

use super::errors::NotifyError;

#[async_trait]
pub trait SmsSender: Send + Sync {
    fn name(&self) -> &'static str;
    async fn send(&self, msg: &SmsMessage) -> Result<(), NotifyError>;
}

/// Twilio Messages API client.
pub struct TwilioSender {
    client: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    from: String,
}

impl TwilioSender {
    pub fn new(cfg: &NotifyConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: cfg.twilio_base_url.trim_end_matches('/').to_string(),
            account_sid: cfg.twilio_account_sid.clone(),
            auth_token: cfg.twilio_auth_token.clone(),
            from: cfg.from_number.clone(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/2010-04-01/Accounts/{}/Messages.json", self.base_url, self.account_sid)
    }
}

#[async_trait]
impl SmsSender for TwilioSender {
    fn name(&self) -> &'static str { "twilio" }

    async fn send(&self, msg: &SmsMessage) -> Result<(), NotifyError> {
        let form = [("To", msg.to.as_str()), ("From", self.from.as_str()), ("Body", msg.message.as_str())];
        let resp = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.json::<serde_json::Value>().await.unwrap_or_default();
        let message = body
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error")
            .to_string();
        Err(NotifyError::Provider { status: status.as_u16(), message })
    }
}

/// Used when SMS delivery is disabled: messages are logged and dropped.
#[derive(Default)]
pub struct LogOnlySender;

#[async_trait]
impl SmsSender for LogOnlySender {
    fn name(&self) -> &'static str { "log" }

    async fn send(&self, msg: &SmsMessage) -> Result<(), NotifyError> {
        info!(to = %msg.to, len = msg.message.len(), "sms delivery disabled; message dropped");
        Ok(())
    }
}

/// Recording sender for tests
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingSender {
        sent: Mutex<Vec<SmsMessage>>,
        fail_remaining: AtomicUsize,
    }

    impl RecordingSender {
        /// Rejects the first `n` messages.
        pub fn failing_first(n: usize) -> Self {
            Self { sent: Mutex::new(Vec::new()), fail_remaining: AtomicUsize::new(n) }
        }

        pub fn sent(&self) -> Vec<SmsMessage> {
            self.sent.lock().unwrap().clone()
        }

        /// Poll until at least `n` messages were delivered or `within` elapses.
        pub async fn wait_for(&self, n: usize, within: Duration) -> Vec<SmsMessage> {
            let deadline = tokio::time::Instant::now() + within;
            loop {
                let sent = self.sent();
                if sent.len() >= n || tokio::time::Instant::now() >= deadline {
                    return sent;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        }
    }

    #[async_trait]
    impl SmsSender for RecordingSender {
        fn name(&self) -> &'static str { "recording" }

        async fn send(&self, msg: &SmsMessage) -> Result<(), NotifyError> {
            let failing = self
                .fail_remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(NotifyError::Provider { status: 400, message: "injected".into() });
            }
            self.sent.lock().unwrap().push(msg.clone());
            Ok(())
        }
    }
}
