use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification queue closed")]
    QueueClosed,
    #[error("sms provider rejected message ({status}): {message}")]
    Provider { status: u16, message: String },
    #[error("sms provider unreachable: {0}")]
    Transport(String),
}
