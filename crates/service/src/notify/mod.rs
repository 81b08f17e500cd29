//! Outbound SMS: handlers enqueue [`common::types::SmsMessage`]s on a bounded
//! channel; one worker drains it and talks to the provider. Delivery happens
//! after the originating request has completed, so provider failures are only
//! logged.

pub mod errors;
pub mod queue;
pub mod sender;

pub use queue::{spawn_worker, Notifier};
pub use sender::SmsSender;
