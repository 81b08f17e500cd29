use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local, Utc};
use mockable::{Clock, DefaultClock};

pub type SharedClock = Arc<dyn Clock + Send + Sync>;

pub fn system_clock() -> SharedClock {
    Arc::new(DefaultClock)
}

/// Clock that only moves when told to.
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, delta: Duration) {
        let mut guard = self.0.lock().unwrap_or_else(|p| p.into_inner());
        *guard += delta;
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap_or_else(|p| p.into_inner())
    }
}
