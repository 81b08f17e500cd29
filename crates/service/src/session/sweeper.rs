//! Periodic garbage collection of expired session rows.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use super::domain::SweepReport;
use super::store::SessionStore;
use crate::runtime::ShutdownSignal;

/// Spawn the sweeper. The first sweep runs immediately, then every `every`,
/// until `shutdown` fires. Sweep errors are logged and the loop keeps going.
/// `on_report` sees the outcome of every successful sweep.
pub fn spawn_sweeper<F>(store: Arc<SessionStore>, every: Duration, mut shutdown: ShutdownSignal, on_report: F) -> JoinHandle<()>
where
    F: Fn(&SweepReport) + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = every.as_secs(), "session sweeper started");
        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                _ = ticker.tick() => {
                    match store.sweep().await {
                        Ok(report) => on_report(&report),
                        Err(e) => error!(error = %e, op = "session_sweep", "session sweep failed"),
                    }
                }
            }
        }
        info!("session sweeper stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::domain::AuthUser;
    use crate::runtime::shutdown_channel;
    use crate::session::clock::ManualClock;
    use crate::session::repository::mock::MockSessionRepository;
    use crate::session::SessionPolicy;
    use chrono::Utc;
    use uuid::Uuid;

    #[tokio::test(start_paused = true)]
    async fn sweeps_periodically_and_stops_on_shutdown() {
        let repo = Arc::new(MockSessionRepository::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(SessionStore::new(repo.clone(), clock.clone(), SessionPolicy::default()));
        let user = AuthUser { id: Uuid::new_v4(), phone: "5550100".into(), first_name: "Ada".into(), email: None, verified: true };
        store.create_user_session(&user).await.unwrap();

        let (trigger, signal) = shutdown_channel();
        let swept = Arc::new(std::sync::atomic::AtomicU64::new(0));
        let seen = swept.clone();
        let handle = spawn_sweeper(store.clone(), Duration::from_secs(3600), signal, move |r| {
            seen.fetch_add(r.total(), std::sync::atomic::Ordering::SeqCst);
        });

        // first tick fires at once; the row is still live
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(repo.user_rows(), 1);

        clock.advance(chrono::Duration::days(61));
        tokio::time::sleep(Duration::from_secs(3601)).await;
        assert_eq!(repo.user_rows(), 0);
        assert_eq!(swept.load(std::sync::atomic::Ordering::SeqCst), 1);

        trigger.trigger();
        tokio::time::timeout(Duration::from_secs(5), handle).await.expect("sweeper stops").expect("join");
    }

    #[tokio::test(start_paused = true)]
    async fn storage_errors_do_not_stop_the_loop() {
        let repo = Arc::new(MockSessionRepository::default());
        repo.fail_writes(true);
        let store = Arc::new(SessionStore::new(repo.clone(), crate::session::clock::system_clock(), SessionPolicy::default()));
        let (trigger, signal) = shutdown_channel();
        let handle = spawn_sweeper(store, Duration::from_secs(60), signal, |_| {});
        tokio::time::sleep(Duration::from_secs(181)).await;
        assert!(!handle.is_finished());
        trigger.trigger();
        handle.await.expect("join");
    }
}
