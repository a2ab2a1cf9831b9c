//! Sweep engine - periodically scans the registry and fires due work.
//! Uses tokio::interval for the loop; the tick body runs to completion
//! before the next tick is taken, and missed ticks are skipped, not queued.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use studyhall_classes::ClassManager;
use studyhall_core::traits::{NotificationDispatcher, ResourceResolver};

/// Counts of transitions fired by one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub reminded: usize,
    pub started: usize,
    pub finished: usize,
}

impl SweepStats {
    pub fn is_empty(&self) -> bool {
        self.reminded == 0 && self.started == 0 && self.finished == 0
    }
}

/// The sweep engine. It is the only actor driving time-based transitions
/// automatically; manual operator calls go through the same orchestrator
/// and are reconciled by the same status guard.
pub struct SweepEngine<D, R> {
    manager: Arc<ClassManager<D, R>>,
}

impl<D: NotificationDispatcher, R: ResourceResolver> SweepEngine<D, R> {
    pub fn new(manager: Arc<ClassManager<D, R>>) -> Self {
        Self { manager }
    }

    /// One sweep against the wall clock.
    pub async fn tick(&self) -> SweepStats {
        self.tick_at(Utc::now()).await
    }

    /// One sweep against an injected clock. Ordering matters: reminders
    /// before starts before finishes, so a session crossing a boundary in
    /// this tick gets the earliest applicable transition first.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> SweepStats {
        let lead = self.manager.config().reminder_lead();

        // Collect the due work under one short lock, then release it before
        // any orchestrator call suspends on external I/O.
        let registry = self.manager.registry();
        let (reminders, starts, finishes) = {
            let registry = registry.lock().await;
            (
                registry.due_reminders(now, lead),
                registry.due_starts(now),
                registry.due_finishes(now),
            )
        };

        let mut stats = SweepStats::default();

        for session in &reminders {
            match self.manager.remind_class(&session.id).await {
                Ok(()) => stats.reminded += 1,
                Err(e) if e.is_precondition() => {
                    tracing::debug!("reminder race on class {}: {e}", session.id);
                }
                Err(e) => tracing::warn!("⚠️ reminder failed for class {}: {e}", session.id),
            }
        }

        for session in &starts {
            match self.manager.start_class(&session.id).await {
                Ok(()) => stats.started += 1,
                Err(e) if e.is_precondition() => {
                    tracing::debug!("start race on class {}: {e}", session.id);
                }
                Err(e) => tracing::warn!("⚠️ start failed for class {}: {e}", session.id),
            }
        }

        for session in &finishes {
            match self.manager.finish_class(&session.id).await {
                Ok(()) => stats.finished += 1,
                Err(e) if e.is_precondition() => {
                    tracing::debug!("finish race on class {}: {e}", session.id);
                }
                Err(e) => tracing::warn!("⚠️ finish failed for class {}: {e}", session.id),
            }
        }

        stats
    }
}

/// Run the sweep loop. Spawn this as a background tokio task, one per
/// process. The tick body cannot overlap itself by construction, and a
/// tick that is still running when the next is due causes that one to be
/// skipped.
pub async fn spawn_sweeper<D, R>(engine: Arc<SweepEngine<D, R>>, check_interval_secs: u64)
where
    D: NotificationDispatcher + 'static,
    R: ResourceResolver + 'static,
{
    tracing::info!("⏰ sweep engine started (check every {check_interval_secs}s)");

    let mut interval =
        tokio::time::interval(std::time::Duration::from_secs(check_interval_secs));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let stats = engine.tick().await;
        if !stats.is_empty() {
            tracing::info!(
                "📣 sweep: {} reminded, {} started, {} finished",
                stats.reminded,
                stats.started,
                stats.finished
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicU64, Ordering};
    use studyhall_core::StudyHallConfig;
    use studyhall_core::error::Result;
    use studyhall_core::traits::{AnnounceEvent, ChannelKey, Destination};
    use studyhall_core::types::{Cohort, ExternalRef, Place, SessionStatus};
    use studyhall_registry::{ClassParams, ClassRegistry};
    use tokio::sync::Mutex;

    /// Dispatcher that only counts what it is asked to send.
    #[derive(Default)]
    struct CountingDispatcher {
        announces: StdMutex<Vec<AnnounceEvent>>,
        notifies: AtomicU64,
        next_ref: AtomicU64,
    }

    impl CountingDispatcher {
        fn notices(&self) -> usize {
            self.announces
                .lock()
                .unwrap()
                .iter()
                .filter(|e| **e == AnnounceEvent::ClassroomNotice)
                .count()
        }
    }

    #[async_trait]
    impl NotificationDispatcher for CountingDispatcher {
        async fn announce(
            &self,
            event: AnnounceEvent,
            _payload: serde_json::Value,
        ) -> Result<ExternalRef> {
            self.announces.lock().unwrap().push(event);
            let n = self.next_ref.fetch_add(1, Ordering::SeqCst);
            Ok(ExternalRef::new(format!("ext-{n}")))
        }

        async fn update(&self, _resource: &ExternalRef, _payload: serde_json::Value) -> Result<()> {
            Ok(())
        }

        async fn teardown(&self, _resource: &ExternalRef) -> Result<()> {
            Ok(())
        }

        async fn notify_actor(&self, _actor: &str, _text: &str) -> Result<()> {
            self.notifies.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct AnyResolver;

    #[async_trait]
    impl ResourceResolver for AnyResolver {
        async fn resolve(&self, _guild: &str, _key: &ChannelKey) -> Option<Destination> {
            Some(Destination::new("dest"))
        }
    }

    fn params(topic: &str, professor: &str, start: DateTime<Utc>) -> ClassParams {
        ClassParams {
            guild: "guild-1".into(),
            subject_code: "ALGO201".into(),
            subject_name: "Algorithms".into(),
            topic: topic.into(),
            cohort: Cohort::L2,
            audience: None,
            professor: professor.into(),
            start,
            duration: Duration::hours(1),
            place: Place::OnPlatform,
            place_info: None,
            is_recorded: false,
        }
    }

    fn engine() -> SweepEngine<CountingDispatcher, AnyResolver> {
        let manager = ClassManager::new(
            Arc::new(Mutex::new(ClassRegistry::new())),
            CountingDispatcher::default(),
            AnyResolver,
            StudyHallConfig::default(),
        );
        SweepEngine::new(Arc::new(manager))
    }

    async fn status_of(engine: &SweepEngine<CountingDispatcher, AnyResolver>, id: &str) -> SessionStatus {
        engine.manager.registry().lock().await.get(id).unwrap().status
    }

    #[tokio::test]
    async fn test_full_lifecycle_sweep() {
        let engine = engine();
        let now = Utc::now();
        let start = now + Duration::hours(2);
        let session = engine
            .manager
            .create_class(params("Graphs", "prof-1", start))
            .await
            .unwrap();

        // Nothing due yet.
        assert!(engine.tick_at(now).await.is_empty());

        // Inside the reminder window: the reminder fires exactly once.
        let stats = engine.tick_at(start - Duration::minutes(10)).await;
        assert_eq!(stats.reminded, 1);
        assert!(engine.tick_at(start - Duration::minutes(5)).await.is_empty());
        assert_eq!(engine.manager.dispatcher().notices(), 1);
        // Subscribersless class: the professor still got the private ping.
        assert_eq!(engine.manager.dispatcher().notifies.load(Ordering::SeqCst), 1);

        // At start: Planned -> InProgress.
        let stats = engine.tick_at(start).await;
        assert_eq!(stats.started, 1);
        assert_eq!(status_of(&engine, &session.id).await, SessionStatus::InProgress);

        // Mid-class: nothing to do.
        assert!(engine.tick_at(start + Duration::minutes(30)).await.is_empty());

        // At end: InProgress -> Finished.
        let stats = engine.tick_at(start + Duration::hours(1)).await;
        assert_eq!(stats.finished, 1);
        assert_eq!(status_of(&engine, &session.id).await, SessionStatus::Finished);

        // And then the record is inert forever.
        assert!(engine.tick_at(start + Duration::hours(2)).await.is_empty());
        assert!(engine.tick_at(start + Duration::days(7)).await.is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_tick_does_not_double_fire() {
        let engine = engine();
        let start = Utc::now() + Duration::hours(1);
        engine
            .manager
            .create_class(params("Graphs", "prof-1", start))
            .await
            .unwrap();

        // Two sweeps observing the same instant: the status guard lets only
        // the first start the class.
        let first = engine.tick_at(start).await;
        let second = engine.tick_at(start).await;
        assert_eq!(first.started, 1);
        assert_eq!(second.started, 0);
    }

    #[tokio::test]
    async fn test_manual_action_reconciled_by_guard() {
        let engine = engine();
        let start = Utc::now() + Duration::hours(1);
        let session = engine
            .manager
            .create_class(params("Graphs", "prof-1", start))
            .await
            .unwrap();

        // An operator starts the class by hand before the sweep gets there.
        engine.manager.start_class(&session.id).await.unwrap();

        let stats = engine.tick_at(start).await;
        assert_eq!(stats.started, 0);
        assert_eq!(status_of(&engine, &session.id).await, SessionStatus::InProgress);

        // The sweep still finishes it on time.
        let stats = engine.tick_at(start + Duration::hours(1)).await;
        assert_eq!(stats.finished, 1);
    }

    #[tokio::test]
    async fn test_canceled_class_is_never_swept() {
        let engine = engine();
        let start = Utc::now() + Duration::hours(1);
        let session = engine
            .manager
            .create_class(params("Graphs", "prof-1", start))
            .await
            .unwrap();
        engine.manager.cancel_class(&session.id).await.unwrap();

        assert!(engine.tick_at(start - Duration::minutes(10)).await.is_empty());
        assert!(engine.tick_at(start).await.is_empty());
        assert_eq!(status_of(&engine, &session.id).await, SessionStatus::Canceled);
    }

    #[tokio::test]
    async fn test_independent_sessions_sweep_together() {
        let engine = engine();
        let now = Utc::now();
        let a = engine
            .manager
            .create_class(params("Graphs", "prof-1", now + Duration::hours(1)))
            .await
            .unwrap();
        let b = engine
            .manager
            .create_class(params("Trees", "prof-2", now + Duration::hours(1) + Duration::minutes(90)))
            .await
            .unwrap();

        // Both Planned; only A is due at its start.
        let stats = engine.tick_at(now + Duration::hours(1)).await;
        assert_eq!(stats.started, 1);
        assert_eq!(status_of(&engine, &a.id).await, SessionStatus::InProgress);
        assert_eq!(status_of(&engine, &b.id).await, SessionStatus::Planned);
    }
}
