//! Lifecycle orchestration for class sessions.
//!
//! The manager is the façade over the registry: it validates, conflict
//! checks, persists, and publishes side effects to the external
//! notification dispatcher. A dispatcher failure accompanying a state
//! transition is reported and logged but never rolls the transition back.
//!
//! The registry lock is only ever held across synchronous registry calls,
//! never across an await on an external collaborator.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use studyhall_core::config::StudyHallConfig;
use studyhall_core::error::{Result, StudyHallError};
use studyhall_core::traits::{
    AnnounceEvent, ChannelKey, Destination, NotificationDispatcher, ResourceResolver,
};
use studyhall_core::types::{ExternalRefs, SessionStatus};
use studyhall_registry::conflict::{self, CandidateSlot};
use studyhall_registry::{ActiveFilter, ClassParams, ClassRegistry, ClassSession, derive_class_id};

/// The lifecycle orchestrator.
pub struct ClassManager<D, R> {
    registry: Arc<Mutex<ClassRegistry>>,
    dispatcher: D,
    resolver: R,
    config: StudyHallConfig,
}

impl<D: NotificationDispatcher, R: ResourceResolver> ClassManager<D, R> {
    pub fn new(
        registry: Arc<Mutex<ClassRegistry>>,
        dispatcher: D,
        resolver: R,
        config: StudyHallConfig,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            resolver,
            config,
        }
    }

    /// Shared handle to the registry (the sweep engine queries through it).
    pub fn registry(&self) -> Arc<Mutex<ClassRegistry>> {
        Arc::clone(&self.registry)
    }

    pub fn config(&self) -> &StudyHallConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Validate, conflict check, create the external resources, persist.
    ///
    /// The announcement message is required: if it cannot be created nothing
    /// is persisted. The class role is best-effort; a failure there leaves
    /// the ref unset and is logged.
    pub async fn create_class(&self, params: ClassParams) -> Result<ClassSession> {
        validate_duration(&self.config, params.duration)?;
        validate_start(&self.config, params.start)?;

        let id = derive_class_id(&params.topic, &params.professor, params.start);
        let end = params.start + params.duration;

        // Pre-flight under one lock: duplicate id and scheduling conflicts.
        // The insert below re-checks the id, which is the authoritative
        // guard against concurrent creations.
        {
            let registry = self.registry.lock().await;
            if registry.get(&id).is_ok() {
                return Err(StudyHallError::AlreadyExists { id });
            }
            let active = registry.query_active(&ActiveFilter {
                window: Some((params.start, end)),
                ..Default::default()
            });
            conflict::check(
                &CandidateSlot {
                    professor: &params.professor,
                    cohort: params.cohort,
                    start: params.start,
                    end,
                },
                &active,
            )?;
        }

        let destination = self
            .resolver
            .resolve(&params.guild, &ChannelKey::Announcement(params.cohort))
            .await
            .ok_or_else(|| {
                StudyHallError::config(format!(
                    "no announcement channel configured for cohort {}",
                    params.cohort
                ))
            })?;

        let mut session = ClassSession::from_params(params);

        let announcement = self
            .dispatcher
            .announce(
                AnnounceEvent::ClassAnnouncement,
                announcement_payload(&session, &destination),
            )
            .await?;
        let role = match self
            .dispatcher
            .announce(AnnounceEvent::ClassRole, role_payload(&session))
            .await
        {
            Ok(role) => Some(role),
            Err(e) => {
                tracing::warn!("⚠️ class role creation failed for {}: {e}", session.id);
                None
            }
        };
        session.external_refs = ExternalRefs {
            announcement: Some(announcement.clone()),
            role,
        };

        let created = {
            let mut registry = self.registry.lock().await;
            registry.create(session.clone())
        };
        if let Err(e) = created {
            // Lost a concurrent race on the same id: retract what we made.
            if let Err(te) = self.dispatcher.teardown(&announcement).await {
                tracing::warn!("⚠️ orphan announcement teardown failed: {te}");
            }
            if let Some(role) = &session.external_refs.role
                && let Err(te) = self.dispatcher.teardown(role).await
            {
                tracing::warn!("⚠️ orphan role teardown failed: {te}");
            }
            return Err(e);
        }

        // Stamp the definitive id onto the announcement.
        if let Err(e) = self
            .dispatcher
            .update(
                &announcement,
                serde_json::json!({ "kind": "class_id", "class_id": session.id }),
            )
            .await
        {
            tracing::warn!("⚠️ failed to stamp class id on announcement: {e}");
        }

        Ok(session)
    }

    /// Planned -> InProgress, then publish the start notice.
    pub async fn start_class(&self, id: &str) -> Result<()> {
        let session = {
            let mut registry = self.registry.lock().await;
            registry.update_status(id, SessionStatus::InProgress)?
        };
        tracing::info!("▶️ class {id} started");

        self.update_announcement(&session).await;
        self.classroom_notice(&session, "started").await;
        Ok(())
    }

    /// InProgress -> Finished; the ephemeral role is torn down, announcement
    /// and record data stay intact.
    pub async fn finish_class(&self, id: &str) -> Result<()> {
        let session = {
            let mut registry = self.registry.lock().await;
            registry.update_status(id, SessionStatus::Finished)?
        };
        tracing::info!("🏁 class {id} finished");

        self.teardown_role(&session).await;
        self.update_announcement(&session).await;
        Ok(())
    }

    /// Planned -> Canceled; role torn down, announcement content cleared by
    /// the dispatcher.
    pub async fn cancel_class(&self, id: &str) -> Result<()> {
        let session = {
            let mut registry = self.registry.lock().await;
            registry.update_status(id, SessionStatus::Canceled)?
        };
        tracing::info!("🚫 class {id} canceled");

        self.teardown_role(&session).await;
        if let Some(announcement) = &session.external_refs.announcement
            && let Err(e) = self
                .dispatcher
                .update(
                    announcement,
                    serde_json::json!({
                        "kind": "canceled",
                        "class_id": session.id,
                        "status": session.status,
                    }),
                )
                .await
        {
            tracing::warn!("⚠️ announcement cancel update failed for class {id}: {e}");
        }
        Ok(())
    }

    /// Append a recording link. Allowed in any non-Canceled status.
    pub async fn add_record_link(&self, id: &str, link: &str) -> Result<()> {
        let url = url::Url::parse(link)
            .map_err(|e| StudyHallError::validation(format!("invalid record link: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(StudyHallError::validation(
                "record link must be an http(s) URL",
            ));
        }

        let session = {
            let mut registry = self.registry.lock().await;
            registry.append_record_link(id, link)?;
            registry.get(id)?
        };
        if let Some(announcement) = &session.external_refs.announcement
            && let Err(e) = self
                .dispatcher
                .update(
                    announcement,
                    serde_json::json!({
                        "kind": "record_link",
                        "class_id": session.id,
                        "link": link,
                    }),
                )
                .await
        {
            tracing::warn!("⚠️ announcement record-link update failed for class {id}: {e}");
        }
        Ok(())
    }

    /// Register an actor. Membership always updates; the role grant and the
    /// confirmation message are skipped when the role resource is gone.
    pub async fn subscribe(&self, id: &str, actor: &str) -> Result<()> {
        let (added, session) = {
            let mut registry = self.registry.lock().await;
            let added = registry.add_subscriber(id, actor)?;
            (added, registry.get(id)?)
        };
        if !added {
            return Ok(());
        }

        match &session.external_refs.role {
            Some(role) => {
                if let Err(e) = self
                    .dispatcher
                    .update(role, serde_json::json!({ "action": "grant", "actor": actor }))
                    .await
                {
                    tracing::warn!("⚠️ role grant failed for {actor} on class {id}: {e}");
                }
                if let Err(e) = self
                    .dispatcher
                    .notify_actor(
                        actor,
                        &format!(
                            "You are subscribed to '{}' ({}).",
                            session.topic, session.subject_name
                        ),
                    )
                    .await
                {
                    tracing::debug!("subscribe confirmation to {actor} failed: {e}");
                }
            }
            None => {
                tracing::warn!(
                    "class {id} has no role resource; membership recorded without a grant"
                );
            }
        }
        Ok(())
    }

    /// Remove an actor; mirror of [`subscribe`](Self::subscribe).
    pub async fn unsubscribe(&self, id: &str, actor: &str) -> Result<()> {
        let (removed, session) = {
            let mut registry = self.registry.lock().await;
            let removed = registry.remove_subscriber(id, actor)?;
            (removed, registry.get(id)?)
        };
        if !removed {
            return Ok(());
        }

        match &session.external_refs.role {
            Some(role) => {
                if let Err(e) = self
                    .dispatcher
                    .update(role, serde_json::json!({ "action": "revoke", "actor": actor }))
                    .await
                {
                    tracing::warn!("⚠️ role revoke failed for {actor} on class {id}: {e}");
                }
            }
            None => {
                tracing::warn!("class {id} has no role resource; membership removed anyway");
            }
        }
        Ok(())
    }

    /// One-shot pre-start reminder to the classroom, the subscribers, and
    /// the professor. A second call is a no-op.
    pub async fn remind_class(&self, id: &str) -> Result<()> {
        let (won, session) = {
            let mut registry = self.registry.lock().await;
            let won = registry.mark_reminded(id)?;
            (won, registry.get(id)?)
        };
        if !won {
            return Ok(());
        }
        tracing::info!("🔔 reminder fired for class {id}");

        self.classroom_notice(&session, "reminder").await;

        let text = format!(
            "Reminder: '{}' ({}) starts at {}.",
            session.topic,
            session.subject_name,
            session.start.to_rfc3339()
        );
        for actor in session
            .subscribers
            .iter()
            .chain(std::iter::once(&session.professor))
        {
            if let Err(e) = self.dispatcher.notify_actor(actor, &text).await {
                tracing::warn!("⚠️ reminder to {actor} failed for class {id}: {e}");
            }
        }
        Ok(())
    }

    /// Planned sessions starting within `window` from now, ordered by start.
    pub async fn upcoming(&self, window: Duration) -> Vec<ClassSession> {
        self.registry.lock().await.query_upcoming(Utc::now(), window)
    }

    async fn update_announcement(&self, session: &ClassSession) {
        if let Some(announcement) = &session.external_refs.announcement
            && let Err(e) = self
                .dispatcher
                .update(
                    announcement,
                    serde_json::json!({
                        "kind": "status",
                        "class_id": session.id,
                        "status": session.status,
                    }),
                )
                .await
        {
            tracing::warn!(
                "⚠️ announcement update failed for class {}: {e}",
                session.id
            );
        }
    }

    async fn classroom_notice(&self, session: &ClassSession, kind: &str) {
        let key = ChannelKey::Classroom(session.subject_code.clone());
        let Some(destination) = self.resolver.resolve(&session.guild, &key).await else {
            tracing::warn!(
                "no classroom channel configured for subject {}",
                session.subject_code
            );
            return;
        };
        let payload = serde_json::json!({
            "destination": destination.0,
            "kind": kind,
            "class_id": session.id,
            "topic": session.topic,
            "start": session.start.to_rfc3339(),
            "role": session.external_refs.role,
        });
        if let Err(e) = self
            .dispatcher
            .announce(AnnounceEvent::ClassroomNotice, payload)
            .await
        {
            tracing::warn!(
                "⚠️ classroom notice '{kind}' failed for class {}: {e}",
                session.id
            );
        }
    }

    async fn teardown_role(&self, session: &ClassSession) {
        let Some(role) = &session.external_refs.role else {
            return;
        };
        if let Err(e) = self.dispatcher.teardown(role).await {
            tracing::warn!("⚠️ role teardown failed for class {}: {e}", session.id);
        }
        let mut registry = self.registry.lock().await;
        let mut refs = session.external_refs.clone();
        refs.role = None;
        if let Err(e) = registry.set_external_refs(&session.id, refs) {
            tracing::warn!("⚠️ could not clear role ref for class {}: {e}", session.id);
        }
    }
}

pub(crate) fn validate_duration(config: &StudyHallConfig, duration: Duration) -> Result<()> {
    if duration <= Duration::zero() {
        return Err(StudyHallError::validation("duration must be positive"));
    }
    if duration < config.min_duration() || duration > config.max_duration() {
        return Err(StudyHallError::validation(format!(
            "duration must be between {} minutes and {} hours",
            config.min_duration_minutes, config.max_duration_hours
        )));
    }
    Ok(())
}

pub(crate) fn validate_start(config: &StudyHallConfig, start: DateTime<Utc>) -> Result<()> {
    let now = Utc::now();
    if start <= now {
        return Err(StudyHallError::validation("the class must start in the future"));
    }
    if start > now + config.lookahead() {
        return Err(StudyHallError::validation(format!(
            "the class must start within the next {} days",
            config.lookahead_days
        )));
    }
    Ok(())
}

/// Structured projection of a session for the announcement embed. The
/// authoritative `status` field travels with it; the dispatcher renders,
/// never stores state.
fn announcement_payload(session: &ClassSession, destination: &Destination) -> serde_json::Value {
    serde_json::json!({
        "destination": destination.0,
        "guild": session.guild,
        "subject": session.subject_name,
        "subject_code": session.subject_code,
        "topic": session.topic,
        "cohort": session.cohort,
        "audience": session.audience,
        "professor": session.professor,
        "start": session.start.to_rfc3339(),
        "end": session.end().to_rfc3339(),
        "duration_minutes": session.duration().num_minutes(),
        "place": session.place,
        "place_info": session.place_info,
        "is_recorded": session.is_recorded,
        "status": session.status,
    })
}

fn role_payload(session: &ClassSession) -> serde_json::Value {
    serde_json::json!({
        "guild": session.guild,
        "name": format!(
            "{} - {} ({})",
            session.subject_name,
            session.topic,
            session.start.format("%Y-%m-%d %H:%M")
        ),
        "mentionable": true,
    })
}
