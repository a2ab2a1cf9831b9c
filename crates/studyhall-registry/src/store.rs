//! In-memory class registry with status-guarded atomic updates.
//!
//! The registry is the single shared mutable resource of the system. Every
//! mutation runs inside one `&mut self` critical section and is atomic per
//! record, so a manual operator action and a sweep tick racing on the same
//! record cannot both perform the same transition. `update_status` is the
//! enforcement point of the state machine: it fails with a precondition
//! error instead of overwriting.
//!
//! Records are never deleted; terminal sessions are kept for history.
//! Mutations write through to SQLite when a persistence handle is attached.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use studyhall_core::error::{Result, StudyHallError};
use studyhall_core::types::{Cohort, ExternalRefs, SessionStatus};

use crate::conflict;
use crate::persistence::RegistryDb;
use crate::session::ClassSession;

/// Filter for [`ClassRegistry::query_active`].
#[derive(Debug, Clone, Default)]
pub struct ActiveFilter {
    pub professor: Option<String>,
    pub cohort: Option<Cohort>,
    /// Half-open window the session's own `[start, end)` must overlap.
    pub window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// Narrow to exactly one of the active statuses.
    pub status: Option<SessionStatus>,
}

/// The class-session registry.
pub struct ClassRegistry {
    sessions: HashMap<String, ClassSession>,
    db: Option<RegistryDb>,
}

impl ClassRegistry {
    /// In-memory only registry (tests, ephemeral hosts).
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            db: None,
        }
    }

    /// Registry backed by a SQLite file; existing records are loaded.
    pub fn open(path: &Path) -> Result<Self> {
        let db = RegistryDb::open(path)?;
        let sessions = db
            .load_sessions()
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect::<HashMap<_, _>>();
        if !sessions.is_empty() {
            tracing::info!("📚 loaded {} class sessions from store", sessions.len());
        }
        Ok(Self {
            sessions,
            db: Some(db),
        })
    }

    /// Insert a new session. The derived id is the de-duplication key: a
    /// collision is reported, never silently overwritten.
    pub fn create(&mut self, session: ClassSession) -> Result<String> {
        if self.sessions.contains_key(&session.id) {
            return Err(StudyHallError::AlreadyExists {
                id: session.id.clone(),
            });
        }
        let id = session.id.clone();
        tracing::info!("📚 class created: '{}' ({id})", session.topic);
        self.sessions.insert(id.clone(), session);
        self.persist(&id);
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Result<ClassSession> {
        self.sessions
            .get(id)
            .cloned()
            .ok_or_else(|| StudyHallError::not_found(id))
    }

    /// Apply a status transition, guarded by the state machine. Returns the
    /// updated record so callers can publish side effects from it.
    pub fn update_status(&mut self, id: &str, next: SessionStatus) -> Result<ClassSession> {
        let session = self.session_mut(id)?;
        if !session.status.can_transition_to(next) {
            let operation = match next {
                SessionStatus::InProgress => "start",
                SessionStatus::Finished => "finish",
                SessionStatus::Canceled => "cancel",
                SessionStatus::Planned => "plan",
            };
            return Err(StudyHallError::precondition(session.status, operation));
        }
        session.status = next;
        let updated = session.clone();
        tracing::info!("📚 class {id} is now {next}");
        self.persist(id);
        Ok(updated)
    }

    /// Idempotent: returns whether the actor was newly added. Only allowed
    /// while the session is active.
    pub fn add_subscriber(&mut self, id: &str, actor: &str) -> Result<bool> {
        let session = self.session_mut(id)?;
        if !session.status.is_active() {
            return Err(StudyHallError::precondition(session.status, "subscribe"));
        }
        if session.subscribers.iter().any(|s| s == actor) {
            return Ok(false);
        }
        session.subscribers.push(actor.to_string());
        tracing::debug!("subscriber {actor} added to class {id}");
        self.persist(id);
        Ok(true)
    }

    /// Idempotent: removing a non-member is a no-op returning `false`.
    pub fn remove_subscriber(&mut self, id: &str, actor: &str) -> Result<bool> {
        let session = self.session_mut(id)?;
        if !session.status.is_active() {
            return Err(StudyHallError::precondition(session.status, "unsubscribe"));
        }
        let before = session.subscribers.len();
        session.subscribers.retain(|s| s != actor);
        let removed = session.subscribers.len() < before;
        if removed {
            tracing::debug!("subscriber {actor} removed from class {id}");
            self.persist(id);
        }
        Ok(removed)
    }

    /// Append-only; duplicates are ignored. Allowed in any non-Canceled
    /// status.
    pub fn append_record_link(&mut self, id: &str, link: &str) -> Result<()> {
        let session = self.session_mut(id)?;
        if session.status == SessionStatus::Canceled {
            return Err(StudyHallError::precondition(
                session.status,
                "add_record_link",
            ));
        }
        if session.record_links.iter().any(|l| l == link) {
            return Ok(());
        }
        session.record_links.push(link.to_string());
        tracing::debug!("record link added to class {id}");
        self.persist(id);
        Ok(())
    }

    /// One-shot reminder flag. Returns `true` only for the call that wins
    /// the flag; callers must send the reminder notification exactly when
    /// this returns `true`.
    pub fn mark_reminded(&mut self, id: &str) -> Result<bool> {
        let session = self.session_mut(id)?;
        if !session.status.is_active() {
            return Err(StudyHallError::precondition(session.status, "remind"));
        }
        if session.reminder_sent {
            return Ok(false);
        }
        session.reminder_sent = true;
        self.persist(id);
        Ok(true)
    }

    /// Store the handles of externally-owned resources created for this
    /// session.
    pub fn set_external_refs(&mut self, id: &str, refs: ExternalRefs) -> Result<()> {
        let session = self.session_mut(id)?;
        session.external_refs = refs;
        self.persist(id);
        Ok(())
    }

    /// Active sessions matching the filter, ordered by `start` ascending.
    pub fn query_active(&self, filter: &ActiveFilter) -> Vec<ClassSession> {
        let mut out: Vec<ClassSession> = self
            .sessions
            .values()
            .filter(|s| s.is_active())
            .filter(|s| filter.status.is_none_or(|st| s.status == st))
            .filter(|s| {
                filter
                    .professor
                    .as_deref()
                    .is_none_or(|p| s.professor == p)
            })
            .filter(|s| filter.cohort.is_none_or(|c| s.cohort == c))
            .filter(|s| {
                filter
                    .window
                    .is_none_or(|(ws, we)| conflict::overlaps(ws, we, s.start, s.end()))
            })
            .cloned()
            .collect();
        out.sort_by_key(|s| s.start);
        out
    }

    /// Planned sessions with `now <= start < now + window`, ordered by
    /// start. Feed for host-side calendar views.
    pub fn query_upcoming(&self, now: DateTime<Utc>, window: Duration) -> Vec<ClassSession> {
        let mut out: Vec<ClassSession> = self
            .sessions
            .values()
            .filter(|s| s.status == SessionStatus::Planned)
            .filter(|s| now <= s.start && s.start < now + window)
            .cloned()
            .collect();
        out.sort_by_key(|s| s.start);
        out
    }

    /// Planned sessions inside their reminder window whose reminder has not
    /// fired yet.
    pub fn due_reminders(&self, now: DateTime<Utc>, lead: Duration) -> Vec<ClassSession> {
        let mut out: Vec<ClassSession> = self
            .sessions
            .values()
            .filter(|s| s.status == SessionStatus::Planned && !s.reminder_sent)
            .filter(|s| s.start - lead <= now && now < s.start)
            .cloned()
            .collect();
        out.sort_by_key(|s| s.start);
        out
    }

    /// Planned sessions whose start time has passed.
    pub fn due_starts(&self, now: DateTime<Utc>) -> Vec<ClassSession> {
        let mut out: Vec<ClassSession> = self
            .sessions
            .values()
            .filter(|s| s.status == SessionStatus::Planned && s.start <= now)
            .cloned()
            .collect();
        out.sort_by_key(|s| s.start);
        out
    }

    /// InProgress sessions whose end time has passed.
    pub fn due_finishes(&self, now: DateTime<Utc>) -> Vec<ClassSession> {
        let mut out: Vec<ClassSession> = self
            .sessions
            .values()
            .filter(|s| s.status == SessionStatus::InProgress && s.end() <= now)
            .cloned()
            .collect();
        out.sort_by_key(|s| s.start);
        out
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn session_mut(&mut self, id: &str) -> Result<&mut ClassSession> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| StudyHallError::not_found(id))
    }

    /// Write-through; persistence failures must not fail the mutation that
    /// already happened in memory.
    fn persist(&self, id: &str) {
        if let (Some(db), Some(session)) = (&self.db, self.sessions.get(id))
            && let Err(e) = db.save_session(session)
        {
            tracing::warn!("⚠️ failed to persist class {id}: {e}");
        }
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}
