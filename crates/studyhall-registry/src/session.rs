//! Class session model - the central entity of the registry.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use studyhall_core::types::{AudienceTrack, Cohort, ExternalRefs, Place, SessionStatus};

/// Parameters collected by the creation wizard (or supplied by an
/// equivalent programmatic call) for a new class session.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassParams {
    /// Community scope the session belongs to.
    pub guild: String,
    pub subject_code: String,
    pub subject_name: String,
    pub topic: String,
    pub cohort: Cohort,
    /// L3 sub-track; `None` for other cohorts.
    pub audience: Option<AudienceTrack>,
    /// Actor id of the leading professor.
    pub professor: String,
    pub start: DateTime<Utc>,
    pub duration: Duration,
    pub place: Place,
    pub place_info: Option<String>,
    pub is_recorded: bool,
}

/// A scheduled class session.
///
/// `end` is never stored: it is always recomputed as `start + duration`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSession {
    /// Deterministically derived from (topic, professor, start); immutable.
    pub id: String,
    pub guild: String,
    pub subject_code: String,
    pub subject_name: String,
    pub topic: String,
    pub cohort: Cohort,
    pub audience: Option<AudienceTrack>,
    pub professor: String,
    pub start: DateTime<Utc>,
    /// Positive span, whole seconds.
    pub duration_secs: i64,
    pub place: Place,
    pub place_info: Option<String>,
    pub is_recorded: bool,
    /// Ordered, deduplicated; empty until a recording is published.
    pub record_links: Vec<String>,
    pub status: SessionStatus,
    /// Unique actor ids; meaningful only while the session is active.
    pub subscribers: Vec<String>,
    /// Set exactly once when the pre-start reminder fires.
    pub reminder_sent: bool,
    pub external_refs: ExternalRefs,
    pub created_at: DateTime<Utc>,
}

impl ClassSession {
    /// Build a Planned session from creation parameters. The id is computed
    /// here, once, and never changes afterwards.
    pub fn from_params(params: ClassParams) -> Self {
        let id = derive_class_id(&params.topic, &params.professor, params.start);
        Self {
            id,
            guild: params.guild,
            subject_code: params.subject_code,
            subject_name: params.subject_name,
            topic: params.topic,
            cohort: params.cohort,
            audience: params.audience,
            professor: params.professor,
            start: params.start,
            duration_secs: params.duration.num_seconds(),
            place: params.place,
            place_info: params.place_info,
            is_recorded: params.is_recorded,
            record_links: Vec::new(),
            status: SessionStatus::Planned,
            subscribers: Vec::new(),
            reminder_sent: false,
            external_refs: ExternalRefs::default(),
            created_at: Utc::now(),
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(self.duration_secs)
    }

    /// Always `start + duration`.
    pub fn end(&self) -> DateTime<Utc> {
        self.start + self.duration()
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Deterministic session id: lowercase hex of the first 8 bytes of
/// `sha256(topic \n professor \n start-epoch-seconds)`.
///
/// The key deliberately ignores duration and cohort: two candidates equal on
/// (topic, professor, start) are the same logical session and the second is
/// rejected as already existing.
pub fn derive_class_id(topic: &str, professor: &str, start: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(topic.as_bytes());
    hasher.update(b"\n");
    hasher.update(professor.as_bytes());
    hasher.update(b"\n");
    hasher.update(start.timestamp().to_be_bytes());
    let digest = hasher.finalize();
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn params(topic: &str, professor: &str, start: DateTime<Utc>) -> ClassParams {
        ClassParams {
            guild: "guild-1".into(),
            subject_code: "MATH101".into(),
            subject_name: "Mathematics".into(),
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

    #[test]
    fn test_id_is_deterministic() {
        let start = Utc::now();
        let a = derive_class_id("Graphs", "prof-1", start);
        let b = derive_class_id("Graphs", "prof-1", start);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_id_varies_with_inputs() {
        let start = Utc::now();
        let base = derive_class_id("Graphs", "prof-1", start);
        assert_ne!(base, derive_class_id("Trees", "prof-1", start));
        assert_ne!(base, derive_class_id("Graphs", "prof-2", start));
        assert_ne!(
            base,
            derive_class_id("Graphs", "prof-1", start + Duration::minutes(1))
        );
    }

    #[test]
    fn test_id_ignores_duration_and_cohort() {
        let start = Utc::now();
        let mut a = params("Graphs", "prof-1", start);
        let mut b = params("Graphs", "prof-1", start);
        a.duration = Duration::hours(1);
        b.duration = Duration::hours(2);
        b.cohort = Cohort::L3;
        assert_eq!(
            ClassSession::from_params(a).id,
            ClassSession::from_params(b).id
        );
    }

    #[test]
    fn test_end_is_derived() {
        let start = Utc::now();
        let session = ClassSession::from_params(params("Graphs", "prof-1", start));
        assert_eq!(session.end(), start + Duration::hours(1));
        assert_eq!(session.status, SessionStatus::Planned);
        assert!(session.record_links.is_empty());
        assert!(!session.reminder_sent);
    }
}
