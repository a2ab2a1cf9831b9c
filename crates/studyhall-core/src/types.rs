//! Common value types shared across the StudyHall crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Audience group a class session targets (academic year).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cohort {
    L1,
    L2,
    L3,
}

impl Cohort {
    pub const ALL: [Cohort; 3] = [Cohort::L1, Cohort::L2, Cohort::L3];

    pub fn as_str(self) -> &'static str {
        match self {
            Cohort::L1 => "l1",
            Cohort::L2 => "l2",
            Cohort::L3 => "l3",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "l1" => Some(Cohort::L1),
            "l2" => Some(Cohort::L2),
            "l3" => Some(Cohort::L3),
            _ => None,
        }
    }
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audience sub-track, only meaningful for the L3 cohort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudienceTrack {
    All,
    Abroad,
    CampusHalfYear,
    CampusFullYear,
}

impl AudienceTrack {
    pub const ALL: [AudienceTrack; 4] = [
        AudienceTrack::All,
        AudienceTrack::Abroad,
        AudienceTrack::CampusHalfYear,
        AudienceTrack::CampusFullYear,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AudienceTrack::All => "all",
            AudienceTrack::Abroad => "abroad",
            AudienceTrack::CampusHalfYear => "campus_half_year",
            AudienceTrack::CampusFullYear => "campus_full_year",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "all" => Some(AudienceTrack::All),
            "abroad" => Some(AudienceTrack::Abroad),
            "campus_half_year" => Some(AudienceTrack::CampusHalfYear),
            "campus_full_year" => Some(AudienceTrack::CampusFullYear),
            _ => None,
        }
    }
}

impl fmt::Display for AudienceTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a class session takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Place {
    /// Voice/video on the community platform itself.
    OnPlatform,
    /// Physical room on campus.
    OnSite,
    /// External meeting link (Zoom, Meet, ...).
    RemoteMeeting,
    Other,
}

impl Place {
    pub const ALL: [Place; 4] = [
        Place::OnPlatform,
        Place::OnSite,
        Place::RemoteMeeting,
        Place::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Place::OnPlatform => "on_platform",
            Place::OnSite => "on_site",
            Place::RemoteMeeting => "remote_meeting",
            Place::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "on_platform" => Some(Place::OnPlatform),
            "on_site" => Some(Place::OnSite),
            "remote_meeting" => Some(Place::RemoteMeeting),
            "other" => Some(Place::Other),
            _ => None,
        }
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a class session.
///
/// Transitions are one-directional: Planned -> InProgress -> Finished, and
/// Planned -> Canceled. Finished and Canceled are terminal; records in a
/// terminal state are kept for history and never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Planned,
    InProgress,
    Finished,
    Canceled,
}

impl SessionStatus {
    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (SessionStatus::Planned, SessionStatus::InProgress)
                | (SessionStatus::InProgress, SessionStatus::Finished)
                | (SessionStatus::Planned, SessionStatus::Canceled)
        )
    }

    /// Planned or InProgress. Only active sessions participate in conflict
    /// checking and subscriber changes.
    pub fn is_active(self) -> bool {
        matches!(self, SessionStatus::Planned | SessionStatus::InProgress)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Planned => "planned",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Finished => "finished",
            SessionStatus::Canceled => "canceled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "planned" => Some(SessionStatus::Planned),
            "in_progress" => Some(SessionStatus::InProgress),
            "finished" => Some(SessionStatus::Finished),
            "canceled" => Some(SessionStatus::Canceled),
            _ => None,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque handle to a resource owned by the external notification
/// collaborator (announcement message, ephemeral role). The core stores
/// these and passes them back, never interpreting their content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRef(pub String);

impl ExternalRef {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }
}

impl fmt::Display for ExternalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// External resources created on a session's behalf. Lifetime is tied to
/// the session record itself; there is no process-wide cache of pending
/// resource ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalRefs {
    /// Announcement message in the cohort's announcement channel.
    pub announcement: Option<ExternalRef>,
    /// Mentionable role created for the class audience.
    pub role: Option<ExternalRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_matrix() {
        use SessionStatus::*;
        let all = [Planned, InProgress, Finished, Canceled];
        for from in all {
            for to in all {
                let legal = matches!(
                    (from, to),
                    (Planned, InProgress) | (InProgress, Finished) | (Planned, Canceled)
                );
                assert_eq!(
                    from.can_transition_to(to),
                    legal,
                    "transition {from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_active_statuses() {
        assert!(SessionStatus::Planned.is_active());
        assert!(SessionStatus::InProgress.is_active());
        assert!(!SessionStatus::Finished.is_active());
        assert!(!SessionStatus::Canceled.is_active());
    }

    #[test]
    fn test_status_str_round_trip() {
        for status in [
            SessionStatus::Planned,
            SessionStatus::InProgress,
            SessionStatus::Finished,
            SessionStatus::Canceled,
        ] {
            assert_eq!(SessionStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(SessionStatus::from_str("bogus"), None);
    }

    #[test]
    fn test_cohort_serde_lowercase() {
        let json = serde_json::to_string(&Cohort::L2).unwrap();
        assert_eq!(json, "\"l2\"");
    }
}
