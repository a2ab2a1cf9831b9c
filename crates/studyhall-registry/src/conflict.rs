//! Conflict checking - a pure predicate over the registry's active records.
//!
//! Two sessions conflict iff their `[start, end)` windows overlap and they
//! share a scheduling scope (professor or cohort). Back-to-back sessions
//! (`end == other_start`) do not conflict.

use chrono::{DateTime, Utc};
use studyhall_core::error::{ConflictDetails, ConflictScope, Result, StudyHallError};
use studyhall_core::types::Cohort;

use crate::session::ClassSession;

/// Candidate slot being checked at creation time.
#[derive(Debug, Clone)]
pub struct CandidateSlot<'a> {
    pub professor: &'a str,
    pub cohort: Cohort,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Half-open interval overlap.
pub fn overlaps(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    other_start: DateTime<Utc>,
    other_end: DateTime<Utc>,
) -> bool {
    start < other_end && other_start < end
}

/// Check a candidate against the currently active sessions.
///
/// Professor and cohort scopes are checked independently; when both are
/// violated the professor conflict takes precedence in the reported error.
/// The error carries the conflicting session's window for diagnostics.
pub fn check(candidate: &CandidateSlot<'_>, active: &[ClassSession]) -> Result<()> {
    for scope in [ConflictScope::Professor, ConflictScope::Cohort] {
        for other in active {
            if !other.status.is_active() {
                continue;
            }
            let same_scope = match scope {
                ConflictScope::Professor => other.professor == candidate.professor,
                ConflictScope::Cohort => other.cohort == candidate.cohort,
            };
            if same_scope && overlaps(candidate.start, candidate.end, other.start, other.end()) {
                return Err(StudyHallError::Conflict {
                    scope,
                    with: ConflictDetails {
                        id: other.id.clone(),
                        topic: other.topic.clone(),
                        start: other.start,
                        end: other.end(),
                    },
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::params;
    use crate::session::ClassSession;
    use chrono::Duration;
    use studyhall_core::types::SessionStatus;

    fn slot<'a>(
        professor: &'a str,
        cohort: Cohort,
        start: DateTime<Utc>,
        hours: i64,
    ) -> CandidateSlot<'a> {
        CandidateSlot {
            professor,
            cohort,
            start,
            end: start + Duration::hours(hours),
        }
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let t = Utc::now();
        let cases = [
            (t, t + Duration::hours(1), t + Duration::minutes(30)),
            (t, t + Duration::hours(2), t + Duration::hours(1)),
        ];
        for (a_start, a_end, b_start) in cases {
            let b_end = b_start + Duration::hours(1);
            assert_eq!(
                overlaps(a_start, a_end, b_start, b_end),
                overlaps(b_start, b_end, a_start, a_end)
            );
        }
    }

    #[test]
    fn test_back_to_back_does_not_conflict() {
        let t = Utc::now();
        assert!(!overlaps(
            t,
            t + Duration::hours(1),
            t + Duration::hours(1),
            t + Duration::hours(2)
        ));
    }

    #[test]
    fn test_professor_conflict_detected() {
        let t = Utc::now();
        let existing = ClassSession::from_params(params("Graphs", "prof-1", t));
        let err = check(&slot("prof-1", Cohort::L1, t + Duration::minutes(30), 1), &[existing])
            .unwrap_err();
        match err {
            StudyHallError::Conflict { scope, with } => {
                assert_eq!(scope, ConflictScope::Professor);
                assert_eq!(with.topic, "Graphs");
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_cohort_conflict_detected() {
        let t = Utc::now();
        // params() builds an L2 session led by prof-1.
        let existing = ClassSession::from_params(params("Graphs", "prof-1", t));
        let err =
            check(&slot("prof-2", Cohort::L2, t, 1), &[existing]).unwrap_err();
        assert!(matches!(
            err,
            StudyHallError::Conflict {
                scope: ConflictScope::Cohort,
                ..
            }
        ));
    }

    #[test]
    fn test_professor_scope_takes_precedence() {
        let t = Utc::now();
        let existing = ClassSession::from_params(params("Graphs", "prof-1", t));
        // Same professor AND same cohort: the professor scope is reported.
        let err = check(&slot("prof-1", Cohort::L2, t, 1), &[existing]).unwrap_err();
        assert!(matches!(
            err,
            StudyHallError::Conflict {
                scope: ConflictScope::Professor,
                ..
            }
        ));
    }

    #[test]
    fn test_disjoint_and_adjacent_pass() {
        let t = Utc::now();
        let existing = ClassSession::from_params(params("Graphs", "prof-1", t));
        // Adjacent: starts exactly when the existing one ends.
        assert!(check(&slot("prof-1", Cohort::L2, t + Duration::hours(1), 1), &[existing.clone()]).is_ok());
        // Fully disjoint.
        assert!(check(&slot("prof-1", Cohort::L2, t + Duration::hours(2), 1), &[existing]).is_ok());
    }

    #[test]
    fn test_terminal_sessions_are_ignored() {
        let t = Utc::now();
        let mut existing = ClassSession::from_params(params("Graphs", "prof-1", t));
        existing.status = SessionStatus::Canceled;
        assert!(check(&slot("prof-1", Cohort::L2, t, 1), &[existing]).is_ok());
    }
}
