//! Read-only subject catalog, reference data for the creation wizard.

use serde::{Deserialize, Serialize};
use studyhall_core::types::Cohort;

/// A teachable subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Short class code (e.g. "MATH101").
    pub code: String,
    pub name: String,
    pub cohort: Cohort,
}

impl Subject {
    pub fn new(code: impl Into<String>, name: impl Into<String>, cohort: Cohort) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            cohort,
        }
    }
}

/// The subject catalog. Immutable during a wizard flow; concurrent flows
/// share it read-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectCatalog {
    subjects: Vec<Subject>,
}

impl SubjectCatalog {
    pub fn new(subjects: Vec<Subject>) -> Self {
        Self { subjects }
    }

    /// Subjects taught to one cohort, in catalog order.
    pub fn for_cohort(&self, cohort: Cohort) -> Vec<Subject> {
        self.subjects
            .iter()
            .filter(|s| s.cohort == cohort)
            .cloned()
            .collect()
    }

    pub fn find(&self, code: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.code == code)
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_cohort_filters() {
        let catalog = SubjectCatalog::new(vec![
            Subject::new("MATH101", "Mathematics", Cohort::L1),
            Subject::new("ALGO201", "Algorithms", Cohort::L2),
            Subject::new("NET201", "Networks", Cohort::L2),
        ]);
        assert_eq!(catalog.for_cohort(Cohort::L2).len(), 2);
        assert_eq!(catalog.for_cohort(Cohort::L3).len(), 0);
        assert_eq!(catalog.find("MATH101").unwrap().name, "Mathematics");
    }
}
