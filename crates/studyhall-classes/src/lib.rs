//! # StudyHall Classes
//!
//! The lifecycle orchestrator and the interactive creation wizard.
//!
//! ## Architecture
//! ```text
//! CreationWizard (one per invoking actor, independent flows)
//!   ├── cohort / subject / topic / start / duration / ... steps
//!   ├── free-text steps loop until valid, discarding rejected attempts
//!   └── on completion → ClassManager::create_class
//!
//! ClassManager (façade over the registry)
//!   ├── create: validate → conflict check → derive id → persist
//!   ├── start / finish / cancel: status-guarded transitions
//!   ├── subscribe / unsubscribe / remind / record links
//!   └── side effects → NotificationDispatcher (non-fatal on failure)
//! ```

pub mod manager;
pub mod subjects;
pub mod wizard;

pub use manager::ClassManager;
pub use subjects::{Subject, SubjectCatalog};
pub use wizard::{CreationWizard, WizardOutcome};
