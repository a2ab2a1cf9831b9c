//! # StudyHall Registry
//!
//! Persistent store of class-session records: the central data model, the
//! status state machine enforcement point, range/status queries, the pure
//! conflict checker, and SQLite persistence.
//!
//! ## Architecture
//! ```text
//! ClassRegistry (in-memory, authoritative)
//!   ├── create / get / update_status (status-guarded)
//!   ├── subscribers, record links, reminder flag (idempotent mutations)
//!   ├── query_active / query_upcoming / due_* sweeps
//!   └── write-through → RegistryDb (SQLite, survives restarts)
//!
//! conflict::check (pure, half-open interval overlap)
//! ```

pub mod conflict;
pub mod persistence;
pub mod session;
pub mod store;

pub use conflict::CandidateSlot;
pub use persistence::RegistryDb;
pub use session::{ClassParams, ClassSession, derive_class_id};
pub use store::{ActiveFilter, ClassRegistry};
