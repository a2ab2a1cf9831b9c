//! # StudyHall Scheduler
//!
//! The background sweep engine: a fixed-interval loop that fires
//! time-based reminder/start/finish transitions through the lifecycle
//! orchestrator.
//!
//! ## Architecture
//! ```text
//! spawn_sweeper (tokio interval, missed ticks skipped)
//!   └── tick
//!        ├── due reminders  → ClassManager::remind_class
//!        ├── due starts     → ClassManager::start_class
//!        └── due finishes   → ClassManager::finish_class
//! ```
//!
//! Each call is idempotent against its own precondition (the registry's
//! status guard), so a tick racing a manual operator action degrades to a
//! logged no-op, never a double transition.

pub mod engine;

pub use engine::{SweepEngine, SweepStats, spawn_sweeper};
