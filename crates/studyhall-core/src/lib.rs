//! # StudyHall Core
//!
//! Shared foundation for the StudyHall class-session crates: the workspace
//! error type, configuration, common value types, and the abstract
//! interfaces the host platform implements (notification dispatch, channel
//! resolution, interactive prompting).
//!
//! The core never talks to a chat platform or a rendering layer itself.
//! Everything user-facing goes through the traits in [`traits`].

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::StudyHallConfig;
pub use error::{ConflictDetails, ConflictScope, Result, StudyHallError};
pub use traits::{
    AnnounceEvent, ChannelKey, Destination, NotificationDispatcher, PromptChannel, PromptReply,
    ResourceResolver,
};
pub use types::{AudienceTrack, Cohort, ExternalRef, ExternalRefs, Place, SessionStatus};
