//! Abstract interfaces to the host platform.
//!
//! The core consumes these; implementations (chat client, embed rendering,
//! role management) live in the host application. Failures surfaced here are
//! reported but non-fatal to the core state transition they accompany.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Cohort, ExternalRef};

/// Kind of external resource an announce call creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceEvent {
    /// Announcement message in a cohort's announcement channel.
    ClassAnnouncement,
    /// Ephemeral mentionable role for the class audience.
    ClassRole,
    /// Notice posted in the subject's classroom channel (start, reminder).
    ClassroomNotice,
}

impl AnnounceEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            AnnounceEvent::ClassAnnouncement => "class_announcement",
            AnnounceEvent::ClassRole => "class_role",
            AnnounceEvent::ClassroomNotice => "classroom_notice",
        }
    }
}

/// Logical destination key, resolved per guild. Absence of a mapping is a
/// configuration error on the host side, not a core bug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelKey {
    /// Announcement channel for a cohort.
    Announcement(Cohort),
    /// Classroom channel of a subject, by subject code.
    Classroom(String),
}

/// Concrete destination handle (channel id, address, ...). Opaque to the
/// core; only the dispatcher interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination(pub String);

impl Destination {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }
}

/// Notification dispatcher: announcement embeds, lifecycle updates, role
/// management, private messages. Rendering is entirely dispatcher-side; the
/// core hands over structured payloads.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Create an external resource and return its opaque handle.
    async fn announce(&self, event: AnnounceEvent, payload: serde_json::Value)
    -> Result<ExternalRef>;

    /// Mutate a previously created resource.
    async fn update(&self, resource: &ExternalRef, payload: serde_json::Value) -> Result<()>;

    /// Delete a previously created resource.
    async fn teardown(&self, resource: &ExternalRef) -> Result<()>;

    /// Send a private notification to a single actor.
    async fn notify_actor(&self, actor: &str, text: &str) -> Result<()>;
}

/// Maps a (guild, logical key) pair to a concrete destination.
#[async_trait]
pub trait ResourceResolver: Send + Sync {
    async fn resolve(&self, guild: &str, key: &ChannelKey) -> Option<Destination>;
}

/// Reply produced by one prompt step.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptReply {
    /// Index into the offered option set.
    Choice(usize),
    /// Raw free-text input.
    Text(String),
    /// The actor used the always-available cancellation affordance.
    Abort,
}

/// Interactive prompt channel used by the creation wizard. One instance per
/// flow; the wizard owns it exclusively for the flow's lifetime.
///
/// Implementations must honor `timeout` as a bounded inactivity wait and
/// return [`StudyHallError::Timeout`](crate::error::StudyHallError::Timeout)
/// on expiry.
#[async_trait]
pub trait PromptChannel: Send {
    /// Present a closed option set; resolves on the first valid selection.
    async fn choice(
        &mut self,
        prompt: &str,
        options: &[String],
        timeout: Duration,
    ) -> Result<PromptReply>;

    /// Prompt for free text. `retry` marks the re-prompt after a rejected
    /// attempt so the presentation can carry an "invalid input" indicator.
    async fn text(&mut self, prompt: &str, retry: bool, timeout: Duration) -> Result<PromptReply>;

    /// Drop the echo of the last rejected input from the transcript.
    async fn discard_attempt(&mut self);

    /// Retract every transient prompt affordance (teardown, step 1 of 2).
    async fn retract(&mut self);

    /// Leave the single persisted outcome message (teardown, step 2 of 2).
    async fn post_outcome(&mut self, text: &str);
}
