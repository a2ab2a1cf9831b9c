//! Interactive creation wizard.
//!
//! A strictly sequential, single-actor flow: an ordered list of steps, one
//! suspension point per step, and a typed outcome. Choice steps complete on
//! the first selection (closed input space); free-text steps loop until
//! their validator accepts, discarding each rejected attempt from the
//! transcript. Every step waits at most the configured inactivity window.
//!
//! Whatever path terminates the flow (completion, explicit abort, timeout,
//! unexpected error), teardown runs exactly once: transient prompts are
//! retracted and a single outcome message is left behind.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};

use studyhall_core::config::StudyHallConfig;
use studyhall_core::error::{Result, StudyHallError};
use studyhall_core::traits::{
    NotificationDispatcher, PromptChannel, PromptReply, ResourceResolver,
};
use studyhall_core::types::{AudienceTrack, Cohort, Place};
use studyhall_registry::{ClassParams, ClassSession};

use crate::manager::{self, ClassManager};
use crate::subjects::SubjectCatalog;

/// Terminal outcome of a wizard flow.
#[derive(Debug)]
pub enum WizardOutcome {
    /// The session was created.
    Completed(ClassSession),
    /// The actor used the cancellation affordance.
    Aborted,
    /// A step exceeded its inactivity window.
    TimedOut,
    /// Channel failure, or `create_class` rejected the collected
    /// parameters. Not retried; the actor must re-invoke.
    Failed(StudyHallError),
}

/// One creation flow. Instantiated per invoking actor; flows are fully
/// independent and share only the read-only subject catalog.
pub struct CreationWizard<P: PromptChannel> {
    channel: P,
    catalog: SubjectCatalog,
    config: StudyHallConfig,
    guild: String,
}

impl<P: PromptChannel> CreationWizard<P> {
    pub fn new(
        channel: P,
        catalog: SubjectCatalog,
        config: StudyHallConfig,
        guild: impl Into<String>,
    ) -> Self {
        Self {
            channel,
            catalog,
            config,
            guild: guild.into(),
        }
    }

    /// Run the flow to termination and hand the collected parameters to the
    /// orchestrator.
    pub async fn run<D, R>(mut self, manager: &ClassManager<D, R>) -> WizardOutcome
    where
        D: NotificationDispatcher,
        R: ResourceResolver,
    {
        let outcome = match self.collect().await {
            Ok(params) => match manager.create_class(params).await {
                Ok(session) => WizardOutcome::Completed(session),
                Err(e) => WizardOutcome::Failed(e),
            },
            Err(StudyHallError::Aborted) => WizardOutcome::Aborted,
            Err(StudyHallError::Timeout) => WizardOutcome::TimedOut,
            Err(e) => WizardOutcome::Failed(e),
        };
        self.teardown(&outcome).await;
        outcome
    }

    /// The single teardown routine. `run` is the only caller and calls it
    /// exactly once per flow.
    async fn teardown(&mut self, outcome: &WizardOutcome) {
        self.channel.retract().await;
        let text = match outcome {
            WizardOutcome::Completed(session) => format!(
                "Class '{}' planned for {}.",
                session.topic,
                session.start.to_rfc3339()
            ),
            WizardOutcome::Aborted => "Class creation canceled.".to_string(),
            WizardOutcome::TimedOut => {
                "Class creation stopped after too long without a reply.".to_string()
            }
            WizardOutcome::Failed(e) => format!("Class creation failed: {e}"),
        };
        self.channel.post_outcome(&text).await;
    }

    async fn collect(&mut self) -> Result<ClassParams> {
        let timeout = self.config.step_timeout();

        // 1. Cohort.
        let cohort_options: Vec<String> = Cohort::ALL.iter().map(|c| c.to_string()).collect();
        let cohort = Cohort::ALL[self
            .choose("Which cohort is this class for?", &cohort_options, timeout)
            .await?];

        // 2. Subject, from the cohort's slice of the catalog.
        let subjects = self.catalog.for_cohort(cohort);
        if subjects.is_empty() {
            return Err(StudyHallError::validation(format!(
                "no subjects configured for cohort {cohort}"
            )));
        }
        let subject_names: Vec<String> = subjects.iter().map(|s| s.name.clone()).collect();
        let subject =
            subjects[self.choose("Which subject?", &subject_names, timeout).await?].clone();

        // 3. Topic.
        let topic = self
            .collect_text("What is the topic of this class?", timeout, |input| {
                let trimmed = input.trim();
                if trimmed.is_empty() {
                    return Err(StudyHallError::validation("the topic cannot be empty"));
                }
                if trimmed.len() > 200 {
                    return Err(StudyHallError::validation("the topic is too long"));
                }
                Ok(trimmed.to_string())
            })
            .await?;

        // 4. Start time.
        let config = self.config.clone();
        let start = self
            .collect_text(
                "When does the class start? (e.g. 2026-09-01 18:00, UTC)",
                timeout,
                |input| {
                    let start = parse_start(input)?;
                    manager::validate_start(&config, start)?;
                    Ok(start)
                },
            )
            .await?;

        // 5. Duration.
        let duration = self
            .collect_text("How long will it last? (e.g. 1h30, 90m)", timeout, |input| {
                let duration = parse_duration(input)?;
                manager::validate_duration(&config, duration)?;
                Ok(duration)
            })
            .await?;

        // 6. Professor.
        let professor = self
            .collect_text("Who leads the class? (actor id)", timeout, |input| {
                let trimmed = input.trim();
                if trimmed.is_empty() {
                    return Err(StudyHallError::validation("the professor id cannot be empty"));
                }
                Ok(trimmed.to_string())
            })
            .await?;

        // 7. Audience track, only for L3.
        let audience = if cohort == Cohort::L3 {
            let options: Vec<String> =
                AudienceTrack::ALL.iter().map(|t| t.to_string()).collect();
            Some(
                AudienceTrack::ALL[self
                    .choose("Which L3 track is this class for?", &options, timeout)
                    .await?],
            )
        } else {
            None
        };

        // 8. Place; "other" asks for a free-text description.
        let place_options: Vec<String> = Place::ALL.iter().map(|p| p.to_string()).collect();
        let place = Place::ALL[self
            .choose("Where does the class take place?", &place_options, timeout)
            .await?];
        let place_info = if place == Place::Other {
            Some(
                self.collect_text("Describe the place.", timeout, |input| {
                    let trimmed = input.trim();
                    if trimmed.is_empty() {
                        return Err(StudyHallError::validation("the description cannot be empty"));
                    }
                    Ok(trimmed.to_string())
                })
                .await?,
            )
        } else {
            None
        };

        // 9. Recorded?
        let yes_no = vec!["yes".to_string(), "no".to_string()];
        let is_recorded = self
            .choose("Will the class be recorded?", &yes_no, timeout)
            .await?
            == 0;

        Ok(ClassParams {
            guild: self.guild.clone(),
            subject_code: subject.code,
            subject_name: subject.name,
            topic,
            cohort,
            audience,
            professor,
            start,
            duration,
            place,
            place_info,
            is_recorded,
        })
    }

    /// Choice step: the input space is closed, so the first reply decides.
    /// An out-of-range index is a channel contract violation, not a retry.
    async fn choose(
        &mut self,
        prompt: &str,
        options: &[String],
        timeout: StdDuration,
    ) -> Result<usize> {
        match self.channel.choice(prompt, options, timeout).await? {
            PromptReply::Choice(index) if index < options.len() => Ok(index),
            PromptReply::Choice(index) => Err(StudyHallError::channel(format!(
                "choice index {index} out of range"
            ))),
            PromptReply::Abort => Err(StudyHallError::Aborted),
            PromptReply::Text(_) => {
                Err(StudyHallError::channel("expected a selection, got text"))
            }
        }
    }

    /// Free-text step: re-prompts with an invalid-input indicator until the
    /// validator accepts. Each rejected attempt is discarded so the visible
    /// transcript stays clean.
    async fn collect_text<T>(
        &mut self,
        prompt: &str,
        timeout: StdDuration,
        mut validate: impl FnMut(&str) -> Result<T>,
    ) -> Result<T> {
        let mut retry = false;
        loop {
            match self.channel.text(prompt, retry, timeout).await? {
                PromptReply::Abort => return Err(StudyHallError::Aborted),
                PromptReply::Text(input) => match validate(&input) {
                    Ok(value) => return Ok(value),
                    Err(e) => {
                        tracing::debug!("rejected wizard input: {e}");
                        self.channel.discard_attempt().await;
                        retry = true;
                    }
                },
                PromptReply::Choice(_) => {
                    return Err(StudyHallError::channel("expected text, got a selection"));
                }
            }
        }
    }
}

/// Parse "2026-09-01 18:00" (taken as UTC) or a full RFC 3339 timestamp.
pub fn parse_start(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M") {
        return Ok(naive.and_utc());
    }
    Err(StudyHallError::validation(
        "unrecognized date; use '2026-09-01 18:00' or an RFC 3339 timestamp",
    ))
}

/// Parse "1h30", "2h", "90m" into a duration.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim().to_lowercase();
    let bad = || StudyHallError::validation("unrecognized duration; use '1h30', '2h' or '90m'");

    if let Some((hours_part, rest)) = s.split_once('h') {
        let hours: i64 = hours_part.trim().parse().map_err(|_| bad())?;
        let rest = rest.trim().trim_end_matches('m');
        let minutes: i64 = if rest.is_empty() {
            0
        } else {
            rest.trim().parse().map_err(|_| bad())?
        };
        if hours < 0 || !(0..60).contains(&minutes) {
            return Err(bad());
        }
        return Ok(Duration::hours(hours) + Duration::minutes(minutes));
    }
    if let Some(minutes_part) = s.strip_suffix('m') {
        let minutes: i64 = minutes_part.trim().parse().map_err(|_| bad())?;
        if minutes < 0 {
            return Err(bad());
        }
        return Ok(Duration::minutes(minutes));
    }
    Err(bad())
}
