//! Normalization of raw job records into [`JobDetails`].
//!
//! Every job record that reaches a subscription goes through [`normalize`], whether
//! it arrived over the push feed, a poll, or a prior-notification fetch.

use tracing::trace;

use crate::error::NormalizationError;
use crate::models::{
    CompletionStatus, JobDetails, JobFailure, JobOutcome, JobTypeCode, RawJobRecord,
    RunningStatus,
};
use crate::services::job_descriptions;

/// Derived status text and flags.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StatusFlags {
    description: String,
    is_active: bool,
    is_complete: bool,
    is_failed: bool,
    is_successful: bool,
}

impl StatusFlags {
    fn active(description: &str) -> Self {
        Self {
            description: description.to_string(),
            is_active: true,
            is_complete: false,
            is_failed: false,
            is_successful: false,
        }
    }

    fn complete(description: &str, is_failed: bool, is_successful: bool) -> Self {
        Self {
            description: description.to_string(),
            is_active: false,
            is_complete: true,
            is_failed,
            is_successful,
        }
    }
}

/// Build canonical job details from a raw record.
///
/// Fails only when the record has no usable job id.
pub fn normalize(raw: &RawJobRecord) -> Result<JobDetails, NormalizationError> {
    let job_id = raw
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(NormalizationError::MissingJobId)?
        .to_string();

    let failures = extract_failures(&raw.outcomes);
    let status = classify_status(
        raw.running_status.as_ref(),
        raw.completion_status.as_ref(),
        failures.len(),
    );
    let outcome = summarize_outcome(&failures, raw.outcome.as_deref());

    let trigger = raw.trigger.as_ref();
    let trigger_message = trigger.and_then(|t| t.message.clone());
    let job_description = build_job_description(raw.job_type.as_ref(), trigger_message.as_deref());

    trace!(
        job_id = %job_id,
        status = %status.description,
        description = %job_description,
        "Normalized job record"
    );

    Ok(JobDetails {
        job_id,
        job_type: raw.job_type.clone(),
        running_status: raw.running_status.clone(),
        completion_status: raw.completion_status.clone(),
        parent_job_id: raw.parent_job_id.clone(),
        specification_id: raw.specification_id.clone(),
        trigger_entity_id: trigger.and_then(|t| t.entity_id.clone()),
        trigger_message,
        invoker_user_id: raw.invoker_user_id.clone(),
        invoker_user_display_name: raw.invoker_user_display_name.clone(),
        created: raw.created,
        last_updated: raw.last_updated,
        is_active: status.is_active,
        is_complete: status.is_complete,
        is_failed: status.is_failed,
        is_successful: status.is_successful,
        status_description: status.description,
        job_description,
        outcome,
        failures,
    })
}

fn classify_status(
    running: Option<&RunningStatus>,
    completion: Option<&CompletionStatus>,
    failure_count: usize,
) -> StatusFlags {
    match running {
        Some(RunningStatus::Queued | RunningStatus::QueuedWithService) => {
            StatusFlags::active("in queue")
        }
        Some(RunningStatus::InProgress) => StatusFlags::active("in progress"),
        _ => classify_completion(completion, failure_count),
    }
}

fn classify_completion(completion: Option<&CompletionStatus>, failure_count: usize) -> StatusFlags {
    match completion {
        Some(CompletionStatus::Succeeded) if failure_count == 0 => {
            StatusFlags::complete("completed successfully", false, true)
        }
        // Partial success: neither failed nor successful.
        Some(CompletionStatus::Succeeded) => {
            StatusFlags::complete("completed with error(s)", false, false)
        }
        Some(CompletionStatus::Cancelled) => StatusFlags::complete("cancelled", true, false),
        Some(CompletionStatus::Failed) => StatusFlags::complete("failed", true, false),
        Some(CompletionStatus::TimedOut) => StatusFlags::complete("timed out", true, false),
        Some(CompletionStatus::Unrecognized(raw)) if !raw.trim().is_empty() => {
            StatusFlags::complete(raw.trim(), true, false)
        }
        _ => StatusFlags::complete("status unknown", true, false),
    }
}

fn extract_failures(outcomes: &[JobOutcome]) -> Vec<JobFailure> {
    outcomes
        .iter()
        .filter(|outcome| !outcome.is_successful)
        .map(|outcome| JobFailure {
            description: outcome.description.clone().unwrap_or_default(),
            outcome_type: outcome.outcome_type.clone(),
        })
        .collect()
}

fn summarize_outcome(failures: &[JobFailure], raw_outcome: Option<&str>) -> String {
    let summary = match failures.len() {
        0 => return raw_outcome.unwrap_or_default().to_string(),
        1 => "One of the job steps failed",
        _ => "Some of the job steps failed",
    };

    if failures.iter().any(JobFailure::is_validation_error) {
        format!("{} due to validation", summary)
    } else {
        summary.to_string()
    }
}

/// Combine the job type phrase with the trigger message, without saying the same thing twice.
pub fn build_job_description(job_type: Option<&JobTypeCode>, trigger_message: Option<&str>) -> String {
    let phrase = job_type
        .map(|code| job_descriptions::describe(code).into_owned())
        .unwrap_or_default();
    let message = trigger_message
        .map(normalize_trigger_message)
        .unwrap_or_default();

    match (phrase.is_empty(), message.is_empty()) {
        (true, true) => String::new(),
        (false, true) => phrase,
        (true, false) => message,
        (false, false) if is_same_description(&phrase, &message) => message,
        (false, false) => format!("{}: {}", phrase, message),
    }
}

/// Collapse whitespace and drop trailing punctuation from a server-supplied message.
fn normalize_trigger_message(message: &str) -> String {
    let collapsed = message.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches(['.', ':', ';', ','])
        .trim_end()
        .to_string()
}

/// Case-insensitive equality or containment in either direction.
///
/// Heuristic: unrelated phrases that happen to overlap are treated as the same.
fn is_same_description(phrase: &str, message: &str) -> bool {
    let phrase = phrase.to_lowercase();
    let message = message.to_lowercase();
    phrase == message || phrase.contains(&message) || message.contains(&phrase)
}
