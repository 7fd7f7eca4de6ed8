//! Which jobs a page should show, and the banner text for each.

use serde::Serialize;

use crate::models::{JobDetails, JobFailure, JobNotification};
use crate::services::subscription_registry::remove_duplicate_jobs_by_id;

/// Jobs to render from a set of notifications.
///
/// Active jobs win outright. With nothing active, every failed (or partially
/// failed) job is shown along with the single most recent successful one.
pub fn jobs_to_display(notifications: &[JobNotification]) -> Vec<JobDetails> {
    let jobs = remove_duplicate_jobs_by_id(
        notifications
            .iter()
            .filter_map(|n| n.latest_job.clone()),
    );

    let active: Vec<JobDetails> = jobs.iter().filter(|j| j.is_active).cloned().collect();
    if !active.is_empty() {
        return active;
    }

    let latest_successful = jobs
        .iter()
        .filter(|j| j.is_successful)
        .reduce(|latest, job| if latest.is_older_than(job) { job } else { latest })
        .cloned();

    let mut shown: Vec<JobDetails> = jobs
        .iter()
        .filter(|j| j.is_complete && !j.is_successful)
        .cloned()
        .collect();
    shown.extend(latest_successful);
    shown
}

/// Banner content for one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDisplayProps {
    pub job_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoked_by: Option<String>,
    pub is_active: bool,
    pub is_failed: bool,
    pub is_successful: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<JobFailure>,
}

impl JobDisplayProps {
    pub fn from_job(job: &JobDetails) -> Self {
        let title = if job.job_description.is_empty() {
            format!("Job {}", job.status_description)
        } else {
            format!("Job {}: {}", job.status_description, job.job_description)
        };

        Self {
            job_id: job.job_id.clone(),
            title,
            subtitle: Some(job.outcome.clone()).filter(|o| !o.is_empty()),
            invoked_by: job
                .invoker_user_display_name
                .clone()
                .filter(|name| !name.trim().is_empty()),
            is_active: job.is_active,
            is_failed: job.is_failed,
            is_successful: job.is_successful,
            failures: job.failures.clone(),
        }
    }
}

/// Banner content for every job that should be shown.
pub fn display_props(notifications: &[JobNotification]) -> Vec<JobDisplayProps> {
    jobs_to_display(notifications)
        .iter()
        .map(JobDisplayProps::from_job)
        .collect()
}
