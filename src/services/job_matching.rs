//! Matching of jobs against subscription filters.

use crate::models::subscription::present;
use crate::models::{JobDetails, JobMonitoringFilter, JobSubscription};

/// True if the job satisfies every field the filter sets.
pub fn matches(job: &JobDetails, filter: &JobMonitoringFilter) -> bool {
    matches_job_type(job, filter)
        && matches_job_id(job, filter)
        && matches_trigger_entity(job, filter)
        && matches_specification(job, filter)
}

/// Enabled subscriptions whose filter matches the job, in input order.
pub fn find_matching_subscriptions<'a, I>(job: &JobDetails, subscriptions: I) -> Vec<&'a JobSubscription>
where
    I: IntoIterator<Item = &'a JobSubscription>,
{
    subscriptions
        .into_iter()
        .filter(|subscription| subscription.is_enabled && matches(job, &subscription.filter))
        .collect()
}

fn matches_job_type(job: &JobDetails, filter: &JobMonitoringFilter) -> bool {
    filter.job_types.is_empty()
        || job
            .job_type
            .as_ref()
            .is_some_and(|job_type| filter.job_types.contains(job_type))
}

fn matches_job_id(job: &JobDetails, filter: &JobMonitoringFilter) -> bool {
    let Some(job_id) = present(&filter.job_id) else {
        return true;
    };

    job.job_id == job_id
        || (filter.include_child_jobs != Some(false)
            && job.parent_job_id.as_deref() == Some(job_id))
}

fn matches_trigger_entity(job: &JobDetails, filter: &JobMonitoringFilter) -> bool {
    match present(&filter.trigger_by_entity_id) {
        Some(entity_id) => job.trigger_entity_id.as_deref() == Some(entity_id),
        None => true,
    }
}

fn matches_specification(job: &JobDetails, filter: &JobMonitoringFilter) -> bool {
    match present(&filter.specification_id) {
        Some(specification_id) => job.specification_id.as_deref() == Some(specification_id),
        None => true,
    }
}
