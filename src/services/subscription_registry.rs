//! Registry of live job subscriptions and their latest notifications.
//!
//! A registry belongs to one consumer (one notification session). It is plain data:
//! every operation runs to completion synchronously, and transports feed it through
//! [`SubscriptionRegistry::on_incoming_job`].

use std::collections::HashSet;

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{NormalizationError, SubscriptionError};
use crate::models::{
    JobDetails, JobNotification, JobSubscription, RawJobRecord, SubscriptionId,
    SubscriptionRequest,
};
use crate::services::job_details::normalize;
use crate::services::job_matching::find_matching_subscriptions;

/// Result of [`SubscriptionRegistry::add_subscription`].
#[derive(Debug, Clone)]
pub struct AddedSubscription {
    pub subscription: JobSubscription,
    /// False when an equivalent subscription already existed and was returned instead.
    pub is_new: bool,
}

/// Active subscriptions, one notification per subscription, in registration order.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    notifications: Vec<JobNotification>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscription, reusing an equivalent one if present.
    pub fn add_subscription(&mut self, request: SubscriptionRequest) -> AddedSubscription {
        if let Some(existing) = self
            .notifications
            .iter()
            .find(|n| n.subscription.is_equivalent(&request))
        {
            debug!(
                subscription_id = %existing.subscription.id,
                "Reusing equivalent job subscription"
            );
            return AddedSubscription {
                subscription: existing.subscription.clone(),
                is_new: false,
            };
        }

        let subscription = JobSubscription::from_request(request);
        info!(
            subscription_id = %subscription.id,
            filter = ?subscription.filter,
            monitor_mode = ?subscription.monitor_mode,
            monitor_fallback = ?subscription.monitor_fallback,
            "Job subscription added"
        );
        self.notifications
            .push(JobNotification::new(subscription.clone()));

        AddedSubscription {
            subscription,
            is_new: true,
        }
    }

    /// Remove a subscription. Removing an unknown id is not an error.
    pub fn remove_subscription(&mut self, id: SubscriptionId) -> Option<JobSubscription> {
        let index = self
            .notifications
            .iter()
            .position(|n| n.subscription.id == id)?;
        let removed = self.notifications.remove(index).subscription;
        info!(subscription_id = %id, "Job subscription removed");
        Some(removed)
    }

    /// Remove every subscription, returning what was removed.
    pub fn remove_all_subscriptions(&mut self) -> Vec<JobSubscription> {
        let removed: Vec<_> = self
            .notifications
            .drain(..)
            .map(|n| n.subscription)
            .collect();
        if !removed.is_empty() {
            info!(count = removed.len(), "All job subscriptions removed");
        }
        removed
    }

    pub fn get_notifications(&self) -> &[JobNotification] {
        &self.notifications
    }

    pub fn subscription(&self, id: SubscriptionId) -> Option<&JobSubscription> {
        self.subscriptions().find(|s| s.id == id)
    }

    pub fn subscriptions(&self) -> impl Iterator<Item = &JobSubscription> {
        self.notifications.iter().map(|n| &n.subscription)
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    /// Normalize a raw record and record it against every matching subscription.
    ///
    /// Returns the ids of subscriptions whose latest job changed.
    pub fn on_incoming_job(
        &mut self,
        raw: &RawJobRecord,
    ) -> Result<Vec<SubscriptionId>, NormalizationError> {
        let job = normalize(raw)?;
        Ok(self.on_incoming_job_details(job))
    }

    /// Record an already-normalized job against every matching subscription.
    ///
    /// A stored job is only replaced by one whose `last_updated` is not older.
    /// Receiving the stored job again is not an update.
    pub fn on_incoming_job_details(&mut self, job: JobDetails) -> Vec<SubscriptionId> {
        let matching: HashSet<SubscriptionId> = find_matching_subscriptions(&job, self.subscriptions())
            .into_iter()
            .map(|s| s.id)
            .collect();
        if matching.is_empty() {
            return Vec::new();
        }

        let now = Utc::now();
        let mut updated = Vec::with_capacity(matching.len());
        for notification in &mut self.notifications {
            if !matching.contains(&notification.subscription.id) {
                continue;
            }

            if let Some(current) = &notification.latest_job {
                if job.is_older_than(current) {
                    debug!(
                        subscription_id = %notification.subscription.id,
                        job_id = %job.job_id,
                        "Discarding stale job update"
                    );
                    continue;
                }
                if *current == job {
                    continue;
                }
            }

            notification.latest_job = Some(job.clone());
            notification.subscription.last_update = Some(now);
            updated.push(notification.subscription.id);
        }

        debug!(
            job_id = %job.job_id,
            status = %job.status_description,
            updated = updated.len(),
            "Dispatched job to subscriptions"
        );
        updated
    }

    /// Report an error to every enabled subscription.
    pub fn report_error(&self, error: &SubscriptionError) {
        for subscription in self.subscriptions().filter(|s| s.is_enabled) {
            subscription.report_error(error);
        }
    }

    /// Report an error to one subscription. Unknown ids are ignored.
    pub fn report_error_for(&self, id: SubscriptionId, error: &SubscriptionError) {
        if let Some(subscription) = self.subscription(id) {
            subscription.report_error(error);
        }
    }

    /// Tell push-monitored subscriptions that the push channel went away.
    pub fn report_disconnect(&self) -> Vec<SubscriptionId> {
        self.subscriptions()
            .filter(|s| s.is_enabled && s.uses_push())
            .map(|s| {
                s.report_disconnect();
                s.id
            })
            .collect()
    }
}

/// The most recently updated job across all notifications.
///
/// Jobs without `last_updated` sort as the earliest possible time.
pub fn get_latest_across_notifications(notifications: &[JobNotification]) -> Option<&JobDetails> {
    notifications
        .iter()
        .filter_map(|n| n.latest_job.as_ref())
        .reduce(|latest, job| if latest.is_older_than(job) { job } else { latest })
}

/// Drop later entries that repeat an earlier job id, keeping order.
pub fn remove_duplicate_jobs_by_id<I>(jobs: I) -> Vec<JobDetails>
where
    I: IntoIterator<Item = JobDetails>,
{
    let mut seen = HashSet::new();
    jobs.into_iter()
        .filter(|job| seen.insert(job.job_id.clone()))
        .collect()
}

/// True for ids longer than one character.
///
/// Single-character ids come from falsy values coerced to strings upstream.
pub fn is_job_id_valid(id: Option<&str>) -> bool {
    id.is_some_and(|id| id.chars().count() > 1)
}
