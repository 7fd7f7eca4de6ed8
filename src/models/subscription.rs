//! Job subscriptions: what a page wants to hear about and how it wants to hear it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::job::{JobDetails, JobTypeCode};
use crate::error::SubscriptionError;

/// Opaque subscription identity.
pub type SubscriptionId = Uuid;

/// Callback invoked when a channel feeding a subscription fails.
pub type ErrorCallback = Arc<dyn Fn(SubscriptionId, &SubscriptionError) + Send + Sync>;

/// Callback invoked when the push channel a subscription relies on goes away.
pub type DisconnectCallback = Arc<dyn Fn(SubscriptionId) + Send + Sync>;

/// Which jobs a subscriber cares about. Absent or empty fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMonitoringFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Also match jobs whose parent is `job_id`. Absent means yes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_child_jobs: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specification_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_by_entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub job_types: Vec<JobTypeCode>,
}

impl JobMonitoringFilter {
    /// Filter matching every job.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn for_job(job_id: impl Into<String>) -> Self {
        Self {
            job_id: Some(job_id.into()),
            ..Self::default()
        }
    }

    pub fn for_specification(specification_id: impl Into<String>) -> Self {
        Self {
            specification_id: Some(specification_id.into()),
            ..Self::default()
        }
    }

    pub fn with_job_types<I, T>(mut self, job_types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<JobTypeCode>,
    {
        self.job_types = job_types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_trigger_entity(mut self, entity_id: impl Into<String>) -> Self {
        self.trigger_by_entity_id = Some(entity_id.into());
        self
    }

    pub fn with_child_jobs(mut self, include: bool) -> Self {
        self.include_child_jobs = Some(include);
        self
    }

    /// True when no field narrows the match.
    pub fn is_catch_all(&self) -> bool {
        present(&self.job_id).is_none()
            && present(&self.specification_id).is_none()
            && present(&self.trigger_by_entity_id).is_none()
            && self.job_types.is_empty()
    }

    /// Canonical form of the filter: two filters that match the same jobs
    /// normalize to equal values.
    pub fn normalized(&self) -> Self {
        let job_id = present(&self.job_id).map(str::to_string);
        let include_child_jobs = job_id
            .as_ref()
            .map(|_| self.include_child_jobs.unwrap_or(true));

        let mut job_types = self.job_types.clone();
        job_types.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        job_types.dedup();

        Self {
            job_id,
            include_child_jobs,
            specification_id: present(&self.specification_id).map(str::to_string),
            trigger_by_entity_id: present(&self.trigger_by_entity_id).map(str::to_string),
            job_types,
        }
    }
}

/// Treat empty strings the same as missing values.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Real-time delivery for a subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorMode {
    #[default]
    Push,
    None,
}

/// What to do when push delivery is unavailable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorFallback {
    #[default]
    Polling,
    None,
}

/// Request to register a subscription. Unset settings take their defaults.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    #[serde(default)]
    pub filter: JobMonitoringFilter,
    #[serde(default)]
    pub is_enabled: Option<bool>,
    #[serde(default)]
    pub monitor_mode: Option<MonitorMode>,
    #[serde(default)]
    pub monitor_fallback: Option<MonitorFallback>,
    #[serde(default)]
    pub fetch_prior_notifications: bool,
    #[serde(skip)]
    pub on_error: Option<ErrorCallback>,
    #[serde(skip)]
    pub on_disconnect: Option<DisconnectCallback>,
}

impl SubscriptionRequest {
    pub fn new(filter: JobMonitoringFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn enabled(mut self, is_enabled: bool) -> Self {
        self.is_enabled = Some(is_enabled);
        self
    }

    pub fn monitor_mode(mut self, mode: MonitorMode) -> Self {
        self.monitor_mode = Some(mode);
        self
    }

    pub fn monitor_fallback(mut self, fallback: MonitorFallback) -> Self {
        self.monitor_fallback = Some(fallback);
        self
    }

    pub fn fetch_prior_notifications(mut self, fetch: bool) -> Self {
        self.fetch_prior_notifications = fetch;
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(SubscriptionId, &SubscriptionError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }

    pub fn on_disconnect<F>(mut self, callback: F) -> Self
    where
        F: Fn(SubscriptionId) + Send + Sync + 'static,
    {
        self.on_disconnect = Some(Arc::new(callback));
        self
    }

    pub fn resolved_is_enabled(&self) -> bool {
        self.is_enabled.unwrap_or(true)
    }

    pub fn resolved_monitor_mode(&self) -> MonitorMode {
        self.monitor_mode.unwrap_or_default()
    }

    pub fn resolved_monitor_fallback(&self) -> MonitorFallback {
        self.monitor_fallback.unwrap_or_default()
    }
}

impl std::fmt::Debug for SubscriptionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRequest")
            .field("filter", &self.filter)
            .field("is_enabled", &self.is_enabled)
            .field("monitor_mode", &self.monitor_mode)
            .field("monitor_fallback", &self.monitor_fallback)
            .field("fetch_prior_notifications", &self.fetch_prior_notifications)
            .field("on_error", &self.on_error.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .finish()
    }
}

/// A registered interest in jobs.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSubscription {
    pub id: SubscriptionId,
    pub filter: JobMonitoringFilter,
    pub is_enabled: bool,
    pub monitor_mode: MonitorMode,
    pub monitor_fallback: MonitorFallback,
    pub fetch_prior_notifications: bool,
    pub start_date: DateTime<Utc>,
    pub last_update: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub on_error: Option<ErrorCallback>,
    #[serde(skip)]
    pub on_disconnect: Option<DisconnectCallback>,
}

impl JobSubscription {
    /// Create a subscription with a fresh id from a request.
    pub fn from_request(request: SubscriptionRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            is_enabled: request.resolved_is_enabled(),
            monitor_mode: request.resolved_monitor_mode(),
            monitor_fallback: request.resolved_monitor_fallback(),
            fetch_prior_notifications: request.fetch_prior_notifications,
            filter: request.filter,
            start_date: Utc::now(),
            last_update: None,
            on_error: request.on_error,
            on_disconnect: request.on_disconnect,
        }
    }

    /// Same filter, mode, fallback and enabled flag as the request.
    pub fn is_equivalent(&self, request: &SubscriptionRequest) -> bool {
        self.filter.normalized() == request.filter.normalized()
            && self.monitor_mode == request.resolved_monitor_mode()
            && self.monitor_fallback == request.resolved_monitor_fallback()
            && self.is_enabled == request.resolved_is_enabled()
    }

    pub fn uses_push(&self) -> bool {
        self.monitor_mode == MonitorMode::Push
    }

    pub fn uses_polling(&self) -> bool {
        self.monitor_fallback == MonitorFallback::Polling
    }

    pub fn report_error(&self, error: &SubscriptionError) {
        if let Some(callback) = &self.on_error {
            callback(self.id, error);
        }
    }

    pub fn report_disconnect(&self) {
        if let Some(callback) = &self.on_disconnect {
            callback(self.id);
        }
    }
}

impl std::fmt::Debug for JobSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobSubscription")
            .field("id", &self.id)
            .field("filter", &self.filter)
            .field("is_enabled", &self.is_enabled)
            .field("monitor_mode", &self.monitor_mode)
            .field("monitor_fallback", &self.monitor_fallback)
            .field("fetch_prior_notifications", &self.fetch_prior_notifications)
            .field("start_date", &self.start_date)
            .field("last_update", &self.last_update)
            .finish_non_exhaustive()
    }
}

/// A subscription and the most recent job that matched it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobNotification {
    pub subscription: JobSubscription,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_job: Option<JobDetails>,
}

impl JobNotification {
    pub fn new(subscription: JobSubscription) -> Self {
        Self {
            subscription,
            latest_job: None,
        }
    }
}
