//! Poll fallback for job subscriptions.
//!
//! Each subscription with a polling fallback gets a tokio task that periodically
//! queries the jobs API and forwards what it finds into the owning session's sink.
//! Polling is skipped on ticks where the subscription is served by an attached
//! push stream.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::models::{JobMonitoringFilter, JobSubscription, RawJobRecord, SubscriptionId};
use crate::services::job_feed::JobFeed;
use crate::services::jobs_api::{JobStatusSource, query_for_filter, query_prior_for_filter};

/// Something a poll or prior-notification fetch produced.
#[derive(Debug, Clone)]
pub enum PollEvent {
    Job {
        subscription_id: SubscriptionId,
        record: RawJobRecord,
    },
    Failed {
        subscription_id: SubscriptionId,
        error: TransportError,
    },
}

/// Per-subscription poll tasks for one session.
pub struct PollScheduler {
    source: Arc<dyn JobStatusSource>,
    feed: JobFeed,
    poll_interval: Duration,
    sink: mpsc::UnboundedSender<PollEvent>,
    polls: HashMap<SubscriptionId, JoinHandle<()>>,
    fetches: HashMap<SubscriptionId, JoinHandle<()>>,
}

impl PollScheduler {
    pub fn new(
        source: Arc<dyn JobStatusSource>,
        feed: JobFeed,
        poll_interval: Duration,
        sink: mpsc::UnboundedSender<PollEvent>,
    ) -> Self {
        Self {
            source,
            feed,
            poll_interval,
            sink,
            polls: HashMap::new(),
            fetches: HashMap::new(),
        }
    }

    /// Start polling for a subscription if its fallback is polling.
    ///
    /// Returns false when nothing was started.
    pub fn start(&mut self, subscription: &JobSubscription) -> bool {
        if !subscription.is_enabled || !subscription.uses_polling() {
            return false;
        }
        if self.polls.contains_key(&subscription.id) {
            return false;
        }

        let task = PollTask {
            subscription_id: subscription.id,
            filter: subscription.filter.clone(),
            uses_push: subscription.uses_push(),
            source: self.source.clone(),
            feed: self.feed.clone(),
            sink: self.sink.clone(),
        };
        let poll_interval = self.poll_interval;
        let handle = tokio::spawn(async move {
            task.run(poll_interval).await;
        });

        debug!(
            subscription_id = %subscription.id,
            interval_ms = %poll_interval.as_millis(),
            "Poll fallback started"
        );
        self.polls.insert(subscription.id, handle);
        true
    }

    /// Fetch jobs that already match the subscription, once.
    pub fn fetch_prior(&mut self, subscription: &JobSubscription) {
        let source = self.source.clone();
        let sink = self.sink.clone();
        let subscription_id = subscription.id;
        let filter = subscription.filter.clone();

        let handle = tokio::spawn(async move {
            match query_prior_for_filter(source.as_ref(), &filter).await {
                Ok(records) => {
                    debug!(
                        subscription_id = %subscription_id,
                        count = records.len(),
                        "Fetched prior job notifications"
                    );
                    for record in records {
                        let event = PollEvent::Job {
                            subscription_id,
                            record,
                        };
                        if sink.send(event).is_err() {
                            return;
                        }
                    }
                }
                Err(error) => {
                    warn!(subscription_id = %subscription_id, error = %error, "Prior job fetch failed");
                    let _ = sink.send(PollEvent::Failed {
                        subscription_id,
                        error,
                    });
                }
            }
        });

        if let Some(previous) = self.fetches.insert(subscription_id, handle) {
            previous.abort();
        }
    }

    /// Stop polling and fetching for a subscription.
    pub fn stop(&mut self, id: SubscriptionId) -> bool {
        let mut stopped = false;
        if let Some(handle) = self.polls.remove(&id) {
            handle.abort();
            stopped = true;
        }
        if let Some(handle) = self.fetches.remove(&id) {
            handle.abort();
        }
        if stopped {
            debug!(subscription_id = %id, "Poll fallback stopped");
        }
        stopped
    }

    /// Stop every task.
    pub fn stop_all(&mut self) {
        let count = self.polls.len();
        for (_, handle) in self.polls.drain().chain(self.fetches.drain()) {
            handle.abort();
        }
        if count > 0 {
            info!(count, "All poll fallbacks stopped");
        }
    }

    pub fn is_polling(&self, id: SubscriptionId) -> bool {
        self.polls.contains_key(&id)
    }

    pub fn active_polls(&self) -> usize {
        self.polls.len()
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}

/// State moved into one poll task.
struct PollTask {
    subscription_id: SubscriptionId,
    filter: JobMonitoringFilter,
    uses_push: bool,
    source: Arc<dyn JobStatusSource>,
    feed: JobFeed,
    sink: mpsc::UnboundedSender<PollEvent>,
}

impl PollTask {
    async fn run(self, poll_interval: Duration) {
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; prior fetches cover the initial state.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            if self.uses_push && self.feed.push_connected() {
                continue;
            }

            match query_for_filter(self.source.as_ref(), &self.filter).await {
                Ok(records) => {
                    for record in records {
                        let event = PollEvent::Job {
                            subscription_id: self.subscription_id,
                            record,
                        };
                        if self.sink.send(event).is_err() {
                            return;
                        }
                    }
                }
                Err(error) => {
                    warn!(
                        subscription_id = %self.subscription_id,
                        error = %error,
                        "Job poll failed"
                    );
                    let event = PollEvent::Failed {
                        subscription_id: self.subscription_id,
                        error,
                    };
                    if self.sink.send(event).is_err() {
                        return;
                    }
                }
            }
        }
    }
}
