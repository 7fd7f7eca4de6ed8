//! One client's view of the job notification system.
//!
//! A session owns a [`SubscriptionRegistry`] and the poll tasks for its
//! subscriptions. The WebSocket handler drives it with client messages, pushed
//! records, poll events and push connection changes, and forwards the resulting
//! [`ServerMessage`]s to the client. Messages raised from subscription callbacks
//! go through the outbox returned by [`NotificationSession::new`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{SubscriptionError, TransportError};
use crate::models::ws_event::{
    JobErrorPayload, NotificationsPayload, PushDisconnectedPayload, SubscribePayload,
    SubscribedPayload, UnsubscribedPayload,
};
use crate::models::{
    ClientMessage, JobSubscription, RawJobRecord, ServerMessage, SubscriptionId,
    SubscriptionRequest,
};
use crate::models::subscription::present;
use crate::services::job_display::display_props;
use crate::services::job_feed::JobFeed;
use crate::services::job_poller::{PollEvent, PollScheduler};
use crate::services::jobs_api::JobStatusSource;
use crate::services::subscription_registry::{
    SubscriptionRegistry, get_latest_across_notifications, is_job_id_valid,
};

/// Receivers the owner of a session must drain.
pub struct SessionChannels {
    /// Records and failures from poll tasks, for [`NotificationSession::handle_poll_event`].
    pub poll_events: mpsc::UnboundedReceiver<PollEvent>,
    /// Messages raised by subscription callbacks, ready to send to the client.
    pub outbox: mpsc::UnboundedReceiver<ServerMessage>,
}

pub struct NotificationSession {
    registry: SubscriptionRegistry,
    poller: PollScheduler,
    outbox: mpsc::UnboundedSender<ServerMessage>,
}

impl NotificationSession {
    pub fn new(
        source: Arc<dyn JobStatusSource>,
        feed: JobFeed,
        poll_interval: Duration,
    ) -> (Self, SessionChannels) {
        let (poll_tx, poll_rx) = mpsc::unbounded_channel();
        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();

        let session = Self {
            registry: SubscriptionRegistry::new(),
            poller: PollScheduler::new(source, feed, poll_interval, poll_tx),
            outbox: outbox_tx,
        };
        let channels = SessionChannels {
            poll_events: poll_rx,
            outbox: outbox_rx,
        };
        (session, channels)
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Handle one message from the client and return the replies.
    pub fn handle_client_message(&mut self, message: ClientMessage) -> Vec<ServerMessage> {
        match message {
            ClientMessage::Subscribe(payload) => vec![self.subscribe(payload)],
            ClientMessage::Unsubscribe(payload) => {
                let removed = self.unsubscribe(payload.subscription_id);
                vec![
                    ServerMessage::Unsubscribed(UnsubscribedPayload {
                        subscription_ids: removed.into_iter().collect(),
                    }),
                    self.notifications_message(),
                ]
            }
            ClientMessage::UnsubscribeAll => {
                let removed = self.unsubscribe_all();
                vec![
                    ServerMessage::Unsubscribed(UnsubscribedPayload {
                        subscription_ids: removed.iter().map(|s| s.id).collect(),
                    }),
                    self.notifications_message(),
                ]
            }
            ClientMessage::GetNotifications => vec![self.notifications_message()],
        }
    }

    fn subscribe(&mut self, payload: SubscribePayload) -> ServerMessage {
        let SubscribePayload {
            correlation_id,
            request,
        } = payload;

        if let Some(job_id) = present(&request.filter.job_id)
            && !is_job_id_valid(Some(job_id))
        {
            warn!(job_id = %job_id, "Rejected subscription with invalid job id");
            return ServerMessage::error(format!("invalid job id: {:?}", job_id));
        }

        let added = self.registry.add_subscription(self.with_callbacks(request));
        if added.is_new {
            self.poller.start(&added.subscription);
            if added.subscription.fetch_prior_notifications {
                self.poller.fetch_prior(&added.subscription);
            }
        }

        ServerMessage::Subscribed(SubscribedPayload {
            correlation_id,
            subscription: added.subscription,
            is_new: added.is_new,
        })
    }

    /// Route subscription callbacks to the client.
    fn with_callbacks(&self, request: SubscriptionRequest) -> SubscriptionRequest {
        let error_outbox = self.outbox.clone();
        let disconnect_outbox = self.outbox.clone();

        request
            .on_error(move |subscription_id, error: &SubscriptionError| {
                let _ = error_outbox.send(ServerMessage::JobError(JobErrorPayload {
                    subscription_id,
                    message: error.to_string(),
                }));
            })
            .on_disconnect(move |subscription_id| {
                let _ = disconnect_outbox.send(ServerMessage::PushDisconnected(
                    PushDisconnectedPayload { subscription_id },
                ));
            })
    }

    /// Remove a subscription and stop its polling. Returns the id if it existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> Option<SubscriptionId> {
        self.poller.stop(id);
        self.registry.remove_subscription(id).map(|s| s.id)
    }

    /// Remove every subscription and stop all polling.
    pub fn unsubscribe_all(&mut self) -> Vec<JobSubscription> {
        self.poller.stop_all();
        self.registry.remove_all_subscriptions()
    }

    /// Handle a record pushed by the jobs service.
    ///
    /// Returns fresh notifications when any subscription changed. A record that
    /// cannot be normalized is reported to every enabled subscription.
    pub fn handle_job(&mut self, record: &RawJobRecord) -> Option<ServerMessage> {
        self.ingest(record, None)
    }

    /// Handle a record or failure produced by polling.
    pub fn handle_poll_event(&mut self, event: PollEvent) -> Option<ServerMessage> {
        match event {
            PollEvent::Job {
                subscription_id,
                record,
            } => self.ingest(&record, Some(subscription_id)),
            PollEvent::Failed {
                subscription_id,
                error,
            } => {
                self.registry.report_error_for(subscription_id, &error.into());
                None
            }
        }
    }

    /// Feed a record into the registry. Normalization failures go to `source`
    /// when the record came from one subscription's poll, else to everyone.
    fn ingest(
        &mut self,
        record: &RawJobRecord,
        source: Option<SubscriptionId>,
    ) -> Option<ServerMessage> {
        match self.registry.on_incoming_job(record) {
            Ok(updated) if updated.is_empty() => None,
            Ok(updated) => {
                debug!(updated = updated.len(), "Job updated subscriptions");
                Some(self.notifications_message())
            }
            Err(error) => {
                warn!(error = %error, "Discarding job record");
                let error = SubscriptionError::from(error);
                match source {
                    Some(id) => self.registry.report_error_for(id, &error),
                    None => self.registry.report_error(&error),
                }
                None
            }
        }
    }

    /// Handle pushed records that were dropped before this session read them.
    ///
    /// Every enabled subscription is told, and polling subscriptions refetch
    /// their current state. Returns the subscriptions that refetch.
    pub fn handle_missed_jobs(&mut self, missed: u64) -> Vec<SubscriptionId> {
        warn!(missed, "Session missed pushed job records");
        let error = SubscriptionError::from(TransportError::Missed(missed));
        self.registry.report_error(&error);

        let refetch: Vec<JobSubscription> = self
            .registry
            .subscriptions()
            .filter(|s| s.is_enabled && s.uses_polling())
            .cloned()
            .collect();
        for subscription in &refetch {
            self.poller.fetch_prior(subscription);
        }
        refetch.into_iter().map(|s| s.id).collect()
    }

    /// React to the push channel attaching or going away.
    ///
    /// Returns the subscriptions told about a disconnect.
    pub fn handle_push_state(&mut self, connected: bool) -> Vec<SubscriptionId> {
        if connected {
            debug!("Push channel available");
            return Vec::new();
        }
        let notified = self.registry.report_disconnect();
        if !notified.is_empty() {
            info!(count = notified.len(), "Push channel lost, subscriptions notified");
        }
        notified
    }

    /// Current notifications with the latest job and display banners.
    pub fn notifications_message(&self) -> ServerMessage {
        let notifications = self.registry.get_notifications();
        ServerMessage::Notifications(NotificationsPayload {
            notifications: notifications.to_vec(),
            latest_job: get_latest_across_notifications(notifications).cloned(),
            display: display_props(notifications),
        })
    }

    /// Tear down the session when the client goes away.
    pub fn close(&mut self) {
        let removed = self.unsubscribe_all();
        debug!(removed = removed.len(), "Notification session closed");
    }
}

impl Drop for NotificationSession {
    fn drop(&mut self) {
        if !self.registry.is_empty() {
            self.close();
        }
    }
}
