//! WebSocket messages exchanged with notification clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::job::JobDetails;
use super::subscription::{JobNotification, JobSubscription, SubscriptionId, SubscriptionRequest};
use crate::services::job_display::JobDisplayProps;

/// Message sent by a client over the notifications socket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "payload")]
#[serde(rename_all = "snake_case")]
pub enum ClientMessage {
    /// Register interest in jobs.
    Subscribe(SubscribePayload),
    /// Drop one subscription.
    Unsubscribe(UnsubscribePayload),
    /// Drop every subscription of this connection.
    UnsubscribeAll,
    /// Ask for the current notifications.
    GetNotifications,
}

/// Payload for subscribe messages.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribePayload {
    /// Echoed back in the `subscribed` reply so clients can pair requests.
    #[serde(default)]
    pub correlation_id: Option<String>,
    #[serde(flatten)]
    pub request: SubscriptionRequest,
}

/// Payload for unsubscribe messages.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribePayload {
    pub subscription_id: SubscriptionId,
}

/// Message sent to a client over the notifications socket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
#[serde(rename_all = "snake_case")]
pub enum ServerMessage {
    /// A subscribe request was accepted.
    Subscribed(SubscribedPayload),
    /// Subscriptions were removed.
    Unsubscribed(UnsubscribedPayload),
    /// Current notifications after a change.
    Notifications(NotificationsPayload),
    /// A channel feeding a subscription failed.
    JobError(JobErrorPayload),
    /// The push channel a subscription relies on went away.
    PushDisconnected(PushDisconnectedPayload),
    /// The client sent something that could not be handled.
    Error(ErrorPayload),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribedPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub subscription: JobSubscription,
    /// False when an equivalent subscription was reused.
    pub is_new: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribedPayload {
    pub subscription_ids: Vec<SubscriptionId>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsPayload {
    pub notifications: Vec<JobNotification>,
    /// Most recently updated job across all notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_job: Option<JobDetails>,
    /// Banners for the jobs that should be shown.
    pub display: Vec<JobDisplayProps>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobErrorPayload {
    pub subscription_id: SubscriptionId,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushDisconnectedPayload {
    pub subscription_id: SubscriptionId,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub message: String,
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error(ErrorPayload {
            message: message.into(),
        })
    }
}

/// Wrapper that includes timestamp with every message.
#[derive(Debug, Clone, Serialize)]
pub struct ServerEnvelope {
    #[serde(flatten)]
    pub message: ServerMessage,
    pub timestamp: DateTime<Utc>,
}

impl ServerEnvelope {
    /// Wrap a message with the current timestamp.
    pub fn new(message: ServerMessage) -> Self {
        Self {
            message,
            timestamp: Utc::now(),
        }
    }
}
