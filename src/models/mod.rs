//! Domain models for job notifications.

pub mod job;
pub mod subscription;
pub mod ws_event;

// Re-export commonly used types
pub use job::{
    CompletionStatus, JobDetails, JobFailure, JobOutcome, JobTrigger, JobType, JobTypeCode,
    RawJobRecord, RunningStatus, VALIDATION_ERROR_OUTCOME,
};
pub use subscription::{
    DisconnectCallback, ErrorCallback, JobMonitoringFilter, JobNotification, JobSubscription,
    MonitorFallback, MonitorMode, SubscriptionId, SubscriptionRequest,
};
pub use ws_event::{ClientMessage, ServerEnvelope, ServerMessage};
