//! Business logic services.

pub mod job_descriptions;
pub mod job_details;
pub mod job_display;
pub mod job_feed;
pub mod job_matching;
pub mod job_poller;
pub mod jobs_api;
pub mod notification_session;
pub mod subscription_registry;

pub use job_details::normalize;
pub use job_display::{JobDisplayProps, display_props, jobs_to_display};
pub use job_feed::{JobFeed, PushConnection};
pub use job_poller::{PollEvent, PollScheduler};
pub use jobs_api::{JobStatusSource, JobsApiClient};
pub use notification_session::{NotificationSession, SessionChannels};
pub use subscription_registry::SubscriptionRegistry;
