//! Push feed of raw job records.
//!
//! Uses tokio::sync::broadcast to fan-out records from the jobs service to every
//! notification session, and a watch channel to track whether a push stream from
//! the jobs service is currently attached.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use crate::models::RawJobRecord;

/// Default capacity for the broadcast channel.
pub const DEFAULT_FEED_CAPACITY: usize = 1000;

/// Fan-out of job records pushed by the jobs service.
#[derive(Clone)]
pub struct JobFeed {
    sender: broadcast::Sender<RawJobRecord>,
    push_streams: Arc<watch::Sender<usize>>,
}

impl JobFeed {
    /// Create a new JobFeed with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }

    /// Create a new JobFeed with a specific capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        let (push_streams, _) = watch::channel(0);
        Self {
            sender,
            push_streams: Arc::new(push_streams),
        }
    }

    /// Receive every record published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RawJobRecord> {
        self.sender.subscribe()
    }

    /// Publish a record to all sessions.
    /// Returns the number of receivers; 0 when no session is listening.
    pub fn publish(&self, record: RawJobRecord) -> usize {
        self.sender.send(record).unwrap_or(0)
    }

    /// True while at least one push stream is attached.
    pub fn push_connected(&self) -> bool {
        self.push_streams() > 0
    }

    pub fn push_streams(&self) -> usize {
        *self.push_streams.borrow()
    }

    /// Watch the number of attached push streams.
    pub fn watch_push(&self) -> watch::Receiver<usize> {
        self.push_streams.subscribe()
    }

    /// Mark a push stream as attached until the returned guard is dropped.
    pub fn attach_push(&self) -> PushConnection {
        self.push_streams.send_modify(|count| *count += 1);
        info!(streams = self.push_streams(), "Push stream attached");
        PushConnection {
            push_streams: self.push_streams.clone(),
        }
    }
}

impl Default for JobFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard for an attached push stream.
pub struct PushConnection {
    push_streams: Arc<watch::Sender<usize>>,
}

impl Drop for PushConnection {
    fn drop(&mut self) {
        self.push_streams
            .send_modify(|count| *count = count.saturating_sub(1));
        let remaining = *self.push_streams.borrow();
        if remaining == 0 {
            warn!("Last push stream detached, sessions fall back to polling");
        } else {
            info!(streams = remaining, "Push stream detached");
        }
    }
}
