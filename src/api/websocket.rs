//! WebSocket handler for job notifications.
//!
//! Each connection gets its own [`NotificationSession`]. The connection task
//! multiplexes client messages, pushed records, poll results, callback messages
//! and push connection changes into that session, and forwards whatever it
//! produces back to the client. Closing the socket removes all of the
//! connection's subscriptions.

use std::time::{Duration, Instant};

use actix_web::{HttpRequest, HttpResponse, web};
use actix_ws::Message;
use futures_util::StreamExt;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{ClientMessage, ServerEnvelope, ServerMessage};
use crate::services::{JobFeed, JobStatusSource, NotificationSession, SessionChannels};

/// Ping interval for keeping connections alive.
pub(crate) const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Timeout for receiving pong response.
pub(crate) const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Upgrades the HTTP connection and starts a notification session.
pub async fn websocket_handler(
    req: HttpRequest,
    stream: web::Payload,
    feed: web::Data<JobFeed>,
    source: web::Data<dyn JobStatusSource>,
    config: web::Data<Config>,
) -> Result<HttpResponse, actix_web::Error> {
    let client_addr = req
        .connection_info()
        .realip_remote_addr()
        .map(String::from)
        .unwrap_or_else(|| "unknown".to_string());

    let (response, ws_session, msg_stream) = actix_ws::handle(&req, stream)?;

    info!(client = %client_addr, "Notification session opened");

    // Subscribe before returning so no record pushed after the upgrade is missed.
    let feed = feed.get_ref().clone();
    let feed_rx = feed.subscribe();
    let (session, channels) =
        NotificationSession::new(source.into_inner(), feed.clone(), config.poll_interval);

    actix_web::rt::spawn(
        SessionConnection {
            ws_session,
            client_addr,
        }
        .run(msg_stream, session, channels, feed, feed_rx),
    );

    Ok(response)
}

struct SessionConnection {
    ws_session: actix_ws::Session,
    client_addr: String,
}

impl SessionConnection {
    async fn run(
        mut self,
        mut msg_stream: actix_ws::MessageStream,
        mut session: NotificationSession,
        mut channels: SessionChannels,
        feed: JobFeed,
        mut feed_rx: tokio::sync::broadcast::Receiver<crate::models::RawJobRecord>,
    ) {
        let mut push_rx = feed.watch_push();
        let mut push_connected = feed.push_connected();

        let mut last_pong = Instant::now();
        let mut ping_interval = tokio::time::interval(PING_INTERVAL);

        loop {
            tokio::select! {
                // Messages from the client
                msg = msg_stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let replies = match serde_json::from_str::<ClientMessage>(&text) {
                                Ok(message) => {
                                    debug!(client = %self.client_addr, message = ?message, "Client message");
                                    session.handle_client_message(message)
                                }
                                Err(e) => {
                                    warn!(client = %self.client_addr, error = %e, "Unreadable client message");
                                    vec![ServerMessage::error(format!("invalid message: {}", e))]
                                }
                            };
                            if !self.send_all(replies).await {
                                break;
                            }
                        }
                        Some(Ok(Message::Ping(bytes))) => {
                            if self.ws_session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Pong(_))) => {
                            last_pong = Instant::now();
                        }
                        Some(Ok(Message::Close(reason))) => {
                            info!(client = %self.client_addr, reason = ?reason, "Client requested close");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!(client = %self.client_addr, error = %e, "WebSocket message error");
                            break;
                        }
                        None => break,
                    }
                }

                // Records pushed by the jobs service
                record = feed_rx.recv() => {
                    match record {
                        Ok(record) => {
                            if let Some(message) = session.handle_job(&record)
                                && !self.send(message).await
                            {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(count)) => {
                            let refetching = session.handle_missed_jobs(count);
                            debug!(client = %self.client_addr, refetching = refetching.len(), "Refetching after missed pushed jobs");
                        }
                        Err(RecvError::Closed) => {
                            info!(client = %self.client_addr, "Job feed closed");
                            break;
                        }
                    }
                }

                // Poll results and prior notifications
                Some(event) = channels.poll_events.recv() => {
                    if let Some(message) = session.handle_poll_event(event)
                        && !self.send(message).await
                    {
                        break;
                    }
                }

                // Messages raised by subscription callbacks
                Some(message) = channels.outbox.recv() => {
                    if !self.send(message).await {
                        break;
                    }
                }

                // Push stream attached or detached
                Ok(()) = push_rx.changed() => {
                    let connected = *push_rx.borrow_and_update() > 0;
                    if connected != push_connected {
                        push_connected = connected;
                        session.handle_push_state(connected);
                    }
                }

                _ = ping_interval.tick() => {
                    if last_pong.elapsed() > PING_INTERVAL + PONG_TIMEOUT {
                        warn!(client = %self.client_addr, "Pong timeout, closing connection");
                        break;
                    }
                    if self.ws_session.ping(b"").await.is_err() {
                        warn!(client = %self.client_addr, "Failed to send ping, closing connection");
                        break;
                    }
                }
            }
        }

        session.close();
        let _ = self.ws_session.close(None).await;
        info!(client = %self.client_addr, "Notification session closed");
    }

    /// Send one message. Returns false once the client is gone.
    async fn send(&mut self, message: ServerMessage) -> bool {
        match serde_json::to_string(&ServerEnvelope::new(message)) {
            Ok(json) => {
                if self.ws_session.text(json).await.is_err() {
                    warn!(client = %self.client_addr, "Failed to send message, closing connection");
                    return false;
                }
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to serialize message");
                true
            }
        }
    }

    async fn send_all(&mut self, messages: Vec<ServerMessage>) -> bool {
        for message in messages {
            if !self.send(message).await {
                return false;
            }
        }
        true
    }
}

/// Configure WebSocket routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws").route(web::get().to(websocket_handler)));
}
