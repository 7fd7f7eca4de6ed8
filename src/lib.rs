//! Funding job notifications library.
//!
//! Normalizes job records from the funding jobs service, matches them against
//! page subscriptions, decides which jobs to display, and delivers updates over
//! WebSocket sessions with push ingress and a polling fallback.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
