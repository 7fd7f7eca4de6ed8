//! Job notifications E2E test suite.
//!
//! Runs the jobs API client and poll fallback against an in-process mock jobs
//! API, and drives the push ingress endpoints through the actix test service.
//!
//! Run with: cargo test --test jobs_e2e

mod mock_jobs_api;
mod test_helpers;

mod test_job_events;
mod test_jobs_api_client;
mod test_session_polling;
