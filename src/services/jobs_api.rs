//! Client for the backend jobs API.
//!
//! Used for the poll fallback and for fetching notifications that predate a
//! subscription. The client sits behind [`JobStatusSource`] so polling can run
//! against any source of job records.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::error::TransportError;
use crate::models::subscription::present;
use crate::models::{JobMonitoringFilter, JobTypeCode, RawJobRecord};
use crate::services::subscription_registry::is_job_id_valid;

/// Header carrying the jobs API subscription key.
pub const API_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Connection timeout for jobs API requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of job records for a specification or job id.
#[async_trait]
pub trait JobStatusSource: Send + Sync {
    /// A single job by id. `None` if the jobs service does not know it.
    async fn get_job(&self, job_id: &str) -> Result<Option<RawJobRecord>, TransportError>;

    /// Latest job of each requested type for a specification.
    /// An empty type list asks for the latest job of any type.
    async fn get_latest_jobs(
        &self,
        specification_id: &str,
        job_types: &[JobTypeCode],
    ) -> Result<Vec<RawJobRecord>, TransportError>;

    /// Latest successful job of a type for a specification.
    async fn get_latest_successful_job(
        &self,
        specification_id: &str,
        job_type: &JobTypeCode,
    ) -> Result<Option<RawJobRecord>, TransportError>;
}

/// Fetch the records relevant to a filter.
///
/// Filters with a valid job id query that job; filters with a specification query
/// the latest jobs for it. Anything else has no queryable scope and yields nothing.
pub async fn query_for_filter(
    source: &dyn JobStatusSource,
    filter: &JobMonitoringFilter,
) -> Result<Vec<RawJobRecord>, TransportError> {
    if let Some(job_id) = present(&filter.job_id) {
        if is_job_id_valid(Some(job_id)) {
            return Ok(source.get_job(job_id).await?.into_iter().collect());
        }
        debug!(job_id = %job_id, "Skipping lookup of invalid job id");
    }

    if let Some(specification_id) = present(&filter.specification_id) {
        return source
            .get_latest_jobs(specification_id, &filter.job_types)
            .await;
    }

    debug!(filter = ?filter, "Filter has no queryable scope, nothing to fetch");
    Ok(Vec::new())
}

/// Fetch the records a new subscription starts from.
///
/// Same as [`query_for_filter`], except that a specification filter narrowed to
/// a single job type also gets the latest successful job of that type, ahead of
/// the latest jobs.
pub async fn query_prior_for_filter(
    source: &dyn JobStatusSource,
    filter: &JobMonitoringFilter,
) -> Result<Vec<RawJobRecord>, TransportError> {
    let latest = query_for_filter(source, filter).await?;

    let single_type = match filter.job_types.as_slice() {
        [job_type] => Some(job_type),
        _ => None,
    };
    let (Some(specification_id), Some(job_type)) = (present(&filter.specification_id), single_type)
    else {
        return Ok(latest);
    };
    if present(&filter.job_id).is_some_and(|id| is_job_id_valid(Some(id))) {
        return Ok(latest);
    }

    let mut records = Vec::with_capacity(latest.len() + 1);
    if let Some(success) = source
        .get_latest_successful_job(specification_id, job_type)
        .await?
        && !latest.iter().any(|r| r.id.is_some() && r.id == success.id)
    {
        records.push(success);
    }
    records.extend(latest);
    Ok(records)
}

/// HTTP client for the jobs API.
#[derive(Clone)]
pub struct JobsApiClient {
    base_url: String,
    api_key: Option<SecretString>,
    http_client: reqwest::Client,
}

impl JobsApiClient {
    /// Create a client for the jobs API at `base_url`.
    pub fn new(
        base_url: &str,
        api_key: Option<SecretString>,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()?;

        let base_url = base_url.trim_end_matches('/').to_string();
        info!(
            "Jobs API client initialized (base_url={}, api_key={})",
            base_url,
            if api_key.is_some() { "set" } else { "none" }
        );

        Ok(Self {
            base_url,
            api_key,
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> String {
        let path = segments
            .iter()
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/api/jobs/{}", self.base_url, path)
    }

    /// GET a JSON body. 404 and 204 map to `None`.
    async fn get_optional<T>(&self, url: &str) -> Result<Option<T>, TransportError>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut request = self.http_client.get(url);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(url = %url, status = %status.as_u16(), "Jobs API response");

        if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait]
impl JobStatusSource for JobsApiClient {
    async fn get_job(&self, job_id: &str) -> Result<Option<RawJobRecord>, TransportError> {
        self.get_optional(&self.url(&[job_id])).await
    }

    async fn get_latest_jobs(
        &self,
        specification_id: &str,
        job_types: &[JobTypeCode],
    ) -> Result<Vec<RawJobRecord>, TransportError> {
        let mut url = self.url(&["latest", specification_id]);
        if !job_types.is_empty() {
            let joined = job_types
                .iter()
                .map(|job_type| urlencoding::encode(job_type.as_str()).into_owned())
                .collect::<Vec<_>>()
                .join(",");
            url = format!("{}/{}", url, joined);
        }

        // Keyed by job type; types with no job map to null.
        let latest: Option<HashMap<String, Option<RawJobRecord>>> = self.get_optional(&url).await?;
        Ok(latest
            .unwrap_or_default()
            .into_values()
            .flatten()
            .collect())
    }

    async fn get_latest_successful_job(
        &self,
        specification_id: &str,
        job_type: &JobTypeCode,
    ) -> Result<Option<RawJobRecord>, TransportError> {
        self.get_optional(&self.url(&["latest-success", specification_id, job_type.as_str()]))
            .await
    }
}
