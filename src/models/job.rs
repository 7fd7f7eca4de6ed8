//! Job domain models: raw records from the jobs service and canonical job details.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Outcome type the jobs service uses for validation failures.
pub const VALIDATION_ERROR_OUTCOME: &str = "ValidationError";

macro_rules! job_types {
    ($($variant:ident),+ $(,)?) => {
        /// Background job types known to the funding backend.
        ///
        /// Variant names are the exact job definition codes sent by the jobs service.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        pub enum JobType {
            $($variant),+
        }

        impl JobType {
            /// Every known job type, in declaration order.
            pub const ALL: &'static [JobType] = &[$(JobType::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $(stringify!($variant) => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

job_types!(
    CreateInstructAllocationJob,
    CreateInstructGenerateAggregationsAllocationJob,
    GenerateGraphAndInstructAllocationJob,
    GenerateGraphAndInstructGenerateAggregationAllocationJob,
    CreateAllocationJob,
    GenerateCalculationAggregationsJob,
    GenerateCalcCsvResultsJob,
    AssignTemplateCalculationsJob,
    ApproveAllCalculationsJob,
    ApproveBatchCalculationsJob,
    CreateSpecificationJob,
    EditSpecificationJob,
    DeleteSpecificationJob,
    DeleteCalculationResultsJob,
    DeleteCalculationsJob,
    DeleteDatasetsJob,
    DeleteTestsJob,
    DeleteTestResultsJob,
    DeletePublishedProvidersJob,
    ReIndexSpecificationJob,
    ReIndexPublishedProvidersJob,
    ReIndexSpecificationCalculationRelationshipsJob,
    ReIndexTemplatesJob,
    SearchIndexWriterJob,
    UpdateCodeContextJob,
    RefreshFundingJob,
    ApproveAllProviderFundingJob,
    ApproveBatchProviderFundingJob,
    PublishAllProviderFundingJob,
    PublishBatchProviderFundingJob,
    ReleaseProvidersToChannelsJob,
    PublishedFundingUndoJob,
    DetectObsoleteFundingLinesJob,
    GeneratePublishedFundingCsvJob,
    GeneratePublishedProviderEstateCsvJob,
    GeneratePublishedProviderStateSummaryCsvJob,
    PopulateScopedProvidersJob,
    ProviderSnapshotDataLoadJob,
    MapDatasetJob,
    MapFdzDatasetsJob,
    MapScopedDatasetJob,
    MapScopedDatasetJobWithAggregation,
    ValidateDatasetJob,
    ReferencedSpecificationReMapJob,
    RunConverterDatasetMergeJob,
    QueueConverterDatasetMergeJob,
    ConverterWizardActivityCsvGenerationJob,
);

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Job type code as received on the wire.
///
/// Codes the service does not know about are kept verbatim instead of failing
/// deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobTypeCode {
    Known(JobType),
    Unrecognized(String),
}

impl JobTypeCode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(job_type) => job_type.as_str(),
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn known(&self) -> Option<JobType> {
        match self {
            Self::Known(job_type) => Some(*job_type),
            Self::Unrecognized(_) => None,
        }
    }
}

impl From<JobType> for JobTypeCode {
    fn from(job_type: JobType) -> Self {
        Self::Known(job_type)
    }
}

impl From<String> for JobTypeCode {
    fn from(raw: String) -> Self {
        match JobType::parse(&raw) {
            Some(job_type) => Self::Known(job_type),
            None => Self::Unrecognized(raw),
        }
    }
}

impl From<&str> for JobTypeCode {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<JobTypeCode> for String {
    fn from(code: JobTypeCode) -> Self {
        match code {
            JobTypeCode::Known(job_type) => job_type.as_str().to_string(),
            JobTypeCode::Unrecognized(raw) => raw,
        }
    }
}

impl std::fmt::Display for JobTypeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Running status of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunningStatus {
    Queued,
    QueuedWithService,
    InProgress,
    Completed,
    Unrecognized(String),
}

impl RunningStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "Queued",
            Self::QueuedWithService => "QueuedWithService",
            Self::InProgress => "InProgress",
            Self::Completed => "Completed",
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Queued" => Self::Queued,
            "QueuedWithService" => Self::QueuedWithService,
            "InProgress" => Self::InProgress,
            "Completed" => Self::Completed,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for RunningStatus {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<RunningStatus> for String {
    fn from(status: RunningStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for RunningStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Completion status of a job. Only meaningful once the job has completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CompletionStatus {
    Succeeded,
    Cancelled,
    Failed,
    TimedOut,
    Unrecognized(String),
}

impl CompletionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Succeeded => "Succeeded",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
            Self::TimedOut => "TimedOut",
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Succeeded" => Self::Succeeded,
            "Cancelled" => Self::Cancelled,
            "Failed" => Self::Failed,
            "TimedOut" => Self::TimedOut,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for CompletionStatus {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<CompletionStatus> for String {
    fn from(status: CompletionStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What triggered a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobTrigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Outcome of one step of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobOutcome {
    #[serde(default)]
    pub is_successful: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Outcome classification, e.g. `ValidationError`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub outcome_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_definition_id: Option<String>,
}

/// Job record as sent by the jobs service (REST responses and push messages).
///
/// The id is optional here so a record without one reaches the normalizer and is
/// rejected there rather than failing JSON decoding of a whole batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawJobRecord {
    #[serde(default, alias = "jobId", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(
        default,
        alias = "jobDefinitionId",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>, example = "RefreshFundingJob")]
    pub job_type: Option<JobTypeCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "InProgress")]
    pub running_status: Option<RunningStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "Succeeded")]
    pub completion_status: Option<CompletionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specification_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<JobTrigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoker_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoker_user_display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outcomes: Vec<JobOutcome>,
}

/// A failed step extracted from a job's outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFailure {
    pub description: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub outcome_type: Option<String>,
}

impl JobFailure {
    pub fn is_validation_error(&self) -> bool {
        self.outcome_type.as_deref() == Some(VALIDATION_ERROR_OUTCOME)
    }
}

/// Canonical view of a job with derived status flags and display text.
///
/// Built once per raw record and never mutated; a newer record produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetails {
    pub job_id: String,
    pub job_type: Option<JobTypeCode>,
    pub running_status: Option<RunningStatus>,
    pub completion_status: Option<CompletionStatus>,
    pub parent_job_id: Option<String>,
    pub specification_id: Option<String>,
    pub trigger_entity_id: Option<String>,
    pub trigger_message: Option<String>,
    pub invoker_user_id: Option<String>,
    pub invoker_user_display_name: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub is_complete: bool,
    pub is_failed: bool,
    pub is_successful: bool,
    pub status_description: String,
    pub job_description: String,
    pub outcome: String,
    pub failures: Vec<JobFailure>,
}

impl JobDetails {
    /// Completed with failed steps but not failed overall.
    pub fn is_partially_successful(&self) -> bool {
        self.is_complete && !self.is_successful && !self.is_failed
    }

    /// True if this job was updated strictly before `other`.
    ///
    /// A missing timestamp sorts before any real one.
    pub fn is_older_than(&self, other: &JobDetails) -> bool {
        self.last_updated < other.last_updated
    }
}
