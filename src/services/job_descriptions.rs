//! User-facing phrases for job types.
//!
//! The phrases are shown verbatim in job banners, so edits here change the UI.

use std::borrow::Cow;

use crate::models::{JobType, JobTypeCode};

/// Phrase shown for each job type.
pub const JOB_TYPE_PHRASES: &[(JobType, &str)] = &[
    (JobType::CreateInstructAllocationJob, "Calculating specification"),
    (
        JobType::CreateInstructGenerateAggregationsAllocationJob,
        "Calculating specification",
    ),
    (JobType::GenerateGraphAndInstructAllocationJob, "Calculating specification"),
    (
        JobType::GenerateGraphAndInstructGenerateAggregationAllocationJob,
        "Calculating specification",
    ),
    (JobType::CreateAllocationJob, "Creating allocation"),
    (
        JobType::GenerateCalculationAggregationsJob,
        "Generating calculation aggregations",
    ),
    (JobType::GenerateCalcCsvResultsJob, "Generating calculation CSV results"),
    (JobType::AssignTemplateCalculationsJob, "Assigning template calculations"),
    (JobType::ApproveAllCalculationsJob, "Approving all calculations"),
    (JobType::ApproveBatchCalculationsJob, "Approving batch calculations"),
    (JobType::CreateSpecificationJob, "Creating specification"),
    (JobType::EditSpecificationJob, "Editing specification"),
    (JobType::DeleteSpecificationJob, "Deleting specification"),
    (JobType::DeleteCalculationResultsJob, "Deleting calculation results"),
    (JobType::DeleteCalculationsJob, "Deleting calculations"),
    (JobType::DeleteDatasetsJob, "Deleting datasets"),
    (JobType::DeleteTestsJob, "Deleting tests"),
    (JobType::DeleteTestResultsJob, "Deleting test results"),
    (JobType::DeletePublishedProvidersJob, "Deleting published providers"),
    (JobType::ReIndexSpecificationJob, "Re-indexing specification"),
    (
        JobType::ReIndexPublishedProvidersJob,
        "Refreshing published provider search",
    ),
    (
        JobType::ReIndexSpecificationCalculationRelationshipsJob,
        "Re-indexing specification calculation relationships",
    ),
    (JobType::ReIndexTemplatesJob, "Re-indexing templates"),
    (JobType::SearchIndexWriterJob, "Writing search index"),
    (JobType::UpdateCodeContextJob, "Updating code context"),
    (JobType::RefreshFundingJob, "Refreshing funding"),
    (JobType::ApproveAllProviderFundingJob, "Approving all provider funding"),
    (JobType::ApproveBatchProviderFundingJob, "Approving batch provider funding"),
    (JobType::PublishAllProviderFundingJob, "Releasing all provider funding"),
    (JobType::PublishBatchProviderFundingJob, "Releasing batch provider funding"),
    (JobType::ReleaseProvidersToChannelsJob, "Releasing providers to channels"),
    (JobType::PublishedFundingUndoJob, "Undoing published funding"),
    (JobType::DetectObsoleteFundingLinesJob, "Detecting obsolete funding lines"),
    (JobType::GeneratePublishedFundingCsvJob, "Generating published funding CSV"),
    (
        JobType::GeneratePublishedProviderEstateCsvJob,
        "Generating published provider estate CSV",
    ),
    (
        JobType::GeneratePublishedProviderStateSummaryCsvJob,
        "Generating published provider state summary CSV",
    ),
    (JobType::PopulateScopedProvidersJob, "Populating scoped providers"),
    (JobType::ProviderSnapshotDataLoadJob, "Loading provider data"),
    (JobType::MapDatasetJob, "Mapping dataset"),
    (JobType::MapFdzDatasetsJob, "Mapping FDZ datasets"),
    (JobType::MapScopedDatasetJob, "Mapping scoped dataset"),
    (
        JobType::MapScopedDatasetJobWithAggregation,
        "Mapping scoped dataset with aggregation",
    ),
    (JobType::ValidateDatasetJob, "Validating dataset"),
    (
        JobType::ReferencedSpecificationReMapJob,
        "Mapping referenced specification",
    ),
    (JobType::RunConverterDatasetMergeJob, "Converter dataset merge"),
    (
        JobType::QueueConverterDatasetMergeJob,
        "Queueing converter dataset merge",
    ),
    (
        JobType::ConverterWizardActivityCsvGenerationJob,
        "Generating converter wizard activity CSV",
    ),
];

/// Phrase for a known job type.
pub fn phrase_for(job_type: JobType) -> Option<&'static str> {
    JOB_TYPE_PHRASES
        .iter()
        .find(|(candidate, _)| *candidate == job_type)
        .map(|(_, phrase)| *phrase)
}

/// Phrase for a job type code; unrecognized codes fall back to the raw code.
pub fn describe(code: &JobTypeCode) -> Cow<'_, str> {
    match code {
        JobTypeCode::Known(job_type) => phrase_for(*job_type)
            .map(Cow::Borrowed)
            .unwrap_or_else(|| Cow::Borrowed(job_type.as_str())),
        JobTypeCode::Unrecognized(raw) => Cow::Borrowed(raw.trim()),
    }
}
