//! Post-filtering of a combined dataset (the `filter` command).

use chrono::TimeDelta;
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::config::FilterConfig;
use crate::dataset::{self, DatasetError, PullRequest, RepositoryDataset};

/// Thresholds a pull request and its repository must meet to be kept.
#[derive(Debug, Clone, Copy)]
pub struct Criteria {
    pub min_elapsed: TimeDelta,
    pub min_pull_requests: usize,
}

impl Default for Criteria {
    fn default() -> Self {
        Self::from(&FilterConfig::default())
    }
}

impl From<&FilterConfig> for Criteria {
    fn from(config: &FilterConfig) -> Self {
        Self {
            min_elapsed: TimeDelta::seconds(config.min_elapsed_secs),
            min_pull_requests: config.min_pull_requests,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSummary {
    pub repositories: usize,
    pub pull_requests: usize,
}

/// Time from creation to merge, or to close when the PR was never merged.
pub fn elapsed(pr: &PullRequest) -> Option<TimeDelta> {
    pr.merged_at
        .or(pr.closed_at)
        .map(|finished| finished - pr.created_at)
}

pub fn retains(pr: &PullRequest, criteria: &Criteria) -> bool {
    pr.review_count > 0 && elapsed(pr).is_some_and(|e| e >= criteria.min_elapsed)
}

/// Swap the description body for its length in characters.
/// A record that was already stripped keeps its size.
fn strip_body(mut pr: PullRequest) -> PullRequest {
    if let Some(body) = pr.body.take() {
        pr.description_size = Some(body.chars().count());
    }
    pr
}

/// Keep qualifying pull requests, then keep repositories with enough of them.
pub fn apply(datasets: Vec<RepositoryDataset>, criteria: &Criteria) -> Vec<RepositoryDataset> {
    datasets
        .into_iter()
        .filter_map(|mut dataset| {
            let pull_requests: Vec<PullRequest> = std::mem::take(&mut dataset.repository.pull_requests)
                .into_iter()
                .filter(|pr| retains(pr, criteria))
                .map(strip_body)
                .collect();
            debug!(
                repository = dataset.name_with_owner(),
                surviving = pull_requests.len(),
                "filtered pull requests"
            );
            if pull_requests.len() < criteria.min_pull_requests {
                return None;
            }
            dataset.repository.pull_requests = pull_requests;
            Some(dataset)
        })
        .collect()
}

/// Read `input`, filter it and write the surviving subset to `output`.
#[instrument(skip(criteria), fields(input = %input.display(), output = %output.display()))]
pub fn run(input: &Path, output: &Path, criteria: &Criteria) -> Result<FilterSummary, DatasetError> {
    let datasets = dataset::read_json(input)?;
    let total = datasets.len();
    let filtered = apply(datasets, criteria);
    dataset::write_json(output, &filtered)?;

    let summary = FilterSummary {
        repositories: filtered.len(),
        pull_requests: filtered.iter().map(|d| d.pull_requests().len()).sum(),
    };
    info!(
        total,
        kept = summary.repositories,
        pull_requests = summary.pull_requests,
        "filtered dataset"
    );
    Ok(summary)
}
