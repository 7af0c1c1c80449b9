//! Repository listing and pull request fetching (the `fetch` command).

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{Config, HarvestConfig};
use crate::dataset::{self, DatasetError, Repository};
use crate::github::types::{PullRequestNode, RepositoryData, RepositoryNode, SearchData};
use crate::github::{query, Completion, GitHubError, Paginator, RepoSlug, Transport};

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("{source} (partial dataset written to {})", .recovery.display())]
    Aborted {
        recovery: PathBuf,
        source: GitHubError,
    },
}

/// Counts reported once the combined dataset is on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestSummary {
    pub repositories: usize,
    pub pull_requests: usize,
}

/// Emitted once per repository as the pull request stage advances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryProgress {
    pub processed: usize,
    pub total: usize,
    pub repository: String,
    pub pull_requests: usize,
    /// The repository was not fetched because its identifier was rejected
    pub skipped: bool,
}

pub type ProgressCallback = Box<dyn Fn(RepositoryProgress) + Send + Sync>;

fn emit(on_progress: Option<&ProgressCallback>, event: RepositoryProgress) {
    info!(
        repository = %event.repository,
        pull_requests = event.pull_requests,
        skipped = event.skipped,
        "processed {} of {} repositories",
        event.processed,
        event.total
    );
    if let Some(cb) = on_progress {
        cb(event);
    }
}

/// Turn a fatal collector error into a harvest error. An unexpected HTTP
/// status first flushes what has been gathered so far to `recovery`.
fn abort(
    recovery: &Path,
    repositories: &[Repository],
    pull_requests: HashMap<String, Vec<PullRequestNode>>,
    err: GitHubError,
) -> HarvestError {
    if !matches!(err, GitHubError::UnexpectedStatus { .. }) {
        return err.into();
    }

    let partial = dataset::combine(repositories, pull_requests);
    match dataset::write_json(recovery, &partial) {
        Ok(()) => {
            warn!(path = %recovery.display(), repositories = partial.len(), "wrote partial dataset");
            HarvestError::Aborted {
                recovery: recovery.to_path_buf(),
                source: err,
            }
        }
        Err(write_err) => {
            error!(error = %write_err, path = %recovery.display(), "failed to write partial dataset");
            err.into()
        }
    }
}

/// Collect the most-starred repositories, truncated to the configured limit.
///
/// Search rankings can shift between pages, so a repository seen on an
/// earlier page is dropped when it shows up again.
#[instrument(skip_all, fields(limit = settings.repository_limit))]
pub async fn list_repositories(
    paginator: &Paginator<'_>,
    settings: &HarvestConfig,
    recovery: &Path,
) -> Result<Vec<Repository>, HarvestError> {
    let mut nodes: Vec<RepositoryNode> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let result = paginator
        .collect_into(
            settings.repository_limit,
            &mut nodes,
            |after| query::search_repositories(&settings.search_query, settings.search_page_size, after),
            |data: SearchData| {
                let mut search = data.search;
                search.edges.retain(|edge| match edge.as_ref().and_then(|e| e.node.as_ref()) {
                    Some(node) if !seen.insert(node.name_with_owner.clone()) => {
                        debug!(repository = %node.name_with_owner, "dropping duplicate search hit");
                        false
                    }
                    _ => true,
                });
                Ok(search)
            },
        )
        .await;

    let mut repositories: Vec<Repository> = nodes.into_iter().map(Repository::from).collect();
    match result {
        Ok(Completion::RetriesExhausted) => {
            warn!(collected = repositories.len(), "repository search gave up after repeated gateway errors");
        }
        Ok(_) => {}
        Err(err) => return Err(abort(recovery, &repositories, HashMap::new(), err)),
    }

    repositories.truncate(settings.repository_limit);
    Ok(repositories)
}

/// Fetch closed and merged pull requests for each repository in turn.
///
/// A repository whose pages keep failing with gateway errors keeps whatever
/// was collected and processing moves on to the next one.
#[instrument(skip_all, fields(repositories = repositories.len(), limit = settings.pull_request_limit))]
pub async fn fetch_pull_requests(
    paginator: &Paginator<'_>,
    repositories: &[Repository],
    settings: &HarvestConfig,
    recovery: &Path,
    on_progress: Option<&ProgressCallback>,
) -> Result<HashMap<String, Vec<PullRequestNode>>, HarvestError> {
    let mut fetched: HashMap<String, Vec<PullRequestNode>> = HashMap::with_capacity(repositories.len());

    for (index, repo) in repositories.iter().enumerate() {
        let slug = match RepoSlug::parse(&repo.name_with_owner) {
            Ok(slug) => slug,
            Err(err) => {
                warn!(error = %err, "skipping repository");
                fetched.insert(repo.name_with_owner.clone(), Vec::new());
                emit(
                    on_progress,
                    RepositoryProgress {
                        processed: index + 1,
                        total: repositories.len(),
                        repository: repo.name_with_owner.clone(),
                        pull_requests: 0,
                        skipped: true,
                    },
                );
                continue;
            }
        };

        let mut nodes = Vec::new();
        let result = paginator
            .collect_into(
                settings.pull_request_limit,
                &mut nodes,
                |after| query::repository_pull_requests(&slug, settings.pull_request_page_size, after),
                |data: RepositoryData| {
                    data.repository
                        .map(|r| r.pull_requests)
                        .ok_or(GitHubError::MissingData)
                },
            )
            .await;

        nodes.truncate(settings.pull_request_limit);
        let collected = nodes.len();
        fetched.insert(repo.name_with_owner.clone(), nodes);

        match result {
            Ok(Completion::RetriesExhausted) => {
                warn!(repository = %slug, collected, "giving up on repository after repeated gateway errors");
            }
            Ok(_) => {}
            Err(err) => return Err(abort(recovery, &repositories[..=index], fetched, err)),
        }

        emit(
            on_progress,
            RepositoryProgress {
                processed: index + 1,
                total: repositories.len(),
                repository: slug.to_string(),
                pull_requests: collected,
                skipped: false,
            },
        );
    }

    Ok(fetched)
}

/// List repositories, fetch their pull requests and write the combined dataset.
#[instrument(skip_all, fields(output = %output.display()))]
pub async fn run(
    config: &Config,
    transport: &dyn Transport,
    output: &Path,
    recovery: &Path,
    on_progress: Option<&ProgressCallback>,
) -> Result<HarvestSummary, HarvestError> {
    let paginator = Paginator::new(transport, config.retry.clone());

    let repositories = list_repositories(&paginator, &config.harvest, recovery).await?;
    info!(repositories = repositories.len(), "fetched repositories");

    let pull_requests = fetch_pull_requests(&paginator, &repositories, &config.harvest, recovery, on_progress).await?;
    info!(repositories = pull_requests.len(), "fetched pull requests");

    let datasets = dataset::combine(&repositories, pull_requests);
    dataset::write_json(output, &datasets)?;

    Ok(HarvestSummary {
        repositories: datasets.len(),
        pull_requests: datasets.iter().map(|d| d.pull_requests().len()).sum(),
    })
}
