pub mod types;

pub use types::{PrState, PullRequest, Repository, RepositoryDataset};

use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::github::types::{PullRequestNode, RepositoryNode, TotalCount};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to access dataset file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode or decode dataset JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<RepositoryNode> for Repository {
    fn from(node: RepositoryNode) -> Self {
        Repository {
            name_with_owner: node.name_with_owner,
            stars: node.stargazer_count.unwrap_or_default(),
            url: node.url,
        }
    }
}

fn total(count: Option<TotalCount>) -> u64 {
    count.map(|c| c.total_count).unwrap_or_default()
}

impl From<PullRequestNode> for PullRequest {
    fn from(node: PullRequestNode) -> Self {
        PullRequest {
            title: node.title.unwrap_or_default(),
            url: node.url.unwrap_or_default(),
            state: node.state,
            created_at: node.created_at,
            closed_at: node.closed_at,
            merged_at: node.merged_at,
            review_count: total(node.reviews),
            number_of_files: total(node.files),
            added_lines: node.additions.unwrap_or_default(),
            removed_lines: node.deletions.unwrap_or_default(),
            body: Some(node.body.unwrap_or_default()),
            description_size: None,
            number_of_participants: total(node.participants),
            number_of_comments: total(node.comments),
        }
    }
}

/// Join each repository with its fetched pull requests, in repository order.
///
/// Repositories with no entry in `pull_requests` get an empty list.
pub fn combine(
    repositories: &[Repository],
    mut pull_requests: HashMap<String, Vec<PullRequestNode>>,
) -> Vec<RepositoryDataset> {
    repositories
        .iter()
        .map(|repo| {
            let prs = pull_requests
                .remove(&repo.name_with_owner)
                .unwrap_or_default()
                .into_iter()
                .map(PullRequest::from)
                .collect();
            RepositoryDataset::new(repo.clone(), prs)
        })
        .collect()
}

/// Serialize the dataset with four-space indentation, replacing the file.
#[instrument(skip(datasets), fields(path = %path.display(), repositories = datasets.len()))]
pub fn write_json(path: &Path, datasets: &[RepositoryDataset]) -> Result<(), DatasetError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    datasets.serialize(&mut serializer)?;
    buf.push(b'\n');
    fs::write(path, &buf)?;
    debug!(bytes = buf.len(), "wrote dataset");
    Ok(())
}

#[instrument(fields(path = %path.display()))]
pub fn read_json(path: &Path) -> Result<Vec<RepositoryDataset>, DatasetError> {
    let contents = fs::read_to_string(path)?;
    let datasets: Vec<RepositoryDataset> = serde_json::from_str(&contents)?;
    debug!(repositories = datasets.len(), "read dataset");
    Ok(datasets)
}
