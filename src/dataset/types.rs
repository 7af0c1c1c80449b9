use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a pull request as reported by GitHub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrState {
    Open,
    Closed,
    Merged,
}

/// Summary of a repository returned by the search stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    /// "owner/name"
    pub name_with_owner: String,
    pub stars: u64,
    pub url: String,
}

/// A pull request record as persisted on disk.
///
/// The combined dataset carries `body`; the filtered dataset replaces it with
/// `description_size`. Exactly one of the two is present in a written file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub title: String,
    pub url: String,
    pub state: PrState,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub review_count: u64,
    pub number_of_files: u64,
    pub added_lines: u64,
    pub removed_lines: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_size: Option<usize>,
    pub number_of_participants: u64,
    pub number_of_comments: u64,
}

/// A repository together with its pull requests, keyed under "repository".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDataset {
    pub repository: RepositoryEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryEntry {
    #[serde(flatten)]
    pub summary: Repository,
    pub pull_requests: Vec<PullRequest>,
}

impl RepositoryDataset {
    pub fn new(summary: Repository, pull_requests: Vec<PullRequest>) -> Self {
        Self {
            repository: RepositoryEntry {
                summary,
                pull_requests,
            },
        }
    }

    pub fn name_with_owner(&self) -> &str {
        &self.repository.summary.name_with_owner
    }

    pub fn pull_requests(&self) -> &[PullRequest] {
        &self.repository.pull_requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pr_state_wire_format() {
        assert_eq!(serde_json::to_string(&PrState::Merged).unwrap(), "\"MERGED\"");
        let state: PrState = serde_json::from_str("\"CLOSED\"").unwrap();
        assert_eq!(state, PrState::Closed);
    }

    #[test]
    fn test_dataset_key_layout() {
        let dataset = RepositoryDataset::new(
            Repository {
                name_with_owner: "rust-lang/rust".to_string(),
                stars: 10,
                url: "https://github.com/rust-lang/rust".to_string(),
            },
            vec![],
        );
        let json = serde_json::to_string(&dataset).unwrap();
        assert_eq!(
            json,
            r#"{"repository":{"nameWithOwner":"rust-lang/rust","stars":10,"url":"https://github.com/rust-lang/rust","pullRequests":[]}}"#
        );
    }

    #[test]
    fn test_pull_request_without_body_omits_key() {
        let json = r#"{
            "title": "t", "url": "u", "state": "MERGED",
            "createdAt": "2024-01-01T00:00:00Z", "closedAt": null, "mergedAt": null,
            "reviewCount": 1, "numberOfFiles": 2, "addedLines": 3, "removedLines": 4,
            "descriptionSize": 7, "numberOfParticipants": 5, "numberOfComments": 6
        }"#;
        let pr: PullRequest = serde_json::from_str(json).unwrap();
        assert!(pr.body.is_none());
        assert_eq!(pr.description_size, Some(7));

        let value = serde_json::to_value(&pr).unwrap();
        assert!(value.get("body").is_none());
        assert_eq!(value["closedAt"], serde_json::Value::Null);
    }
}
