//! Wire types for the GraphQL responses the harvester consumes.
//!
//! Every nested container GitHub may return as `null` is modelled as an
//! `Option` so decoding never fails on missing counts; defaults are applied
//! when records are combined into the dataset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dataset::PrState;

/// Envelope of every GraphQL response.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<D> {
    pub data: Option<D>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

/// Request body POSTed to the GraphQL endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphQlRequest {
    pub query: &'static str,
    pub variables: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<N> {
    #[serde(default = "Vec::new")]
    pub edges: Vec<Option<Edge<N>>>,
    pub page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
pub struct Edge<N> {
    pub node: Option<N>,
}

impl<N> Connection<N> {
    /// Split into the non-null nodes and the page info.
    pub fn into_parts(self) -> (Vec<N>, PageInfo) {
        let nodes = self
            .edges
            .into_iter()
            .flatten()
            .filter_map(|edge| edge.node)
            .collect();
        (nodes, self.page_info)
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchData {
    pub search: Connection<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryData {
    pub repository: Option<RepositoryPullRequests>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryPullRequests {
    pub pull_requests: Connection<PullRequestNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryNode {
    pub name_with_owner: String,
    pub stargazer_count: Option<u64>,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalCount {
    pub total_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestNode {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    pub state: PrState,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub reviews: Option<TotalCount>,
    pub files: Option<TotalCount>,
    pub additions: Option<u64>,
    pub deletions: Option<u64>,
    pub body: Option<String>,
    pub participants: Option<TotalCount>,
    pub comments: Option<TotalCount>,
}
