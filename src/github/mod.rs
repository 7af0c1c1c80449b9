pub mod paginate;
pub mod query;
pub mod types;

pub use paginate::{Completion, Paginator};
pub use query::RepoSlug;
pub use types::GraphQlRequest;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::GitHubConfig;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode GraphQL response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Error in GraphQL response: {0}")]
    Query(String),

    #[error("GraphQL response carried no data")]
    MissingData,

    #[error("Query failed with status code {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Invalid repository identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid page size {0}, expected 1..=100")]
    InvalidPageSize(u32),

    #[error("GitHub token not found in config or environment")]
    MissingToken,
}

/// Rate-limit signal taken from the `x-ratelimit-*` response headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimit {
    pub remaining: Option<u64>,
    /// Epoch seconds at which the quota resets
    pub reset: Option<i64>,
}

impl RateLimit {
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }
}

/// Status, rate-limit headers and raw body of one HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub rate_limit: RateLimit,
    pub body: String,
}

/// Sends one GraphQL request and hands back the raw response.
/// Non-200 statuses are not errors at this layer; the paginator classifies them.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, request: &GraphQlRequest) -> Result<HttpResponse, GitHubError>;
}

/// Transport backed by reqwest, authenticating with a bearer token.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    user_agent: String,
}

impl HttpTransport {
    pub fn new(config: &GitHubConfig, token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            token,
            user_agent: config.user_agent.clone(),
        }
    }
}

fn header_value<T: std::str::FromStr>(headers: &reqwest::header::HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    async fn post(&self, request: &GraphQlRequest) -> Result<HttpResponse, GitHubError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("User-Agent", &self.user_agent)
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let rate_limit = RateLimit {
            remaining: header_value(response.headers(), "x-ratelimit-remaining"),
            reset: header_value(response.headers(), "x-ratelimit-reset"),
        };
        let body = response.text().await?;
        debug!(status, remaining = ?rate_limit.remaining, bytes = body.len(), "received response");

        Ok(HttpResponse {
            status,
            rate_limit,
            body,
        })
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed script of responses and records every request sent.
    #[derive(Default)]
    pub struct ScriptedTransport {
        responses: Mutex<VecDeque<HttpResponse>>,
        requests: Mutex<Vec<GraphQlRequest>>,
    }

    impl ScriptedTransport {
        pub fn new(responses: impl IntoIterator<Item = HttpResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn requests(&self) -> Vec<GraphQlRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn remaining(&self) -> usize {
            self.responses.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn post(&self, request: &GraphQlRequest) -> Result<HttpResponse, GitHubError> {
            self.requests.lock().unwrap().push(request.clone());
            let next = self.responses.lock().unwrap().pop_front();
            Ok(next.expect("scripted transport ran out of responses"))
        }
    }

    pub fn ok(body: serde_json::Value) -> HttpResponse {
        HttpResponse {
            status: 200,
            rate_limit: RateLimit::default(),
            body: body.to_string(),
        }
    }

    pub fn status(status: u16) -> HttpResponse {
        HttpResponse {
            status,
            rate_limit: RateLimit::default(),
            body: format!("{{\"message\": \"status {status}\"}}"),
        }
    }

    pub fn rate_limited(status: u16, remaining: u64, reset: Option<i64>) -> HttpResponse {
        HttpResponse {
            status,
            rate_limit: RateLimit {
                remaining: Some(remaining),
                reset,
            },
            body: "{\"message\": \"API rate limit exceeded\"}".to_string(),
        }
    }

    /// A search page holding repositories `names`.
    pub fn search_page(names: &[&str], end_cursor: Option<&str>, has_next_page: bool) -> HttpResponse {
        let edges: Vec<_> = names
            .iter()
            .map(|name| {
                serde_json::json!({"node": {
                    "nameWithOwner": name,
                    "stargazerCount": 100,
                    "url": format!("https://github.com/{name}"),
                }})
            })
            .collect();
        ok(serde_json::json!({"data": {"search": {
            "edges": edges,
            "pageInfo": {"endCursor": end_cursor, "hasNextPage": has_next_page},
        }}}))
    }

    /// A pull request page holding `count` merged pull requests.
    pub fn pull_request_page(count: usize, end_cursor: Option<&str>, has_next_page: bool) -> HttpResponse {
        let edges: Vec<_> = (0..count)
            .map(|i| {
                serde_json::json!({"node": {
                    "title": format!("PR {i}"),
                    "url": format!("https://github.com/o/r/pull/{i}"),
                    "state": "MERGED",
                    "createdAt": "2024-01-01T00:00:00Z",
                    "closedAt": "2024-01-01T02:00:00Z",
                    "mergedAt": "2024-01-01T02:00:00Z",
                    "reviews": {"totalCount": 1},
                    "files": {"totalCount": 1},
                    "additions": 1,
                    "deletions": 1,
                    "body": "body",
                    "participants": {"totalCount": 1},
                    "comments": {"totalCount": 0},
                }})
            })
            .collect();
        ok(serde_json::json!({"data": {"repository": {"pullRequests": {
            "edges": edges,
            "pageInfo": {"endCursor": end_cursor, "hasNextPage": has_next_page},
        }}}}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_exhausted() {
        let exhausted = RateLimit {
            remaining: Some(0),
            reset: Some(1_700_000_000),
        };
        assert!(exhausted.is_exhausted());
        assert!(!RateLimit::default().is_exhausted());
        assert!(!RateLimit {
            remaining: Some(12),
            reset: None
        }
        .is_exhausted());
    }

    #[test]
    fn test_header_value_parsing() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("x-ratelimit-remaining", "0".parse().unwrap());
        headers.insert("x-ratelimit-reset", "1700000000".parse().unwrap());
        headers.insert("x-broken", "abc".parse().unwrap());
        assert_eq!(header_value::<u64>(&headers, "x-ratelimit-remaining"), Some(0));
        assert_eq!(header_value::<i64>(&headers, "x-ratelimit-reset"), Some(1_700_000_000));
        assert_eq!(header_value::<u64>(&headers, "x-broken"), None);
        assert_eq!(header_value::<u64>(&headers, "x-missing"), None);
    }

    #[test]
    fn test_unexpected_status_message() {
        let err = GitHubError::UnexpectedStatus {
            status: 401,
            body: "Bad credentials".to_string(),
        };
        assert_eq!(err.to_string(), "Query failed with status code 401: Bad credentials");
    }
}
