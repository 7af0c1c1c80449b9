//! Cursor-based pagination with retry and rate-limit handling.

use chrono::Utc;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use super::types::{Connection, GraphQlRequest, GraphQlResponse};
use super::{GitHubError, RateLimit, Transport};
use crate::config::RetryConfig;

/// Why a collection run stopped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The server reported no further pages.
    Exhausted,
    /// The accumulated count reached the requested limit.
    LimitReached,
    /// A page kept failing with gateway errors past the retry budget.
    RetriesExhausted,
}

pub struct Paginator<'a> {
    transport: &'a dyn Transport,
    policy: RetryConfig,
}

impl<'a> Paginator<'a> {
    pub fn new(transport: &'a dyn Transport, policy: RetryConfig) -> Self {
        Self { transport, policy }
    }

    /// Page through a connection, appending nodes to `items` until the server
    /// runs out of pages or `items` holds at least `limit` entries.
    ///
    /// `build` turns the current cursor (None for the first page) into a
    /// request; `extract` picks the connection out of the response data.
    /// Items gathered before an error stay in `items`.
    ///
    /// Status handling:
    /// - 200 with a GraphQL `errors` payload fails immediately.
    /// - 502/504 retries the same page after a fixed delay, giving up on the
    ///   item once the retry budget is spent.
    /// - 403/429 waits for the rate-limit reset when the quota is exhausted,
    ///   otherwise backs off briefly, then retries.
    /// - Anything else fails with [`GitHubError::UnexpectedStatus`].
    pub async fn collect_into<D, N, B, X>(
        &self,
        limit: usize,
        items: &mut Vec<N>,
        mut build: B,
        mut extract: X,
    ) -> Result<Completion, GitHubError>
    where
        D: DeserializeOwned,
        B: FnMut(Option<&str>) -> Result<GraphQlRequest, GitHubError>,
        X: FnMut(D) -> Result<Connection<N>, GitHubError>,
    {
        let mut cursor: Option<String> = None;
        let mut gateway_failures = 0u32;
        let mut page = 0u32;

        loop {
            if items.len() >= limit {
                return Ok(Completion::LimitReached);
            }

            let request = build(cursor.as_deref())?;
            let response = self.transport.post(&request).await?;

            match response.status {
                200 => {
                    let envelope: GraphQlResponse<D> = serde_json::from_str(&response.body)?;
                    if !envelope.errors.is_empty() {
                        let messages: Vec<_> =
                            envelope.errors.into_iter().map(|e| e.message).collect();
                        return Err(GitHubError::Query(messages.join("; ")));
                    }
                    let data = envelope.data.ok_or(GitHubError::MissingData)?;
                    let (nodes, page_info) = extract(data)?.into_parts();

                    page += 1;
                    gateway_failures = 0;
                    let fetched = nodes.len();
                    items.extend(nodes);
                    debug!(
                        page,
                        fetched,
                        total = items.len(),
                        has_next_page = page_info.has_next_page,
                        "fetched page"
                    );

                    tokio::time::sleep(self.policy.courtesy_delay()).await;

                    if !page_info.has_next_page {
                        return Ok(Completion::Exhausted);
                    }
                    match page_info.end_cursor {
                        Some(next) => cursor = Some(next),
                        None => {
                            warn!(page, "server reported another page without a cursor, stopping");
                            return Ok(Completion::Exhausted);
                        }
                    }
                }
                status @ (502 | 504) => {
                    gateway_failures += 1;
                    if gateway_failures > self.policy.max_gateway_retries {
                        warn!(status, attempts = gateway_failures, "gateway retry budget exhausted, giving up");
                        return Ok(Completion::RetriesExhausted);
                    }
                    warn!(status, attempt = gateway_failures, "received gateway timeout, retrying");
                    tokio::time::sleep(self.policy.gateway_delay()).await;
                }
                status @ (403 | 429) => {
                    let wait = rate_limit_wait(&self.policy, &response.rate_limit, Utc::now().timestamp());
                    if response.rate_limit.is_exhausted() {
                        warn!(status, wait_secs = wait.as_secs(), "rate limit exhausted, waiting for reset");
                    } else {
                        // Secondary limits and bad credentials both land here; the body tells them apart.
                        warn!(
                            status,
                            remaining = ?response.rate_limit.remaining,
                            wait_secs = wait.as_secs(),
                            body = body_excerpt(&response.body),
                            "request refused with quota left, waiting before retry"
                        );
                    }
                    tokio::time::sleep(wait).await;
                }
                status => {
                    return Err(GitHubError::UnexpectedStatus {
                        status,
                        body: response.body,
                    });
                }
            }
        }
    }
}

const BODY_EXCERPT_CHARS: usize = 200;

/// Leading part of a response body, cut on a character boundary.
fn body_excerpt(body: &str) -> &str {
    match body.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((end, _)) => &body[..end],
        None => body,
    }
}

/// How long to wait after a 403/429, given the current epoch second `now`.
fn rate_limit_wait(policy: &RetryConfig, rate_limit: &RateLimit, now: i64) -> Duration {
    match rate_limit.reset {
        Some(reset) if rate_limit.is_exhausted() => {
            let until_reset = u64::try_from(reset.saturating_sub(now)).unwrap_or(0);
            Duration::from_secs(until_reset) + policy.reset_margin()
        }
        _ => policy.rate_limit_delay(),
    }
}
