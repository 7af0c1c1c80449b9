//! GraphQL query builder.
//!
//! Query text is fixed; every caller-supplied value is passed through the
//! `variables` object so nothing is spliced into the document itself.

use serde_json::json;

use super::types::GraphQlRequest;
use super::GitHubError;

const MAX_PAGE_SIZE: u32 = 100;

const SEARCH_REPOSITORIES: &str = r#"
query($query: String!, $first: Int!, $after: String) {
  search(query: $query, type: REPOSITORY, first: $first, after: $after) {
    edges {
      node {
        ... on Repository {
          nameWithOwner
          stargazerCount
          url
        }
      }
    }
    pageInfo {
      endCursor
      hasNextPage
    }
  }
}
"#;

const REPOSITORY_PULL_REQUESTS: &str = r#"
query($owner: String!, $name: String!, $first: Int!, $after: String) {
  repository(owner: $owner, name: $name) {
    pullRequests(states: [MERGED, CLOSED], first: $first, after: $after, orderBy: {field: CREATED_AT, direction: DESC}) {
      edges {
        node {
          title
          url
          state
          createdAt
          closedAt
          mergedAt
          reviews { totalCount }
          files(first: 0) { totalCount }
          additions
          deletions
          body
          participants(first: 0) { totalCount }
          comments(first: 0) { totalCount }
        }
      }
      pageInfo {
        endCursor
        hasNextPage
      }
    }
  }
}
"#;

/// A validated `owner/name` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    pub fn parse(name_with_owner: &str) -> Result<Self, GitHubError> {
        let invalid = || GitHubError::InvalidIdentifier(name_with_owner.to_string());
        let (owner, name) = name_with_owner.split_once('/').ok_or_else(invalid)?;
        if !is_identifier(owner) || !is_identifier(name) {
            return Err(invalid());
        }
        Ok(RepoSlug {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl std::fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

fn is_identifier(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn check_page_size(first: u32) -> Result<u32, GitHubError> {
    if (1..=MAX_PAGE_SIZE).contains(&first) {
        Ok(first)
    } else {
        Err(GitHubError::InvalidPageSize(first))
    }
}

/// Search for repositories matching `search`, one page at a time.
pub fn search_repositories(
    search: &str,
    first: u32,
    after: Option<&str>,
) -> Result<GraphQlRequest, GitHubError> {
    Ok(GraphQlRequest {
        query: SEARCH_REPOSITORIES,
        variables: json!({
            "query": search,
            "first": check_page_size(first)?,
            "after": after,
        }),
    })
}

/// Closed and merged pull requests of one repository, newest first.
pub fn repository_pull_requests(
    slug: &RepoSlug,
    first: u32,
    after: Option<&str>,
) -> Result<GraphQlRequest, GitHubError> {
    Ok(GraphQlRequest {
        query: REPOSITORY_PULL_REQUESTS,
        variables: json!({
            "owner": slug.owner,
            "name": slug.name,
            "first": check_page_size(first)?,
            "after": after,
        }),
    })
}
