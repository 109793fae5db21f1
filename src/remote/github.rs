//! GitHub REST v3 client
//!
//! Blocking `reqwest` with rustls. Every failure carries the endpoint and,
//! for API errors, the request payload and response body so a failed PR can
//! be filed by hand.

use super::{Milestone, MilestoneService, PullRequest, Submitter};
use crate::core::error::{PostrelError, PostrelResult, RemoteError};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, LINK};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

pub struct GitHubClient {
  client: Client,
  base_url: String,
  token: String,
}

#[derive(Deserialize)]
struct CreatedPullRequest {
  html_url: String,
}

impl GitHubClient {
  pub fn new(token: impl Into<String>) -> PostrelResult<Self> {
    let client = Client::builder()
      .user_agent(concat!("postrel/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| RemoteError::Request {
        endpoint: DEFAULT_API_URL.to_string(),
        reason: format!("failed to build HTTP client: {}", e),
      })?;
    Ok(Self::with_client(client, token))
  }

  pub fn with_client(client: Client, token: impl Into<String>) -> Self {
    Self {
      client,
      base_url: DEFAULT_API_URL.to_string(),
      token: token.into(),
    }
  }

  /// Point the client at another API root
  #[cfg(test)]
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into().trim_end_matches('/').to_string();
    self
  }

  fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
    builder
      .bearer_auth(&self.token)
      .header("Accept", "application/vnd.github+json")
      .header("X-GitHub-Api-Version", "2022-11-28")
  }

  /// Send `builder`, decoding a JSON body on success
  fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, endpoint: &str, payload: &str) -> PostrelResult<T> {
    self.send_page(builder, endpoint, payload).map(|(body, _)| body)
  }

  /// Like [`GitHubClient::send`], also returning the `rel="next"` page URL
  fn send_page<T: DeserializeOwned>(
    &self,
    builder: RequestBuilder,
    endpoint: &str,
    payload: &str,
  ) -> PostrelResult<(T, Option<String>)> {
    debug!(endpoint, "GitHub request");

    let response = self.authorized(builder).send().map_err(|e| RemoteError::Request {
      endpoint: endpoint.to_string(),
      reason: e.to_string(),
    })?;

    let status = response.status();
    let next = next_link(response.headers());
    let body = response.text().map_err(|e| RemoteError::Request {
      endpoint: endpoint.to_string(),
      reason: format!("failed to read response: {}", e),
    })?;

    if !status.is_success() {
      return Err(PostrelError::Remote(RemoteError::Api {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        request: payload.to_string(),
        response: body,
      }));
    }

    let decoded = serde_json::from_str(&body).map_err(|e| {
      PostrelError::Remote(RemoteError::Request {
        endpoint: endpoint.to_string(),
        reason: format!("unexpected response: {}", e),
      })
    })?;
    Ok((decoded, next))
  }
}

/// URL of the `rel="next"` entry of a `Link` header
fn next_link(headers: &HeaderMap) -> Option<String> {
  let value = headers.get(LINK)?.to_str().ok()?;
  value.split(',').find_map(|entry| {
    let (url, params) = entry.split_once(';')?;
    params
      .split(';')
      .any(|param| param.trim() == r#"rel="next""#)
      .then(|| url.trim().trim_start_matches('<').trim_end_matches('>').to_string())
  })
}

impl Submitter for GitHubClient {
  fn open_pull_request(&self, pr: &PullRequest) -> PostrelResult<String> {
    let endpoint = format!("{}/repos/{}/{}/pulls", self.base_url, pr.org, pr.repo);
    let payload = serde_json::to_string(pr)?;

    let created: CreatedPullRequest = self.send(
      self
        .client
        .post(&endpoint)
        .header("Content-Type", "application/json")
        .body(payload.clone()),
      &endpoint,
      &payload,
    )?;
    Ok(created.html_url)
  }
}

impl MilestoneService for GitHubClient {
  fn list_milestones(&self, org: &str, repo: &str) -> PostrelResult<Vec<Milestone>> {
    let endpoint = format!("{}/repos/{}/{}/milestones", self.base_url, org, repo);
    let (mut milestones, mut next): (Vec<Milestone>, _) = self.send_page(
      self
        .client
        .get(&endpoint)
        .query(&[("state", "all"), ("per_page", "100")]),
      &endpoint,
      "",
    )?;

    // closed milestones count too, so follow every page
    while let Some(url) = next.take() {
      let (page, following): (Vec<Milestone>, _) = self.send_page(self.client.get(&url), &endpoint, "")?;
      milestones.extend(page);
      next = following.filter(|n| *n != url);
    }

    Ok(milestones)
  }

  fn create_milestone(&self, org: &str, repo: &str, milestone: &Milestone) -> PostrelResult<()> {
    let endpoint = format!("{}/repos/{}/{}/milestones", self.base_url, org, repo);
    let payload = serde_json::to_string(milestone)?;

    let _: serde_json::Value = self.send(
      self
        .client
        .post(&endpoint)
        .header("Content-Type", "application/json")
        .body(payload.clone()),
      &endpoint,
      &payload,
    )?;
    Ok(())
  }
}
