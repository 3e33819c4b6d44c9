use std::time::Duration;

use serde_json::{Value, json};
use url::Url;

use crate::{AppDataError, GitHubConfig};

/// Status reported when the issue tracker cannot be reached or answers with
/// something other than JSON
pub const BAD_GATEWAY: u16 = 502;

const USER_AGENT: &str = concat!("appdata/", env!("CARGO_PKG_VERSION"));

/// Lists an organization's repositories together with their open issues
pub const ORGANIZATION_QUERY: &str = r#"query ($organization: String!) {
  organization(login: $organization) {
    login
    repositories(first: 100, orderBy: { field: NAME, direction: ASC }) {
      nodes {
        name
        url
        issues(states: OPEN, first: 100) {
          totalCount
          nodes {
            number
            title
            url
            createdAt
          }
        }
      }
    }
  }
}"#;

/// A stateless pass-through to the GitHub GraphQL API
#[derive(Clone)]
pub struct GitHubProxy {
    endpoint: Url,
    token: Option<String>,
    client: reqwest::Client,
}

impl GitHubProxy {
    /// Create a new proxy with the given configuration
    pub fn new(config: &GitHubConfig) -> Result<Self, AppDataError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|error| {
            AppDataError::Configuration(format!("invalid issue tracker endpoint: {error}"))
        })?;

        let mut client_builder = reqwest::Client::builder().user_agent(USER_AGENT);

        if let Some(timeout) = config.timeout_seconds {
            client_builder = client_builder.timeout(Duration::from_secs(timeout));
        }

        let client = client_builder
            .build()
            .map_err(|error| AppDataError::Configuration(error.to_string()))?;

        Ok(Self {
            endpoint,
            token: config.token.clone(),
            client,
        })
    }

    /// Runs [ORGANIZATION_QUERY] for `organization` and returns the upstream
    /// JSON verbatim
    pub async fn organization(&self, organization: &str) -> Result<Value, AppDataError> {
        let payload = json!({
            "query": ORGANIZATION_QUERY,
            "variables": { "organization": organization },
        });

        let mut request = self.client.post(self.endpoint.clone()).json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|error| {
            tracing::warn!(organization, %error, "issue tracker unreachable");
            AppDataError::Upstream {
                status: BAD_GATEWAY,
                message: error.to_string(),
            }
        })?;

        let status = response.status();
        tracing::info!(organization, status = status.as_u16(), "issue tracker replied");

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AppDataError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|error| AppDataError::Upstream {
                status: BAD_GATEWAY,
                message: error.to_string(),
            })
    }
}
