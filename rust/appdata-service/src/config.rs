use appdata_storage::UpdatePolicy;
use url::Url;

use crate::AppDataError;

/// The GraphQL endpoint queried when none is configured
pub const DEFAULT_GITHUB_ENDPOINT: &str = "https://api.github.com/graphql";

/// Collection keywords registered when none are configured
pub const DEFAULT_COLLECTIONS: [&str; 2] = ["favorites", "searches"];

/// Configuration for the issue-tracker proxy
#[derive(Clone, Debug)]
pub struct GitHubConfig {
    /// URL of the GraphQL endpoint
    pub endpoint: String,

    /// Bearer credential sent with every query
    pub token: Option<String>,

    /// Optional timeout for requests in seconds
    pub timeout_seconds: Option<u64>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_GITHUB_ENDPOINT.to_string(),
            token: None,
            timeout_seconds: Some(30),
        }
    }
}

/// Everything an [AppData](crate::AppData) instance needs, assembled once at
/// start-up and never mutated afterwards
#[derive(Clone, Debug)]
pub struct AppDataConfig {
    /// The kind every stored entity lives under
    pub group: String,

    /// The HS256 secret bearer tokens are verified against
    pub secret: Option<String>,

    /// Keywords that turn `user/<keyword>` into a collection route
    pub collections: Vec<String>,

    /// The issue-tracker proxy settings
    pub github: GitHubConfig,

    /// How often transactional writes are retried after a lost race
    pub update_policy: UpdatePolicy,
}

impl AppDataConfig {
    /// A configuration for `group` with every other setting at its default
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            secret: None,
            collections: DEFAULT_COLLECTIONS.iter().map(|c| (*c).to_owned()).collect(),
            github: GitHubConfig::default(),
            update_policy: UpdatePolicy::default(),
        }
    }

    /// Reads the configuration from the process environment:
    ///
    /// - `GROUPNAME` (required)
    /// - `JWT_SECRET`
    /// - `APPDATA_COLLECTIONS` (comma separated)
    /// - `GITHUB_TOKEN`
    /// - `GITHUB_GRAPHQL_URL`
    pub fn from_env() -> Result<Self, AppDataError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [from_env](AppDataConfig::from_env), reading variables through
    /// `lookup`
    pub fn from_lookup<Lookup>(lookup: Lookup) -> Result<Self, AppDataError>
    where
        Lookup: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let group = read("GROUPNAME")
            .ok_or_else(|| AppDataError::Configuration("GROUPNAME must be set".into()))?;
        let mut config = Self::new(group.trim());

        config.secret = read("JWT_SECRET");

        if let Some(collections) = read("APPDATA_COLLECTIONS") {
            config.collections = collections
                .split(',')
                .map(str::trim)
                .filter(|collection| !collection.is_empty())
                .map(str::to_owned)
                .collect();
        }

        config.github.token = read("GITHUB_TOKEN");

        if let Some(endpoint) = read("GITHUB_GRAPHQL_URL") {
            Url::parse(&endpoint).map_err(|error| {
                AppDataError::Configuration(format!("GITHUB_GRAPHQL_URL is invalid: {error}"))
            })?;
            config.github.endpoint = endpoint;
        }

        Ok(config)
    }

    /// Sets the token secret
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Replaces the registered collection keywords
    pub fn with_collections<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collections = collections.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the issue-tracker settings
    pub fn with_github(mut self, github: GitHubConfig) -> Self {
        self.github = github;
        self
    }

    /// Replaces the retry policy for transactional writes
    pub fn with_update_policy(mut self, update_policy: UpdatePolicy) -> Self {
        self.update_policy = update_policy;
        self
    }
}
