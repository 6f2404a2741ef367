use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::ApiError;

/// GitHub account as returned by `/users/{login}`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct User {
    pub login: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Repository summary as returned by `/users/{login}/repos`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Repository {
    pub name: String,
    pub clone_url: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub fork: bool,
}

/// Outcome of probing a token against the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenCheck {
    /// HTTP status, `0` when no request was made or none completed
    pub status: u16,
    pub valid: bool,
}

impl TokenCheck {
    fn unchecked() -> Self {
        Self {
            status: 0,
            valid: false,
        }
    }
}

/// Thin bearer-token REST client for the three endpoints mailminer uses
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    api_url: String,
    per_page: u32,
    token: Option<String>,
}

impl GitHubClient {
    /// Create an unauthenticated client from configuration
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            api_url: config.github.api_url.trim_end_matches('/').to_string(),
            per_page: config.github.per_page.max(1),
            token: None,
        })
    }

    /// Attach the token used by the user and repository endpoints
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.api_url, endpoint)
    }

    fn get(&self, endpoint: &str, token: Option<&str>) -> reqwest::RequestBuilder {
        let request = self.http.get(self.url(endpoint));
        match token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }

    /// Check whether `token` is accepted by the API.
    ///
    /// A missing or blank token is rejected without touching the network.
    /// Transport failures count as a rejection with status `0`.
    pub async fn check_token(&self, token: Option<&str>) -> TokenCheck {
        let token = match token.map(str::trim) {
            Some(token) if !token.is_empty() => token,
            _ => return TokenCheck::unchecked(),
        };

        match self.get("/octocat", Some(token)).send().await {
            Ok(response) => {
                let status = response.status();
                debug!("Token check answered {}", status);
                TokenCheck {
                    status: status.as_u16(),
                    valid: status == StatusCode::OK,
                }
            }
            Err(e) => {
                warn!("Token check request failed: {}", e);
                TokenCheck::unchecked()
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let response = self
            .get(endpoint, self.token.as_deref())
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.json::<T>().await?)
    }

    /// Look up an account by login
    pub async fn get_user(&self, login: &str) -> Result<User, ApiError> {
        debug!("Looking up GitHub user: {}", login);
        self.get_json(&format!("/users/{}", login), &[]).await
    }

    /// List every repository of `login`, unfiltered
    pub async fn get_repos(&self, login: &str) -> Result<Vec<Repository>, ApiError> {
        debug!("Fetching repositories for: {}", login);

        let endpoint = format!("/users/{}/repos", login);
        let mut repositories = Vec::new();
        let mut page = 1u32;

        loop {
            let items: Vec<Repository> = self
                .get_json(
                    &endpoint,
                    &[
                        ("per_page", self.per_page.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;

            let last_page = items.len() < self.per_page as usize;
            repositories.extend(items);

            if last_page {
                break;
            }
            page += 1;
        }

        info!("Found {} repositories for {}", repositories.len(), login);
        Ok(repositories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GitHubClient {
        let mut config = Config::default();
        config.github.api_url = server.uri();
        GitHubClient::new(&config).expect("client")
    }

    #[tokio::test]
    async fn test_valid_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/octocat"))
            .and(header("Authorization", "Bearer ghp_good"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let check = client_for(&server).check_token(Some("ghp_good")).await;
        assert_eq!(check, TokenCheck { status: 200, valid: true });
    }

    #[tokio::test]
    async fn test_rejected_token_reports_status() {
        for status in [401u16, 403, 404, 500] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/octocat"))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;

            let check = client_for(&server).check_token(Some("ghp_bad")).await;
            assert_eq!(check.status, status);
            assert!(!check.valid);
        }
    }

    #[tokio::test]
    async fn test_missing_token_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.check_token(None).await, TokenCheck { status: 0, valid: false });
        assert_eq!(client.check_token(Some("")).await, TokenCheck { status: 0, valid: false });
        assert_eq!(client.check_token(Some("   ")).await, TokenCheck { status: 0, valid: false });
    }

    #[tokio::test]
    async fn test_unreachable_api_is_status_zero() {
        let mut config = Config::default();
        config.github.api_url = "http://127.0.0.1:1".to_string();
        let client = GitHubClient::new(&config).unwrap();

        let check = client.check_token(Some("ghp_x")).await;
        assert_eq!(check, TokenCheck { status: 0, valid: false });
    }

    #[tokio::test]
    async fn test_get_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/octocat"))
            .and(header("Authorization", "Bearer ghp_t"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "login": "octocat",
                "id": 1,
                "email": null
            })))
            .mount(&server)
            .await;

        let user = client_for(&server)
            .with_token("ghp_t")
            .get_user("octocat")
            .await
            .unwrap();
        assert_eq!(user.login, "octocat");
        assert_eq!(user.email, None);
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/ghost"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .with_token("t")
            .get_user("ghost")
            .await
            .unwrap_err();
        assert_matches!(err, ApiError::Status { status: 404, .. });
        assert_eq!(err.status(), 404);
    }

    #[tokio::test]
    async fn test_get_repos_single_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/octocat/repos"))
            .and(query_param("page", "1"))
            .and(query_param("per_page", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "a", "clone_url": "https://example.com/a.git", "private": false, "fork": false},
                {"name": "b", "clone_url": "https://example.com/b.git", "private": false, "fork": true},
                {"name": "c", "clone_url": "https://example.com/c.git"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let repos = client_for(&server)
            .with_token("t")
            .get_repos("octocat")
            .await
            .unwrap();

        assert_eq!(repos.len(), 3);
        assert!(repos[1].fork);
        assert!(!repos[2].private && !repos[2].fork);
    }

    #[tokio::test]
    async fn test_get_repos_follows_pages() {
        let server = MockServer::start().await;
        let mut config = Config::default();
        config.github.api_url = server.uri();
        config.github.per_page = 2;
        let client = GitHubClient::new(&config).unwrap().with_token("t");

        let repo = |name: &str| json!({"name": name, "clone_url": format!("https://example.com/{name}.git")});
        Mock::given(method("GET"))
            .and(path("/users/octocat/repos"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([repo("a"), repo("b")])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/octocat/repos"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([repo("c")])))
            .mount(&server)
            .await;

        let names: Vec<_> = client
            .get_repos("octocat")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_get_repos_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/octocat/repos"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .with_token("t")
            .get_repos("octocat")
            .await
            .unwrap_err();
        assert_eq!(err.status(), 502);
    }
}
