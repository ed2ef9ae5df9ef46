//! GitHub REST client.

use crate::error::GitHubError;
use crate::types::*;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = "forkkeep";

type Result<T> = std::result::Result<T, GitHubError>;

#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    base_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_API_URL, token)
    }

    pub fn with_base_url(base_url: &str, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.request_url(method, &format!("{}{}", self.base_url, path))
    }

    fn request_url(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", ACCEPT)
            .header("User-Agent", USER_AGENT)
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().path().to_string();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or(body);

        debug!(status = status.as_u16(), url = %url, message = %message, "GitHub request failed");

        match status {
            StatusCode::NOT_FOUND => Err(GitHubError::NotFound(url)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(GitHubError::Unauthorized(message))
            }
            _ => Err(GitHubError::Api {
                status: status.as_u16(),
                message,
            }),
        }
    }

    async fn send<T: DeserializeOwned>(req: RequestBuilder) -> Result<T> {
        let response = Self::check(req.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn send_empty(req: RequestBuilder) -> Result<()> {
        Self::check(req.send().await?).await?;
        Ok(())
    }

    // Users

    pub async fn authenticated_user(&self) -> Result<User> {
        Self::send(self.request(Method::GET, "/user")).await
    }

    pub async fn list_invitations(&self) -> Result<Vec<Invitation>> {
        Self::send(self.request(Method::GET, "/user/repository_invitations")).await
    }

    pub async fn accept_invitation(&self, id: u64) -> Result<()> {
        Self::send_empty(self.request(
            Method::PATCH,
            &format!("/user/repository_invitations/{}", id),
        ))
        .await
    }

    // Repositories

    pub async fn repository(&self, full_name: &str) -> Result<Repository> {
        Self::send(self.request(Method::GET, &format!("/repos/{}", full_name))).await
    }

    pub async fn edit_repository(
        &self,
        full_name: &str,
        edit: &RepositoryEdit,
    ) -> Result<Repository> {
        Self::send(
            self.request(Method::PATCH, &format!("/repos/{}", full_name))
                .json(edit),
        )
        .await
    }

    pub async fn list_forks(&self, full_name: &str) -> Result<Vec<Repository>> {
        Self::send(
            self.request(Method::GET, &format!("/repos/{}/forks", full_name))
                .query(&[("per_page", "100")]),
        )
        .await
    }

    /// Forks into the authenticated user's account. GitHub creates the fork
    /// asynchronously; the returned repository may not be populated yet.
    pub async fn create_fork(&self, full_name: &str) -> Result<Repository> {
        Self::send(self.request(Method::POST, &format!("/repos/{}/forks", full_name))).await
    }

    pub async fn watch(&self, full_name: &str) -> Result<()> {
        Self::send_empty(
            self.request(Method::PUT, &format!("/repos/{}/subscription", full_name))
                .json(&json!({ "subscribed": true })),
        )
        .await
    }

    pub async fn license(&self, full_name: &str) -> Result<RepositoryLicense> {
        Self::send(self.request(Method::GET, &format!("/repos/{}/license", full_name))).await
    }

    pub async fn branch(&self, full_name: &str, branch: &str) -> Result<Branch> {
        Self::send(self.request(
            Method::GET,
            &format!("/repos/{}/branches/{}", full_name, branch),
        ))
        .await
    }

    pub async fn list_collaborators(&self, full_name: &str) -> Result<Vec<User>> {
        Self::send(
            self.request(Method::GET, &format!("/repos/{}/collaborators", full_name))
                .query(&[("per_page", "100")]),
        )
        .await
    }

    pub async fn add_collaborator(
        &self,
        full_name: &str,
        login: &str,
        permission: &str,
    ) -> Result<()> {
        Self::send_empty(
            self.request(
                Method::PUT,
                &format!("/repos/{}/collaborators/{}", full_name, login),
            )
            .json(&json!({ "permission": permission })),
        )
        .await
    }

    /// Send a `repository_dispatch` event.
    pub async fn repository_dispatch(&self, full_name: &str, event_type: &str) -> Result<()> {
        info!(repository = %full_name, event_type = %event_type, "Sending repository dispatch");
        Self::send_empty(
            self.request(Method::POST, &format!("/repos/{}/dispatches", full_name))
                .json(&json!({ "event_type": event_type })),
        )
        .await
    }

    // Contents

    pub async fn contents(
        &self,
        full_name: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<Contents> {
        let mut req = self.request(
            Method::GET,
            &format!("/repos/{}/contents/{}", full_name, path.trim_start_matches('/')),
        );
        if let Some(r) = git_ref {
            req = req.query(&[("ref", r)]);
        }
        Self::send(req).await
    }

    /// Directory listing; a file path yields a single entry.
    pub async fn list_dir(
        &self,
        full_name: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<Vec<ContentEntry>> {
        Ok(match self.contents(full_name, path, git_ref).await? {
            Contents::Dir(entries) => entries,
            Contents::File(entry) => vec![entry],
        })
    }

    /// Decoded bytes of a single file.
    pub async fn file_content(
        &self,
        full_name: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<Vec<u8>> {
        match self.contents(full_name, path, git_ref).await? {
            Contents::File(entry) => decode_content(&entry),
            Contents::Dir(_) => Err(GitHubError::Decode(format!("{} is a directory", path))),
        }
    }

    // Pull requests

    /// `head` must be `owner:branch` for GitHub to filter on it.
    pub async fn list_pulls(
        &self,
        full_name: &str,
        state: &str,
        base: &str,
        head: &str,
    ) -> Result<Vec<PullRequest>> {
        Self::send(
            self.request(Method::GET, &format!("/repos/{}/pulls", full_name))
                .query(&[("state", state), ("base", base), ("head", head)]),
        )
        .await
    }

    pub async fn create_pull(&self, full_name: &str, pull: &NewPullRequest) -> Result<PullRequest> {
        Self::send(
            self.request(Method::POST, &format!("/repos/{}/pulls", full_name))
                .json(pull),
        )
        .await
    }

    pub async fn update_pull_title(
        &self,
        full_name: &str,
        number: u64,
        title: &str,
    ) -> Result<PullRequest> {
        Self::send(
            self.request(Method::PATCH, &format!("/repos/{}/pulls/{}", full_name, number))
                .json(&json!({ "title": title })),
        )
        .await
    }

    pub async fn set_labels(&self, full_name: &str, number: u64, labels: &[&str]) -> Result<()> {
        Self::send_empty(
            self.request(
                Method::PUT,
                &format!("/repos/{}/issues/{}/labels", full_name, number),
            )
            .json(&json!({ "labels": labels })),
        )
        .await
    }

    pub async fn request_reviewers(
        &self,
        full_name: &str,
        number: u64,
        reviewers: &[&str],
    ) -> Result<()> {
        Self::send_empty(
            self.request(
                Method::POST,
                &format!("/repos/{}/pulls/{}/requested_reviewers", full_name, number),
            )
            .json(&json!({ "reviewers": reviewers })),
        )
        .await
    }

    // Git refs

    /// `git_ref` is `heads/<branch>` or `tags/<tag>`.
    pub async fn get_ref(&self, full_name: &str, git_ref: &str) -> Result<GitRef> {
        Self::send(self.request(
            Method::GET,
            &format!("/repos/{}/git/ref/{}", full_name, git_ref),
        ))
        .await
    }

    pub async fn delete_ref(&self, full_name: &str, git_ref: &str) -> Result<()> {
        Self::send_empty(self.request(
            Method::DELETE,
            &format!("/repos/{}/git/refs/{}", full_name, git_ref),
        ))
        .await
    }

    // Releases

    pub async fn create_release(&self, full_name: &str, release: &NewRelease) -> Result<Release> {
        Self::send(
            self.request(Method::POST, &format!("/repos/{}/releases", full_name))
                .json(release),
        )
        .await
    }

    pub async fn update_release(
        &self,
        full_name: &str,
        id: u64,
        update: &ReleaseUpdate,
    ) -> Result<Release> {
        Self::send(
            self.request(Method::PATCH, &format!("/repos/{}/releases/{}", full_name, id))
                .json(update),
        )
        .await
    }

    pub async fn delete_release(&self, full_name: &str, id: u64) -> Result<()> {
        Self::send_empty(self.request(
            Method::DELETE,
            &format!("/repos/{}/releases/{}", full_name, id),
        ))
        .await
    }

    pub async fn latest_release(&self, full_name: &str) -> Result<Release> {
        Self::send(self.request(
            Method::GET,
            &format!("/repos/{}/releases/latest", full_name),
        ))
        .await
    }

    /// Upload an asset through the release's `upload_url` template.
    pub async fn upload_release_asset(
        &self,
        release: &Release,
        name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<ReleaseAsset> {
        let template = release
            .upload_url
            .split('{')
            .next()
            .unwrap_or(&release.upload_url);
        let mut url = url::Url::parse(template)
            .map_err(|e| GitHubError::Decode(format!("invalid upload_url '{}': {}", template, e)))?;
        url.query_pairs_mut().append_pair("name", name);

        debug!(release = release.id, asset = %name, size = data.len(), "Uploading release asset");
        Self::send(
            self.request_url(Method::POST, url.as_str())
                .header("Content-Type", content_type)
                .body(data),
        )
        .await
    }
}

fn decode_content(entry: &ContentEntry) -> Result<Vec<u8>> {
    let raw = entry
        .content
        .as_deref()
        .ok_or_else(|| GitHubError::Decode(format!("{} has no content", entry.path)))?;
    if let Some(encoding) = entry.encoding.as_deref()
        && encoding != "base64"
    {
        return Err(GitHubError::Decode(format!(
            "{} uses unsupported encoding {}",
            entry.path, encoding
        )));
    }
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| GitHubError::Decode(format!("{}: {}", entry.path, e)))
}
