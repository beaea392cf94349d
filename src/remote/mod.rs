// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Blob store over a GitLab project.
//!
//! ```text
//! RemoteRepository::connect(config)
//!        |  GET /namespaces?owned_only=true  -> namespace id (cached)
//!        v
//!   ResourcePool<Client> (20 x 5s timeout)
//!        |
//!        v
//!   send(method, url, body)
//!     PRIVATE-TOKEN header
//!     raced against the CancellationToken
//!     RateLimit-Remaining checked on every response
//!
//! add/copy/delete -> one POST .../repository/commits with one action
//! create          -> POST /projects, retried on known conflicts
//! ```
//!
//! A commit request applies all of its actions or none, so no rollback is
//! needed on this side.

pub mod api;
pub mod pool;
pub mod retry;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::types::RemoteConfig;
use crate::error::{BlobError, RemoteError, StoreError, StoreResult, bail_out};
use crate::metadata::{CommitMetadata, CommitResponse};
use crate::store::{BlobInfo, BlobStore, VersionToken, validate_key};

use api::{
    ActionKind, COMMIT_ID, CommitAction, CommitProperties, FileResponse, LAST_COMMIT_ID, NEXT_PAGE,
    NamespaceInfo, ProjectProperties, RATE_LIMIT_REMAINING, TREE_PAGE_SIZE, TreeItem,
};
use pool::ResourcePool;
use retry::{CreationConflict, RetryPolicy, classify_creation_conflict, is_missing_file_rejection};

/// Status, headers and body of one API call.
#[derive(Debug)]
struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl ApiResponse {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

fn decode<T: DeserializeOwned>(operation: &str, body: &str) -> StoreResult<T> {
    serde_json::from_str(body).map_err(|e| {
        RemoteError::MalformedBody {
            operation: operation.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

fn encode(operation: &str, value: &impl serde::Serialize) -> StoreResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        RemoteError::MalformedBody {
            operation: operation.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

fn not_found(key: &str) -> StoreError {
    BlobError::NotFound {
        key: key.to_string(),
    }
    .into()
}

/// A versioned blob store in one GitLab project.
pub struct RemoteRepository {
    api: Url,
    token: String,
    namespace_path: String,
    project_path: String,
    namespace_id: u64,
    main_branch: String,
    pool: ResourcePool<Client>,
    retry: RetryPolicy,
    rate_limit_low_water: i64,
    simulate_commit_failure: AtomicBool,
}

impl RemoteRepository {
    /// Build the client pool and resolve the owning namespace.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::InvalidUrl` for a bad `api_url`,
    /// `RemoteError::NamespaceNotFound` if no owned namespace matches
    /// `namespace_path`, and any transport or status error of the lookup.
    pub async fn connect(config: &RemoteConfig, cancel: &CancellationToken) -> StoreResult<Self> {
        let api = Url::parse(&config.api_url)
            .map_err(|e| RemoteError::InvalidUrl(format!("{}: {e}", config.api_url)))?;
        if api.cannot_be_a_base() {
            return Err(RemoteError::InvalidUrl(config.api_url.clone()).into());
        }

        let timeout = config.request_timeout();
        let pool = ResourcePool::filled(config.pool_size, || {
            Client::builder()
                .timeout(timeout)
                .user_agent(concat!("vcblob/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(RemoteError::from)
        })?;

        let mut repo = Self {
            api,
            token: config.access_token.clone(),
            namespace_path: config.namespace_path.clone(),
            project_path: config.project_path.clone(),
            namespace_id: 0,
            main_branch: config.main_branch.clone(),
            pool,
            retry: RetryPolicy::from(config),
            rate_limit_low_water: config.rate_limit_low_water,
            simulate_commit_failure: AtomicBool::new(config.simulate_commit_failure),
        };
        repo.namespace_id = repo.resolve_namespace_id(cancel).await?;
        debug!(namespace = %repo.namespace_path, id = repo.namespace_id, "namespace resolved");
        Ok(repo)
    }

    /// `namespace/project`.
    #[must_use]
    pub fn project(&self) -> String {
        format!("{}/{}", self.namespace_path, self.project_path)
    }

    #[must_use]
    pub const fn namespace_id(&self) -> u64 {
        self.namespace_id
    }

    /// Make every commit request fail before it is sent.
    pub fn set_simulate_commit_failure(&self, simulate: bool) {
        self.simulate_commit_failure.store(simulate, Ordering::SeqCst);
    }

    async fn resolve_namespace_id(&self, cancel: &CancellationToken) -> StoreResult<u64> {
        let mut url = self.endpoint(&["namespaces"])?;
        url.query_pairs_mut().append_pair("owned_only", "true");
        let response = self.send(cancel, Method::GET, url, None).await?;
        if response.status != StatusCode::OK {
            return Err(self.unexpected("list namespaces", &response));
        }

        let namespaces: Vec<NamespaceInfo> = decode("list namespaces", &response.body)?;
        namespaces
            .iter()
            .find(|ns| ns.matches(&self.namespace_path))
            .map(|ns| ns.id)
            .ok_or_else(|| {
                RemoteError::NamespaceNotFound {
                    path: self.namespace_path.clone(),
                }
                .into()
            })
    }

    fn endpoint(&self, segments: &[&str]) -> StoreResult<Url> {
        let mut url = self.api.clone();
        url.path_segments_mut()
            .map_err(|()| RemoteError::InvalidUrl(self.api.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Endpoint under `/projects/:id/`; the id is the URL-encoded full path.
    fn project_endpoint(&self, segments: &[&str]) -> StoreResult<Url> {
        let project = self.project();
        let mut all = vec!["projects", project.as_str()];
        all.extend_from_slice(segments);
        self.endpoint(&all)
    }

    fn file_endpoint(&self, key: &str) -> StoreResult<Url> {
        let mut url = self.project_endpoint(&["repository", "files", key])?;
        url.query_pairs_mut().append_pair("ref", &self.main_branch);
        Ok(url)
    }

    async fn send(
        &self,
        cancel: &CancellationToken,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> StoreResult<ApiResponse> {
        let client = self.pool.acquire().await?;
        debug!(method = %method, path = url.path(), "send request");

        let mut request = client
            .request(method, url)
            .header("PRIVATE-TOKEN", &self.token);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = tokio::select! {
            () = cancel.cancelled() => return Err(StoreError::Cancelled),
            response = request.send() => response.map_err(RemoteError::from)?,
        };
        let status = response.status();
        let headers = response.headers().clone();
        let body = tokio::select! {
            () = cancel.cancelled() => return Err(StoreError::Cancelled),
            body = response.text() => body.map_err(RemoteError::from)?,
        };
        drop(client);

        self.check_rate_limit(&headers)?;
        debug!(status = status.as_u16(), bytes = body.len(), "response received");
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }

    fn check_rate_limit(&self, headers: &HeaderMap) -> StoreResult<()> {
        let Some(value) = headers.get(RATE_LIMIT_REMAINING) else {
            return Ok(());
        };
        let text = String::from_utf8_lossy(value.as_bytes());
        let remaining: i64 = text.trim().parse().map_err(|_| RemoteError::MalformedHeader {
            header: RATE_LIMIT_REMAINING.to_string(),
            value: text.to_string(),
        })?;
        if remaining < self.rate_limit_low_water {
            warn!(remaining, "rate limit remaining too low");
        }
        Ok(())
    }

    fn unexpected(&self, operation: &str, response: &ApiResponse) -> StoreError {
        RemoteError::UnexpectedStatus {
            operation: operation.to_string(),
            project: self.project(),
            status: response.status.as_u16(),
            body: response.body.clone(),
        }
        .into()
    }

    async fn pause(&self, cancel: &CancellationToken) -> StoreResult<()> {
        tokio::select! {
            () = cancel.cancelled() => Err(StoreError::Cancelled),
            () = tokio::time::sleep(self.retry.backoff) => Ok(()),
        }
    }

    /// Commit id that last touched `key`, or `None` if the key is absent.
    async fn file_version(&self, cancel: &CancellationToken, key: &str) -> StoreResult<Option<String>> {
        let url = self.file_endpoint(key)?;
        let response = self.send(cancel, Method::HEAD, url, None).await?;
        match response.status {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::OK => response
                .header(LAST_COMMIT_ID)
                .or_else(|| response.header(COMMIT_ID))
                .map(|id| Some(id.to_string()))
                .ok_or_else(|| {
                    RemoteError::MissingHeader {
                        header: LAST_COMMIT_ID.to_string(),
                        key: key.to_string(),
                    }
                    .into()
                }),
            _ => Err(self.unexpected("get version", &response)),
        }
    }

    async fn commit(
        &self,
        cancel: &CancellationToken,
        author: &str,
        message: &str,
        action: CommitAction,
    ) -> StoreResult<()> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        if self.simulate_commit_failure.load(Ordering::SeqCst) {
            return Err(RemoteError::SimulatedFailure.into());
        }
        if author.is_empty() {
            warn!("modifying user is not specified");
        }

        let key = action.file_path.clone();
        let body = encode(
            "commit",
            &CommitProperties {
                branch: &self.main_branch,
                author_name: author,
                commit_message: message,
                actions: vec![action],
            },
        )?;
        let mut url = self.project_endpoint(&["repository", "commits"])?;
        url.query_pairs_mut().append_pair("ref", &self.main_branch);

        let response = self.send(cancel, Method::POST, url, Some(body)).await?;
        match response.status {
            StatusCode::CREATED => Ok(()),
            StatusCode::BAD_REQUEST if is_missing_file_rejection(&response.body) => Err(not_found(&key)),
            _ => Err(self.unexpected("commit", &response)),
        }
    }

    /// Action writing `content` to `key`, `update` if the key exists.
    async fn write_action(&self, cancel: &CancellationToken, key: &str, content: &[u8]) -> StoreResult<CommitAction> {
        let kind = if self.file_version(cancel, key).await?.is_some() {
            ActionKind::Update
        } else {
            ActionKind::Create
        };
        Ok(CommitAction::with_content(kind, key, content))
    }

    async fn tree_page(&self, cancel: &CancellationToken, page: &str) -> StoreResult<ApiResponse> {
        let mut url = self.project_endpoint(&["repository", "tree"])?;
        url.query_pairs_mut()
            .append_pair("ref", &self.main_branch)
            .append_pair("recursive", "true")
            .append_pair("per_page", &TREE_PAGE_SIZE.to_string())
            .append_pair("page", page);
        self.send(cancel, Method::GET, url, None).await
    }
}

impl fmt::Debug for RemoteRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteRepository")
            .field("api", &self.api.as_str())
            .field("project", &self.project())
            .field("namespace_id", &self.namespace_id)
            .field("main_branch", &self.main_branch)
            .field("pool_capacity", &self.pool.capacity())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for RemoteRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GitLab repository at {}?ref={}", self.project(), self.main_branch)
    }
}

impl BlobStore for RemoteRepository {
    async fn create_repository(&self, cancel: &CancellationToken) -> StoreResult<()> {
        let body = encode(
            "create project",
            &ProjectProperties {
                namespace_id: self.namespace_id,
                path: &self.project_path,
            },
        )?;

        let mut attempt = 0;
        loop {
            let url = self.endpoint(&["projects"])?;
            let response = self.send(cancel, Method::POST, url, Some(body.clone())).await?;
            if response.status == StatusCode::CREATED {
                info!(project = %self.project(), "GitLab repository created");
                return Ok(());
            }

            let conflict = (response.status == StatusCode::BAD_REQUEST)
                .then(|| classify_creation_conflict(&response.body))
                .flatten();
            let Some(conflict) = conflict else {
                return Err(self.unexpected("create project", &response));
            };

            attempt += 1;
            if self.retry.exhausted(attempt) {
                return Err(bail_out(format!(
                    "too many retries creating GitLab project {} ({attempt} attempts)",
                    self.project()
                )));
            }
            debug!(
                project = %self.project(),
                attempt,
                ?conflict,
                backoff_ms = self.retry.backoff.as_millis(),
                "transient error while creating repository"
            );
            self.pause(cancel).await?;
            if conflict == CreationConflict::PathTaken {
                if let Err(err) = self.delete_repository(cancel).await {
                    warn!(error = %err, "failed to delete conflicting project");
                }
                self.pause(cancel).await?;
            }
        }
    }

    async fn reset_repository(&self, cancel: &CancellationToken) -> StoreResult<()> {
        if let Err(err) = self.delete_repository(cancel).await {
            return Err(bail_out(format!(
                "failed to delete GitLab project {} during reset: {err}",
                self.project()
            )));
        }
        self.create_repository(cancel).await
    }

    async fn delete_repository(&self, cancel: &CancellationToken) -> StoreResult<()> {
        let url = self.project_endpoint(&[])?;
        let response = self.send(cancel, Method::DELETE, url, None).await?;
        match response.status {
            StatusCode::ACCEPTED | StatusCode::NOT_FOUND => {
                info!(project = %self.project(), "GitLab repository deleted");
                Ok(())
            }
            _ => Err(self.unexpected("delete project", &response)),
        }
    }

    async fn add_blob(&self, cancel: &CancellationToken, blob: &BlobInfo) -> StoreResult<()> {
        validate_key(&blob.key)?;
        debug!(key = %blob.key, bytes = blob.content.len(), "add blob");
        let action = self.write_action(cancel, &blob.key, &blob.content).await?;
        self.commit(cancel, &blob.modified_by, &format!("Adding Blob: {}", blob.key), action)
            .await?;
        info!(key = %blob.key, "blob added to GitLab repository");
        Ok(())
    }

    async fn copy_blob(
        &self,
        cancel: &CancellationToken,
        source: &str,
        destination: &str,
        modified_by: &str,
    ) -> StoreResult<()> {
        validate_key(destination)?;
        let content = self.get_blob(cancel, source).await?;
        let action = self.write_action(cancel, destination, &content).await?;
        let message = format!("Copying blob: {source} to {destination}");
        self.commit(cancel, modified_by, &message, action).await?;
        info!(source, destination, "blob copied in GitLab repository");
        Ok(())
    }

    async fn delete_blob(&self, cancel: &CancellationToken, key: &str, modified_by: &str) -> StoreResult<()> {
        validate_key(key)?;
        let action = CommitAction::without_content(ActionKind::Delete, key);
        self.commit(cancel, modified_by, &format!("Deleting blob: {key}"), action)
            .await?;
        info!(key, "blob deleted from GitLab repository");
        Ok(())
    }

    async fn get_blob(&self, cancel: &CancellationToken, key: &str) -> StoreResult<Vec<u8>> {
        validate_key(key)?;
        let url = self.file_endpoint(key)?;
        let response = self.send(cancel, Method::GET, url, None).await?;
        match response.status {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Err(not_found(key)),
            _ => return Err(self.unexpected("get blob", &response)),
        }

        let file: FileResponse = decode("get blob", &response.body)?;
        if file.encoding != "base64" {
            return Err(RemoteError::UnexpectedEncoding {
                key: key.to_string(),
                encoding: file.encoding,
            }
            .into());
        }
        file.decode().map_err(|e| {
            RemoteError::MalformedBody {
                operation: "get blob".to_string(),
                message: format!("{key}: {e}"),
            }
            .into()
        })
    }

    async fn list_blob_keys(&self, cancel: &CancellationToken) -> StoreResult<BTreeSet<String>> {
        let mut keys = BTreeSet::new();
        let mut page = "1".to_string();
        loop {
            let response = self.tree_page(cancel, &page).await?;
            match response.status {
                StatusCode::OK => {}
                // Empty projects have no tree yet.
                StatusCode::NOT_FOUND if keys.is_empty() => return Ok(keys),
                _ => return Err(self.unexpected("list tree", &response)),
            }

            let items: Vec<TreeItem> = decode("list tree", &response.body)?;
            keys.extend(items.into_iter().filter(TreeItem::is_blob).map(|item| item.path));

            match response.header(NEXT_PAGE).map(str::trim) {
                Some(next) if !next.is_empty() => page = next.to_string(),
                _ => return Ok(keys),
            }
        }
    }

    async fn get_state_id(&self, cancel: &CancellationToken) -> StoreResult<VersionToken> {
        let mut url = self.project_endpoint(&["repository", "commits"])?;
        url.query_pairs_mut()
            .append_pair("ref_name", &self.main_branch)
            .append_pair("per_page", "1");
        let response = self.send(cancel, Method::GET, url, None).await?;
        if response.status != StatusCode::OK {
            return Err(self.unexpected("list commits", &response));
        }

        let commits: Vec<CommitResponse> = decode("list commits", &response.body)?;
        commits
            .into_iter()
            .next()
            .map(|commit| commit.id)
            .ok_or_else(|| RemoteError::NoCommits { project: self.project() }.into())
    }

    async fn get_version_for(&self, cancel: &CancellationToken, key: &str) -> StoreResult<VersionToken> {
        validate_key(key)?;
        Ok(self.file_version(cancel, key).await?.unwrap_or_default())
    }

    async fn get_version_metadata(&self, cancel: &CancellationToken, version: &str) -> StoreResult<CommitMetadata> {
        let version = if version.is_empty() {
            self.get_state_id(cancel).await?
        } else {
            version.to_string()
        };
        let url = self.project_endpoint(&["repository", "commits", &version])?;
        let response = self.send(cancel, Method::GET, url, None).await?;
        if response.status != StatusCode::OK {
            return Err(self.unexpected("get commit", &response));
        }

        let commit: CommitResponse = decode("get commit", &response.body)?;
        Ok(CommitMetadata::try_from(commit)?)
    }

    async fn check_status(&self, cancel: &CancellationToken) -> StoreResult<bool> {
        // The provider applies each commit atomically; there is no drift to find.
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        Ok(true)
    }
}
