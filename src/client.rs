//! Backend API client.
//!
//! Thin reqwest wrapper over the REST/JSON contract: bearer-token auth on
//! every protected call, a bounded per-request timeout from config, and a
//! uniform mapping of non-2xx responses through the
//! [`ApiError`](crate::error::ApiError) taxonomy.
//!
//! # Endpoints
//!
//! | Method | Path | Client method |
//! |--------|------|---------------|
//! | `GET`    | `/api/health` | [`ApiClient::health`] |
//! | `POST`   | `/api/login` | [`ApiClient::login`] (form-encoded) |
//! | `POST`   | `/api/users` | [`ApiClient::signup`] |
//! | `GET`    | `/api/projects` | [`ApiClient::projects`] |
//! | `POST`   | `/api/projects` | [`ApiClient::create_project`] |
//! | `PATCH`  | `/api/projects/:id` | [`ApiClient::rename_project`] |
//! | `DELETE` | `/api/projects/:id` | [`ApiClient::delete_project`] |
//! | `GET`    | `/api/projects/:pid/documents` | [`ApiClient::documents`] |
//! | `POST`   | `/api/projects/:pid/documents` | [`ApiClient::upload_documents`] (multipart) |
//! | `DELETE` | `/api/projects/:pid/documents/:id` | [`ApiClient::delete_document`] |
//! | `GET`    | `/api/projects/:pid/documents/:id/chunks` | [`ApiClient::chunks`] |
//! | `GET`    | `/api/projects/:pid/messages` | [`ApiClient::messages`] |
//! | `POST`   | `/api/projects/:pid/messages` | [`ApiClient::send_message`] |
//! | `GET`    | `/api/projects/:pid/task` | [`ApiClient::task`] (404 → `Ok(None)`) |
//! | `POST`   | `/api/projects/:pid/task` | [`ApiClient::start_task`] |
//!
//! A 401 on any protected call clears the session token before the error
//! propagates, so the caller's next step is a clean re-login.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart;
use serde::Deserialize;

use crate::config::ApiConfig;
use crate::error::{ApiError, ValidationDetail};
use crate::models::{Chunk, Document, Message, Project, SystemHealth, Task, User};
use crate::session::Session;

/// Bearer-token-authenticated client for the Backend API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<Session>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, session: Arc<Session>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// The token for a protected call, or `Auth` when signed out.
    fn bearer(&self) -> Result<String, ApiError> {
        self.session.token().ok_or(ApiError::Auth)
    }

    /// Send a request and map non-2xx responses into the error taxonomy.
    /// A 401 clears the session before propagating.
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_status(status.as_u16(), &body);
        if matches!(err, ApiError::Auth) {
            self.session.clear();
        }
        Err(err)
    }

    // ============ Auth ============

    /// Exchange credentials for a bearer token (form-encoded, per the
    /// backend's login contract). The caller owns persisting the token
    /// into the session.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let response = self
            .execute(
                self.http
                    .post(self.url("/api/login"))
                    .form(&[("username", username), ("password", password)]),
            )
            .await?;
        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// Create an account. Validation failures come back as
    /// [`ApiError::Validation`] with a message or a field-keyed map.
    pub async fn signup(
        &self,
        name: &str,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ApiError> {
        let response = self
            .execute(self.http.post(self.url("/api/users")).json(&serde_json::json!({
                "name": name,
                "username": username,
                "email": email,
                "password": password,
            })))
            .await?;
        Ok(response.json().await?)
    }

    // ============ Health ============

    /// Process-wide backend health. Unauthenticated.
    pub async fn health(&self) -> Result<SystemHealth, ApiError> {
        let response = self.execute(self.http.get(self.url("/api/health"))).await?;
        Ok(response.json().await?)
    }

    // ============ Projects ============

    pub async fn projects(&self) -> Result<Vec<Project>, ApiError> {
        let response = self
            .execute(
                self.http
                    .get(self.url("/api/projects"))
                    .bearer_auth(self.bearer()?),
            )
            .await?;
        Ok(response.json().await?)
    }

    pub async fn create_project(&self, name: &str) -> Result<Project, ApiError> {
        let response = self
            .execute(
                self.http
                    .post(self.url("/api/projects"))
                    .bearer_auth(self.bearer()?)
                    .json(&serde_json::json!({ "name": name })),
            )
            .await?;
        Ok(response.json().await?)
    }

    pub async fn rename_project(&self, id: &str, name: &str) -> Result<Project, ApiError> {
        let response = self
            .execute(
                self.http
                    .patch(self.url(&format!("/api/projects/{}", id)))
                    .bearer_auth(self.bearer()?)
                    .json(&serde_json::json!({ "name": name })),
            )
            .await?;
        Ok(response.json().await?)
    }

    pub async fn delete_project(&self, id: &str) -> Result<(), ApiError> {
        self.execute(
            self.http
                .delete(self.url(&format!("/api/projects/{}", id)))
                .bearer_auth(self.bearer()?),
        )
        .await?;
        Ok(())
    }

    // ============ Documents ============

    pub async fn documents(&self, project_id: &str) -> Result<Vec<Document>, ApiError> {
        let response = self
            .execute(
                self.http
                    .get(self.url(&format!("/api/projects/{}/documents", project_id)))
                    .bearer_auth(self.bearer()?),
            )
            .await?;
        Ok(response.json().await?)
    }

    /// Upload a batch of files as one multipart request (field name
    /// `documents`, one part per file). The server answers with one
    /// [`Document`] per file, each flagged `uploaded` or `failed`.
    pub async fn upload_documents(
        &self,
        project_id: &str,
        paths: &[impl AsRef<Path>],
    ) -> Result<Vec<Document>, ApiError> {
        let mut form = multipart::Form::new();
        for path in paths {
            let path = path.as_ref();
            let bytes = tokio::fs::read(path).await.map_err(|e| {
                ApiError::Validation(ValidationDetail::Message(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            })?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".to_string());
            form = form.part("documents", multipart::Part::bytes(bytes).file_name(filename));
        }

        let response = self
            .execute(
                self.http
                    .post(self.url(&format!("/api/projects/{}/documents", project_id)))
                    .bearer_auth(self.bearer()?)
                    .multipart(form),
            )
            .await?;
        Ok(response.json().await?)
    }

    pub async fn delete_document(&self, project_id: &str, id: &str) -> Result<(), ApiError> {
        self.execute(
            self.http
                .delete(self.url(&format!(
                    "/api/projects/{}/documents/{}",
                    project_id, id
                )))
                .bearer_auth(self.bearer()?),
        )
        .await?;
        Ok(())
    }

    pub async fn chunks(&self, project_id: &str, document_id: &str) -> Result<Vec<Chunk>, ApiError> {
        let response = self
            .execute(
                self.http
                    .get(self.url(&format!(
                        "/api/projects/{}/documents/{}/chunks",
                        project_id, document_id
                    )))
                    .bearer_auth(self.bearer()?),
            )
            .await?;
        Ok(response.json().await?)
    }

    // ============ Messages ============

    pub async fn messages(&self, project_id: &str) -> Result<Vec<Message>, ApiError> {
        let response = self
            .execute(
                self.http
                    .get(self.url(&format!("/api/projects/{}/messages", project_id)))
                    .bearer_auth(self.bearer()?),
            )
            .await?;
        Ok(response.json().await?)
    }

    /// Send a user message. The response carries the confirmed entities —
    /// typically the echoed user message plus the assistant's reply.
    pub async fn send_message(
        &self,
        project_id: &str,
        content: &str,
    ) -> Result<Vec<Message>, ApiError> {
        let response = self
            .execute(
                self.http
                    .post(self.url(&format!("/api/projects/{}/messages", project_id)))
                    .bearer_auth(self.bearer()?)
                    .json(&serde_json::json!({ "role": "user", "content": content })),
            )
            .await?;
        Ok(response.json().await?)
    }

    // ============ Task ============

    /// The active processing task, or `Ok(None)` when the backend answers
    /// 404 — no task has run for this project, which is not an error.
    pub async fn task(&self, project_id: &str) -> Result<Option<Task>, ApiError> {
        let result = self
            .execute(
                self.http
                    .get(self.url(&format!("/api/projects/{}/task", project_id)))
                    .bearer_auth(self.bearer()?),
            )
            .await;
        match result {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(ApiError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Kick off processing for a project's uploaded documents.
    pub async fn start_task(&self, project_id: &str) -> Result<Task, ApiError> {
        let response = self
            .execute(
                self.http
                    .post(self.url(&format!("/api/projects/{}/task", project_id)))
                    .bearer_auth(self.bearer()?),
            )
            .await?;
        Ok(response.json().await?)
    }
}

/// Build a client from configuration, loading any persisted session.
/// This is the standard entry point used by the CLI commands.
pub fn connect(config: &crate::config::Config) -> anyhow::Result<Arc<ApiClient>> {
    let session = Arc::new(Session::load(config.api.token_path.clone())?);
    Ok(Arc::new(ApiClient::new(&config.api, session)?))
}
