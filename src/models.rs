//! Core data models used throughout DocQ.
//!
//! These types are client-observed projections of server state; the backend
//! is authoritative. Ownership is strictly tree-shaped:
//! Project → Documents → Chunks and Project → Messages → Citations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Anything the [`ResourceStore`](crate::store::ResourceStore) can hold.
///
/// Ids are opaque strings assigned by the server, except for provisional
/// entities staged by the reconciler, which carry a locally generated id
/// until the server confirms them.
pub trait Entity {
    fn id(&self) -> &str;
}

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    /// No documents processed yet.
    Created,
    /// Documents uploaded; the processing task is running.
    Processing,
    /// Knowledge base is ready for retrieval.
    Processed,
}

/// A project: one knowledge base plus its conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub status: ProjectStatus,
}

impl Entity for Project {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Upload outcome of a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploaded,
    Failed,
}

/// A document owned by exactly one project.
///
/// `chunks` is populated only once the document is part of a processed
/// knowledge base; list endpoints return it empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    pub status: DocumentStatus,
    #[serde(default)]
    pub chunks: Vec<Chunk>,
}

impl Entity for Document {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A chunk produced by the server-side processing pipeline. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub id: String,
    pub preview: String,
    #[serde(default)]
    pub has_text: bool,
    #[serde(default)]
    pub has_image: bool,
}

impl Entity for Chunk {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A chat message.
///
/// `pending` and `error` are client-only reconciliation flags — they are
/// never sent to or received from the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(skip)]
    pub pending: bool,
    #[serde(skip)]
    pub error: bool,
}

impl Message {
    /// A user message awaiting server confirmation.
    pub fn provisional(id: String, content: String) -> Self {
        Self {
            id,
            role: Role::User,
            content,
            citations: Vec::new(),
            pending: true,
            error: false,
        }
    }
}

impl Entity for Message {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A source passage cited by an assistant message. Read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub id: String,
    pub document_name: String,
    pub page_number: u32,
    pub snippet: String,
}

/// Status of the background processing task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

impl TaskStatus {
    /// Terminal statuses end polling; see [`Task::is_terminal`].
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failed)
    }
}

/// The processing task of a project. At most one is active per project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub status: TaskStatus,
    /// Current pipeline stage name (e.g. `"chunking"`), if running.
    #[serde(default)]
    pub stage: Option<String>,
    /// Progress within the current stage, in `[0, 1]`.
    #[serde(default)]
    pub progress: f64,
}

impl Task {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Process-wide backend health, polled independently of any project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealth {
    pub status: String,
    #[serde(default)]
    pub services: BTreeMap<String, String>,
}

impl SystemHealth {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// An account as returned by signup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
}
