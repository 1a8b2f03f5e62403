//! Document collection of one project: uploads, removal, and chunk listing.
//!
//! Failed uploads stay visible flagged `failed` — the server reports a
//! per-file status and the feed keeps whatever it answered. Removing the
//! last document empties the knowledge base, which is the one action that
//! resets a processed project back to `created`; the feed reports it so
//! the owner can apply the lifecycle event.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::client::ApiClient;
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{Document, DocumentStatus};
use crate::store::ResourceStore;

/// The latest known document list of one project.
pub struct DocumentFeed {
    client: Arc<ApiClient>,
    project_id: String,
    store: Arc<Mutex<ResourceStore<Document>>>,
    error: Arc<Mutex<Option<String>>>,
}

impl DocumentFeed {
    pub fn new(client: Arc<ApiClient>, project_id: impl Into<String>) -> Self {
        Self {
            client,
            project_id: project_id.into(),
            store: Arc::new(Mutex::new(ResourceStore::new())),
            error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn documents(&self) -> Vec<Document> {
        self.store.lock().unwrap().iter().cloned().collect()
    }

    pub fn error(&self) -> Option<String> {
        self.error.lock().unwrap().clone()
    }

    pub async fn refresh(&self) -> Result<Vec<Document>, ApiError> {
        match self.client.documents(&self.project_id).await {
            Ok(list) => {
                self.store.lock().unwrap().set_all(list.clone());
                *self.error.lock().unwrap() = None;
                Ok(list)
            }
            Err(e) => {
                *self.error.lock().unwrap() = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Upload a batch of files; the server's per-file records (uploaded or
    /// failed) are appended to the store in response order.
    pub async fn upload(&self, paths: &[impl AsRef<Path>]) -> Result<Vec<Document>, ApiError> {
        let created = self.client.upload_documents(&self.project_id, paths).await?;
        let mut store = self.store.lock().unwrap();
        for doc in &created {
            store.insert(doc.clone());
        }
        Ok(created)
    }

    /// Remove one document. Returns true when the knowledge base is now
    /// empty. The signal comes from the server listing, not the local
    /// cache — a feed that never refreshed must not mistake its own empty
    /// store for an emptied knowledge base.
    pub async fn delete(&self, id: &str) -> Result<bool, ApiError> {
        self.client.delete_document(&self.project_id, id).await?;
        let remaining = self.client.documents(&self.project_id).await?;
        let mut store = self.store.lock().unwrap();
        store.set_all(remaining.clone());
        Ok(remaining.is_empty())
    }

    /// Upload tallies for status display: `(uploaded, failed)`.
    pub fn counts(&self) -> (usize, usize) {
        let store = self.store.lock().unwrap();
        let uploaded = store
            .iter()
            .filter(|d| d.status == DocumentStatus::Uploaded)
            .count();
        (uploaded, store.len() - uploaded)
    }
}

// ============ CLI commands ============

pub async fn run_list(cfg: &Config, project_id: &str) -> Result<()> {
    let client = crate::client::connect(cfg)?;
    let documents = client.documents(project_id).await?;
    if documents.is_empty() {
        println!("No documents in this project.");
        return Ok(());
    }
    println!("{:<38} {:<10} {:>10}  FILENAME", "ID", "STATUS", "SIZE");
    for d in documents {
        let status = match d.status {
            DocumentStatus::Uploaded => "uploaded",
            DocumentStatus::Failed => "failed",
        };
        println!(
            "{:<38} {:<10} {:>9.1}K  {}",
            d.id,
            status,
            d.size as f64 / 1024.0,
            d.filename
        );
    }
    Ok(())
}

pub async fn run_upload(cfg: &Config, project_id: &str, files: &[impl AsRef<Path>]) -> Result<()> {
    let client = crate::client::connect(cfg)?;
    let created = client.upload_documents(project_id, files).await?;

    let uploaded = created
        .iter()
        .filter(|d| d.status == DocumentStatus::Uploaded)
        .count();
    let failed = created.len() - uploaded;

    for d in &created {
        match d.status {
            DocumentStatus::Uploaded => println!("  ok      {}", d.filename),
            DocumentStatus::Failed => println!("  FAILED  {}", d.filename),
        }
    }
    println!(
        "{} file{} uploaded{}",
        uploaded,
        if uploaded == 1 { "" } else { "s" },
        if failed > 0 {
            format!(", {} failed", failed)
        } else {
            String::new()
        }
    );
    println!("Start processing with `docq process start {}`.", project_id);
    Ok(())
}

pub async fn run_delete(cfg: &Config, project_id: &str, id: &str) -> Result<()> {
    let client = crate::client::connect(cfg)?;
    client.delete_document(project_id, id).await?;
    let remaining = client.documents(project_id).await?;
    println!("Deleted document {}.", id);
    if remaining.is_empty() {
        println!("Knowledge base is now empty; project resets to created.");
    }
    Ok(())
}

pub async fn run_chunks(cfg: &Config, project_id: &str, document_id: &str) -> Result<()> {
    let client = crate::client::connect(cfg)?;
    let chunks = client.chunks(project_id, document_id).await?;
    if chunks.is_empty() {
        println!("No chunks — has this project been processed?");
        return Ok(());
    }
    for c in chunks {
        let kind = match (c.has_text, c.has_image) {
            (true, true) => "text+image",
            (true, false) => "text",
            (false, true) => "image",
            (false, false) => "empty",
        };
        println!("[{}] ({})\n  {}", c.id, kind, c.preview);
    }
    Ok(())
}
