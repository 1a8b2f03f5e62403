//! Project collection: store, mutators, and poll-while-processing.
//!
//! [`ProjectFeed`] tracks the signed-in user's projects. Mutations are
//! applied optimistically simple (the server response is authoritative and
//! replaces the local entry), and the feed polls the listing only while at
//! least one project is `processing`, stopping on its own once none is.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;

use crate::client::ApiClient;
use crate::config::Config;
use crate::error::ApiError;
use crate::lifecycle::ProjectEvent;
use crate::models::{Project, ProjectStatus};
use crate::poller::Poller;
use crate::store::ResourceStore;

/// The latest known project list plus its refresh machinery.
pub struct ProjectFeed {
    client: Arc<ApiClient>,
    store: Arc<Mutex<ResourceStore<Project>>>,
    error: Arc<Mutex<Option<String>>>,
    poller: Poller,
    interval: Duration,
}

impl ProjectFeed {
    pub fn new(client: Arc<ApiClient>, interval: Duration) -> Self {
        Self {
            client,
            store: Arc::new(Mutex::new(ResourceStore::new())),
            error: Arc::new(Mutex::new(None)),
            poller: Poller::new(),
            interval,
        }
    }

    /// Snapshot of the current list, in render order.
    pub fn projects(&self) -> Vec<Project> {
        self.store.lock().unwrap().iter().cloned().collect()
    }

    /// The last fetch failure, if any. Fetch errors land here instead of
    /// propagating into rendering.
    pub fn error(&self) -> Option<String> {
        self.error.lock().unwrap().clone()
    }

    /// Fetch the authoritative listing and replace the store.
    pub async fn refresh(&self) -> Result<Vec<Project>, ApiError> {
        refresh_into(&self.client, &self.store, &self.error).await
    }

    /// Create a project and append it.
    pub async fn create(&self, name: &str) -> Result<Project, ApiError> {
        let project = self.client.create_project(name).await?;
        self.store.lock().unwrap().insert(project.clone());
        Ok(project)
    }

    /// Rename a project; the server's record replaces the local one.
    pub async fn rename(&self, id: &str, name: &str) -> Result<Project, ApiError> {
        let project = self.client.rename_project(id, name).await?;
        self.store.lock().unwrap().replace(id, project.clone());
        Ok(project)
    }

    /// Delete a project and drop it from the store.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete_project(id).await?;
        self.store.lock().unwrap().remove(id);
        Ok(())
    }

    /// Apply a lifecycle event to a project's local status (the server
    /// converges on the same state through the next refresh).
    pub fn apply_event(&self, id: &str, event: ProjectEvent) {
        self.store
            .lock()
            .unwrap()
            .patch(id, |p| p.status = p.status.apply(event));
    }

    /// Arm polling if any project is currently processing. The poll stops
    /// itself as soon as a fetched listing has no processing project left.
    pub fn poll_while_processing(&self) {
        let has_processing = self
            .store
            .lock()
            .unwrap()
            .iter()
            .any(|p| p.status == ProjectStatus::Processing);
        if !has_processing {
            return;
        }

        let client = self.client.clone();
        let store = self.store.clone();
        let error = self.error.clone();
        self.poller.start(
            self.interval,
            move || {
                let client = client.clone();
                let store = store.clone();
                let error = error.clone();
                async move { refresh_into(&client, &store, &error).await }
            },
            |projects: &Vec<Project>| {
                !projects
                    .iter()
                    .any(|p| p.status == ProjectStatus::Processing)
            },
        );
    }

    pub fn stop_polling(&self) {
        self.poller.stop();
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }
}

async fn refresh_into(
    client: &ApiClient,
    store: &Mutex<ResourceStore<Project>>,
    error: &Mutex<Option<String>>,
) -> Result<Vec<Project>, ApiError> {
    match client.projects().await {
        Ok(list) => {
            store.lock().unwrap().set_all(list.clone());
            *error.lock().unwrap() = None;
            Ok(list)
        }
        Err(e) => {
            *error.lock().unwrap() = Some(e.to_string());
            Err(e)
        }
    }
}

// ============ CLI commands ============

fn status_label(status: ProjectStatus) -> &'static str {
    match status {
        ProjectStatus::Created => "created",
        ProjectStatus::Processing => "processing",
        ProjectStatus::Processed => "processed",
    }
}

pub async fn run_list(cfg: &Config) -> Result<()> {
    let client = crate::client::connect(cfg)?;
    let projects = client.projects().await?;
    if projects.is_empty() {
        println!("No projects yet. Create one with `docq project create <name>`.");
        return Ok(());
    }
    println!("{:<38} {:<12} NAME", "ID", "STATUS");
    for p in projects {
        println!("{:<38} {:<12} {}", p.id, status_label(p.status), p.name);
    }
    Ok(())
}

pub async fn run_create(cfg: &Config, name: &str) -> Result<()> {
    let client = crate::client::connect(cfg)?;
    let project = client.create_project(name).await?;
    println!("Created project '{}' ({})", project.name, project.id);
    Ok(())
}

pub async fn run_rename(cfg: &Config, id: &str, name: &str) -> Result<()> {
    let client = crate::client::connect(cfg)?;
    let project = client.rename_project(id, name).await?;
    println!("Renamed project {} to '{}'", project.id, project.name);
    Ok(())
}

pub async fn run_delete(cfg: &Config, id: &str) -> Result<()> {
    let client = crate::client::connect(cfg)?;
    client.delete_project(id).await?;
    println!("Deleted project {} (documents and messages cascade).", id);
    Ok(())
}
