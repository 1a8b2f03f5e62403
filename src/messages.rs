//! Conversation of one project: history plus optimistic send.
//!
//! [`MessageFeed::send`] follows the reconciliation protocol: the user
//! message appears in the store immediately (pending), then one store
//! mutation swaps it for the server's confirmed entities — usually the
//! echoed user message and the assistant's reply. A failed send keeps the
//! message visible flagged failed; it can be dismissed, never auto-retried.

use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::client::ApiClient;
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{Message, Role};
use crate::reconcile;
use crate::store::ResourceStore;

/// The latest known message list of one project.
pub struct MessageFeed {
    client: Arc<ApiClient>,
    project_id: String,
    store: Arc<Mutex<ResourceStore<Message>>>,
    error: Arc<Mutex<Option<String>>>,
}

impl MessageFeed {
    pub fn new(client: Arc<ApiClient>, project_id: impl Into<String>) -> Self {
        Self {
            client,
            project_id: project_id.into(),
            store: Arc::new(Mutex::new(ResourceStore::new())),
            error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.store.lock().unwrap().iter().cloned().collect()
    }

    pub fn error(&self) -> Option<String> {
        self.error.lock().unwrap().clone()
    }

    pub async fn refresh(&self) -> Result<Vec<Message>, ApiError> {
        match self.client.messages(&self.project_id).await {
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

    /// Send a user message optimistically. On success the provisional
    /// entry is swapped for the server's entities; on failure it stays,
    /// flagged failed, and the error propagates to the caller.
    pub async fn send(&self, content: &str) -> Result<Vec<Message>, ApiError> {
        let provisional = Message::provisional(reconcile::provisional_id(), content.to_string());
        let provisional_id = {
            let mut store = self.store.lock().unwrap();
            reconcile::stage(&mut store, provisional)
        };

        match self.client.send_message(&self.project_id, content).await {
            Ok(confirmed) => {
                let mut store = self.store.lock().unwrap();
                reconcile::commit(&mut store, &provisional_id, confirmed.clone());
                Ok(confirmed)
            }
            Err(e) => {
                let mut store = self.store.lock().unwrap();
                reconcile::fail(&mut store, &provisional_id);
                Err(e)
            }
        }
    }

    /// Drop a failed message the user dismissed. Returns whether it existed.
    pub fn dismiss(&self, id: &str) -> bool {
        self.store.lock().unwrap().remove(id).is_some()
    }
}

// ============ CLI commands ============

fn print_message(m: &Message) {
    let speaker = match m.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    println!("{}: {}", speaker, m.content);
    for c in &m.citations {
        println!("    [{} p.{}] {}", c.document_name, c.page_number, c.snippet);
    }
}

pub async fn run_send(cfg: &Config, project_id: &str, content: &str) -> Result<()> {
    let client = crate::client::connect(cfg)?;
    let confirmed = client.send_message(project_id, content).await?;
    for m in confirmed.iter().filter(|m| m.role == Role::Assistant) {
        print_message(m);
    }
    Ok(())
}

pub async fn run_history(cfg: &Config, project_id: &str) -> Result<()> {
    let client = crate::client::connect(cfg)?;
    let messages = client.messages(project_id).await?;
    if messages.is_empty() {
        println!("No messages yet. Ask something with `docq chat send`.");
        return Ok(());
    }
    for m in &messages {
        print_message(m);
    }
    Ok(())
}
