//! Bearer-token session with a single owner.
//!
//! The token lives in one [`Session`] passed (via the client) to every
//! API-calling component: set on login, cleared on logout or a 401. It
//! persists to a plain file at `api.token_path` so consecutive CLI
//! invocations stay signed in.

use std::path::PathBuf;
use std::sync::RwLock;

use anyhow::{Context, Result};

/// Owns the bearer token for the lifetime of the process.
pub struct Session {
    path: PathBuf,
    token: RwLock<Option<String>>,
}

impl Session {
    /// Load the session from the token file, if one exists.
    pub fn load(path: PathBuf) -> Result<Self> {
        let token = match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let trimmed = contents.trim().to_string();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed)
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read token file: {}", path.display()))
            }
        };
        Ok(Self {
            path,
            token: RwLock::new(token),
        })
    }

    /// An in-memory session that never touches the filesystem. Used by
    /// tests and by callers that manage credentials themselves.
    pub fn ephemeral(token: Option<String>) -> Self {
        Self {
            path: PathBuf::new(),
            token: RwLock::new(token),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().unwrap().is_some()
    }

    /// Store a new token (on login) and persist it.
    pub fn set(&self, token: String) -> Result<()> {
        if !self.path.as_os_str().is_empty() {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create token directory: {}", parent.display())
                    })?;
                }
            }
            std::fs::write(&self.path, &token)
                .with_context(|| format!("Failed to write token file: {}", self.path.display()))?;
        }
        *self.token.write().unwrap() = Some(token);
        Ok(())
    }

    /// Drop the token (on logout or a 401) and remove the persisted copy.
    pub fn clear(&self) {
        *self.token.write().unwrap() = None;
        if !self.path.as_os_str().is_empty() {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

// ============ CLI commands ============

/// Sign in and persist the bearer token.
pub async fn run_login(cfg: &crate::config::Config, username: &str, password: &str) -> Result<()> {
    let client = crate::client::connect(cfg)?;
    let token = client.login(username, password).await?;
    client.session().set(token)?;
    println!("Signed in as {}.", username);
    Ok(())
}

/// Create an account. Field-level validation errors surface per field.
pub async fn run_signup(
    cfg: &crate::config::Config,
    name: &str,
    username: &str,
    email: &str,
    password: &str,
) -> Result<()> {
    let client = crate::client::connect(cfg)?;
    let user = client.signup(name, username, email, password).await?;
    println!(
        "Account created for {} ({}). Sign in with `docq login`.",
        user.username, user.email
    );
    Ok(())
}

/// Drop the persisted token.
pub async fn run_logout(cfg: &crate::config::Config) -> Result<()> {
    let client = crate::client::connect(cfg)?;
    client.session().clear();
    println!("Signed out.");
    Ok(())
}
