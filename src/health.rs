//! Process-wide backend health polling.
//!
//! Health is tracked independently of any project: polled on a fixed delay
//! while the backend reports anything other than `healthy`. Once healthy,
//! polling stops — unless `polling.health_resume_on_degraded` is set, in
//! which case the monitor keeps polling so a later degradation is observed
//! instead of silently missed.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;

use crate::client::ApiClient;
use crate::config::{Config, PollingConfig};
use crate::error::ApiError;
use crate::models::SystemHealth;
use crate::poller::Poller;

/// Tracks the backend's health report.
pub struct HealthMonitor {
    client: Arc<ApiClient>,
    health: Arc<Mutex<Option<SystemHealth>>>,
    error: Arc<Mutex<Option<String>>>,
    poller: Poller,
    interval: Duration,
    /// Keep polling after "healthy" so later degradation is seen.
    continuous: bool,
}

impl HealthMonitor {
    pub fn new(client: Arc<ApiClient>, interval: Duration, continuous: bool) -> Self {
        Self {
            client,
            health: Arc::new(Mutex::new(None)),
            error: Arc::new(Mutex::new(None)),
            poller: Poller::new(),
            interval,
            continuous,
        }
    }

    /// Monitor configured from `[polling]`: interval and whether polling
    /// continues past the first healthy report
    /// (`polling.health_resume_on_degraded`).
    pub fn from_config(client: Arc<ApiClient>, polling: &PollingConfig) -> Self {
        Self::new(
            client,
            Duration::from_millis(polling.health_interval_ms),
            polling.health_resume_on_degraded,
        )
    }

    pub fn health(&self) -> Option<SystemHealth> {
        self.health.lock().unwrap().clone()
    }

    pub fn error(&self) -> Option<String> {
        self.error.lock().unwrap().clone()
    }

    pub async fn fetch(&self) -> Result<SystemHealth, ApiError> {
        fetch_into(&self.client, &self.health, &self.error).await
    }

    /// Arm polling. Stops on the first healthy report unless the monitor
    /// is continuous.
    pub fn start_polling(&self) {
        let client = self.client.clone();
        let health = self.health.clone();
        let error = self.error.clone();
        let continuous = self.continuous;
        self.poller.start(
            self.interval,
            move || {
                let client = client.clone();
                let health = health.clone();
                let error = error.clone();
                async move { fetch_into(&client, &health, &error).await }
            },
            move |h: &SystemHealth| !continuous && h.is_healthy(),
        );
    }

    pub fn stop_polling(&self) {
        self.poller.stop();
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }
}

async fn fetch_into(
    client: &ApiClient,
    slot: &Mutex<Option<SystemHealth>>,
    error: &Mutex<Option<String>>,
) -> Result<SystemHealth, ApiError> {
    match client.health().await {
        Ok(health) => {
            *slot.lock().unwrap() = Some(health.clone());
            *error.lock().unwrap() = None;
            Ok(health)
        }
        Err(e) => {
            *error.lock().unwrap() = Some(e.to_string());
            Err(e)
        }
    }
}

// ============ CLI commands ============

fn print_health(health: &SystemHealth) {
    println!("status: {}", health.status);
    for (service, state) in &health.services {
        println!("  {:<16} {}", service, state);
    }
}

pub async fn run_health(cfg: &Config, watch: bool) -> Result<()> {
    let client = crate::client::connect(cfg)?;
    let health = client.health().await?;
    print_health(&health);

    if !watch || health.is_healthy() {
        return Ok(());
    }

    // Watch mode re-polls until the backend comes up. The command itself
    // terminates on the first healthy report either way; the configured
    // resume behavior decides whether the monitor's poll would outlive it.
    let monitor = HealthMonitor::from_config(client, &cfg.polling);
    monitor.start_polling();
    let mut ticker = tokio::time::interval(Duration::from_millis(cfg.polling.health_interval_ms));
    loop {
        ticker.tick().await;
        if let Some(latest) = monitor.health() {
            if latest.is_healthy() {
                print_health(&latest);
                return Ok(());
            }
        }
    }
}
