//! Processing-task tracking for one project.
//!
//! A project has at most one active task. [`TaskMonitor`] polls it until a
//! terminal status (`SUCCESS` or `FAILED`), with two deliberate asymmetries:
//!
//! - A 404 from the task endpoint means "no task has run" — the monitor
//!   clears its state and records no error.
//! - Any other fetch failure is transient: it is recorded in the error
//!   field and polling continues. Only a fetched terminal status stops the
//!   poll.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;

use crate::client::ApiClient;
use crate::config::Config;
use crate::error::ApiError;
use crate::lifecycle::{SimulatedStages, StageSource, TaskStages};
use crate::models::{Task, TaskStatus};
use crate::poller::Poller;
use crate::progress::{ProgressMode, WatchEvent, WatchReporter};

/// Tracks the single active task of one project.
pub struct TaskMonitor {
    client: Arc<ApiClient>,
    project_id: String,
    task: Arc<Mutex<Option<Task>>>,
    error: Arc<Mutex<Option<String>>>,
    poller: Poller,
    interval: Duration,
}

impl TaskMonitor {
    pub fn new(client: Arc<ApiClient>, project_id: impl Into<String>, interval: Duration) -> Self {
        Self {
            client,
            project_id: project_id.into(),
            task: Arc::new(Mutex::new(None)),
            error: Arc::new(Mutex::new(None)),
            poller: Poller::new(),
            interval,
        }
    }

    pub fn task(&self) -> Option<Task> {
        self.task.lock().unwrap().clone()
    }

    pub fn error(&self) -> Option<String> {
        self.error.lock().unwrap().clone()
    }

    /// The shared slot a [`TaskStages`] source reads from.
    pub fn task_slot(&self) -> Arc<Mutex<Option<Task>>> {
        self.task.clone()
    }

    /// One fetch of the task state, with the 404 convention applied.
    pub async fn fetch(&self) -> Result<Option<Task>, ApiError> {
        fetch_into(&self.client, &self.project_id, &self.task, &self.error).await
    }

    /// Create the task and immediately arm polling.
    pub async fn start(&self) -> Result<Task, ApiError> {
        let task = self.client.start_task(&self.project_id).await?;
        *self.task.lock().unwrap() = Some(task.clone());
        self.start_polling();
        Ok(task)
    }

    /// Poll until the fetched status is terminal. Transient errors keep
    /// the poll alive; only `SUCCESS` or `FAILED` stops it.
    pub fn start_polling(&self) {
        let client = self.client.clone();
        let project_id = self.project_id.clone();
        let task = self.task.clone();
        let error = self.error.clone();
        self.poller.start(
            self.interval,
            move || {
                let client = client.clone();
                let project_id = project_id.clone();
                let task = task.clone();
                let error = error.clone();
                async move { fetch_into(&client, &project_id, &task, &error).await }
            },
            |fetched: &Option<Task>| fetched.as_ref().is_some_and(Task::is_terminal),
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
    project_id: &str,
    slot: &Mutex<Option<Task>>,
    error: &Mutex<Option<String>>,
) -> Result<Option<Task>, ApiError> {
    match client.task(project_id).await {
        Ok(Some(task)) => {
            *slot.lock().unwrap() = Some(task.clone());
            *error.lock().unwrap() = None;
            Ok(Some(task))
        }
        // No active task: clear state, not an error.
        Ok(None) => {
            *slot.lock().unwrap() = None;
            *error.lock().unwrap() = None;
            Ok(None)
        }
        Err(e) => {
            *error.lock().unwrap() = Some(e.to_string());
            Err(e)
        }
    }
}

/// Sample a stage source on a fixed cadence and report until it finishes.
pub async fn watch_stages(
    source: &dyn StageSource,
    reporter: &dyn WatchReporter,
    every: Duration,
    project: &str,
) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        match source.sample() {
            None => reporter.report(WatchEvent::Waiting {
                project: project.to_string(),
            }),
            Some(sample) if sample.finished => break,
            Some(sample) => {
                let names = source.stage_names();
                reporter.report(WatchEvent::Stage {
                    project: project.to_string(),
                    stage: names[sample.stage].clone(),
                    stage_index: sample.stage,
                    stage_count: names.len(),
                    progress: sample.progress,
                });
            }
        }
    }
}

// ============ CLI commands ============

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "PENDING",
        TaskStatus::Processing => "PROCESSING",
        TaskStatus::Success => "SUCCESS",
        TaskStatus::Failed => "FAILED",
    }
}

pub async fn run_status(cfg: &Config, project_id: &str) -> Result<()> {
    let client = crate::client::connect(cfg)?;
    match client.task(project_id).await? {
        None => println!("No active task for project {}.", project_id),
        Some(task) => {
            print!("{}", status_label(task.status));
            if let Some(stage) = &task.stage {
                print!("  stage={} progress={:.0}%", stage, task.progress * 100.0);
            }
            println!();
        }
    }
    Ok(())
}

pub async fn run_start(
    cfg: &Config,
    project_id: &str,
    watch: bool,
    simulate: bool,
    mode: ProgressMode,
) -> Result<()> {
    if simulate {
        // Placeholder timeline for backends without task state: a fixed
        // five-stage local clock behind the same stage-source seam.
        let source = SimulatedStages::new();
        let reporter = mode.reporter();
        println!("Simulating processing for project {}...", project_id);
        watch_stages(&source, reporter.as_ref(), Duration::from_millis(200), project_id).await;
        reporter.report(WatchEvent::Done {
            project: project_id.to_string(),
            status: "SUCCESS".to_string(),
        });
        println!("Simulated processing complete.");
        return Ok(());
    }

    let client = crate::client::connect(cfg)?;
    let monitor = TaskMonitor::new(
        client,
        project_id,
        Duration::from_millis(cfg.polling.task_interval_ms),
    );
    let task = monitor.start().await?;
    println!("Processing started ({}).", status_label(task.status));

    if watch {
        watch_to_completion(&monitor, project_id, mode).await?;
    }
    Ok(())
}

pub async fn run_watch(cfg: &Config, project_id: &str, mode: ProgressMode) -> Result<()> {
    let client = crate::client::connect(cfg)?;
    let monitor = TaskMonitor::new(
        client,
        project_id,
        Duration::from_millis(cfg.polling.task_interval_ms),
    );
    if monitor.fetch().await?.is_none() {
        println!("No active task for project {}.", project_id);
        return Ok(());
    }
    monitor.start_polling();
    watch_to_completion(&monitor, project_id, mode).await
}

async fn watch_to_completion(
    monitor: &TaskMonitor,
    project_id: &str,
    mode: ProgressMode,
) -> Result<()> {
    let source = TaskStages::new(monitor.task_slot());
    let reporter = mode.reporter();
    watch_stages(&source, reporter.as_ref(), Duration::from_millis(500), project_id).await;
    monitor.stop_polling();

    let status = monitor
        .task()
        .map(|t| t.status)
        .unwrap_or(TaskStatus::Failed);
    reporter.report(WatchEvent::Done {
        project: project_id.to_string(),
        status: status_label(status).to_string(),
    });

    match status {
        TaskStatus::Success => {
            println!("Knowledge base ready — project is processed.");
            Ok(())
        }
        other => anyhow::bail!("processing ended with status {}", status_label(other)),
    }
}
