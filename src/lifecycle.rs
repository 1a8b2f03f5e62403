//! Project lifecycle state machine and processing-stage sources.
//!
//! A project moves `created → processing → processed`, driven by events
//! rather than timers. The only backwards transition is an explicit user
//! action: removing the last document of a processed project resets it to
//! `created`.
//!
//! Stage display is decoupled from where stage data comes from. A
//! [`StageSource`] yields `(stage index, progress within stage)` either from
//! polled server data ([`TaskStages`]) or from a deterministic local clock
//! ([`SimulatedStages`]). The two are interchangeable behind the same trait;
//! the CLI uses the task-driven source unless explicitly asked to simulate.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use crate::models::{ProjectStatus, Task, TaskStatus};

/// Events that move a project through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectEvent {
    /// A document batch finished uploading; processing begins.
    DocumentsUploaded,
    /// The processing task reported `SUCCESS`.
    TaskSucceeded,
    /// The last document was removed from the knowledge base.
    KnowledgeBaseEmptied,
}

impl ProjectStatus {
    /// Apply a lifecycle event. Transitions not listed leave the status
    /// unchanged — in particular, `TaskSucceeded` only completes a project
    /// that is actually processing, never one still collecting uploads.
    pub fn apply(self, event: ProjectEvent) -> ProjectStatus {
        match (self, event) {
            (_, ProjectEvent::DocumentsUploaded) => ProjectStatus::Processing,
            (ProjectStatus::Processing, ProjectEvent::TaskSucceeded) => ProjectStatus::Processed,
            (ProjectStatus::Processed, ProjectEvent::KnowledgeBaseEmptied) => {
                ProjectStatus::Created
            }
            (status, _) => status,
        }
    }
}

/// A point-in-time reading of the processing pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSample {
    /// Index into [`StageSource::stage_names`].
    pub stage: usize,
    /// Progress within the current stage, in `[0, 1]`.
    pub progress: f64,
    /// The pipeline has reached its terminal/final stage.
    pub finished: bool,
}

/// Where stage readings come from: polled server data or a local clock.
pub trait StageSource: Send + Sync {
    fn stage_names(&self) -> &[String];
    /// The current reading, or `None` while no stage data exists yet (no
    /// task fetched, or the task is still pending). `None` is distinct
    /// from a running first stage at zero progress.
    fn sample(&self) -> Option<StageSample>;
}

/// Stage source backed by the polled [`Task`] of a project.
///
/// Shares the task slot with the
/// [`TaskMonitor`](crate::task::TaskMonitor) that polls it.
pub struct TaskStages {
    names: Vec<String>,
    task: Arc<Mutex<Option<Task>>>,
}

impl TaskStages {
    pub fn new(task: Arc<Mutex<Option<Task>>>) -> Self {
        Self {
            names: ["chunking", "embedding", "storing"]
                .into_iter()
                .map(String::from)
                .collect(),
            task,
        }
    }
}

impl StageSource for TaskStages {
    fn stage_names(&self) -> &[String] {
        &self.names
    }

    fn sample(&self) -> Option<StageSample> {
        let task = self.task.lock().unwrap();
        match task.as_ref() {
            None => None,
            Some(task) if task.is_terminal() => Some(StageSample {
                stage: self.names.len().saturating_sub(1),
                progress: 1.0,
                finished: true,
            }),
            Some(task) if task.status == TaskStatus::Pending => None,
            Some(task) => {
                let stage = task
                    .stage
                    .as_deref()
                    .and_then(|name| self.names.iter().position(|n| n == name))
                    .unwrap_or(0);
                Some(StageSample {
                    stage,
                    progress: task.progress.clamp(0.0, 1.0),
                    finished: false,
                })
            }
        }
    }
}

/// Stage source driven by a deterministic local clock: five named stages,
/// each with a fixed duration, advancing automatically and finishing after
/// the last. Useful against backends that don't expose task state, and in
/// demos.
pub struct SimulatedStages {
    names: Vec<String>,
    durations: Vec<Duration>,
    started: Instant,
}

impl SimulatedStages {
    /// The default simulated timeline.
    pub fn new() -> Self {
        Self::with_stages(vec![
            ("uploading".to_string(), Duration::from_millis(1500)),
            ("parsing".to_string(), Duration::from_millis(2000)),
            ("chunking".to_string(), Duration::from_millis(2500)),
            ("embedding".to_string(), Duration::from_millis(3000)),
            ("storing".to_string(), Duration::from_millis(1500)),
        ])
    }

    pub fn with_stages(stages: Vec<(String, Duration)>) -> Self {
        let (names, durations) = stages.into_iter().unzip();
        Self {
            names,
            durations,
            started: Instant::now(),
        }
    }

    /// Total wall-clock length of the simulated timeline.
    pub fn total_duration(&self) -> Duration {
        self.durations.iter().sum()
    }
}

impl Default for SimulatedStages {
    fn default() -> Self {
        Self::new()
    }
}

impl StageSource for SimulatedStages {
    fn stage_names(&self) -> &[String] {
        &self.names
    }

    fn sample(&self) -> Option<StageSample> {
        let mut remaining = self.started.elapsed();
        for (index, duration) in self.durations.iter().enumerate() {
            if remaining < *duration {
                return Some(StageSample {
                    stage: index,
                    progress: remaining.as_secs_f64() / duration.as_secs_f64(),
                    finished: false,
                });
            }
            remaining -= *duration;
        }
        Some(StageSample {
            stage: self.names.len().saturating_sub(1),
            progress: 1.0,
            finished: true,
        })
    }
}
