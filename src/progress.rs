//! Watch-mode progress reporting.
//!
//! Reports observable progress during `docq process watch` (and `docq
//! health --watch`) so users see which pipeline stage is running and how
//! far along it is. Progress is emitted on **stderr** so stdout remains
//! parseable for scripts.

use std::io::Write;

/// A single progress event while watching a processing task.
#[derive(Clone, Debug)]
pub enum WatchEvent {
    /// No task data yet (just created, or still `PENDING`).
    Waiting { project: String },
    /// A pipeline stage is running.
    Stage {
        project: String,
        stage: String,
        stage_index: usize,
        stage_count: usize,
        /// Progress within the stage, in `[0, 1]`.
        progress: f64,
    },
    /// The task reached a terminal status.
    Done { project: String, status: String },
}

/// Reports watch progress. Implementations write to stderr (human or JSON).
pub trait WatchReporter: Send + Sync {
    /// Emit a progress event. Called once per poll tick.
    fn report(&self, event: WatchEvent);
}

/// Human-friendly progress on stderr: "process docs  embedding (2/3)  45%".
pub struct StderrWatch;

impl WatchReporter for StderrWatch {
    fn report(&self, event: WatchEvent) {
        let line = match &event {
            WatchEvent::Waiting { project } => {
                format!("process {}  waiting...\n", project)
            }
            WatchEvent::Stage {
                project,
                stage,
                stage_index,
                stage_count,
                progress,
            } => {
                format!(
                    "process {}  {} ({}/{})  {}\n",
                    project,
                    stage,
                    stage_index + 1,
                    stage_count,
                    format_percent(*progress)
                )
            }
            WatchEvent::Done { project, status } => {
                format!("process {}  done: {}\n", project, status)
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonWatch;

impl WatchReporter for JsonWatch {
    fn report(&self, event: WatchEvent) {
        let obj = match &event {
            WatchEvent::Waiting { project } => serde_json::json!({
                "event": "progress",
                "project": project,
                "phase": "waiting"
            }),
            WatchEvent::Stage {
                project,
                stage,
                stage_index,
                stage_count,
                progress,
            } => serde_json::json!({
                "event": "progress",
                "project": project,
                "phase": "stage",
                "stage": stage,
                "stage_index": stage_index,
                "stage_count": stage_count,
                "progress": progress
            }),
            WatchEvent::Done { project, status } => serde_json::json!({
                "event": "done",
                "project": project,
                "status": status
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoWatch;

impl WatchReporter for NoWatch {
    fn report(&self, _event: WatchEvent) {}
}

fn format_percent(progress: f64) -> String {
    format!("{:>3.0}%", (progress.clamp(0.0, 1.0)) * 100.0)
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "off" => Some(ProgressMode::Off),
            "human" => Some(ProgressMode::Human),
            "json" => Some(ProgressMode::Json),
            _ => None,
        }
    }

    /// Build a reporter for this mode. Caller passes it to the watch loop.
    pub fn reporter(&self) -> Box<dyn WatchReporter> {
        match self {
            ProgressMode::Off => Box::new(NoWatch),
            ProgressMode::Human => Box::new(StderrWatch),
            ProgressMode::Json => Box::new(JsonWatch),
        }
    }
}
