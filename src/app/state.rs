//! Presentation state
//!
//! Everything the TUI keeps besides the wizard itself: the text being typed,
//! the list cursor, pipeline progress and the log tail. None of it feeds the
//! install configuration directly.

use crate::pipeline::{InstallStage, PipelineEvent};

/// Display state of one stage row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Pending,
    Running,
    Done,
    Failed,
}

/// Pipeline progress as reported through `PipelineEvent`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallProgress {
    pub stages: Vec<(InstallStage, StageStatus)>,
    /// 1-based index of the stage last reported
    pub current: usize,
    pub completed: usize,
}

impl InstallProgress {
    pub fn new(stages: &[InstallStage]) -> Self {
        Self {
            stages: stages.iter().map(|&s| (s, StageStatus::Pending)).collect(),
            current: 0,
            completed: 0,
        }
    }

    pub fn total(&self) -> usize {
        self.stages.len()
    }

    fn set(&mut self, index: usize, status: StageStatus) {
        if let Some(row) = index.checked_sub(1).and_then(|i| self.stages.get_mut(i)) {
            row.1 = status;
        }
    }

    pub fn apply(&mut self, event: &PipelineEvent) {
        match *event {
            PipelineEvent::StageStarted { index, .. } => {
                self.current = index;
                self.set(index, StageStatus::Running);
            }
            PipelineEvent::StageCompleted { index, .. } => {
                self.completed = self.completed.max(index);
                self.set(index, StageStatus::Done);
            }
            PipelineEvent::StageFailed { index, .. } => self.set(index, StageStatus::Failed),
            PipelineEvent::Finished { completed, .. } => self.completed = completed,
        }
    }

    /// Completed share of the run, 0..=100.
    pub fn percent(&self) -> u16 {
        if self.stages.is_empty() {
            return 0;
        }
        (self.completed * 100 / self.total()) as u16
    }

    /// Label of the running stage, if any.
    pub fn current_label(&self) -> Option<&'static str> {
        self.current
            .checked_sub(1)
            .and_then(|i| self.stages.get(i))
            .map(|(stage, _)| stage.label())
    }
}

/// Main application state
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Text field contents for the current step
    pub input: String,
    /// Highlighted row in list steps
    pub cursor: usize,
    pub progress: Option<InstallProgress>,
    /// Last lines of the diagnostics log
    pub log_tail: Vec<String>,
    pub dry_run: bool,
    /// A connectivity probe is in flight
    pub probing: bool,
    /// GitHub handle whose keys are being looked up
    pub fetching_keys: Option<String>,
    /// Set once the operator asked to leave
    pub should_quit: bool,
}

impl AppState {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// Reset per-step fields after the wizard moved.
    pub fn enter_step(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }

    pub fn cursor_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_down(&mut self, len: usize) {
        if self.cursor + 1 < len {
            self.cursor += 1;
        }
    }

    /// Take the typed text, leaving the field empty.
    pub fn take_input(&mut self) -> String {
        std::mem::take(&mut self.input)
    }
}
