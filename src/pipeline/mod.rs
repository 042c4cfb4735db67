//! Install pipeline
//!
//! Runs the stages that apply to the frozen configuration's storage mode, in
//! order, through a `StageExecutor`. Progress is reported through a callback;
//! the first failure ends the run. Nothing is retried or rolled back.

pub mod stages;

pub use stages::InstallStage;

use crate::config::FrozenConfig;
use thiserror::Error;

/// Performs the work behind one stage.
///
/// The production implementation is `provision::CommandProvisioner`; tests
/// substitute scripted executors.
pub trait StageExecutor {
    fn execute(&mut self, stage: InstallStage, config: &FrozenConfig) -> anyhow::Result<()>;
}

/// Progress notifications. `index` is 1-based over the included stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    StageStarted {
        index: usize,
        total: usize,
        stage: InstallStage,
    },
    StageCompleted {
        index: usize,
        total: usize,
        stage: InstallStage,
    },
    StageFailed {
        index: usize,
        stage: InstallStage,
        message: String,
    },
    Finished {
        completed: usize,
        total: usize,
    },
}

/// A stage failed; the run stopped there.
#[derive(Error, Debug)]
#[error("{}: {:#}", .stage.label(), .source)]
pub struct PipelineError {
    pub stage: InstallStage,
    /// 1-based position among the included stages
    pub index: usize,
    pub source: anyhow::Error,
}

impl PipelineError {
    /// True once the target disks may have been touched.
    pub fn is_irrecoverable(&self) -> bool {
        self.stage.ordinal() >= InstallStage::FormatDisks.ordinal()
    }

    /// Cause chain without the stage label.
    pub fn message(&self) -> String {
        format!("{:#}", self.source)
    }
}

/// One-shot run over a frozen configuration.
pub struct InstallPipeline {
    config: FrozenConfig,
    stages: Vec<InstallStage>,
}

impl InstallPipeline {
    pub fn new(config: FrozenConfig) -> Self {
        let stages = InstallStage::for_mode(config.storage_mode);
        Self { config, stages }
    }

    pub fn stages(&self) -> &[InstallStage] {
        &self.stages
    }

    pub fn config(&self) -> &FrozenConfig {
        &self.config
    }

    /// Execute every included stage. Returns the number completed, which
    /// equals `stages().len()` on success.
    ///
    /// # Errors
    ///
    /// The first stage failure, wrapped with the stage and its index.
    pub fn run<E, F>(self, executor: &mut E, mut on_event: F) -> Result<usize, PipelineError>
    where
        E: StageExecutor + ?Sized,
        F: FnMut(PipelineEvent),
    {
        let total = self.stages.len();
        tracing::info!(
            mode = %self.config.storage_mode,
            total,
            "Starting install pipeline"
        );

        for (i, &stage) in self.stages.iter().enumerate() {
            let index = i + 1;
            tracing::info!("[{}/{}] {}", index, total, stage.label());
            on_event(PipelineEvent::StageStarted { index, total, stage });

            if let Err(source) = executor.execute(stage, &self.config) {
                let err = PipelineError { stage, index, source };
                tracing::error!("Stage {} failed: {}", index, err);
                on_event(PipelineEvent::StageFailed {
                    index,
                    stage,
                    message: err.message(),
                });
                return Err(err);
            }

            on_event(PipelineEvent::StageCompleted { index, total, stage });
        }

        tracing::info!("Install pipeline finished ({} stages)", total);
        on_event(PipelineEvent::Finished {
            completed: total,
            total,
        });
        Ok(total)
    }
}
