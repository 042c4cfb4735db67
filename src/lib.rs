//! tuinix installer library
//!
//! A configuration wizard, a storage-layout planner and the install pipeline
//! that provisions a tuinix (NixOS) system on ZFS or XFS.

pub mod app;
pub mod cli;
pub mod command_runner;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod hardware;
pub mod keys;
pub mod pipeline;
pub mod process_guard;
pub mod provision;
pub mod theme;
pub mod types;
pub mod ui;
pub mod validation;
pub mod wizard;

// Re-export main types for convenience
pub use config::{Config, FrozenConfig, InstallerSettings};
pub use error::{InstallerError, PlanningError, ValidationError};
pub use process_guard::{ChildRegistry, CommandProcessGroup, ProcessGuard};
pub use types::{Disk, Redundancy, StorageMode};

// Wizard state machine
pub use wizard::{Transition, Wizard, WizardInput, WizardState};

// Storage engine
pub use engine::storage::{CapacityPlan, PoolLayout, StoragePlan, calculate_storage_plan, plan_capacity};

// Install pipeline
pub use pipeline::{InstallPipeline, InstallStage, PipelineError, PipelineEvent, StageExecutor};
pub use provision::CommandProvisioner;
