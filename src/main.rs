//! tuinix installer - Main entry point

use anyhow::Result;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::stdout;
use tracing::{debug, error, info, warn};

use tuinix_installer::app::App;
use tuinix_installer::cli::{Cli, Commands, plan_disks};
use tuinix_installer::hardware::{self, DiskProbe, LsblkProbe, human_size};
use tuinix_installer::keys::GithubKeys;
use tuinix_installer::{
    InstallerError, InstallerSettings, ProcessGuard, StorageMode, Wizard, WizardState,
    calculate_storage_plan, diagnostics, process_guard,
};

/// Main application entry point
fn main() -> Result<()> {
    let cli = Cli::parse_args();
    let settings = cli.settings();

    // Logging goes to a file so it never draws over the TUI
    if let Err(e) = diagnostics::init(&settings.log_path) {
        eprintln!("warning: {:#}", e);
    }
    info!(dry_run = settings.dry_run, "tuinix installer starting");

    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }
    // Stops any tool still running when main returns
    let _guard = ProcessGuard::new();
    debug!("Process guard installed");

    match cli.command.unwrap_or(Commands::Install) {
        Commands::Install => run_tui_installer(settings),
        Commands::Plan {
            mode,
            size_gib,
            disks,
            json,
        } => print_plan(&settings, mode, &size_gib, &disks, json),
        Commands::Disks { json } => print_disks(json),
    }
}

/// Run the TUI installer
fn run_tui_installer(settings: InstallerSettings) -> Result<()> {
    if settings.dry_run {
        info!("Dry run: skipping privilege check");
    } else if !hardware::is_root() {
        error!("Not running as root");
        return Err(InstallerError::NotRoot.into());
    }

    enable_raw_mode().map_err(|e| InstallerError::terminal(format!("Failed to enable raw mode: {}", e)))?;
    crossterm::execute!(stdout(), EnterAlternateScreen)
        .map_err(|e| InstallerError::terminal(format!("Failed to enter alternate screen: {}", e)))?;

    let wizard = Wizard::new(Box::new(LsblkProbe), Box::new(GithubKeys::default()));
    let mut app = App::new(wizard, settings);
    let result = Terminal::new(CrosstermBackend::new(stdout()))
        .map_err(|e| anyhow::Error::from(InstallerError::terminal(format!("Failed to create terminal: {}", e))))
        .and_then(|mut terminal| app.run(&mut terminal));

    // Cleanup terminal (always attempt cleanup, even if app failed)
    let _ = disable_raw_mode();
    let _ = crossterm::execute!(stdout(), LeaveAlternateScreen);
    result?;

    let wizard = app.wizard();
    match wizard.state() {
        WizardState::Complete => {
            println!("✓ Installation complete. Remove the install media and reboot.");
        }
        WizardState::Error => {
            if let Some(failure) = wizard.failure() {
                eprintln!("✗ {} failed: {}", failure.stage.label(), failure.message);
                if failure.irrecoverable {
                    eprintln!("  The target disks are in an undefined state.");
                }
            }
            std::process::exit(1);
        }
        other => info!("Installer exited at {:?}", other),
    }
    Ok(())
}

/// `plan`: print the capacity plan and layout without touching anything
fn print_plan(
    settings: &InstallerSettings,
    mode: StorageMode,
    size_gib: &[u64],
    disks: &[String],
    json: bool,
) -> Result<()> {
    let plan = calculate_storage_plan(mode, &plan_disks(size_gib, disks), &settings.pool_name)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        println!("{}", plan.summary());
    }
    Ok(())
}

/// `disks`: list what the wizard would offer
fn print_disks(json: bool) -> Result<()> {
    let disks = LsblkProbe.enumerate();
    if json {
        println!("{}", serde_json::to_string_pretty(&disks)?);
        return Ok(());
    }
    for disk in disks {
        let raw = disk.size_bytes.map(human_size).unwrap_or_else(|| "unknown".into());
        println!("{:<16} {:>10} ({})  {}", disk.path, disk.size, raw, disk.model);
    }
    Ok(())
}
