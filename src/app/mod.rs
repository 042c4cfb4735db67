//! Application module
//!
//! Owns the wizard, turns key events into `WizardInput`s and runs the
//! install pipeline on a worker thread.
//!
//! # Module Structure
//! - `state` - Presentation state (input buffer, cursor, progress, log tail)
//! - Main module - App struct and event loop
//!
//! # Threads
//!
//! The UI thread is the only one that touches the wizard. The network probe,
//! the SSH key lookup, the pipeline and the log-tail poller report through
//! channels that the loop drains with `try_recv` between frames.

mod state;

pub use state::{AppState, InstallProgress, StageStatus};

use crate::config::{FrozenConfig, InstallerSettings};
use crate::diagnostics;
use crate::hardware::{self, NetworkState};
use crate::pipeline::{InstallPipeline, InstallStage, PipelineError, PipelineEvent, StageExecutor};
use crate::provision::CommandProvisioner;
use crate::ui::UiRenderer;
use crate::wizard::{Transition, Wizard, WizardInput, WizardState};
use anyhow::{Context, Result};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{Terminal, backend::Backend};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Key poll interval of the main loop.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Messages sent from worker threads to the main UI thread
#[derive(Debug)]
pub enum AppMessage {
    Network(NetworkState),
    /// GitHub key lookup finished
    Keys {
        handle: String,
        keys: Result<Vec<String>, String>,
    },
    Pipeline(PipelineEvent),
    /// The pipeline thread is done
    Finished(Result<(), PipelineError>),
}

/// Executor handed to the pipeline thread.
pub type BoxedExecutor = Box<dyn StageExecutor + Send>;

/// Main application struct
pub struct App {
    wizard: Wizard,
    state: AppState,
    settings: InstallerSettings,
    ui_renderer: UiRenderer,
    /// Replaces `CommandProvisioner` when set
    executor: Option<BoxedExecutor>,
    tx: Sender<AppMessage>,
    rx: Receiver<AppMessage>,
    tail_rx: Option<Receiver<Vec<String>>>,
    worker: Option<JoinHandle<()>>,
}

impl App {
    pub fn new(wizard: Wizard, settings: InstallerSettings) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            wizard,
            state: AppState::new(settings.dry_run),
            settings,
            ui_renderer: UiRenderer::new(),
            executor: None,
            tx,
            rx,
            tail_rx: None,
            worker: None,
        }
    }

    /// Run the pipeline through `executor` instead of the real tools.
    pub fn with_executor(mut self, executor: BoxedExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn wizard(&self) -> &Wizard {
        &self.wizard
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the main application loop until the operator quits or the
    /// install reaches a terminal screen and is dismissed.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        tracing::info!("Starting main application loop");
        self.start_network_probe();

        while !self.state.should_quit {
            self.poll_messages();

            terminal
                .draw(|f| self.ui_renderer.render(f, &self.wizard, &self.state))
                .context("Failed to draw frame")?;

            if crossterm::event::poll(POLL_INTERVAL)? {
                if let Event::Key(key) = crossterm::event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }
        }

        if let Some(worker) = self.worker.take() {
            // Only reachable after Finished, so this does not block
            let _ = worker.join();
        }
        tracing::info!("Leaving main loop in {:?}", self.wizard.state());
        Ok(())
    }

    /// Drain every pending worker message.
    pub fn poll_messages(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            self.handle_message(msg);
        }
        if let Some(rx) = &self.tail_rx {
            while let Ok(lines) = rx.try_recv() {
                self.state.log_tail = lines;
            }
        }
    }

    pub fn handle_message(&mut self, msg: AppMessage) {
        match msg {
            AppMessage::Network(net) => {
                self.state.probing = false;
                tracing::info!("Network check: {}", net);
                self.apply(WizardInput::Network(net));
            }
            AppMessage::Keys { handle, keys } => {
                self.state.fetching_keys = None;
                self.apply(WizardInput::KeysFetched { handle, keys });
            }
            AppMessage::Pipeline(event) => {
                if let Some(progress) = self.state.progress.as_mut() {
                    progress.apply(&event);
                }
            }
            AppMessage::Finished(result) => {
                let next = self.wizard.finish(result);
                tracing::info!("Install finished in {:?}", next);
                // Dropping the receiver stops the tail poller
                self.tail_rx = None;
                if let Some(worker) = self.worker.take() {
                    let _ = worker.join();
                }
            }
        }
    }

    /// Handle keyboard input events
    pub fn handle_key(&mut self, key: KeyEvent) {
        let current = self.wizard.state();
        let ctrl_c = key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c');
        let quit = ctrl_c || (key.code == KeyCode::Char('q') && !current.takes_text());

        if current == WizardState::Installing {
            if quit {
                tracing::info!("Quit ignored while installing");
            }
            return;
        }

        if current.is_terminal() {
            if quit || key.code == KeyCode::Enter || key.code == KeyCode::Esc {
                self.state.should_quit = true;
            }
            return;
        }

        if quit {
            self.apply(WizardInput::Abort);
            return;
        }

        if self.state.fetching_keys.is_some() {
            return;
        }

        if current.takes_text() {
            match key.code {
                KeyCode::Char(c) => self.state.input.push(c),
                KeyCode::Backspace => {
                    self.state.input.pop();
                }
                KeyCode::Enter if current == WizardState::GithubUser => self.start_key_fetch(),
                KeyCode::Enter => {
                    let text = self.state.take_input();
                    self.apply(WizardInput::Text(text));
                }
                _ => {}
            }
            return;
        }

        if current.takes_choice() {
            let len = self.wizard.options().len();
            match key.code {
                KeyCode::Up | KeyCode::Char('k') => self.state.cursor_up(),
                KeyCode::Down | KeyCode::Char('j') => self.state.cursor_down(len),
                KeyCode::Char(' ') if current == WizardState::DiskMulti => {
                    self.apply(WizardInput::ToggleDisk(self.state.cursor));
                }
                KeyCode::Enter if current == WizardState::DiskMulti => {
                    self.apply(WizardInput::Continue);
                }
                KeyCode::Enter => self.apply(WizardInput::Choice(self.state.cursor)),
                _ => {}
            }
            return;
        }

        if key.code == KeyCode::Enter {
            if current == WizardState::NetworkCheck && self.wizard.network() != Some(NetworkState::Online) {
                self.start_network_probe();
            } else {
                self.apply(WizardInput::Continue);
            }
        }
    }

    fn apply(&mut self, input: WizardInput) {
        match self.wizard.handle(input) {
            Transition::Moved(_) => self.state.enter_step(),
            Transition::Ready(config) => {
                self.state.enter_step();
                self.start_install(config);
            }
            Transition::Aborted => self.state.should_quit = true,
            Transition::Stayed | Transition::Ignored => {}
        }
    }

    fn start_network_probe(&mut self) {
        if self.state.probing {
            return;
        }
        self.state.probing = true;
        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name("network-probe".into())
            .spawn(move || {
                let _ = tx.send(AppMessage::Network(hardware::detect_internet()));
            });
        if let Err(e) = spawned {
            tracing::error!("Failed to spawn network probe: {}", e);
            self.state.probing = false;
            self.apply(WizardInput::Network(NetworkState::Offline));
        }
    }

    /// Look up the typed handle on a worker thread. The field keeps its text
    /// until the reply arrives.
    fn start_key_fetch(&mut self) {
        let handle = self.state.input.trim().to_string();
        if handle.is_empty() {
            let text = self.state.take_input();
            self.apply(WizardInput::Text(text));
            return;
        }

        self.state.fetching_keys = Some(handle.clone());
        let retriever = self.wizard.key_retriever();
        let tx = self.tx.clone();
        let worker_handle = handle.clone();
        let spawned = thread::Builder::new()
            .name("key-fetch".into())
            .spawn(move || {
                let keys = retriever
                    .fetch(&worker_handle)
                    .map_err(|e| format!("{:#}", e));
                let _ = tx.send(AppMessage::Keys {
                    handle: worker_handle,
                    keys,
                });
            });
        if let Err(e) = spawned {
            tracing::error!("Failed to spawn key fetch: {}", e);
            self.state.fetching_keys = None;
            self.apply(WizardInput::KeysFetched {
                handle,
                keys: Err(format!("could not start key lookup: {}", e)),
            });
        }
    }

    fn start_install(&mut self, config: FrozenConfig) {
        let pipeline = InstallPipeline::new(config);
        self.state.progress = Some(InstallProgress::new(pipeline.stages()));

        let (tail_tx, tail_rx) = mpsc::channel();
        match diagnostics::spawn_tail_poller(
            self.settings.log_path.clone(),
            diagnostics::TAIL_LINES,
            diagnostics::TAIL_INTERVAL,
            tail_tx,
        ) {
            Ok(_) => self.tail_rx = Some(tail_rx),
            Err(e) => tracing::warn!("Log tail unavailable: {}", e),
        }

        let mut executor: BoxedExecutor = match self.executor.take() {
            Some(executor) => executor,
            None => Box::new(CommandProvisioner::new(self.settings.clone())),
        };
        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name("install-pipeline".into())
            .spawn(move || {
                let events = tx.clone();
                let result = pipeline.run(executor.as_mut(), |event| {
                    let _ = events.send(AppMessage::Pipeline(event));
                });
                let _ = tx.send(AppMessage::Finished(result.map(|_| ())));
            });

        match spawned {
            Ok(handle) => self.worker = Some(handle),
            Err(e) => {
                tracing::error!("Failed to spawn install thread: {}", e);
                self.wizard.finish(Err(PipelineError {
                    stage: InstallStage::GenerateHostConfig,
                    index: 1,
                    source: anyhow::anyhow!("could not start install thread: {}", e),
                }));
                self.tail_rx = None;
            }
        }
    }
}
