//! Wizard screens
//!
//! One function per kind of step. Every function only reads the wizard and
//! the presentation state.
//!
//! # Safety
//!
//! - Secret fields are echoed as bullets, never as text
//! - The confirmation step names every disk that will be erased

use crate::app::{AppState, InstallProgress, StageStatus};
use crate::hardware::NetworkState;
use crate::theme::{Styles, Theme, UiText};
use crate::ui::header::render_progress_bar;
use crate::wizard::{CONFIRMATION_PHRASE, Wizard, WizardState};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

const MASK: char = '•';

fn panel(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Styles::border())
        .title(Span::styled(format!(" {} ", title), Styles::title()))
        .style(Styles::panel_bg())
}

/// Field text as it should be echoed.
pub fn echo(state: WizardState, input: &str) -> String {
    if state.is_secret() {
        std::iter::repeat_n(MASK, input.chars().count()).collect()
    } else {
        input.to_string()
    }
}

// ============================================================================
// Network check
// ============================================================================

pub fn render_network_check(f: &mut Frame, area: Rect, wizard: &Wizard, state: &AppState) {
    let line = match (state.probing, wizard.network()) {
        (true, _) | (false, None) => Line::styled(UiText::CHECKING_NETWORK, Styles::text()),
        (false, Some(NetworkState::Online)) => Line::styled("✓ Connected", Styles::success()),
        (false, Some(NetworkState::Offline)) => Line::styled(
            "✗ No internet connection. Connect a network, then press Enter to retry.",
            Styles::error(),
        ),
    };
    let body = Paragraph::new(vec![
        Line::from(""),
        line,
        Line::from(""),
        Line::styled(
            "The installer downloads packages from cache.nixos.org and GitHub.",
            Styles::text_muted(),
        ),
    ])
    .alignment(Alignment::Center)
    .block(panel(WizardState::NetworkCheck.title()));
    f.render_widget(body, area);
}

// ============================================================================
// Text steps
// ============================================================================

pub fn render_text_step(f: &mut Frame, area: Rect, wizard: &Wizard, state: &AppState) {
    let current = wizard.state();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let field = if state.input.is_empty() {
        Line::styled(current.placeholder(), Styles::text_muted())
    } else {
        Line::from(vec![
            Span::styled(echo(current, &state.input), Styles::text()),
            Span::styled("█", Styles::text_secondary()),
        ])
    };
    let block = if current == WizardState::Confirm {
        panel(current.title()).style(Styles::panel_bg_danger())
    } else {
        panel(current.title())
    };
    f.render_widget(Paragraph::new(field).block(block), chunks[0]);

    if current == WizardState::Confirm {
        render_destroy_warning(f, chunks[1], wizard);
    } else if current == WizardState::GithubUser && state.fetching_keys.is_some() {
        f.render_widget(
            Paragraph::new(Line::styled(UiText::FETCHING_KEYS, Styles::warning())),
            chunks[1],
        );
    }
}

fn render_destroy_warning(f: &mut Frame, area: Rect, wizard: &Wizard) {
    let targets = wizard.config().target_disks();
    let mut lines = vec![
        Line::from(""),
        Line::styled(
            "ALL DATA on the following disk(s) will be erased:",
            Styles::error().add_modifier(Modifier::BOLD),
        ),
    ];
    lines.extend(
        targets
            .iter()
            .map(|d| Line::styled(format!("  {}", d), Styles::warning())),
    );
    lines.push(Line::from(""));
    lines.push(Line::styled(
        format!("Type {} and press Enter to begin.", CONFIRMATION_PHRASE),
        Styles::text(),
    ));
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
}

// ============================================================================
// List steps
// ============================================================================

pub fn render_choice_step(f: &mut Frame, area: Rect, wizard: &Wizard, state: &AppState) {
    let current = wizard.state();
    let multi = current == WizardState::DiskMulti;
    let selected = wizard.selected();

    let items: Vec<ListItem> = wizard
        .options()
        .into_iter()
        .enumerate()
        .map(|(i, label)| {
            let text = if multi {
                let mark = if selected.get(i).copied().unwrap_or(false) { "[x]" } else { "[ ]" };
                format!("{} {}", mark, label)
            } else {
                label
            };
            ListItem::new(text)
        })
        .collect();

    let mut title = current.title().to_string();
    if multi {
        let mode = wizard.config().storage_mode;
        title = format!("{} (at least {})", title, mode.minimum_device_count());
    }

    let list = List::new(items)
        .block(panel(&title))
        .style(Styles::text())
        .highlight_style(Styles::selected())
        .highlight_symbol("> ");
    let mut list_state = ListState::default().with_selected(Some(state.cursor));
    f.render_stateful_widget(list, area, &mut list_state);
}

// ============================================================================
// Summary
// ============================================================================

pub fn render_summary(f: &mut Frame, area: Rect, wizard: &Wizard) {
    let lines: Vec<Line> = wizard
        .summary()
        .into_iter()
        .map(|(key, value)| {
            Line::from(vec![
                Span::styled(format!("{:>10}: ", key), Styles::text_secondary()),
                Span::styled(value, Styles::text()),
            ])
        })
        .collect();
    let body = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel(WizardState::Summary.title()));
    f.render_widget(body, area);
}

// ============================================================================
// Installing / terminal states
// ============================================================================

pub fn render_installing(f: &mut Frame, area: Rect, progress: Option<&InstallProgress>, log_tail: &[String]) {
    let Some(progress) = progress else {
        return;
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(progress.total() as u16 + 2),
            Constraint::Length(log_tail.len() as u16 + 2),
        ])
        .split(area);

    let label = progress.current_label().unwrap_or("Starting");
    render_progress_bar(f, chunks[0], progress.percent(), label);

    let rows: Vec<Line> = progress
        .stages
        .iter()
        .enumerate()
        .map(|(i, (stage, status))| {
            Line::styled(
                format!("{} {}/{} {}", Theme::step_icon(*status), i + 1, progress.total(), stage.label()),
                Theme::step_style(*status),
            )
        })
        .collect();
    f.render_widget(Paragraph::new(rows).block(panel("Stages")), chunks[1]);

    let tail: Vec<Line> = log_tail
        .iter()
        .map(|l| Line::styled(l.clone(), Styles::text_muted()))
        .collect();
    f.render_widget(Paragraph::new(tail).block(panel("Log")), chunks[2]);
}

pub fn render_complete(f: &mut Frame, area: Rect, wizard: &Wizard) {
    let host = &wizard.config().hostname;
    let body = Paragraph::new(vec![
        Line::from(""),
        Line::styled("✓ Installation complete", Styles::success().add_modifier(Modifier::BOLD)),
        Line::from(""),
        Line::styled(format!("{} is ready. Remove the install media and reboot.", host), Styles::text()),
        Line::styled(
            "The install log was copied to the new user's home directory.",
            Styles::text_muted(),
        ),
    ])
    .alignment(Alignment::Center)
    .block(panel(WizardState::Complete.title()));
    f.render_widget(body, area);
}

pub fn render_error(f: &mut Frame, area: Rect, wizard: &Wizard, progress: Option<&InstallProgress>) {
    let mut lines = vec![Line::from("")];
    match wizard.failure() {
        Some(failure) => {
            lines.push(Line::styled(
                format!("✗ {} failed", failure.stage.label()),
                Styles::error().add_modifier(Modifier::BOLD),
            ));
            lines.push(Line::from(""));
            lines.push(Line::styled(failure.message.clone(), Styles::text()));
            lines.push(Line::from(""));
            if failure.irrecoverable {
                lines.push(Line::styled(
                    "The target disks were modified and are in an undefined state.",
                    Styles::warning(),
                ));
            } else {
                lines.push(Line::styled("No disks were modified.", Styles::text_secondary()));
            }
        }
        None => lines.push(Line::styled("Installation failed", Styles::error())),
    }
    if let Some(progress) = progress {
        let done = progress
            .stages
            .iter()
            .filter(|(_, s)| *s == StageStatus::Done)
            .count();
        lines.push(Line::styled(
            format!("{} of {} stages completed.", done, progress.total()),
            Styles::text_muted(),
        ));
    }
    let body = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel(WizardState::Error.title()));
    f.render_widget(body, area);
}
