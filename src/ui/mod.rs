//! User interface rendering module
//!
//! - `header` - Banner, progress gauge and key hints
//! - `screens` - One renderer per kind of wizard step
//!
//! Rendering is read-only: it takes the wizard and the presentation state by
//! shared reference and draws a frame.

pub mod header;
pub mod screens;

use crate::app::AppState;
use crate::theme::{Styles, UiText};
use crate::wizard::{Wizard, WizardState};
use header::{HEADER_HEIGHT, HeaderRenderer, render_nav_hint};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::Line,
    widgets::{Paragraph, Wrap},
};

/// Draws one frame of the installer.
pub struct UiRenderer {
    header: HeaderRenderer,
}

impl Default for UiRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl UiRenderer {
    pub fn new() -> Self {
        Self {
            header: HeaderRenderer::new(),
        }
    }

    pub fn render(&self, f: &mut Frame, wizard: &Wizard, state: &AppState) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT),
                Constraint::Length(1),
                Constraint::Min(5),
                Constraint::Length(2),
                Constraint::Length(1),
            ])
            .split(f.area());

        self.header.render_header(f, chunks[0], state.dry_run);
        render_step_line(f, chunks[1], wizard.state());

        let current = wizard.state();
        let body = chunks[2];
        match current {
            WizardState::NetworkCheck => screens::render_network_check(f, body, wizard, state),
            WizardState::Summary => screens::render_summary(f, body, wizard),
            WizardState::Installing => {
                screens::render_installing(f, body, state.progress.as_ref(), &state.log_tail)
            }
            WizardState::Complete => screens::render_complete(f, body, wizard),
            WizardState::Error => screens::render_error(f, body, wizard, state.progress.as_ref()),
            s if s.takes_choice() => screens::render_choice_step(f, body, wizard, state),
            _ => screens::render_text_step(f, body, wizard, state),
        }

        if let Some(err) = wizard.error() {
            let msg = Paragraph::new(Line::styled(format!("✗ {}", err), Styles::error()))
                .wrap(Wrap { trim: true });
            f.render_widget(msg, chunks[3]);
        }

        render_nav_hint(f, chunks[4], nav_text(current));
    }
}

fn render_step_line(f: &mut Frame, area: Rect, state: WizardState) {
    let text = match state.step_number() {
        Some(n) => format!("Step {} of {}", n, WizardState::TOTAL_STEPS),
        None => String::new(),
    };
    f.render_widget(
        Paragraph::new(text)
            .alignment(ratatui::layout::Alignment::Center)
            .style(Styles::text_secondary()),
        area,
    );
}

fn nav_text(state: WizardState) -> &'static str {
    match state {
        WizardState::Installing => UiText::NAV_INSTALLING,
        WizardState::DiskMulti => UiText::NAV_MULTI,
        s if s.is_terminal() => UiText::NAV_DONE,
        s if s.takes_choice() => UiText::NAV_LIST,
        _ => UiText::NAV_TEXT,
    }
}
