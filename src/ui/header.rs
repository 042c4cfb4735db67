//! Header and common widget rendering
//!
//! The ASCII art banner, the progress gauge and the navigation hint line.

use crate::theme::{Colors, Styles};
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
};

const BANNER: [&str; 5] = [
    "████████╗██╗   ██╗██╗███╗   ██╗██╗██╗  ██╗",
    "╚══██╔══╝██║   ██║██║████╗  ██║██║╚██╗██╔╝",
    "   ██║   ██║   ██║██║██╔██╗ ██║██║ ╚███╔╝ ",
    "   ██║   ╚██████╔╝██║██║ ╚████║██║██╔╝ ██╗",
    "   ╚═╝    ╚═════╝ ╚═╝╚═╝  ╚═══╝╚═╝╚═╝  ╚═╝",
];

/// Rows taken by the banner plus its subtitle.
pub const HEADER_HEIGHT: u16 = BANNER.len() as u16 + 1;

/// Header renderer containing the ASCII art banner
pub struct HeaderRenderer {
    header_lines: Vec<Line<'static>>,
}

impl Default for HeaderRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderRenderer {
    pub fn new() -> Self {
        Self {
            header_lines: Self::create_header(),
        }
    }

    /// Render the banner; `dry_run` adds a warning to the subtitle.
    pub fn render_header(&self, f: &mut Frame, area: Rect, dry_run: bool) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let mut lines = self.header_lines.clone();
        let subtitle = if dry_run {
            Span::styled("NixOS installer  [DRY RUN: no disks will be touched]", Styles::warning())
        } else {
            Span::styled("NixOS installer", Styles::text_secondary())
        };
        lines.push(Line::from(subtitle));

        let header = Paragraph::new(lines)
            .block(Block::default().borders(Borders::NONE))
            .alignment(Alignment::Center);
        f.render_widget(header, area);
    }

    fn create_header() -> Vec<Line<'static>> {
        BANNER
            .iter()
            .map(|row| Line::from(Span::styled(*row, Style::default().fg(Colors::ACCENT))))
            .collect()
    }
}

/// Render the key hint line
pub fn render_nav_hint(f: &mut Frame, area: Rect, text: &str) {
    let hint = Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(Styles::nav_hint());
    f.render_widget(hint, area);
}

/// Render progress bar
pub fn render_progress_bar(f: &mut Frame, area: Rect, percent: u16, label: &str) {
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Styles::border())
                .title("Installation Progress"),
        )
        .gauge_style(Styles::progress())
        .label(format!("{}% {}", percent.min(100), label))
        .percent(percent.min(100));
    f.render_widget(gauge, area);
}
