//! Colors, styles and fixed strings for the installer screens.
//!
//! ```rust
//! use tuinix_installer::theme::{Colors, Styles};
//! use ratatui::style::Style;
//!
//! let banner = Style::default().fg(Colors::ACCENT);
//! let heading = Styles::title();
//! ```

use crate::app::StageStatus;
use ratatui::style::{Color, Modifier, Style};

// =============================================================================
// PALETTE
// =============================================================================

/// tuinix palette: deep blue panels with a Nix-blue accent.
pub struct Colors;

impl Colors {
    pub const PANEL: Color = Color::Rgb(16, 22, 36);
    /// Confirmation panel before disks are wiped
    pub const PANEL_DANGER: Color = Color::Rgb(48, 14, 18);
    pub const TRACK: Color = Color::Rgb(36, 44, 60);

    pub const INK: Color = Color::White;
    pub const INK_DIM: Color = Color::Gray;
    pub const INK_FAINT: Color = Color::DarkGray;

    /// Borders, headings and the banner
    pub const ACCENT: Color = Color::Rgb(126, 186, 228);
    pub const HIGHLIGHT: Color = Color::Rgb(82, 119, 195);

    pub const OK: Color = Color::Green;
    pub const CAUTION: Color = Color::Yellow;
    pub const FAIL: Color = Color::LightRed;
}

// =============================================================================
// STYLES
// =============================================================================

pub struct Styles;

impl Styles {
    pub fn text() -> Style {
        Style::default().fg(Colors::INK)
    }

    pub fn text_muted() -> Style {
        Style::default().fg(Colors::INK_FAINT)
    }

    pub fn text_secondary() -> Style {
        Style::default().fg(Colors::INK_DIM)
    }

    pub fn title() -> Style {
        Style::default().fg(Colors::ACCENT).add_modifier(Modifier::BOLD)
    }

    pub fn border() -> Style {
        Style::default().fg(Colors::ACCENT)
    }

    pub fn panel_bg() -> Style {
        Style::default().bg(Colors::PANEL)
    }

    pub fn panel_bg_danger() -> Style {
        Style::default().bg(Colors::PANEL_DANGER)
    }

    /// Cursor row in a list
    pub fn selected() -> Style {
        Style::default()
            .fg(Colors::INK)
            .bg(Colors::HIGHLIGHT)
            .add_modifier(Modifier::BOLD)
    }

    pub fn success() -> Style {
        Style::default().fg(Colors::OK)
    }

    pub fn warning() -> Style {
        Style::default().fg(Colors::CAUTION)
    }

    pub fn error() -> Style {
        Style::default().fg(Colors::FAIL).add_modifier(Modifier::BOLD)
    }

    pub fn progress() -> Style {
        Style::default().fg(Colors::ACCENT).bg(Colors::TRACK)
    }

    pub fn nav_hint() -> Style {
        Style::default().fg(Colors::INK_FAINT)
    }
}

// =============================================================================
// STAGE LIST
// =============================================================================

/// Per-status look of the stage list on the install screen.
pub struct Theme;

impl Theme {
    pub fn step_style(status: StageStatus) -> Style {
        match status {
            StageStatus::Pending => Style::default().fg(Colors::INK_FAINT),
            StageStatus::Running => Style::default()
                .fg(Colors::CAUTION)
                .add_modifier(Modifier::BOLD),
            StageStatus::Done => Style::default().fg(Colors::OK),
            StageStatus::Failed => Style::default().fg(Colors::FAIL),
        }
    }

    pub fn step_icon(status: StageStatus) -> &'static str {
        match status {
            StageStatus::Pending => "·",
            StageStatus::Running => "▶",
            StageStatus::Done => "✓",
            StageStatus::Failed => "✗",
        }
    }
}

// =============================================================================
// STRINGS
// =============================================================================

/// Key hints and fixed messages.
pub struct UiText;

impl UiText {
    pub const NAV_TEXT: &'static str = "Enter: continue  •  q / Ctrl+C: quit";
    pub const NAV_LIST: &'static str = "↑/↓ j/k: move  •  Enter: select  •  q: quit";
    pub const NAV_MULTI: &'static str = "↑/↓: move  •  Space: toggle  •  Enter: continue  •  q: quit";
    pub const NAV_INSTALLING: &'static str = "Installing, please wait. Quitting is disabled.";
    pub const NAV_DONE: &'static str = "Enter / q: exit";
    pub const CHECKING_NETWORK: &'static str = "Checking internet connectivity...";
    pub const FETCHING_KEYS: &'static str = "Fetching public keys from GitHub...";
}
