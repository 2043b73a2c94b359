//! Centralized theme and styling for the TUI
//!
//! Colors, pre-built styles and layout constants used by the checklist
//! screens. Components use these instead of constructing styles inline.

use ratatui::style::{Color, Modifier, Style};

// =============================================================================
// COLOR PALETTE
// =============================================================================

/// Checklist palette
pub struct Colors;

impl Colors {
    /// Dialog and overlay background
    pub const BACKGROUND: Color = Color::Rgb(20, 20, 30);
    pub const TEXT: Color = Color::White;
    pub const TEXT_DIM: Color = Color::Gray;
    pub const TEXT_FAINT: Color = Color::DarkGray;

    /// Borders, the title and checkbox marks
    pub const ACCENT: Color = Color::Cyan;
    /// Category names and the cursor row
    pub const HIGHLIGHT: Color = Color::Yellow;
    /// Text drawn on a highlighted background
    pub const ON_HIGHLIGHT: Color = Color::Black;

    pub const OK: Color = Color::Green;
    pub const WARN: Color = Color::Yellow;
}

// =============================================================================
// PRE-BUILT STYLES
// =============================================================================

/// Pre-built styles for common UI patterns
pub struct Styles;

impl Styles {
    fn bold(color: Color) -> Style {
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    /// Bold dark text on a filled background
    fn filled(bg: Color) -> Style {
        Self::bold(Colors::ON_HIGHLIGHT).bg(bg)
    }

    pub fn text() -> Style {
        Style::default().fg(Colors::TEXT)
    }

    pub fn text_muted() -> Style {
        Style::default().fg(Colors::TEXT_FAINT)
    }

    pub fn text_secondary() -> Style {
        Style::default().fg(Colors::TEXT_DIM)
    }

    pub fn text_bold() -> Style {
        Self::bold(Colors::TEXT)
    }

    /// "Flying Monkeys" in the header
    pub fn title() -> Style {
        Self::bold(Colors::ACCENT)
    }

    /// Category name in the header
    pub fn category() -> Style {
        Self::bold(Colors::HIGHLIGHT)
    }

    pub fn border_active() -> Style {
        Style::default().fg(Colors::ACCENT)
    }

    pub fn border_inactive() -> Style {
        Style::default().fg(Colors::TEXT_FAINT)
    }

    pub fn panel_bg() -> Style {
        Style::default().bg(Colors::BACKGROUND)
    }

    /// Row under the cursor
    pub fn selected() -> Style {
        Self::filled(Colors::HIGHLIGHT)
    }

    /// Checkbox marks
    pub fn focused() -> Style {
        Self::bold(Colors::ACCENT)
    }

    pub fn success() -> Style {
        Style::default().fg(Colors::OK)
    }

    pub fn warning() -> Style {
        Style::default().fg(Colors::WARN)
    }

    /// Key labels in the nav bar
    pub fn button_active() -> Style {
        Self::filled(Colors::TEXT)
    }

    pub fn button_inactive() -> Style {
        Style::default().fg(Colors::TEXT)
    }

    /// Focused "Yes" in the confirm dialog
    pub fn button_confirm() -> Style {
        Self::filled(Colors::OK)
    }

    /// Focused "No" in the confirm dialog
    pub fn button_cancel() -> Style {
        Self::filled(Colors::TEXT)
    }

    pub fn nav_hint() -> Style {
        Style::default().fg(Colors::TEXT_FAINT)
    }
}

// =============================================================================
// UI CONSTANTS
// =============================================================================

/// Layout heights of the fixed checklist rows
pub struct UiConstants;

impl UiConstants {
    pub const NAV_BAR_HEIGHT: u16 = 1;

    /// Title and category, bordered
    pub const HEADER_HEIGHT: u16 = 3;

    /// Separator and message
    pub const STATUS_BAR_HEIGHT: u16 = 2;
}

// =============================================================================
// TEXT CONSTANTS
// =============================================================================

/// Common UI text strings
pub struct UiText;

impl UiText {
    pub const BTN_YES_INSTALL: &'static str = "[ Yes / Install ]";
    pub const BTN_NO_CANCEL: &'static str = "[ No / Cancel ]";
}
