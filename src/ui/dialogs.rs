//! Dialog rendering module

use crate::app::ChecklistState;
use crate::components::centered_rect;
use crate::theme::{Styles, UiText};
use ratatui::{
    layout::Alignment,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

/// Render the yes/no dialog shown before committing
pub fn render_confirm_dialog(f: &mut Frame, state: &ChecklistState) {
    let area = centered_rect(50, 30, (44, 9), (70, 12), f.area());

    let count = state.checked_count();
    let question = format!(
        "Install {} selected application{}?",
        count,
        if count == 1 { "" } else { "s" }
    );
    let note = if state.dry_run {
        "Dry run: commands are shown, not executed."
    } else {
        "Commands may ask for your sudo password."
    };

    let (yes_style, no_style) = if state.confirm_yes {
        (Styles::button_confirm(), Styles::button_inactive())
    } else {
        (Styles::button_inactive(), Styles::button_cancel())
    };

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(question, Styles::text_bold())),
        Line::from(Span::styled(note, Styles::text_muted())),
        Line::from(""),
        Line::from(vec![
            Span::styled(UiText::BTN_YES_INSTALL, yes_style),
            Span::raw("    "),
            Span::styled(UiText::BTN_NO_CANCEL, no_style),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Confirm ")
        .border_style(Styles::warning())
        .style(Styles::panel_bg());

    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        area,
    );
}
