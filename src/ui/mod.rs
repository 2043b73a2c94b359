//! User interface rendering module
//!
//! - `dialogs` - the commit confirmation dialog
//!
//! Rendering reads `ChecklistState` and never changes it.

mod dialogs;

use crate::app::{AppMode, ChecklistState};
use crate::components::help_overlay::HelpOverlay;
use crate::components::keybindings::KeybindingContext;
use crate::theme::{Styles, UiConstants};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

/// UI renderer for the application
#[derive(Debug, Default)]
pub struct UiRenderer;

impl UiRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render the complete UI for the current state
    pub fn render(&self, f: &mut Frame, state: &ChecklistState, keybinding_ctx: &KeybindingContext) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(UiConstants::HEADER_HEIGHT),
                Constraint::Min(1),
                Constraint::Length(UiConstants::STATUS_BAR_HEIGHT),
                Constraint::Length(UiConstants::NAV_BAR_HEIGHT),
            ])
            .split(f.area());

        render_header(f, state, chunks[0]);
        render_checklist(f, state, chunks[1]);
        render_status(f, state, chunks[2]);
        render_nav_bar(f, state.mode, keybinding_ctx, chunks[3]);

        if state.mode == AppMode::ConfirmCommit {
            dialogs::render_confirm_dialog(f, state);
        }

        if state.help_visible {
            HelpOverlay::new(state.mode, keybinding_ctx).render(f, f.area());
        }
    }
}

fn render_header(f: &mut Frame, state: &ChecklistState, area: Rect) {
    let category = state
        .current_page()
        .map_or("No categories", |page| page.title.as_str());

    let mut spans = vec![
        Span::styled("Flying Monkeys", Styles::title()),
        Span::raw("  "),
        Span::styled(category.to_string(), Styles::category()),
        Span::styled(format!("  ({})", state.page_label()), Styles::text_muted()),
    ];
    if state.dry_run {
        spans.push(Span::styled("  [DRY RUN]", Styles::warning()));
    }

    let header = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Styles::border_active()),
        );
    f.render_widget(header, area);
}

fn render_checklist(f: &mut Frame, state: &ChecklistState, area: Rect) {
    let items: Vec<ListItem> = state
        .current_page()
        .map(|page| {
            page.items
                .iter()
                .map(|item| {
                    let mark = if state.is_checked(item) { "[x]" } else { "[ ]" };
                    let mut spans = vec![
                        Span::styled(format!(" {} ", mark), Styles::focused()),
                        Span::styled(item.display_name.clone(), Styles::text()),
                    ];
                    if item.installed {
                        spans.push(Span::styled("  (installed)", Styles::success()));
                    }
                    ListItem::new(Line::from(spans))
                })
                .collect()
        })
        .unwrap_or_default();

    let title = if state.is_last_page() {
        " Select software, then press Enter to install "
    } else {
        " Select software "
    };
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Styles::border_inactive()),
        )
        .highlight_style(Styles::selected())
        .highlight_symbol("> ");

    let mut list_state = ListState::default().with_selected(state.current_item().map(|_| state.cursor()));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn render_status(f: &mut Frame, state: &ChecklistState, area: Rect) {
    let status = Paragraph::new(Line::from(vec![
        Span::styled(state.status_message.clone(), Styles::text_secondary()),
        Span::styled(
            format!("   {} selected", state.checked_count()),
            Styles::text_muted(),
        ),
    ]))
    .block(Block::default().borders(Borders::TOP).border_style(Styles::border_inactive()));
    f.render_widget(status, area);
}

/// Render the navigation bar
fn render_nav_bar(f: &mut Frame, mode: AppMode, keybinding_ctx: &KeybindingContext, area: Rect) {
    let mut spans = Vec::new();
    for item in keybinding_ctx.get_nav_items(mode) {
        spans.push(Span::styled(format!(" {} ", item.key_display), Styles::button_active()));
        spans.push(Span::styled(format!(" {}  ", item.action_label), Styles::nav_hint()));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogBuilder;
    use crate::install_module::InstallModule;
    use crate::logic::Selection;
    use crate::strategies::PackageManagerInstall;
    use ratatui::{backend::TestBackend, Terminal};
    use std::collections::BTreeSet;

    fn state() -> ChecklistState {
        let mut b = CatalogBuilder::new();
        let git = b.add_module(InstallModule::new("git", PackageManagerInstall::new("git")));
        let hg = b.add_module(InstallModule::new("hg", PackageManagerInstall::new("mercurial")));
        b.add_category("Source Control Clients", vec![("Git", git), ("Mercurial", hg)]);
        let catalog = b.build().unwrap();
        let selection: Selection = [git].into_iter().collect();
        ChecklistState::new(&catalog, selection, &BTreeSet::from([hg]))
    }

    fn screen(state: &ChecklistState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(90, 24)).unwrap();
        terminal
            .draw(|f| UiRenderer::new().render(f, state, &KeybindingContext::new()))
            .unwrap();
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_checklist_screen() {
        let text = screen(&state());
        assert!(text.contains("Source Control Clients"));
        assert!(text.contains("[x] Git"));
        assert!(text.contains("[ ] Mercurial  (installed)"));
        assert!(text.contains("Page 1 of 1"));
    }

    #[test]
    fn test_confirm_dialog_is_drawn() {
        let mut state = state().with_dry_run(true);
        assert!(state.request_commit());
        let text = screen(&state);
        assert!(text.contains("Install 1 selected application?"));
        assert!(text.contains("[DRY RUN]"));
    }
}
