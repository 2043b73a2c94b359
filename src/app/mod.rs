//! Application module
//!
//! Contains the checklist event loop and key handling.
//!
//! # Module Structure
//! - `state` - Checklist view model (ChecklistState, AppMode)
//! - Main module - App struct and event loop
//!
//! The app never runs install commands. It ends with an `AppExit`; the
//! caller tears the terminal down and commits the returned selection.

mod state;

pub use state::{AppMode, ChecklistItem, ChecklistPage, ChecklistState};

use crate::components::keybindings::{KeyAction, KeybindingContext};
use crate::error::Result;
use crate::logic::Selection;
use crate::ui::UiRenderer;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{backend::Backend, Terminal};
use std::time::Duration;
use tracing::{debug, info};

/// How the checklist was left
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppExit {
    /// User confirmed; install this selection
    Commit(Selection),
    /// User quit; nothing is installed
    Quit,
}

/// Main application struct
pub struct App {
    state: ChecklistState,
    ui_renderer: UiRenderer,
    keybinding_context: KeybindingContext,
}

impl App {
    /// Create a new application instance
    pub fn new(state: ChecklistState) -> Self {
        Self {
            state,
            ui_renderer: UiRenderer::new(),
            keybinding_context: KeybindingContext::new(),
        }
    }

    pub fn state(&self) -> &ChecklistState {
        &self.state
    }

    /// Run the main application loop until the user commits or quits
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<AppExit> {
        info!("Starting checklist with {} categories", self.state.pages().len());

        loop {
            terminal.draw(|f| {
                self.ui_renderer
                    .render(f, &self.state, &self.keybinding_context)
            })?;

            if event::poll(Duration::from_millis(250))? {
                if let Event::Key(key_event) = event::read()? {
                    if let Some(exit) = self.handle_key_event(key_event) {
                        info!("Checklist closed: {}", match exit {
                            AppExit::Commit(_) => "commit",
                            AppExit::Quit => "quit",
                        });
                        return Ok(exit);
                    }
                }
            }
        }
    }

    /// Handle keyboard input events
    pub fn handle_key_event(&mut self, key_event: KeyEvent) -> Option<AppExit> {
        if key_event.kind != KeyEventKind::Press {
            return None;
        }

        // Help overlay swallows everything except its close keys
        if self.state.help_visible {
            if matches!(key_event.code, KeyCode::Char('?') | KeyCode::Esc) {
                self.state.help_visible = false;
            }
            return None;
        }

        let action = self
            .keybinding_context
            .action_for(self.state.mode, &key_event)?;
        debug!("Key {:?} -> {:?}", key_event.code, action);

        match self.state.mode {
            AppMode::Checklist => self.handle_checklist_action(action),
            AppMode::ConfirmCommit => self.handle_confirm_action(action),
        }
    }

    fn handle_checklist_action(&mut self, action: KeyAction) -> Option<AppExit> {
        let state = &mut self.state;
        match action {
            KeyAction::NavigateUp => state.cursor_up(),
            KeyAction::NavigateDown => state.cursor_down(),
            KeyAction::Toggle => {
                state.toggle_current();
            }
            KeyAction::NextPage => {
                if !state.next_page() {
                    state.status_message = "Last category: press Enter to install".to_string();
                }
            }
            KeyAction::PrevPage => {
                state.prev_page();
            }
            KeyAction::Select => {
                if state.is_last_page() {
                    state.request_commit();
                } else {
                    state.next_page();
                }
            }
            KeyAction::Commit => {
                state.request_commit();
            }
            KeyAction::Help => state.help_visible = true,
            KeyAction::Quit => return Some(AppExit::Quit),
            _ => {}
        }
        None
    }

    fn handle_confirm_action(&mut self, action: KeyAction) -> Option<AppExit> {
        let state = &mut self.state;
        match action {
            KeyAction::ChooseYes => return Some(AppExit::Commit(state.selection().clone())),
            KeyAction::ChooseNo | KeyAction::Cancel => state.cancel_commit(),
            KeyAction::SwitchChoice => state.confirm_yes = !state.confirm_yes,
            KeyAction::Confirm => {
                if state.confirm_yes {
                    return Some(AppExit::Commit(state.selection().clone()));
                }
                state.cancel_commit();
            }
            _ => {}
        }
        None
    }
}
