//! Key bindings for the checklist and the confirm dialog
//!
//! Provides a registry of keybindings that change based on the current
//! application mode. The app dispatches key events through it, and the nav
//! bar and help overlay are generated from the same table.

use crate::app::AppMode;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;

/// Actions that can be triggered by keybindings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    NavigateUp,
    NavigateDown,
    NextPage,
    PrevPage,
    /// Enter: next category, or commit on the last one
    Select,
    Toggle,
    Commit,
    Help,
    Quit,
    ChooseYes,
    ChooseNo,
    SwitchChoice,
    Confirm,
    Cancel,
}

/// A keybinding definition
#[derive(Debug, Clone)]
pub struct Keybinding {
    pub key: KeyCode,
    pub modifiers: KeyModifiers,
    pub action: KeyAction,
    pub display: String,
    pub description: String,
}

impl Keybinding {
    /// Create a new keybinding with no modifiers
    pub fn new(key: KeyCode, action: KeyAction, display: &str, description: &str) -> Self {
        Self {
            key,
            modifiers: KeyModifiers::NONE,
            action,
            display: display.to_string(),
            description: description.to_string(),
        }
    }

    /// Create a keybinding with modifiers
    pub fn with_modifiers(
        key: KeyCode,
        modifiers: KeyModifiers,
        action: KeyAction,
        display: &str,
        description: &str,
    ) -> Self {
        Self {
            key,
            modifiers,
            action,
            display: display.to_string(),
            description: description.to_string(),
        }
    }

    fn matches(&self, event: &KeyEvent) -> bool {
        // Shift is implied by the character itself ('?', BackTab)
        let modifiers = event.modifiers.difference(KeyModifiers::SHIFT);
        self.key == event.code && self.modifiers == modifiers
    }
}

/// Context-aware keybinding registry
pub struct KeybindingContext {
    /// Mode-specific keybindings
    mode_bindings: HashMap<AppMode, Vec<Keybinding>>,
    /// Global keybindings (checklist screens only; the dialog has its own)
    global_bindings: Vec<Keybinding>,
}

impl Default for KeybindingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl KeybindingContext {
    /// Registry with the checklist and dialog bindings
    pub fn new() -> Self {
        let mut ctx = Self {
            mode_bindings: HashMap::new(),
            global_bindings: Vec::new(),
        };
        ctx.register_defaults();
        ctx
    }

    fn register_defaults(&mut self) {
        self.global_bindings = vec![
            Keybinding::new(KeyCode::Char('?'), KeyAction::Help, "?", "Help"),
            Keybinding::new(KeyCode::Char('q'), KeyAction::Quit, "Q", "Quit"),
            Keybinding::new(KeyCode::Esc, KeyAction::Quit, "Esc", "Quit without installing"),
            Keybinding::with_modifiers(
                KeyCode::Char('c'),
                KeyModifiers::CONTROL,
                KeyAction::Quit,
                "Ctrl+C",
                "Quit",
            ),
        ];

        self.mode_bindings.insert(
            AppMode::Checklist,
            vec![
                Keybinding::new(KeyCode::Up, KeyAction::NavigateUp, "Up", "Previous item"),
                Keybinding::new(KeyCode::Char('k'), KeyAction::NavigateUp, "K", "Previous item"),
                Keybinding::new(KeyCode::Down, KeyAction::NavigateDown, "Down", "Next item"),
                Keybinding::new(KeyCode::Char('j'), KeyAction::NavigateDown, "J", "Next item"),
                Keybinding::new(KeyCode::Char(' '), KeyAction::Toggle, "Space", "Toggle item"),
                Keybinding::new(KeyCode::Right, KeyAction::NextPage, "Right", "Next category"),
                Keybinding::new(KeyCode::Char('n'), KeyAction::NextPage, "N", "Next category"),
                Keybinding::new(KeyCode::Tab, KeyAction::NextPage, "Tab", "Next category"),
                Keybinding::new(KeyCode::Left, KeyAction::PrevPage, "Left", "Previous category"),
                Keybinding::new(KeyCode::Char('b'), KeyAction::PrevPage, "B", "Previous category"),
                Keybinding::new(KeyCode::BackTab, KeyAction::PrevPage, "S-Tab", "Previous category"),
                Keybinding::new(KeyCode::Enter, KeyAction::Select, "Enter", "Next / Commit"),
                Keybinding::new(KeyCode::Char('c'), KeyAction::Commit, "C", "Commit (last page)"),
            ],
        );

        self.mode_bindings.insert(
            AppMode::ConfirmCommit,
            vec![
                Keybinding::new(KeyCode::Char('y'), KeyAction::ChooseYes, "Y", "Install now"),
                Keybinding::new(KeyCode::Char('n'), KeyAction::ChooseNo, "N", "Back to checklist"),
                Keybinding::new(KeyCode::Left, KeyAction::SwitchChoice, "Left", "Switch button"),
                Keybinding::new(KeyCode::Right, KeyAction::SwitchChoice, "Right", "Switch button"),
                Keybinding::new(KeyCode::Tab, KeyAction::SwitchChoice, "Tab", "Switch button"),
                Keybinding::new(KeyCode::Enter, KeyAction::Confirm, "Enter", "Confirm"),
                Keybinding::new(KeyCode::Esc, KeyAction::Cancel, "Esc", "Cancel"),
            ],
        );
    }

    /// Bindings active in `mode`, mode-specific ones first
    pub fn get_bindings(&self, mode: AppMode) -> Vec<&Keybinding> {
        let mut bindings: Vec<&Keybinding> = Vec::new();

        if let Some(mode_bindings) = self.mode_bindings.get(&mode) {
            bindings.extend(mode_bindings.iter());
        }

        if mode == AppMode::Checklist {
            bindings.extend(self.global_bindings.iter());
        }

        bindings
    }

    /// Action bound to a key event in this mode
    pub fn action_for(&self, mode: AppMode, event: &KeyEvent) -> Option<KeyAction> {
        self.get_bindings(mode)
            .into_iter()
            .find(|b| b.matches(event))
            .map(|b| b.action)
    }

    /// Items for the bottom nav bar, most used first
    pub fn get_nav_items(&self, mode: AppMode) -> Vec<NavBarItem> {
        let priority_actions: &[KeyAction] = match mode {
            AppMode::Checklist => &[
                KeyAction::NavigateUp,
                KeyAction::Toggle,
                KeyAction::NextPage,
                KeyAction::PrevPage,
                KeyAction::Select,
                KeyAction::Help,
                KeyAction::Quit,
            ],
            AppMode::ConfirmCommit => &[
                KeyAction::ChooseYes,
                KeyAction::ChooseNo,
                KeyAction::SwitchChoice,
                KeyAction::Confirm,
            ],
        };

        let bindings = self.get_bindings(mode);
        priority_actions
            .iter()
            .filter_map(|&action| {
                // Up/Down and Left/Right are shown as one item
                if action == KeyAction::NavigateUp {
                    return Some(NavBarItem {
                        key_display: "Up/Dn".to_string(),
                        action_label: "Move".to_string(),
                    });
                }
                if action == KeyAction::SwitchChoice {
                    return Some(NavBarItem {
                        key_display: "Lt/Rt".to_string(),
                        action_label: "Switch".to_string(),
                    });
                }
                bindings
                    .iter()
                    .find(|b| b.action == action)
                    .map(|b| NavBarItem {
                        key_display: b.display.clone(),
                        action_label: b.description.clone(),
                    })
            })
            .collect()
    }

    /// Sections shown by the help overlay
    pub fn get_help_content(&self, mode: AppMode) -> Vec<HelpSection> {
        let groups: [(&str, &[KeyAction]); 3] = [
            (
                "Navigation",
                &[
                    KeyAction::NavigateUp,
                    KeyAction::NavigateDown,
                    KeyAction::NextPage,
                    KeyAction::PrevPage,
                ],
            ),
            (
                "Actions",
                &[
                    KeyAction::Toggle,
                    KeyAction::Select,
                    KeyAction::Commit,
                    KeyAction::ChooseYes,
                    KeyAction::ChooseNo,
                    KeyAction::SwitchChoice,
                    KeyAction::Confirm,
                    KeyAction::Cancel,
                ],
            ),
            ("General", &[KeyAction::Help, KeyAction::Quit]),
        ];

        let bindings = self.get_bindings(mode);
        groups
            .iter()
            .filter_map(|(title, actions)| {
                let items: Vec<(String, String)> = bindings
                    .iter()
                    .filter(|b| actions.contains(&b.action))
                    .map(|b| (b.display.clone(), b.description.clone()))
                    .collect();
                (!items.is_empty()).then(|| HelpSection {
                    title: title.to_string(),
                    items,
                })
            })
            .collect()
    }
}

/// Navigation bar item for display
#[derive(Debug, Clone)]
pub struct NavBarItem {
    pub key_display: String,
    pub action_label: String,
}

/// Help section for the help overlay
#[derive(Debug, Clone)]
pub struct HelpSection {
    pub title: String,
    pub items: Vec<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_checklist_actions() {
        let ctx = KeybindingContext::new();
        let mode = AppMode::Checklist;
        assert_eq!(ctx.action_for(mode, &key(KeyCode::Char('j'))), Some(KeyAction::NavigateDown));
        assert_eq!(ctx.action_for(mode, &key(KeyCode::Char(' '))), Some(KeyAction::Toggle));
        assert_eq!(ctx.action_for(mode, &key(KeyCode::BackTab)), Some(KeyAction::PrevPage));
        assert_eq!(ctx.action_for(mode, &key(KeyCode::Char('x'))), None);
    }

    #[test]
    fn test_shifted_question_mark_opens_help() {
        let ctx = KeybindingContext::new();
        let event = KeyEvent::new(KeyCode::Char('?'), KeyModifiers::SHIFT);
        assert_eq!(ctx.action_for(AppMode::Checklist, &event), Some(KeyAction::Help));
    }

    #[test]
    fn test_ctrl_c_quits() {
        let ctx = KeybindingContext::new();
        let event = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(ctx.action_for(AppMode::Checklist, &event), Some(KeyAction::Quit));
        assert_eq!(
            ctx.action_for(AppMode::Checklist, &key(KeyCode::Char('c'))),
            Some(KeyAction::Commit)
        );
    }

    #[test]
    fn test_dialog_has_no_global_bindings() {
        let ctx = KeybindingContext::new();
        let mode = AppMode::ConfirmCommit;
        assert_eq!(ctx.action_for(mode, &key(KeyCode::Char('n'))), Some(KeyAction::ChooseNo));
        assert_eq!(ctx.action_for(mode, &key(KeyCode::Esc)), Some(KeyAction::Cancel));
        assert_eq!(ctx.action_for(mode, &key(KeyCode::Char('q'))), None);
    }

    #[test]
    fn test_help_content_sections() {
        let ctx = KeybindingContext::new();
        let titles: Vec<_> = ctx
            .get_help_content(AppMode::Checklist)
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["Navigation", "Actions", "General"]);

        let nav = ctx.get_nav_items(AppMode::ConfirmCommit);
        assert_eq!(nav[0].key_display, "Y");
    }
}
