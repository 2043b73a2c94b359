//! Tests for the checklist application
//!
//! These tests drive the app with key events over the built-in catalog and
//! verify:
//! - Initial checked state and installed markers
//! - Page navigation and the last-page commit rule
//! - The confirm dialog outcomes

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use flyingmonkeys::app::{App, AppExit, AppMode, ChecklistState};
use flyingmonkeys::catalog::Catalog;
use flyingmonkeys::command_executor::RecordingExecutor;
use flyingmonkeys::install_module::InstallContext;
use flyingmonkeys::logic::selection::installed_modules;
use flyingmonkeys::logic::Selection;

fn builtin_app(exec: &RecordingExecutor) -> (Catalog, App) {
    let catalog = Catalog::builtin().unwrap();
    let ctx = InstallContext::new(exec, "/tmp/fm");
    let installed = installed_modules(&catalog, &ctx);
    let selection = Selection::from_installed(&catalog, &installed);
    let state = ChecklistState::new(&catalog, selection, &installed);
    (catalog, App::new(state))
}

fn press(app: &mut App, code: KeyCode) -> Option<AppExit> {
    app.handle_key_event(KeyEvent::new(code, KeyModifiers::NONE))
}

// =============================================================================
// Initial state
// =============================================================================

#[test]
fn test_starts_on_first_category() {
    let (_, app) = builtin_app(&RecordingExecutor::new());
    let state = app.state();

    assert_eq!(state.mode, AppMode::Checklist);
    assert_eq!(state.page_label(), "Page 1 of 7");
    assert_eq!(state.current_page().unwrap().title, "Browsers");
    assert_eq!(state.current_item().unwrap().display_name, "Chromium");
    assert!(!state.help_visible);
}

#[test]
fn test_gftp_starts_unchecked_unless_installed() {
    let (_, mut app) = builtin_app(&RecordingExecutor::new());
    press(&mut app, KeyCode::Enter);
    let gftp = app.state().current_item().unwrap().clone();
    assert_eq!(gftp.display_name, "gFTP");
    assert!(!gftp.installed);
    assert!(!app.state().is_checked(&gftp));

    let (_, mut app) = builtin_app(&RecordingExecutor::new().with_available_command("gftp"));
    press(&mut app, KeyCode::Enter);
    let gftp = app.state().current_item().unwrap().clone();
    assert!(gftp.installed);
    assert!(app.state().is_checked(&gftp));
}

#[test]
fn test_initial_probe_has_no_side_effects() {
    let exec = RecordingExecutor::new();
    let (catalog, _) = builtin_app(&exec);
    assert!(exec.mutating_calls().is_empty());

    let probes = exec.calls().len() + exec.probed_paths().len();
    assert_eq!(probes, catalog.modules().len(), "one probe per module");
}

// =============================================================================
// Navigation
// =============================================================================

#[test]
fn test_enter_walks_categories_then_opens_dialog() {
    let (catalog, mut app) = builtin_app(&RecordingExecutor::new());
    let titles: Vec<&str> = catalog.categories().iter().map(|c| c.name.as_str()).collect();

    for (index, title) in titles.iter().enumerate() {
        assert_eq!(app.state().page_index(), index);
        assert_eq!(app.state().current_page().unwrap().title, *title);
        assert_eq!(press(&mut app, KeyCode::Enter), None);
    }

    assert!(app.state().is_last_page());
    assert_eq!(app.state().mode, AppMode::ConfirmCommit);
    assert!(!app.state().confirm_yes);
}

#[test]
fn test_cursor_stays_within_page() {
    let (_, mut app) = builtin_app(&RecordingExecutor::new());
    press(&mut app, KeyCode::Up);
    assert_eq!(app.state().cursor(), 0);

    for _ in 0..5 {
        press(&mut app, KeyCode::Char('j'));
    }
    assert_eq!(app.state().cursor(), 1);
    assert_eq!(app.state().current_item().unwrap().display_name, "Firefox");

    press(&mut app, KeyCode::Tab);
    assert_eq!(app.state().cursor(), 0, "changing page resets the cursor");
}

#[test]
fn test_key_release_is_ignored() {
    let (_, mut app) = builtin_app(&RecordingExecutor::new());
    let mut release = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
    release.kind = KeyEventKind::Release;

    assert_eq!(app.handle_key_event(release), None);
    assert_eq!(app.state().page_index(), 0);
}

// =============================================================================
// Commit and quit
// =============================================================================

#[test]
fn test_checked_gftp_is_committed() {
    let (catalog, mut app) = builtin_app(&RecordingExecutor::new());
    let gftp = catalog.find("gFTP").unwrap();

    press(&mut app, KeyCode::Enter);
    press(&mut app, KeyCode::Char(' '));
    assert_eq!(app.state().status_message, "gFTP selected");

    while !app.state().is_last_page() {
        press(&mut app, KeyCode::Right);
    }
    press(&mut app, KeyCode::Char('c'));
    press(&mut app, KeyCode::Left);
    assert!(app.state().confirm_yes);

    match press(&mut app, KeyCode::Enter) {
        Some(AppExit::Commit(selection)) => {
            assert!(selection.contains(gftp));
            assert!(selection.contains(catalog.find("Git").unwrap()));
        }
        other => panic!("expected commit, got {:?}", other),
    }
}

#[test]
fn test_no_in_dialog_keeps_selection() {
    let (_, mut app) = builtin_app(&RecordingExecutor::new());
    press(&mut app, KeyCode::Char(' '));
    let checked = app.state().checked_count();

    while !app.state().is_last_page() {
        press(&mut app, KeyCode::Enter);
    }
    press(&mut app, KeyCode::Enter);
    assert_eq!(press(&mut app, KeyCode::Char('n')), None);

    assert_eq!(app.state().mode, AppMode::Checklist);
    assert_eq!(app.state().checked_count(), checked);
}

#[test]
fn test_quit_and_ctrl_c() {
    let (_, mut app) = builtin_app(&RecordingExecutor::new());
    assert_eq!(press(&mut app, KeyCode::Char('q')), Some(AppExit::Quit));

    let (_, mut app) = builtin_app(&RecordingExecutor::new());
    let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
    assert_eq!(app.handle_key_event(ctrl_c), Some(AppExit::Quit));
}
