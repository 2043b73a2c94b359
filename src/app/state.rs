//! Checklist state
//!
//! The view model behind the checklist screens: one page per catalog
//! category, a cursor, and the `Selection` being edited. Rendering and key
//! handling only go through this type, so it can be tested without a
//! terminal.

use crate::catalog::Catalog;
use crate::install_module::ModuleId;
use crate::logic::Selection;
use std::collections::BTreeSet;

/// One checkbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem {
    pub display_name: String,
    pub module: ModuleId,
    /// Already present when the checklist was built
    pub installed: bool,
}

/// One category of the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistPage {
    pub title: String,
    pub items: Vec<ChecklistItem>,
}

/// Application operating modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppMode {
    /// Browsing and toggling items
    Checklist,
    /// Yes/No dialog before committing
    ConfirmCommit,
}

/// Main checklist state
#[derive(Debug, Clone)]
pub struct ChecklistState {
    pages: Vec<ChecklistPage>,
    page: usize,
    cursor: usize,
    selection: Selection,
    /// Current application mode
    pub mode: AppMode,
    /// Focused button of the confirm dialog; starts on "No"
    pub confirm_yes: bool,
    /// Whether help overlay is visible
    pub help_visible: bool,
    /// Status message for user feedback
    pub status_message: String,
    pub dry_run: bool,
}

impl ChecklistState {
    /// Build the pages from the catalog, in catalog order
    pub fn new(catalog: &Catalog, selection: Selection, installed: &BTreeSet<ModuleId>) -> Self {
        let pages = catalog
            .categories()
            .iter()
            .map(|category| ChecklistPage {
                title: category.name.clone(),
                items: category
                    .applications
                    .iter()
                    .map(|app| ChecklistItem {
                        display_name: app.display_name.clone(),
                        module: app.module,
                        installed: installed.contains(&app.module),
                    })
                    .collect(),
            })
            .collect();

        Self {
            pages,
            page: 0,
            cursor: 0,
            selection,
            mode: AppMode::Checklist,
            confirm_yes: false,
            help_visible: false,
            status_message: "Space toggles an item, Enter moves to the next category".to_string(),
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn pages(&self) -> &[ChecklistPage] {
        &self.pages
    }

    pub fn page_index(&self) -> usize {
        self.page
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_page(&self) -> Option<&ChecklistPage> {
        self.pages.get(self.page)
    }

    pub fn current_item(&self) -> Option<&ChecklistItem> {
        self.current_page().and_then(|page| page.items.get(self.cursor))
    }

    pub fn is_checked(&self, item: &ChecklistItem) -> bool {
        self.selection.contains(item.module)
    }

    /// An empty catalog has no pages; its only page is also its last
    pub fn is_last_page(&self) -> bool {
        self.page + 1 >= self.pages.len()
    }

    /// "Page 2 of 7"
    pub fn page_label(&self) -> String {
        format!("Page {} of {}", (self.page + 1).min(self.pages.len()), self.pages.len())
    }

    pub fn next_page(&mut self) -> bool {
        if self.is_last_page() {
            return false;
        }
        self.page += 1;
        self.cursor = 0;
        true
    }

    pub fn prev_page(&mut self) -> bool {
        if self.page == 0 {
            return false;
        }
        self.page -= 1;
        self.cursor = 0;
        true
    }

    pub fn cursor_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_down(&mut self) {
        let len = self.current_page().map_or(0, |page| page.items.len());
        if self.cursor + 1 < len {
            self.cursor += 1;
        }
    }

    /// Flip the item under the cursor, returning its new state
    pub fn toggle_current(&mut self) -> Option<bool> {
        let item = self.current_item()?.clone();
        let checked = self.selection.toggle(item.module);
        self.status_message = format!(
            "{} {}",
            item.display_name,
            if checked { "selected" } else { "deselected" }
        );
        Some(checked)
    }

    /// Checked items across all pages
    pub fn checked_count(&self) -> usize {
        self.pages
            .iter()
            .flat_map(|page| &page.items)
            .filter(|item| self.is_checked(item))
            .count()
    }

    /// Open the confirm dialog; only allowed from the last page
    pub fn request_commit(&mut self) -> bool {
        if !self.is_last_page() {
            self.status_message = "Commit is available on the last page".to_string();
            return false;
        }
        self.mode = AppMode::ConfirmCommit;
        self.confirm_yes = false;
        true
    }

    /// Close the confirm dialog without committing
    pub fn cancel_commit(&mut self) {
        self.mode = AppMode::Checklist;
        self.confirm_yes = false;
        self.status_message = "Commit cancelled".to_string();
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn into_selection(self) -> Selection {
        self.selection
    }
}
