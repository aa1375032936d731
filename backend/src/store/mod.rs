//! Row store: owns the cue sheet rows and notifies observers on change.
//!
//! Observers run synchronously, in subscription order, inside the mutating
//! call. The store itself is not shared; wrap it in a mutex when more than
//! one task needs it (the HTTP server does).

use serde::Serialize;

use crate::export::sanitize_filename;
use crate::models::{new_row_id, MediaType, Row, RowDraft, RowPatch};

/// What changed in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreEvent {
    Rows,
    FileName,
    Reset,
}

/// Handle returned by [`RowStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn Fn(&StoreEvent) + Send + Sync>;

/// The in-memory cue sheet.
#[derive(Default)]
pub struct RowStore {
    rows: Vec<Row>,
    file_name: String,
    unsaved: bool,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl std::fmt::Debug for RowStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStore")
            .field("rows", &self.rows.len())
            .field("file_name", &self.file_name)
            .field("unsaved", &self.unsaved)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl RowStore {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Rows in insertion/edit order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, id: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.id == id)
    }

    pub fn row_index(&self, id: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.id == id)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Edits since the last save, ignoring an empty sheet.
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved && self.has_rows()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Append a row. Missing media type defaults to `music`.
    pub fn add_row(&mut self, draft: RowDraft) -> Row {
        let row = draft.into_row(MediaType::Music);
        self.rows.push(row.clone());
        self.touch();
        row
    }

    /// Insert a row before `before_id`, or append when the id is unknown.
    /// Missing media type defaults to `talk`.
    pub fn insert_row_before(&mut self, before_id: &str, draft: RowDraft) -> Row {
        let row = draft.into_row(MediaType::Talk);
        match self.row_index(before_id) {
            Some(index) => self.rows.insert(index, row.clone()),
            None => self.rows.push(row.clone()),
        }
        self.touch();
        row
    }

    /// Apply a partial update. Returns `false` when no row has this id.
    pub fn update_row(&mut self, id: &str, patch: RowPatch) -> bool {
        let Some(row) = self.rows.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        patch.apply_to(row);
        self.touch();
        true
    }

    /// Remove a row. Returns `false` when no row has this id.
    pub fn delete_row(&mut self, id: &str) -> bool {
        let Some(index) = self.row_index(id) else {
            return false;
        };
        self.rows.remove(index);
        self.touch();
        true
    }

    /// Remove every row. Clears the unsaved flag.
    pub fn clear_all_rows(&mut self) {
        self.rows.clear();
        self.unsaved = false;
        self.notify(StoreEvent::Rows);
    }

    /// Replace all rows. Rows without an id get a fresh one; rows without a
    /// media type get `music`.
    pub fn import_rows(&mut self, rows: Vec<Row>) {
        self.rows = rows
            .into_iter()
            .map(|mut row| {
                if row.id.is_empty() {
                    row.id = new_row_id();
                }
                if row.media_type.is_empty() {
                    row.media_type = MediaType::Music.as_str().to_string();
                }
                row
            })
            .collect();
        self.touch();
    }

    /// Set the session name, sanitized for use as a file name.
    pub fn set_file_name(&mut self, name: &str) {
        self.file_name = sanitize_filename(name);
        self.notify(StoreEvent::FileName);
    }

    pub fn mark_saved(&mut self) {
        self.unsaved = false;
    }

    /// Start a new session: no rows, no name. Observers stay subscribed.
    pub fn reset(&mut self) {
        self.rows.clear();
        self.file_name.clear();
        self.unsaved = false;
        self.notify(StoreEvent::Reset);
    }

    // =========================================================================
    // Observers
    // =========================================================================

    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns `false` when the subscription was already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    fn touch(&mut self) {
        self.unsaved = true;
        self.notify(StoreEvent::Rows);
    }

    fn notify(&self, event: StoreEvent) {
        for (_, observer) in &self.observers {
            observer(&event);
        }
    }
}
