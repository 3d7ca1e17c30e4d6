//! Spreadsheet editing state over a [`PriceSheet`].
//!
//! The editor owns the sheet, the current filter, the visible row order,
//! the cell selection, an optional inline edit buffer, and a status line.
//! Frontends translate key presses into [`GridCommand`]s and render from
//! the accessors; nothing here depends on a terminal.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use super::columns::{Column, default_columns};
use super::selection::{CellPos, Selection};
use crate::book::PriceBook;
use crate::exchange::{decode_clipboard, encode_clipboard};
use crate::filter::ItemFilter;
use crate::model::{Field, PriceItem, RowId, Uom};
use crate::sheet::{CommitOutcome, EditError, ExitDecision, PriceSheet, SaveReport};

/// Cursor movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
    /// Next cell, wrapping to the start of the next row.
    Tab,
    /// Previous cell, wrapping to the end of the previous row.
    BackTab,
    Home,
    End,
    Top,
    Bottom,
    PageUp,
    PageDown,
}

/// Input understood by [`GridEditor::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridCommand {
    Move(Move),
    /// Move the focus while keeping the selection anchor.
    Extend(Move),
    SelectAll,
    /// Open the edit buffer with the cell's current text (F2).
    StartEdit,
    /// Typed character: starts a fresh buffer or appends to the open one.
    Type(char),
    Backspace,
    /// Close the buffer without committing.
    Cancel,
    /// Commit the buffer (if open) and move down.
    Commit,
    /// Commit the buffer (if open) and move right, wrapping.
    CommitTab,
    /// Step a select cell to its next or previous option.
    Cycle { forward: bool },
    /// Empty every cell in the selection.
    Clear,
    Copy,
    Paste(String),
    /// Insert a draft row and focus its first required cell.
    AddRow,
    /// Delete every row touched by the selection.
    DeleteRows,
}

/// Result of one command, for frontends that react to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridEvent {
    None,
    Committed(CommitOutcome),
    Copied(String),
    Pasted(PasteReport),
    Cleared { changed: usize },
    Rejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

/// Open inline edit on one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditBuffer {
    pub row: RowId,
    pub field: Field,
    pub text: String,
}

/// Outcome of a paste.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PasteReport {
    pub changed: usize,
    pub rejected: Vec<(RowId, Field, String)>,
}

/// Grid editing state machine.
#[derive(Debug, Clone)]
pub struct GridEditor {
    sheet: PriceSheet,
    columns: Vec<Column>,
    filter: ItemFilter,
    today: NaiveDate,
    view: Vec<RowId>,
    selection: Selection,
    buffer: Option<EditBuffer>,
    status: Option<StatusMessage>,
    clipboard: String,
    page_rows: usize,
    scroll: usize,
    viewport_rows: usize,
}

impl GridEditor {
    #[must_use]
    pub fn new(sheet: PriceSheet, today: NaiveDate, page_rows: usize) -> Self {
        let mut editor = Self {
            sheet,
            columns: default_columns(),
            filter: ItemFilter::default(),
            today,
            view: Vec::new(),
            selection: Selection::default(),
            buffer: None,
            status: None,
            clipboard: String::new(),
            page_rows: page_rows.max(1),
            scroll: 0,
            viewport_rows: page_rows.max(1),
        };
        editor.refresh();
        editor
    }

    #[must_use]
    pub const fn sheet(&self) -> &PriceSheet {
        &self.sheet
    }

    #[must_use]
    pub fn into_sheet(self) -> PriceSheet {
        self.sheet
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub const fn filter(&self) -> &ItemFilter {
        &self.filter
    }

    /// Replace the filter and recompute the visible rows.
    pub fn set_filter(&mut self, filter: ItemFilter) {
        self.filter = filter;
        self.refresh();
    }

    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    #[must_use]
    pub const fn buffer(&self) -> Option<&EditBuffer> {
        self.buffer.as_ref()
    }

    #[must_use]
    pub const fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn set_status(&mut self, level: StatusLevel, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            level,
            text: text.into(),
        });
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    #[must_use]
    pub fn clipboard(&self) -> &str {
        &self.clipboard
    }

    /// Number of rows passing the filter.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.view.len()
    }

    #[must_use]
    pub fn row_at(&self, idx: usize) -> Option<&PriceItem> {
        self.view.get(idx).and_then(|id| self.sheet.row(id))
    }

    #[must_use]
    pub fn focused_row(&self) -> Option<&PriceItem> {
        self.row_at(self.selection.focus().row)
    }

    #[must_use]
    pub fn focused_field(&self) -> Option<Field> {
        self.columns.get(self.selection.focus().col).map(|c| c.field)
    }

    /// Display text of one visible cell.
    #[must_use]
    pub fn cell_text(&self, pos: CellPos) -> String {
        match (self.row_at(pos.row), self.columns.get(pos.col)) {
            (Some(row), Some(col)) => row.get(col.field).display(),
            _ => String::new(),
        }
    }

    /// True when the cell differs from its baseline in this session.
    #[must_use]
    pub fn is_cell_dirty(&self, pos: CellPos) -> bool {
        match (self.view.get(pos.row), self.columns.get(pos.col)) {
            (Some(id), Some(col)) => self.sheet.tracker().is_field_dirty(id, col.field),
            _ => false,
        }
    }

    /// First visible row index and how many rows fit.
    #[must_use]
    pub const fn viewport(&self) -> (usize, usize) {
        (self.scroll, self.viewport_rows)
    }

    /// Tell the editor how many rows the frontend can show.
    pub fn set_viewport_rows(&mut self, rows: usize) {
        self.viewport_rows = rows.max(1);
        self.scroll_to_focus();
    }

    pub fn begin_edit(&mut self) {
        self.sheet.begin_edit();
        self.set_status(StatusLevel::Info, "editing");
        self.refresh();
    }

    /// Leave edit mode when nothing is pending.
    pub fn request_exit(&mut self) -> ExitDecision {
        self.buffer = None;
        let decision = self.sheet.request_exit();
        if let ExitDecision::NeedsConfirmation(pending) = decision {
            self.set_status(
                StatusLevel::Warn,
                format!(
                    "unsaved: {} new, {} modified, {} deleted, {} draft; confirm to discard",
                    pending.new, pending.modified, pending.deleted, pending.drafts
                ),
            );
        } else {
            self.clear_status();
        }
        self.refresh();
        decision
    }

    /// Discard pending work and leave edit mode.
    pub fn confirm_exit(&mut self) {
        self.buffer = None;
        self.sheet.confirm_exit();
        self.set_status(StatusLevel::Info, "changes discarded");
        self.refresh();
    }

    /// Save pending work into `book`.
    ///
    /// # Errors
    ///
    /// Returns [`EditError`] from [`PriceSheet::save`].
    pub fn save(&mut self, book: &mut PriceBook) -> Result<SaveReport, EditError> {
        if self.buffer.is_some() {
            self.commit_buffer()?;
        }
        let report = self.sheet.save(book);
        match &report {
            Ok(r) => self.set_status(
                StatusLevel::Info,
                format!(
                    "saved: {} created, {} updated, {} deleted",
                    r.created.len(),
                    r.updated.len(),
                    r.deleted.len()
                ),
            ),
            Err(err) => self.set_status(StatusLevel::Error, err.to_string()),
        }
        self.refresh();
        report
    }

    /// Apply one command.
    pub fn apply(&mut self, command: GridCommand) -> GridEvent {
        match command {
            GridCommand::Move(m) => {
                self.move_focus(m, false);
                GridEvent::None
            }
            GridCommand::Extend(m) => {
                self.move_focus(m, true);
                GridEvent::None
            }
            GridCommand::SelectAll => {
                self.buffer = None;
                self.selection.select_all(self.view.len(), self.columns.len());
                GridEvent::None
            }
            GridCommand::StartEdit => self.start_edit(None),
            GridCommand::Type(ch) => {
                if let Some(buffer) = self.buffer.as_mut() {
                    buffer.text.push(ch);
                    GridEvent::None
                } else {
                    self.start_edit(Some(ch))
                }
            }
            GridCommand::Backspace => {
                if let Some(buffer) = self.buffer.as_mut() {
                    buffer.text.pop();
                }
                GridEvent::None
            }
            GridCommand::Cancel => {
                self.buffer = None;
                GridEvent::None
            }
            GridCommand::Commit => self.commit_and_move(Move::Down),
            GridCommand::CommitTab => self.commit_and_move(Move::Tab),
            GridCommand::Cycle { forward } => self.cycle(forward),
            GridCommand::Clear => self.clear_selection(),
            GridCommand::Copy => {
                let text = self.copy_selection();
                self.clipboard.clone_from(&text);
                GridEvent::Copied(text)
            }
            GridCommand::Paste(text) => self.paste(&text),
            GridCommand::AddRow => self.add_row(),
            GridCommand::DeleteRows => self.delete_rows(),
        }
    }

    fn move_focus(&mut self, m: Move, extend: bool) {
        self.buffer = None;
        let rows = self.view.len();
        let cols = self.columns.len();
        if rows == 0 || cols == 0 {
            return;
        }
        let last_row = rows - 1;
        let last_col = cols - 1;
        let CellPos { row, col } = self.selection.focus();
        let next = match m {
            Move::Up => CellPos::new(row.saturating_sub(1), col),
            Move::Down => CellPos::new((row + 1).min(last_row), col),
            Move::Left => CellPos::new(row, col.saturating_sub(1)),
            Move::Right => CellPos::new(row, (col + 1).min(last_col)),
            Move::Tab if col < last_col => CellPos::new(row, col + 1),
            Move::Tab if row < last_row => CellPos::new(row + 1, 0),
            Move::Tab => CellPos::new(row, col),
            Move::BackTab if col > 0 => CellPos::new(row, col - 1),
            Move::BackTab if row > 0 => CellPos::new(row - 1, last_col),
            Move::BackTab => CellPos::new(row, col),
            Move::Home => CellPos::new(row, 0),
            Move::End => CellPos::new(row, last_col),
            Move::Top => CellPos::new(0, col),
            Move::Bottom => CellPos::new(last_row, col),
            Move::PageUp => CellPos::new(row.saturating_sub(self.page_rows), col),
            Move::PageDown => CellPos::new((row + self.page_rows).min(last_row), col),
        };
        self.selection.move_to(next, extend);
        self.scroll_to_focus();
    }

    fn start_edit(&mut self, typed: Option<char>) -> GridEvent {
        if !self.sheet.is_editing() {
            return self.reject(&EditError::NotEditing);
        }
        let (Some(row), Some(column)) = (self.focused_row(), self.columns.get(self.selection.focus().col))
        else {
            return GridEvent::None;
        };
        let id = row.id.clone();
        let field = column.field;
        if column.is_select() {
            return match typed {
                Some(ch) => self.select_by_initial(&id, field, ch),
                None => self.cycle(true),
            };
        }
        let text = match typed {
            Some(ch) => ch.to_string(),
            None => row.get(field).display(),
        };
        self.buffer = Some(EditBuffer {
            row: id,
            field,
            text,
        });
        GridEvent::None
    }

    fn commit_buffer(&mut self) -> Result<CommitOutcome, EditError> {
        let Some(buffer) = self.buffer.take() else {
            return Ok(CommitOutcome::Unchanged);
        };
        match self.sheet.commit_cell(&buffer.row, buffer.field, &buffer.text) {
            Ok(outcome) => {
                self.report_outcome(&outcome);
                self.refresh_following(&buffer.row);
                Ok(outcome)
            }
            Err(err) => {
                self.buffer = Some(buffer);
                Err(err)
            }
        }
    }

    fn commit_and_move(&mut self, m: Move) -> GridEvent {
        if self.buffer.is_none() {
            self.move_focus(m, false);
            return GridEvent::None;
        }
        match self.commit_buffer() {
            Ok(outcome) => {
                self.move_focus(m, false);
                GridEvent::Committed(outcome)
            }
            Err(err) => self.reject(&err),
        }
    }

    fn cycle(&mut self, forward: bool) -> GridEvent {
        let (Some(row), Some(field)) = (self.focused_row(), self.focused_field()) else {
            return GridEvent::None;
        };
        if field != Field::Uom {
            return GridEvent::None;
        }
        let options: Vec<Option<Uom>> = std::iter::once(None)
            .chain(Uom::ALL.iter().copied().map(Some))
            .collect();
        let current = options.iter().position(|o| *o == row.uom).unwrap_or(0);
        let next = if forward {
            (current + 1) % options.len()
        } else {
            (current + options.len() - 1) % options.len()
        };
        let id = row.id.clone();
        let raw = options[next].map(Uom::as_str).unwrap_or_default();
        self.commit_direct(&id, field, raw)
    }

    fn select_by_initial(&mut self, id: &RowId, field: Field, ch: char) -> GridEvent {
        let wanted = ch.to_ascii_uppercase();
        match Uom::ALL.iter().find(|u| u.as_str().starts_with(wanted)) {
            Some(uom) => self.commit_direct(id, field, uom.as_str()),
            None => GridEvent::None,
        }
    }

    fn commit_direct(&mut self, id: &RowId, field: Field, raw: &str) -> GridEvent {
        match self.sheet.commit_cell(id, field, raw) {
            Ok(outcome) => {
                self.report_outcome(&outcome);
                self.refresh_following(id);
                GridEvent::Committed(outcome)
            }
            Err(err) => self.reject(&err),
        }
    }

    /// Visible row ids and fields covered by the selection.
    fn selected_cells(&self) -> Vec<(RowId, Field)> {
        let fields: Vec<Field> = self
            .selection
            .cols()
            .filter_map(|c| self.columns.get(c).map(|col| col.field))
            .collect();
        self.selection
            .rows()
            .filter_map(|r| self.view.get(r))
            .flat_map(|id| fields.iter().map(move |&f| (id.clone(), f)))
            .collect()
    }

    fn clear_selection(&mut self) -> GridEvent {
        if !self.sheet.is_editing() {
            return self.reject(&EditError::NotEditing);
        }
        self.buffer = None;
        let focus_id = self.view.get(self.selection.focus().row).cloned();
        let mut changed = 0;
        let mut first_error = None;
        for (id, field) in self.selected_cells() {
            match self.sheet.commit_cell(&id, field, "") {
                Ok(CommitOutcome::Unchanged) => {}
                Ok(_) => changed += 1,
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => self.set_status(StatusLevel::Warn, format!("cleared {changed}; {err}")),
            None => self.set_status(StatusLevel::Info, format!("cleared {changed} cell(s)")),
        }
        match focus_id {
            Some(id) => self.refresh_following(&id),
            None => self.refresh(),
        }
        GridEvent::Cleared { changed }
    }

    fn copy_selection(&mut self) -> String {
        let cells: Vec<Vec<String>> = self
            .selection
            .rows()
            .filter(|&r| r < self.view.len())
            .map(|r| {
                self.selection
                    .cols()
                    .map(|c| self.cell_text(CellPos::new(r, c)))
                    .collect()
            })
            .collect();
        let count: usize = cells.iter().map(Vec::len).sum();
        self.set_status(StatusLevel::Info, format!("copied {count} cell(s)"));
        encode_clipboard(&cells)
    }

    fn paste(&mut self, text: &str) -> GridEvent {
        if !self.sheet.is_editing() {
            return self.reject(&EditError::NotEditing);
        }
        self.buffer = None;
        let block = decode_clipboard(text);
        let origin = self.selection.anchor();

        let mut targets = Vec::new();
        for (r, values) in block.iter().enumerate() {
            let Some(id) = self.view.get(origin.row + r) else {
                break;
            };
            for (c, raw) in values.iter().enumerate() {
                let Some(column) = self.columns.get(origin.col + c) else {
                    break;
                };
                targets.push((id.clone(), column.field, raw.as_str()));
            }
        }

        let mut report = PasteReport::default();
        for (id, field, raw) in targets {
            match self.sheet.commit_cell(&id, field, raw) {
                Ok(CommitOutcome::Unchanged) => {}
                Ok(_) => report.changed += 1,
                Err(err) => report.rejected.push((id, field, err.to_string())),
            }
        }
        debug!(changed = report.changed, rejected = report.rejected.len(), "paste applied");
        let level = if report.rejected.is_empty() {
            StatusLevel::Info
        } else {
            StatusLevel::Warn
        };
        self.set_status(
            level,
            format!(
                "pasted {} cell(s), {} rejected",
                report.changed,
                report.rejected.len()
            ),
        );
        let focus_id = self.view.get(self.selection.focus().row).cloned();
        match focus_id {
            Some(id) => self.refresh_following(&id),
            None => self.refresh(),
        }
        GridEvent::Pasted(report)
    }

    fn add_row(&mut self) -> GridEvent {
        self.buffer = None;
        let header = self
            .sheet
            .scope()
            .map(str::to_string)
            .or_else(|| self.focused_row().map(|r| r.header_id.clone()));
        match self.sheet.add_draft_row(header.as_deref()) {
            Ok(id) => {
                self.set_status(StatusLevel::Info, "new row: enter product name and unit price");
                self.refresh_following(&id);
                let col = self
                    .columns
                    .iter()
                    .position(|c| c.field == Field::ProductName)
                    .unwrap_or(0);
                let row = self.selection.focus().row;
                self.selection.move_to(CellPos::new(row, col), false);
                GridEvent::None
            }
            Err(err) => self.reject(&err),
        }
    }

    fn delete_rows(&mut self) -> GridEvent {
        self.buffer = None;
        let ids: Vec<RowId> = self
            .selection
            .rows()
            .filter_map(|r| self.view.get(r).cloned())
            .collect();
        if ids.is_empty() {
            return GridEvent::None;
        }
        match self.sheet.delete_rows(&ids, self.today) {
            Ok(report) => {
                let total = report.discarded.len() + report.staged.len();
                self.set_status(StatusLevel::Info, format!("deleted {total} row(s)"));
                let pos = self.selection.top_left();
                self.refresh();
                self.selection.move_to(pos, false);
                self.selection.clamp(self.view.len(), self.columns.len());
                GridEvent::None
            }
            Err(err) => self.reject(&err),
        }
    }

    fn report_outcome(&mut self, outcome: &CommitOutcome) {
        match outcome {
            CommitOutcome::Created { id } => {
                self.set_status(StatusLevel::Info, format!("row {id} created"));
            }
            CommitOutcome::DraftPending { missing } => {
                let names: Vec<&str> = missing.iter().map(|f| f.title()).collect();
                self.set_status(StatusLevel::Warn, format!("still required: {}", names.join(", ")));
            }
            CommitOutcome::Unchanged | CommitOutcome::Modified { .. } | CommitOutcome::Reverted { .. } => {
                self.clear_status();
            }
        }
    }

    fn reject(&mut self, err: &EditError) -> GridEvent {
        let text = err.to_string();
        self.set_status(StatusLevel::Error, text.clone());
        GridEvent::Rejected(text)
    }

    /// Recompute the visible rows, keeping the selection in bounds.
    pub fn refresh(&mut self) {
        self.view = self
            .sheet
            .visible_rows(&self.filter, self.today)
            .into_iter()
            .map(|r| r.id.clone())
            .collect();
        self.selection.clamp(self.view.len(), self.columns.len());
        self.scroll_to_focus();
    }

    /// Recompute the visible rows and put the focus back on row `id`.
    fn refresh_following(&mut self, id: &RowId) {
        let col = self.selection.focus().col;
        self.refresh();
        if let Some(row) = self.view.iter().position(|v| v == id) {
            self.selection.move_to(CellPos::new(row, col), false);
            self.scroll_to_focus();
        }
    }

    fn scroll_to_focus(&mut self) {
        let row = self.selection.focus().row;
        if row < self.scroll {
            self.scroll = row;
        } else if row >= self.scroll + self.viewport_rows {
            self.scroll = row + 1 - self.viewport_rows;
        }
        let max_scroll = self.view.len().saturating_sub(self.viewport_rows);
        self.scroll = self.scroll.min(max_scroll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::test_support::{date, editing_sheet, sample_book};

    fn editor() -> GridEditor {
        let (_book, sheet) = editing_sheet();
        GridEditor::new(sheet, date("2026-10-16"), 2)
    }

    fn col_of(editor: &GridEditor, field: Field) -> usize {
        editor.columns().iter().position(|c| c.field == field).unwrap()
    }

    fn focus(editor: &mut GridEditor, row: usize, field: Field) {
        let col = col_of(editor, field);
        editor.selection.move_to(CellPos::new(row, col), false);
    }

    fn type_text(editor: &mut GridEditor, text: &str) {
        for ch in text.chars() {
            editor.apply(GridCommand::Type(ch));
        }
    }

    #[test]
    fn tab_wraps_to_next_row_and_back() {
        let mut ed = editor();
        ed.apply(GridCommand::Move(Move::End));
        ed.apply(GridCommand::Move(Move::Tab));
        assert_eq!(ed.selection().focus(), CellPos::new(1, 0));
        ed.apply(GridCommand::Move(Move::BackTab));
        assert_eq!(ed.selection().focus(), CellPos::new(0, ed.columns().len() - 1));
    }

    #[test]
    fn paging_moves_by_configured_rows_and_scrolls() {
        let mut ed = editor();
        ed.set_viewport_rows(1);
        ed.apply(GridCommand::Move(Move::PageDown));
        assert_eq!(ed.selection().focus().row, 2);
        assert_eq!(ed.viewport().0, 2);
        ed.apply(GridCommand::Move(Move::Top));
        assert_eq!(ed.viewport().0, 0);
    }

    #[test]
    fn typing_replaces_and_enter_commits_then_moves_down() {
        let mut ed = editor();
        focus(&mut ed, 0, Field::UnitPrice);
        type_text(&mut ed, "13.5");
        assert_eq!(ed.buffer().unwrap().text, "13.5");
        let event = ed.apply(GridCommand::Commit);
        assert_eq!(
            event,
            GridEvent::Committed(CommitOutcome::Modified {
                field: Field::UnitPrice
            })
        );
        assert!(ed.buffer().is_none());
        assert_eq!(ed.selection().focus().row, 1);
        assert!(ed.is_cell_dirty(CellPos::new(0, col_of(&ed, Field::UnitPrice))));
    }

    #[test]
    fn f2_keeps_text_and_escape_cancels() {
        let mut ed = editor();
        focus(&mut ed, 0, Field::ProductName);
        ed.apply(GridCommand::StartEdit);
        assert_eq!(ed.buffer().unwrap().text, "Bleach 5%");
        ed.apply(GridCommand::Backspace);
        ed.apply(GridCommand::Cancel);
        assert!(ed.buffer().is_none());
        assert!(ed.sheet().tracker().is_empty());
    }

    #[test]
    fn rejected_commit_keeps_buffer_open() {
        let mut ed = editor();
        focus(&mut ed, 0, Field::EffectiveDate);
        type_text(&mut ed, "someday");
        let event = ed.apply(GridCommand::Commit);
        assert!(matches!(event, GridEvent::Rejected(_)));
        assert_eq!(ed.buffer().unwrap().text, "someday");
        assert_eq!(ed.status().unwrap().level, StatusLevel::Error);
        assert_eq!(ed.selection().focus().row, 0);
    }

    #[test]
    fn select_cells_cycle_without_buffer() {
        let mut ed = editor();
        focus(&mut ed, 0, Field::Uom);
        ed.apply(GridCommand::StartEdit);
        assert!(ed.buffer().is_none());
        assert_eq!(ed.row_at(0).unwrap().uom, Some(Uom::Ea));
        ed.apply(GridCommand::Cycle { forward: false });
        assert_eq!(ed.row_at(0).unwrap().uom, None);
        ed.apply(GridCommand::Type('k'));
        assert_eq!(ed.row_at(0).unwrap().uom, Some(Uom::Kg));
    }

    #[test]
    fn viewing_mode_rejects_edits() {
        let book = sample_book();
        let sheet = PriceSheet::open(&book, None).unwrap();
        let mut ed = GridEditor::new(sheet, date("2026-10-16"), 20);
        let event = ed.apply(GridCommand::Type('x'));
        assert!(matches!(event, GridEvent::Rejected(_)));
        assert!(ed.buffer().is_none());
        ed.begin_edit();
        ed.apply(GridCommand::Type('x'));
        assert!(ed.buffer().is_some());
    }

    #[test]
    fn delete_key_clears_selected_cells() {
        let mut ed = editor();
        focus(&mut ed, 0, Field::Notes);
        ed.apply(GridCommand::Paste("promo\nclearance".into()));
        assert_eq!(ed.row_at(1).unwrap().notes, "clearance");

        ed.apply(GridCommand::Extend(Move::Down));
        let event = ed.apply(GridCommand::Clear);
        assert_eq!(event, GridEvent::Cleared { changed: 2 });
        assert!(ed.row_at(0).unwrap().notes.is_empty());
        assert!(ed.sheet().tracker().is_empty());
    }

    #[test]
    fn copy_emits_tab_separated_block() {
        let mut ed = editor();
        focus(&mut ed, 0, Field::ProductName);
        ed.apply(GridCommand::Extend(Move::Right));
        ed.apply(GridCommand::Extend(Move::Down));
        let GridEvent::Copied(text) = ed.apply(GridCommand::Copy) else {
            panic!("expected copy event");
        };
        assert_eq!(text, "Bleach 5%\t12.00\nHand Soap\t8.50");
        assert_eq!(ed.clipboard(), text);
    }

    #[test]
    fn paste_clips_at_edges_and_reports_rejections() {
        let mut ed = editor();
        let last = ed.columns().len() - 1;
        focus(&mut ed, 1, Field::ExpirationDate);
        let GridEvent::Pasted(report) =
            ed.apply(GridCommand::Paste("2020-01-01\tnote a\textra\n2027-06-01\tnote b\nx\ty\n".into()))
        else {
            panic!("expected paste event");
        };
        assert_eq!(col_of(&ed, Field::Notes), last);
        // Row 1 expiration precedes its effective date; row 2 accepts both.
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].1, Field::ExpirationDate);
        assert_eq!(report.changed, 3);
        assert_eq!(ed.row_at(2).unwrap().notes, "note b");
    }

    #[test]
    fn paste_starts_at_the_anchor_not_the_top_left() {
        let mut ed = editor();
        focus(&mut ed, 1, Field::Notes);
        ed.apply(GridCommand::Extend(Move::Up));
        assert_eq!(ed.selection().focus().row, 0);

        ed.apply(GridCommand::Paste("from anchor".into()));
        assert_eq!(ed.row_at(1).unwrap().notes, "from anchor");
        assert!(ed.row_at(0).unwrap().notes.is_empty());
    }

    #[test]
    fn add_row_focuses_draft_and_follows_it_when_created() {
        let mut ed = editor();
        ed.apply(GridCommand::Move(Move::Bottom));
        ed.apply(GridCommand::AddRow);
        assert_eq!(ed.selection().focus(), CellPos::new(0, col_of(&ed, Field::ProductName)));
        type_text(&mut ed, "Floor Wax");
        ed.apply(GridCommand::CommitTab);
        type_text(&mut ed, "7");
        let event = ed.apply(GridCommand::CommitTab);
        assert!(matches!(event, GridEvent::Committed(CommitOutcome::Created { .. })));
        assert!(ed.focused_row().unwrap().id.is_temporary());
        assert_eq!(ed.sheet().pending().new, 1);
    }

    #[test]
    fn blocked_row_delete_sets_error_status() {
        let mut ed = editor();
        ed.apply(GridCommand::Move(Move::Bottom));
        let event = ed.apply(GridCommand::DeleteRows);
        assert!(matches!(event, GridEvent::Rejected(ref msg) if msg.contains("PI-000003")));
        assert_eq!(ed.row_count(), 3);

        ed.apply(GridCommand::Move(Move::Top));
        ed.apply(GridCommand::DeleteRows);
        assert_eq!(ed.row_count(), 2);
        assert_eq!(ed.sheet().pending().deleted, 1);
    }

    #[test]
    fn exit_with_changes_needs_confirmation() {
        let mut ed = editor();
        focus(&mut ed, 0, Field::Notes);
        type_text(&mut ed, "x");
        ed.apply(GridCommand::Commit);
        assert!(matches!(ed.request_exit(), ExitDecision::NeedsConfirmation(_)));
        ed.confirm_exit();
        assert!(!ed.sheet().is_editing());
        assert!(ed.sheet().tracker().is_empty());
        assert!(ed.row_at(0).unwrap().notes.is_empty());
    }

    #[test]
    fn save_commits_open_buffer_first() {
        let (mut book, sheet) = editing_sheet();
        let mut ed = GridEditor::new(sheet, date("2026-10-16"), 20);
        focus(&mut ed, 1, Field::Notes);
        type_text(&mut ed, "bulk only");
        let report = ed.save(&mut book).unwrap();
        assert_eq!(report.updated, vec![RowId::persisted(2)]);
        assert_eq!(book.item(&RowId::persisted(2)).unwrap().notes, "bulk only");
    }
}
