//! Terminal spreadsheet over a [`GridEditor`].
//!
//! View mode: arrows move, `e` starts editing, `/` searches, `c` clears
//! filters, `q` quits.
//!
//! Edit mode: type or `F2` to edit a cell, `Enter`/`Tab` commit, `Esc`
//! cancels the cell or leaves edit mode, `Shift`+arrows extend the
//! selection, `Alt`+up/down cycle a unit of measure, `Del` clears.
//! `Ctrl` chords: `A` select all, `C` copy, `V` paste, `N` new row,
//! `D` delete rows, `S` save, `F` search, `Q` quit. `F4` toggles the
//! modified-only filter, `F5` clears filters, `F1` shows help.

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use pricebook_core::PriceBook;
use pricebook_core::filter::ItemFilter;
use pricebook_core::grid::{CellPos, GridCommand, GridEditor, Move, StatusLevel};
use pricebook_core::sheet::{ExitDecision, PendingSummary};
use pricebook_core::store::{Snapshot, SnapshotStore};
use ratatui::{
    Frame, Terminal,
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
};
use tracing::{info, warn};

const ID_WIDTH: u16 = 10;

/// What a key press asks the view to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Grid(GridCommand),
    BeginEdit,
    LeaveEdit,
    Save,
    Search,
    ToggleModified,
    ClearFilter,
    PasteClipboard,
    Help,
    Quit,
    Ignore,
}

/// Map a key press to an action for the current mode.
pub fn key_action(key: KeyEvent, editing: bool, buffer_open: bool) -> KeyAction {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    if buffer_open {
        return match key.code {
            KeyCode::Esc => KeyAction::Grid(GridCommand::Cancel),
            KeyCode::Enter => KeyAction::Grid(GridCommand::Commit),
            KeyCode::Tab => KeyAction::Grid(GridCommand::CommitTab),
            KeyCode::Backspace => KeyAction::Grid(GridCommand::Backspace),
            KeyCode::Char('s') if ctrl => KeyAction::Save,
            KeyCode::Char(c) if !ctrl => KeyAction::Grid(GridCommand::Type(c)),
            _ => KeyAction::Ignore,
        };
    }

    if editing && alt {
        match key.code {
            KeyCode::Down => return KeyAction::Grid(GridCommand::Cycle { forward: true }),
            KeyCode::Up => return KeyAction::Grid(GridCommand::Cycle { forward: false }),
            _ => {}
        }
    }

    if let Some(m) = movement(key.code, ctrl) {
        let extend = shift && !matches!(m, Move::Tab | Move::BackTab);
        return KeyAction::Grid(if extend {
            GridCommand::Extend(m)
        } else {
            GridCommand::Move(m)
        });
    }

    match key.code {
        KeyCode::F(1) => return KeyAction::Help,
        KeyCode::F(4) => return KeyAction::ToggleModified,
        KeyCode::F(5) => return KeyAction::ClearFilter,
        KeyCode::Char('a') if ctrl => return KeyAction::Grid(GridCommand::SelectAll),
        KeyCode::Char('c') if ctrl => return KeyAction::Grid(GridCommand::Copy),
        KeyCode::Char('f') if ctrl => return KeyAction::Search,
        KeyCode::Char('q') if ctrl => return KeyAction::Quit,
        _ => {}
    }

    if editing {
        match key.code {
            KeyCode::Esc => KeyAction::LeaveEdit,
            KeyCode::Enter => KeyAction::Grid(GridCommand::Commit),
            KeyCode::F(2) => KeyAction::Grid(GridCommand::StartEdit),
            KeyCode::Delete | KeyCode::Backspace => KeyAction::Grid(GridCommand::Clear),
            KeyCode::Char('v') if ctrl => KeyAction::PasteClipboard,
            KeyCode::Char('n') if ctrl => KeyAction::Grid(GridCommand::AddRow),
            KeyCode::Char('d') if ctrl => KeyAction::Grid(GridCommand::DeleteRows),
            KeyCode::Char('s') if ctrl => KeyAction::Save,
            KeyCode::Char(c) if !ctrl => KeyAction::Grid(GridCommand::Type(c)),
            _ => KeyAction::Ignore,
        }
    } else {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
            KeyCode::Char('e' | 'i') | KeyCode::F(2) => KeyAction::BeginEdit,
            KeyCode::Char('/') => KeyAction::Search,
            KeyCode::Char('c') => KeyAction::ClearFilter,
            KeyCode::Char('?') => KeyAction::Help,
            _ => KeyAction::Ignore,
        }
    }
}

const fn movement(code: KeyCode, ctrl: bool) -> Option<Move> {
    Some(match code {
        KeyCode::Up => Move::Up,
        KeyCode::Down => Move::Down,
        KeyCode::Left => Move::Left,
        KeyCode::Right => Move::Right,
        KeyCode::Tab => Move::Tab,
        KeyCode::BackTab => Move::BackTab,
        KeyCode::Home if ctrl => Move::Top,
        KeyCode::Home => Move::Home,
        KeyCode::End if ctrl => Move::Bottom,
        KeyCode::End => Move::End,
        KeyCode::PageUp => Move::PageUp,
        KeyCode::PageDown => Move::PageDown,
        _ => return None,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Prompt {
    Search(String),
    ConfirmDiscard(PendingSummary),
    /// Quitting while the store still lacks rows saved in this session.
    ConfirmUnsynced,
    Help,
}

/// The grid editor plus the book it saves into.
pub struct GridView {
    editor: GridEditor,
    book: PriceBook,
    /// Ask before leaving edit mode with pending work; otherwise save it.
    confirm_exit: bool,
    prompt: Option<Prompt>,
    quit_after_exit: bool,
    /// The in-memory book holds saved rows the store has not accepted yet.
    unsynced: bool,
    should_quit: bool,
}

impl GridView {
    pub const fn new(editor: GridEditor, book: PriceBook, confirm_exit: bool) -> Self {
        Self {
            editor,
            book,
            confirm_exit,
            prompt: None,
            quit_after_exit: false,
            unsynced: false,
            should_quit: false,
        }
    }

    pub const fn editor(&self) -> &GridEditor {
        &self.editor
    }

    pub const fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn handle_key(&mut self, key: KeyEvent, store: &dyn SnapshotStore) {
        if let Some(prompt) = self.prompt.take() {
            self.handle_prompt_key(prompt, key, store);
            return;
        }

        let editing = self.editor.sheet().is_editing();
        match key_action(key, editing, self.editor.buffer().is_some()) {
            KeyAction::Grid(command) => {
                self.editor.apply(command);
            }
            KeyAction::BeginEdit => self.editor.begin_edit(),
            KeyAction::LeaveEdit => self.leave_edit(false, store),
            KeyAction::Save => {
                self.save(store);
            }
            KeyAction::Search => {
                self.prompt = Some(Prompt::Search(self.editor.filter().search.clone()));
            }
            KeyAction::ToggleModified => {
                let mut filter = self.editor.filter().clone();
                filter.modified_only = !filter.modified_only;
                let label = if filter.modified_only { "modified rows only" } else { "all rows" };
                self.editor.set_filter(filter);
                self.editor.set_status(StatusLevel::Info, label);
            }
            KeyAction::ClearFilter => {
                self.editor.set_filter(ItemFilter::default());
                self.editor.set_status(StatusLevel::Info, "filters cleared");
            }
            KeyAction::PasteClipboard => {
                let text = self.editor.clipboard().to_string();
                if !text.is_empty() {
                    self.editor.apply(GridCommand::Paste(text));
                }
            }
            KeyAction::Help => self.prompt = Some(Prompt::Help),
            KeyAction::Quit => {
                if editing {
                    self.leave_edit(true, store);
                } else {
                    self.request_quit();
                }
            }
            KeyAction::Ignore => {}
        }
    }

    /// Text pasted into the terminal.
    pub fn handle_paste(&mut self, text: String) {
        if let Some(Prompt::Search(query)) = self.prompt.as_mut() {
            query.push_str(text.lines().next().unwrap_or_default());
            let query = query.clone();
            self.apply_search(query);
            return;
        }
        self.editor.apply(GridCommand::Paste(text));
    }

    fn handle_prompt_key(&mut self, prompt: Prompt, key: KeyEvent, store: &dyn SnapshotStore) {
        match prompt {
            Prompt::Search(mut query) => match key.code {
                KeyCode::Esc | KeyCode::Enter => {}
                KeyCode::Backspace => {
                    query.pop();
                    self.apply_search(query.clone());
                    self.prompt = Some(Prompt::Search(query));
                }
                KeyCode::Char(c) => {
                    query.push(c);
                    self.apply_search(query.clone());
                    self.prompt = Some(Prompt::Search(query));
                }
                _ => self.prompt = Some(Prompt::Search(query)),
            },
            Prompt::ConfirmDiscard(pending) => match key.code {
                KeyCode::Char('y' | 'Y') => {
                    self.editor.confirm_exit();
                    self.finish_exit();
                }
                KeyCode::Char('s' | 'S') => {
                    if self.save(store) {
                        self.leave_edit(self.quit_after_exit, store);
                    }
                }
                KeyCode::Char('n' | 'N') | KeyCode::Esc => {
                    self.quit_after_exit = false;
                    self.editor.set_status(StatusLevel::Info, "still editing");
                }
                _ => self.prompt = Some(Prompt::ConfirmDiscard(pending)),
            },
            Prompt::ConfirmUnsynced => match key.code {
                KeyCode::Char('r' | 'R') => {
                    if self.write_snapshot(store) {
                        self.should_quit = true;
                    }
                }
                KeyCode::Char('y' | 'Y') => {
                    warn!("quitting with saved rows the store never accepted");
                    self.should_quit = true;
                }
                KeyCode::Char('n' | 'N') | KeyCode::Esc => {
                    self.editor
                        .set_status(StatusLevel::Warn, "changes are not on disk yet; ^S to retry");
                }
                _ => self.prompt = Some(Prompt::ConfirmUnsynced),
            },
            Prompt::Help => {}
        }
    }

    fn apply_search(&mut self, query: String) {
        let mut filter = self.editor.filter().clone();
        filter.search = query;
        self.editor.set_filter(filter);
    }

    fn leave_edit(&mut self, then_quit: bool, store: &dyn SnapshotStore) {
        match self.editor.request_exit() {
            ExitDecision::Clean => {
                self.quit_after_exit = then_quit;
                self.finish_exit();
            }
            ExitDecision::NeedsConfirmation(pending) => {
                self.quit_after_exit = then_quit;
                if self.confirm_exit {
                    self.prompt = Some(Prompt::ConfirmDiscard(pending));
                } else if self.save(store) {
                    self.leave_edit(then_quit, store);
                } else {
                    self.quit_after_exit = false;
                }
            }
        }
    }

    fn finish_exit(&mut self) {
        if self.quit_after_exit {
            self.request_quit();
        }
        self.quit_after_exit = false;
    }

    /// Quit, unless saved rows still need writing to the store.
    fn request_quit(&mut self) {
        if self.unsynced {
            self.prompt = Some(Prompt::ConfirmUnsynced);
        } else {
            self.should_quit = true;
        }
    }

    /// Save the sheet into the book and write a snapshot; true on success.
    fn save(&mut self, store: &dyn SnapshotStore) -> bool {
        let report = match self.editor.save(&mut self.book) {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, "grid save rejected");
                return false;
            }
        };
        if report.is_empty() && !self.unsynced {
            return true;
        }
        if !self.write_snapshot(store) {
            return false;
        }
        info!(
            created = report.created.len(),
            updated = report.updated.len(),
            deleted = report.deleted.len(),
            "grid saved"
        );
        true
    }

    /// Write the in-memory book to `store`; true on success.
    fn write_snapshot(&mut self, store: &dyn SnapshotStore) -> bool {
        match store.save(&Snapshot::new(self.book.clone())) {
            Ok(()) => {
                self.unsynced = false;
                true
            }
            Err(err) => {
                self.unsynced = true;
                warn!(error = %err, "snapshot write failed");
                self.editor
                    .set_status(StatusLevel::Error, format!("save failed: {err}"));
                false
            }
        }
    }

    /// Render the grid into `area`.
    pub fn render(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(4),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(area);

        // Borders plus the column header row.
        let body_rows = chunks[0].height.saturating_sub(3);
        self.editor.set_viewport_rows(usize::from(body_rows));

        render_table(frame, &self.editor, chunks[0]);
        render_status(frame, self, chunks[1]);
        render_hints(frame, self, chunks[2]);

        match &self.prompt {
            Some(Prompt::ConfirmDiscard(pending)) => render_confirm(frame, pending, area),
            Some(Prompt::ConfirmUnsynced) => render_unsynced(frame, area),
            Some(Prompt::Help) => render_help(frame, area),
            Some(Prompt::Search(_)) | None => {}
        }
    }
}

fn render_table(frame: &mut Frame<'_>, editor: &GridEditor, area: Rect) {
    let sheet = editor.sheet();
    let tracker = sheet.tracker();
    let selection = editor.selection();
    let focus = selection.focus();
    let (scroll, visible) = editor.viewport();
    let end = scroll.saturating_add(visible).min(editor.row_count());

    let header = Row::new(
        std::iter::once(Cell::from("ID")).chain(editor.columns().iter().map(|c| Cell::from(c.title))),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));

    let mut rows = Vec::with_capacity(end.saturating_sub(scroll));
    for idx in scroll..end {
        let Some(item) = editor.row_at(idx) else {
            continue;
        };
        let id_style = if sheet.is_draft(&item.id) {
            Style::default().fg(Color::Magenta)
        } else if tracker.is_new(&item.id) {
            Style::default().fg(Color::Green)
        } else if tracker.is_modified(&item.id) {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let mut cells = vec![Cell::from(item.id.to_string()).style(id_style)];
        for (col, column) in editor.columns().iter().enumerate() {
            let pos = CellPos::new(idx, col);
            let text = match editor.buffer() {
                Some(buffer) if pos == focus && buffer.row == item.id && buffer.field == column.field => {
                    format!("{}▏", buffer.text)
                }
                _ => editor.cell_text(pos),
            };
            let mut style = Style::default();
            if editor.is_cell_dirty(pos) {
                style = style.fg(Color::Yellow);
            }
            if selection.contains(pos) {
                style = style.add_modifier(Modifier::REVERSED);
            }
            if pos == focus {
                style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
            }
            cells.push(Cell::from(text).style(style));
        }
        rows.push(Row::new(cells));
    }

    let widths: Vec<Constraint> = std::iter::once(Constraint::Length(ID_WIDTH))
        .chain(editor.columns().iter().map(|c| Constraint::Length(c.width)))
        .collect();

    let scope = sheet.scope().unwrap_or("all headers");
    let mode = if sheet.is_editing() {
        let pending = sheet.pending();
        format!(
            "[EDIT] {} new, {} modified, {} deleted",
            pending.new, pending.modified, pending.deleted
        )
    } else {
        "[VIEW]".to_string()
    };
    let title = format!(
        " pricebook · {scope} · {} of {} rows {mode} ",
        editor.row_count(),
        sheet.rows().len()
    );
    let border_style = if sheet.is_editing() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Green)
    };

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_set(border::ROUNDED)
                .border_style(border_style)
                .title(title)
                .title_style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
        );
    frame.render_widget(table, area);
}

fn render_status(frame: &mut Frame<'_>, view: &GridView, area: Rect) {
    let line = if let Some(Prompt::Search(query)) = &view.prompt {
        Line::from(vec![
            Span::styled("search: ", Style::default().fg(Color::Cyan)),
            Span::raw(format!("{query}▏")),
        ])
    } else if let Some(status) = view.editor.status() {
        let color = match status.level {
            StatusLevel::Info => Color::Green,
            StatusLevel::Warn => Color::Yellow,
            StatusLevel::Error => Color::Red,
        };
        Line::from(Span::styled(status.text.clone(), Style::default().fg(color)))
    } else {
        Line::from(Span::styled(
            filter_summary(view.editor.filter()),
            Style::default().fg(Color::DarkGray),
        ))
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn filter_summary(filter: &ItemFilter) -> String {
    if filter.is_empty() {
        return "no filters".to_string();
    }
    let mut parts = Vec::new();
    if !filter.search.is_empty() {
        parts.push(format!("search \"{}\"", filter.search));
    }
    if filter.modified_only {
        parts.push("modified only".to_string());
    }
    if parts.is_empty() {
        parts.push("filtered".to_string());
    }
    parts.join(" · ")
}

fn render_hints(frame: &mut Frame<'_>, view: &GridView, area: Rect) {
    let hints = if view.editor.buffer().is_some() {
        "Enter commit · Tab commit→ · Esc cancel"
    } else if view.editor.sheet().is_editing() {
        "type/F2 edit · ^S save · ^N row · ^D delete · ^C/^V copy/paste · F4 modified · Esc exit · F1 help"
    } else {
        "e edit · / search · c clear · ^C copy · ? help · q quit"
    };
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(hints, Style::default().fg(Color::DarkGray)))),
        area,
    );
}

fn render_confirm(frame: &mut Frame<'_>, pending: &PendingSummary, area: Rect) {
    let popup = centered_rect(52, 7, area);
    let text = vec![
        Line::from(format!(
            "{} new, {} modified, {} deleted, {} draft row(s) unsaved.",
            pending.new, pending.modified, pending.deleted, pending.drafts
        )),
        Line::from(""),
        Line::from("y discard · s save · n keep editing"),
    ];
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(text).wrap(Wrap { trim: true }).block(
            Block::default()
                .borders(Borders::ALL)
                .border_set(border::ROUNDED)
                .border_style(Style::default().fg(Color::Red))
                .title(" Leave edit mode? "),
        ),
        popup,
    );
}

fn render_unsynced(frame: &mut Frame<'_>, area: Rect) {
    let popup = centered_rect(52, 7, area);
    let text = vec![
        Line::from("Saved changes could not be written to disk."),
        Line::from(""),
        Line::from("r retry and quit · y quit anyway · n stay"),
    ];
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(text).wrap(Wrap { trim: true }).block(
            Block::default()
                .borders(Borders::ALL)
                .border_set(border::ROUNDED)
                .border_style(Style::default().fg(Color::Red))
                .title(" Quit without writing? "),
        ),
        popup,
    );
}

fn render_help(frame: &mut Frame<'_>, area: Rect) {
    let popup = centered_rect(64, 16, area);
    let lines = [
        "arrows / Tab / Home / End    move (Shift extends)",
        "Ctrl+Home / Ctrl+End         first / last row",
        "PgUp / PgDn                  page",
        "type or F2                   edit cell",
        "Enter / Tab                  commit cell",
        "Alt+Up / Alt+Down            cycle unit of measure",
        "Del                          clear selection",
        "Ctrl+A / Ctrl+C / Ctrl+V     select all / copy / paste",
        "Ctrl+N / Ctrl+D              new row / delete rows",
        "Ctrl+S                       save",
        "Ctrl+F or /                  search",
        "F4 / F5                      modified only / clear filters",
        "Esc                          cancel cell or leave edit mode",
    ];
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines.iter().map(|l| Line::from(*l)).collect::<Vec<_>>()).block(
            Block::default()
                .borders(Borders::ALL)
                .border_set(border::ROUNDED)
                .title(" Keys "),
        ),
        popup,
    );
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Run the grid full-screen until the user quits.
///
/// # Errors
///
/// Returns an error if the terminal cannot be set up or drawn.
pub fn run(view: &mut GridView, store: &dyn SnapshotStore) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableBracketedPaste, LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let result = event_loop(&mut terminal, view, store);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableBracketedPaste, LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    view: &mut GridView,
    store: &dyn SnapshotStore,
) -> Result<()> {
    while !view.should_quit() {
        terminal.draw(|frame| {
            let area = frame.area();
            view.render(frame, area);
        })?;
        if event::poll(Duration::from_millis(250))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => view.handle_key(key, store),
                Event::Paste(text) => view.handle_paste(text),
                _ => {}
            }
        }
    }
    Ok(())
}
