//! `pb grid`: open the full-screen spreadsheet editor.

use anyhow::{Result, bail};
use clap::Args;
use pricebook_core::PriceSheet;
use pricebook_core::grid::GridEditor;
use std::io::IsTerminal;
use tracing::info;

use super::{Context, Project};
use crate::tui::grid::{GridView, run};

#[derive(Args, Debug)]
pub struct GridArgs {
    /// Limit the grid to one price header.
    #[arg(long)]
    pub header: Option<String>,

    /// Start in edit mode.
    #[arg(short, long)]
    pub edit: bool,
}

/// # Errors
///
/// Returns an error in JSON mode or when stdout is not a terminal, and
/// when the project or header cannot be opened.
pub fn run_grid(args: &GridArgs, ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        bail!("pb grid is interactive and has no JSON output");
    }
    if !std::io::stdout().is_terminal() {
        bail!("pb grid needs an interactive terminal; use `pb item list` or `pb export` instead");
    }
    let project = Project::open(&ctx.root)?;
    let book = project.load()?;
    let sheet = PriceSheet::open(&book, args.header.as_deref())?;

    let mut editor = GridEditor::new(sheet, ctx.today, project.config.grid.page_rows);
    if args.edit {
        editor.begin_edit();
    }
    info!(header = ?args.header, rows = editor.row_count(), "opening grid");

    let mut view = GridView::new(editor, book, project.config.edit.confirm_exit);
    run(&mut view, &project.store)
}
