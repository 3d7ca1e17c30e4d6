//! `pb delete`: remove line items that are not yet in effect.

use anyhow::Result;
use clap::Args;
use pricebook_core::sheet::SaveReport;

use super::{Context, Project, editing_sheet, row_ids, save_sheet};
use crate::output::render;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Line item ids to delete.
    #[arg(required = true)]
    pub ids: Vec<String>,
}

/// Delete the listed items.
///
/// The whole request is refused when any item is already in effect.
///
/// # Errors
///
/// Returns an error naming every blocking item, or if an id is unknown.
pub fn run_delete(args: &DeleteArgs, ctx: &Context) -> Result<()> {
    let project = Project::open(&ctx.root)?;
    let book = project.load()?;
    let mut sheet = editing_sheet(&book, None)?;

    sheet.delete_rows(&row_ids(&args.ids), ctx.today)?;
    let report = save_sheet(&project, book, &mut sheet)?;

    render(ctx.output, &report, |r: &SaveReport, w| {
        writeln!(w, "✓ Deleted {} item(s)", r.deleted.len())?;
        for id in &r.deleted {
            writeln!(w, "  {id}")?;
        }
        Ok(())
    })
}
