//! `pb bulk`: apply one change to many line items.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use pricebook_core::model::{RowId, Uom};
use pricebook_core::sheet::{BulkPatch, BulkReport, PriceChange};
use serde::Serialize;
use tracing::info;

use super::item::FilterArgs;
use super::{Context, Project, editing_sheet, parse_date, row_ids, save_sheet};
use crate::output::{pretty_kv, render};

#[derive(Args, Debug)]
pub struct BulkArgs {
    /// Line item ids to change.
    pub ids: Vec<String>,

    /// Change every item matching the filter flags instead of listed ids.
    #[arg(long, conflicts_with = "ids")]
    pub all: bool,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// New unit price (12.50) or percentage change (+5%, -10%).
    #[arg(long, allow_hyphen_values = true)]
    pub price: Option<PriceChange>,

    /// New minimum price or percentage change; percentages skip items
    /// without a minimum.
    #[arg(long, allow_hyphen_values = true)]
    pub min_price: Option<PriceChange>,

    #[arg(long)]
    pub set_name: Option<String>,

    #[arg(long)]
    pub set_size: Option<String>,

    #[arg(long)]
    pub set_uom: Option<Uom>,

    #[arg(long, value_parser = parse_date)]
    pub effective: Option<NaiveDate>,

    #[arg(long, value_parser = parse_date)]
    pub expiration: Option<NaiveDate>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Report what would change without saving.
    #[arg(long)]
    pub dry_run: bool,
}

impl BulkArgs {
    fn patch(&self) -> BulkPatch {
        BulkPatch {
            product_name: self.set_name.clone(),
            unit_price: self.price,
            minimum_price: self.min_price,
            container_size: self.set_size.clone(),
            uom: self.set_uom,
            effective_date: self.effective,
            expiration_date: self.expiration,
            notes: self.notes.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct BulkSummary {
    #[serde(flatten)]
    report: BulkReport,
    saved: bool,
}

/// # Errors
///
/// Returns an error if nothing is selected, the patch is empty, or any
/// selected item would end up with inverted dates.
pub fn run_bulk(args: &BulkArgs, ctx: &Context) -> Result<()> {
    let project = Project::open(&ctx.root)?;
    let book = project.load()?;
    let mut sheet = editing_sheet(&book, args.filter.header.as_deref())?;

    let ids: Vec<RowId> = if args.all {
        sheet
            .visible_rows(&args.filter.to_filter(), ctx.today)
            .into_iter()
            .map(|r| r.id.clone())
            .collect()
    } else {
        row_ids(&args.ids)
    };

    let report = sheet.bulk_edit(&ids, &args.patch())?;
    let saved = !args.dry_run;
    if saved {
        save_sheet(&project, book, &mut sheet)?;
    }
    info!(updated = report.updated.len(), dry_run = args.dry_run, "bulk edit applied");

    let summary = BulkSummary { report, saved };
    render(ctx.output, &summary, |s, w| {
        let verb = if s.saved { "Updated" } else { "Would update" };
        writeln!(w, "✓ {verb} {} item(s)", s.report.updated.len())?;
        let fields: Vec<&str> = s.report.fields.iter().map(|f| f.title()).collect();
        pretty_kv(w, "Fields", fields.join(", "))?;
        if !s.report.skipped_drafts.is_empty() {
            pretty_kv(w, "Skipped", format!("{} draft row(s)", s.report.skipped_drafts.len()))?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: BulkArgs,
    }

    #[test]
    fn negative_percentages_parse_as_values() {
        let w = Wrapper::parse_from(["test", "PI-000001", "PI-000002", "--price", "-10%"]);
        assert_eq!(w.args.ids.len(), 2);
        assert_eq!(w.args.price, Some(PriceChange::Percent(-10.0)));
        assert!(!w.args.all);
    }

    #[test]
    fn patch_carries_every_flag() {
        let w = Wrapper::parse_from([
            "test",
            "--all",
            "--header",
            "PH-0001",
            "--price",
            "12",
            "--set-uom",
            "ea",
            "--expiration",
            "2027-12-31",
        ]);
        let patch = w.args.patch();
        assert_eq!(patch.unit_price, Some(PriceChange::Absolute(12.0)));
        assert_eq!(patch.uom, Some(Uom::Ea));
        assert!(patch.expiration_date.is_some());
        assert!(patch.product_name.is_none());
    }

    #[test]
    fn all_conflicts_with_ids() {
        assert!(Wrapper::try_parse_from(["test", "PI-000001", "--all", "--notes", "x"]).is_err());
    }
}
