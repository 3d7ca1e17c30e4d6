//! `pb item`: list, add, and edit price line items.

use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use pricebook_core::PriceSheet;
use pricebook_core::filter::{Choice, ItemFilter};
use pricebook_core::model::{Field, HeaderStatus, PriceItem, RowId, Uom};
use pricebook_core::sheet::CommitOutcome;
use serde::Serialize;
use std::io::{self, Write};

use super::{Context, Project, editing_sheet, parse_date, save_sheet};
use crate::output::{money, or_dash, pretty_kv, pretty_section, render, render_mode};

#[derive(Subcommand, Debug)]
pub enum ItemCommand {
    /// List line items, optionally filtered.
    List(ListArgs),
    /// Add a line item to a price header.
    Add(AddArgs),
    /// Set one cell of a line item.
    Set(SetArgs),
}

/// Filter flags shared by listing, bulk edits, and export.
#[derive(Args, Debug, Default, Clone)]
pub struct FilterArgs {
    /// Only items of this price header.
    #[arg(long)]
    pub header: Option<String>,

    /// Only items whose header belongs to this customer.
    #[arg(long)]
    pub customer: Option<String>,

    /// Substring of product name or product code.
    #[arg(short, long)]
    pub search: Option<String>,

    /// Substring of the container size.
    #[arg(long)]
    pub size: Option<String>,

    #[arg(long)]
    pub uom: Option<Uom>,

    /// Header status: pending, active, expired.
    #[arg(long)]
    pub status: Option<HeaderStatus>,

    /// Effective on or after this day.
    #[arg(long, value_parser = parse_date)]
    pub from: Option<NaiveDate>,

    /// Effective on or before this day.
    #[arg(long, value_parser = parse_date)]
    pub to: Option<NaiveDate>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> ItemFilter {
        ItemFilter {
            search: self.search.clone().unwrap_or_default(),
            container_size: self.size.clone().unwrap_or_default(),
            uom: self.uom.map_or(Choice::All, Choice::Only),
            header_id: self.header.clone(),
            customer_id: self.customer.clone(),
            status: self.status.map_or(Choice::All, Choice::Only),
            effective_from: self.from,
            effective_to: self.to,
            ..ItemFilter::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Maximum items to show.
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Price header the item belongs to.
    #[arg(long)]
    pub header: String,

    #[arg(long)]
    pub name: String,

    /// Unit price, e.g. 12.50 or $12.50.
    #[arg(long)]
    pub price: String,

    #[arg(long)]
    pub code: Option<String>,

    #[arg(long)]
    pub min: Option<String>,

    #[arg(long)]
    pub size: Option<String>,

    #[arg(long)]
    pub uom: Option<Uom>,

    #[arg(long, value_parser = parse_date)]
    pub effective: Option<NaiveDate>,

    #[arg(long, value_parser = parse_date)]
    pub expiration: Option<NaiveDate>,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Line item id, e.g. PI-000001.
    pub id: String,

    /// Column: productCode, productName, unitPrice, minimumPrice,
    /// containerSize, uom, effectiveDate, expirationDate, notes.
    pub field: Field,

    /// New cell text; an empty string clears the cell.
    pub value: String,
}

#[derive(Debug, Serialize)]
struct SetReport<'a> {
    #[serde(flatten)]
    outcome: &'a CommitOutcome,
    item: Option<&'a PriceItem>,
}

/// # Errors
///
/// Returns an error if the project cannot be opened or an edit is rejected.
pub fn run_item(command: &ItemCommand, ctx: &Context) -> Result<()> {
    match command {
        ItemCommand::List(args) => run_list(args, ctx),
        ItemCommand::Add(args) => run_add(args, ctx),
        ItemCommand::Set(args) => run_set(args, ctx),
    }
}

fn run_list(args: &ListArgs, ctx: &Context) -> Result<()> {
    let project = Project::open(&ctx.root)?;
    let book = project.load()?;
    let sheet = PriceSheet::open(&book, args.filter.header.as_deref())?;
    let filter = args.filter.to_filter();
    let mut rows = sheet.visible_rows(&filter, ctx.today);
    if let Some(limit) = args.limit {
        rows.truncate(limit);
    }
    render_mode(
        ctx.output,
        &rows,
        |rows, w| {
            for item in rows {
                write_item_tsv(w, item)?;
            }
            Ok(())
        },
        |rows, w| {
            pretty_section(w, &format!("Price items ({} of {})", rows.len(), sheet.rows().len()))?;
            writeln!(
                w,
                "{:<10} {:<8} {:<26} {:>10} {:>10} {:<5} {:<10} {:<10}",
                "ID", "HEADER", "PRODUCT", "PRICE", "MIN", "UOM", "EFFECTIVE", "EXPIRES"
            )?;
            for item in rows {
                writeln!(
                    w,
                    "{:<10} {:<8} {:<26} {:>10} {:>10} {:<5} {:<10} {:<10}",
                    item.id,
                    item.header_id,
                    truncate(&item.product_name, 26),
                    money(item.unit_price),
                    or_dash(item.minimum_price.map(money)),
                    or_dash(item.uom),
                    or_dash(item.effective_date),
                    or_dash(item.expiration_date),
                )?;
            }
            Ok(())
        },
    )
}

fn run_add(args: &AddArgs, ctx: &Context) -> Result<()> {
    let project = Project::open(&ctx.root)?;
    let book = project.load()?;
    let mut sheet = editing_sheet(&book, Some(&args.header))?;

    let temp = sheet.add_draft_row(Some(&args.header))?;
    let effective = args.effective.map(|d| d.to_string());
    let expiration = args.expiration.map(|d| d.to_string());
    let cells = [
        (Field::ProductName, Some(args.name.as_str())),
        (Field::UnitPrice, Some(args.price.as_str())),
        (Field::ProductCode, args.code.as_deref()),
        (Field::MinimumPrice, args.min.as_deref()),
        (Field::ContainerSize, args.size.as_deref()),
        (Field::Uom, args.uom.map(Uom::as_str)),
        (Field::EffectiveDate, effective.as_deref()),
        (Field::ExpirationDate, expiration.as_deref()),
        (Field::Notes, args.notes.as_deref()),
    ];
    for (field, value) in cells {
        if let Some(value) = value {
            sheet.commit_cell(&temp, field, value)?;
        }
    }

    let report = save_sheet(&project, book, &mut sheet)?;
    let id = report
        .created
        .first()
        .map(|(_, assigned)| assigned.clone())
        .context("item was not created")?;
    let item = sheet.row(&id);
    render(ctx.output, &item, |item, w| match item {
        Some(item) => writeln!(
            w,
            "✓ Added {} \"{}\" at {} to {}",
            item.id,
            item.product_name,
            money(item.unit_price),
            item.header_id
        ),
        None => Ok(()),
    })
}

fn run_set(args: &SetArgs, ctx: &Context) -> Result<()> {
    let project = Project::open(&ctx.root)?;
    let book = project.load()?;
    let mut sheet = editing_sheet(&book, None)?;
    let id = RowId::new(args.id.trim());

    let outcome = sheet.commit_cell(&id, args.field, &args.value)?;
    save_sheet(&project, book, &mut sheet)?;

    let report = SetReport {
        outcome: &outcome,
        item: sheet.row(&id),
    };
    render(ctx.output, &report, |r, w| {
        let verb = match r.outcome {
            CommitOutcome::Unchanged => "Unchanged",
            CommitOutcome::Reverted { .. } => "Reverted",
            _ => "Updated",
        };
        writeln!(w, "✓ {verb} {} {}", id, args.field)?;
        if let Some(item) = r.item {
            pretty_kv(w, args.field.title(), item.get(args.field).display())?;
        }
        Ok(())
    })
}

/// One tab-separated line per item, in export column order.
pub fn write_item_tsv(w: &mut dyn Write, item: &PriceItem) -> io::Result<()> {
    let cells: Vec<String> = Field::ALL.iter().map(|f| item.get(*f).display()).collect();
    writeln!(w, "{}\t{}\t{}", item.id, item.header_id, cells.join("\t"))
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}
