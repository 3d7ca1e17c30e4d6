//! `pb header`: configure customer price sheets.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use pricebook_core::book::NewHeader;
use pricebook_core::model::HeaderStatus;
use serde::Serialize;

use super::{Context, Project, parse_date};
use crate::output::{or_dash, pretty_section, render, render_mode};

#[derive(Subcommand, Debug)]
pub enum HeaderCommand {
    /// Configure a new price header for a customer.
    Add(AddArgs),
    /// List price headers with their status as of today.
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Customer id, e.g. C-0001.
    #[arg(long)]
    pub customer: String,

    #[arg(long)]
    pub name: String,

    /// Currency code; defaults to `[pricing] currency` from config.
    #[arg(long)]
    pub currency: Option<String>,

    #[arg(long, value_parser = parse_date)]
    pub effective: NaiveDate,

    #[arg(long, value_parser = parse_date)]
    pub expiration: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only headers of this customer.
    #[arg(long)]
    pub customer: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HeaderRow {
    id: String,
    customer_id: String,
    customer: String,
    name: String,
    currency: String,
    effective_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    expiration_date: Option<NaiveDate>,
    status: HeaderStatus,
    items: usize,
}

/// # Errors
///
/// Returns an error if the project cannot be opened or the header is invalid.
pub fn run_header(command: &HeaderCommand, ctx: &Context) -> Result<()> {
    let project = Project::open(&ctx.root)?;
    let mut book = project.load()?;
    match command {
        HeaderCommand::Add(args) => {
            let currency = args
                .currency
                .clone()
                .unwrap_or_else(|| project.config.pricing.currency.clone());
            let id = book.add_header(NewHeader {
                customer_id: args.customer.clone(),
                name: args.name.clone(),
                currency,
                effective_date: args.effective,
                expiration_date: args.expiration,
            })?;
            let header = book.header(&id).cloned();
            project.persist(book)?;
            render(ctx.output, &header, |h, w| match h {
                Some(h) => writeln!(
                    w,
                    "✓ Added price header {} \"{}\" ({}, effective {})",
                    h.id, h.name, h.currency, h.effective_date
                ),
                None => Ok(()),
            })
        }
        HeaderCommand::List(args) => {
            let rows: Vec<HeaderRow> = book
                .headers
                .iter()
                .filter(|h| args.customer.as_deref().is_none_or(|c| h.customer_id == c))
                .map(|h| HeaderRow {
                    id: h.id.clone(),
                    customer_id: h.customer_id.clone(),
                    customer: book
                        .customer(&h.customer_id)
                        .map_or_else(String::new, |c| c.code.clone()),
                    name: h.name.clone(),
                    currency: h.currency.clone(),
                    effective_date: h.effective_date,
                    expiration_date: h.expiration_date,
                    status: h.status_on(ctx.today),
                    items: book.items.iter().filter(|i| i.header_id == h.id).count(),
                })
                .collect();
            render_mode(
                ctx.output,
                &rows,
                |rows, w| {
                    for r in rows {
                        writeln!(
                            w,
                            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                            r.id,
                            r.customer_id,
                            r.name,
                            r.currency,
                            r.effective_date,
                            or_dash(r.expiration_date),
                            r.status
                        )?;
                    }
                    Ok(())
                },
                |rows: &Vec<HeaderRow>, w| {
                    pretty_section(w, &format!("Price headers ({})", rows.len()))?;
                    for r in rows {
                        writeln!(
                            w,
                            "{:<8} {:<8} {:<24} {} {} → {:<10} {:<8} {} item(s)",
                            r.id,
                            r.customer,
                            r.name,
                            r.currency,
                            r.effective_date,
                            or_dash(r.expiration_date),
                            r.status,
                            r.items
                        )?;
                    }
                    Ok(())
                },
            )
        }
    }
}
