//! `pb export` / `pb import`: line items as CSV or TSV.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Args, ValueEnum};
use pricebook_core::PriceSheet;
use pricebook_core::exchange::{ImportReport, export_items, import_rows, read_rows, write_rows};
use pricebook_core::model::RowId;
use serde::Serialize;

use super::item::FilterArgs;
use super::{Context, Project, editing_sheet, save_sheet};
use crate::output::{pretty_kv, render};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TableFormat {
    Csv,
    Tsv,
}

impl TableFormat {
    const fn delimiter(self) -> u8 {
        match self {
            Self::Csv => b',',
            Self::Tsv => b'\t',
        }
    }

    /// Explicit format, else by file extension, else CSV.
    fn resolve(explicit: Option<Self>, path: Option<&Path>) -> Self {
        explicit.unwrap_or_else(|| {
            let tsv = path
                .and_then(Path::extension)
                .is_some_and(|ext| ext.eq_ignore_ascii_case("tsv") || ext.eq_ignore_ascii_case("txt"));
            if tsv { Self::Tsv } else { Self::Csv }
        })
    }
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Write to this file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub format: Option<TableFormat>,

    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// CSV or TSV file with a header row; `-` reads stdin.
    pub file: PathBuf,

    /// Header for rows without a `headerId` column value.
    #[arg(long)]
    pub header: Option<String>,

    #[arg(long, value_enum)]
    pub format: Option<TableFormat>,

    /// Report what would change without saving.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
struct ExportSummary {
    path: String,
    rows: usize,
}

#[derive(Debug, Serialize)]
struct ImportSummary {
    #[serde(flatten)]
    report: ImportReport,
    /// `(temporary, assigned)` ids of created items.
    assigned: Vec<(RowId, RowId)>,
    saved: bool,
}

/// # Errors
///
/// Returns an error if the project cannot be opened or the output cannot
/// be written.
pub fn run_export(args: &ExportArgs, ctx: &Context) -> Result<()> {
    let project = Project::open(&ctx.root)?;
    let book = project.load()?;
    let sheet = PriceSheet::open(&book, args.filter.header.as_deref())?;
    let rows = export_items(sheet.visible_rows(&args.filter.to_filter(), ctx.today));
    let format = TableFormat::resolve(args.format, args.output.as_deref());

    match &args.output {
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            write_rows(&mut out, &rows, format.delimiter())?;
            out.flush()?;
            Ok(())
        }
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut out = BufWriter::new(file);
            write_rows(&mut out, &rows, format.delimiter())?;
            out.flush()?;
            let summary = ExportSummary {
                path: path.display().to_string(),
                rows: rows.rows.len(),
            };
            render(ctx.output, &summary, |s, w| {
                writeln!(w, "✓ Exported {} item(s) to {}", s.rows, s.path)
            })
        }
    }
}

/// # Errors
///
/// Returns an error if the file cannot be read, its header row names an
/// unknown column, or the snapshot cannot be written.
pub fn run_import(args: &ImportArgs, ctx: &Context) -> Result<()> {
    let project = Project::open(&ctx.root)?;
    let book = project.load()?;
    let format = TableFormat::resolve(args.format, Some(&args.file));

    let rows = if args.file.as_os_str() == "-" {
        read_rows(io::stdin().lock(), format.delimiter())?
    } else {
        let file = File::open(&args.file)
            .with_context(|| format!("Failed to open {}", args.file.display()))?;
        read_rows(BufReader::new(file), format.delimiter())?
    };

    let mut sheet = editing_sheet(&book, args.header.as_deref())?;
    let report = import_rows(&mut sheet, args.header.as_deref(), &rows)?;
    let saved = !args.dry_run;
    let assigned = if saved {
        save_sheet(&project, book, &mut sheet)?.created
    } else {
        Vec::new()
    };

    let summary = ImportSummary {
        report,
        assigned,
        saved,
    };
    render(ctx.output, &summary, |s, w| {
        let verb = if s.saved { "Imported" } else { "Would import" };
        writeln!(
            w,
            "✓ {verb}: {} created, {} updated, {} unchanged, {} failed",
            s.report.created.len(),
            s.report.updated.len(),
            s.report.unchanged,
            s.report.failures.len()
        )?;
        for (temp, id) in &s.assigned {
            pretty_kv(w, temp.as_str(), id.as_str())?;
        }
        for failure in &s.report.failures {
            writeln!(w, "  line {}: {}", failure.line, failure.reason)?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_flag_then_extension() {
        assert_eq!(
            TableFormat::resolve(Some(TableFormat::Csv), Some(Path::new("a.tsv"))),
            TableFormat::Csv
        );
        assert_eq!(TableFormat::resolve(None, Some(Path::new("a.TSV"))), TableFormat::Tsv);
        assert_eq!(TableFormat::resolve(None, Some(Path::new("a.csv"))), TableFormat::Csv);
        assert_eq!(TableFormat::resolve(None, None), TableFormat::Csv);
        assert_eq!(TableFormat::Tsv.delimiter(), b'\t');
    }
}
