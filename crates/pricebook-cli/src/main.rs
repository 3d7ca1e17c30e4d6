#![forbid(unsafe_code)]

mod cmd;
mod output;
mod tui;

use std::env;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode, render_error};
use pricebook_core::config::resolve_config;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cmd::Context;

#[derive(Parser, Debug)]
#[command(
    name = "pb",
    author,
    version,
    about = "pricebook: customer price sheets with tracked edits",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Evaluate effective-date rules as of this day (YYYY-MM-DD).
    #[arg(long, global = true, value_parser = cmd::parse_date)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a pricebook",
        long_about = "Create .pricebook/ with an empty snapshot and a default config.toml.",
        after_help = "EXAMPLES:\n    # Initialize in the current directory\n    pb init\n\n    # Emit machine-readable output\n    pb init --json"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Records",
        about = "Add or list customers",
        after_help = "EXAMPLES:\n    # Add a customer\n    pb customer add ACME \"Acme Janitorial\"\n\n    # List customers\n    pb customer list --json"
    )]
    Customer {
        #[command(subcommand)]
        command: cmd::customer::CustomerCommand,
    },

    #[command(
        next_help_heading = "Records",
        about = "Add or list price headers",
        after_help = "EXAMPLES:\n    # Add a price header effective from January\n    pb header add --customer C-0001 --name \"Acme 2027\" --effective 2027-01-01\n\n    # List one customer's headers\n    pb header list --customer C-0001"
    )]
    Header {
        #[command(subcommand)]
        command: cmd::header::HeaderCommand,
    },

    #[command(
        next_help_heading = "Records",
        about = "List, add, or edit line items",
        after_help = "EXAMPLES:\n    # List items of one header\n    pb item list --header PH-0001\n\n    # Add an item\n    pb item add --header PH-0001 --name \"Bleach 5%\" --price 12.50 --uom cs\n\n    # Change one cell\n    pb item set PI-000001 price 13.25"
    )]
    Item {
        #[command(subcommand)]
        command: cmd::item::ItemCommand,
    },

    #[command(
        next_help_heading = "Editing",
        about = "Apply one change to many items",
        long_about = "Apply the same field changes to listed items, or to every item matching the filter with --all.",
        after_help = "EXAMPLES:\n    # Raise prices 5% on one header\n    pb bulk --all --header PH-0001 --price +5%\n\n    # Set unit of measure on two items\n    pb bulk PI-000001 PI-000002 --set-uom cs\n\n    # Preview without saving\n    pb bulk --all --search soap --price -10% --dry-run"
    )]
    Bulk(cmd::bulk::BulkArgs),

    #[command(
        next_help_heading = "Editing",
        about = "Delete items not yet in effect",
        after_help = "EXAMPLES:\n    # Delete two pending items\n    pb delete PI-000003 PI-000004"
    )]
    Delete(cmd::delete::DeleteArgs),

    #[command(
        next_help_heading = "Editing",
        about = "Open the spreadsheet editor",
        after_help = "EXAMPLES:\n    # Browse every item\n    pb grid\n\n    # Edit one header\n    pb grid --header PH-0001 --edit"
    )]
    Grid(cmd::grid::GridArgs),

    #[command(
        next_help_heading = "Exchange",
        about = "Export items as CSV or TSV",
        after_help = "EXAMPLES:\n    # Export one header to a file\n    pb export --header PH-0001 -o acme.csv\n\n    # Pipe TSV to another tool\n    pb export --format tsv | column -t"
    )]
    Export(cmd::exchange::ExportArgs),

    #[command(
        next_help_heading = "Exchange",
        about = "Import items from CSV or TSV",
        long_about = "Update items whose id matches and create the rest. Rows that fail are reported by line and skipped.",
        after_help = "EXAMPLES:\n    # Import into a header\n    pb import acme.csv --header PH-0001\n\n    # Check a file first\n    pb import acme.csv --header PH-0001 --dry-run"
    )]
    Import(cmd::exchange::ImportArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    # Bash\n    pb completions bash > ~/.local/share/bash-completion/completions/pb\n\n    # Zsh\n    pb completions zsh > ~/.zfunc/_pb"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PRICEBOOK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "pricebook=debug,pb=debug,info"
        } else {
            "pricebook=info,pb=info,warn"
        })
    });

    let format = env::var("PRICEBOOK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn output_mode(cli: &Cli, root: &std::path::Path) -> OutputMode {
    match resolve_config(root, cli.json) {
        Ok(config) => OutputMode::from_resolved(&config.resolved_output),
        Err(err) => {
            warn!(error = %err, "config unreadable; using default output");
            if cli.json {
                OutputMode::Json
            } else {
                OutputMode::Pretty
            }
        }
    }
}

fn dispatch(cli: &Cli, ctx: &Context) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, &ctx.root, ctx.output),
        Commands::Customer { command } => cmd::customer::run_customer(command, ctx),
        Commands::Header { command } => cmd::header::run_header(command, ctx),
        Commands::Item { command } => cmd::item::run_item(command, ctx),
        Commands::Bulk(args) => cmd::bulk::run_bulk(args, ctx),
        Commands::Delete(args) => cmd::delete::run_delete(args, ctx),
        Commands::Grid(args) => cmd::grid::run_grid(args, ctx),
        Commands::Export(args) => cmd::exchange::run_export(args, ctx),
        Commands::Import(args) => cmd::exchange::run_import(args, ctx),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args, &mut command)
        }
    }
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let root = match env::current_dir() {
        Ok(root) => root,
        Err(err) => {
            eprintln!("error: cannot read current directory: {err}");
            return ExitCode::FAILURE;
        }
    };
    let output = output_mode(&cli, &root);
    let today = cli.today.unwrap_or_else(|| chrono::Local::now().date_naive());
    debug!(root = %root.display(), ?output, %today, "starting");

    let ctx = Context {
        root,
        output,
        today,
    };

    match dispatch(&cli, &ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!(error = ?err, "command failed");
            if let Err(io_err) = render_error(ctx.output, &CliError::from(&err)) {
                eprintln!("error: {err:#} ({io_err})");
            }
            ExitCode::FAILURE
        }
    }
}
