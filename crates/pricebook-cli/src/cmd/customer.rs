//! `pb customer`: register and list customers.

use anyhow::Result;
use clap::{Args, Subcommand};
use pricebook_core::model::Customer;

use super::{Context, Project};
use crate::output::{pretty_section, render, render_mode};

#[derive(Subcommand, Debug)]
pub enum CustomerCommand {
    /// Register a customer.
    Add(AddArgs),
    /// List customers.
    List,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Short customer code, e.g. ACME.
    pub code: String,
    /// Display name.
    pub name: String,
}

/// # Errors
///
/// Returns an error if the project cannot be opened or the customer is invalid.
pub fn run_customer(command: &CustomerCommand, ctx: &Context) -> Result<()> {
    let project = Project::open(&ctx.root)?;
    let mut book = project.load()?;
    match command {
        CustomerCommand::Add(args) => {
            let id = book.add_customer(&args.code, &args.name)?;
            let customer = book.customer(&id).cloned();
            project.persist(book)?;
            render(ctx.output, &customer, |c, w| match c {
                Some(c) => writeln!(w, "✓ Added customer {} ({} {})", c.id, c.code, c.name),
                None => Ok(()),
            })
        }
        CustomerCommand::List => render_mode(
            ctx.output,
            &book.customers,
            |customers, w| {
                for c in customers {
                    writeln!(w, "{}\t{}\t{}", c.id, c.code, c.name)?;
                }
                Ok(())
            },
            |customers: &Vec<Customer>, w| {
                pretty_section(w, &format!("Customers ({})", customers.len()))?;
                for c in customers {
                    let flag = if c.active { "" } else { "  (inactive)" };
                    writeln!(w, "{:<8} {:<10} {}{flag}", c.id, c.code, c.name)?;
                }
                Ok(())
            },
        ),
    }
}
