//! Command-line surface.
//!
//! Each subcommand maps onto one `ApiClient` call. Commands that the web
//! front-end kept behind a login check do the same here via
//! [`App::require_login`](crate::app::App::require_login): product and
//! customer listings are public, their mutations and every sales and report
//! command need a session.

pub mod auth;
pub mod customers;
pub mod products;
pub mod report;
pub mod sales;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use salesdesk_core::ApiError;
use serde::Serialize;

use crate::app::App;

#[derive(Parser, Debug)]
#[command(name = "salesdesk", version, about = "Manage products, customers and sales")]
pub struct Cli {
    /// Print results as JSON instead of tables
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Keep the session in memory only; nothing is read from or written to disk
    #[arg(long, global = true, default_value_t = false)]
    pub ephemeral: bool,

    /// API base URL (overrides config and SALESDESK_API_BASE_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and store the session
    Login {
        #[arg(long, short, env = "SALESDESK_USERNAME")]
        username: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show who is logged in and until when
    Whoami,

    /// Product catalog
    Products {
        #[command(subcommand)]
        cmd: ProductsCommand,
    },

    /// Customers
    Customers {
        #[command(subcommand)]
        cmd: CustomersCommand,
    },

    /// Sales
    Sales {
        #[command(subcommand)]
        cmd: SalesCommand,
    },

    /// Sales report for a date range (defaults to the last 30 days)
    Report {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Download the server-rendered PDF instead of listing sales
        #[arg(long, default_value_t = false)]
        pdf: bool,
        /// Where to write the PDF (defaults to reporte_ventas_<from>_a_<to>.pdf)
        #[arg(long, short)]
        output: Option<std::path::PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProductsCommand {
    List {
        #[arg(long, short)]
        search: Option<String>,
        /// Sort field, e.g. nombre, precio, -precio
        #[arg(long, default_value = "nombre")]
        ordering: String,
    },
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        price: f64,
        #[arg(long, default_value_t = 0)]
        stock: i64,
    },
    /// Replace a product's fields; omitted fields keep their current value
    Edit {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        stock: Option<i64>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum CustomersCommand {
    List {
        #[arg(long, short)]
        search: Option<String>,
        #[arg(long)]
        ordering: Option<String>,
    },
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        phone: String,
    },
    /// Replace a customer's fields; omitted fields keep their current value
    Edit {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum SalesCommand {
    List {
        #[arg(long, default_value = "-fecha")]
        ordering: String,
    },
    /// Record a sale
    Create {
        #[arg(long)]
        customer: i64,
        /// PRODUCT:QTY or PRODUCT:QTY:UNIT_PRICE; repeatable. Without a price the
        /// product's catalog price is used.
        #[arg(long = "line", required = true, value_parser = sales::parse_line)]
        lines: Vec<sales::LineArg>,
    },
}

pub async fn run(app: &mut App, cmd: Command) -> Result<()> {
    match cmd {
        Command::Login { username } => auth::login(app, username).await,
        Command::Logout => auth::logout(app),
        Command::Whoami => auth::whoami(app),
        Command::Products { cmd } => products::run(app, cmd).await,
        Command::Customers { cmd } => customers::run(app, cmd).await,
        Command::Sales { cmd } => sales::run(app, cmd).await,
        Command::Report {
            from,
            to,
            pdf,
            output,
        } => report::run(app, from, to, pdf, output).await,
    }
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Turn an API failure into a message for the terminal.
///
/// Validation bodies are shown as the server sent them so field errors stay
/// visible.
pub(crate) fn api_failure(err: ApiError, fallback: &str) -> anyhow::Error {
    match err {
        ApiError::Validation(body) => anyhow!("{}: {}", fallback, body),
        other => {
            tracing::debug!(error = %other, "Request failed");
            anyhow!(other.user_message(fallback))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sale_create() {
        let cli = Cli::try_parse_from([
            "salesdesk", "sales", "create", "--customer", "2", "--line", "4:3", "--line", "5:1:2.5",
        ])
        .unwrap();
        match cli.cmd {
            Command::Sales {
                cmd: SalesCommand::Create { customer, lines },
            } => {
                assert_eq!(customer, 2);
                assert_eq!(lines.len(), 2);
                assert_eq!(lines[1].unit_price, Some(2.5));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_report_dates() {
        let cli =
            Cli::try_parse_from(["salesdesk", "--json", "report", "--from", "2025-04-01", "--pdf"])
                .unwrap();
        assert!(cli.json);
        match cli.cmd {
            Command::Report { from, to, pdf, .. } => {
                assert_eq!(from, NaiveDate::from_ymd_opt(2025, 4, 1));
                assert!(to.is_none());
                assert!(pdf);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_validation_failure_shows_body() {
        let err = api_failure(
            ApiError::Validation(r#"{"precio": ["invalid"]}"#.to_string()),
            "Could not create product",
        );
        assert_eq!(
            err.to_string(),
            r#"Could not create product: {"precio": ["invalid"]}"#
        );
        let err = api_failure(ApiError::Unauthorized, "x");
        assert_eq!(err.to_string(), "Session expired. Please log in again.");
    }
}
