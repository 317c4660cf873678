use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use salesdesk_core::models::ReportRange;
use salesdesk_core::utils::format_money;
use tracing::info;

use super::{api_failure, print_json, sales};
use crate::app::App;

pub async fn run(
    app: &App,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    pdf: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    app.require_login()?;
    let range = ReportRange::resolve(from, to).map_err(|e| api_failure(e, "Invalid date range"))?;

    if pdf {
        let bytes = app
            .client
            .sales_report_pdf(&range)
            .await
            .map_err(|e| api_failure(e, "Could not download report"))?;
        let path = output.unwrap_or_else(|| PathBuf::from(range.pdf_file_name()));
        std::fs::write(&path, &bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), bytes = bytes.len(), "Report saved");
        if !app.json {
            println!("Saved {}", path.display());
        }
        return Ok(());
    }

    let sales = app
        .client
        .sales_report(&range)
        .await
        .map_err(|e| api_failure(e, "Could not load report"))?;

    if app.json {
        return print_json(&sales);
    }

    println!("Sales from {} to {}", range.from_param(), range.to_param());
    sales::print_table(&sales);
    if !sales.is_empty() {
        let total: f64 = sales.iter().map(|s| s.total).sum();
        println!("{} sales, total {}", sales.len(), format_money(total));
    }
    Ok(())
}
