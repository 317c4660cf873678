use anyhow::{anyhow, Result};
use salesdesk_core::models::{Product, Sale, SaleDraft};
use salesdesk_core::utils::{format_money, truncate_string};
use salesdesk_core::ListQuery;

use super::{api_failure, print_json, SalesCommand};
use crate::app::App;

/// One `--line` argument: `PRODUCT:QTY[:UNIT_PRICE]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LineArg {
    pub product: i64,
    pub quantity: i64,
    pub unit_price: Option<f64>,
}

pub fn parse_line(raw: &str) -> Result<LineArg, String> {
    let parts: Vec<&str> = raw.split(':').map(str::trim).collect();
    let (product, quantity, price) = match parts.as_slice() {
        [p, q] => (p, q, None),
        [p, q, price] => (p, q, Some(price)),
        _ => return Err(format!("expected PRODUCT:QTY[:PRICE], got '{}'", raw)),
    };

    let product = product
        .parse()
        .map_err(|_| format!("invalid product id '{}'", product))?;
    let quantity = quantity
        .parse()
        .map_err(|_| format!("invalid quantity '{}'", quantity))?;
    let unit_price = price
        .map(|p| p.parse::<f64>().map_err(|_| format!("invalid price '{}'", p)))
        .transpose()?;

    Ok(LineArg {
        product,
        quantity,
        unit_price,
    })
}

pub async fn run(app: &App, cmd: SalesCommand) -> Result<()> {
    app.require_login()?;
    match cmd {
        SalesCommand::List { ordering } => {
            let sales = app
                .client
                .list_sales(Some(&ordering))
                .await
                .map_err(|e| api_failure(e, "Could not load sales"))?;
            if app.json {
                print_json(&sales)
            } else {
                print_table(&sales);
                Ok(())
            }
        }
        SalesCommand::Create { customer, lines } => {
            let catalog = if lines.iter().any(|l| l.unit_price.is_none()) {
                app.client
                    .list_products(&ListQuery::default())
                    .await
                    .map_err(|e| api_failure(e, "Could not load products"))?
            } else {
                Vec::new()
            };

            let draft = build_draft(customer, &lines, &catalog)?;
            let sale = app
                .client
                .create_sale(draft)
                .await
                .map_err(|e| api_failure(e, "Could not record sale"))?;

            if app.json {
                print_json(&sale)
            } else {
                println!(
                    "Recorded sale #{} for {}: {}",
                    sale.id,
                    sale.customer.display(),
                    format_money(sale.total)
                );
                Ok(())
            }
        }
    }
}

/// Lines without an explicit price take the product's catalog price.
fn build_draft(customer: i64, lines: &[LineArg], catalog: &[Product]) -> Result<SaleDraft> {
    let mut draft = SaleDraft::new(customer);
    for line in lines {
        let unit_price = match line.unit_price {
            Some(price) => price,
            None => catalog
                .iter()
                .find(|p| p.id == line.product)
                .map(|p| p.price)
                .ok_or_else(|| anyhow!("No product with id {}", line.product))?,
        };
        draft = draft.line(line.product, line.quantity, unit_price);
    }
    Ok(draft)
}

pub(crate) fn print_table(sales: &[Sale]) {
    if sales.is_empty() {
        println!("No sales");
        return;
    }
    println!("{:>6}  {:<16}  {:<24}  {:>5}  {:>12}", "ID", "DATE", "CUSTOMER", "ITEMS", "TOTAL");
    for s in sales {
        println!(
            "{:>6}  {:<16}  {:<24}  {:>5}  {:>12}",
            s.id,
            s.date_display(),
            truncate_string(&s.customer.display(), 24),
            s.lines.len(),
            format_money(s.total)
        );
    }
}
