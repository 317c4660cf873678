use anyhow::Result;
use salesdesk_core::models::{Product, ProductInput};
use salesdesk_core::utils::{format_money, truncate_string};
use salesdesk_core::ListQuery;

use super::{api_failure, print_json, ProductsCommand};
use crate::app::App;

pub async fn run(app: &App, cmd: ProductsCommand) -> Result<()> {
    match cmd {
        ProductsCommand::List { search, ordering } => {
            let mut query = ListQuery::default().ordering(ordering);
            if let Some(search) = search {
                query = query.search(search);
            }
            let products = app
                .client
                .list_products(&query)
                .await
                .map_err(|e| api_failure(e, "Could not load products"))?;
            if app.json {
                print_json(&products)
            } else {
                print_table(&products);
                Ok(())
            }
        }
        ProductsCommand::Add {
            name,
            description,
            price,
            stock,
        } => {
            app.require_login()?;
            let input = ProductInput {
                name,
                description,
                price,
                stock,
            };
            let product = app
                .client
                .create_product(&input)
                .await
                .map_err(|e| api_failure(e, "Could not create product"))?;
            report(app, "Created", &product)
        }
        ProductsCommand::Edit {
            id,
            name,
            description,
            price,
            stock,
        } => {
            app.require_login()?;
            let current = find(app, id).await?;
            let mut input = ProductInput::from(&current);
            if let Some(name) = name {
                input.name = name;
            }
            if let Some(description) = description {
                input.description = description;
            }
            if let Some(price) = price {
                input.price = price;
            }
            if let Some(stock) = stock {
                input.stock = stock;
            }
            let product = app
                .client
                .update_product(id, &input)
                .await
                .map_err(|e| api_failure(e, "Could not update product"))?;
            report(app, "Updated", &product)
        }
        ProductsCommand::Delete { id } => {
            app.require_login()?;
            app.client
                .delete_product(id)
                .await
                .map_err(|e| api_failure(e, "Could not delete product"))?;
            if !app.json {
                println!("Deleted product #{}", id);
            }
            Ok(())
        }
    }
}

/// Look a product up in the catalog listing.
pub(crate) async fn find(app: &App, id: i64) -> Result<Product> {
    let products = app
        .client
        .list_products(&ListQuery::default())
        .await
        .map_err(|e| api_failure(e, "Could not load products"))?;
    products
        .into_iter()
        .find(|p| p.id == id)
        .ok_or_else(|| anyhow::anyhow!("No product with id {}", id))
}

fn report(app: &App, verb: &str, product: &Product) -> Result<()> {
    if app.json {
        print_json(product)
    } else {
        println!("{} product #{}: {}", verb, product.id, product.label());
        Ok(())
    }
}

fn print_table(products: &[Product]) {
    if products.is_empty() {
        println!("No products");
        return;
    }
    println!("{:>5}  {:<28}  {:>10}  {:>6}", "ID", "NAME", "PRICE", "STOCK");
    for p in products {
        println!(
            "{:>5}  {:<28}  {:>10}  {:>6}",
            p.id,
            truncate_string(&p.name, 28),
            format_money(p.price),
            p.stock
        );
    }
}
