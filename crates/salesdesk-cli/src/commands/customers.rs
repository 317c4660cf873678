use anyhow::Result;
use salesdesk_core::models::{Customer, CustomerInput};
use salesdesk_core::utils::truncate_string;
use salesdesk_core::ListQuery;

use super::{api_failure, print_json, CustomersCommand};
use crate::app::App;

pub async fn run(app: &App, cmd: CustomersCommand) -> Result<()> {
    match cmd {
        CustomersCommand::List { search, ordering } => {
            let query = ListQuery {
                search,
                ordering,
            };
            let customers = app
                .client
                .list_customers(&query)
                .await
                .map_err(|e| api_failure(e, "Could not load customers"))?;
            if app.json {
                print_json(&customers)
            } else {
                print_table(&customers);
                Ok(())
            }
        }
        CustomersCommand::Add { name, email, phone } => {
            app.require_login()?;
            let input = CustomerInput { name, email, phone };
            let customer = app
                .client
                .create_customer(&input)
                .await
                .map_err(|e| api_failure(e, "Could not create customer"))?;
            report(app, "Created", &customer)
        }
        CustomersCommand::Edit {
            id,
            name,
            email,
            phone,
        } => {
            app.require_login()?;
            let customers = app
                .client
                .list_customers(&ListQuery::default())
                .await
                .map_err(|e| api_failure(e, "Could not load customers"))?;
            let current = customers
                .iter()
                .find(|c| c.id == id)
                .ok_or_else(|| anyhow::anyhow!("No customer with id {}", id))?;

            let mut input = CustomerInput::from(current);
            if let Some(name) = name {
                input.name = name;
            }
            if let Some(email) = email {
                input.email = email;
            }
            if let Some(phone) = phone {
                input.phone = phone;
            }
            let customer = app
                .client
                .update_customer(id, &input)
                .await
                .map_err(|e| api_failure(e, "Could not update customer"))?;
            report(app, "Updated", &customer)
        }
        CustomersCommand::Delete { id } => {
            app.require_login()?;
            app.client
                .delete_customer(id)
                .await
                .map_err(|e| api_failure(e, "Could not delete customer"))?;
            if !app.json {
                println!("Deleted customer #{}", id);
            }
            Ok(())
        }
    }
}

fn report(app: &App, verb: &str, customer: &Customer) -> Result<()> {
    if app.json {
        print_json(customer)
    } else {
        println!("{} customer #{}: {}", verb, customer.id, customer.label());
        Ok(())
    }
}

fn print_table(customers: &[Customer]) {
    if customers.is_empty() {
        println!("No customers");
        return;
    }
    println!("{:>5}  {:<24}  {:<28}  {:<14}", "ID", "NAME", "EMAIL", "PHONE");
    for c in customers {
        println!(
            "{:>5}  {:<24}  {:<28}  {:<14}",
            c.id,
            truncate_string(&c.name, 24),
            truncate_string(&c.email, 28),
            truncate_string(&c.phone, 14)
        );
    }
}
