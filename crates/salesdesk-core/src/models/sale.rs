use serde::{Deserialize, Serialize};

use super::Customer;
use crate::api::ApiError;
use crate::utils::format_date;

/// The customer on a sale: either a bare id or the embedded record,
/// depending on how the server serializes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum CustomerRef {
    Id(i64),
    Embedded(Customer),
}

impl CustomerRef {
    pub fn id(&self) -> i64 {
        match self {
            CustomerRef::Id(id) => *id,
            CustomerRef::Embedded(c) => c.id,
        }
    }

    pub fn display(&self) -> String {
        match self {
            CustomerRef::Id(id) => format!("#{}", id),
            CustomerRef::Embedded(c) => c.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SaleLine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "producto")]
    pub product: i64,
    #[serde(rename = "producto_nombre", default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(rename = "cantidad")]
    pub quantity: i64,
    #[serde(rename = "precio_unitario", deserialize_with = "super::decimal::deserialize")]
    pub unit_price: f64,
    #[serde(
        default,
        deserialize_with = "super::decimal::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub subtotal: Option<f64>,
}

/// A recorded sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Sale {
    pub id: i64,
    #[serde(rename = "cliente")]
    pub customer: CustomerRef,
    #[serde(rename = "vendedor", default)]
    pub seller: Option<i64>,
    /// ISO 8601 timestamp as sent by the server
    #[serde(rename = "fecha")]
    pub date: String,
    #[serde(deserialize_with = "super::decimal::deserialize")]
    pub total: f64,
    #[serde(rename = "detalles", default)]
    pub lines: Vec<SaleLine>,
}

impl Sale {
    pub fn date_display(&self) -> String {
        format_date(&self.date)
    }
}

/// A sale line being composed. `product == 0` means no product picked yet.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftLine {
    pub product: i64,
    pub quantity: i64,
    pub unit_price: f64,
}

impl Default for DraftLine {
    fn default() -> Self {
        Self {
            product: 0,
            quantity: 1,
            unit_price: 0.0,
        }
    }
}

/// A sale being composed before it is posted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaleDraft {
    pub customer: Option<i64>,
    pub lines: Vec<DraftLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSaleLine {
    #[serde(rename = "producto")]
    pub product: i64,
    #[serde(rename = "cantidad")]
    pub quantity: i64,
    #[serde(rename = "precio_unitario")]
    pub unit_price: f64,
}

/// Body of `POST ventas/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSale {
    #[serde(rename = "cliente")]
    pub customer: i64,
    #[serde(rename = "detalles")]
    pub lines: Vec<NewSaleLine>,
}

impl SaleDraft {
    pub fn new(customer: i64) -> Self {
        Self {
            customer: Some(customer),
            lines: Vec::new(),
        }
    }

    pub fn line(mut self, product: i64, quantity: i64, unit_price: f64) -> Self {
        self.lines.push(DraftLine {
            product,
            quantity,
            unit_price,
        });
        self
    }

    /// Drop incomplete lines and check there is something to post.
    pub fn into_request(self) -> Result<NewSale, ApiError> {
        let customer = self
            .customer
            .ok_or_else(|| ApiError::InvalidInput("Select a customer".to_string()))?;

        let lines: Vec<NewSaleLine> = self
            .lines
            .into_iter()
            .filter(|l| l.product != 0 && l.quantity > 0)
            .map(|l| NewSaleLine {
                product: l.product,
                quantity: l.quantity,
                unit_price: l.unit_price,
            })
            .collect();

        if lines.is_empty() {
            return Err(ApiError::InvalidInput(
                "Add at least one product".to_string(),
            ));
        }

        Ok(NewSale { customer, lines })
    }
}
