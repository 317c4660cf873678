use serde::{Deserialize, Serialize};

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Product {
    pub id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion", default)]
    pub description: String,
    #[serde(rename = "precio", deserialize_with = "super::decimal::deserialize")]
    pub price: f64,
    #[serde(default)]
    pub stock: i64,
}

impl Product {
    /// Label used when picking a product for a sale line
    pub fn label(&self) -> String {
        format!("{} (${:.2})", self.name, self.price)
    }
}

/// Body for creating or replacing a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ProductInput {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "precio")]
    pub price: f64,
    pub stock: i64,
}

impl From<&Product> for ProductInput {
    fn from(p: &Product) -> Self {
        Self {
            name: p.name.clone(),
            description: p.description.clone(),
            price: p.price,
            stock: p.stock,
        }
    }
}
