use serde::{Deserialize, Serialize};

/// A customer that sales are recorded against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Customer {
    pub id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "telefono", default)]
    pub phone: String,
}

impl Customer {
    pub fn label(&self) -> String {
        if self.email.is_empty() {
            self.name.clone()
        } else {
            format!("{} <{}>", self.name, self.email)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CustomerInput {
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: String,
    #[serde(rename = "telefono")]
    pub phone: String,
}

impl From<&Customer> for CustomerInput {
    fn from(c: &Customer) -> Self {
        Self {
            name: c.name.clone(),
            email: c.email.clone(),
            phone: c.phone.clone(),
        }
    }
}
