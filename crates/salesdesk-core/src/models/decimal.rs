//! Decimal fields arrive as JSON numbers or as strings such as `"12.50"`.

use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    String(String),
}

impl NumberOrString {
    fn into_f64<E: de::Error>(self) -> Result<f64, E> {
        match self {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::String(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid decimal: {:?}", s))),
        }
    }
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    NumberOrString::deserialize(deserializer)?.into_f64()
}

pub fn deserialize_option<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<f64>, D::Error> {
    Option::<NumberOrString>::deserialize(deserializer)?
        .map(NumberOrString::into_f64)
        .transpose()
}
