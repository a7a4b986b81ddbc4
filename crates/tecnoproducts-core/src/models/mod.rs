//! Data models for TecnoProducts resources.
//!
//! - `Category`, `Product`, `Supplier`: catalog entities
//! - `Sale`: a recorded sale of one product
//!
//! Each entity has a matching `*Input` type used for create/update bodies.

pub mod catalog;
pub mod sale;

pub use catalog::{Category, CategoryInput, Product, ProductInput, Supplier};
pub use sale::{Sale, SaleInput};

// Helper to deserialize decimals sent either as "12.50" or 12.5
pub(crate) fn deserialize_decimal<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct DecimalVisitor;

    impl<'de> de::Visitor<'de> for DecimalVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a decimal as string or number")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(DecimalVisitor)
}
