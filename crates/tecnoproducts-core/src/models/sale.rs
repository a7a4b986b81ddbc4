use serde::{Deserialize, Serialize};

use super::{deserialize_decimal, Product};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Sale {
    pub id: i64,
    pub producto: i64,
    pub cantidad: i64,
    #[serde(deserialize_with = "deserialize_decimal")]
    pub total: String,
}

/// Body for `POST /Venta/`. Stock limits are enforced by the server and come
/// back as `ApiError::BadRequest`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleInput {
    pub producto: i64,
    pub cantidad: i64,
    pub total: String,
}

impl SaleInput {
    /// Price the sale from the product's listed price. `None` when the
    /// quantity is not positive or the price is not a number.
    pub fn for_product(product: &Product, cantidad: i64) -> Option<SaleInput> {
        if cantidad <= 0 {
            return None;
        }
        let precio: f64 = product.precio.trim().parse().ok()?;
        Some(SaleInput {
            producto: product.id,
            cantidad,
            total: format!("{:.2}", precio * cantidad as f64),
        })
    }
}

impl Sale {
    /// The product this sale refers to, if it is still listed
    pub fn product<'a>(&self, products: &'a [Product]) -> Option<&'a Product> {
        products.iter().find(|p| p.id == self.producto)
    }
}
