use serde::{Deserialize, Serialize};

use super::deserialize_decimal;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Category {
    pub id: i64,
    pub nombre: String,
    #[serde(default)]
    pub descripcion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryInput {
    pub nombre: String,
    pub descripcion: String,
}

impl CategoryInput {
    /// Both fields are required by the panel before anything is sent.
    pub fn is_complete(&self) -> bool {
        !self.nombre.trim().is_empty() && !self.descripcion.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Product {
    pub id: i64,
    pub nombre: String,
    #[serde(deserialize_with = "deserialize_decimal")]
    pub precio: String,
    #[serde(default)]
    pub stock: i64,
    pub categoria: Option<i64>,
    pub proveedor: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductInput {
    pub nombre: String,
    pub precio: String,
    pub stock: i64,
    pub categoria: Option<i64>,
    pub proveedor: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Supplier {
    pub id: i64,
    pub nombre: String,
}

impl Product {
    /// Resolve the category name against an already-fetched list
    pub fn category_name<'a>(&self, categories: &'a [Category]) -> Option<&'a str> {
        let id = self.categoria?;
        categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.nombre.as_str())
    }

    /// Resolve the supplier name against an already-fetched list
    pub fn supplier_name<'a>(&self, suppliers: &'a [Supplier]) -> Option<&'a str> {
        let id = self.proveedor?;
        suppliers
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.nombre.as_str())
    }
}
