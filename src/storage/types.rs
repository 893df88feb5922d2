use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A row ready to be inserted into `products`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRow {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub stock_quantity: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Aggregates read back after schema initialization.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaSummary {
    pub total_products: i32,
    pub avg_price: Option<f64>,
    pub total_stock: Option<i64>,
}

/// Result of loading every CSV file in a directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadSummary {
    pub total_files: usize,
    pub loaded_files: usize,
    pub inserted_rows: usize,
}

impl LoadSummary {
    pub fn all_loaded(&self) -> bool {
        self.loaded_files == self.total_files
    }
}
