//! Sample computations used by the caching walkthrough.

use serde::Serialize;

/// Sum of `0..n`.
pub fn sum_below(n: u64) -> u64 {
    // n * (n - 1) / 2 without overflowing the intermediate product
    if n % 2 == 0 {
        (n / 2).saturating_mul(n.saturating_sub(1))
    } else {
        n.saturating_mul((n - 1) / 2)
    }
}

/// A small three-column table returned by `configurable_example`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExampleData {
    pub data_type: String,
    pub x: Vec<i64>,
    pub y: Vec<i64>,
    pub z: Vec<i64>,
}

impl ExampleData {
    /// Builds the table for `data_type`; unknown types get the simple table.
    pub fn for_type(data_type: &str) -> Self {
        match data_type {
            "sequential" => Self {
                data_type: data_type.to_string(),
                x: (0..100).collect(),
                y: (100..200).collect(),
                z: (200..300).collect(),
            },
            _ => Self {
                data_type: data_type.to_string(),
                x: vec![1, 2, 3],
                y: vec![4, 5, 6],
                z: vec![7, 8, 9],
            },
        }
    }

    pub fn rows(&self) -> usize {
        self.x.len()
    }
}

/// Product categories of the mock sales table.
pub const CATEGORIES: [&str; 3] = ["Electronics", "Office Supplies", "Furniture"];

const SALES_RECORDS: u32 = 500;

/// One row of the mock sales table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesRecord {
    pub order_id: String,
    pub category: String,
    pub sales: f64,
}

/// Deterministic mock sales table: categories rotate, amounts spread over 0..5000.
pub fn mock_sales_data() -> Vec<SalesRecord> {
    (0..SALES_RECORDS)
        .map(|i| SalesRecord {
            order_id: format!("ORD-{:05}", i + 1),
            category: CATEGORIES[i as usize % CATEGORIES.len()].to_string(),
            sales: f64::from((i * 7_919) % 5_000) + 0.99,
        })
        .collect()
}

/// Rows of `category` with at least `min_sales` in sales.
pub fn filter_sales(category: &str, min_sales: u32) -> Vec<SalesRecord> {
    mock_sales_data()
        .into_iter()
        .filter(|r| r.category == category && r.sales >= f64::from(min_sales))
        .collect()
}
