//! Domain types shared between the tracker and its callers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of one stock check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StockResult {
    /// Product is available. `quantity` and `price` are kept as the API
    /// sent them.
    Found {
        name: String,
        quantity: String,
        price: String,
    },
    /// API answered and the product is out of stock.
    NotFound,
    /// No usable answer: empty data, or retries exhausted.
    Inconclusive,
}

impl StockResult {
    pub fn is_found(&self) -> bool {
        matches!(self, StockResult::Found { .. })
    }
}

impl std::fmt::Display for StockResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockResult::Found { name, quantity, .. } => {
                write!(f, "in stock ({name}, {quantity} units)")
            }
            StockResult::NotFound => write!(f, "out of stock"),
            StockResult::Inconclusive => write!(f, "inconclusive"),
        }
    }
}

/// First entry of the product API's `data` list.
///
/// Every field is optional on the wire; accessors apply the fallbacks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub available: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub price: Option<Value>,
}

impl Product {
    /// True when `available` is a number greater than zero. Fractions
    /// count; missing or non-numeric values do not.
    pub fn in_stock(&self) -> bool {
        match &self.available {
            Some(Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    i > 0
                } else if let Some(u) = n.as_u64() {
                    u > 0
                } else {
                    n.as_f64().is_some_and(|f| f > 0.0)
                }
            }
            _ => false,
        }
    }

    /// Units available as text, for alerts and logs.
    pub fn quantity(&self) -> String {
        match &self.available {
            Some(Value::Number(n)) => n.to_string(),
            _ => "0".to_string(),
        }
    }

    /// Name as text; a non-string name is rendered as JSON.
    pub fn display_name(&self) -> String {
        text_or(&self.name, "Unknown Product")
    }

    /// Price as text; the API sends either a string or a number.
    pub fn display_price(&self) -> String {
        text_or(&self.price, "N/A")
    }
}

fn text_or(value: &Option<Value>, fallback: &str) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => fallback.to_string(),
        Some(other) => other.to_string(),
    }
}

/// What happened on one request inside a check.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// 401/403; session was refreshed.
    AuthFailure { status: u16 },
    /// Non-200, non-auth status.
    HttpError { status: u16 },
    /// Timeout, connection or decode failure.
    Transport { kind: &'static str },
    /// 200 with no usable product data.
    NoData,
    InStock,
    OutOfStock,
}

/// Ephemeral record of one request. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PollAttempt {
    /// Bounded retry index the request ran under (0-based). Auth retries
    /// reuse the same index.
    pub attempt: u32,
    pub outcome: AttemptOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_fallbacks() {
        let product: Product = serde_json::from_str("{}").unwrap();
        assert!(!product.in_stock());
        assert_eq!(product.quantity(), "0");
        assert_eq!(product.display_name(), "Unknown Product");
        assert_eq!(product.display_price(), "N/A");
    }

    #[test]
    fn test_product_price_shapes() {
        let product: Product =
            serde_json::from_str(r#"{"available": 5, "name": "Rose Lassi", "price": "210"}"#)
                .unwrap();
        assert!(product.in_stock());
        assert_eq!(product.quantity(), "5");
        assert_eq!(product.display_price(), "210");

        let product: Product = serde_json::from_str(r#"{"available": 2.0, "price": 99}"#).unwrap();
        assert!(product.in_stock());
        assert_eq!(product.display_price(), "99");
    }

    #[test]
    fn test_fractional_available_is_in_stock() {
        let product: Product = serde_json::from_str(r#"{"available": 0.5}"#).unwrap();
        assert!(product.in_stock());
        assert_eq!(product.quantity(), "0.5");

        let product: Product = serde_json::from_str(r#"{"available": -0.5}"#).unwrap();
        assert!(!product.in_stock());
        let product: Product = serde_json::from_str(r#"{"available": 0.0}"#).unwrap();
        assert!(!product.in_stock());
    }

    #[test]
    fn test_large_unsigned_available() {
        let product: Product =
            serde_json::from_str(r#"{"available": 18446744073709551615}"#).unwrap();
        assert!(product.in_stock());
    }

    #[test]
    fn test_non_string_name() {
        let product: Product =
            serde_json::from_str(r#"{"available": 5, "name": 12345, "price": "210"}"#).unwrap();
        assert_eq!(product.display_name(), "12345");

        let product: Product = serde_json::from_str(r#"{"name": null}"#).unwrap();
        assert_eq!(product.display_name(), "Unknown Product");
    }

    #[test]
    fn test_non_numeric_available() {
        let product: Product = serde_json::from_str(r#"{"available": "lots"}"#).unwrap();
        assert!(!product.in_stock());
        assert_eq!(product.quantity(), "0");
    }

    #[test]
    fn test_result_display() {
        let found = StockResult::Found {
            name: "Rose Lassi".into(),
            quantity: "5".into(),
            price: "210".into(),
        };
        assert!(found.is_found());
        assert_eq!(found.to_string(), "in stock (Rose Lassi, 5 units)");
        assert!(!StockResult::Inconclusive.is_found());
    }
}
