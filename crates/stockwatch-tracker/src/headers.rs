//! Per-request headers for the product API.

use rand::{Rng, RngCore};
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue, REFERER};
use stockwatch_core::config::ProductConfig;
use stockwatch_core::error::{Result, StockwatchError};

const BASE_URL: HeaderName = HeaderName::from_static("base_url");
const FRONTEND: HeaderName = HeaderName::from_static("frontend");
const TID: HeaderName = HeaderName::from_static("tid");

/// Fresh transaction id: `<epoch_ms>:<1-99>:<64 hex chars>`.
pub fn transaction_id() -> String {
    let mut rng = rand::thread_rng();
    let millis = chrono::Utc::now().timestamp_millis();
    let salt: u8 = rng.gen_range(1..=99);
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes);
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("{millis}:{salt}:{hex}")
}

/// Fixed headers, validated once; [`RequestTemplate::headers`] adds a new
/// transaction id on every call.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    fixed: HeaderMap,
}

impl RequestTemplate {
    pub fn new(product: &ProductConfig) -> Result<Self> {
        let mut fixed = HeaderMap::new();
        fixed.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        fixed.insert(BASE_URL, header_value("Base_Url", &product.page_url())?);
        fixed.insert(FRONTEND, HeaderValue::from_static("1"));
        fixed.insert(REFERER, header_value("Referer", &product.referer())?);
        Ok(Self { fixed })
    }

    pub fn headers(&self) -> HeaderMap {
        let mut headers = self.fixed.clone();
        if let Ok(tid) = HeaderValue::from_str(&transaction_id()) {
            headers.insert(TID, tid);
        }
        headers
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| StockwatchError::Http(format!("Invalid {name} header {value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_id_format() {
        for _ in 0..50 {
            let tid = transaction_id();
            let parts: Vec<&str> = tid.split(':').collect();
            assert_eq!(parts.len(), 3);
            assert!(parts[0].parse::<i64>().unwrap() > 1_600_000_000_000);
            let salt: u8 = parts[1].parse().unwrap();
            assert!((1..=99).contains(&salt));
            assert_eq!(parts[2].len(), 64);
            assert!(
                parts[2]
                    .chars()
                    .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
            );
        }
    }

    #[test]
    fn test_transaction_ids_differ() {
        assert_ne!(transaction_id(), transaction_id());
    }

    #[test]
    fn test_template_headers() {
        let template = RequestTemplate::new(&ProductConfig::default()).unwrap();
        let first = template.headers();
        let second = template.headers();

        assert_eq!(first["accept"], "application/json, text/plain, */*");
        assert_eq!(
            first["base_url"],
            "https://shop.amul.com/en/product/amul-high-protein-rose-lassi-200-ml-or-pack-of-30"
        );
        assert_eq!(first["frontend"], "1");
        assert_eq!(first["referer"], "https://shop.amul.com/");
        assert_ne!(first["tid"], second["tid"]);
    }

    #[test]
    fn test_template_rejects_bad_url() {
        let product = ProductConfig {
            site_url: "https://shop.amul.com\n".into(),
            ..Default::default()
        };
        assert!(RequestTemplate::new(&product).is_err());
    }
}
