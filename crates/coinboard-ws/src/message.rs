//! Price feed message parsing.
//!
//! Inbound text frames are JSON objects mapping asset id to price, e.g.
//! `{"bitcoin":"6929.82","ethereum":"404.97"}`.

use crate::error::{WsError, WsResult};
use coinboard_core::{AssetId, Price};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// Parse one feed frame into a delta map.
///
/// Entries whose price cannot be parsed are skipped; a frame that is not a
/// JSON object is an error.
pub fn parse_prices(text: &str) -> WsResult<HashMap<AssetId, Price>> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Object(entries) = value else {
        return Err(WsError::ParseError(format!(
            "expected object of prices, got: {text}"
        )));
    };

    let mut prices = HashMap::with_capacity(entries.len());
    for (id, raw) in entries {
        let parsed = match &raw {
            Value::String(s) => s.parse::<Price>().ok(),
            Value::Number(n) => n.to_string().parse::<Price>().ok(),
            _ => None,
        };
        match parsed {
            Some(price) => {
                prices.insert(AssetId::new(id), price);
            }
            None => warn!(asset = %id, value = %raw, "Skipping unparsable price"),
        }
    }
    Ok(prices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_price_frame() {
        let prices = parse_prices(r#"{"bitcoin":"6929.82","ethereum":"404.97"}"#).unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices["bitcoin"], Price::new(dec!(6929.82)));
        assert_eq!(prices["ethereum"], Price::new(dec!(404.97)));
    }

    #[test]
    fn test_parse_skips_bad_entries() {
        let prices = parse_prices(r#"{"bitcoin":"n/a","ethereum":12.5,"x":null}"#).unwrap();
        assert_eq!(prices.len(), 1);
        assert_eq!(prices["ethereum"], Price::new(dec!(12.5)));
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(matches!(
            parse_prices(r#"["bitcoin"]"#),
            Err(WsError::ParseError(_))
        ));
        assert!(matches!(parse_prices("not json"), Err(WsError::Json(_))));
    }
}
