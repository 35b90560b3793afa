//! Order record and its nested sections.
//!
//! Field names match the wire payload one to one. Every struct decodes with
//! `#[serde(default)]` so a payload that is syntactically valid but missing
//! fields still produces an `Order`; the validator reports what is missing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An order as ingested from the stream, persisted and served.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct Order {
    /// Unique key of the order. Immutable once created.
    pub order_uid: String,
    pub track_number: String,
    pub entry: String,
    pub delivery: Delivery,
    pub payment: Payment,
    pub items: Vec<Item>,
    pub locale: String,
    pub internal_signature: String,
    pub customer_id: String,
    pub delivery_service: String,
    pub shardkey: String,
    pub sm_id: i32,
    /// Creation time carried by the record itself.
    pub date_created: DateTime<Utc>,
    pub oof_shard: String,
}

impl Order {
    /// Cache and storage key of this order.
    pub fn key(&self) -> &str {
        &self.order_uid
    }
}

/// Recipient section of an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct Delivery {
    pub name: String,
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    pub email: String,
}

/// Payment section of an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct Payment {
    pub transaction: String,
    pub request_id: String,
    pub currency: String,
    pub provider: String,
    pub amount: i32,
    /// Unix seconds.
    pub payment_dt: i64,
    pub bank: String,
    pub delivery_cost: i32,
    pub goods_total: i32,
    pub custom_fee: i32,
}

/// A single line item. Items are ordered and always replaced as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct Item {
    pub chrt_id: i64,
    pub track_number: String,
    pub price: i32,
    pub rid: String,
    pub name: String,
    pub sale: i32,
    pub size: String,
    pub total_price: i32,
    pub nm_id: i64,
    pub brand: String,
    pub status: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const WIRE: &str = r#"{
        "order_uid": "b563feb7b2b84b6test",
        "track_number": "WBILMTESTTRACK",
        "entry": "WBIL",
        "delivery": {
            "name": "Test Testov",
            "phone": "+9720000000",
            "zip": "2639809",
            "city": "Kiryat Mozkin",
            "address": "Ploshad Mira 15",
            "region": "Kraiot",
            "email": "test@gmail.com"
        },
        "payment": {
            "transaction": "b563feb7b2b84b6test",
            "request_id": "",
            "currency": "USD",
            "provider": "wbpay",
            "amount": 1817,
            "payment_dt": 1637907727,
            "bank": "alpha",
            "delivery_cost": 1500,
            "goods_total": 317,
            "custom_fee": 0
        },
        "items": [{
            "chrt_id": 9934930,
            "track_number": "WBILMTESTTRACK",
            "price": 453,
            "rid": "ab4219087a764ae0btest",
            "name": "Mascaras",
            "sale": 30,
            "size": "0",
            "total_price": 317,
            "nm_id": 2389212,
            "brand": "Vivienne Sabo",
            "status": 202
        }],
        "locale": "en",
        "internal_signature": "",
        "customer_id": "test",
        "delivery_service": "meest",
        "shardkey": "9",
        "sm_id": 99,
        "date_created": "2021-11-26T06:22:19Z",
        "oof_shard": "1"
    }"#;

    #[test]
    fn test_wire_payload_decodes_all_sections() -> Result<(), serde_json::Error> {
        let order: Order = serde_json::from_str(WIRE)?;
        assert_eq!(order.key(), "b563feb7b2b84b6test");
        assert_eq!(order.delivery.city, "Kiryat Mozkin");
        assert_eq!(order.payment.payment_dt, 1_637_907_727);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].chrt_id, 9_934_930);
        assert_eq!(
            order.date_created,
            Utc.with_ymd_and_hms(2021, 11, 26, 6, 22, 19).single().unwrap_or_default()
        );
        Ok(())
    }

    #[test]
    fn test_missing_fields_decode_to_defaults() -> Result<(), serde_json::Error> {
        let order: Order = serde_json::from_str(r#"{"order_uid": "abc"}"#)?;
        assert_eq!(order.order_uid, "abc");
        assert!(order.items.is_empty());
        assert_eq!(order.delivery, Delivery::default());
        assert_eq!(order.date_created, DateTime::<Utc>::default());
        Ok(())
    }

    #[test]
    fn test_serialization_uses_wire_keys() -> Result<(), serde_json::Error> {
        let order: Order = serde_json::from_str(WIRE)?;
        let value = serde_json::to_value(&order)?;
        for key in [
            "order_uid",
            "track_number",
            "entry",
            "locale",
            "internal_signature",
            "customer_id",
            "delivery_service",
            "shardkey",
            "sm_id",
            "date_created",
            "oof_shard",
        ] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
        assert_eq!(value["payment"]["goods_total"], 317);
        assert_eq!(value["items"][0]["brand"], "Vivienne Sabo");
        Ok(())
    }

    #[cfg(feature = "openapi")]
    #[test]
    fn test_order_schema_documents_date_created() -> Result<(), serde_json::Error> {
        let schema = serde_json::to_value(<Order as utoipa::PartialSchema>::schema())?;
        let field = &schema["properties"]["date_created"];
        assert_eq!(field["type"], "string");
        assert_eq!(field["format"], "date-time");
        Ok(())
    }
}
