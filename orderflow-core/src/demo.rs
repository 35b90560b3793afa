//! Deterministic demonstration order used to seed an empty store.

use crate::{Delivery, Item, Order, Payment};
use chrono::DateTime;

/// Key of the demonstration order.
pub const DEMO_ORDER_UID: &str = "b563feb7b2b84b6test";

/// Build the demonstration order. Always returns the same value.
pub fn demo_order() -> Order {
    Order {
        order_uid: DEMO_ORDER_UID.to_string(),
        track_number: "WBILMTESTTRACK".to_string(),
        entry: "WBIL".to_string(),
        delivery: Delivery {
            name: "Test Testov".to_string(),
            phone: "+9720000000".to_string(),
            zip: "2639809".to_string(),
            city: "Kiryat Mozkin".to_string(),
            address: "Ploshad Mira 15".to_string(),
            region: "Kraiot".to_string(),
            email: "test@gmail.com".to_string(),
        },
        payment: Payment {
            transaction: DEMO_ORDER_UID.to_string(),
            request_id: String::new(),
            currency: "USD".to_string(),
            provider: "wbpay".to_string(),
            amount: 1817,
            payment_dt: 1_637_907_727,
            bank: "alpha".to_string(),
            delivery_cost: 1500,
            goods_total: 317,
            custom_fee: 0,
        },
        items: vec![Item {
            chrt_id: 9_934_930,
            track_number: "WBILMTESTTRACK".to_string(),
            price: 453,
            rid: "ab4219087a764ae0btest".to_string(),
            name: "Mascaras".to_string(),
            sale: 30,
            size: "0".to_string(),
            total_price: 317,
            nm_id: 2_389_212,
            brand: "Vivienne Sabo".to_string(),
            status: 202,
        }],
        locale: "en".to_string(),
        internal_signature: String::new(),
        customer_id: "test".to_string(),
        delivery_service: "meest".to_string(),
        shardkey: "9".to_string(),
        sm_id: 99,
        // 2021-11-26T06:22:19Z
        date_created: DateTime::from_timestamp(1_637_907_739, 0).unwrap_or_default(),
        oof_shard: "1".to_string(),
    }
}
