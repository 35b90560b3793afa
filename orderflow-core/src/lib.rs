//! orderflow core
//!
//! Order record model, field validation, payload decoding and the error
//! taxonomy shared by every orderflow crate.

use chrono::{DateTime, Utc};

mod codec;
mod config;
mod demo;
mod entities;
mod error;
mod validation;

pub use codec::{decode_order, strip_bom, UTF8_BOM};
pub use config::{ServiceConfig, DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_WARMUP_LIMIT};
pub use demo::{demo_order, DEMO_ORDER_UID};
pub use entities::{Delivery, Item, Order, Payment};
pub use error::{
    ConfigError, DecodeError, OrderflowError, OrderflowResult, SourceError, StorageError,
    ValidationError,
};
pub use validation::{OrderValidator, ValidateLength, ValidateRange, Validator};

/// Timestamp type used across the record model.
pub type Timestamp = DateTime<Utc>;
