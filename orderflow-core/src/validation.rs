//! Order validation.
//!
//! [`Validator`] is the contract the ingestion pipeline depends on.
//! [`OrderValidator`] is the concrete rule set. It holds no state, so one
//! value can be shared freely or built per pipeline.

use crate::{Delivery, Item, Order, Payment, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;

/// Field-constraint check over a whole order.
///
/// Implementations must be pure: no I/O, no side effects.
pub trait Validator: Send + Sync {
    /// Return `Ok(())` for a fully valid order, or the first violated rule.
    fn check(&self, order: &Order) -> Result<(), ValidationError>;
}

impl<V: Validator + ?Sized> Validator for std::sync::Arc<V> {
    fn check(&self, order: &Order) -> Result<(), ValidationError> {
        (**self).check(order)
    }
}

// ============================================================================
// FIELD HELPERS
// ============================================================================

type FieldResult = Result<(), ValidationError>;

/// Length bounds on string fields, counted in chars.
pub trait ValidateLength {
    fn validate_length(&self, field: &str, min: usize, max: usize) -> FieldResult;
}

impl ValidateLength for str {
    fn validate_length(&self, field: &str, min: usize, max: usize) -> FieldResult {
        let len = self.chars().count();
        if len == 0 && min > 0 {
            return Err(ValidationError::RequiredFieldMissing {
                field: field.to_string(),
            });
        }
        if len < min || len > max {
            return Err(ValidationError::InvalidLength {
                field: field.to_string(),
                len,
                min,
                max,
            });
        }
        Ok(())
    }
}

impl ValidateLength for String {
    fn validate_length(&self, field: &str, min: usize, max: usize) -> FieldResult {
        self.as_str().validate_length(field, min, max)
    }
}

/// Numeric bounds on integer fields.
pub trait ValidateRange {
    /// Value must be `>= 0`.
    fn validate_non_negative(&self, field: &str) -> FieldResult;

    /// Value must be `> 0`.
    fn validate_positive(&self, field: &str) -> FieldResult;

    /// Value must lie in the inclusive range.
    fn validate_range(&self, field: &str, min: Self, max: Self) -> FieldResult
    where
        Self: Sized;
}

macro_rules! impl_validate_range {
    ($($t:ty),*) => {
        $(
            impl ValidateRange for $t {
                fn validate_non_negative(&self, field: &str) -> FieldResult {
                    if *self < 0 {
                        return Err(ValidationError::OutOfRange {
                            field: field.to_string(),
                            value: *self as i64,
                            reason: "must be >= 0".to_string(),
                        });
                    }
                    Ok(())
                }

                fn validate_positive(&self, field: &str) -> FieldResult {
                    if *self <= 0 {
                        return Err(ValidationError::OutOfRange {
                            field: field.to_string(),
                            value: *self as i64,
                            reason: "must be > 0".to_string(),
                        });
                    }
                    Ok(())
                }

                fn validate_range(&self, field: &str, min: Self, max: Self) -> FieldResult {
                    if *self < min || *self > max {
                        return Err(ValidationError::OutOfRange {
                            field: field.to_string(),
                            value: *self as i64,
                            reason: format!("must be within {}..={}", min, max),
                        });
                    }
                    Ok(())
                }
            }
        )*
    };
}

impl_validate_range!(i32, i64);

static E164: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^\+[1-9][0-9]{1,14}$").ok());

static EMAIL: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$").ok()
});

fn validate_pattern(
    value: &str,
    pattern: &Lazy<Option<Regex>>,
    field: &str,
    expected: &str,
) -> FieldResult {
    let matched = pattern
        .as_ref()
        .map(|re| re.is_match(value))
        .unwrap_or(false);
    if matched {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            expected: expected.to_string(),
        })
    }
}

// ============================================================================
// ORDER RULES
// ============================================================================

/// Field constraints for orders arriving from the stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderValidator;

impl OrderValidator {
    pub fn new() -> Self {
        Self
    }

    fn check_delivery(&self, d: &Delivery) -> FieldResult {
        d.name.validate_length("delivery.name", 1, 128)?;
        if d.phone.is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "delivery.phone".to_string(),
            });
        }
        validate_pattern(&d.phone, &E164, "delivery.phone", "E.164 phone number")?;
        d.zip.validate_length("delivery.zip", 3, 16)?;
        d.city.validate_length("delivery.city", 1, 64)?;
        d.address.validate_length("delivery.address", 1, 256)?;
        d.region.validate_length("delivery.region", 1, 64)?;
        if d.email.is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "delivery.email".to_string(),
            });
        }
        validate_pattern(&d.email, &EMAIL, "delivery.email", "email address")
    }

    fn check_payment(&self, p: &Payment) -> FieldResult {
        p.transaction.validate_length("payment.transaction", 8, 64)?;
        p.currency.validate_length("payment.currency", 3, 3)?;
        p.provider.validate_length("payment.provider", 1, 32)?;
        p.amount.validate_non_negative("payment.amount")?;
        p.payment_dt.validate_positive("payment.payment_dt")?;
        p.bank.validate_length("payment.bank", 1, 32)?;
        p.delivery_cost.validate_non_negative("payment.delivery_cost")?;
        p.goods_total.validate_non_negative("payment.goods_total")?;
        p.custom_fee.validate_non_negative("payment.custom_fee")
    }

    fn check_item(&self, idx: usize, item: &Item) -> FieldResult {
        let field = |name: &str| format!("items[{}].{}", idx, name);
        item.chrt_id.validate_positive(&field("chrt_id"))?;
        item.track_number
            .validate_length(&field("track_number"), 5, 32)?;
        item.price.validate_non_negative(&field("price"))?;
        item.rid.validate_length(&field("rid"), 4, 64)?;
        item.name.validate_length(&field("name"), 1, 128)?;
        item.sale.validate_range(&field("sale"), 0, 100)?;
        item.size.validate_length(&field("size"), 1, 16)?;
        item.total_price.validate_non_negative(&field("total_price"))?;
        item.nm_id.validate_positive(&field("nm_id"))?;
        item.brand.validate_length(&field("brand"), 1, 64)?;
        item.status.validate_non_negative(&field("status"))
    }
}

impl Validator for OrderValidator {
    fn check(&self, order: &Order) -> Result<(), ValidationError> {
        order.order_uid.validate_length("order_uid", 8, 64)?;
        order.track_number.validate_length("track_number", 5, 32)?;
        order.entry.validate_length("entry", 2, 8)?;
        order.locale.validate_length("locale", 2, 8)?;
        order.customer_id.validate_length("customer_id", 1, 64)?;
        order
            .delivery_service
            .validate_length("delivery_service", 1, 64)?;
        order.shardkey.validate_length("shardkey", 1, 8)?;
        order.sm_id.validate_non_negative("sm_id")?;
        if order.date_created.timestamp() <= 0 {
            return Err(ValidationError::RequiredFieldMissing {
                field: "date_created".to_string(),
            });
        }
        order.oof_shard.validate_length("oof_shard", 1, 8)?;

        self.check_delivery(&order.delivery)?;
        self.check_payment(&order.payment)?;

        if order.items.is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "items".to_string(),
            });
        }
        order
            .items
            .iter()
            .enumerate()
            .try_for_each(|(idx, item)| self.check_item(idx, item))
    }
}
