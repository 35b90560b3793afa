//! Wire payload decoding.

use crate::{DecodeError, Order};

/// UTF-8 byte-order mark some producers prepend to JSON payloads.
pub const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Strip a single leading byte-order mark, if present.
pub fn strip_bom(payload: &[u8]) -> &[u8] {
    payload.strip_prefix(UTF8_BOM).unwrap_or(payload)
}

/// Decode a raw stream payload into an [`Order`].
pub fn decode_order(payload: &[u8]) -> Result<Order, DecodeError> {
    serde_json::from_slice(strip_bom(payload)).map_err(|e| DecodeError::Malformed {
        reason: e.to_string(),
    })
}
