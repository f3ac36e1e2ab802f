//! Relayer request/response payloads.
//!
//! Field names follow the relayer's camelCase JSON. Values the relayer
//! computes (fees, amounts, hashes, encoded payloads) are kept as the
//! strings it sent and passed through unmodified.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{AssetRef, parse_address, parse_amount};
use crate::error::BridgeError;

/// Every relayer response is wrapped as `{"result": <payload>}`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub result: T,
}

/// `POST /price` body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRequest {
    pub from: String,
    pub to: String,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_address: Option<String>,
}

impl PriceRequest {
    /// Checks the amount (and sender, if given) and builds the request body.
    pub fn new(
        source: &AssetRef,
        destination: &AssetRef,
        amount: &str,
        from_address: Option<&str>,
    ) -> Result<Self, BridgeError> {
        parse_amount(amount)?;
        if let Some(address) = from_address {
            parse_address(address)?;
        }
        Ok(Self {
            from: source.to_string(),
            to: destination.to_string(),
            amount: amount.trim().to_string(),
            from_address: from_address.map(|a| a.trim().to_string()),
        })
    }
}

/// Fee and limits for a route, as priced by the relayer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceInfo {
    pub fee: String,
    /// Estimated transfer time, seconds.
    pub estimated_time: u64,
    pub min_amount: String,
    pub max_amount: String,
}

/// `POST /swap` body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapEncodeRequest {
    pub from: String,
    pub to: String,
    pub amount: String,
    pub from_address: String,
    pub recipient: String,
    /// Unix seconds.
    pub expire_ts: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningRequest {
    pub message: String,
    /// `0x`-prefixed 32-byte hash the sender signs.
    pub hash: String,
}

/// Unsigned swap as encoded by the relayer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapEncoding {
    pub encoded: String,
    pub signing_request: SigningRequest,
    pub price_info: PriceInfo,
}

/// `POST /swap/{encoded}` body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapSubmitRequest {
    pub from_address: String,
    pub recipient: String,
    /// `0x`-prefixed 65-byte signature, recovery byte 27/28.
    pub signature: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapSubmitted {
    pub swap_id: String,
}

/// Progress of a swap as far as it can be told from the relayer record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SwapState {
    /// Accepted by the relayer, nothing posted on chain yet.
    Pending,
    /// Posted, bonded or locked, not released yet.
    Sent,
    Released,
    Cancelled,
    Expired,
}

impl SwapState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SwapState::Released | SwapState::Cancelled | SwapState::Expired)
    }
}

impl std::fmt::Display for SwapState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwapState::Pending => write!(f, "Pending"),
            SwapState::Sent => write!(f, "Sent"),
            SwapState::Released => write!(f, "Released"),
            SwapState::Cancelled => write!(f, "Cancelled"),
            SwapState::Expired => write!(f, "Expired"),
        }
    }
}

const SENT_MARKERS: &[&str] = &["POSTED", "BONDED", "LOCKED"];
const RELEASED_MARKERS: &[&str] = &["RELEASED", "EXECUTED"];

/// Swap status record returned by `GET /swap/{swapId}`.
///
/// The relayer owns the schema, so every field it sent is preserved as-is in
/// [`SwapStatus::fields`] and round-trips through serialization unchanged;
/// [`SwapStatus::state`] is derived from the fields that are known.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct SwapStatus {
    state: SwapState,
    fields: Map<String, Value>,
}

impl SwapStatus {
    pub fn state(&self) -> SwapState { self.state }

    pub fn fields(&self) -> &Map<String, Value> { &self.fields }

    pub fn get(&self, field: &str) -> Option<&Value> { self.fields.get(field) }

    pub fn is_terminal(&self) -> bool { self.state.is_terminal() }

    fn classify(fields: &Map<String, Value>) -> SwapState {
        let present = |key: &str| fields.get(key).is_some_and(|v| !v.is_null() && v != &Value::Bool(false));

        if present("CANCELLED") {
            return SwapState::Cancelled;
        }
        if RELEASED_MARKERS.iter().any(|k| present(*k)) {
            return SwapState::Released;
        }
        if present("expired") || present("expire") {
            return SwapState::Expired;
        }
        if SENT_MARKERS.iter().any(|k| present(*k)) {
            return SwapState::Sent;
        }
        // Some relayer versions report a plain `status` string instead.
        match fields.get("status").and_then(Value::as_str).map(str::to_uppercase).as_deref() {
            Some("CANCELLED") => SwapState::Cancelled,
            Some("RELEASED" | "EXECUTED" | "DONE") => SwapState::Released,
            Some("EXPIRED") => SwapState::Expired,
            Some("POSTED" | "BONDED" | "LOCKED" | "SENT") => SwapState::Sent,
            _ => SwapState::Pending,
        }
    }
}

impl From<Map<String, Value>> for SwapStatus {
    fn from(fields: Map<String, Value>) -> Self { Self { state: Self::classify(&fields), fields } }
}

impl From<SwapStatus> for Map<String, Value> {
    fn from(status: SwapStatus) -> Self { status.fields }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn status(value: Value) -> SwapStatus { serde_json::from_value(value).unwrap() }

    #[test]
    fn test_swap_status_state() {
        assert_eq!(status(json!({})).state(), SwapState::Pending);
        assert_eq!(status(json!({"POSTED": "0xabc"})).state(), SwapState::Sent);
        assert_eq!(status(json!({"POSTED": "0xabc", "LOCKED": "0xdef"})).state(), SwapState::Sent);
        assert_eq!(
            status(json!({"POSTED": "0xabc", "RELEASED": "0x123"})).state(),
            SwapState::Released
        );
        assert_eq!(status(json!({"POSTED": "0xabc", "CANCELLED": "0x1"})).state(), SwapState::Cancelled);
        assert_eq!(status(json!({"expired": true})).state(), SwapState::Expired);
        assert_eq!(status(json!({"expired": false})).state(), SwapState::Pending);
        assert_eq!(status(json!({"RELEASED": null})).state(), SwapState::Pending);
        assert_eq!(status(json!({"status": "released"})).state(), SwapState::Released);

        assert!(status(json!({"RELEASED": "0x1"})).is_terminal());
        assert!(!status(json!({"LOCKED": "0x1"})).is_terminal());
    }

    #[test]
    fn test_swap_status_preserves_unknown_fields() {
        let raw = json!({
            "POSTED": "0xabc",
            "fromChain": "merlin",
            "nested": {"futureField": [1, 2, 3]},
        });
        let parsed = status(raw.clone());

        assert_eq!(parsed.get("fromChain"), Some(&json!("merlin")));
        assert_eq!(serde_json::to_value(&parsed).unwrap(), raw);
    }

    #[test]
    fn test_encoding_wire_format() {
        let encoding: SwapEncoding = serde_json::from_value(json!({
            "encoded": "0x01",
            "signingRequest": {"message": "msg", "hash": "0x02"},
            "priceInfo": {"fee": "0.0001", "estimatedTime": 120, "minAmount": "0.0001", "maxAmount": "10"},
        }))
        .unwrap();

        assert_eq!(encoding.signing_request.hash, "0x02");
        assert_eq!(encoding.price_info.estimated_time, 120);

        let request = PriceRequest {
            from: "merlin:67".to_string(),
            to: "zksync:67".to_string(),
            amount: "0.01".to_string(),
            from_address: None,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"from": "merlin:67", "to": "zksync:67", "amount": "0.01"})
        );
    }
}
