mod relayer;

use std::{fmt::Display, str::FromStr};

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use fastnum::UD128;
pub use relayer::*;

use crate::error::BridgeError;

/// Chain identifier as understood by the relayer (e.g. `merlin`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChainId(String);

/// Relayer token identifier (e.g. `67` for MBTC).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenId(String);

pub const MERLIN: &str = "merlin";
pub const ZKSYNC: &str = "zksync";
pub const DUCKCHAIN: &str = "duck";
pub const BNB: &str = "bnb";

pub const TOKEN_MBTC: &str = "67";
pub const TOKEN_MERL: &str = "69";

/// Well-known token names accepted by [`TokenId::resolve`].
const TOKEN_ALIASES: &[(&str, &str)] = &[("mbtc", TOKEN_MBTC), ("btc", TOKEN_MBTC), ("merl", TOKEN_MERL)];

impl ChainId {
    pub fn new(chain: impl Into<String>) -> Self { Self(chain.into()) }

    pub fn merlin() -> Self { Self::new(MERLIN) }

    pub fn zksync() -> Self { Self::new(ZKSYNC) }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl TokenId {
    pub fn new(token: impl Into<String>) -> Self { Self(token.into()) }

    pub fn mbtc() -> Self { Self::new(TOKEN_MBTC) }

    pub fn merl() -> Self { Self::new(TOKEN_MERL) }

    /// Resolves a token name (`mbtc`, `btc`, `merl`, case-insensitive) or a
    /// decimal token ID.
    pub fn resolve(name_or_id: &str) -> Result<Self, BridgeError> {
        let lower = name_or_id.trim().to_lowercase();
        if let Some((_, id)) = TOKEN_ALIASES.iter().find(|(name, _)| *name == lower) {
            return Ok(Self::new(*id));
        }
        lower.parse::<u64>().map(|id| Self::new(id.to_string())).map_err(|_| {
            BridgeError::Validation(format!(
                "'{}' is neither a known token name nor a token ID",
                name_or_id
            ))
        })
    }

    /// Upper-cased well-known name, or `Token(<id>)`.
    pub fn display_name(&self) -> String {
        TOKEN_ALIASES
            .iter()
            .find(|(_, id)| *id == self.0)
            .map(|(name, _)| name.to_uppercase())
            .unwrap_or_else(|| format!("Token({})", self.0))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
}

impl Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
}

/// Token on a particular chain, rendered as `<chain>:<token>` on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AssetRef {
    pub chain: ChainId,
    pub token: TokenId,
}

impl AssetRef {
    pub fn new(chain: ChainId, token: TokenId) -> Self { Self { chain, token } }
}

impl Display for AssetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.chain, self.token)
    }
}

impl FromStr for AssetRef {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((chain, token)) if !chain.is_empty() && !token.is_empty() => {
                Ok(Self::new(ChainId::new(chain), TokenId::new(token)))
            },
            _ => Err(BridgeError::Validation(format!("invalid asset '{}', expected <chain>:<token>", s))),
        }
    }
}

/// Parses a 20-byte hex address (`0x` prefix optional).
pub fn parse_address(s: &str) -> Result<Address, BridgeError> {
    Address::from_str(s.trim())
        .map_err(|_| BridgeError::Validation(format!("invalid address format: {}", s)))
}

/// Parses a positive decimal amount.
pub fn parse_amount(s: &str) -> Result<UD128, BridgeError> {
    let amount = s
        .trim()
        .parse::<UD128>()
        .map_err(|_| BridgeError::Validation(format!("invalid amount: {}", s)))?;
    if !amount.is_finite() {
        return Err(BridgeError::Validation(format!("amount must be a finite decimal: {}", s)));
    }
    if amount.is_zero() {
        return Err(BridgeError::Validation(format!("amount must be positive: {}", s)));
    }
    Ok(amount)
}

/// One cross-chain swap attempt as supplied by the caller.
///
/// Addresses and amount are kept in their textual form and validated by
/// [`SwapRequest::validate`], which the orchestrator runs before any I/O.
#[derive(Clone, Debug)]
pub struct SwapRequest {
    pub amount: String,
    pub from_address: String,
    pub to_address: String,
    pub source: AssetRef,
    pub destination: AssetRef,
    /// Token contract on the source chain, overriding the registry.
    pub token_address: Option<String>,
    /// Pool contract on the source chain, overriding the registry.
    pub pool_address: Option<String>,
    /// Swap expiry, `now + SwapConfig::expiry` if not set.
    pub expires_at: Option<DateTime<Utc>>,
}

impl SwapRequest {
    pub fn new(
        amount: impl Into<String>,
        from_address: impl Into<String>,
        to_address: impl Into<String>,
        source: AssetRef,
        destination: AssetRef,
    ) -> Self {
        Self {
            amount: amount.into(),
            from_address: from_address.into(),
            to_address: to_address.into(),
            source,
            destination,
            token_address: None,
            pool_address: None,
            expires_at: None,
        }
    }

    pub fn with_token_address(mut self, address: impl Into<String>) -> Self {
        self.token_address = Some(address.into());
        self
    }

    pub fn with_pool_address(mut self, address: impl Into<String>) -> Self {
        self.pool_address = Some(address.into());
        self
    }

    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Checks addresses, amount and explicit expiry against `now`.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<ValidatedSwap, BridgeError> {
        let from = parse_address(&self.from_address)?;
        let to = parse_address(&self.to_address)?;
        let amount = parse_amount(&self.amount)?;
        if let Some(expires_at) = self.expires_at
            && expires_at <= now
        {
            return Err(BridgeError::Validation(format!(
                "expiry {} is not in the future",
                expires_at.to_rfc3339()
            )));
        }
        Ok(ValidatedSwap { from, to, amount })
    }
}

/// Parsed counterpart of the caller-supplied [`SwapRequest`] fields.
#[derive(Clone, Copy, Debug)]
pub struct ValidatedSwap {
    pub from: Address,
    pub to: Address,
    pub amount: UD128,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn request(from: &str) -> SwapRequest {
        SwapRequest::new(
            "0.01",
            from,
            "0x25aB3Efd52e6470681CE037cD546Dc60726948D3",
            AssetRef::new(ChainId::merlin(), TokenId::mbtc()),
            AssetRef::new(ChainId::zksync(), TokenId::mbtc()),
        )
    }

    #[test]
    fn test_resolve_token() {
        assert_eq!(TokenId::resolve("MERL").unwrap(), TokenId::merl());
        assert_eq!(TokenId::resolve("btc").unwrap(), TokenId::mbtc());
        assert_eq!(TokenId::resolve("101").unwrap(), TokenId::new("101"));
        assert!(matches!(TokenId::resolve("doge"), Err(BridgeError::Validation(_))));

        assert_eq!(TokenId::mbtc().display_name(), "MBTC");
        assert_eq!(TokenId::new("101").display_name(), "Token(101)");
    }

    #[test]
    fn test_price_request() {
        let source = AssetRef::new(ChainId::merlin(), TokenId::mbtc());
        let destination = AssetRef::new(ChainId::zksync(), TokenId::mbtc());

        let request = PriceRequest::new(&source, &destination, " 0.01 ", None).unwrap();
        assert_eq!(request.from, "merlin:67");
        assert_eq!(request.to, "zksync:67");
        assert_eq!(request.amount, "0.01");
        assert!(request.from_address.is_none());

        assert!(PriceRequest::new(&source, &destination, "inf", None).is_err());
        assert!(PriceRequest::new(&source, &destination, "0.01", Some("not-an-address")).is_err());
    }

    #[test]
    fn test_asset_ref() {
        let asset: AssetRef = "merlin:67".parse().unwrap();
        assert_eq!(asset, AssetRef::new(ChainId::merlin(), TokenId::mbtc()));
        assert_eq!(asset.to_string(), "merlin:67");

        assert!("merlin".parse::<AssetRef>().is_err());
        assert!(":67".parse::<AssetRef>().is_err());
        assert!("merlin:".parse::<AssetRef>().is_err());
    }

    #[test]
    fn test_validate() {
        let now = Utc::now();
        let valid = request("0x2F913C820ed3bEb3a67391a6eFF64E70c4B20b19");
        assert!(valid.validate(now).is_ok());

        assert!(matches!(request("not-an-address").validate(now), Err(BridgeError::Validation(_))));

        let mut zero = valid.clone();
        zero.amount = "0".to_string();
        assert!(matches!(zero.validate(now), Err(BridgeError::Validation(_))));

        let mut garbage = valid.clone();
        garbage.amount = "1.2.3".to_string();
        assert!(matches!(garbage.validate(now), Err(BridgeError::Validation(_))));

        for special in ["NaN", "nan", "Inf", "inf", "Infinity", "+inf"] {
            let mut non_finite = valid.clone();
            non_finite.amount = special.to_string();
            assert!(
                matches!(non_finite.validate(now), Err(BridgeError::Validation(_))),
                "{} accepted",
                special
            );
        }

        let past = valid.clone().expiring_at(now - Duration::seconds(1));
        assert!(matches!(past.validate(now), Err(BridgeError::Validation(_))));
        let exact = valid.clone().expiring_at(now);
        assert!(matches!(exact.validate(now), Err(BridgeError::Validation(_))));
        let future = valid.expiring_at(now + Duration::seconds(1));
        assert!(future.validate(now).is_ok());
    }
}
