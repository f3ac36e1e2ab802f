//! Token and pool contract addresses per chain.
//!
//! The registry is a plain owned value without internal locking. Populate it
//! before sharing it between concurrent swaps, or synchronize writers
//! externally.

use std::collections::HashMap;

use alloy::primitives::{Address, address};

use crate::{
    error::{BridgeError, MappingKind},
    types::{self, ChainId, TokenId},
};

pub const MERLIN_MBTC: Address = address!("0x2F913C820ed3bEb3a67391a6eFF64E70c4B20b19");
pub const MERLIN_MERL: Address = address!("0x5c46bFF4B38dc1EAE09C5BAc65872a1D8bc87378");
pub const MERLIN_POOL: Address = address!("0x25aB3Efd52e6470681CE037cD546Dc60726948D3");

#[derive(Clone, Debug, Default)]
pub struct AddressRegistry {
    tokens: HashMap<(ChainId, TokenId), Address>,
    pools: HashMap<ChainId, Address>,
}

impl AddressRegistry {
    /// Empty registry.
    pub fn new() -> Self { Self::default() }

    /// Registry with the Merlin MBTC/MERL tokens and pool registered.
    pub fn merlin_defaults() -> Self {
        let mut registry = Self::new();
        registry.tokens.insert((ChainId::merlin(), TokenId::mbtc()), MERLIN_MBTC);
        registry.tokens.insert((ChainId::merlin(), TokenId::merl()), MERLIN_MERL);
        registry.pools.insert(ChainId::merlin(), MERLIN_POOL);
        registry
    }

    /// Registers (or replaces) the token contract address on `chain`.
    pub fn register_token(
        &mut self,
        chain: ChainId,
        token: TokenId,
        address: &str,
    ) -> Result<Address, BridgeError> {
        let address = types::parse_address(address)?;
        self.tokens.insert((chain, token), address);
        Ok(address)
    }

    /// Registers (or replaces) the pool contract address on `chain`.
    pub fn register_pool(&mut self, chain: ChainId, address: &str) -> Result<Address, BridgeError> {
        let address = types::parse_address(address)?;
        self.pools.insert(chain, address);
        Ok(address)
    }

    pub fn lookup_token(&self, chain: &ChainId, token: &TokenId) -> Result<Address, BridgeError> {
        self.tokens
            .get(&(chain.clone(), token.clone()))
            .copied()
            .ok_or_else(|| BridgeError::UnknownMapping {
                kind: MappingKind::Token,
                key: format!("{}:{}", chain, token),
            })
    }

    pub fn lookup_pool(&self, chain: &ChainId) -> Result<Address, BridgeError> {
        self.pools.get(chain).copied().ok_or_else(|| BridgeError::UnknownMapping {
            kind: MappingKind::Pool,
            key: chain.to_string(),
        })
    }

    /// Returns the override if given, the registered address otherwise.
    pub fn resolve_token(
        &self,
        chain: &ChainId,
        token: &TokenId,
        address_override: Option<&str>,
    ) -> Result<Address, BridgeError> {
        match address_override {
            Some(address) => types::parse_address(address),
            None => self.lookup_token(chain, token),
        }
    }

    /// Returns the override if given, the registered address otherwise.
    pub fn resolve_pool(
        &self,
        chain: &ChainId,
        address_override: Option<&str>,
    ) -> Result<Address, BridgeError> {
        match address_override {
            Some(address) => types::parse_address(address),
            None => self.lookup_pool(chain),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = AddressRegistry::new();
        let pairs = [
            ("merlin", "67", "0x2F913C820ed3bEb3a67391a6eFF64E70c4B20b19"),
            ("merlin", "69", "0x5c46bFF4B38dc1EAE09C5BAc65872a1D8bc87378"),
            ("zksync", "67", "0x25aB3Efd52e6470681CE037cD546Dc60726948D3"),
        ];
        for (chain, token, address) in pairs {
            registry
                .register_token(ChainId::new(chain), TokenId::new(token), address)
                .unwrap();
        }

        for (chain, token, address) in pairs {
            assert_eq!(
                registry.lookup_token(&ChainId::new(chain), &TokenId::new(token)).unwrap(),
                types::parse_address(address).unwrap()
            );
        }

        assert!(matches!(
            registry.lookup_token(&ChainId::new("zksync"), &TokenId::new("69")),
            Err(BridgeError::UnknownMapping { kind: MappingKind::Token, .. })
        ));
        assert!(matches!(
            registry.lookup_pool(&ChainId::merlin()),
            Err(BridgeError::UnknownMapping { kind: MappingKind::Pool, .. })
        ));
    }

    #[test]
    fn test_register_rejects_malformed() {
        let mut registry = AddressRegistry::new();
        for bad in ["", "0x", "not-an-address", "0x2F913C820ed3bEb3a67391a6eFF64E70c4B20b1", "0xZZ913C820ed3bEb3a67391a6eFF64E70c4B20b19"] {
            assert!(matches!(
                registry.register_token(ChainId::merlin(), TokenId::mbtc(), bad),
                Err(BridgeError::Validation(_))
            ));
            assert!(matches!(registry.register_pool(ChainId::merlin(), bad), Err(BridgeError::Validation(_))));
        }
        assert!(registry.lookup_token(&ChainId::merlin(), &TokenId::mbtc()).is_err());
    }

    #[test]
    fn test_resolve_prefers_override() {
        let registry = AddressRegistry::merlin_defaults();
        let merlin = ChainId::merlin();

        assert_eq!(registry.resolve_pool(&merlin, None).unwrap(), MERLIN_POOL);
        assert_eq!(
            registry
                .resolve_pool(&merlin, Some("0x5c46bFF4B38dc1EAE09C5BAc65872a1D8bc87378"))
                .unwrap(),
            MERLIN_MERL
        );
        assert_eq!(registry.resolve_token(&merlin, &TokenId::merl(), None).unwrap(), MERLIN_MERL);
        assert!(registry.resolve_token(&ChainId::zksync(), &TokenId::merl(), None).is_err());
        assert!(registry.resolve_token(&ChainId::zksync(), &TokenId::merl(), Some("bad")).is_err());
    }
}
