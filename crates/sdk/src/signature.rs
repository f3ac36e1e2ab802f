//! Relayer-protocol swap signatures.

use std::{fmt::Display, str::FromStr};

use alloy::{
    primitives::{B256, hex},
    signers::{SignerSync, local::PrivateKeySigner},
};

use crate::error::BridgeError;

const SIGNATURE_LEN: usize = 65;

/// 65-byte `r || s || v` ECDSA signature with `v` in `{27, 28}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapSignature([u8; SIGNATURE_LEN]);

impl SwapSignature {
    /// Accepts recovery byte 0/1 (normalized to 27/28) or 27/28.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BridgeError> {
        let mut sig: [u8; SIGNATURE_LEN] = bytes.try_into().map_err(|_| {
            BridgeError::Validation(format!(
                "signature must be {} bytes, got {}",
                SIGNATURE_LEN,
                bytes.len()
            ))
        })?;
        sig[64] = match sig[64] {
            v @ (0 | 1) => v + 27,
            v @ (27 | 28) => v,
            v => return Err(BridgeError::Validation(format!("invalid recovery byte {}", v))),
        };
        Ok(Self(sig))
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] { &self.0 }

    pub fn v(&self) -> u8 { self.0[64] }

    /// `0x`-prefixed lowercase hex, as sent to the relayer.
    pub fn to_hex(&self) -> String { hex::encode_prefixed(self.0) }
}

impl Display for SwapSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.to_hex()) }
}

impl FromStr for SwapSignature {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim())
            .map_err(|_| BridgeError::Validation(format!("invalid signature hex: {}", s)))?;
        Self::from_bytes(&bytes)
    }
}

/// Signs the relayer signing hash as is, without an EIP-191 prefix.
pub fn sign_swap_hash(signer: &PrivateKeySigner, hash: &str) -> Result<SwapSignature, BridgeError> {
    let hash = B256::from_str(hash.trim())
        .map_err(|_| BridgeError::Validation(format!("invalid signing hash: {}", hash)))?;
    let signature = signer.sign_hash_sync(&hash)?;
    SwapSignature::from_bytes(&signature.as_bytes())
}

#[cfg(test)]
mod tests {
    use alloy::primitives::b256;

    use super::*;

    #[test]
    fn test_from_bytes_normalizes_recovery_byte() {
        let mut raw = [7u8; 65];
        raw[64] = 1;
        assert_eq!(SwapSignature::from_bytes(&raw).unwrap().v(), 28);
        raw[64] = 0;
        assert_eq!(SwapSignature::from_bytes(&raw).unwrap().v(), 27);
        raw[64] = 28;
        assert_eq!(SwapSignature::from_bytes(&raw).unwrap().v(), 28);

        raw[64] = 2;
        assert!(matches!(SwapSignature::from_bytes(&raw), Err(BridgeError::Validation(_))));
        assert!(matches!(SwapSignature::from_bytes(&raw[..64]), Err(BridgeError::Validation(_))));
    }

    #[test]
    fn test_sign_swap_hash_recovers() {
        let signer = PrivateKeySigner::random();
        let hash = b256!("0x6f1e4a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7");

        let sig = sign_swap_hash(&signer, &hash.to_string()).unwrap();
        assert!(matches!(sig.v(), 27 | 28));
        assert!(sig.to_hex().starts_with("0x"));
        assert_eq!(sig.to_hex().len(), 2 + 130);

        let recovered = alloy::primitives::Signature::try_from(&sig.as_bytes()[..])
            .unwrap()
            .recover_address_from_prehash(&hash)
            .unwrap();
        assert_eq!(recovered, signer.address());

        assert_eq!(sig.to_hex().parse::<SwapSignature>().unwrap(), sig);
        assert!(sign_swap_hash(&signer, "0x1234").is_err());
    }
}
