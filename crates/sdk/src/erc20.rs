//! ERC20 call data for token allowances.

use alloy::primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, sol};

use crate::error::BridgeError;

sol! {
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
    }
}

/// Encodes ERC20 `approve` and `allowance` calls. Pure, no I/O.
pub struct ApproveEncoder;

impl ApproveEncoder {
    /// `approve(spender, amount)`: selector `0x095ea7b3` followed by the
    /// left-padded 32-byte spender and amount.
    pub fn encode(spender: Address, amount: U256) -> Bytes {
        IERC20::approveCall { spender, amount }.abi_encode().into()
    }

    /// Approval of the maximum `uint256`, i.e. unlimited allowance.
    pub fn approve_unlimited(spender: Address) -> Bytes { Self::encode(spender, U256::MAX) }

    pub fn allowance(owner: Address, spender: Address) -> Bytes {
        IERC20::allowanceCall { owner, spender }.abi_encode().into()
    }

    pub fn decode_allowance(data: &[u8]) -> Result<U256, BridgeError> {
        Ok(IERC20::allowanceCall::abi_decode_returns(data)?)
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, hex};

    use super::*;

    const POOL: Address = address!("0x25aB3Efd52e6470681CE037cD546Dc60726948D3");

    #[test]
    fn test_approve_layout() {
        let data = ApproveEncoder::approve_unlimited(POOL);

        assert_eq!(data.len(), 4 + 32 + 32);
        assert_eq!(&data[..4], &hex!("095ea7b3"));
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..36], POOL.as_slice());
        assert_eq!(&data[36..], &[0xffu8; 32]);
    }

    #[test]
    fn test_approve_deterministic() {
        let amount = U256::from(1_000_000u64);
        assert_eq!(ApproveEncoder::encode(POOL, amount), ApproveEncoder::encode(POOL, amount));

        let data = ApproveEncoder::encode(POOL, amount);
        assert_eq!(U256::from_be_slice(&data[36..]), amount);
        assert_ne!(data, ApproveEncoder::encode(POOL, amount + U256::from(1u8)));
    }

    #[test]
    fn test_allowance() {
        let owner = address!("0x2F913C820ed3bEb3a67391a6eFF64E70c4B20b19");
        let data = ApproveEncoder::allowance(owner, POOL);
        assert_eq!(&data[..4], &hex!("dd62ed3e"));

        let returned = U256::from(42u8).to_be_bytes::<32>();
        assert_eq!(ApproveEncoder::decode_allowance(&returned).unwrap(), U256::from(42u8));
        assert!(matches!(ApproveEncoder::decode_allowance(&[1, 2, 3]), Err(BridgeError::Decode(_))));
    }
}
