//! [`Meson`] cross-chain swap SDK.
//!
//! # Overview
//!
//! Moves a token from a source chain to a destination chain through the
//! Meson relayer:
//!
//! 1. [`registry::AddressRegistry`] resolves the token and pool contracts on
//!    the source chain.
//! 2. [`tx::TransactionSubmitter`] sends the ERC20 approval built by
//!    [`erc20::ApproveEncoder`] and waits for its receipt.
//! 3. [`relayer::RelayerClient`] encodes the swap, the sender signs the hash
//!    (see [`signature::sign_swap_hash`]) and the signed swap is submitted.
//! 4. One status record is fetched and returned.
//!
//! [`swap::SwapOrchestrator`] runs these steps in order. Use
//! [`swap::SwapOrchestrator::prepare`] and [`swap::SwapOrchestrator::submit`]
//! to sign the swap outside of the SDK, or [`swap::SwapOrchestrator::execute`]
//! with a signing closure.
//!
//! See `./tests` for examples.
//!
//! # Limitations/follow-ups
//!
//! * Nonces are read from the chain right before signing, so transactions of
//!   one sender must be submitted one at a time.
//!
//! * Settlement on the destination chain is tracked by the relayer only;
//!   follow it with [`swap::SwapOrchestrator::status`].
//!
//! # Features
//!
//! | Feature | Default | Description |
//! | --- | --- | --- |
//! | `testing` | yes | Enables [`testing`] module. |
//!
//! # Testing
//!
//! [`testing`] module provides scripted relayer and chain-RPC doubles that
//! record every call.
//!
//!
//! [`Meson`]: https://meson.fi

pub mod erc20;
pub mod error;
pub mod registry;
pub mod relayer;
pub mod signature;
pub mod swap;
#[cfg(feature = "testing")]
pub mod testing;
pub mod tx;
pub mod types;

pub use error::BridgeError;
pub use registry::AddressRegistry;
pub use relayer::{Relayer, RelayerClient, RelayerConfig};
pub use swap::{ApprovalPolicy, SwapConfig, SwapOrchestrator};
pub use tx::{AlloyRpc, ChainRpc, RetryPolicy, TransactionSubmitter};
