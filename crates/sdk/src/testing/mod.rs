//! In-memory collaborators for exercising the swap flow without a network.
//!
//! [`MockRelayer`] answers every relayer endpoint with canned payloads and
//! records the requests it received. [`MockChain`] scripts receipt lookups
//! and counts every chain-RPC call, so tests can assert that nothing was
//! sent at all.

mod chain;
mod relayer;

use std::io;

pub use chain::{ChainCalls, MockChain};
pub use relayer::{MockRelayer, RelayerCalls};

use crate::error::BridgeError;

fn connection_refused(what: &str) -> BridgeError {
    BridgeError::Transport(Box::new(io::Error::new(io::ErrorKind::ConnectionRefused, what.to_string())))
}
