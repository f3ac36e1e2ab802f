use std::fmt::Display;

use alloy::{primitives::TxHash, transports::TransportError};

use crate::tx::TxReceipt;

/// Step of the swap flow an error was raised at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SwapStep {
    Quote,
    Approve,
    Encode,
    Submit,
    Status,
}

impl Display for SwapStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwapStep::Quote => write!(f, "quote"),
            SwapStep::Approve => write!(f, "approve"),
            SwapStep::Encode => write!(f, "encode"),
            SwapStep::Submit => write!(f, "submit"),
            SwapStep::Status => write!(f, "status"),
        }
    }
}

/// Kind of address an [`BridgeError::UnknownMapping`] refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MappingKind {
    Token,
    Pool,
}

impl Display for MappingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MappingKind::Token => write!(f, "token"),
            MappingKind::Pool => write!(f, "pool"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Malformed address, amount or expiry, detected before any I/O.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("no {kind} address registered for {key} and no override given")]
    UnknownMapping { kind: MappingKind, key: String },

    /// Network failure reaching the relayer or the chain RPC.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("relayer returned status {status}: {body}")]
    Api { status: u16, body: String },

    /// Response body does not parse as the expected payload.
    #[error("malformed response: {0}")]
    Decode(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("signing failed: {0}")]
    Signing(#[from] alloy::signers::Error),

    /// Receipt found but the transaction reverted.
    #[error("transaction {} reverted in block {}", .0.tx_hash, .0.block_number)]
    TransactionFailed(TxReceipt),

    #[error("transaction {0} not confirmed before cancellation or deadline")]
    Timeout(TxHash),

    #[error("{step} step failed: {source}")]
    Step {
        step: SwapStep,
        #[source]
        source: Box<BridgeError>,
    },
}

impl BridgeError {
    /// Attaches the swap step name to the error.
    pub fn at(self, step: SwapStep) -> Self { BridgeError::Step { step, source: Box::new(self) } }

    /// Innermost error, with all step annotations removed.
    pub fn root(&self) -> &BridgeError {
        match self {
            BridgeError::Step { source, .. } => source.root(),
            other => other,
        }
    }

    /// Step the error was raised at, if any.
    pub fn step(&self) -> Option<SwapStep> {
        match self {
            BridgeError::Step { step, .. } => Some(*step),
            _ => None,
        }
    }
}

impl From<TransportError> for BridgeError {
    fn from(err: TransportError) -> Self { BridgeError::Transport(Box::new(err)) }
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self { BridgeError::Transport(Box::new(err)) }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self { BridgeError::Decode(Box::new(err)) }
}

impl From<alloy_sol_types::Error> for BridgeError {
    fn from(err: alloy_sol_types::Error) -> Self { BridgeError::Decode(Box::new(err)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_unwraps_steps() {
        let err = BridgeError::Api { status: 502, body: "bad gateway".to_string() }
            .at(SwapStep::Encode);

        assert_eq!(err.step(), Some(SwapStep::Encode));
        assert!(matches!(err.root(), BridgeError::Api { status: 502, .. }));
        assert_eq!(err.to_string(), "encode step failed: relayer returned status 502: bad gateway");
    }
}
