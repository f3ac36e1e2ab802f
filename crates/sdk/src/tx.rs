//! Building, signing, broadcasting and confirming a single transaction.
//!
//! A transaction moves through
//! `Built -> Signed -> Broadcast -> Pending -> {Confirmed | Reverted | TimedOut}`:
//!
//! - [`TransactionSubmitter::build`] picks the sender's pending nonce (fetched
//!   fresh, never cached) and the network-suggested gas price,
//! - [`TransactionSubmitter::sign`] applies EIP-155 chain-id-bound signing,
//! - [`TransactionSubmitter::broadcast`] sends the raw transaction once,
//! - [`TransactionSubmitter::confirm`] polls for the receipt.
//!
//! Nonce selection is read-then-use: callers must not submit two
//! transactions from the same sender concurrently.

use std::{fmt::Display, time::Duration};

use alloy::{
    consensus::{SignableTransaction, TxEnvelope, TxLegacy},
    eips::eip2718::Encodable2718,
    network::{ReceiptResponse, TransactionBuilder, TxSignerSync},
    primitives::{Address, Bytes, TxHash, TxKind, U256},
    providers::Provider,
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::BridgeError;

/// Gas limit applied to every transaction.
pub const DEFAULT_GAS_LIMIT: u64 = 300_000;

/// Interval between receipt lookups.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Chain-RPC primitives the submitter depends on.
///
/// [`AlloyRpc`] adapts an alloy [`Provider`]; [`crate::testing::MockChain`]
/// scripts responses for tests.
pub trait ChainRpc: Send + Sync {
    fn chain_id(&self) -> impl Future<Output = Result<u64, BridgeError>> + Send;

    fn pending_nonce(&self, address: Address) -> impl Future<Output = Result<u64, BridgeError>> + Send;

    fn gas_price(&self) -> impl Future<Output = Result<u128, BridgeError>> + Send;

    fn broadcast(&self, raw: Bytes) -> impl Future<Output = Result<TxHash, BridgeError>> + Send;

    /// `Ok(None)` while the transaction is not mined yet.
    fn receipt(
        &self,
        hash: TxHash,
    ) -> impl Future<Output = Result<Option<TxReceipt>, BridgeError>> + Send;

    /// Read-only `eth_call` against the latest block.
    fn call(&self, to: Address, data: Bytes) -> impl Future<Output = Result<Bytes, BridgeError>> + Send;
}

/// [`ChainRpc`] over any alloy [`Provider`].
#[derive(Clone, Debug)]
pub struct AlloyRpc<P>(P);

impl<P: Provider> AlloyRpc<P> {
    pub fn new(provider: P) -> Self { Self(provider) }

    pub fn provider(&self) -> &P { &self.0 }
}

impl<P: Provider> ChainRpc for AlloyRpc<P> {
    async fn chain_id(&self) -> Result<u64, BridgeError> { Ok(self.0.get_chain_id().await?) }

    async fn pending_nonce(&self, address: Address) -> Result<u64, BridgeError> {
        Ok(self.0.get_transaction_count(address).pending().await?)
    }

    async fn gas_price(&self) -> Result<u128, BridgeError> { Ok(self.0.get_gas_price().await?) }

    async fn broadcast(&self, raw: Bytes) -> Result<TxHash, BridgeError> {
        let pending = self.0.send_raw_transaction(&raw).await?;
        Ok(*pending.tx_hash())
    }

    async fn receipt(&self, hash: TxHash) -> Result<Option<TxReceipt>, BridgeError> {
        let receipt = self.0.get_transaction_receipt(hash).await?;
        Ok(receipt.map(|r| TxReceipt {
            tx_hash: hash,
            success: r.status(),
            block_number: r.block_number().unwrap_or_default(),
            gas_used: r.gas_used(),
        }))
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, BridgeError> {
        let request = TransactionRequest::default().with_to(to).with_input(data);
        Ok(self.0.call(request).await?)
    }
}

/// Lifecycle state of a submitted transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxState {
    Built,
    Signed,
    Broadcast,
    Pending,
    Confirmed,
    Reverted,
    TimedOut,
}

impl Display for TxState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxState::Built => write!(f, "built"),
            TxState::Signed => write!(f, "signed"),
            TxState::Broadcast => write!(f, "broadcast"),
            TxState::Pending => write!(f, "pending"),
            TxState::Confirmed => write!(f, "confirmed"),
            TxState::Reverted => write!(f, "reverted"),
            TxState::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Mined transaction outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub success: bool,
    pub block_number: u64,
    pub gas_used: u64,
}

impl TxReceipt {
    pub fn state(&self) -> TxState { if self.success { TxState::Confirmed } else { TxState::Reverted } }
}

/// Call to perform: destination, call data and native value (zero by default).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionIntent {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl TransactionIntent {
    pub fn new(to: Address, data: Bytes) -> Self { Self { to, data, value: U256::ZERO } }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

/// Unsigned transaction with nonce, gas and chain ID filled in.
#[derive(Clone, Debug)]
pub struct BuiltTransaction {
    from: Address,
    tx: TxLegacy,
}

impl BuiltTransaction {
    pub fn from(&self) -> Address { self.from }

    pub fn nonce(&self) -> u64 { self.tx.nonce }

    pub fn gas_price(&self) -> u128 { self.tx.gas_price }

    pub fn gas_limit(&self) -> u64 { self.tx.gas_limit }

    pub fn chain_id(&self) -> Option<u64> { self.tx.chain_id }
}

/// Signed transaction ready for broadcast.
#[derive(Clone, Debug)]
pub struct SignedTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub chain_id: u64,
    pub hash: TxHash,
    /// EIP-2718 encoding to broadcast.
    pub raw: Bytes,
}

/// Receipt polling: fixed interval, unbounded attempts, stopped only by the
/// optional timeout or the caller's cancellation token.
///
/// The timeout is relative: each [`TransactionSubmitter::confirm`] call gets
/// its own deadline, counted from the moment it starts polling.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self { Self { interval: DEFAULT_POLL_INTERVAL, timeout: None } }
}

impl RetryPolicy {
    pub fn fixed(interval: Duration) -> Self { Self { interval, timeout: None } }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Deadline for a confirmation starting now.
    fn deadline(&self) -> Option<Instant> { self.timeout.map(|timeout| Instant::now() + timeout) }
}

fn should_stop(cancel: &CancellationToken, deadline: Option<Instant>) -> bool {
    cancel.is_cancelled() || deadline.is_some_and(|deadline| Instant::now() >= deadline)
}

/// Builds, signs, broadcasts and confirms transactions for one sender.
#[derive(derive_more::Debug)]
pub struct TransactionSubmitter<C> {
    #[debug(skip)]
    rpc: C,
    #[debug(skip)]
    signer: PrivateKeySigner,
    address: Address,
    chain_id: u64,
    gas_limit: u64,
    policy: RetryPolicy,
}

impl<C: ChainRpc> TransactionSubmitter<C> {
    pub fn new(rpc: C, signer: PrivateKeySigner, chain_id: u64) -> Self {
        Self {
            rpc,
            address: signer.address(),
            signer,
            chain_id,
            gas_limit: DEFAULT_GAS_LIMIT,
            policy: RetryPolicy::default(),
        }
    }

    /// Same as [`TransactionSubmitter::new`] with the chain ID taken from the RPC.
    pub async fn connect(rpc: C, signer: PrivateKeySigner) -> Result<Self, BridgeError> {
        let chain_id = rpc.chain_id().await?;
        Ok(Self::new(rpc, signer, chain_id))
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sender address.
    pub fn address(&self) -> Address { self.address }

    pub fn chain_id(&self) -> u64 { self.chain_id }

    pub fn rpc(&self) -> &C { &self.rpc }

    pub fn retry_policy(&self) -> &RetryPolicy { &self.policy }

    pub async fn build(&self, intent: TransactionIntent) -> Result<BuiltTransaction, BridgeError> {
        let nonce = self.rpc.pending_nonce(self.address).await?;
        let gas_price = self.rpc.gas_price().await?;
        debug!(from = %self.address, nonce, gas_price, to = %intent.to, state = %TxState::Built, "transaction built");

        Ok(BuiltTransaction {
            from: self.address,
            tx: TxLegacy {
                chain_id: Some(self.chain_id),
                nonce,
                gas_price,
                gas_limit: self.gas_limit,
                to: TxKind::Call(intent.to),
                value: intent.value,
                input: intent.data,
            },
        })
    }

    pub fn sign(&self, built: BuiltTransaction) -> Result<SignedTransaction, BridgeError> {
        let mut tx = built.tx;
        let signature = self.signer.sign_transaction_sync(&mut tx)?;
        let (nonce, gas_price, gas_limit) = (tx.nonce, tx.gas_price, tx.gas_limit);
        let signed = tx.into_signed(signature);
        let hash = *signed.hash();
        let raw = TxEnvelope::Legacy(signed).encoded_2718();
        debug!(%hash, state = %TxState::Signed, "transaction signed");

        Ok(SignedTransaction {
            nonce,
            gas_price,
            gas_limit,
            chain_id: self.chain_id,
            hash,
            raw: raw.into(),
        })
    }

    /// Sends the signed transaction. Failures are reported as is, no retry.
    pub async fn broadcast(&self, signed: &SignedTransaction) -> Result<TxHash, BridgeError> {
        let hash = self.rpc.broadcast(signed.raw.clone()).await?;
        if hash != signed.hash {
            warn!(expected = %signed.hash, returned = %hash, "RPC returned unexpected transaction hash");
        }
        info!(%hash, nonce = signed.nonce, state = %TxState::Broadcast, "transaction sent");
        Ok(signed.hash)
    }

    /// Polls for the receipt of `hash` until it is found, `cancel` fires or
    /// the policy timeout, counted from this call, runs out.
    ///
    /// Only "receipt not found" is retried. Cancellation and the deadline are
    /// checked before and after each wait, never during it. A reverted
    /// receipt is returned as [`BridgeError::TransactionFailed`].
    pub async fn confirm<S, SFut>(
        &self,
        hash: TxHash,
        cancel: &CancellationToken,
        sleep: S,
    ) -> Result<TxReceipt, BridgeError>
    where
        S: Fn(Duration) -> SFut,
        SFut: Future<Output = ()>,
    {
        let deadline = self.policy.deadline();
        let mut attempt = 0u64;
        loop {
            attempt += 1;
            if let Some(receipt) = self.rpc.receipt(hash).await? {
                return if receipt.success {
                    info!(
                        %hash,
                        block = receipt.block_number,
                        gas_used = receipt.gas_used,
                        state = %TxState::Confirmed,
                        "transaction confirmed"
                    );
                    Ok(receipt)
                } else {
                    warn!(%hash, block = receipt.block_number, state = %TxState::Reverted, "transaction reverted");
                    Err(BridgeError::TransactionFailed(receipt))
                };
            }

            debug!(%hash, attempt, state = %TxState::Pending, "receipt not found yet");
            if should_stop(cancel, deadline) {
                break;
            }
            sleep(self.policy.interval).await;
            if should_stop(cancel, deadline) {
                break;
            }
        }

        warn!(%hash, attempt, state = %TxState::TimedOut, "gave up waiting for receipt");
        Err(BridgeError::Timeout(hash))
    }

    /// Build, sign, broadcast and confirm `intent`.
    pub async fn submit(
        &self,
        intent: TransactionIntent,
        cancel: &CancellationToken,
    ) -> Result<TxReceipt, BridgeError> {
        let built = self.build(intent).await?;
        let signed = self.sign(built)?;
        let hash = self.broadcast(&signed).await?;
        self.confirm(hash, cancel, tokio::time::sleep).await
    }
}

#[cfg(test)]
mod tests {
    use alloy::{
        consensus::{Transaction, TxEnvelope},
        eips::eip2718::Decodable2718,
        primitives::address,
    };

    use super::*;
    use crate::testing::MockChain;

    const TOKEN: Address = address!("0x2F913C820ed3bEb3a67391a6eFF64E70c4B20b19");

    fn submitter(chain: MockChain) -> TransactionSubmitter<MockChain> {
        TransactionSubmitter::new(chain, PrivateKeySigner::random(), 4200)
    }

    #[tokio::test]
    async fn test_build_fetches_fresh_nonce() {
        let chain = MockChain::new().with_nonce(7).with_gas_price(50_000_000);
        let submitter = submitter(chain);
        let intent = TransactionIntent::new(TOKEN, Bytes::from_static(&[1, 2, 3]));

        let first = submitter.build(intent.clone()).await.unwrap();
        assert_eq!(first.nonce(), 7);
        assert_eq!(first.gas_price(), 50_000_000);
        assert_eq!(first.gas_limit(), DEFAULT_GAS_LIMIT);
        assert_eq!(first.chain_id(), Some(4200));

        submitter.rpc().set_nonce(8);
        let second = submitter.build(intent).await.unwrap();
        assert_eq!(second.nonce(), 8);
        assert_eq!(submitter.rpc().calls().nonce, 2);
    }

    #[tokio::test]
    async fn test_sign_is_chain_bound() {
        let submitter = submitter(MockChain::new().with_nonce(3));
        let intent = TransactionIntent::new(TOKEN, Bytes::from_static(&[0xaa]))
            .with_value(U256::from(5u8));
        let signed = submitter.sign(submitter.build(intent).await.unwrap()).unwrap();

        let decoded = TxEnvelope::decode_2718(&mut signed.raw.as_ref()).unwrap();
        assert_eq!(*decoded.tx_hash(), signed.hash);
        assert_eq!(decoded.chain_id(), Some(4200));
        assert_eq!(decoded.nonce(), 3);
        assert_eq!(decoded.to(), Some(TOKEN));
        assert_eq!(decoded.value(), U256::from(5u8));

        let legacy = decoded.as_legacy().unwrap();
        let signer = legacy
            .signature()
            .recover_address_from_prehash(&legacy.signature_hash())
            .unwrap();
        assert_eq!(signer, submitter.address());
    }

    #[tokio::test]
    async fn test_broadcast_failure_is_not_retried() {
        let chain = MockChain::new().failing_broadcast();
        let submitter = submitter(chain);
        let err = submitter
            .submit(TransactionIntent::new(TOKEN, Bytes::new()), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::Transport(_)));
        assert_eq!(submitter.rpc().calls().broadcast, 1);
        assert_eq!(submitter.rpc().calls().receipt, 0);
    }

    #[tokio::test]
    async fn test_receipt_lookup_error_is_fatal() {
        let chain = MockChain::new().with_receipts([None]).failing_receipts_after(1);
        let submitter = submitter(chain);
        let err = submitter
            .confirm(TxHash::ZERO, &CancellationToken::new(), |_| async {})
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::Transport(_)));
        assert_eq!(submitter.rpc().calls().receipt, 2);
    }

    #[tokio::test]
    async fn test_cancelled_confirmation_times_out() {
        let submitter = submitter(MockChain::new());
        let cancel = CancellationToken::new();
        let cancel_in_sleep = cancel.clone();

        let err = submitter
            .confirm(TxHash::ZERO, &cancel, move |_| {
                cancel_in_sleep.cancel();
                async {}
            })
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::Timeout(hash) if hash == TxHash::ZERO));
        assert_eq!(submitter.rpc().calls().receipt, 1);
    }

    #[tokio::test]
    async fn test_timeout_confirmation_times_out() {
        let submitter = submitter(MockChain::new())
            .with_retry_policy(RetryPolicy::fixed(Duration::ZERO).with_timeout(Duration::ZERO));

        let err = submitter
            .confirm(TxHash::ZERO, &CancellationToken::new(), |_| async {})
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::Timeout(_)));
        assert_eq!(submitter.rpc().calls().receipt, 1);
    }

    #[test]
    fn test_receipt_state() {
        let receipt = TxReceipt { tx_hash: TxHash::ZERO, success: true, block_number: 1, gas_used: 21_000 };
        assert_eq!(receipt.state(), TxState::Confirmed);
        assert_eq!(TxReceipt { success: false, ..receipt }.state(), TxState::Reverted);
    }
}
