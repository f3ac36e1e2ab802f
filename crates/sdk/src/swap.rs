//! Swap flow: approve, encode, sign, submit and one status fetch.
//!
//! [`SwapOrchestrator::prepare`] validates the request, sends the token
//! approval if the [`ApprovalPolicy`] requires one and asks the relayer to
//! encode the swap. The caller signs [`PreparedSwap::signing_hash`] and hands
//! the signature to [`SwapOrchestrator::submit`]. The orchestrator holds key
//! material only for the approval transaction (through its
//! [`TransactionSubmitter`]), never for the swap signature.
//!
//! Nothing is rolled back: an approval that confirmed stays in effect when a
//! later step fails, and repeating it on retry is harmless.

use alloy::primitives::{Address, U256};
use chrono::{DateTime, TimeDelta, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    erc20::ApproveEncoder,
    error::{BridgeError, SwapStep},
    registry::AddressRegistry,
    relayer::Relayer,
    signature::SwapSignature,
    tx::{ChainRpc, DEFAULT_GAS_LIMIT, TransactionIntent, TransactionSubmitter, TxReceipt},
    types::{
        AssetRef, PriceInfo, PriceRequest, SigningRequest, SwapEncodeRequest, SwapEncoding,
        SwapRequest, SwapStatus, SwapSubmitRequest,
    },
};

/// Swap expiry relative to the time the swap is encoded.
pub const DEFAULT_EXPIRY: TimeDelta = TimeDelta::minutes(110);

/// When to send the ERC20 approval for the pool before encoding a swap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ApprovalPolicy {
    /// Unlimited approval on every swap, without looking at the allowance.
    #[default]
    Always,
    /// Never approve; the caller manages allowances.
    Skip,
    /// Approve only if the current allowance is below the threshold.
    WhenBelow(U256),
}

#[derive(Clone, Debug)]
pub struct SwapConfig {
    pub approval: ApprovalPolicy,
    pub expiry: TimeDelta,
    pub gas_limit: u64,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self { approval: ApprovalPolicy::Always, expiry: DEFAULT_EXPIRY, gas_limit: DEFAULT_GAS_LIMIT }
    }
}

/// Encoded swap awaiting the sender's signature.
#[derive(Clone, Debug)]
pub struct PreparedSwap {
    pub encoding: SwapEncoding,
    pub from_address: String,
    pub recipient: String,
    pub token: Address,
    pub pool: Address,
    pub expire_ts: i64,
    /// Approval receipt, if one was sent.
    pub approval: Option<TxReceipt>,
}

impl PreparedSwap {
    pub fn signing_request(&self) -> &SigningRequest { &self.encoding.signing_request }

    pub fn signing_hash(&self) -> &str { &self.encoding.signing_request.hash }

    pub fn encoded(&self) -> &str { &self.encoding.encoded }

    pub fn price_info(&self) -> &PriceInfo { &self.encoding.price_info }
}

#[derive(Clone, Debug)]
pub struct SubmittedSwap {
    pub swap_id: String,
    /// Status fetched right after submission.
    pub status: SwapStatus,
}

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Sequences one swap attempt at a time over a [`Relayer`] and a chain.
///
/// Steps of one swap run strictly one after another. Independent swaps may
/// share an orchestrator as long as they come from different senders, since
/// approval nonces are not coordinated.
#[derive(derive_more::Debug)]
pub struct SwapOrchestrator<R, C> {
    #[debug(skip)]
    relayer: R,
    registry: AddressRegistry,
    submitter: TransactionSubmitter<C>,
    config: SwapConfig,
    #[debug(skip)]
    clock: Clock,
}

impl<R: Relayer, C: ChainRpc> SwapOrchestrator<R, C> {
    pub fn new(relayer: R, registry: AddressRegistry, submitter: TransactionSubmitter<C>) -> Self {
        Self { relayer, registry, submitter, config: SwapConfig::default(), clock: Box::new(Utc::now) }
    }

    pub fn with_config(mut self, config: SwapConfig) -> Self {
        self.submitter = self.submitter.with_gas_limit(config.gas_limit);
        self.config = config;
        self
    }

    /// Replaces the wall clock used for expiry computation.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn relayer(&self) -> &R { &self.relayer }

    pub fn registry(&self) -> &AddressRegistry { &self.registry }

    pub fn registry_mut(&mut self) -> &mut AddressRegistry { &mut self.registry }

    pub fn submitter(&self) -> &TransactionSubmitter<C> { &self.submitter }

    pub fn config(&self) -> &SwapConfig { &self.config }

    /// Prices moving `amount` from `source` to `destination`.
    pub async fn quote(
        &self,
        source: &AssetRef,
        destination: &AssetRef,
        amount: &str,
        from_address: Option<&str>,
    ) -> Result<PriceInfo, BridgeError> {
        let request = PriceRequest::new(source, destination, amount, from_address)?;
        self.relayer.quote(&request).await.map_err(|err| err.at(SwapStep::Quote))
    }

    /// Validates `request`, approves the pool if needed and encodes the swap.
    ///
    /// `cancel` stops waiting for the approval receipt.
    pub async fn prepare(
        &self,
        request: &SwapRequest,
        cancel: &CancellationToken,
    ) -> Result<PreparedSwap, BridgeError> {
        let now = (self.clock)();
        let validated = request.validate(now)?;

        let source = &request.source;
        let token = self.registry.resolve_token(&source.chain, &source.token, request.token_address.as_deref())?;
        let pool = self.registry.resolve_pool(&source.chain, request.pool_address.as_deref())?;

        if self.config.approval != ApprovalPolicy::Skip && validated.from != self.submitter.address() {
            return Err(BridgeError::Validation(format!(
                "sender {} does not match approval signer {}",
                validated.from,
                self.submitter.address()
            )));
        }

        let approval = self
            .approve_if_needed(validated.from, token, pool, cancel)
            .await
            .map_err(|err| err.at(SwapStep::Approve))?;

        let expires_at = request.expires_at.unwrap_or(now + self.config.expiry);
        let encode = SwapEncodeRequest {
            from: source.to_string(),
            to: request.destination.to_string(),
            amount: request.amount.trim().to_string(),
            from_address: request.from_address.trim().to_string(),
            recipient: request.to_address.trim().to_string(),
            expire_ts: expires_at.timestamp(),
        };
        let encoding = self.relayer.encode(&encode).await.map_err(|err| err.at(SwapStep::Encode))?;
        debug!(hash = %encoding.signing_request.hash, expire_ts = encode.expire_ts, "swap encoded");

        Ok(PreparedSwap {
            encoding,
            from_address: encode.from_address,
            recipient: encode.recipient,
            token,
            pool,
            expire_ts: encode.expire_ts,
            approval,
        })
    }

    /// Registers the signed swap and fetches its status once.
    pub async fn submit(
        &self,
        prepared: &PreparedSwap,
        signature: &SwapSignature,
    ) -> Result<SubmittedSwap, BridgeError> {
        let request = SwapSubmitRequest {
            from_address: prepared.from_address.clone(),
            recipient: prepared.recipient.clone(),
            signature: signature.to_hex(),
        };
        let swap_id = self
            .relayer
            .submit(prepared.encoded(), &request)
            .await
            .map_err(|err| err.at(SwapStep::Submit))?;
        info!(%swap_id, "swap submitted");

        let status = self.status(&swap_id).await?;
        Ok(SubmittedSwap { swap_id, status })
    }

    /// [`SwapOrchestrator::prepare`], then `sign`, then [`SwapOrchestrator::submit`].
    pub async fn execute<F>(
        &self,
        request: &SwapRequest,
        cancel: &CancellationToken,
        sign: F,
    ) -> Result<SubmittedSwap, BridgeError>
    where
        F: FnOnce(&SigningRequest) -> Result<SwapSignature, BridgeError>,
    {
        let prepared = self.prepare(request, cancel).await?;
        let signature = sign(prepared.signing_request())?;
        self.submit(&prepared, &signature).await
    }

    pub async fn status(&self, swap_id: &str) -> Result<SwapStatus, BridgeError> {
        let status = self.relayer.status(swap_id).await.map_err(|err| err.at(SwapStep::Status))?;
        debug!(%swap_id, state = %status.state(), "swap status");
        Ok(status)
    }

    async fn approve_if_needed(
        &self,
        owner: Address,
        token: Address,
        pool: Address,
        cancel: &CancellationToken,
    ) -> Result<Option<TxReceipt>, BridgeError> {
        match self.config.approval {
            ApprovalPolicy::Skip => {
                debug!("approval skipped");
                return Ok(None);
            },
            ApprovalPolicy::WhenBelow(threshold) => {
                let data = self.submitter.rpc().call(token, ApproveEncoder::allowance(owner, pool)).await?;
                let allowance = ApproveEncoder::decode_allowance(&data)?;
                if allowance >= threshold {
                    debug!(%allowance, %threshold, "allowance sufficient, approval skipped");
                    return Ok(None);
                }
            },
            ApprovalPolicy::Always => {},
        }

        info!(%token, spender = %pool, "approving pool");
        let intent = TransactionIntent::new(token, ApproveEncoder::approve_unlimited(pool));
        self.submitter.submit(intent, cancel).await.map(Some)
    }
}
