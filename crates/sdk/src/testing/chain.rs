use std::{collections::VecDeque, sync::Mutex};

use alloy::primitives::{Address, Bytes, TxHash, U256, keccak256};

use crate::{
    error::BridgeError,
    tx::{ChainRpc, TxReceipt},
};

/// Number of calls each chain-RPC primitive received.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChainCalls {
    pub chain_id: usize,
    pub nonce: usize,
    pub gas_price: usize,
    pub broadcast: usize,
    pub receipt: usize,
    pub call: usize,
}

impl ChainCalls {
    pub fn total(&self) -> usize {
        self.chain_id + self.nonce + self.gas_price + self.broadcast + self.receipt + self.call
    }
}

#[derive(Debug)]
struct ChainState {
    chain_id: u64,
    nonce: u64,
    gas_price: u128,
    allowance: U256,
    /// `None` is "not found", `Some(success)` a mined receipt.
    receipts: VecDeque<Option<bool>>,
    /// Outcome once `receipts` is drained.
    fallback: Option<bool>,
    fail_broadcast: bool,
    fail_receipts_after: Option<usize>,
    broadcasts: Vec<Bytes>,
    eth_calls: Vec<(Address, Bytes)>,
    calls: ChainCalls,
}

/// Scripted chain RPC.
///
/// Broadcast transactions get their real hash (`keccak256` of the raw
/// bytes) and bump the pending nonce. Receipts come from the scripted queue,
/// then from the fallback, which is "not found" unless
/// [`MockChain::confirming`] was used.
#[derive(Debug)]
pub struct MockChain {
    state: Mutex<ChainState>,
}

impl Default for MockChain {
    fn default() -> Self { Self::new() }
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChainState {
                chain_id: 4200,
                nonce: 0,
                gas_price: 1_000_000_000,
                allowance: U256::ZERO,
                receipts: VecDeque::new(),
                fallback: None,
                fail_broadcast: false,
                fail_receipts_after: None,
                broadcasts: Vec::new(),
                eth_calls: Vec::new(),
                calls: ChainCalls::default(),
            }),
        }
    }

    pub fn with_chain_id(self, chain_id: u64) -> Self {
        self.state.lock().unwrap().chain_id = chain_id;
        self
    }

    pub fn with_nonce(self, nonce: u64) -> Self {
        self.set_nonce(nonce);
        self
    }

    pub fn with_gas_price(self, gas_price: u128) -> Self {
        self.state.lock().unwrap().gas_price = gas_price;
        self
    }

    /// Allowance returned by `allowance(owner, spender)` calls.
    pub fn with_allowance(self, allowance: U256) -> Self {
        self.state.lock().unwrap().allowance = allowance;
        self
    }

    /// Receipt lookups answered in order: `None` is "not found",
    /// `Some(success)` a mined receipt.
    pub fn with_receipts(self, receipts: impl IntoIterator<Item = Option<bool>>) -> Self {
        self.state.lock().unwrap().receipts.extend(receipts);
        self
    }

    /// Every unscripted receipt lookup finds a successful receipt.
    pub fn confirming(self) -> Self {
        self.state.lock().unwrap().fallback = Some(true);
        self
    }

    pub fn failing_broadcast(self) -> Self {
        self.state.lock().unwrap().fail_broadcast = true;
        self
    }

    /// Receipt lookups after the first `n` fail with a transport error.
    pub fn failing_receipts_after(self, n: usize) -> Self {
        self.state.lock().unwrap().fail_receipts_after = Some(n);
        self
    }

    pub fn set_nonce(&self, nonce: u64) { self.state.lock().unwrap().nonce = nonce; }

    pub fn calls(&self) -> ChainCalls { self.state.lock().unwrap().calls }

    /// Raw transactions broadcast so far.
    pub fn broadcasts(&self) -> Vec<Bytes> { self.state.lock().unwrap().broadcasts.clone() }

    /// `(to, data)` of every `eth_call`.
    pub fn eth_calls(&self) -> Vec<(Address, Bytes)> { self.state.lock().unwrap().eth_calls.clone() }
}

impl ChainRpc for MockChain {
    async fn chain_id(&self) -> Result<u64, BridgeError> {
        let mut state = self.state.lock().unwrap();
        state.calls.chain_id += 1;
        Ok(state.chain_id)
    }

    async fn pending_nonce(&self, _address: Address) -> Result<u64, BridgeError> {
        let mut state = self.state.lock().unwrap();
        state.calls.nonce += 1;
        Ok(state.nonce)
    }

    async fn gas_price(&self) -> Result<u128, BridgeError> {
        let mut state = self.state.lock().unwrap();
        state.calls.gas_price += 1;
        Ok(state.gas_price)
    }

    async fn broadcast(&self, raw: Bytes) -> Result<TxHash, BridgeError> {
        let mut state = self.state.lock().unwrap();
        state.calls.broadcast += 1;
        if state.fail_broadcast {
            return Err(super::connection_refused("broadcast rejected"));
        }
        let hash = keccak256(&raw);
        state.broadcasts.push(raw);
        state.nonce += 1;
        Ok(hash)
    }

    async fn receipt(&self, hash: TxHash) -> Result<Option<TxReceipt>, BridgeError> {
        let mut state = self.state.lock().unwrap();
        state.calls.receipt += 1;
        if state.fail_receipts_after.is_some_and(|n| state.calls.receipt > n) {
            return Err(super::connection_refused("receipt lookup failed"));
        }
        let outcome = match state.receipts.pop_front() {
            Some(outcome) => outcome,
            None => state.fallback,
        };
        let block_number = 1_000 + state.calls.receipt as u64;
        Ok(outcome.map(|success| TxReceipt { tx_hash: hash, success, block_number, gas_used: 46_109 }))
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, BridgeError> {
        let mut state = self.state.lock().unwrap();
        state.calls.call += 1;
        state.eth_calls.push((to, data));
        Ok(Bytes::from(state.allowance.to_be_bytes::<32>().to_vec()))
    }
}
