use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use serde_json::{Map, Value};

use crate::{
    error::{BridgeError, SwapStep},
    relayer::Relayer,
    types::{
        PriceInfo, PriceRequest, SigningRequest, SwapEncodeRequest, SwapEncoding, SwapStatus,
        SwapSubmitRequest,
    },
};

const SIGNING_HASH: &str = "0x8f1a4c0e6d2b7a9350c1f2e3d4b5a69788796a5b4c3d2e1f0a9b8c7d6e5f4a3b";
const SWAP_ID: &str = "0x1d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8091a2b3c4d5e6f708192a3b4c5d6e7f80";

/// Number of requests each relayer endpoint received.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RelayerCalls {
    pub quote: usize,
    pub encode: usize,
    pub submit: usize,
    pub status: usize,
}

impl RelayerCalls {
    pub fn total(&self) -> usize { self.quote + self.encode + self.submit + self.status }
}

#[derive(Debug, Default)]
struct Recorded {
    quotes: Vec<PriceRequest>,
    encodes: Vec<SwapEncodeRequest>,
    submits: Vec<(String, SwapSubmitRequest)>,
    statuses: Vec<String>,
}

/// Relayer double with canned responses and request recording.
///
/// Status responses are served from a queue; the last one is repeated once
/// the queue is down to a single entry.
#[derive(Debug)]
pub struct MockRelayer {
    price: PriceInfo,
    encoding: SwapEncoding,
    swap_id: String,
    statuses: Mutex<VecDeque<SwapStatus>>,
    failures: HashMap<SwapStep, (u16, String)>,
    recorded: Mutex<Recorded>,
}

impl Default for MockRelayer {
    fn default() -> Self { Self::new() }
}

impl MockRelayer {
    pub fn new() -> Self {
        let price = PriceInfo {
            fee: "0.0001".to_string(),
            estimated_time: 120,
            min_amount: "0.0001".to_string(),
            max_amount: "10".to_string(),
        };
        Self {
            encoding: SwapEncoding {
                encoded: "0x01000000002386f26fc1000000000000001c9f1b2d3e000000000000006a3f1c0000430000000043"
                    .to_string(),
                signing_request: SigningRequest {
                    message: "Sign to request a swap on Meson".to_string(),
                    hash: SIGNING_HASH.to_string(),
                },
                price_info: price.clone(),
            },
            price,
            swap_id: SWAP_ID.to_string(),
            statuses: Mutex::new(VecDeque::from([SwapStatus::from(Map::new())])),
            failures: HashMap::new(),
            recorded: Mutex::new(Recorded::default()),
        }
    }

    pub fn with_price(mut self, price: PriceInfo) -> Self {
        self.price = price;
        self
    }

    pub fn with_encoding(mut self, encoding: SwapEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_swap_id(mut self, swap_id: impl Into<String>) -> Self {
        self.swap_id = swap_id.into();
        self
    }

    /// Status records served in order, e.g. `json!({"POSTED": "0x.."})`.
    ///
    /// Panics if a value is not a JSON object.
    pub fn with_statuses(self, statuses: impl IntoIterator<Item = Value>) -> Self {
        let statuses: VecDeque<_> = statuses
            .into_iter()
            .map(|value| serde_json::from_value::<SwapStatus>(value).unwrap())
            .collect();
        assert!(!statuses.is_empty(), "at least one status is required");
        *self.statuses.lock().unwrap() = statuses;
        self
    }

    /// Makes the endpoint used at `step` answer with the given HTTP status.
    pub fn failing_at(mut self, step: SwapStep, status: u16, body: impl Into<String>) -> Self {
        self.failures.insert(step, (status, body.into()));
        self
    }

    pub fn calls(&self) -> RelayerCalls {
        let recorded = self.recorded.lock().unwrap();
        RelayerCalls {
            quote: recorded.quotes.len(),
            encode: recorded.encodes.len(),
            submit: recorded.submits.len(),
            status: recorded.statuses.len(),
        }
    }

    pub fn quote_requests(&self) -> Vec<PriceRequest> { self.recorded.lock().unwrap().quotes.clone() }

    pub fn encode_requests(&self) -> Vec<SwapEncodeRequest> { self.recorded.lock().unwrap().encodes.clone() }

    /// `(encoded, body)` pairs.
    pub fn submit_requests(&self) -> Vec<(String, SwapSubmitRequest)> {
        self.recorded.lock().unwrap().submits.clone()
    }

    pub fn status_requests(&self) -> Vec<String> { self.recorded.lock().unwrap().statuses.clone() }

    fn check(&self, step: SwapStep) -> Result<(), BridgeError> {
        match self.failures.get(&step) {
            Some((status, body)) => Err(BridgeError::Api { status: *status, body: body.clone() }),
            None => Ok(()),
        }
    }
}

impl Relayer for MockRelayer {
    async fn quote(&self, request: &PriceRequest) -> Result<PriceInfo, BridgeError> {
        self.recorded.lock().unwrap().quotes.push(request.clone());
        self.check(SwapStep::Quote)?;
        Ok(self.price.clone())
    }

    async fn encode(&self, request: &SwapEncodeRequest) -> Result<SwapEncoding, BridgeError> {
        self.recorded.lock().unwrap().encodes.push(request.clone());
        self.check(SwapStep::Encode)?;
        Ok(self.encoding.clone())
    }

    async fn submit(&self, encoded: &str, request: &SwapSubmitRequest) -> Result<String, BridgeError> {
        self.recorded.lock().unwrap().submits.push((encoded.to_string(), request.clone()));
        self.check(SwapStep::Submit)?;
        Ok(self.swap_id.clone())
    }

    async fn status(&self, swap_id: &str) -> Result<SwapStatus, BridgeError> {
        self.recorded.lock().unwrap().statuses.push(swap_id.to_string());
        self.check(SwapStep::Status)?;
        let mut statuses = self.statuses.lock().unwrap();
        let status = if statuses.len() > 1 { statuses.pop_front() } else { statuses.front().cloned() };
        status.ok_or_else(|| super::connection_refused("no status scripted"))
    }
}
