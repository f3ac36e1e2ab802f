//! HTTP client for the swap relayer.
//!
//! Endpoints (relative to [`RelayerConfig::base_url`]):
//! - `POST /price`
//! - `POST /swap`
//! - `POST /swap/{encoded}`
//! - `GET /swap/{swapId}`

use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
    error::BridgeError,
    types::{
        Envelope, PriceInfo, PriceRequest, SwapEncodeRequest, SwapEncoding, SwapStatus,
        SwapSubmitRequest, SwapSubmitted,
    },
};

pub const DEFAULT_RELAYER_URL: &str = "https://relayer.meson.fi/api/v1";

/// Relayer request/response contract.
///
/// [`RelayerClient`] talks to the real service; [`crate::testing::MockRelayer`]
/// records calls for tests.
pub trait Relayer: Send + Sync {
    /// Prices a route. No side effects.
    fn quote(
        &self,
        request: &PriceRequest,
    ) -> impl Future<Output = Result<PriceInfo, BridgeError>> + Send;

    /// Asks the relayer to encode an unsigned swap and the hash to sign.
    fn encode(
        &self,
        request: &SwapEncodeRequest,
    ) -> impl Future<Output = Result<SwapEncoding, BridgeError>> + Send;

    /// Registers a signed swap and returns its ID. Not idempotent.
    fn submit(
        &self,
        encoded: &str,
        request: &SwapSubmitRequest,
    ) -> impl Future<Output = Result<String, BridgeError>> + Send;

    /// Fetches the current status record. Safe to repeat.
    fn status(&self, swap_id: &str) -> impl Future<Output = Result<SwapStatus, BridgeError>> + Send;
}

#[derive(Clone, Debug)]
pub struct RelayerConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_RELAYER_URL.to_string(), timeout: Duration::from_secs(30) }
    }
}

#[derive(Clone, Debug)]
pub struct RelayerClient {
    base_url: String,
    client: reqwest::Client,
}

impl RelayerClient {
    pub fn new(config: RelayerConfig) -> Result<Self, BridgeError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { base_url: config.base_url.trim_end_matches('/').to_string(), client })
    }

    pub fn base_url(&self) -> &str { &self.base_url }

    /// URL of the status record for `swap_id`.
    pub fn status_url(&self, swap_id: &str) -> String { format!("{}/swap/{}", self.base_url, swap_id) }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, BridgeError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "relayer POST");
        self.send(self.client.post(url).json(body)).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BridgeError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "relayer GET");
        self.send(self.client.get(url)).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, BridgeError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        decode_response(status, &body)
    }
}

/// Unwraps a relayer response: any status but 200 is an API error, the body
/// must be a `{"result": ...}` envelope.
pub(crate) fn decode_response<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, BridgeError> {
    if status != 200 {
        return Err(BridgeError::Api { status, body: body.to_string() });
    }
    let envelope: Envelope<T> = serde_json::from_str(body)?;
    Ok(envelope.result)
}

impl Relayer for RelayerClient {
    async fn quote(&self, request: &PriceRequest) -> Result<PriceInfo, BridgeError> {
        self.post("/price", request).await
    }

    async fn encode(&self, request: &SwapEncodeRequest) -> Result<SwapEncoding, BridgeError> {
        self.post("/swap", request).await
    }

    async fn submit(&self, encoded: &str, request: &SwapSubmitRequest) -> Result<String, BridgeError> {
        let submitted: SwapSubmitted = self.post(&format!("/swap/{}", encoded), request).await?;
        Ok(submitted.swap_id)
    }

    async fn status(&self, swap_id: &str) -> Result<SwapStatus, BridgeError> {
        self.get(&format!("/swap/{}", swap_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_response() {
        let price: PriceInfo = decode_response(
            200,
            r#"{"result":{"fee":"0.0001","estimatedTime":120,"minAmount":"0.0001","maxAmount":"10"}}"#,
        )
        .unwrap();
        assert_eq!(price.fee, "0.0001");
        assert_eq!(price.estimated_time, 120);
        assert_eq!(price.min_amount, "0.0001");
        assert_eq!(price.max_amount, "10");

        let submitted: SwapSubmitted = decode_response(200, r#"{"result":{"swapId":"0xabc"}}"#).unwrap();
        assert_eq!(submitted.swap_id, "0xabc");
    }

    #[test]
    fn test_decode_response_errors() {
        let err = decode_response::<PriceInfo>(400, r#"{"error":"amount too small"}"#).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Api { status: 400, ref body } if body == r#"{"error":"amount too small"}"#
        ));

        // Success status is exactly 200
        assert!(matches!(decode_response::<SwapSubmitted>(201, "{}"), Err(BridgeError::Api { .. })));

        assert!(matches!(decode_response::<SwapSubmitted>(200, "<html>"), Err(BridgeError::Decode(_))));
        assert!(matches!(
            decode_response::<SwapSubmitted>(200, r#"{"swapId":"0xabc"}"#),
            Err(BridgeError::Decode(_))
        ));
    }

    #[test]
    fn test_client_urls() {
        let client = RelayerClient::new(RelayerConfig {
            base_url: "http://localhost:8080/api/v1/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/api/v1");
        assert_eq!(client.status_url("0x01"), "http://localhost:8080/api/v1/swap/0x01");
    }

    #[tokio::test]
    async fn test_unreachable_relayer_is_transport_error() {
        let client = RelayerClient::new(RelayerConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(2),
        })
        .unwrap();
        let err = client.status("0x01").await.unwrap_err();
        assert!(matches!(err, BridgeError::Transport(_)));
    }
}
