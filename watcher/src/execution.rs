//! Execution node JSON-RPC client (§4.6/§6): `eth_getBlockByHash`, read only to resolve a
//! fee recipient when a block's execution payload came back empty (pre-Merge test fixtures).

use async_trait::async_trait;
use error_utils::HttpError;
use serde::Deserialize;
use serde_json::json;
use types::block::BlockHash;
use types::ExecutionAddress;

#[async_trait]
pub trait ExecutionClient: Send + Sync {
    async fn fee_recipient_for_block(&self, hash: &BlockHash) -> Result<Option<ExecutionAddress>, HttpError>;
}

pub struct JsonRpcExecutionClient {
    http: reqwest::Client,
    url: String,
}

impl JsonRpcExecutionClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self { http, url: url.into() }
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<RpcBlock>,
}

#[derive(Debug, Deserialize)]
struct RpcBlock {
    #[serde(rename = "miner")]
    fee_recipient: String,
}

#[async_trait]
impl ExecutionClient for JsonRpcExecutionClient {
    async fn fee_recipient_for_block(&self, hash: &BlockHash) -> Result<Option<ExecutionAddress>, HttpError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_getBlockByHash",
            "params": [hash.to_string(), false],
        });
        let response: RpcResponse = http_retry::post_json(&self.http, &self.url, &self.url, &body).await?;
        Ok(response
            .result
            .and_then(|block| ExecutionAddress::parse(&block.fee_recipient).ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeExecutionClient(Option<ExecutionAddress>);

    #[async_trait]
    impl ExecutionClient for FakeExecutionClient {
        async fn fee_recipient_for_block(&self, _hash: &BlockHash) -> Result<Option<ExecutionAddress>, HttpError> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn fake_client_returns_configured_address() {
        let expected = ExecutionAddress::parse("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap();
        let client = FakeExecutionClient(Some(expected));
        let got = client
            .fee_recipient_for_block(&BlockHash([0u8; 32]))
            .await
            .unwrap();
        assert_eq!(got, Some(expected));
    }
}
