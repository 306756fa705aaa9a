//! External price feed client (§4.6/§6): a single spot-price GET returning a list of recent
//! trades, the numeric `price` field of the most recent one used as the ETH/USD gauge.

use async_trait::async_trait;
use error_utils::HttpError;
use serde::Deserialize;

#[async_trait]
pub trait PriceFeedClient: Send + Sync {
    async fn eth_usd_spot_price(&self) -> Result<f64, HttpError>;
}

pub struct HttpPriceFeedClient {
    http: reqwest::Client,
    url: String,
}

impl HttpPriceFeedClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self { http, url: url.into() }
    }
}

#[derive(Debug, Deserialize)]
struct Trade {
    #[serde(deserialize_with = "price_as_f64")]
    price: f64,
}

fn price_as_f64<'de, D: serde::Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    String::deserialize(d)?.parse().map_err(serde::de::Error::custom)
}

#[async_trait]
impl PriceFeedClient for HttpPriceFeedClient {
    async fn eth_usd_spot_price(&self) -> Result<f64, HttpError> {
        let trades: Vec<Trade> = http_retry::get_json(&self.http, &self.url, &self.url).await?;
        trades
            .last()
            .map(|trade| trade.price)
            .ok_or_else(|| HttpError::RemoteServerError {
                host: self.url.clone(),
                status: 204,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakePriceFeedClient(f64);

    #[async_trait]
    impl PriceFeedClient for FakePriceFeedClient {
        async fn eth_usd_spot_price(&self) -> Result<f64, HttpError> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn fake_client_returns_configured_price() {
        let client = FakePriceFeedClient(3123.45);
        assert_eq!(client.eth_usd_spot_price().await.unwrap(), 3123.45);
    }
}
