use crate::config::RatesConfig;
use crate::error::{AppError, Result};
use crate::models::RateTableResponse;
use crate::rates::RateSource;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// 创建 HTTP 客户端
pub fn create_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("invoice-engine/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AppError::RateTransport(e.to_string()))
}

/// 远程汇率源: GET `{api_url}/{base}`
#[derive(Debug, Clone)]
pub struct HttpRateSource {
    http: Client,
    api_url: String,
}

impl HttpRateSource {
    pub fn new(http: Client, api_url: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &RatesConfig) -> Result<Self> {
        let http = create_client(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::new(http, config.api_url.clone()))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> AppError {
    if e.is_decode() {
        AppError::RateDecode(e.to_string())
    } else {
        AppError::RateTransport(e.to_string())
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    async fn get_exchange_rates(&self, base: &str) -> Result<RateTableResponse> {
        let url = format!("{}/{}", self.api_url, base);
        tracing::debug!("Requesting exchange rates from {}", url);

        let res = self.http.get(&url).send().await.map_err(map_reqwest_error)?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(AppError::RateHttp {
                status: status.as_u16(),
                body,
            });
        }

        res.json::<RateTableResponse>()
            .await
            .map_err(|e| AppError::RateDecode(e.to_string()))
    }
}
