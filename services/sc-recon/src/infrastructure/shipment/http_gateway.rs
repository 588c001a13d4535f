//! 出货登记 HTTP 客户端

use std::time::Duration;

use async_trait::async_trait;
use recon_config::ShipmentConfig;
use recon_errors::{AppError, AppResult};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::services::{ShipmentGateway, ShipmentLine, ShipmentReceipt};
use crate::error::ScanError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CancelRequest<'a> {
    codes: &'a [String],
}

/// 以 JSON 调用外部出货登记系统
pub struct HttpShipmentGateway {
    client: Client,
    confirm_url: String,
    cancel_url: String,
}

impl HttpShipmentGateway {
    pub fn new(config: &ShipmentConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            confirm_url: config.confirm_url(),
            cancel_url: config.cancel_url(),
        })
    }

    async fn post<B: Serialize + Sync>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<ShipmentReceipt, ScanError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| transport_error(url, e))?;
        let payload = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        if status.is_success() && acknowledged(&payload) {
            debug!(url, status = status.as_u16(), "Shipment call succeeded");
            return Ok(ShipmentReceipt { payload });
        }

        warn!(url, status = status.as_u16(), "Shipment call rejected");
        Err(ScanError::External {
            message: rejection_message(status.as_u16(), &payload),
            payload: Some(payload),
            timed_out: false,
        })
    }
}

#[async_trait]
impl ShipmentGateway for HttpShipmentGateway {
    async fn confirm(&self, lines: &[ShipmentLine]) -> Result<ShipmentReceipt, ScanError> {
        self.post(&self.confirm_url, &lines).await
    }

    async fn cancel(&self, codes: &[String]) -> Result<ShipmentReceipt, ScanError> {
        self.post(&self.cancel_url, &CancelRequest { codes }).await
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> ScanError {
    ScanError::External {
        message: format!("request to {} failed: {}", url, e),
        payload: None,
        timed_out: e.is_timeout(),
    }
}

/// 只有 `success` 为 true 或 "true"（不区分大小写）才算成功，缺省视为失败
fn acknowledged(payload: &Value) -> bool {
    match payload.get("success") {
        Some(Value::Bool(ok)) => *ok,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        Some(_) | None => false,
    }
}

fn rejection_message(status: u16, payload: &Value) -> String {
    let upstream = payload
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    format!("shipment service rejected request (HTTP {}): {}", status, upstream)
}
