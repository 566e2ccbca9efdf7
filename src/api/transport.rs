//! HTTPトランスポート抽象
//!
//! ゲートウェイは実際の送信をこのトレイト越しに行う。
//! 本番は`reqwest`、テストでは台本通りに応答するモックを差し込む。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTPメソッド
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, derive_more::Display)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    DELETE,
    OPTIONS,
}

/// multipartで送るファイル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartFile {
    pub field_name: String,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// リクエストボディ
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(MultipartFile),
}

/// トランスポートに渡すリクエスト（ヘッダー決定済み）
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// リクエストID（追跡用）
    pub id: String,
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl TransportRequest {
    /// ヘッダー値を大文字小文字を区別せず取得
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// トランスポートからの生レスポンス
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 送信そのものの失敗（HTTPステータスを得られなかった）
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// `reqwest`による本番トランスポート
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::InvalidRequest(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self { client })
    }

    fn classify(error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout(error.to_string())
        } else if error.is_builder() {
            TransportError::InvalidRequest(error.to_string())
        } else {
            TransportError::Connection(error.to_string())
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let method = match request.method {
            HttpMethod::GET => reqwest::Method::GET,
            HttpMethod::POST => reqwest::Method::POST,
            HttpMethod::PUT => reqwest::Method::PUT,
            HttpMethod::DELETE => reqwest::Method::DELETE,
            HttpMethod::OPTIONS => reqwest::Method::OPTIONS,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.body(value.to_string()),
            RequestBody::Multipart(file) => {
                let part = reqwest::multipart::Part::bytes(file.bytes)
                    .file_name(file.file_name)
                    .mime_str(&file.mime_type)
                    .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
                builder.multipart(reqwest::multipart::Form::new().part(file.field_name, part))
            }
        };

        let response = builder.send().await.map_err(Self::classify)?;
        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let body = response.text().await.map_err(Self::classify)?;

        Ok(TransportResponse {
            status: status.as_u16(),
            status_text,
            body,
        })
    }
}
