//! 認証付きフェッチゲートウェイ
//!
//! すべてのAPI呼び出しはここを通る。結果は必ず以下のいずれかに分類され、
//! トランスポートの生エラーが呼び出し側へ漏れることはない。
//!
//! - 成功（JSON、空ボディは`null`）
//! - `SessionExpired`（401かつ期限切れ理由。トークンは破棄済み）
//! - `Request`（その他の非2xx、または2xxでもJSONとして読めない）
//! - `Connection`（接続できなかった）

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use uuid::Uuid;

use super::auth::SessionStore;
use super::transport::{
    HttpMethod, HttpTransport, MultipartFile, RequestBody, TransportRequest, TransportResponse,
};

/// セッション切れとして扱う401の`detail`
pub const SESSION_EXPIRED_REASONS: &[&str] = &["Token has expired", "Could not validate credentials"];

const JSON_MIME: &str = "application/json";

/// 分類済みのフェッチ失敗
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Session expired")]
    SessionExpired,

    #[error("Request failed ({status}): {message}")]
    Request { status: u16, message: String },

    #[error("Connection failed: {0}")]
    Connection(String),
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Request { status, .. } => Some(*status),
            FetchError::SessionExpired => Some(401),
            FetchError::Connection(_) => None,
        }
    }
}

/// 1回のリクエストの指定
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Option<HttpMethod>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
    /// ログイン前でも呼べるエンドポイント（`/login`・`/register`）
    pub anonymous: bool,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::with_method(HttpMethod::GET)
    }

    pub fn delete() -> Self {
        Self::with_method(HttpMethod::DELETE)
    }

    pub fn options() -> Self {
        Self::with_method(HttpMethod::OPTIONS)
    }

    pub fn post_json(body: Value) -> Self {
        Self {
            body: RequestBody::Json(body),
            ..Self::with_method(HttpMethod::POST)
        }
    }

    pub fn post_multipart(file: MultipartFile) -> Self {
        Self {
            body: RequestBody::Multipart(file),
            ..Self::with_method(HttpMethod::POST)
        }
    }

    pub fn with_method(method: HttpMethod) -> Self {
        Self {
            method: Some(method),
            ..Self::default()
        }
    }

    /// 期限切れのトークンがあっても送信する
    pub fn allow_anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    /// 呼び出し側のヘッダー（既定のJSONヘッダーより優先）
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn effective_method(&self) -> HttpMethod {
        self.method.unwrap_or(HttpMethod::GET)
    }
}

pub struct FetchGateway {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    session: Arc<SessionStore>,
}

impl FetchGateway {
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        session: Arc<SessionStore>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            transport,
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// ヘッダーを確定する
    ///
    /// JSONの既定ヘッダーは呼び出し側が同名ヘッダーを指定していれば付けない。
    /// OPTIONSと未ログイン（期限切れ含む）の場合はAuthorizationを付けない。
    fn build_headers(&self, method: HttpMethod, options: &RequestOptions) -> Vec<(String, String)> {
        let supplied = |name: &str| {
            options
                .headers
                .iter()
                .any(|(key, _)| key.eq_ignore_ascii_case(name))
        };

        let mut headers = Vec::with_capacity(options.headers.len() + 3);
        if !supplied("content-type") && !matches!(options.body, RequestBody::Multipart(_)) {
            headers.push(("Content-Type".to_string(), JSON_MIME.to_string()));
        }
        if !supplied("accept") {
            headers.push(("Accept".to_string(), JSON_MIME.to_string()));
        }
        if method != HttpMethod::OPTIONS && !supplied("authorization") {
            if let Some(credential) = self.session.current_credential() {
                headers.push((
                    "Authorization".to_string(),
                    format!("Bearer {}", credential.token()),
                ));
            }
        }
        headers.extend(options.headers.iter().cloned());
        headers
    }

    /// リクエストを送信し、結果を分類して返す
    ///
    /// 保持しているトークンが期限切れなら破棄し、認証が必要な
    /// リクエストは送信せずに`SessionExpired`を返す。
    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<Value, FetchError> {
        let method = options.effective_method();
        let request_id = Uuid::new_v4().to_string();
        let url = self.url_for(path);

        let needs_credential = method != HttpMethod::OPTIONS
            && !options.anonymous
            && !options
                .headers
                .iter()
                .any(|(key, _)| key.eq_ignore_ascii_case("authorization"));
        if self.session.discard_if_expired() && needs_credential {
            tracing::warn!(request_id = %request_id, url = %url, "⏰ Session expired before sending");
            return Err(FetchError::SessionExpired);
        }
        let headers = self.build_headers(method, &options);
        let authenticated = headers
            .iter()
            .any(|(key, _)| key.eq_ignore_ascii_case("authorization"));

        tracing::debug!(
            request_id = %request_id,
            method = %method,
            url = %url,
            authenticated,
            "🌐 Sending request"
        );

        let started = Instant::now();
        let response = self
            .transport
            .send(TransportRequest {
                id: request_id.clone(),
                method,
                url,
                headers,
                body: options.body,
            })
            .await
            .map_err(|e| {
                tracing::warn!(request_id = %request_id, "🔌 Transport failure: {}", e);
                FetchError::Connection(e.to_string())
            })?;

        tracing::debug!(
            request_id = %request_id,
            status = response.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "📨 Response received"
        );

        self.classify(&request_id, method, response)
    }

    fn classify(
        &self,
        request_id: &str,
        method: HttpMethod,
        response: TransportResponse,
    ) -> Result<Value, FetchError> {
        if method == HttpMethod::OPTIONS && response.status == 204 {
            return Ok(Value::Null);
        }

        if response.is_success() {
            return parse_success_body(&response);
        }

        if response.status == 401 {
            let detail = error_detail(&response.body).unwrap_or_else(|| "Unauthorized".to_string());
            if SESSION_EXPIRED_REASONS.contains(&detail.as_str()) {
                tracing::warn!(request_id = %request_id, reason = %detail, "⏰ Session expired");
                self.session.clear_credential();
                return Err(FetchError::SessionExpired);
            }
            return Err(FetchError::Request {
                status: 401,
                message: detail,
            });
        }

        let message = failure_message(&response);

        tracing::warn!(
            request_id = %request_id,
            status = response.status,
            "❌ Request failed: {}",
            message
        );

        Err(FetchError::Request {
            status: response.status,
            message,
        })
    }
}

fn parse_success_body(response: &TransportResponse) -> Result<Value, FetchError> {
    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&response.body).map_err(|e| FetchError::Request {
        status: response.status,
        message: format!("Invalid JSON response: {}", e),
    })
}

/// 401以外の失敗メッセージ
///
/// JSONボディなら`detail`、JSONでなければステータス文言を使い、
/// どちらも無ければ汎用メッセージにする。
fn failure_message(response: &TransportResponse) -> String {
    let message = match serde_json::from_str::<Value>(&response.body) {
        Ok(value) => detail_of(&value),
        Err(_) => Some(response.status_text.trim().to_string()).filter(|s| !s.is_empty()),
    };
    message.unwrap_or_else(|| format!("HTTP error! status: {}", response.status))
}

/// エラーボディの`detail`を取り出す
fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    detail_of(&value)
}

/// 文字列以外（検証エラーの配列など）はJSONのまま文字列化する
fn detail_of(value: &Value) -> Option<String> {
    match value.get("detail")? {
        Value::String(detail) if !detail.is_empty() => Some(detail.clone()),
        Value::String(_) | Value::Null => None,
        other => Some(other.to_string()),
    }
}
