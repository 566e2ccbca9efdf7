//! 統合テスト共通ヘルパー
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use parking_lot::Mutex;
use serde_json::Value;

use onlooks::api::transport::{
    HttpTransport, TransportError, TransportRequest, TransportResponse,
};
use onlooks::{
    DashboardClient, FetchGateway, MemoryTokenStorage, PredictionRepository, SessionStore,
};

pub const BASE_URL: &str = "http://api.test";

/// テスト用のJWT（署名はダミー）
pub fn make_token(payload: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.test-signature", header, body)
}

/// 有効期限が十分先のトークン
pub fn valid_token() -> String {
    make_token(serde_json::json!({
        "sub": "teacher@school.edu",
        "role": "teacher",
        "school_name": "Hillside High",
        "exp": chrono::Utc::now().timestamp() + 3600
    }))
}

/// 台本通りに応答するトランスポート
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_json(&self, status: u16, status_text: &str, body: Value) {
        self.push_raw(status, status_text, &body.to_string());
    }

    pub fn push_raw(&self, status: u16, status_text: &str, body: &str) {
        self.responses
            .lock()
            .push_back(Ok(TransportResponse::new(status, status_text, body)));
    }

    pub fn push_error(&self, error: TransportError) {
        self.responses.lock().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> TransportRequest {
        self.requests
            .lock()
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().push(request);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Connection("no scripted response".to_string())))
    }
}

/// テスト用に組み立てたクライアント一式
pub struct Harness {
    pub transport: Arc<MockTransport>,
    pub storage: Arc<MemoryTokenStorage>,
    pub session: Arc<SessionStore>,
    pub repository: Arc<PredictionRepository>,
    pub client: DashboardClient,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_storage(MemoryTokenStorage::new())
    }

    pub fn logged_in() -> Self {
        Self::with_storage(MemoryTokenStorage::with_token(valid_token()))
    }

    pub fn with_storage(storage: MemoryTokenStorage) -> Self {
        let transport = Arc::new(MockTransport::new());
        let storage = Arc::new(storage);
        let session = Arc::new(SessionStore::new(storage.clone()));
        let repository = Arc::new(PredictionRepository::new());
        let gateway = FetchGateway::new(BASE_URL, transport.clone(), session.clone());
        let client = DashboardClient::new(gateway, repository.clone());

        Self {
            transport,
            storage,
            session,
            repository,
            client,
        }
    }

    pub fn gateway(&self) -> &FetchGateway {
        self.client.gateway()
    }
}

/// `/stats` レスポンスの見本
pub fn stats_payload(students: &[(&str, &str, &str)]) -> Value {
    let student_predictions: Vec<Value> = students
        .iter()
        .map(|(id, name, prediction)| {
            serde_json::json!({
                "student_id": id,
                "student_name": name,
                "prediction": prediction,
                "insights": format!("{} analysis. Key Risk Factors:\n• Attendance\nRecommendations:\nCheck in weekly.", name)
            })
        })
        .collect();

    serde_json::json!({
        "total_students": students.len(),
        "dropout_rate": 40.0,
        "continue_rate": 60.0,
        "predictions_made": students.len(),
        "monthly_trends": [
            { "month": 1, "dropout_count": 2, "continue_count": 5 },
            { "month": 2, "dropout_count": 1, "continue_count": 7 }
        ],
        "recent_predictions": student_predictions.iter().take(2).cloned().collect::<Vec<_>>(),
        "student_predictions": student_predictions
    })
}
