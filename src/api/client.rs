//! ダッシュボードAPIクライアント
//!
//! エンドポイントごとの呼び出しを組み立て、結果をセッションと
//! 予測リポジトリへ反映する。

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use super::auth::{Credential, SessionStore};
use super::gateway::{FetchGateway, RequestOptions};
use super::transport::MultipartFile;
use super::{DashboardError, DashboardResult};
use crate::predictions::{DashboardSnapshot, PredictionRecord, PredictionRepository};
use crate::validation::{validate_upload, LoginForm, RegistrationForm};

/// multipartのフィールド名
pub const UPLOAD_FIELD_NAME: &str = "file";

pub struct DashboardClient {
    gateway: FetchGateway,
    repository: Arc<PredictionRepository>,
}

impl DashboardClient {
    pub fn new(gateway: FetchGateway, repository: Arc<PredictionRepository>) -> Self {
        Self {
            gateway,
            repository,
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        self.gateway.session()
    }

    pub fn repository(&self) -> &Arc<PredictionRepository> {
        &self.repository
    }

    pub fn gateway(&self) -> &FetchGateway {
        &self.gateway
    }

    /// ログインしてトークンを保存
    pub async fn login(&self, form: &LoginForm) -> DashboardResult<Credential> {
        form.validate()?;
        let response = self
            .gateway
            .request("/login", RequestOptions::post_json(form.to_payload()).allow_anonymous())
            .await?;
        self.store_token(&response)
    }

    /// 新規登録してそのままログイン状態にする
    pub async fn register(&self, form: &RegistrationForm) -> DashboardResult<Credential> {
        form.validate()?;
        let response = self
            .gateway
            .request("/register", RequestOptions::post_json(form.to_payload()).allow_anonymous())
            .await?;
        self.store_token(&response)
    }

    fn store_token(&self, response: &Value) -> DashboardResult<Credential> {
        let token = response
            .get("token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| DashboardError::InvalidResponse("response has no token".to_string()))?;

        self.session()
            .set_credential(token)
            .ok_or_else(|| DashboardError::InvalidResponse("token could not be decoded".to_string()))
    }

    /// ログアウト（トークンと取得済みデータを破棄）
    pub fn logout(&self) {
        self.session().clear_credential();
        self.repository.clear();
        tracing::info!("👋 Logged out");
    }

    /// `/stats` を取得してリポジトリへ取り込む
    pub async fn refresh(&self) -> DashboardResult<Arc<DashboardSnapshot>> {
        let payload = self.gateway.request("/stats", RequestOptions::get()).await?;
        if !payload.is_object() {
            return Err(DashboardError::InvalidResponse(
                "stats response is not an object".to_string(),
            ));
        }
        self.repository.ingest(&payload);
        Ok(self.repository.snapshot())
    }

    /// ファイルを検証してからアップロード
    pub async fn upload_file(&self, path: &Path) -> DashboardResult<Vec<PredictionRecord>> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        let size = tokio::fs::metadata(path).await?.len();
        validate_upload(&file_name, size)?;

        let bytes = tokio::fs::read(path).await?;
        self.upload_bytes(&file_name, bytes).await
    }

    /// メモリ上のファイル内容をアップロード
    pub async fn upload_bytes(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> DashboardResult<Vec<PredictionRecord>> {
        let mime_type = validate_upload(file_name, bytes.len() as u64)?;
        tracing::info!(file_name, size = bytes.len(), "📤 Uploading student data");

        let file = MultipartFile {
            field_name: UPLOAD_FIELD_NAME.to_string(),
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            bytes,
        };
        let response = self
            .gateway
            .request("/upload", RequestOptions::post_multipart(file))
            .await?;

        if !response.is_array() {
            return Err(DashboardError::InvalidResponse(
                "upload response is not an array".to_string(),
            ));
        }
        Ok(self.repository.ingest_upload(&response))
    }

    /// 生徒を削除し、`/stats` を取り直す
    ///
    /// リポジトリをローカルで書き換えることはない。
    pub async fn delete_student(&self, student_id: &str) -> DashboardResult<Arc<DashboardSnapshot>> {
        let path = format!("/students/{}", urlencoding::encode(student_id));
        self.gateway.request(&path, RequestOptions::delete()).await?;
        tracing::info!(student_id, "🗑️ Student deleted, refreshing stats");
        self.refresh().await
    }
}
