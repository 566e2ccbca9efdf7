pub mod auth; // トークン保持・永続化
pub mod client; // エンドポイント別クライアント
pub mod gateway; // 認証付きフェッチと結果分類
pub mod transport; // HTTP送信の抽象とreqwest実装

use crate::validation::ValidationError;

pub use auth::{Credential, SessionStore, TokenClaims};
pub use client::DashboardClient;
pub use gateway::{FetchError, FetchGateway, RequestOptions};
pub use transport::{HttpMethod, HttpTransport, ReqwestTransport};

/// クライアント操作のエラー
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// 送信前に弾いた入力エラー
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// 成功レスポンスだが期待した形でない
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DashboardError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, DashboardError::Fetch(FetchError::SessionExpired))
    }
}

pub type DashboardResult<T> = Result<T, DashboardError>;
