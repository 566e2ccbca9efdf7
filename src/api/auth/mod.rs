//! 認証セッションモジュール
//!
//! バックエンドが発行したBearerトークンの保持と永続化を管理します。
//!
//! ## 機能
//!
//! - JWTペイロードのデコード（署名検証なし、表示専用）
//! - トークンの保存・読み込み（TOMLファイル / メモリ）
//! - 有効期限切れのトークンを送信しないセッションストア

mod claims;
mod session;
mod token_store;

pub use claims::{Credential, TokenClaims};
pub use session::SessionStore;
pub use token_store::{MemoryTokenStorage, TokenStorage, TokenStore};

/// 認証関連のエラー型
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// トークン形式不正
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// トークン読み込みエラー
    #[error("Failed to load credentials: {0}")]
    LoadError(String),

    /// I/Oエラー
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML解析エラー
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOMLシリアライズエラー
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;
