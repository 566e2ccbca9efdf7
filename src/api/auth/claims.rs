//! トークンのクレーム

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AuthError, AuthResult};

/// JWTペイロードから取り出した表示用クレーム
///
/// 署名は検証しない。権限判定には使わないこと。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenClaims {
    /// `sub`（ログインしたメールアドレス）
    pub subject_email: String,
    pub role: Option<String>,
    pub school_name: Option<String>,
    /// `exp`（UNIX秒）。無い場合はローカルでは失効しない
    pub expires_at: Option<i64>,
}

impl TokenClaims {
    /// `header.payload.signature` 形式のトークンからペイロードを取り出す
    pub fn decode(token: &str) -> AuthResult<Self> {
        let segments: Vec<&str> = token.trim().split('.').collect();
        if segments.len() != 3 {
            return Err(AuthError::InvalidToken(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        }

        let payload = URL_SAFE_NO_PAD
            .decode(segments[1].trim_end_matches('='))
            .map_err(|e| AuthError::InvalidToken(format!("payload is not base64url: {}", e)))?;

        let claims: Value = serde_json::from_slice(&payload)
            .map_err(|e| AuthError::InvalidToken(format!("payload is not JSON: {}", e)))?;

        let Some(fields) = claims.as_object() else {
            return Err(AuthError::InvalidToken("payload is not an object".to_string()));
        };

        let text = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_string);

        Ok(Self {
            subject_email: text("sub").unwrap_or_default(),
            role: text("role"),
            school_name: text("school_name"),
            expires_at: fields.get("exp").and_then(|exp| {
                exp.as_i64().or_else(|| exp.as_f64().map(|f| f.floor() as i64))
            }),
        })
    }

    /// `now` 時点で失効しているか（`exp` ちょうども失効扱い）
    pub fn is_expired_at(&self, now_epoch_seconds: i64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| now_epoch_seconds >= expires_at)
    }
}

/// 生トークンとデコード済みクレームの組
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    raw: String,
    claims: TokenClaims,
}

impl Credential {
    pub fn parse(raw: impl Into<String>) -> AuthResult<Self> {
        let raw = raw.into();
        let claims = TokenClaims::decode(&raw)?;
        Ok(Self { raw, claims })
    }

    pub fn token(&self) -> &str {
        &self.raw
    }

    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    pub fn is_expired_at(&self, now_epoch_seconds: i64) -> bool {
        self.claims.is_expired_at(now_epoch_seconds)
    }
}

// トークン本体はログに出さない
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("raw", &"<redacted>")
            .field("claims", &self.claims)
            .finish()
    }
}
