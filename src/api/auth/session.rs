//! セッションストア
//!
//! 現在のトークンを1つだけ保持する。期限切れのトークンは
//! 存在しないものとして扱い、送信側には渡さない。

use std::sync::Arc;

use parking_lot::RwLock;

use super::{Credential, TokenStorage};

pub struct SessionStore {
    credential: RwLock<Option<Credential>>,
    storage: Arc<dyn TokenStorage>,
}

impl SessionStore {
    /// 保存先から即座に復元して作成
    ///
    /// 読み込みやデコードに失敗した場合は未ログインとして開始する。
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        let credential = match storage.load() {
            Ok(Some(raw)) => match Credential::parse(raw) {
                Ok(credential) => {
                    tracing::info!(
                        subject = %credential.claims().subject_email,
                        "🔑 Session restored from storage"
                    );
                    Some(credential)
                }
                Err(e) => {
                    tracing::warn!("⚠️ Stored token could not be decoded, discarding: {}", e);
                    if let Err(e) = storage.delete() {
                        tracing::warn!("❌ Failed to delete stored token: {}", e);
                    }
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("⚠️ Failed to load stored token: {}", e);
                None
            }
        };

        Self {
            credential: RwLock::new(credential),
            storage,
        }
    }

    /// 新しいトークンを設定して永続化
    ///
    /// デコードできないトークンは拒否し、既存のセッションも破棄する。
    pub fn set_credential(&self, raw: &str) -> Option<Credential> {
        let credential = match Credential::parse(raw) {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!("⚠️ Rejecting undecodable token: {}", e);
                self.clear_credential();
                return None;
            }
        };

        if let Err(e) = self.storage.save(credential.token()) {
            tracing::warn!("❌ Failed to persist token: {}", e);
        }

        *self.credential.write() = Some(credential.clone());
        tracing::info!(
            subject = %credential.claims().subject_email,
            "🔐 Credential stored"
        );
        Some(credential)
    }

    /// メモリと保存先の両方から削除（何度呼んでもよい）
    pub fn clear_credential(&self) {
        let had_credential = self.credential.write().take().is_some();

        if let Err(e) = self.storage.delete() {
            tracing::warn!("❌ Failed to delete stored token: {}", e);
        }

        if had_credential {
            tracing::info!("🚪 Credential cleared");
        }
    }

    /// 現在有効なトークン（期限切れなら`None`）
    pub fn current_credential(&self) -> Option<Credential> {
        self.current_credential_at(chrono::Utc::now().timestamp())
    }

    pub fn current_credential_at(&self, now_epoch_seconds: i64) -> Option<Credential> {
        self.credential
            .read()
            .as_ref()
            .filter(|credential| !credential.is_expired_at(now_epoch_seconds))
            .cloned()
    }

    /// 期限切れのトークンを保持していれば破棄して`true`
    pub fn discard_if_expired(&self) -> bool {
        self.discard_if_expired_at(chrono::Utc::now().timestamp())
    }

    pub fn discard_if_expired_at(&self, now_epoch_seconds: i64) -> bool {
        let expired = self
            .credential
            .read()
            .as_ref()
            .is_some_and(|credential| credential.is_expired_at(now_epoch_seconds));
        if expired {
            tracing::info!("⏰ Stored credential has expired");
            self.clear_credential();
        }
        expired
    }

    /// 期限に関係なく保持しているか
    pub fn has_credential(&self) -> bool {
        self.credential.read().is_some()
    }
}
