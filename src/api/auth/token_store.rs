//! トークン永続化
//!
//! ログイン中のトークンを再起動後も使えるように保存します。

use super::{AuthError, AuthResult};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// トークンの保存先
pub trait TokenStorage: Send + Sync {
    /// 保存済みトークン（無ければ`None`）
    fn load(&self) -> AuthResult<Option<String>>;
    fn save(&self, token: &str) -> AuthResult<()>;
    /// 削除（存在しなくても成功）
    fn delete(&self) -> AuthResult<()>;
}

/// 認証情報ファイルの構造
#[derive(Debug, Serialize, Deserialize)]
struct CredentialsFile {
    session: SessionEntry,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionEntry {
    token: String,
    /// 保存日時
    #[serde(default = "Utc::now")]
    saved_at: DateTime<Utc>,
}

/// TOMLファイルによるトークン保存
pub struct TokenStore {
    /// 設定ファイルのパス
    config_path: PathBuf,
}

impl TokenStore {
    /// 新しいTokenStoreを作成
    ///
    /// # Arguments
    ///
    /// * `config_dir` - 設定ディレクトリのパス（例: ~/.config/onlooks）
    pub fn new(config_dir: PathBuf) -> Self {
        let config_path = config_dir.join("credentials.toml");
        Self { config_path }
    }

    /// デフォルトの設定ディレクトリを使用してTokenStoreを作成
    pub fn with_default_dir() -> AuthResult<Self> {
        let config_dir = crate::config::default_config_dir()
            .ok_or_else(|| AuthError::LoadError("Failed to determine config directory".into()))?;

        Ok(Self::new(config_dir))
    }

    /// トークンが存在するか確認
    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }

    /// 設定ファイルのパスを取得
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }
}

impl TokenStorage for TokenStore {
    fn load(&self) -> AuthResult<Option<String>> {
        if !self.config_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.config_path)?;
        let file: CredentialsFile = toml::from_str(&content)?;

        if file.session.token.trim().is_empty() {
            return Err(AuthError::LoadError("Stored token is empty".into()));
        }

        tracing::debug!(saved_at = %file.session.saved_at, "🔑 Loaded stored token");
        Ok(Some(file.session.token))
    }

    fn save(&self, token: &str) -> AuthResult<()> {
        // ディレクトリが存在しない場合は作成
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = CredentialsFile {
            session: SessionEntry {
                token: token.to_string(),
                saved_at: Utc::now(),
            },
        };

        let toml_string = toml::to_string_pretty(&file)?;
        write_owner_only(&self.config_path, &toml_string)?;

        Ok(())
    }

    fn delete(&self) -> AuthResult<()> {
        if self.config_path.exists() {
            fs::remove_file(&self.config_path)?;
        }
        Ok(())
    }
}

/// 所有者のみ読み書きできるファイルとして書き込む
#[cfg(unix)]
fn write_owner_only(path: &Path, contents: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // 既存ファイルは作成時のモードが適用されないため明示的に絞る
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(contents.as_bytes())
}

#[cfg(not(unix))]
fn write_owner_only(path: &Path, contents: &str) -> std::io::Result<()> {
    fs::write(path, contents)
}

/// メモリ上のトークン保存（テスト・一時セッション用）
#[derive(Default)]
pub struct MemoryTokenStorage {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    pub fn stored(&self) -> Option<String> {
        self.token.lock().clone()
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> AuthResult<Option<String>> {
        Ok(self.token.lock().clone())
    }

    fn save(&self, token: &str) -> AuthResult<()> {
        *self.token.lock() = Some(token.to_string());
        Ok(())
    }

    fn delete(&self) -> AuthResult<()> {
        self.token.lock().take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_token_store_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = TokenStore::new(temp_dir.path().to_path_buf());

        store.save("header.payload.sig").unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded.as_deref(), Some("header.payload.sig"));
    }

    #[test]
    fn test_token_store_load_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let store = TokenStore::new(temp_dir.path().to_path_buf());

        assert!(!store.exists());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_token_store_delete_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = TokenStore::new(temp_dir.path().to_path_buf());

        store.save("t.o.k").unwrap();
        assert!(store.exists());

        store.delete().unwrap();
        assert!(!store.exists());
        store.delete().unwrap();
    }

    #[test]
    fn test_token_store_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir.path().join("nested").join("dir");
        let store = TokenStore::new(nested_path);

        store.save("t.o.k").unwrap();
        assert!(store.exists());
    }

    #[test]
    fn test_credentials_toml_format() {
        let temp_dir = TempDir::new().unwrap();
        let store = TokenStore::new(temp_dir.path().to_path_buf());

        store.save("abc.def.ghi").unwrap();

        let content = fs::read_to_string(store.config_path()).unwrap();
        assert!(content.contains("[session]"));
        assert!(content.contains("token = \"abc.def.ghi\""));
    }

    #[cfg(unix)]
    #[test]
    fn test_credentials_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let store = TokenStore::new(temp_dir.path().to_path_buf());

        // 緩い権限の既存ファイルも上書き時に絞られる
        fs::write(store.config_path(), "").unwrap();
        fs::set_permissions(store.config_path(), fs::Permissions::from_mode(0o644)).unwrap();

        store.save("abc.def.ghi").unwrap();

        let mode = fs::metadata(store.config_path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_corrupted_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = TokenStore::new(temp_dir.path().to_path_buf());
        fs::write(store.config_path(), "[session\ntoken = ").unwrap();

        assert!(matches!(store.load(), Err(AuthError::TomlParse(_))));
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryTokenStorage::with_token("a.b.c");
        assert_eq!(storage.load().unwrap().as_deref(), Some("a.b.c"));

        storage.save("d.e.f").unwrap();
        assert_eq!(storage.stored().as_deref(), Some("d.e.f"));

        storage.delete().unwrap();
        assert_eq!(storage.load().unwrap(), None);
    }
}
