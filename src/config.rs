//! アプリケーション設定管理モジュール
//!
//! XDGディレクトリを使用した設定ファイルの永続化と管理を提供します。

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// API URLを上書きする環境変数
pub const API_URL_ENV: &str = "ONLOOKS_API_URL";

/// 設定ディレクトリ（`~/.config/onlooks` など）
pub fn default_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("dev", "onlooks", "onlooks").map(|dirs| dirs.config_dir().to_path_buf())
}

/// ログ設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// カスタムログディレクトリ（Noneの場合はXDGデフォルト使用）
    pub log_dir: Option<PathBuf>,
    /// ログレベル (trace/debug/info/warn/error)
    pub log_level: String,
    /// ファイル出力有効化
    pub enable_file_logging: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            log_level: "info".to_string(),
            enable_file_logging: false,
        }
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// バックエンドのベースURL
    pub api_url: String,
    /// リクエストタイムアウト（ミリ秒）
    pub request_timeout_ms: u64,
    /// 一覧の1ページあたり件数
    pub page_size: usize,
    /// ダッシュボードに出す直近の予測件数
    pub recent_activity_limit: usize,
    /// ログ設定
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8000".to_string(),
            request_timeout_ms: 10_000,
            page_size: crate::projection::DEFAULT_PAGE_SIZE,
            recent_activity_limit: crate::predictions::repository::DEFAULT_RECENT_ACTIVITY_LIMIT,
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// 環境変数による上書きを適用
    pub fn apply_env_overrides(&mut self) {
        self.apply_api_url_override(std::env::var(API_URL_ENV).ok());
    }

    fn apply_api_url_override(&mut self, value: Option<String>) {
        if let Some(url) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            debug!("API URL overridden by {}: {}", API_URL_ENV, url);
            self.api_url = url;
        }
    }
}

/// 設定管理マネージャー
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// XDGディレクトリの設定ファイルを使う設定マネージャーを作成
    pub fn new() -> Result<Self> {
        let config_dir = default_config_dir().context("Failed to get project directories")?;
        let config_path = config_dir.join("config.toml");

        debug!("Config file path: {}", config_path.display());

        Ok(Self { config_path })
    }

    /// 任意のパスを使う設定マネージャーを作成
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// 設定を読み込み（ファイルが無ければデフォルト）
    pub fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!(
                "Config file not found, using default settings: {}",
                self.config_path.display()
            );
            return Ok(AppConfig::default());
        }

        let config_content = fs::read_to_string(&self.config_path).with_context(|| {
            format!("Failed to read config file: {}", self.config_path.display())
        })?;

        let config: AppConfig = toml::from_str(&config_content).with_context(|| {
            format!(
                "Failed to parse config file: {}",
                self.config_path.display()
            )
        })?;

        info!(
            "✅ Configuration loaded from: {}",
            self.config_path.display()
        );

        Ok(config)
    }

    /// 設定を保存
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let config_content =
            toml::to_string_pretty(config).context("Failed to serialize config")?;

        fs::write(&self.config_path, config_content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;

        info!("💾 Configuration saved to: {}", self.config_path.display());

        Ok(())
    }

    /// 設定をリセット（デフォルト値に戻す）
    pub fn reset_config(&self) -> Result<()> {
        self.save_config(&AppConfig::default())?;
        info!("🔄 Configuration reset to defaults");
        Ok(())
    }

    /// 設定ファイルパスを取得
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// 設定ファイルが存在するかチェック
    pub fn config_exists(&self) -> bool {
        self.config_path.exists()
    }
}
