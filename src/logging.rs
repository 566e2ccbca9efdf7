//! ログ初期化

use std::path::PathBuf;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

/// ログファイル名の接頭辞（日付が付与される）
pub const LOG_FILE_PREFIX: &str = "onlooks.log";

/// `RUST_LOG` → 設定のレベル → `info` の順でフィルタを決める
pub fn build_env_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// ログの出力先ディレクトリ
pub fn resolve_log_dir(config: &LogConfig) -> Option<PathBuf> {
    config.log_dir.clone().or_else(|| {
        directories::ProjectDirs::from("dev", "onlooks", "onlooks")
            .map(|dirs| dirs.data_local_dir().join("logs"))
    })
}

/// ログ初期化
///
/// ファイル出力が有効な場合は日次ローテーションのファイルにも書き出す。
/// 戻り値のガードはプロセス終了まで保持すること。
pub fn init_logging(config: &LogConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = build_env_filter(config);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let (file_layer, guard) = if config.enable_file_logging {
        let log_dir = resolve_log_dir(config).context("Failed to determine log directory")?;
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

        let appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}
