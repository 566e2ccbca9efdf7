use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

pub mod columns;
pub mod csv_exporter;
pub mod excel_exporter;

pub use columns::{report_columns, trend_columns, ExportColumn};
pub use csv_exporter::{to_csv, CsvExporter};
pub use excel_exporter::ExcelExporter;

/// エクスポート形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExportFormat {
    Csv,
    Excel,
}

impl ExportFormat {
    pub fn file_extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "xlsx",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    /// 出力先パスの拡張子から形式を決定（大文字小文字は区別しない）
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Some(ExportFormat::Csv),
            "xlsx" => Some(ExportFormat::Excel),
            _ => None,
        }
    }
}

/// エクスポートエラー
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unsupported format: {format:?}")]
    UnsupportedFormat { format: ExportFormat },

    #[error("Unsupported export destination: {path}")]
    UnknownExtension { path: String },

    #[error("Invalid data: {message}")]
    InvalidData { message: String },
}

/// 形式に依存しない表データ
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// 列ごとの数値フラグ（足りない分は文字列列として扱う）
    pub numeric_columns: Vec<bool>,
}

impl ExportTable {
    /// 列定義に従ってレコードを表に変換
    pub fn from_records<T>(records: &[T], columns: &[ExportColumn<T>]) -> Self {
        let headers = columns.iter().map(|c| c.header.clone()).collect();
        let rows = records
            .iter()
            .map(|record| columns.iter().map(|c| c.value(record)).collect())
            .collect();
        let numeric_columns = columns.iter().map(|c| c.numeric).collect();
        Self {
            headers,
            rows,
            numeric_columns,
        }
    }

    /// 指定列を数値セルとして書き出すか
    pub fn is_numeric_column(&self, col: usize) -> bool {
        self.numeric_columns.get(col).copied().unwrap_or(false)
    }

    /// 全行がヘッダーと同じ列数か検証
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.headers.is_empty() {
            return Err(ExportError::InvalidData {
                message: "table has no columns".to_string(),
            });
        }
        if let Some(index) = self.rows.iter().position(|r| r.len() != self.headers.len()) {
            return Err(ExportError::InvalidData {
                message: format!(
                    "row {} has {} fields, expected {}",
                    index,
                    self.rows[index].len(),
                    self.headers.len()
                ),
            });
        }
        Ok(())
    }
}

/// フォーマットハンドラートレイト
pub trait FormatHandler: Send + Sync {
    fn export(&self, table: &ExportTable) -> Result<Vec<u8>, ExportError>;
    fn file_extension(&self) -> &str;
}

/// エクスポートマネージャー
pub struct ExportManager {
    format_handlers: HashMap<ExportFormat, Box<dyn FormatHandler>>,
}

impl ExportManager {
    /// 新しいエクスポートマネージャーを作成
    pub fn new() -> Self {
        let mut manager = Self {
            format_handlers: HashMap::new(),
        };

        // デフォルトハンドラーを登録
        manager.register_handler(ExportFormat::Csv, Box::new(CsvExporter::new()));
        manager.register_handler(ExportFormat::Excel, Box::new(ExcelExporter::new()));

        manager
    }

    /// フォーマットハンドラーを登録
    pub fn register_handler(&mut self, format: ExportFormat, handler: Box<dyn FormatHandler>) {
        self.format_handlers.insert(format, handler);
    }

    /// 表をエクスポート
    pub fn export(&self, table: &ExportTable, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
        let handler = self
            .format_handlers
            .get(&format)
            .ok_or(ExportError::UnsupportedFormat { format })?;

        table.validate()?;
        handler.export(table)
    }

    /// 拡張子から形式を決めてファイルに書き出す
    pub fn export_to_file(&self, table: &ExportTable, path: &Path) -> Result<ExportFormat, ExportError> {
        let format = ExportFormat::from_path(path).ok_or_else(|| ExportError::UnknownExtension {
            path: path.display().to_string(),
        })?;

        let bytes = self.export(table, format)?;
        std::fs::write(path, &bytes)?;

        tracing::info!(
            path = %path.display(),
            format = format.file_extension(),
            rows = table.rows.len(),
            bytes = bytes.len(),
            "💾 Export written"
        );
        Ok(format)
    }

    /// サポートされている形式を取得
    pub fn supported_formats(&self) -> Vec<ExportFormat> {
        self.format_handlers.keys().copied().collect()
    }
}

impl Default for ExportManager {
    fn default() -> Self {
        Self::new()
    }
}
