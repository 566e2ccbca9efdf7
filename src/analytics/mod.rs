//! 分析機能モジュール
//!
//! 予測レコードの集計、月別トレンドのチャート用系列化、
//! CSV/Excel形式でのエクスポートを提供します。

pub mod export;
pub mod trends;

use serde::{Deserialize, Serialize};

use crate::predictions::PredictionRecord;

pub use export::{ExportError, ExportFormat, ExportManager, ExportTable};
pub use trends::{trend_series, TrendSeries, MONTH_NAMES};

/// 生徒一覧から導出した集計
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Aggregates {
    pub total_count: usize,
    pub dropout_count: usize,
    pub continue_count: usize,
    /// 0〜100に丸めた割合
    pub dropout_rate_percent: u32,
    pub continue_rate_percent: u32,
}

/// ラベルの完全一致で集計
///
/// 未知のラベルは総数にのみ含まれ、どちらの件数にも数えない。
pub fn derive_aggregates(records: &[PredictionRecord]) -> Aggregates {
    let total_count = records.len();
    let dropout_count = records.iter().filter(|r| r.prediction.is_dropout()).count();
    let continue_count = records.iter().filter(|r| r.prediction.is_continue()).count();

    Aggregates {
        total_count,
        dropout_count,
        continue_count,
        dropout_rate_percent: rate_percent(dropout_count, total_count),
        continue_rate_percent: rate_percent(continue_count, total_count),
    }
}

/// `round(count / total * 100)`、総数0なら0
pub fn rate_percent(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (count as f64 / total as f64 * 100.0).round() as u32
}
