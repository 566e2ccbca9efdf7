//! 月別トレンドのチャート用系列

use serde::Serialize;

use crate::predictions::MonthlyTrend;

/// 月の略称（1月始まり）
pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// 折れ線チャート用の系列
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TrendSeries {
    pub labels: Vec<String>,
    pub dropout_data: Vec<u64>,
    pub continue_data: Vec<u64>,
}

impl TrendSeries {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// 月番号を略称に変換（範囲外は`None`）
pub fn month_name(month_index: u8) -> Option<&'static str> {
    MONTH_NAMES.get(usize::from(month_index).checked_sub(1)?).copied()
}

/// トレンドを入力順のまま系列に変換
pub fn trend_series(trends: &[MonthlyTrend]) -> TrendSeries {
    let mut series = TrendSeries::default();
    for trend in trends {
        let Some(label) = month_name(trend.month_index) else {
            continue;
        };
        series.labels.push(label.to_string());
        series.dropout_data.push(trend.dropout_count);
        series.continue_data.push(trend.continue_count);
    }
    series
}
