//! エクスポート列定義と既定のプリセット

use crate::analytics::trends::month_name;
use crate::predictions::{MonthlyTrend, PredictionRecord};
use crate::projection::extract_insight_sections;

type Extractor<T> = Box<dyn Fn(&T) -> String + Send + Sync>;

/// 1列分の定義（ヘッダー名と値の取り出し方）
pub struct ExportColumn<T> {
    pub header: String,
    /// 数値セルとして書き出す列か（件数列のみ）
    pub numeric: bool,
    extract: Extractor<T>,
}

impl<T> ExportColumn<T> {
    pub fn new<F>(header: impl Into<String>, extract: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self {
            header: header.into(),
            numeric: false,
            extract: Box::new(extract),
        }
    }

    /// 数値列としてマーク
    pub fn as_numeric(mut self) -> Self {
        self.numeric = true;
        self
    }

    pub fn value(&self, record: &T) -> String {
        (self.extract)(record)
    }
}

impl<T> std::fmt::Debug for ExportColumn<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportColumn")
            .field("header", &self.header)
            .field("numeric", &self.numeric)
            .finish_non_exhaustive()
    }
}

/// 月別トレンドのエクスポート列
pub fn trend_columns() -> Vec<ExportColumn<MonthlyTrend>> {
    vec![
        ExportColumn::new("Month", |t: &MonthlyTrend| {
            month_name(t.month_index)
                .map(str::to_string)
                .unwrap_or_else(|| t.month_index.to_string())
        }),
        ExportColumn::new("Dropout Predictions", |t: &MonthlyTrend| {
            t.dropout_count.to_string()
        })
        .as_numeric(),
        ExportColumn::new("Continue Predictions", |t: &MonthlyTrend| {
            t.continue_count.to_string()
        })
        .as_numeric(),
    ]
}

/// 生徒ごとの詳細レポート列
///
/// リスク要因は`; `で連結する。
pub fn report_columns() -> Vec<ExportColumn<PredictionRecord>> {
    vec![
        ExportColumn::new("Student Name", |r: &PredictionRecord| r.student_name.clone()),
        ExportColumn::new("Student ID", |r: &PredictionRecord| {
            r.student_id.clone().unwrap_or_default()
        }),
        ExportColumn::new("Class", |r: &PredictionRecord| {
            r.class_name.clone().unwrap_or_default()
        }),
        ExportColumn::new("Prediction", |r: &PredictionRecord| r.prediction.to_string()),
        ExportColumn::new("Key Risk Factors", |r: &PredictionRecord| {
            extract_insight_sections(&r.insights_text)
                .key_risk_factors
                .join("; ")
        }),
        ExportColumn::new("Recommendations", |r: &PredictionRecord| {
            extract_insight_sections(&r.insights_text).recommendations
        }),
        ExportColumn::new("Insights", |r: &PredictionRecord| r.insights_text.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::export::to_csv;
    use crate::predictions::PredictionLabel;

    #[test]
    fn test_trend_export() {
        let trends = [
            MonthlyTrend {
                month_index: 1,
                dropout_count: 3,
                continue_count: 10,
            },
            MonthlyTrend {
                month_index: 2,
                dropout_count: 1,
                continue_count: 12,
            },
        ];

        assert_eq!(
            to_csv(&trends, &trend_columns()),
            "\"Month\",\"Dropout Predictions\",\"Continue Predictions\"\n\
             \"Jan\",\"3\",\"10\"\n\
             \"Feb\",\"1\",\"12\""
        );
    }

    #[test]
    fn test_report_columns_split_insights() {
        let record = PredictionRecord::new("Asha", PredictionLabel::WillDropOut)
            .with_student_id("S-1")
            .with_insights(
                "Struggling.\nKey Risk Factors:\n• Low attendance\n• Late fees\nRecommendations:\nMentoring",
            );
        let columns = report_columns();
        let values: Vec<String> = columns.iter().map(|c| c.value(&record)).collect();

        assert_eq!(values[0], "Asha");
        assert_eq!(values[1], "S-1");
        assert_eq!(values[2], "");
        assert_eq!(values[3], "Will DropOut");
        assert_eq!(values[4], "Low attendance; Late fees");
        assert_eq!(values[5], "Mentoring");
        assert_eq!(columns.len(), 7);
    }

    #[test]
    fn test_only_trend_counts_are_numeric() {
        let trend: Vec<bool> = trend_columns().iter().map(|c| c.numeric).collect();
        assert_eq!(trend, vec![false, true, true]);

        // IDや名前は数字に見えても文字列のまま
        assert!(report_columns().iter().all(|c| !c.numeric));
    }
}
