//! 予測データモジュール
//!
//! バックエンドの予測レスポンスを正規化した内部表現と、
//! それを保持する共有リポジトリを提供します。

pub mod broadcaster;
pub mod normalize;
pub mod repository;

use serde::{Deserialize, Serialize};

use crate::analytics::Aggregates;

pub use broadcaster::{RepositoryBroadcaster, RepositoryChange};
pub use normalize::{normalize_record, normalize_records, normalize_stats};
pub use repository::PredictionRepository;

/// 退学予測ラベル（バックエンドの文字列と完全一致）
pub const WILL_DROP_OUT: &str = "Will DropOut";
pub const WILL_CONTINUE: &str = "Will Continue";

/// 名前が解決できなかった場合のセンチネル
pub const UNKNOWN_STUDENT: &str = "Unknown Student";
/// 予測ラベルが解決できなかった場合のセンチネル
pub const UNKNOWN_PREDICTION: &str = "Unknown";

/// 予測ラベル
///
/// 既知の2値以外は生の文字列のまま保持し、集計ではどちらにも数えない。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredictionLabel {
    WillDropOut,
    WillContinue,
    Unrecognized(String),
}

impl PredictionLabel {
    /// 完全一致でラベルを解釈
    pub fn parse(raw: &str) -> Self {
        match raw {
            WILL_DROP_OUT => Self::WillDropOut,
            WILL_CONTINUE => Self::WillContinue,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::WillDropOut => WILL_DROP_OUT,
            Self::WillContinue => WILL_CONTINUE,
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn is_dropout(&self) -> bool {
        matches!(self, Self::WillDropOut)
    }

    pub fn is_continue(&self) -> bool {
        matches!(self, Self::WillContinue)
    }
}

impl std::fmt::Display for PredictionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 1人の生徒に対するMLの判定結果（正規化済み）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub student_name: String,
    pub student_id: Option<String>,
    pub class_name: Option<String>,
    pub prediction: PredictionLabel,
    /// バックエンドが生成した半構造化テキスト
    pub insights_text: String,
    /// 類似生徒への参照（内容は解釈しない）
    pub similar_students: Vec<serde_json::Value>,
    pub predicted_date: Option<String>,
}

impl PredictionRecord {
    /// 最小限のフィールドでレコードを作成
    pub fn new(student_name: impl Into<String>, prediction: PredictionLabel) -> Self {
        Self {
            student_name: student_name.into(),
            student_id: None,
            class_name: None,
            prediction,
            insights_text: String::new(),
            similar_students: Vec::new(),
            predicted_date: None,
        }
    }

    pub fn with_insights(mut self, insights: impl Into<String>) -> Self {
        self.insights_text = insights.into();
        self
    }

    pub fn with_student_id(mut self, student_id: impl Into<String>) -> Self {
        self.student_id = Some(student_id.into());
        self
    }
}

/// 月別トレンド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTrend {
    /// 1〜12
    pub month_index: u8,
    pub dropout_count: u64,
    pub continue_count: u64,
}

/// `/stats` が返す集計値
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_students: u64,
    pub dropout_rate_percent: f64,
    pub continue_rate_percent: f64,
    /// バックエンド申告値。`recent` の件数とは独立して保持する
    pub predictions_made: u64,
    pub monthly_trends: Vec<MonthlyTrend>,
}

/// 一度に公開されるダッシュボード状態
///
/// 集計値とレコード一覧は常にこの単位で差し替えられる。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardSnapshot {
    pub stats: StatsSnapshot,
    /// `student_predictions` 由来の一覧
    pub records: Vec<PredictionRecord>,
    /// `recent_predictions` または直近のアップロード結果
    pub recent: Vec<PredictionRecord>,
    /// `records` から導出した集計
    pub aggregates: Aggregates,
    /// 差し替えごとに単調増加
    pub revision: u64,
}

impl DashboardSnapshot {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.recent.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_parse_exact_match() {
        assert_eq!(PredictionLabel::parse("Will DropOut"), PredictionLabel::WillDropOut);
        assert_eq!(PredictionLabel::parse("Will Continue"), PredictionLabel::WillContinue);
        assert_eq!(
            PredictionLabel::parse("will dropout"),
            PredictionLabel::Unrecognized("will dropout".to_string())
        );
    }

    #[test]
    fn test_label_display_preserves_raw_text() {
        let label = PredictionLabel::parse("Needs Review");
        assert_eq!(label.to_string(), "Needs Review");
        assert!(!label.is_dropout());
        assert!(!label.is_continue());
    }

    #[test]
    fn test_record_builder() {
        let record = PredictionRecord::new("Asha", PredictionLabel::WillContinue)
            .with_student_id("42")
            .with_insights("Strong grades.");

        assert_eq!(record.student_name, "Asha");
        assert_eq!(record.student_id.as_deref(), Some("42"));
        assert_eq!(record.insights_text, "Strong grades.");
        assert!(record.similar_students.is_empty());
    }
}
