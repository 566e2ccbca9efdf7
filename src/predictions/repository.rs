//! 予測リポジトリ
//!
//! 直近に取得したダッシュボード状態をメモリ上に保持する共有ストア。
//! 状態は `Arc<DashboardSnapshot>` 1つにまとめられ、新しい状態を
//! 完全に組み立ててから差し替えるため、読み手が異なる取得結果の
//! 集計とレコードを同時に見ることはない。

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::broadcast;

use super::broadcaster::{RepositoryBroadcaster, RepositoryChange};
use super::normalize::{normalize_records, normalize_stats};
use super::{DashboardSnapshot, PredictionRecord};
use crate::analytics::{derive_aggregates, Aggregates};

/// 最近のアクティビティとして表示する既定件数
pub const DEFAULT_RECENT_ACTIVITY_LIMIT: usize = 3;

/// 予測リポジトリ
///
/// グローバルには置かず、`Arc` で必要な箇所へ注入する。
pub struct PredictionRepository {
    current: RwLock<Arc<DashboardSnapshot>>,
    broadcaster: RepositoryBroadcaster,
}

impl PredictionRepository {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(DashboardSnapshot::default())),
            broadcaster: RepositoryBroadcaster::new(),
        }
    }

    /// `/stats` ペイロードを取り込む
    ///
    /// 集計値・生徒一覧・直近予測をまとめて正規化し、一度に差し替える。
    pub fn ingest(&self, raw_payload: &Value) {
        let stats = normalize_stats(raw_payload);
        let records = normalize_records(raw_payload.get("student_predictions"));
        let recent = normalize_records(raw_payload.get("recent_predictions"));
        let aggregates = derive_aggregates(&records);

        if stats.predictions_made as usize != recent.len() {
            tracing::debug!(
                predictions_made = stats.predictions_made,
                recent_count = recent.len(),
                "📊 predictions_made differs from recent_predictions length"
            );
        }

        let change = {
            let mut guard = self.current.write();
            let revision = guard.revision + 1;
            let record_count = records.len();
            *guard = Arc::new(DashboardSnapshot {
                stats,
                records,
                recent,
                aggregates: aggregates.clone(),
                revision,
            });
            RepositoryChange::SnapshotReplaced {
                revision,
                record_count,
                aggregates,
            }
        };

        tracing::info!(revision = change.revision(), "📥 Dashboard snapshot ingested");
        self.broadcaster.broadcast(change);
    }

    /// `/upload` レスポンスを取り込む
    ///
    /// 直近の予測一覧のみを差し替え、集計値と生徒一覧は維持する。
    pub fn ingest_upload(&self, raw_predictions: &Value) -> Vec<PredictionRecord> {
        let uploaded = normalize_records(Some(raw_predictions));

        let change = {
            let mut guard = self.current.write();
            let revision = guard.revision + 1;
            let mut next = DashboardSnapshot::clone(&guard);
            next.recent = uploaded.clone();
            next.revision = revision;
            *guard = Arc::new(next);
            RepositoryChange::PredictionsUploaded {
                revision,
                count: uploaded.len(),
            }
        };

        tracing::info!(count = uploaded.len(), "📤 Upload predictions ingested");
        self.broadcaster.broadcast(change);
        uploaded
    }

    /// 空の状態に戻す
    pub fn clear(&self) {
        let revision = {
            let mut guard = self.current.write();
            let revision = guard.revision + 1;
            *guard = Arc::new(DashboardSnapshot {
                revision,
                ..DashboardSnapshot::default()
            });
            revision
        };

        tracing::info!("🗑️ Prediction repository cleared");
        self.broadcaster.broadcast(RepositoryChange::Cleared { revision });
    }

    /// 現在のスナップショット全体
    pub fn snapshot(&self) -> Arc<DashboardSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// 現在の生徒一覧（サーバーの順序）
    pub fn current_records(&self) -> Vec<PredictionRecord> {
        self.snapshot().records.clone()
    }

    /// 直近の予測から先頭 `limit` 件
    pub fn recent_activity(&self, limit: usize) -> Vec<PredictionRecord> {
        self.snapshot().recent.iter().take(limit).cloned().collect()
    }

    /// 生徒一覧から集計を導出
    pub fn derive_aggregates(&self) -> Aggregates {
        derive_aggregates(&self.snapshot().records)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RepositoryChange> {
        self.broadcaster.subscribe()
    }
}

impl Default for PredictionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictions::PredictionLabel;
    use serde_json::json;

    fn stats_payload() -> Value {
        json!({
            "total_students": 4,
            "dropout_rate": 25.0,
            "continue_rate": 75.0,
            "predictions_made": 9,
            "monthly_trends": [{ "month": 3, "dropout_count": 1, "continue_count": 3 }],
            "recent_predictions": [
                { "ML_Prediction": "Will DropOut", "Insights": "a" },
                { "ML_Prediction": "Will Continue", "Insights": "b" },
                { "ML_Prediction": "Will Continue", "Insights": "c" },
                { "ML_Prediction": "Will Continue", "Insights": "d" }
            ],
            "student_predictions": [
                { "student_name": "A", "prediction": "Will DropOut" },
                { "student_name": "B", "prediction": "Will Continue" },
                { "student_name": "C", "prediction": "Will Continue" },
                { "student_name": "D", "prediction": "Will Continue" }
            ]
        })
    }

    #[test]
    fn test_ingest_replaces_snapshot() {
        let repository = PredictionRepository::new();
        repository.ingest(&stats_payload());

        let snapshot = repository.snapshot();
        assert_eq!(snapshot.revision, 1);
        assert_eq!(snapshot.stats.total_students, 4);
        assert_eq!(snapshot.stats.predictions_made, 9);
        assert_eq!(snapshot.records.len(), 4);
        assert_eq!(snapshot.recent.len(), 4);
        assert_eq!(snapshot.aggregates.dropout_count, 1);
        assert_eq!(snapshot.aggregates.dropout_rate_percent, 25);
    }

    #[test]
    fn test_previous_snapshot_unchanged_for_existing_readers() {
        let repository = PredictionRepository::new();
        repository.ingest(&stats_payload());
        let before = repository.snapshot();

        repository.ingest(&json!({ "total_students": 1 }));
        let after = repository.snapshot();

        assert_eq!(before.records.len(), 4);
        assert_eq!(before.stats.total_students, 4);
        assert!(after.records.is_empty());
        assert_eq!(after.stats.total_students, 1);
        assert!(after.revision > before.revision);
    }

    #[test]
    fn test_recent_activity_limit() {
        let repository = PredictionRepository::new();
        repository.ingest(&stats_payload());

        let recent = repository.recent_activity(DEFAULT_RECENT_ACTIVITY_LIMIT);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].insights_text, "a");
        assert_eq!(recent[2].insights_text, "c");
    }

    #[test]
    fn test_ingest_upload_keeps_stats_and_records() {
        let repository = PredictionRepository::new();
        repository.ingest(&stats_payload());

        let uploaded = repository.ingest_upload(&json!([
            { "Student Name": "Eve", "ML Prediction": "Will DropOut", "Insights": "x" }
        ]));

        assert_eq!(uploaded.len(), 1);
        let snapshot = repository.snapshot();
        assert_eq!(snapshot.records.len(), 4);
        assert_eq!(snapshot.recent.len(), 1);
        assert_eq!(snapshot.recent[0].prediction, PredictionLabel::WillDropOut);
        assert_eq!(snapshot.revision, 2);
    }

    #[test]
    fn test_clear_resets_state() {
        let repository = PredictionRepository::new();
        repository.ingest(&stats_payload());
        repository.clear();

        let snapshot = repository.snapshot();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.revision, 2);
        assert_eq!(repository.derive_aggregates(), Aggregates::default());
    }

    #[test]
    fn test_ingest_publishes_one_change() {
        let repository = PredictionRepository::new();
        let mut rx = repository.subscribe();

        repository.ingest(&stats_payload());

        let change = tokio_test::block_on(rx.recv()).expect("receive error");
        match change {
            RepositoryChange::SnapshotReplaced {
                revision,
                record_count,
                aggregates,
            } => {
                assert_eq!(revision, 1);
                assert_eq!(record_count, 4);
                assert_eq!(aggregates.continue_count, 3);
            }
            other => panic!("unexpected change: {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }
}
