//! リポジトリ変更のブロードキャスト
//!
//! 予測リポジトリの差し替えを購読者へプッシュ通知する。
//! 各イベントは差し替え後のリビジョンと要約のみを含み、
//! 本体は購読者が `PredictionRepository::snapshot()` で取得する。

use tokio::sync::broadcast;

use crate::analytics::Aggregates;

/// リポジトリ変更イベント
#[derive(Clone, Debug, PartialEq)]
pub enum RepositoryChange {
    /// `/stats` のスナップショットで全体が差し替えられた
    SnapshotReplaced {
        revision: u64,
        record_count: usize,
        aggregates: Aggregates,
    },

    /// アップロード結果で直近の予測一覧が差し替えられた
    PredictionsUploaded { revision: u64, count: usize },

    /// ログアウト等で空になった
    Cleared { revision: u64 },
}

impl RepositoryChange {
    pub fn revision(&self) -> u64 {
        match self {
            Self::SnapshotReplaced { revision, .. }
            | Self::PredictionsUploaded { revision, .. }
            | Self::Cleared { revision } => *revision,
        }
    }
}

/// リポジトリ変更のブロードキャスター
///
/// tokio::sync::broadcastを使用。遅い購読者は古いイベントを取りこぼす
/// （lagged error）が、最新状態は常にリポジトリから読める。
pub struct RepositoryBroadcaster {
    sender: broadcast::Sender<RepositoryChange>,
}

impl RepositoryBroadcaster {
    /// バッファサイズ64で作成
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RepositoryChange> {
        self.sender.subscribe()
    }

    /// 変更を通知
    ///
    /// 購読者がいない場合は破棄される。非ブロッキング。
    pub fn broadcast(&self, change: RepositoryChange) {
        let revision = change.revision();
        if self.sender.send(change).is_err() {
            tracing::trace!(revision, "🔇 [BROADCASTER] No subscribers for change");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for RepositoryBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
