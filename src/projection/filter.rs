//! タブ絞り込みと検索

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::predictions::{PredictionLabel, PredictionRecord};

/// ダッシュボードのタブ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tab {
    #[default]
    All,
    WillDropOut,
    WillContinue,
}

impl Tab {
    pub const ALL_TABS: [Tab; 3] = [Tab::All, Tab::WillDropOut, Tab::WillContinue];

    /// 画面に表示するタブ名
    pub fn label(&self) -> &'static str {
        match self {
            Tab::All => "All",
            Tab::WillDropOut => crate::predictions::WILL_DROP_OUT,
            Tab::WillContinue => crate::predictions::WILL_CONTINUE,
        }
    }

    /// このタブに含まれるか（ラベルの完全一致）
    pub fn matches(&self, label: &PredictionLabel) -> bool {
        match self {
            Tab::All => true,
            Tab::WillDropOut => *label == PredictionLabel::WillDropOut,
            Tab::WillContinue => *label == PredictionLabel::WillContinue,
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Tab {
    type Err = String;

    /// タブ名またはCLI向けの短縮名を受け付ける
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "all" => Ok(Tab::All),
            "willdropout" | "dropout" => Ok(Tab::WillDropOut),
            "willcontinue" | "continue" => Ok(Tab::WillContinue),
            _ => Err(format!(
                "unknown tab '{}', expected one of: all, dropout, continue",
                s
            )),
        }
    }
}

/// タブごとの件数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TabCounts {
    pub all: usize,
    pub will_drop_out: usize,
    pub will_continue: usize,
}

impl TabCounts {
    pub fn get(&self, tab: Tab) -> usize {
        match tab {
            Tab::All => self.all,
            Tab::WillDropOut => self.will_drop_out,
            Tab::WillContinue => self.will_continue,
        }
    }
}

/// タブで絞り込み（順序は保持）
pub fn filter_by_tab(records: &[PredictionRecord], tab: Tab) -> Vec<&PredictionRecord> {
    records.iter().filter(|r| tab.matches(&r.prediction)).collect()
}

pub fn tab_counts(records: &[PredictionRecord]) -> TabCounts {
    TabCounts {
        all: records.len(),
        will_drop_out: records.iter().filter(|r| r.prediction.is_dropout()).count(),
        will_continue: records.iter().filter(|r| r.prediction.is_continue()).count(),
    }
}

/// インサイト文を大文字小文字を区別せず部分一致検索
///
/// 空の検索語は全件を返す。
pub fn search_insights<'a>(
    records: impl IntoIterator<Item = &'a PredictionRecord>,
    term: &str,
) -> Vec<&'a PredictionRecord> {
    let needle = term.trim().to_lowercase();
    records
        .into_iter()
        .filter(|r| needle.is_empty() || r.insights_text.to_lowercase().contains(&needle))
        .collect()
}
