//! 表示用プロジェクション
//!
//! リポジトリのレコード一覧に対する純粋な変換関数群。
//! タブ絞り込み、ページ分割、インサイト文の分解を提供し、
//! CSVへの変換はエクスポートモジュールのものを再公開する。

pub mod filter;
pub mod insights;
pub mod pagination;

pub use crate::analytics::export::{report_columns, to_csv, trend_columns, ExportColumn};
pub use filter::{filter_by_tab, search_insights, tab_counts, Tab, TabCounts};
pub use insights::{
    extract_insight_sections, quoted_risk_factors, scholarship_suggestions, InsightSections,
};
pub use pagination::{paginate, total_pages, PageCursor, DEFAULT_PAGE_SIZE};
