//! インサイト文の分解
//!
//! バックエンドの説明文は`Key Risk Factors:`と`Recommendations:`の
//! 2つの見出しで緩く区切られている。見出しが欠けていても失敗せず、
//! 該当セクションが空になるだけ。

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

pub const KEY_RISK_FACTORS_MARKER: &str = "Key Risk Factors:";
pub const RECOMMENDATIONS_MARKER: &str = "Recommendations:";
const BULLET: char = '•';

/// 分解済みのインサイト
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct InsightSections {
    pub analysis: String,
    pub key_risk_factors: Vec<String>,
    pub recommendations: String,
}

pub fn extract_insight_sections(text: &str) -> InsightSections {
    let risk_marker = text.find(KEY_RISK_FACTORS_MARKER);
    let search_from = risk_marker.map_or(0, |pos| pos + KEY_RISK_FACTORS_MARKER.len());
    let recommendations_marker = text[search_from..]
        .find(RECOMMENDATIONS_MARKER)
        .map(|pos| pos + search_from);

    let analysis_end = risk_marker
        .or(recommendations_marker)
        .unwrap_or(text.len());
    let analysis = text[..analysis_end].trim().to_string();

    let key_risk_factors = match risk_marker {
        Some(_) => {
            let risk_end = recommendations_marker.unwrap_or(text.len());
            text[search_from..risk_end]
                .lines()
                .filter_map(|line| line.trim().strip_prefix(BULLET))
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        }
        None => Vec::new(),
    };

    let recommendations = recommendations_marker
        .map(|pos| text[pos + RECOMMENDATIONS_MARKER.len()..].trim().to_string())
        .unwrap_or_default();

    InsightSections {
        analysis,
        key_risk_factors,
        recommendations,
    }
}

fn scholarship_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)such as ([^.]+)").expect("valid scholarship regex"))
}

fn quoted_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"'([^']+)'").expect("valid quoted phrase regex"))
}

/// 「such as A, B, C.」形式で挙げられた奨学金候補
pub fn scholarship_suggestions(text: &str) -> Vec<String> {
    scholarship_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|list| {
            list.as_str()
                .split(',')
                .map(|item| item.trim().trim_start_matches("and ").trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// シングルクォートで囲まれた要因名
pub fn quoted_risk_factors(text: &str) -> Vec<String> {
    quoted_pattern()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}
