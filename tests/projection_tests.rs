//! 表示用プロジェクションとエクスポートの統合テスト

use onlooks::analytics::{derive_aggregates, Aggregates, ExportFormat, ExportManager, ExportTable};
use onlooks::predictions::{normalize_record, MonthlyTrend};
use onlooks::projection::{
    extract_insight_sections, filter_by_tab, paginate, report_columns, tab_counts, to_csv,
    total_pages, trend_columns, ExportColumn, PageCursor, Tab,
};
use onlooks::{PredictionLabel, PredictionRecord};
use serde_json::json;
use tempfile::TempDir;

fn mixed_records() -> Vec<PredictionRecord> {
    (0..12)
        .map(|i| {
            let label = match i % 3 {
                0 => PredictionLabel::WillDropOut,
                1 => PredictionLabel::WillContinue,
                _ => PredictionLabel::Unrecognized("Pending".to_string()),
            };
            PredictionRecord::new(format!("Student {}", i), label).with_student_id(i.to_string())
        })
        .collect()
}

/// 引用符付きCSVの1行を素朴に分解する
fn parse_quoted_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', _) => in_quotes = !in_quotes,
            (',', false) => fields.push(std::mem::take(&mut current)),
            (other, _) => current.push(other),
        }
    }
    fields.push(current);
    fields
}

#[test]
fn test_all_tab_is_identity() {
    let records = mixed_records();
    let filtered: Vec<PredictionRecord> = filter_by_tab(&records, Tab::All)
        .into_iter()
        .cloned()
        .collect();
    assert_eq!(filtered, records);

    assert!(filter_by_tab(&[], Tab::All).is_empty());
}

#[test]
fn test_label_tabs_only_return_matching_records() {
    let records = mixed_records();

    let dropouts = filter_by_tab(&records, Tab::WillDropOut);
    let continues = filter_by_tab(&records, Tab::WillContinue);

    assert_eq!(dropouts.len(), 4);
    assert!(dropouts
        .iter()
        .all(|r| r.prediction == PredictionLabel::WillDropOut));
    assert_eq!(continues.len(), 4);
    assert!(continues
        .iter()
        .all(|r| r.prediction == PredictionLabel::WillContinue));

    let counts = tab_counts(&records);
    assert_eq!(counts.get(Tab::All), 12);
    assert_eq!(counts.get(Tab::WillDropOut), 4);
}

#[test]
fn test_empty_aggregates_are_zero() {
    assert_eq!(derive_aggregates(&[]), Aggregates::default());

    let records = mixed_records();
    let aggregates = derive_aggregates(&records);
    assert_eq!(aggregates.total_count, 12);
    assert_eq!(aggregates.dropout_count, 4);
    assert_eq!(aggregates.continue_count, 4);
    assert_eq!(aggregates.dropout_rate_percent, 33);
    assert_eq!(aggregates.continue_rate_percent, 33);
}

#[test]
fn test_csv_quote_doubling_recovers_original() {
    let columns = vec![
        ExportColumn::new("Quote", |s: &String| s.clone()),
        ExportColumn::new("Length", |s: &String| s.len().to_string()),
    ];
    let rows = vec![r#"He said "hi""#.to_string(), "a, b".to_string()];

    let csv = to_csv(&rows, &columns);
    let lines: Vec<&str> = csv.split('\n').collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], r#""Quote","Length""#);
    assert_eq!(lines[1], r#""He said ""hi""","12""#);
    assert_eq!(parse_quoted_line(lines[1])[0], r#"He said "hi""#);
    assert_eq!(parse_quoted_line(lines[2]), vec!["a, b", "4"]);

    // 同じ入力なら同じ出力
    assert_eq!(csv, to_csv(&rows, &columns));
}

#[test]
fn test_insight_sections_example() {
    let sections = extract_insight_sections(
        "Good attendance. Key Risk Factors:\n• Low grades\n• Absenteeism\nRecommendations:\nTalk to parent.",
    );

    assert_eq!(sections.analysis, "Good attendance.");
    assert_eq!(sections.key_risk_factors, vec!["Low grades", "Absenteeism"]);
    assert_eq!(sections.recommendations, "Talk to parent.");
}

#[test]
fn test_legacy_upload_record_normalizes() {
    let record = normalize_record(&json!({
        "Student Name": "Asha",
        "ML Prediction": "Will DropOut",
        "Insights": "..."
    }));

    assert_eq!(record.student_name, "Asha");
    assert_eq!(record.prediction, PredictionLabel::WillDropOut);
    assert_eq!(record.insights_text, "...");
}

#[test]
fn test_second_page_of_twelve() {
    let records = mixed_records();

    let page = paginate(&records, 2, 5);
    let ids: Vec<&str> = page
        .iter()
        .filter_map(|r| r.student_id.as_deref())
        .collect();

    assert_eq!(ids, vec!["5", "6", "7", "8", "9"]);
    assert_eq!(total_pages(records.len(), 5), 3);
    assert_eq!(paginate(&records, 3, 5).len(), 2);
    assert!(paginate(&records, 4, 5).is_empty());
}

#[test]
fn test_cursor_navigation_out_of_range_is_noop() {
    let records = mixed_records();
    let mut cursor = PageCursor::new(5);
    cursor.set_total_items(records.len());

    assert!(!cursor.previous_page());
    assert!(!cursor.go_to_page(0));
    assert!(cursor.go_to_page(3));
    assert!(!cursor.next_page());
    assert_eq!(cursor.page(), 3);
    assert_eq!(cursor.slice(&records).len(), 2);

    // 件数が減ってページが範囲外になったら先頭へ戻る
    cursor.set_total_items(4);
    assert_eq!(cursor.page(), 1);
}

#[test]
fn test_export_files_by_extension() {
    let temp_dir = TempDir::new().unwrap();
    let manager = ExportManager::new();

    let trends = [
        MonthlyTrend {
            month_index: 1,
            dropout_count: 2,
            continue_count: 5,
        },
        MonthlyTrend {
            month_index: 2,
            dropout_count: 1,
            continue_count: 7,
        },
    ];
    let trend_table = ExportTable::from_records(&trends, &trend_columns());

    let csv_path = temp_dir.path().join("trends.csv");
    let format = manager.export_to_file(&trend_table, &csv_path).unwrap();
    assert_eq!(format, ExportFormat::Csv);
    let written = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(
        written,
        "\"Month\",\"Dropout Predictions\",\"Continue Predictions\"\n\"Jan\",\"2\",\"5\"\n\"Feb\",\"1\",\"7\""
    );

    let records = vec![PredictionRecord::new("Asha", PredictionLabel::WillDropOut)
        .with_student_id("007")
        .with_insights("Struggling. Key Risk Factors:\n• Fees\n• Distance\nRecommendations:\nBursary.")];
    let report_table = ExportTable::from_records(&records, &report_columns());
    assert_eq!(report_table.rows[0][4], "Fees; Distance");
    assert_eq!(report_table.rows[0][5], "Bursary.");

    let xlsx_path = temp_dir.path().join("report.XLSX");
    let format = manager.export_to_file(&report_table, &xlsx_path).unwrap();
    assert_eq!(format, ExportFormat::Excel);
    let bytes = std::fs::read(&xlsx_path).unwrap();
    assert_eq!(&bytes[..2], b"PK");
}

#[test]
fn test_export_rejects_unknown_extension() {
    let temp_dir = TempDir::new().unwrap();
    let manager = ExportManager::new();
    let table = ExportTable::from_records(&mixed_records(), &report_columns());

    let path = temp_dir.path().join("report.pdf");
    assert!(manager.export_to_file(&table, &path).is_err());
    assert!(!path.exists());
}
