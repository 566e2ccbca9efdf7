//! レスポンス正規化
//!
//! バックエンドには歴史的経緯で複数のフィールド命名が混在している
//! （`Student_Name` / `student_name`、`ML Prediction` / `ML_Prediction` など）。
//! ここで単一の厳密な内部型に変換し、揺れを取り込み境界の外に出さない。

use serde_json::{Map, Value};

use super::{
    MonthlyTrend, PredictionLabel, PredictionRecord, StatsSnapshot, UNKNOWN_PREDICTION,
    UNKNOWN_STUDENT,
};

const STUDENT_NAME_KEYS: &[&str] = &["student_name", "Student_Name", "Student Name", "name"];
const PREDICTION_KEYS: &[&str] = &["prediction", "ML_Prediction", "ML Prediction"];
const INSIGHTS_KEYS: &[&str] = &["insights", "Insights"];
const SIMILAR_STUDENTS_KEYS: &[&str] = &["similar_students", "Similar_Students", "Similar Students"];
const STUDENT_ID_KEYS: &[&str] = &["student_id", "Student_ID", "id"];
const CLASS_NAME_KEYS: &[&str] = &["class_name", "Class_Name", "class"];
const PREDICTED_DATE_KEYS: &[&str] = &["predicted_date", "predictedDate"];

/// 1件の生レコードを正規化
///
/// オブジェクト以外が渡された場合もエラーにはせず、センチネル値で埋める。
pub fn normalize_record(raw: &Value) -> PredictionRecord {
    let Some(fields) = raw.as_object() else {
        tracing::warn!("⚠️ Prediction entry is not an object, using sentinels");
        return PredictionRecord::new(
            UNKNOWN_STUDENT,
            PredictionLabel::Unrecognized(UNKNOWN_PREDICTION.to_string()),
        );
    };

    let student_name =
        first_text(fields, STUDENT_NAME_KEYS).unwrap_or_else(|| UNKNOWN_STUDENT.to_string());
    let prediction = first_text(fields, PREDICTION_KEYS)
        .map(|raw| PredictionLabel::parse(&raw))
        .unwrap_or_else(|| PredictionLabel::Unrecognized(UNKNOWN_PREDICTION.to_string()));

    PredictionRecord {
        student_name,
        student_id: first_text(fields, STUDENT_ID_KEYS),
        class_name: first_text(fields, CLASS_NAME_KEYS),
        prediction,
        insights_text: first_text(fields, INSIGHTS_KEYS).unwrap_or_default(),
        similar_students: first_array(fields, SIMILAR_STUDENTS_KEYS),
        predicted_date: first_text(fields, PREDICTED_DATE_KEYS),
    }
}

/// レコード配列を正規化（サーバーの順序を保持）
///
/// `None` / `null` は空配列として扱う。
pub fn normalize_records(raw: Option<&Value>) -> Vec<PredictionRecord> {
    match raw {
        Some(Value::Array(items)) => items.iter().map(normalize_record).collect(),
        None | Some(Value::Null) => Vec::new(),
        Some(other) => {
            tracing::warn!(
                kind = json_kind(other),
                "⚠️ Expected an array of predictions, ignoring payload"
            );
            Vec::new()
        }
    }
}

/// `/stats` ペイロードから集計値を取り出す
pub fn normalize_stats(payload: &Value) -> StatsSnapshot {
    let monthly_trends = match payload.get("monthly_trends") {
        Some(Value::Array(entries)) => entries.iter().filter_map(normalize_trend).collect(),
        _ => Vec::new(),
    };

    StatsSnapshot {
        total_students: number_u64(payload.get("total_students")),
        dropout_rate_percent: number_f64(payload.get("dropout_rate")),
        continue_rate_percent: number_f64(payload.get("continue_rate")),
        predictions_made: number_u64(payload.get("predictions_made")),
        monthly_trends,
    }
}

fn normalize_trend(entry: &Value) -> Option<MonthlyTrend> {
    let month = number_u64(entry.get("month"));
    if !(1..=12).contains(&month) {
        tracing::warn!(month, "⚠️ Dropping monthly trend with invalid month");
        return None;
    }

    Some(MonthlyTrend {
        month_index: month as u8,
        dropout_count: number_u64(entry.get("dropout_count")),
        continue_count: number_u64(entry.get("continue_count")),
    })
}

/// 候補キーを優先順に探し、最初の空でないテキストを返す
fn first_text(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match fields.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn first_array(fields: &Map<String, Value>, keys: &[&str]) -> Vec<Value> {
    keys.iter()
        .find_map(|key| fields.get(*key)?.as_array().cloned())
        .unwrap_or_default()
}

fn number_u64(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn number_f64(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
