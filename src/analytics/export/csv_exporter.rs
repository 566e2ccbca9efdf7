use super::{ExportColumn, ExportError, ExportTable, FormatHandler};

/// CSV形式エクスポーター
///
/// ヘッダーを含む全フィールドをダブルクォートで囲む。
/// 行区切りは`\n`、末尾に改行は付けない。
pub struct CsvExporter {
    delimiter: char,
}

impl CsvExporter {
    pub fn new() -> Self {
        Self { delimiter: ',' }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// CSVフィールドをエスケープ
    fn escape_csv_field(field: &str) -> String {
        format!("\"{}\"", field.replace('"', "\"\""))
    }

    fn render_line(&self, fields: &[String]) -> String {
        fields
            .iter()
            .map(|f| Self::escape_csv_field(f))
            .collect::<Vec<_>>()
            .join(&self.delimiter.to_string())
    }

    /// 表をCSV文字列に変換
    pub fn render(&self, table: &ExportTable) -> String {
        std::iter::once(self.render_line(&table.headers))
            .chain(table.rows.iter().map(|row| self.render_line(row)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatHandler for CsvExporter {
    fn export(&self, table: &ExportTable) -> Result<Vec<u8>, ExportError> {
        Ok(self.render(table).into_bytes())
    }

    fn file_extension(&self) -> &str {
        "csv"
    }
}

/// レコードを列定義に従ってCSV文字列に変換
pub fn to_csv<T>(records: &[T], columns: &[ExportColumn<T>]) -> String {
    CsvExporter::new().render(&ExportTable::from_records(records, columns))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        name: &'static str,
        note: &'static str,
    }

    fn columns() -> Vec<ExportColumn<Row>> {
        vec![
            ExportColumn::new("Name", |r: &Row| r.name.to_string()),
            ExportColumn::new("Note", |r: &Row| r.note.to_string()),
        ]
    }

    #[test]
    fn test_every_field_is_quoted() {
        let rows = [Row { name: "Asha", note: "ok" }];
        assert_eq!(to_csv(&rows, &columns()), "\"Name\",\"Note\"\n\"Asha\",\"ok\"");
    }

    #[test]
    fn test_quotes_are_doubled() {
        let rows = [Row {
            name: "A \"B\"",
            note: "x,y\nz",
        }];
        let csv = to_csv(&rows, &columns());
        assert_eq!(csv, "\"Name\",\"Note\"\n\"A \"\"B\"\"\",\"x,y\nz\"");
    }

    #[test]
    fn test_header_only_without_records() {
        let rows: [Row; 0] = [];
        let csv = to_csv(&rows, &columns());
        assert_eq!(csv, "\"Name\",\"Note\"");
        assert!(!csv.ends_with('\n'));
    }

    #[test]
    fn test_custom_delimiter() {
        let table = ExportTable {
            headers: vec!["a".to_string(), "b".to_string()],
            ..ExportTable::default()
        };
        let csv = CsvExporter::new().with_delimiter(';').render(&table);
        assert_eq!(csv, "\"a\";\"b\"");
    }

    #[test]
    fn test_deterministic_output() {
        let rows = [Row { name: "Asha", note: "ok" }, Row { name: "Bo", note: "" }];
        assert_eq!(to_csv(&rows, &columns()), to_csv(&rows, &columns()));
    }
}
