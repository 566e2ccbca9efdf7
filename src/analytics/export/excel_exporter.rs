use super::{ExportError, ExportTable, FormatHandler};
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, XlsxError};

/// Excel形式エクスポーター
pub struct ExcelExporter {
    sheet_name: String,
    cell_formatting: bool,
}

impl ExcelExporter {
    pub fn new() -> Self {
        Self {
            sheet_name: "Predictions".to_string(),
            cell_formatting: true,
        }
    }

    pub fn with_sheet_name(mut self, sheet_name: impl Into<String>) -> Self {
        self.sheet_name = sheet_name.into();
        self
    }

    pub fn with_cell_formatting(mut self, cell_formatting: bool) -> Self {
        self.cell_formatting = cell_formatting;
        self
    }

    /// ワークブックを作成してデータを書き込み
    fn create_workbook(&self, table: &ExportTable) -> Result<Vec<u8>, ExportError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet().set_name(&self.sheet_name)?;

        let header_format = Format::new()
            .set_bold()
            .set_background_color(Color::RGB(0x4472C4))
            .set_font_color(Color::White)
            .set_border(FormatBorder::Thin);

        for (col, header) in table.headers.iter().enumerate() {
            if self.cell_formatting {
                worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
            } else {
                worksheet.write_string(0, col as u16, header)?;
            }
        }

        for (row, values) in table.rows.iter().enumerate() {
            let row_idx = (row + 1) as u32;
            for (col, value) in values.iter().enumerate() {
                match numeric_cell(table.is_numeric_column(col), value) {
                    Some(number) => {
                        worksheet.write_number(row_idx, col as u16, number)?;
                    }
                    None => {
                        worksheet.write_string(row_idx, col as u16, value)?;
                    }
                }
            }
        }

        if self.cell_formatting {
            for col in 0..table.headers.len() {
                worksheet.set_column_width(col as u16, 20)?;
            }
        }

        let buffer = workbook
            .save_to_buffer()
            .map_err(|e| ExportError::Serialization(format!("Excel generation failed: {}", e)))?;

        Ok(buffer)
    }
}

impl Default for ExcelExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatHandler for ExcelExporter {
    fn export(&self, table: &ExportTable) -> Result<Vec<u8>, ExportError> {
        tracing::debug!(
            rows = table.rows.len(),
            sheet = %self.sheet_name,
            "📗 Building Excel workbook"
        );
        self.create_workbook(table)
    }

    fn file_extension(&self) -> &str {
        "xlsx"
    }
}

/// 数値列のセルだけを数値として解釈する
///
/// 文字列列は値が数字に見えても変換しない（`1E3`のようなIDを保つ）。
fn numeric_cell(numeric_column: bool, value: &str) -> Option<f64> {
    if !numeric_column {
        return None;
    }
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}

// XlsxErrorをExportErrorに変換
impl From<XlsxError> for ExportError {
    fn from(error: XlsxError) -> Self {
        ExportError::Serialization(format!("Excel error: {}", error))
    }
}
