//! 表形式データの入出力
//!
//! - `.csv` はCSVとして読み書き
//! - それ以外はワークブック（xlsx/xls/ods）として読み込み、xlsxで書き出し

pub mod csv;
pub mod excel;

use crate::error::{PredictorError, Result};
use std::path::Path;

/// セルの値
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// 日付・時刻（Excelのシリアル値）
    DateTime(f64),
}

impl CellValue {
    /// 文字列として取得（空セルはNone）
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::Bool(b) => Some(if *b { "TRUE".into() } else { "FALSE".into() }),
            CellValue::DateTime(serial) => Some(format_excel_serial(*serial)),
        }
    }
}

/// Excelのシリアル値を ISO 形式の文字列に変換（時刻部分が無ければ日付のみ）
pub fn format_excel_serial(serial: f64) -> String {
    // 1900年うるう年バグを含むため 1899-12-30 起点
    let epoch = chrono::NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0));
    let millis = (serial * 86_400_000.0).round();
    let datetime = epoch.and_then(|e| {
        e.checked_add_signed(chrono::Duration::milliseconds(millis as i64))
    });

    match datetime {
        Some(dt) if serial.fract() == 0.0 => dt.format("%Y-%m-%d").to_string(),
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => serial.to_string(),
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

/// ファイル形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Workbook,
}

impl DataFormat {
    pub fn from_path(path: &Path) -> Self {
        let is_csv = path
            .extension()
            .map(|e| e.to_string_lossy().eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if is_csv {
            DataFormat::Csv
        } else {
            DataFormat::Workbook
        }
    }
}

/// 見出し行＋データ行
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    /// 各データ行のファイル上の行番号（1始まり、見出し行を含む）
    row_lines: Vec<usize>,
}

impl Dataset {
    /// 見出しが1行目、データが2行目から隙間なく続くものとして生成
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let row_lines = (0..rows.len()).map(|i| i + 2).collect();
        Self {
            headers,
            rows,
            row_lines,
        }
    }

    /// 行番号を指定して生成（空行の読み飛ばしや複数行セルがある場合）
    pub fn with_row_lines(
        headers: Vec<String>,
        rows: Vec<Vec<CellValue>>,
        row_lines: Vec<usize>,
    ) -> Self {
        debug_assert_eq!(rows.len(), row_lines.len());
        Self {
            headers,
            rows,
            row_lines,
        }
    }

    /// データ行のファイル上の行番号
    pub fn row_number(&self, row: usize) -> usize {
        self.row_lines.get(row).copied().unwrap_or(row + 2)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 列名から列番号を取得（前後の空白は無視）
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name.trim())
    }

    /// 候補の中で最初に見つかった列番号
    pub fn resolve_column(&self, candidates: &[&str]) -> Result<usize> {
        candidates
            .iter()
            .find_map(|name| self.column_index(name))
            .ok_or_else(|| PredictorError::ColumnNotFound(candidates.join(" / ")))
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// 指定セルを文字列で取得（欠損・空セルはNone）
    pub fn text(&self, row: usize, col: usize) -> Option<String> {
        self.cell(row, col).and_then(|c| c.as_text())
    }

    /// 列を末尾に追加（短い行は見出し数まで空セルで埋める）
    pub fn append_column(&mut self, header: &str, values: Vec<CellValue>) {
        let width = self.headers.len();
        self.headers.push(header.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            if row.len() < width {
                row.resize(width, CellValue::Empty);
            }
            row.push(value);
        }
    }
}

/// ファイルを読み込み
pub fn read_dataset(path: &Path, sheet: Option<&str>) -> Result<Dataset> {
    if !path.exists() {
        return Err(PredictorError::FileNotFound(path.display().to_string()));
    }

    match DataFormat::from_path(path) {
        DataFormat::Csv => {
            let content = std::fs::read_to_string(path)?;
            csv::parse_dataset(&content)
        }
        DataFormat::Workbook => excel::read_workbook(path, sheet),
    }
}

/// ファイルへ書き出し
pub fn write_dataset(path: &Path, dataset: &Dataset) -> Result<()> {
    match DataFormat::from_path(path) {
        DataFormat::Csv => {
            std::fs::write(path, csv::to_csv_string(dataset))?;
            Ok(())
        }
        DataFormat::Workbook => {
            let is_xlsx = path
                .extension()
                .map(|e| e.to_string_lossy().eq_ignore_ascii_case("xlsx"))
                .unwrap_or(false);
            if !is_xlsx {
                return Err(PredictorError::UnsupportedFormat(path.display().to_string()));
            }
            excel::write_workbook(path, dataset)
        }
    }
}
