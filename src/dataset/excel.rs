//! ワークブックの読み書き
//!
//! 読み込みは calamine（xlsx/xls/ods）、書き出しは rust_xlsxwriter（xlsx）

use super::{CellValue, Dataset};
use crate::error::{PredictorError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;

const OUTPUT_SHEET_NAME: &str = "Predictions";

/// ワークブックの1シートを読み込み（省略時は先頭シート）
pub fn read_workbook(path: &Path, sheet: Option<&str>) -> Result<Dataset> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_names = workbook.sheet_names();

    let sheet_name = match sheet {
        Some(name) => sheet_names
            .iter()
            .find(|s| s.as_str() == name)
            .cloned()
            .ok_or_else(|| PredictorError::SheetNotFound(name.to_string()))?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| PredictorError::EmptyDataset(path.display().to_string()))?,
    };

    let range = workbook.worksheet_range(&sheet_name)?;
    // 範囲は最初の非空セルから始まる（0始まりの行位置）
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let mut rows = range.rows();

    let headers = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .map(|c| convert_cell(c).as_text().unwrap_or_default())
            .collect(),
        None => return Err(PredictorError::EmptyDataset(sheet_name)),
    };

    let rows: Vec<Vec<CellValue>> = rows
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();
    let row_lines = (0..rows.len()).map(|i| first_row + i + 2).collect();

    Ok(Dataset::with_row_lines(headers, rows, row_lines))
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
        // ISO文字列の日付（ods）・エラー値は表示文字列のまま引き継ぐ
        other => CellValue::Text(other.to_string()),
    }
}

/// Datasetをxlsxで書き出し
pub fn write_workbook(path: &Path, dataset: &Dataset) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(OUTPUT_SHEET_NAME)?;

    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let datetime_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    for (col, header) in dataset.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, column(col)?, header, &header_format)?;
    }

    for (i, row) in dataset.rows.iter().enumerate() {
        let r = u32::try_from(i + 1)
            .map_err(|_| PredictorError::UnsupportedFormat(format!("行数が多すぎます: {}", i + 1)))?;
        for (col, cell) in row.iter().enumerate() {
            let c = column(col)?;
            match cell {
                CellValue::Empty => {}
                CellValue::Text(s) => {
                    worksheet.write_string(r, c, s)?;
                }
                CellValue::Number(n) => {
                    worksheet.write_number(r, c, *n)?;
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean(r, c, *b)?;
                }
                CellValue::DateTime(serial) => {
                    let format = if serial.fract() == 0.0 { &date_format } else { &datetime_format };
                    worksheet.write_number_with_format(r, c, *serial, format)?;
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

fn column(index: usize) -> Result<u16> {
    u16::try_from(index)
        .map_err(|_| PredictorError::UnsupportedFormat(format!("列数が多すぎます: {}", index + 1)))
}
