//! CSV読み書き
//!
//! ダブルクォート囲み・`""` エスケープ・フィールド内改行に対応

use super::{CellValue, Dataset};
use crate::error::{PredictorError, Result};

/// CSVのレコード1件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRecord {
    /// レコードの開始行（1始まり）
    pub line: usize,
    pub fields: Vec<String>,
}

/// CSV文字列をレコード列に分解
pub fn parse_records(content: &str) -> Result<Vec<Vec<String>>> {
    Ok(parse_lines(content)?.into_iter().map(|r| r.fields).collect())
}

/// CSV文字列を開始行付きのレコード列に分解
pub fn parse_lines(content: &str) -> Result<Vec<CsvRecord>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_start = 1;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(CsvRecord {
                    line: record_start,
                    fields: std::mem::take(&mut record),
                });
                line += 1;
                record_start = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(PredictorError::CsvParse {
            line,
            message: "閉じられていない引用符".into(),
        });
    }

    // 最終行（改行なしで終わる場合）
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(CsvRecord {
            line: record_start,
            fields: record,
        });
    }

    Ok(records)
}

/// CSV文字列をDatasetに変換（1行目は見出し）
pub fn parse_dataset(content: &str) -> Result<Dataset> {
    let mut records = parse_lines(content)?.into_iter();
    let headers = records.next().map(|r| r.fields).unwrap_or_default();

    let mut rows = Vec::new();
    let mut row_lines = Vec::new();
    for CsvRecord { line, fields: record } in records {
        // 空行はスキップ
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        if record.len() > headers.len() {
            return Err(PredictorError::CsvParse {
                line,
                message: format!("列数が見出し（{}列）より多い: {}列", headers.len(), record.len()),
            });
        }
        row_lines.push(line);
        rows.push(
            record
                .into_iter()
                .map(|f| if f.is_empty() { CellValue::Empty } else { CellValue::Text(f) })
                .collect(),
        );
    }

    Ok(Dataset::with_row_lines(headers, rows, row_lines))
}

/// DatasetをCSV文字列に変換
pub fn to_csv_string(dataset: &Dataset) -> String {
    let mut out = String::new();
    write_record(&mut out, dataset.headers.iter().map(|h| h.as_str().into()));
    for row in &dataset.rows {
        write_record(
            &mut out,
            row.iter().map(|c| c.as_text().unwrap_or_default().into()),
        );
    }
    out
}

fn write_record<'a, I>(out: &mut String, fields: I)
where
    I: Iterator<Item = std::borrow::Cow<'a, str>>,
{
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape_field(&field));
    }
    out.push_str("\r\n");
}

fn escape_field(field: &str) -> std::borrow::Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\"")).into()
    } else {
        field.into()
    }
}
