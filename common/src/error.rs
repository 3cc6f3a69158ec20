//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// 確率ベクトルの長さがラベルインデックスと一致しない
    #[error("Shape mismatch: probability vector has {actual} entries, label index has {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// ラベルインデックスに存在しない位置
    #[error("Unknown label index: {index} (label index size {size})")]
    UnknownLabelIndex { index: usize, size: usize },

    #[error("Invalid label index: {0}")]
    InvalidLabelIndex(String),

    #[error("Invalid probability for '{label}': {value}")]
    InvalidProbability { label: String, value: f64 },

    #[error("Invalid threshold for '{label}': {value}")]
    InvalidThreshold { label: String, value: f64 },

    #[error("Invalid rule table: {0}")]
    InvalidRuleTable(String),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
