use thiserror::Error;

#[derive(Error, Debug)]
pub enum PredictorError {
    #[error(transparent)]
    Common(#[from] systype_common::Error),

    #[error("設定エラー: {0}")]
    Config(String),

    #[error("モデルが指定されていません。`--model` か `systype config --set-model PATH` で指定してください")]
    MissingModel,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("シートが見つかりません: {0}")]
    SheetNotFound(String),

    #[error("列が見つかりません: {0}")]
    ColumnNotFound(String),

    #[error("未対応のファイル形式: {0}")]
    UnsupportedFormat(String),

    #[error("入力データが空です: {0}")]
    EmptyDataset(String),

    #[error("CSV解析エラー（{line}行目）: {message}")]
    CsvParse { line: usize, message: String },

    #[error("Excel読み込みエラー: {0}")]
    ExcelRead(#[from] calamine::Error),

    #[error("Excel生成エラー: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("モデルファイルが不正: {0}")]
    ModelArtifact(String),

    #[error("{row}行目の予測に失敗: {source}")]
    Record {
        row: usize,
        #[source]
        source: Box<PredictorError>,
    },

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PredictorError>;
