//! バッチ処理
//!
//! レコードごとに 名称正規化 → 分類器 → 融合エンジン を適用する。
//! レコード間に依存は無いので rayon で並列化し、入力順のまま結果を返す

use crate::classifier::Classifier;
use crate::dataset::{CellValue, Dataset};
use crate::error::{PredictorError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use systype_common::{normalize_name, FusionEngine, PredictionResult};

pub const PREDICTED_COLUMN: &str = "Predicted System Type";
pub const CONFIDENCE_COLUMN: &str = "Confidence Score";

/// バッチオプション
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// 並列数（Noneはrayonの既定）
    pub jobs: Option<usize>,
    /// 進捗バーを表示
    pub show_progress: bool,
}

/// バッチの集計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub records: usize,
    /// 1件以上のラベルが付いたレコード数
    pub labelled: usize,
    /// "None" になったレコード数
    pub fallback: usize,
    pub total_labels: usize,
}

impl BatchSummary {
    fn from_predictions(predictions: &[PredictionResult]) -> Self {
        let labelled = predictions.iter().filter(|p| !p.is_empty()).count();
        Self {
            records: predictions.len(),
            labelled,
            fallback: predictions.len() - labelled,
            total_labels: predictions.iter().map(|p| p.labels.len()).sum(),
        }
    }
}

/// 1レコードを予測
pub fn predict_one(
    raw_name: Option<&str>,
    classifier: &dyn Classifier,
    engine: &FusionEngine,
) -> Result<PredictionResult> {
    let name = normalize_name(raw_name);
    let probs = classifier.predict_proba(&name)?;
    Ok(engine.predict(&name, &probs)?)
}

/// 名称の列を一括予測（結果は入力順）
///
/// エラー時の行番号は見出し行の直後から連続しているものとみなす
pub fn predict_names(
    names: &[Option<String>],
    classifier: &dyn Classifier,
    engine: &FusionEngine,
    options: &BatchOptions,
) -> Result<Vec<PredictionResult>> {
    predict_rows(names, &|i| i + 2, classifier, engine, options)
}

/// `row_number` はレコード位置からシート上の行番号を返す
fn predict_rows(
    names: &[Option<String>],
    row_number: &(dyn Fn(usize) -> usize + Sync),
    classifier: &dyn Classifier,
    engine: &FusionEngine,
    options: &BatchOptions,
) -> Result<Vec<PredictionResult>> {
    if classifier.label_index() != engine.label_index() {
        return Err(PredictorError::ModelArtifact(
            "分類器と融合エンジンのラベルインデックスが一致しません".into(),
        ));
    }

    let progress = if options.show_progress {
        let pb = ProgressBar::new(names.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let run = || {
        names
            .par_iter()
            .enumerate()
            .map(|(i, name)| {
                let result = predict_one(name.as_deref(), classifier, engine).map_err(|e| {
                    PredictorError::Record {
                        row: row_number(i),
                        source: Box::new(e),
                    }
                });
                progress.inc(1);
                result
            })
            .collect::<Result<Vec<_>>>()
    };

    let predictions = match options.jobs {
        Some(jobs) => rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .map_err(|e| PredictorError::Config(format!("スレッドプール生成エラー: {}", e)))?
            .install(run),
        None => run(),
    };

    progress.finish_and_clear();
    let predictions = predictions?;

    tracing::debug!(records = predictions.len(), "バッチ予測完了");
    Ok(predictions)
}

/// Datasetを予測し、2列を末尾に追加
pub fn predict_dataset(
    dataset: &mut Dataset,
    name_columns: &[&str],
    classifier: &dyn Classifier,
    engine: &FusionEngine,
    options: &BatchOptions,
) -> Result<BatchSummary> {
    let column = dataset.resolve_column(name_columns)?;
    tracing::info!(
        column = %dataset.headers[column],
        records = dataset.len(),
        "名称列を検出"
    );

    let names: Vec<Option<String>> = (0..dataset.len())
        .map(|row| dataset.text(row, column))
        .collect();
    let missing = names.iter().filter(|n| n.is_none()).count();
    if missing > 0 {
        tracing::warn!(missing, "名称が空のレコードは空文字として処理します");
    }

    let row_number = |i: usize| dataset.row_number(i);
    let predictions = predict_rows(&names, &row_number, classifier, engine, options)?;
    let summary = BatchSummary::from_predictions(&predictions);

    let (types, scores): (Vec<CellValue>, Vec<CellValue>) = predictions
        .iter()
        .map(|p| {
            (
                CellValue::Text(p.predicted_system_type()),
                CellValue::Text(p.confidence_score()),
            )
        })
        .unzip();
    dataset.append_column(PREDICTED_COLUMN, types);
    dataset.append_column(CONFIDENCE_COLUMN, scores);

    Ok(summary)
}
