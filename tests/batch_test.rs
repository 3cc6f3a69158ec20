//! バッチ処理テスト
//!
//! 入力順の保持・エラー伝播・2列の追加を検証

use std::collections::HashMap;
use systype_common::{FusionEngine, LabelIndex};
use systype_predictor::batch::{
    predict_dataset, predict_names, BatchOptions, BatchSummary, CONFIDENCE_COLUMN,
    PREDICTED_COLUMN,
};
use systype_predictor::classifier::Classifier;
use systype_predictor::dataset::{csv, CellValue, Dataset};
use systype_predictor::error::{PredictorError, Result};

/// 名称ごとに固定の確率を返す分類器
struct StaticClassifier {
    index: LabelIndex,
    table: HashMap<String, Vec<f64>>,
    default: Vec<f64>,
}

impl StaticClassifier {
    fn new() -> Self {
        let index = LabelIndex::new(vec!["Fire Alarm System".into(), "Fire Sprinkler".into()]).unwrap();
        let mut table = HashMap::new();
        table.insert("abc apartments llc".to_string(), vec![0.1, 0.51]);
        table.insert("warehouse 9".to_string(), vec![0.6, 0.2]);
        // 長さ不一致
        table.insert("broken".to_string(), vec![0.6]);
        Self {
            index,
            table,
            default: vec![0.0, 0.0],
        }
    }
}

impl Classifier for StaticClassifier {
    fn label_index(&self) -> &LabelIndex {
        &self.index
    }

    fn predict_proba(&self, text: &str) -> Result<Vec<f64>> {
        Ok(self.table.get(text).cloned().unwrap_or_else(|| self.default.clone()))
    }
}

fn setup() -> (StaticClassifier, FusionEngine) {
    let classifier = StaticClassifier::new();
    let engine = FusionEngine::with_builtin_tables(classifier.index.clone());
    (classifier, engine)
}

fn text(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

#[test]
fn test_results_keep_input_order() {
    let (classifier, engine) = setup();
    let names: Vec<Option<String>> = (0..200)
        .map(|i| match i % 3 {
            0 => Some("ABC Apartments LLC".to_string()),
            1 => Some("Warehouse 9".to_string()),
            _ => None,
        })
        .collect();

    let options = BatchOptions {
        jobs: Some(4),
        show_progress: false,
    };
    let predictions = predict_names(&names, &classifier, &engine, &options).unwrap();

    assert_eq!(predictions.len(), 200);
    for (i, p) in predictions.iter().enumerate() {
        match i % 3 {
            0 => assert_eq!(p.labels.len(), 4),
            1 => assert_eq!(p.labels, vec!["Fire Alarm System"]),
            _ => assert_eq!(p.predicted_system_type(), "None"),
        }
    }
}

#[test]
fn test_shape_mismatch_names_the_row() {
    let (classifier, engine) = setup();
    let names = vec![Some("zz".to_string()), Some("BROKEN".to_string())];

    let err = predict_names(&names, &classifier, &engine, &BatchOptions::default()).unwrap_err();
    match err {
        PredictorError::Record { row, source } => {
            assert_eq!(row, 3);
            assert!(matches!(
                *source,
                PredictorError::Common(systype_common::Error::ShapeMismatch { expected: 2, actual: 1 })
            ));
        }
        other => panic!("Record error expected: {:?}", other),
    }
}

#[test]
fn test_label_index_mismatch_is_rejected() {
    let (classifier, _) = setup();
    let engine = FusionEngine::with_builtin_tables(
        LabelIndex::new(vec!["Other".into(), "Labels".into()]).unwrap(),
    );
    let err = predict_names(&[None], &classifier, &engine, &BatchOptions::default()).unwrap_err();
    assert!(matches!(err, PredictorError::ModelArtifact(_)));
}

#[test]
fn test_record_error_reports_csv_line_after_blank_line() {
    let (classifier, engine) = setup();
    let mut dataset = csv::parse_dataset("Business Name\nok\n\nbroken\n").unwrap();

    let err = predict_dataset(
        &mut dataset,
        &["Business Name"],
        &classifier,
        &engine,
        &BatchOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, PredictorError::Record { row: 4, .. }), "{:?}", err);
}

#[test]
fn test_record_error_reports_line_after_multiline_field() {
    let (classifier, engine) = setup();
    let mut dataset =
        csv::parse_dataset("Id,Business Name\n1,\"Joe's\nPizza\"\n2,broken\n").unwrap();

    let err = predict_dataset(
        &mut dataset,
        &["Business Name"],
        &classifier,
        &engine,
        &BatchOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, PredictorError::Record { row: 4, .. }), "{:?}", err);
}

#[test]
fn test_predict_dataset_appends_columns() {
    let (classifier, engine) = setup();
    let mut dataset = Dataset::new(
        vec!["Id".into(), "Business Name".into()],
        vec![
            vec![CellValue::Number(1.0), text("ABC Apartments LLC")],
            vec![CellValue::Number(2.0), text("Joe's Pizza")],
            vec![CellValue::Number(3.0)],
        ],
    );

    let summary = predict_dataset(
        &mut dataset,
        &["Business Name", "Premise Name"],
        &classifier,
        &engine,
        &BatchOptions::default(),
    )
    .unwrap();

    assert_eq!(
        summary,
        BatchSummary {
            records: 3,
            labelled: 2,
            fallback: 1,
            total_labels: 6,
        }
    );
    assert_eq!(dataset.headers, vec!["Id", "Business Name", PREDICTED_COLUMN, CONFIDENCE_COLUMN]);

    // 元の列はそのまま
    assert_eq!(dataset.rows[0][0], CellValue::Number(1.0));
    assert_eq!(
        dataset.rows[1][2],
        text("Commercial Hood Cleaning,Commercial Hood Suppression")
    );
    assert_eq!(dataset.rows[2][1], CellValue::Empty);
    assert_eq!(dataset.rows[2][2], text("None"));
    assert_eq!(dataset.rows[2][3], text("Low confidence - No system type added"));
}

#[test]
fn test_predict_dataset_uses_fallback_column() {
    let (classifier, engine) = setup();
    let mut dataset = Dataset::new(
        vec!["Premise Name".into()],
        vec![vec![text("First National Bank")]],
    );
    predict_dataset(
        &mut dataset,
        &["Business Name", "Premise Name"],
        &classifier,
        &engine,
        &BatchOptions::default(),
    )
    .unwrap();
    assert_eq!(dataset.rows[0][1], text("Fire Alarm System"));
    assert_eq!(dataset.rows[0][2], text("Fire Alarm System: Rule-based"));
}

#[test]
fn test_predict_dataset_missing_column() {
    let (classifier, engine) = setup();
    let mut dataset = Dataset::new(vec!["Address".into()], vec![]);
    let err = predict_dataset(
        &mut dataset,
        &["Business Name"],
        &classifier,
        &engine,
        &BatchOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, PredictorError::ColumnNotFound(_)));
}
