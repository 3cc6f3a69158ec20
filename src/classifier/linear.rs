//! 線形テキスト分類モデル（TF-IDF + 線形層）

use super::tfidf::TfidfVectorizer;
use super::{fingerprint, Classifier};
use crate::error::{PredictorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use systype_common::LabelIndex;

/// スコア → 確率の変換
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Link {
    /// 多クラス（合計1）
    #[default]
    Softmax,
    /// ラベルごとに独立したシグモイド
    Logistic,
    /// シグモイド後に合計1へ正規化（one-vs-rest）
    LogisticNormalized,
}

/// 線形層の重み
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearWeights {
    /// ラベル数 × 特徴量数（2クラスの場合は1行でも可）
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
    #[serde(default)]
    pub link: Link,
}

/// モデルファイルの構造
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// ラベルエンコーダのクラス（インデックス順）
    pub labels: LabelIndex,
    pub vectorizer: TfidfVectorizer,
    pub model: LinearWeights,
}

/// 読み込み済みの線形テキスト分類モデル
#[derive(Debug, Clone)]
pub struct LinearTextModel {
    artifact: ModelArtifact,
    fingerprint: String,
}

impl LinearTextModel {
    /// モデルファイルを読み込み
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PredictorError::FileNotFound(path.display().to_string()));
        }
        let bytes = std::fs::read(path)?;
        Self::from_slice(&bytes)
    }

    /// JSONバイト列から読み込み
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let artifact: ModelArtifact = serde_json::from_slice(bytes)
            .map_err(|e| PredictorError::ModelArtifact(format!("JSON解析エラー: {}", e)))?;
        Self::from_artifact(artifact, fingerprint(bytes))
    }

    /// 構造を検証して生成
    pub fn from_artifact(artifact: ModelArtifact, fingerprint: String) -> Result<Self> {
        artifact
            .vectorizer
            .validate()
            .map_err(PredictorError::ModelArtifact)?;

        let n_labels = artifact.labels.len();
        let n_features = artifact.vectorizer.n_features();
        let weights = &artifact.model;
        let rows = weights.coefficients.len();

        if n_labels < 2 {
            return Err(PredictorError::ModelArtifact(format!(
                "ラベル数が不足しています: {}",
                n_labels
            )));
        }
        let binary = n_labels == 2 && rows == 1;
        if rows != n_labels && !binary {
            return Err(PredictorError::ModelArtifact(format!(
                "係数の行数 {} がラベル数 {} と一致しません",
                rows, n_labels
            )));
        }
        if weights.intercepts.len() != rows {
            return Err(PredictorError::ModelArtifact(format!(
                "切片の数 {} が係数の行数 {} と一致しません",
                weights.intercepts.len(),
                rows
            )));
        }
        if let Some((i, row)) = weights
            .coefficients
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != n_features)
        {
            return Err(PredictorError::ModelArtifact(format!(
                "係数{}行目の長さ {} が特徴量数 {} と一致しません",
                i,
                row.len(),
                n_features
            )));
        }

        Ok(Self {
            artifact,
            fingerprint,
        })
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn vocabulary_size(&self) -> usize {
        self.artifact.vectorizer.vocabulary.len()
    }

    pub fn link(&self) -> Link {
        self.artifact.model.link
    }

    fn scores(&self, features: &[(usize, f64)]) -> Vec<f64> {
        let weights = &self.artifact.model;
        weights
            .coefficients
            .iter()
            .zip(&weights.intercepts)
            .map(|(row, intercept)| {
                intercept + features.iter().map(|&(j, x)| row[j] * x).sum::<f64>()
            })
            .collect()
    }
}

impl Classifier for LinearTextModel {
    fn label_index(&self) -> &LabelIndex {
        &self.artifact.labels
    }

    fn predict_proba(&self, text: &str) -> Result<Vec<f64>> {
        let features = self.artifact.vectorizer.transform(text);
        let scores = self.scores(&features);

        // 2クラスで1行のみの場合は正例側の確率から補完
        if scores.len() == 1 {
            let p = sigmoid(scores[0]);
            return Ok(vec![1.0 - p, p]);
        }

        Ok(match self.artifact.model.link {
            Link::Softmax => softmax(&scores),
            Link::Logistic => scores.iter().map(|&s| sigmoid(s)).collect(),
            Link::LogisticNormalized => {
                let probs: Vec<f64> = scores.iter().map(|&s| sigmoid(s)).collect();
                let total: f64 = probs.iter().sum();
                probs.iter().map(|p| p / total).collect()
            }
        })
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.iter().map(|e| e / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact_json(link: &str) -> String {
        format!(
            r#"{{
                "labels": ["Fire Alarm", "Fire Sprinkler", "Kitchen Hood"],
                "vectorizer": {{
                    "vocabulary": {{"bank": 0, "warehouse": 1, "pizza": 2}},
                    "idf": [1.0, 1.0, 1.0]
                }},
                "model": {{
                    "coefficients": [[4.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 4.0]],
                    "intercepts": [0.0, 0.0, 0.0],
                    "link": "{}"
                }}
            }}"#,
            link
        )
    }

    #[test]
    fn test_softmax_probabilities_sum_to_one() {
        let model = LinearTextModel::from_slice(artifact_json("softmax").as_bytes()).unwrap();
        let probs = model.predict_proba("First National Bank").unwrap();
        assert_eq!(probs.len(), 3);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(probs[0] > probs[1] && probs[0] > probs[2]);
    }

    #[test]
    fn test_logistic_is_independent() {
        let model = LinearTextModel::from_slice(artifact_json("logistic").as_bytes()).unwrap();
        let probs = model.predict_proba("unknown words").unwrap();
        for p in probs {
            assert!((p - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_logistic_normalized() {
        let model =
            LinearTextModel::from_slice(artifact_json("logistic_normalized").as_bytes()).unwrap();
        let probs = model.predict_proba("pizza warehouse").unwrap();
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!((probs[1] - probs[2]).abs() < 1e-12);
    }

    #[test]
    fn test_binary_single_row() {
        let json = r#"{
            "labels": ["No", "Yes"],
            "vectorizer": {"vocabulary": {"bank": 0}, "idf": [1.0]},
            "model": {"coefficients": [[0.0]], "intercepts": [0.0]}
        }"#;
        let model = LinearTextModel::from_slice(json.as_bytes()).unwrap();
        let probs = model.predict_proba("bank").unwrap();
        assert_eq!(probs, vec![0.5, 0.5]);
    }

    #[test]
    fn test_shape_errors() {
        let json = r#"{
            "labels": ["A", "B", "C"],
            "vectorizer": {"vocabulary": {"bank": 0}, "idf": [1.0]},
            "model": {"coefficients": [[1.0], [1.0]], "intercepts": [0.0, 0.0]}
        }"#;
        let err = LinearTextModel::from_slice(json.as_bytes()).unwrap_err();
        assert!(matches!(err, PredictorError::ModelArtifact(_)));

        let json = r#"{
            "labels": ["A", "B"],
            "vectorizer": {"vocabulary": {"bank": 0}, "idf": [1.0]},
            "model": {"coefficients": [[1.0, 2.0], [1.0]], "intercepts": [0.0, 0.0]}
        }"#;
        assert!(LinearTextModel::from_slice(json.as_bytes()).is_err());
    }

    #[test]
    fn test_invalid_json() {
        let err = LinearTextModel::from_slice(b"{ invalid }").unwrap_err();
        assert!(matches!(err, PredictorError::ModelArtifact(_)));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let json = artifact_json("softmax");
        let a = LinearTextModel::from_slice(json.as_bytes()).unwrap();
        let b = LinearTextModel::from_slice(json.as_bytes()).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }
}
