//! 共通型定義
//!
//! ラベル集合・ラベルインデックス・確率ベクトル・予測結果

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// ラベルが1件も付かなかった場合の出力
pub const NO_SYSTEM_TYPE: &str = "None";

/// ラベルが1件も付かなかった場合の信頼度メッセージ
pub const LOW_CONFIDENCE_MESSAGE: &str = "Low confidence - No system type added";

/// 名称の正規化（欠損は空文字、それ以外は小文字化）
pub fn normalize_name(raw: Option<&str>) -> String {
    raw.map(|s| s.to_lowercase()).unwrap_or_default()
}

/// 挿入順を保持する重複なしラベル集合
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// ラベルを追加。新規追加ならtrue
    pub fn insert(&mut self, label: &str) -> bool {
        if self.contains(label) {
            return false;
        }
        self.labels.push(label.to_string());
        true
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|s| s.as_str())
    }

    /// selfがotherの全ラベルを含むか
    pub fn is_superset(&self, other: &LabelSet) -> bool {
        other.iter().all(|l| self.contains(l))
    }

    pub fn into_vec(self) -> Vec<String> {
        self.labels
    }
}

/// ラベルエンコーダ（インデックス → ラベル名）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct LabelIndex {
    labels: Vec<String>,
}

impl LabelIndex {
    pub fn new(labels: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::new();
        for label in &labels {
            if label.is_empty() {
                return Err(Error::InvalidLabelIndex("empty label name".into()));
            }
            if !seen.insert(label.as_str()) {
                return Err(Error::InvalidLabelIndex(format!("duplicate label '{}'", label)));
            }
        }
        Ok(Self { labels })
    }

    /// インデックスからラベル名を取得
    pub fn label(&self, index: usize) -> Result<&str> {
        self.labels
            .get(index)
            .map(|s| s.as_str())
            .ok_or(Error::UnknownLabelIndex {
                index,
                size: self.labels.len(),
            })
    }

    /// ラベル名からインデックスを取得
    pub fn position(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl TryFrom<Vec<String>> for LabelIndex {
    type Error = Error;

    fn try_from(labels: Vec<String>) -> Result<Self> {
        Self::new(labels)
    }
}

impl From<LabelIndex> for Vec<String> {
    fn from(index: LabelIndex) -> Self {
        index.labels
    }
}

/// 1レコード分の確率ベクトル（ラベルインデックスと対応付け済み）
#[derive(Debug, Clone, Copy)]
pub struct ProbabilityVector<'a> {
    index: &'a LabelIndex,
    probs: &'a [f64],
}

impl<'a> ProbabilityVector<'a> {
    /// 長さと値域を検証して生成
    pub fn new(index: &'a LabelIndex, probs: &'a [f64]) -> Result<Self> {
        if probs.len() != index.len() {
            return Err(Error::ShapeMismatch {
                expected: index.len(),
                actual: probs.len(),
            });
        }
        for (i, &p) in probs.iter().enumerate() {
            if !(0.0..=1.0).contains(&p) {
                return Err(Error::InvalidProbability {
                    label: index.label(i)?.to_string(),
                    value: p,
                });
            }
        }
        Ok(Self { index, probs })
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    /// (ラベル, 確率) をインデックス順に返す
    pub fn entries(&self) -> Result<Vec<(&'a str, f64)>> {
        self.probs
            .iter()
            .enumerate()
            .map(|(i, &p)| Ok((self.index.label(i)?, p)))
            .collect()
    }
}

/// 1レコード分の予測結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    /// 付与されたラベル（初回追加順）
    pub labels: Vec<String>,
    /// 追加イベントの記録（発生順）
    pub confidence_log: Vec<String>,
}

impl PredictionResult {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `Predicted System Type` 列の値
    pub fn predicted_system_type(&self) -> String {
        if self.labels.is_empty() {
            NO_SYSTEM_TYPE.to_string()
        } else {
            self.labels.join(",")
        }
    }

    /// `Confidence Score` 列の値
    pub fn confidence_score(&self) -> String {
        if self.labels.is_empty() {
            LOW_CONFIDENCE_MESSAGE.to_string()
        } else {
            self.confidence_log.join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(labels: &[&str]) -> LabelIndex {
        LabelIndex::new(labels.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name(Some("ABC Apartments LLC")), "abc apartments llc");
        assert_eq!(normalize_name(None), "");
        assert_eq!(normalize_name(Some("")), "");
    }

    #[test]
    fn test_label_set_keeps_first_insertion_order() {
        let mut set = LabelSet::new();
        assert!(set.insert("B"));
        assert!(set.insert("A"));
        assert!(!set.insert("B"));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["B", "A"]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_label_set_superset() {
        let mut small = LabelSet::new();
        small.insert("A");
        let mut big = small.clone();
        big.insert("B");
        assert!(big.is_superset(&small));
        assert!(!small.is_superset(&big));
    }

    #[test]
    fn test_label_index_rejects_duplicates() {
        let result = LabelIndex::new(vec!["A".into(), "A".into()]);
        assert!(matches!(result, Err(Error::InvalidLabelIndex(_))));
    }

    #[test]
    fn test_label_index_lookup() {
        let idx = index(&["Fire Alarm", "Fire Sprinkler"]);
        assert_eq!(idx.label(1).unwrap(), "Fire Sprinkler");
        assert_eq!(idx.position("Fire Alarm"), Some(0));
        assert!(matches!(
            idx.label(2),
            Err(Error::UnknownLabelIndex { index: 2, size: 2 })
        ));
    }

    #[test]
    fn test_label_index_from_json() {
        let idx: LabelIndex = serde_json::from_str(r#"["A", "B"]"#).unwrap();
        assert_eq!(idx.len(), 2);
        assert!(serde_json::from_str::<LabelIndex>(r#"["A", "A"]"#).is_err());
    }

    #[test]
    fn test_probability_vector_shape_mismatch() {
        let idx = index(&["A", "B", "C"]);
        let probs = [0.1, 0.2];
        let result = ProbabilityVector::new(&idx, &probs);
        assert!(matches!(
            result,
            Err(Error::ShapeMismatch { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_probability_vector_out_of_range() {
        let idx = index(&["A", "B"]);
        assert!(ProbabilityVector::new(&idx, &[0.1, 1.5]).is_err());
        assert!(ProbabilityVector::new(&idx, &[f64::NAN, 0.1]).is_err());
    }

    #[test]
    fn test_probability_vector_entries() {
        let idx = index(&["A", "B"]);
        let probs = [0.25, 0.75];
        let vector = ProbabilityVector::new(&idx, &probs).unwrap();
        assert_eq!(vector.entries().unwrap(), vec![("A", 0.25), ("B", 0.75)]);
    }

    #[test]
    fn test_prediction_result_fallback() {
        let result = PredictionResult::default();
        assert_eq!(result.predicted_system_type(), "None");
        assert_eq!(result.confidence_score(), "Low confidence - No system type added");
    }

    #[test]
    fn test_prediction_result_rendering() {
        let result = PredictionResult {
            labels: vec!["Fire Alarm System".into(), "Sprinkler 5 Year".into()],
            confidence_log: vec![
                "Fire Alarm System: Rule-based".into(),
                "Sprinkler 5 Year: 0.40".into(),
            ],
        };
        assert_eq!(result.predicted_system_type(), "Fire Alarm System,Sprinkler 5 Year");
        assert_eq!(
            result.confidence_score(),
            "Fire Alarm System: Rule-based, Sprinkler 5 Year: 0.40"
        );
    }
}
