//! 確率しきい値ポリシー
//!
//! ラベル別しきい値（未指定は一般しきい値）以上の確率を持つラベルを採用する

use crate::error::{Error, Result};
use crate::types::{LabelIndex, LabelSet, ProbabilityVector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 一般しきい値
pub const DEFAULT_GENERAL_THRESHOLD: f64 = 0.28;

/// "Fire Sprinkler" 用のしきい値
pub const DEFAULT_FIRE_SPRINKLER_THRESHOLD: f64 = 0.48;

/// しきい値表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholdTable")]
pub struct ThresholdTable {
    general: f64,
    overrides: BTreeMap<String, f64>,
}

/// 検証前のしきい値表（JSON読み込み用）
#[derive(Deserialize)]
struct RawThresholdTable {
    general: f64,
    #[serde(default)]
    overrides: BTreeMap<String, f64>,
}

impl TryFrom<RawThresholdTable> for ThresholdTable {
    type Error = Error;

    fn try_from(raw: RawThresholdTable) -> Result<Self> {
        Self::new(raw.general, raw.overrides)
    }
}

impl ThresholdTable {
    pub fn new(general: f64, overrides: BTreeMap<String, f64>) -> Result<Self> {
        validate("general", general)?;
        for (label, &value) in &overrides {
            validate(label, value)?;
        }
        Ok(Self { general, overrides })
    }

    /// 組み込みしきい値
    pub fn builtin() -> Self {
        let mut overrides = BTreeMap::new();
        overrides.insert("Fire Sprinkler".to_string(), DEFAULT_FIRE_SPRINKLER_THRESHOLD);
        Self {
            general: DEFAULT_GENERAL_THRESHOLD,
            overrides,
        }
    }

    pub fn general(&self) -> f64 {
        self.general
    }

    pub fn overrides(&self) -> &BTreeMap<String, f64> {
        &self.overrides
    }

    /// ラベルインデックスに存在しない個別しきい値のラベル
    pub fn unknown_labels<'a>(&'a self, index: &LabelIndex) -> Vec<&'a str> {
        self.overrides
            .keys()
            .map(String::as_str)
            .filter(|label| index.position(label).is_none())
            .collect()
    }

    /// ラベルに適用されるしきい値
    pub fn threshold_for(&self, label: &str) -> f64 {
        self.overrides.get(label).copied().unwrap_or(self.general)
    }

    /// しきい値を満たした (ラベル, 確率) をインデックス順に返す
    pub fn hits<'a>(&self, probs: &ProbabilityVector<'a>) -> Result<Vec<(&'a str, f64)>> {
        Ok(probs
            .entries()?
            .into_iter()
            .filter(|&(label, prob)| prob >= self.threshold_for(label))
            .collect())
    }

    /// 確率ベクトルから (ラベル集合, 追加イベント) を生成
    pub fn select(&self, probs: &ProbabilityVector<'_>) -> Result<(LabelSet, Vec<String>)> {
        let mut labels = LabelSet::new();
        let mut events = Vec::new();
        for (label, prob) in self.hits(probs)? {
            labels.insert(label);
            events.push(model_event(label, prob));
        }
        Ok((labels, events))
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// モデル由来のイベント文字列（確率は小数第2位まで）
pub(crate) fn model_event(label: &str, prob: f64) -> String {
    format!("{}: {:.2}", label, prob)
}

fn validate(label: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidThreshold {
            label: label.to_string(),
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> LabelIndex {
        LabelIndex::new(vec![
            "Fire Alarm".to_string(),
            "Fire Sprinkler".to_string(),
            "Kitchen Hood".to_string(),
        ])
        .unwrap()
    }

    #[test]
    fn test_threshold_for() {
        let table = ThresholdTable::builtin();
        assert_eq!(table.threshold_for("Fire Sprinkler"), 0.48);
        assert_eq!(table.threshold_for("Fire Alarm"), 0.28);
        assert_eq!(table.threshold_for("Unlisted"), 0.28);
    }

    #[test]
    fn test_select_uses_label_specific_threshold() {
        let idx = index();
        let probs = [0.30, 0.40, 0.10];
        let vector = ProbabilityVector::new(&idx, &probs).unwrap();
        let (labels, events) = ThresholdTable::builtin().select(&vector).unwrap();

        assert_eq!(labels.iter().collect::<Vec<_>>(), vec!["Fire Alarm"]);
        assert_eq!(events, vec!["Fire Alarm: 0.30"]);
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let idx = index();
        let probs = [0.28, 0.48, 0.0];
        let vector = ProbabilityVector::new(&idx, &probs).unwrap();
        let (labels, _) = ThresholdTable::builtin().select(&vector).unwrap();
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn test_one_ulp_below_is_excluded() {
        let idx = index();
        let below_general = f64::from_bits(0.28f64.to_bits() - 1);
        let below_sprinkler = f64::from_bits(0.48f64.to_bits() - 1);
        let probs = [below_general, below_sprinkler, 0.0];
        let vector = ProbabilityVector::new(&idx, &probs).unwrap();
        let (labels, events) = ThresholdTable::builtin().select(&vector).unwrap();
        assert!(labels.is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn test_probability_formatting() {
        let idx = index();
        let probs = [0.0, 0.51, 0.999];
        let vector = ProbabilityVector::new(&idx, &probs).unwrap();
        let (_, events) = ThresholdTable::builtin().select(&vector).unwrap();
        assert_eq!(events, vec!["Fire Sprinkler: 0.51", "Kitchen Hood: 1.00"]);
    }

    #[test]
    fn test_invalid_threshold() {
        assert!(ThresholdTable::new(1.2, BTreeMap::new()).is_err());
        let mut overrides = BTreeMap::new();
        overrides.insert("X".to_string(), -0.1);
        assert!(matches!(
            ThresholdTable::new(0.3, overrides),
            Err(Error::InvalidThreshold { .. })
        ));
    }

    #[test]
    fn test_deserialize_validates_range() {
        let table: ThresholdTable =
            serde_json::from_str(r#"{"general": 0.3, "overrides": {"Fire Sprinkler": 0.5}}"#).unwrap();
        assert_eq!(table.threshold_for("Fire Sprinkler"), 0.5);

        let no_overrides: ThresholdTable = serde_json::from_str(r#"{"general": 0.3}"#).unwrap();
        assert!(no_overrides.overrides().is_empty());

        assert!(serde_json::from_str::<ThresholdTable>(r#"{"general": 1.5}"#).is_err());
        assert!(serde_json::from_str::<ThresholdTable>(
            r#"{"general": 0.3, "overrides": {"Fire Alarm": -0.2}}"#
        )
        .is_err());
    }

    #[test]
    fn test_unknown_labels() {
        let mut overrides = BTreeMap::new();
        overrides.insert("Fire Sprinkler".to_string(), 0.5);
        overrides.insert("Fire Sprinker".to_string(), 0.5);
        let table = ThresholdTable::new(0.28, overrides).unwrap();

        assert_eq!(table.unknown_labels(&index()), vec!["Fire Sprinker"]);
        assert!(ThresholdTable::builtin().unknown_labels(&index()).is_empty());
    }
}
