//! 融合エンジン
//!
//! キーワードルール → 含意ルール → 確率しきい値 の順に適用し、
//! 1レコード分のラベル集合と信頼度ログを生成する。
//!
//! ## 処理フロー
//! 1. `RulesApplied`: キーワードルール
//! 2. `ImplicationsApplied`: 含意ルール
//! 3. `ModelApplied`: 確率しきい値（追加のみ、既存ラベルは削除しない）
//! 4. `Finalized`: モデル由来ラベルへの含意ルール再適用、文字列化
//!    （空なら "None" / 低信頼度メッセージ）

use crate::error::Result;
use crate::implication::ImplicationRules;
use crate::keyword::KeywordRuleTable;
use crate::threshold::{model_event, ThresholdTable};
use crate::types::{LabelIndex, LabelSet, PredictionResult, ProbabilityVector};
use serde::{Deserialize, Serialize};

/// 融合処理の段階
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionStage {
    Init,
    RulesApplied,
    ImplicationsApplied,
    ModelApplied,
    Finalized,
}

impl std::fmt::Display for FusionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FusionStage::Init => write!(f, "init"),
            FusionStage::RulesApplied => write!(f, "rules"),
            FusionStage::ImplicationsApplied => write!(f, "implications"),
            FusionStage::ModelApplied => write!(f, "model"),
            FusionStage::Finalized => write!(f, "finalized"),
        }
    }
}

/// モデル段階のイベント記録方針
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelEventPolicy {
    /// しきい値を満たすたびに記録（ルールで付与済みのラベルでも記録する）
    #[default]
    EveryHit,
    /// 新規に追加されたラベルのみ記録
    NewLabelsOnly,
}

impl std::str::FromStr for ModelEventPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "every_hit" | "all" => Ok(ModelEventPolicy::EveryHit),
            "new_labels_only" | "new" => Ok(ModelEventPolicy::NewLabelsOnly),
            _ => Err(format!("Unknown event policy: {}. Use every-hit or new-labels-only", s)),
        }
    }
}

/// 段階ごとのラベル集合の記録
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSnapshot {
    pub stage: FusionStage,
    pub labels: LabelSet,
    /// この段階で追加されたイベント数
    pub new_events: usize,
}

/// 融合処理の経過
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionTrace {
    pub stages: Vec<StageSnapshot>,
    pub result: PredictionResult,
}

impl FusionTrace {
    /// 指定段階のラベル集合
    pub fn labels_at(&self, stage: FusionStage) -> Option<&LabelSet> {
        self.stages.iter().find(|s| s.stage == stage).map(|s| &s.labels)
    }
}

/// 融合エンジン（生成後は不変、スレッド間で共有可能）
#[derive(Debug, Clone)]
pub struct FusionEngine {
    rules: KeywordRuleTable,
    implications: ImplicationRules,
    thresholds: ThresholdTable,
    label_index: LabelIndex,
    event_policy: ModelEventPolicy,
}

impl FusionEngine {
    pub fn new(
        rules: KeywordRuleTable,
        implications: ImplicationRules,
        thresholds: ThresholdTable,
        label_index: LabelIndex,
    ) -> Self {
        Self {
            rules,
            implications,
            thresholds,
            label_index,
            event_policy: ModelEventPolicy::default(),
        }
    }

    /// 組み込みのルール・しきい値で生成
    pub fn with_builtin_tables(label_index: LabelIndex) -> Self {
        Self::new(
            KeywordRuleTable::builtin(),
            ImplicationRules::builtin(),
            ThresholdTable::builtin(),
            label_index,
        )
    }

    pub fn with_event_policy(mut self, policy: ModelEventPolicy) -> Self {
        self.event_policy = policy;
        self
    }

    pub fn rules(&self) -> &KeywordRuleTable {
        &self.rules
    }

    pub fn implications(&self) -> &ImplicationRules {
        &self.implications
    }

    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    pub fn label_index(&self) -> &LabelIndex {
        &self.label_index
    }

    pub fn event_policy(&self) -> ModelEventPolicy {
        self.event_policy
    }

    /// 1レコードを予測
    ///
    /// # Arguments
    /// * `name` - 小文字化済みの事業所名
    /// * `probs` - ラベルインデックス順の確率ベクトル
    pub fn predict(&self, name: &str, probs: &[f64]) -> Result<PredictionResult> {
        self.run(name, probs, None)
    }

    /// 段階ごとのラベル集合を記録しながら予測
    pub fn explain(&self, name: &str, probs: &[f64]) -> Result<FusionTrace> {
        let mut stages = Vec::new();
        let result = self.run(name, probs, Some(&mut stages))?;
        Ok(FusionTrace { stages, result })
    }

    fn run(
        &self,
        name: &str,
        probs: &[f64],
        mut trace: Option<&mut Vec<StageSnapshot>>,
    ) -> Result<PredictionResult> {
        // 形状不一致はルール適用前に検出する
        let vector = ProbabilityVector::new(&self.label_index, probs)?;

        let mut labels = LabelSet::new();
        let mut events = Vec::new();
        let mut record = |stage: FusionStage, labels: &LabelSet, before: usize, after: usize| {
            if let Some(stages) = trace.as_deref_mut() {
                stages.push(StageSnapshot {
                    stage,
                    labels: labels.clone(),
                    new_events: after - before,
                });
            }
        };

        record(FusionStage::Init, &labels, 0, 0);

        self.rules.apply(name, &mut labels, &mut events);
        record(FusionStage::RulesApplied, &labels, 0, events.len());

        let before = events.len();
        self.implications.apply(&mut labels, &mut events);
        record(FusionStage::ImplicationsApplied, &labels, before, events.len());

        let before = events.len();
        for (label, prob) in self.thresholds.hits(&vector)? {
            let added = labels.insert(label);
            if added || self.event_policy == ModelEventPolicy::EveryHit {
                events.push(model_event(label, prob));
            }
        }
        record(FusionStage::ModelApplied, &labels, before, events.len());

        // モデルが付与したラベルにも含意を閉じる
        let before = events.len();
        self.implications.apply(&mut labels, &mut events);
        record(FusionStage::Finalized, &labels, before, events.len());

        Ok(PredictionResult {
            labels: labels.into_vec(),
            confidence_log: events,
        })
    }
}
