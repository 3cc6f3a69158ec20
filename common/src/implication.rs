//! ラベル含意ルール
//!
//! 「ラベルAがあればラベルBも付与する」固定ルールを順に適用する

use crate::error::{Error, Result};
use crate::types::LabelSet;
use serde::{Deserialize, Serialize};

/// 含意ルール1件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplicationRule {
    pub trigger: String,
    pub implied: String,
}

impl ImplicationRule {
    pub fn new(trigger: &str, implied: &str) -> Self {
        Self {
            trigger: trigger.to_string(),
            implied: implied.to_string(),
        }
    }
}

/// 含意ルールの一覧（並び順に適用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImplicationRules {
    rules: Vec<ImplicationRule>,
}

impl ImplicationRules {
    pub fn new(rules: Vec<ImplicationRule>) -> Result<Self> {
        for rule in &rules {
            if rule.trigger.is_empty() || rule.implied.is_empty() {
                return Err(Error::InvalidRuleTable("implication with empty label".into()));
            }
            if rule.trigger == rule.implied {
                return Err(Error::InvalidRuleTable(format!(
                    "implication '{}' implies itself",
                    rule.trigger
                )));
            }
        }
        Ok(Self { rules })
    }

    /// 組み込みルール（フード清掃 ⇒ フード消火設備）
    pub fn builtin() -> Self {
        Self {
            rules: vec![ImplicationRule::new(
                "Commercial Hood Cleaning",
                "Commercial Hood Suppression",
            )],
        }
    }

    /// JSON文字列から読み込み
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: Self = serde_json::from_str(json)?;
        Self::new(parsed.rules)
    }

    /// JSONファイルから読み込み
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn rules(&self) -> &[ImplicationRule] {
        &self.rules
    }

    /// ラベル集合に含意ルールを適用。新規に追加したラベルのみイベントを記録
    pub fn apply(&self, labels: &mut LabelSet, events: &mut Vec<String>) {
        for rule in &self.rules {
            if labels.contains(&rule.trigger) && labels.insert(&rule.implied) {
                events.push(format!(
                    "{}: Added due to presence of {}",
                    rule.implied, rule.trigger
                ));
            }
        }
    }
}

impl Default for ImplicationRules {
    fn default() -> Self {
        Self::builtin()
    }
}
