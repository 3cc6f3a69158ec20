//! キーワードルールエンジン
//!
//! 事業所名に含まれる部分文字列からシステム種別を判定する。
//! 単語境界は見ない単純な部分一致（"bar" は "barber" にも一致する）

use crate::error::{Error, Result};
use crate::types::LabelSet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const FIRE_ALARM: &str = "Fire Alarm System";
const FIRE_SPRINKLER: &str = "Fire Sprinkler System";
const SPRINKLER_5_YEAR: &str = "Sprinkler 5 Year";
const HOOD_CLEANING: &str = "Commercial Hood Cleaning";
const HOOD_SUPPRESSION: &str = "Commercial Hood Suppression";

/// カテゴリ1件（ラベル群と表記バリエーションの組）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCategory {
    /// カテゴリキー（例: "apartment"）
    pub key: String,
    /// 一致時に付与するラベル（順序あり）
    pub labels: Vec<String>,
    /// 一致判定に使う部分文字列（小文字）
    #[serde(default)]
    pub variations: Vec<String>,
}

impl KeywordCategory {
    fn new(key: &str, labels: &[&str], variations: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            labels: labels.iter().map(|s| s.to_string()).collect(),
            variations: variations.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// いずれかのバリエーションが名称に含まれるか
    pub fn matches(&self, name: &str) -> bool {
        self.variations.iter().any(|v| name.contains(v.as_str()))
    }
}

/// キーワードルール表（評価順はカテゴリの並び順）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<KeywordCategory>", into = "Vec<KeywordCategory>")]
pub struct KeywordRuleTable {
    categories: Vec<KeywordCategory>,
}

impl KeywordRuleTable {
    /// 検証してルール表を生成
    pub fn new(categories: Vec<KeywordCategory>) -> Result<Self> {
        let mut keys = HashSet::new();
        for category in &categories {
            if category.key.is_empty() {
                return Err(Error::InvalidRuleTable("empty category key".into()));
            }
            if !keys.insert(category.key.as_str()) {
                return Err(Error::InvalidRuleTable(format!(
                    "duplicate category '{}'",
                    category.key
                )));
            }
            if category.labels.is_empty() {
                return Err(Error::InvalidRuleTable(format!(
                    "category '{}' has no labels",
                    category.key
                )));
            }
            for variation in &category.variations {
                if variation.is_empty() {
                    return Err(Error::InvalidRuleTable(format!(
                        "category '{}' has an empty variation",
                        category.key
                    )));
                }
                // 名称は小文字化済みなので大文字を含むバリエーションは一致しない
                if variation.chars().any(|c| c.is_uppercase()) {
                    return Err(Error::InvalidRuleTable(format!(
                        "variation '{}' in category '{}' must be lower-case",
                        variation, category.key
                    )));
                }
            }
        }
        Ok(Self { categories })
    }

    /// JSON文字列から読み込み
    pub fn from_json(json: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(json)?;
        Ok(table)
    }

    /// JSONファイルから読み込み
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// 組み込みルール表
    pub fn builtin() -> Self {
        let standard = [FIRE_ALARM, FIRE_SPRINKLER, SPRINKLER_5_YEAR];
        let kitchen = [FIRE_ALARM, FIRE_SPRINKLER, HOOD_CLEANING, HOOD_SUPPRESSION];

        Self {
            categories: vec![
                KeywordCategory::new("apartment", &standard, &["apartments", "apartment", "apts"]),
                KeywordCategory::new("building", &standard, &["building", "bldg"]),
                KeywordCategory::new(
                    "assisted living",
                    &[FIRE_ALARM, FIRE_SPRINKLER, SPRINKLER_5_YEAR, HOOD_CLEANING, HOOD_SUPPRESSION],
                    &["assisted", "assisted living"],
                ),
                KeywordCategory::new(
                    "auto",
                    &[FIRE_SPRINKLER, FIRE_ALARM],
                    &[
                        "auto service", "collision", "auto center", "collision center",
                        "auto body", "automotive", "auto repair",
                    ],
                ),
                KeywordCategory::new(
                    "bank",
                    &[FIRE_ALARM],
                    &["bank", "credit union", "financial", "atm"],
                ),
                KeywordCategory::new(
                    "food",
                    &[HOOD_CLEANING, HOOD_SUPPRESSION],
                    &[
                        "burger", "taco", "mexican", "bar", "grill", "grille", "pizza",
                        "pizzeria", "food", "cafe", "café", "restaurant", "panera bread",
                        "smokehouse",
                    ],
                ),
                KeywordCategory::new("church", &kitchen, &["church", "faith", "chapel", "worship"]),
                KeywordCategory::new(
                    "care",
                    &kitchen,
                    &["care", "assisted living", "nursing home", "senior center"],
                ),
                KeywordCategory::new("shop", &standard, &["shop", "store", "market"]),
                KeywordCategory::new(
                    "store",
                    &standard,
                    &[
                        "shop", "store", "market", "outlet", "complex", "plaza", "staples",
                        "gamestop", "cvs pharmacy", "gas",
                    ],
                ),
                KeywordCategory::new("market", &standard, &["shop", "store", "market", "mart"]),
                KeywordCategory::new(
                    "school",
                    &kitchen,
                    &["school", "high school", "middle school", "elementary", "academy"],
                ),
                KeywordCategory::new("hotel", &standard, &["hotel", "motel", "inn", "stay"]),
                KeywordCategory::new("group home", &standard, &["senior center", "group home"]),
            ],
        }
    }

    pub fn categories(&self) -> &[KeywordCategory] {
        &self.categories
    }

    /// 名称（小文字化済み）にルールを適用し、(ラベル集合, 追加イベント) を返す
    pub fn match_name(&self, name: &str) -> (LabelSet, Vec<String>) {
        let mut labels = LabelSet::new();
        let mut events = Vec::new();
        self.apply(name, &mut labels, &mut events);
        (labels, events)
    }

    /// 既存の集合に対してルールを適用（融合エンジン用）
    pub(crate) fn apply(&self, name: &str, labels: &mut LabelSet, events: &mut Vec<String>) {
        for category in self.categories.iter().filter(|c| c.matches(name)) {
            for label in &category.labels {
                if labels.insert(label) {
                    events.push(format!("{}: Rule-based", label));
                }
            }
        }
    }
}

impl Default for KeywordRuleTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TryFrom<Vec<KeywordCategory>> for KeywordRuleTable {
    type Error = Error;

    fn try_from(categories: Vec<KeywordCategory>) -> Result<Self> {
        Self::new(categories)
    }
}

impl From<KeywordRuleTable> for Vec<KeywordCategory> {
    fn from(table: KeywordRuleTable) -> Self {
        table.categories
    }
}
