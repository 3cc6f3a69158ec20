use crate::error::{PredictorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use systype_common::{
    FusionEngine, ImplicationRules, KeywordRuleTable, LabelIndex, ModelEventPolicy, ThresholdTable,
};

const MODEL_ENV: &str = "SYSTYPE_MODEL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 事業所名の列名
    pub name_column: String,
    /// 事業所名の列が無い場合の代替列名
    pub fallback_name_column: Option<String>,
    /// 読み込むシート名（省略時は先頭シート）
    pub sheet: Option<String>,
    /// モデルファイル（JSON）
    pub model_path: Option<PathBuf>,
    /// キーワードルール表（省略時は組み込み）
    pub rules_path: Option<PathBuf>,
    /// 含意ルール（省略時は組み込み）
    pub implications_path: Option<PathBuf>,
    pub general_threshold: f64,
    pub label_thresholds: BTreeMap<String, f64>,
    pub event_policy: ModelEventPolicy,
    /// 並列数（省略時はCPU数）
    pub jobs: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        let thresholds = ThresholdTable::builtin();
        Self {
            name_column: "Business Name".into(),
            fallback_name_column: Some("Premise Name".into()),
            sheet: None,
            model_path: None,
            rules_path: None,
            implications_path: None,
            general_threshold: thresholds.general(),
            label_thresholds: thresholds.overrides().clone(),
            event_policy: ModelEventPolicy::default(),
            jobs: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| PredictorError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("systype").join("config.json"))
    }

    /// モデルパスを取得（環境変数を優先）
    pub fn model_path(&self) -> Result<PathBuf> {
        if let Ok(path) = std::env::var(MODEL_ENV) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }

        self.model_path.clone().ok_or(PredictorError::MissingModel)
    }

    pub fn set_model(&mut self, path: PathBuf) -> Result<()> {
        self.model_path = Some(path);
        self.save()
    }

    pub fn set_general_threshold(&mut self, value: f64) -> Result<()> {
        // 範囲検証
        ThresholdTable::new(value, BTreeMap::new())?;
        self.general_threshold = value;
        self.save()
    }

    pub fn thresholds(&self) -> Result<ThresholdTable> {
        Ok(ThresholdTable::new(
            self.general_threshold,
            self.label_thresholds.clone(),
        )?)
    }

    pub fn keyword_rules(&self) -> Result<KeywordRuleTable> {
        match &self.rules_path {
            Some(path) => Ok(KeywordRuleTable::from_file(path)?),
            None => Ok(KeywordRuleTable::builtin()),
        }
    }

    pub fn implication_rules(&self) -> Result<ImplicationRules> {
        match &self.implications_path {
            Some(path) => Ok(ImplicationRules::from_file(path)?),
            None => Ok(ImplicationRules::builtin()),
        }
    }

    /// 設定の各表から融合エンジンを構築
    pub fn build_engine(&self, label_index: LabelIndex) -> Result<FusionEngine> {
        let thresholds = self.thresholds()?;
        for label in thresholds.unknown_labels(&label_index) {
            tracing::warn!(label, "モデルに存在しないラベルのしきい値は使われません");
        }

        Ok(FusionEngine::new(
            self.keyword_rules()?,
            self.implication_rules()?,
            thresholds,
            label_index,
        )
        .with_event_policy(self.event_policy))
    }

    /// 名称列の候補（優先順）
    pub fn name_columns(&self) -> Vec<&str> {
        let mut columns = vec![self.name_column.as_str()];
        if let Some(fallback) = &self.fallback_name_column {
            columns.push(fallback.as_str());
        }
        columns
    }
}
