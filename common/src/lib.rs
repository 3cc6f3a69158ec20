//! System Type Prediction Core
//!
//! キーワードルールと確率モデルの2系統のシグナルを統合し、
//! レコードごとの説明可能なマルチラベル予測を生成する。
//! I/Oは行わない（バッチ処理・入出力はCLI側の責務）

pub mod error;
pub mod types;
pub mod keyword;
pub mod implication;
pub mod threshold;
pub mod fusion;

pub use error::{Error, Result};
pub use types::{
    normalize_name, LabelIndex, LabelSet, PredictionResult, ProbabilityVector,
    LOW_CONFIDENCE_MESSAGE, NO_SYSTEM_TYPE,
};
pub use keyword::{KeywordCategory, KeywordRuleTable};
pub use implication::{ImplicationRule, ImplicationRules};
pub use threshold::ThresholdTable;
pub use fusion::{FusionEngine, FusionStage, FusionTrace, ModelEventPolicy};
