//! systype-predictor
//!
//! 表形式データの事業所名にシステム種別を付与するバッチドライバ。
//! 判定ロジックは `systype-common`、ここでは入出力・分類器・設定を扱う

pub mod batch;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod logging;
