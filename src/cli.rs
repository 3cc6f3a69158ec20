use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use systype_common::ModelEventPolicy;

#[derive(Parser)]
#[command(name = "systype")]
#[command(about = "事業所名からシステム種別を予測（キーワードルール＋確率モデル）", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 表形式データ（xlsx/xls/ods/csv）にシステム種別の2列を追加
    Predict {
        /// 入力ファイル
        #[arg(required = true)]
        input: PathBuf,

        /// 出力ファイル（デフォルト: 入力名_predictions.xlsx / .csv）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// モデルファイル（JSON）
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// 事業所名の列名
        #[arg(short, long)]
        column: Option<String>,

        /// シート名
        #[arg(long)]
        sheet: Option<String>,

        /// キーワードルール表（JSON）
        #[arg(long)]
        rules: Option<PathBuf>,

        /// 含意ルール（JSON）
        #[arg(long)]
        implications: Option<PathBuf>,

        /// 並列数
        #[arg(short, long)]
        jobs: Option<usize>,

        /// モデル段階のイベント記録 (every-hit/new-labels-only)
        #[arg(long)]
        event_policy: Option<ModelEventPolicy>,

        /// 進捗バーを表示しない
        #[arg(short, long)]
        quiet: bool,
    },

    /// 1件の名称について判定経過を表示
    Explain {
        /// 事業所名
        #[arg(required = true)]
        name: String,

        /// モデルファイル（JSON）
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// モデルの代わりに確率を直接指定（例: "Fire Sprinkler=0.51"）
        #[arg(long = "prob", value_parser = parse_label_probability)]
        probs: Vec<(String, f64)>,

        /// JSONで出力
        #[arg(long)]
        json: bool,
    },

    /// 有効なルール表・しきい値を表示
    Rules {
        /// JSONで出力
        #[arg(long)]
        json: bool,
    },

    /// モデルファイルの情報を表示
    Inspect {
        /// モデルファイル（JSON）
        #[arg(required = true)]
        model: PathBuf,
    },

    /// 設定を表示/編集
    Config {
        /// モデルファイルを設定
        #[arg(long)]
        set_model: Option<PathBuf>,

        /// 一般しきい値を設定
        #[arg(long)]
        set_general_threshold: Option<f64>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

/// "ラベル=確率" を分解
pub fn parse_label_probability(s: &str) -> Result<(String, f64), String> {
    let (label, prob) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("LABEL=PROB の形式で指定してください: {}", s))?;
    let label = label.trim();
    if label.is_empty() {
        return Err(format!("ラベルが空です: {}", s));
    }
    let prob: f64 = prob
        .trim()
        .parse()
        .map_err(|_| format!("確率が数値ではありません: {}", s))?;
    Ok((label.to_string(), prob))
}

/// 出力パスの既定値（入力と同じ場所に `_predictions` を付ける）
pub fn default_output_path(input: &Path) -> PathBuf {
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let is_csv = input
        .extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    let extension = if is_csv { "csv" } else { "xlsx" };
    parent.join(format!("{}_predictions.{}", stem, extension))
}
