use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use systype_common::LabelIndex;
use systype_predictor::batch::{self, BatchOptions};
use systype_predictor::classifier::{Classifier, LinearTextModel};
use systype_predictor::cli::{default_output_path, Cli, Commands};
use systype_predictor::config::Config;
use systype_predictor::{dataset, logging};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let config = Config::load().context("設定ファイルの読み込みに失敗")?;

    match cli.command {
        Commands::Predict {
            input,
            output,
            model,
            column,
            sheet,
            rules,
            implications,
            jobs,
            event_policy,
            quiet,
        } => {
            let mut config = config;
            if let Some(column) = column {
                config.name_column = column;
            }
            config.sheet = sheet.or(config.sheet);
            config.rules_path = rules.or(config.rules_path);
            config.implications_path = implications.or(config.implications_path);
            config.jobs = jobs.or(config.jobs);
            config.event_policy = event_policy.unwrap_or(config.event_policy);

            println!("🏷  systype - システム種別予測\n");

            // 1. モデル読み込み
            println!("[1/4] モデルを読み込み中...");
            let classifier = load_model(model, &config)?;
            let engine = config
                    .build_engine(classifier.label_index().clone())
                    .context("融合エンジンの構築に失敗")?;
            println!("✔ {}ラベル\n", classifier.label_index().len());

            // 2. 入力読み込み
            println!("[2/4] 入力を読み込み中...");
            let mut data = dataset::read_dataset(&input, config.sheet.as_deref())
                .with_context(|| format!("入力の読み込みに失敗: {}", input.display()))?;
            println!("✔ {}件のレコード\n", data.len());

            // 3. 予測
            println!("[3/4] 予測中...");
            let options = BatchOptions {
                jobs: config.jobs,
                show_progress: !quiet,
            };
            let summary = batch::predict_dataset(
                &mut data,
                &config.name_columns(),
                &classifier,
                &engine,
                &options,
            )?;
            tracing::info!(
                records = summary.records,
                labelled = summary.labelled,
                fallback = summary.fallback,
                total_labels = summary.total_labels,
                "予測完了"
            );
            println!(
                "✔ {}件中{}件に種別を付与（該当なし{}件）\n",
                summary.records, summary.labelled, summary.fallback
            );

            // 4. 保存
            println!("[4/4] 結果を保存中...");
            let output = output.unwrap_or_else(|| default_output_path(&input));
            dataset::write_dataset(&output, &data)
                .with_context(|| format!("出力の保存に失敗: {}", output.display()))?;
            println!("✔ 結果を保存: {}", output.display());

            println!("\n✅ 完了");
        }

        Commands::Explain { name, model, probs, json } => {
            let lowered = systype_common::normalize_name(Some(&name));
            let (engine, vector) = if probs.is_empty() {
                let classifier = load_model(model, &config)?;
                let engine = config
                    .build_engine(classifier.label_index().clone())
                    .context("融合エンジンの構築に失敗")?;
                let vector = classifier.predict_proba(&lowered)?;
                (engine, vector)
            } else {
                let (labels, values): (Vec<String>, Vec<f64>) = probs.into_iter().unzip();
                let index = LabelIndex::new(labels)?;
                (
                    config.build_engine(index).context("融合エンジンの構築に失敗")?,
                    values,
                )
            };

            let trace = engine.explain(&lowered, &vector)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&trace)?);
            } else {
                println!("名称: {}", name);
                for stage in &trace.stages {
                    let labels: Vec<&str> = stage.labels.iter().collect();
                    println!(
                        "  [{}] +{}イベント  {{{}}}",
                        stage.stage,
                        stage.new_events,
                        labels.join(", ")
                    );
                }
                println!();
                println!("Predicted System Type: {}", trace.result.predicted_system_type());
                println!("Confidence Score:      {}", trace.result.confidence_score());
            }
        }

        Commands::Rules { json } => {
            let rules = config.keyword_rules()?;
            let implications = config.implication_rules()?;
            let thresholds = config.thresholds()?;

            if json {
                let value = serde_json::json!({
                    "rules": rules,
                    "implications": implications,
                    "thresholds": thresholds,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("キーワードルール:");
                for category in rules.categories() {
                    println!("  {} → {}", category.key, category.labels.join(", "));
                    println!("      [{}]", category.variations.join(", "));
                }
                println!("含意ルール:");
                for rule in implications.rules() {
                    println!("  {} ⇒ {}", rule.trigger, rule.implied);
                }
                println!("しきい値:");
                println!("  一般: {:.2}", thresholds.general());
                for (label, value) in thresholds.overrides() {
                    println!("  {}: {:.2}", label, value);
                }
            }
        }

        Commands::Inspect { model } => {
            let classifier = LinearTextModel::load(&model)
                .with_context(|| format!("モデルの読み込みに失敗: {}", model.display()))?;
            println!("モデル: {}", model.display());
            println!("  SHA-256: {}", classifier.fingerprint());
            println!("  語彙数: {}", classifier.vocabulary_size());
            println!("  出力: {:?}", classifier.link());
            println!("  ラベル:");
            for (i, label) in classifier.label_index().labels().iter().enumerate() {
                println!("    {:>3}: {}", i, label);
            }
        }

        Commands::Config { set_model, set_general_threshold, show } => {
            let mut config = config;

            if let Some(path) = set_model {
                config.set_model(path)?;
                println!("✔ モデルを設定しました");
            }

            if let Some(value) = set_general_threshold {
                config.set_general_threshold(value)?;
                println!("✔ 一般しきい値を設定しました");
            }

            if show {
                println!("設定: {}", Config::config_path()?.display());
                println!("  名称列: {}", config.name_columns().join(" / "));
                println!(
                    "  モデル: {}",
                    config
                        .model_path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "未設定".into())
                );
                println!("  一般しきい値: {:.2}", config.general_threshold);
                for (label, value) in &config.label_thresholds {
                    println!("  しきい値 {}: {:.2}", label, value);
                }
                println!("  モデルイベント: {:?}", config.event_policy);
            }
        }
    }

    Ok(())
}

fn load_model(model: Option<PathBuf>, config: &Config) -> Result<LinearTextModel> {
    let path = match model {
        Some(path) => path,
        None => config.model_path()?,
    };
    let classifier = LinearTextModel::load(&path)
        .with_context(|| format!("モデルの読み込みに失敗: {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        fingerprint = classifier.fingerprint(),
        labels = classifier.label_index().len(),
        "モデルを読み込みました"
    );
    Ok(classifier)
}
