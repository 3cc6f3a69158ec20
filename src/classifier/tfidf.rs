//! TF-IDFベクトル化（書き出し済み語彙・IDFを使用）

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use regex::Regex;

/// 2文字以上の単語をトークンとして抽出
pub fn tokenize(text: &str) -> Vec<&str> {
    lazy_static::lazy_static! {
        static ref TOKEN_RE: Regex = Regex::new(r"(?u)\b\w\w+\b").unwrap();
    }
    TOKEN_RE.find_iter(text).map(|m| m.as_str()).collect()
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_true() -> bool {
    true
}

/// 書き出し済みのTF-IDF設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    /// 語 → 特徴量インデックス
    pub vocabulary: HashMap<String, usize>,
    /// 特徴量ごとのIDF
    pub idf: Vec<f64>,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default = "default_true")]
    pub lowercase: bool,
    /// L2正規化するか
    #[serde(default = "default_true")]
    pub l2_norm: bool,
}

impl TfidfVectorizer {
    pub fn n_features(&self) -> usize {
        self.idf.len()
    }

    /// 構造の検証（エラー内容を返す）
    pub fn validate(&self) -> Result<(), String> {
        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(format!("ngram_range が不正: ({}, {})", min_n, max_n));
        }
        if let Some((term, &index)) = self.vocabulary.iter().find(|(_, &i)| i >= self.idf.len()) {
            return Err(format!(
                "語彙 '{}' のインデックス {} がIDFの長さ {} を超えています",
                term,
                index,
                self.idf.len()
            ));
        }
        Ok(())
    }

    /// テキストを疎ベクトル (特徴量インデックス, 値) に変換
    pub fn transform(&self, text: &str) -> Vec<(usize, f64)> {
        let lowered;
        let text = if self.lowercase {
            lowered = text.to_lowercase();
            lowered.as_str()
        } else {
            text
        };

        let tokens = tokenize(text);
        let mut counts: HashMap<usize, f64> = HashMap::new();

        let (min_n, max_n) = self.ngram_range;
        for n in min_n..=max_n {
            if n > tokens.len() {
                break;
            }
            for window in tokens.windows(n) {
                let term = window.join(" ");
                if let Some(&index) = self.vocabulary.get(&term) {
                    *counts.entry(index).or_insert(0.0) += 1.0;
                }
            }
        }

        let mut features: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(index, tf)| {
                let tf = if self.sublinear_tf { 1.0 + tf.ln() } else { tf };
                (index, tf * self.idf[index])
            })
            .collect();
        features.sort_by_key(|&(index, _)| index);

        if self.l2_norm {
            let norm = features.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                for (_, v) in &mut features {
                    *v /= norm;
                }
            }
        }

        features
    }
}
