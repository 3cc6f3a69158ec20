//! 確率分類器
//!
//! テキスト → ラベルインデックス順の確率ベクトル。
//! 学習は対象外で、書き出し済みのモデルファイル（JSON）を読み込んで推論だけを行う

mod linear;
mod tfidf;

pub use linear::{LinearTextModel, Link, ModelArtifact};
pub use tfidf::{tokenize, TfidfVectorizer};

use crate::error::Result;
use sha2::{Digest, Sha256};
use systype_common::LabelIndex;

/// 外部分類器の能力
pub trait Classifier: Send + Sync {
    /// ラベルエンコーダ
    fn label_index(&self) -> &LabelIndex;

    /// テキストの確率ベクトル（`label_index()` と同じ順序・長さ）
    fn predict_proba(&self, text: &str) -> Result<Vec<f64>>;
}

/// バイト列のSHA-256（16進）
pub fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
