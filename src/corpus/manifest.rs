// 学習用コーパスのマニフェスト: 分割結果・クラス統計・統合マッピング・ダイジェスト

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::corpus::{CorpusSplit, Sample};
use crate::labels::merge::MergeMapping;
use crate::output::write_atomic;

/// 統合後のクラスごとの出現数。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassStats {
    pub regions: BTreeMap<String, usize>,
    pub baselines: BTreeMap<String, usize>,
}

impl ClassStats {
    pub fn add_region(&mut self, label: &str) {
        *self.regions.entry(label.to_string()).or_default() += 1;
    }

    pub fn add_baseline(&mut self, label: &str) {
        *self.baselines.entry(label.to_string()).or_default() += 1;
    }

    pub fn merge_from(&mut self, other: ClassStats) {
        for (label, n) in other.regions {
            *self.regions.entry(label).or_default() += n;
        }
        for (label, n) in other.baselines {
            *self.baselines.entry(label).or_default() += n;
        }
    }
}

/// 学習コラボレータに渡す構造化された分割結果。
#[derive(Debug, Clone, Serialize)]
pub struct CorpusManifest {
    pub model_name: String,
    pub created: String,
    /// 順序付きサンプルパスの SHA-256
    pub digest: String,
    pub training: Vec<Sample>,
    pub evaluation: Vec<Sample>,
    pub class_stats: ClassStats,
    pub merge_regions: MergeMapping,
    pub merge_baselines: MergeMapping,
    /// 画像が見つからずスキップしたアノテーション
    pub skipped: Vec<PathBuf>,
}

impl CorpusManifest {
    /// `<output>/<model_name>.split.json`
    pub fn path_for(output_dir: &Path, model_name: &str) -> PathBuf {
        output_dir.join(format!("{model_name}.split.json"))
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            crate::error::PrepError::output(format!("failed to serialize manifest: {e}"))
        })
    }

    /// アトミックに書き込む。
    pub fn write(&self, path: &Path) -> crate::error::Result<()> {
        let json = self.to_json()?;
        write_atomic(path, json.as_bytes())
    }
}

/// 分割結果のダイジェスト。サブセットと順序の両方に依存する。
pub fn corpus_digest(split: &CorpusSplit) -> String {
    let mut hasher = Sha256::new();
    for (tag, samples) in [(b'T', &split.training), (b'E', &split.evaluation)] {
        for sample in samples {
            hasher.update([tag]);
            hasher.update(sample.annotation_path.as_os_str().as_encoded_bytes());
            hasher.update([0u8]);
            hasher.update(sample.image_path.as_os_str().as_encoded_bytes());
            hasher.update([b'\n']);
        }
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(training: &[&str], evaluation: &[&str]) -> CorpusSplit {
        let s = |n: &&str| Sample::new(format!("{n}.png"), format!("{n}.xml"));
        CorpusSplit {
            training: training.iter().map(s).collect(),
            evaluation: evaluation.iter().map(s).collect(),
        }
    }

    #[test]
    fn test_digest_depends_on_subset_and_order() {
        let a = corpus_digest(&split(&["1", "2"], &["3"]));
        assert_eq!(a, corpus_digest(&split(&["1", "2"], &["3"])));
        assert_ne!(a, corpus_digest(&split(&["2", "1"], &["3"])));
        assert_ne!(a, corpus_digest(&split(&["1"], &["2", "3"])));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_class_stats_merge() {
        let mut a = ClassStats::default();
        a.add_region("text");
        let mut b = ClassStats::default();
        b.add_region("text");
        b.add_baseline("default");
        a.merge_from(b);
        assert_eq!(a.regions["text"], 2);
        assert_eq!(a.baselines["default"], 1);
    }
}
