use serde::Deserialize;

use crate::geometry::fallback::FallbackPolicy;
use crate::page::TextDirection;

#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    pub jobs: Vec<Job>,
}

/// ジョブ定義。`task` キーで種類を切り替える。
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "task", rename_all = "lowercase")]
pub enum Job {
    /// セグメンテーション結果から PAGE XML を組み立てる
    Segment(SegmentJob),
    /// 学習用コーパスを準備する
    Segtrain(TrainJob),
}

impl Job {
    pub fn overrides(&self) -> &Overrides {
        match self {
            Job::Segment(job) => &job.overrides,
            Job::Segtrain(job) => &job.overrides,
        }
    }

    pub fn task_name(&self) -> &'static str {
        match self {
            Job::Segment(_) => "segment",
            Job::Segtrain(_) => "segtrain",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentJob {
    /// 画像ファイル・glob・ディレクトリ（単一文字列またはリスト）
    #[serde(deserialize_with = "deserialize_path_list")]
    pub images: Vec<String>,
    /// 出力ディレクトリ。省略時は画像と同じディレクトリ
    pub output: Option<String>,
    #[serde(flatten)]
    pub overrides: Overrides,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrainJob {
    #[serde(deserialize_with = "deserialize_path_list")]
    pub ground_truth: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_optional_path_list")]
    pub evaluation: Option<Vec<String>>,
    pub eval_glob: Option<String>,
    pub output: String,
    pub model_name: String,
    pub image_suffix: Option<String>,
    #[serde(flatten)]
    pub overrides: Overrides,
}

/// settings.yaml の値をジョブ単位で上書きする項目。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Overrides {
    pub creator: Option<String>,
    pub output_suffix: Option<String>,
    pub results_suffix: Option<String>,
    pub heatmap_suffix: Option<String>,
    pub text_direction: Option<TextDirection>,
    pub partition: Option<f64>,
    pub seed: Option<u64>,
    pub gt_glob: Option<String>,
    pub image_glob: Option<String>,
    pub image_extensions: Option<Vec<String>>,
    pub strict: Option<bool>,
    pub fallback: Option<FallbackPolicy>,
    pub valid_regions: Option<Vec<String>>,
    pub valid_baselines: Option<Vec<String>>,
    pub merge_regions: Option<Vec<String>>,
    pub merge_baselines: Option<Vec<String>>,
    pub suppress_regions: Option<bool>,
    pub suppress_baselines: Option<bool>,
    pub suppress_lines: Option<bool>,
}

/// 先頭にドットがなければ付与する。
///
/// - `"xml"` → `".xml"`
/// - `".hm.png"` → `".hm.png"`
pub fn normalize_suffix(suffix: &str) -> String {
    let trimmed = suffix.trim();
    if trimmed.starts_with('.') {
        trimmed.to_string()
    } else {
        format!(".{trimmed}")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(v: OneOrMany) -> Self {
        match v {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// serdeのdeserialize_withで使用するパス指定デシリアライザ
fn deserialize_path_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let list: Vec<String> = OneOrMany::deserialize(deserializer)?.into();
    if list.is_empty() {
        return Err(serde::de::Error::custom("path list cannot be empty"));
    }
    Ok(list)
}

fn deserialize_optional_path_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserialize_path_list(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_suffix() {
        assert_eq!(normalize_suffix("xml"), ".xml");
        assert_eq!(normalize_suffix(".hm.png"), ".hm.png");
    }

    #[test]
    fn test_task_tag_selects_variant() {
        let yaml = r#"
jobs:
  - task: segment
    images: "scans/*.png"
    suppress_lines: true
  - task: segtrain
    ground_truth: [gt/a, gt/b]
    output: models
    model_name: blla
"#;
        let file: JobFile = serde_yml::from_str(yaml).unwrap();
        match &file.jobs[0] {
            Job::Segment(job) => {
                assert_eq!(job.images, vec!["scans/*.png"]);
                assert_eq!(job.overrides.suppress_lines, Some(true));
            }
            other => panic!("unexpected job {other:?}"),
        }
        match &file.jobs[1] {
            Job::Segtrain(job) => {
                assert_eq!(job.ground_truth, vec!["gt/a", "gt/b"]);
                assert!(job.evaluation.is_none());
            }
            other => panic!("unexpected job {other:?}"),
        }
    }
}
