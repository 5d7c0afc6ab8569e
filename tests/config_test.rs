// 設定ファイル解析テスト

use std::fs;
use std::path::Path;

use pagexml_prep::config::job::{Job, JobFile};
use pagexml_prep::config::merged::MergedConfig;
use pagexml_prep::config::settings::Settings;
use pagexml_prep::config::{load_jobs, load_settings_for_job};
use pagexml_prep::error::PrepError;
use pagexml_prep::geometry::fallback::FallbackPolicy;
use pagexml_prep::page::TextDirection;
use pagexml_prep::pipeline::orchestrator::JobConfig;

fn write_job(dir: &Path, yaml: &str) -> std::path::PathBuf {
    let path = dir.join("jobs.yaml");
    fs::write(&path, yaml).expect("write job file");
    path
}

// ============================================================
// 1. Settings 構造体のデシリアライズ
// ============================================================

#[test]
fn test_settings_full_yaml() {
    let yaml = r#"
creator: lab-pipeline
output_suffix: page.xml
heatmap_suffix: hm.png
text_direction: vrl
partition: 0.8
seed: 7
parallel_workers: 4
fallback:
  height: 24
valid_regions: ["text,heading"]
merge_baselines: ["a,b:c"]
suppress_baselines: true
"#;
    let settings = Settings::from_yaml(yaml).expect("should parse full YAML");
    assert_eq!(settings.creator, "lab-pipeline");
    assert_eq!(settings.output_suffix, "page.xml");
    assert_eq!(settings.heatmap_suffix.as_deref(), Some("hm.png"));
    assert_eq!(settings.text_direction, TextDirection::Vrl);
    assert_eq!(settings.partition, 0.8);
    assert_eq!(settings.seed, 7);
    assert_eq!(settings.parallel_workers, 4);
    assert_eq!(settings.fallback, Some(FallbackPolicy::FixedHeight { height: 24 }));
    assert_eq!(settings.valid_regions, vec!["text,heading"]);
    assert!(settings.suppress_baselines);
    assert!(!settings.suppress_lines);
}

#[test]
fn test_settings_empty_yaml() {
    // 空YAML（"{}" はserde_ymlで空のマッピングを意味する）
    let settings = Settings::from_yaml("{}").expect("should parse empty mapping");
    assert_eq!(settings.output_suffix, ".xml");
    assert_eq!(settings.results_suffix, ".seg.json");
    assert_eq!(settings.partition, 0.9);
    assert_eq!(settings.gt_glob, "*.xml");
    assert_eq!(settings.text_direction, TextDirection::Hlr);
    assert!(settings.fallback.is_none());
    assert!(!settings.strict);
}

#[test]
fn test_settings_offsets_fallback() {
    let yaml = "fallback: { left: 5, top: 15, right: 5 }\n";
    let settings = Settings::from_yaml(yaml).unwrap();
    assert_eq!(
        settings.fallback,
        Some(FallbackPolicy::Offsets {
            left: 5,
            top: 15,
            right: 5,
            bottom: 0
        })
    );
}

#[test]
fn test_settings_invalid_direction() {
    let result = Settings::from_yaml("text_direction: diagonal\n");
    assert!(matches!(result, Err(PrepError::ConfigError(_))));
}

// ============================================================
// 2. settings.yaml の自動検出
// ============================================================

#[test]
fn test_load_settings_for_job_found() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("settings.yaml"), "creator: from-settings\n").unwrap();
    let job = write_job(dir.path(), "jobs: []\n");

    let settings = load_settings_for_job(&job).unwrap();
    assert_eq!(settings.creator, "from-settings");
}

#[test]
fn test_load_settings_for_job_default() {
    let dir = tempfile::tempdir().unwrap();
    let job = write_job(dir.path(), "jobs: []\n");

    let settings = load_settings_for_job(&job).unwrap();
    assert_eq!(settings.creator, "pagexml_prep");
}

// ============================================================
// 3. MergedConfig: ジョブ値が Settings を上書きする
// ============================================================

#[test]
fn test_merged_config_job_overrides_settings() {
    let settings =
        Settings::from_yaml("creator: base\nsuppress_lines: true\noutput_suffix: xml\n").unwrap();
    let file: JobFile = serde_yml::from_str(
        r#"
jobs:
  - task: segment
    images: "*.png"
    creator: job
    heatmap_suffix: hm.png
"#,
    )
    .unwrap();
    let merged = MergedConfig::new(&settings, &file.jobs[0]);
    assert_eq!(merged.creator, "job");
    assert!(merged.suppress_lines);
    assert_eq!(merged.output_suffix, ".xml");
    assert_eq!(merged.heatmap_suffix.as_deref(), Some(".hm.png"));
}

#[test]
fn test_job_unknown_task_is_rejected() {
    let result: Result<JobFile, _> =
        serde_yml::from_str("jobs:\n  - task: recognize\n    images: a.png\n");
    assert!(result.is_err());
}

#[test]
fn test_job_evaluation_single_string() {
    let file: JobFile = serde_yml::from_str(
        "jobs:\n  - task: segtrain\n    ground_truth: gt\n    evaluation: eval\n    output: models\n    model_name: m\n",
    )
    .unwrap();
    match &file.jobs[0] {
        Job::Segtrain(train) => {
            assert_eq!(train.evaluation.as_deref(), Some(&["eval".to_string()][..]));
        }
        other => panic!("unexpected job {other:?}"),
    }
}

// ============================================================
// 4. load_jobs: パス解決と設定検証
// ============================================================

#[test]
fn test_load_jobs_resolves_relative_paths() {
    let dir = tempfile::tempdir().unwrap();
    let job = write_job(
        dir.path(),
        r#"
jobs:
  - task: segment
    images: ["scans", "/abs/*.png"]
    output: out
  - task: segtrain
    ground_truth: gt
    output: models
    model_name: blla
    image_suffix: bin.png
"#,
    );

    let jobs = load_jobs(&job).unwrap();
    assert_eq!(jobs.len(), 2);
    match &jobs[0] {
        JobConfig::Segment(seg) => {
            assert_eq!(seg.images[0], dir.path().join("scans"));
            assert_eq!(seg.images[1], Path::new("/abs/*.png"));
            assert_eq!(seg.output_dir.as_deref(), Some(dir.path().join("out").as_path()));
        }
        other => panic!("unexpected job {other:?}"),
    }
    match &jobs[1] {
        JobConfig::Train(train) => {
            assert_eq!(train.ground_truth, vec![dir.path().join("gt")]);
            assert_eq!(train.output_dir, dir.path().join("models"));
            assert_eq!(train.matching.image_suffix.as_deref(), Some(".bin.png"));
            assert_eq!(train.eval_glob, "*.xml");
        }
        other => panic!("unexpected job {other:?}"),
    }
}

#[test]
fn test_load_jobs_invalid_partition() {
    let dir = tempfile::tempdir().unwrap();
    let job = write_job(
        dir.path(),
        "jobs:\n  - task: segtrain\n    ground_truth: gt\n    output: m\n    model_name: x\n    partition: 1.0\n",
    );
    assert!(matches!(load_jobs(&job), Err(PrepError::ConfigError(_))));
}

#[test]
fn test_load_jobs_partition_ignored_with_evaluation() {
    let dir = tempfile::tempdir().unwrap();
    let job = write_job(
        dir.path(),
        "jobs:\n  - task: segtrain\n    ground_truth: gt\n    evaluation: ev\n    output: m\n    model_name: x\n    partition: 1.0\n",
    );
    assert!(load_jobs(&job).is_ok());
}

#[test]
fn test_load_jobs_ambiguous_merge() {
    let dir = tempfile::tempdir().unwrap();
    let job = write_job(
        dir.path(),
        "jobs:\n  - task: segment\n    images: a.png\n    merge_regions: [\"a:b\", \"a:c\"]\n",
    );
    let err = load_jobs(&job).unwrap_err();
    assert!(err.to_string().contains("Ambiguous"), "{err}");
}

#[test]
fn test_load_jobs_merge_target_with_delimiter() {
    let dir = tempfile::tempdir().unwrap();
    let job = write_job(
        dir.path(),
        "jobs:\n  - task: segment\n    images: a.png\n    merge_baselines: [\"a:b;c\"]\n",
    );
    assert!(matches!(load_jobs(&job), Err(PrepError::ConfigError(_))));
}

#[test]
fn test_load_jobs_zero_fallback_height() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("settings.yaml"), "fallback: { height: 0 }\n").unwrap();
    let job = write_job(dir.path(), "jobs:\n  - task: segment\n    images: a.png\n");
    assert!(matches!(load_jobs(&job), Err(PrepError::ConfigError(_))));
}

#[test]
fn test_load_jobs_rejects_model_name_with_separator() {
    let dir = tempfile::tempdir().unwrap();
    let job = write_job(
        dir.path(),
        "jobs:\n  - task: segtrain\n    ground_truth: gt\n    output: m\n    model_name: ../x\n",
    );
    assert!(matches!(load_jobs(&job), Err(PrepError::ConfigError(_))));
}
