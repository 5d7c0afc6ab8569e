pub mod job;
pub mod merged;
pub mod settings;

use std::path::{Path, PathBuf};

use tracing::debug;

use job::{Job, JobFile};
use merged::MergedConfig;
use settings::Settings;

use crate::error::PrepError;
use crate::pipeline::orchestrator::JobConfig;
use crate::pipeline::segment_runner::SegmentJobConfig;
use crate::pipeline::train_runner::TrainJobConfig;

/// ジョブファイルのパスからsettings.yamlを自動検出して読み込む。
///
/// ジョブファイルと同じディレクトリに `settings.yaml` が存在すれば読み込み、
/// 存在しなければデフォルト設定を返す。
pub fn load_settings_for_job(job_file_path: &Path) -> crate::error::Result<Settings> {
    let dir = job_file_path
        .parent()
        .ok_or_else(|| PrepError::config("Cannot determine job file directory"))?;

    let settings_path = dir.join("settings.yaml");

    if settings_path.exists() {
        Settings::from_file(&settings_path)
    } else {
        Ok(Settings::default())
    }
}

/// ジョブファイルを読み込み、設定をマージ・検証して実行可能なジョブ列を返す。
///
/// 相対パスはジョブファイルのディレクトリを基準に解決する。
/// 設定エラーはファイル I/O の前にここで検出される。
pub fn load_jobs(job_file_path: &Path) -> crate::error::Result<Vec<JobConfig>> {
    let settings = load_settings_for_job(job_file_path)?;
    let yaml = std::fs::read_to_string(job_file_path).map_err(|e| {
        PrepError::config(format!(
            "Failed to read job file {}: {e}",
            job_file_path.display()
        ))
    })?;
    let job_file: JobFile = serde_yml::from_str(&yaml).map_err(|e| {
        PrepError::config(format!(
            "Failed to parse job file {}: {e}",
            job_file_path.display()
        ))
    })?;

    let job_dir = job_file_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    job_file
        .jobs
        .iter()
        .map(|job| build_job(&settings, job, job_dir))
        .collect()
}

fn build_job(settings: &Settings, job: &Job, job_dir: &Path) -> crate::error::Result<JobConfig> {
    debug!(task = job.task_name(), dir = %job_dir.display(), "building job");
    let merged = MergedConfig::new(settings, job);
    merged.validate(job)?;
    let rules = merged.label_rules()?;

    Ok(match job {
        Job::Segment(seg) => JobConfig::Segment(SegmentJobConfig {
            images: resolve_paths(job_dir, &seg.images),
            output_dir: seg.output.as_deref().map(|o| resolve_path(job_dir, o)),
            image_glob: merged.image_glob.clone(),
            output_suffix: merged.output_suffix.clone(),
            results_suffix: merged.results_suffix.clone(),
            heatmap_suffix: merged.heatmap_suffix.clone(),
            parallel_workers: merged.parallel_workers,
            assembly: merged.assembly_options(),
            rules,
        }),
        Job::Segtrain(train) => JobConfig::Train(TrainJobConfig {
            ground_truth: resolve_paths(job_dir, &train.ground_truth),
            evaluation: train
                .evaluation
                .as_ref()
                .map(|e| resolve_paths(job_dir, e)),
            gt_glob: merged.gt_glob.clone(),
            eval_glob: train
                .eval_glob
                .clone()
                .unwrap_or_else(|| merged.gt_glob.clone()),
            output_dir: resolve_path(job_dir, &train.output),
            model_name: train.model_name.clone(),
            partition: merged.partition,
            seed: merged.seed,
            matching: merged.match_options(train.image_suffix.as_deref()),
            rules,
            suppress_regions: merged.suppress_regions,
            suppress_baselines: merged.suppress_baselines,
            suppress_lines: merged.suppress_lines,
            parallel_workers: merged.parallel_workers,
        }),
    })
}

fn resolve_paths(base_dir: &Path, paths: &[String]) -> Vec<PathBuf> {
    paths.iter().map(|p| resolve_path(base_dir, p)).collect()
}

/// Resolve a potentially relative path against a base directory.
/// If the path is already absolute, return it as-is.
pub fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}
