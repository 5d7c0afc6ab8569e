// 学習ジョブ: GT解決 -> 画像照合 -> GT解析 -> 分割 -> クラス統計 -> マニフェスト

use std::collections::HashMap;
use std::path::PathBuf;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::corpus::manifest::{ClassStats, CorpusManifest, corpus_digest};
use crate::corpus::matcher::{MatchOptions, MatchReport, match_samples};
use crate::corpus::partition::{partition, with_evaluation};
use crate::corpus::resolver::PathResolver;
use crate::corpus::{CorpusSplit, Sample};
use crate::error::PrepError;
use crate::labels::LabelRules;
use crate::page::PageDocument;
use crate::page::reader::read_page;
use crate::pipeline::segment_runner::DocumentFailure;

/// Configuration for a single training-preparation job.
#[derive(Debug, Clone)]
pub struct TrainJobConfig {
    pub ground_truth: Vec<PathBuf>,
    pub evaluation: Option<Vec<PathBuf>>,
    pub gt_glob: String,
    pub eval_glob: String,
    pub output_dir: PathBuf,
    pub model_name: String,
    pub partition: f64,
    pub seed: u64,
    pub matching: MatchOptions,
    pub rules: LabelRules,
    pub suppress_regions: bool,
    pub suppress_baselines: bool,
    pub suppress_lines: bool,
    pub parallel_workers: usize,
}

#[derive(Debug)]
pub struct TrainJobResult {
    pub manifest_path: PathBuf,
    pub split: CorpusSplit,
    pub class_stats: ClassStats,
    pub match_report: MatchReport,
    /// Annotations that could not be parsed and were left out.
    pub failures: Vec<DocumentFailure>,
}

/// A split corpus plus the parsed training documents.
#[derive(Debug)]
pub struct PreparedCorpus {
    pub split: CorpusSplit,
    pub match_report: MatchReport,
    pub failures: Vec<DocumentFailure>,
    /// Parsed annotations of `split.training`, same order.
    pub training_docs: Vec<PageDocument>,
}

/// Resolve and match the ground truth and evaluation sets without reading
/// any annotation, so that configuration errors surface before a run starts.
pub fn check_corpus(config: &TrainJobConfig) -> crate::error::Result<()> {
    let annotations = PathResolver::new(&config.gt_glob).resolve(&config.ground_truth)?;
    match_samples(&annotations, &config.matching)?;
    if let Some(eval_specs) = &config.evaluation {
        let eval_annotations = PathResolver::new(&config.eval_glob).resolve(eval_specs)?;
        match_samples(&eval_annotations, &config.matching)?;
    }
    Ok(())
}

/// Resolve, match, parse and split the corpus.
///
/// Annotations that cannot be parsed are excluded before splitting.
pub fn prepare_corpus(config: &TrainJobConfig) -> crate::error::Result<PreparedCorpus> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.parallel_workers)
        .build()
        .map_err(|e| PrepError::config(format!("failed to start worker pool: {e}")))?;

    // --- Phase A: Ground truth ---
    let annotations = PathResolver::new(&config.gt_glob).resolve(&config.ground_truth)?;
    let (samples, mut report) = match_samples(&annotations, &config.matching)?;
    let (samples, docs, mut failures) = pool.install(|| parse_samples(samples));

    // --- Phase B: Explicit evaluation set, if any ---
    let split = match &config.evaluation {
        Some(eval_specs) => {
            let eval_annotations = PathResolver::new(&config.eval_glob).resolve(eval_specs)?;
            let (eval_samples, eval_report) = match_samples(&eval_annotations, &config.matching)?;
            report.skipped.extend(eval_report.skipped);
            let (eval_samples, _, eval_failures) = pool.install(|| parse_samples(eval_samples));
            failures.extend(eval_failures);
            with_evaluation(samples.clone(), eval_samples)?
        }
        None => partition(samples.clone(), config.partition, config.seed)?,
    };

    let mut by_annotation: HashMap<PathBuf, PageDocument> = samples
        .into_iter()
        .map(|s| s.annotation_path)
        .zip(docs)
        .collect();
    let training_docs = split
        .training
        .iter()
        .filter_map(|s| by_annotation.remove(&s.annotation_path))
        .collect();

    Ok(PreparedCorpus {
        split,
        match_report: report,
        failures,
        training_docs,
    })
}

fn parse_samples(samples: Vec<Sample>) -> (Vec<Sample>, Vec<PageDocument>, Vec<DocumentFailure>) {
    let parsed: Vec<(Sample, crate::error::Result<PageDocument>)> = samples
        .into_par_iter()
        .map(|s| {
            let doc = read_page(&s.annotation_path);
            (s, doc)
        })
        .collect();

    let mut kept = Vec::new();
    let mut docs = Vec::new();
    let mut failures = Vec::new();
    for (sample, doc) in parsed {
        match doc {
            Ok(doc) => {
                kept.push(sample);
                docs.push(doc);
            }
            Err(error) => {
                warn!(annotation = %sample.annotation_path.display(), "excluding sample: {error}");
                failures.push(DocumentFailure {
                    path: sample.annotation_path,
                    error,
                });
            }
        }
    }
    (kept, docs, failures)
}

/// Count regions and baselines per class after filtering and merging.
///
/// Suppressed kinds are not counted.
pub fn collect_class_stats(docs: &[PageDocument], config: &TrainJobConfig) -> ClassStats {
    docs.par_iter()
        .map(|doc| {
            let mut stats = ClassStats::default();
            if !config.suppress_regions {
                for region in config.rules.apply_regions(doc.regions.clone()) {
                    stats.add_region(&region.label);
                }
            }
            if !(config.suppress_lines || config.suppress_baselines) {
                let lines: Vec<_> = doc
                    .lines()
                    .filter(|l| l.baseline.is_some())
                    .cloned()
                    .collect();
                for line in config.rules.apply_baselines(lines) {
                    stats.add_baseline(&line.label);
                }
            }
            stats
        })
        .reduce(ClassStats::default, |mut a, b| {
            a.merge_from(b);
            a
        })
}

/// Run a training-preparation job and write the split manifest.
pub fn run_train_job(config: &TrainJobConfig) -> crate::error::Result<TrainJobResult> {
    let PreparedCorpus {
        split,
        match_report,
        failures,
        training_docs,
    } = prepare_corpus(config)?;
    let class_stats = collect_class_stats(&training_docs, config);

    let manifest_path = CorpusManifest::path_for(&config.output_dir, &config.model_name);
    let manifest = CorpusManifest {
        model_name: config.model_name.clone(),
        created: chrono::Local::now().to_rfc3339(),
        digest: corpus_digest(&split),
        training: split.training.clone(),
        evaluation: split.evaluation.clone(),
        class_stats: class_stats.clone(),
        merge_regions: config.rules.merge_regions.clone(),
        merge_baselines: config.rules.merge_baselines.clone(),
        skipped: match_report
            .skipped
            .iter()
            .map(|s| s.annotation_path.clone())
            .collect(),
    };
    manifest.write(&manifest_path)?;
    info!(
        manifest = %manifest_path.display(),
        training = split.training.len(),
        evaluation = split.evaluation.len(),
        "wrote corpus manifest"
    );

    Ok(TrainJobResult {
        manifest_path,
        split,
        class_stats,
        match_report,
        failures,
    })
}
