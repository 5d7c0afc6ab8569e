// セグメンテーションジョブ: 画像解決 -> 出力パス検証 -> 並列ドキュメント組立 -> 書き込み

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::corpus::resolver::PathResolver;
use crate::error::PrepError;
use crate::heatmap::encode_heatmap;
use crate::labels::LabelRules;
use crate::page::assembler::{AssemblyOptions, AssemblyReport, DocumentAssembler};
use crate::output::write_atomic;
use crate::page::writer::to_xml_bytes;
use crate::page::{file_stem_before_first_dot, page_image_filename};
use crate::segmentation::{SegmentationResult, results_path_for};

/// Configuration for a single segmentation job.
#[derive(Debug, Clone)]
pub struct SegmentJobConfig {
    /// Image files, glob patterns or directories.
    pub images: Vec<PathBuf>,
    /// Defaults to the directory of each image.
    pub output_dir: Option<PathBuf>,
    pub image_glob: String,
    pub output_suffix: String,
    pub results_suffix: String,
    pub heatmap_suffix: Option<String>,
    /// 0 lets rayon decide.
    pub parallel_workers: usize,
    pub rules: LabelRules,
    pub assembly: AssemblyOptions,
}

/// One PAGE XML document written.
#[derive(Debug, Clone)]
pub struct DocumentResult {
    pub image_path: PathBuf,
    pub output_path: PathBuf,
    pub heatmap_path: Option<PathBuf>,
    pub regions: usize,
    pub lines: usize,
    pub report: AssemblyReport,
}

/// One input that could not be processed: an image in segmentation jobs,
/// an annotation in training jobs.
#[derive(Debug)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub error: PrepError,
}

/// Result of processing a segmentation job.
#[derive(Debug, Default)]
pub struct SegmentJobResult {
    pub documents: Vec<DocumentResult>,
    pub failures: Vec<DocumentFailure>,
}

struct WorkItem {
    image_path: PathBuf,
    output_path: PathBuf,
}

/// Run a segmentation job.
///
/// Configuration problems (no images, colliding output paths) fail the whole
/// job before anything is written. Per-image problems are collected in
/// [`SegmentJobResult::failures`] and do not stop the other images.
pub fn run_segment_job(config: &SegmentJobConfig) -> crate::error::Result<SegmentJobResult> {
    // --- Phase A: Resolve input images, excluding files this tool writes ---
    let images: Vec<PathBuf> = PathResolver::new(&config.image_glob)
        .resolve(&config.images)?
        .into_iter()
        .filter(|p| !is_derived_file(p, config))
        .collect();
    if images.is_empty() {
        return Err(PrepError::input("no input images left after excluding derived files"));
    }

    // --- Phase B: Output paths must be unique ---
    let work = plan_outputs(&images, config)?;

    // --- Phase C: Per-image assembly (rayon parallel) ---
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.parallel_workers)
        .build()
        .map_err(|e| PrepError::config(format!("failed to start worker pool: {e}")))?;
    let timestamp = chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string();

    let results: Vec<(PathBuf, crate::error::Result<DocumentResult>)> = pool.install(|| {
        work.par_iter()
            .map(|item| (item.image_path.clone(), process_image(item, config, &timestamp)))
            .collect()
    });

    // --- Phase D: Collect (input order preserved) ---
    let mut out = SegmentJobResult::default();
    for (image_path, result) in results {
        match result {
            Ok(doc) => out.documents.push(doc),
            Err(error) => {
                warn!(image = %image_path.display(), "document failed: {error}");
                out.failures.push(DocumentFailure {
                    path: image_path,
                    error,
                });
            }
        }
    }
    info!(
        written = out.documents.len(),
        failed = out.failures.len(),
        "segmentation job finished"
    );
    Ok(out)
}

fn is_derived_file(path: &Path, config: &SegmentJobConfig) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.ends_with(&config.output_suffix)
        || name.ends_with(&config.results_suffix)
        || config
            .heatmap_suffix
            .as_deref()
            .is_some_and(|s| name.ends_with(s))
}

/// `<stem before first dot><suffix>` in the output directory.
pub fn output_path_for(image: &Path, output_dir: Option<&Path>, suffix: &str) -> PathBuf {
    let name = image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = format!("{}{suffix}", file_stem_before_first_dot(&name));
    match output_dir {
        Some(dir) => dir.join(file),
        None => image.with_file_name(file),
    }
}

fn plan_outputs(
    images: &[PathBuf],
    config: &SegmentJobConfig,
) -> crate::error::Result<Vec<WorkItem>> {
    let mut seen: HashMap<PathBuf, &Path> = HashMap::new();
    let mut work = Vec::with_capacity(images.len());
    for image in images {
        let output_path =
            output_path_for(image, config.output_dir.as_deref(), &config.output_suffix);
        if let Some(previous) = seen.insert(output_path.clone(), image) {
            return Err(PrepError::config(format!(
                "{} and {} would both be written to {}",
                previous.display(),
                image.display(),
                output_path.display()
            )));
        }
        work.push(WorkItem {
            image_path: image.clone(),
            output_path,
        });
    }
    Ok(work)
}

fn process_image(
    item: &WorkItem,
    config: &SegmentJobConfig,
    timestamp: &str,
) -> crate::error::Result<DocumentResult> {
    let results_path = results_path_for(&item.image_path, &config.results_suffix);
    let mut result = SegmentationResult::from_file(&results_path)?;

    let (width, height) = match (result.width, result.height) {
        (Some(w), Some(h)) => (w, h),
        _ => image::image_dimensions(&item.image_path).map_err(|e| {
            PrepError::input(format!(
                "cannot read dimensions of {}: {e}",
                item.image_path.display()
            ))
        })?,
    };

    let file_name = item
        .image_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let heatmap = result.heatmap.take();

    let assembler = DocumentAssembler::new(&config.assembly, &config.rules);
    let (doc, report) = assembler.assemble(
        result,
        &page_image_filename(&file_name),
        width,
        height,
        timestamp,
    );

    // Both outputs are encoded before either is written.
    let xml = to_xml_bytes(&doc)?;
    let heatmap_output = match (&config.heatmap_suffix, heatmap) {
        (Some(suffix), Some(hm)) => {
            let path = output_path_for(&item.image_path, config.output_dir.as_deref(), suffix);
            let bytes = encode_heatmap(&hm, &path)?;
            Some((path, bytes))
        }
        (Some(_), None) => {
            warn!(image = %item.image_path.display(), "no heatmap data in segmentation result");
            None
        }
        _ => None,
    };

    info!(output = %item.output_path.display(), "writing PAGE XML");
    write_atomic(&item.output_path, &xml)?;
    let heatmap_path = match heatmap_output {
        Some((path, bytes)) => {
            if let Err(e) = write_atomic(&path, &bytes) {
                let _ = std::fs::remove_file(&item.output_path);
                return Err(e);
            }
            Some(path)
        }
        None => None,
    };

    Ok(DocumentResult {
        image_path: item.image_path.clone(),
        output_path: item.output_path.clone(),
        heatmap_path,
        regions: doc.regions.len(),
        lines: doc.line_count(),
        report,
    })
}
