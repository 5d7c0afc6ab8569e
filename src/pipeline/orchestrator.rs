// 全ジョブ実行と実行サマリ

use std::path::PathBuf;

use tracing::{error, info};

use crate::error::PrepError;
use crate::pipeline::segment_runner::{SegmentJobConfig, SegmentJobResult, run_segment_job};
use crate::pipeline::train_runner::{TrainJobConfig, TrainJobResult, check_corpus, run_train_job};

/// A fully resolved job, ready to run.
#[derive(Debug, Clone)]
pub enum JobConfig {
    Segment(SegmentJobConfig),
    Train(TrainJobConfig),
}

impl JobConfig {
    /// Short human-readable description for log lines.
    pub fn describe(&self) -> String {
        match self {
            JobConfig::Segment(c) => format!(
                "segment {}",
                c.images
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            JobConfig::Train(c) => format!("segtrain {}", c.model_name),
        }
    }
}

#[derive(Debug)]
pub enum JobOutcome {
    Segment(SegmentJobResult),
    Train(TrainJobResult),
}

pub fn run_job(job: &JobConfig) -> crate::error::Result<JobOutcome> {
    match job {
        JobConfig::Segment(c) => run_segment_job(c).map(JobOutcome::Segment),
        JobConfig::Train(c) => run_train_job(c).map(JobOutcome::Train),
    }
}

/// Run multiple jobs, collecting one result per job.
///
/// A non-fatal job failure does not prevent later jobs from running. A fatal
/// error aborts the run: every segtrain corpus is checked before the first
/// job starts, and jobs after a fatal failure are reported as not run.
pub fn run_all_jobs(jobs: &[JobConfig]) -> Vec<crate::error::Result<JobOutcome>> {
    // --- Phase 1: Preflight of segtrain corpora ---
    for (i, job) in jobs.iter().enumerate() {
        let JobConfig::Train(config) = job else {
            continue;
        };
        if let Err(e) = check_corpus(config)
            && e.is_fatal()
        {
            error!(job = %job.describe(), "aborting run before any job: {e}");
            return abort_from(jobs, i, e);
        }
    }

    // --- Phase 2: Run jobs in order ---
    let mut outcomes = Vec::with_capacity(jobs.len());
    for (i, job) in jobs.iter().enumerate() {
        info!(job = %job.describe(), "starting job");
        match run_job(job) {
            Err(e) if e.is_fatal() => {
                error!(job = %job.describe(), "aborting run: {e}");
                outcomes.extend(abort_from(jobs, i, e).into_iter().skip(i));
                return outcomes;
            }
            result => outcomes.push(result),
        }
    }
    outcomes
}

/// Results for an aborted run: `error` for job `failed`, and a not-run
/// configuration error for every other job.
fn abort_from(
    jobs: &[JobConfig],
    failed: usize,
    error: PrepError,
) -> Vec<crate::error::Result<JobOutcome>> {
    let reason = format!("not run: {} failed", jobs[failed].describe());
    let mut outcomes: Vec<_> = (0..jobs.len())
        .map(|_| Err(PrepError::config(reason.clone())))
        .collect();
    outcomes[failed] = Err(error);
    outcomes
}

/// End-of-run totals over all jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub jobs_failed: usize,
    pub documents_written: usize,
    pub manifests_written: Vec<PathBuf>,
    pub document_failures: usize,
    pub skipped_samples: usize,
    pub dropped_lines: usize,
    pub fallback_polygons: usize,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[crate::error::Result<JobOutcome>]) -> Self {
        let mut summary = RunSummary::default();
        for outcome in outcomes {
            match outcome {
                Ok(JobOutcome::Segment(r)) => {
                    summary.documents_written += r.documents.len();
                    summary.document_failures += r.failures.len();
                    for doc in &r.documents {
                        summary.dropped_lines += doc.report.dropped_lines.len();
                        summary.fallback_polygons += doc.report.fallback_polygons;
                    }
                }
                Ok(JobOutcome::Train(r)) => {
                    summary.manifests_written.push(r.manifest_path.clone());
                    summary.document_failures += r.failures.len();
                    summary.skipped_samples += r.match_report.skipped.len();
                }
                Err(_) => summary.jobs_failed += 1,
            }
        }
        summary
    }

    /// True if any job or document failed.
    pub fn has_failures(&self) -> bool {
        self.jobs_failed > 0 || self.document_failures > 0
    }
}
