use std::path::Path;
use std::process::ExitCode;

use pagexml_prep::config;
use pagexml_prep::pipeline::orchestrator::{JobConfig, JobOutcome, RunSummary, run_all_jobs};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("Usage: pagexml_prep <jobs.yaml>...");
        eprintln!("  Assemble PAGE XML from segmentation results and prepare training corpora.");
        eprintln!("  settings.yaml next to a job file provides defaults. Log level: RUST_LOG.");
        return if args.is_empty() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        eprintln!("pagexml_prep {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Configuration errors in any job file abort before any job runs.
    let mut job_configs: Vec<JobConfig> = Vec::new();
    for job_file_arg in &args {
        match config::load_jobs(Path::new(job_file_arg)) {
            Ok(jobs) => job_configs.extend(jobs),
            Err(e) => {
                eprintln!("ERROR: {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    let results = run_all_jobs(&job_configs);

    for (job, result) in job_configs.iter().zip(&results) {
        match result {
            Ok(JobOutcome::Segment(r)) => {
                eprintln!(
                    "OK: {} ({} documents, {} failed)",
                    job.describe(),
                    r.documents.len(),
                    r.failures.len()
                );
                for failure in &r.failures {
                    eprintln!("  FAILED: {}: {}", failure.path.display(), failure.error);
                }
            }
            Ok(JobOutcome::Train(r)) => {
                eprintln!(
                    "OK: {} -> {} ({} training, {} evaluation)",
                    job.describe(),
                    r.manifest_path.display(),
                    r.split.training.len(),
                    r.split.evaluation.len()
                );
                for failure in &r.failures {
                    eprintln!("  FAILED: {}: {}", failure.path.display(), failure.error);
                }
            }
            Err(e) => eprintln!("ERROR: {}: {e}", job.describe()),
        }
    }

    let summary = RunSummary::from_outcomes(&results);
    eprintln!(
        "Summary: {} documents written, {} manifests, {} document failures, {} skipped samples, \
         {} dropped lines, {} fallback polygons, {} failed jobs",
        summary.documents_written,
        summary.manifests_written.len(),
        summary.document_failures,
        summary.skipped_samples,
        summary.dropped_lines,
        summary.fallback_polygons,
        summary.jobs_failed
    );

    if summary.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
