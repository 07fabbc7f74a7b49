//! Batch attribution over a worker pool.
//!
//! Every commit runs on the blocking pool under a semaphore permit. A task
//! opens its own repository handle and builds its own pipeline; only the
//! history cache is shared. Reports are handed to the sink as tasks finish.
//! A panicking task becomes a `failed` report and the batch carries on.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::attribution::{AttributionPipeline, PipelineOptions, PipelineRun};
use crate::config::MinerConfig;
use crate::error::{AppError, Result};
use crate::fixing::{fixed_cves, patch_keywords};
use crate::git::{BlameIndex, FileHistoryLookup, GitRepository, HistoryCache, ScratchCheckout};
use crate::models::{AttributionOutcome, CommitReport, ReportStatus};
use crate::source::TreeSitterParser;

/// Receives exactly one report per analyzed commit.
pub trait ReportSink {
    fn write_report(&mut self, report: &CommitReport) -> Result<()>;
}

/// One JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> ReportSink for JsonLinesSink<W> {
    fn write_report(&mut self, report: &CommitReport) -> Result<()> {
        serde_json::to_writer(&mut self.writer, report).map_err(std::io::Error::from)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// A commit to analyze, with its CVE ids when already known.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub commit: String,
    pub cve: Option<String>,
}

impl BatchJob {
    pub fn new(commit: impl Into<String>) -> Self {
        Self {
            commit: commit.into(),
            cve: None,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub blamed: usize,
    pub no_attribution: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    fn record(&mut self, report: &CommitReport) {
        match &report.result {
            ReportStatus::Attributed(attribution) => match attribution.outcome {
                AttributionOutcome::Blamed(_) => self.blamed += 1,
                AttributionOutcome::NoAttributionFound => self.no_attribution += 1,
                AttributionOutcome::Skipped { .. } => self.skipped += 1,
            },
            ReportStatus::Failed { .. } => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.blamed + self.no_attribution + self.skipped + self.failed
    }
}

/// Per-task settings, shared read-only.
struct TaskSettings {
    workdir: PathBuf,
    repository: String,
    options: PipelineOptions,
    git: String,
    change_stats: bool,
    cache: Arc<dyn HistoryCache>,
}

pub async fn run_batch(
    source: &Path,
    jobs: Vec<BatchJob>,
    config: &MinerConfig,
    cache: Arc<dyn HistoryCache>,
    sink: &mut dyn ReportSink,
) -> Result<BatchSummary> {
    let repository = GitRepository::open(source)?.identity()?;
    let scratch = match &config.scratch_dir {
        Some(parent) => Some(ScratchCheckout::create(source, parent)?),
        None => None,
    };
    let workdir = match &scratch {
        Some(checkout) => checkout.path().to_path_buf(),
        None => GitRepository::open(source)?.workdir()?,
    };

    let settings = Arc::new(TaskSettings {
        workdir,
        repository,
        options: config.pipeline_options(),
        git: config.git.clone(),
        change_stats: config.change_stats,
        cache,
    });

    let cache = Arc::clone(&settings.cache);
    let summary = run_jobs(
        jobs,
        config.concurrency(),
        move |commit, cve| analyze_commit(&settings, commit, cve),
        sink,
    )
    .await?;

    if let Some(checkout) = scratch {
        if let Err(e) = checkout.release() {
            warn!("could not remove scratch checkout: {}", e);
        }
    }

    info!(
        "done: {} blamed, {} without attribution, {} skipped, {} failed ({} file histories cached)",
        summary.blamed,
        summary.no_attribution,
        summary.skipped,
        summary.failed,
        cache.len()
    );
    Ok(summary)
}

/// Run `analyze` for every job with at most `concurrency` at a time.
async fn run_jobs<F>(
    jobs: Vec<BatchJob>,
    concurrency: usize,
    analyze: F,
    sink: &mut dyn ReportSink,
) -> Result<BatchSummary>
where
    F: Fn(&str, Option<String>) -> CommitReport + Send + Sync + 'static,
{
    info!("analyzing {} commits with {} workers", jobs.len(), concurrency);
    let analyze = Arc::new(analyze);
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut summary = BatchSummary::default();

    for job in jobs {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|e| AppError::Internal(format!("worker pool closed: {}", e)))?;
        let analyze = Arc::clone(&analyze);

        tasks.spawn(async move {
            let BatchJob { commit, cve } = job;
            let (task_commit, task_cve) = (commit.clone(), cve.clone());
            let joined = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                analyze(&task_commit, task_cve)
            })
            .await;
            match joined {
                Ok(report) => report,
                Err(e) => {
                    error!("{}: worker failed: {}", commit, e);
                    CommitReport::failed(commit, cve, format!("worker failed: {}", e))
                }
            }
        });

        while let Some(finished) = tasks.try_join_next() {
            collect(finished, &mut summary, sink)?;
        }
    }

    while let Some(finished) = tasks.join_next().await {
        collect(finished, &mut summary, sink)?;
    }
    Ok(summary)
}

fn collect(
    finished: std::result::Result<CommitReport, tokio::task::JoinError>,
    summary: &mut BatchSummary,
    sink: &mut dyn ReportSink,
) -> Result<()> {
    match finished {
        Ok(report) => {
            summary.record(&report);
            sink.write_report(&report)
        }
        Err(e) => {
            error!("report task failed: {}", e);
            summary.failed += 1;
            Ok(())
        }
    }
}

fn analyze_commit(settings: &TaskSettings, commit: &str, cve: Option<String>) -> CommitReport {
    let repo = match GitRepository::open(&settings.workdir) {
        Ok(repo) => repo,
        Err(e) => return CommitReport::failed(commit, cve, e.to_string()),
    };
    let detail = match repo.commit_detail(commit) {
        Ok(detail) => detail,
        Err(e) => {
            warn!("{}: {}", commit, e);
            return CommitReport::failed(commit, cve, e.to_string());
        }
    };
    let cve = cve.or_else(|| fixed_cves(&detail.message));

    let blame = BlameIndex::new(&settings.workdir).with_program(&settings.git);
    let parser = TreeSitterParser::new();
    let PipelineRun { diff, attribution } = match AttributionPipeline::new(&repo, &blame, &parser)
        .with_options(settings.options.clone())
        .run(&detail.oid)
    {
        Ok(run) => run,
        Err(e) => {
            warn!("{}", e);
            return CommitReport::failed(detail.oid.clone(), cve, e.to_string());
        }
    };

    let skipped = matches!(attribution.outcome, AttributionOutcome::Skipped { .. });
    let change_statistic = (settings.change_stats && !skipped).then(|| {
        FileHistoryLookup::new(&settings.workdir, settings.repository.as_str(), &settings.git, settings.cache.as_ref())
            .commit_changes(&diff)
    });

    CommitReport {
        commit: detail.oid.clone(),
        cve,
        patch_keywords: patch_keywords(&diff.patch),
        detail: Some(detail),
        result: ReportStatus::Attributed(attribution),
        change_statistic,
    }
}
