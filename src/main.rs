//! vuln-blame - locate the commits that introduced fixed vulnerabilities
//!
//! # Usage
//! ```bash
//! vuln-blame attribute /path/to/repo <FIX_SHA>...   # attribute given fixing commits
//! vuln-blame scan /path/to/repo --change-stats      # attribute every commit naming a CVE
//! vuln-blame blame /path/to/repo <REV> src/a.c -l 42
//! ```
//!
//! Reports are written as JSON lines to stdout or `--output`; logs go to
//! stderr and are filtered with `RUST_LOG`.

mod attribution;
mod batch;
mod config;
mod error;
mod fixing;
mod git;
mod models;
mod source;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use batch::{BatchJob, BatchSummary, JsonLinesSink};
use config::MinerConfig;
use git::{BlameIndex, GitRepository, HistoryCache, LruHistoryCache, NoopHistoryCache};

/// Find bug-introducing commits for vulnerability fixes
#[derive(Parser)]
#[command(name = "vuln-blame")]
#[command(about = "Locate the commits that introduced fixed vulnerabilities", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Attribute the given fixing commits
    Attribute {
        /// Path to the git repository
        #[arg(value_name = "REPO_PATH")]
        repo_path: PathBuf,

        /// Fixing commits (ids or revisions)
        #[arg(value_name = "COMMIT", required = true)]
        commits: Vec<String>,

        #[command(flatten)]
        config: MinerConfig,
    },
    /// Walk history from HEAD and attribute every commit whose message names a CVE
    Scan {
        /// Path to the git repository
        #[arg(value_name = "REPO_PATH")]
        repo_path: PathBuf,

        /// Stop after this many fixing commits
        #[arg(long)]
        limit: Option<usize>,

        #[command(flatten)]
        config: MinerConfig,
    },
    /// Print the blame records of a file as of a revision
    Blame {
        /// Path to the git repository
        #[arg(value_name = "REPO_PATH")]
        repo_path: PathBuf,

        /// Revision to annotate from
        rev: String,

        /// File path inside the repository
        path: String,

        /// Only print this line
        #[arg(short, long)]
        line: Option<u32>,

        /// Program used for the lookup
        #[arg(long, env = "VULN_BLAME_GIT", default_value = "git")]
        git: String,
    },
}

fn open_sink(output: Option<&Path>) -> anyhow::Result<JsonLinesSink<Box<dyn Write>>> {
    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };
    Ok(JsonLinesSink::new(writer))
}

/// Fixing commits reachable from HEAD, newest first.
fn fixing_commits(repo_path: &Path, limit: Option<usize>) -> anyhow::Result<Vec<BatchJob>> {
    let repo = GitRepository::open(repo_path)?;
    let jobs: Vec<BatchJob> = repo
        .walk_history()?
        .into_iter()
        .filter_map(|commit| {
            fixing::fixed_cves(&commit.message).map(|cve| BatchJob {
                commit: commit.oid,
                cve: Some(cve),
            })
        })
        .take(limit.unwrap_or(usize::MAX))
        .collect();
    info!("{} fixing commits found", jobs.len());
    Ok(jobs)
}

async fn attribute(repo_path: &Path, jobs: Vec<BatchJob>, config: MinerConfig) -> anyhow::Result<BatchSummary> {
    let cache: Arc<dyn HistoryCache> = match config.cache_capacity {
        0 => Arc::new(NoopHistoryCache),
        capacity => Arc::new(LruHistoryCache::new(capacity)),
    };
    let mut sink = open_sink(config.output.as_deref())?;

    let summary = tokio::select! {
        summary = batch::run_batch(repo_path, jobs, &config, cache, &mut sink) => summary?,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, stopping");
            anyhow::bail!("interrupted");
        }
    };
    Ok(summary)
}

fn print_blame(repo_path: &Path, rev: &str, path: &str, line: Option<u32>, git: &str) -> anyhow::Result<()> {
    let workdir = GitRepository::open(repo_path)?.workdir()?;
    let blame = BlameIndex::new(workdir)
        .with_program(git)
        .lines_for(rev, path)
        .with_context(|| format!("blaming {} at {}", path, rev))?;

    let mut out = io::stdout().lock();
    match line {
        Some(line) => {
            let record = blame.for_line(line)?;
            serde_json::to_writer(&mut out, record)?;
            writeln!(out)?;
        }
        None => {
            for record in blame.records() {
                serde_json::to_writer(&mut out, record)?;
                writeln!(out)?;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let summary = match cli.command {
        Commands::Attribute {
            repo_path,
            commits,
            config,
        } => {
            let jobs = commits.into_iter().map(BatchJob::new).collect();
            attribute(&repo_path, jobs, config).await?
        }
        Commands::Scan {
            repo_path,
            limit,
            config,
        } => {
            let jobs = fixing_commits(&repo_path, limit)?;
            attribute(&repo_path, jobs, config).await?
        }
        Commands::Blame {
            repo_path,
            rev,
            path,
            line,
            git,
        } => {
            return print_blame(&repo_path, &rev, &path, line, &git);
        }
    };

    if summary.failed > 0 {
        warn!("{} of {} commits failed", summary.failed, summary.total());
    }
    Ok(())
}
