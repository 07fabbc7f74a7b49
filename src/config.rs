//! Command-line and environment configuration shared by every subcommand.

use clap::Args;
use std::path::PathBuf;

use crate::attribution::PipelineOptions;
use crate::attribution::pipeline::DEFAULT_MAX_CHANGES;
use crate::git::cache::DEFAULT_CAPACITY;

#[derive(Args, Debug, Clone)]
pub struct MinerConfig {
    /// Number of commits analyzed at the same time (defaults to the number of CPUs)
    #[arg(short = 'j', long, env = "VULN_BLAME_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Capacity of the file history cache (0 disables caching)
    #[arg(long, env = "VULN_BLAME_CACHE_CAPACITY", default_value_t = DEFAULT_CAPACITY)]
    pub cache_capacity: usize,

    /// Skip commits with more added and deleted lines than this
    #[arg(long, default_value_t = DEFAULT_MAX_CHANGES)]
    pub max_changes: usize,

    /// Do not classify added, deleted and modified functions
    #[arg(long)]
    pub no_functions: bool,

    /// Compute past/future change statistics for touched files
    #[arg(long)]
    pub change_stats: bool,

    /// Analyze a temporary clone created under this directory
    #[arg(long, value_name = "DIR", env = "VULN_BLAME_SCRATCH_DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Program used for blame and log lookups
    #[arg(long, env = "VULN_BLAME_GIT", default_value = "git")]
    pub git: String,

    /// Write JSON-lines reports here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl MinerConfig {
    pub fn concurrency(&self) -> usize {
        self.concurrency
            .filter(|&n| n > 0)
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            analyze_functions: !self.no_functions,
            max_changes: Some(self.max_changes),
        }
    }
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            concurrency: None,
            cache_capacity: DEFAULT_CAPACITY,
            max_changes: DEFAULT_MAX_CHANGES,
            no_functions: false,
            change_stats: false,
            scratch_dir: None,
            git: "git".to_string(),
            output: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        config: MinerConfig,
    }

    #[test]
    fn defaults_match_library_defaults() {
        let cli = TestCli::parse_from(["vuln-blame"]);
        assert_eq!(cli.config.cache_capacity, 2000);
        assert_eq!(cli.config.max_changes, 2000);
        assert_eq!(cli.config.git, "git");
        assert!(cli.config.pipeline_options().analyze_functions);
        assert!(cli.config.concurrency() >= 1);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = TestCli::parse_from([
            "vuln-blame",
            "--concurrency",
            "3",
            "--max-changes",
            "10",
            "--no-functions",
            "--change-stats",
        ]);
        assert_eq!(cli.config.concurrency(), 3);
        let options = cli.config.pipeline_options();
        assert_eq!(options.max_changes, Some(10));
        assert!(!options.analyze_functions);
        assert!(cli.config.change_stats);
    }

    #[test]
    fn zero_concurrency_falls_back_to_cpu_count() {
        let config = MinerConfig {
            concurrency: Some(0),
            ..MinerConfig::default()
        };
        assert!(config.concurrency() >= 1);
    }
}
