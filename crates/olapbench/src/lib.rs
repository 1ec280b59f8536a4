//! OLAP benchmark against a remote Postgres-compatible cluster.
//!
//! Each ClickBench query is run through `psql` a number of times, and the
//! wall-clock duration of every run is recorded for later comparison.

pub mod clickbench;
pub mod connstr;
pub mod process;
pub mod query;
pub mod recorder;
pub mod report;
pub mod runner;
pub mod suite;
pub mod target;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use harness::{Arguments, Conclusion};
use olapbench_error::Result;
use process::PgBin;
use recorder::MemoryRecorder;
use report::{ReportFormat, ReportMetadata};
use runner::RemoteCompare;
use target::RemotePostgres;
use tracing::{info, warn};

/// Group name used for the ClickBench trials.
pub const CLICKBENCH_KIND: &str = "clickbench";

#[derive(Debug, Args, Clone)]
pub struct BenchArguments {
    /// Connection string of the remote cluster to benchmark.
    ///
    /// Accepts both URIs and keyword/value strings. If not provided, all
    /// benchmark queries are marked as ignored.
    #[clap(long, env = "BENCHMARK_CONNSTR", hide_env_values = true)]
    pub connstr: Option<String>,
    /// Number of times to run each benchmark query.
    #[clap(long, env = "BENCH_COUNT", default_value_t = 3, value_parser = clap::value_parser!(u64).range(1..))]
    pub count: u64,
    /// Directory containing the psql binary. Uses PATH if not set.
    #[clap(long, env = "PG_BIN_DIR")]
    pub pg_bin_dir: Option<PathBuf>,
    /// Directory to write captured psql stdout/stderr to.
    #[clap(long)]
    pub capture_dir: Option<PathBuf>,
    /// Save recorded durations to this file.
    #[clap(long)]
    pub save: Option<PathBuf>,
    /// Format of the saved results.
    #[clap(long, value_enum, default_value_t = ReportFormat::Tsv)]
    pub save_format: ReportFormat,
    /// Platform name to include in json results.
    #[clap(long, env = "PLATFORM")]
    pub platform: Option<String>,
    /// Revision to include in json results.
    #[clap(long, env = "GITHUB_SHA")]
    pub revision: Option<String>,
}

/// Run all ClickBench queries with the given arguments.
///
/// Results are written to the `--save` path once every query has run,
/// including the durations of any failed runs.
pub fn run_clickbench(args: &Arguments<BenchArguments>) -> Result<Conclusion> {
    query::validate_catalog(clickbench::CLICKBENCH_QUERIES)?;

    let extra = &args.extra;
    let (pg, ignored) = match &extra.connstr {
        Some(connstr) => (RemotePostgres::try_new(connstr)?, false),
        None => {
            warn!("BENCHMARK_CONNSTR not set, ClickBench queries will be ignored");
            (RemotePostgres::default(), true)
        }
    };

    let env = Arc::new(RemoteCompare {
        pg,
        pg_bin: PgBin::new(extra.pg_bin_dir.clone(), extra.capture_dir.clone()),
        recorder: MemoryRecorder::new(),
    });

    let trials = suite::query_trials(
        env.clone(),
        clickbench::CLICKBENCH_QUERIES,
        extra.count as usize,
        CLICKBENCH_KIND,
        ignored,
    );

    let conclusion = harness::run(args, trials);

    if let Some(path) = &extra.save {
        let metadata = ReportMetadata {
            platform: extra.platform.clone(),
            revision: extra.revision.clone(),
        };
        let samples = env.recorder.samples();
        report::write_report(path, extra.save_format, &metadata, &samples)?;
        info!(path = %path.display(), samples = samples.len(), "saved results");
    }

    Ok(conclusion)
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::*;

    #[test]
    fn verify_cli() {
        Arguments::<BenchArguments>::command().debug_assert();
    }

    #[test]
    fn count_must_be_positive() {
        let res = Arguments::<BenchArguments>::try_parse_from(["bench", "--count", "0"]);
        assert!(res.is_err());
    }

    #[test]
    fn no_connstr_ignores_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.tsv");

        let args = Arguments::<BenchArguments>::from_iter([
            "bench".to_string(),
            "--format".to_string(),
            "json".to_string(),
            "--save".to_string(),
            path.to_string_lossy().into_owned(),
        ]);
        // Environment may provide a connstr, don't run against it here.
        let args = Arguments {
            extra: BenchArguments {
                connstr: None,
                ..args.extra
            },
            ..args
        };

        let conclusion = run_clickbench(&args).unwrap();
        assert_eq!(43, conclusion.num_ignored);
        assert!(!conclusion.has_failed());

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!("label\trun\tduration_micros\n", contents);
    }
}
