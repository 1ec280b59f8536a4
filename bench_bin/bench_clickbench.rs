use std::io;
use std::process::ExitCode;

use harness::Arguments;
use olapbench::BenchArguments;

/// Runs the ClickBench queries against the cluster given by
/// BENCHMARK_CONNSTR.
///
/// Accepts the usual libtest arguments, e.g. `bench_clickbench --bench Q2`
/// runs only the queries whose label contains "Q2".
pub fn main() -> ExitCode {
    let args = Arguments::<BenchArguments>::from_args();

    // Logs to stderr, harness output goes to stdout.
    logutil::configure_global_logger(
        tracing::Level::INFO,
        logutil::LogFormat::HumanReadable,
        io::stderr,
    );

    match olapbench::run_clickbench(&args) {
        Ok(conclusion) => conclusion.exit_code(),
        Err(err) => {
            eprintln!("ERROR: {err}");
            ExitCode::FAILURE
        }
    }
}
