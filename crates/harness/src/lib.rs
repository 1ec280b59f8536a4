//! A libtest-compatible harness for running trials (tests and benchmarks)
//! that are generated at runtime.
//!
//! Each trial runs in isolation: a failing or panicking trial is recorded as
//! failed without affecting the rest of the run.

pub mod args;
mod printer;
pub mod trial;

use std::process::ExitCode;
use std::time::Instant;

use clap::Args;
use printer::Printer;
use trial::{Outcome, TestInfo, Trial};

pub use crate::args::{Arguments, ColorSetting, FormatSetting};

/// Contains information about the entire run. Is returned by [`run`].
///
/// Return [`Conclusion::exit_code`] from `main` to signal success or failure to
/// the calling process.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use = "Use `exit_code()` to set the correct return code"]
pub struct Conclusion {
    /// Number of tests and benchmarks that were filtered out (either by the
    /// filter-in pattern or by `--skip` arguments).
    pub num_filtered_out: u64,
    /// Number of passed tests (and benchmarks run in test mode).
    pub num_passed: u64,
    /// Number of failed tests and benchmarks.
    pub num_failed: u64,
    /// Number of ignored tests and benchmarks.
    pub num_ignored: u64,
    /// Number of benchmarks that successfully ran.
    pub num_measured: u64,
}

impl Conclusion {
    /// Returns an exit code that can be returned from `main` to signal
    /// success/failure to the calling process.
    pub fn exit_code(&self) -> ExitCode {
        if self.has_failed() {
            ExitCode::from(101)
        } else {
            ExitCode::SUCCESS
        }
    }

    /// Returns whether there have been any failures.
    pub fn has_failed(&self) -> bool {
        self.num_failed > 0
    }

    fn empty() -> Self {
        Self {
            num_filtered_out: 0,
            num_passed: 0,
            num_failed: 0,
            num_ignored: 0,
            num_measured: 0,
        }
    }
}

/// Runs all given trials (tests & benchmarks).
///
/// Trials are run sequentially on the calling thread in the order given.
///
/// The returned value contains a couple of useful information. See `Conclusion`
/// for more information. If `--list` was specified, a list is printed and a
/// dummy `Conclusion` is returned.
pub fn run<A>(args: &Arguments<A>, mut tests: Vec<Trial>) -> Conclusion
where
    A: Args,
{
    let start_instant = Instant::now();
    let mut conclusion = Conclusion::empty();

    // Apply filtering
    if args.filter.is_some() || !args.skip.is_empty() || args.ignored {
        let len_before = tests.len() as u64;
        tests.retain(|test| !args.is_filtered_out(test));
        conclusion.num_filtered_out = len_before - tests.len() as u64;
    }
    let tests = tests;

    // Create printer which is used for all output.
    let mut printer = match &args.logfile {
        Some(path) => Printer::with_logfile(path, args.printer_options(), &tests),
        None => Printer::new(args.printer_options(), &tests),
    };

    // If `--list` is specified, just print the list and return.
    if args.list {
        printer.print_list(&tests, args.ignored);
        return Conclusion::empty();
    }

    // Print number of tests
    printer.print_title(tests.len() as u64);

    let mut failed_tests = Vec::new();
    let mut handle_outcome = |outcome: Outcome, test: TestInfo, printer: &mut Printer| {
        printer.print_single_outcome(&test, &outcome);

        // Handle outcome
        match outcome {
            Outcome::Passed => conclusion.num_passed += 1,
            Outcome::Failed(failed) => {
                failed_tests.push((test, failed.msg));
                conclusion.num_failed += 1;
            }
            Outcome::Ignored => conclusion.num_ignored += 1,
            Outcome::Measured(_) => conclusion.num_measured += 1,
        }
    };

    // Execute all tests.
    let test_mode = !args.bench;

    // Run test sequentially in main thread
    for test in tests {
        // Print `test foo    ...`, run the test, then print the outcome in
        // the same line.
        printer.print_test(&test.info);
        let outcome = if args.is_ignored(&test) {
            Outcome::Ignored
        } else {
            run_single(test.runner, test_mode)
        };
        handle_outcome(outcome, test.info, &mut printer);
    }

    // Print failures if there were any, and the final summary.
    if !failed_tests.is_empty() {
        printer.print_failures(&failed_tests);
    }

    printer.print_summary(&conclusion, start_instant.elapsed());

    conclusion
}

/// Runs the given runner, catching any panics and treating them as a failed test.
fn run_single<'a>(runner: Box<dyn FnOnce(bool) -> Outcome + 'a>, test_mode: bool) -> Outcome {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    catch_unwind(AssertUnwindSafe(move || runner(test_mode))).unwrap_or_else(|e| {
        // The `panic` information is just an `Any` object representing the
        // value the panic was invoked with. For most panics (which use
        // `panic!` like `println!`), this is either `&str` or `String`.
        let payload = e
            .downcast_ref::<String>()
            .map(|s| s.as_str())
            .or(e.downcast_ref::<&str>().map(|s| *s));

        let msg = match payload {
            Some(payload) => format!("test panicked: {payload}"),
            None => "test panicked".to_string(),
        };
        Outcome::Failed(msg.into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Args)]
    struct NoExtra {}

    fn quiet_args(extra: &[&str]) -> Arguments<NoExtra> {
        let mut argv = vec!["bin", "--format", "json"];
        argv.extend_from_slice(extra);
        Arguments::from_iter(argv)
    }

    #[test]
    fn failure_is_isolated() {
        let trials = vec![
            Trial::test("Q0", || Ok(())),
            Trial::test("Q1", || Err("psql failed".into())),
            Trial::test("Q2", || Ok(())),
        ];

        let conclusion = run(&quiet_args(&[]), trials);
        assert_eq!(2, conclusion.num_passed);
        assert_eq!(1, conclusion.num_failed);
        assert!(conclusion.has_failed());
    }

    #[test]
    fn panic_is_failure() {
        let trials = vec![Trial::test("Q0", || panic!("oh no"))];

        let conclusion = run(&quiet_args(&[]), trials);
        assert_eq!(1, conclusion.num_failed);
    }

    #[test]
    fn filtered_and_ignored() {
        let trials = vec![
            Trial::test("Q0", || Ok(())),
            Trial::test("Q1", || Ok(())).with_ignored_flag(true),
            Trial::test("Q2", || Ok(())),
        ];

        let conclusion = run(&quiet_args(&["--skip", "Q2"]), trials);
        assert_eq!(1, conclusion.num_passed);
        assert_eq!(1, conclusion.num_ignored);
        assert_eq!(1, conclusion.num_filtered_out);
    }

    #[test]
    fn bench_mode_measures() {
        let trials = vec![Trial::bench("Q0", |_| {
            Ok(Some(trial::Measurement {
                avg: 2,
                min: 1,
                max: 3,
            }))
        })];

        let conclusion = run(&quiet_args(&["--bench"]), trials);
        assert_eq!(1, conclusion.num_measured);
        assert!(!conclusion.has_failed());
    }
}
