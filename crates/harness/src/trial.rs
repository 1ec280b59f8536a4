use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

/// A single test or benchmark.
///
/// libtest often calls benchmarks "tests", which is a bit confusing. So here
/// it is called "trial".
///
/// A trial is created via `Trial::test` or `Trial::bench`. The trial's `name`
/// is printed and used for filtering. The `runner` is called when the
/// test/benchmark is executed to determine its outcome. If `runner` panics, the
/// trial is considered "failed". If you need the behavior of `#[should_panic]`
/// you need to catch the panic yourself. You likely want to compare the panic
/// payload to an expected value anyway.
pub struct Trial {
    pub(crate) runner: Box<dyn FnOnce(bool) -> Outcome + Send>,
    pub(crate) info: TestInfo,
}

impl Trial {
    /// Creates a (non-benchmark) test with the given name and runner.
    ///
    /// The runner returning `Ok(())` is interpreted as the test passing. If the
    /// runner returns `Err(_)`, the test is considered failed.
    pub fn test<R>(name: impl Into<String>, runner: R) -> Self
    where
        R: FnOnce() -> Result<(), Failed> + Send + 'static,
    {
        Self {
            runner: Box::new(move |_test_mode| match runner() {
                Ok(()) => Outcome::Passed,
                Err(failed) => Outcome::Failed(failed),
            }),
            info: TestInfo {
                name: name.into(),
                kind: String::new(),
                is_ignored: false,
                is_bench: false,
            },
        }
    }

    /// Creates a benchmark with the given name and runner.
    ///
    /// If the runner's parameter `test_mode` is `true`, the runner function
    /// should run all code just once, without measuring, just to make sure it
    /// does not panic. If the parameter is `false`, it should perform the
    /// actual benchmark. If `test_mode` is `true` you may return `Ok(None)`,
    /// but if it's `false`, you have to return a `Measurement`, or else the
    /// benchmark is considered a failure.
    ///
    /// `test_mode` is `true` if neither `--bench` nor `--test` are set, and
    /// `false` when `--bench` is set. If `--test` is set, benchmarks are not
    /// run at all, and both flags cannot be set at the same time.
    pub fn bench<R>(name: impl Into<String>, runner: R) -> Self
    where
        R: FnOnce(bool) -> Result<Option<Measurement>, Failed> + Send + 'static,
    {
        Self {
            runner: Box::new(move |test_mode| match runner(test_mode) {
                Err(failed) => Outcome::Failed(failed),
                Ok(_) if test_mode => Outcome::Passed,
                Ok(Some(measurement)) => Outcome::Measured(measurement),
                Ok(None) => {
                    Outcome::Failed("bench runner returned `Ok(None)` in bench mode".into())
                }
            }),
            info: TestInfo {
                name: name.into(),
                kind: String::new(),
                is_ignored: false,
                is_bench: true,
            },
        }
    }

    /// Sets the "kind" of this test/benchmark. If this string is not
    /// empty, it is printed in brackets before the test name (e.g.
    /// `test [my-kind] test_name`). (Default: *empty*)
    pub fn with_kind(self, kind: impl Into<String>) -> Self {
        Self {
            info: TestInfo {
                kind: kind.into(),
                ..self.info
            },
            ..self
        }
    }

    /// Sets whether or not this test is considered "ignored". (Default: `false`)
    ///
    /// With the built-in test suite, you can annotate `#[ignore]` on tests to
    /// not execute them by default (for example because they take a long time
    /// or require a special environment). If the `--ignored` flag is set,
    /// ignored tests are executed, too.
    pub fn with_ignored_flag(self, is_ignored: bool) -> Self {
        Self {
            info: TestInfo {
                is_ignored,
                ..self.info
            },
            ..self
        }
    }

    /// Returns the name of this trial.
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Returns the kind of this trial. If you have not set a kind, this is an
    /// empty string.
    pub fn kind(&self) -> &str {
        &self.info.kind
    }

    /// Returns `true` iff this trial is a benchmark (as opposed to a test).
    pub fn is_bench(&self) -> bool {
        self.info.is_bench
    }
}

impl fmt::Debug for Trial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct OpaqueRunner;
        impl fmt::Debug for OpaqueRunner {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("<runner>")
            }
        }

        f.debug_struct("Trial")
            .field("runner", &OpaqueRunner)
            .field("name", &self.info.name)
            .field("kind", &self.info.kind)
            .field("is_ignored", &self.info.is_ignored)
            .field("is_bench", &self.info.is_bench)
            .finish()
    }
}

#[derive(Debug)]
pub(crate) struct TestInfo {
    pub name: String,
    pub kind: String,
    pub is_ignored: bool,
    pub is_bench: bool,
}

impl TestInfo {
    pub fn test_name_with_kind(&self) -> Cow<'_, str> {
        if self.kind.is_empty() {
            Cow::Borrowed(&self.name)
        } else {
            Cow::Owned(format!("[{}] {}", self.kind, self.name))
        }
    }
}

/// Output of a benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    /// Average time in ns.
    pub avg: u64,
    /// Fastest run in ns.
    pub min: u64,
    /// Slowest run in ns.
    pub max: u64,
}

impl Measurement {
    /// Compute a measurement from a set of run durations.
    ///
    /// Returns None if there are no durations.
    pub fn from_durations<'a>(durations: impl IntoIterator<Item = &'a Duration>) -> Option<Self> {
        let mut count: u128 = 0;
        let mut total: u128 = 0;
        let mut min = u128::MAX;
        let mut max = 0;

        for dur in durations {
            let nanos = dur.as_nanos();
            count += 1;
            total += nanos;
            min = min.min(nanos);
            max = max.max(nanos);
        }

        if count == 0 {
            return None;
        }

        Some(Measurement {
            avg: (total / count) as u64,
            min: min as u64,
            max: max as u64,
        })
    }
}

/// Indicates that a test/benchmark has failed. Optionally carries a message.
///
/// You usually want to use the `From` impl of this type, which allows you to
/// convert any `T: fmt::Display` (e.g. `String`, `&str`, ...) into `Failed`.
#[derive(Debug, Clone)]
pub struct Failed {
    pub(crate) msg: Option<String>,
}

impl Failed {
    /// Returns the message of this instance.
    pub fn message(&self) -> Option<&str> {
        self.msg.as_deref()
    }
}

impl<M: std::fmt::Display> From<M> for Failed {
    fn from(msg: M) -> Self {
        Self {
            msg: Some(msg.to_string()),
        }
    }
}

/// The outcome of performing a test/benchmark.
#[derive(Debug, Clone)]
pub(crate) enum Outcome {
    /// The test passed.
    Passed,
    /// The test or benchmark failed.
    Failed(Failed),
    /// The test or benchmark was ignored.
    Ignored,
    /// The benchmark was successfully run.
    Measured(Measurement),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measurement_from_durations() {
        let durations = [
            Duration::from_nanos(30),
            Duration::from_nanos(10),
            Duration::from_nanos(20),
        ];

        let m = Measurement::from_durations(&durations).unwrap();
        assert_eq!(
            Measurement {
                avg: 20,
                min: 10,
                max: 30,
            },
            m
        );
    }

    #[test]
    fn measurement_empty() {
        assert_eq!(None, Measurement::from_durations(&[] as &[Duration]));
    }

    #[test]
    fn bench_none_in_bench_mode_fails() {
        let trial = Trial::bench("Q0", |_test_mode| Ok(None));
        let outcome = (trial.runner)(false);
        assert!(matches!(outcome, Outcome::Failed(_)));
    }

    #[test]
    fn bench_in_test_mode_passes() {
        let trial = Trial::bench("Q0", |_test_mode| Ok(None));
        let outcome = (trial.runner)(true);
        assert!(matches!(outcome, Outcome::Passed));
    }

    #[test]
    fn kind_in_name() {
        let trial = Trial::test("Q0", || Ok(())).with_kind("clickbench");
        assert_eq!("[clickbench] Q0", trial.info.test_name_with_kind());
    }
}
