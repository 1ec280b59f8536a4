use clap::{Args, Parser, ValueEnum};

use crate::printer::PrinterOptions;
use crate::trial::Trial;

/// Command line arguments.
///
/// Everything libtest understands, plus `extra` arguments specific to the
/// binary using the harness (e.g. connection settings for a benchmark).
#[derive(Parser, Debug, Clone)]
pub struct Arguments<A: Args> {
    /// Run ignored and non-ignored trials.
    #[arg(long)]
    pub include_ignored: bool,

    /// Run only ignored trials.
    #[arg(long)]
    pub ignored: bool,

    /// Run tests, but not benchmarks.
    #[arg(long, conflicts_with = "bench")]
    pub test: bool,

    /// Run benchmarks, but not tests.
    #[arg(long)]
    pub bench: bool,

    /// List all tests and benchmarks.
    #[arg(long)]
    pub list: bool,

    /// Exactly match filters rather than by substring
    #[arg(long)]
    pub exact: bool,

    /// Display one character per trial instead of one line. Alias to --format=terse
    #[arg(short = 'q', long = "quiet", conflicts_with = "format")]
    pub quiet: bool,

    /// Write logs to the specified file instead of stdout
    #[arg(long, value_name = "PATH")]
    pub logfile: Option<String>,

    /// Skip trials whose names contain FILTER (this flag can be used multiple times)
    #[arg(long = "skip", value_name = "FILTER")]
    pub skip: Vec<String>,

    /// Configure coloring of output:
    ///
    /// - auto = colorize if stdout is a tty (default)
    /// - always = always colorize output
    /// - never = never colorize output
    #[arg(long, value_enum, value_name = "auto|always|never")]
    pub color: Option<ColorSetting>,

    /// Configure formatting of output:
    ///
    /// - pretty = Print verbose output
    /// - terse = Display one character per trial
    /// - json = Print json events
    #[arg(long = "format", value_enum, value_name = "pretty|terse|json")]
    pub format: Option<FormatSetting>,

    /// The FILTER string is tested against the name of all trials, and only
    /// those trials whose names contain the filter are run.
    #[arg(value_name = "FILTER")]
    pub filter: Option<String>,

    #[command(flatten)]
    pub extra: A,
}

impl<A: Args> Arguments<A> {
    /// Parses the global CLI arguments given to the application.
    ///
    /// If the parsing fails (due to incorrect CLI args), an error is shown and
    /// the application exits. If help is requested (`-h` or `--help`), a help
    /// message is shown and the application exits, too.
    pub fn from_args() -> Self {
        Parser::parse()
    }

    /// Like `from_args()`, but operates on an explicit iterator and not the
    /// global arguments. Note that the first element is the executable name!
    pub fn from_iter<I>(iter: I) -> Self
    where
        Self: Sized,
        I: IntoIterator,
        I::Item: Into<std::ffi::OsString> + Clone,
    {
        Parser::parse_from(iter)
    }

    /// Returns `true` if the given trial should be ignored.
    pub(crate) fn is_ignored(&self, trial: &Trial) -> bool {
        (trial.info.is_ignored && !self.ignored && !self.include_ignored)
            || (trial.info.is_bench && self.test)
            || (!trial.info.is_bench && self.bench)
    }

    pub(crate) fn is_filtered_out(&self, trial: &Trial) -> bool {
        let name = &trial.info.name;

        // If a filter was specified, apply this
        if let Some(filter) = &self.filter {
            match self.exact {
                true if name != filter => return true,
                false if !name.contains(filter.as_str()) => return true,
                _ => {}
            };
        }

        // If any skip pattern were specified, test for all patterns.
        for skip_filter in &self.skip {
            match self.exact {
                true if name == skip_filter => return true,
                false if name.contains(skip_filter.as_str()) => return true,
                _ => {}
            }
        }

        if self.ignored && !trial.info.is_ignored {
            return true;
        }

        false
    }

    pub(crate) fn printer_options(&self) -> PrinterOptions {
        let format = if self.quiet {
            FormatSetting::Terse
        } else {
            self.format.unwrap_or_default()
        };

        PrinterOptions {
            format,
            color: self.color.unwrap_or_default(),
        }
    }
}

/// Possible values for the `--color` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum ColorSetting {
    /// Colorize output if stdout is a tty (default).
    #[default]
    Auto,
    /// Always colorize output.
    Always,
    /// Never colorize output.
    Never,
}

/// Possible values for the `--format` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum FormatSetting {
    /// One line per trial. Output for humans. (default)
    #[default]
    Pretty,
    /// One character per trial. Useful for suites with many trials.
    Terse,
    /// Json output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Args)]
    struct NoExtra {}

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Arguments::<NoExtra>::command().debug_assert();
    }

    #[test]
    fn filter_by_substring() {
        let args = Arguments::<NoExtra>::from_iter(["bin", "Q1"]);
        let q1 = Trial::test("Q1", || Ok(()));
        let q12 = Trial::test("Q12", || Ok(()));
        let q2 = Trial::test("Q2", || Ok(()));

        assert!(!args.is_filtered_out(&q1));
        assert!(!args.is_filtered_out(&q12));
        assert!(args.is_filtered_out(&q2));
    }

    #[test]
    fn filter_exact() {
        let args = Arguments::<NoExtra>::from_iter(["bin", "--exact", "Q1"]);
        let q1 = Trial::test("Q1", || Ok(()));
        let q12 = Trial::test("Q12", || Ok(()));

        assert!(!args.is_filtered_out(&q1));
        assert!(args.is_filtered_out(&q12));
    }

    #[test]
    fn skip_multiple() {
        let args = Arguments::<NoExtra>::from_iter(["bin", "--skip", "Q1", "--skip", "Q3"]);

        assert!(args.is_filtered_out(&Trial::test("Q10", || Ok(()))));
        assert!(args.is_filtered_out(&Trial::test("Q3", || Ok(()))));
        assert!(!args.is_filtered_out(&Trial::test("Q2", || Ok(()))));
    }

    #[test]
    fn ignored_trials() {
        let trial = Trial::test("Q0", || Ok(())).with_ignored_flag(true);

        let args = Arguments::<NoExtra>::from_iter(["bin"]);
        assert!(args.is_ignored(&trial));

        let args = Arguments::<NoExtra>::from_iter(["bin", "--include-ignored"]);
        assert!(!args.is_ignored(&trial));
    }

    #[test]
    fn quiet_is_terse() {
        let args = Arguments::<NoExtra>::from_iter(["bin", "-q"]);
        assert_eq!(FormatSetting::Terse, args.printer_options().format);
    }
}
