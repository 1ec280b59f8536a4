//! Output for the harness.
//!
//! Mirrors the output formats of libtest so existing tooling that consumes
//! `cargo test` output keeps working.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::time::Duration;

use anstream::{AutoStream, ColorChoice};
use anstyle::{AnsiColor, Style};

use crate::Conclusion;
use crate::args::{ColorSetting, FormatSetting};
use crate::trial::{Measurement, Outcome, TestInfo, Trial};

const STYLE_OK: Style = AnsiColor::Green.on_default();
const STYLE_FAILED: Style = AnsiColor::Red.on_default();
const STYLE_IGNORED: Style = AnsiColor::Yellow.on_default();
const STYLE_BENCH: Style = AnsiColor::Cyan.on_default();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PrinterOptions {
    pub format: FormatSetting,
    pub color: ColorSetting,
}

pub(crate) struct Printer {
    out: Box<dyn Write>,
    color: bool,
    format: FormatSetting,
    name_width: usize,
}

impl Printer {
    /// Creates a printer writing to stdout.
    pub fn new(opts: PrinterOptions, trials: &[Trial]) -> Self {
        let color = match opts.color {
            ColorSetting::Auto => AutoStream::choice(&io::stdout()) != ColorChoice::Never,
            ColorSetting::Always => true,
            ColorSetting::Never => false,
        };
        Self::with_writer(Box::new(io::stdout()), color, opts.format, trials)
    }

    /// Creates a printer writing to the given file.
    ///
    /// Falls back to stdout if the file can't be created.
    pub fn with_logfile(path: &str, opts: PrinterOptions, trials: &[Trial]) -> Self {
        match File::create(path) {
            Ok(file) => {
                let color = opts.color == ColorSetting::Always;
                Self::with_writer(Box::new(file), color, opts.format, trials)
            }
            Err(e) => {
                eprintln!("failed to create logfile '{path}': {e}, writing to stdout");
                Self::new(opts, trials)
            }
        }
    }

    fn with_writer(
        out: Box<dyn Write>,
        color: bool,
        format: FormatSetting,
        trials: &[Trial],
    ) -> Self {
        let name_width = trials
            .iter()
            .map(|t| t.info.test_name_with_kind().chars().count())
            .max()
            .unwrap_or(0);

        Printer {
            out,
            color,
            format,
            name_width,
        }
    }

    /// Returns the style to use, or a plain style if color is disabled.
    fn style(&self, style: Style) -> Style {
        if self.color { style } else { Style::new() }
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        let _ = self.out.write_fmt(args);
        let _ = self.out.write_all(b"\n");
        let _ = self.out.flush();
    }

    fn text(&mut self, args: fmt::Arguments<'_>) {
        let _ = self.out.write_fmt(args);
        let _ = self.out.flush();
    }

    pub fn print_title(&mut self, num_trials: u64) {
        match self.format {
            FormatSetting::Pretty | FormatSetting::Terse => {
                let plural = if num_trials == 1 { "" } else { "s" };
                self.line(format_args!(""));
                self.line(format_args!("running {num_trials} test{plural}"));
            }
            FormatSetting::Json => self.line(format_args!(
                r#"{{ "type": "suite", "event": "started", "test_count": {num_trials} }}"#
            )),
        }
    }

    /// Prints the first part of a trial line (`test foo ...`).
    pub fn print_test(&mut self, info: &TestInfo) {
        match self.format {
            FormatSetting::Pretty => {
                let name = info.test_name_with_kind();
                let width = self.name_width;
                self.text(format_args!("test {name: <width$} ... "));
            }
            FormatSetting::Terse => (),
            FormatSetting::Json => self.line(format_args!(
                r#"{{ "type": "test", "event": "started", "name": "{}" }}"#,
                escape8259::escape(&info.name),
            )),
        }
    }

    pub fn print_single_outcome(&mut self, info: &TestInfo, outcome: &Outcome) {
        match self.format {
            FormatSetting::Pretty => {
                let (style, text) = outcome_style(outcome);
                let style = self.style(style);
                match outcome {
                    Outcome::Measured(m) => {
                        self.line(format_args!("{style}{text}{style:#}: {}", fmt_measurement(m)))
                    }
                    _ => self.line(format_args!("{style}{text}{style:#}")),
                }
            }
            FormatSetting::Terse => {
                let (style, c) = match outcome {
                    Outcome::Passed => (STYLE_OK, '.'),
                    Outcome::Failed(_) => (STYLE_FAILED, 'F'),
                    Outcome::Ignored => (STYLE_IGNORED, 'i'),
                    Outcome::Measured(_) => (STYLE_BENCH, 'b'),
                };
                let style = self.style(style);
                self.text(format_args!("{style}{c}{style:#}"));
            }
            FormatSetting::Json => {
                let name = escape8259::escape(&info.name);
                match outcome {
                    Outcome::Passed => self.line(format_args!(
                        r#"{{ "type": "test", "name": "{name}", "event": "ok" }}"#
                    )),
                    Outcome::Failed(failed) => {
                        let stdout = failed
                            .message()
                            .map(|msg| format!(r#", "stdout": "Error: \"{}\"\n""#, escape8259::escape(msg)))
                            .unwrap_or_default();
                        self.line(format_args!(
                            r#"{{ "type": "test", "name": "{name}", "event": "failed"{stdout} }}"#
                        ))
                    }
                    Outcome::Ignored => self.line(format_args!(
                        r#"{{ "type": "test", "name": "{name}", "event": "ignored" }}"#
                    )),
                    Outcome::Measured(m) => self.line(format_args!(
                        r#"{{ "type": "bench", "name": "{name}", "median": {}, "deviation": {} }}"#,
                        m.avg,
                        m.max - m.min,
                    )),
                }
            }
        }
    }

    pub fn print_list(&mut self, trials: &[Trial], ignored: bool) {
        for trial in trials {
            if ignored && !trial.info.is_ignored {
                continue;
            }
            let kind = if trial.info.is_bench { "bench" } else { "test" };
            let name = trial.info.test_name_with_kind();
            self.line(format_args!("{name}: {kind}"));
        }
    }

    pub fn print_failures(&mut self, fails: &[(TestInfo, Option<String>)]) {
        if self.format == FormatSetting::Json {
            return;
        }

        self.line(format_args!(""));
        if fails.iter().any(|(_, msg)| msg.is_some()) {
            self.line(format_args!("failures:"));
            self.line(format_args!(""));

            for (info, msg) in fails {
                self.line(format_args!("---- {} ----", info.test_name_with_kind()));
                if let Some(msg) = msg {
                    self.line(format_args!("{msg}"));
                }
                self.line(format_args!(""));
            }
        }

        self.line(format_args!("failures:"));
        for (info, _) in fails {
            self.line(format_args!("    {}", info.test_name_with_kind()));
        }
    }

    pub fn print_summary(&mut self, conclusion: &Conclusion, execution_time: Duration) {
        match self.format {
            FormatSetting::Pretty | FormatSetting::Terse => {
                let (style, outcome) = if conclusion.has_failed() {
                    (STYLE_FAILED, "FAILED")
                } else {
                    (STYLE_OK, "ok")
                };
                let style = self.style(style);

                self.line(format_args!(""));
                self.line(format_args!(
                    "test result: {style}{outcome}{style:#}. {} passed; {} failed; {} ignored; {} measured; {} filtered out; finished in {:.2}s",
                    conclusion.num_passed,
                    conclusion.num_failed,
                    conclusion.num_ignored,
                    conclusion.num_measured,
                    conclusion.num_filtered_out,
                    execution_time.as_secs_f64(),
                ));
                self.line(format_args!(""));
            }
            FormatSetting::Json => {
                let event = if conclusion.has_failed() {
                    "failed"
                } else {
                    "ok"
                };
                self.line(format_args!(
                    r#"{{ "type": "suite", "event": "{event}", "passed": {}, "failed": {}, "ignored": {}, "measured": {}, "filtered_out": {}, "exec_time": {} }}"#,
                    conclusion.num_passed,
                    conclusion.num_failed,
                    conclusion.num_ignored,
                    conclusion.num_measured,
                    conclusion.num_filtered_out,
                    execution_time.as_secs_f64(),
                ));
            }
        }
    }
}

fn outcome_style(outcome: &Outcome) -> (Style, &'static str) {
    match outcome {
        Outcome::Passed => (STYLE_OK, "ok"),
        Outcome::Failed(_) => (STYLE_FAILED, "FAILED"),
        Outcome::Ignored => (STYLE_IGNORED, "ignored"),
        Outcome::Measured(_) => (STYLE_BENCH, "bench"),
    }
}

fn fmt_measurement(m: &Measurement) -> String {
    format!(
        "avg {:.3}s (min {:.3}s, max {:.3}s)",
        Duration::from_nanos(m.avg).as_secs_f64(),
        Duration::from_nanos(m.min).as_secs_f64(),
        Duration::from_nanos(m.max).as_secs_f64(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measurement_seconds() {
        let m = Measurement {
            avg: 1_500_000_000,
            min: 1_000_000_000,
            max: 2_250_000_000,
        };
        assert_eq!("avg 1.500s (min 1.000s, max 2.250s)", fmt_measurement(&m));
    }
}
