use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};

use olapbench_error::{BenchError, OptionExt, Result, ResultExt};
use tracing::debug;

/// Output captured from a subprocess that exited successfully.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs external processes on behalf of the benchmark.
pub trait ProcessRunner: Send + Sync {
    /// Run `argv` to completion, blocking the calling thread.
    ///
    /// `env` is added on top of the inherited environment for this child
    /// only. Errors if the process can't be launched or exits with a non-zero
    /// status, with the captured output attached to the error.
    fn run_capture(&self, argv: &[String], env: &BTreeMap<String, String>)
    -> Result<CapturedOutput>;
}

/// Runs Postgres client binaries.
#[derive(Debug, Default)]
pub struct PgBin {
    /// Directory containing the binaries. Falls back to PATH if not set.
    bin_dir: Option<PathBuf>,
    /// Directory to write `.stdout` and `.stderr` captures to.
    capture_dir: Option<PathBuf>,
    invocations: AtomicUsize,
}

impl PgBin {
    pub fn new(bin_dir: Option<PathBuf>, capture_dir: Option<PathBuf>) -> Self {
        PgBin {
            bin_dir,
            capture_dir,
            invocations: AtomicUsize::new(0),
        }
    }

    fn resolve_program(&self, program: &str) -> PathBuf {
        match &self.bin_dir {
            Some(dir) => dir.join(program),
            None => PathBuf::from(program),
        }
    }

    /// Write captured output to the capture dir, if configured.
    fn write_captures(&self, program: &str, stdout: &[u8], stderr: &[u8]) -> Result<()> {
        let dir = match &self.capture_dir {
            Some(dir) => dir,
            None => return Ok(()),
        };

        let n = self.invocations.fetch_add(1, Ordering::Relaxed);
        let name = Path::new(program)
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.to_string());
        let base = dir.join(format!("{name}_{n}"));

        fs::create_dir_all(dir).context("Failed to create capture directory")?;
        fs::write(base.with_extension("stdout"), stdout).context("Failed to write stdout capture")?;
        fs::write(base.with_extension("stderr"), stderr).context("Failed to write stderr capture")?;

        Ok(())
    }
}

impl ProcessRunner for PgBin {
    fn run_capture(
        &self,
        argv: &[String],
        env: &BTreeMap<String, String>,
    ) -> Result<CapturedOutput> {
        let program = argv.first().required("program")?;
        let path = self.resolve_program(program);

        let mut cmd = Command::new(&path);
        cmd.args(&argv[1..]).envs(env);

        if let Some(lib_dir) = self.bin_dir.as_ref().and_then(|dir| dir.parent()) {
            let lib_dir = lib_dir.join("lib");
            cmd.env("LD_LIBRARY_PATH", &lib_dir);
            cmd.env("DYLD_LIBRARY_PATH", &lib_dir);
        }

        debug!(program = %path.display(), args = ?&argv[1..], "running command");

        let output = cmd
            .output()
            .context_fn(|| format!("Failed to launch '{}'", path.display()))?;

        let captured = self.write_captures(program, &output.stdout, &output.stderr);

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let mut err = BenchError::new("Process exited with non-zero status")
                .with_field("command", path.display().to_string())
                .with_field("status", output.status)
                .with_field("stdout", stdout)
                .with_field("stderr", stderr);
            // Keep the process output, the capture failure is secondary.
            if let Err(capture_err) = captured {
                err = err.with_field("capture_error", capture_err.to_string());
            }
            return Err(err);
        }
        captured?;

        Ok(CapturedOutput { stdout, stderr })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn captures_stdout() {
        let pg_bin = PgBin::default();
        let out = pg_bin
            .run_capture(&argv(&["sh", "-c", "echo hello"]), &BTreeMap::new())
            .unwrap();
        assert_eq!("hello\n", out.stdout);
    }

    #[test]
    fn passes_env() {
        let pg_bin = PgBin::default();
        let env = BTreeMap::from([("PGPASSWORD".to_string(), "secret".to_string())]);
        let out = pg_bin
            .run_capture(&argv(&["sh", "-c", "printf %s \"$PGPASSWORD\""]), &env)
            .unwrap();
        assert_eq!("secret", out.stdout);
    }

    #[test]
    fn non_zero_exit() {
        let pg_bin = PgBin::default();
        let err = pg_bin
            .run_capture(
                &argv(&["sh", "-c", "echo out; echo bad >&2; exit 3"]),
                &BTreeMap::new(),
            )
            .unwrap_err();

        assert_eq!("Process exited with non-zero status", err.get_msg());
        assert_eq!(Some("out\n".to_string()), err.get_field("stdout"));
        assert_eq!(Some("bad\n".to_string()), err.get_field("stderr"));
    }

    #[test]
    fn missing_binary() {
        let pg_bin = PgBin::default();
        let err = pg_bin
            .run_capture(&argv(&["definitely-not-a-real-binary"]), &BTreeMap::new())
            .unwrap_err();
        assert!(err.get_msg().starts_with("Failed to launch"));
    }

    #[test]
    fn empty_argv() {
        let pg_bin = PgBin::default();
        pg_bin.run_capture(&[], &BTreeMap::new()).unwrap_err();
    }

    #[test]
    fn writes_captures() {
        let dir = tempfile::tempdir().unwrap();
        let pg_bin = PgBin::new(None, Some(dir.path().join("captures")));

        pg_bin
            .run_capture(&argv(&["sh", "-c", "echo first"]), &BTreeMap::new())
            .unwrap();
        let _ = pg_bin
            .run_capture(&argv(&["sh", "-c", "echo second >&2; exit 1"]), &BTreeMap::new())
            .unwrap_err();

        let captures = dir.path().join("captures");
        assert_eq!(
            "first\n",
            fs::read_to_string(captures.join("sh_0.stdout")).unwrap()
        );
        assert_eq!(
            "second\n",
            fs::read_to_string(captures.join("sh_1.stderr")).unwrap()
        );
    }

    #[test]
    fn capture_failure_keeps_process_output() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the capture directory should be.
        let not_a_dir = dir.path().join("captures");
        fs::write(&not_a_dir, "").unwrap();
        let pg_bin = PgBin::new(None, Some(not_a_dir));

        let err = pg_bin
            .run_capture(
                &argv(&["sh", "-c", "echo out; echo bad >&2; exit 3"]),
                &BTreeMap::new(),
            )
            .unwrap_err();

        assert_eq!("Process exited with non-zero status", err.get_msg());
        assert_eq!(Some("out\n".to_string()), err.get_field("stdout"));
        assert_eq!(Some("bad\n".to_string()), err.get_field("stderr"));
        assert!(err.get_field("capture_error").is_some());
    }

    #[test]
    fn capture_failure_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("captures");
        fs::write(&not_a_dir, "").unwrap();
        let pg_bin = PgBin::new(None, Some(not_a_dir));

        let err = pg_bin
            .run_capture(&argv(&["sh", "-c", "echo out"]), &BTreeMap::new())
            .unwrap_err();
        assert_eq!("Failed to create capture directory", err.get_msg());
    }

    #[test]
    fn bin_dir_resolves_program() {
        let pg_bin = PgBin::new(Some(PathBuf::from("/usr/local/pgsql/bin")), None);
        assert_eq!(
            PathBuf::from("/usr/local/pgsql/bin/psql"),
            pg_bin.resolve_program("psql")
        );
    }
}
