use std::collections::BTreeMap;

use olapbench_error::Result;
use tracing::info;

use crate::process::ProcessRunner;
use crate::query::LabelledQuery;
use crate::recorder::{DurationRecorder, record_duration};
use crate::target::ConnectionTarget;

/// Environment variable psql reads the password from.
pub const PASSWORD_ENV_VAR: &str = "PGPASSWORD";

/// Session option disabling statement timeouts. Time bounding is left to
/// whatever is orchestrating the benchmark.
pub const DISABLE_STATEMENT_TIMEOUT: &str = "-cstatement_timeout=0";

/// Everything needed to run queries against a remote cluster and record how
/// long they took.
#[derive(Debug)]
pub struct RemoteCompare<T, P, R> {
    pub pg: T,
    pub pg_bin: P,
    pub recorder: R,
}

/// Run `query` through psql `times` times, recording the duration of each run
/// under `{label}/{run}`.
///
/// The password is passed to psql through the environment so that it never
/// shows up in the process argument list.
///
/// Runs are sequential. The first failing run stops the loop and its error is
/// returned. Only successful runs are recorded.
pub fn run_psql<T, P, R>(
    env: &RemoteCompare<T, P, R>,
    labelled_query: &LabelledQuery,
    times: usize,
) -> Result<()>
where
    T: ConnectionTarget,
    P: ProcessRunner,
    R: DurationRecorder,
{
    let default_options = env.pg.default_options();
    let password = default_options.get("password");
    let options = format!(
        "{DISABLE_STATEMENT_TIMEOUT} {}",
        default_options.get("options").unwrap_or("")
    );
    let connstr = env.pg.connection_string(None, options.trim_end());

    let mut environ = BTreeMap::new();
    if let Some(password) = password {
        environ.insert(PASSWORD_ENV_VAR.to_string(), password.to_string());
    }

    let LabelledQuery { label, query } = *labelled_query;
    let argv = vec![
        "psql".to_string(),
        connstr,
        "-c".to_string(),
        query.to_string(),
    ];

    info!("Running query {label} {times} times");
    for run in 1..=times {
        info!("Run {run}/{times}");
        let guard = record_duration(&env.recorder, format!("{label}/{run}"));
        env.pg_bin.run_capture(&argv, &environ)?;
        guard.finish();
    }

    Ok(())
}
