use std::sync::Arc;

use harness::trial::{Measurement, Trial};

use crate::process::ProcessRunner;
use crate::query::LabelledQuery;
use crate::recorder::MemoryRecorder;
use crate::runner::{RemoteCompare, run_psql};
use crate::target::ConnectionTarget;

/// Create one benchmark trial per query in the catalog.
///
/// Every trial runs its query `count` times and reports the avg/min/max of
/// the recorded durations. A failing query fails only its own trial.
///
/// Set `ignored` when there's no cluster to run against; the trials are still
/// listed but skipped unless explicitly requested.
pub fn query_trials<T, P>(
    env: Arc<RemoteCompare<T, P, MemoryRecorder>>,
    catalog: &[LabelledQuery],
    count: usize,
    kind: &str,
    ignored: bool,
) -> Vec<Trial>
where
    T: ConnectionTarget + 'static,
    P: ProcessRunner + 'static,
{
    catalog
        .iter()
        .map(|query| {
            let query = *query;
            let env = env.clone();

            Trial::bench(query.label, move |_test_mode| {
                run_psql(&env, &query, count)?;

                let durations: Vec<_> = env
                    .recorder
                    .samples_for_query(query.label)
                    .into_iter()
                    .map(|s| s.duration)
                    .collect();

                Ok(Measurement::from_durations(&durations))
            })
            .with_kind(kind)
            .with_ignored_flag(ignored)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use clap::Args;
    use harness::Arguments;
    use olapbench_error::{BenchError, Result};

    use super::*;
    use crate::process::CapturedOutput;
    use crate::target::RemotePostgres;

    /// Fails any invocation whose query text contains "broken".
    #[derive(Debug)]
    struct FailBroken;

    impl ProcessRunner for FailBroken {
        fn run_capture(
            &self,
            argv: &[String],
            _env: &BTreeMap<String, String>,
        ) -> Result<CapturedOutput> {
            if argv.iter().any(|a| a.contains("broken")) {
                return Err(BenchError::new("Process exited with non-zero status"));
            }
            Ok(CapturedOutput::default())
        }
    }

    #[derive(Debug, Clone, Args)]
    struct NoExtra {}

    const CATALOG: &[LabelledQuery] = &[
        LabelledQuery::new("Q0", "SELECT 1;"),
        LabelledQuery::new("Q1", "SELECT broken;"),
        LabelledQuery::new("Q2", "SELECT 2;"),
    ];

    fn env() -> Arc<RemoteCompare<RemotePostgres, FailBroken, MemoryRecorder>> {
        Arc::new(RemoteCompare {
            pg: RemotePostgres::try_new("host=localhost").unwrap(),
            pg_bin: FailBroken,
            recorder: MemoryRecorder::new(),
        })
    }

    #[test]
    fn one_trial_per_query() {
        let trials = query_trials(env(), CATALOG, 3, "clickbench", false);
        let names: Vec<_> = trials.iter().map(|t| t.name()).collect();
        assert_eq!(vec!["Q0", "Q1", "Q2"], names);
        assert!(trials.iter().all(|t| t.is_bench() && t.kind() == "clickbench"));
    }

    #[test]
    fn failing_query_is_isolated() {
        let env = env();
        let trials = query_trials(env.clone(), CATALOG, 2, "clickbench", false);

        let args = Arguments::<NoExtra>::from_iter(["bin", "--bench", "--format", "json"]);
        let conclusion = harness::run(&args, trials);

        assert_eq!(2, conclusion.num_measured);
        assert_eq!(1, conclusion.num_failed);

        let labels: Vec<_> = env.recorder.samples().into_iter().map(|s| s.label).collect();
        assert_eq!(vec!["Q0/1", "Q0/2", "Q2/1", "Q2/2"], labels);
    }

    #[test]
    fn ignored_without_cluster() {
        let env = env();
        let trials = query_trials(env.clone(), CATALOG, 2, "clickbench", true);

        let args = Arguments::<NoExtra>::from_iter(["bin", "--format", "json"]);
        let conclusion = harness::run(&args, trials);

        assert_eq!(3, conclusion.num_ignored);
        assert!(env.recorder.samples().is_empty());
    }
}
