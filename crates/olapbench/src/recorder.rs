use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Stores wall-clock timing samples keyed by label.
pub trait DurationRecorder: Send + Sync {
    fn record(&self, label: &str, elapsed: Duration);
}

/// Start timing a region. The elapsed time is recorded under `label` once
/// the returned guard is finished.
pub fn record_duration<R>(recorder: &R, label: impl Into<String>) -> DurationGuard<'_, R>
where
    R: DurationRecorder + ?Sized,
{
    DurationGuard {
        recorder,
        label: label.into(),
        start: Instant::now(),
    }
}

/// Times a region started with `record_duration`.
///
/// Only a finished guard records. A guard dropped without calling `finish`,
/// e.g. when leaving the region early through `?` or a panic, discards the
/// measurement.
#[must_use = "the duration is only recorded when `finish` is called"]
#[derive(Debug)]
pub struct DurationGuard<'a, R: DurationRecorder + ?Sized> {
    recorder: &'a R,
    label: String,
    start: Instant,
}

impl<R: DurationRecorder + ?Sized> DurationGuard<'_, R> {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Record the time elapsed since the guard was created.
    pub fn finish(self) -> Duration {
        let elapsed = self.start.elapsed();
        self.recorder.record(&self.label, elapsed);
        elapsed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationSample {
    pub label: String,
    pub duration: Duration,
}

/// Keeps all samples in memory in the order they were recorded.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    samples: Mutex<Vec<DurationSample>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> Vec<DurationSample> {
        self.samples.lock().clone()
    }

    /// Get samples for a single query, i.e. samples labeled `{label}/{run}`.
    pub fn samples_for_query(&self, label: &str) -> Vec<DurationSample> {
        self.samples
            .lock()
            .iter()
            .filter(|s| {
                s.label
                    .strip_prefix(label)
                    .is_some_and(|rest| rest.starts_with('/'))
            })
            .cloned()
            .collect()
    }
}

impl DurationRecorder for MemoryRecorder {
    fn record(&self, label: &str, elapsed: Duration) {
        self.samples.lock().push(DurationSample {
            label: label.to_string(),
            duration: elapsed,
        });
    }
}
