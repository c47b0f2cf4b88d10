//! Live progress display
//!
//! Folds worker snapshots into an [`AggregatedProgress`] and renders it
//! as an `indicatif` bar counting elapsed seconds against the run duration.

use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::bench::ProgressUpdate;
use crate::util::units::calculate_throughput_mbps;

/// Snapshots buffered between the workers and the display
const CHANNEL_CAPACITY: usize = 1024;

const REFRESH_INTERVAL: Duration = Duration::from_millis(250);

const BAR_TEMPLATE: &str = "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len}s {msg}";

/// Run-wide totals built from the latest snapshot of each worker
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedProgress {
    pub total_operations: u64,
    pub errors: u64,
    pub bytes_transferred: u64,
    pub objects_listed: u64,
    pub elapsed: Duration,
    /// Workers that have reported but not yet finished
    pub active_workers: usize,
    pub throughput_mbps: f64,
}

impl AggregatedProgress {
    pub fn from_updates<'a>(
        updates: impl IntoIterator<Item = &'a ProgressUpdate>,
        elapsed: Duration,
    ) -> Self {
        let mut progress = AggregatedProgress {
            elapsed,
            ..Default::default()
        };
        for update in updates {
            progress.total_operations += update.attempts;
            progress.errors += update.errors();
            progress.bytes_transferred += update.bytes_transferred;
            progress.objects_listed += update.objects_listed;
            if !update.finished {
                progress.active_workers += 1;
            }
        }
        progress.throughput_mbps = calculate_throughput_mbps(progress.bytes_transferred, elapsed);
        progress
    }

    pub fn message(&self) -> String {
        format!(
            "ops: {}, errors: {}, {:.1} MB/s",
            self.total_operations, self.errors, self.throughput_mbps
        )
    }
}

/// Spawn the display task. Returns the sender to hand to the engine; the
/// task ends once every clone of it is dropped.
pub fn spawn_progress_bar(
    duration: Duration,
) -> (mpsc::Sender<ProgressUpdate>, JoinHandle<AggregatedProgress>) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let bar = ProgressBar::new(duration.as_secs().max(1));
    let style = ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);

    let handle = tokio::spawn(aggregate_progress(rx, bar));
    (tx, handle)
}

async fn aggregate_progress(
    mut rx: mpsc::Receiver<ProgressUpdate>,
    bar: ProgressBar,
) -> AggregatedProgress {
    let start = Instant::now();
    let mut latest: HashMap<usize, ProgressUpdate> = HashMap::new();
    let mut ticker = tokio::time::interval(REFRESH_INTERVAL);

    loop {
        tokio::select! {
            update = rx.recv() => match update {
                Some(update) => {
                    latest.insert(update.worker_id, update);
                }
                None => break,
            },
            _ = ticker.tick() => {
                let progress = AggregatedProgress::from_updates(latest.values(), start.elapsed());
                let length = bar.length().unwrap_or(u64::MAX);
                bar.set_position(progress.elapsed.as_secs().min(length));
                bar.set_message(progress.message());
            }
        }
    }

    let progress = AggregatedProgress::from_updates(latest.values(), start.elapsed());
    bar.finish_and_clear();
    progress
}
