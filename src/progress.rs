use std::{
    fmt,
    time::{Duration, Instant},
};

/// Snapshot of an evaluation pass after a batch completed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Batches completed so far.
    pub done: usize,
    pub total: usize,
    /// Mean compute time per batch, over the current timing window.
    pub seconds_per_img: f64,
    /// Estimated time left, rounded to whole seconds.
    pub eta: Duration,
    /// Whether the estimate is backed by enough samples to be worth showing.
    pub reportable: bool,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "loss on validation done {}/{}. {:.4} s / img. ETA={}",
            self.done,
            self.total,
            self.seconds_per_img,
            format_eta(self.eta)
        )
    }
}

/// Throughput accounting for one pass over the validation set.
///
/// The first `warmup` batches still count towards the loss but not towards the timing: the
/// window restarts when batch `warmup` begins. Before that the window covers every batch seen.
#[derive(Debug, Clone)]
pub struct Throughput {
    total: usize,
    warmup: usize,
    slow_batch_secs: f64,
    start: Instant,
    compute: Duration,
}

impl Throughput {
    /// Creates a tracker for a pass of `total` batches.
    ///
    /// # Arguments
    /// * `total` - Batches in the pass.
    /// * `max_warmup` - Upper bound on the warmup batches, at least one batch is always timed.
    /// * `slow_batch_secs` - Per-batch time above which estimates are reported during warmup.
    /// * `start` - When the pass began.
    pub fn new(total: usize, max_warmup: usize, slow_batch_secs: f64, start: Instant) -> Self {
        Self {
            total,
            warmup: max_warmup.min(total.saturating_sub(1)),
            slow_batch_secs,
            start,
            compute: Duration::ZERO,
        }
    }

    pub fn warmup(&self) -> usize {
        self.warmup
    }

    /// Marks the beginning of batch `idx`.
    pub fn begin_batch(&mut self, idx: usize, now: Instant) {
        if idx == self.warmup {
            self.start = now;
            self.compute = Duration::ZERO;
        }
    }

    /// Accounts for batch `idx`, which took `compute` of device time and ended at `now`.
    pub fn end_batch(&mut self, idx: usize, compute: Duration, now: Instant) -> Progress {
        self.compute += compute;

        let timed = self.timed_batches(idx) as f64;
        let seconds_per_img = self.compute.as_secs_f64() / timed;
        let total_seconds_per_img = now.saturating_duration_since(self.start).as_secs_f64() / timed;

        let remaining = self.total.saturating_sub(idx + 1) as f64;
        let eta = Duration::from_secs((total_seconds_per_img * remaining).round() as u64);

        Progress {
            done: idx + 1,
            total: self.total,
            seconds_per_img,
            eta,
            reportable: idx >= 2 * self.warmup || seconds_per_img > self.slow_batch_secs,
        }
    }

    fn timed_batches(&self, idx: usize) -> usize {
        if idx >= self.warmup {
            idx + 1 - self.warmup
        } else {
            idx + 1
        }
    }
}

/// Formats a duration as `H:MM:SS`.
pub fn format_eta(eta: Duration) -> String {
    let secs = eta.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}
