mod common;

use std::{sync::Mutex, time::Duration};

use common::{ManualClock, RecordingCheckpointer};
use log::{LevelFilter, Log, Metadata, Record};
use loss_eval_hook::{
    BoxError, HookConfig, LossDict, LossEvalHook, LossModel, LossValue, NoSync, Result,
    ScalarStorage, progress::format_eta,
};

static LINES: Mutex<Vec<String>> = Mutex::new(Vec::new());

/// Keeps the progress lines logged by the hook.
struct ProgressCapture;

impl Log for ProgressCapture {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with("loss_eval_hook")
    }

    fn log(&self, record: &Record) {
        let line = record.args().to_string();
        if self.enabled(record.metadata()) && line.starts_with("loss on validation done") {
            LINES.lock().unwrap().push(line);
        }
    }

    fn flush(&self) {}
}

static CAPTURE: ProgressCapture = ProgressCapture;

/// Each batch holds its compute time in seconds, which it also reports as its loss.
struct TimedModel {
    clock: ManualClock,
}

impl LossModel for TimedModel {
    type Batch = f64;

    fn losses(&self, batch: &f64) -> std::result::Result<LossDict, BoxError> {
        self.clock.advance(Duration::from_secs_f64(*batch));

        let mut losses = LossDict::new();
        losses.insert("loss".into(), LossValue::Scalar(*batch));
        Ok(losses)
    }
}

/// Parses `done` and the ETA out of a progress line.
fn parse(line: &str) -> (usize, String) {
    let done = line
        .trim_start_matches("loss on validation done ")
        .split('/')
        .next()
        .and_then(|d| d.parse().ok())
        .unwrap();
    let eta = line.rsplit("ETA=").next().unwrap().to_string();
    (done, eta)
}

#[tokio::test]
async fn progress_lines_carry_post_warmup_eta_and_are_rate_limited() -> Result<()> {
    log::set_logger(&CAPTURE).unwrap();
    log::set_max_level(LevelFilter::Info);

    const TOTAL: usize = 20;
    const WARMUP: usize = 5;

    // Warmup batches are slow, the rest take 2s each.
    let durations: Vec<f64> = (0..TOTAL)
        .map(|idx| if idx < WARMUP { 4.0 } else { 2.0 })
        .collect();
    let ends: Vec<f64> = durations
        .iter()
        .scan(0.0, |t, d| {
            *t += d;
            Some(*t)
        })
        .collect();

    let dir = tempfile::tempdir()?;
    let clock = ManualClock::new();
    let mut hook = LossEvalHook::new(
        HookConfig::new(1, dir.path()),
        TimedModel {
            clock: clock.clone(),
        },
        durations.clone(),
        RecordingCheckpointer::default(),
        ScalarStorage::new(),
        NoSync::new(),
    )?
    .with_clock(clock);

    let mean = hook.evaluate().await?;
    assert_eq!(mean, durations.iter().sum::<f64>() / TOTAL as f64);

    let lines = LINES.lock().unwrap().clone();
    let parsed: Vec<(usize, String)> = lines.iter().map(|l| parse(l)).collect();

    // First reportable batch is 2 * WARMUP, then one line per 5s of clock.
    let done: Vec<usize> = parsed.iter().map(|(d, _)| *d).collect();
    assert_eq!(done, vec![11, 14, 17, 20]);

    let mut last_emit: Option<f64> = None;
    for (done, eta) in &parsed {
        let idx = done - 1;
        let now = ends[idx];
        let elapsed = now - ends[WARMUP - 1];
        let timed = (idx + 1 - WARMUP) as f64;
        let remaining = (TOTAL - idx - 1) as f64;
        let expected = Duration::from_secs((elapsed / timed * remaining).round() as u64);

        assert_eq!(*eta, format_eta(expected), "ETA of line {done}");

        if let Some(last) = last_emit {
            assert!(now - last >= 5.0, "lines {last}s and {now}s are too close");
        }
        last_emit = Some(now);
    }

    assert_eq!(parsed[0].1, "0:00:18");
    Ok(())
}
