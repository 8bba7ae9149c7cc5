#![allow(dead_code)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use loss_eval_hook::{
    BoxError, Checkpointer, LossDict, LossModel, LossValue, device::Clock, device::ComputeDevice,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Returns each batch's value, shifted by a shared offset, as its loss.
#[derive(Clone)]
pub struct ScriptedModel {
    pub offset: Arc<Mutex<f64>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            offset: Arc::new(Mutex::new(0.0)),
        }
    }

    /// Every batch loss is shifted by `offset` from now on.
    pub fn set_offset(&self, offset: f64) {
        *self.offset.lock().unwrap() = offset;
    }
}

impl LossModel for ScriptedModel {
    type Batch = f64;

    fn losses(&self, batch: &f64) -> Result<LossDict, BoxError> {
        let offset = *self.offset.lock().unwrap();
        let mut losses = LossDict::new();
        losses.insert("loss".into(), LossValue::Scalar(*batch + offset));
        Ok(losses)
    }
}

/// Fails on negative batches.
pub struct PickyModel;

impl LossModel for PickyModel {
    type Batch = f64;

    fn losses(&self, batch: &f64) -> Result<LossDict, BoxError> {
        if *batch < 0.0 {
            return Err(format!("malformed batch {batch}").into());
        }

        let mut losses = LossDict::new();
        losses.insert("loss".into(), LossValue::Scalar(*batch));
        Ok(losses)
    }
}

/// Records saved names, fails while `fail` is set.
#[derive(Clone, Default)]
pub struct RecordingCheckpointer {
    pub saved: Arc<Mutex<Vec<String>>>,
    pub fail: Arc<AtomicBool>,
}

impl RecordingCheckpointer {
    pub fn saved(&self) -> Vec<String> {
        self.saved.lock().unwrap().clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl Checkpointer for RecordingCheckpointer {
    fn save(&mut self, name: &str) -> Result<(), BoxError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("no space left on device".into());
        }

        self.saved.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

/// Clock that only moves when told to.
#[derive(Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap()
    }
}

/// Device whose synchronization takes a fixed amount of manual time.
#[derive(Clone)]
pub struct SlowDevice {
    pub clock: ManualClock,
    pub per_sync: Duration,
    pub syncs: Arc<AtomicUsize>,
}

impl ComputeDevice for SlowDevice {
    fn synchronize(&self) {
        self.syncs.fetch_add(1, Ordering::SeqCst);
        self.clock.advance(self.per_sync);
    }
}
