use std::path::PathBuf;

use log::{debug, info, trace, warn};

use crate::{
    HookConfig, HookErr, Result,
    best::BestState,
    checkpoint::{self, Checkpointer},
    device::{Clock, ComputeDevice, HostDevice, SystemClock},
    metrics::MetricSink,
    model::{self, LossModel, ValidationSource},
    progress::Throughput,
    synchronization::Synchronizer,
    throttle::RateLimiter,
};

/// Name of the scalar recorded after each evaluation pass.
pub const VALIDATION_LOSS: &str = "validation_loss";

/// Outcome of an evaluation triggered by `LossEvalHook::after_step`.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Step the evaluation ran after.
    pub iter: usize,
    pub mean_loss: f64,
    /// Whether `mean_loss` became the new best.
    pub improved: bool,
    /// The checkpoint saved for this evaluation, if any.
    pub checkpoint: Option<String>,
}

/// Periodically measures the loss on a validation set and keeps a checkpoint of the best model.
///
/// The training loop calls `after_step` once per completed step. When an evaluation is due the
/// hook runs the model over every validation batch, records the mean loss as `validation_loss`
/// and waits on the process group. A strictly lower mean loss than any seen before (or the first
/// one) is saved through the checkpointer, and `last_checkpoint` in the output directory is kept
/// pointing at it.
pub struct LossEvalHook<M, D, C, W, S> {
    cfg: HookConfig,
    model: M,
    data: D,
    checkpointer: C,
    metrics: W,
    sync: S,
    device: Box<dyn ComputeDevice>,
    clock: Box<dyn Clock>,
    limiter: RateLimiter,
    best: BestState,
}

impl<M, D, C, W, S> LossEvalHook<M, D, C, W, S>
where
    M: LossModel,
    D: ValidationSource<Batch = M::Batch>,
    C: Checkpointer,
    W: MetricSink,
    S: Synchronizer,
{
    /// Creates a new hook running on the host device with the wall clock.
    ///
    /// # Args
    /// * `cfg` - Evaluation period, output directory and progress tunables.
    /// * `model` - The model under training, only ever evaluated.
    /// * `data` - The validation batches.
    /// * `checkpointer` - Where best models are saved.
    /// * `metrics` - Receives `validation_loss` after each pass.
    /// * `sync` - The process group to wait on after each pass.
    ///
    /// # Errors
    /// `EmptyValidationSet` if `data` has no batches, `Config` on invalid settings.
    pub fn new(
        cfg: HookConfig,
        model: M,
        data: D,
        checkpointer: C,
        metrics: W,
        sync: S,
    ) -> Result<Self> {
        cfg.validate()?;

        if data.is_empty() {
            return Err(HookErr::EmptyValidationSet);
        }

        Ok(Self {
            limiter: RateLimiter::new(cfg.log_interval()),
            cfg,
            model,
            data,
            checkpointer,
            metrics,
            sync,
            device: Box::new(HostDevice),
            clock: Box::new(SystemClock),
            best: BestState::Unset,
        })
    }

    /// Runs the model on `device`, synchronizing it before each batch is timed.
    pub fn with_device(mut self, device: impl ComputeDevice + 'static) -> Self {
        self.device = Box::new(device);
        self
    }

    /// Times batches with `clock`.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &HookConfig {
        &self.cfg
    }

    pub fn best(&self) -> &BestState {
        &self.best
    }

    pub fn metrics(&self) -> &W {
        &self.metrics
    }

    pub fn checkpointer(&self) -> &C {
        &self.checkpointer
    }

    /// Path of the file pointing at the best checkpoint.
    pub fn pointer_path(&self) -> PathBuf {
        checkpoint::pointer_path(&self.cfg.output_dir)
    }

    /// Handles the end of training step `iter` out of `max_iter`.
    ///
    /// Evaluates if the step is a multiple of the period or the final one, saves a checkpoint
    /// on a new best, then rewrites the pointer file whenever a best checkpoint exists.
    ///
    /// # Returns
    /// The evaluation performed after this step, if one was due.
    ///
    /// # Errors
    /// Any evaluation, checkpoint or I/O failure. A failed save leaves both the best state and
    /// the pointer file as they were.
    pub async fn after_step(&mut self, iter: usize, max_iter: usize) -> Result<Option<Evaluation>> {
        let evaluation = if self.cfg.is_eval_step(iter, max_iter) {
            debug!(iter = iter, max_iter = max_iter; "running validation");
            let mean_loss = self.evaluate().await?;
            Some(self.track_best(iter, mean_loss)?)
        } else {
            trace!(iter = iter; "no validation due");
            None
        };

        if let Some(name) = self.best.name() {
            let contents = checkpoint::pointer_contents(name, self.checkpointer.extension());
            tokio::fs::write(self.pointer_path(), contents).await?;
        }

        Ok(evaluation)
    }

    /// Runs one full pass over the validation set.
    ///
    /// Every batch counts towards the mean, the first few are only left out of the throughput
    /// estimate. Records the mean as `validation_loss` and waits for the rest of the group.
    ///
    /// # Returns
    /// The mean of the per-batch losses.
    pub async fn evaluate(&mut self) -> Result<f64> {
        let total = self.data.len();
        if total == 0 {
            return Err(HookErr::EmptyValidationSet);
        }

        let mut throughput = Throughput::new(
            total,
            self.cfg.max_warmup,
            self.cfg.slow_batch_secs,
            self.clock.now(),
        );
        let mut losses = Vec::with_capacity(total);

        for (idx, batch) in self.data.batches().enumerate() {
            let started = self.clock.now();
            throughput.begin_batch(idx, started);

            let loss = self.compute_loss(batch).map_err(|e| e.at_batch(idx))?;
            self.device.synchronize();

            let now = self.clock.now();
            let progress = throughput.end_batch(idx, now.saturating_duration_since(started), now);
            if progress.reportable && self.limiter.should_emit(now) {
                info!("{progress}");
            }

            losses.push(loss);
        }

        if losses.len() != total {
            return Err(HookErr::BatchCountMismatch {
                got: losses.len(),
                expected: total,
            });
        }

        let mean_loss = losses.iter().sum::<f64>() / losses.len() as f64;
        info!(batches = total; "validation loss: {mean_loss}");

        self.metrics.put_scalar(VALIDATION_LOSS, mean_loss);
        self.sync.synchronize().await?;

        Ok(mean_loss)
    }

    /// Evaluates the model on `batch` and sums all its loss terms into one scalar.
    pub fn compute_loss(&self, batch: &M::Batch) -> Result<f64> {
        let losses = self
            .model
            .losses(batch)
            .map_err(|source| HookErr::Model {
                batch: None,
                source,
            })?;

        model::total_loss(&losses)
    }

    fn track_best(&mut self, iter: usize, mean_loss: f64) -> Result<Evaluation> {
        let (next, improved) = self.best.update(mean_loss, iter);

        let checkpoint = match (&next, improved) {
            (BestState::Known { name, .. }, true) => {
                self.checkpointer
                    .save(name)
                    .map_err(|source| HookErr::Checkpoint {
                        name: name.clone(),
                        source,
                    })?;

                info!(iter = iter; "new best validation loss {mean_loss}, saved {name}");
                Some(name.clone())
            }
            _ => {
                if mean_loss.is_nan() {
                    warn!(iter = iter; "validation loss is NaN, keeping the previous best");
                }
                None
            }
        };

        self.best = next;

        Ok(Evaluation {
            iter,
            mean_loss,
            improved,
            checkpoint,
        })
    }
}
