use std::{
    env,
    fs::{self, File},
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use anyhow::Context;
use log::info;
use loss_eval_hook::{
    BoxError, Checkpointer, HookConfig, JsonLinesWriter, LossDict, LossEvalHook, LossModel,
    LossValue, NoSync,
};
use ndarray::{Array1, arr0};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Serialize;

const DEFAULT_MAX_ITER: usize = 100;
const VALIDATION_BATCHES: usize = 16;
const BATCH_SIZE: usize = 8;

/// Stand-in for a detector whose losses shrink as training advances.
struct SyntheticModel {
    step: Arc<AtomicUsize>,
}

impl LossModel for SyntheticModel {
    type Batch = Array1<f32>;

    fn losses(&self, batch: &Array1<f32>) -> Result<LossDict, BoxError> {
        let step = self.step.load(Ordering::Relaxed) as f64;
        let decay = 1.0 / (1.0 + step / 25.0);
        let noise = f64::from(batch.mean().ok_or("empty batch")?);

        let mut losses = LossDict::new();
        losses.insert("loss_cls".into(), LossValue::Scalar(decay + noise));
        losses.insert(
            "loss_box_reg".into(),
            LossValue::Tensor(arr0((0.5 * decay) as f32).into_dyn()),
        );
        Ok(losses)
    }
}

#[derive(Serialize)]
struct CheckpointMarker<'a> {
    name: &'a str,
    step: usize,
}

/// Writes a small marker in place of the model state.
struct MarkerCheckpointer {
    dir: PathBuf,
    step: Arc<AtomicUsize>,
}

impl Checkpointer for MarkerCheckpointer {
    fn save(&mut self, name: &str) -> Result<(), BoxError> {
        let marker = CheckpointMarker {
            name,
            step: self.step.load(Ordering::Relaxed),
        };
        let file = File::create(self.dir.join(format!("{name}.{}", self.extension())))?;
        serde_json::to_writer(file, &marker)?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cfg = match env::args().nth(1) {
        Some(path) => HookConfig::from_json_file(&path)
            .with_context(|| format!("loading configuration from {path}"))?,
        None => HookConfig::from_env().context("loading configuration from the environment")?,
    };
    let max_iter = match env::var("MAX_ITER") {
        Ok(raw) => raw.parse().context("parsing MAX_ITER")?,
        Err(_) => DEFAULT_MAX_ITER,
    };

    fs::create_dir_all(&cfg.output_dir)
        .with_context(|| format!("creating {}", cfg.output_dir.display()))?;

    let mut rng = StdRng::seed_from_u64(7);
    let data: Vec<Array1<f32>> = (0..VALIDATION_BATCHES)
        .map(|_| Array1::from_shape_fn(BATCH_SIZE, |_| rng.random_range(-0.05..0.05)))
        .collect();

    let step = Arc::new(AtomicUsize::new(0));
    let model = SyntheticModel {
        step: Arc::clone(&step),
    };
    let checkpointer = MarkerCheckpointer {
        dir: cfg.output_dir.clone(),
        step: Arc::clone(&step),
    };
    let metrics = JsonLinesWriter::new(File::create(cfg.output_dir.join("metrics.json"))?);

    info!(
        "simulating {max_iter} steps, validating every {} into {}",
        cfg.eval_period,
        cfg.output_dir.display()
    );

    let mut hook = LossEvalHook::new(cfg, model, data, checkpointer, metrics, NoSync::new())?;

    for iter in 0..max_iter {
        step.store(iter + 1, Ordering::Relaxed);

        if let Some(eval) = hook.after_step(iter, max_iter).await? {
            info!(
                "step {}: validation loss {:.5}{}",
                eval.iter,
                eval.mean_loss,
                if eval.improved { " (best)" } else { "" }
            );
        }
    }

    if let Some(name) = hook.best().name() {
        info!("best checkpoint: {name}");
    }

    Ok(())
}
