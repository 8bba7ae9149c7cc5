use std::{env, fs, path::Path, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{HookErr, Result};

const fn default_max_warmup() -> usize {
    5
}

const fn default_log_interval_secs() -> u64 {
    5
}

const fn default_slow_batch_secs() -> f64 {
    5.0
}

/// Immutable settings of a `LossEvalHook`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookConfig {
    /// Evaluate every `eval_period` steps. Zero evaluates only on the final step.
    pub eval_period: usize,
    /// Where the `last_checkpoint` pointer file is written.
    pub output_dir: PathBuf,
    /// Upper bound on the batches excluded from throughput timing.
    #[serde(default = "default_max_warmup")]
    pub max_warmup: usize,
    /// Minimum wall time between two progress lines.
    #[serde(default = "default_log_interval_secs")]
    pub log_interval_secs: u64,
    /// Seconds per image above which progress is reported even during warmup.
    #[serde(default = "default_slow_batch_secs")]
    pub slow_batch_secs: f64,
}

impl HookConfig {
    /// Creates a configuration with the default tunables.
    ///
    /// # Args
    /// * `eval_period` - Steps between two evaluations, zero for final-step only.
    /// * `output_dir` - Directory holding the pointer file.
    ///
    /// # Returns
    /// A `HookConfig` instance.
    pub fn new(eval_period: usize, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            eval_period,
            output_dir: output_dir.into(),
            max_warmup: default_max_warmup(),
            log_interval_secs: default_log_interval_secs(),
            slow_batch_secs: default_slow_batch_secs(),
        }
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads and validates a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Builds a configuration from `EVAL_PERIOD` and `OUTPUT_DIR`.
    ///
    /// `EVAL_PERIOD` defaults to 0 and `OUTPUT_DIR` to the current directory.
    pub fn from_env() -> Result<Self> {
        let eval_period = match env::var("EVAL_PERIOD") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| HookErr::Config(format!("EVAL_PERIOD={raw:?}: {e}")))?,
            Err(_) => 0,
        };
        let output_dir = env::var("OUTPUT_DIR").unwrap_or_else(|_| ".".to_string());

        let cfg = Self::new(eval_period, output_dir);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects settings the hook cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.log_interval_secs == 0 {
            return Err(HookErr::Config("log_interval_secs must be positive".into()));
        }

        if self.slow_batch_secs.is_nan() || self.slow_batch_secs <= 0.0 {
            return Err(HookErr::Config(format!(
                "slow_batch_secs must be positive, got {}",
                self.slow_batch_secs
            )));
        }

        Ok(())
    }

    /// Returns the minimum interval between progress lines.
    pub fn log_interval(&self) -> Duration {
        Duration::from_secs(self.log_interval_secs)
    }

    /// Whether an evaluation is due after the step `iter` of a `max_iter` run.
    ///
    /// # Args
    /// * `iter` - Index of the step that just completed.
    /// * `max_iter` - Total planned steps.
    pub fn is_eval_step(&self, iter: usize, max_iter: usize) -> bool {
        let next_iter = iter + 1;
        let is_final = next_iter == max_iter;
        is_final || (self.eval_period > 0 && next_iter % self.eval_period == 0)
    }
}
