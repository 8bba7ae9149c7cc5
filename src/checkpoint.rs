use std::path::{Path, PathBuf};

use crate::BoxError;

/// File name of the pointer to the best checkpoint, relative to the output directory.
pub const POINTER_FILE: &str = "last_checkpoint";

/// Extension appended to checkpoint names by default.
pub const DEFAULT_EXTENSION: &str = "pth";

/// Persists the current model state under a name. The storage format is the sink's business.
pub trait Checkpointer {
    /// Saves the full model state as `name`.
    ///
    /// # Errors
    /// Any failure must be reported; the hook only points at checkpoints that were saved.
    fn save(&mut self, name: &str) -> Result<(), BoxError>;

    /// Extension of the files this sink writes, without the leading dot.
    fn extension(&self) -> &str {
        DEFAULT_EXTENSION
    }
}

/// Returns the path of the pointer file inside `output_dir`.
pub fn pointer_path(output_dir: &Path) -> PathBuf {
    output_dir.join(POINTER_FILE)
}

/// Returns the pointer file's contents for checkpoint `name`.
pub fn pointer_contents(name: &str, extension: &str) -> String {
    format!("{name}.{extension}")
}

/// Builds the deterministic name of the best checkpoint found at `iter`.
pub fn best_checkpoint_name(iter: usize, mean_loss: f64) -> String {
    format!("model_best_{iter:07}_{}", format_loss(mean_loss))
}

/// Renders a loss the way Python's float `repr` does, so names stay stable for tooling written
/// against existing checkpoint directories.
///
/// Shortest round-trip digits, `.0` on integral values, scientific notation below `1e-4` and
/// from `1e16` on with a signed two-digit exponent.
pub fn format_loss(loss: f64) -> String {
    if loss.is_nan() {
        return "nan".to_string();
    }

    if loss.is_infinite() {
        return if loss > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let abs = loss.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let sci = format!("{loss:e}");
        if let Some((mantissa, exp)) = sci.split_once('e') {
            if let Ok(exp) = exp.parse::<i32>() {
                let sign = if exp < 0 { '-' } else { '+' };
                return format!("{mantissa}e{sign}{:02}", exp.unsigned_abs());
            }
        }
    }

    // Debug keeps `.0` and is positional inside the range above.
    format!("{loss:?}")
}
