use super::Synchronizer;
use crate::Result;

/// Single-process group, synchronizing is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSync;

impl NoSync {
    /// Creates a new `NoSync` synchronizer.
    pub fn new() -> Self {
        Self
    }
}

impl Synchronizer for NoSync {
    async fn synchronize(&self) -> Result<()> {
        Ok(())
    }
}
