use std::{sync::Arc, time::Duration};

use log::trace;
use tokio::sync::Barrier;

use super::Synchronizer;
use crate::{HookErr, Result};

/// Synchronizes a fixed amount of participants sharing this value through a barrier.
#[derive(Debug, Clone)]
pub struct BarrierSync {
    barrier: Arc<Barrier>,
    world_size: usize,
    timeout: Option<Duration>,
}

impl BarrierSync {
    /// Creates a new `BarrierSync` synchronizer.
    ///
    /// # Arguments
    /// * `world_size` - The amount of participants to wait on before releasing any of them.
    ///
    /// # Returns
    /// A new `BarrierSync` instance, clone it once per participant.
    pub fn new(world_size: usize) -> Self {
        Self {
            barrier: Arc::new(Barrier::new(world_size)),
            world_size,
            timeout: None,
        }
    }

    /// Fails a participant that waited longer than `timeout` for the others.
    ///
    /// A participant that timed out still counts as arrived, the group can't be reused after.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn world_size(&self) -> usize {
        self.world_size
    }
}

impl Synchronizer for BarrierSync {
    async fn synchronize(&self) -> Result<()> {
        let res = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.barrier.wait())
                .await
                .map_err(|_| {
                    HookErr::Synchronize(
                        format!(
                            "{} participants did not meet within {timeout:?}",
                            self.world_size
                        )
                        .into(),
                    )
                })?,
            None => self.barrier.wait().await,
        };
        trace!(world_size = self.world_size, leader = res.is_leader(); "barrier released");
        Ok(())
    }
}
