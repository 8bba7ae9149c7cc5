use crate::Result;

/// Collective barrier over the processes cooperating in a training run.
///
/// Every participant must call `synchronize` the same number of times, a participant returns
/// only once all of them reached the same call.
#[allow(unused)]
#[trait_variant::make(Synchronizer: Send)]
pub trait SynchronizerTemplate {
    /// Blocks until every participant of the group reaches this point.
    ///
    /// # Returns
    /// An error if the group can no longer be synchronized.
    async fn synchronize(&self) -> Result<()>;
}
