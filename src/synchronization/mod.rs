mod barrier;
mod no_sync;
mod synchronizer;

pub use barrier::BarrierSync;
pub use no_sync::NoSync;
pub use synchronizer::Synchronizer;
