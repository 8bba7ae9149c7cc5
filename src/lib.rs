pub mod best;
pub mod checkpoint;
pub mod config;
pub mod device;
pub mod error;
pub mod hook;
pub mod metrics;
pub mod model;
pub mod progress;
pub mod synchronization;
pub mod throttle;

pub use best::BestState;
pub use checkpoint::Checkpointer;
pub use config::HookConfig;
pub use error::{BoxError, HookErr, Result};
pub use hook::{Evaluation, LossEvalHook, VALIDATION_LOSS};
pub use metrics::{JsonLinesWriter, MetricSink, ScalarStorage};
pub use model::{LossDict, LossModel, LossValue, ValidationSource};
pub use synchronization::{BarrierSync, NoSync, Synchronizer};
