//! Transaction monitoring engine.
//!
//! - `snapshot`: immutable view of the active configurations, partitioned by delay
//! - `scheduler`: delayed heights to evaluate for a new tip
//! - `recorder`: idempotent recording of matched transactions
//! - `pipeline`: evaluation of one block against a set of configurations
//! - `service`: the monitor state machine driving all of the above

mod error;
mod pipeline;
mod recorder;
mod scheduler;
mod service;
mod snapshot;

pub use error::MonitorError;
pub use pipeline::{BlockPipeline, PipelineConfig};
pub use recorder::{build_transaction_record, MatchRecorder};
pub use scheduler::{pending_work, PendingWork};
pub use service::{DataSource, MonitorService, MonitorState, MonitorStatus};
pub use snapshot::{build_delay_index, ConfigurationSnapshot, DelayIndex};
