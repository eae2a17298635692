//! Block watcher service implementation.
//!
//! Turns periodic polls of the chain tip into a stream of new block heights. It
//! includes:
//! - The subscription interface consumed by the monitor
//! - A cron driven watcher implementation
//! - Error handling specific to block watching operations

mod error;
mod service;

pub use error::BlockWatcherError;
pub use service::{
	heights_to_emit, process_new_blocks, BlockSubscriber, JobSchedulerTrait, NewBlockWatcher,
};
