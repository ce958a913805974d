pub mod db;
pub mod error;
pub mod queue;
pub mod repositories;

pub use error::{QueueError, StoreError};
pub use queue::ExecutionQueue;
