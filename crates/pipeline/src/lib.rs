//! The idempotent dispatch pipeline: raw events in, dual-sink commits out.

pub mod consumer;
pub mod dispatcher;
pub mod error;
pub mod fill;
pub mod ingest;
pub mod oid;
pub mod oracle;
pub mod saga;
pub mod stream;

pub use consumer::ParserService;
pub use dispatcher::{Dispatcher, Outcome};
pub use error::{PipelineError, SourceError};
pub use fill::FillService;
pub use stream::{EventSource, RedisEventSource, StreamSettings};
