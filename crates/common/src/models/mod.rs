pub mod event;
pub mod order;
pub mod signal;

pub use event::{EventKind, SignalEvent};
pub use order::{FillReport, LifecycleState, QueueRow, TradeOrder};
pub use signal::{Classification, Direction, Entry, ExtractedSignal, TradeAction};
