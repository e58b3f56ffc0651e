//! Observability: structured logging and the JSONL event stream.

pub mod events;
pub mod logging;

pub use events::{Event, EventEmitter, TallyLine};
pub use logging::{LogFormat, init_logging, verbosity_to_directive};
