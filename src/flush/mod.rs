//! Flush handling: the snapshot handed over by statsd, the key routing and
//! decoding rules, and the processor that turns both into tracked metrics.

pub mod key;
mod processor;
pub mod snapshot;

pub use key::{parse_key, should_process, ParsedKey, PropertiesError};
pub use processor::{FlushProcessor, ForwardedCounts};
pub use snapshot::{FlushEvent, MetricSnapshot, TimerData};
