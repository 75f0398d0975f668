//! Bounded concurrent expansion of interval jobs into batched readings.
//!
//! The line processor feeds the interval queue, a pool of expansion workers
//! shares its receiving end, and a single batching sink drains the reading
//! queue into an output writer.

pub mod channel;
pub mod expand;
pub mod in_flight;
pub mod runner;
pub mod sink;

pub use channel::{create_channel, Receiver, Sender};
pub use expand::{expand, Reading};
pub use in_flight::InFlight;
pub use runner::{run_pipeline, PipelineError, PipelineSummary};
pub use sink::{BatchSink, SinkStats};
