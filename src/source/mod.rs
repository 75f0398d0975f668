pub mod processor;
pub mod reader;

pub use processor::{IntervalJob, LineOutcome, LineProcessor, ParseContext, ScanStats};
pub use reader::{LineReader, ReaderError};
