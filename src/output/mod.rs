pub mod memory;
pub mod sql;
pub mod traits;

pub use memory::MemoryWriter;
pub use sql::{render_copy_rows, render_insert_statement, SqlFileWriter, TIMESTAMP_FORMAT};
pub use traits::{BatchWriter, OutputError};
