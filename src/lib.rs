pub mod cli;
pub mod config;
pub mod nem12;
pub mod output;
pub mod pipeline;
pub mod source;
