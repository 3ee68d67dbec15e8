//! shellpump core - Platform-independent abstractions and the capture engine
//!
//! This crate provides the configuration, error types and platform traits
//! shared by the platform-specific crates, plus the engine that drives a
//! spawned shell process: the output buffers, the stream pumps and the
//! lifecycle monitor.

mod buffer;
mod config;
mod error;
mod process;
mod pump;
mod shell;

#[cfg(test)]
mod testing;

pub use buffer::OutputBuffer;
pub use config::*;
pub use error::*;
pub use process::*;
pub use pump::StreamPump;
pub use shell::ShellProcess;
