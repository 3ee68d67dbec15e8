//! Run a shell command and capture what it writes
//!
//! [`Shell`] spawns one command through the platform shell (`/bin/sh -c` on
//! Unix, `cmd.exe /C` on Windows) and collects its stdout and stderr in the
//! background, so the caller can poll for output, feed input and check for
//! exit without ever blocking on a pipe.
//!
//! ```no_run
//! use shellpump::Shell;
//!
//! # fn main() -> Result<(), shellpump::ShellError> {
//! let shell = Shell::new("echo hello")?;
//! let code = shell.wait()?;
//! assert_eq!(shell.read_output(), "hello\n");
//! assert_eq!(code, 0);
//! # Ok(())
//! # }
//! ```

mod factory;
mod shell;

pub use factory::{PlatformHandle, PlatformProcessManagerFactory};
pub use shell::Shell;

// Re-export core functionality
pub use shellpump_core::*;
