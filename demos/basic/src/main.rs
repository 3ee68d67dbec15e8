use anyhow::Context;
use shellpump::Shell;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
const LISTING: &str = "ls -la";
#[cfg(windows)]
const LISTING: &str = "dir";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Run the listing command given on the command line, or list the current directory.
    let command = std::env::args().nth(1).unwrap_or_else(|| LISTING.to_string());
    let shell = Shell::new(command.as_str()).with_context(|| format!("starting `{command}`"))?;
    println!("started pid {}", shell.process_id());

    // Poll the way an event loop would, printing output as it arrives.
    while !shell.has_exited() {
        print!("{}", shell.read_output());
        eprint!("{}", shell.read_error());
        thread::sleep(Duration::from_millis(20));
    }
    print!("{}", shell.read_output());
    eprint!("{}", shell.read_error());

    println!("exit code {}", shell.exit_code());
    Ok(())
}
