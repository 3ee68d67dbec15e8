use anyhow::Context;
use shellpump::{PumpSettings, Shell, ShellConfig};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
const UPPERCASE: &str = "tr a-z A-Z";
#[cfg(windows)]
const UPPERCASE: &str = "findstr /R \".*\"";

/// Pump settings come from `SHELLPUMP_PUMP` as JSON, e.g. `{"pollIntervalMs": 1}`
fn pump_settings() -> anyhow::Result<PumpSettings> {
    match std::env::var("SHELLPUMP_PUMP") {
        Ok(json) => serde_json::from_str(&json).context("parsing SHELLPUMP_PUMP"),
        Err(_) => Ok(PumpSettings::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = ShellConfig::builder()
        .command(UPPERCASE)
        .pump(pump_settings()?)
        .kill_on_drop(true)
        .build()?;
    let shell = Shell::with_config(config).context("starting filter process")?;
    info!(pid = shell.process_id(), "Filter process started");

    for line in ["hello from shellpump\n", "every line goes through stdin\n"] {
        shell.write(line).context("writing to filter")?;
        tokio::time::sleep(Duration::from_millis(100)).await;
        print!("{}", shell.read_output());
    }

    // End of input lets the filter finish on its own.
    shell.close_input();
    let code = shell
        .wait_for_exit(Some(Duration::from_secs(5)))
        .await
        .context("waiting for filter to exit")?;
    print!("{}", shell.read_output());

    println!("filter exited with {code}");
    Ok(())
}
