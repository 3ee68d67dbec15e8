use crate::error::ShellError;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Timing and sizing of the stream pumps and of exit reconciliation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PumpSettings {
    /// Sleep between read attempts while a pipe has no data (in milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Size of the scratch buffer each pump reads into
    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,

    /// Upper bound on how long an exit check waits for both pumps to reach
    /// end-of-stream before reporting the process as exited (in milliseconds)
    #[serde(default = "default_exit_grace_ms")]
    pub exit_grace_ms: u64,
}

impl Default for PumpSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            read_chunk_size: default_read_chunk_size(),
            exit_grace_ms: default_exit_grace_ms(),
        }
    }
}

impl PumpSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Short poll interval and a large chunk size, for chatty interactive children
    pub fn responsive() -> Self {
        Self {
            poll_interval_ms: 1,
            read_chunk_size: 16 * 1024,
            exit_grace_ms: 250,
        }
    }

    /// Long poll interval, for many mostly idle children
    pub fn relaxed() -> Self {
        Self {
            poll_interval_ms: 50,
            read_chunk_size: 4096,
            exit_grace_ms: 500,
        }
    }

    /// Validate the settings and return errors if invalid
    pub fn validate(&self) -> Result<(), ShellError> {
        if self.read_chunk_size == 0 {
            return Err(ShellError::Configuration(
                "read_chunk_size must be greater than zero".to_string(),
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(ShellError::Configuration(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }

        if self.poll_interval_ms > 1_000 {
            return Err(ShellError::Configuration(
                "poll_interval_ms should not exceed 1 second".to_string(),
            ));
        }

        if self.exit_grace_ms > 60_000 {
            return Err(ShellError::Configuration(
                "exit_grace_ms should not exceed 60 seconds".to_string(),
            ));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn exit_grace(&self) -> Duration {
        Duration::from_millis(self.exit_grace_ms)
    }
}

/// How `force_exit` asks the operating system to end the child
///
/// Windows has a single forceful path, so both modes call `TerminateProcess`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TerminationMode {
    /// SIGTERM on Unix
    #[default]
    Graceful,
    /// SIGKILL on Unix
    Kill,
}

/// Main shell configuration
#[derive(Default, Debug, Clone, PartialEq, Builder)]
#[builder(setter(into, strip_option))]
pub struct ShellConfig {
    /// Command line handed verbatim to the system shell
    pub command: String,
    /// Shell program override (`/bin/sh` on Unix, `cmd.exe` on Windows)
    #[builder(default)]
    pub shell: Option<String>,
    #[builder(default)]
    pub working_directory: Option<PathBuf>,
    #[builder(default)]
    #[builder(setter(custom))]
    pub env: HashMap<String, String>,
    #[builder(default)]
    pub pump: PumpSettings,
    #[builder(default)]
    pub termination: TerminationMode,
    /// Kill and reap a still running child when the shell is dropped
    #[builder(default)]
    pub kill_on_drop: bool,
}

impl ShellConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn builder() -> ShellConfigBuilder {
        ShellConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<(), ShellError> {
        if self.command.trim().is_empty() {
            return Err(ShellError::Configuration(
                "command must not be empty".to_string(),
            ));
        }
        self.pump.validate()
    }
}

impl ShellConfigBuilder {
    pub fn env<T: ToString>(&mut self, key: T, value: T) -> &mut Self {
        let map = self.env.get_or_insert_with(HashMap::new);
        map.insert(key.to_string(), value.to_string());

        self
    }

    pub fn env_multi<T: ToString, I: IntoIterator<Item = (T, T)>>(&mut self, iter: I) -> &mut Self {
        let env = self.env.get_or_insert_with(HashMap::new);
        for (key, value) in iter {
            env.insert(key.to_string(), value.to_string());
        }
        self
    }
}

// Default value functions for serde
fn default_poll_interval_ms() -> u64 {
    10
}
fn default_read_chunk_size() -> usize {
    4096
}
fn default_exit_grace_ms() -> u64 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = PumpSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.poll_interval(), Duration::from_millis(10));
        assert_eq!(settings.read_chunk_size, 4096);
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(PumpSettings::responsive().validate().is_ok());
        assert!(PumpSettings::relaxed().validate().is_ok());
        assert!(PumpSettings::responsive().poll_interval() < PumpSettings::relaxed().poll_interval());
    }

    #[test]
    fn test_invalid_settings() {
        let mut settings = PumpSettings {
            read_chunk_size: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        settings.read_chunk_size = 1024;
        settings.poll_interval_ms = 0;
        assert!(settings.validate().is_err());

        settings.poll_interval_ms = 5_000;
        assert!(settings.validate().is_err());

        settings.poll_interval_ms = 10;
        settings.exit_grace_ms = 120_000;
        assert!(matches!(
            settings.validate(),
            Err(ShellError::Configuration(_))
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: PumpSettings = serde_json::from_str(r#"{"pollIntervalMs": 25}"#).unwrap();
        assert_eq!(settings.poll_interval_ms, 25);
        assert_eq!(settings.read_chunk_size, 4096);
        assert_eq!(settings.exit_grace_ms, 100);

        let mode: TerminationMode = serde_json::from_str(r#""kill""#).unwrap();
        assert_eq!(mode, TerminationMode::Kill);
    }

    #[test]
    fn test_builder() {
        let config = ShellConfig::builder()
            .command("ls -la")
            .working_directory("/tmp")
            .env("TERM", "dumb")
            .env_multi([("A", "1"), ("B", "2")])
            .termination(TerminationMode::Kill)
            .build()
            .unwrap();

        assert_eq!(config.command, "ls -la");
        assert_eq!(config.working_directory, Some(PathBuf::from("/tmp")));
        assert_eq!(config.env.len(), 3);
        assert_eq!(config.env["TERM"], "dumb");
        assert_eq!(config.termination, TerminationMode::Kill);
        assert!(!config.kill_on_drop);
        assert_eq!(config.pump, PumpSettings::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_command_is_rejected() {
        assert!(ShellConfig::new("   ").validate().is_err());
        assert!(ShellConfig::new("true").validate().is_ok());
    }
}
