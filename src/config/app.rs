//! Main application configuration
//!
//! This module defines the configuration structures for the matchplay client,
//! including environment variable loading, TOML files and validation.

use crate::error::MatchmakingError;
use crate::matchmaker::OrchestratorConfig;
use crate::ticket::{SimulatedOutcome, SimulationConfig};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub matchmaker: MatchmakerSettings,
    pub simulation: SimulationSettings,
}

/// Client-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Client name for logging
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Ticket polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakerSettings {
    /// Delay between ticket polls in milliseconds
    pub poll_interval_ms: u64,
    /// Cancel the attempt after this many seconds; unset waits indefinitely
    pub give_up_after_seconds: Option<u64>,
}

/// Behaviour of the in-process matchmaker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Polls a ticket stays pending before resolving
    pub polls_until_resolved: u32,
    /// Resolution of every ticket: found, timeout or failed
    pub outcome: String,
    /// Address handed out on `found`
    pub server_ip: String,
    pub server_port: u16,
    /// Artificial latency per call in milliseconds
    pub latency_ms: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "matchplay-client".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for MatchmakerSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            give_up_after_seconds: None,
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            polls_until_resolved: 3,
            outcome: "found".to_string(),
            server_ip: "127.0.0.1".to_string(),
            server_port: 7777,
            latency_ms: 50,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; environment variables still override it
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(name) = env::var("MATCHPLAY_SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("MATCHPLAY_LOG_LEVEL") {
            self.service.log_level = log_level;
        }

        if let Ok(interval) = env::var("MATCHPLAY_POLL_INTERVAL_MS") {
            self.matchmaker.poll_interval_ms = interval
                .parse()
                .map_err(|_| anyhow!("Invalid MATCHPLAY_POLL_INTERVAL_MS value: {}", interval))?;
        }
        if let Ok(give_up) = env::var("MATCHPLAY_GIVE_UP_AFTER_SECONDS") {
            self.matchmaker.give_up_after_seconds = Some(give_up.parse().map_err(|_| {
                anyhow!("Invalid MATCHPLAY_GIVE_UP_AFTER_SECONDS value: {}", give_up)
            })?);
        }

        if let Ok(polls) = env::var("MATCHPLAY_SIM_POLLS_UNTIL_RESOLVED") {
            self.simulation.polls_until_resolved = polls.parse().map_err(|_| {
                anyhow!("Invalid MATCHPLAY_SIM_POLLS_UNTIL_RESOLVED value: {}", polls)
            })?;
        }
        if let Ok(outcome) = env::var("MATCHPLAY_SIM_OUTCOME") {
            self.simulation.outcome = outcome;
        }
        if let Ok(ip) = env::var("MATCHPLAY_SIM_SERVER_IP") {
            self.simulation.server_ip = ip;
        }
        if let Ok(port) = env::var("MATCHPLAY_SIM_SERVER_PORT") {
            self.simulation.server_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid MATCHPLAY_SIM_SERVER_PORT value: {}", port))?;
        }
        if let Ok(latency) = env::var("MATCHPLAY_SIM_LATENCY_MS") {
            self.simulation.latency_ms = latency
                .parse()
                .map_err(|_| anyhow!("Invalid MATCHPLAY_SIM_LATENCY_MS value: {}", latency))?;
        }

        Ok(())
    }

    /// Get poll interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.matchmaker.poll_interval_ms)
    }

    /// Get the give-up timeout as Duration, if any
    pub fn give_up_after(&self) -> Option<Duration> {
        self.matchmaker.give_up_after_seconds.map(Duration::from_secs)
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            poll_interval: self.poll_interval(),
        }
    }

    pub fn simulation_config(&self) -> Result<SimulationConfig> {
        Ok(SimulationConfig {
            polls_until_resolved: self.simulation.polls_until_resolved,
            outcome: parse_outcome(&self.simulation)?,
            latency: Duration::from_millis(self.simulation.latency_ms),
        })
    }
}

fn parse_outcome(settings: &SimulationSettings) -> Result<SimulatedOutcome> {
    match settings.outcome.to_lowercase().as_str() {
        "found" => Ok(SimulatedOutcome::Found {
            ip: settings.server_ip.clone(),
            port: settings.server_port,
        }),
        "timeout" => Ok(SimulatedOutcome::Timeout),
        "failed" => Ok(SimulatedOutcome::Failed),
        other => Err(MatchmakingError::ConfigurationError {
            message: format!(
                "Invalid simulation outcome: {} (expected found, timeout or failed)",
                other
            ),
        }
        .into()),
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.matchmaker.poll_interval_ms == 0 {
        return Err(anyhow!("Poll interval must be greater than 0"));
    }
    if config.matchmaker.give_up_after_seconds == Some(0) {
        return Err(anyhow!("Give-up timeout must be greater than 0"));
    }

    parse_outcome(&config.simulation)?;
    if config.simulation.server_ip.is_empty() {
        return Err(anyhow!("Simulated server IP cannot be empty"));
    }
    if config.simulation.server_port == 0 {
        return Err(anyhow!("Simulated server port cannot be 0"));
    }

    Ok(())
}
