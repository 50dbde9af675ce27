//! Startup configuration.
//!
//! Every option can be given as a flag or through its `PARLEY_*`
//! environment variable; flags win.

use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, ValueEnum};
use parley::prelude::*;

pub const DEFAULT_BIND: &str = "0.0.0.0:9090";

/// Command-line arguments for the relay.
#[derive(Parser, Debug, Clone)]
#[command(name = "parley-server")]
#[command(about = "Parley - WebRTC signaling relay")]
#[command(version)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, default_value = DEFAULT_BIND, env = "PARLEY_BIND")]
    pub bind: String,

    /// Comma-separated browser origins allowed to connect (empty allows any)
    #[arg(long, env = "PARLEY_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    /// Seconds a connection may stay silent before it is dropped (0 disables)
    #[arg(long, default_value_t = 0, env = "PARLEY_IDLE_TIMEOUT_SECS")]
    pub idle_timeout_secs: u64,

    /// Re-broadcast the roster after a participant leaves
    #[arg(
        long,
        default_value_t = true,
        env = "PARLEY_ROSTER_ON_LEAVE",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub roster_on_leave: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json, env = "PARLEY_LOG_FORMAT")]
    pub log_format: LogFormat,
}

/// How log lines are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

impl ServerConfig {
    pub fn origin_policy(&self) -> OriginPolicy {
        OriginPolicy::from_origins(self.allowed_origins.iter().map(String::as_str))
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            idle_timeout: (self.idle_timeout_secs > 0)
                .then(|| Duration::from_secs(self.idle_timeout_secs)),
            roster_on_leave: self.roster_on_leave,
        }
    }
}
