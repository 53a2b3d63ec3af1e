use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pilotbar_weather::StationId;

/// Fetch and cache METAR weather for a single airport.
#[derive(Debug, Parser)]
#[command(name = "pilot-bar-daemon", version)]
pub struct Cli {
    /// Target station (defaults to the cached, then the configured station)
    #[arg(short, long)]
    pub airport: Option<StationId>,

    /// Force an update cycle even if the cache is fresh
    #[arg(short, long)]
    pub update: bool,

    /// Print the decoded observation after the cycle
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Enable info logging
    #[arg(short, long)]
    pub info: bool,

    /// Config file to use instead of the user config
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Switch to a new station, refresh it, and signal waybar
    Switch {
        /// ICAO identifier of the new station
        icao: StationId,
    },
}

impl Cli {
    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.info {
            "info"
        } else {
            "warn"
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_parses_flags() {
        let cli = Cli::try_parse_from(["pilot-bar-daemon", "-a", "kord", "-u", "-v"]).unwrap();
        assert_eq!(cli.airport.as_ref().unwrap().as_str(), "KORD");
        assert!(cli.update);
        assert!(cli.verbose);
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn test_parses_switch() {
        let cli = Cli::try_parse_from(["pilot-bar-daemon", "-d", "switch", "ksea"]).unwrap();
        match &cli.command {
            Some(Command::Switch { icao }) => assert_eq!(icao.as_str(), "KSEA"),
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.log_level(), "debug");
    }

    #[test]
    fn test_rejects_bad_station() {
        assert!(Cli::try_parse_from(["pilot-bar-daemon", "switch", "KSEAX"]).is_err());
        assert!(Cli::try_parse_from(["pilot-bar-daemon", "-a", "K!RD"]).is_err());
        assert!(Cli::try_parse_from(["pilot-bar-daemon", "switch"]).is_err());
    }

    #[test]
    fn test_debug_wins_over_info() {
        let cli = Cli::try_parse_from(["pilot-bar-daemon", "-i", "-d"]).unwrap();
        assert_eq!(cli.log_level(), "debug");
    }
}
