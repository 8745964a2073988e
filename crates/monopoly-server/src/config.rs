//! Server configuration from the environment.

use anyhow::Context;
use monopoly_core::rules::{MAX_PLAYERS, MIN_PLAYERS};
use std::net::SocketAddr;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// Settings read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `SERVER_ADDR`
    pub addr: SocketAddr,
    /// `MAX_PLAYERS`, the largest table a room may open
    pub max_players: u8,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let addr = lookup("SERVER_ADDR")
            .unwrap_or_else(|| DEFAULT_ADDR.to_string())
            .parse()
            .context("SERVER_ADDR is not a socket address")?;

        let max_players = match lookup("MAX_PLAYERS") {
            Some(raw) => raw
                .trim()
                .parse::<u8>()
                .with_context(|| format!("MAX_PLAYERS is not a number: {:?}", raw))?,
            None => MAX_PLAYERS as u8,
        }
        .clamp(MIN_PLAYERS as u8, MAX_PLAYERS as u8);

        Ok(Self { addr, max_players })
    }

    /// Table size for a new room: the request, bounded by this server's limit
    pub fn room_size(&self, requested: Option<u8>) -> u8 {
        requested
            .unwrap_or(self.max_players)
            .clamp(MIN_PLAYERS as u8, self.max_players)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_players: MAX_PLAYERS as u8,
        }
    }
}
