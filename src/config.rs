//! Command-line configuration.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "scene-sync", version, about = "Shared scene sync host and guest")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Host a session and accept guests over WebSocket
    Host {
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
        #[arg(long, default_value = "host")]
        name: String,
        /// Report the shared anchor as located
        #[arg(long)]
        anchored: bool,
        /// Tick interval in milliseconds
        #[arg(long, default_value_t = 100)]
        tick_ms: u64,
    },
    /// Join a hosted session as a guest
    Join {
        #[arg(long, default_value = "ws://127.0.0.1:3000/ws")]
        url: String,
        #[arg(long, default_value = "guest")]
        name: String,
        /// Address announced to the other peers
        #[arg(long, default_value = "127.0.0.1")]
        address: String,
        #[arg(long)]
        anchored: bool,
        #[arg(long, default_value_t = 100)]
        tick_ms: u64,
    },
}

pub fn tick_interval(tick_ms: u64) -> Duration {
    Duration::from_millis(tick_ms.max(1))
}
