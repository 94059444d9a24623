//! Command-line interface

use clap::{Args, Parser, Subcommand};
use proxy_toggle_core::{Credentials, Error, LogicalProxyKind, Result};
use std::path::PathBuf;

/// Toggle and monitor macOS network proxies from a control surface
#[derive(Parser, Debug)]
#[command(name = "proxy-toggle", author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List network services in service order
    Services,

    /// Show the live proxy state of a network service
    Status(TargetArgs),

    /// Configure and switch on a proxy
    Enable(EnableArgs),

    /// Switch a proxy off
    Disable(TargetArgs),

    /// Serve the control surface: JSON events on stdin, JSON commands on stdout
    Run,
}

#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Network service name, e.g. "Wi-Fi"
    #[arg(short, long)]
    pub service: String,

    /// Proxy kind: http, https, socks or http(s)
    #[arg(short, long, value_name = "KIND")]
    pub kind: LogicalProxyKind,
}

#[derive(Args, Debug, Clone)]
pub struct EnableArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Proxy host
    #[arg(short, long)]
    pub domain: String,

    /// Proxy port
    #[arg(short, long)]
    pub port: String,

    #[arg(short, long)]
    pub username: Option<String>,

    /// Prefer the environment variable; arguments are visible to other users
    #[arg(long, env = "PROXY_TOGGLE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl EnableArgs {
    /// Credentials for the proxy, if any. A username without a password is
    /// rejected rather than silently sent unauthenticated.
    pub fn credentials(&self) -> Result<Option<Credentials>> {
        let username = self.username.as_deref().unwrap_or("");
        let password = self.password.as_deref().unwrap_or("");
        if username.is_empty() {
            return Ok(None);
        }
        match Credentials::from_parts(username, password) {
            Some(credentials) => Ok(Some(credentials)),
            None => Err(Error::config(
                "--username needs a password (--password or PROXY_TOGGLE_PASSWORD)",
            )),
        }
    }
}
