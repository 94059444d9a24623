//! proxy-toggle - control-surface plugin for macOS network proxies
//!
//! `run` speaks the surface protocol over stdio; the other subcommands
//! drive the same proxy store directly for scripting and troubleshooting.

mod bridge;
mod cli;

use clap::Parser;
use cli::{Cli, Command, EnableArgs, TargetArgs};
use env_logger::{Env, Target};
use log::{error, info};
use proxy_toggle_core::{
    JsonLinesSurface, NetworksetupStore, PluginConfig, ProxyConfigStore, ProxyTogglePlugin,
    ProxyTypeResolver, Result,
};
use std::io;
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => PluginConfig::load(path),
        None => PluginConfig::load_or_default(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // stdout belongs to the surface protocol in `run` mode
    env_logger::Builder::from_env(Env::default().default_filter_or(config.log_level.as_str()))
        .target(Target::Stderr)
        .init();

    match execute(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Command, config: &PluginConfig) -> Result<()> {
    let store: Arc<dyn ProxyConfigStore> =
        Arc::new(NetworksetupStore::new(config.networksetup_path.as_str()));

    match command {
        Command::Services => list_services(store.as_ref()),
        Command::Status(target) => show_status(ProxyTypeResolver::new(store), &target),
        Command::Enable(args) => enable(ProxyTypeResolver::new(store), &args),
        Command::Disable(target) => {
            ProxyTypeResolver::new(store).set_enabled(target.kind, &target.service, false)?;
            println!("{} proxy disabled on '{}'", target.kind.display_name(), target.service);
            Ok(())
        }
        Command::Run => run(store, config),
    }
}

fn list_services(store: &dyn ProxyConfigStore) -> Result<()> {
    for service in store.list_network_services()? {
        println!(
            "({}) {}  [{}, {}]",
            service.index, service.name, service.hardware_port, service.device
        );
    }
    Ok(())
}

fn show_status(resolver: ProxyTypeResolver, target: &TargetArgs) -> Result<()> {
    let observed = resolver.get(target.kind, &target.service)?;

    println!("{} proxy on '{}'", target.kind.display_name(), target.service);
    if observed.is_indeterminate() {
        println!("  HTTP and HTTPS settings differ");
        return Ok(());
    }
    println!("  Enabled: {}", if observed.enabled { "Yes" } else { "No" });
    println!("  Server:  {}", observed.server.as_deref().unwrap_or(""));
    println!("  Port:    {}", observed.port.as_deref().unwrap_or(""));
    Ok(())
}

fn enable(resolver: ProxyTypeResolver, args: &EnableArgs) -> Result<()> {
    let credentials = args.credentials()?;
    let target = &args.target;

    resolver.set(
        target.kind,
        &target.service,
        &args.domain,
        &args.port,
        credentials.as_ref(),
    )?;
    println!(
        "{} proxy {}:{} enabled on '{}'",
        target.kind.display_name(),
        args.domain,
        args.port,
        target.service
    );
    Ok(())
}

fn run(store: Arc<dyn ProxyConfigStore>, config: &PluginConfig) -> Result<()> {
    let surface = Arc::new(JsonLinesSurface::new(io::stdout()));
    let plugin = ProxyTogglePlugin::new(store, surface, config);
    let monitor = plugin.start_monitoring()?;
    info!(
        "serving control surface (poll every {:?}, debounce {:?})",
        config.poll_interval(),
        config.debounce()
    );

    let served = bridge::serve(&plugin, io::stdin().lock());
    monitor.shutdown();
    served.map(|_| ())
}
