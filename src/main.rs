//! nodefan CLI entry point
//!
//! Loads a simulated cluster, fans one command out to a node selection, waits with
//! the configured timeout, and prints the per-node report.

use anyhow::{Context, Result};
use nodefan::command::{output, CommandArgs, CommandKeyword};
use nodefan::config::{cli::Cli, cli_convert, toml, validator};
use nodefan::dispatch::{Dispatcher, InFlightRegistry};
use nodefan::report::{json, text, DispatchReport};
use nodefan::util::{logging, time::format_duration};
use nodefan::CommandDescriptor;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    cli.validate()?;

    let config = toml::parse_toml_file(&cli.config)?;
    let config = toml::merge_cli_with_config(&cli, config)?;
    validator::validate_config(&config).context("Configuration validation failed")?;

    logging::init_tracing(&config.logging)?;

    let selector = cli_convert::parse_selector(&cli.selector)?;
    let topology = Arc::new(config.topology()?);
    let transport = Arc::new(config.mock_transport());
    let dispatcher = Dispatcher::new(topology, transport, Arc::new(InFlightRegistry::new()))
        .with_policy(config.dispatch.wait_policy());

    if cli.dry_run {
        let nodes = dispatcher.topology().current_nodes(&selector);
        println!("Selector {} resolves to {} node(s):", selector, nodes.len());
        for node in &nodes {
            println!("  {}", node);
        }
        println!();
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }

    let keyword = CommandKeyword::parse(&cli.command);
    let args = cli
        .args
        .iter()
        .fold(CommandArgs::new(), |args, arg| args.add_value(arg));
    let descriptor = CommandDescriptor::with_output(keyword, output::raw(), args);

    let started = Instant::now();
    let collection = dispatcher.dispatch(&selector, descriptor)?;

    let pending = collection.await_default().await;
    if !pending.is_empty() {
        warn!(
            pending = pending.len(),
            timeout_ms = config.dispatch.timeout_ms,
            "wait timed out with nodes still pending"
        );
        if config.dispatch.cancel_on_timeout {
            collection.cancel();
        }
    }
    info!(elapsed = %format_duration(started.elapsed()), "dispatch finished");

    let report = DispatchReport::from_collection(&collection, &cli.selector, |reply| reply.to_string())?;

    if cli.json {
        println!("{}", json::to_json_string(&report, true)?);
    } else {
        text::print_report(&report);
    }

    if let Some(path) = &cli.json_output {
        json::write_json_file(path, &report, true)?;
        info!(path = %path.display(), "report written");
    }

    if cli.strict {
        let unhealthy = report.unhealthy_nodes().count();
        if unhealthy > 0 {
            anyhow::bail!("{} of {} node(s) did not succeed", unhealthy, report.nodes.len());
        }
    }

    Ok(())
}
