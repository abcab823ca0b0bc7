// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use binder::{
    bind9::RecordKind,
    config::Inventory,
    constants::{
        CONFIG_PATH_ENV, DEFAULT_DNS_RECORD_TTL_SECS, DEFAULT_QUERY_LOG_PATH,
        DEFAULT_QUERY_LOG_WINDOW, TOKIO_WORKER_THREADS,
    },
    coordinator::{AddCnameRequest, AddRecordRequest, OperationResult, ZoneManager},
    metrics::gather_metrics,
    query_history::summarize_file,
    triples::{parse_triple_list, parse_triples},
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Manage records on authoritative BIND9 servers.
#[derive(Debug, Parser)]
#[command(name = "binder", version, about)]
struct Cli {
    /// Inventory file
    #[arg(long, global = true, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Print Prometheus metrics after the command
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List configured servers and their addresses
    Servers,

    /// List the zones a server serves
    Zones {
        #[arg(long)]
        server: String,
    },

    /// List a zone's records via AXFR
    Records {
        #[arg(long)]
        server: String,
        #[arg(long)]
        zone: String,
        /// Transfer key; defaults to the server's default transfer key
        #[arg(long)]
        key: Option<String>,
    },

    /// Add an A, AAAA or PTR record
    Add {
        #[arg(long)]
        server: String,
        #[arg(long)]
        zone: String,
        /// Record name, relative to the zone; `@` for the apex
        #[arg(long)]
        name: String,
        #[arg(long = "type", default_value = "A")]
        kind: RecordKind,
        #[arg(long)]
        data: String,
        #[arg(long, default_value_t = DEFAULT_DNS_RECORD_TTL_SECS)]
        ttl: u32,
        #[arg(long)]
        key: Option<String>,
        /// Also add the matching PTR record
        #[arg(long)]
        reverse: bool,
    },

    /// Add a CNAME record
    AddCname {
        #[arg(long)]
        server: String,
        #[arg(long)]
        zone: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        target: String,
        #[arg(long, default_value_t = DEFAULT_DNS_RECORD_TTL_SECS)]
        ttl: u32,
        #[arg(long)]
        key: Option<String>,
    },

    /// Delete records given as `name||data||type` tokens or one list literal
    Delete {
        #[arg(long)]
        server: String,
        #[arg(long)]
        zone: String,
        #[arg(long)]
        key: Option<String>,
        #[arg(required = true)]
        records: Vec<String>,
    },

    /// Summarize the query log
    History {
        #[arg(long, default_value = DEFAULT_QUERY_LOG_PATH)]
        log: PathBuf,
        #[arg(long, default_value_t = DEFAULT_QUERY_LOG_WINDOW)]
        window: usize,
    },
}

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("binder")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    let cli = Cli::parse();
    initialize_logging();

    let result = run(&cli).await;

    if cli.metrics {
        println!("{}", gather_metrics().context("Failed to encode metrics")?);
    }
    result
}

/// Logs go to stderr so command output stays clean on stdout.
///
/// `RUST_LOG` selects the level (default `info`), `RUST_LOG_FORMAT=json`
/// switches to JSON lines.
fn initialize_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
    debug!("Logging initialized with file and line number tracking");
}

async fn run(cli: &Cli) -> Result<()> {
    if let Command::History { log, window } = &cli.command {
        let summary = summarize_file(log, *window).await?;
        println!("A      {}", summary.a);
        println!("AAAA   {}", summary.aaaa);
        println!("CNAME  {}", summary.cname);
        println!("NS     {}", summary.ns);
        println!("other  {}", summary.other);
        println!("first  {}", summary.first_seen.as_deref().unwrap_or("-"));
        println!("last   {}", summary.last_seen.as_deref().unwrap_or("-"));
        return Ok(());
    }

    let path = Inventory::resolve_path(cli.config.as_deref());
    let inventory = Inventory::load(&path)?;
    let manager = ZoneManager::new(Arc::new(inventory));
    info!(config = %path.display(), "Binder engine ready");

    match &cli.command {
        Command::Servers => {
            for server in manager.servers() {
                let addresses = manager.resolve_addresses(&server.hostname).await?;
                let addresses: Vec<String> = addresses.iter().map(ToString::to_string).collect();
                println!(
                    "{}\tupdate={} transfer={} statistics={}\t{}",
                    server.hostname,
                    server.dns_port,
                    server.transfer_port,
                    server.statistics_port,
                    addresses.join(",")
                );
            }
            Ok(())
        }
        Command::Zones { server } => {
            let listing = manager.list_zones(server).await?;
            for (zone, metadata) in &listing.zones {
                println!(
                    "{zone}\t{}\t{}\t{}\t{}",
                    metadata.view,
                    metadata.class,
                    metadata.zone_type,
                    metadata
                        .serial
                        .map_or_else(|| "-".to_string(), |s| s.to_string())
                );
            }
            match listing.error {
                Some(e) => Err(e.into()),
                None => Ok(()),
            }
        }
        Command::Records { server, zone, key } => {
            let transfer = manager
                .list_zone_records(server, zone, key.as_deref())
                .await?;
            for record in &transfer.records {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    record.name,
                    record.ttl,
                    record.class,
                    record.record_type,
                    record.data,
                    record.delete_token()
                );
            }
            Ok(())
        }
        Command::Add {
            server,
            zone,
            name,
            kind,
            data,
            ttl,
            key,
            reverse,
        } => {
            let results = manager
                .add_record(&AddRecordRequest {
                    server: server.clone(),
                    zone: zone.clone(),
                    record_name: name.clone(),
                    kind: *kind,
                    data: data.clone(),
                    ttl: *ttl,
                    key_name: key.clone(),
                    create_reverse: *reverse,
                })
                .await?;
            report(&results)
        }
        Command::AddCname {
            server,
            zone,
            name,
            target,
            ttl,
            key,
        } => {
            let result = manager
                .add_cname_record(&AddCnameRequest {
                    server: server.clone(),
                    zone: zone.clone(),
                    record_name: name.clone(),
                    target: target.clone(),
                    ttl: *ttl,
                    key_name: key.clone(),
                })
                .await?;
            report(std::slice::from_ref(&result))
        }
        Command::Delete {
            server,
            zone,
            key,
            records,
        } => {
            let triples = match records.as_slice() {
                [single] if single.trim_start().starts_with('[') => parse_triple_list(single)?,
                tokens => parse_triples(tokens)?,
            };
            let results = manager
                .delete_records(server, zone, &triples, key.as_deref())
                .await?;
            report(&results)
        }
        Command::History { .. } => Ok(()),
    }
}

/// Print one line per result; fail if any operation failed.
fn report(results: &[OperationResult]) -> Result<()> {
    for result in results {
        let status = if result.is_success() { "ok" } else { "FAILED" };
        println!("{status}\t{}", result.description());
    }

    let failed = results.iter().filter(|r| !r.is_success()).count();
    if failed > 0 {
        warn!(failed = failed, total = results.len(), "Some operations failed");
        anyhow::bail!("{failed} of {} operation(s) failed", results.len());
    }
    Ok(())
}
