//! Criteo Forwarder — reads normalized analytics events as NDJSON and
//! dispatches each to the Criteo S2S event endpoint.
//!
//! Main entry point: initializes tracing, loads configuration, and
//! streams events from a file or stdin through the dispatcher.

use std::io::BufRead;
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info, warn};

use connector_core::config::AppConfig;
use connector_core::{ConnectorError, NormalizedEvent};
use connector_criteo::{mapper, validate, Delivery, Dispatcher, HttpTransport, LocaleResolver};

#[derive(Parser, Debug)]
#[command(name = "criteo-forwarder")]
#[command(about = "Forwards normalized analytics events to the Criteo S2S endpoint")]
#[command(version)]
struct Cli {
    /// NDJSON event file; reads stdin when omitted
    #[arg(long)]
    input: Option<PathBuf>,

    /// Map and print payloads without dispatching
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Fixed submission host (overrides regional routing)
    #[arg(long, env = "CRITEO_FORWARDER__ENDPOINT__FIXED_HOST")]
    fixed_host: Option<String>,
}

#[derive(Debug, Default)]
struct Totals {
    delivered: u64,
    passthrough: u64,
    invalid: u64,
    failed: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "criteo_forwarder=info,connector_criteo=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    if let Some(host) = cli.fixed_host {
        config.endpoint.fixed_host = Some(host);
    }

    info!(
        vendor_host = %config.endpoint.vendor_host,
        fixed_host = ?config.endpoint.fixed_host,
        max_retries = config.transport.max_retries,
        dry_run = cli.dry_run,
        "Criteo forwarder starting up"
    );

    let resolver = LocaleResolver::new(&config.routing);
    let transport = HttpTransport::new(&config.transport)?;
    let dispatcher = Dispatcher::new(config.endpoint.clone(), resolver, transport);

    let reader: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(std::io::BufReader::new(std::fs::File::open(path)?)),
        None => Box::new(std::io::stdin().lock()),
    };

    let mut totals = Totals::default();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let event: NormalizedEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = line_no + 1, error = %e, "skipping unparseable event");
                totals.invalid += 1;
                continue;
            }
        };

        if cli.dry_run {
            dry_run_event(&event, &mut totals);
            continue;
        }

        match dispatcher.dispatch(&event).await {
            Ok(Delivery::Delivered { status, region }) => {
                totals.delivered += 1;
                info!(line = line_no + 1, status, region = region.as_str(), "delivered");
            }
            Ok(Delivery::Passthrough) => totals.passthrough += 1,
            Err(ConnectorError::InvalidEvent(reason)) => {
                totals.invalid += 1;
                warn!(line = line_no + 1, %reason, "invalid event rejected");
            }
            Err(e) => {
                totals.failed += 1;
                error!(line = line_no + 1, error = %e, "delivery failed");
            }
        }
    }

    info!(
        delivered = totals.delivered,
        passthrough = totals.passthrough,
        invalid = totals.invalid,
        failed = totals.failed,
        "run complete"
    );
    Ok(())
}

/// Map without dispatching and print the payload to stdout.
fn dry_run_event(event: &NormalizedEvent, totals: &mut Totals) {
    if event.event_type != connector_core::EventType::Track {
        totals.passthrough += 1;
        return;
    }
    if let Err(e) = validate(event) {
        totals.invalid += 1;
        warn!(error = %e, "invalid event rejected");
        return;
    }
    match mapper::map_track(event) {
        Ok(payload) => {
            totals.delivered += 1;
            match serde_json::to_string(&payload) {
                Ok(json) => println!("{json}"),
                Err(e) => error!(error = %e, "payload serialization failed"),
            }
        }
        Err(e) => {
            totals.failed += 1;
            error!(error = %e, "mapping failed");
        }
    }
}
