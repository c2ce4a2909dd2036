//! Fire one or more concurrent copies of an HTTP request through the
//! orchestrator and print the result.
//!
//! # Examples
//!
//! ```sh
//! # Single GET with two retries half a second apart
//! herd https://example.com/items --retries 2 --delay 0.5
//!
//! # Five concurrent copies coalesce into one network call
//! herd http://example.com/items --repeat 5 -v
//!
//! # POST with a JSON body and custom headers
//! herd https://example.com/items --method post \
//!   --header "Authorization: Bearer abc" \
//!   --body '{"name":"x"}' --content-type application/json
//! ```

use clap::Parser;
use futures::future::join_all;
use herd_rs::config::{DEFAULT_CONFIG_FILE, HerdConfig};
use herd_rs::prelude::*;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Deduplicating, retrying HTTP client.
#[derive(Parser)]
#[command(name = "herd")]
struct Cli {
    /// Target URL (http is upgraded to https)
    url: String,

    /// HTTP method: get, post, patch, delete
    #[arg(long, short = 'X', default_value = "get")]
    method: Method,

    /// Request header as "Name: value" (repeatable)
    #[arg(long = "header", short = 'H')]
    headers: Vec<String>,

    /// Request body (ignored for GET)
    #[arg(long)]
    body: Option<String>,

    /// Content type for the body
    #[arg(long)]
    content_type: Option<String>,

    /// Retries after the first attempt (overrides the config file)
    #[arg(long)]
    retries: Option<u32>,

    /// Seconds between attempts (overrides the config file)
    #[arg(long)]
    delay: Option<f64>,

    /// Cancel a running flight for the same URL instead of joining it
    #[arg(long)]
    preempt: bool,

    /// Number of concurrent copies to submit
    #[arg(long, default_value_t = 1)]
    repeat: usize,

    /// Path to the JSON config file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log at debug level
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "herd_rs=debug,herd=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

/// Returns whether every copy succeeded.
async fn run(cli: Cli) -> Result<bool, HerdError> {
    let config = HerdConfig::load(&cli.config);
    let transport = config.transport()?;
    let orchestrator = Orchestrator::new(Arc::new(transport));

    let mut builder = RequestDescriptor::builder(cli.method, cli.url.as_str())
        .max_attempts(cli.retries.unwrap_or(config.default_max_attempts))
        .delay_seconds(cli.delay.unwrap_or(config.default_delay_secs))
        .coalescing(if cli.preempt {
            Coalescing::Preempt
        } else {
            Coalescing::Share
        });
    for raw in &cli.headers {
        let (name, value) = raw
            .split_once(':')
            .ok_or_else(|| HerdError::Config(format!("malformed header '{raw}' (expected Name: value)")))?;
        builder = builder.header(name.trim(), value.trim());
    }
    if let Some(body) = cli.body {
        builder = builder.body(body);
    }
    if let Some(ct) = cli.content_type {
        builder = builder.content_type(ct);
    }
    let request = builder.build();

    let mut handles = Vec::with_capacity(cli.repeat.max(1));
    for copy in 0..cli.repeat.max(1) {
        let hooks = CallbackSet::new()
            .with_error(move |msg| eprintln!("[#{copy}] {msg}"))
            .with_error_end(move |detail| eprintln!("[#{copy}] {detail}"));
        let handle = orchestrator.submit(&request, hooks)?;
        tracing::debug!("copy #{copy} is {:?} of {}", handle.role(), handle.flight_id());
        handles.push(handle);
    }

    let outcomes = join_all(handles.into_iter().map(FlightHandle::wait)).await;

    let mut all_ok = true;
    let mut printed = false;
    for outcome in outcomes {
        match outcome? {
            Outcome::Success(response) => {
                if !printed {
                    println!("{}", response.body);
                    printed = true;
                }
            }
            Outcome::Failure(_) | Outcome::Preempted { .. } => all_ok = false,
        }
    }
    Ok(all_ok)
}
