use std::{env, sync::Arc};

use clap::Parser;
use cli::Args;
use clienthash_config::config::{Config, CONFIG_PATH};
use clienthash_dl::http_client::configure_http_client;
use clienthash_events::{ChannelSink, EventSinkHandle};
use clienthash_operations::{
    error::ErrorContext, generate::run, ClientSelection, HashContext, HashGenError, Result,
};
use clienthash_utils::system::{is_supported_os, platform};
use logging::setup_logging;
use progress::spawn_event_handler;
use tracing::{debug, warn};
use ureq::Proxy;
use utils::COLOR;

mod cli;
mod logging;
mod progress;
mod utils;

fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref c) = args.config {
        let path = env::current_dir()
            .with_context(|| "retrieving current directory".into())?
            .join(c);
        let mut config_path = CONFIG_PATH
            .write()
            .map_err(|_| HashGenError::Custom("config path lock poisoned".into()))?;
        *config_path = path;
    }

    let mut config = Config::new()?;
    if let Some(ref proxy) = args.proxy {
        config.proxy = Some(proxy.clone());
    }
    if let Some(ref user_agent) = args.user_agent {
        config.user_agent = Some(user_agent.clone());
    }

    Ok(config)
}

fn configure_http(config: &Config) -> Result<()> {
    let proxy = config
        .proxy
        .as_deref()
        .map(|proxy| {
            Proxy::new(proxy)
                .map_err(|err| HashGenError::Custom(format!("Invalid proxy '{proxy}': {err}")))
        })
        .transpose()?;
    let user_agent = config.user_agent().to_string();

    configure_http_client(|http| {
        if proxy.is_some() {
            http.proxy = proxy;
        }
        http.user_agent = Some(user_agent);
    });

    Ok(())
}

async fn handle_cli() -> Result<()> {
    let args = Args::parse();

    setup_logging(&args);

    if args.no_color {
        if let Ok(mut color) = COLOR.write() {
            *color = false;
        }
    }

    if !is_supported_os() {
        eprintln!("This tool currently only supports Linux.");
        std::process::exit(1);
    }

    let config = load_config(&args)?;
    configure_http(&config)?;
    debug!(platform = %platform(), api = %config.api_url(), "configuration loaded");

    let (sink, receiver) = ChannelSink::new();
    let events: EventSinkHandle = Arc::new(sink);
    let guard = spawn_event_handler(receiver);
    let ctx = HashContext::new(config, events);

    let result = run(&ctx, ClientSelection::from_flags(args.default, args.community)).await;

    // Drop the context first to close the event channel, then join the handler thread
    // so every queued line is printed before any error.
    drop(ctx);
    guard.finish();

    let summary = result?;
    if !summary.failed_clients.is_empty() {
        warn!(
            "Releases could not be listed for: {}",
            summary.failed_clients.join(", ")
        );
    }
    for skipped in &summary.skipped_sets {
        warn!("Skipped community set {}", skipped.display());
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli().await {
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}
