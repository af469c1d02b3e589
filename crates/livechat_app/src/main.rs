mod cli;
mod config;
mod output;

use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chat_logging::{chat_error, chat_info, LogDestination};
use clap::Parser;
use livechat_core::ChatMessage;
use livechat_engine::{
    ChatListener, ListenerError, LiveLookup, LiveResolver, ObserverError, ReqwestLiveResolver,
    ReqwestSnapshotFetcher,
};

use crate::cli::{Args, Target};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let destination = match &args.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    chat_logging::initialize(destination, args.log_level);

    let config = args.apply(config::load(args.config.as_deref())?);

    let video_id = match args.target() {
        Target::Video(video_id) => video_id,
        Target::Handle(handle) => {
            let resolver = ReqwestLiveResolver::new(config.fetch_options.clone())
                .context("failed to set up the HTTP client")?;
            match resolver.resolve_live(&handle).await {
                LiveLookup::Found(video_id) => video_id,
                LiveLookup::NotFound => bail!("{handle} has no live stream right now"),
            }
        }
    };
    chat_info!(
        "Following chat of {video_id} every {:?} (dynamic: {})",
        config.interval,
        config.dynamic_polling
    );

    let source = ReqwestSnapshotFetcher::new(&config.fetch_options)
        .context("failed to set up the HTTP client")?;
    let listener = ChatListener::new(video_id, config, Arc::new(source));
    let json = args.json;
    listener.on_message(Arc::new(
        move |message: &ChatMessage| -> Result<(), ObserverError> { print_message(message, json) },
    ));
    listener.on_error(|err: &ListenerError| {
        if let ListenerError::Observer { message_id, reason } = err {
            chat_error!("Could not print message {message_id}: {reason}");
        }
    });

    if !listener.start() {
        bail!("listener could not be started");
    }
    tokio::signal::ctrl_c()
        .await
        .context("failed to wait for Ctrl-C")?;
    chat_info!("Stopping");
    listener.stop().await;
    Ok(())
}

fn print_message(message: &ChatMessage, json: bool) -> Result<(), ObserverError> {
    let line = if json {
        output::format_json(message).map_err(|err| ObserverError::new(err.to_string()))?
    } else {
        output::format_line(message)
    };
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}").map_err(|err| ObserverError::new(err.to_string()))
}
