// Copyright (c) 2026 Roman Barinov <rbarinov@gmail.com>
// Licensed under the FSL-1.1-NC.

use resocket_client::{config, Event, EventKind, Message, ReadyState, ReconnectingSocket};

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "resocket")]
#[command(about = "Always-on WebSocket client: stdin lines out, messages to stdout", version)]
struct Args {
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Overrides the configured URL
    #[arg(value_name = "URL")]
    url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resocket=info,resocket_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = config::Config::load(args.config, args.url)?;

    tracing::info!("Starting resocket");
    tracing::info!("Server: {}", config.server.url);

    let socket = ReconnectingSocket::new(config.server.url.clone(), config.socket.clone())?;
    register_handlers(&socket);
    socket.open();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line? {
                Some(line) => {
                    if let Err(e) = socket.send(line).await {
                        tracing::warn!("Message not sent: {}", e);
                    }
                }
                None => break,
            },
        }
    }

    socket.close();
    if tokio::time::timeout(Duration::from_secs(2), socket.wait_for(ReadyState::Closed))
        .await
        .is_err()
    {
        tracing::warn!("Server did not acknowledge close in time");
    }
    socket.dispose();
    Ok(())
}

fn register_handlers(socket: &ReconnectingSocket) {
    socket.on(EventKind::Message, |event| {
        if let Event::Message { data } = event {
            match data {
                Message::Text(text) => println!("{}", text),
                binary => println!("<{} bytes>", binary.len()),
            }
        }
    });
    socket.on(EventKind::Open, |event| {
        if let Event::Open {
            url,
            reconnect_attempt: true,
        } = event
        {
            tracing::info!("Reconnected to {}", url);
        }
    });
    socket.on(EventKind::Close, |event| {
        if let Event::Close { url: Some(url) } = event {
            tracing::warn!("Lost connection to {}", url);
        }
    });
    socket.on(EventKind::ConnectTimeout, |_| {
        tracing::warn!("Connection attempt timed out");
    });
    socket.on(EventKind::MaxRetry, |_| {
        tracing::error!("Giving up: reconnect attempts exhausted");
    });
    socket.on(EventKind::Error, |event| {
        if let Event::Error { error } = event {
            tracing::error!("Transport error: {}", error);
        }
    });
}
