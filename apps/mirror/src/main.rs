use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use client_core::{
    settings::{load_settings, normalize_server_url, DEFAULT_SETTINGS_FILE},
    ChatSnapshot, ChatState, CurrentUser, HttpRenewer, HubEvent, HubHandle, SessionStore,
    SseTransport, StreamConnection, TokenPair,
};
use shared::domain::UserId;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Mirrors chat state from the server's event stream until interrupted.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    token: Option<String>,
    #[arg(long)]
    refresh_token: Option<String>,
    #[arg(long)]
    uid: Option<i64>,
    #[arg(long, default_value = "")]
    name: String,
    #[arg(long)]
    state_file: Option<PathBuf>,
    #[arg(long)]
    retry_delay_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings(&args.config)?;
    if let Some(server_url) = args.server_url {
        settings.server_url = normalize_server_url(&server_url)?;
    }
    if args.token.is_some() {
        settings.token = args.token;
    }
    if args.refresh_token.is_some() {
        settings.refresh_token = args.refresh_token;
    }
    if args.uid.is_some() {
        settings.uid = args.uid;
    }
    if args.state_file.is_some() {
        settings.state_file = args.state_file;
    }
    if let Some(ms) = args.retry_delay_ms {
        settings.retry_delay = Duration::from_millis(ms);
    }

    let mut state = ChatState::new(SessionStore::default());
    if let Some(path) = &settings.state_file {
        if let Some(snapshot) = ChatSnapshot::load(path).await? {
            info!(path = %path.display(), "mirror: restored snapshot");
            snapshot.apply_to(&mut state);
        }
    }
    if let Some(token) = settings.token.clone() {
        state.session.update_token(TokenPair {
            token,
            refresh_token: settings.refresh_token.clone().unwrap_or_default(),
        });
    }
    if let Some(uid) = settings.uid.map(UserId) {
        if state.session.current_uid() != Some(uid) {
            state.session.set_user(CurrentUser::new(uid, args.name));
        }
    }
    if state.stream_params().is_none() {
        warn!("mirror: no token configured; waiting for credentials");
    }

    let (mut connection, handle) = StreamConnection::new(
        Arc::new(SseTransport::new(settings.server_url.clone())),
        Arc::new(HttpRenewer::new(settings.server_url.clone())),
        settings.stream_settings(),
    );
    tokio::spawn(watch_events(connection.subscribe_events(), handle.clone()));
    tokio::spawn(shutdown_on_ctrl_c(handle));

    info!(server_url = %settings.server_url, "mirror: starting");
    connection.run(&mut state).await;

    if let Some(path) = &settings.state_file {
        ChatSnapshot::capture(&state).save(path).await?;
        info!(path = %path.display(), "mirror: snapshot saved");
    }

    let unread: usize = state
        .messages
        .channels()
        .conversations()
        .map(|gid| state.messages.channels().unread_count(gid))
        .chain(
            state
                .messages
                .direct()
                .conversations()
                .map(|uid| state.messages.direct().unread_count(uid)),
        )
        .sum();
    println!(
        "channels={} contacts={} online={} unread={} users_version={} after_mid={}",
        state.channels.len(),
        state.contacts.len(),
        state.contacts.online_count(),
        unread,
        state.cursor.users_version(),
        state.cursor.after_mid(),
    );

    Ok(())
}

async fn watch_events(mut events: broadcast::Receiver<HubEvent>, handle: HubHandle) {
    loop {
        match events.recv().await {
            Ok(HubEvent::SessionEnded(reason)) => {
                info!(?reason, "mirror: session ended; stopping");
                let _ = handle.shutdown().await;
                return;
            }
            Ok(event) => debug!(?event, "mirror: hub event"),
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "mirror: hub events dropped"),
            Err(RecvError::Closed) => return,
        }
    }
}

async fn shutdown_on_ctrl_c(handle: HubHandle) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("mirror: interrupted");
        let _ = handle.shutdown().await;
    }
}
