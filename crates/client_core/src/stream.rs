use std::{sync::Arc, time::Duration};

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use shared::{
    domain::{Conversation, MessageId},
    protocol::KickReason,
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::{
    directory::{ChannelDirectory, ContactDirectory},
    dispatcher::Dispatch,
    error::ClientError,
    presenter::Presenter,
    renewal::CredentialRenewer,
    session::{CurrentUser, TokenPair},
    snapshot::ChatSnapshot,
    state::ChatState,
    transport::{EventStream, EventTransport, StreamItem, StreamParams, TransportPhase},
};

const COMMAND_QUEUE_DEPTH: usize = 64;
const EVENT_QUEUE_DEPTH: usize = 1024;
const MIN_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Disconnected,
    Connecting,
    Connected,
    Renewing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumePolicy {
    #[default]
    Immediate,
    OnCredentialChange,
}

#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub retry_delay: Duration,
    pub resume_policy: ResumePolicy,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(3),
            resume_policy: ResumePolicy::Immediate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubEvent {
    PhaseChanged(ConnectionPhase),
    EventApplied(Dispatch),
    CredentialsRenewed,
    SessionEnded(KickReason),
}

#[derive(Debug)]
pub enum HubCommand {
    SetCredentials {
        tokens: TokenPair,
        user: Option<CurrentUser>,
    },
    MarkRead {
        conversation: Conversation,
        mid: MessageId,
    },
    MarkAllRead {
        conversation: Conversation,
    },
    Snapshot {
        reply: oneshot::Sender<ChatSnapshot>,
    },
    Logout,
    Shutdown,
}

/// Dropping every handle stops the loop.
#[derive(Clone)]
pub struct HubHandle {
    cmd_tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    async fn send(&self, command: HubCommand) -> Result<(), ClientError> {
        self.cmd_tx
            .send(command)
            .await
            .map_err(|_| ClientError::HubClosed)
    }

    pub async fn set_credentials(
        &self,
        tokens: TokenPair,
        user: Option<CurrentUser>,
    ) -> Result<(), ClientError> {
        self.send(HubCommand::SetCredentials { tokens, user }).await
    }

    pub async fn mark_read(
        &self,
        conversation: Conversation,
        mid: MessageId,
    ) -> Result<(), ClientError> {
        self.send(HubCommand::MarkRead { conversation, mid }).await
    }

    pub async fn mark_all_read(&self, conversation: Conversation) -> Result<(), ClientError> {
        self.send(HubCommand::MarkAllRead { conversation }).await
    }

    pub async fn snapshot(&self) -> Result<ChatSnapshot, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| ClientError::HubClosed)
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        self.send(HubCommand::Logout).await
    }

    pub async fn shutdown(&self) -> Result<(), ClientError> {
        self.send(HubCommand::Shutdown).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wake {
    Shutdown,
    Idle,
}

enum Exit {
    Shutdown,
    Reconnect,
    Failed(ClientError),
}

struct ActiveStream {
    inner: Option<EventStream>,
}

impl ActiveStream {
    fn new(stream: EventStream) -> Self {
        Self {
            inner: Some(stream),
        }
    }

    async fn next(&mut self) -> Option<Result<StreamItem, ClientError>> {
        match self.inner.as_mut() {
            Some(stream) => stream.next().await,
            None => None,
        }
    }

    fn close(mut self, reason: &str) {
        if self.inner.take().is_some() {
            info!(reason, "stream: closed");
        }
    }
}

impl Drop for ActiveStream {
    fn drop(&mut self) {
        if self.inner.take().is_some() {
            debug!("stream: closed on drop");
        }
    }
}

type RenewalResult = Result<TokenPair, ClientError>;

pub struct StreamConnection {
    transport: Arc<dyn EventTransport>,
    renewer: Arc<dyn CredentialRenewer>,
    settings: StreamSettings,
    retry_delay: Duration,
    phase: ConnectionPhase,
    events: broadcast::Sender<HubEvent>,
    commands: mpsc::Receiver<HubCommand>,
    renewals_tx: mpsc::UnboundedSender<RenewalResult>,
    renewals_rx: mpsc::UnboundedReceiver<RenewalResult>,
}

impl StreamConnection {
    pub fn new(
        transport: Arc<dyn EventTransport>,
        renewer: Arc<dyn CredentialRenewer>,
        settings: StreamSettings,
    ) -> (Self, HubHandle) {
        let (cmd_tx, commands) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (events, _) = broadcast::channel(EVENT_QUEUE_DEPTH);
        let (renewals_tx, renewals_rx) = mpsc::unbounded_channel();
        let connection = Self {
            transport,
            renewer,
            retry_delay: settings.retry_delay,
            settings,
            phase: ConnectionPhase::Disconnected,
            events,
            commands,
            renewals_tx,
            renewals_rx,
        };
        (connection, HubHandle { cmd_tx })
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<HubEvent> {
        self.events.subscribe()
    }

    /// Runs until `Shutdown` is received or every handle is dropped.
    pub async fn run<C, R, P>(&mut self, state: &mut ChatState<C, R, P>)
    where
        C: ChannelDirectory,
        R: ContactDirectory,
        P: Presenter,
    {
        info!("stream: loop started");
        loop {
            let Some(params) = state.stream_params() else {
                self.set_phase(ConnectionPhase::Disconnected);
                match self.wait_input(state).await {
                    Wake::Shutdown => break,
                    Wake::Idle => continue,
                }
            };

            match self.connect_and_stream(state, &params).await {
                Exit::Shutdown => break,
                Exit::Reconnect => continue,
                Exit::Failed(err) => {
                    self.handle_transport_error(err, &params);
                    if self.wait_retry(state, &params).await == Wake::Shutdown {
                        break;
                    }
                }
            }
        }
        self.set_phase(ConnectionPhase::Disconnected);
        info!("stream: loop stopped");
    }

    async fn connect_and_stream<C, R, P>(
        &mut self,
        state: &mut ChatState<C, R, P>,
        params: &StreamParams,
    ) -> Exit
    where
        C: ChannelDirectory,
        R: ContactDirectory,
        P: Presenter,
    {
        self.set_phase(ConnectionPhase::Connecting);
        debug!(
            users_version = params.users_version,
            after_mid = params.after_mid,
            "stream: connecting"
        );

        let transport = Arc::clone(&self.transport);
        let open = transport.open(params);
        tokio::pin!(open);
        let stream = loop {
            tokio::select! {
                opened = &mut open => match opened {
                    Ok(stream) => break stream,
                    Err(err) => return Exit::Failed(err),
                },
                wake = self.wait_input(state) => {
                    if wake == Wake::Shutdown {
                        return Exit::Shutdown;
                    }
                    if self.must_reconnect(state, params) {
                        debug!("stream: inputs changed while connecting");
                        return Exit::Reconnect;
                    }
                }
            }
        };

        let mut active = ActiveStream::new(stream);
        self.set_phase(ConnectionPhase::Connected);
        info!(
            users_version = params.users_version,
            after_mid = params.after_mid,
            "stream: opened"
        );

        loop {
            tokio::select! {
                item = active.next() => match item {
                    Some(Ok(StreamItem::Event(raw))) => {
                        let outcome = state.dispatch_raw(&raw);
                        self.publish(HubEvent::EventApplied(outcome));
                        if let Dispatch::SessionEnded(reason) = outcome {
                            self.publish(HubEvent::SessionEnded(reason));
                        }
                        if self.must_reconnect(state, params) {
                            active.close("inputs changed");
                            return Exit::Reconnect;
                        }
                    }
                    Some(Ok(StreamItem::Retry(delay))) => {
                        debug!(delay_ms = delay.as_millis() as u64, "stream: server retry hint");
                        self.retry_delay = delay.max(MIN_RETRY_DELAY);
                    }
                    Some(Err(err)) => {
                        active.close("transport error");
                        return Exit::Failed(err);
                    }
                    None => {
                        return Exit::Failed(ClientError::transport(
                            TransportPhase::Closed,
                            "event stream ended",
                        ));
                    }
                },
                wake = self.wait_input(state) => {
                    if wake == Wake::Shutdown {
                        active.close("shutdown");
                        return Exit::Shutdown;
                    }
                    if self.must_reconnect(state, params) {
                        active.close("inputs changed");
                        return Exit::Reconnect;
                    }
                }
            }
        }
    }

    fn must_reconnect<C, R, P>(&self, state: &ChatState<C, R, P>, current: &StreamParams) -> bool
    where
        C: ChannelDirectory,
        R: ContactDirectory,
        P: Presenter,
    {
        let Some(next) = state.stream_params() else {
            return true;
        };
        match self.settings.resume_policy {
            ResumePolicy::Immediate => next != *current,
            ResumePolicy::OnCredentialChange => !next.same_credentials(current),
        }
    }

    fn handle_transport_error(&mut self, err: ClientError, params: &StreamParams) {
        if err.triggers_renewal() {
            warn!(error = %err, "stream: error while connecting or closing; renewing credentials");
            self.spawn_renewal(params);
            self.set_phase(ConnectionPhase::Renewing);
        } else {
            error!(error = %err, "stream: transport error");
            self.set_phase(ConnectionPhase::Disconnected);
        }
    }

    fn spawn_renewal(&self, params: &StreamParams) {
        let renewer = Arc::clone(&self.renewer);
        let renewals_tx = self.renewals_tx.clone();
        let token = params.token.clone();
        let refresh_token = params.refresh_token.clone();
        tokio::spawn(async move {
            let result = renewer.renew(&token, &refresh_token).await;
            let _ = renewals_tx.send(result);
        });
    }

    async fn wait_retry<C, R, P>(
        &mut self,
        state: &mut ChatState<C, R, P>,
        params: &StreamParams,
    ) -> Wake
    where
        C: ChannelDirectory,
        R: ContactDirectory,
        P: Presenter,
    {
        let sleep = tokio::time::sleep(self.retry_delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return Wake::Idle,
                wake = self.wait_input(state) => {
                    if wake == Wake::Shutdown {
                        return Wake::Shutdown;
                    }
                    if self.must_reconnect(state, params) {
                        return Wake::Idle;
                    }
                }
            }
        }
    }

    async fn wait_input<C, R, P>(&mut self, state: &mut ChatState<C, R, P>) -> Wake
    where
        C: ChannelDirectory,
        R: ContactDirectory,
        P: Presenter,
    {
        tokio::select! {
            command = self.commands.recv() => match command {
                Some(command) => self.apply_command(state, command),
                None => {
                    debug!("stream: every handle dropped");
                    Wake::Shutdown
                }
            },
            renewed = self.renewals_rx.recv() => {
                if let Some(renewed) = renewed {
                    self.apply_renewal(state, renewed);
                }
                Wake::Idle
            }
        }
    }

    fn apply_command<C, R, P>(
        &mut self,
        state: &mut ChatState<C, R, P>,
        command: HubCommand,
    ) -> Wake
    where
        C: ChannelDirectory,
        R: ContactDirectory,
        P: Presenter,
    {
        match command {
            HubCommand::SetCredentials { tokens, user } => {
                state.session.update_token(tokens);
                if let Some(user) = user {
                    state.session.set_user(user);
                }
            }
            HubCommand::MarkRead { conversation, mid } => {
                state.messages.mark_read(conversation, mid);
            }
            HubCommand::MarkAllRead { conversation } => {
                let flipped = state.messages.mark_all_read(conversation);
                debug!(?conversation, flipped, "messages: conversation marked read");
            }
            HubCommand::Snapshot { reply } => {
                let _ = reply.send(ChatSnapshot::capture(state));
            }
            HubCommand::Logout => {
                info!("stream: logout requested");
                state.reset();
            }
            HubCommand::Shutdown => return Wake::Shutdown,
        }
        Wake::Idle
    }

    fn apply_renewal<C, R, P>(&mut self, state: &mut ChatState<C, R, P>, renewed: RenewalResult)
    where
        C: ChannelDirectory,
        R: ContactDirectory,
        P: Presenter,
    {
        match renewed {
            Ok(tokens) if state.session.token().is_some() => {
                info!("renew: credentials renewed");
                state.session.update_token(tokens);
                self.publish(HubEvent::CredentialsRenewed);
            }
            Ok(_) => debug!("renew: session ended before renewal completed; dropping tokens"),
            Err(err) => warn!(error = %err, "renew: failed"),
        }
    }

    fn set_phase(&mut self, phase: ConnectionPhase) {
        if self.phase != phase {
            debug!(from = ?self.phase, to = ?phase, "stream: phase changed");
            self.phase = phase;
            self.publish(HubEvent::PhaseChanged(phase));
        }
    }

    fn publish(&self, event: HubEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/stream_tests.rs"]
mod tests;
