//! Local mirror of chat state fed by the server's event stream.
//!
//! `ChatState` holds the stores, `ChatState::dispatch` applies one event,
//! and `StreamConnection` keeps exactly one event stream open for the
//! current credentials and cursor.

pub mod cursor;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod message_store;
pub mod presenter;
pub mod renewal;
pub mod session;
pub mod settings;
pub mod snapshot;
pub mod sse;
pub mod state;
pub mod stream;
pub mod transport;

pub use cursor::CursorTracker;
pub use directory::{ChannelDirectory, ChannelList, ContactDirectory, ContactRoster};
pub use dispatcher::Dispatch;
pub use error::ClientError;
pub use message_store::{MergeOutcome, MessageFields, MessageRecord, MessageStore};
pub use presenter::{LocalNotification, LogPresenter, Presenter};
pub use renewal::{CredentialRenewer, HttpRenewer};
pub use session::{CurrentUser, SessionStore, TokenPair};
pub use snapshot::ChatSnapshot;
pub use state::ChatState;
pub use stream::{
    ConnectionPhase, HubCommand, HubEvent, HubHandle, ResumePolicy, StreamConnection,
    StreamSettings,
};
pub use transport::{EventTransport, SseTransport, StreamParams, TransportPhase};
