use crate::{
    cursor::CursorTracker,
    directory::{ChannelDirectory, ChannelList, ContactDirectory, ContactRoster},
    message_store::MessageStore,
    presenter::{LogPresenter, Presenter},
    session::SessionStore,
    transport::StreamParams,
};

/// Everything the event stream mutates. Created empty at session start,
/// handed by `&mut` to the dispatcher and the stream loop.
pub struct ChatState<C = ChannelList, R = ContactRoster, P = LogPresenter> {
    pub session: SessionStore,
    pub cursor: CursorTracker,
    pub messages: MessageStore,
    pub channels: C,
    pub contacts: R,
    pub presenter: P,
}

impl ChatState {
    pub fn new(session: SessionStore) -> Self {
        Self::with_parts(
            session,
            ChannelList::default(),
            ContactRoster::default(),
            LogPresenter,
        )
    }
}

impl<C, R, P> ChatState<C, R, P>
where
    C: ChannelDirectory,
    R: ContactDirectory,
    P: Presenter,
{
    pub fn with_parts(session: SessionStore, channels: C, contacts: R, presenter: P) -> Self {
        Self {
            session,
            cursor: CursorTracker::default(),
            messages: MessageStore::default(),
            channels,
            contacts,
            presenter,
        }
    }

    /// The input tuple of the next stream open, or `None` while signed out.
    pub fn stream_params(&self) -> Option<StreamParams> {
        let token = self.session.token().filter(|token| !token.is_empty())?;
        Some(StreamParams {
            token: token.to_string(),
            refresh_token: self.session.refresh_token().unwrap_or_default().to_string(),
            users_version: self.cursor.users_version(),
            after_mid: self.cursor.after_mid(),
        })
    }

    /// Logout or kick: drops credentials and every per-session store.
    pub fn reset(&mut self) {
        self.session.clear();
        self.messages.clear();
        self.cursor.reset();
    }
}
