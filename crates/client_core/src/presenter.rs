use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalNotification {
    pub body: String,
    pub data: NotificationData,
}

impl LocalNotification {
    pub fn new(body: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            data: NotificationData { path: path.into() },
        }
    }
}

/// The user-facing side effects the mirror can ask for: desktop
/// notifications, navigation and short transient notices.
pub trait Presenter: Send {
    fn show_notification(&mut self, notification: LocalNotification);
    fn navigate(&mut self, path: &str);
    fn notice(&mut self, message: &str);
}

/// Writes every request to the log. Used by the headless binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn show_notification(&mut self, notification: LocalNotification) {
        info!(
            path = %notification.data.path,
            body = %notification.body,
            "notify: new message"
        );
    }

    fn navigate(&mut self, path: &str) {
        info!(path, "notify: navigate");
    }

    fn notice(&mut self, message: &str) {
        info!("notify: {message}");
    }
}
