//! User-visible messages: a status line the host renders, or a desktop
//! notification.

use std::cell::RefCell;
use std::rc::Rc;

pub trait Notifier {
    fn notify(&self, message: &str);
}

/// Shared status line. Clones observe the same messages, so the host keeps
/// one handle and gives another to the editor.
#[derive(Debug, Clone, Default)]
pub struct StatusLog {
    messages: Rc<RefCell<Vec<String>>>,
}

impl StatusLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<String> {
        self.messages.borrow().last().cloned()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }

    pub fn clear(&self) {
        self.messages.borrow_mut().clear();
    }
}

impl Notifier for StatusLog {
    fn notify(&self, message: &str) {
        tracing::info!(message, "status");
        self.messages.borrow_mut().push(message.to_string());
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, message: &str) {
        send(message);
    }
}

pub fn send(body: impl Into<String>) {
    let body = body.into();
    if let Err(err) = notify_rust::Notification::new()
        .appname("sketchboard")
        .summary("sketchboard")
        .body(&body)
        .show()
    {
        tracing::warn!("system notification failed: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_log_clones_share_messages() {
        let log = StatusLog::new();
        let handle = log.clone();
        handle.notify("select an image to crop");
        assert_eq!(log.last().as_deref(), Some("select an image to crop"));
        log.clear();
        assert!(handle.messages().is_empty());
    }
}
