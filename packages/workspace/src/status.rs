//! User-visible status notices
//!
//! Page operations and preset operations report on separate channels so a
//! preset failure never hides a page message. Each channel holds at most one
//! notice until it is dismissed or replaced.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    Page,
    Preset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusBoard {
    page: Option<Notice>,
    preset: Option<Notice>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&mut self, channel: Channel, message: impl Into<String>) {
        self.post(channel, NoticeKind::Success, message.into());
    }

    pub fn error(&mut self, channel: Channel, message: impl Into<String>) {
        self.post(channel, NoticeKind::Error, message.into());
    }

    pub fn get(&self, channel: Channel) -> Option<&Notice> {
        self.slot(channel).as_ref()
    }

    pub fn dismiss(&mut self, channel: Channel) -> Option<Notice> {
        self.slot_mut(channel).take()
    }

    pub fn clear(&mut self) {
        self.page = None;
        self.preset = None;
    }

    fn post(&mut self, channel: Channel, kind: NoticeKind, message: String) {
        *self.slot_mut(channel) = Some(Notice { kind, message });
    }

    fn slot(&self, channel: Channel) -> &Option<Notice> {
        match channel {
            Channel::Page => &self.page,
            Channel::Preset => &self.preset,
        }
    }

    fn slot_mut(&mut self, channel: Channel) -> &mut Option<Notice> {
        match channel {
            Channel::Page => &mut self.page,
            Channel::Preset => &mut self.preset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channels_are_independent() {
        let mut board = StatusBoard::new();
        board.error(Channel::Page, "Failed to save page");
        board.success(Channel::Preset, "Preset saved to backend.");

        assert!(board.get(Channel::Page).unwrap().is_error());
        assert!(!board.get(Channel::Preset).unwrap().is_error());

        let dismissed = board.dismiss(Channel::Page).unwrap();
        assert_eq!(dismissed.message, "Failed to save page");
        assert!(board.get(Channel::Page).is_none());
        assert!(board.get(Channel::Preset).is_some());
    }

    #[test]
    fn test_latest_notice_wins() {
        let mut board = StatusBoard::new();
        board.error(Channel::Page, "first");
        board.success(Channel::Page, "second");
        assert_eq!(board.get(Channel::Page).unwrap().message, "second");
    }
}
