//! Light/dark theme shared between lesson pages.
//!
//! Last write wins; subscribers always observe the latest theme.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Page colour scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light scheme.
    #[default]
    Light,
    /// Dark scheme.
    Dark,
}

impl Theme {
    /// The other theme.
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// CSS class put on the document root, if any.
    pub fn css_class(self) -> Option<&'static str> {
        match self {
            Theme::Light => None,
            Theme::Dark => Some("dark"),
        }
    }
}

/// Publish/subscribe channel for the current theme.
#[derive(Debug, Clone)]
pub struct ThemeChannel {
    sender: Arc<watch::Sender<Theme>>,
}

impl Default for ThemeChannel {
    fn default() -> Self {
        Self::new(Theme::default())
    }
}

impl ThemeChannel {
    /// Create a channel holding `initial`.
    pub fn new(initial: Theme) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// The latest published theme.
    pub fn current(&self) -> Theme {
        *self.sender.borrow()
    }

    /// Publish `theme`, replacing whatever was there.
    pub fn publish(&self, theme: Theme) {
        self.sender.send_replace(theme);
    }

    /// Flip the theme and return the new value.
    pub fn toggle(&self) -> Theme {
        let next = self.current().toggled();
        self.publish(next);
        next
    }

    /// Observe future changes.
    pub fn subscribe(&self) -> watch::Receiver<Theme> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let channel = ThemeChannel::default();
        channel.publish(Theme::Dark);
        channel.publish(Theme::Light);
        channel.publish(Theme::Dark);
        assert_eq!(channel.current(), Theme::Dark);
    }

    #[tokio::test]
    async fn test_subscribers_see_latest() {
        let channel = ThemeChannel::new(Theme::Light);
        let mut other_tab = channel.subscribe();

        assert_eq!(channel.toggle(), Theme::Dark);
        other_tab.changed().await.unwrap();
        assert_eq!(*other_tab.borrow(), Theme::Dark);
        assert_eq!(Theme::Dark.css_class(), Some("dark"));
    }
}
