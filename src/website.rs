use serde::{Deserialize, Serialize};

use crate::error::ProbeError;
use crate::event_log::EventMessage;

/// Outcome of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Up,
    Down(ProbeError),
}

impl CheckStatus {
    pub fn is_up(&self) -> bool {
        match self {
            CheckStatus::Up => true,
            CheckStatus::Down(_) => false,
        }
    }
}

/// A monitored endpoint and its last classified state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Website {
    pub url: String,
    pub is_up: bool,
}

impl Website {
    /// New endpoints start out as up until a probe says otherwise.
    pub fn new(url: impl Into<String>) -> Self {
        Website {
            url: url.into(),
            is_up: true,
        }
    }

    /// Feeds one probe outcome through the up/down state machine.
    ///
    /// Returns the message to log when the state flips, `None` otherwise.
    /// A changed reason while already down is not reported.
    pub fn observe(&mut self, status: &CheckStatus) -> Option<EventMessage> {
        match (self.is_up, status) {
            (false, CheckStatus::Up) => {
                self.is_up = true;
                Some(EventMessage::Restored)
            }
            (true, CheckStatus::Down(reason)) => {
                self.is_up = false;
                Some(EventMessage::Down(reason.to_string()))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down(reason: &str) -> CheckStatus {
        CheckStatus::Down(ProbeError::Transport(reason.to_string()))
    }

    #[test]
    fn test_starts_up() {
        let website = Website::new("https://www.example.com");
        assert!(website.is_up);
    }

    #[test]
    fn test_up_while_up_is_silent() {
        let mut website = Website::new("https://www.example.com");
        assert_eq!(website.observe(&CheckStatus::Up), None);
        assert!(website.is_up);
    }

    #[test]
    fn test_down_then_restored() {
        let mut website = Website::new("https://www.example.com");
        assert_eq!(
            website.observe(&down("connection refused")),
            Some(EventMessage::Down(
                "Request Error: connection refused".to_string()
            ))
        );
        assert!(!website.is_up);
        assert_eq!(
            website.observe(&CheckStatus::Up),
            Some(EventMessage::Restored)
        );
        assert!(website.is_up);
    }

    #[test]
    fn test_changed_reason_while_down_is_debounced() {
        let mut website = Website::new("https://www.example.com");
        assert!(website.observe(&down("timed out")).is_some());
        assert_eq!(
            website.observe(&CheckStatus::Down(ProbeError::HttpStatus(
                "503 Service Unavailable".to_string()
            ))),
            None
        );
        assert!(!website.is_up);
    }

    #[test]
    fn test_emits_only_on_flips() {
        let outcomes = [true, true, false, false, true, false, true, true, false];
        let mut website = Website::new("https://www.example.com");
        let mut previous = true;
        for up in outcomes {
            let status = if up { CheckStatus::Up } else { down("x") };
            let emitted = website.observe(&status).is_some();
            assert_eq!(emitted, up != previous);
            previous = up;
        }
    }
}
