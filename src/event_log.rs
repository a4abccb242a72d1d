//! Append-only transition log.
//!
//! One event per line:
//!
//! ```text
//! 2024-05-01 00:10:00,000 - https://www.example.com - state-change - Request Error: timed out
//! 2024-05-01 00:40:00,000 - https://www.example.com - state-change - Site restored
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::LogError;

pub const FIELD_SEPARATOR: &str = " - ";
pub const EVENT_KIND: &str = "state-change";
pub const RESTORED_MARKER: &str = "Site restored";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

const TIMESTAMP_FORMAT_NO_FRACTION: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventMessage {
    Restored,
    Down(String),
}

impl EventMessage {
    fn parse(message: &str) -> Self {
        if message == RESTORED_MARKER {
            EventMessage::Restored
        } else {
            EventMessage::Down(message.to_string())
        }
    }
}

impl fmt::Display for EventMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventMessage::Restored => f.write_str(RESTORED_MARKER),
            EventMessage::Down(reason) => f.write_str(reason),
        }
    }
}

/// A single recorded state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub timestamp: NaiveDateTime,
    pub endpoint: String,
    pub message: EventMessage,
}

impl Event {
    pub fn is_restore(&self) -> bool {
        self.message == EventMessage::Restored
    }

    /// Renders the event as a log line, without the trailing newline.
    pub fn to_line(&self) -> String {
        let message = self.message.to_string().replace(['\r', '\n'], " ");
        [
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            self.endpoint.clone(),
            EVENT_KIND.to_string(),
            message,
        ]
        .join(FIELD_SEPARATOR)
    }
}

/// Parses one log line. Lines with fewer than four fields or a bad
/// timestamp yield `None`.
///
/// The message is everything after the third separator, so reasons that
/// contain the separator survive.
pub fn parse_line(line: &str) -> Option<Event> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut fields = line.splitn(4, FIELD_SEPARATOR);
    let timestamp = fields.next()?;
    let endpoint = fields.next()?;
    let _kind = fields.next()?;
    let message = fields.next()?;

    let timestamp = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT_NO_FRACTION))
        .ok()?;
    if endpoint.is_empty() {
        return None;
    }

    Some(Event {
        timestamp,
        endpoint: endpoint.to_string(),
        message: EventMessage::parse(message),
    })
}

/// Parses a whole log, skipping malformed lines.
pub fn parse_log(contents: &str) -> Vec<Event> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(index, line)| {
            let event = parse_line(line);
            if event.is_none() {
                debug!(line = index + 1, "skipping malformed event log line");
            }
            event
        })
        .collect()
}

/// Reads every well-formed event from the log at `path`.
///
/// A missing log is an empty history, not an error.
pub async fn read_events(path: impl AsRef<Path>) -> Result<Vec<Event>, LogError> {
    let path = path.as_ref();
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(parse_log(&String::from_utf8_lossy(&bytes))),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "event log does not exist yet");
            Ok(Vec::new())
        }
        Err(source) => Err(LogError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Destination for transition events.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn append(&self, event: &Event) -> Result<(), LogError>;
}

/// File-backed event sink. Appends are serialised so lines never interleave.
#[derive(Debug)]
pub struct EventLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        EventLog {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

#[async_trait]
impl EventSink for EventLog {
    async fn append(&self, event: &Event) -> Result<(), LogError> {
        let mut line = event.to_line();
        line.push('\n');

        let _guard = self.lock.lock().await;
        self.write_line(&line)
            .await
            .map_err(|source| LogError::Append {
                path: self.path.clone(),
                source,
            })
    }
}
