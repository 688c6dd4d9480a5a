//! Client for the ActivityWatch server.
//!
//! The watcher only talks to the server through the [`Reporter`] trait: it
//! creates its bucket once and then sends one heartbeat per active poll.
//! Delivery and retries are the client's business.

pub mod http;
pub mod queue;

use crate::core::ActivitySample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use http::{AwClient, ClientConfig};
pub use queue::QueuedClient;

/// Name this watcher registers under.
pub const CLIENT_NAME: &str = "aw-watcher-input";

/// Event type of the watcher's bucket.
pub const EVENT_TYPE: &str = "inputstatus";

/// An ActivityWatch event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    /// Seconds; heartbeats are sent with zero and grown by the server
    pub duration: f64,
    pub data: serde_json::Value,
}

impl From<ActivitySample> for Event {
    fn from(sample: ActivitySample) -> Self {
        Self {
            timestamp: sample.timestamp,
            duration: 0.0,
            data: serde_json::json!({
                "seconds_since_last_activity": sample.seconds_since_last_activity,
                "keyboard": sample.keyboard,
                "mouse": sample.mouse,
            }),
        }
    }
}

/// The reporting boundary consumed by the watcher.
pub trait Reporter {
    /// Create a bucket. Creating one that already exists succeeds.
    fn create_bucket(
        &self,
        bucket_id: &str,
        event_type: &str,
        queued: bool,
    ) -> Result<(), ClientError>;

    /// Send a heartbeat the server may merge with the previous event when
    /// both fall within `pulsetime` seconds.
    fn heartbeat(
        &self,
        bucket_id: &str,
        event: Event,
        pulsetime: f64,
        queued: bool,
    ) -> Result<(), ClientError>;
}

/// Client error types.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error
    Config(String),
    /// Network/HTTP error
    Network(String),
    /// Server returned an error response
    Server { status: u16, message: String },
    /// JSON serialization error
    Serialization(String),
    /// The request queue is full
    QueueFull,
    /// The client has been closed
    Closed,
}

impl ClientError {
    /// Whether sending the same request again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(_) => true,
            ClientError::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Config(msg) => write!(f, "Client config error: {msg}"),
            ClientError::Network(msg) => write!(f, "Client network error: {msg}"),
            ClientError::Server { status, message } => {
                write!(f, "Server error ({status}): {message}")
            }
            ClientError::Serialization(msg) => write!(f, "Client serialization error: {msg}"),
            ClientError::QueueFull => write!(f, "Request queue is full"),
            ClientError::Closed => write!(f, "Client is closed"),
        }
    }
}

impl std::error::Error for ClientError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{KeyboardSummary, MouseSummary};

    #[test]
    fn test_event_from_sample() {
        let timestamp = Utc::now();
        let sample = ActivitySample {
            timestamp,
            seconds_since_last_activity: 2.5,
            mouse: MouseSummary {
                clicks: 2,
                click_positions: vec![(10.0, 10.0), (20.0, 20.0)],
                ..Default::default()
            },
            keyboard: KeyboardSummary { presses: 3 },
        };

        let event = Event::from(sample);
        assert_eq!(event.timestamp, timestamp);
        assert_eq!(event.duration, 0.0);
        assert_eq!(event.data["seconds_since_last_activity"], 2.5);
        assert_eq!(event.data["keyboard"]["presses"], 3);
        assert_eq!(event.data["mouse"]["clicks"], 2);
        assert_eq!(event.data["mouse"]["click_positions"][1][0], 20.0);
    }

    #[test]
    fn test_retryable_errors() {
        assert!(ClientError::Network("refused".to_string()).is_retryable());
        assert!(ClientError::Server {
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(!ClientError::Server {
            status: 400,
            message: String::new()
        }
        .is_retryable());
        assert!(!ClientError::Serialization("bad".to_string()).is_retryable());
    }
}
