//! Per-light exchange log for debugging and diagnostics.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::runtime::Instant;

/// What a history entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    Request,
    Response,
    /// The exchange failed; the message is the error text.
    Failure,
}

/// One recorded exchange step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub msg_type: MessageType,
    /// HTTP method and endpoint, e.g. `PUT lights`
    pub action: String,
    pub message: Value,
    /// Milliseconds since the history was created
    pub elapsed_ms: u64,
}

/// Bounded log of what was sent to one light and what came back.
///
/// The oldest entries are dropped once the capacity is reached.
///
/// ```
/// use elgato_lights_rs::{MessageHistory, MessageType};
/// use serde_json::json;
///
/// let mut history = MessageHistory::with_capacity(2);
/// history.record(MessageType::Request, "GET lights", &json!(null));
/// history.record(MessageType::Response, "GET lights", &json!({"numberOfLights": 1}));
/// history.record_error("PUT lights", "light rejected PUT lights with status 400");
///
/// assert_eq!(history.len(), 2);
/// assert_eq!(history.summary().failures, 1);
/// assert!(history.latest(MessageType::Request, "GET lights").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct MessageHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    created: Instant,
    last_error: Option<String>,
}

impl Default for MessageHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageHistory {
    pub const DEFAULT_CAPACITY: usize = 100;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        MessageHistory {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            created: Instant::now(),
            last_error: None,
        }
    }

    pub fn record(&mut self, msg_type: MessageType, action: &str, message: &Value) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry {
            msg_type,
            action: action.to_string(),
            message: message.clone(),
            elapsed_ms: self.created.elapsed().as_millis() as u64,
        });
    }

    pub fn record_error(&mut self, action: &str, error: &str) {
        self.record(MessageType::Failure, action, &Value::from(error));
        self.last_error = Some(error.to_string());
    }

    /// Last failure, kept even after its entry has been dropped.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The most recent retained message of the given type for an action.
    pub fn latest(&self, msg_type: MessageType, action: &str) -> Option<&Value> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.msg_type == msg_type && e.action == action)
            .map(|e| &e.message)
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.last_error = None;
    }

    pub fn summary(&self) -> HistorySummary {
        let count = |t: MessageType| self.entries.iter().filter(|e| e.msg_type == t).count();
        HistorySummary {
            requests: count(MessageType::Request),
            responses: count(MessageType::Response),
            failures: count(MessageType::Failure),
            total_entries: self.entries.len(),
            last_error: self.last_error.clone(),
        }
    }
}

/// Counts over the retained entries, for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySummary {
    pub requests: usize,
    pub responses: usize,
    pub failures: usize,
    pub total_entries: usize,
    pub last_error: Option<String>,
}
