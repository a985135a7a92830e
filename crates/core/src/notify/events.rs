use serde::{Deserialize, Serialize};

use crate::fetcher::FetchKind;

/// Event published while update cycles run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateEvent {
    /// A cycle passed the single-flight guard.
    Started(RunStarted),
    /// Payload download progress, or a phase change.
    Progress(RunProgress),
    /// A cycle ended. Published exactly once per started cycle.
    Completed(RunCompleted),
    /// The first `Completed` of the process, repeated once for one-shot setup.
    FirstCompleted(RunCompleted),
    /// User-visible message.
    Notice(Notice),
}

impl UpdateEvent {
    pub fn run_id(&self) -> Option<&str> {
        match self {
            Self::Started(e) => Some(&e.run_id),
            Self::Progress(e) => Some(&e.run_id),
            Self::Completed(e) | Self::FirstCompleted(e) => Some(&e.run_id),
            Self::Notice(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStarted {
    pub run_id: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunProgress {
    pub run_id: String,
    /// Current phase (e.g. "fetching", "merging").
    pub phase: String,
    pub bytes_read: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCompleted {
    pub run_id: String,
    /// "updated", "recovered", "not_needed" or "cancelled".
    pub outcome: String,
    pub has_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<FetchKind>,
    /// Catalog size after the cycle.
    pub entries: usize,
    pub new_entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = UpdateEvent::Started(RunStarted {
            run_id: "r1".to_string(),
            source: "auto".to_string(),
        });
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"started","run_id":"r1","source":"auto"}"#);

        let notice = UpdateEvent::Notice(Notice::error("Update failed", "boom"));
        let json = serde_json::to_string(&notice).unwrap();
        assert!(json.contains(r#""type":"notice""#));
        assert!(json.contains(r#""level":"error""#));
    }

    #[test]
    fn test_completed_round_trip() {
        let event = UpdateEvent::FirstCompleted(RunCompleted {
            run_id: "r2".to_string(),
            outcome: "updated".to_string(),
            has_error: false,
            kind: Some(FetchKind::Diff),
            entries: 10,
            new_entries: 2,
            error: None,
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"first_completed""#));
        assert!(json.contains(r#""kind":"diff""#));
        assert!(!json.contains("error"));

        let parsed: UpdateEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
        assert_eq!(parsed.run_id(), Some("r2"));
    }
}
