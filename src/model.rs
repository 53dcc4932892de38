use std::fmt;

use serde::{Deserialize, Serialize};

/// Sample timestamp as the backend sends it: either an ISO string or an epoch number.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Number(f64),
    Text(String),
}

// Largest magnitude below which every integral f64 is exactly an i64.
const EXACT_INT: f64 = 9_007_199_254_740_992.0;

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Number(n) if n.fract() == 0.0 && n.abs() < EXACT_INT => {
                write!(f, "{}", *n as i64)
            }
            Timestamp::Number(n) => write!(f, "{}", n),
            Timestamp::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Timestamp {
    fn from(s: &str) -> Self {
        Timestamp::Text(s.to_string())
    }
}

impl From<i64> for Timestamp {
    fn from(n: i64) -> Self {
        Timestamp::Number(n as f64)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: Timestamp,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: impl Into<Timestamp>, value: f64) -> Self {
        Self {
            timestamp: timestamp.into(),
            value,
        }
    }
}

/// The two time series the dashboard charts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Packets,
    Anomalies,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Packets, Channel::Anomalies];

    /// Maps a live-feed event name to its channel. Both the short and the
    /// `_data` suffixed names are in use by deployed backends.
    pub fn from_event_name(name: &str) -> Option<Self> {
        match name {
            "packets" | "packet_data" => Some(Channel::Packets),
            "anomalies" | "anomaly_data" => Some(Channel::Anomalies),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Packets => "packets",
            Channel::Anomalies => "anomalies",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackupKind {
    Packet,
    Anomaly,
}

impl BackupKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackupKind::Packet => "packet",
            BackupKind::Anomaly => "anomaly",
        }
    }

    /// Category label shown next to each backup file.
    pub fn label(self) -> &'static str {
        match self {
            BackupKind::Packet => "capture",
            BackupKind::Anomaly => "anomaly",
        }
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessList {
    Blacklist,
    Whitelist,
}

impl AccessList {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessList::Blacklist => "blacklist",
            AccessList::Whitelist => "whitelist",
        }
    }
}

impl fmt::Display for AccessList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chart-ready projection of a sample window.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Series {
    pub labels: Vec<Timestamp>,
    pub values: Vec<f64>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// One-shot user-visible message produced by a remote call outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub at: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, text.into())
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, text.into())
    }

    fn new(level: NoticeLevel, text: String) -> Self {
        Self {
            level,
            text,
            at: now_ts(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

pub fn now_ts() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "<time>".to_string())
}

#[cfg(test)]
#[path = "tests/model_tests.rs"]
mod tests;
