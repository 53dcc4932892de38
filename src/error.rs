//! Error taxonomy for the dashboard core.
//!
//! Every remote call fails with a [`RequestError`] describing what went wrong on
//! the wire; the per-operation errors wrap it so callers can tell a failed
//! snapshot fetch from a failed list edit or device command.

/// Transport, status, or decode failure of one HTTP exchange.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("{what}: request failed: {message}")]
    Transport { what: String, message: String },

    #[error("{what}: server returned {status}{}", detail_suffix(.message))]
    Status {
        what: String,
        status: u16,
        message: Option<String>,
    },

    #[error("{what}: could not decode response: {message}")]
    Decode { what: String, message: String },
}

fn detail_suffix(message: &Option<String>) -> String {
    match message {
        Some(m) if !m.is_empty() => format!(" ({})", m),
        _ => String::new(),
    }
}

impl RequestError {
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// A bulk snapshot fetch failed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error(transparent)]
pub struct FetchError(#[from] pub RequestError);

/// Input rejected locally before any network call.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("not a valid IPv4 address: {0:?}")]
    MalformedIp(String),
}

/// A blacklist/whitelist add or remove failed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Request(#[from] RequestError),
}

/// A power, backup, or maintenance command failed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error(transparent)]
pub struct ControlError(#[from] pub RequestError);

/// Live feed subscription could not be set up.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    #[error("a live feed connection is already active")]
    AlreadySubscribed,

    #[error("failed to start feed reader: {0}")]
    Spawn(String),
}

/// A dashboard could not be mounted.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MountError {
    #[error(transparent)]
    Client(#[from] RequestError),

    #[error(transparent)]
    Feed(#[from] FeedError),
}
