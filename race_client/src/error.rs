//! Client error taxonomy.
//!
//! Every variant is recoverable: scenes turn errors into a status line and
//! let the user retry.

use thiserror::Error;

/// Missing credential or selection, detected before any request is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Token,
    CarUid,
    RoomUid,
}

impl Missing {
    pub fn prompt(self) -> &'static str {
        match self {
            Missing::Token => "Please enter JWT token first",
            Missing::CarUid => "Please enter Car UID first",
            Missing::RoomUid => "Please enter Room UID first",
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not connected to the realtime server")]
    NotConnected,
    #[error("realtime connection lost")]
    ConnectionLost,
    /// Non-success acknowledgement; carries the server's message.
    #[error("{0}")]
    Rejected(String),
    /// Non-OK HTTP status; `message` is the server's or a generic one.
    #[error("{message}")]
    Http { status: u16, message: String },
    #[error("{}", .0.prompt())]
    Precondition(Missing),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl ClientError {
    pub fn is_precondition(&self) -> bool {
        matches!(self, ClientError::Precondition(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_user_facing() {
        assert_eq!(
            ClientError::Precondition(Missing::CarUid).to_string(),
            "Please enter Car UID first"
        );
        assert_eq!(
            ClientError::Rejected("Room is full".into()).to_string(),
            "Room is full"
        );
        assert_eq!(
            ClientError::Http {
                status: 404,
                message: "HTTP 404: Not Found".into()
            }
            .to_string(),
            "HTTP 404: Not Found"
        );
    }
}
