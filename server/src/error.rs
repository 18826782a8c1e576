//! Error types shared by the directory server and its clients.
//!
//! The group-level variants double as the plain-text notices the server sends
//! back to a requester, so their `Display` text is user facing.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Could not connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Bad frame: {0}")]
    Frame(#[source] std::io::Error),

    #[error("Connection closed before a full record arrived")]
    Closed,

    #[error("Address for user {0} not found.")]
    UserNotFound(String),

    #[error("Group {0} doesn't exist.")]
    GroupNotFound(String),

    #[error("You are already in the group {0}.")]
    AlreadyMember(String),

    #[error("User {user} isn't in the group {group}.")]
    NotMember { user: String, group: String },

    #[error("You don't have access to group {0}!")]
    NoAccess(String),

    #[error("You don't have permission to {action} {group}!")]
    Permission { action: &'static str, group: String },

    #[error("Group {0} already exists!")]
    AlreadyExists(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_text() {
        assert_eq!(
            ChatError::GroupNotFound("chess".into()).to_string(),
            "Group chess doesn't exist."
        );
        assert_eq!(
            ChatError::Permission { action: "delete the group", group: "chess".into() }.to_string(),
            "You don't have permission to delete the group chess!"
        );
        assert_eq!(
            ChatError::AlreadyMember("chess".into()).to_string(),
            "You are already in the group chess."
        );
        assert_eq!(
            ChatError::NotMember { user: "bob".into(), group: "chess".into() }.to_string(),
            "User bob isn't in the group chess."
        );
    }
}
