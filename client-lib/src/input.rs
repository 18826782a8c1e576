//! Turns a line typed by the user into a request.
//!
//! The line is `<command> [<target>] [<body...>]`; everything after the
//! target is re-joined with single spaces and becomes the body.

use peerchat_server::{Command, Message};

use crate::error::{ClientError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// List cached groups.
    Groups,
    /// List cached members of a group. `None` when no group was given.
    Users(Option<String>),
    /// Anything the server has to handle.
    Remote(Message),
}

/// Returns `Ok(None)` for blank input.
pub fn parse(user: &str, input: &str) -> Result<Option<Request>> {
    let mut tokens = input.split_whitespace();
    let Some(command) = tokens.next() else {
        return Ok(None);
    };
    let to = tokens.next().unwrap_or_default();
    let body = tokens.collect::<Vec<_>>().join(" ");

    let request = match command {
        "groups" => Request::Groups,
        "users" if to.is_empty() => Request::Users(None),
        "users" => Request::Users(Some(to.to_string())),
        other => match other.parse::<Command>() {
            Ok(
                command @ (Command::Join
                | Command::Dm
                | Command::Group
                | Command::Leave
                | Command::Create
                | Command::Delete
                | Command::Kick),
            ) => Request::Remote(Message::new(user, to, body, command)),
            _ => return Err(ClientError::UnknownCommand(other.to_string())),
        },
    };
    Ok(Some(request))
}
